// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration model of the translator.
//!
//! [`TranslatorConfig`] is the startup configuration (YAML or builder); the [`admin`] module
//! parses the textual commands used to change pool ranges, static mappings and settings at
//! runtime.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

pub mod admin;
pub mod errors;
pub mod translator;

pub use errors::{ConfigError, ConfigResult};
pub use translator::{
    BihMode, PoolRange, StaticMapping, TranslatorConfig, TranslatorConfigBuilder,
};

use tracectl::trace_target;
trace_target!("config", tracectl::LevelFilter::INFO, &["bih"]);
