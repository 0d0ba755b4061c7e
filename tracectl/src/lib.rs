// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Runtime control of tracing for the translator crates
//!
//! Crates declare their tracing target once with [`trace_target!`]; the first call to
//! [`get_trace_ctl`] installs a subscriber whose per-target filter can be changed at runtime,
//! e.g. from a `default=info,nat=debug` string.

pub mod control;
mod display;
pub mod targets;

pub use control::{TargetCfg, TraceCtlError, TracingControl, get_trace_ctl};
pub use tracing_subscriber::filter::LevelFilter;

trace_target!("tracectl", LevelFilter::INFO, &[]);
