// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Bump-in-the-host IPv4/IPv6 translation.
//!
//! A [`TranslatorContext`] owns the IPv4 address pool, the IPv4/IPv6 mapping table and the
//! runtime settings. Packets are fed through [`TranslatorContext::on_packet`], which rewrites an
//! IPv4 packet into IPv6 (or the other way around), allocating an IPv4 address from the pool
//! the first time an IPv6 source is seen.

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

pub mod bindings;
pub mod context;
pub mod errors;
pub mod fragment;
pub mod mapping;
pub mod metrics;
pub mod pool;
pub mod reaper;
pub mod translate;

pub use bindings::Bindings;
pub use context::{
    AddressFamily, AddressResolver, Direction, OutputPacket, PacketSink, StaticResolver,
    TranslatorContext,
};
pub use errors::{
    AdminError, DispatchError, MappingError, PoolError, ReaperError, TranslateError,
};
pub use fragment::FragmentEmitter;
pub use mapping::{MapEntry, MappingTable};
pub use pool::{AddressPool, AddressRange, PoolCursor};
pub use reaper::Reaper;

use tracectl::trace_target;
trace_target!("nat", tracectl::LevelFilter::INFO, &["bih"]);
