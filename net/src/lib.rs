// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![forbid(unsafe_code)] // Validation logic should always be strictly safe
#![deny(clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! Packet level building blocks for IPv4/IPv6 header translation
//!
//! Everything here works on borrowed byte slices: [`buffer::PacketView`] for bounds-checked
//! access, header codecs implementing [`parse::Parse`] and [`parse::DeParse`], and pure checksum
//! functions in [`checksum`].

pub mod buffer;
pub mod checksum;
pub mod icmp4;
pub mod icmp6;
pub mod ip;
pub mod ipv4;
pub mod ipv6;
pub mod parse;
pub mod transport;

use tracectl::trace_target;
trace_target!("net", tracectl::LevelFilter::INFO, &["packet"]);
