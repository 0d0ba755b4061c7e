// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Header translation between IPv4 and IPv6.
//!
//! Both directions follow the same steps: classify and validate the addresses, build the new IP
//! header, translate the body (remapping ICMP and translating the packet embedded in ICMP
//! errors), then fix the checksums. Embedded packets are translated with [`Depth::Embedded`],
//! which forbids any further nesting.

mod icmp;
mod v4_to_v6;
mod v6_to_v4;

use crate::bindings::Bindings;
use crate::errors::TranslateError;
use net::checksum::adjust_checksum;
use net::parse::{DeParse, DeParseError, ParseError};
use net::transport::Transport;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Instant;

pub use icmp::{icmp4_to_icmp6_header, icmp6_to_icmp4_header};

/// Largest IPv6 packet guaranteed to cross any link (RFC 8200)
pub const IPV6_MIN_MTU: usize = 1280;

/// Everything a translation reads besides the packet itself.
#[derive(Debug, Clone, Copy)]
pub struct TranslateEnv<'a> {
    pub bindings: &'a Bindings,
    /// Interface the packet travels through, for diagnostics
    pub interface: &'a str,
    pub local_v4: Option<Ipv4Addr>,
    pub local_v6: Option<Ipv6Addr>,
    /// Replaces `local_v4` as the IPv4 address of this host when set
    pub private_addr: Option<Ipv4Addr>,
    pub tos_ignore: bool,
    pub now: Instant,
}

impl TranslateEnv<'_> {
    fn local_v6(&self) -> Result<Ipv6Addr, TranslateError> {
        self.local_v6
            .ok_or_else(|| TranslateError::NoLocalAddress(self.interface.to_string()))
    }

    /// The IPv4 address standing for this host.
    fn own_v4(&self) -> Result<Ipv4Addr, TranslateError> {
        self.private_addr
            .or(self.local_v4)
            .ok_or_else(|| TranslateError::NoLocalAddress(self.interface.to_string()))
    }
}

/// Whether a packet is the one received or the one quoted inside an ICMP error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Depth {
    Outer,
    Embedded,
}

/// Position of a packet in a fragment train.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fragmentation {
    /// Whole datagram, possibly with an atomic fragment header
    Unfragmented,
    /// Offset zero, more fragments follow
    First,
    /// Anything with a non-zero offset: no transport header
    Later,
}

/// Translate an IPv4 packet to IPv6.
///
/// Bytes past the IPv4 total length are ignored.
///
/// # Errors
///
/// Returns the reason the packet must be dropped.
pub fn translate_4to6(env: &TranslateEnv<'_>, packet: &[u8]) -> Result<Vec<u8>, TranslateError> {
    v4_to_v6::translate(env, packet, Depth::Outer)
}

/// Translate an IPv6 packet to IPv4, allocating an IPv4 address for a new source.
///
/// # Errors
///
/// Returns the reason the packet must be dropped.
pub fn translate_6to4(env: &TranslateEnv<'_>, packet: &[u8]) -> Result<Vec<u8>, TranslateError> {
    v6_to_v4::translate(env, packet, Depth::Outer)
}

pub(crate) fn parse_failure<E: core::error::Error>(err: ParseError<E>) -> TranslateError {
    match err {
        ParseError::Length(len) => TranslateError::PacketTooShort(len),
        ParseError::Invalid(_) => TranslateError::InvalidHeader,
    }
}

pub(crate) fn emit<T: DeParse>(header: &T, out: &mut Vec<u8>) -> Result<(), TranslateError> {
    match header.deparse_into(out) {
        Ok(_) => Ok(()),
        Err(DeParseError::Length(len)) => Err(TranslateError::PacketTooShort(len)),
        Err(DeParseError::Invalid(_)) => Err(TranslateError::InvalidHeader),
    }
}

/// Rewrite the checksum of a TCP or UDP segment whose pseudo-header addresses change from `old`
/// to `new`.
///
/// `fresh` computes the checksum of the segment (checksum field zeroed) under the new
/// pseudo-header. Embedded segments are usually truncated, so their checksum is adjusted
/// instead of recomputed; a missing checksum field is left alone.
fn rewrite_transport_checksum(
    transport: Transport,
    segment: &mut [u8],
    fragmentation: Fragmentation,
    depth: Depth,
    (old, new): (&[u8], &[u8]),
    fresh: impl FnOnce(&[u8]) -> u16,
) -> Result<(), TranslateError> {
    if fragmentation == Fragmentation::Later {
        return Ok(());
    }
    let field = transport.checksum_offset();
    let mut view = net::buffer::PacketViewMut::new(segment);
    let current = match view.as_view().read_be16(field) {
        Ok(checksum) => checksum,
        Err(_) if depth == Depth::Embedded => return Ok(()),
        Err(len) => return Err(len.into()),
    };
    let no_udp_checksum = transport == Transport::Udp && current == 0;
    match (depth, fragmentation) {
        (Depth::Embedded, _) => {
            if !no_udp_checksum {
                view.write_be16(field, adjust_checksum(current, old, new))?;
            }
        }
        (Depth::Outer, Fragmentation::First) => {
            if no_udp_checksum {
                return Err(TranslateError::ZeroChecksumFragment);
            }
            view.write_be16(field, 0)?;
        }
        (Depth::Outer, _) => {
            view.write_be16(field, 0)?;
            let computed = fresh(segment);
            let wire = match transport {
                Transport::Udp => net::checksum::udp_wire_checksum(computed),
                Transport::Tcp => computed,
            };
            net::buffer::PacketViewMut::new(segment).write_be16(field, wire)?;
        }
    }
    Ok(())
}
