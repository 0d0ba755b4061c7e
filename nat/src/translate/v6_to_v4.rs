// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IPv6 to IPv4

use super::{
    Depth, Fragmentation, TranslateEnv, emit, icmp, parse_failure, rewrite_transport_checksum,
};
use crate::errors::TranslateError;
use net::buffer::PacketView;
use net::checksum::{Checksum, pseudo_header_checksum_v4};
use net::ip::{FragOffset, NextHeader};
use net::ipv4::Ipv4;
use net::ipv6::addr::Ipv6Class;
use net::ipv6::{ExtensionWalk, Ipv6, Ipv6Fragment};
use net::parse::Parse;
use net::transport::{DNS_PORT, Transport};
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::trace;

fn fragmentation(fragment: Option<&Ipv6Fragment>) -> Fragmentation {
    match fragment {
        None => Fragmentation::Unfragmented,
        Some(frag) if frag.is_atomic() => Fragmentation::Unfragmented,
        Some(frag) if frag.offset() != FragOffset::ZERO => Fragmentation::Later,
        Some(_) => Fragmentation::First,
    }
}

fn check_classes(src: Ipv6Addr, dst: Ipv6Addr) -> Result<(), TranslateError> {
    if Ipv6Class::of(dst) != Ipv6Class::Unicast {
        return Err(TranslateError::InvalidAddressClass(dst.into()));
    }
    if Ipv6Class::of(src).is_scoped() {
        return Err(TranslateError::InvalidAddressClass(src.into()));
    }
    Ok(())
}

fn addresses(
    env: &TranslateEnv<'_>,
    src: Ipv6Addr,
    dst: Ipv6Addr,
    depth: Depth,
) -> Result<(Ipv4Addr, Ipv4Addr), TranslateError> {
    let local = env.local_v6()?;
    let own = env.own_v4()?;
    match depth {
        Depth::Outer => {
            if dst != local {
                return Err(TranslateError::NotLocalDestination(dst.into()));
            }
            let mapped = env.bindings.resolve_or_assign(src, env.now)?;
            Ok((mapped, own))
        }
        // quoted packets were sent by this host: never allocate for them
        Depth::Embedded => {
            if src != local {
                return Err(TranslateError::NoMapping(src.into()));
            }
            let mapped = env
                .bindings
                .find_by_internal(dst, env.now)
                .ok_or(TranslateError::NoMapping(dst.into()))?;
            Ok((own, mapped))
        }
    }
}

fn pseudo_addresses(
    src6: Ipv6Addr,
    dst6: Ipv6Addr,
    src4: Ipv4Addr,
    dst4: Ipv4Addr,
) -> ([u8; 32], [u8; 8]) {
    let mut old = [0u8; 32];
    old[..16].copy_from_slice(&src6.octets());
    old[16..].copy_from_slice(&dst6.octets());
    let mut new = [0u8; 8];
    new[..4].copy_from_slice(&src4.octets());
    new[4..].copy_from_slice(&dst4.octets());
    (old, new)
}

fn low_bits(identification: u32) -> u16 {
    let [_, _, hi, lo] = identification.to_be_bytes();
    u16::from_be_bytes([hi, lo])
}

pub(super) fn translate(
    env: &TranslateEnv<'_>,
    packet: &[u8],
    depth: Depth,
) -> Result<Vec<u8>, TranslateError> {
    let (header, _) = Ipv6::parse(packet).map_err(parse_failure)?;
    let claimed = usize::from(header.payload_length());
    let view = PacketView::new(packet);
    let payload = match depth {
        Depth::Outer => {
            // jumbograms carry their length in a hop-by-hop option
            if claimed == 0 {
                return Err(TranslateError::InvalidHeader);
            }
            view.slice(Ipv6::LEN, claimed)?
        }
        Depth::Embedded => {
            let available = view.tail(Ipv6::LEN)?;
            available.get(..claimed).unwrap_or(available)
        }
    };
    let (src6, dst6) = (header.source(), header.destination());
    if depth == Depth::Outer {
        check_classes(src6, dst6)?;
    }

    let walk = ExtensionWalk::walk(header.next_header(), payload)?;
    let body = PacketView::new(payload).tail(walk.len)?;
    let fragment = walk.fragment.as_ref();
    let first = fragment.is_none_or(|frag| frag.offset() == FragOffset::ZERO);
    if depth == Depth::Outer
        && walk.upper == NextHeader::UDP
        && first
        && Transport::source_port(&PacketView::new(body))? == DNS_PORT
    {
        return Err(TranslateError::DnsExempt);
    }
    let (src4, dst4) = addresses(env, src6, dst6, depth)?;

    let (protocol, body4) = if walk.upper == NextHeader::ICMP6 {
        if fragmentation(fragment) != Fragmentation::Unfragmented {
            return Err(TranslateError::FragmentedIcmp);
        }
        (NextHeader::ICMP, icmp::icmp6_to_icmp4(env, body, depth)?)
    } else if let Some(transport) = Transport::from_next_header(walk.upper) {
        let mut segment = body.to_vec();
        let (old, new) = pseudo_addresses(src6, dst6, src4, dst4);
        rewrite_transport_checksum(
            transport,
            &mut segment,
            fragmentation(fragment),
            depth,
            (&old, &new),
            |seg| pseudo_header_checksum_v4(src4, dst4, walk.upper, seg),
        )?;
        (walk.upper, segment)
    } else if walk.upper == NextHeader::NONE {
        // nothing to rewrite, the body goes out as is
        (walk.upper, body.to_vec())
    } else {
        return Err(TranslateError::UnsupportedProtocol(walk.upper));
    };

    let mut ipv4 = Ipv4::new(src4, dst4, protocol, header.hop_limit());
    ipv4.set_tos(if env.tos_ignore {
        0
    } else {
        header.traffic_class()
    })
    .set_dont_fragment(false);
    if let Some(frag) = fragment {
        ipv4.set_identification(low_bits(frag.identification()))
            .set_fragment_offset(frag.offset())
            .set_more_fragments(frag.more_fragments());
    }
    let total_len = match depth {
        Depth::Outer => u16::try_from(Ipv4::MIN_LEN + body4.len())
            .map_err(|_| TranslateError::InvalidHeader)?,
        // quoted packets keep the length claimed by their original header
        Depth::Embedded => {
            u16::try_from((claimed + Ipv4::MIN_LEN).saturating_sub(walk.len)).unwrap_or(u16::MAX)
        }
    };
    ipv4.set_total_len(total_len).update_checksum(&());

    let mut out = Vec::with_capacity(Ipv4::MIN_LEN + body4.len());
    emit(&ipv4, &mut out)?;
    out.extend_from_slice(&body4);
    trace!("{src6} -> {dst6} translated to {src4} -> {dst4}, {} bytes", out.len());
    Ok(out)
}
