// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IPv4 to IPv6

use super::{
    Depth, Fragmentation, IPV6_MIN_MTU, TranslateEnv, emit, icmp, parse_failure,
    rewrite_transport_checksum,
};
use crate::errors::TranslateError;
use net::buffer::PacketView;
use net::checksum::pseudo_header_checksum_v6;
use net::ip::{FragOffset, NextHeader};
use net::ipv4::Ipv4;
use net::ipv4::addr::Ipv4Class;
use net::ipv6::{Ipv6, Ipv6Fragment};
use net::parse::Parse;
use net::transport::{DNS_PORT, Transport};
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::trace;

fn fragmentation(header: &Ipv4) -> Fragmentation {
    if header.fragment_offset() != FragOffset::ZERO {
        Fragmentation::Later
    } else if header.more_fragments() {
        Fragmentation::First
    } else {
        Fragmentation::Unfragmented
    }
}

fn addresses(
    env: &TranslateEnv<'_>,
    header: &Ipv4,
    body: &[u8],
    depth: Depth,
) -> Result<(Ipv6Addr, Ipv6Addr), TranslateError> {
    let (src, dst) = (header.source(), header.destination());
    match depth {
        Depth::Outer => {
            if Ipv4Class::of(dst) != Ipv4Class::Unicast || dst == src {
                return Err(TranslateError::InvalidAddressClass(dst.into()));
            }
            if header.protocol() == NextHeader::UDP
                && header.fragment_offset() == FragOffset::ZERO
                && Transport::destination_port(&PacketView::new(body))? == DNS_PORT
            {
                return Err(TranslateError::DnsExempt);
            }
            let local = env.local_v6()?;
            let mapped = env
                .bindings
                .search_by_external(dst, env.now)
                .ok_or(TranslateError::NoMapping(dst.into()))?;
            Ok((local, mapped))
        }
        // quoted packets went the other way: their source is the remote host
        Depth::Embedded => {
            let mapped = env
                .bindings
                .search_by_external(src, env.now)
                .ok_or(TranslateError::NoMapping(src.into()))?;
            Ok((mapped, env.local_v6()?))
        }
    }
}

fn pseudo_addresses(
    src4: Ipv4Addr,
    dst4: Ipv4Addr,
    src6: Ipv6Addr,
    dst6: Ipv6Addr,
) -> ([u8; 8], [u8; 32]) {
    let mut old = [0u8; 8];
    old[..4].copy_from_slice(&src4.octets());
    old[4..].copy_from_slice(&dst4.octets());
    let mut new = [0u8; 32];
    new[..16].copy_from_slice(&src6.octets());
    new[16..].copy_from_slice(&dst6.octets());
    (old, new)
}

pub(super) fn translate(
    env: &TranslateEnv<'_>,
    packet: &[u8],
    depth: Depth,
) -> Result<Vec<u8>, TranslateError> {
    let (header, consumed) = Ipv4::parse(packet).map_err(parse_failure)?;
    let header_len = consumed.get();
    let total_len = usize::from(header.total_len());
    if total_len < header_len {
        return Err(TranslateError::InvalidHeader);
    }
    let claimed = total_len - header_len;
    let view = PacketView::new(packet);
    let body = match depth {
        Depth::Outer => view.slice(header_len, claimed)?,
        Depth::Embedded => {
            let available = view.tail(header_len)?;
            available.get(..claimed).unwrap_or(available)
        }
    };

    let (src6, dst6) = addresses(env, &header, body, depth)?;
    let protocol = header.protocol();
    let upper = if protocol == NextHeader::ICMP {
        NextHeader::ICMP6
    } else {
        protocol
    };
    let unfragmented = header.dont_fragment() && !header.is_fragment();
    let fragment = (depth == Depth::Outer && !unfragmented).then(|| {
        Ipv6Fragment::new(
            upper,
            header.fragment_offset(),
            header.more_fragments(),
            u32::from(header.identification()),
        )
    });
    let fragment_len = fragment.as_ref().map_or(0, |_| Ipv6Fragment::LEN);

    let body6 = if protocol == NextHeader::ICMP {
        if header.is_fragment() {
            return Err(TranslateError::FragmentedIcmp);
        }
        if depth == Depth::Embedded {
            return Err(TranslateError::IncludedErrorInError);
        }
        let room = IPV6_MIN_MTU - Ipv6::LEN - fragment_len;
        icmp::icmp4_to_icmp6(env, body, src6, dst6, room)?
    } else if let Some(transport) = Transport::from_next_header(protocol) {
        let mut segment = body.to_vec();
        let (old, new) = pseudo_addresses(header.source(), header.destination(), src6, dst6);
        rewrite_transport_checksum(
            transport,
            &mut segment,
            fragmentation(&header),
            depth,
            (&old, &new),
            |seg| pseudo_header_checksum_v6(src6, dst6, protocol, seg),
        )?;
        segment
    } else {
        return Err(TranslateError::UnsupportedProtocol(protocol));
    };

    let payload_len = match depth {
        Depth::Outer => fragment_len + body6.len(),
        Depth::Embedded => claimed,
    };
    let mut ipv6 = Ipv6::new(
        src6,
        dst6,
        if fragment.is_some() {
            NextHeader::FRAGMENT
        } else {
            upper
        },
        header.ttl(),
    );
    ipv6.set_traffic_class(if env.tos_ignore { 0 } else { header.tos() })
        .set_payload_length(u16::try_from(payload_len).unwrap_or(u16::MAX));

    let mut out = Vec::with_capacity(Ipv6::LEN + fragment_len + body6.len());
    emit(&ipv6, &mut out)?;
    if let Some(fragment) = &fragment {
        emit(fragment, &mut out)?;
    }
    out.extend_from_slice(&body6);
    trace!(
        "{} -> {} translated to {src6} -> {dst6}, {} bytes",
        header.source(),
        header.destination(),
        out.len()
    );
    Ok(out)
}
