// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! ICMP and ICMPv6 remapping (RFC 6145 sections 4.2 and 5.2)

use super::{Depth, TranslateEnv, emit, v4_to_v6, v6_to_v4};
use crate::errors::TranslateError;
use net::buffer::PacketView;
use net::checksum::Checksum;
use net::icmp4::{self, Icmp4};
use net::icmp6::{self, Icmp6, Icmp6ChecksumPayload};
use net::ipv4::Ipv4;
use net::ipv6::Ipv6;
use std::net::Ipv6Addr;

/// Pointer of an `ICMPv4` parameter problem, moved to the matching IPv6 header field.
fn pointer_4to6(pointer: u8) -> u32 {
    match pointer {
        0 => 0,  // version / IHL
        2 => 4,  // total length -> payload length
        8 => 7,  // TTL -> hop limit
        9 => 6,  // protocol -> next header
        12 => 8, // source address
        16 => 24, // destination address
        _ => u32::MAX,
    }
}

/// Inverse of [`pointer_4to6`].
fn pointer_6to4(pointer: u32) -> u8 {
    match pointer {
        0 => 0,
        4 => 2,
        6 => 9,
        7 => 8,
        8 => 12,
        24 => 16,
        _ => u8::MAX,
    }
}

fn unknown(icmp_type: u8, code: u8) -> TranslateError {
    TranslateError::UnknownIcmpType { icmp_type, code }
}

/// The `ICMPv6` header standing for `icmp`, checksum not computed.
///
/// # Errors
///
/// Returns [`TranslateError::UnknownIcmpType`] for messages with no `ICMPv6` counterpart.
pub fn icmp4_to_icmp6_header(icmp: &Icmp4) -> Result<Icmp6, TranslateError> {
    use icmp4::{types as t4, unreach as u4};
    use icmp6::{param as p6, types as t6, unreach as u6};

    let (icmp_type, code) = (icmp.icmp_type(), icmp.code());
    let header = match icmp_type {
        t4::ECHO_REQUEST | t4::ECHO_REPLY => {
            let type6 = if icmp_type == t4::ECHO_REQUEST {
                t6::ECHO_REQUEST
            } else {
                t6::ECHO_REPLY
            };
            *Icmp6::new(type6, 0).set_rest(icmp.rest())
        }
        t4::DEST_UNREACH => match code {
            u4::NET
            | u4::HOST
            | u4::SOURCE_ROUTE_FAILED
            | u4::NET_UNKNOWN
            | u4::HOST_UNKNOWN
            | u4::HOST_ISOLATED
            | u4::NET_TOS
            | u4::HOST_TOS => Icmp6::new(t6::DEST_UNREACH, u6::NO_ROUTE),
            u4::PROTOCOL => {
                // points at the next header field
                *Icmp6::new(t6::PARAM_PROBLEM, p6::NEXT_HEADER).set_pointer(6)
            }
            u4::PORT => Icmp6::new(t6::DEST_UNREACH, u6::PORT),
            u4::FRAG_NEEDED => {
                let mtu = match icmp.mtu() {
                    0 => 576,
                    mtu => u32::from(mtu) + 20,
                };
                *Icmp6::new(t6::PACKET_TOO_BIG, 0).set_mtu(mtu)
            }
            u4::NET_PROHIBITED | u4::HOST_PROHIBITED => {
                Icmp6::new(t6::DEST_UNREACH, u6::ADMIN_PROHIBITED)
            }
            _ => return Err(unknown(icmp_type, code)),
        },
        t4::TIME_EXCEEDED => Icmp6::new(t6::TIME_EXCEEDED, code),
        t4::PARAM_PROBLEM => {
            *Icmp6::new(t6::PARAM_PROBLEM, code).set_pointer(pointer_4to6(icmp.pointer()))
        }
        _ => return Err(unknown(icmp_type, code)),
    };
    Ok(header)
}

/// The `ICMPv4` header standing for `icmp`, checksum not computed.
///
/// # Errors
///
/// Returns [`TranslateError::UnknownIcmpType`] for messages with no `ICMPv4` counterpart.
pub fn icmp6_to_icmp4_header(icmp: &Icmp6) -> Result<Icmp4, TranslateError> {
    use icmp4::{types as t4, unreach as u4};
    use icmp6::{param as p6, types as t6, unreach as u6};

    let (icmp_type, code) = (icmp.icmp_type(), icmp.code());
    let header = match icmp_type {
        t6::ECHO_REQUEST => *Icmp4::new(t4::ECHO_REQUEST, 0).set_rest(icmp.rest()),
        t6::ECHO_REPLY => *Icmp4::new(t4::ECHO_REPLY, 0).set_rest(icmp.rest()),
        t6::DEST_UNREACH => match code {
            u6::NO_ROUTE | u6::BEYOND_SCOPE | u6::ADDRESS => Icmp4::new(t4::DEST_UNREACH, u4::HOST),
            u6::ADMIN_PROHIBITED => Icmp4::new(t4::DEST_UNREACH, u4::HOST_PROHIBITED),
            u6::PORT => Icmp4::new(t4::DEST_UNREACH, u4::PORT),
            _ => return Err(unknown(icmp_type, code)),
        },
        t6::PACKET_TOO_BIG => {
            // the low 16 bits only
            let [_, _, hi, lo] = icmp.mtu().to_be_bytes();
            let mtu = u16::from_be_bytes([hi, lo]);
            *Icmp4::new(t4::DEST_UNREACH, u4::FRAG_NEEDED).set_mtu(mtu)
        }
        t6::TIME_EXCEEDED => Icmp4::new(t4::TIME_EXCEEDED, code),
        t6::PARAM_PROBLEM if code == p6::NEXT_HEADER => Icmp4::new(t4::DEST_UNREACH, u4::PROTOCOL),
        t6::PARAM_PROBLEM => {
            *Icmp4::new(t4::PARAM_PROBLEM, 0).set_pointer(pointer_6to4(icmp.pointer()))
        }
        _ => return Err(unknown(icmp_type, code)),
    };
    Ok(header)
}

/// Translate an `ICMPv4` message to `ICMPv6`. Error messages are truncated to `room` bytes.
pub(super) fn icmp4_to_icmp6(
    env: &TranslateEnv<'_>,
    message: &[u8],
    src: Ipv6Addr,
    dst: Ipv6Addr,
    room: usize,
) -> Result<Vec<u8>, TranslateError> {
    let mut view = PacketView::new(message);
    let (icmp, _) = view.parse::<Icmp4>().map_err(super::parse_failure)?;
    let mut header = icmp4_to_icmp6_header(&icmp)?;
    let rest = view.tail(view.cursor())?;
    let body = if icmp.is_echo() {
        rest.to_vec()
    } else {
        let mut quoted =
            v4_to_v6::translate(env, rest, Depth::Embedded).map_err(TranslateError::embedded)?;
        quoted.truncate(room.saturating_sub(Icmp6::LEN));
        quoted
    };
    header.update_checksum(&Icmp6ChecksumPayload::new(src, dst, &body));

    let mut out = Vec::with_capacity(Icmp6::LEN + body.len());
    emit(&header, &mut out)?;
    out.extend_from_slice(&body);
    Ok(out)
}

/// Translate an `ICMPv6` message to `ICMPv4`.
pub(super) fn icmp6_to_icmp4(
    env: &TranslateEnv<'_>,
    message: &[u8],
    depth: Depth,
) -> Result<Vec<u8>, TranslateError> {
    let mut view = PacketView::new(message);
    let (icmp, _) = view.parse::<Icmp6>().map_err(super::parse_failure)?;
    if depth == Depth::Embedded && icmp.icmp_type() != icmp6::types::ECHO_REQUEST {
        return Err(TranslateError::IncludedErrorInError);
    }
    let mut header = icmp6_to_icmp4_header(&icmp)?;
    let rest = view.tail(view.cursor())?;
    let body = if icmp.is_echo() || rest.len() < Ipv6::LEN {
        rest.to_vec()
    } else {
        v6_to_v4::translate(env, rest, Depth::Embedded).map_err(TranslateError::embedded)?
    };
    header.update_checksum(&body);

    let mut out = Vec::with_capacity(Ipv4::MIN_LEN + body.len());
    emit(&header, &mut out)?;
    out.extend_from_slice(&body);
    Ok(out)
}
