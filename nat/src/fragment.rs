// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Splitting of oversized IPv4 datagrams ahead of translation.
//!
//! An IPv4 datagram whose payload is larger than the threshold is cut into IPv4 fragments of at
//! most `threshold` payload bytes, and every fragment is translated and handed to the caller as
//! soon as it is ready. The translated fragments then fit the IPv6 minimum MTU once the larger
//! IPv6 header and the fragment header are added.

use crate::errors::TranslateError;
use crate::translate::{TranslateEnv, emit, parse_failure, translate_4to6};
use net::buffer::{PacketView, PacketViewMut};
use net::checksum::{Checksum, pseudo_header_checksum_v4, udp_wire_checksum};
use net::ip::{FragOffset, NextHeader};
use net::ipv4::Ipv4;
use net::parse::Parse;
use net::transport::Transport;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentEmitter {
    threshold: usize,
}

impl Default for FragmentEmitter {
    fn default() -> Self {
        Self::new(config::TranslatorConfig::DEFAULT_FRAGMENT_THRESHOLD)
    }
}

impl FragmentEmitter {
    /// Fragment payloads are cut on 8 byte boundaries, so `threshold` is rounded down to one.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold: (threshold / 8 * 8).max(8),
        }
    }

    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Translate `packet` to IPv6, splitting it first if its payload is above the threshold.
    ///
    /// Every translated packet goes to `dispatch` as soon as it is built. The first failure stops
    /// the split; packets already dispatched stay dispatched. Returns how many packets were
    /// dispatched.
    pub fn emit(
        &self,
        env: &TranslateEnv<'_>,
        packet: &[u8],
        mut dispatch: impl FnMut(Vec<u8>) -> Result<(), TranslateError>,
    ) -> Result<usize, TranslateError> {
        let (header, consumed) = Ipv4::parse(packet).map_err(parse_failure)?;
        let header_len = consumed.get();
        let payload_len = usize::from(header.total_len())
            .checked_sub(header_len)
            .ok_or(TranslateError::InvalidHeader)?;
        let payload = PacketView::new(packet).slice(header_len, payload_len)?;
        if payload.len() <= self.threshold {
            dispatch(translate_4to6(env, packet)?)?;
            return Ok(1);
        }

        let mut payload = payload.to_vec();
        if header.protocol() == NextHeader::UDP && header.fragment_offset() == FragOffset::ZERO {
            complete_udp_checksum(&header, &mut payload)?;
        }
        debug!(
            "Splitting {} -> {} ({payload_len} bytes, id {})",
            header.source(),
            header.destination(),
            header.identification()
        );

        let chunks = payload.chunks(self.threshold);
        let count = chunks.len();
        let mut offset = header.fragment_offset().bytes();
        for (index, chunk) in chunks.enumerate() {
            let last = index + 1 == count;
            let datagram = fragment(&header, offset, last, chunk)?;
            dispatch(translate_4to6(env, &datagram)?)?;
            trace!("Fragment {index} at offset {offset}: {} bytes", chunk.len());
            offset += chunk.len();
        }
        crate::metrics::fragments(count);
        Ok(count)
    }
}

/// A UDP datagram sent without checksum gets one before it is split, since IPv6 requires it and
/// no single fragment holds enough of the datagram to compute it.
fn complete_udp_checksum(header: &Ipv4, payload: &mut [u8]) -> Result<(), TranslateError> {
    let field = Transport::Udp.checksum_offset();
    let mut view = PacketViewMut::new(payload);
    if view.as_view().read_be16(field)? != 0 {
        return Ok(());
    }
    if header.more_fragments() {
        // the rest of the datagram is in fragments we never see
        return Err(TranslateError::ZeroChecksumFragment);
    }
    let computed = pseudo_header_checksum_v4(
        header.source(),
        header.destination(),
        NextHeader::UDP,
        view.as_view().as_slice(),
    );
    view.write_be16(field, udp_wire_checksum(computed))?;
    Ok(())
}

/// Build one IPv4 fragment carrying `chunk` at byte `offset` of the original datagram.
fn fragment(
    original: &Ipv4,
    offset: usize,
    last: bool,
    chunk: &[u8],
) -> Result<Vec<u8>, TranslateError> {
    let mut header = original.clone();
    let offset = FragOffset::from_bytes(offset).map_err(|_| TranslateError::InvalidHeader)?;
    header
        .set_dont_fragment(false)
        .set_more_fragments(!last || original.more_fragments())
        .set_fragment_offset(offset);
    header
        .set_payload_len(chunk.len())
        .map_err(|_| TranslateError::InvalidHeader)?;
    header.update_checksum(&());

    let mut datagram = Vec::with_capacity(header.header_len() + chunk.len());
    emit(&header, &mut datagram)?;
    datagram.extend_from_slice(chunk);
    Ok(datagram)
}

#[cfg(test)]
mod tests {
    use super::FragmentEmitter;
    use crate::bindings::Bindings;
    use crate::errors::{DispatchError, TranslateError};
    use crate::translate::{TranslateEnv, translate_4to6};
    use net::checksum::{Checksum, pseudo_header_checksum_v4, udp_wire_checksum};
    use net::ip::NextHeader;
    use net::ipv4::Ipv4;
    use net::ipv6::Ipv6;
    use net::parse::{DeParse, Parse};
    use std::net::{Ipv4Addr, Ipv6Addr};
    use std::time::{Duration, Instant};

    const HOST_V4: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 100);
    const HOST_V6: Ipv6Addr = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 0x100);
    const PEER_V4: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
    const PEER_V6: Ipv6Addr = Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1);

    fn bindings() -> Bindings {
        let bindings = Bindings::new(Duration::from_secs(1800));
        bindings.add_mapping(PEER_V4, PEER_V6, Instant::now());
        bindings
    }

    fn env(bindings: &Bindings) -> TranslateEnv<'_> {
        TranslateEnv {
            bindings,
            interface: "bih0",
            local_v4: Some(HOST_V4),
            local_v6: Some(HOST_V6),
            private_addr: None,
            tos_ignore: false,
            now: Instant::now(),
        }
    }

    /// A UDP datagram with `data_len` bytes of data, with or without checksum.
    fn udp_datagram(data_len: usize, with_checksum: bool, more_fragments: bool) -> Vec<u8> {
        let mut segment = Vec::new();
        segment.extend_from_slice(&7000u16.to_be_bytes());
        segment.extend_from_slice(&8000u16.to_be_bytes());
        segment.extend_from_slice(&u16::try_from(8 + data_len).unwrap().to_be_bytes());
        segment.extend_from_slice(&[0, 0]);
        #[allow(clippy::cast_possible_truncation)]
        segment.extend((0..data_len).map(|i| i as u8));
        if with_checksum {
            let checksum = pseudo_header_checksum_v4(HOST_V4, PEER_V4, NextHeader::UDP, &segment);
            segment[6..8].copy_from_slice(&udp_wire_checksum(checksum).to_be_bytes());
        }
        let mut header = Ipv4::new(HOST_V4, PEER_V4, NextHeader::UDP, 64);
        header
            .set_identification(0xbeef)
            .set_dont_fragment(!more_fragments)
            .set_more_fragments(more_fragments);
        header.set_payload_len(segment.len()).unwrap();
        header.update_checksum(&());
        let mut packet = Vec::new();
        header.deparse_into(&mut packet).unwrap();
        packet.extend_from_slice(&segment);
        packet
    }

    fn collect(
        emitter: FragmentEmitter,
        env: &TranslateEnv<'_>,
        packet: &[u8],
    ) -> (Result<usize, TranslateError>, Vec<Vec<u8>>) {
        let mut out = Vec::new();
        let result = emitter.emit(env, packet, |bytes| {
            out.push(bytes);
            Ok(())
        });
        (result, out)
    }

    #[test]
    fn threshold_is_rounded_to_fragment_units() {
        assert_eq!(FragmentEmitter::new(1235).threshold(), 1232);
        assert_eq!(FragmentEmitter::new(3).threshold(), 8);
        assert_eq!(FragmentEmitter::default().threshold(), 1232);
    }

    #[test]
    fn small_packets_are_translated_whole() {
        let bindings = bindings();
        let env = env(&bindings);
        let packet = udp_datagram(100, true, false);
        let (result, out) = collect(FragmentEmitter::default(), &env, &packet);
        assert_eq!(result, Ok(1));
        assert_eq!(out, vec![translate_4to6(&env, &packet).unwrap()]);
    }

    #[test]
    fn large_datagram_is_split() {
        let bindings = bindings();
        let env = env(&bindings);
        let packet = udp_datagram(3000 - 8, true, false);
        let (result, out) = collect(FragmentEmitter::default(), &env, &packet);
        assert_eq!(result, Ok(3));

        let mut reassembled = Vec::new();
        for (index, bytes) in out.iter().enumerate() {
            let (ipv6, _) = Ipv6::parse(bytes).unwrap();
            assert_eq!(ipv6.destination(), PEER_V6);
            assert_eq!(ipv6.next_header(), NextHeader::FRAGMENT);
            assert!(bytes.len() <= 1280);
            let fragment = &bytes[Ipv6::LEN..Ipv6::LEN + 8];
            let field = u16::from_be_bytes([fragment[2], fragment[3]]);
            assert_eq!(usize::from(field >> 3) * 8, index * 1232);
            assert_eq!(field & 1 == 1, index < 2, "more fragments on chunk {index}");
            assert_eq!(&fragment[4..8], [0, 0, 0xbe, 0xef]);
            reassembled.extend_from_slice(&bytes[Ipv6::LEN + 8..]);
        }
        assert_eq!(reassembled.len(), 3000);
        // the first fragment goes out with its checksum zeroed, everything else is untouched
        assert_eq!(&reassembled[6..8], [0, 0]);
        assert_eq!(&reassembled[8..], &packet[Ipv4::MIN_LEN + 8..]);
    }

    #[test]
    fn unfragmented_datagram_without_checksum_is_split() {
        let bindings = bindings();
        let packet = udp_datagram(2000, false, false);
        let (result, out) = collect(FragmentEmitter::default(), &env(&bindings), &packet);
        assert_eq!(result, Ok(2));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn first_fragment_without_checksum_is_refused() {
        let bindings = bindings();
        let packet = udp_datagram(2000, false, true);
        let (result, out) = collect(FragmentEmitter::default(), &env(&bindings), &packet);
        assert_eq!(result, Err(TranslateError::ZeroChecksumFragment));
        assert!(out.is_empty());
    }

    #[test]
    fn failure_keeps_earlier_fragments() {
        let bindings = bindings();
        let packet = udp_datagram(3000, true, false);
        let mut sent = 0;
        let result = FragmentEmitter::default().emit(&env(&bindings), &packet, |_| {
            if sent == 1 {
                return Err(DispatchError::Refused("queue full".to_string()).into());
            }
            sent += 1;
            Ok(())
        });
        assert_eq!(
            result,
            Err(TranslateError::Dispatch(DispatchError::Refused(
                "queue full".to_string()
            )))
        );
        assert_eq!(sent, 1);
    }

    #[test]
    fn unmapped_destination_sends_nothing() {
        let bindings = Bindings::new(Duration::from_secs(1800));
        let packet = udp_datagram(3000, true, false);
        let (result, out) = collect(FragmentEmitter::default(), &env(&bindings), &packet);
        assert_eq!(result, Err(TranslateError::NoMapping(PEER_V4.into())));
        assert!(out.is_empty());
    }
}
