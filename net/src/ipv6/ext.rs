// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Walk over the IPv6 extension header chain.
//!
//! Only the headers that can be translated to IPv4 are accepted. Hop-by-Hop (first position
//! only) and Destination Options are skipped, a Routing header is skipped only when it has no
//! segments left, and a single Fragment header is decoded. The walk stops at ICMPv6, TCP, UDP or
//! "no next header".

use crate::buffer::PacketView;
use crate::ip::NextHeader;
use crate::ipv6::fragment::Ipv6Fragment;
use crate::parse::LengthError;
use tracing::trace;

/// Result of a successful walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionWalk {
    /// The upper layer protocol found at the end of the chain
    pub upper: NextHeader,
    /// Number of extension header bytes consumed
    pub len: usize,
    /// The fragment header, if the chain had one
    pub fragment: Option<Ipv6Fragment>,
}

/// Reasons the chain cannot be translated.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionWalkError {
    /// ESP, AH, IPv6-in-IPv6, a misplaced Hop-by-Hop header or an unknown value
    #[error("unsupported extension header {0}")]
    Unsupported(NextHeader),
    /// Routing header which still has segments to visit
    #[error("routing header with {0} segments left")]
    SegmentsLeft(u8),
    /// Truncated or repeated fragment header
    #[error("malformed fragment header")]
    MalformedFragment,
    /// Chain runs past the end of the packet
    #[error(transparent)]
    Length(#[from] LengthError),
}

impl ExtensionWalk {
    /// Walk the chain starting with `first`, over the bytes following the fixed IPv6 header.
    ///
    /// # Errors
    ///
    /// See [`ExtensionWalkError`].
    pub fn walk(first: NextHeader, payload: &[u8]) -> Result<Self, ExtensionWalkError> {
        let mut view = PacketView::new(payload);
        let mut next = first;
        let mut fragment = None;
        loop {
            match next {
                NextHeader::TCP | NextHeader::UDP | NextHeader::ICMP6 | NextHeader::NONE => {
                    return Ok(Self {
                        upper: next,
                        len: view.cursor(),
                        fragment,
                    });
                }
                NextHeader::HOP_BY_HOP if view.cursor() != 0 => {
                    return Err(ExtensionWalkError::Unsupported(next));
                }
                NextHeader::HOP_BY_HOP | NextHeader::DEST_OPTS => {
                    next = skip_options(&mut view)?;
                }
                NextHeader::ROUTING => {
                    let segments_left = view.read_u8(view.cursor() + 3)?;
                    if segments_left != 0 {
                        return Err(ExtensionWalkError::SegmentsLeft(segments_left));
                    }
                    next = skip_options(&mut view)?;
                }
                NextHeader::FRAGMENT => {
                    if fragment.is_some() {
                        return Err(ExtensionWalkError::MalformedFragment);
                    }
                    let (header, _) = view
                        .parse::<Ipv6Fragment>()
                        .map_err(|_| ExtensionWalkError::MalformedFragment)?;
                    next = header.next_header();
                    fragment = Some(header);
                }
                other => return Err(ExtensionWalkError::Unsupported(other)),
            }
            trace!("extension header walk at offset {}, next {next}", view.cursor());
        }
    }
}

/// Skip a header using the generic `(next header, length in 8 octet units - 1)` layout.
fn skip_options(view: &mut PacketView<'_>) -> Result<NextHeader, LengthError> {
    let start = view.cursor();
    let next = view.read_u8(start)?;
    let len = (usize::from(view.read_u8(start + 1)?) + 1) * 8;
    view.advance(len)?;
    Ok(NextHeader::new(next))
}

#[cfg(test)]
mod tests {
    use super::{ExtensionWalk, ExtensionWalkError};
    use crate::ip::NextHeader;

    fn options(next: NextHeader) -> Vec<u8> {
        vec![next.as_u8(), 0, 1, 4, 0, 0, 0, 0]
    }

    fn routing(next: NextHeader, segments_left: u8) -> Vec<u8> {
        vec![next.as_u8(), 0, 0, segments_left, 0, 0, 0, 0]
    }

    fn fragment(next: NextHeader) -> Vec<u8> {
        vec![next.as_u8(), 0, 0x00, 0x09, 0, 0, 0x12, 0x34]
    }

    #[test]
    fn no_extensions() {
        let walk = ExtensionWalk::walk(NextHeader::TCP, &[0u8; 20]).unwrap();
        assert_eq!(walk.upper, NextHeader::TCP);
        assert_eq!(walk.len, 0);
        assert!(walk.fragment.is_none());
    }

    #[test]
    fn skips_options_and_decodes_fragment() {
        let mut chain = options(NextHeader::DEST_OPTS);
        chain.extend(options(NextHeader::ROUTING));
        chain.extend(routing(NextHeader::FRAGMENT, 0));
        chain.extend(fragment(NextHeader::UDP));
        chain.extend([0u8; 8]);
        let walk = ExtensionWalk::walk(NextHeader::HOP_BY_HOP, &chain).unwrap();
        assert_eq!(walk.upper, NextHeader::UDP);
        assert_eq!(walk.len, 32);
        let frag = walk.fragment.unwrap();
        assert_eq!(frag.offset().value(), 1);
        assert!(frag.more_fragments());
        assert_eq!(frag.identification(), 0x1234);
    }

    #[test]
    fn routing_with_segments_left_is_rejected() {
        let chain = routing(NextHeader::TCP, 2);
        assert_eq!(
            ExtensionWalk::walk(NextHeader::ROUTING, &chain),
            Err(ExtensionWalkError::SegmentsLeft(2))
        );
    }

    #[test]
    fn unsupported_headers() {
        for next in [
            NextHeader::ESP,
            NextHeader::AUTH,
            NextHeader::IPV6,
            NextHeader::ICMP,
            NextHeader::new(253),
        ] {
            assert_eq!(
                ExtensionWalk::walk(next, &[0u8; 16]),
                Err(ExtensionWalkError::Unsupported(next))
            );
        }
        // hop-by-hop after another extension header
        let chain = options(NextHeader::HOP_BY_HOP);
        assert_eq!(
            ExtensionWalk::walk(NextHeader::DEST_OPTS, &chain),
            Err(ExtensionWalkError::Unsupported(NextHeader::HOP_BY_HOP))
        );
    }

    #[test]
    fn malformed_fragments() {
        let mut twice = fragment(NextHeader::FRAGMENT);
        twice.extend(fragment(NextHeader::UDP));
        assert_eq!(
            ExtensionWalk::walk(NextHeader::FRAGMENT, &twice),
            Err(ExtensionWalkError::MalformedFragment)
        );
        assert_eq!(
            ExtensionWalk::walk(NextHeader::FRAGMENT, &[17, 0, 0]),
            Err(ExtensionWalkError::MalformedFragment)
        );
    }

    #[test]
    fn truncated_options() {
        let chain = vec![NextHeader::UDP.as_u8(), 1, 0, 0];
        assert!(matches!(
            ExtensionWalk::walk(NextHeader::DEST_OPTS, &chain),
            Err(ExtensionWalkError::Length(_))
        ));
    }

    #[test]
    fn no_next_header_ends_the_walk() {
        let chain = options(NextHeader::NONE);
        let walk = ExtensionWalk::walk(NextHeader::DEST_OPTS, &chain).unwrap();
        assert_eq!(walk.upper, NextHeader::NONE);
        assert_eq!(walk.len, 8);
    }
}
