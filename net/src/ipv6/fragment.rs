// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IPv6 fragment extension header

use crate::buffer::{PacketView, PacketViewMut};
use crate::ip::{FragOffset, NextHeader};
use crate::parse::{DeParse, DeParseError, LengthError, Parse, ParseError};
use etherparse::IpNumber;
use std::convert::Infallible;
use std::num::NonZero;

/// An IPv6 fragment header (RFC 8200 section 4.5)
///
/// ```text
/// | next header | reserved | offset (13 bits) | res (2) | M | identification (32 bits) |
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv6Fragment {
    next_header: NextHeader,
    offset: FragOffset,
    more_fragments: bool,
    identification: u32,
}

impl Ipv6Fragment {
    /// Length of the fragment header
    pub const LEN: usize = 8;

    /// Build a fragment header.
    #[must_use]
    pub fn new(
        next_header: NextHeader,
        offset: FragOffset,
        more_fragments: bool,
        identification: u32,
    ) -> Self {
        Self {
            next_header,
            offset,
            more_fragments,
            identification,
        }
    }

    /// Header following the fragment header
    #[must_use]
    pub fn next_header(&self) -> NextHeader {
        self.next_header
    }

    /// Offset of this fragment's data in the original payload
    #[must_use]
    pub fn offset(&self) -> FragOffset {
        self.offset
    }

    /// The M flag
    #[must_use]
    pub fn more_fragments(&self) -> bool {
        self.more_fragments
    }

    /// The 32-bit identification
    #[must_use]
    pub fn identification(&self) -> u32 {
        self.identification
    }

    /// True if this is the one and only fragment (offset zero, no more fragments).
    #[must_use]
    pub fn is_atomic(&self) -> bool {
        !self.more_fragments() && self.offset() == FragOffset::ZERO
    }
}

impl Parse for Ipv6Fragment {
    type Error = Infallible;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<usize>), ParseError<Self::Error>> {
        let view = PacketView::new(buf);
        let next_header = NextHeader::from(view.read_u8(0).map_err(ParseError::Length)?);
        let field = view.read_be16(2).map_err(ParseError::Length)?;
        let identification = view.read_be32(4).map_err(ParseError::Length)?;
        // 13 bits once shifted, always in range
        let offset = FragOffset::new(field >> 3).unwrap_or(FragOffset::ZERO);
        let consumed = NonZero::new(Ipv6Fragment::LEN).unwrap_or(NonZero::<usize>::MIN);
        Ok((
            Self {
                next_header,
                offset,
                more_fragments: field & 1 == 1,
                identification,
            },
            consumed,
        ))
    }
}

impl DeParse for Ipv6Fragment {
    type Error = Infallible;

    fn size(&self) -> NonZero<usize> {
        NonZero::new(Ipv6Fragment::LEN).unwrap_or(NonZero::<usize>::MIN)
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<usize>, DeParseError<Self::Error>> {
        let size = self.size();
        let Some(target) = buf.get_mut(..size.get()) else {
            return Err(DeParseError::Length(LengthError::new(size.get(), buf.len())));
        };
        let field = self.offset.value() << 3 | u16::from(self.more_fragments);
        let mut view = PacketViewMut::new(target);
        view.write_u8(0, IpNumber::from(self.next_header).0)
            .and_then(|()| view.write_u8(1, 0))
            .and_then(|()| view.write_be16(2, field))
            .and_then(|()| view.write_be32(4, self.identification))
            .map_err(DeParseError::Length)?;
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::Ipv6Fragment;
    use crate::ip::{FragOffset, NextHeader};
    use crate::parse::{DeParse, Parse};

    #[test]
    fn wire_layout() {
        let frag = Ipv6Fragment::new(
            NextHeader::UDP,
            FragOffset::new(154).unwrap(),
            true,
            0x0000_beef,
        );
        let mut buf = [0u8; 8];
        frag.deparse(&mut buf).unwrap();
        // offset << 3 | M
        assert_eq!(buf, [17, 0, 0x04, 0xd1, 0, 0, 0xbe, 0xef]);
        let (back, consumed) = Ipv6Fragment::parse(&buf).unwrap();
        assert_eq!(consumed.get(), 8);
        assert_eq!(back, frag);
        assert!(!back.is_atomic());
        assert!(Ipv6Fragment::parse(&buf[..7]).is_err());
    }

    #[test]
    fn last_fragment_at_highest_offset() {
        let buf = [6, 0, 0xff, 0xf8, 0x80, 0, 0, 1];
        let (frag, _) = Ipv6Fragment::parse(&buf).unwrap();
        assert_eq!(frag.next_header(), NextHeader::TCP);
        assert_eq!(frag.offset().value(), 8191);
        assert!(!frag.more_fragments());
        assert_eq!(frag.identification(), 0x8000_0001);
        let mut out = [0xffu8; 8];
        frag.deparse(&mut out).unwrap();
        assert_eq!(out, buf);
    }
}
