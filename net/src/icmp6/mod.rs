// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `ICMPv6` header type and logic.

use crate::checksum::{Checksum, pseudo_header_checksum_v6};
use crate::ip::NextHeader;
use crate::parse::{DeParse, DeParseError, LengthError, Parse, ParseError};
use std::convert::Infallible;
use std::net::Ipv6Addr;
use std::num::NonZero;

/// `ICMPv6` message types (RFC 4443)
pub mod types {
    /// Destination unreachable
    pub const DEST_UNREACH: u8 = 1;
    /// Packet too big
    pub const PACKET_TOO_BIG: u8 = 2;
    /// Time exceeded
    pub const TIME_EXCEEDED: u8 = 3;
    /// Parameter problem
    pub const PARAM_PROBLEM: u8 = 4;
    /// Echo request
    pub const ECHO_REQUEST: u8 = 128;
    /// Echo reply
    pub const ECHO_REPLY: u8 = 129;
}

/// Destination unreachable codes
pub mod unreach {
    pub const NO_ROUTE: u8 = 0;
    pub const ADMIN_PROHIBITED: u8 = 1;
    pub const BEYOND_SCOPE: u8 = 2;
    pub const ADDRESS: u8 = 3;
    pub const PORT: u8 = 4;
}

/// Parameter problem codes
pub mod param {
    pub const HEADER_FIELD: u8 = 0;
    pub const NEXT_HEADER: u8 = 1;
    pub const OPTION: u8 = 2;
}

/// An `ICMPv6` header: type, code, checksum and the four type-specific bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Icmp6 {
    icmp_type: u8,
    code: u8,
    checksum: u16,
    rest: [u8; 4],
}

/// The payload over which to compute and validate [`Icmp6`] checksums.
#[derive(Debug, Clone, Copy)]
pub struct Icmp6ChecksumPayload<'a> {
    src: Ipv6Addr,
    dst: Ipv6Addr,
    contents: &'a [u8],
}

impl<'a> Icmp6ChecksumPayload<'a> {
    /// The addresses of the enclosing IPv6 header and the message body after the 8 byte header.
    #[must_use]
    pub fn new(src: Ipv6Addr, dst: Ipv6Addr, contents: &'a [u8]) -> Self {
        Self { src, dst, contents }
    }
}

impl Icmp6 {
    /// Length of the header
    pub const LEN: usize = 8;

    /// Offset of the checksum inside the header
    pub const CHECKSUM_OFFSET: usize = 2;

    /// A header with a zero checksum and zero type-specific bytes.
    #[must_use]
    pub fn new(icmp_type: u8, code: u8) -> Self {
        Self {
            icmp_type,
            code,
            checksum: 0,
            rest: [0; 4],
        }
    }

    #[must_use]
    pub fn icmp_type(&self) -> u8 {
        self.icmp_type
    }

    #[must_use]
    pub fn code(&self) -> u8 {
        self.code
    }

    /// The four type-specific bytes following the checksum.
    #[must_use]
    pub fn rest(&self) -> [u8; 4] {
        self.rest
    }

    pub fn set_rest(&mut self, rest: [u8; 4]) -> &mut Self {
        self.rest = rest;
        self
    }

    /// True for echo request and echo reply.
    #[must_use]
    pub fn is_echo(&self) -> bool {
        matches!(self.icmp_type, types::ECHO_REQUEST | types::ECHO_REPLY)
    }

    /// True for the error messages (types below 128).
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.icmp_type < 128
    }

    /// MTU of a "packet too big" message.
    #[must_use]
    pub fn mtu(&self) -> u32 {
        u32::from_be_bytes(self.rest)
    }

    pub fn set_mtu(&mut self, mtu: u32) -> &mut Self {
        self.rest = mtu.to_be_bytes();
        self
    }

    /// Pointer of a "parameter problem" message.
    #[must_use]
    pub fn pointer(&self) -> u32 {
        u32::from_be_bytes(self.rest)
    }

    pub fn set_pointer(&mut self, pointer: u32) -> &mut Self {
        self.rest = pointer.to_be_bytes();
        self
    }

    fn to_bytes(self) -> [u8; 8] {
        let [c0, c1] = self.checksum.to_be_bytes();
        let [r0, r1, r2, r3] = self.rest;
        [self.icmp_type, self.code, c0, c1, r0, r1, r2, r3]
    }
}

impl Checksum for Icmp6 {
    type Payload<'a> = Icmp6ChecksumPayload<'a>;
    type Checksum = u16;

    fn checksum(&self) -> u16 {
        self.checksum
    }

    fn compute_checksum(&self, payload: &Icmp6ChecksumPayload<'_>) -> u16 {
        let mut message = Vec::with_capacity(Icmp6::LEN + payload.contents.len());
        message.extend_from_slice(&Icmp6 { checksum: 0, ..*self }.to_bytes());
        message.extend_from_slice(payload.contents);
        pseudo_header_checksum_v6(payload.src, payload.dst, NextHeader::ICMP6, &message)
    }

    fn set_checksum(&mut self, checksum: u16) -> &mut Self {
        self.checksum = checksum;
        self
    }
}

impl Parse for Icmp6 {
    type Error = Infallible;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<usize>), ParseError<Self::Error>> {
        let Some(bytes) = buf.get(..Icmp6::LEN) else {
            return Err(ParseError::Length(LengthError::new(Icmp6::LEN, buf.len())));
        };
        let header = Self {
            icmp_type: bytes[0],
            code: bytes[1],
            checksum: u16::from_be_bytes([bytes[2], bytes[3]]),
            rest: [bytes[4], bytes[5], bytes[6], bytes[7]],
        };
        Ok((header, NonZero::new(Icmp6::LEN).unwrap_or(NonZero::<usize>::MIN)))
    }
}

impl DeParse for Icmp6 {
    type Error = Infallible;

    fn size(&self) -> NonZero<usize> {
        NonZero::new(Icmp6::LEN).unwrap_or(NonZero::<usize>::MIN)
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<usize>, DeParseError<Self::Error>> {
        let Some(target) = buf.get_mut(..Icmp6::LEN) else {
            return Err(DeParseError::Length(LengthError::new(Icmp6::LEN, buf.len())));
        };
        target.copy_from_slice(&self.to_bytes());
        Ok(self.size())
    }
}

#[cfg(test)]
mod tests {
    use super::{Icmp6, Icmp6ChecksumPayload, types};
    use crate::checksum::{Checksum, pseudo_header_checksum_v6};
    use crate::ip::NextHeader;
    use crate::parse::{DeParse, Parse};
    use std::net::Ipv6Addr;

    #[test]
    fn checksum_matches_etherparse() {
        let src: Ipv6Addr = "2001:db8::1".parse().unwrap();
        let dst: Ipv6Addr = "2001:db8::2".parse().unwrap();
        let payload = b"ping6 payload";
        let mut header = Icmp6::new(types::ECHO_REPLY, 0);
        header.set_rest([0xab, 0xcd, 0x00, 0x07]);
        header.update_checksum(&Icmp6ChecksumPayload::new(src, dst, payload));

        let reference = etherparse::Icmpv6Header::with_checksum(
            etherparse::Icmpv6Type::EchoReply(etherparse::IcmpEchoHeader { id: 0xabcd, seq: 7 }),
            src.octets(),
            dst.octets(),
            payload,
        )
        .unwrap();
        assert_eq!(header.checksum(), reference.checksum);

        let mut message = vec![0u8; 8];
        header.deparse(&mut message).unwrap();
        message.extend_from_slice(payload);
        assert_eq!(
            pseudo_header_checksum_v6(src, dst, NextHeader::ICMP6, &message),
            0
        );
    }

    #[test]
    fn field_accessors() {
        let mut header = Icmp6::new(types::PACKET_TOO_BIG, 0);
        header.set_mtu(1280);
        assert_eq!(header.mtu(), 1280);
        assert!(header.is_error());
        header.set_pointer(0xffff_ffff);
        assert_eq!(header.rest(), [0xff; 4]);

        let mut buf = [0u8; 8];
        header.deparse(&mut buf).unwrap();
        let (back, consumed) = Icmp6::parse(&buf).unwrap();
        assert_eq!(consumed.get(), 8);
        assert_eq!(back, header);
        assert!(!Icmp6::new(types::ECHO_REQUEST, 0).is_error());
    }
}
