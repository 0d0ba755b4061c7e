// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `ICMPv4` header type and logic.

use crate::checksum::{Checksum, fold, ones_complement_sum};
use crate::parse::{DeParse, DeParseError, LengthError, Parse, ParseError};
use std::convert::Infallible;
use std::num::NonZero;

/// `ICMPv4` message types
pub mod types {
    /// Echo reply
    pub const ECHO_REPLY: u8 = 0;
    /// Destination unreachable
    pub const DEST_UNREACH: u8 = 3;
    /// Echo request
    pub const ECHO_REQUEST: u8 = 8;
    /// Time exceeded
    pub const TIME_EXCEEDED: u8 = 11;
    /// Parameter problem
    pub const PARAM_PROBLEM: u8 = 12;
}

/// Destination unreachable codes (RFC 792, RFC 1122, RFC 1812)
pub mod unreach {
    pub const NET: u8 = 0;
    pub const HOST: u8 = 1;
    pub const PROTOCOL: u8 = 2;
    pub const PORT: u8 = 3;
    pub const FRAG_NEEDED: u8 = 4;
    pub const SOURCE_ROUTE_FAILED: u8 = 5;
    pub const NET_UNKNOWN: u8 = 6;
    pub const HOST_UNKNOWN: u8 = 7;
    pub const HOST_ISOLATED: u8 = 8;
    pub const NET_PROHIBITED: u8 = 9;
    pub const HOST_PROHIBITED: u8 = 10;
    pub const NET_TOS: u8 = 11;
    pub const HOST_TOS: u8 = 12;
    pub const ADMIN_PROHIBITED: u8 = 13;
}

/// An `ICMPv4` header: type, code, checksum and the four type-specific bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Icmp4 {
    icmp_type: u8,
    code: u8,
    checksum: u16,
    rest: [u8; 4],
}

impl Icmp4 {
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

    /// Next-hop MTU of a "fragmentation needed" message (RFC 1191).
    #[must_use]
    pub fn mtu(&self) -> u16 {
        u16::from_be_bytes([self.rest[2], self.rest[3]])
    }

    pub fn set_mtu(&mut self, mtu: u16) -> &mut Self {
        let [hi, lo] = mtu.to_be_bytes();
        self.rest = [0, 0, hi, lo];
        self
    }

    /// Pointer of a parameter problem message.
    #[must_use]
    pub fn pointer(&self) -> u8 {
        self.rest[0]
    }

    pub fn set_pointer(&mut self, pointer: u8) -> &mut Self {
        self.rest = [pointer, 0, 0, 0];
        self
    }

    fn to_bytes(self) -> [u8; 8] {
        let [c0, c1] = self.checksum.to_be_bytes();
        let [r0, r1, r2, r3] = self.rest;
        [self.icmp_type, self.code, c0, c1, r0, r1, r2, r3]
    }
}

impl Checksum for Icmp4 {
    type Payload<'a> = [u8];
    type Checksum = u16;

    fn checksum(&self) -> u16 {
        self.checksum
    }

    /// `ICMPv4` checksums cover the message only, no pseudo-header.
    fn compute_checksum(&self, payload: &[u8]) -> u16 {
        let mut header = self.to_bytes();
        header[Icmp4::CHECKSUM_OFFSET] = 0;
        header[Icmp4::CHECKSUM_OFFSET + 1] = 0;
        fold(ones_complement_sum(ones_complement_sum(0, &header), payload))
    }

    fn set_checksum(&mut self, checksum: u16) -> &mut Self {
        self.checksum = checksum;
        self
    }
}

impl Parse for Icmp4 {
    type Error = Infallible;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<usize>), ParseError<Self::Error>> {
        let Some(bytes) = buf.get(..Icmp4::LEN) else {
            return Err(ParseError::Length(LengthError::new(Icmp4::LEN, buf.len())));
        };
        let header = Self {
            icmp_type: bytes[0],
            code: bytes[1],
            checksum: u16::from_be_bytes([bytes[2], bytes[3]]),
            rest: [bytes[4], bytes[5], bytes[6], bytes[7]],
        };
        Ok((header, NonZero::new(Icmp4::LEN).unwrap_or(NonZero::<usize>::MIN)))
    }
}

impl DeParse for Icmp4 {
    type Error = Infallible;

    fn size(&self) -> NonZero<usize> {
        NonZero::new(Icmp4::LEN).unwrap_or(NonZero::<usize>::MIN)
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<usize>, DeParseError<Self::Error>> {
        let Some(target) = buf.get_mut(..Icmp4::LEN) else {
            return Err(DeParseError::Length(LengthError::new(Icmp4::LEN, buf.len())));
        };
        target.copy_from_slice(&self.to_bytes());
        Ok(self.size())
    }
}

/// Checksum over a complete `ICMPv4` message, ignoring whatever its checksum field holds.
#[must_use]
pub fn message_checksum(message: &[u8]) -> u16 {
    let field = Icmp4::CHECKSUM_OFFSET;
    let before = message.get(..field).unwrap_or(message);
    let after = message.get(field + 2..).unwrap_or(&[]);
    // the skipped field is one aligned word, so both halves keep their alignment
    fold(ones_complement_sum(ones_complement_sum(0, before), after))
}
