// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IPv4 header type and manipulation

use crate::checksum::Checksum;
use crate::ip::{FragOffset, NextHeader};
use crate::parse::{DeParse, DeParseError, LengthError, Parse, ParseError};
use etherparse::{IpDscp, IpEcn, Ipv4Header};
use std::convert::Infallible;
use std::net::Ipv4Addr;
use std::num::NonZero;

pub mod addr;

/// An IPv4 header
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ipv4(pub(crate) Ipv4Header);

/// Error describing illegal length in an IPv4 header
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
#[error(
    "Invalid IPv4 length requested: {requested}, max is {max} when considering all options and headers"
)]
pub struct Ipv4LengthError {
    requested: usize,
    max: usize,
}

/// Error which is triggered during parsing of an [`Ipv4`] header.
#[derive(thiserror::Error, Debug)]
pub enum Ipv4Error {
    /// Error triggered when etherparse fails to parse the header.
    #[error(transparent)]
    Invalid(etherparse::err::ipv4::HeaderSliceError),
}

impl Ipv4 {
    /// The minimum length of an IPv4 header (i.e., a header with no options)
    pub const MIN_LEN: usize = 20;

    /// The maximum length of an IPv4 header (i.e., a header with full options)
    pub const MAX_LEN: usize = 60;

    /// Offset of the header checksum field
    pub const CHECKSUM_OFFSET: usize = 10;

    /// Create a new option-less IPv4 header with an empty payload and no flags set.
    #[must_use]
    pub fn new(source: Ipv4Addr, destination: Ipv4Addr, protocol: NextHeader, ttl: u8) -> Self {
        let mut header = Ipv4Header {
            time_to_live: ttl,
            protocol: protocol.into(),
            source: source.octets(),
            destination: destination.octets(),
            dont_fragment: false,
            ..Ipv4Header::default()
        };
        // an empty payload always fits
        let _ = header.set_payload_len(0);
        Self(header)
    }

    /// Get the source ip address of the header
    #[must_use]
    pub fn source(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.0.source)
    }

    /// Get the destination ip address of the header
    #[must_use]
    pub fn destination(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.0.destination)
    }

    /// Get the options for this header (as a byte slice)
    #[must_use]
    pub fn options(&self) -> &[u8] {
        self.0.options.as_slice()
    }

    /// Get the next layer protocol which follows this header.
    #[must_use]
    pub fn protocol(&self) -> NextHeader {
        NextHeader(self.0.protocol)
    }

    /// Length of the header (includes options) in bytes.
    ///
    /// <div class="warning">
    /// The returned value is in bytes (not in units of 32 bits as per the IHL field).
    /// </div>
    #[must_use]
    pub fn header_len(&self) -> usize {
        self.0.header_len()
    }

    /// Value of total length ip header field
    #[must_use]
    pub fn total_len(&self) -> u16 {
        self.0.total_len
    }

    /// Length of the payload as claimed by the total length field.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        usize::from(self.0.total_len).saturating_sub(self.header_len())
    }

    /// The number of routing hops the packet is allowed to take.
    #[must_use]
    pub fn ttl(&self) -> u8 {
        self.0.time_to_live
    }

    /// The full type-of-service octet (DSCP and ECN).
    #[must_use]
    pub fn tos(&self) -> u8 {
        (self.0.dscp.value() << 2) | self.0.ecn.value()
    }

    /// Returns true if the "don't fragment" bit is set in this header.
    #[must_use]
    pub fn dont_fragment(&self) -> bool {
        self.0.dont_fragment
    }

    /// Returns true if the "more-fragments" bit is set in this header.
    #[must_use]
    pub fn more_fragments(&self) -> bool {
        self.0.more_fragments
    }

    /// Offset of the payload relative to the original datagram.
    #[must_use]
    pub fn fragment_offset(&self) -> FragOffset {
        FragOffset(self.0.fragment_offset)
    }

    /// True if this header belongs to any fragment of a larger datagram.
    #[must_use]
    pub fn is_fragment(&self) -> bool {
        self.more_fragments() || self.fragment_offset() != FragOffset::ZERO
    }

    /// Return the headers "identification".
    #[must_use]
    pub fn identification(&self) -> u16 {
        self.0.identification
    }

    /// Set the source ip of the header.
    pub fn set_source(&mut self, source: Ipv4Addr) -> &mut Self {
        self.0.source = source.octets();
        self
    }

    /// Set the destination ip address for this header.
    pub fn set_destination(&mut self, dest: Ipv4Addr) -> &mut Self {
        self.0.destination = dest.octets();
        self
    }

    /// Set the next layer protocol.
    pub fn set_protocol(&mut self, protocol: NextHeader) -> &mut Self {
        self.0.protocol = protocol.into();
        self
    }

    /// Set the header's time to live
    pub fn set_ttl(&mut self, ttl: u8) -> &mut Self {
        self.0.time_to_live = ttl;
        self
    }

    /// Set the full type-of-service octet.
    pub fn set_tos(&mut self, tos: u8) -> &mut Self {
        if let Ok(dscp) = IpDscp::try_new(tos >> 2) {
            self.0.dscp = dscp;
        }
        if let Ok(ecn) = IpEcn::try_new(tos & 0b11) {
            self.0.ecn = ecn;
        }
        self
    }

    /// Set the "identification" used to reassemble fragments.
    pub fn set_identification(&mut self, id: u16) -> &mut Self {
        self.0.identification = id;
        self
    }

    /// Set the "don't fragment" bit of the header
    pub fn set_dont_fragment(&mut self, dont_fragment: bool) -> &mut Self {
        self.0.dont_fragment = dont_fragment;
        self
    }

    /// Set the "more-fragments" flag
    pub fn set_more_fragments(&mut self, more_fragments: bool) -> &mut Self {
        self.0.more_fragments = more_fragments;
        self
    }

    /// Set the fragment offset
    pub fn set_fragment_offset(&mut self, fragment_offset: FragOffset) -> &mut Self {
        self.0.fragment_offset = fragment_offset.0;
        self
    }

    /// Set the raw total length field, regardless of the actual payload size.
    pub fn set_total_len(&mut self, total_len: u16) -> &mut Self {
        self.0.total_len = total_len;
        self
    }

    /// Set the length _of the payload_ of the ipv4 packet.
    ///
    /// This method will adjust the total length of the header to account for options and the length
    /// of this header.
    ///
    /// This method _will not_ update the checksum of the header.
    ///
    /// # Errors
    ///
    /// This method returns [`Ipv4LengthError`] if the value is too big
    pub fn set_payload_len(&mut self, payload_len: usize) -> Result<(), Ipv4LengthError> {
        self.0
            .set_payload_len(payload_len)
            .map_err(|err| Ipv4LengthError {
                requested: payload_len + self.header_len(),
                max: err.max_allowed,
            })
    }
}

impl Checksum for Ipv4 {
    type Payload<'a>
        = ()
    where
        Self: 'a;
    type Checksum = u16;

    fn checksum(&self) -> u16 {
        self.0.header_checksum
    }

    fn compute_checksum(&self, _payload: &()) -> u16 {
        self.0.calc_header_checksum()
    }

    fn set_checksum(&mut self, checksum: u16) -> &mut Self {
        self.0.header_checksum = checksum;
        self
    }
}

impl Parse for Ipv4 {
    type Error = Ipv4Error;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<usize>), ParseError<Self::Error>> {
        let (header, rest) = Ipv4Header::from_slice(buf).map_err(|e| match e {
            etherparse::err::ipv4::HeaderSliceError::Len(len) => {
                ParseError::Length(LengthError::new(len.required_len, len.len))
            }
            content @ etherparse::err::ipv4::HeaderSliceError::Content(_) => {
                ParseError::Invalid(Ipv4Error::Invalid(content))
            }
        })?;
        let consumed = NonZero::new(buf.len() - rest.len())
            .ok_or(ParseError::Length(LengthError::new(Ipv4::MIN_LEN, buf.len())))?;
        Ok((Self(header), consumed))
    }
}

impl DeParse for Ipv4 {
    type Error = Infallible;

    fn size(&self) -> NonZero<usize> {
        NonZero::new(self.header_len()).unwrap_or(NonZero::<usize>::MIN)
    }

    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<usize>, DeParseError<Self::Error>> {
        let size = self.size();
        let Some(target) = buf.get_mut(..size.get()) else {
            return Err(DeParseError::Length(LengthError::new(size.get(), buf.len())));
        };
        target.copy_from_slice(&self.0.to_bytes());
        Ok(size)
    }
}
