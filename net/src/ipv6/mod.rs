// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IPv6 header type and manipulation

use crate::ip::NextHeader;
use crate::parse::{DeParse, DeParseError, LengthError, Parse, ParseError};
use etherparse::{Ipv6FlowLabel, Ipv6Header};
use std::convert::Infallible;
use std::net::Ipv6Addr;
use std::num::NonZero;

pub mod addr;
pub mod ext;
pub mod fragment;

pub use ext::{ExtensionWalk, ExtensionWalkError};
pub use fragment::Ipv6Fragment;

/// An IPv6 header
#[repr(transparent)]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Ipv6(pub(crate) Ipv6Header);

/// Error which is triggered during parsing of an [`Ipv6`] header.
#[derive(thiserror::Error, Debug)]
pub enum Ipv6Error {
    /// Error triggered when etherparse fails to parse the header.
    #[error(transparent)]
    Invalid(etherparse::err::ipv6::HeaderSliceError),
}

impl Ipv6 {
    /// Length of the fixed IPv6 header
    pub const LEN: usize = 40;

    /// Create a new header with an empty payload and a zero traffic class and flow label.
    #[must_use]
    pub fn new(
        source: Ipv6Addr,
        destination: Ipv6Addr,
        next_header: NextHeader,
        hop_limit: u8,
    ) -> Self {
        Self(Ipv6Header {
            traffic_class: 0,
            flow_label: Ipv6FlowLabel::ZERO,
            payload_length: 0,
            next_header: next_header.into(),
            hop_limit,
            source: source.octets(),
            destination: destination.octets(),
        })
    }

    /// Get the source ip address of the header
    #[must_use]
    pub fn source(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.0.source)
    }

    /// Get the destination ip address of the header
    #[must_use]
    pub fn destination(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.0.destination)
    }

    /// Get the first header following the fixed header
    #[must_use]
    pub fn next_header(&self) -> NextHeader {
        NextHeader(self.0.next_header)
    }

    /// Get the hop limit
    #[must_use]
    pub fn hop_limit(&self) -> u8 {
        self.0.hop_limit
    }

    /// Get the traffic class octet
    #[must_use]
    pub fn traffic_class(&self) -> u8 {
        self.0.traffic_class
    }

    /// Get the 20-bit flow label
    #[must_use]
    pub fn flow_label(&self) -> u32 {
        self.0.flow_label.value()
    }

    /// Length of everything after the fixed header, extension headers included.
    #[must_use]
    pub fn payload_length(&self) -> u16 {
        self.0.payload_length
    }

    /// Set the source ip address
    pub fn set_source(&mut self, source: Ipv6Addr) -> &mut Self {
        self.0.source = source.octets();
        self
    }

    /// Set the destination ip address
    pub fn set_destination(&mut self, destination: Ipv6Addr) -> &mut Self {
        self.0.destination = destination.octets();
        self
    }

    /// Set the next header
    pub fn set_next_header(&mut self, next_header: NextHeader) -> &mut Self {
        self.0.next_header = next_header.into();
        self
    }

    /// Set the hop limit
    pub fn set_hop_limit(&mut self, hop_limit: u8) -> &mut Self {
        self.0.hop_limit = hop_limit;
        self
    }

    /// Set the traffic class
    pub fn set_traffic_class(&mut self, traffic_class: u8) -> &mut Self {
        self.0.traffic_class = traffic_class;
        self
    }

    /// Set the flow label, ignoring bits beyond the low 20.
    pub fn set_flow_label(&mut self, flow_label: u32) -> &mut Self {
        if let Ok(label) = Ipv6FlowLabel::try_new(flow_label & 0x000f_ffff) {
            self.0.flow_label = label;
        }
        self
    }

    /// Set the payload length field
    pub fn set_payload_length(&mut self, payload_length: u16) -> &mut Self {
        self.0.payload_length = payload_length;
        self
    }
}

impl Parse for Ipv6 {
    type Error = Ipv6Error;

    fn parse(buf: &[u8]) -> Result<(Self, NonZero<usize>), ParseError<Self::Error>> {
        let (header, rest) = Ipv6Header::from_slice(buf).map_err(|e| match e {
            etherparse::err::ipv6::HeaderSliceError::Len(len) => {
                ParseError::Length(LengthError::new(len.required_len, len.len))
            }
            content @ etherparse::err::ipv6::HeaderSliceError::Content(_) => {
                ParseError::Invalid(Ipv6Error::Invalid(content))
            }
        })?;
        let consumed = NonZero::new(buf.len() - rest.len())
            .ok_or(ParseError::Length(LengthError::new(Ipv6::LEN, buf.len())))?;
        Ok((Self(header), consumed))
    }
}

impl DeParse for Ipv6 {
    type Error = Infallible;

    fn size(&self) -> NonZero<usize> {
        NonZero::new(Ipv6::LEN).unwrap_or(NonZero::<usize>::MIN)
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

#[cfg(test)]
mod tests {
    use super::Ipv6;
    use crate::ip::NextHeader;
    use crate::parse::{DeParse, Parse, ParseError};

    #[test]
    fn deparse_then_parse() {
        let mut header = Ipv6::new(
            "2001:db8::1".parse().unwrap(),
            "2001:db8::2".parse().unwrap(),
            NextHeader::TCP,
            3,
        );
        header
            .set_traffic_class(0xb8)
            .set_flow_label(0x0012_3456)
            .set_payload_length(20);
        let mut buf = [0u8; 48];
        assert_eq!(header.deparse(&mut buf).unwrap().get(), Ipv6::LEN);
        let (back, consumed) = Ipv6::parse(&buf).unwrap();
        assert_eq!(consumed.get(), Ipv6::LEN);
        assert_eq!(back, header);
        assert_eq!(back.flow_label(), 0x2_3456);
        assert_eq!(back.hop_limit(), 3);
        assert_eq!(back.next_header(), NextHeader::TCP);
    }

    #[test]
    fn short_and_wrong_version() {
        let header = Ipv6::new(
            "2001:db8::1".parse().unwrap(),
            "2001:db8::2".parse().unwrap(),
            NextHeader::UDP,
            64,
        );
        let mut buf = [0u8; 40];
        header.deparse(&mut buf).unwrap();
        assert!(matches!(Ipv6::parse(&buf[..39]), Err(ParseError::Length(_))));
        buf[0] = 0x45;
        assert!(matches!(Ipv6::parse(&buf), Err(ParseError::Invalid(_))));
    }
}
