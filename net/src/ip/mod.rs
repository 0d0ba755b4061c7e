// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Helper types which are common between IPv4 and IPv6

use etherparse::IpNumber;
use std::fmt::{Display, Formatter};

pub mod frag_offset;

pub use frag_offset::FragOffset;

/// Thin wrapper around [`IpNumber`]
///
/// Used both as the IPv4 protocol field and as the IPv6 next header field.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NextHeader(pub(crate) IpNumber);

impl NextHeader {
    /// IPv6 Hop-by-Hop options
    pub const HOP_BY_HOP: NextHeader = NextHeader(IpNumber::IPV6_HEADER_HOP_BY_HOP);
    /// Internet Control Message Protocol (v4)
    pub const ICMP: NextHeader = NextHeader(IpNumber::ICMP);
    /// Transmission Control Protocol
    pub const TCP: NextHeader = NextHeader(IpNumber::TCP);
    /// User Datagram Protocol
    pub const UDP: NextHeader = NextHeader(IpNumber::UDP);
    /// IPv6 encapsulated in IP
    pub const IPV6: NextHeader = NextHeader(IpNumber(41));
    /// IPv6 routing header
    pub const ROUTING: NextHeader = NextHeader(IpNumber::IPV6_ROUTE_HEADER);
    /// IPv6 fragment header
    pub const FRAGMENT: NextHeader = NextHeader(IpNumber::IPV6_FRAGMENTATION_HEADER);
    /// Encapsulating security payload
    pub const ESP: NextHeader = NextHeader(IpNumber(50));
    /// IP authentication header
    pub const AUTH: NextHeader = NextHeader(IpNumber::AUTHENTICATION_HEADER);
    /// Internet Control Message Protocol (v6)
    pub const ICMP6: NextHeader = NextHeader(IpNumber::IPV6_ICMP);
    /// No next header
    pub const NONE: NextHeader = NextHeader(IpNumber(59));
    /// IPv6 destination options
    pub const DEST_OPTS: NextHeader = NextHeader(IpNumber::IPV6_DESTINATION_OPTIONS);

    /// Generate a new [`NextHeader`]
    #[must_use]
    pub const fn new(inner: u8) -> Self {
        Self(IpNumber(inner))
    }

    /// Return the [`NextHeader`] represented as a `u8`
    #[must_use]
    pub const fn as_u8(&self) -> u8 {
        self.0.0
    }

    /// True for the protocols the translator rewrites checksums for.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        *self == NextHeader::TCP || *self == NextHeader::UDP
    }
}

impl From<NextHeader> for IpNumber {
    fn from(value: NextHeader) -> Self {
        value.0
    }
}

impl From<IpNumber> for NextHeader {
    fn from(value: IpNumber) -> Self {
        Self(value)
    }
}

impl From<u8> for NextHeader {
    fn from(value: u8) -> Self {
        Self::new(value)
    }
}

impl Display for NextHeader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            NextHeader::HOP_BY_HOP => write!(f, "hop-by-hop"),
            NextHeader::ICMP => write!(f, "icmp"),
            NextHeader::TCP => write!(f, "tcp"),
            NextHeader::UDP => write!(f, "udp"),
            NextHeader::IPV6 => write!(f, "ipv6-in-ip"),
            NextHeader::ROUTING => write!(f, "routing"),
            NextHeader::FRAGMENT => write!(f, "fragment"),
            NextHeader::ESP => write!(f, "esp"),
            NextHeader::AUTH => write!(f, "ah"),
            NextHeader::ICMP6 => write!(f, "icmpv6"),
            NextHeader::NONE => write!(f, "none"),
            NextHeader::DEST_OPTS => write!(f, "destination-options"),
            other => write!(f, "{}", other.as_u8()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NextHeader;

    #[test]
    fn well_known_values() {
        assert_eq!(NextHeader::HOP_BY_HOP.as_u8(), 0);
        assert_eq!(NextHeader::ICMP.as_u8(), 1);
        assert_eq!(NextHeader::ROUTING.as_u8(), 43);
        assert_eq!(NextHeader::FRAGMENT.as_u8(), 44);
        assert_eq!(NextHeader::AUTH.as_u8(), 51);
        assert_eq!(NextHeader::ICMP6.as_u8(), 58);
        assert_eq!(NextHeader::NONE.as_u8(), 59);
        assert_eq!(NextHeader::DEST_OPTS.as_u8(), 60);
        assert_eq!(NextHeader::from(17u8), NextHeader::UDP);
        assert_eq!(NextHeader::new(200).to_string(), "200");
        assert_eq!(NextHeader::ESP.to_string(), "esp");
    }
}
