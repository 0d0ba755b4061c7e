// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! TCP and UDP header layout, as far as address translation needs it.
//!
//! Translation never rewrites ports, only the checksum that covers the pseudo-header, so the
//! transport headers are handled through offsets into a [`PacketView`].

use crate::buffer::PacketView;
use crate::ip::NextHeader;
use crate::parse::LengthError;

/// Well known DNS port
pub const DNS_PORT: u16 = 53;

/// The transport protocols whose checksum includes the IP pseudo-header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
}

impl Transport {
    /// Map a protocol number to a [`Transport`], if it is one.
    #[must_use]
    pub fn from_next_header(next_header: NextHeader) -> Option<Self> {
        match next_header {
            NextHeader::TCP => Some(Transport::Tcp),
            NextHeader::UDP => Some(Transport::Udp),
            _ => None,
        }
    }

    /// The protocol number of this transport.
    #[must_use]
    pub fn next_header(&self) -> NextHeader {
        match self {
            Transport::Tcp => NextHeader::TCP,
            Transport::Udp => NextHeader::UDP,
        }
    }

    /// Offset of the checksum field from the start of the transport header.
    #[must_use]
    pub fn checksum_offset(&self) -> usize {
        match self {
            Transport::Tcp => 16,
            Transport::Udp => 6,
        }
    }

    /// Length of the header without options.
    #[must_use]
    pub fn min_header_len(&self) -> usize {
        match self {
            Transport::Tcp => 20,
            Transport::Udp => 8,
        }
    }

    /// # Errors
    ///
    /// Fails if `segment` is shorter than two bytes.
    pub fn source_port(segment: &PacketView<'_>) -> Result<u16, LengthError> {
        segment.read_be16(0)
    }

    /// # Errors
    ///
    /// Fails if `segment` is shorter than four bytes.
    pub fn destination_port(segment: &PacketView<'_>) -> Result<u16, LengthError> {
        segment.read_be16(2)
    }

    /// # Errors
    ///
    /// Fails if the checksum field is not inside `segment`.
    pub fn read_checksum(&self, segment: &PacketView<'_>) -> Result<u16, LengthError> {
        segment.read_be16(self.checksum_offset())
    }
}
