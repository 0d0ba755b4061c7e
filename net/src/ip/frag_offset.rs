// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! IP fragmentation offset

use etherparse::IpFragOffset;

/// A 13-bit number which describes the position of the packet payload relative to the
/// original (fragmented) payload, in units of 8 bytes.
///
/// The same field layout is used by the IPv4 header and the IPv6 fragment header.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FragOffset(pub(crate) IpFragOffset);

/// Errors which can occur when creating a [`FragOffset`]
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
pub enum IllegalFragOffset {
    /// Error returned when the value won't fit in a 13-bit field
    #[error("Value too large for 13-bit frag-offset: {0}")]
    TooBig(u16),
}

impl FragOffset {
    /// Offset of an unfragmented packet or of the first fragment
    pub const ZERO: FragOffset = FragOffset(IpFragOffset::ZERO);

    /// Map a raw 13-bit value (in 8 byte units) to a [`FragOffset`]
    ///
    /// # Errors
    ///
    /// Returns an [`IllegalFragOffset`] if the value is larger than 13-bits
    pub fn new(raw: u16) -> Result<FragOffset, IllegalFragOffset> {
        Ok(FragOffset(
            IpFragOffset::try_new(raw).map_err(|_| IllegalFragOffset::TooBig(raw))?,
        ))
    }

    /// Map a byte offset to a [`FragOffset`].
    ///
    /// # Errors
    ///
    /// Returns an [`IllegalFragOffset`] if the offset is not a multiple of 8 or is too large.
    pub fn from_bytes(bytes: usize) -> Result<FragOffset, IllegalFragOffset> {
        let raw = u16::try_from(bytes / 8).map_err(|_| IllegalFragOffset::TooBig(u16::MAX))?;
        if bytes % 8 != 0 {
            return Err(IllegalFragOffset::TooBig(raw));
        }
        FragOffset::new(raw)
    }

    /// The raw 13-bit value, in units of 8 bytes.
    #[must_use]
    pub fn value(&self) -> u16 {
        self.0.value()
    }

    /// The offset in bytes.
    #[must_use]
    pub fn bytes(&self) -> usize {
        usize::from(self.0.value()) * 8
    }
}
