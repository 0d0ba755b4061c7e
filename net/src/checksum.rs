// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Internet checksum arithmetic and the [`Checksum`] trait.
//!
//! All functions here are pure: they take the bytes to sum and return the result, so they are
//! safe to call concurrently from any number of translations.

use crate::ip::NextHeader;
use std::fmt::Debug;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// A trait for checksum calculation and manipulation.
///
/// This trait is used to calculate and manipulate checksums in various headers.
pub trait Checksum {
    /// The payload type for the header.
    ///
    /// This is used to calculate the checksum.
    type Payload<'a>: ?Sized
    where
        Self: 'a;
    /// The checksum type.
    type Checksum: Eq + Copy + Sized + Debug;

    /// Get the checksum value from the header
    fn checksum(&self) -> Self::Checksum;

    /// Compute the checksum value from the header and payload
    fn compute_checksum(&self, payload: &Self::Payload<'_>) -> Self::Checksum;

    /// Set the checksum value in the header.
    ///
    /// The validity of the checksum is not checked.
    fn set_checksum(&mut self, checksum: Self::Checksum) -> &mut Self;

    /// Validate the checksum value in the header.
    ///
    /// # Errors
    ///
    /// Returns a [`ChecksumError`] if the checksum is invalid.
    fn validate_checksum(
        &self,
        payload: &Self::Payload<'_>,
    ) -> Result<Self::Checksum, ChecksumError<Self>> {
        let expected = self.compute_checksum(payload);
        let actual = self.checksum();
        if expected == actual {
            Ok(expected)
        } else {
            Err(ChecksumError { expected, actual })
        }
    }

    /// Update the checksum value in the header.
    ///
    /// The post-condition of this function is that the checksum is valid.
    fn update_checksum(&mut self, payload: &Self::Payload<'_>) -> &mut Self {
        let checksum = self.compute_checksum(payload);
        self.set_checksum(checksum)
    }
}

/// An error resulting from a checksum mismatch.
#[derive(Debug, thiserror::Error)]
#[error("checksum mismatch: expected {expected:?}, actual {actual:?}")]
pub struct ChecksumError<T: Checksum + ?Sized> {
    expected: T::Checksum,
    actual: T::Checksum,
}

/// Pseudo-header addresses were not of the same family.
#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
#[error("pseudo-header addresses of different families: {0} and {1}")]
pub struct MixedFamilies(pub IpAddr, pub IpAddr);

/// Add `data` to a running (unfolded) one's complement sum.
///
/// Bytes are taken as big endian 16-bit words; an odd trailing byte is padded with zero.
#[must_use]
pub fn ones_complement_sum(initial: u32, data: &[u8]) -> u32 {
    let mut sum = u64::from(initial);
    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum += u64::from(u16::from_be_bytes([word[0], word[1]]));
    }
    if let [last] = words.remainder() {
        sum += u64::from(u16::from_be_bytes([*last, 0]));
    }
    fold_u64(sum)
}

fn fold_u64(mut sum: u64) -> u32 {
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    #[allow(clippy::cast_possible_truncation)] // folded to 16 bits above
    {
        sum as u32
    }
}

/// Fold a running sum to 16 bits and complement it.
#[must_use]
pub fn fold(sum: u32) -> u16 {
    #[allow(clippy::cast_possible_truncation)] // fold_u64 returns at most 0xffff
    let folded = fold_u64(u64::from(sum)) as u16;
    !folded
}

/// The RFC 1071 internet checksum of `data`.
#[must_use]
pub fn internet_checksum(data: &[u8]) -> u16 {
    fold(ones_complement_sum(0, data))
}

fn upper_layer_len(payload: &[u8]) -> u32 {
    u32::try_from(payload.len()).unwrap_or(u32::MAX)
}

/// Checksum of `payload` under the IPv4 pseudo-header (RFC 768 / RFC 793).
///
/// The checksum field inside `payload` is summed as found, so callers computing a fresh checksum
/// zero it first while callers verifying a checksum expect a result of zero.
#[must_use]
pub fn pseudo_header_checksum_v4(
    src: Ipv4Addr,
    dst: Ipv4Addr,
    protocol: NextHeader,
    payload: &[u8],
) -> u16 {
    let mut sum = ones_complement_sum(0, &src.octets());
    sum = ones_complement_sum(sum, &dst.octets());
    sum += u32::from(protocol.as_u8());
    sum += upper_layer_len(payload) & 0xffff;
    fold(ones_complement_sum(sum, payload))
}

/// Checksum of `payload` under the IPv6 pseudo-header (RFC 8200 section 8.1).
#[must_use]
pub fn pseudo_header_checksum_v6(
    src: Ipv6Addr,
    dst: Ipv6Addr,
    protocol: NextHeader,
    payload: &[u8],
) -> u16 {
    let mut sum = ones_complement_sum(0, &src.octets());
    sum = ones_complement_sum(sum, &dst.octets());
    sum = ones_complement_sum(sum, &upper_layer_len(payload).to_be_bytes());
    sum += u32::from(protocol.as_u8());
    fold(ones_complement_sum(sum, payload))
}

/// Checksum of `payload` under the pseudo-header of the address family of `src` and `dst`.
///
/// # Errors
///
/// Returns [`MixedFamilies`] if `src` and `dst` are not of the same family.
pub fn pseudo_header_checksum(
    src: IpAddr,
    dst: IpAddr,
    protocol: NextHeader,
    payload: &[u8],
) -> Result<u16, MixedFamilies> {
    match (src, dst) {
        (IpAddr::V4(s), IpAddr::V4(d)) => Ok(pseudo_header_checksum_v4(s, d, protocol, payload)),
        (IpAddr::V6(s), IpAddr::V6(d)) => Ok(pseudo_header_checksum_v6(s, d, protocol, payload)),
        _ => Err(MixedFamilies(src, dst)),
    }
}

/// Incrementally update `checksum` after the bytes `old` were replaced by `new` (RFC 1624).
///
/// `old` and `new` need not have the same length, which lets an IPv4 pseudo-header address pair
/// be swapped for an IPv6 one. Both must have an even length.
#[must_use]
pub fn adjust_checksum(checksum: u16, old: &[u8], new: &[u8]) -> u16 {
    let mut sum = u32::from(!checksum);
    for word in old.chunks(2) {
        let value = match word {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [hi] => u16::from_be_bytes([*hi, 0]),
            _ => 0,
        };
        sum += u32::from(!value);
    }
    sum = ones_complement_sum(sum, new);
    fold(sum)
}

/// Map a computed UDP checksum to its transmitted form: zero means "no checksum" on the wire, so
/// a computed zero is sent as all ones.
#[must_use]
pub fn udp_wire_checksum(computed: u16) -> u16 {
    if computed == 0 { 0xffff } else { computed }
}
