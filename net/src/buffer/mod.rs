// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Bounds-checked views over raw packet bytes.
//!
//! [`PacketView`] and [`PacketViewMut`] replace pointer arithmetic over packet buffers: every
//! read or write names an absolute offset (or consumes from a cursor) and fails with a
//! [`LengthError`] instead of reading past the end of the buffer.

use crate::parse::{LengthError, Parse, ParseError};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::num::NonZero;

/// A non-owning, read-only view over a packet with a cursor.
#[derive(Debug, Clone, Copy)]
pub struct PacketView<'buf> {
    inner: &'buf [u8],
    cursor: usize,
}

impl<'buf> PacketView<'buf> {
    /// Create a view over `buf` with the cursor at the start.
    #[must_use]
    pub fn new(buf: &'buf [u8]) -> Self {
        Self {
            inner: buf,
            cursor: 0,
        }
    }

    /// Total number of bytes in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True if the view holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Current cursor position.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes between the cursor and the end of the view.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.inner.len() - self.cursor
    }

    /// The whole underlying slice.
    #[must_use]
    pub fn as_slice(&self) -> &'buf [u8] {
        self.inner
    }

    /// Move the cursor to an absolute position.
    ///
    /// # Errors
    ///
    /// Fails if `offset` is past the end of the view.
    pub fn seek(&mut self, offset: usize) -> Result<(), LengthError> {
        if offset > self.inner.len() {
            return Err(LengthError::new(offset, self.inner.len()));
        }
        self.cursor = offset;
        Ok(())
    }

    /// Move the cursor forward by `n` bytes.
    ///
    /// # Errors
    ///
    /// Fails if fewer than `n` bytes remain.
    pub fn advance(&mut self, n: usize) -> Result<(), LengthError> {
        if n > self.remaining() {
            return Err(LengthError::new(n, self.remaining()));
        }
        self.cursor += n;
        Ok(())
    }

    /// Borrow `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Fails if the range is not contained in the view.
    pub fn slice(&self, offset: usize, len: usize) -> Result<&'buf [u8], LengthError> {
        let end = offset
            .checked_add(len)
            .ok_or(LengthError::new(usize::MAX, self.inner.len()))?;
        self.inner
            .get(offset..end)
            .ok_or(LengthError::new(end, self.inner.len()))
    }

    /// Borrow everything from `offset` to the end of the view.
    ///
    /// # Errors
    ///
    /// Fails if `offset` is past the end of the view.
    pub fn tail(&self, offset: usize) -> Result<&'buf [u8], LengthError> {
        self.inner
            .get(offset..)
            .ok_or(LengthError::new(offset, self.inner.len()))
    }

    /// A new view over the bytes from `offset` to the end, with its own cursor at zero.
    ///
    /// # Errors
    ///
    /// Fails if `offset` is past the end of the view.
    pub fn subview(&self, offset: usize) -> Result<PacketView<'buf>, LengthError> {
        self.tail(offset).map(PacketView::new)
    }

    /// A new view restricted to the first `len` bytes.
    ///
    /// # Errors
    ///
    /// Fails if the view holds fewer than `len` bytes.
    pub fn truncated(&self, len: usize) -> Result<PacketView<'buf>, LengthError> {
        self.slice(0, len).map(PacketView::new)
    }

    /// # Errors
    ///
    /// Fails if `offset` is out of bounds.
    pub fn read_u8(&self, offset: usize) -> Result<u8, LengthError> {
        self.inner
            .get(offset)
            .copied()
            .ok_or(LengthError::new(offset + 1, self.inner.len()))
    }

    /// Read a big endian (network order) `u16`.
    ///
    /// # Errors
    ///
    /// Fails if the two bytes are not in bounds.
    pub fn read_be16(&self, offset: usize) -> Result<u16, LengthError> {
        let bytes = self.array::<2>(offset)?;
        Ok(u16::from_be_bytes(bytes))
    }

    /// Read a big endian (network order) `u32`.
    ///
    /// # Errors
    ///
    /// Fails if the four bytes are not in bounds.
    pub fn read_be32(&self, offset: usize) -> Result<u32, LengthError> {
        let bytes = self.array::<4>(offset)?;
        Ok(u32::from_be_bytes(bytes))
    }

    /// # Errors
    ///
    /// Fails if the four bytes are not in bounds.
    pub fn read_ipv4_addr(&self, offset: usize) -> Result<Ipv4Addr, LengthError> {
        self.array::<4>(offset).map(Ipv4Addr::from)
    }

    /// # Errors
    ///
    /// Fails if the sixteen bytes are not in bounds.
    pub fn read_ipv6_addr(&self, offset: usize) -> Result<Ipv6Addr, LengthError> {
        self.array::<16>(offset).map(Ipv6Addr::from)
    }

    fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N], LengthError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.slice(offset, N)?);
        Ok(out)
    }

    /// Read a byte at the cursor and advance past it.
    ///
    /// # Errors
    ///
    /// Fails if no bytes remain.
    pub fn take_u8(&mut self) -> Result<u8, LengthError> {
        let value = self.read_u8(self.cursor)?;
        self.cursor += 1;
        Ok(value)
    }

    /// Read a big endian `u16` at the cursor and advance past it.
    ///
    /// # Errors
    ///
    /// Fails if fewer than two bytes remain.
    pub fn take_be16(&mut self) -> Result<u16, LengthError> {
        let value = self.read_be16(self.cursor)?;
        self.cursor += 2;
        Ok(value)
    }

    /// Borrow `len` bytes at the cursor and advance past them.
    ///
    /// # Errors
    ///
    /// Fails if fewer than `len` bytes remain.
    pub fn take_slice(&mut self, len: usize) -> Result<&'buf [u8], LengthError> {
        let value = self.slice(self.cursor, len)?;
        self.cursor += len;
        Ok(value)
    }

    /// Parse a header at the cursor and advance past it.
    ///
    /// # Errors
    ///
    /// Returns the header's parse error.
    pub fn parse<T: Parse>(&mut self) -> Result<(T, NonZero<usize>), ParseError<T::Error>> {
        let (value, consumed) = T::parse(&self.inner[self.cursor..])?;
        self.advance(consumed.get()).map_err(ParseError::Length)?;
        Ok((value, consumed))
    }
}

/// A non-owning, writable view over a packet.
#[derive(Debug)]
pub struct PacketViewMut<'buf> {
    inner: &'buf mut [u8],
}

impl<'buf> PacketViewMut<'buf> {
    /// Create a writable view over `buf`.
    #[must_use]
    pub fn new(buf: &'buf mut [u8]) -> Self {
        Self { inner: buf }
    }

    /// Total number of bytes in the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True if the view holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Read-only view over the same bytes.
    #[must_use]
    pub fn as_view(&self) -> PacketView<'_> {
        PacketView::new(self.inner)
    }

    fn range_mut(&mut self, offset: usize, len: usize) -> Result<&mut [u8], LengthError> {
        let available = self.inner.len();
        let end = offset
            .checked_add(len)
            .ok_or(LengthError::new(usize::MAX, available))?;
        self.inner
            .get_mut(offset..end)
            .ok_or(LengthError::new(end, available))
    }

    /// # Errors
    ///
    /// Fails if `offset` is out of bounds.
    pub fn write_u8(&mut self, offset: usize, value: u8) -> Result<(), LengthError> {
        self.range_mut(offset, 1)?[0] = value;
        Ok(())
    }

    /// Write a `u16` in network order.
    ///
    /// # Errors
    ///
    /// Fails if the two bytes are not in bounds.
    pub fn write_be16(&mut self, offset: usize, value: u16) -> Result<(), LengthError> {
        self.write_slice(offset, &value.to_be_bytes())
    }

    /// Write a `u32` in network order.
    ///
    /// # Errors
    ///
    /// Fails if the four bytes are not in bounds.
    pub fn write_be32(&mut self, offset: usize, value: u32) -> Result<(), LengthError> {
        self.write_slice(offset, &value.to_be_bytes())
    }

    /// # Errors
    ///
    /// Fails if the four bytes are not in bounds.
    pub fn write_ipv4_addr(&mut self, offset: usize, addr: Ipv4Addr) -> Result<(), LengthError> {
        self.write_slice(offset, &addr.octets())
    }

    /// # Errors
    ///
    /// Fails if the sixteen bytes are not in bounds.
    pub fn write_ipv6_addr(&mut self, offset: usize, addr: Ipv6Addr) -> Result<(), LengthError> {
        self.write_slice(offset, &addr.octets())
    }

    /// Copy `data` into the view at `offset`.
    ///
    /// # Errors
    ///
    /// Fails if `data` does not fit.
    pub fn write_slice(&mut self, offset: usize, data: &[u8]) -> Result<(), LengthError> {
        self.range_mut(offset, data.len())?.copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{PacketView, PacketViewMut};
    use std::net::Ipv4Addr;

    #[test]
    fn reads_are_bounds_checked() {
        let bytes = [0x45, 0x00, 0x00, 0x1c, 10, 0, 0, 1];
        let view = PacketView::new(&bytes);
        assert_eq!(view.read_u8(0).unwrap(), 0x45);
        assert_eq!(view.read_be16(2).unwrap(), 0x1c);
        assert_eq!(view.read_ipv4_addr(4).unwrap(), Ipv4Addr::new(10, 0, 0, 1));
        let err = view.read_be32(6).unwrap_err();
        assert_eq!(err.expected(), 10);
        assert_eq!(err.actual(), 8);
        assert!(view.read_u8(8).is_err());
        assert!(view.slice(usize::MAX, 2).is_err());
    }

    #[test]
    fn cursor_moves_and_stops_at_the_end() {
        let bytes = [1, 2, 3, 4, 5];
        let mut view = PacketView::new(&bytes);
        assert_eq!(view.take_u8().unwrap(), 1);
        assert_eq!(view.take_be16().unwrap(), 0x0203);
        assert_eq!(view.remaining(), 2);
        assert!(view.take_slice(3).is_err());
        assert_eq!(view.cursor(), 3);
        view.advance(2).unwrap();
        assert_eq!(view.remaining(), 0);
        assert!(view.advance(1).is_err());
        view.seek(1).unwrap();
        assert_eq!(view.subview(view.cursor()).unwrap().as_slice(), &[2, 3, 4, 5]);
        assert!(view.seek(6).is_err());
    }

    #[test]
    fn writes_are_bounds_checked() {
        let mut bytes = [0u8; 6];
        let mut view = PacketViewMut::new(&mut bytes);
        view.write_be16(0, 0xabcd).unwrap();
        view.write_be32(2, 0x0102_0304).unwrap();
        assert!(view.write_u8(6, 1).is_err());
        assert!(view.write_slice(5, &[1, 2]).is_err());
        assert_eq!(view.as_view().read_be16(0).unwrap(), 0xabcd);
        assert_eq!(bytes, [0xab, 0xcd, 1, 2, 3, 4]);
    }
}
