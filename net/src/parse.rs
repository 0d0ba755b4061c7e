// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Header parsing and serialization traits

use std::num::NonZero;

pub trait Parse: Sized {
    type Error: core::error::Error;
    /// Parse from the start of a buffer.
    ///
    /// Returns the parsed value and the number of bytes it occupied.
    ///
    /// # Errors
    ///
    /// Returns an error in the event that parsing fails.
    fn parse(buf: &[u8]) -> Result<(Self, NonZero<usize>), ParseError<Self::Error>>;
}

pub trait DeParse {
    type Error;

    /// Number of bytes [`DeParse::deparse`] will write.
    fn size(&self) -> NonZero<usize>;

    /// Write a data structure (e.g., a packet header) to a buffer.
    ///
    /// Returns the number of bytes written in the event of success.
    ///
    /// # Errors
    ///
    /// Will return an error if there is not enough space in the buffer
    /// or if serialization fails from some other (implementation-dependent) reason.
    fn deparse(&self, buf: &mut [u8]) -> Result<NonZero<usize>, DeParseError<Self::Error>>;

    /// Serialize to the end of a growable buffer.
    ///
    /// # Errors
    ///
    /// Same as [`DeParse::deparse`].
    fn deparse_into(&self, out: &mut Vec<u8>) -> Result<NonZero<usize>, DeParseError<Self::Error>> {
        let start = out.len();
        out.resize(start + self.size().get(), 0);
        self.deparse(&mut out[start..])
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("expected at least {expected} bytes, got {actual}")]
pub struct LengthError {
    pub(crate) expected: NonZero<usize>,
    pub(crate) actual: usize,
}

impl LengthError {
    /// Build a [`LengthError`] for a read or write which needed `expected` bytes.
    ///
    /// A zero `expected` is reported as one byte.
    #[must_use]
    pub fn new(expected: usize, actual: usize) -> Self {
        Self {
            expected: NonZero::new(expected).unwrap_or(NonZero::<usize>::MIN),
            actual,
        }
    }

    /// Number of bytes the access needed
    #[must_use]
    pub fn expected(&self) -> usize {
        self.expected.get()
    }

    /// Number of bytes that were available
    #[must_use]
    pub fn actual(&self) -> usize {
        self.actual
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ParseError<E: core::error::Error> {
    #[error(transparent)]
    Length(LengthError),
    #[error(transparent)]
    Invalid(E),
}

#[derive(thiserror::Error, Debug)]
pub enum DeParseError<E> {
    #[error(transparent)]
    Length(LengthError),
    #[error(transparent)]
    Invalid(E),
}
