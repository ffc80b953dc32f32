//! Errors raised by the collections.
//!
//! Both variants signal a broken caller contract. The operation that detects
//! them returns before building anything, so there is never a partial result.

/// An invalid index or range was passed to a [`Vector`](crate::Vector) or a
/// [`Slice`](crate::Slice).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum Error {
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("invalid range {start}..{stop} for length {len}")]
    InvalidRange { start: usize, stop: usize, len: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Checks that `index` is a valid index into something of length `len`.
pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(Error::IndexOutOfBounds { index, len })
    }
}

/// Checks that `start..stop` is a valid sub-range of `0..len`.
pub(crate) fn check_range(start: usize, stop: usize, len: usize) -> Result<()> {
    if start <= stop && stop <= len {
        Ok(())
    } else {
        Err(Error::InvalidRange { start, stop, len })
    }
}
