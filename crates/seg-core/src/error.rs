//! Error types for seg-core operations.
//!
//! The [`Error`] enum covers the failure modes of the data model:
//! - Buffer construction (length does not match the declared shape)
//! - Coordinate access outside the grid
//! - Mixing an image and a label grid of different shapes
//!
//! # Usage
//!
//! ```rust
//! use seg_core::{Error, Result};
//!
//! fn check(x: u32, y: u32, width: u32, height: u32) -> Result<()> {
//!     if x >= width || y >= height {
//!         return Err(Error::out_of_bounds(x, y, width, height));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the image and label grid containers.
#[derive(Debug, Error)]
pub enum Error {
    /// Pixel coordinates are outside the grid.
    #[error("pixel ({x}, {y}) out of bounds for grid {width}x{height}")]
    OutOfBounds {
        /// X coordinate that was out of bounds
        x: u32,
        /// Y coordinate that was out of bounds
        y: u32,
        /// Grid width
        width: u32,
        /// Grid height
        height: u32,
    },

    /// Backing buffer length does not match `width * height`.
    #[error("buffer size mismatch for {width}x{height}: expected {expected} elements, got {actual}")]
    BufferSizeMismatch {
        /// Declared width
        width: u32,
        /// Declared height
        height: u32,
        /// `width * height`
        expected: usize,
        /// Actual buffer length
        actual: usize,
    },

    /// Two grids that must share a shape do not.
    #[error("dimension mismatch: {a_width}x{a_height} vs {b_width}x{b_height}")]
    DimensionMismatch {
        /// First grid width
        a_width: u32,
        /// First grid height
        a_height: u32,
        /// Second grid width
        b_width: u32,
        /// Second grid height
        b_height: u32,
    },
}

impl Error {
    /// Creates an [`Error::OutOfBounds`] error.
    #[inline]
    pub fn out_of_bounds(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self::OutOfBounds {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates an [`Error::BufferSizeMismatch`] error.
    #[inline]
    pub fn buffer_size_mismatch(width: u32, height: u32, actual: usize) -> Self {
        Self::BufferSizeMismatch {
            width,
            height,
            expected: width as usize * height as usize,
            actual,
        }
    }

    /// Creates an [`Error::DimensionMismatch`] error.
    #[inline]
    pub fn dimension_mismatch(a: (u32, u32), b: (u32, u32)) -> Self {
        Self::DimensionMismatch {
            a_width: a.0,
            a_height: a.1,
            b_width: b.0,
            b_height: b.1,
        }
    }

    /// Returns `true` if this is a bounds-related error.
    #[inline]
    pub fn is_bounds_error(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }
}
