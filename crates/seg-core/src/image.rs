//! Single-channel 8-bit input image.
//!
//! [`GrayImage`] is the read-only input of a segmentation run. Pixels are
//! stored row-major, top-to-bottom, one byte per pixel:
//!
//! ```text
//! Memory: [p(0,0) p(1,0) ... p(W-1,0)]  <- Row 0
//!         [p(0,1) p(1,1) ... p(W-1,1)]  <- Row 1
//!         ...
//! ```
//!
//! # Usage
//!
//! ```rust
//! use seg_core::GrayImage;
//!
//! let img = GrayImage::from_fn(4, 2, |x, _y| if x < 2 { 10 } else { 200 });
//! assert_eq!(img.pixel(0, 1), 10);
//! assert_eq!(img.pixel(3, 0), 200);
//! ```

use crate::error::{Error, Result};

/// Immutable grayscale image with 8-bit samples.
#[derive(Clone, PartialEq, Eq)]
pub struct GrayImage {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl GrayImage {
    /// Creates an image from row-major samples.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BufferSizeMismatch`] if `data.len() != width * height`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(Error::buffer_size_mismatch(width, height, data.len()));
        }
        Ok(Self { data, width, height })
    }

    /// Creates an image where every pixel has the same intensity.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            data: vec![value; width as usize * height as usize],
            width,
            height,
        }
    }

    /// Creates an image by evaluating `f(x, y)` for each pixel.
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> Self
    where
        F: FnMut(u32, u32) -> u8,
    {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self { data, width, height }
    }

    /// Builds an image from rows of equal length.
    ///
    /// Handy for small hand-written fixtures.
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self> {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |r| r.as_ref().len()) as u32;
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for row in rows {
            data.extend_from_slice(row.as_ref());
        }
        Self::new(width, height, data)
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.data.len()
    }

    /// `true` when either dimension is zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Raw row-major samples.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Sample at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the image.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> u8 {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Bounds-checked sample access.
    pub fn get(&self, x: u32, y: u32) -> Result<u8> {
        if x >= self.width || y >= self.height {
            return Err(Error::out_of_bounds(x, y, self.width, self.height));
        }
        Ok(self.data[y as usize * self.width as usize + x as usize])
    }

    /// One row of samples.
    pub fn row(&self, y: u32) -> &[u8] {
        let w = self.width as usize;
        let start = y as usize * w;
        &self.data[start..start + w]
    }
}

impl std::fmt::Debug for GrayImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrayImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_length() {
        assert!(GrayImage::new(3, 3, vec![0; 9]).is_ok());
        let err = GrayImage::new(3, 3, vec![0; 8]).unwrap_err();
        assert!(matches!(err, Error::BufferSizeMismatch { expected: 9, actual: 8, .. }));
    }

    #[test]
    fn test_from_fn_layout() {
        let img = GrayImage::from_fn(3, 2, |x, y| (y * 10 + x) as u8);
        assert_eq!(img.as_slice(), &[0, 1, 2, 10, 11, 12]);
        assert_eq!(img.row(1), &[10, 11, 12]);
    }

    #[test]
    fn test_from_rows() {
        let img = GrayImage::from_rows(&[[1u8, 2], [3, 4]]).unwrap();
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.pixel(1, 1), 4);
        assert!(GrayImage::from_rows(&[vec![1u8, 2], vec![3]]).is_err());
    }

    #[test]
    fn test_get_out_of_bounds() {
        let img = GrayImage::filled(2, 2, 7);
        assert_eq!(img.get(1, 1).unwrap(), 7);
        assert!(img.get(2, 0).unwrap_err().is_bounds_error());
    }

    #[test]
    fn test_empty() {
        assert!(GrayImage::filled(0, 5, 0).is_empty());
        assert!(!GrayImage::filled(1, 1, 0).is_empty());
    }
}
