//! Label grid produced by a segmentation run.
//!
//! A [`LabelGrid`] has the same shape as its source image and stores one
//! `u32` label per pixel, row-major. Pixels sharing a label belong to the
//! same connected region.

use std::collections::BTreeMap;

use rayon::prelude::*;

use crate::error::{Error, Result};

/// Row-major grid of `u32` region labels.
#[derive(Clone, PartialEq, Eq)]
pub struct LabelGrid {
    data: Vec<u32>,
    width: u32,
    height: u32,
}

impl LabelGrid {
    /// Wraps row-major labels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BufferSizeMismatch`] if `data.len() != width * height`.
    pub fn new(width: u32, height: u32, data: Vec<u32>) -> Result<Self> {
        if data.len() != width as usize * height as usize {
            return Err(Error::buffer_size_mismatch(width, height, data.len()));
        }
        Ok(Self { data, width, height })
    }

    /// Grid width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Label at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the grid.
    #[inline]
    pub fn label(&self, x: u32, y: u32) -> u32 {
        assert!(x < self.width && y < self.height, "label ({x}, {y}) out of bounds");
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Bounds-checked label access.
    pub fn get(&self, x: u32, y: u32) -> Result<u32> {
        if x >= self.width || y >= self.height {
            return Err(Error::out_of_bounds(x, y, self.width, self.height));
        }
        Ok(self.data[y as usize * self.width as usize + x as usize])
    }

    /// Raw row-major labels.
    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    /// Consumes the grid, returning its labels.
    pub fn into_vec(self) -> Vec<u32> {
        self.data
    }

    /// Iterates rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.data.chunks(self.width.max(1) as usize)
    }

    /// Sorted list of the distinct labels present.
    pub fn distinct_labels(&self) -> Vec<u32> {
        let mut labels = self.data.clone();
        labels.par_sort_unstable();
        labels.dedup();
        labels
    }

    /// Number of distinct regions.
    pub fn region_count(&self) -> usize {
        self.distinct_labels().len()
    }

    /// Pixel count per label.
    pub fn region_sizes(&self) -> BTreeMap<u32, usize> {
        let mut sizes = BTreeMap::new();
        for &label in &self.data {
            *sizes.entry(label).or_insert(0) += 1;
        }
        sizes
    }
}

impl std::fmt::Debug for LabelGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LabelGrid")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl std::fmt::Display for LabelGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let digits = self.data.iter().max().map_or(1, |m| m.to_string().len());
        for row in self.rows() {
            let line: Vec<String> = row.iter().map(|l| format!("{l:>digits$}")).collect();
            writeln!(f, "{}", line.join(" "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_checks_length() {
        assert!(LabelGrid::new(2, 2, vec![0; 4]).is_ok());
        assert!(LabelGrid::new(2, 2, vec![0; 5]).is_err());
    }

    #[test]
    fn test_regions() {
        let grid = LabelGrid::new(3, 2, vec![0, 0, 2, 0, 4, 2]).unwrap();
        assert_eq!(grid.distinct_labels(), vec![0, 2, 4]);
        assert_eq!(grid.region_count(), 3);

        let sizes = grid.region_sizes();
        assert_eq!(sizes[&0], 3);
        assert_eq!(sizes[&2], 2);
        assert_eq!(sizes[&4], 1);
    }

    #[test]
    fn test_label_access() {
        let grid = LabelGrid::new(3, 2, vec![0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(grid.label(2, 1), 5);
        assert!(grid.get(3, 0).is_err());
        assert_eq!(grid.rows().count(), 2);
    }

    #[test]
    fn test_display() {
        let grid = LabelGrid::new(2, 2, vec![0, 10, 3, 10]).unwrap();
        assert_eq!(grid.to_string(), " 0 10\n 3 10\n");
    }
}
