//! Label grid presentation.
//!
//! Maps every region label to an RGB colour so a finished [`LabelGrid`]
//! can be viewed or written as an ordinary image. Colours come from a hash
//! of the label mixed with a seed, so the same grid and seed always render
//! identically.

use rayon::prelude::*;

use crate::labels::LabelGrid;

/// Deterministic label to colour mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LabelPalette {
    /// Mixed into every label before hashing.
    pub seed: u64,
}

impl LabelPalette {
    /// Palette with an explicit seed.
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Colour assigned to `label`.
    pub fn color(&self, label: u32) -> [u8; 3] {
        let h = mix(label as u64 ^ self.seed);
        [(h >> 16) as u8, (h >> 32) as u8, (h >> 48) as u8]
    }

    /// Packed RGB8 rendering of `labels`, row-major, 3 bytes per pixel.
    pub fn colorize(&self, labels: &LabelGrid) -> Vec<u8> {
        let mut out = vec![0u8; labels.as_slice().len() * 3];
        out.par_chunks_mut(3)
            .zip(labels.as_slice().par_iter())
            .for_each(|(px, &label)| px.copy_from_slice(&self.color(label)));
        out
    }
}

// splitmix64 finalizer
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_label_same_color() {
        let grid = LabelGrid::new(3, 1, vec![7, 7, 9]).unwrap();
        let rgb = LabelPalette::default().colorize(&grid);
        assert_eq!(rgb.len(), 9);
        assert_eq!(rgb[0..3], rgb[3..6]);
        assert_ne!(rgb[0..3], rgb[6..9]);
    }

    #[test]
    fn test_seed_changes_colors() {
        let a = LabelPalette::new(1).color(42);
        let b = LabelPalette::new(2).color(42);
        assert_ne!(a, b);
        assert_eq!(a, LabelPalette::new(1).color(42));
    }
}
