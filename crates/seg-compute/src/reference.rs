//! CPU reference kernels.
//!
//! These are the authoritative definitions of the three per-pixel rules.
//! The CPU surface runs them directly; the WGSL kernels are validated
//! against them.
//!
//! Every function reads one immutable snapshot and writes a disjoint
//! output, so the row-parallel rayon split is race-free.

use rayon::prelude::*;
use seg_core::{GrayImage, LabelGrid};

use crate::params::KernelParams;

/// Seeds `out` with the row-major pixel index: `label(x, y) = y * width + x`.
pub fn init_labels(width: u32, out: &mut [u32]) {
    let w = width.max(1) as usize;
    out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, label) in row.iter_mut().enumerate() {
            *label = (y * w + x) as u32;
        }
    });
}

/// One relaxation step: each pixel takes the minimum label over itself and
/// its same-region neighbours in `src`.
pub fn propagate_min_label(
    image: &[u8],
    width: u32,
    height: u32,
    params: &KernelParams,
    src: &[u32],
    dst: &mut [u32],
) {
    let (w, h) = (width as usize, height as usize);
    let offsets = params.connectivity.offsets();

    dst.par_chunks_mut(w.max(1)).enumerate().for_each(|(y, row)| {
        for (x, out) in row.iter_mut().enumerate() {
            let idx = y * w + x;
            let value = image[idx];
            let mut best = src[idx];
            for &(dx, dy) in offsets {
                let (Some(nx), Some(ny)) = (
                    x.checked_add_signed(dx as isize),
                    y.checked_add_signed(dy as isize),
                ) else {
                    continue;
                };
                if nx >= w || ny >= h {
                    continue;
                }
                let n = ny * w + nx;
                if params.same_region(value, image[n]) {
                    best = best.min(src[n]);
                }
            }
            *out = best;
        }
    });
}

/// Per-element inequality indicator: `diff[i] = (a[i] != b[i]) as u32`.
pub fn compare_grids(a: &[u32], b: &[u32], diff: &mut [u32]) {
    diff.par_iter_mut()
        .zip(a.par_iter().zip(b.par_iter()))
        .for_each(|(d, (x, y))| *d = u32::from(x != y));
}

/// Checks that `labels` is a fixpoint of the propagation rule for `image`:
/// one more propagate + compare round leaves every pixel unchanged.
pub fn verify_fixpoint(image: &GrayImage, labels: &LabelGrid, params: &KernelParams) -> bool {
    if image.dimensions() != labels.dimensions() {
        return false;
    }
    let (w, h) = image.dimensions();
    let mut next = vec![0u32; labels.as_slice().len()];
    propagate_min_label(image.as_slice(), w, h, params, labels.as_slice(), &mut next);
    let mut diff = vec![0u32; next.len()];
    compare_grids(labels.as_slice(), &next, &mut diff);
    diff.par_iter().all(|&d| d == 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Connectivity;

    #[test]
    fn test_init_labels_unique() {
        let mut labels = vec![0u32; 12];
        init_labels(4, &mut labels);
        assert_eq!(labels, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_propagate_respects_boundaries() {
        // 0 0 | 9 9
        let image = [0u8, 0, 9, 9];
        let src = [0u32, 1, 2, 3];
        let mut dst = [0u32; 4];
        propagate_min_label(&image, 4, 1, &KernelParams::new(), &src, &mut dst);
        assert_eq!(dst, [0, 0, 2, 2]);
    }

    #[test]
    fn test_propagate_single_step() {
        // A 1x5 strip moves the minimum one pixel per step.
        let image = [5u8; 5];
        let src = [4u32, 3, 2, 1, 0];
        let mut dst = [0u32; 5];
        propagate_min_label(&image, 5, 1, &KernelParams::new(), &src, &mut dst);
        assert_eq!(dst, [3, 2, 1, 0, 0]);
    }

    #[test]
    fn test_propagate_diagonal_only_with_eight() {
        // 1 0
        // 0 1
        let image = [1u8, 0, 0, 1];
        let src = [0u32, 1, 2, 3];
        let mut dst = [0u32; 4];

        propagate_min_label(&image, 2, 2, &KernelParams::new(), &src, &mut dst);
        assert_eq!(dst, [0, 1, 2, 3]);

        let eight = KernelParams::new().with_connectivity(Connectivity::Eight);
        propagate_min_label(&image, 2, 2, &eight, &src, &mut dst);
        assert_eq!(dst, [0, 1, 1, 0]);
    }

    #[test]
    fn test_propagate_is_monotone() {
        let image: Vec<u8> = (0..64).map(|i| (i % 3) as u8).collect();
        let mut labels = vec![0u32; 64];
        init_labels(8, &mut labels);
        let mut next = vec![0u32; 64];
        for _ in 0..10 {
            propagate_min_label(&image, 8, 8, &KernelParams::new(), &labels, &mut next);
            assert!(next.iter().zip(&labels).all(|(n, l)| n <= l));
            labels.copy_from_slice(&next);
        }
    }

    #[test]
    fn test_compare() {
        let mut diff = [9u32; 3];
        compare_grids(&[1, 2, 3], &[1, 0, 3], &mut diff);
        assert_eq!(diff, [0, 1, 0]);
    }

    #[test]
    fn test_verify_fixpoint() {
        let image = GrayImage::from_rows(&[[1u8, 1], [2, 2]]).unwrap();
        let good = LabelGrid::new(2, 2, vec![0, 0, 2, 2]).unwrap();
        let bad = LabelGrid::new(2, 2, vec![0, 1, 2, 2]).unwrap();
        assert!(verify_fixpoint(&image, &good, &KernelParams::new()));
        assert!(!verify_fixpoint(&image, &bad, &KernelParams::new()));
    }
}
