//! Device capacity limits.

use crate::{ComputeError, ComputeResult};

/// Per-pixel bytes of one run: image + two label grids + diff, all `u32`.
pub const BYTES_PER_PIXEL: u64 = 4 * 4;

/// Largest pixel count a run accepts: every pixel needs a distinct `u32` label.
pub const MAX_PIXELS: u64 = u32::MAX as u64;

/// Compute device resource limits.
#[derive(Debug, Clone)]
pub struct DeviceLimits {
    /// Maximum grid width or height a single dispatch can cover.
    pub max_grid_dim: u32,
    /// Maximum size of one storage buffer in bytes.
    pub max_buffer_bytes: u64,
    /// Memory budget for one run in bytes.
    pub available_memory: u64,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_grid_dim: 65535 * 16,
            max_buffer_bytes: 128 * 1024 * 1024, // 128 MB
            available_memory: 2 * 1024 * 1024 * 1024, // 2 GB
        }
    }
}

impl DeviceLimits {
    /// Bytes one run needs for a `width x height` image.
    pub fn required_bytes(width: u32, height: u32) -> u64 {
        width as u64 * height as u64 * BYTES_PER_PIXEL
    }

    /// Check that a `width x height` run fits.
    ///
    /// # Errors
    ///
    /// [`ComputeError::ImageTooLarge`] naming the limit that was exceeded.
    pub fn check_image(&self, width: u32, height: u32) -> ComputeResult<()> {
        let too_large = |required: u64, limit: u64| ComputeError::ImageTooLarge {
            width,
            height,
            required,
            limit,
        };

        let pixels = width as u64 * height as u64;
        if pixels > MAX_PIXELS {
            return Err(too_large(pixels, MAX_PIXELS));
        }
        if width > self.max_grid_dim || height > self.max_grid_dim {
            return Err(too_large(width.max(height) as u64, self.max_grid_dim as u64));
        }
        let per_buffer = pixels * 4;
        if per_buffer > self.max_buffer_bytes {
            return Err(too_large(per_buffer, self.max_buffer_bytes));
        }
        let total = Self::required_bytes(width, height);
        if total > self.available_memory {
            return Err(too_large(total, self.available_memory));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits() {
        let limits = DeviceLimits::default();
        assert!(limits.check_image(1920, 1080).is_ok());
    }

    #[test]
    fn test_buffer_limit() {
        let limits = DeviceLimits {
            max_buffer_bytes: 1024,
            ..Default::default()
        };
        assert!(limits.check_image(16, 16).is_ok());
        let err = limits.check_image(17, 16).unwrap_err();
        assert!(matches!(err, ComputeError::ImageTooLarge { limit: 1024, .. }));
    }

    #[test]
    fn test_memory_limit() {
        let limits = DeviceLimits {
            available_memory: DeviceLimits::required_bytes(10, 10),
            ..Default::default()
        };
        assert!(limits.check_image(10, 10).is_ok());
        assert!(limits.check_image(11, 10).is_err());
    }

    #[test]
    fn test_label_space_limit() {
        let limits = DeviceLimits {
            max_grid_dim: u32::MAX,
            max_buffer_bytes: u64::MAX,
            available_memory: u64::MAX,
        };
        assert!(limits.check_image(65536, 65535).is_ok());

        let err = limits.check_image(65536, 65537).unwrap_err();
        assert!(matches!(
            err,
            ComputeError::ImageTooLarge { required: 4_295_032_832, limit: MAX_PIXELS, .. }
        ));
        assert!(limits.check_image(u32::MAX, 2).is_err());
    }

    #[test]
    fn test_dimension_limit() {
        let limits = DeviceLimits {
            max_grid_dim: 64,
            ..Default::default()
        };
        assert!(limits.check_image(65, 1).is_err());
    }
}
