//! # seg-core
//!
//! Core types for label-propagation image segmentation.
//!
//! - [`GrayImage`] - Read-only 8-bit single-channel input image
//! - [`LabelGrid`] - Per-pixel `u32` region labels, same shape as the input
//! - [`LabelPalette`] - Deterministic label to RGB colour mapping
//! - [`Error`], [`Result`] - Container errors
//!
//! ## Crate Structure
//!
//! This crate holds no device code. The compute side lives in
//! `seg-compute`, which depends on it:
//!
//! ```text
//! seg-core (this crate)
//!    ^
//!    |
//!    +-- seg-compute (surfaces, kernels, engine)
//!    +-- seg-cli (file I/O, presentation)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod image;
pub mod labels;
pub mod palette;

pub use error::{Error, Result};
pub use image::GrayImage;
pub use labels::LabelGrid;
pub use palette::LabelPalette;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::image::GrayImage;
    pub use crate::labels::LabelGrid;
    pub use crate::palette::LabelPalette;
}
