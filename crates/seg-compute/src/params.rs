//! Same-region predicate parameters shared by every surface.

use bytemuck::{Pod, Zeroable};

/// Pixel neighbourhood used by label propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connectivity {
    /// Left, right, up, down.
    #[default]
    Four,
    /// Four plus the diagonals.
    Eight,
}

const FOUR: [(i32, i32); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
const EIGHT: [(i32, i32); 8] = [
    (-1, -1), (0, -1), (1, -1),
    (-1, 0),           (1, 0),
    (-1, 1),  (0, 1),  (1, 1),
];

impl Connectivity {
    /// Neighbour offsets `(dx, dy)`.
    pub fn offsets(self) -> &'static [(i32, i32)] {
        match self {
            Self::Four => &FOUR,
            Self::Eight => &EIGHT,
        }
    }

    /// Neighbour count, as passed to the device kernels.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::Four => 4,
            Self::Eight => 8,
        }
    }
}

impl std::str::FromStr for Connectivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "4" | "four" => Ok(Self::Four),
            "8" | "eight" => Ok(Self::Eight),
            other => Err(format!("unknown connectivity '{other}' (expected 4 or 8)")),
        }
    }
}

impl std::fmt::Display for Connectivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-connected", self.as_u32())
    }
}

/// Parameters of the propagation kernel's same-region predicate.
///
/// Two neighbouring pixels belong to the same region iff their intensities
/// differ by at most `tolerance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KernelParams {
    /// Neighbourhood.
    pub connectivity: Connectivity,
    /// Maximum intensity difference; `0` means strict equality.
    pub tolerance: u8,
}

impl KernelParams {
    /// Strict-equality, 4-connected parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the neighbourhood.
    pub fn with_connectivity(mut self, connectivity: Connectivity) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Sets the intensity tolerance.
    pub fn with_tolerance(mut self, tolerance: u8) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Same-region predicate.
    #[inline]
    pub fn same_region(&self, a: u8, b: u8) -> bool {
        a.abs_diff(b) <= self.tolerance
    }

    /// Device-side layout of these parameters for a `width x height` grid.
    pub fn to_uniform(&self, width: u32, height: u32) -> ParamsUniform {
        ParamsUniform {
            width,
            height,
            connectivity: self.connectivity.as_u32(),
            tolerance: self.tolerance as u32,
        }
    }
}

/// Params uniform: `[width, height, connectivity, tolerance]`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct ParamsUniform {
    pub width: u32,
    pub height: u32,
    pub connectivity: u32,
    pub tolerance: u32,
}
