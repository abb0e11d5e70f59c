//! Voxel grids and volumes.
//!
//! A [`Grid`] is a dense `f32` lattice with its sampling descriptor and
//! summary statistics. Binary masks derived from a grid (lattice segments,
//! threshold segments) share its [`GridSpace`] but own a fresh buffer.

mod mask;

use glam::Vec3;
pub use mask::threshold_mask;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::VolsegError;

/// Shape and placement of a voxel lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpace {
    /// Voxel counts along x, y, z.
    pub dimensions: [usize; 3],
    /// World position of voxel (0, 0, 0).
    pub origin: Vec3,
    /// Edge lengths of one voxel.
    pub voxel_size: Vec3,
}

impl GridSpace {
    /// Unit-sized lattice at the origin.
    #[must_use]
    pub fn new(dimensions: [usize; 3]) -> Self {
        Self {
            dimensions,
            origin: Vec3::ZERO,
            voxel_size: Vec3::ONE,
        }
    }

    /// Total number of voxels.
    #[must_use]
    pub fn voxel_count(&self) -> usize {
        self.dimensions.iter().product()
    }

    /// Linear offset of voxel `(i, j, k)`; x varies fastest.
    #[must_use]
    pub fn data_offset(&self, i: usize, j: usize, k: usize) -> usize {
        let [nx, ny, _] = self.dimensions;
        i + nx * (j + ny * k)
    }
}

/// Summary statistics of a grid's values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridStats {
    /// Minimum value.
    pub min: f64,
    /// Maximum value.
    pub max: f64,
    /// Mean value.
    pub mean: f64,
    /// Standard deviation.
    pub sigma: f64,
}

impl GridStats {
    /// Fixed statistics of binary masks. Masks are only consumed as
    /// isosurface inputs, so these are constants rather than derived.
    pub const MASK: Self = Self {
        min: 0.0,
        max: 1.0,
        mean: 0.0,
        sigma: 1.0,
    };

    /// Compute statistics over `data`. Empty data yields all zeros.
    #[must_use]
    pub fn compute(data: &[f32]) -> Self {
        if data.is_empty() {
            return Self {
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                sigma: 0.0,
            };
        }
        let n = data.len() as f64;
        let (mut min, mut max, mut sum) = (f64::INFINITY, f64::NEG_INFINITY, 0.0);
        for &v in data {
            let v = f64::from(v);
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        let mean = sum / n;
        let variance = data
            .iter()
            .map(|&v| (f64::from(v) - mean).powi(2))
            .sum::<f64>()
            / n;
        Self {
            min,
            max,
            mean,
            sigma: variance.sqrt(),
        }
    }
}

/// Dense voxel grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    space: GridSpace,
    stats: GridStats,
    data: Vec<f32>,
}

impl Grid {
    /// Create a grid, checking that `data` covers every voxel.
    pub fn new(
        space: GridSpace,
        stats: GridStats,
        data: Vec<f32>,
    ) -> Result<Self, VolsegError> {
        if data.len() != space.voxel_count() {
            return Err(VolsegError::Decode(format!(
                "grid {:?} needs {} values, got {}",
                space.dimensions,
                space.voxel_count(),
                data.len()
            )));
        }
        Ok(Self { space, stats, data })
    }

    /// Create a grid with statistics computed from `data`.
    pub fn from_data(
        space: GridSpace,
        data: Vec<f32>,
    ) -> Result<Self, VolsegError> {
        let stats = GridStats::compute(&data);
        Self::new(space, stats, data)
    }

    /// Binary mask over `space` with [`GridStats::MASK`].
    ///
    /// `data` must have been produced by scanning a grid of this space.
    pub(crate) fn binary_mask(space: GridSpace, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), space.voxel_count());
        Self {
            space,
            stats: GridStats::MASK,
            data,
        }
    }

    /// Sampling descriptor.
    #[must_use]
    pub fn space(&self) -> &GridSpace {
        &self.space
    }

    /// Value statistics.
    #[must_use]
    pub fn stats(&self) -> &GridStats {
        &self.stats
    }

    /// Voxel values, x fastest.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of voxels.
    #[must_use]
    pub fn voxel_count(&self) -> usize {
        self.data.len()
    }

    /// Value at voxel `(i, j, k)`.
    #[must_use]
    pub fn value(&self, i: usize, j: usize, k: usize) -> Option<f32> {
        let [nx, ny, nz] = self.space.dimensions;
        if i >= nx || j >= ny || k >= nz {
            return None;
        }
        self.data.get(self.space.data_offset(i, j, k)).copied()
    }
}

/// A named grid, the unit the scene graph renders.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    /// Label shown for the volume node.
    pub name: String,
    /// Voxel data.
    pub grid: Grid,
}

impl Volume {
    /// Wrap a grid.
    #[must_use]
    pub fn new(name: impl Into<String>, grid: Grid) -> Self {
        Self {
            name: name.into(),
            grid,
        }
    }
}

/// Isosurface threshold, either raw or in standard deviations from the mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum IsoValue {
    /// Raw voxel value.
    Absolute(f64),
    /// `mean + value * sigma`.
    Relative(f64),
}

impl IsoValue {
    /// Raw threshold for a grid with `stats`.
    #[must_use]
    pub fn absolute(self, stats: &GridStats) -> f64 {
        match self {
            Self::Absolute(v) => v,
            Self::Relative(r) => stats.mean + r * stats.sigma,
        }
    }

    /// Threshold in standard deviations for a grid with `stats`.
    #[must_use]
    pub fn relative(self, stats: &GridStats) -> f64 {
        match self {
            Self::Relative(r) => r,
            Self::Absolute(v) if stats.sigma > 0.0 => {
                (v - stats.mean) / stats.sigma
            }
            Self::Absolute(_) => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_x_fastest() {
        let space = GridSpace::new([2, 3, 4]);
        assert_eq!(space.voxel_count(), 24);
        assert_eq!(space.data_offset(1, 0, 0), 1);
        assert_eq!(space.data_offset(0, 1, 0), 2);
        assert_eq!(space.data_offset(0, 0, 1), 6);
        assert_eq!(space.data_offset(1, 2, 3), 23);
    }

    #[test]
    fn grid_rejects_wrong_length() {
        let err = Grid::from_data(GridSpace::new([2, 2, 1]), vec![0.0; 3]);
        assert!(matches!(err, Err(VolsegError::Decode(_))));
    }

    #[test]
    fn value_lookup() {
        let grid =
            Grid::from_data(GridSpace::new([2, 2, 1]), vec![0.0, 1.0, 2.0, 3.0])
                .unwrap();
        assert_eq!(grid.value(1, 1, 0), Some(3.0));
        assert_eq!(grid.value(2, 0, 0), None);
    }

    #[test]
    fn stats_of_simple_data() {
        let s = GridStats::compute(&[1.0, 3.0]);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 3.0);
        assert_eq!(s.mean, 2.0);
        assert_eq!(s.sigma, 1.0);
    }

    #[test]
    fn iso_value_conversions() {
        let stats = GridStats {
            min: 0.0,
            max: 10.0,
            mean: 2.0,
            sigma: 0.5,
        };
        assert_eq!(IsoValue::Relative(2.0).absolute(&stats), 3.0);
        assert_eq!(IsoValue::Absolute(3.0).relative(&stats), 2.0);
        assert_eq!(IsoValue::Absolute(0.95).absolute(&stats), 0.95);
    }
}
