use super::Grid;

/// Build a binary mask marking voxels whose z-score satisfies `predicate`.
///
/// The z-score of a voxel is `(value - mean) / sigma` using the source
/// grid's statistics. A grid with zero spread scores every voxel as 0.
#[must_use]
pub fn threshold_mask(grid: &Grid, predicate: impl Fn(f64) -> bool) -> Grid {
    let stats = grid.stats();
    let (mean, sigma) = (stats.mean, stats.sigma);
    let data = grid
        .data()
        .iter()
        .map(|&v| {
            let z = if sigma > 0.0 {
                (f64::from(v) - mean) / sigma
            } else {
                0.0
            };
            if predicate(z) {
                1.0
            } else {
                0.0
            }
        })
        .collect();
    Grid::binary_mask(grid.space().clone(), data)
}
