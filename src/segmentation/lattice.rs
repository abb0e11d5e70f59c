use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::VolsegError;
use crate::metadata::SegmentId;
use crate::table::{Category, DataBlock};
use crate::volume::{Grid, GridSpace, Volume};

/// Header of the payload block carrying lattice segmentation data.
pub const SEGMENTATION_BLOCK: &str = "SEGMENTATION_DATA";
const VALUES_CATEGORY: &str = "segmentation_data_3d";
const TABLE_CATEGORY: &str = "segmentation_data_table";

/// Decoding context for a categorical voxel segmentation.
///
/// Every voxel stores a *set id*; the segment map says which segments a set
/// id stands for (one voxel can belong to several overlapping segments).
/// Immutable after construction, so one instance can serve concurrent
/// [`create_segment`](Self::create_segment) calls.
#[derive(Debug, Clone)]
pub struct LatticeSegmentation {
    values: Vec<i32>,
    segment_map: FxHashMap<i32, FxHashSet<SegmentId>>,
    space: GridSpace,
}

impl LatticeSegmentation {
    /// Build from raw columns.
    ///
    /// `set_ids[i]` / `segment_ids[i]` form one row of the set table; rows
    /// sharing a set id accumulate. `values` holds one set id per voxel of
    /// `grid`.
    pub fn new(
        set_ids: &[i32],
        segment_ids: &[SegmentId],
        values: Vec<i32>,
        grid: &Grid,
    ) -> Result<Self, VolsegError> {
        if set_ids.len() != segment_ids.len() {
            return Err(VolsegError::Decode(format!(
                "segment table has {} set ids but {} segment ids",
                set_ids.len(),
                segment_ids.len()
            )));
        }
        if values.len() != grid.voxel_count() {
            return Err(VolsegError::Decode(format!(
                "segmentation has {} values for a grid of {} voxels",
                values.len(),
                grid.voxel_count()
            )));
        }

        let mut segment_map: FxHashMap<i32, FxHashSet<SegmentId>> =
            FxHashMap::default();
        for (&set_id, &segment_id) in set_ids.iter().zip(segment_ids) {
            let _ = segment_map.entry(set_id).or_default().insert(segment_id);
        }

        log::debug!(
            "lattice segmentation: {} voxels, {} sets, {} table rows",
            values.len(),
            segment_map.len(),
            set_ids.len()
        );

        Ok(Self {
            values,
            segment_map,
            space: grid.space().clone(),
        })
    }

    /// Build from a [`SEGMENTATION_BLOCK`] payload block.
    pub fn from_block(
        block: &dyn DataBlock,
        grid: &Grid,
    ) -> Result<Self, VolsegError> {
        let values = int_field(block, VALUES_CATEGORY, "values")?;
        let set_ids = int_field(block, TABLE_CATEGORY, "set_id")?;
        let segment_ids = int_field(block, TABLE_CATEGORY, "segment_id")?;
        Self::new(&set_ids, &segment_ids, values, grid)
    }

    /// Decode a binary mask of every voxel belonging to any segment in
    /// `group`.
    ///
    /// Voxels whose set id has no table entry are outside every segment.
    /// The result owns a fresh buffer with fixed mask statistics.
    #[must_use]
    pub fn create_segment(&self, group: &[SegmentId]) -> Volume {
        let matching: FxHashSet<i32> = self
            .segment_map
            .iter()
            .filter(|(_, segments)| group.iter().any(|g| segments.contains(g)))
            .map(|(&set_id, _)| set_id)
            .collect();

        let data = self
            .values
            .iter()
            .map(|v| if matching.contains(v) { 1.0 } else { 0.0 })
            .collect();

        let name = match group {
            [single] => format!("segment {single}"),
            _ => format!("segments {group:?}"),
        };
        Volume::new(name, Grid::binary_mask(self.space.clone(), data))
    }

    /// Segments referenced by a set id.
    #[must_use]
    pub fn segments_of_set(&self, set_id: i32) -> Option<&FxHashSet<SegmentId>> {
        self.segment_map.get(&set_id)
    }

    /// Every segment id the table mentions, ascending.
    #[must_use]
    pub fn segment_ids(&self) -> Vec<SegmentId> {
        let mut ids: Vec<SegmentId> = self
            .segment_map
            .values()
            .flatten()
            .copied()
            .collect::<FxHashSet<_>>()
            .into_iter()
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Number of voxels.
    #[must_use]
    pub fn voxel_count(&self) -> usize {
        self.values.len()
    }
}

fn int_field(
    block: &dyn DataBlock,
    category: &str,
    field: &str,
) -> Result<Vec<i32>, VolsegError> {
    let cat: &dyn Category = block.category(category).ok_or_else(|| {
        VolsegError::Decode(format!(
            "block {} has no category {category}",
            block.header()
        ))
    })?;
    cat.int_column(field).ok_or_else(|| {
        VolsegError::Decode(format!("{category} has no integer field {field}"))
    })
}
