//! Entry metadata: which volumes, lattice segmentations and mesh
//! segmentations exist, plus the human annotation of every segment.
//!
//! The schema mirrors the volume server's `metadata` response. Unknown
//! fields are ignored; everything the pipeline relies on is typed. All
//! queries are pure.

mod annotation;
pub mod detail;

use std::collections::{BTreeMap, BTreeSet};

pub use annotation::{
    AnnotatedEntry, Annotation, BiologicalAnnotation, ExternalReference,
    Segment,
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::VolsegError;

/// Integer id of a segment.
pub type SegmentId = i32;

/// Mesh detail level; higher is coarser.
pub type DetailLevel = u32;

/// Lattice ids are integers for SFF-derived entries and names for OME-Zarr
/// label groups.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum LatticeId {
    /// Numeric lattice id.
    Index(i64),
    /// Named lattice (label group).
    Name(String),
}

/// Available density volume samplings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct VolumesMetadata {
    /// Available downsampling rates, finest first.
    pub volume_downsamplings: Vec<u32>,
}

/// Available voxel-mask segmentations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SegmentationLatticesMetadata {
    /// Lattice ids present for the entry.
    pub segmentation_lattice_ids: Vec<LatticeId>,
    /// Downsampling rates available per lattice.
    pub segmentation_downsamplings: BTreeMap<String, Vec<u32>>,
}

/// Geometry counts of one mesh component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct MeshCounts {
    /// Number of vertices.
    pub num_vertices: u64,
    /// Number of triangles.
    pub num_triangles: u64,
    /// Number of normals.
    pub num_normals: u64,
}

/// Mesh components available at one detail level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct MeshList {
    /// Mesh id → geometry counts.
    pub mesh_ids: BTreeMap<u32, MeshCounts>,
}

/// Detail levels available for one segment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SegmentDetails {
    /// Detail level → mesh components.
    pub detail_lvls: BTreeMap<DetailLevel, MeshList>,
}

/// Per-segment mesh index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct MeshComponentNumbers {
    /// Segment id → detail levels. `None` when the entry has no meshes.
    pub segment_ids: Option<BTreeMap<SegmentId, SegmentDetails>>,
}

/// Available mesh segmentations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SegmentationMeshesMetadata {
    /// Per-segment mesh index.
    pub mesh_component_numbers: MeshComponentNumbers,
    /// Detail level → fraction of the full-resolution triangle count.
    pub detail_lvl_to_fraction: BTreeMap<DetailLevel, f64>,
}

/// Representations available for an entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct GridMetadata {
    /// Density volumes.
    pub volumes: VolumesMetadata,
    /// Lattice segmentations.
    pub segmentation_lattices: SegmentationLatticesMetadata,
    /// Mesh segmentations.
    pub segmentation_meshes: SegmentationMeshesMetadata,
}

/// Root metadata of one entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Metadata {
    /// Available representations.
    pub grid: GridMetadata,
    /// Segment annotations.
    pub annotation: Annotation,
}

impl Metadata {
    /// Parse metadata from the server's JSON representation.
    pub fn from_json(json: &str) -> Result<Self, VolsegError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Check invariants the pipeline relies on (unique segment ids).
    pub fn validate(&self) -> Result<(), VolsegError> {
        self.annotations_by_segment().map(drop)
    }

    /// Whether a density volume exists.
    #[must_use]
    pub fn has_volumes(&self) -> bool {
        !self.grid.volumes.volume_downsamplings.is_empty()
    }

    /// Whether a lattice segmentation exists.
    #[must_use]
    pub fn has_lattices(&self) -> bool {
        !self
            .grid
            .segmentation_lattices
            .segmentation_lattice_ids
            .is_empty()
    }

    /// Whether a mesh segmentation exists (the index may still be empty).
    #[must_use]
    pub fn has_meshes(&self) -> bool {
        self.mesh_index().is_some()
    }

    fn mesh_index(&self) -> Option<&BTreeMap<SegmentId, SegmentDetails>> {
        self.grid
            .segmentation_meshes
            .mesh_component_numbers
            .segment_ids
            .as_ref()
    }

    /// Segment ids with mesh data, ascending.
    #[must_use]
    pub fn mesh_segments(&self) -> Vec<SegmentId> {
        self.mesh_index()
            .map(|index| index.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Detail levels available for a segment, ascending.
    #[must_use]
    pub fn mesh_segment_details(&self, segment: SegmentId) -> Vec<DetailLevel> {
        self.mesh_index()
            .and_then(|index| index.get(&segment))
            .map(|details| details.detail_lvls.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Coarsest detail level of `segment` not coarser than `preferred`.
    ///
    /// See [`detail::sufficient_detail`].
    pub fn sufficient_detail(
        &self,
        segment: SegmentId,
        preferred: Option<DetailLevel>,
    ) -> Result<DetailLevel, VolsegError> {
        detail::sufficient_detail(
            segment,
            &self.mesh_segment_details(segment),
            preferred,
        )
    }

    /// Index annotations by segment id, rejecting duplicate ids.
    pub fn annotations_by_segment(
        &self,
    ) -> Result<FxHashMap<SegmentId, &Segment>, VolsegError> {
        let segments = &self.annotation.segment_list;
        let mut result = FxHashMap::default();
        result.reserve(segments.len());
        for segment in segments {
            if result.insert(segment.id, segment).is_some() {
                return Err(VolsegError::DuplicateSegment(segment.id));
            }
        }
        Ok(result)
    }

    /// Look up one segment's annotation.
    #[must_use]
    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.annotation.segment_list.iter().find(|s| s.id == id)
    }

    /// Remove segments from the annotation list and the mesh index.
    ///
    /// Ids missing from either are ignored, so repeated calls are no-ops.
    pub fn drop_segments(&mut self, segments: &[SegmentId]) {
        let drop_set: BTreeSet<SegmentId> = segments.iter().copied().collect();
        self.annotation
            .segment_list
            .retain(|s| !drop_set.contains(&s.id));
        if let Some(index) = self
            .grid
            .segmentation_meshes
            .mesh_component_numbers
            .segment_ids
            .as_mut()
        {
            index.retain(|id, _| !drop_set.contains(id));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Metadata with volume, one lattice and meshes for segments 1, 13, 15.
    pub(crate) const SAMPLE_JSON: &str = r#"{
        "grid": {
            "volumes": { "volume_downsamplings": [1, 2, 4] },
            "segmentation_lattices": { "segmentation_lattice_ids": [0] },
            "segmentation_meshes": {
                "mesh_component_numbers": {
                    "segment_ids": {
                        "1": { "detail_lvls": { "1": { "mesh_ids": { "0": { "num_vertices": 10 } } },
                                                 "2": { "mesh_ids": {} },
                                                 "4": { "mesh_ids": {} } } },
                        "13": { "detail_lvls": { "3": { "mesh_ids": {} } } },
                        "15": { "detail_lvls": { "5": { "mesh_ids": {} } } }
                    }
                },
                "detail_lvl_to_fraction": { "1": 1.0, "2": 0.5 }
            }
        },
        "annotation": {
            "entry_id": { "source_db_name": "emdb", "source_db_id": "emd-1832" },
            "segment_list": [
                { "id": 1, "colour": [1.0, 0.0, 0.0, 1.0],
                  "biological_annotation": { "name": "membrane", "external_references": [] } },
                { "id": 13, "colour": [0.0, 1.0, 0.0] },
                { "id": 15, "colour": [0.0, 0.0, 1.0] }
            ]
        }
    }"#;

    pub(crate) fn sample() -> Metadata {
        Metadata::from_json(SAMPLE_JSON).unwrap()
    }

    #[test]
    fn parses_availability() {
        let m = sample();
        assert!(m.has_volumes());
        assert!(m.has_lattices());
        assert!(m.has_meshes());
        assert_eq!(m.mesh_segments(), vec![1, 13, 15]);
        assert_eq!(m.mesh_segment_details(1), vec![1, 2, 4]);
        assert_eq!(m.annotation.segment_list[0].name(), Some("membrane"));
        assert_eq!(
            m.grid.segmentation_lattices.segmentation_lattice_ids,
            vec![LatticeId::Index(0)]
        );
    }

    #[test]
    fn empty_metadata_has_nothing() {
        let m = Metadata::from_json("{}").unwrap();
        assert!(!m.has_volumes());
        assert!(!m.has_lattices());
        assert!(!m.has_meshes());
        assert!(m.mesh_segments().is_empty());
        assert!(m.mesh_segment_details(1).is_empty());
    }

    #[test]
    fn present_but_empty_mesh_index_counts_as_meshes() {
        let m = Metadata::from_json(
            r#"{"grid": {"segmentation_meshes": {"mesh_component_numbers": {"segment_ids": {}}}}}"#,
        )
        .unwrap();
        assert!(m.has_meshes());
        assert!(m.mesh_segments().is_empty());
    }

    #[test]
    fn unknown_segment_has_no_details() {
        let m = sample();
        assert!(m.mesh_segment_details(99).is_empty());
        assert!(matches!(
            m.sufficient_detail(99, None),
            Err(VolsegError::NoDetailAvailable { segment: 99, .. })
        ));
    }

    #[test]
    fn sufficient_detail_uses_metadata_levels() {
        let m = sample();
        assert_eq!(m.sufficient_detail(1, Some(3)).unwrap(), 2);
        assert_eq!(m.sufficient_detail(1, None).unwrap(), 4);
        assert!(m.sufficient_detail(1, Some(0)).is_err());
    }

    #[test]
    fn annotations_indexed_by_id() {
        let m = sample();
        let by_id = m.annotations_by_segment().unwrap();
        assert_eq!(by_id.len(), 3);
        assert_eq!(by_id[&13].colour, vec![0.0, 1.0, 0.0]);
        assert!(m.validate().is_ok());
    }

    #[test]
    fn duplicate_annotation_rejected() {
        let mut m = sample();
        m.annotation.segment_list.push(Segment::new(7, vec![]));
        m.annotation.segment_list.push(Segment::new(7, vec![1.0; 3]));
        assert!(matches!(
            m.annotations_by_segment(),
            Err(VolsegError::DuplicateSegment(7))
        ));
        assert!(m.validate().is_err());
    }

    #[test]
    fn drop_segments_is_idempotent() {
        let mut m = sample();
        m.drop_segments(&[13, 15]);
        let ids: Vec<_> = m.annotation.segment_list.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1]);
        assert_eq!(m.mesh_segments(), vec![1]);

        let snapshot = m.clone();
        m.drop_segments(&[13, 15]);
        assert_eq!(m, snapshot);
        assert_eq!(m.mesh_segment_details(1), vec![1, 2, 4]);
    }

    #[test]
    fn drop_segments_without_mesh_index() {
        let mut m = sample();
        m.grid.segmentation_meshes.mesh_component_numbers.segment_ids = None;
        m.drop_segments(&[1, 42]);
        assert_eq!(m.annotation.segment_list.len(), 2);
        assert!(!m.has_meshes());
    }

    #[test]
    fn accepts_american_color_key() {
        let m = Metadata::from_json(
            r#"{"annotation": {"segment_list": [{"id": 3, "color": [0.5, 0.5, 0.5]}]}}"#,
        )
        .unwrap();
        assert_eq!(m.segment(3).unwrap().colour.len(), 3);
    }
}
