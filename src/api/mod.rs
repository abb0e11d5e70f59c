//! Volume server API: request URLs, payload types and the [`VolumeServer`]
//! collaborator the session fetches through.
//!
//! Metadata and meshes travel as JSON. Volume payloads are BinaryCIF, which
//! is decoded by an external [`PayloadDecoder`] into a density [`Volume`]
//! plus the raw [`DataBlock`]s (among them the lattice segmentation).

#[cfg(feature = "http")]
mod http;

use std::fmt;

use glam::Vec3;
#[cfg(feature = "http")]
pub use http::HttpVolumeServer;
use serde::{Deserialize, Serialize};

use crate::entry::EntryId;
use crate::error::VolsegError;
use crate::metadata::{DetailLevel, Metadata, SegmentId};
use crate::segmentation::SEGMENTATION_BLOCK;
use crate::table::{find_block, DataBlock};
use crate::volume::Volume;

/// Axis-aligned request box in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeBox {
    /// Lower corner.
    pub min: [f64; 3],
    /// Upper corner.
    pub max: [f64; 3],
}

impl Default for VolumeBox {
    /// A box large enough to cover any entry.
    fn default() -> Self {
        Self {
            min: [-1000.0; 3],
            max: [1000.0; 3],
        }
    }
}

/// Parameters of a volume payload request.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeRequest {
    /// Lattice segmentation to include.
    pub lattice_index: u32,
    /// Region to cut; `None` requests the whole cell.
    pub region: Option<VolumeBox>,
    /// Upper bound on returned voxels; the server downsamples to fit.
    pub max_voxels: u64,
}

/// Builds volume server endpoint URLs under a base such as
/// `http://localhost:9000/v1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiUrls {
    base: String,
}

impl ApiUrls {
    /// Create a builder. A trailing slash on `base` is ignored.
    #[must_use]
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_owned(),
        }
    }

    /// Base URL without trailing slash.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Entry metadata (JSON).
    #[must_use]
    pub fn metadata(&self, entry: &EntryId) -> String {
        format!("{}/{}/{entry}/metadata", self.base, entry.source)
    }

    /// Volume + lattice payload for a box region.
    #[must_use]
    pub fn volume_box(
        &self,
        entry: &EntryId,
        lattice_index: u32,
        region: &VolumeBox,
        max_voxels: u64,
    ) -> String {
        let [a1, a2, a3] = region.min;
        let [b1, b2, b3] = region.max;
        format!(
            "{}/{}/{entry}/box/{lattice_index}/{a1}/{a2}/{a3}/{b1}/{b2}/{b3}/{max_voxels}",
            self.base, entry.source
        )
    }

    /// Volume + lattice payload for the whole cell.
    #[must_use]
    pub fn volume_cell(
        &self,
        entry: &EntryId,
        lattice_index: u32,
        max_voxels: u64,
    ) -> String {
        format!(
            "{}/{}/{entry}/cell/{lattice_index}/{max_voxels}",
            self.base, entry.source
        )
    }

    /// Payload URL for a [`VolumeRequest`].
    #[must_use]
    pub fn volume(&self, entry: &EntryId, request: &VolumeRequest) -> String {
        match &request.region {
            Some(region) => self.volume_box(
                entry,
                request.lattice_index,
                region,
                request.max_voxels,
            ),
            None => {
                self.volume_cell(entry, request.lattice_index, request.max_voxels)
            }
        }
    }

    /// Mesh geometry of one segment at one detail level (JSON).
    #[must_use]
    pub fn mesh(
        &self,
        entry: &EntryId,
        segment: SegmentId,
        detail: DetailLevel,
    ) -> String {
        format!(
            "{}/{}/{entry}/mesh/{segment}/{detail}",
            self.base, entry.source
        )
    }

    /// Entry listing, optionally filtered by keyword.
    #[must_use]
    pub fn list_entries(&self, limit: usize, keyword: Option<&str>) -> String {
        match keyword {
            Some(k) => format!("{}/list_entries/{limit}/{k}", self.base),
            None => format!("{}/list_entries/{limit}", self.base),
        }
    }

    /// Server version.
    #[must_use]
    pub fn version(&self) -> String {
        format!("{}/version", self.base)
    }
}

/// One mesh component of a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    /// Component id within the segment.
    pub mesh_id: u32,
    /// Vertex positions.
    pub vertices: Vec<Vec3>,
    /// Vertex index triples.
    pub triangles: Vec<[u32; 3]>,
}

impl MeshData {
    /// Check that every triangle indexes an existing vertex.
    pub fn validate(&self) -> Result<(), VolsegError> {
        let n = self.vertices.len();
        match self
            .triangles
            .iter()
            .flatten()
            .find(|&&i| i as usize >= n)
        {
            Some(i) => Err(VolsegError::Decode(format!(
                "mesh {} references vertex {i} of {n}",
                self.mesh_id
            ))),
            None => Ok(()),
        }
    }
}

/// Decoded volume payload.
#[derive(Default)]
pub struct VolumePayload {
    /// Density volume, if the payload carried one.
    pub volume: Option<Volume>,
    /// All data blocks of the payload.
    pub blocks: Vec<Box<dyn DataBlock>>,
}

impl VolumePayload {
    /// The lattice segmentation block, if present.
    #[must_use]
    pub fn segmentation_block(&self) -> Option<&dyn DataBlock> {
        find_block(&self.blocks, SEGMENTATION_BLOCK)
    }
}

impl fmt::Debug for VolumePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headers: Vec<&str> = self.blocks.iter().map(|b| b.header()).collect();
        f.debug_struct("VolumePayload")
            .field("volume", &self.volume.as_ref().map(|v| &v.name))
            .field("blocks", &headers)
            .finish()
    }
}

/// Turns raw BinaryCIF payload bytes into a [`VolumePayload`].
pub trait PayloadDecoder: Send + Sync {
    /// Decode one payload.
    fn decode(&self, bytes: &[u8]) -> Result<VolumePayload, VolsegError>;
}

/// The volume server as seen by a session.
///
/// Implementations block; the session runs them on the caller's thread or
/// on an [`EntryLoader`](crate::session::EntryLoader).
pub trait VolumeServer: Send + Sync {
    /// URL builder for this server.
    fn urls(&self) -> &ApiUrls;

    /// Entry metadata.
    fn metadata(&self, entry: &EntryId) -> Result<Metadata, VolsegError>;

    /// Density volume and segmentation blocks.
    fn volume_payload(
        &self,
        entry: &EntryId,
        request: &VolumeRequest,
    ) -> Result<VolumePayload, VolsegError>;

    /// Mesh components of one segment at one detail level.
    fn meshes(
        &self,
        entry: &EntryId,
        segment: SegmentId,
        detail: DetailLevel,
    ) -> Result<Vec<MeshData>, VolsegError>;

    /// Entry ids known to the server.
    fn list_entries(
        &self,
        limit: usize,
        keyword: Option<&str>,
    ) -> Result<Vec<String>, VolsegError>;
}
