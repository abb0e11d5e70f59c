//! In-memory volume server for session tests.

use std::sync::{Arc, Mutex};

use glam::Vec3;

use super::Session;
use crate::api::{ApiUrls, MeshData, VolumePayload, VolumeRequest, VolumeServer};
use crate::entry::EntryId;
use crate::error::VolsegError;
use crate::metadata::{self, DetailLevel, Metadata, SegmentId};
use crate::options::Options;
use crate::scene::{HeadlessScene, NodeHandle, NodeKind, SceneGraph, SceneOp};
use crate::segmentation::SEGMENTATION_BLOCK;
use crate::table::{Column, DataBlock, TableBlock, TableCategory};
use crate::volume::{Grid, GridSpace, Volume};

type PayloadFn = dyn Fn() -> Result<VolumePayload, VolsegError> + Send + Sync;

#[derive(Clone)]
pub(super) struct MockServer {
    urls: ApiUrls,
    metadata: Option<Metadata>,
    payload: Arc<PayloadFn>,
    failing_segments: Vec<SegmentId>,
    mesh_requests: Arc<Mutex<Vec<(SegmentId, DetailLevel)>>>,
    payload_requests: Arc<Mutex<usize>>,
}

impl MockServer {
    /// Sample metadata (segments 1, 13, 15) and a 4-voxel payload whose
    /// lattice maps set 1 → {1}, set 2 → {1, 13}, set 3 → {15} over
    /// voxels [1, 2, 1, 3].
    pub(super) fn sample() -> Self {
        Self {
            urls: ApiUrls::new("http://mock/v1"),
            metadata: Some(metadata::tests::sample()),
            payload: Arc::new(|| Ok(sample_payload(true, true))),
            failing_segments: Vec::new(),
            mesh_requests: Arc::default(),
            payload_requests: Arc::default(),
        }
    }

    pub(super) fn with_metadata(mut self, metadata: Option<Metadata>) -> Self {
        self.metadata = metadata;
        self
    }

    pub(super) fn with_payload(
        mut self,
        payload: impl Fn() -> Result<VolumePayload, VolsegError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.payload = Arc::new(payload);
        self
    }

    pub(super) fn failing_segment(mut self, segment: SegmentId) -> Self {
        self.failing_segments.push(segment);
        self
    }

    pub(super) fn with_colorless_segment(mut self, segment: SegmentId) -> Self {
        if let Some(s) = self
            .metadata
            .as_mut()
            .and_then(|m| {
                m.annotation.segment_list.iter_mut().find(|s| s.id == segment)
            })
        {
            s.colour = vec![0.5];
        }
        self
    }

    pub(super) fn mesh_requests(&self) -> Vec<(SegmentId, DetailLevel)> {
        self.mesh_requests.lock().unwrap().clone()
    }

    pub(super) fn payload_requests(&self) -> usize {
        *self.payload_requests.lock().unwrap()
    }
}

pub(super) fn sample_grid() -> Grid {
    Grid::from_data(GridSpace::new([4, 1, 1]), vec![0.0, 1.0, 2.0, 3.0]).unwrap()
}

pub(super) fn sample_payload(with_volume: bool, with_lattice: bool) -> VolumePayload {
    let mut blocks: Vec<Box<dyn DataBlock>> =
        vec![Box::new(TableBlock::new("VOLUME_DATA"))];
    if with_lattice {
        blocks.push(Box::new(
            TableBlock::new(SEGMENTATION_BLOCK)
                .with_category(
                    "segmentation_data_3d",
                    TableCategory::new()
                        .with_field("values", Column::Int(vec![1, 2, 1, 3])),
                )
                .with_category(
                    "segmentation_data_table",
                    TableCategory::new()
                        .with_field("set_id", Column::Int(vec![1, 2, 2, 3]))
                        .with_field("segment_id", Column::Int(vec![1, 1, 13, 15])),
                ),
        ));
    }
    VolumePayload {
        volume: with_volume.then(|| Volume::new("emd-1832", sample_grid())),
        blocks,
    }
}

pub(super) fn session(server: &MockServer) -> Session<HeadlessScene> {
    Session::new(
        Arc::new(server.clone()),
        HeadlessScene::new(),
        Options::default(),
    )
}

/// Headless scene that rejects every commit creating a node of one kind.
pub(super) struct RejectingScene {
    pub(super) inner: HeadlessScene,
    rejected: NodeKind,
}

impl RejectingScene {
    pub(super) fn new(rejected: NodeKind) -> Self {
        Self {
            inner: HeadlessScene::new(),
            rejected,
        }
    }
}

impl SceneGraph for RejectingScene {
    fn allocate(&mut self, kind: NodeKind) -> NodeHandle {
        self.inner.allocate(kind)
    }

    fn commit(&mut self, ops: Vec<SceneOp>) -> Result<(), VolsegError> {
        let rejected = ops.iter().any(|op| {
            matches!(op, SceneOp::Create { handle, .. } if handle.kind() == self.rejected)
        });
        if rejected {
            return Err(VolsegError::Scene(format!("{:?} rejected", self.rejected)));
        }
        self.inner.commit(ops)
    }

    fn contains(&self, handle: NodeHandle) -> bool {
        self.inner.contains(handle)
    }

    fn clear(&mut self) {
        self.inner.clear();
    }
}

pub(super) fn rejecting_session(
    server: &MockServer,
    rejected: NodeKind,
) -> Session<RejectingScene> {
    Session::new(
        Arc::new(server.clone()),
        RejectingScene::new(rejected),
        Options::default(),
    )
}

impl VolumeServer for MockServer {
    fn urls(&self) -> &ApiUrls {
        &self.urls
    }

    fn metadata(&self, _entry: &EntryId) -> Result<Metadata, VolsegError> {
        self.metadata
            .clone()
            .ok_or_else(|| VolsegError::Fetch("metadata: 404".to_owned()))
    }

    fn volume_payload(
        &self,
        _entry: &EntryId,
        _request: &VolumeRequest,
    ) -> Result<VolumePayload, VolsegError> {
        *self.payload_requests.lock().unwrap() += 1;
        (self.payload)()
    }

    fn meshes(
        &self,
        _entry: &EntryId,
        segment: SegmentId,
        detail: DetailLevel,
    ) -> Result<Vec<MeshData>, VolsegError> {
        self.mesh_requests.lock().unwrap().push((segment, detail));
        if self.failing_segments.contains(&segment) {
            return Err(VolsegError::Fetch(format!("mesh {segment}: 500")));
        }
        Ok(vec![MeshData {
            mesh_id: 0,
            vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Y],
            triangles: vec![[0, 1, 2]],
        }])
    }

    fn list_entries(
        &self,
        limit: usize,
        _keyword: Option<&str>,
    ) -> Result<Vec<String>, VolsegError> {
        Ok(["emd-1832", "empiar-10070"]
            .into_iter()
            .take(limit)
            .map(str::to_owned)
            .collect())
    }
}
