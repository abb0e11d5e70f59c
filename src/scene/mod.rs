//! Scene graph seam.
//!
//! The session never touches rendering. It allocates typed node handles,
//! describes changes as [`SceneOp`]s and hands whole batches to a
//! [`SceneGraph`], which applies each batch atomically. [`HeadlessScene`]
//! is the in-memory implementation used by the CLI and tests.

mod headless;

use std::fmt;
use std::sync::Arc;

pub use headless::{HeadlessScene, SceneNode};

use crate::api::MeshData;
use crate::entry::EntryId;
use crate::error::VolsegError;
use crate::metadata::{DetailLevel, SegmentId};
use crate::util::color::Rgb;
use crate::volume::{IsoValue, Volume};

/// Raw node identifier, unique within one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Density map of the entry.
    DensityVolume,
    /// Binary mask volume (lattice segment or threshold mask).
    LatticeVolume,
    /// Isosurface representation of a volume node.
    Isosurface,
    /// Mesh geometry of one segment.
    Mesh,
    /// Streaming mesh view of a whole entry.
    MeshStreaming,
}

/// Typed handle to a scene node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeHandle {
    /// See [`NodeKind::DensityVolume`].
    DensityVolume(NodeId),
    /// See [`NodeKind::LatticeVolume`].
    LatticeVolume(NodeId),
    /// See [`NodeKind::Isosurface`].
    Isosurface(NodeId),
    /// See [`NodeKind::Mesh`].
    Mesh(NodeId),
    /// See [`NodeKind::MeshStreaming`].
    MeshStreaming(NodeId),
}

impl NodeHandle {
    /// Tag `id` with `kind`.
    #[must_use]
    pub fn new(kind: NodeKind, id: NodeId) -> Self {
        match kind {
            NodeKind::DensityVolume => Self::DensityVolume(id),
            NodeKind::LatticeVolume => Self::LatticeVolume(id),
            NodeKind::Isosurface => Self::Isosurface(id),
            NodeKind::Mesh => Self::Mesh(id),
            NodeKind::MeshStreaming => Self::MeshStreaming(id),
        }
    }

    /// Untagged id.
    #[must_use]
    pub fn id(self) -> NodeId {
        match self {
            Self::DensityVolume(id)
            | Self::LatticeVolume(id)
            | Self::Isosurface(id)
            | Self::Mesh(id)
            | Self::MeshStreaming(id) => id,
        }
    }

    /// Node kind.
    #[must_use]
    pub fn kind(self) -> NodeKind {
        match self {
            Self::DensityVolume(_) => NodeKind::DensityVolume,
            Self::LatticeVolume(_) => NodeKind::LatticeVolume,
            Self::Isosurface(_) => NodeKind::Isosurface,
            Self::Mesh(_) => NodeKind::Mesh,
            Self::MeshStreaming(_) => NodeKind::MeshStreaming,
        }
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {}", self.kind(), self.id())
    }
}

/// Uniform-color isosurface parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsosurfaceParams {
    /// Threshold.
    pub iso_value: IsoValue,
    /// Opacity in `[0, 1]`.
    pub alpha: f32,
    /// Surface color.
    pub color: Rgb,
}

/// Data attached to a node.
#[derive(Debug, Clone)]
pub enum NodePayload {
    /// Voxel data for a density or mask volume node.
    Volume(Arc<Volume>),
    /// Isosurface of the parent volume node.
    Isosurface(IsosurfaceParams),
    /// Mesh components of one segment.
    Mesh {
        /// Segment the meshes belong to.
        segment: SegmentId,
        /// Detail level the meshes were fetched at.
        detail: DetailLevel,
        /// Surface color.
        color: Rgb,
        /// Geometry.
        meshes: Arc<[MeshData]>,
    },
    /// Mesh streaming for a whole entry, resolved by the renderer.
    MeshStreaming {
        /// Entry to stream.
        entry: EntryId,
        /// API base URL to stream from.
        server_url: String,
    },
}

impl NodePayload {
    /// Whether this payload can be attached to a node of `kind`.
    #[must_use]
    pub fn fits(&self, kind: NodeKind) -> bool {
        matches!(
            (self, kind),
            (
                Self::Volume(_),
                NodeKind::DensityVolume | NodeKind::LatticeVolume
            ) | (Self::Isosurface(_), NodeKind::Isosurface)
                | (Self::Mesh { .. }, NodeKind::Mesh)
                | (Self::MeshStreaming { .. }, NodeKind::MeshStreaming)
        )
    }
}

/// One scene mutation.
#[derive(Debug, Clone)]
pub enum SceneOp {
    /// Create an allocated node, optionally under a parent.
    Create {
        /// Handle from [`SceneGraph::allocate`].
        handle: NodeHandle,
        /// Parent node, `None` for the root.
        parent: Option<NodeHandle>,
        /// Node data.
        payload: NodePayload,
    },
    /// Replace a node's payload.
    Update {
        /// Node to update.
        handle: NodeHandle,
        /// New data.
        payload: NodePayload,
    },
    /// Delete a node and its subtree.
    Delete(NodeHandle),
    /// Show or hide a node's subtree.
    SetVisibility {
        /// Node to toggle.
        handle: NodeHandle,
        /// New visibility.
        visible: bool,
    },
}

/// Builder collecting the operations of one commit.
#[derive(Debug, Default)]
pub struct SceneBatch {
    ops: Vec<SceneOp>,
}

impl SceneBatch {
    /// Empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a node creation.
    pub fn create(
        &mut self,
        handle: NodeHandle,
        parent: Option<NodeHandle>,
        payload: NodePayload,
    ) {
        self.ops.push(SceneOp::Create {
            handle,
            parent,
            payload,
        });
    }

    /// Queue a payload update.
    pub fn update(&mut self, handle: NodeHandle, payload: NodePayload) {
        self.ops.push(SceneOp::Update { handle, payload });
    }

    /// Queue a subtree deletion.
    pub fn delete(&mut self, handle: NodeHandle) {
        self.ops.push(SceneOp::Delete(handle));
    }

    /// Queue a visibility change.
    pub fn set_visible(&mut self, handle: NodeHandle, visible: bool) {
        self.ops.push(SceneOp::SetVisibility { handle, visible });
    }

    /// Number of queued operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Apply every queued operation as one commit.
    pub fn commit(self, scene: &mut dyn SceneGraph) -> Result<(), VolsegError> {
        scene.commit(self.ops)
    }
}

/// A scene graph that applies operation batches atomically.
pub trait SceneGraph: Send {
    /// Reserve a fresh handle of `kind`. The node exists once a batch
    /// containing its [`SceneOp::Create`] commits.
    fn allocate(&mut self, kind: NodeKind) -> NodeHandle;

    /// Apply `ops` in order. Either every operation applies or, on error,
    /// none does.
    fn commit(&mut self, ops: Vec<SceneOp>) -> Result<(), VolsegError>;

    /// Whether a committed node with this handle exists.
    fn contains(&self, handle: NodeHandle) -> bool;

    /// Remove every node.
    fn clear(&mut self);
}
