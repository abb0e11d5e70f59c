//! Viewer session: entry loading, segment selection and the published view
//! state.
//!
//! A [`Session`] owns everything one viewer needs: the API collaborator,
//! the scene graph, options, the loaded entry's metadata, volume and
//! lattice segmentation, and the node bookkeeping that lets selections add,
//! replace and hide segment representations without leaking nodes.
//!
//! # Loading
//!
//! Loads run in two phases so the slow part can leave the caller's thread:
//!
//! 1. [`Session::begin_load`] bumps the load generation, clears the scene
//!    and returns a [`LoadTicket`].
//! 2. [`fetch_entry`] performs every network request and decode for the
//!    ticket without touching the session. An [`EntryLoader`] runs it on a
//!    background thread.
//! 3. [`Session::finish_load`] applies the result. A ticket from an older
//!    generation is rejected with [`VolsegError::StaleLoad`] and changes
//!    nothing.
//!
//! [`Session::load`] runs all three phases inline.
//!
//! # Observing
//!
//! Every completed operation publishes one immutable [`ViewState`]
//! snapshot, readable via [`Session::state`] or pushed to
//! [`Session::subscribe`] receivers.

mod fetch;
mod image;
mod load;
mod loader;
#[cfg(test)]
mod mock;
mod node_cache;
mod segments;

use std::fmt;
use std::sync::mpsc;
use std::sync::Arc;

pub use fetch::{fetch_entry, EntryData, FetchedEntry, LoadTicket};
pub use loader::EntryLoader;
pub use node_cache::{CachedNode, SegmentNodeCache};
use rustc_hash::FxHashMap;

use crate::api::VolumeServer;
use crate::entry::EntryId;
use crate::error::VolsegError;
use crate::metadata::{Annotation, Metadata, Segment, SegmentId};
use crate::options::Options;
use crate::scene::{NodeHandle, SceneGraph};
use crate::segmentation::LatticeSegmentation;
use crate::volume::Volume;

/// Which kind of load produced the current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSource {
    /// Density map with its lattice segmentation.
    Volume,
    /// Image volume with threshold segmentation.
    Image,
    /// Per-segment meshes.
    Meshes,
    /// Streamed meshes.
    MeshStreaming,
    /// Chosen from metadata availability.
    Auto,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Volume => "volume",
            Self::Image => "image",
            Self::Meshes => "meshes",
            Self::MeshStreaming => "mesh streaming",
            Self::Auto => "auto",
        };
        f.write_str(name)
    }
}

/// Which segments a mesh load shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SegmentFilter {
    /// Every annotated segment.
    All,
    /// Every segment except the configured background segments.
    #[default]
    Foreground,
}

/// How to load an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadMode {
    /// Density isosurface plus every lattice segment.
    Volume,
    /// Image volume without segmentation; see
    /// [`Session::set_iso_value`].
    Image,
    /// Mesh mode over the filtered segment list.
    Meshes(SegmentFilter),
    /// One streaming node for the whole entry.
    MeshStreaming,
    /// Volume, lattice and mesh streaming as available.
    Auto,
}

impl LoadMode {
    /// Data source reported for this mode.
    #[must_use]
    pub fn data_source(self) -> DataSource {
        match self {
            Self::Volume => DataSource::Volume,
            Self::Image => DataSource::Image,
            Self::Meshes(_) => DataSource::Meshes,
            Self::MeshStreaming => DataSource::MeshStreaming,
            Self::Auto => DataSource::Auto,
        }
    }
}

/// Snapshot of what a viewer shows, replaced as a whole after every
/// completed operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    /// Loaded entry.
    pub entry_id: Option<EntryId>,
    /// Location fragment mirroring the entry id (`emd-1832`).
    pub location_fragment: Option<String>,
    /// Annotation of the loaded entry; `None` after a failed load.
    pub annotation: Option<Annotation>,
    /// The only selected segment, if exactly one is selected.
    pub current_segment: Option<Segment>,
    /// Outcome of the last operation.
    pub error: Option<String>,
    /// Mode of the last load.
    pub data_source: Option<DataSource>,
    /// Load generation the snapshot belongs to.
    pub generation: u64,
}

/// One viewer session.
pub struct Session<S: SceneGraph> {
    api: Arc<dyn VolumeServer>,
    scene: S,
    options: Options,
    generation: u64,
    /// Newest generation whose fetch was applied.
    applied_generation: u64,
    entry: Option<EntryId>,
    metadata: Option<Metadata>,
    volume: Option<Arc<Volume>>,
    segmentation: Option<Arc<LatticeSegmentation>>,
    current_segment: Option<Segment>,
    /// Volume nodes of the active lattice view.
    lattice_nodes: Vec<NodeHandle>,
    /// Volume nodes of the image threshold masks.
    threshold_nodes: Vec<NodeHandle>,
    /// Isosurface of the image-mode volume.
    image_surface: Option<NodeHandle>,
    mesh_nodes: SegmentNodeCache,
    prefetched: FxHashMap<SegmentId, Result<fetch::SegmentMesh, VolsegError>>,
    state: Arc<ViewState>,
    subscribers: Vec<mpsc::Sender<Arc<ViewState>>>,
}

impl<S: SceneGraph> Session<S> {
    /// Create an empty session.
    #[must_use]
    pub fn new(api: Arc<dyn VolumeServer>, scene: S, options: Options) -> Self {
        Self {
            api,
            scene,
            options,
            generation: 0,
            applied_generation: 0,
            entry: None,
            metadata: None,
            volume: None,
            segmentation: None,
            current_segment: None,
            lattice_nodes: Vec::new(),
            threshold_nodes: Vec::new(),
            image_surface: None,
            mesh_nodes: SegmentNodeCache::default(),
            prefetched: FxHashMap::default(),
            state: Arc::new(ViewState::default()),
            subscribers: Vec::new(),
        }
    }

    /// API collaborator, e.g. for spawning an [`EntryLoader`].
    #[must_use]
    pub fn api(&self) -> Arc<dyn VolumeServer> {
        Arc::clone(&self.api)
    }

    /// Scene graph.
    #[must_use]
    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Mutable scene graph access for the embedding viewer.
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    /// Options in effect.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Replace the options. Takes effect for subsequent operations.
    pub fn set_options(&mut self, options: Options) {
        self.options = options;
    }

    /// Current load generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Metadata of the loaded entry.
    #[must_use]
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Density volume of the loaded entry.
    #[must_use]
    pub fn volume(&self) -> Option<&Volume> {
        self.volume.as_deref()
    }

    /// Lattice segmentation of the loaded entry.
    #[must_use]
    pub fn segmentation(&self) -> Option<&LatticeSegmentation> {
        self.segmentation.as_deref()
    }

    /// Volume nodes of the active lattice view.
    #[must_use]
    pub fn lattice_nodes(&self) -> &[NodeHandle] {
        &self.lattice_nodes
    }

    /// Volume nodes of the image threshold masks.
    #[must_use]
    pub fn threshold_nodes(&self) -> &[NodeHandle] {
        &self.threshold_nodes
    }

    /// Isosurface node of the image volume.
    #[must_use]
    pub fn image_surface(&self) -> Option<NodeHandle> {
        self.image_surface
    }

    /// Mesh nodes created for the loaded entry.
    #[must_use]
    pub fn mesh_nodes(&self) -> &SegmentNodeCache {
        &self.mesh_nodes
    }

    /// Latest published snapshot.
    #[must_use]
    pub fn state(&self) -> Arc<ViewState> {
        Arc::clone(&self.state)
    }

    /// Receive every snapshot published from now on.
    pub fn subscribe(&mut self) -> mpsc::Receiver<Arc<ViewState>> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    /// Remove every scene node and forget the node bookkeeping with it.
    ///
    /// The loaded entry stays; the next selection recreates its nodes.
    pub fn clear_scene(&mut self) {
        self.scene.clear();
        self.lattice_nodes.clear();
        self.threshold_nodes.clear();
        self.image_surface = None;
        self.mesh_nodes.clear();
    }

    /// Forget handles of nodes the scene no longer has, e.g. after the
    /// embedder cleared it through [`Session::scene_mut`].
    fn prune_stale_nodes(&mut self) {
        let scene = &self.scene;
        let before = self.lattice_nodes.len()
            + self.threshold_nodes.len()
            + self.mesh_nodes.len();
        self.lattice_nodes.retain(|&h| scene.contains(h));
        self.threshold_nodes.retain(|&h| scene.contains(h));
        self.image_surface = self.image_surface.filter(|&h| scene.contains(h));
        self.mesh_nodes.retain(|node| scene.contains(node.handle));
        let after = self.lattice_nodes.len()
            + self.threshold_nodes.len()
            + self.mesh_nodes.len();
        if after < before {
            log::debug!("dropped {} stale node handles", before - after);
        }
    }

    /// The sole selected segment's annotation, `None` unless exactly one
    /// segment is selected.
    fn sole_segment(&self, selected: &[SegmentId]) -> Option<Segment> {
        match selected {
            [id] => self
                .metadata
                .as_ref()
                .and_then(|m| m.segment(*id))
                .cloned(),
            _ => None,
        }
    }

    /// Publish a new snapshot derived from the current one.
    fn publish(&mut self, update: impl FnOnce(&mut ViewState)) {
        let mut next = (*self.state).clone();
        update(&mut next);
        next.current_segment.clone_from(&self.current_segment);
        next.generation = self.generation;
        self.state = Arc::new(next);

        let state = Arc::clone(&self.state);
        self.subscribers
            .retain(|tx| tx.send(Arc::clone(&state)).is_ok());
    }

    /// Publish the outcome of a selection or iso value change.
    fn publish_outcome(&mut self, result: &Result<(), VolsegError>) {
        let error = result.as_ref().err().map(ToString::to_string);
        self.publish(|state| state.error = error);
    }
}

/// Unique ids in first-seen order.
fn dedup_ids(ids: &[SegmentId]) -> Vec<SegmentId> {
    let mut unique = Vec::with_capacity(ids.len());
    for &id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}
