//! Begin and finish phases of entry loads.

use super::fetch::{fetch_entry, EntryData, FetchSettings, FetchedEntry, LoadTicket};
use super::{LoadMode, SegmentFilter, Session};
use crate::entry::{resolve_source, EntryId};
use crate::error::{FailureScope, PartialFailure, VolsegError};
use crate::metadata::SegmentId;
use crate::scene::{NodeKind, NodePayload, SceneBatch, SceneGraph};

impl<S: SceneGraph> Session<S> {
    /// Resolve `entry_id` and load it inline.
    ///
    /// Metadata failures abort the load: metadata is cleared, the error is
    /// published and returned. Failures of independent branches are
    /// returned as [`VolsegError::Partial`] after everything else loaded.
    pub fn load(
        &mut self,
        entry_id: &str,
        mode: LoadMode,
    ) -> Result<(), VolsegError> {
        let entry = match resolve_source(entry_id) {
            Ok(entry) => entry,
            Err(e) => {
                let message = e.to_string();
                self.publish(|state| state.error = Some(message));
                return Err(e);
            }
        };
        let ticket = self.begin_load(entry, mode);
        let fetched = fetch_entry(self.api.as_ref(), ticket);
        self.finish_load(fetched)
    }

    /// Load volume, lattice segmentation and mesh streaming as the
    /// entry's metadata says they are available.
    pub fn load_auto(&mut self, entry_id: &str) -> Result<(), VolsegError> {
        self.load(entry_id, LoadMode::Auto)
    }

    /// Load the density isosurface and every lattice segment.
    pub fn load_volume(&mut self, entry_id: &str) -> Result<(), VolsegError> {
        self.load(entry_id, LoadMode::Volume)
    }

    /// Load an image volume; see [`Session::set_iso_value`].
    pub fn load_image(&mut self, entry_id: &str) -> Result<(), VolsegError> {
        self.load(entry_id, LoadMode::Image)
    }

    /// Load every segment (after `filter`) in mesh mode.
    pub fn load_meshes(
        &mut self,
        entry_id: &str,
        filter: SegmentFilter,
    ) -> Result<(), VolsegError> {
        self.load(entry_id, LoadMode::Meshes(filter))
    }

    /// Load a streaming mesh view of the entry.
    pub fn load_mesh_streaming(
        &mut self,
        entry_id: &str,
    ) -> Result<(), VolsegError> {
        self.load(entry_id, LoadMode::MeshStreaming)
    }

    /// Start a load: supersede any load in flight, clear the scene and
    /// every per-entry cache.
    pub fn begin_load(&mut self, entry: EntryId, mode: LoadMode) -> LoadTicket {
        self.generation += 1;
        log::info!(
            "{entry}: loading ({}, generation {})",
            mode.data_source(),
            self.generation
        );

        self.scene.clear();
        self.entry = None;
        self.metadata = None;
        self.volume = None;
        self.segmentation = None;
        self.current_segment = None;
        self.lattice_nodes.clear();
        self.threshold_nodes.clear();
        self.image_surface = None;
        self.mesh_nodes.clear();
        self.prefetched.clear();

        LoadTicket {
            generation: self.generation,
            entry,
            mode,
            settings: FetchSettings::from_options(&self.options),
        }
    }

    /// Apply a fetched entry.
    ///
    /// A ticket from an older generation, or one whose generation was
    /// already applied, returns [`VolsegError::StaleLoad`] without touching
    /// the session. Otherwise
    /// the entry id, location fragment, annotation, data source and error
    /// are published whether or not the load succeeded.
    pub fn finish_load(
        &mut self,
        fetched: FetchedEntry,
    ) -> Result<(), VolsegError> {
        let FetchedEntry { ticket, result } = fetched;
        if ticket.generation != self.generation
            || ticket.generation <= self.applied_generation
        {
            log::warn!(
                "{}: discarding load generation {} (current {})",
                ticket.entry,
                ticket.generation,
                self.generation
            );
            return Err(VolsegError::StaleLoad {
                ticket: ticket.generation,
                current: self.generation,
            });
        }

        self.applied_generation = ticket.generation;
        self.entry = Some(ticket.entry.clone());
        let outcome = match result {
            Ok(data) => self.apply_entry(&ticket, data),
            Err(e) => {
                self.metadata = None;
                Err(e)
            }
        };

        let entry = ticket.entry;
        let annotation = self.metadata.as_ref().map(|m| m.annotation.clone());
        let error = outcome.as_ref().err().map(ToString::to_string);
        match &error {
            None => log::info!("{entry}: loaded"),
            Some(e) => log::warn!("{entry}: {e}"),
        }
        self.publish(|state| {
            state.location_fragment = Some(entry.to_string());
            state.entry_id = Some(entry);
            state.annotation = annotation;
            state.data_source = Some(ticket.mode.data_source());
            state.error = error;
        });
        outcome
    }

    fn apply_entry(
        &mut self,
        ticket: &LoadTicket,
        data: EntryData,
    ) -> Result<(), VolsegError> {
        let EntryData {
            metadata,
            volume,
            segmentation,
            show_volume,
            stream_meshes,
            prefetched,
            mut failures,
        } = data;
        let segments: Vec<SegmentId> =
            metadata.annotation.segment_list.iter().map(|s| s.id).collect();
        self.metadata = Some(metadata);
        self.volume = volume;
        self.segmentation = segmentation;
        self.prefetched = prefetched;

        if let Some(volume) = self.volume.clone().filter(|_| show_volume) {
            let node = self.scene.allocate(NodeKind::DensityVolume);
            let surface = self.scene.allocate(NodeKind::Isosurface);
            let is_image = ticket.mode == LoadMode::Image;
            let params = if is_image {
                let image = &self.options.image;
                image.surface(image.iso_value, false)
            } else {
                self.options.volume.isosurface()
            };
            let mut batch = SceneBatch::new();
            batch.create(node, None, NodePayload::Volume(volume));
            batch.create(surface, Some(node), NodePayload::Isosurface(params));
            match batch.commit(&mut self.scene) {
                Ok(()) if is_image => self.image_surface = Some(surface),
                Ok(()) => {}
                Err(error) => failures.push(PartialFailure {
                    scope: FailureScope::Volume,
                    error,
                }),
            }
        }
        if stream_meshes {
            let node = self.scene.allocate(NodeKind::MeshStreaming);
            let mut batch = SceneBatch::new();
            batch.create(
                node,
                None,
                NodePayload::MeshStreaming {
                    entry: ticket.entry.clone(),
                    server_url: self.api.urls().base().to_owned(),
                },
            );
            if let Err(error) = batch.commit(&mut self.scene) {
                failures.push(PartialFailure {
                    scope: FailureScope::MeshStreaming,
                    error,
                });
            }
        }

        if self.segmentation.is_some() {
            if let Err(error) = self.render_lattice_segments(&segments) {
                failures.push(PartialFailure {
                    scope: FailureScope::Lattice,
                    error,
                });
            }
        }
        if matches!(ticket.mode, LoadMode::Meshes(_)) {
            failures.extend(self.render_mesh_segments(&segments)?);
        }

        VolsegError::from_failures(failures).map_or(Ok(()), Err)
    }
}
