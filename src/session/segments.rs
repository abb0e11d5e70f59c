//! Segment selection: lattice mode rebuilds, mesh mode caches and toggles.

use std::sync::Arc;

use super::fetch::fetch_segment_mesh;
use super::{dedup_ids, CachedNode, Session};
use crate::error::{FailureScope, PartialFailure, VolsegError};
use crate::metadata::SegmentId;
use crate::scene::{NodeKind, NodePayload, SceneBatch, SceneGraph};

impl<S: SceneGraph> Session<S> {
    /// Show exactly `selected` as lattice segments.
    ///
    /// Every node of the previous lattice view is deleted and each selected
    /// segment gets a freshly decoded mask volume with an isosurface in its
    /// annotation color, all in one commit. An empty selection only clears.
    pub fn show_segments(
        &mut self,
        selected: &[SegmentId],
    ) -> Result<(), VolsegError> {
        let result = self.render_lattice_segments(selected);
        self.publish_outcome(&result);
        result
    }

    /// Show exactly `selected` as meshes of the loaded entry.
    ///
    /// Cached nodes are reused and only change visibility; segments seen
    /// for the first time are fetched at their sufficient detail level.
    /// A segment that fails is skipped, the rest still commit, and the
    /// failures are returned as [`VolsegError::Partial`].
    pub fn show_mesh_segments(
        &mut self,
        selected: &[SegmentId],
    ) -> Result<(), VolsegError> {
        let result = self.render_mesh_segments(selected).and_then(|failures| {
            VolsegError::from_failures(failures).map_or(Ok(()), Err)
        });
        self.publish_outcome(&result);
        result
    }

    pub(super) fn render_lattice_segments(
        &mut self,
        selected: &[SegmentId],
    ) -> Result<(), VolsegError> {
        self.prune_stale_nodes();
        let selected = dedup_ids(selected);
        let segmentation = match &self.segmentation {
            Some(s) => Some(Arc::clone(s)),
            None if selected.is_empty() => None,
            None => return Err(VolsegError::NoSegmentation),
        };
        self.current_segment = self.sole_segment(&selected);

        let fallback = self.options.segments.fallback_color;
        let mut batch = SceneBatch::new();
        for &node in &self.lattice_nodes {
            batch.delete(node);
        }

        let mut created = Vec::with_capacity(selected.len());
        if let Some(segmentation) = segmentation {
            for &id in &selected {
                let mask = segmentation.create_segment(&[id]);
                let color = self
                    .metadata
                    .as_ref()
                    .and_then(|m| m.segment(id))
                    .map_or(fallback, |s| s.color_or(fallback));

                let volume = self.scene.allocate(NodeKind::LatticeVolume);
                let surface = self.scene.allocate(NodeKind::Isosurface);
                batch.create(volume, None, NodePayload::Volume(Arc::new(mask)));
                batch.create(
                    surface,
                    Some(volume),
                    NodePayload::Isosurface(
                        self.options.segments.isosurface(color),
                    ),
                );
                created.push(volume);
            }
        }

        batch.commit(&mut self.scene)?;
        log::debug!("lattice view: {} segments", created.len());
        self.lattice_nodes = created;
        Ok(())
    }

    pub(super) fn render_mesh_segments(
        &mut self,
        selected: &[SegmentId],
    ) -> Result<Vec<PartialFailure>, VolsegError> {
        self.prune_stale_nodes();
        let selected = dedup_ids(selected);
        let (Some(entry), Some(metadata)) =
            (self.entry.as_ref(), self.metadata.as_ref())
        else {
            return if selected.is_empty() {
                Ok(Vec::new())
            } else {
                Err(VolsegError::NoSegmentation)
            };
        };
        self.current_segment = match selected.as_slice() {
            [id] => metadata.segment(*id).cloned(),
            _ => None,
        };

        let fallback = self.options.segments.fallback_color;
        let preferred = self.options.segments.preferred_detail;
        let mut batch = SceneBatch::new();
        for handle in self.mesh_nodes.handles() {
            batch.set_visible(handle, false);
        }

        let mut created: Vec<(SegmentId, CachedNode)> = Vec::new();
        let mut shown = Vec::with_capacity(selected.len());
        let mut failures = Vec::new();
        for &id in &selected {
            if let Some(node) = self.mesh_nodes.get(id) {
                shown.push(node.handle);
                continue;
            }
            let geometry = match self.prefetched.remove(&id) {
                Some(prefetched) => prefetched,
                None => fetch_segment_mesh(
                    self.api.as_ref(),
                    entry,
                    metadata,
                    id,
                    preferred,
                ),
            };
            match geometry {
                Ok(mesh) => {
                    let handle = self.scene.allocate(NodeKind::Mesh);
                    let color = metadata
                        .segment(id)
                        .map_or(fallback, |s| s.color_or(fallback));
                    batch.create(
                        handle,
                        None,
                        NodePayload::Mesh {
                            segment: id,
                            detail: mesh.detail,
                            color,
                            meshes: mesh.meshes,
                        },
                    );
                    created.push((
                        id,
                        CachedNode {
                            handle,
                            detail: mesh.detail,
                        },
                    ));
                    shown.push(handle);
                }
                Err(error) => {
                    log::warn!("segment {id}: {error}");
                    failures.push(PartialFailure {
                        scope: FailureScope::Segment(id),
                        error,
                    });
                }
            }
        }
        for handle in shown {
            batch.set_visible(handle, true);
        }

        batch.commit(&mut self.scene)?;
        log::debug!(
            "mesh view: {} shown, {} new, {} failed",
            selected.len() - failures.len(),
            created.len(),
            failures.len()
        );
        for (id, node) in created {
            self.mesh_nodes.insert(id, node);
        }
        Ok(failures)
    }
}
