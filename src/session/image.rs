use std::sync::Arc;

use super::Session;
use crate::error::VolsegError;
use crate::scene::{NodeKind, NodePayload, SceneBatch, SceneGraph};
use crate::volume::{threshold_mask, Volume};

impl<S: SceneGraph> Session<S> {
    /// Move the image threshold to `value` standard deviations.
    ///
    /// With `show_segmentation` the image surface becomes a backdrop and
    /// two z-score masks replace any previous ones: *plus* above the
    /// configured upper threshold, *minus* between `value` and it. Without
    /// an image loaded this does nothing.
    pub fn set_iso_value(
        &mut self,
        value: f64,
        show_segmentation: bool,
    ) -> Result<(), VolsegError> {
        let result = self.render_image(value, show_segmentation);
        self.publish_outcome(&result);
        result
    }

    fn render_image(
        &mut self,
        value: f64,
        show_segmentation: bool,
    ) -> Result<(), VolsegError> {
        self.prune_stale_nodes();
        let (Some(surface), Some(volume)) =
            (self.image_surface, self.volume.clone())
        else {
            log::debug!("no image loaded, ignoring iso value {value}");
            return Ok(());
        };
        let image = &self.options.image;

        let mut batch = SceneBatch::new();
        batch.update(
            surface,
            NodePayload::Isosurface(image.surface(value, show_segmentation)),
        );
        for &node in &self.threshold_nodes {
            batch.delete(node);
        }

        let mut created = Vec::new();
        if show_segmentation {
            let upper = image.upper_threshold;
            let masks = [
                (
                    "plus",
                    threshold_mask(&volume.grid, |z| z > upper),
                    image.plus_surface(),
                ),
                (
                    "minus",
                    threshold_mask(&volume.grid, |z| value < z && z < upper),
                    image.minus_surface(),
                ),
            ];
            for (name, grid, params) in masks {
                let node = self.scene.allocate(NodeKind::LatticeVolume);
                let iso = self.scene.allocate(NodeKind::Isosurface);
                batch.create(
                    node,
                    None,
                    NodePayload::Volume(Arc::new(Volume::new(name, grid))),
                );
                batch.create(iso, Some(node), NodePayload::Isosurface(params));
                created.push(node);
            }
        }

        batch.commit(&mut self.scene)?;
        log::debug!(
            "image threshold {value} ({} masks)",
            created.len()
        );
        self.threshold_nodes = created;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::mock::{self, MockServer};
    use super::*;
    use crate::scene::HeadlessScene;

    fn mask_data(scene: &HeadlessScene, handle: crate::scene::NodeHandle) -> Vec<f32> {
        match scene.node(handle).unwrap().payload() {
            NodePayload::Volume(v) => v.grid.data().to_vec(),
            other => unreachable!("not a volume: {other:?}"),
        }
    }

    fn surface_alpha(scene: &HeadlessScene, handle: crate::scene::NodeHandle) -> f32 {
        match scene.node(handle).unwrap().payload() {
            NodePayload::Isosurface(p) => p.alpha,
            other => unreachable!("not an isosurface: {other:?}"),
        }
    }

    #[test]
    fn image_load_skips_metadata() {
        let server = MockServer::sample().with_metadata(None);
        let mut session = mock::session(&server);
        session.load_image("emd-99999").unwrap();

        let surface = session.image_surface().unwrap();
        assert_eq!(surface_alpha(session.scene(), surface), 1.0);
        assert_eq!(session.scene().node_count(), 2);
        assert!(session.state().error.is_none());
    }

    #[test]
    fn segmentation_adds_and_removes_masks() {
        let server = MockServer::sample();
        let mut session = mock::session(&server);
        session.load_image("emd-99999").unwrap();
        let surface = session.image_surface().unwrap();

        // z-scores of [0, 1, 2, 3] are about [-1.34, -0.45, 0.45, 1.34]
        session.set_iso_value(-1.0, true).unwrap();
        let masks = session.threshold_nodes().to_vec();
        assert_eq!(masks.len(), 2);
        assert_eq!(mask_data(session.scene(), masks[0]), vec![0.0, 0.0, 1.0, 1.0]);
        assert_eq!(mask_data(session.scene(), masks[1]), vec![0.0, 1.0, 0.0, 0.0]);
        assert_eq!(surface_alpha(session.scene(), surface), 0.0);
        assert_eq!(session.scene().node_count(), 6);

        session.set_iso_value(-1.0, true).unwrap();
        assert_eq!(session.scene().node_count(), 6);

        session.set_iso_value(-0.5, false).unwrap();
        assert!(session.threshold_nodes().is_empty());
        assert_eq!(session.scene().node_count(), 2);
        assert_eq!(surface_alpha(session.scene(), surface), 1.0);
    }

    #[test]
    fn iso_value_without_image_is_ignored() {
        let server = MockServer::sample();
        let mut session = mock::session(&server);
        session.load_auto("emd-1832").unwrap();
        let before = session.scene().node_count();
        session.set_iso_value(0.5, true).unwrap();
        assert_eq!(session.scene().node_count(), before);
        assert!(session.threshold_nodes().is_empty());
    }
}
