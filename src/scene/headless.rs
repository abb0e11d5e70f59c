use super::{NodeHandle, NodeId, NodeKind, NodePayload, SceneGraph, SceneOp};
use crate::error::VolsegError;

/// A node stored by [`HeadlessScene`].
#[derive(Debug, Clone)]
pub struct SceneNode {
    handle: NodeHandle,
    parent: Option<NodeHandle>,
    payload: NodePayload,
    visible: bool,
}

impl SceneNode {
    /// Node handle.
    #[must_use]
    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    /// Parent node, `None` at the root.
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    /// Attached data.
    #[must_use]
    pub fn payload(&self) -> &NodePayload {
        &self.payload
    }

    /// Own visibility flag (ignores ancestors).
    #[must_use]
    pub fn visible(&self) -> bool {
        self.visible
    }
}

/// In-memory scene graph: flat node storage in creation order.
///
/// Tracks a generation counter so consumers can poll for changes the way a
/// renderer would.
#[derive(Debug, Default)]
pub struct HeadlessScene {
    nodes: Vec<SceneNode>,
    next_id: u64,
    /// Bumped on every applied commit or clear.
    generation: u64,
    /// Generation last consumed via `mark_rendered`.
    rendered_generation: u64,
    commits: usize,
}

impl HeadlessScene {
    /// Empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the scene changed since the last `mark_rendered()`.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.generation != self.rendered_generation
    }

    /// Mark the current generation as consumed.
    pub fn mark_rendered(&mut self) {
        self.rendered_generation = self.generation;
    }

    /// Current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of successfully applied commits.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    /// All nodes in creation order.
    #[must_use]
    pub fn nodes(&self) -> &[SceneNode] {
        &self.nodes
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, handle: NodeHandle) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.handle == handle)
    }

    /// Nodes of one kind, in creation order.
    #[must_use]
    pub fn nodes_of_kind(&self, kind: NodeKind) -> Vec<NodeHandle> {
        self.nodes
            .iter()
            .filter(|n| n.handle.kind() == kind)
            .map(|n| n.handle)
            .collect()
    }

    /// Direct children of a node.
    #[must_use]
    pub fn children(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        self.nodes
            .iter()
            .filter(|n| n.parent == Some(handle))
            .map(|n| n.handle)
            .collect()
    }

    /// Effective visibility: the node and all its ancestors are visible.
    #[must_use]
    pub fn is_visible(&self, handle: NodeHandle) -> bool {
        let mut current = self.node(handle);
        while let Some(node) = current {
            if !node.visible {
                return false;
            }
            current = node.parent.and_then(|p| self.node(p));
        }
        self.contains(handle)
    }

    /// Effectively visible nodes of one kind.
    #[must_use]
    pub fn visible_nodes(&self, kind: NodeKind) -> Vec<NodeHandle> {
        self.nodes_of_kind(kind)
            .into_iter()
            .filter(|&h| self.is_visible(h))
            .collect()
    }

    fn apply(
        nodes: &mut Vec<SceneNode>,
        next_id: u64,
        op: SceneOp,
    ) -> Result<(), VolsegError> {
        let position = |nodes: &[SceneNode], handle: NodeHandle| {
            nodes
                .iter()
                .position(|n| n.handle == handle)
                .ok_or_else(|| VolsegError::Scene(format!("no node {handle}")))
        };

        match op {
            SceneOp::Create {
                handle,
                parent,
                payload,
            } => {
                if handle.id().0 >= next_id {
                    return Err(VolsegError::Scene(format!(
                        "{handle} was never allocated"
                    )));
                }
                if nodes.iter().any(|n| n.handle.id() == handle.id()) {
                    return Err(VolsegError::Scene(format!(
                        "{handle} already exists"
                    )));
                }
                if !payload.fits(handle.kind()) {
                    return Err(VolsegError::Scene(format!(
                        "payload does not fit {handle}"
                    )));
                }
                if let Some(p) = parent {
                    let _ = position(nodes, p)?;
                }
                nodes.push(SceneNode {
                    handle,
                    parent,
                    payload,
                    visible: true,
                });
            }
            SceneOp::Update { handle, payload } => {
                if !payload.fits(handle.kind()) {
                    return Err(VolsegError::Scene(format!(
                        "payload does not fit {handle}"
                    )));
                }
                let i = position(nodes, handle)?;
                nodes[i].payload = payload;
            }
            SceneOp::Delete(handle) => {
                let _ = position(nodes, handle)?;
                let mut doomed = vec![handle];
                let mut i = 0;
                while let Some(&h) = doomed.get(i) {
                    doomed.extend(
                        nodes
                            .iter()
                            .filter(|n| n.parent == Some(h))
                            .map(|n| n.handle),
                    );
                    i += 1;
                }
                nodes.retain(|n| !doomed.contains(&n.handle));
            }
            SceneOp::SetVisibility { handle, visible } => {
                let i = position(nodes, handle)?;
                nodes[i].visible = visible;
            }
        }
        Ok(())
    }
}

impl SceneGraph for HeadlessScene {
    fn allocate(&mut self, kind: NodeKind) -> NodeHandle {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        NodeHandle::new(kind, id)
    }

    fn commit(&mut self, ops: Vec<SceneOp>) -> Result<(), VolsegError> {
        // Apply to a copy so a failing op leaves the scene untouched.
        let mut staged = self.nodes.clone();
        for op in ops {
            Self::apply(&mut staged, self.next_id, op)?;
        }
        self.nodes = staged;
        self.generation += 1;
        self.commits += 1;
        Ok(())
    }

    fn contains(&self, handle: NodeHandle) -> bool {
        self.node(handle).is_some()
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::scene::{IsosurfaceParams, SceneBatch};
    use crate::volume::{Grid, GridSpace, IsoValue, Volume};

    fn volume() -> NodePayload {
        let grid = Grid::from_data(GridSpace::new([1, 1, 1]), vec![1.0]).unwrap();
        NodePayload::Volume(Arc::new(Volume::new("v", grid)))
    }

    fn iso() -> NodePayload {
        NodePayload::Isosurface(IsosurfaceParams {
            iso_value: IsoValue::Absolute(0.95),
            alpha: 1.0,
            color: [0.5; 3],
        })
    }

    #[test]
    fn create_and_delete_subtree() {
        let mut scene = HeadlessScene::new();
        let vol = scene.allocate(NodeKind::LatticeVolume);
        let surf = scene.allocate(NodeKind::Isosurface);
        let mut batch = SceneBatch::new();
        batch.create(vol, None, volume());
        batch.create(surf, Some(vol), iso());
        batch.commit(&mut scene).unwrap();
        assert_eq!(scene.node_count(), 2);
        assert_eq!(scene.children(vol), vec![surf]);

        scene.commit(vec![SceneOp::Delete(vol)]).unwrap();
        assert_eq!(scene.node_count(), 0);
        assert_eq!(scene.commit_count(), 2);
    }

    #[test]
    fn failing_batch_changes_nothing() {
        let mut scene = HeadlessScene::new();
        let vol = scene.allocate(NodeKind::LatticeVolume);
        let ghost = scene.allocate(NodeKind::Mesh);
        let result = scene.commit(vec![
            SceneOp::Create {
                handle: vol,
                parent: None,
                payload: volume(),
            },
            SceneOp::SetVisibility {
                handle: ghost,
                visible: false,
            },
        ]);
        assert!(matches!(result, Err(VolsegError::Scene(_))));
        assert_eq!(scene.node_count(), 0);
        assert!(!scene.is_dirty());
    }

    #[test]
    fn rejects_mismatched_payload_and_unallocated_handles() {
        let mut scene = HeadlessScene::new();
        let surf = scene.allocate(NodeKind::Isosurface);
        assert!(scene
            .commit(vec![SceneOp::Create {
                handle: surf,
                parent: None,
                payload: volume(),
            }])
            .is_err());
        let unallocated = NodeHandle::Mesh(NodeId(99));
        assert!(scene
            .commit(vec![SceneOp::Delete(unallocated)])
            .is_err());
    }

    #[test]
    fn visibility_is_inherited() {
        let mut scene = HeadlessScene::new();
        let vol = scene.allocate(NodeKind::LatticeVolume);
        let surf = scene.allocate(NodeKind::Isosurface);
        let mut batch = SceneBatch::new();
        batch.create(vol, None, volume());
        batch.create(surf, Some(vol), iso());
        batch.set_visible(vol, false);
        batch.commit(&mut scene).unwrap();
        assert!(!scene.is_visible(surf));
        assert!(scene.node(surf).unwrap().visible());
        assert!(scene.visible_nodes(NodeKind::Isosurface).is_empty());
    }

    #[test]
    fn dirty_tracking() {
        let mut scene = HeadlessScene::new();
        assert!(!scene.is_dirty());
        scene.clear();
        assert!(scene.is_dirty());
        scene.mark_rendered();
        assert!(!scene.is_dirty());
    }
}
