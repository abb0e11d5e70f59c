use rustc_hash::FxHashMap;

use crate::metadata::{DetailLevel, SegmentId};
use crate::scene::NodeHandle;

/// A mesh node created for a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedNode {
    /// Scene node.
    pub handle: NodeHandle,
    /// Detail level its geometry was fetched at.
    pub detail: DetailLevel,
}

/// Segment id → mesh node, at most one per segment per loaded entry.
///
/// Selections toggle visibility of cached nodes instead of recreating
/// them; the cache is only emptied when a new entry loads.
#[derive(Debug, Default)]
pub struct SegmentNodeCache {
    nodes: FxHashMap<SegmentId, CachedNode>,
}

impl SegmentNodeCache {
    /// Node of a segment.
    #[must_use]
    pub fn get(&self, segment: SegmentId) -> Option<CachedNode> {
        self.nodes.get(&segment).copied()
    }

    /// Whether a segment has a node.
    #[must_use]
    pub fn contains(&self, segment: SegmentId) -> bool {
        self.nodes.contains_key(&segment)
    }

    pub(super) fn insert(&mut self, segment: SegmentId, node: CachedNode) {
        let _ = self.nodes.insert(segment, node);
    }

    /// Every cached node handle.
    pub fn handles(&self) -> impl Iterator<Item = NodeHandle> + '_ {
        self.nodes.values().map(|n| n.handle)
    }

    /// Cached segment ids, ascending.
    #[must_use]
    pub fn segments(&self) -> Vec<SegmentId> {
        let mut ids: Vec<_> = self.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of cached nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Keep only the nodes for which `keep` holds.
    pub(super) fn retain(&mut self, mut keep: impl FnMut(&CachedNode) -> bool) {
        self.nodes.retain(|_, node| keep(node));
    }

    pub(super) fn clear(&mut self) {
        self.nodes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::NodeId;

    #[test]
    fn one_node_per_segment() {
        let mut cache = SegmentNodeCache::default();
        let node = |id| CachedNode {
            handle: NodeHandle::Mesh(NodeId(id)),
            detail: 2,
        };
        cache.insert(7, node(0));
        cache.insert(3, node(1));
        cache.insert(7, node(2));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(7), Some(node(2)));
        assert_eq!(cache.segments(), vec![3, 7]);
        cache.clear();
        assert!(cache.is_empty());
        assert!(!cache.contains(3));
    }
}
