//! Reverse edge index: target -> (source, edge kind) multiset

use std::collections::HashMap;

use crate::graph::NodeId;
use crate::schema::EdgeKind;

/// Incoming edges per target.
///
/// Entries of one target keep insertion order. The same (source, kind) pair
/// may appear more than once when a multiple edge holds the target twice.
#[derive(Debug, Default, Clone)]
pub struct ReverseEdges {
    incoming: HashMap<NodeId, Vec<(NodeId, EdgeKind)>>,
}

impl ReverseEdges {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_edge(&mut self, target: NodeId, source: NodeId, kind: EdgeKind) {
        self.incoming.entry(target).or_default().push((source, kind));
    }

    /// Remove one occurrence; returns false if there was none
    pub fn remove_edge(&mut self, target: NodeId, source: NodeId, kind: EdgeKind) -> bool {
        let Some(list) = self.incoming.get_mut(&target) else {
            return false;
        };
        let Some(pos) = list.iter().position(|&e| e == (source, kind)) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            self.incoming.remove(&target);
        }
        true
    }

    pub fn query(&self, target: NodeId) -> impl Iterator<Item = (NodeId, EdgeKind)> + '_ {
        self.incoming.get(&target).into_iter().flatten().copied()
    }

    /// Sources pointing at `target` through `kind`
    pub fn sources(&self, target: NodeId, kind: EdgeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.query(target).filter(move |(_, k)| *k == kind).map(|(s, _)| s)
    }

    /// Drop every entry whose target is `id`
    pub fn remove_target(&mut self, id: NodeId) -> Vec<(NodeId, EdgeKind)> {
        self.incoming.remove(&id).unwrap_or_default()
    }

    /// Total number of indexed edges
    pub fn len(&self) -> usize {
        self.incoming.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.incoming.is_empty()
    }
}
