//! Graph vertex and its attribute/edge slots

use crate::schema::{AttrKind, AttrType, EdgeKind, NodeKind};
use crate::storage::string_table::{Key, EMPTY_KEY};
use super::range::Range;

/// Dense node id; 0 is null
pub type NodeId = u32;

pub const NULL_ID: NodeId = 0;

/// Value of one attribute slot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttrValue {
    Int(i64),
    Bool(bool),
    Float(f64),
    Str(Key),
    Range(Range),
}

impl AttrValue {
    pub fn zero(ty: AttrType) -> Self {
        match ty {
            AttrType::Int => AttrValue::Int(0),
            AttrType::Bool => AttrValue::Bool(false),
            AttrType::Float => AttrValue::Float(0.0),
            AttrType::Str => AttrValue::Str(EMPTY_KEY),
            AttrType::Range => AttrValue::Range(Range::default()),
        }
    }

    pub fn value_type(&self) -> AttrType {
        match self {
            AttrValue::Int(_) => AttrType::Int,
            AttrValue::Bool(_) => AttrType::Bool,
            AttrValue::Float(_) => AttrType::Float,
            AttrValue::Str(_) => AttrType::Str,
            AttrValue::Range(_) => AttrType::Range,
        }
    }

    /// Interned key held by the value, if any
    pub fn string_key(&self) -> Option<Key> {
        match self {
            AttrValue::Str(k) => Some(*k),
            AttrValue::Range(r) => Some(r.path),
            _ => None,
        }
    }
}

/// Stored targets of one edge slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeSlot {
    Single(NodeId),
    Multi(Vec<NodeId>),
}

impl EdgeSlot {
    /// Stored ids, unfiltered. An empty single edge yields nothing.
    pub fn ids(&self) -> &[NodeId] {
        match self {
            EdgeSlot::Single(NULL_ID) => &[],
            EdgeSlot::Single(id) => std::slice::from_ref(id),
            EdgeSlot::Multi(v) => v,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    kind: NodeKind,
    pub(crate) attrs: Vec<AttrValue>,
    pub(crate) edges: Vec<EdgeSlot>,
}

impl Node {
    /// Zero-valued node of `kind`
    pub(crate) fn new(id: NodeId, kind: NodeKind) -> Self {
        let layout = kind.layout();
        Self {
            id,
            kind,
            attrs: layout.attrs.iter().map(|a| AttrValue::zero(a.value_type())).collect(),
            edges: layout
                .edges
                .iter()
                .map(|d| if d.multi { EdgeSlot::Multi(Vec::new()) } else { EdgeSlot::Single(NULL_ID) })
                .collect(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn attr(&self, attr: AttrKind) -> Option<&AttrValue> {
        self.kind.layout().attr_slot(attr).map(|i| &self.attrs[i])
    }

    pub fn attrs(&self) -> &[AttrValue] {
        &self.attrs
    }

    pub fn edge_slots(&self) -> &[EdgeSlot] {
        &self.edges
    }

    /// Stored ids of `edge`, or None when the kind does not declare it.
    /// Does not check existence or filtering of the targets.
    pub fn raw_targets(&self, edge: EdgeKind) -> Option<&[NodeId]> {
        self.kind.layout().edge_slot(edge).map(|i| self.edges[i].ids())
    }

    /// Every stored (edge kind, target) pair in layout order
    pub fn out_edges(&self) -> impl Iterator<Item = (EdgeKind, NodeId)> + '_ {
        self.kind
            .layout()
            .edges
            .iter()
            .zip(&self.edges)
            .flat_map(|(d, slot)| slot.ids().iter().map(move |&t| (d.kind, t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_node_is_zero_valued() {
        let n = Node::new(5, NodeKind::Method);
        assert_eq!(n.id(), 5);
        assert_eq!(n.attr(AttrKind::Name), Some(&AttrValue::Str(EMPTY_KEY)));
        assert_eq!(n.attr(AttrKind::IsAbstract), Some(&AttrValue::Bool(false)));
        assert_eq!(n.attr(AttrKind::IntValue), None);
        assert_eq!(n.raw_targets(EdgeKind::MethodHasParameters), Some(&[][..]));
        assert_eq!(n.raw_targets(EdgeKind::IfHasThen), None);
        assert_eq!(n.out_edges().count(), 0);
    }
}
