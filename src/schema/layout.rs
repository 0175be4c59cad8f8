//! Flattened per-kind slot layout

use std::sync::OnceLock;

use strum::{EnumCount, IntoEnumIterator};

use super::{AttrKind, EdgeDef, EdgeKind, NodeKind};

/// Attribute and edge slots of one kind.
///
/// Slot order is capability items first (in capability order), then the
/// kind's own items. This order is the "schema declaration order" followed by
/// traversal and by the binary codec.
#[derive(Debug)]
pub struct Layout {
    pub kind: NodeKind,
    pub attrs: Vec<AttrKind>,
    pub edges: Vec<EdgeDef>,
}

static LAYOUTS: OnceLock<Vec<Layout>> = OnceLock::new();

pub(super) fn layout_of(kind: NodeKind) -> &'static Layout {
    let all = LAYOUTS.get_or_init(|| {
        let mut v: Vec<Layout> = Vec::with_capacity(NodeKind::COUNT);
        for k in NodeKind::iter() {
            v.push(Layout::build(k));
        }
        v
    });
    &all[kind as usize]
}

impl Layout {
    fn build(kind: NodeKind) -> Self {
        let mut attrs = Vec::new();
        let mut edges = Vec::new();
        for cap in kind.capabilities() {
            attrs.extend_from_slice(cap.attrs());
            edges.extend(cap.edges().iter().map(|e| e.def()));
        }
        attrs.extend_from_slice(kind.own_attrs());
        edges.extend(kind.own_edges().iter().map(|e| e.def()));
        Self { kind, attrs, edges }
    }

    /// Resolve an edge kind to its slot.
    ///
    /// The kind's own edges are tried first, then each capability in order.
    pub fn edge_slot(&self, edge: EdgeKind) -> Option<usize> {
        if self.kind.own_edges().contains(&edge) {
            return self.edges.iter().rposition(|d| d.kind == edge);
        }
        for cap in self.kind.capabilities() {
            if cap.edges().contains(&edge) {
                return self.edges.iter().position(|d| d.kind == edge);
            }
        }
        None
    }

    pub fn attr_slot(&self, attr: AttrKind) -> Option<usize> {
        self.attrs.iter().position(|a| *a == attr)
    }

    pub fn tree_edges(&self) -> impl Iterator<Item = (usize, &EdgeDef)> {
        self.edges.iter().enumerate().filter(|(_, d)| d.tree)
    }
}
