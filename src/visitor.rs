//! Visitor interface driven by [`crate::PreorderTraversal`]
//!
//! Every hook has a no-op default, so a visitor overrides only what it needs
//! and dispatches on [`Node::kind`] itself.

use crate::graph::{Factory, Node, NodeId};
use crate::schema::EdgeKind;

/// Per-callback view of the running traversal
pub struct VisitContext<'a> {
    factory: &'a Factory,
    depth: u32,
    stop: bool,
}

impl<'a> VisitContext<'a> {
    pub(crate) fn new(factory: &'a Factory, depth: u32) -> Self {
        Self { factory, depth, stop: false }
    }

    pub fn factory(&self) -> &'a Factory {
        self.factory
    }

    /// Number of nodes entered but not yet left by this visitor
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Ask the traversal to drop this visitor once the current callbacks finish
    pub fn stop(&mut self) {
        self.stop = true;
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop
    }
}

#[allow(unused_variables)]
pub trait Visitor {
    fn begin_visit(&mut self, ctx: &mut VisitContext<'_>) {}

    fn finish_visit(&mut self, ctx: &mut VisitContext<'_>) {}

    fn visit(&mut self, node: &Node, ctx: &mut VisitContext<'_>) {}

    fn visit_end(&mut self, node: &Node, ctx: &mut VisitContext<'_>) {}

    /// Entering `edge` of `src` towards `target`
    fn visit_edge(&mut self, src: &Node, edge: EdgeKind, target: NodeId, ctx: &mut VisitContext<'_>) {}

    fn visit_edge_end(&mut self, src: &Node, edge: EdgeKind, target: NodeId, ctx: &mut VisitContext<'_>) {}
}
