//! Preorder traversal over a factory
//!
//! A run enters a node (`visit` on every active visitor, then depth + 1),
//! walks its edge slots in layout order and multiple edges in stored order
//! (`visit_edge`, optional descent, `visit_edge_end`), then leaves it
//! (depth - 1, `visit_end`). Tree edges always descend. Reference edges
//! descend only for kinds registered with
//! [`PreorderTraversal::set_cross_edge_to_traversal`].
//!
//! A rooted run may be followed by two extra passes: special nodes not
//! reached yet, and a fixed-point sweep over nodes that were only seen
//! through reference edges.

use strum::EnumCount;

use crate::config::TraversalConfig;
use crate::error::{GraphError, Result};
use crate::graph::{Factory, Node, NodeId};
use crate::schema::EdgeKind;
use crate::visitor::{VisitContext, Visitor};

struct Slot<'a> {
    visitor: &'a mut dyn Visitor,
    depth: u32,
    stopped: bool,
}

pub struct PreorderTraversal<'a> {
    factory: Option<&'a Factory>,
    visitors: Vec<Slot<'a>>,
    config: TraversalConfig,
    cross_edges: [bool; EdgeKind::COUNT],

    // run state
    visited: Vec<bool>,
    unvisited: Vec<bool>,
    rooted: bool,
    need_stop: bool,
}

impl<'a> Default for PreorderTraversal<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> PreorderTraversal<'a> {
    pub fn new() -> Self {
        Self::with_config(TraversalConfig::default())
    }

    pub fn with_config(config: TraversalConfig) -> Self {
        let mut cross_edges = [false; EdgeKind::COUNT];
        for kind in &config.cross_edge_kinds {
            cross_edges[*kind as usize] = true;
        }
        Self {
            factory: None,
            visitors: Vec::new(),
            config,
            cross_edges,
            visited: Vec::new(),
            unvisited: Vec::new(),
            rooted: false,
            need_stop: false,
        }
    }

    pub fn set_factory(&mut self, factory: &'a Factory) {
        self.factory = Some(factory);
    }

    /// Visitors are called in registration order
    pub fn add_visitor(&mut self, visitor: &'a mut dyn Visitor) {
        self.visitors.push(Slot { visitor, depth: 0, stopped: false });
    }

    pub fn visitor_count(&self) -> usize {
        self.visitors.len()
    }

    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }

    pub fn set_safe_mode(&mut self, on: bool) {
        self.config.safe_mode = on;
    }

    pub fn set_visit_cross_edge_tree(&mut self, on: bool) {
        self.config.visit_cross_edge_tree = on;
    }

    pub fn set_visit_filtered_edges(&mut self, on: bool) {
        self.config.visit_filtered_edges = on;
    }

    pub fn set_visit_special_nodes(&mut self, visit: bool, used_only: bool) {
        self.config.visit_special_nodes = visit;
        self.config.visit_used_special_nodes_only = visit && used_only;
    }

    /// Follow reference edges of `kind` during the descent
    pub fn set_cross_edge_to_traversal(&mut self, kind: EdgeKind) {
        self.cross_edges[kind as usize] = true;
        if !self.config.cross_edge_kinds.contains(&kind) {
            self.config.cross_edge_kinds.push(kind);
        }
    }

    /// Visit every live unfiltered node without a tree parent, in id order
    pub fn run(&mut self) -> Result<()> {
        self.main_run(None)
    }

    /// Visit the subtree of `root`, then the configured extra passes
    pub fn run_from(&mut self, root: NodeId) -> Result<()> {
        self.main_run(Some(root))
    }

    fn main_run(&mut self, root: Option<NodeId>) -> Result<()> {
        let fact = self.factory.ok_or(GraphError::NoFactory)?;
        if self.visitors.is_empty() {
            return Err(GraphError::NoVisitor);
        }
        if let Some(r) = root {
            fact.get_pointer(r)?;
        }

        // restored on every exit path
        let _filter = self.config.visit_filtered_edges.then(|| fact.filter_guard(false));

        self.start(fact, root.is_some());

        match root {
            Some(r) => {
                self.visit_node(fact, r);
                if !self.need_stop {
                    self.special_pass(fact);
                }
                if !self.need_stop {
                    self.cross_edge_sweep(fact);
                }
            }
            None => {
                for node in fact.iter() {
                    if self.need_stop {
                        break;
                    }
                    if fact.parent(node.id()).is_none() && !self.visited[node.id() as usize] {
                        self.visit_node(fact, node.id());
                    }
                }
            }
        }

        self.finish(fact);
        Ok(())
    }

    fn start(&mut self, fact: &'a Factory, rooted: bool) {
        let size = fact.slot_count();
        self.visited = vec![false; size];
        self.unvisited = vec![false; size];
        self.rooted = rooted;
        self.need_stop = false;
        for slot in &mut self.visitors {
            slot.depth = 0;
        }
        self.each(fact, |v, ctx| v.begin_visit(ctx));
        self.clear_stopped();
    }

    fn finish(&mut self, fact: &'a Factory) {
        self.each(fact, |v, ctx| v.finish_visit(ctx));
        self.clear_stopped();
        tracing::debug!(
            "Preorder finished: {} nodes visited, {} visitors active",
            self.visited.iter().filter(|v| **v).count(),
            self.visitors.len()
        );
    }

    fn each<F>(&mut self, fact: &'a Factory, mut f: F)
    where
        F: FnMut(&mut dyn Visitor, &mut VisitContext<'_>),
    {
        for slot in self.visitors.iter_mut() {
            let mut ctx = VisitContext::new(fact, slot.depth);
            f(&mut *slot.visitor, &mut ctx);
            if ctx.stop_requested() {
                slot.stopped = true;
            }
        }
    }

    /// Drop stopped visitors; true when none is left
    fn clear_stopped(&mut self) -> bool {
        if self.visitors.iter().any(|s| s.stopped) {
            self.visitors.retain(|s| !s.stopped);
            self.need_stop = self.visitors.is_empty();
        }
        self.need_stop
    }

    fn visit_node(&mut self, fact: &'a Factory, id: NodeId) {
        let Some(node) = fact.get_ref(id) else {
            return;
        };
        let idx = id as usize;
        if self.config.safe_mode && self.visited[idx] {
            tracing::warn!("The preorder has touched node {} ({}) twice", id, node.kind().name());
            return;
        }
        self.visited[idx] = true;

        for slot in self.visitors.iter_mut() {
            let mut ctx = VisitContext::new(fact, slot.depth);
            slot.visitor.visit(node, &mut ctx);
            slot.depth += 1;
            if ctx.stop_requested() {
                slot.stopped = true;
            }
        }
        if self.clear_stopped() {
            return;
        }

        self.visit_edges(fact, node);
        if self.need_stop {
            return;
        }

        for slot in self.visitors.iter_mut() {
            slot.depth = slot.depth.saturating_sub(1);
            let mut ctx = VisitContext::new(fact, slot.depth);
            slot.visitor.visit_end(node, &mut ctx);
            if ctx.stop_requested() {
                slot.stopped = true;
            }
        }
        self.clear_stopped();
    }

    fn visit_edges(&mut self, fact: &'a Factory, node: &'a Node) {
        let layout = node.kind().layout();
        for (def, slot) in layout.edges.iter().zip(node.edge_slots()) {
            for &target in slot.ids() {
                // absent and filtered targets read as no edge
                if !fact.is_visible(target) {
                    continue;
                }

                self.each(fact, |v, ctx| v.visit_edge(node, def.kind, target, ctx));
                if self.clear_stopped() {
                    return;
                }

                if def.tree {
                    self.visit_node(fact, target);
                } else {
                    let t = target as usize;
                    if self.rooted
                        && (self.config.visit_cross_edge_tree
                            || (self.config.visit_used_special_nodes_only
                                && fact.kind_of(target).is_some_and(|k| k.is_special())))
                    {
                        self.unvisited[t] = true;
                    }
                    if self.cross_edges[def.kind as usize] && !self.visited[t] {
                        self.visit_node(fact, target);
                    }
                }
                if self.need_stop {
                    return;
                }

                self.each(fact, |v, ctx| v.visit_edge_end(node, def.kind, target, ctx));
                if self.clear_stopped() {
                    return;
                }
            }
        }
    }

    fn special_pass(&mut self, fact: &'a Factory) {
        if !self.config.visit_special_nodes || self.config.visit_used_special_nodes_only {
            return;
        }
        for node in fact.iter() {
            if !self.visited[node.id() as usize] && node.kind().is_special() {
                self.visit_node(fact, node.id());
                if self.need_stop {
                    return;
                }
            }
        }
    }

    /// Repeated scans until no marked node is left unvisited
    fn cross_edge_sweep(&mut self, fact: &'a Factory) {
        if !(self.config.visit_cross_edge_tree || self.config.visit_used_special_nodes_only) {
            return;
        }
        let mut passes = 0usize;
        loop {
            let mut found = false;
            for i in 0..self.unvisited.len() {
                if self.unvisited[i] && !self.visited[i] {
                    self.unvisited[i] = false;
                    found = true;
                    self.visit_node(fact, i as NodeId);
                    if self.need_stop {
                        return;
                    }
                }
            }
            passes += 1;
            if !found {
                break;
            }
        }
        tracing::debug!("Cross edge sweep done in {} passes", passes);
    }
}
