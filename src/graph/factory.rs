//! Factory: single owner of all nodes of one graph
//!
//! Nodes live in a dense arena indexed by [`NodeId`]. Deleted slots become
//! tombstones and their ids are never handed out again, so a stale id always
//! reads as absent instead of aliasing a newer node.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{GraphError, Result};
use crate::index::ReverseEdges;
use crate::schema::{AttrKind, EdgeDef, EdgeKind, NodeKind};
use crate::storage::string_table::{Key, StringTable, EMPTY_KEY};
use super::filter::{Filter, FilterState};
use super::node::{AttrValue, EdgeSlot, Node, NodeId, NULL_ID};
use super::range::Range;
use super::traversal;

/// Id of the root package every factory owns
pub const ROOT_ID: NodeId = 1;

static NEXT_FACTORY_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a factory instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FactoryId(u64);

impl FactoryId {
    fn next() -> Self {
        Self(NEXT_FACTORY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Node id qualified by the factory it came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub factory: FactoryId,
    pub id: NodeId,
}

/// Incoming tree edge of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentLink {
    pub parent: NodeId,
    pub edge: EdgeKind,
}

/// Restores the previous filter toggle on drop
pub struct FilterGuard<'a> {
    flag: &'a Cell<bool>,
    prev: bool,
}

impl Drop for FilterGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(self.prev);
    }
}

#[derive(Debug)]
pub struct Factory {
    id: FactoryId,
    nodes: Vec<Option<Node>>,
    parents: Vec<Option<ParentLink>>,
    strings: StringTable,
    filter: Filter,
    filter_on: Cell<bool>,
    reverse: Option<ReverseEdges>,
}

impl Default for Factory {
    fn default() -> Self {
        Self::new()
    }
}

/// Remove the first occurrence of `id` from a slot
fn strip_id(slot: &mut EdgeSlot, id: NodeId) -> bool {
    match slot {
        EdgeSlot::Single(t) if *t == id => {
            *t = NULL_ID;
            true
        }
        EdgeSlot::Single(_) => false,
        EdgeSlot::Multi(v) => match v.iter().position(|&t| t == id) {
            Some(pos) => {
                v.remove(pos);
                true
            }
            None => false,
        },
    }
}

impl Factory {
    pub fn new() -> Self {
        Self::with_string_table(StringTable::new())
    }

    /// New factory with its root package, interning into `strings`
    pub fn with_string_table(strings: StringTable) -> Self {
        let mut factory = Self::from_parts(strings, 1);
        factory.create(NodeKind::Package);
        factory
    }

    fn from_parts(strings: StringTable, slots: usize) -> Self {
        Self {
            id: FactoryId::next(),
            nodes: vec![None; slots],
            parents: vec![None; slots],
            strings,
            filter: Filter::new(slots),
            filter_on: Cell::new(true),
            reverse: None,
        }
    }

    /// Empty arena of `slots` tombstones, without a root.
    ///
    /// The size comes from a file, so an arena that cannot be allocated is
    /// an error instead of an abort.
    pub(crate) fn try_from_parts(strings: StringTable, slots: usize) -> Result<Self> {
        let slots = slots.max(1);
        let too_large = |_| GraphError::InvalidFormat(format!("cannot allocate {} node slots", slots));

        let mut nodes = Vec::new();
        nodes.try_reserve_exact(slots).map_err(too_large)?;
        nodes.resize(slots, None);
        let mut parents = Vec::new();
        parents.try_reserve_exact(slots).map_err(too_large)?;
        parents.resize(slots, None);
        let filter = Filter::try_new(slots).map_err(too_large)?;

        Ok(Self {
            id: FactoryId::next(),
            nodes,
            parents,
            strings,
            filter,
            filter_on: Cell::new(true),
            reverse: None,
        })
    }

    pub fn id(&self) -> FactoryId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        ROOT_ID
    }

    pub fn handle(&self, id: NodeId) -> NodeRef {
        NodeRef { factory: self.id, id }
    }

    // === NODE LIFECYCLE ===

    /// Allocate a fresh zero-valued node of `kind`
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Some(Node::new(id, kind)));
        self.parents.push(None);
        self.filter.resize(self.nodes.len());
        id
    }

    pub fn get_exist(&self, id: NodeId) -> bool {
        self.get_ref(id).is_some()
    }

    /// Lookup ignoring the filter; None for null, unknown and deleted ids
    pub fn get_ref(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id as usize).and_then(Option::as_ref)
    }

    pub fn get_pointer(&self, id: NodeId) -> Result<&Node> {
        self.get_ref(id).ok_or(GraphError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id as usize)
            .and_then(Option::as_mut)
            .ok_or(GraphError::UnknownNode(id))
    }

    pub fn kind_of(&self, id: NodeId) -> Option<NodeKind> {
        self.get_ref(id).map(Node::kind)
    }

    /// Exists and is not hidden by the filter
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.get_exist(id) && !self.get_is_filtered(id)
    }

    /// Arena size including id 0 and tombstones
    pub fn slot_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live nodes
    pub fn node_count(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    /// Live nodes in id order, skipping filtered ones while the filter is on
    pub fn iter(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().flatten().filter(move |n| !self.get_is_filtered(n.id()))
    }

    /// Live nodes in id order regardless of filtering
    pub fn iter_all(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter().flatten()
    }

    pub fn parent_link(&self, id: NodeId) -> Option<ParentLink> {
        self.parents.get(id as usize).copied().flatten()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent_link(id).map(|l| l.parent)
    }

    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        traversal::ancestors(id, |n| self.parent(n))
    }

    /// Direct children through tree edges, in layout order
    pub fn owned_children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.get_ref(id) else {
            return Vec::new();
        };
        node.kind()
            .layout()
            .tree_edges()
            .flat_map(|(slot, def)| {
                node.edges[slot]
                    .ids()
                    .iter()
                    .copied()
                    .filter(move |&t| self.parent_link(t) == Some(ParentLink { parent: id, edge: def.kind }))
            })
            .collect()
    }

    /// `id` and everything it owns, preorder
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        if !self.get_exist(id) {
            return Vec::new();
        }
        traversal::dfs(&[id], |n| self.owned_children(n))
    }

    /// Delete `id` together with its owned subtree.
    ///
    /// With reverse edges enabled every edge pointing at a deleted node is
    /// removed as well. Without them, reference edges from outside the subtree
    /// keep the stale id and read as absent from then on.
    pub fn delete(&mut self, id: NodeId) -> Result<()> {
        if id == ROOT_ID {
            return Err(GraphError::RootNode(id));
        }
        self.get_pointer(id)?;

        let subtree = self.subtree(id);
        self.detach_from_parent(id);
        for &n in subtree.iter().rev() {
            self.prepare_delete(n);
        }

        tracing::debug!("Deleted node {} with {} owned descendants", id, subtree.len() - 1);
        Ok(())
    }

    /// Deregister every edge of `id` and free its slot. Owned children must
    /// already be gone.
    fn prepare_delete(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id as usize).and_then(Option::take) else {
            return;
        };

        for (kind, t) in node.out_edges() {
            if kind.is_tree() {
                if let Some(p) = self.parents.get_mut(t as usize) {
                    if *p == Some(ParentLink { parent: id, edge: kind }) {
                        *p = None;
                    }
                }
            }
            if let Some(rev) = &mut self.reverse {
                rev.remove_edge(t, id, kind);
            }
        }

        if let Some(rev) = &mut self.reverse {
            for (src, kind) in rev.remove_target(id) {
                if let Some(Some(s)) = self.nodes.get_mut(src as usize) {
                    if let Some(slot) = s.kind().layout().edge_slot(kind) {
                        strip_id(&mut s.edges[slot], id);
                    }
                }
            }
        }

        self.parents[id as usize] = None;
        self.filter.set(id, FilterState::NotFiltered);
    }

    // === EDGES ===

    fn resolve(&self, src: NodeId, edge: EdgeKind) -> Result<(usize, EdgeDef)> {
        let node = self.get_pointer(src)?;
        let layout = node.kind().layout();
        let slot = layout
            .edge_slot(edge)
            .ok_or(GraphError::InvalidEdgeKind { kind: node.kind(), edge })?;
        Ok((slot, layout.edges[slot]))
    }

    fn check_target(&self, src: NodeId, def: &EdgeDef, target: NodeId) -> Result<()> {
        let found = self.get_pointer(target)?.kind();
        if !def.target.accepts(found) {
            return Err(GraphError::InvalidTargetKind { edge: def.kind, target, found });
        }
        if def.tree {
            if target == ROOT_ID {
                return Err(GraphError::RootNode(target));
            }
            if target == src || self.ancestors(src).contains(&target) {
                return Err(GraphError::OwnershipCycle { src, edge: def.kind, dst: target });
            }
        }
        Ok(())
    }

    fn link(&mut self, src: NodeId, def: &EdgeDef, target: NodeId) {
        if def.tree {
            self.parents[target as usize] = Some(ParentLink { parent: src, edge: def.kind });
        }
        if let Some(rev) = &mut self.reverse {
            rev.insert_edge(target, src, def.kind);
        }
    }

    fn unlink(&mut self, src: NodeId, def: &EdgeDef, target: NodeId) {
        if def.tree {
            if let Some(p) = self.parents.get_mut(target as usize) {
                if *p == Some(ParentLink { parent: src, edge: def.kind }) {
                    *p = None;
                }
            }
        }
        if let Some(rev) = &mut self.reverse {
            rev.remove_edge(target, src, def.kind);
        }
    }

    /// Sever the tree edge currently owning `child`, on both sides
    fn detach_from_parent(&mut self, child: NodeId) {
        let Some(link) = self.parent_link(child) else {
            return;
        };
        if let Some(Some(parent)) = self.nodes.get_mut(link.parent as usize) {
            if let Some(slot) = parent.kind().layout().edge_slot(link.edge) {
                strip_id(&mut parent.edges[slot], child);
            }
        }
        self.parents[child as usize] = None;
        if let Some(rev) = &mut self.reverse {
            rev.remove_edge(child, link.parent, link.edge);
        }
    }

    /// Set a single edge, or append to a multiple edge.
    ///
    /// Replacing a populated single edge first releases the old target.
    /// Setting an empty single edge to null is a no-op; setting a populated
    /// one to null fails, use [`Factory::remove_edge`] instead.
    pub fn set_edge(&mut self, src: NodeId, edge: EdgeKind, target: NodeId) -> Result<()> {
        let (slot, def) = self.resolve(src, edge)?;
        if def.multi {
            return self.append(src, slot, &def, target);
        }

        let raw = match &self.get_pointer(src)?.edges[slot] {
            EdgeSlot::Single(t) => *t,
            EdgeSlot::Multi(_) => NULL_ID,
        };
        // a stale id left by a delete reads as an empty edge
        let old = if self.get_exist(raw) { raw } else { NULL_ID };
        if target == NULL_ID {
            if old == NULL_ID {
                if raw != NULL_ID {
                    if let EdgeSlot::Single(t) = &mut self.node_mut(src)?.edges[slot] {
                        *t = NULL_ID;
                    }
                }
                return Ok(());
            }
            return Err(GraphError::CannotClearEdgeToNull { node: src, edge });
        }
        self.check_target(src, &def, target)?;
        if old == target {
            return Ok(());
        }

        if old != NULL_ID {
            self.unlink(src, &def, old);
        }
        if def.tree {
            self.detach_from_parent(target);
        }
        if let EdgeSlot::Single(t) = &mut self.node_mut(src)?.edges[slot] {
            *t = target;
        }
        self.link(src, &def, target);
        Ok(())
    }

    /// Same as [`Factory::set_edge`] with a cross-factory identity check
    pub fn set_edge_ref(&mut self, src: NodeId, edge: EdgeKind, target: NodeRef) -> Result<()> {
        if target.factory != self.id {
            return Err(GraphError::ForeignFactory(target.id));
        }
        self.set_edge(src, edge, target.id)
    }

    /// Append `target` to a multiple edge
    pub fn add_edge(&mut self, src: NodeId, edge: EdgeKind, target: NodeId) -> Result<()> {
        let (slot, def) = self.resolve(src, edge)?;
        if !def.multi {
            return Err(GraphError::NotMultiEdge(edge));
        }
        self.append(src, slot, &def, target)
    }

    fn append(&mut self, src: NodeId, slot: usize, def: &EdgeDef, target: NodeId) -> Result<()> {
        if target == NULL_ID {
            return Err(GraphError::UnknownNode(NULL_ID));
        }
        self.check_target(src, def, target)?;
        if def.tree {
            self.detach_from_parent(target);
        }
        if let EdgeSlot::Multi(v) = &mut self.node_mut(src)?.edges[slot] {
            v.push(target);
        }
        self.link(src, def, target);
        Ok(())
    }

    /// Remove `target` from `edge`.
    ///
    /// For a single edge a null `target` removes whatever is set.
    pub fn remove_edge(&mut self, src: NodeId, edge: EdgeKind, target: NodeId) -> Result<()> {
        let (slot, def) = self.resolve(src, edge)?;
        let not_found = GraphError::EdgeNotFound { src, edge, dst: target };

        let removed = match &mut self.node_mut(src)?.edges[slot] {
            EdgeSlot::Single(t) => {
                if *t == NULL_ID || (target != NULL_ID && *t != target) {
                    return Err(not_found);
                }
                std::mem::replace(t, NULL_ID)
            }
            EdgeSlot::Multi(v) => match v.iter().position(|&t| t == target) {
                Some(pos) => v.remove(pos),
                None => return Err(not_found),
            },
        };
        self.unlink(src, &def, removed);
        Ok(())
    }

    /// Visible target of a single edge (first visible one for a multiple edge).
    /// Absent, deleted and filtered targets read as None.
    pub fn target(&self, src: NodeId, edge: EdgeKind) -> Option<NodeId> {
        self.targets(src, edge).next()
    }

    /// Visible targets of `edge` in stored order
    pub fn targets(&self, src: NodeId, edge: EdgeKind) -> impl Iterator<Item = NodeId> + '_ {
        self.get_ref(src)
            .and_then(|n| n.raw_targets(edge))
            .into_iter()
            .flatten()
            .copied()
            .filter(move |&t| self.is_visible(t))
    }

    // === ATTRIBUTES ===

    pub fn set_attr(&mut self, id: NodeId, attr: AttrKind, value: AttrValue) -> Result<()> {
        let node = self.node_mut(id)?;
        let kind = node.kind();
        let slot = kind
            .layout()
            .attr_slot(attr)
            .ok_or(GraphError::InvalidAttribute { kind, attr })?;
        if attr.value_type() != value.value_type() {
            return Err(GraphError::AttributeType { attr });
        }
        node.attrs[slot] = value;
        Ok(())
    }

    pub fn attr(&self, id: NodeId, attr: AttrKind) -> Option<AttrValue> {
        self.get_ref(id)?.attr(attr).copied()
    }

    pub fn set_string_attr(&mut self, id: NodeId, attr: AttrKind, value: &str) -> Result<()> {
        let kind = self.get_pointer(id)?.kind();
        if kind.layout().attr_slot(attr).is_none() {
            return Err(GraphError::InvalidAttribute { kind, attr });
        }
        let key = self.strings.set(value);
        self.set_attr(id, attr, AttrValue::Str(key))
    }

    pub fn string_attr(&self, id: NodeId, attr: AttrKind) -> Option<&str> {
        match self.attr(id, attr)? {
            AttrValue::Str(k) => self.strings.get(k),
            _ => None,
        }
    }

    pub fn set_name(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.set_string_attr(id, AttrKind::Name, name)
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.string_attr(id, AttrKind::Name)
    }

    pub fn set_position(&mut self, id: NodeId, range: Range) -> Result<()> {
        self.set_attr(id, AttrKind::Position, AttrValue::Range(range))
    }

    pub fn position(&self, id: NodeId) -> Option<Range> {
        match self.attr(id, AttrKind::Position)? {
            AttrValue::Range(r) => Some(r),
            _ => None,
        }
    }

    /// Source path of the node's position
    pub fn position_path(&self, id: NodeId) -> Option<&str> {
        self.strings.get(self.position(id)?.path)
    }

    // === STRING TABLE ===

    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    pub fn strings_mut(&mut self) -> &mut StringTable {
        &mut self.strings
    }

    /// Move every string attribute and range path into `new`.
    ///
    /// Returns the previous table and the old to new key mapping of every key
    /// that was in use.
    pub fn swap_string_table(&mut self, new: StringTable) -> (StringTable, BTreeMap<Key, Key>) {
        let old = std::mem::replace(&mut self.strings, new);
        let strings = &mut self.strings;
        let mut map = BTreeMap::new();
        map.insert(EMPTY_KEY, EMPTY_KEY);

        let mut remap = |k: Key| -> Key {
            *map.entry(k).or_insert_with(|| strings.set(old.get(k).unwrap_or_default()))
        };
        for node in self.nodes.iter_mut().flatten() {
            for v in node.attrs.iter_mut() {
                match v {
                    AttrValue::Str(k) => *k = remap(*k),
                    AttrValue::Range(r) => r.path = remap(r.path),
                    _ => {}
                }
            }
        }

        tracing::debug!("Swapped string table: {} keys remapped", map.len());
        (old, map)
    }

    // === FILTER ===

    /// Returns the previous toggle
    pub fn turn_filter_on(&self) -> bool {
        self.filter_on.replace(true)
    }

    /// Returns the previous toggle
    pub fn turn_filter_off(&self) -> bool {
        self.filter_on.replace(false)
    }

    pub fn is_filter_turned_on(&self) -> bool {
        self.filter_on.get()
    }

    /// Set the toggle until the guard drops
    pub fn filter_guard(&self, on: bool) -> FilterGuard<'_> {
        let prev = self.filter_on.replace(on);
        FilterGuard { flag: &self.filter_on, prev }
    }

    pub fn with_filter_state<R>(&self, on: bool, f: impl FnOnce(&Self) -> R) -> R {
        let _guard = self.filter_guard(on);
        f(self)
    }

    pub fn with_filter_state_mut<R>(&mut self, on: bool, f: impl FnOnce(&mut Self) -> R) -> R {
        struct Restore<'a> {
            factory: &'a mut Factory,
            prev: bool,
        }

        impl Drop for Restore<'_> {
            fn drop(&mut self) {
                self.factory.filter_on.set(self.prev);
            }
        }

        let prev = self.filter_on.replace(on);
        let restore = Restore { factory: self, prev };
        f(&mut *restore.factory)
    }

    /// Filtered and the filter is on
    pub fn get_is_filtered(&self, id: NodeId) -> bool {
        self.filter_on.get() && self.filter.is_filtered(id)
    }

    /// Raw flag, regardless of the toggle
    pub fn filter_state(&self, id: NodeId) -> FilterState {
        self.filter.state(id)
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Set the flag of this node only
    pub fn set_filter(&mut self, id: NodeId, state: FilterState) -> Result<()> {
        self.get_pointer(id)?;
        self.filter.set(id, state);
        Ok(())
    }

    /// Filter `id` and its owned subtree
    pub fn set_filtered(&mut self, id: NodeId) -> Result<()> {
        self.get_pointer(id)?;
        for n in self.subtree(id) {
            self.filter.set(n, FilterState::Filtered);
        }
        Ok(())
    }

    /// Unfilter `id`, its owned subtree and its ancestors.
    ///
    /// Not the inverse of [`Factory::set_filtered`]: descendants that carried
    /// their own flag before are cleared too. Use [`Factory::set_filter`] for
    /// an exact undo of a single flag.
    pub fn set_not_filtered(&mut self, id: NodeId) -> Result<()> {
        self.get_pointer(id)?;
        for n in self.subtree(id).into_iter().chain(self.ancestors(id)) {
            self.filter.set(n, FilterState::NotFiltered);
        }
        Ok(())
    }

    pub fn set_filtered_this_node_only(&mut self, id: NodeId) -> Result<()> {
        self.set_filter(id, FilterState::Filtered)
    }

    pub fn set_not_filtered_this_node_only(&mut self, id: NodeId) -> Result<()> {
        self.set_filter(id, FilterState::NotFiltered)
    }

    pub fn init_filter(&mut self) {
        self.filter.initialize();
    }

    pub fn save_filter(&self, path: &Path) -> Result<()> {
        self.filter.save(path)?;
        tracing::info!("Saved filter to {:?}: {} filtered nodes", path, self.filter.filtered_count());
        Ok(())
    }

    pub fn load_filter(&mut self, path: &Path) -> Result<()> {
        self.filter = Filter::load(path, self.nodes.len())?;
        tracing::info!("Loaded filter from {:?}: {} filtered nodes", path, self.filter.filtered_count());
        Ok(())
    }

    // === REVERSE EDGES ===

    /// Build the reverse index from the live graph.
    ///
    /// Stale ids left behind by deletions made while the index was off are
    /// dropped from the forward edges, so the index matches the live graph.
    pub fn enable_reverse_edges(&mut self) {
        if self.reverse.is_some() {
            return;
        }
        let live: Vec<bool> = self.nodes.iter().map(Option::is_some).collect();
        let is_live = |t: NodeId| live.get(t as usize).copied().unwrap_or(false);

        let mut rev = ReverseEdges::new();
        let mut pruned = 0usize;
        for node in self.nodes.iter_mut().flatten() {
            for slot in node.edges.iter_mut() {
                match slot {
                    EdgeSlot::Single(t) if *t != NULL_ID && !is_live(*t) => {
                        *t = NULL_ID;
                        pruned += 1;
                    }
                    EdgeSlot::Single(_) => {}
                    EdgeSlot::Multi(v) => {
                        let before = v.len();
                        v.retain(|&t| is_live(t));
                        pruned += before - v.len();
                    }
                }
            }
            for (kind, t) in node.out_edges() {
                rev.insert_edge(t, node.id(), kind);
            }
        }

        tracing::info!(
            "Reverse edges enabled: {} edges indexed, {} stale targets dropped",
            rev.len(),
            pruned
        );
        self.reverse = Some(rev);
    }

    pub fn disable_reverse_edges(&mut self) {
        self.reverse = None;
    }

    pub fn is_reverse_edges_enabled(&self) -> bool {
        self.reverse.is_some()
    }

    pub fn reverse_edges(&self) -> Result<&ReverseEdges> {
        self.reverse.as_ref().ok_or(GraphError::ReverseEdgesNotEnabled)
    }

    /// Visible sources pointing at `target`, with the edge kind used
    pub fn incoming(&self, target: NodeId) -> Result<impl Iterator<Item = (NodeId, EdgeKind)> + '_> {
        let rev = self.reverse_edges()?;
        Ok(rev.query(target).filter(move |(s, _)| self.is_visible(*s)))
    }

    pub fn incoming_by(&self, target: NodeId, kind: EdgeKind) -> Result<impl Iterator<Item = NodeId> + '_> {
        let rev = self.reverse_edges()?;
        Ok(rev.sources(target, kind).filter(move |s| self.is_visible(*s)))
    }

    // === LOAD SUPPORT ===

    pub(crate) fn place_node(&mut self, node: Node) {
        let id = node.id() as usize;
        self.nodes[id] = Some(node);
    }

    /// Record a loaded tree edge; false if `child` already has a parent
    pub(crate) fn place_parent(&mut self, child: NodeId, link: ParentLink) -> bool {
        match self.parents.get_mut(child as usize) {
            Some(p) if p.is_none() => {
                *p = Some(link);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Package -> CompilationUnit -> Class -> Method
    fn make_test_graph() -> (Factory, NodeId, NodeId, NodeId) {
        let mut f = Factory::new();
        let cu = f.create(NodeKind::CompilationUnit);
        let class = f.create(NodeKind::Class);
        let method = f.create(NodeKind::Method);
        f.add_edge(ROOT_ID, EdgeKind::PackageHasMembers, cu).unwrap();
        f.add_edge(cu, EdgeKind::CompilationUnitHasTypes, class).unwrap();
        f.add_edge(class, EdgeKind::ClassHasMembers, method).unwrap();
        (f, cu, class, method)
    }

    #[test]
    fn test_create_and_lookup() {
        let mut f = Factory::new();
        assert_eq!(f.kind_of(ROOT_ID), Some(NodeKind::Package));
        let id = f.create(NodeKind::Block);
        assert_eq!(id, 2);
        assert!(f.get_exist(id));
        assert!(!f.get_exist(0));
        assert!(!f.get_exist(99));
        assert!(matches!(f.get_pointer(99), Err(GraphError::UnknownNode(99))));
        assert_eq!(f.node_count(), 2);
    }

    #[test]
    fn test_single_edge_cardinality() {
        let mut f = Factory::new();
        let ret = f.create(NodeKind::Return);
        let t1 = f.create(NodeKind::IntegerLiteral);
        let t2 = f.create(NodeKind::Identifier);

        f.set_edge(ret, EdgeKind::ReturnHasExpression, t1).unwrap();
        assert_eq!(f.parent(t1), Some(ret));

        assert!(matches!(
            f.set_edge(ret, EdgeKind::ReturnHasExpression, NULL_ID),
            Err(GraphError::CannotClearEdgeToNull { .. })
        ));

        f.set_edge(ret, EdgeKind::ReturnHasExpression, t2).unwrap();
        assert_eq!(f.target(ret, EdgeKind::ReturnHasExpression), Some(t2));
        assert_eq!(f.parent(t1), None);
        assert_eq!(f.parent(t2), Some(ret));

        f.remove_edge(ret, EdgeKind::ReturnHasExpression, t2).unwrap();
        assert_eq!(f.target(ret, EdgeKind::ReturnHasExpression), None);
        f.set_edge(ret, EdgeKind::ReturnHasExpression, NULL_ID).unwrap();
        assert!(matches!(
            f.remove_edge(ret, EdgeKind::ReturnHasExpression, t2),
            Err(GraphError::EdgeNotFound { .. })
        ));
    }

    #[test]
    fn test_target_validation() {
        let mut f = Factory::new();
        let ret = f.create(NodeKind::Return);
        let block = f.create(NodeKind::Block);
        assert!(matches!(
            f.set_edge(ret, EdgeKind::ReturnHasExpression, block),
            Err(GraphError::InvalidTargetKind { found: NodeKind::Block, .. })
        ));
        assert!(matches!(
            f.set_edge(ret, EdgeKind::ReturnHasExpression, 42),
            Err(GraphError::UnknownNode(42))
        ));
        assert!(matches!(
            f.set_edge(ret, EdgeKind::ClassHasMembers, block),
            Err(GraphError::InvalidEdgeKind { kind: NodeKind::Return, .. })
        ));
        assert!(matches!(
            f.add_edge(ret, EdgeKind::ReturnHasExpression, block),
            Err(GraphError::NotMultiEdge(_))
        ));
    }

    #[test]
    fn test_foreign_factory() {
        let mut a = Factory::new();
        let mut b = Factory::new();
        let ret = a.create(NodeKind::Return);
        let lit = b.create(NodeKind::IntegerLiteral);
        let foreign = b.handle(lit);
        assert!(matches!(
            a.set_edge_ref(ret, EdgeKind::ReturnHasExpression, foreign),
            Err(GraphError::ForeignFactory(_))
        ));
        let local = a.create(NodeKind::IntegerLiteral);
        a.set_edge_ref(ret, EdgeKind::ReturnHasExpression, a.handle(local)).unwrap();
    }

    #[test]
    fn test_capability_edge_dispatch() {
        let mut f = Factory::new();
        let class = f.create(NodeKind::Class);
        let comment = f.create(NodeKind::Comment);
        let lit = f.create(NodeKind::IntegerLiteral);
        let int_ty = f.create(NodeKind::IntType);

        f.add_edge(class, EdgeKind::CommentableHasComments, comment).unwrap();
        f.set_edge(lit, EdgeKind::ExpressionHasType, int_ty).unwrap();
        assert_eq!(f.targets(class, EdgeKind::CommentableHasComments).collect::<Vec<_>>(), vec![comment]);
        assert_eq!(f.target(lit, EdgeKind::ExpressionHasType), Some(int_ty));
        // reference edges never set a parent
        assert_eq!(f.parent(comment), None);
        assert!(f.set_edge(int_ty, EdgeKind::CommentableHasComments, comment).is_err());
    }

    #[test]
    fn test_multi_edge_order() {
        let mut f = Factory::new();
        let block = f.create(NodeKind::Block);
        let s: Vec<NodeId> = (0..3).map(|_| f.create(NodeKind::Return)).collect();
        for &t in &s {
            f.add_edge(block, EdgeKind::BlockHasStatements, t).unwrap();
        }
        f.remove_edge(block, EdgeKind::BlockHasStatements, s[1]).unwrap();
        assert_eq!(f.targets(block, EdgeKind::BlockHasStatements).collect::<Vec<_>>(), vec![s[0], s[2]]);
        assert!(f.remove_edge(block, EdgeKind::BlockHasStatements, s[1]).is_err());
    }

    #[test]
    fn test_tree_edge_moves_child() {
        let mut f = Factory::new();
        let b1 = f.create(NodeKind::Block);
        let b2 = f.create(NodeKind::Block);
        let stmt = f.create(NodeKind::Return);
        f.add_edge(b1, EdgeKind::BlockHasStatements, stmt).unwrap();
        f.add_edge(b2, EdgeKind::BlockHasStatements, stmt).unwrap();
        assert_eq!(f.targets(b1, EdgeKind::BlockHasStatements).count(), 0);
        assert_eq!(f.parent(stmt), Some(b2));
    }

    #[test]
    fn test_ownership_cycle_rejected() {
        let mut f = Factory::new();
        let outer = f.create(NodeKind::Block);
        let inner = f.create(NodeKind::Block);
        f.add_edge(outer, EdgeKind::BlockHasStatements, inner).unwrap();
        assert!(matches!(
            f.add_edge(inner, EdgeKind::BlockHasStatements, outer),
            Err(GraphError::OwnershipCycle { .. })
        ));
        assert!(f.add_edge(outer, EdgeKind::BlockHasStatements, outer).is_err());
    }

    #[test]
    fn test_delete_cascades_ownership_not_references() {
        let (mut f, cu, class, method) = make_test_graph();
        let call = f.create(NodeKind::MethodCall);
        f.set_edge(call, EdgeKind::MethodCallInvokes, method).unwrap();

        f.delete(class).unwrap();
        assert!(!f.get_exist(class));
        assert!(!f.get_exist(method));
        assert!(f.get_exist(cu));
        assert_eq!(f.targets(cu, EdgeKind::CompilationUnitHasTypes).count(), 0);
        // dangling reference reads as absent
        assert_eq!(f.target(call, EdgeKind::MethodCallInvokes), None);
        assert_eq!(f.get_pointer(call).unwrap().raw_targets(EdgeKind::MethodCallInvokes), Some(&[method][..]));

        // ids are not reused
        let fresh = f.create(NodeKind::Method);
        assert!(fresh > method);
        assert!(matches!(f.delete(ROOT_ID), Err(GraphError::RootNode(_))));
    }

    #[test]
    fn test_stale_single_edge_reads_as_empty() {
        let (mut f, _cu, class, method) = make_test_graph();
        let call = f.create(NodeKind::MethodCall);
        f.set_edge(call, EdgeKind::MethodCallInvokes, method).unwrap();
        f.delete(class).unwrap();

        // clearing an edge whose target is gone is not an error
        f.set_edge(call, EdgeKind::MethodCallInvokes, NULL_ID).unwrap();
        assert_eq!(f.get_pointer(call).unwrap().raw_targets(EdgeKind::MethodCallInvokes), Some(&[][..]));

        let other = f.create(NodeKind::Method);
        f.set_edge(call, EdgeKind::MethodCallInvokes, other).unwrap();
        assert_eq!(f.target(call, EdgeKind::MethodCallInvokes), Some(other));
    }

    #[test]
    fn test_delete_with_reverse_edges_clears_references() {
        let (mut f, _cu, class, method) = make_test_graph();
        let call = f.create(NodeKind::MethodCall);
        f.set_edge(call, EdgeKind::MethodCallInvokes, method).unwrap();
        f.enable_reverse_edges();

        f.delete(class).unwrap();
        assert_eq!(f.get_pointer(call).unwrap().raw_targets(EdgeKind::MethodCallInvokes), Some(&[][..]));
        assert_eq!(f.reverse_edges().unwrap().query(method).count(), 0);
    }

    #[test]
    fn test_enable_reverse_edges_drops_stale_targets() {
        let (mut f, _cu, _class, method) = make_test_graph();
        let call = f.create(NodeKind::MethodCall);
        f.set_edge(call, EdgeKind::MethodCallInvokes, method).unwrap();
        f.delete(method).unwrap();

        f.enable_reverse_edges();
        assert_eq!(f.get_pointer(call).unwrap().raw_targets(EdgeKind::MethodCallInvokes), Some(&[][..]));
        assert_eq!(f.reverse_edges().unwrap().len(), 2);
    }

    #[test]
    fn test_reverse_edges_incremental() {
        let (mut f, _cu, class, method) = make_test_graph();
        assert!(matches!(f.incoming(method).map(|i| i.count()), Err(GraphError::ReverseEdgesNotEnabled)));
        f.enable_reverse_edges();
        assert_eq!(f.incoming(method).unwrap().collect::<Vec<_>>(), vec![(class, EdgeKind::ClassHasMembers)]);

        let call = f.create(NodeKind::MethodCall);
        f.set_edge(call, EdgeKind::MethodCallInvokes, method).unwrap();
        assert_eq!(f.incoming_by(method, EdgeKind::MethodCallInvokes).unwrap().collect::<Vec<_>>(), vec![call]);

        f.remove_edge(call, EdgeKind::MethodCallInvokes, NULL_ID).unwrap();
        assert_eq!(f.incoming_by(method, EdgeKind::MethodCallInvokes).unwrap().count(), 0);
        f.disable_reverse_edges();
        assert!(f.reverse_edges().is_err());
    }

    #[test]
    fn test_filtering_is_reversible() {
        let (mut f, cu, class, method) = make_test_graph();
        f.set_filtered(class).unwrap();
        assert!(f.get_is_filtered(class));
        assert!(f.get_is_filtered(method));
        assert_eq!(f.targets(cu, EdgeKind::CompilationUnitHasTypes).count(), 0);
        assert_eq!(f.iter().count(), 2);

        {
            let _guard = f.filter_guard(false);
            assert_eq!(f.target(cu, EdgeKind::CompilationUnitHasTypes), Some(class));
            {
                let _inner = f.filter_guard(true);
                assert_eq!(f.target(cu, EdgeKind::CompilationUnitHasTypes), None);
            }
            assert!(!f.is_filter_turned_on());
        }
        assert!(f.is_filter_turned_on());
        assert_eq!(f.with_filter_state(false, |f| f.iter().count()), 4);

        f.set_not_filtered(method).unwrap();
        assert!(!f.get_is_filtered(method));
        assert!(!f.get_is_filtered(class));
        assert_eq!(f.target(cu, EdgeKind::CompilationUnitHasTypes), Some(class));
    }

    #[test]
    fn test_filter_state_mut_restored_on_panic() {
        let (mut f, cu, class, _method) = make_test_graph();
        f.set_filtered(class).unwrap();

        let n = f.with_filter_state_mut(false, |f| f.targets(cu, EdgeKind::CompilationUnitHasTypes).count());
        assert_eq!(n, 1);
        assert!(f.is_filter_turned_on());

        let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            f.with_filter_state_mut(false, |_| panic!("inside filter scope"))
        }));
        assert!(res.is_err());
        assert!(f.is_filter_turned_on());
    }

    #[test]
    fn test_filter_this_node_only() {
        let (mut f, _cu, class, method) = make_test_graph();
        f.set_filtered_this_node_only(class).unwrap();
        assert!(f.get_is_filtered(class));
        assert!(!f.get_is_filtered(method));
        f.set_not_filtered_this_node_only(class).unwrap();
        assert_eq!(f.filter_state(class), FilterState::NotFiltered);
    }

    #[test]
    fn test_attributes() {
        let mut f = Factory::new();
        let m = f.create(NodeKind::Method);
        f.set_name(m, "main").unwrap();
        f.set_attr(m, AttrKind::IsStatic, AttrValue::Bool(true)).unwrap();
        assert_eq!(f.name(m), Some("main"));
        assert_eq!(f.attr(m, AttrKind::IsStatic), Some(AttrValue::Bool(true)));
        assert!(matches!(
            f.set_attr(m, AttrKind::IsStatic, AttrValue::Int(1)),
            Err(GraphError::AttributeType { .. })
        ));
        assert!(matches!(
            f.set_attr(m, AttrKind::IntValue, AttrValue::Int(1)),
            Err(GraphError::InvalidAttribute { .. })
        ));

        let path = f.strings_mut().set("src/Main.java");
        f.set_position(m, Range::new(path, 3, 5, 10, 1)).unwrap();
        assert_eq!(f.position_path(m), Some("src/Main.java"));
        assert_eq!(f.position(m).map(|r| r.wide_col), Some(5));
    }

    #[test]
    fn test_swap_string_table() {
        let mut f = Factory::new();
        let m = f.create(NodeKind::Method);
        f.set_name(m, "run").unwrap();
        let path = f.strings_mut().set("A.java");
        f.set_position(m, Range::new(path, 1, 1, 2, 2)).unwrap();

        let mut fresh = StringTable::new();
        fresh.set("padding");
        fresh.set("more padding");
        let (old, map) = f.swap_string_table(fresh);

        assert_eq!(old.get(path), Some("A.java"));
        assert_eq!(f.name(m), Some("run"));
        assert_eq!(f.position_path(m), Some("A.java"));
        assert_eq!(f.strings().get(map[&path]), Some("A.java"));
        assert_ne!(map[&path], path);
    }
}
