//! Node/handle/edge data model and the id-indexed graph store.
//!
//! Positions are parent-relative: a node with a `parent` id is placed
//! relative to that parent's absolute position (parent chains are
//! caller-guaranteed acyclic). Sizes are not owned by the engine — the
//! measurement collaborator supplies them (see `border::NodeMeasure`).
//!
//! `GraphStore` is the single owner of the ordered node/edge lists and the
//! id→index maps; the two are never allowed to disagree.

use crate::config::PolicyOverrides;
use crate::id::Id;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

// ─── Border geometry ─────────────────────────────────────────────────────

/// One corner's rounding radii, x and y, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CornerRadius {
    pub rx: f64,
    pub ry: f64,
}

impl CornerRadius {
    pub const fn new(rx: f64, ry: f64) -> Self {
        Self { rx, ry }
    }

    /// Uniform radius on both axes.
    pub const fn uniform(r: f64) -> Self {
        Self { rx: r, ry: r }
    }
}

/// Per-corner rounding radii.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CornerRadii {
    pub top_left: CornerRadius,
    pub top_right: CornerRadius,
    pub bottom_right: CornerRadius,
    pub bottom_left: CornerRadius,
}

impl CornerRadii {
    /// The same radius on every corner.
    pub const fn uniform(r: f64) -> Self {
        let c = CornerRadius::uniform(r);
        Self {
            top_left: c,
            top_right: c,
            bottom_right: c,
            bottom_left: c,
        }
    }
}

/// Per-side border widths, in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BorderWidths {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl BorderWidths {
    pub const fn uniform(w: f64) -> Self {
        Self {
            top: w,
            right: w,
            bottom: w,
            left: w,
        }
    }
}

// ─── Handles ─────────────────────────────────────────────────────────────

/// A named connection point on a node's border.
///
/// Handles are derived data: the full list is recomputed and replaced
/// whenever the node's size or border geometry changes (never patched
/// element by element).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handle {
    /// Name, unique within the owning node.
    pub name: Id,
    /// Offset from the node's center.
    pub offset: Vec2,
    /// Role tags constraining legal connections.
    pub roles: SmallVec<[Id; 2]>,
    /// Per-handle permission overrides.
    pub policy: PolicyOverrides,
}

impl Handle {
    pub fn new(name: Id, offset: Vec2) -> Self {
        Self {
            name,
            offset,
            roles: SmallVec::new(),
            policy: PolicyOverrides::default(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = Id>) -> Self {
        self.roles = roles.into_iter().collect();
        self
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// A node in the diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: Id,

    /// Top-left position. Parent-relative when `parent` is set.
    pub position: Point,

    /// Optional parent: absolute position = parent's absolute + own.
    pub parent: Option<Id>,

    /// Measured size — supplied by the measurement collaborator.
    pub width: f64,
    pub height: f64,

    pub radii: CornerRadii,
    pub borders: BorderWidths,

    /// Connection points, recomputed as a whole list on geometry changes.
    pub handles: SmallVec<[Handle; 4]>,

    /// Extra spacing added around the node for floating-edge intersections.
    pub edge_margin: f64,

    /// Transient interaction flags.
    pub selected: bool,
    pub grabbed: bool,

    /// Per-node permission overrides.
    pub policy: PolicyOverrides,
}

impl Node {
    pub fn new(id: Id, position: Point) -> Self {
        Self {
            id,
            position,
            parent: None,
            width: 0.0,
            height: 0.0,
            radii: CornerRadii::default(),
            borders: BorderWidths::default(),
            handles: SmallVec::new(),
            edge_margin: 0.0,
            selected: false,
            grabbed: false,
            policy: PolicyOverrides::default(),
        }
    }

    /// Half-extent of the measured box.
    pub fn half_size(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Half-extent inflated by `edge_margin` (floating-edge geometry).
    pub fn inflated_half(&self) -> Vec2 {
        Vec2::new(
            self.width / 2.0 + self.edge_margin,
            self.height / 2.0 + self.edge_margin,
        )
    }

    /// Look up a handle by name.
    pub fn handle(&self, name: Id) -> Option<&Handle> {
        self.handles.iter().find(|h| h.name == name)
    }
}

// ─── Edges ───────────────────────────────────────────────────────────────

/// How an edge endpoint binds to its node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum HandleBinding {
    /// Unset — the legality pass must resolve a handle (or fall back to
    /// floating).
    #[default]
    Auto,
    /// Explicitly unbound: the attachment point is the border intersection
    /// facing the other endpoint.
    Floating,
    /// Bound to the named handle on the endpoint's node.
    Named(Id),
}

/// How the edge path is drawn between its two endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum PathShape {
    #[default]
    Straight,
    /// Quadratic Bézier; `curvature` is the signed perpendicular control
    /// offset (fraction of chord length).
    Round { curvature: f64 },
}

/// Label text and placement parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeLabel {
    pub text: String,
    /// Perpendicular distance from the edge path.
    pub offset: f64,
    /// Rotate the label to follow the edge direction.
    pub rotate: bool,
}

/// Value-keyed memo for a computed endpoint: the inputs are stored next to
/// the result, and the cache is invalidated by comparing them, not by
/// reference identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointCache {
    inputs: Option<(Point, Point, Vec2)>,
    point: Point,
}

impl EndpointCache {
    /// Return the cached point when `(center, toward, half)` match the
    /// last-seen inputs.
    pub fn lookup(&self, center: Point, toward: Point, half: Vec2) -> Option<Point> {
        match self.inputs {
            Some(prev) if prev == (center, toward, half) => Some(self.point),
            _ => None,
        }
    }

    pub fn store(&mut self, center: Point, toward: Point, half: Vec2, point: Point) {
        self.inputs = Some((center, toward, half));
        self.point = point;
    }

    pub fn clear(&mut self) {
        self.inputs = None;
    }
}

/// A connection between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: Id,

    pub source: Id,
    pub source_handle: HandleBinding,
    pub target: Id,
    pub target_handle: HandleBinding,

    pub shape: PathShape,
    pub label: Option<EdgeLabel>,

    /// True once legality has been checked/resolved this lifecycle.
    pub verified: bool,
    /// True when another edge exists between the same endpoint pair.
    pub separate: bool,
    /// True for every edge after the first of an identical pair.
    pub duplicate: bool,

    pub selected: bool,

    /// Per-edge permission overrides.
    pub policy: PolicyOverrides,

    /// Memoized attachment points (skipped in snapshots — derived data).
    #[serde(skip)]
    pub source_cache: EndpointCache,
    #[serde(skip)]
    pub target_cache: EndpointCache,
}

impl Edge {
    pub fn new(id: Id, source: Id, target: Id) -> Self {
        Self {
            id,
            source,
            source_handle: HandleBinding::Auto,
            target,
            target_handle: HandleBinding::Auto,
            shape: PathShape::default(),
            label: None,
            verified: false,
            separate: false,
            duplicate: false,
            selected: false,
            policy: PolicyOverrides::default(),
            source_cache: EndpointCache::default(),
            target_cache: EndpointCache::default(),
        }
    }

    /// The overlap-index key: endpoint pair plus handle bindings.
    fn pair_key(&self) -> (Id, HandleBinding, Id, HandleBinding) {
        (self.source, self.source_handle, self.target, self.target_handle)
    }
}

// ─── Graph store ─────────────────────────────────────────────────────────

/// Ordered node/edge collections with id-keyed index maps for O(1) lookup.
///
/// The store owns the invariant that an index map and its ordered list
/// never disagree: every mutation goes through the methods below.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    #[serde(skip)]
    node_index: HashMap<Id, usize>,
    #[serde(skip)]
    edge_index: HashMap<Id, usize>,
}

impl GraphStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Lookup ──────────────────────────────────────────────────────────

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.iter_mut()
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut Edge> {
        self.edges.iter_mut()
    }

    pub fn node(&self, id: Id) -> Option<&Node> {
        self.node_index.get(&id).map(|&i| &self.nodes[i])
    }

    pub fn node_mut(&mut self, id: Id) -> Option<&mut Node> {
        self.node_index.get(&id).copied().map(|i| &mut self.nodes[i])
    }

    pub fn edge(&self, id: Id) -> Option<&Edge> {
        self.edge_index.get(&id).map(|&i| &self.edges[i])
    }

    pub fn edge_mut(&mut self, id: Id) -> Option<&mut Edge> {
        self.edge_index.get(&id).copied().map(|i| &mut self.edges[i])
    }

    // ─── Mutation ────────────────────────────────────────────────────────

    /// Add a node. An empty or colliding id is replaced by a generated one
    /// after a warning; the (possibly new) id is returned.
    pub fn add_node(&mut self, mut node: Node) -> Id {
        if node.id.as_str().is_empty() || self.node_index.contains_key(&node.id) {
            let fresh = Id::with_prefix("node");
            log::warn!("node id {:?} is empty or taken, using {fresh:?}", node.id);
            node.id = fresh;
        }
        let id = node.id;
        self.node_index.insert(id, self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Add an edge. Endpoints must name existing nodes — a dangling
    /// reference drops the edge after a warning. Returns the stored id.
    pub fn add_edge(&mut self, mut edge: Edge) -> Option<Id> {
        if !self.node_index.contains_key(&edge.source) {
            log::warn!("edge {:?} references missing node {:?}, dropped", edge.id, edge.source);
            return None;
        }
        if !self.node_index.contains_key(&edge.target) {
            log::warn!("edge {:?} references missing node {:?}, dropped", edge.id, edge.target);
            return None;
        }
        if edge.id.as_str().is_empty() || self.edge_index.contains_key(&edge.id) {
            let fresh = Id::with_prefix("edge");
            log::warn!("edge id {:?} is empty or taken, using {fresh:?}", edge.id);
            edge.id = fresh;
        }
        let id = edge.id;
        self.edge_index.insert(id, self.edges.len());
        self.edges.push(edge);
        self.mark_overlaps();
        Some(id)
    }

    /// Remove a node and every edge touching it.
    pub fn remove_node(&mut self, id: Id) -> Option<Node> {
        let idx = self.node_index.remove(&id)?;
        let node = self.nodes.remove(idx);
        self.reindex_nodes(idx);

        let stale: Vec<Id> = self
            .edges
            .iter()
            .filter(|e| e.source == id || e.target == id)
            .map(|e| e.id)
            .collect();
        for edge_id in stale {
            self.remove_edge(edge_id);
        }
        Some(node)
    }

    pub fn remove_edge(&mut self, id: Id) -> Option<Edge> {
        let idx = self.edge_index.remove(&id)?;
        let edge = self.edges.remove(idx);
        self.reindex_edges(idx);
        self.mark_overlaps();
        Some(edge)
    }

    /// Replace a node's handle list wholesale (handles are derived data).
    pub fn set_handles(&mut self, id: Id, handles: SmallVec<[Handle; 4]>) {
        if let Some(node) = self.node_mut(id) {
            node.handles = handles;
        }
    }

    fn reindex_nodes(&mut self, from: usize) {
        for (i, node) in self.nodes.iter().enumerate().skip(from) {
            self.node_index.insert(node.id, i);
        }
    }

    fn reindex_edges(&mut self, from: usize) {
        for (i, edge) in self.edges.iter().enumerate().skip(from) {
            self.edge_index.insert(edge.id, i);
        }
    }

    /// Rebuild both index maps from scratch (after deserialization).
    pub fn rebuild_index(&mut self) {
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id, i))
            .collect();
        self.edge_index = self
            .edges
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id, i))
            .collect();
    }

    // ─── Derived geometry ────────────────────────────────────────────────

    /// Absolute top-left position, following the parent chain.
    pub fn absolute_position(&self, id: Id) -> Option<Point> {
        let node = self.node(id)?;
        match node.parent {
            Some(parent) => {
                let base = self.absolute_position(parent)?;
                Some(base + node.position.to_vec2())
            }
            None => Some(node.position),
        }
    }

    /// Absolute center of a node's measured box.
    pub fn absolute_center(&self, id: Id) -> Option<Point> {
        let node = self.node(id)?;
        Some(self.absolute_position(id)? + node.half_size())
    }

    /// Absolute bounding rect of a node's measured box.
    pub fn absolute_rect(&self, id: Id) -> Option<Rect> {
        let node = self.node(id)?;
        let pos = self.absolute_position(id)?;
        Some(Rect::new(
            pos.x,
            pos.y,
            pos.x + node.width,
            pos.y + node.height,
        ))
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn selected_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| n.selected)
    }

    /// Select a single node, clearing all other node and edge selection.
    pub fn select_only_node(&mut self, id: Id) {
        for node in &mut self.nodes {
            node.selected = node.id == id;
        }
        for edge in &mut self.edges {
            edge.selected = false;
        }
    }

    /// Select a single edge, clearing all other selection.
    pub fn select_only_edge(&mut self, id: Id) {
        for node in &mut self.nodes {
            node.selected = false;
        }
        for edge in &mut self.edges {
            edge.selected = edge.id == id;
        }
    }

    pub fn deselect_all(&mut self) {
        for node in &mut self.nodes {
            node.selected = false;
        }
        for edge in &mut self.edges {
            edge.selected = false;
        }
    }

    pub fn deselect_edges(&mut self) {
        for edge in &mut self.edges {
            edge.selected = false;
        }
    }

    // ─── Overlap detection ───────────────────────────────────────────────

    /// Flag edges that share the same endpoint pair: every member of a
    /// pair group gets `separate`, every member after the first also gets
    /// `duplicate`. Single pass over a hash index.
    pub fn mark_overlaps(&mut self) {
        let mut seen: HashMap<(Id, HandleBinding, Id, HandleBinding), usize> = HashMap::new();

        for edge in &mut self.edges {
            edge.separate = false;
            edge.duplicate = false;
        }

        let mut firsts: Vec<usize> = Vec::new();
        for i in 0..self.edges.len() {
            let key = self.edges[i].pair_key();
            match seen.get(&key) {
                Some(&first) => {
                    self.edges[i].separate = true;
                    self.edges[i].duplicate = true;
                    firsts.push(first);
                }
                None => {
                    seen.insert(key, i);
                }
            }
        }
        for first in firsts {
            self.edges[first].separate = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node_at(id: &str, x: f64, y: f64) -> Node {
        let mut n = Node::new(Id::intern(id), Point::new(x, y));
        n.width = 100.0;
        n.height = 50.0;
        n
    }

    #[test]
    fn index_survives_removal() {
        let mut store = GraphStore::new();
        store.add_node(node_at("a", 0.0, 0.0));
        store.add_node(node_at("b", 10.0, 0.0));
        store.add_node(node_at("c", 20.0, 0.0));

        store.remove_node(Id::intern("b"));

        assert!(store.node(Id::intern("b")).is_none());
        assert_eq!(store.node(Id::intern("c")).unwrap().position.x, 20.0);
        assert_eq!(store.nodes().len(), 2);
    }

    #[test]
    fn duplicate_id_gets_regenerated() {
        let mut store = GraphStore::new();
        let first = store.add_node(node_at("a", 0.0, 0.0));
        let second = store.add_node(node_at("a", 5.0, 5.0));
        assert_ne!(first, second);
        assert_eq!(store.nodes().len(), 2);
    }

    #[test]
    fn dangling_edge_is_dropped() {
        let mut store = GraphStore::new();
        store.add_node(node_at("a", 0.0, 0.0));
        let edge = Edge::new(Id::intern("e"), Id::intern("a"), Id::intern("missing"));
        assert_eq!(store.add_edge(edge), None);
        assert!(store.edges().is_empty());
    }

    #[test]
    fn absolute_position_follows_parent_chain() {
        let mut store = GraphStore::new();
        store.add_node(node_at("outer", 100.0, 100.0));
        let mut inner = node_at("inner", 10.0, 20.0);
        inner.parent = Some(Id::intern("outer"));
        store.add_node(inner);

        let abs = store.absolute_position(Id::intern("inner")).unwrap();
        assert_eq!((abs.x, abs.y), (110.0, 120.0));
    }

    #[test]
    fn removing_a_node_removes_its_edges() {
        let mut store = GraphStore::new();
        store.add_node(node_at("a", 0.0, 0.0));
        store.add_node(node_at("b", 200.0, 0.0));
        store
            .add_edge(Edge::new(Id::intern("e"), Id::intern("a"), Id::intern("b")))
            .unwrap();

        store.remove_node(Id::intern("a"));
        assert!(store.edges().is_empty());
    }

    #[test]
    fn overlapping_pairs_are_flagged_in_order() {
        let mut store = GraphStore::new();
        store.add_node(node_at("a", 0.0, 0.0));
        store.add_node(node_at("b", 200.0, 0.0));
        let a = Id::intern("a");
        let b = Id::intern("b");
        store.add_edge(Edge::new(Id::intern("e1"), a, b)).unwrap();
        store.add_edge(Edge::new(Id::intern("e2"), a, b)).unwrap();
        store.add_edge(Edge::new(Id::intern("e3"), a, b)).unwrap();

        let e1 = store.edge(Id::intern("e1")).unwrap();
        let e2 = store.edge(Id::intern("e2")).unwrap();
        let e3 = store.edge(Id::intern("e3")).unwrap();
        assert!(e1.separate && !e1.duplicate, "first of a pair is separate only");
        assert!(e2.separate && e2.duplicate);
        assert!(e3.separate && e3.duplicate);
    }

    #[test]
    fn endpoint_cache_is_value_keyed() {
        let mut cache = EndpointCache::default();
        let c = Point::new(0.0, 0.0);
        let t = Point::new(100.0, 0.0);
        let h = Vec2::new(50.0, 25.0);
        assert_eq!(cache.lookup(c, t, h), None);

        cache.store(c, t, h, Point::new(50.0, 0.0));
        assert_eq!(cache.lookup(c, t, h), Some(Point::new(50.0, 0.0)));
        assert_eq!(cache.lookup(c, Point::new(100.0, 1.0), h), None);
    }
}
