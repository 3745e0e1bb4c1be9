//! Integration tests: edge endpoint geometry over a populated store
//! (gw-core).
//!
//! Exercises the floating border intersection through `resolve_endpoints`,
//! the memoization behavior, and label placement.

use gw_core::border::{HandlePlacement, HandleSpec, NodeBox, Side, layout_handles};
use gw_core::path::{self, TextAnchor};
use gw_core::{
    BorderWidths, CornerRadii, Edge, GraphStore, Id, Node, Point,
};

fn make_store() -> GraphStore {
    let mut store = GraphStore::new();
    for (id, x, y) in [("a", 0.0, 0.0), ("b", 300.0, 0.0)] {
        let mut node = Node::new(Id::intern(id), Point::new(x, y));
        node.width = 100.0;
        node.height = 50.0;
        store.add_node(node);
    }
    store
}

fn connect(store: &mut GraphStore) -> Id {
    store
        .add_edge(Edge::new(Id::intern("e"), Id::intern("a"), Id::intern("b")))
        .unwrap()
}

// ─── Floating endpoints ──────────────────────────────────────────────────

#[test]
fn floating_endpoints_sit_on_facing_borders() {
    let mut store = make_store();
    let id = connect(&mut store);

    let (from, to) = path::resolve_endpoints(&mut store, id).unwrap();

    // a: center (50,25), right border at x=100; b faces left at x=300.
    assert_eq!(from, Point::new(100.0, 25.0));
    assert_eq!(to, Point::new(300.0, 25.0));
}

#[test]
fn edge_margin_inflates_the_attachment_box() {
    let mut store = make_store();
    store.node_mut(Id::intern("a")).unwrap().edge_margin = 10.0;
    let id = connect(&mut store);

    let (from, _) = path::resolve_endpoints(&mut store, id).unwrap();
    assert_eq!(from.x, 110.0, "margin pushes the endpoint outward");
}

#[test]
fn overlapping_nodes_collapse_to_centers() {
    let mut store = make_store();
    store.node_mut(Id::intern("b")).unwrap().position = Point::new(40.0, 10.0);
    let id = connect(&mut store);

    let (from, _) = path::resolve_endpoints(&mut store, id).unwrap();
    assert_eq!(from, store.absolute_center(Id::intern("a")).unwrap());
}

#[test]
fn named_handles_pin_the_endpoint() {
    let mut store = make_store();
    let node_box = NodeBox {
        width: 100.0,
        height: 50.0,
        borders: BorderWidths::default(),
        radii: CornerRadii::default(),
    };
    let specs = [HandleSpec::new(
        Id::intern("out"),
        HandlePlacement::Side {
            side: Side::Right,
            along: 0.5,
        },
    )];
    store.set_handles(Id::intern("a"), layout_handles(&node_box, &specs));

    let mut edge = Edge::new(Id::intern("e"), Id::intern("a"), Id::intern("b"));
    edge.source_handle = gw_core::HandleBinding::Named(Id::intern("out"));
    let id = store.add_edge(edge).unwrap();

    let (from, _) = path::resolve_endpoints(&mut store, id).unwrap();
    assert_eq!(from, Point::new(100.0, 25.0));
}

#[test]
fn endpoints_recompute_after_a_move() {
    let mut store = make_store();
    let id = connect(&mut store);

    let (first, _) = path::resolve_endpoints(&mut store, id).unwrap();
    let (again, _) = path::resolve_endpoints(&mut store, id).unwrap();
    assert_eq!(first, again, "stable geometry reuses the memo");

    store.node_mut(Id::intern("a")).unwrap().position = Point::new(0.0, 200.0);
    let (moved, _) = path::resolve_endpoints(&mut store, id).unwrap();
    assert_ne!(first, moved, "moved geometry invalidates the memo");
}

// ─── Labels ──────────────────────────────────────────────────────────────

#[test]
fn rotated_label_follows_a_diagonal_edge() {
    let geom = path::label_geometry(Point::new(0.0, 0.0), Point::new(100.0, 100.0), 12.0, true);
    assert!((geom.angle - 45.0).abs() < 1e-9);
    assert_eq!(geom.anchor, TextAnchor::Middle);
    // Shift stays perpendicular to the chord.
    let chord = kurbo::Vec2::new(1.0, 1.0);
    assert!(geom.shift.dot(chord).abs() < 1e-9);
}

#[test]
fn steep_upward_edge_flips_the_label() {
    // Angle ≈ 225° raw: must flip into the readable range.
    let geom = path::label_geometry(Point::new(100.0, 100.0), Point::new(0.0, 0.0), 12.0, true);
    assert!(geom.angle <= 90.0 || geom.angle >= 270.0, "angle {} is upside-down", geom.angle);
}
