//! Hit testing: screen point → grab target.
//!
//! Walks nodes back to front (last stored = topmost) so overlapping
//! elements resolve the way they are painted. Handles win over their
//! node's body, nodes win over edges, and anything else is the viewport.

use crate::events::GrabTarget;
use crate::viewport::ViewportController;
use gw_core::config::GraphConfig;
use gw_core::model::{GraphStore, PathShape};
use gw_core::path::{border_intersection, node_outline};
use kurbo::{Line, ParamCurveNearest, Point, QuadBez, Size, Vec2};

/// Accuracy for nearest-point queries on curves.
const NEAREST_ACCURACY: f64 = 1e-6;

/// Find what a pointer at `screen` is over.
///
/// `edge_handle_threshold` is a screen-space pick radius: it grows the
/// clickable area of handles and edge paths independently of zoom.
pub fn hit_test(
    store: &GraphStore,
    viewport: &ViewportController,
    config: &GraphConfig,
    screen: Point,
    container: Size,
) -> GrabTarget {
    let point = viewport.screen_to_content(screen, container);
    let radius = config.edge_handle_threshold / viewport.viewport().zoom;

    // Topmost first.
    for node in store.nodes().iter().rev() {
        let Some(center) = store.absolute_center(node.id) else {
            continue;
        };
        for handle in &node.handles {
            if (point - (center + handle.offset)).hypot() <= radius {
                return GrabTarget::Handle {
                    node: node.id,
                    handle: handle.name,
                };
            }
        }
        if let Some(rect) = store.absolute_rect(node.id)
            && rect.contains(point)
        {
            return GrabTarget::Node(node.id);
        }
    }

    for edge in store.edges().iter().rev() {
        let Some(source) = node_outline(store, edge.source) else {
            continue;
        };
        let Some(target) = node_outline(store, edge.target) else {
            continue;
        };
        let from = border_intersection(&source, target.center, Some(target.rect()));
        let to = border_intersection(&target, from, Some(source.rect()));
        if path_distance(edge.shape, from, to, point) <= radius {
            return GrabTarget::Edge(edge.id);
        }
    }

    GrabTarget::Viewport
}

/// Distance from `point` to the rendered edge path.
fn path_distance(shape: PathShape, from: Point, to: Point, point: Point) -> f64 {
    match shape {
        PathShape::Straight => Line::new(from, to)
            .nearest(point, NEAREST_ACCURACY)
            .distance_sq
            .sqrt(),
        PathShape::Round { curvature } => {
            let chord = to - from;
            let mid = from.midpoint(to);
            let control = mid + Vec2::new(-chord.y, chord.x) * curvature;
            QuadBez::new(from, control, to)
                .nearest(point, NEAREST_ACCURACY)
                .distance_sq
                .sqrt()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_core::{Edge, Id, Node};

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

    fn fixture() -> (GraphStore, ViewportController, GraphConfig, Size) {
        (
            make_store(),
            ViewportController::new(),
            GraphConfig::default(),
            Size::new(800.0, 600.0),
        )
    }

    /// Default viewport centers content (0,0) on the container center.
    fn to_screen(content: Point) -> Point {
        Point::new(content.x + 400.0, content.y + 300.0)
    }

    #[test]
    fn node_body_hits_the_node() {
        let (store, viewport, config, container) = fixture();
        let hit = hit_test(&store, &viewport, &config, to_screen(Point::new(50.0, 25.0)), container);
        assert_eq!(hit, GrabTarget::Node(Id::intern("a")));
    }

    #[test]
    fn empty_space_hits_the_viewport() {
        let (store, viewport, config, container) = fixture();
        let hit = hit_test(&store, &viewport, &config, to_screen(Point::new(150.0, 200.0)), container);
        assert_eq!(hit, GrabTarget::Viewport);
    }

    #[test]
    fn handles_win_over_the_node_body() {
        let (mut store, viewport, config, container) = fixture();
        let handle = gw_core::Handle::new(Id::intern("out"), Vec2::new(50.0, 0.0));
        store.set_handles(Id::intern("a"), std::iter::once(handle).collect());

        // Handle sits at (100, 25); a point just inside the node but
        // within the pick radius resolves to the handle.
        let hit = hit_test(&store, &viewport, &config, to_screen(Point::new(95.0, 25.0)), container);
        assert_eq!(
            hit,
            GrabTarget::Handle {
                node: Id::intern("a"),
                handle: Id::intern("out"),
            }
        );
    }

    #[test]
    fn edge_path_hits_within_the_threshold() {
        let (mut store, viewport, config, container) = fixture();
        let id = store
            .add_edge(Edge::new(Id::intern("e"), Id::intern("a"), Id::intern("b")))
            .unwrap();

        // The straight edge runs y=25 from x=100 to x=300.
        let near = to_screen(Point::new(200.0, 25.0 + config.edge_handle_threshold - 1.0));
        assert_eq!(
            hit_test(&store, &viewport, &config, near, container),
            GrabTarget::Edge(id)
        );

        let far = to_screen(Point::new(200.0, 60.0));
        assert_eq!(
            hit_test(&store, &viewport, &config, far, container),
            GrabTarget::Viewport
        );
    }

    #[test]
    fn topmost_of_overlapping_nodes_wins() {
        let (mut store, viewport, config, container) = fixture();
        let mut c = Node::new(Id::intern("c"), Point::new(40.0, 10.0));
        c.width = 100.0;
        c.height = 50.0;
        store.add_node(c);

        let hit = hit_test(&store, &viewport, &config, to_screen(Point::new(60.0, 30.0)), container);
        assert_eq!(hit, GrabTarget::Node(Id::intern("c")), "later node paints on top");
    }
}
