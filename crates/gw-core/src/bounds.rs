//! Content bounding box.
//!
//! The bounds drive container sizing and the fit-view target. Recomputes
//! are cheap (one sweep), but *reporting* a change re-triggers layout in
//! the host, so the tracker only reports deltas beyond a tolerance.

use crate::model::GraphStore;
use crate::path::{border_intersection, edge_path, node_outline};
use kurbo::{Rect, Shape};

/// Default change tolerance, in px.
pub const DEFAULT_TOLERANCE: f64 = 2.0;

/// Union bounding box of all node boxes and rendered edge paths.
/// `None` for an empty graph.
pub fn content_bounds(store: &GraphStore) -> Option<Rect> {
    let mut acc: Option<Rect> = None;
    let mut grow = |r: Rect| {
        acc = Some(match acc {
            Some(prev) => prev.union(r),
            None => r,
        });
    };

    for node in store.nodes() {
        if let Some(rect) = store.absolute_rect(node.id) {
            grow(rect);
        }
    }

    for edge in store.edges() {
        let Some(source) = node_outline(store, edge.source) else {
            continue;
        };
        let Some(target) = node_outline(store, edge.target) else {
            continue;
        };
        let from = border_intersection(&source, target.center, Some(target.rect()));
        let to = border_intersection(&target, from, Some(source.rect()));
        let path = edge_path(edge.shape, from, to);
        grow(path.bounding_box());
    }

    acc
}

/// Remembers the last reported bounds and suppresses sub-tolerance churn.
#[derive(Debug, Clone)]
pub struct BoundsTracker {
    current: Option<Rect>,
    tolerance: f64,
}

impl Default for BoundsTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TOLERANCE)
    }
}

impl BoundsTracker {
    #[must_use]
    pub fn new(tolerance: f64) -> Self {
        Self {
            current: None,
            tolerance,
        }
    }

    pub fn with_default_tolerance() -> Self {
        Self::default()
    }

    /// The last reported bounds.
    pub fn rect(&self) -> Option<Rect> {
        self.current
    }

    /// Recompute from the store; returns true when the bounds moved
    /// beyond the tolerance (and updates the stored rect).
    pub fn update(&mut self, store: &GraphStore) -> bool {
        let fresh = content_bounds(store);
        let changed = match (self.current, fresh) {
            (None, None) => false,
            (Some(a), Some(b)) => differs(a, b, self.tolerance),
            _ => true,
        };
        if changed {
            self.current = fresh;
        }
        changed
    }
}

fn differs(a: Rect, b: Rect, tol: f64) -> bool {
    (a.x0 - b.x0).abs() > tol
        || (a.y0 - b.y0).abs() > tol
        || (a.x1 - b.x1).abs() > tol
        || (a.y1 - b.y1).abs() > tol
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Id;
    use crate::model::Node;
    use kurbo::Point;

    fn store_with(nodes: &[(&str, f64, f64)]) -> GraphStore {
        let mut store = GraphStore::new();
        for (id, x, y) in nodes {
            let mut node = Node::new(Id::intern(id), Point::new(*x, *y));
            node.width = 100.0;
            node.height = 50.0;
            store.add_node(node);
        }
        store
    }

    #[test]
    fn bounds_cover_all_nodes() {
        let store = store_with(&[("a", 0.0, 0.0), ("b", 300.0, 200.0)]);
        let rect = content_bounds(&store).unwrap();
        assert_eq!(rect, Rect::new(0.0, 0.0, 400.0, 250.0));
    }

    #[test]
    fn empty_graph_has_no_bounds() {
        assert_eq!(content_bounds(&GraphStore::new()), None);
    }

    #[test]
    fn tracker_swallows_subtolerance_jitter() {
        let mut store = store_with(&[("a", 0.0, 0.0)]);
        let mut tracker = BoundsTracker::with_default_tolerance();
        assert!(tracker.update(&store), "first computation reports change");

        store.node_mut(Id::intern("a")).unwrap().position = Point::new(0.5, 0.5);
        assert!(!tracker.update(&store), "sub-tolerance move is not a change");

        store.node_mut(Id::intern("a")).unwrap().position = Point::new(10.0, 0.0);
        assert!(tracker.update(&store));
    }
}
