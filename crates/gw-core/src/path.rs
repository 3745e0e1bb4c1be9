//! Edge path geometry: floating-endpoint border intersection, label
//! placement, and the straight/round path shapes.
//!
//! Everything here is a pure function of geometry — no store mutation, no
//! logging side effects — so endpoint results can be memoized by value
//! (`model::EndpointCache`).

use crate::id::Id;
use crate::model::{CornerRadii, GraphStore, HandleBinding, PathShape};
use kurbo::{BezPath, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Slope magnitudes above this are treated as vertical.
const MAX_SLOPE: f64 = 10_000.0;

// ─── Node outline ────────────────────────────────────────────────────────

/// The geometry a floating edge sees of one node: absolute center,
/// half-extents inflated by the node's edge margin, and corner radii.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeOutline {
    pub center: Point,
    pub half: Vec2,
    pub radii: CornerRadii,
}

impl NodeOutline {
    pub fn rect(&self) -> Rect {
        Rect::new(
            self.center.x - self.half.x,
            self.center.y - self.half.y,
            self.center.x + self.half.x,
            self.center.y + self.half.y,
        )
    }
}

/// Build the inflated outline for a stored node.
pub fn node_outline(store: &GraphStore, id: Id) -> Option<NodeOutline> {
    let node = store.node(id)?;
    Some(NodeOutline {
        center: store.absolute_center(id)?,
        half: node.inflated_half(),
        radii: node.radii,
    })
}

// ─── Border intersection ─────────────────────────────────────────────────

/// The point where an edge from `source` toward `toward` touches the
/// source's rounded border.
///
/// `target_box` is the other node's inflated box when the edge ends on a
/// node; overlapping boxes short-circuit to the source center (no visible
/// stub between overlapping nodes).
pub fn border_intersection(
    source: &NodeOutline,
    toward: Point,
    target_box: Option<Rect>,
) -> Point {
    let rect = source.rect();
    if let Some(other) = target_box
        && overlaps(rect, other)
    {
        return source.center;
    }

    let c = source.center;
    let dx = toward.x - c.x;
    let dy = toward.y - c.y;

    // Implicit line through center and target, slope clamped so a
    // near-vertical edge stays finite.
    let slope = if dx == 0.0 {
        MAX_SLOPE.copysign(dy)
    } else {
        (dy / dx).clamp(-MAX_SLOPE, MAX_SLOPE)
    };
    let intercept = c.y - slope * c.x;

    // Only the sides facing the target are reachable.
    if dx < 0.0
        && let Some(p) = vertical_side_hit(rect.x0, slope, intercept, rect)
    {
        return round_corner(p, rect, &source.radii);
    }
    if dx > 0.0
        && let Some(p) = vertical_side_hit(rect.x1, slope, intercept, rect)
    {
        return round_corner(p, rect, &source.radii);
    }
    if dy < 0.0
        && let Some(p) = horizontal_side_hit(rect.y0, slope, intercept, rect)
    {
        return round_corner(p, rect, &source.radii);
    }
    if dy > 0.0
        && let Some(p) = horizontal_side_hit(rect.y1, slope, intercept, rect)
    {
        return round_corner(p, rect, &source.radii);
    }

    // Degenerate direction (near-zero slope against a zero-height box,
    // or target at the center).
    source.center
}

fn overlaps(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

fn vertical_side_hit(x: f64, slope: f64, intercept: f64, rect: Rect) -> Option<Point> {
    let y = slope * x + intercept;
    (rect.y0..=rect.y1).contains(&y).then(|| Point::new(x, y))
}

fn horizontal_side_hit(y: f64, slope: f64, intercept: f64, rect: Rect) -> Option<Point> {
    if slope == 0.0 {
        return None;
    }
    let x = (y - intercept) / slope;
    (rect.x0..=rect.x1).contains(&x).then(|| Point::new(x, y))
}

/// If a straight-side intersection lands inside a corner's rounding arc,
/// project it onto the corner ellipse at the same position along the side.
fn round_corner(p: Point, rect: Rect, radii: &CornerRadii) -> Point {
    // Each corner: (corner point, rx, ry, x direction inward, y direction inward)
    let corners = [
        (Point::new(rect.x0, rect.y0), radii.top_left, 1.0, 1.0),
        (Point::new(rect.x1, rect.y0), radii.top_right, -1.0, 1.0),
        (Point::new(rect.x1, rect.y1), radii.bottom_right, -1.0, -1.0),
        (Point::new(rect.x0, rect.y1), radii.bottom_left, 1.0, -1.0),
    ];

    for (corner, radius, sx, sy) in corners {
        if radius.rx <= 0.0 || radius.ry <= 0.0 {
            continue;
        }
        let local_x = (p.x - corner.x) * sx;
        let local_y = (p.y - corner.y) * sy;
        if !(0.0..radius.rx).contains(&local_x) || !(0.0..radius.ry).contains(&local_y) {
            continue;
        }

        // Ellipse center, inward of the corner by (rx, ry).
        let ex = corner.x + sx * radius.rx;
        let ey = corner.y + sy * radius.ry;

        if p.x == corner.x {
            // On a vertical side: keep y, solve x on the arc.
            let t = ((ey - p.y) / radius.ry).clamp(-1.0, 1.0);
            let x = ex - sx * radius.rx * (1.0 - t * t).max(0.0).sqrt();
            return Point::new(x, p.y);
        }
        // On a horizontal side: keep x, solve y on the arc.
        let t = ((ex - p.x) / radius.rx).clamp(-1.0, 1.0);
        let y = ey - sy * radius.ry * (1.0 - t * t).max(0.0).sqrt();
        return Point::new(p.x, y);
    }

    p
}

// ─── Edge endpoints ──────────────────────────────────────────────────────

/// Resolve both attachment points of a stored edge, memoized per endpoint.
///
/// A `Named` binding attaches at the handle's offset from the node
/// center; `Floating` (and still-unresolved `Auto`) endpoints attach at
/// the border intersection facing the other side's anchor.
pub fn resolve_endpoints(store: &mut GraphStore, edge_id: Id) -> Option<(Point, Point)> {
    let edge = store.edge(edge_id)?;
    let (source, target) = (edge.source, edge.target);
    let (source_handle, target_handle) = (edge.source_handle, edge.target_handle);

    let source_outline = node_outline(store, source)?;
    let target_outline = node_outline(store, target)?;

    let source_anchor = binding_anchor(store, source, source_handle, source_outline.center);
    let target_anchor = binding_anchor(store, target, target_handle, target_outline.center);

    let source_point = endpoint(
        store,
        edge_id,
        EndpointSide::Source,
        &source_outline,
        source_handle,
        source_anchor,
        target_anchor,
        target_outline.rect(),
    );
    let target_point = endpoint(
        store,
        edge_id,
        EndpointSide::Target,
        &target_outline,
        target_handle,
        target_anchor,
        source_point,
        source_outline.rect(),
    );

    Some((source_point, target_point))
}

#[derive(Clone, Copy)]
enum EndpointSide {
    Source,
    Target,
}

/// Where a bound handle anchors, or the node center for floating sides.
fn binding_anchor(store: &GraphStore, node: Id, binding: HandleBinding, center: Point) -> Point {
    if let HandleBinding::Named(name) = binding
        && let Some(handle) = store.node(node).and_then(|n| n.handle(name))
    {
        return center + handle.offset;
    }
    center
}

#[allow(clippy::too_many_arguments)]
fn endpoint(
    store: &mut GraphStore,
    edge_id: Id,
    side: EndpointSide,
    outline: &NodeOutline,
    binding: HandleBinding,
    own_anchor: Point,
    toward: Point,
    other_box: Rect,
) -> Point {
    if matches!(binding, HandleBinding::Named(_)) {
        return own_anchor;
    }

    let cached = store.edge(edge_id).and_then(|e| {
        let cache = match side {
            EndpointSide::Source => &e.source_cache,
            EndpointSide::Target => &e.target_cache,
        };
        cache.lookup(outline.center, toward, outline.half)
    });
    if let Some(point) = cached {
        return point;
    }

    let point = border_intersection(outline, toward, Some(other_box));
    if let Some(edge) = store.edge_mut(edge_id) {
        let cache = match side {
            EndpointSide::Source => &mut edge.source_cache,
            EndpointSide::Target => &mut edge.target_cache,
        };
        cache.store(outline.center, toward, outline.half, point);
    }
    point
}

// ─── Path shapes ─────────────────────────────────────────────────────────

/// Build the drawable path between two resolved endpoints.
pub fn edge_path(shape: PathShape, from: Point, to: Point) -> BezPath {
    let mut path = BezPath::new();
    path.move_to(from);
    match shape {
        PathShape::Straight => {
            path.line_to(to);
        }
        PathShape::Round { curvature } => {
            let chord = to - from;
            let mid = from.midpoint(to);
            let perp = Vec2::new(-chord.y, chord.x);
            let control = mid + perp * curvature;
            path.quad_to(control, to);
        }
    }
    path
}

/// SVG `d`-attribute form of a path, for the rendering collaborator.
pub fn path_data(path: &BezPath) -> String {
    path.to_svg()
}

// ─── Label geometry ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Baseline {
    /// Alphabetic baseline — text sits above the anchor point.
    Auto,
    /// Hanging baseline — text hangs below the anchor point.
    Hanging,
    Middle,
}

/// Resolved placement for one edge label.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LabelGeometry {
    /// Anchor point: chord midpoint plus the perpendicular shift.
    pub position: Point,
    pub anchor: TextAnchor,
    pub baseline: Baseline,
    /// Rotation in degrees (0 when rotation is disabled).
    pub angle: f64,
    /// The applied perpendicular shift.
    pub shift: Vec2,
}

/// Compute label placement beside the edge from `source` to `target`.
///
/// With `rotate`, the label follows the edge angle — flipped 180° when it
/// would render upside-down (angle in (90°, 270°)), with the shift
/// mirrored to stay on the same visual side.
pub fn label_geometry(source: Point, target: Point, offset: f64, rotate: bool) -> LabelGeometry {
    let chord = target - source;
    let mid = source.midpoint(target);

    let len = chord.hypot();
    if len == 0.0 {
        return LabelGeometry {
            position: mid,
            anchor: TextAnchor::Middle,
            baseline: Baseline::Middle,
            angle: 0.0,
            shift: Vec2::ZERO,
        };
    }

    // Perpendicular pointing to the upper side of the edge.
    let mut perp = Vec2::new(-chord.y / len, chord.x / len);
    if perp.y > 0.0 {
        perp = -perp;
    }
    let mut shift = perp * offset;

    if rotate {
        let mut angle = chord.y.atan2(chord.x).to_degrees().rem_euclid(360.0);
        if angle > 90.0 && angle < 270.0 {
            angle = (angle + 180.0).rem_euclid(360.0);
            shift = -shift;
        }
        return LabelGeometry {
            position: mid + shift,
            anchor: TextAnchor::Middle,
            baseline: if shift.y <= 0.0 {
                Baseline::Auto
            } else {
                Baseline::Hanging
            },
            angle,
            shift,
        };
    }

    // Unrotated: anchor away from the edge so the text grows outward.
    let anchor = if shift.x > 1e-9 {
        TextAnchor::Start
    } else if shift.x < -1e-9 {
        TextAnchor::End
    } else {
        TextAnchor::Middle
    };
    LabelGeometry {
        position: mid + shift,
        anchor,
        baseline: if shift.y <= 0.0 {
            Baseline::Auto
        } else {
            Baseline::Hanging
        },
        angle: 0.0,
        shift,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn outline(cx: f64, cy: f64, hw: f64, hh: f64) -> NodeOutline {
        NodeOutline {
            center: Point::new(cx, cy),
            half: Vec2::new(hw, hh),
            radii: CornerRadii::default(),
        }
    }

    #[test]
    fn intersection_lands_on_the_perimeter() {
        let source = outline(0.0, 0.0, 50.0, 25.0);

        // Target straight right: hit the right side.
        let p = border_intersection(&source, Point::new(200.0, 0.0), None);
        assert_eq!((p.x, p.y), (50.0, 0.0));

        // Target below: hit the bottom side.
        let p = border_intersection(&source, Point::new(0.0, 300.0), None);
        assert_eq!((p.x, p.y), (0.0, 25.0));

        // Diagonal target: still exactly on the border rect.
        let p = border_intersection(&source, Point::new(200.0, 60.0), None);
        let rect = source.rect();
        let on_vertical = (p.x - rect.x1).abs() < 1e-9 && (rect.y0..=rect.y1).contains(&p.y);
        let on_horizontal = (p.y - rect.y1).abs() < 1e-9 && (rect.x0..=rect.x1).contains(&p.x);
        assert!(on_vertical || on_horizontal, "point {p:?} not on perimeter");
    }

    #[test]
    fn overlapping_boxes_short_circuit_to_center() {
        let source = outline(0.0, 0.0, 50.0, 25.0);
        let target_box = Rect::new(30.0, -10.0, 130.0, 40.0);
        let p = border_intersection(&source, Point::new(80.0, 15.0), Some(target_box));
        assert_eq!(p, source.center);
    }

    #[test]
    fn rounded_corner_intersection_is_pulled_inward() {
        let mut source = outline(0.0, 0.0, 50.0, 50.0);
        source.radii = CornerRadii::uniform(20.0);

        // Aim near the top-right corner: the straight-side hit sits inside
        // the rounding arc, so the returned x must be inside the rect.
        let p = border_intersection(&source, Point::new(120.0, -100.0), None);
        let rect = source.rect();
        assert!(
            p.x < rect.x1 || p.y > rect.y0,
            "corner hit should leave the straight border, got {p:?}"
        );
        // And stay close to the corner region.
        assert!(p.x > 0.0 && p.y < 0.0);
    }

    #[test]
    fn near_vertical_target_does_not_blow_up() {
        let source = outline(0.0, 0.0, 50.0, 25.0);
        let p = border_intersection(&source, Point::new(1e-12, 500.0), None);
        assert!((p.y - 25.0).abs() < 1e-6);
        assert!(p.x.abs() < 1.0);
    }

    #[test]
    fn straight_path_is_two_points() {
        let path = edge_path(
            PathShape::Straight,
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
        );
        let els = path.elements();
        assert_eq!(els.len(), 2);
        assert_eq!(els[1], kurbo::PathEl::LineTo(Point::new(10.0, 0.0)));
    }

    #[test]
    fn round_path_offsets_control_perpendicular() {
        let path = edge_path(
            PathShape::Round { curvature: 0.25 },
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
        );
        // Control point: midpoint (50,0) + perp(0,100)*0.25 = (50,25).
        let els = path.elements();
        assert_eq!(
            els[1],
            kurbo::PathEl::QuadTo(Point::new(50.0, 25.0), Point::new(100.0, 0.0))
        );
    }

    #[test]
    fn label_flips_when_upside_down() {
        // Right-to-left edge: raw angle 180°, inside the flip range.
        let geom = label_geometry(Point::new(100.0, 0.0), Point::new(0.0, 0.0), 10.0, true);
        assert_eq!(geom.angle, 0.0);

        // Left-to-right edge needs no flip.
        let geom = label_geometry(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 10.0, true);
        assert_eq!(geom.angle, 0.0);
    }

    #[test]
    fn label_shift_is_perpendicular_to_the_chord() {
        let geom = label_geometry(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 8.0, false);
        assert!(geom.shift.x.abs() < 1e-9);
        assert_eq!(geom.shift.y, -8.0, "label sits above a horizontal edge");
        assert_eq!(geom.anchor, TextAnchor::Middle);
        assert_eq!(geom.baseline, Baseline::Auto);
    }
}
