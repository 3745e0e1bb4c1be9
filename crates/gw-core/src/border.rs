//! Border & handle geometry.
//!
//! Turns a node's measured box (size, border widths, corner radii) and a
//! set of declared handle placements into offsets from the node's center.
//! Handles that land inside a rounded corner are pulled onto the corner
//! ellipse so they sit on the rendered border, not on the square outline.

use crate::css;
use crate::id::Id;
use crate::model::{BorderWidths, CornerRadii, CornerRadius, GraphStore, Handle};
use kurbo::Vec2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::f64::consts::FRAC_1_SQRT_2;

// ─── Placement declarations ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Top,
    Right,
    Bottom,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomRight,
    BottomLeft,
}

/// Where a declared handle sits on its node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HandlePlacement {
    /// A fraction (0..=1) of the way along a side.
    Side { side: Side, along: f64 },
    /// The 45° point of a corner's rounding ellipse.
    Corner(Corner),
    /// The whole node treated as an ellipse; `along` maps to an angle
    /// (0 and 1 = top, 0.25 = right, 0.5 = bottom, 0.75 = left).
    Ellipse { along: f64 },
    /// Manual CSS-style placement: computed `left`/`top` values resolved
    /// against the node's width/height.
    Manual { left: String, top: String },
}

/// Which reference box handle coordinates are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BorderBox {
    /// The outer border box.
    Full,
    /// Inset by half the border width — the middle of the drawn border.
    #[default]
    Normal,
    /// The content box; the border is subtracted entirely.
    Padding,
}

/// A caller-declared handle: placement plus connection metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandleSpec {
    pub name: Id,
    pub placement: HandlePlacement,
    pub mode: BorderBox,
    pub roles: SmallVec<[Id; 2]>,
}

impl HandleSpec {
    pub fn new(name: Id, placement: HandlePlacement) -> Self {
        Self {
            name,
            placement,
            mode: BorderBox::default(),
            roles: SmallVec::new(),
        }
    }
}

/// The measured box geometry the placement math works against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeBox {
    pub width: f64,
    pub height: f64,
    pub borders: BorderWidths,
    pub radii: CornerRadii,
}

impl NodeBox {
    fn half(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// How far `mode` pulls a point inward from the border box, per side.
    fn inset(&self, side: Side, mode: BorderBox) -> f64 {
        let border = match side {
            Side::Top => self.borders.top,
            Side::Right => self.borders.right,
            Side::Bottom => self.borders.bottom,
            Side::Left => self.borders.left,
        };
        match mode {
            BorderBox::Full => 0.0,
            BorderBox::Normal => border / 2.0,
            BorderBox::Padding => border,
        }
    }

    fn corner_radius(&self, corner: Corner) -> CornerRadius {
        match corner {
            Corner::TopLeft => self.radii.top_left,
            Corner::TopRight => self.radii.top_right,
            Corner::BottomRight => self.radii.bottom_right,
            Corner::BottomLeft => self.radii.bottom_left,
        }
    }
}

// ─── Placement math ──────────────────────────────────────────────────────

/// Offset from the node's center for one declared placement.
pub fn handle_offset(node: &NodeBox, placement: &HandlePlacement, mode: BorderBox) -> Vec2 {
    match placement {
        HandlePlacement::Side { side, along } => side_offset(node, *side, *along, mode),
        HandlePlacement::Corner(corner) => corner_offset(node, *corner, mode),
        HandlePlacement::Ellipse { along } => ellipse_offset(node, *along, mode),
        HandlePlacement::Manual { left, top } => {
            let x = css::resolve_value(left, node.width);
            let y = css::resolve_value(top, node.height);
            Vec2::new(x, y) - node.half()
        }
    }
}

fn side_offset(node: &NodeBox, side: Side, along: f64, mode: BorderBox) -> Vec2 {
    let half = node.half();
    let t = along.clamp(0.0, 1.0);

    // Linear position along the side, then corner-ellipse correction for
    // the perpendicular axis, then the mode inset.
    match side {
        Side::Top | Side::Bottom => {
            let x = -half.x + t * node.width;
            let (near, far) = if side == Side::Top {
                (node.radii.top_left, node.radii.top_right)
            } else {
                (node.radii.bottom_left, node.radii.bottom_right)
            };
            let sink = corner_sink(x, half.x, near, far);
            let y = half.y - node.inset(side, mode) - sink;
            match side {
                Side::Top => Vec2::new(x, -y),
                _ => Vec2::new(x, y),
            }
        }
        Side::Left | Side::Right => {
            let y = -half.y + t * node.height;
            let (near, far) = if side == Side::Left {
                (node.radii.top_left.transpose(), node.radii.bottom_left.transpose())
            } else {
                (node.radii.top_right.transpose(), node.radii.bottom_right.transpose())
            };
            let sink = corner_sink(y, half.y, near, far);
            let x = half.x - node.inset(side, mode) - sink;
            match side {
                Side::Left => Vec2::new(-x, y),
                _ => Vec2::new(x, y),
            }
        }
    }
}

/// How far a point at coordinate `c` (along a side of half-extent `half`)
/// must sink perpendicular to that side to stay on the corner ellipse.
///
/// `near` covers the corner at `-half`, `far` the one at `+half`; each
/// radius is oriented so `rx` runs along the side and `ry` perpendicular.
fn corner_sink(c: f64, half: f64, near: CornerRadius, far: CornerRadius) -> f64 {
    let near_edge = -half + near.rx;
    if c < near_edge && near.rx > 0.0 {
        let dx = (near_edge - c) / near.rx;
        return near.ry * (1.0 - (1.0 - dx * dx).max(0.0).sqrt());
    }
    let far_edge = half - far.rx;
    if c > far_edge && far.rx > 0.0 {
        let dx = (c - far_edge) / far.rx;
        return far.ry * (1.0 - (1.0 - dx * dx).max(0.0).sqrt());
    }
    0.0
}

impl CornerRadius {
    /// Swap the axes: corner math for vertical sides runs with `rx` along
    /// the side.
    fn transpose(self) -> Self {
        Self {
            rx: self.ry,
            ry: self.rx,
        }
    }
}

fn corner_offset(node: &NodeBox, corner: Corner, mode: BorderBox) -> Vec2 {
    let half = node.half();
    let radius = node.corner_radius(corner);

    // 45° point of the corner ellipse: radius · (1 − cos 45°) inward.
    let pull = 1.0 - FRAC_1_SQRT_2;
    let inward_x = radius.rx * pull;
    let inward_y = radius.ry * pull;

    let (sx, sy, h_side, v_side) = match corner {
        Corner::TopLeft => (-1.0, -1.0, Side::Left, Side::Top),
        Corner::TopRight => (1.0, -1.0, Side::Right, Side::Top),
        Corner::BottomRight => (1.0, 1.0, Side::Right, Side::Bottom),
        Corner::BottomLeft => (-1.0, 1.0, Side::Left, Side::Bottom),
    };

    Vec2::new(
        sx * (half.x - node.inset(h_side, mode) - inward_x),
        sy * (half.y - node.inset(v_side, mode) - inward_y),
    )
}

fn ellipse_offset(node: &NodeBox, along: f64, mode: BorderBox) -> Vec2 {
    let half = node.half();
    let theta = along.rem_euclid(1.0) * std::f64::consts::TAU;
    let (sin, cos) = theta.sin_cos();

    // Pick the inset of the side the point is facing; the factor fades to
    // zero at the axes so the result stays continuous.
    let ax = if sin >= 0.0 {
        half.x - node.inset(Side::Right, mode)
    } else {
        half.x - node.inset(Side::Left, mode)
    };
    let ay = if cos >= 0.0 {
        half.y - node.inset(Side::Top, mode)
    } else {
        half.y - node.inset(Side::Bottom, mode)
    };

    Vec2::new(ax * sin, -ay * cos)
}

// ─── Handle layout ───────────────────────────────────────────────────────

/// Recompute the full handle list for one node box.
pub fn layout_handles(node: &NodeBox, specs: &[HandleSpec]) -> SmallVec<[Handle; 4]> {
    specs
        .iter()
        .map(|spec| {
            let offset = handle_offset(node, &spec.placement, spec.mode);
            Handle::new(spec.name, offset).with_roles(spec.roles.iter().copied())
        })
        .collect()
}

// ─── Measurement intake ──────────────────────────────────────────────────

/// Raw computed styles from the measurement collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMeasure {
    pub width: f64,
    pub height: f64,
    /// Computed border widths: top, right, bottom, left.
    pub border_widths: [String; 4],
    /// Computed per-corner radius pairs: top-left, top-right,
    /// bottom-right, bottom-left (each a 1- or 2-token value).
    pub border_radii: [String; 4],
}

impl NodeMeasure {
    /// Per-corner radius pairs from the computed radius strings.
    pub fn radii(&self) -> CornerRadii {
        let resolve = |s: &str| {
            let (rx, ry) = css::resolve_values(s, self.width, self.height);
            CornerRadius::new(rx, ry)
        };
        CornerRadii {
            top_left: resolve(&self.border_radii[0]),
            top_right: resolve(&self.border_radii[1]),
            bottom_right: resolve(&self.border_radii[2]),
            bottom_left: resolve(&self.border_radii[3]),
        }
    }

    /// Per-side widths from the computed border-width strings.
    pub fn borders(&self) -> BorderWidths {
        BorderWidths {
            top: css::resolve_value(&self.border_widths[0], self.height),
            right: css::resolve_value(&self.border_widths[1], self.width),
            bottom: css::resolve_value(&self.border_widths[2], self.height),
            left: css::resolve_value(&self.border_widths[3], self.width),
        }
    }
}

/// Apply a fresh measurement to a stored node and relayout its handles.
///
/// Invoked by the host whenever the node's rendered size could have
/// changed, and once after handle-bearing content re-renders.
pub fn apply_measure(store: &mut GraphStore, id: Id, measure: &NodeMeasure, specs: &[HandleSpec]) {
    let node_box = NodeBox {
        width: measure.width,
        height: measure.height,
        borders: measure.borders(),
        radii: measure.radii(),
    };
    let handles = layout_handles(&node_box, specs);

    if let Some(node) = store.node_mut(id) {
        node.width = node_box.width;
        node.height = node_box.height;
        node.borders = node_box.borders;
        node.radii = node_box.radii;
        node.handles = handles;
    } else {
        log::warn!("measurement for unknown node {id:?} ignored");
    }
}
