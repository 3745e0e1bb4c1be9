pub mod border;
pub mod bounds;
pub mod config;
pub mod connect;
pub mod css;
pub mod id;
pub mod model;
pub mod path;

pub use border::{
    BorderBox, HandlePlacement, HandleSpec, NodeBox, NodeMeasure, apply_measure, handle_offset,
    layout_handles,
};
pub use bounds::{BoundsTracker, content_bounds};
pub use config::{FitViewConfig, FitViewMode, GraphConfig, PartialConfig, PolicyOverrides};
pub use connect::{ConnectionRules, Verdict, verify_edge, verify_edges};
pub use id::Id;
pub use model::*;
pub use path::{
    LabelGeometry, NodeOutline, border_intersection, edge_path, label_geometry, node_outline,
    path_data, resolve_endpoints,
};

// Re-export kurbo's scalar geometry types so downstream crates don't need
// a direct dependency.
pub use kurbo::{Point, Rect, Vec2};
