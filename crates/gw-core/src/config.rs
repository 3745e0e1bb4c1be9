//! Configuration surface.
//!
//! Hosts hand us a `PartialConfig` (every field optional); `resolve()`
//! produces the fully-specified `GraphConfig` used everywhere else. Each
//! field's default and effect is documented on the struct.
//!
//! Nodes, edges and handles can narrow the global permissions through
//! `PolicyOverrides`; the `effective` helper implements the
//! object-over-global fallback.

use serde::{Deserialize, Serialize};

// ─── Fit-view ────────────────────────────────────────────────────────────

/// When fit-view runs on its own (beyond explicit requests).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FitViewMode {
    /// Only on explicit controller request.
    #[default]
    Manual,
    /// Also after a container resize.
    OnResize,
    /// After every content-bounds change.
    Always,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitViewConfig {
    /// Padding kept around the content, as a CSS length resolved against
    /// the container's own size. Default `"10%"`.
    pub padding: String,
    /// Clamp the fitted zoom to `min_zoom`/`max_zoom`. Default `false`.
    pub abide_min_max_zoom: bool,
    /// Automatic trigger mode. Default `Manual`.
    pub mode: FitViewMode,
}

impl Default for FitViewConfig {
    fn default() -> Self {
        Self {
            padding: "10%".to_string(),
            abide_min_max_zoom: false,
            mode: FitViewMode::Manual,
        }
    }
}

// ─── Global config ───────────────────────────────────────────────────────

/// Fully-resolved configuration. Produced once by `PartialConfig::resolve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Lower zoom clamp for user gestures and fit-view. Default 0.1.
    pub min_zoom: f64,
    /// Upper zoom clamp. Default 10.0.
    pub max_zoom: f64,

    /// Gate viewport pan gestures. Default true.
    pub allow_panning: bool,
    /// Gate viewport zoom gestures. Default true.
    pub allow_zooming: bool,

    /// Gate selection clicks (overridable per object). Default true.
    pub allow_selection: bool,
    /// Allow more than one object in the selection at once. Default false.
    pub multiple_selection: bool,
    /// Gate pointer grabs (overridable per object). Default true.
    pub allow_grabbing: bool,
    /// Gate node dragging (overridable per node). Default true.
    pub allow_moving: bool,
    /// Gate being the target of a drawn edge (overridable per object).
    /// Default true.
    pub allow_new_edge_target: bool,

    /// Pointer travel below this many pixels is not a drag. Default 3.0.
    pub minimum_pointer_movement: f64,
    /// Window for multi-click counting, in ms. Default 500.
    pub multi_click_delay: f64,
    /// Long-click delay in ms; negative disables. Default 500.
    pub long_click_delay: f64,
    /// Pick radius around an edge path for grabbing it, in px. Default 10.
    pub edge_handle_threshold: f64,

    pub fit_view: FitViewConfig,

    /// The connection-legality DSL source. Empty = no restrictions.
    pub allowed_connections: String,
    /// Keep (true) or drop (false, default) edges that violate the rules.
    pub allow_illegal_edges: bool,
    /// Whether handles with no declared role connect to anything.
    /// Default true.
    pub allow_free_connections: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 10.0,
            allow_panning: true,
            allow_zooming: true,
            allow_selection: true,
            multiple_selection: false,
            allow_grabbing: true,
            allow_moving: true,
            allow_new_edge_target: true,
            minimum_pointer_movement: 3.0,
            multi_click_delay: 500.0,
            long_click_delay: 500.0,
            edge_handle_threshold: 10.0,
            fit_view: FitViewConfig::default(),
            allowed_connections: String::new(),
            allow_illegal_edges: false,
            allow_free_connections: true,
        }
    }
}

// ─── Partial config ──────────────────────────────────────────────────────

/// Host-supplied configuration with every field optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialConfig {
    pub min_zoom: Option<f64>,
    pub max_zoom: Option<f64>,
    pub allow_panning: Option<bool>,
    pub allow_zooming: Option<bool>,
    pub allow_selection: Option<bool>,
    pub multiple_selection: Option<bool>,
    pub allow_grabbing: Option<bool>,
    pub allow_moving: Option<bool>,
    pub allow_new_edge_target: Option<bool>,
    pub minimum_pointer_movement: Option<f64>,
    pub multi_click_delay: Option<f64>,
    pub long_click_delay: Option<f64>,
    pub edge_handle_threshold: Option<f64>,
    pub fit_view_padding: Option<String>,
    pub fit_view_abide_min_max_zoom: Option<bool>,
    pub fit_view_mode: Option<FitViewMode>,
    pub allowed_connections: Option<String>,
    pub allow_illegal_edges: Option<bool>,
    pub allow_free_connections: Option<bool>,
}

impl PartialConfig {
    /// Fill every unset field with its documented default.
    #[must_use]
    pub fn resolve(self) -> GraphConfig {
        let defaults = GraphConfig::default();
        let fit_defaults = defaults.fit_view;
        GraphConfig {
            min_zoom: self.min_zoom.unwrap_or(defaults.min_zoom),
            max_zoom: self.max_zoom.unwrap_or(defaults.max_zoom),
            allow_panning: self.allow_panning.unwrap_or(defaults.allow_panning),
            allow_zooming: self.allow_zooming.unwrap_or(defaults.allow_zooming),
            allow_selection: self.allow_selection.unwrap_or(defaults.allow_selection),
            multiple_selection: self
                .multiple_selection
                .unwrap_or(defaults.multiple_selection),
            allow_grabbing: self.allow_grabbing.unwrap_or(defaults.allow_grabbing),
            allow_moving: self.allow_moving.unwrap_or(defaults.allow_moving),
            allow_new_edge_target: self
                .allow_new_edge_target
                .unwrap_or(defaults.allow_new_edge_target),
            minimum_pointer_movement: self
                .minimum_pointer_movement
                .unwrap_or(defaults.minimum_pointer_movement),
            multi_click_delay: self.multi_click_delay.unwrap_or(defaults.multi_click_delay),
            long_click_delay: self.long_click_delay.unwrap_or(defaults.long_click_delay),
            edge_handle_threshold: self
                .edge_handle_threshold
                .unwrap_or(defaults.edge_handle_threshold),
            fit_view: FitViewConfig {
                padding: self.fit_view_padding.unwrap_or(fit_defaults.padding),
                abide_min_max_zoom: self
                    .fit_view_abide_min_max_zoom
                    .unwrap_or(fit_defaults.abide_min_max_zoom),
                mode: self.fit_view_mode.unwrap_or(fit_defaults.mode),
            },
            allowed_connections: self.allowed_connections.unwrap_or_default(),
            allow_illegal_edges: self
                .allow_illegal_edges
                .unwrap_or(defaults.allow_illegal_edges),
            allow_free_connections: self
                .allow_free_connections
                .unwrap_or(defaults.allow_free_connections),
        }
    }
}

// ─── Per-object overrides ────────────────────────────────────────────────

/// Object-level permission overrides. `None` falls back to the global
/// config field of the same name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOverrides {
    pub allow_grabbing: Option<bool>,
    pub allow_moving: Option<bool>,
    pub allow_selection: Option<bool>,
    pub allow_new_edge_target: Option<bool>,
}

/// Object-over-global fallback.
pub fn effective(object: Option<bool>, global: bool) -> bool {
    object.unwrap_or(global)
}

impl GraphConfig {
    pub fn grabbing_allowed(&self, policy: &PolicyOverrides) -> bool {
        effective(policy.allow_grabbing, self.allow_grabbing)
    }

    pub fn moving_allowed(&self, policy: &PolicyOverrides) -> bool {
        effective(policy.allow_moving, self.allow_moving)
    }

    pub fn selection_allowed(&self, policy: &PolicyOverrides) -> bool {
        effective(policy.allow_selection, self.allow_selection)
    }

    pub fn new_edge_target_allowed(&self, policy: &PolicyOverrides) -> bool {
        effective(policy.allow_new_edge_target, self.allow_new_edge_target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_partial_yields_defaults() {
        let config = PartialConfig::default().resolve();
        assert_eq!(config, GraphConfig::default());
        assert_eq!(config.fit_view.padding, "10%");
        assert!(!config.multiple_selection);
    }

    #[test]
    fn partial_fields_override_defaults() {
        let config = PartialConfig {
            max_zoom: Some(4.0),
            allow_panning: Some(false),
            fit_view_padding: Some("24px".to_string()),
            ..PartialConfig::default()
        }
        .resolve();
        assert_eq!(config.max_zoom, 4.0);
        assert!(!config.allow_panning);
        assert_eq!(config.fit_view.padding, "24px");
        assert_eq!(config.min_zoom, 0.1, "unset fields keep defaults");
    }

    #[test]
    fn object_policy_narrows_global() {
        let config = GraphConfig::default();
        let locked = PolicyOverrides {
            allow_moving: Some(false),
            ..PolicyOverrides::default()
        };
        assert!(config.moving_allowed(&PolicyOverrides::default()));
        assert!(!config.moving_allowed(&locked));
    }
}
