//! Viewport state and the fit-view algorithm.
//!
//! The viewport is a center point plus a zoom scalar. It is owned by the
//! controller and mutated only through the setters here; readers get an
//! immutable snapshot. Because a host's state changes and their visual
//! effects are not synchronous, fit-view re-application is tracked with a
//! requested-vs-applied generation pair instead of a boolean.

use gw_core::config::{FitViewMode, GraphConfig};
use gw_core::css;
use kurbo::{Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Immutable viewport snapshot: the content point at the container center
/// and the zoom factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: Point,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: Point::ZERO,
            zoom: 1.0,
        }
    }
}

/// Owns the viewport and the fit-view bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViewportController {
    viewport: Viewport,
    fit_requested: u64,
    fit_applied: u64,
}

impl ViewportController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Snapshot access ─────────────────────────────────────────────────

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Replace the snapshot wholesale. Zoom is clamped to the config range.
    pub fn set_viewport(&mut self, viewport: Viewport, config: &GraphConfig) {
        self.viewport = Viewport {
            center: viewport.center,
            zoom: viewport.zoom.clamp(config.min_zoom, config.max_zoom),
        };
    }

    pub fn set_center(&mut self, center: Point) {
        self.viewport.center = center;
    }

    pub fn set_zoom(&mut self, zoom: f64, config: &GraphConfig) {
        self.viewport.zoom = zoom.clamp(config.min_zoom, config.max_zoom);
    }

    /// Multiply the zoom (wheel gestures). Gated by `allow_zooming`.
    pub fn zoom_by(&mut self, factor: f64, config: &GraphConfig) {
        if !config.allow_zooming {
            return;
        }
        self.set_zoom(self.viewport.zoom * factor, config);
    }

    /// Pan by a screen-space delta. Dividing by zoom keeps the gesture
    /// zoom-independent: the content under the pointer follows it.
    pub fn pan_by_screen(&mut self, delta: Vec2) {
        self.viewport.center -= delta / self.viewport.zoom;
    }

    // ─── Coordinate transforms ───────────────────────────────────────────

    pub fn screen_to_content(&self, screen: Point, container: Size) -> Point {
        let offset = screen - Point::new(container.width / 2.0, container.height / 2.0);
        self.viewport.center + offset / self.viewport.zoom
    }

    pub fn content_to_screen(&self, content: Point, container: Size) -> Point {
        let offset = (content - self.viewport.center) * self.viewport.zoom;
        Point::new(container.width / 2.0, container.height / 2.0) + offset
    }

    /// A screen-space delta in content units.
    pub fn screen_delta_to_content(&self, delta: Vec2) -> Vec2 {
        delta / self.viewport.zoom
    }

    // ─── Fit view ────────────────────────────────────────────────────────

    /// Fit `content` into `container`, honoring the configured padding.
    ///
    /// The padding is resolved against the container's own size and is a
    /// *post-zoom* (screen) inset, so the content rect is inflated by
    /// `padding / zoom` and the zoom recomputed once against the padded
    /// rect.
    pub fn fit_view(&mut self, container: Size, content: Rect, config: &GraphConfig) {
        if content.width() <= 0.0 || content.height() <= 0.0 {
            return;
        }
        if container.width <= 0.0 || container.height <= 0.0 {
            return;
        }

        let zoom = (container.width / content.width()).min(container.height / content.height());

        let (pad_x, pad_y) =
            css::resolve_values(&config.fit_view.padding, container.width, container.height);
        let padded = content.inflate(pad_x / zoom, pad_y / zoom);

        let mut zoom = (container.width / padded.width()).min(container.height / padded.height());
        if config.fit_view.abide_min_max_zoom {
            zoom = zoom.clamp(config.min_zoom, config.max_zoom);
        }

        self.viewport = Viewport {
            center: padded.center(),
            zoom,
        };
    }

    // ─── Deferred fit bookkeeping ────────────────────────────────────────

    /// Ask for a fit-view pass once the pending re-render has settled.
    pub fn request_fit(&mut self) {
        self.fit_requested += 1;
    }

    pub fn fit_pending(&self) -> bool {
        self.fit_applied < self.fit_requested
    }

    /// Run the requested fit, if any. Called by the host after a render
    /// pass completes.
    pub fn apply_pending_fit(&mut self, container: Size, content: Rect, config: &GraphConfig) {
        if !self.fit_pending() {
            return;
        }
        self.fit_view(container, content, config);
        self.fit_applied = self.fit_requested;
    }

    // ─── Automatic triggers ──────────────────────────────────────────────

    /// The content bounds moved (beyond tolerance).
    pub fn on_bounds_changed(&mut self, config: &GraphConfig) {
        if config.fit_view.mode == FitViewMode::Always {
            self.request_fit();
        }
    }

    /// The container was resized.
    pub fn on_container_resized(&mut self, config: &GraphConfig) {
        if matches!(
            config.fit_view.mode,
            FitViewMode::OnResize | FitViewMode::Always
        ) {
            self.request_fit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gw_core::PartialConfig;
    use pretty_assertions::assert_eq;

    fn no_padding_config() -> GraphConfig {
        PartialConfig {
            fit_view_padding: Some("0px".to_string()),
            ..PartialConfig::default()
        }
        .resolve()
    }

    #[test]
    fn pan_is_zoom_independent() {
        let mut ctrl = ViewportController::new();
        let config = GraphConfig::default();
        ctrl.set_zoom(2.0, &config);
        ctrl.pan_by_screen(Vec2::new(10.0, 0.0));
        assert_eq!(ctrl.viewport().center.x, -5.0);
    }

    #[test]
    fn transforms_roundtrip() {
        let mut ctrl = ViewportController::new();
        let config = GraphConfig::default();
        ctrl.set_viewport(
            Viewport {
                center: Point::new(40.0, -20.0),
                zoom: 1.5,
            },
            &config,
        );
        let container = Size::new(800.0, 600.0);

        let content = Point::new(12.0, 34.0);
        let screen = ctrl.content_to_screen(content, container);
        let back = ctrl.screen_to_content(screen, container);
        assert!((back - content).hypot() < 1e-9);
    }

    #[test]
    fn fit_is_tight_on_the_binding_axis() {
        let mut ctrl = ViewportController::new();
        let config = no_padding_config();
        let container = Size::new(800.0, 600.0);
        let content = Rect::new(0.0, 0.0, 400.0, 100.0);

        ctrl.fit_view(container, content, &config);
        let vp = ctrl.viewport();

        assert!(vp.zoom * content.width() <= container.width + 1e-9);
        assert!(vp.zoom * content.height() <= container.height + 1e-9);
        // Width binds here: 800/400 = 2 < 600/100.
        assert_eq!(vp.zoom, 2.0);
        assert_eq!(vp.center, Point::new(200.0, 50.0));
    }

    #[test]
    fn padding_shrinks_the_fit() {
        let mut ctrl = ViewportController::new();
        let config = PartialConfig {
            fit_view_padding: Some("10%".to_string()),
            ..PartialConfig::default()
        }
        .resolve();
        let container = Size::new(800.0, 600.0);
        let content = Rect::new(0.0, 0.0, 400.0, 100.0);

        ctrl.fit_view(container, content, &config);
        let padded_zoom = ctrl.viewport().zoom;

        ctrl.fit_view(container, content, &no_padding_config());
        assert!(padded_zoom < ctrl.viewport().zoom);
    }

    #[test]
    fn fit_generation_counter_tracks_application() {
        let mut ctrl = ViewportController::new();
        let config = no_padding_config();
        assert!(!ctrl.fit_pending());

        ctrl.request_fit();
        ctrl.request_fit();
        assert!(ctrl.fit_pending());

        ctrl.apply_pending_fit(
            Size::new(800.0, 600.0),
            Rect::new(0.0, 0.0, 100.0, 100.0),
            &config,
        );
        assert!(!ctrl.fit_pending());
    }

    #[test]
    fn abide_clamps_fitted_zoom() {
        let mut ctrl = ViewportController::new();
        let config = PartialConfig {
            fit_view_padding: Some("0px".to_string()),
            fit_view_abide_min_max_zoom: Some(true),
            max_zoom: Some(1.5),
            ..PartialConfig::default()
        }
        .resolve();

        ctrl.fit_view(
            Size::new(800.0, 600.0),
            Rect::new(0.0, 0.0, 100.0, 100.0),
            &config,
        );
        assert_eq!(ctrl.viewport().zoom, 1.5);
    }
}
