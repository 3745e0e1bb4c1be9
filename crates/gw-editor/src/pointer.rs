//! Pointer interaction state machine.
//!
//! Exactly one object can be grabbed at a time: a node, an edge, a
//! handle (which starts an in-progress edge), the viewport, or a resize
//! grip. The machine consumes pointer-down/move/up plus the host's
//! long-click timer callback, and applies default effects only after the
//! matching `EditorEvent` survives observer dispatch.
//!
//! The machine never sleeps. Arming a long-click returns a
//! generation-stamped `TimerToken` the host schedules however it likes;
//! a token from a grab that has since moved or released is stale and its
//! callback is a no-op.

use crate::events::{EditorEvent, EventObservers, GrabTarget};
use crate::viewport::ViewportController;
use gw_core::Id;
use gw_core::config::GraphConfig;
use gw_core::connect::{self, ConnectionRules, Verdict};
use gw_core::model::{Edge, GraphStore, HandleBinding};
use kurbo::{Point, Size, Vec2};

// ─── Context ─────────────────────────────────────────────────────────────

/// Everything a pointer handler may touch, threaded explicitly.
pub struct EditorCtx<'a> {
    pub store: &'a mut GraphStore,
    pub viewport: &'a mut ViewportController,
    pub config: &'a GraphConfig,
    pub rules: &'a ConnectionRules,
    pub observers: &'a mut EventObservers,
    pub container: Size,
}

// ─── Timer tokens ────────────────────────────────────────────────────────

/// Handle for one armed long-click timer. Stale tokens no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken {
    generation: u64,
}

/// What the host should schedule after a pointer-down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LongClickRequest {
    pub token: TimerToken,
    pub delay_ms: f64,
}

// ─── Grabbed record ──────────────────────────────────────────────────────

/// Bookkeeping for the one active gesture.
#[derive(Debug, Clone)]
struct Grabbed {
    target: GrabTarget,
    start: Point,
    last: Point,
    moved: bool,
    click_count: u32,
    timer: Option<TimerToken>,
}

/// A not-yet-committed drag-to-connect gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingEdge {
    pub source: Id,
    pub source_handle: Id,
    /// Tentative endpoint under the pointer, in content coordinates.
    pub pointer: Point,
}

#[derive(Debug, Clone, Copy)]
struct LastClick {
    target: GrabTarget,
    time_ms: f64,
    count: u32,
}

// ─── State machine ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct PointerMachine {
    grabbed: Option<Grabbed>,
    pending_edge: Option<PendingEdge>,
    last_click: Option<LastClick>,
    timer_generation: u64,
}

impl PointerMachine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The target of the active gesture, if any.
    pub fn grabbed_target(&self) -> Option<GrabTarget> {
        self.grabbed.as_ref().map(|g| g.target)
    }

    /// The in-progress edge, if a handle drag is underway.
    pub fn pending_edge(&self) -> Option<&PendingEdge> {
        self.pending_edge.as_ref()
    }

    // ─── Pointer down ────────────────────────────────────────────────────

    /// Claim `target` for a new gesture. Returns the long-click request
    /// the host should schedule (when long-clicks are enabled and the
    /// grab succeeded).
    pub fn pointer_down(
        &mut self,
        ctx: &mut EditorCtx<'_>,
        target: GrabTarget,
        position: Point,
        time_ms: f64,
    ) -> Option<LongClickRequest> {
        if self.grabbed.is_some() {
            // A second pointer-down without an up: drop the stale gesture.
            self.release(ctx);
        }

        if !grabbing_allowed(ctx, target) {
            return None;
        }
        if !ctx.observers.dispatch(&EditorEvent::Grab { target }) {
            return None;
        }

        let click_count = match self.last_click {
            Some(prev)
                if prev.target == target
                    && time_ms - prev.time_ms <= ctx.config.multi_click_delay =>
            {
                prev.count + 1
            }
            _ => 1,
        };
        self.last_click = Some(LastClick {
            target,
            time_ms,
            count: click_count,
        });

        if let GrabTarget::Node(id) = target
            && let Some(node) = ctx.store.node_mut(id)
        {
            node.grabbed = true;
        }

        let timer = (ctx.config.long_click_delay >= 0.0).then(|| {
            self.timer_generation += 1;
            TimerToken {
                generation: self.timer_generation,
            }
        });

        self.grabbed = Some(Grabbed {
            target,
            start: position,
            last: position,
            moved: false,
            click_count,
            timer,
        });

        timer.map(|token| LongClickRequest {
            token,
            delay_ms: ctx.config.long_click_delay,
        })
    }

    // ─── Pointer move ────────────────────────────────────────────────────

    pub fn pointer_move(&mut self, ctx: &mut EditorCtx<'_>, position: Point) {
        let Some(grabbed) = self.grabbed.as_mut() else {
            return;
        };

        if !grabbed.moved {
            let travel = (position - grabbed.start).hypot();
            if travel < ctx.config.minimum_pointer_movement {
                return;
            }
            grabbed.moved = true;
            grabbed.timer = None;
        }

        let screen_delta = position - grabbed.last;
        grabbed.last = position;
        let target = grabbed.target;

        match target {
            GrabTarget::Viewport => {
                if !ctx.config.allow_panning {
                    return;
                }
                let delta = ctx.viewport.screen_delta_to_content(screen_delta);
                if ctx.observers.dispatch(&EditorEvent::Pan { delta }) {
                    ctx.viewport.pan_by_screen(screen_delta);
                }
            }
            GrabTarget::Node(id) => {
                self.move_nodes(ctx, id, screen_delta);
            }
            GrabTarget::Handle { node, handle } => {
                self.track_pending_edge(ctx, node, handle, position);
            }
            GrabTarget::Resizer(id) => {
                let delta = ctx.viewport.screen_delta_to_content(screen_delta);
                if ctx
                    .observers
                    .dispatch(&EditorEvent::Resize { node: id, delta })
                    && let Some(node) = ctx.store.node_mut(id)
                {
                    node.width = (node.width + delta.x).max(0.0);
                    node.height = (node.height + delta.y).max(0.0);
                }
            }
            // Edges don't drag; the grab only exists for click selection.
            GrabTarget::Edge(_) => {}
        }
    }

    /// Group drag: an already-selected node carries the whole selection;
    /// an unselected node drags alone and collapses the selection to
    /// itself. Any node move deselects all edges.
    fn move_nodes(&mut self, ctx: &mut EditorCtx<'_>, id: Id, screen_delta: Vec2) {
        let Some(node) = ctx.store.node(id) else {
            return;
        };
        if !ctx.config.moving_allowed(&node.policy) {
            return;
        }

        let was_selected = node.selected;
        let nodes: Vec<Id> = if was_selected {
            ctx.store.selected_nodes().map(|n| n.id).collect()
        } else {
            vec![id]
        };

        let delta = ctx.viewport.screen_delta_to_content(screen_delta);
        if !ctx.observers.dispatch(&EditorEvent::MoveNodes {
            nodes: nodes.clone(),
            delta,
        }) {
            return;
        }

        if !was_selected {
            // A drag never implicitly multi-selects.
            for other in ctx.store.nodes_mut() {
                other.selected = false;
            }
        }
        ctx.store.deselect_edges();

        for node_id in nodes {
            if let Some(node) = ctx.store.node_mut(node_id) {
                node.position += delta;
            }
        }
    }

    fn track_pending_edge(
        &mut self,
        ctx: &mut EditorCtx<'_>,
        node: Id,
        handle: Id,
        position: Point,
    ) {
        if self.pending_edge.is_none() {
            if !ctx.observers.dispatch(&EditorEvent::DrawStart {
                source: node,
                handle,
            }) {
                return;
            }
            self.pending_edge = Some(PendingEdge {
                source: node,
                source_handle: handle,
                pointer: Point::ZERO,
            });
        }
        if let Some(pending) = self.pending_edge.as_mut() {
            pending.pointer = ctx.viewport.screen_to_content(position, ctx.container);
        }
    }

    // ─── Pointer up ──────────────────────────────────────────────────────

    /// Finish the gesture: commit an in-progress edge over a valid
    /// target, or register a click when nothing moved.
    pub fn pointer_up(
        &mut self,
        ctx: &mut EditorCtx<'_>,
        over: Option<GrabTarget>,
        time_ms: f64,
    ) {
        let Some(grabbed) = self.grabbed.take() else {
            return;
        };

        if let Some(pending) = self.pending_edge.take() {
            self.commit_edge(ctx, pending, over);
        } else if !grabbed.moved && over == Some(grabbed.target) {
            self.click(ctx, grabbed.target, grabbed.click_count);
            if let Some(last) = self.last_click.as_mut() {
                last.time_ms = time_ms;
            }
        }

        self.clear_grab_flags(ctx, grabbed.target);
        self.timer_generation += 1; // stale-proof any armed timer
    }

    fn commit_edge(&mut self, ctx: &mut EditorCtx<'_>, pending: PendingEdge, over: Option<GrabTarget>) {
        let Some(over) = over else {
            return;
        };
        let Some(target_node) = over.connect_node() else {
            return;
        };
        if !new_edge_target_allowed(ctx, over, target_node) {
            return;
        }

        let target_handle = match over {
            GrabTarget::Handle { handle, .. } => Some(handle),
            _ => None,
        };
        if !ctx.observers.dispatch(&EditorEvent::Connect {
            source: pending.source,
            source_handle: pending.source_handle,
            target: target_node,
            target_handle,
        }) {
            return;
        }

        let mut edge = Edge::new(Id::with_prefix("edge"), pending.source, target_node);
        edge.source_handle = HandleBinding::Named(pending.source_handle);
        edge.target_handle = match target_handle {
            Some(name) => HandleBinding::Named(name),
            None => HandleBinding::Auto,
        };

        let Some(id) = ctx.store.add_edge(edge) else {
            return;
        };
        if connect::verify_edge(ctx.store, ctx.rules, ctx.config, id) == Some(Verdict::Illegal)
            && !ctx.config.allow_illegal_edges
        {
            log::warn!("drawn edge {id:?} violates connection rules, dropped");
            ctx.store.remove_edge(id);
        }
    }

    fn click(&mut self, ctx: &mut EditorCtx<'_>, target: GrabTarget, count: u32) {
        if !selection_allowed(ctx, target) {
            return;
        }
        if !ctx.observers.dispatch(&EditorEvent::Click { target, count }) {
            return;
        }

        match target {
            GrabTarget::Node(id) => {
                if ctx.config.multiple_selection {
                    if let Some(node) = ctx.store.node_mut(id) {
                        node.selected = !node.selected;
                    }
                } else {
                    ctx.store.select_only_node(id);
                }
            }
            GrabTarget::Edge(id) => {
                if ctx.config.multiple_selection {
                    if let Some(edge) = ctx.store.edge_mut(id) {
                        edge.selected = !edge.selected;
                    }
                } else {
                    ctx.store.select_only_edge(id);
                }
            }
            // Background click clears the selection.
            GrabTarget::Viewport => ctx.store.deselect_all(),
            GrabTarget::Handle { .. } | GrabTarget::Resizer(_) => {}
        }
    }

    // ─── Long click ──────────────────────────────────────────────────────

    /// Host timer callback. Fires the long-click notification only when
    /// the token is still the armed one and nothing moved meanwhile.
    pub fn long_click_fired(&mut self, ctx: &mut EditorCtx<'_>, token: TimerToken) {
        let Some(grabbed) = self.grabbed.as_mut() else {
            return;
        };
        if grabbed.timer != Some(token) || token.generation != self.timer_generation {
            return;
        }
        grabbed.timer = None;
        let target = grabbed.target;
        // Notification only — the grab state is untouched.
        ctx.observers.dispatch(&EditorEvent::LongClick { target });
    }

    // ─── Cancellation ────────────────────────────────────────────────────

    /// Abort the gesture without a click or commit (pointer-cancel).
    pub fn release(&mut self, ctx: &mut EditorCtx<'_>) {
        if let Some(grabbed) = self.grabbed.take() {
            self.clear_grab_flags(ctx, grabbed.target);
        }
        self.pending_edge = None;
        self.timer_generation += 1;
    }

    fn clear_grab_flags(&self, ctx: &mut EditorCtx<'_>, target: GrabTarget) {
        if let GrabTarget::Node(id) = target
            && let Some(node) = ctx.store.node_mut(id)
        {
            node.grabbed = false;
        }
    }
}

// ─── Policy checks ───────────────────────────────────────────────────────

fn grabbing_allowed(ctx: &EditorCtx<'_>, target: GrabTarget) -> bool {
    match target {
        GrabTarget::Viewport => ctx.config.allow_grabbing,
        GrabTarget::Node(id) | GrabTarget::Resizer(id) => ctx
            .store
            .node(id)
            .is_some_and(|n| ctx.config.grabbing_allowed(&n.policy)),
        GrabTarget::Edge(id) => ctx
            .store
            .edge(id)
            .is_some_and(|e| ctx.config.grabbing_allowed(&e.policy)),
        GrabTarget::Handle { node, handle } => ctx
            .store
            .node(node)
            .and_then(|n| n.handle(handle))
            .is_some_and(|h| ctx.config.grabbing_allowed(&h.policy)),
    }
}

fn selection_allowed(ctx: &EditorCtx<'_>, target: GrabTarget) -> bool {
    match target {
        GrabTarget::Viewport => ctx.config.allow_selection,
        GrabTarget::Node(id) => ctx
            .store
            .node(id)
            .is_some_and(|n| ctx.config.selection_allowed(&n.policy)),
        GrabTarget::Edge(id) => ctx
            .store
            .edge(id)
            .is_some_and(|e| ctx.config.selection_allowed(&e.policy)),
        _ => false,
    }
}

fn new_edge_target_allowed(ctx: &EditorCtx<'_>, over: GrabTarget, node: Id) -> bool {
    let node_ok = ctx
        .store
        .node(node)
        .is_some_and(|n| ctx.config.new_edge_target_allowed(&n.policy));
    match over {
        GrabTarget::Handle { node: owner, handle } => {
            node_ok
                && ctx
                    .store
                    .node(owner)
                    .and_then(|n| n.handle(handle))
                    .is_some_and(|h| ctx.config.new_edge_target_allowed(&h.policy))
        }
        _ => node_ok,
    }
}
