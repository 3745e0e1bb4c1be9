//! Cancellable semantic events.
//!
//! Every semantic transition of the pointer machine (grab, pan, node
//! move, draw-start, connect, click, long-click) is synthesized as an
//! `EditorEvent` and offered to the registered observers *before* its
//! default effect runs. An observer that calls `EventCtx::prevent` skips
//! the default for that one event — panning, dragging, selecting, and
//! edge-completion are all individually interceptable.

use gw_core::Id;
use kurbo::Vec2;

/// What the pointer can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabTarget {
    Viewport,
    Node(Id),
    Edge(Id),
    Handle { node: Id, handle: Id },
    Resizer(Id),
}

impl GrabTarget {
    /// The node id a committed edge would attach to, if any.
    pub fn connect_node(&self) -> Option<Id> {
        match self {
            GrabTarget::Node(id) => Some(*id),
            GrabTarget::Handle { node, .. } => Some(*node),
            _ => None,
        }
    }
}

/// A semantic transition about to apply its default effect.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Pointer-down claimed a target.
    Grab { target: GrabTarget },
    /// The viewport is about to pan by `delta` (content units).
    Pan { delta: Vec2 },
    /// The listed nodes are about to move by `delta` (content units).
    MoveNodes { nodes: Vec<Id>, delta: Vec2 },
    /// A drag from a handle is about to start an in-progress edge.
    DrawStart { source: Id, handle: Id },
    /// An in-progress edge is about to be committed.
    Connect {
        source: Id,
        source_handle: Id,
        target: Id,
        target_handle: Option<Id>,
    },
    /// A resize grip is about to change a node's size by `delta`.
    Resize { node: Id, delta: Vec2 },
    /// A press-release without movement; `count` is the multi-click count.
    Click { target: GrabTarget, count: u32 },
    /// The long-click timer fired before any movement.
    LongClick { target: GrabTarget },
}

/// Per-dispatch context handed to observers.
#[derive(Debug, Default)]
pub struct EventCtx {
    prevented: bool,
}

impl EventCtx {
    /// Skip the default effect of the current event.
    pub fn prevent(&mut self) {
        self.prevented = true;
    }

    pub fn prevented(&self) -> bool {
        self.prevented
    }
}

type Observer = Box<dyn FnMut(&EditorEvent, &mut EventCtx)>;

/// Registered event observers, invoked in registration order.
#[derive(Default)]
pub struct EventObservers {
    observers: Vec<Observer>,
}

impl EventObservers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, observer: impl FnMut(&EditorEvent, &mut EventCtx) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Offer `event` to every observer; returns true when the default
    /// effect should proceed.
    pub fn dispatch(&mut self, event: &EditorEvent) -> bool {
        let mut ctx = EventCtx::default();
        for observer in &mut self.observers {
            observer(event, &mut ctx);
        }
        !ctx.prevented()
    }
}

impl std::fmt::Debug for EventObservers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventObservers")
            .field("count", &self.observers.len())
            .finish()
    }
}
