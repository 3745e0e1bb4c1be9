pub mod events;
pub mod hit;
pub mod pointer;
pub mod viewport;

pub use events::{EditorEvent, EventCtx, EventObservers, GrabTarget};
pub use hit::hit_test;
pub use pointer::{EditorCtx, LongClickRequest, PendingEdge, PointerMachine, TimerToken};
pub use viewport::{Viewport, ViewportController};
