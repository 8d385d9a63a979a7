//! Pure decision logic: graph construction, routing, and loop safety.

pub mod graph;
pub mod loop_guard;
pub mod router;
