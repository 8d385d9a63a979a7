//! Execution runtime: orchestrator, node handlers, event normalization,
//! shared caches, and cancellation helpers.

pub mod catalog;
pub mod control;
pub mod nodes;
pub mod normalizer;
pub mod orchestrator;
