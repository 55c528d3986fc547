//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `VisitState`: the lifecycle of a single URL within one run
//! - `VisitRegistry`: the mutex-guarded claim table shared by all visits

mod registry;
mod visit_state;

// Re-export main types
pub use registry::{Claim, SharedVisit, VisitRegistry};
pub use visit_state::VisitState;
