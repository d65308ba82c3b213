//! Graph module - the clue dependency DAG and the pure algorithms over it.
//!
//! - **GraphModel**: lookup structures built from a server snapshot
//! - **CycleDetector**: decides whether a candidate edge would close a loop
//! - **Visibility**: which clues a set of collapsed sub-trees hides

mod cycle;
mod model;
mod visibility;

pub use cycle::*;
pub use model::*;
pub use visibility::*;
