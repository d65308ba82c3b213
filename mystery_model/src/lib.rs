//! # Mystery Model
//!
//! The shared vocabulary of the murder-mystery authoring console. This crate
//! describes what the server hands out and accepts: clue records, clue-tree
//! snapshots with their integrity diagnostics, narrative-quality reports and
//! the REST bodies used to write prerequisite lists back.
//!
//! It contains no graph logic. The `clue_graph` crate builds the dependency
//! graph editor on top of these types.

pub mod analysis;
pub mod api;
pub mod clue;
pub mod ids;
pub mod tree;

pub use analysis::*;
pub use api::*;
pub use clue::*;
pub use ids::*;
pub use tree::*;
