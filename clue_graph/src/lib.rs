//! # Clue Graph
//!
//! The dependency-graph editor for murder-mystery clues. Clues unlock each
//! other through prerequisite edges, and the editor keeps that relation a
//! DAG while the author rewires it.
//!
//! ## Core Components
//!
//! - **graph**: Snapshot lookups, cycle detection and collapse visibility
//! - **pending**: The staged edit transaction and its commit batch
//! - **layout**: Layered auto-layout with saved-position pins and a grid fallback
//! - **positions**: Per-script cache of dragged positions
//! - **editor**: The editing session tying it together behind a command API
//! - **source**: Traits for the server collaborators, plus an in-memory stand-in
//!
//! ## Flow
//!
//! ```text
//! TreeDataSource -> GraphModel -> visibility -> LayoutEngine -> GraphView
//! EditorCommand  -> CycleDetector -> PendingChangeStore -> DependencyWriter (batch)
//! ```

pub mod config;
pub mod editor;
pub mod error;
pub mod graph;
pub mod layout;
pub mod pending;
pub mod positions;
pub mod source;

pub use config::*;
pub use editor::*;
pub use error::{ConfigError, EditorError, GraphError, LayoutError, NoticeLevel};
pub use graph::*;
pub use layout::*;
pub use pending::*;
pub use positions::*;
pub use source::*;
