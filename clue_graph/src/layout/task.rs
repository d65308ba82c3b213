//! Background layout runs and last-triggered-wins bookkeeping.

use std::sync::Arc;
use std::time::Duration;

use super::{LayoutEngine, LayoutInput, LayoutOutcome};
use crate::error::LayoutError;

/// Identifies the visibility state a layout run was started for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutTicket {
    generation: u64,
}

impl LayoutTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Tracks which layout result is still wanted.
///
/// Every change to the visible graph, saved positions or field configuration
/// invalidates the current generation. Results carrying an older ticket are
/// dropped on arrival.
#[derive(Debug, Clone, Default)]
pub struct LayoutScheduler {
    generation: u64,
    applied: Option<u64>,
}

impl LayoutScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersede any layout in flight.
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    /// Ticket for a layout of the current state.
    pub fn issue(&self) -> LayoutTicket {
        LayoutTicket {
            generation: self.generation,
        }
    }

    /// Check if a ticket still matches the current state.
    pub fn is_current(&self, ticket: LayoutTicket) -> bool {
        ticket.generation == self.generation
    }

    /// Record that a result for `ticket` was applied. Stale tickets are refused.
    pub fn accept(&mut self, ticket: LayoutTicket) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                ticket = ticket.generation,
                current = self.generation,
                "Dropping superseded layout"
            );
            return false;
        }
        self.applied = Some(ticket.generation);
        true
    }

    /// Check if the current state still lacks a layout.
    pub fn needs_layout(&self) -> bool {
        self.applied != Some(self.generation)
    }
}

/// Run a layout on the blocking pool, bounded by the configured timeout.
///
/// A panic, a timeout or any algorithm error yields the grid fallback.
pub async fn layout_in_background(engine: Arc<LayoutEngine>, input: LayoutInput) -> LayoutOutcome {
    let timeout = Duration::from_millis(engine.config().timeout_ms);

    let worker_engine = Arc::clone(&engine);
    let worker_input = input.clone();
    let handle = tokio::task::spawn_blocking(move || worker_engine.layout(&worker_input));

    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(join_err)) => engine.fallback(&input, &LayoutError::Worker(join_err.to_string())),
        Err(_) => engine.fallback(&input, &LayoutError::Timeout(timeout)),
    }
}
