//! The single live routing table.
//!
//! # Data Flow
//! ```text
//! ConfigSource::sync()
//!     → LiveTable::reload() builds a RoutingTable (no lock held)
//!     → publish() stamps a generation and stores it atomically
//!
//! Request task:
//!     → LiveTable::snapshot() (Arc clone, never blocks)
//!     → lookup + respond on the snapshot
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::observability::metrics;
use crate::routing::endpoint::DesiredEndpoint;
use crate::routing::router::RoutingTable;

/// Result of one reload, for logs and callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadSummary {
    pub generation: u64,
    pub loaded: usize,
    pub skipped: usize,
}

/// Shared handle to the currently served table.
#[derive(Clone)]
pub struct LiveTable {
    current: Arc<ArcSwap<RoutingTable>>,
    generation: Arc<AtomicU64>,
}

impl LiveTable {
    /// Start with an empty table at generation 0.
    pub fn new() -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(RoutingTable::default())),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// The table in effect right now. Later swaps do not affect it.
    pub fn snapshot(&self) -> Arc<RoutingTable> {
        self.current.load_full()
    }

    /// Build a new table from `entries` and make it live.
    pub fn reload(&self, entries: &[DesiredEndpoint]) -> ReloadSummary {
        self.publish(RoutingTable::build(entries))
    }

    /// Swap in an already built table.
    pub fn publish(&self, table: RoutingTable) -> ReloadSummary {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let table = table.with_generation(generation);
        let summary = ReloadSummary {
            generation,
            loaded: table.len(),
            skipped: table.skipped(),
        };

        self.current.store(Arc::new(table));
        metrics::set_endpoints_loaded(summary.loaded);

        tracing::info!(
            generation = summary.generation,
            loaded = summary.loaded,
            skipped = summary.skipped,
            "Routing table swapped"
        );
        summary
    }

    /// Number of tables published so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

impl Default for LiveTable {
    fn default() -> Self {
        Self::new()
    }
}
