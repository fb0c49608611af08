//! In-process accumulators for cross-card derived state.
//!
//! Both aggregators are owned by the orchestrator and shared with the
//! processors that track into them. Interior state sits behind a `Mutex`,
//! so cards may be processed concurrently.

pub mod artist;
pub mod trigram;

pub use artist::{ArtistAggregate, ArtistAggregator};
pub use trigram::TrigramAggregator;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock, recovering the data if a previous holder panicked. Aggregator
/// updates are single-step inserts, so a poisoned guard never holds a
/// half-applied mutation.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
