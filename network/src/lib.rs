//! Push-pull gossip reconciliation.
//!
//! Peers announce the hashes of items they hold; this crate decides whether
//! and from whom to pull each item, coalescing redundant announcements into
//! a bounded number of outbound pull requests. Storage of the items
//! themselves is delegated to one [`EntryHolder`] per gossip category.
//!
//! - [`holder`] — the `EntryHolder` / `PendingTracker` capability traits.
//! - [`push_tracker`] — default pending tracker that retries stalled pulls
//!   against peers that announced the item later.
//! - [`reconciler`] — the `GossipReconciler` itself.

pub mod error;
pub mod holder;
pub mod push_tracker;
pub mod reconciler;

pub use error::NetworkError;
pub use holder::{EntryHolder, PendingTracker, RetryRequest, StoredEntry};
pub use push_tracker::{PushTracker, PushTrackerConfig};
pub use reconciler::{
    AnnounceOutcome, GossipReconciler, GossipReconcilerBuilder, PullRequest, ReconcilerConfig,
};
