//! Remote sync: optimistic annotation versioning and per-image locks.
//!
//! Local state is mutated first. Each change queues a [`Mutation`] in the
//! [`SyncQueue`], and [`submit`] turns it into one [`SubmitOutcome`] that the
//! engine handles in a single place. Stale versions come back as
//! [`ConflictInfo`] and are only resolved by an explicit [`ConflictResolution`].

mod api;
mod error;
mod lock;
mod memory;
mod outbox;

pub use api::{
    AnnotationApi, ConflictInfo, CreateResponse, LockAcquire, LockApi, LockInfo, LockStatus,
    UpdateRequest, UpdateResponse,
};
pub use error::ApiError;
pub use lock::{LockEvent, LockManager, LockState};
pub use memory::InMemoryBackend;
pub use outbox::{Mutation, SubmitOutcome, SyncQueue, submit};

use serde::{Deserialize, Serialize};

/// The two ways a user may settle a version conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictResolution {
    /// Discard local changes and refetch the image's annotations.
    Reload,
    /// Resubmit the local geometry on top of the server's current version.
    Overwrite,
}
