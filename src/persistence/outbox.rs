//! Outbox of pending remote mutations and the submission step.
//!
//! Local state changes first; a [`Mutation`] naming the affected annotation
//! is queued and later sent by [`submit`]. Geometry and version are read from
//! the store at send time, so an update always carries the newest local shape
//! and the last version the server acknowledged.

use std::collections::VecDeque;

use crate::model::{AnnotationId, RemoteId};
use crate::state::AnnotationStore;

use super::{AnnotationApi, ApiError, ConflictInfo, UpdateRequest, UpdateResponse};

/// A queued remote operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Create { local: AnnotationId },
    Update { local: AnnotationId },
    Delete { local: AnnotationId, remote: RemoteId },
}

impl Mutation {
    pub fn local(&self) -> AnnotationId {
        match self {
            Mutation::Create { local }
            | Mutation::Update { local }
            | Mutation::Delete { local, .. } => *local,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Create { .. } => "create",
            Mutation::Update { .. } => "update",
            Mutation::Delete { .. } => "delete",
        }
    }
}

/// What the server said about one submission.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Accepted. `remote_id` is set for creates.
    Saved {
        version: u64,
        remote_id: Option<RemoteId>,
    },
    Conflict(ConflictInfo),
    Failed(ApiError),
}

/// FIFO of pending mutations with update coalescing.
#[derive(Debug, Default)]
pub struct SyncQueue {
    pending: VecDeque<Mutation>,
}

impl SyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a mutation.
    ///
    /// An update directly following a queued update of the same annotation is
    /// dropped: the shape is read at send time, so one request carries both.
    pub fn push(&mut self, mutation: Mutation) {
        if let Mutation::Update { local } = &mutation
            && self.pending.back() == Some(&mutation)
        {
            log::trace!("Outbox: coalesced update for annotation {}", local);
            return;
        }
        log::trace!("Outbox: queued {} for annotation {}", mutation.name(), mutation.local());
        self.pending.push_back(mutation);
    }

    pub fn pop(&mut self) -> Option<Mutation> {
        self.pending.pop_front()
    }

    /// Drop every queued mutation for `local`. Returns how many were dropped.
    pub fn discard(&mut self, local: AnnotationId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|m| m.local() != local);
        before - self.pending.len()
    }

    /// Whether a create for `local` is still waiting.
    pub fn has_pending_create(&self, local: AnnotationId) -> bool {
        self.pending
            .iter()
            .any(|m| matches!(m, Mutation::Create { local: l } if *l == local))
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop everything. Returns how many mutations were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.pending.len();
        self.pending.clear();
        dropped
    }
}

/// Send one mutation. Returns `None` when there is nothing to send, for
/// example when the annotation was deleted locally in the meantime.
pub async fn submit<A: AnnotationApi>(
    api: &A,
    store: &AnnotationStore,
    mutation: &Mutation,
) -> Option<SubmitOutcome> {
    match mutation {
        Mutation::Create { local } => {
            let annotation = store.get(*local)?;
            Some(match api.create(annotation).await {
                Ok(response) => SubmitOutcome::Saved {
                    version: response.version,
                    remote_id: Some(response.id),
                },
                Err(e) => SubmitOutcome::Failed(e),
            })
        }
        Mutation::Update { local } => {
            let annotation = store.get(*local)?;
            let Some(remote) = annotation.remote_id.as_deref() else {
                // Never created remotely; send the whole annotation instead
                log::debug!("Outbox: annotation {} has no remote id, creating", local);
                return Some(match api.create(annotation).await {
                    Ok(response) => SubmitOutcome::Saved {
                        version: response.version,
                        remote_id: Some(response.id),
                    },
                    Err(e) => SubmitOutcome::Failed(e),
                });
            };
            let request = UpdateRequest {
                geometry: annotation.geometry.clone(),
                version: annotation.version,
            };
            Some(match api.update(remote, &request).await {
                Ok(UpdateResponse::Updated { version }) => SubmitOutcome::Saved {
                    version,
                    remote_id: None,
                },
                Ok(UpdateResponse::Conflict(info)) => SubmitOutcome::Conflict(info),
                Err(e) => SubmitOutcome::Failed(e),
            })
        }
        Mutation::Delete { remote, .. } => Some(match api.delete(remote).await {
            Ok(()) => SubmitOutcome::Saved {
                version: 0,
                remote_id: None,
            },
            Err(ApiError::NotFound(_)) => {
                log::debug!("Outbox: {} already gone remotely", remote);
                SubmitOutcome::Saved {
                    version: 0,
                    remote_id: None,
                }
            }
            Err(e) => SubmitOutcome::Failed(e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consecutive_updates_coalesce() {
        let mut queue = SyncQueue::new();
        queue.push(Mutation::Create { local: 1 });
        queue.push(Mutation::Update { local: 1 });
        queue.push(Mutation::Update { local: 1 });
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pop(), Some(Mutation::Create { local: 1 }));
        assert_eq!(queue.pop(), Some(Mutation::Update { local: 1 }));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_updates_of_different_annotations_stay_apart() {
        let mut queue = SyncQueue::new();
        queue.push(Mutation::Update { local: 1 });
        queue.push(Mutation::Update { local: 2 });
        queue.push(Mutation::Update { local: 1 });
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_discard_pending_create() {
        let mut queue = SyncQueue::new();
        queue.push(Mutation::Create { local: 7 });
        queue.push(Mutation::Update { local: 7 });
        assert!(queue.has_pending_create(7));
        assert_eq!(queue.discard(7), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_clear_reports_dropped() {
        let mut queue = SyncQueue::new();
        queue.push(Mutation::Create { local: 1 });
        queue.push(Mutation::Delete {
            local: 2,
            remote: "r2".into(),
        });
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
    }
}
