//! Exclusive image lock tracking and heartbeat scheduling.
//!
//! The heartbeat is driven by the host calling [`LockManager::tick`] with the
//! current time; nothing here spawns timers.

use std::time::Duration;

use web_time::Instant;

use crate::model::{ImageId, ProjectId};

use super::{ApiError, LockApi, LockStatus};

/// Local view of the active image's lock.
#[derive(Debug, Clone, PartialEq)]
pub enum LockState {
    NotHeld,
    Held {
        project_id: ProjectId,
        image_id: ImageId,
        last_heartbeat: Instant,
    },
    /// Another session holds the lock; editing is blocked.
    HeldByOther { holder: String },
}

/// Notable results of a heartbeat tick.
#[derive(Debug)]
pub enum LockEvent {
    Refreshed,
    /// The heartbeat failed and the lock is no longer considered held.
    Lost(ApiError),
}

/// Tracks the lock on the current image and schedules heartbeats.
#[derive(Debug)]
pub struct LockManager {
    state: LockState,
    interval: Duration,
}

impl LockManager {
    pub fn new(interval: Duration) -> Self {
        Self {
            state: LockState::NotHeld,
            interval,
        }
    }

    pub fn state(&self) -> &LockState {
        &self.state
    }

    pub fn is_held(&self) -> bool {
        matches!(self.state, LockState::Held { .. })
    }

    /// Name of the other session holding the lock, if any.
    pub fn holder(&self) -> Option<&str> {
        match &self.state {
            LockState::HeldByOther { holder } => Some(holder),
            _ => None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Try to take the lock on an image.
    ///
    /// On a transport error the state becomes `NotHeld` and the error is returned.
    pub async fn acquire<L: LockApi>(
        &mut self,
        api: &L,
        project_id: &str,
        image_id: &str,
        now: Instant,
    ) -> Result<&LockState, ApiError> {
        let response = match api.acquire(project_id, image_id).await {
            Ok(response) => response,
            Err(e) => {
                self.state = LockState::NotHeld;
                return Err(e);
            }
        };

        self.state = match response.status {
            LockStatus::Acquired => {
                log::info!("Lock acquired on {}/{}", project_id, image_id);
                LockState::Held {
                    project_id: project_id.to_string(),
                    image_id: image_id.to_string(),
                    last_heartbeat: now,
                }
            }
            LockStatus::AlreadyLocked => {
                let holder = response
                    .locked_by
                    .or(response.lock.map(|l| l.locked_by))
                    .unwrap_or_else(|| "another user".to_string());
                log::info!("{}/{} is locked by {}", project_id, image_id, holder);
                LockState::HeldByOther { holder }
            }
        };
        Ok(&self.state)
    }

    /// Whether a heartbeat should be sent at `now`.
    pub fn heartbeat_due(&self, now: Instant) -> bool {
        match &self.state {
            LockState::Held { last_heartbeat, .. } => {
                now.saturating_duration_since(*last_heartbeat) >= self.interval
            }
            _ => false,
        }
    }

    /// Send a heartbeat if one is due.
    pub async fn tick<L: LockApi>(&mut self, api: &L, now: Instant) -> Option<LockEvent> {
        if !self.heartbeat_due(now) {
            return None;
        }
        let LockState::Held {
            project_id,
            image_id,
            ..
        } = &self.state
        else {
            return None;
        };
        let (project_id, image_id) = (project_id.clone(), image_id.clone());

        match api.heartbeat(&project_id, &image_id).await {
            Ok(()) => {
                log::trace!("Lock heartbeat sent for {}/{}", project_id, image_id);
                if let LockState::Held { last_heartbeat, .. } = &mut self.state {
                    *last_heartbeat = now;
                }
                Some(LockEvent::Refreshed)
            }
            Err(e) => {
                log::warn!("Lock heartbeat failed for {}/{}: {}", project_id, image_id, e);
                self.state = LockState::NotHeld;
                Some(LockEvent::Lost(e))
            }
        }
    }

    /// Release the lock if held. Best-effort: failures are logged, not retried.
    pub async fn release<L: LockApi>(&mut self, api: &L) {
        let state = std::mem::replace(&mut self.state, LockState::NotHeld);
        if let LockState::Held {
            project_id,
            image_id,
            ..
        } = state
        {
            match api.release(&project_id, &image_id).await {
                Ok(()) => log::info!("Lock released on {}/{}", project_id, image_id),
                Err(e) => log::warn!(
                    "Failed to release lock on {}/{}: {}",
                    project_id,
                    image_id,
                    e
                ),
            }
        }
    }

    /// Forget the lock locally without contacting the server.
    pub fn reset(&mut self) {
        self.state = LockState::NotHeld;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::InMemoryBackend;

    #[test]
    fn test_acquire_and_heartbeat_schedule() {
        let backend = InMemoryBackend::new("alice");
        let mut lock = LockManager::new(Duration::from_secs(120));
        let t0 = Instant::now();

        pollster::block_on(lock.acquire(&backend, "p", "img", t0)).unwrap();
        assert!(lock.is_held());
        assert!(!lock.heartbeat_due(t0 + Duration::from_secs(119)));
        assert!(lock.heartbeat_due(t0 + Duration::from_secs(120)));

        let event = pollster::block_on(lock.tick(&backend, t0 + Duration::from_secs(121)));
        assert!(matches!(event, Some(LockEvent::Refreshed)));
        assert!(!lock.heartbeat_due(t0 + Duration::from_secs(200)));
    }

    #[test]
    fn test_held_by_other() {
        let backend = InMemoryBackend::new("alice");
        let bob = backend.as_user("bob");
        let now = Instant::now();

        let mut bobs_lock = LockManager::new(Duration::from_secs(120));
        pollster::block_on(bobs_lock.acquire(&bob, "p", "img", now)).unwrap();

        let mut lock = LockManager::new(Duration::from_secs(120));
        pollster::block_on(lock.acquire(&backend, "p", "img", now)).unwrap();
        assert_eq!(lock.holder(), Some("bob"));
        assert!(!lock.heartbeat_due(now + Duration::from_secs(600)));
    }

    #[test]
    fn test_heartbeat_failure_drops_lock() {
        let backend = InMemoryBackend::new("alice");
        let mut lock = LockManager::new(Duration::from_secs(120));
        let t0 = Instant::now();
        pollster::block_on(lock.acquire(&backend, "p", "img", t0)).unwrap();

        backend.set_offline(true);
        let event = pollster::block_on(lock.tick(&backend, t0 + Duration::from_secs(130)));
        assert!(matches!(event, Some(LockEvent::Lost(ApiError::Network(_)))));
        assert_eq!(lock.state(), &LockState::NotHeld);
    }

    #[test]
    fn test_release_is_best_effort() {
        let backend = InMemoryBackend::new("alice");
        let mut lock = LockManager::new(Duration::from_secs(120));
        pollster::block_on(lock.acquire(&backend, "p", "img", Instant::now())).unwrap();

        backend.set_offline(true);
        pollster::block_on(lock.release(&backend));
        assert!(!lock.is_held());
    }
}
