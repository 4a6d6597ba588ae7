//! In-process backend implementing both remote interfaces.
//!
//! Several [`InMemoryBackend`] handles can share one store, each acting as a
//! different user, which is how concurrent edits and lock contention are
//! simulated in tests and in the replay binary.

use std::cell::{RefCell, RefMut};
use std::collections::HashMap;
use std::future::{Future, ready};
use std::rc::Rc;

use chrono::{DateTime, Utc};

use crate::constants::LOCK_EXPIRY;
use crate::model::{Annotation, Geometry, RemoteId};

use super::{
    AnnotationApi, ApiError, ConflictInfo, CreateResponse, LockAcquire, LockApi, LockInfo,
    LockStatus, UpdateRequest, UpdateResponse,
};

fn lock_expiry() -> DateTime<Utc> {
    Utc::now() + chrono::Duration::seconds(LOCK_EXPIRY.as_secs() as i64)
}

#[derive(Debug, Default)]
struct BackendState {
    annotations: HashMap<RemoteId, Annotation>,
    /// Insertion order, so `list` is stable
    order: Vec<RemoteId>,
    next_id: u64,
    locks: HashMap<(String, String), LockInfo>,
    offline: bool,
    /// Count of calls by operation name
    calls: HashMap<&'static str, usize>,
}

/// Shared in-memory annotation and lock server.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    shared: Rc<RefCell<BackendState>>,
    user: String,
}

impl InMemoryBackend {
    /// Create an empty backend acting as `user`.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            shared: Rc::new(RefCell::new(BackendState::default())),
            user: user.into(),
        }
    }

    /// Another handle on the same store acting as a different user.
    pub fn as_user(&self, user: impl Into<String>) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
            user: user.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Make every call fail with a network error.
    pub fn set_offline(&self, offline: bool) {
        self.shared.borrow_mut().offline = offline;
    }

    /// Stored copy of an annotation.
    pub fn annotation(&self, id: &str) -> Option<Annotation> {
        self.shared.borrow().annotations.get(id).cloned()
    }

    pub fn annotation_count(&self) -> usize {
        self.shared.borrow().annotations.len()
    }

    /// How many times an operation ("create", "update", ...) was called.
    pub fn call_count(&self, operation: &str) -> usize {
        self.shared.borrow().calls.get(operation).copied().unwrap_or(0)
    }

    /// Current lock holder of an image.
    pub fn lock_holder(&self, project_id: &str, image_id: &str) -> Option<String> {
        self.shared
            .borrow()
            .locks
            .get(&(project_id.to_string(), image_id.to_string()))
            .map(|l| l.locked_by.clone())
    }

    fn begin(&self, operation: &'static str) -> Result<RefMut<'_, BackendState>, ApiError> {
        let mut state = self.shared.borrow_mut();
        *state.calls.entry(operation).or_default() += 1;
        if state.offline {
            return Err(ApiError::network(format!("{} failed: backend offline", operation)));
        }
        Ok(state)
    }

    fn create_now(&self, annotation: &Annotation) -> Result<CreateResponse, ApiError> {
        let mut state = self.begin("create")?;
        state.next_id += 1;
        let id = format!("ann-{}", state.next_id);
        let now = Utc::now();
        let stored = Annotation {
            remote_id: Some(id.clone()),
            version: 1,
            created_at: Some(now),
            updated_at: Some(now),
            author: Some(self.user.clone()),
            ..annotation.clone()
        };
        state.annotations.insert(id.clone(), stored);
        state.order.push(id.clone());
        Ok(CreateResponse { id, version: 1 })
    }

    fn update_now(&self, id: &str, request: &UpdateRequest) -> Result<UpdateResponse, ApiError> {
        let mut state = self.begin("update")?;
        let stored = state
            .annotations
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found(id))?;

        if stored.version != request.version {
            return Ok(UpdateResponse::Conflict(ConflictInfo {
                current_version: stored.version,
                your_version: request.version,
                last_updated_by: stored.author.clone(),
                last_updated_at: stored.updated_at,
            }));
        }
        stored.geometry = request.geometry.clone();
        stored.version += 1;
        stored.updated_at = Some(Utc::now());
        stored.author = Some(self.user.clone());
        Ok(UpdateResponse::Updated {
            version: stored.version,
        })
    }

    /// Apply an edit as this handle's user, bypassing version checks.
    ///
    /// Returns the new version.
    pub fn edit_as_other(&self, id: &str, geometry: Geometry) -> Result<u64, ApiError> {
        let version = self
            .annotation(id)
            .map(|a| a.version)
            .ok_or_else(|| ApiError::not_found(id))?;
        match self.update_now(id, &UpdateRequest { geometry, version })? {
            UpdateResponse::Updated { version } => Ok(version),
            UpdateResponse::Conflict(info) => Err(ApiError::rejected(
                409,
                format!("unexpected conflict at version {}", info.current_version),
            )),
        }
    }

    fn delete_now(&self, id: &str) -> Result<(), ApiError> {
        let mut state = self.begin("delete")?;
        if state.annotations.remove(id).is_none() {
            return Err(ApiError::not_found(id));
        }
        state.order.retain(|r| r != id);
        Ok(())
    }

    fn list_now(&self, project_id: &str, image_id: &str) -> Result<Vec<Annotation>, ApiError> {
        let state = self.begin("list")?;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.annotations.get(id))
            .filter(|a| a.project_id == project_id && a.image_id == image_id)
            // Local ids belong to each client
            .map(|a| Annotation { id: 0, ..a.clone() })
            .collect())
    }

    fn acquire_now(&self, project_id: &str, image_id: &str) -> Result<LockAcquire, ApiError> {
        let mut state = self.begin("acquire")?;
        let key = (project_id.to_string(), image_id.to_string());
        let now = Utc::now();

        if let Some(existing) = state.locks.get(&key)
            && existing.locked_by != self.user
            && existing.expires_at > now
        {
            return Ok(LockAcquire {
                status: LockStatus::AlreadyLocked,
                locked_by: Some(existing.locked_by.clone()),
                lock: Some(existing.clone()),
            });
        }

        let lock = LockInfo {
            locked_by: self.user.clone(),
            expires_at: lock_expiry(),
        };
        state.locks.insert(key, lock.clone());
        Ok(LockAcquire {
            status: LockStatus::Acquired,
            locked_by: Some(self.user.clone()),
            lock: Some(lock),
        })
    }

    fn heartbeat_now(&self, project_id: &str, image_id: &str) -> Result<(), ApiError> {
        let mut state = self.begin("heartbeat")?;
        let key = (project_id.to_string(), image_id.to_string());
        match state.locks.get_mut(&key) {
            Some(lock) if lock.locked_by == self.user => {
                lock.expires_at = lock_expiry();
                Ok(())
            }
            _ => Err(ApiError::not_found(format!("lock on {}/{}", project_id, image_id))),
        }
    }

    fn release_now(&self, project_id: &str, image_id: &str) -> Result<(), ApiError> {
        let mut state = self.begin("release")?;
        let key = (project_id.to_string(), image_id.to_string());
        if state
            .locks
            .get(&key)
            .is_some_and(|l| l.locked_by == self.user)
        {
            state.locks.remove(&key);
        }
        Ok(())
    }
}

impl AnnotationApi for InMemoryBackend {
    fn create(
        &self,
        annotation: &Annotation,
    ) -> impl Future<Output = Result<CreateResponse, ApiError>> {
        ready(self.create_now(annotation))
    }

    fn update(
        &self,
        id: &str,
        request: &UpdateRequest,
    ) -> impl Future<Output = Result<UpdateResponse, ApiError>> {
        ready(self.update_now(id, request))
    }

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), ApiError>> {
        ready(self.delete_now(id))
    }

    fn list(
        &self,
        project_id: &str,
        image_id: &str,
    ) -> impl Future<Output = Result<Vec<Annotation>, ApiError>> {
        ready(self.list_now(project_id, image_id))
    }
}

impl LockApi for InMemoryBackend {
    fn acquire(
        &self,
        project_id: &str,
        image_id: &str,
    ) -> impl Future<Output = Result<LockAcquire, ApiError>> {
        ready(self.acquire_now(project_id, image_id))
    }

    fn heartbeat(
        &self,
        project_id: &str,
        image_id: &str,
    ) -> impl Future<Output = Result<(), ApiError>> {
        ready(self.heartbeat_now(project_id, image_id))
    }

    fn release(
        &self,
        project_id: &str,
        image_id: &str,
    ) -> impl Future<Output = Result<(), ApiError>> {
        ready(self.release_now(project_id, image_id))
    }
}
