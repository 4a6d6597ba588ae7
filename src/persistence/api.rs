//! Remote interfaces for annotations and image locks, and their wire types.
//!
//! Both traits are async and single-threaded: futures are polled on the UI
//! thread and need not be `Send`.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Annotation, Geometry, RemoteId};

use super::ApiError;

/// Result of a successful create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateResponse {
    pub id: RemoteId,
    pub version: u64,
}

/// Body of an update: the new geometry and the version it was based on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRequest {
    pub geometry: Geometry,
    pub version: u64,
}

/// Details of a stale-version update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictInfo {
    pub current_version: u64,
    pub your_version: u64,
    #[serde(default)]
    pub last_updated_by: Option<String>,
    #[serde(default)]
    pub last_updated_at: Option<DateTime<Utc>>,
}

/// Result of an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateResponse {
    Updated { version: u64 },
    Conflict(ConflictInfo),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStatus {
    Acquired,
    AlreadyLocked,
}

/// A lock as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    pub locked_by: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of a lock acquire attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockAcquire {
    pub status: LockStatus,
    #[serde(default)]
    pub locked_by: Option<String>,
    #[serde(default)]
    pub lock: Option<LockInfo>,
}

/// Remote annotation store.
pub trait AnnotationApi {
    fn create(&self, annotation: &Annotation) -> impl Future<Output = Result<CreateResponse, ApiError>>;

    fn update(
        &self,
        id: &str,
        request: &UpdateRequest,
    ) -> impl Future<Output = Result<UpdateResponse, ApiError>>;

    fn delete(&self, id: &str) -> impl Future<Output = Result<(), ApiError>>;

    /// All annotations of one image, with remote ids and versions filled in.
    fn list(
        &self,
        project_id: &str,
        image_id: &str,
    ) -> impl Future<Output = Result<Vec<Annotation>, ApiError>>;
}

/// Remote exclusive-edit locks on images.
pub trait LockApi {
    fn acquire(
        &self,
        project_id: &str,
        image_id: &str,
    ) -> impl Future<Output = Result<LockAcquire, ApiError>>;

    fn heartbeat(&self, project_id: &str, image_id: &str) -> impl Future<Output = Result<(), ApiError>>;

    fn release(&self, project_id: &str, image_id: &str) -> impl Future<Output = Result<(), ApiError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_payload_json() {
        let json = r#"{"status":"conflict","current_version":2,"your_version":1,"last_updated_by":"bob"}"#;
        let response: UpdateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response,
            UpdateResponse::Conflict(ConflictInfo {
                current_version: 2,
                your_version: 1,
                last_updated_by: Some("bob".to_string()),
                last_updated_at: None,
            })
        );
    }

    #[test]
    fn test_lock_acquire_json() {
        let acquire: LockAcquire =
            serde_json::from_str(r#"{"status":"already_locked","locked_by":"alice"}"#).unwrap();
        assert_eq!(acquire.status, LockStatus::AlreadyLocked);
        assert_eq!(acquire.locked_by.as_deref(), Some("alice"));
        assert!(acquire.lock.is_none());
    }
}
