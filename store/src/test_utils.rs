//! In-memory fakes for the store's two ports.
//!
//! Public so that integration tests and other crates can reuse them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use residences_common::{PublicationKind, RawRecord, Residence, ResidenceId};
use serde_json::Value;

use crate::domain::error::RemoteError;
use crate::domain::session::{AuthSession, UserIdentity};
use crate::domain::{LocalStorage, RemoteAck, RemoteApi};

/// Volatile [`LocalStorage`], shared across clones.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<HashMap<String, String>>>,
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }
}

/// One observed remote call.
#[derive(Debug, Clone)]
pub struct RemoteCall {
    pub op: &'static str,
    pub kind: PublicationKind,
    pub id: Option<String>,
    pub payload: Option<RawRecord>,
}

/// Scriptable [`RemoteApi`] that records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingRemote {
    calls: Arc<Mutex<Vec<RemoteCall>>>,
    failures_left: Arc<AtomicU32>,
    assigned_id: Arc<Mutex<Option<String>>>,
}

impl RecordingRemote {
    /// Make the next `count` calls fail with a network error.
    pub fn fail_next(&self, count: u32) {
        self.failures_left.store(count, Ordering::SeqCst);
    }

    /// Id the fake server assigns on create.
    pub fn assign_id(&self, id: &str) {
        *self
            .assigned_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(id.to_string());
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn answer(&self, call: RemoteCall) -> Result<RemoteAck, RemoteError> {
        let is_create = call.op == "create";
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
                (left > 0).then(|| left.saturating_sub(1))
            })
            .is_ok();
        if failing {
            return Err(RemoteError::Network("scripted failure".to_string()));
        }

        let id = is_create
            .then(|| {
                self.assigned_id
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
            })
            .flatten();
        Ok(RemoteAck { id })
    }
}

impl RemoteApi for RecordingRemote {
    async fn create(
        &self,
        kind: PublicationKind,
        payload: &RawRecord,
    ) -> Result<RemoteAck, RemoteError> {
        self.answer(RemoteCall {
            op: "create",
            kind,
            id: None,
            payload: Some(payload.clone()),
        })
    }

    async fn update(
        &self,
        kind: PublicationKind,
        id: &str,
        payload: &RawRecord,
    ) -> Result<RemoteAck, RemoteError> {
        self.answer(RemoteCall {
            op: "update",
            kind,
            id: Some(id.to_string()),
            payload: Some(payload.clone()),
        })
    }

    async fn delete(&self, kind: PublicationKind, id: &str) -> Result<RemoteAck, RemoteError> {
        self.answer(RemoteCall {
            op: "delete",
            kind,
            id: Some(id.to_string()),
            payload: None,
        })
    }
}

/// Authenticated session granting the given residences.
pub fn session_for(residences: &[&str]) -> AuthSession {
    AuthSession {
        is_authenticated: true,
        user: Some(UserIdentity {
            user_id: "user-1".to_string(),
            email: "staff@example.test".to_string(),
        }),
        authorized_residences: residences
            .iter()
            .map(|id| Residence {
                residence_id: ResidenceId::try_new(*id).unwrap(),
                residence_name: format!("Résidence {id}"),
            })
            .collect(),
        access_token: Some("test-token".to_string()),
    }
}

/// Shorthand for building a [`RawRecord`] from a `json!` object literal.
pub fn obj(value: Value) -> RawRecord {
    value.as_object().cloned().unwrap_or_default()
}
