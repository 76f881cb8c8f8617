use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use itertools::Itertools;
use residences_common::normalize::{self, DisplayRecord};
use residences_common::record::{self, RawRecord};
use residences_common::{
    CREATED_FIELD_NAME, ID_FIELD_NAME, IS_LOCAL_FIELD_NAME, PUBLICATION_DATE_FIELD_NAME,
    PUBLISH_DATE_TIME_FIELD_NAME, PUBLISH_LATER_FIELD_NAME, PublicationKind, ResidenceId,
    STATUS_FIELD_NAME, Status,
};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::command::{self, BucketState, Command, SNAPSHOT_VERSION, Snapshot};
use crate::domain::error::StoreError;
use crate::domain::session::AuthSession;
use crate::domain::{LocalStorage, RemoteAck, RemoteApi};

/// Storage key of the serialized snapshot.
pub const STORAGE_KEY: &str = "residence-publications";

/// A sync task is retried across flush passes at most this many times
/// before it is dropped from the queue. The record itself stays flagged
/// local, so the next session's reconcile pass gets a fresh budget.
const MAX_SYNC_ATTEMPTS: u32 = 5;

/// Single source of truth for all publications across the five buckets.
///
/// Local-first: every operation mutates memory, persists the snapshot and
/// returns immediately. Remote synchronization is queued per record and
/// drained by [`PublicationStore::flush_pending`]; a failed push is logged,
/// never surfaced.
pub struct PublicationStore<S: LocalStorage, R: RemoteApi> {
    state: Arc<Mutex<StoreState>>,
    storage: S,
    remote: R,
    session: AuthSession,
}

impl<S: LocalStorage, R: RemoteApi> Clone for PublicationStore<S, R> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            storage: self.storage.clone(),
            remote: self.remote.clone(),
            session: self.session.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct StoreState {
    buckets: BucketState,
    pending: Vec<SyncTask>,
    reconciled: bool,
}

#[derive(Debug, Clone)]
struct SyncTask {
    kind: PublicationKind,
    id: String,
    op: SyncOp,
    attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncOp {
    Create,
    Update,
    Delete,
}

/// Listing counters for the dashboard home screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub per_kind: BTreeMap<PublicationKind, usize>,
    pub total: usize,
    /// Records still waiting for a first successful remote push.
    pub pending_sync: usize,
}

impl<S: LocalStorage, R: RemoteApi> PublicationStore<S, R> {
    /// Open the store, reading the persisted snapshot once. An unreadable
    /// or version-mismatched snapshot is logged and treated as empty.
    pub fn open(storage: S, remote: R, session: AuthSession) -> Self {
        let mut buckets = BucketState::default();
        if let Some(blob) = storage.get(STORAGE_KEY) {
            match serde_json::from_str::<Snapshot>(&blob) {
                Ok(snapshot) if snapshot.version == SNAPSHOT_VERSION => {
                    let mut state = BucketState::default();
                    command::apply(&mut state, Command::Load { snapshot });
                    buckets = state;
                }
                Ok(snapshot) => {
                    tracing::warn!(version = snapshot.version, "unsupported snapshot version, starting empty");
                }
                Err(cause) => {
                    tracing::error!("unreadable snapshot, starting empty: {:?}", cause);
                }
            }
        }

        Self {
            state: Arc::new(Mutex::new(StoreState {
                buckets,
                pending: Vec::new(),
                reconciled: false,
            })),
            storage,
            remote,
            session,
        }
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    /// Create a publication. Applied locally and persisted immediately; the
    /// remote create is queued for the next flush.
    pub fn create(&self, kind: PublicationKind, mut data: RawRecord) -> RawRecord {
        let now = Utc::now();
        let (id, is_local) = match record::record_id(&data) {
            Some(id) => (id, false),
            None => {
                let id = next_local_id();
                data.insert(ID_FIELD_NAME.to_string(), Value::String(id.clone()));
                (id, true)
            }
        };
        if !data.contains_key(CREATED_FIELD_NAME) {
            data.insert(
                CREATED_FIELD_NAME.to_string(),
                Value::String(record::format_wire(&now)),
            );
        }
        if !data.contains_key(PUBLICATION_DATE_FIELD_NAME) {
            data.insert(
                PUBLICATION_DATE_FIELD_NAME.to_string(),
                Value::String(record::format_wire(&now)),
            );
        }
        data.insert(IS_LOCAL_FIELD_NAME.to_string(), Value::Bool(is_local));

        let mut state = self.lock();
        command::apply(
            &mut state.buckets,
            Command::Create {
                kind,
                record: data.clone(),
            },
        );
        if is_local {
            enqueue(&mut state.pending, kind, id, SyncOp::Create);
        }
        self.persist(&state);
        data
    }

    /// Merge partial fields into the record matching `id`, then queue a
    /// remote update (unless the record has never been pushed, in which
    /// case the pending create carries the merged state).
    pub fn update(&self, kind: PublicationKind, id: &str, fields: RawRecord) -> Result<(), StoreError> {
        let mut state = self.lock();
        if state.buckets.find(kind, id).is_none() {
            return Err(StoreError::NotFound);
        }
        command::apply(
            &mut state.buckets,
            Command::Update {
                kind,
                id: id.to_string(),
                fields,
            },
        );
        let still_local = state
            .buckets
            .find(kind, id)
            .is_some_and(|record| record::bool_field(record, IS_LOCAL_FIELD_NAME));
        if !still_local {
            enqueue(&mut state.pending, kind, id.to_string(), SyncOp::Update);
        }
        self.persist(&state);
        Ok(())
    }

    /// Publish a draft: stamps the publication date to now and clears any
    /// scheduled-publication fields.
    pub fn publish_draft(&self, kind: PublicationKind, id: &str) -> Result<(), StoreError> {
        {
            let state = self.lock();
            let record = state.buckets.find(kind, id).ok_or(StoreError::NotFound)?;
            let status = record::string_field(record, STATUS_FIELD_NAME)
                .map(Status::normalize)
                .unwrap_or(Status::Draft);
            if status != Status::Draft {
                return Err(StoreError::InvalidState);
            }
        }

        let mut fields = RawRecord::new();
        fields.insert(
            STATUS_FIELD_NAME.to_string(),
            Value::String(Status::Published.as_wire()),
        );
        fields.insert(
            PUBLICATION_DATE_FIELD_NAME.to_string(),
            Value::String(record::format_wire(&Utc::now())),
        );
        fields.insert(PUBLISH_LATER_FIELD_NAME.to_string(), Value::Bool(false));
        fields.insert(
            PUBLISH_DATE_TIME_FIELD_NAME.to_string(),
            Value::String(String::new()),
        );
        self.update(kind, id, fields)
    }

    /// Remove a record. The local removal is immediate and never rolled
    /// back; the id is tombstoned so no later sync pass can resurrect it.
    pub fn delete(&self, kind: PublicationKind, id: &str) {
        let mut state = self.lock();
        let was_synced = state
            .buckets
            .find(kind, id)
            .is_some_and(|record| !record::bool_field(record, IS_LOCAL_FIELD_NAME));
        command::apply(
            &mut state.buckets,
            Command::Delete {
                kind,
                id: id.to_string(),
            },
        );
        state
            .pending
            .retain(|task| !(task.kind == kind && task.id == id && task.op != SyncOp::Delete));
        if was_synced {
            enqueue(&mut state.pending, kind, id.to_string(), SyncOp::Delete);
        }
        self.persist(&state);
    }

    /// Bucket contents, optionally filtered to one residence, newest first.
    pub fn get(&self, kind: PublicationKind, residence_id: Option<&ResidenceId>) -> Vec<RawRecord> {
        let state = self.lock();
        state
            .buckets
            .bucket(kind)
            .iter()
            .filter(|record| match residence_id {
                Some(id) => normalize::residence_ids_of(record).contains(id),
                None => true,
            })
            .cloned()
            .sorted_by(|a, b| sort_key(b).cmp(&sort_key(a)))
            .collect()
    }

    pub fn get_by_id(&self, kind: PublicationKind, id: &str) -> Option<RawRecord> {
        self.lock().buckets.find(kind, id).cloned()
    }

    /// [`PublicationStore::get`] piped through the display normalizer.
    pub fn get_normalized(
        &self,
        kind: PublicationKind,
        residence_id: Option<&ResidenceId>,
    ) -> Vec<DisplayRecord> {
        let values: Vec<Value> = self
            .get(kind, residence_id)
            .into_iter()
            .map(Value::Object)
            .collect();
        normalize::normalize_list(kind, &values)
    }

    /// Records not yet visible to residents, newest first.
    pub fn get_drafts(&self, kind: PublicationKind) -> Vec<DisplayRecord> {
        self.get_normalized(kind, None)
            .into_iter()
            .filter(|record| record.status == Status::Draft)
            .collect()
    }

    pub fn stats(&self) -> StoreStats {
        let state = self.lock();
        let mut per_kind = BTreeMap::new();
        let mut pending_sync = 0;
        for kind in PublicationKind::ALL {
            let bucket = state.buckets.bucket(kind);
            per_kind.insert(kind, bucket.len());
            pending_sync += bucket
                .iter()
                .filter(|record| record::bool_field(record, IS_LOCAL_FIELD_NAME))
                .count();
        }
        let total = per_kind.values().sum();
        StoreStats {
            per_kind,
            total,
            pending_sync,
        }
    }

    /// Drain queued sync work. Each task targets exactly one record; tasks
    /// run concurrently and their completion order does not matter.
    pub async fn flush_pending(&self) {
        if !self.session.is_authenticated {
            tracing::debug!("skipping sync flush, no authenticated session");
            return;
        }

        let prepared: Vec<(SyncTask, Option<RawRecord>)> = {
            let mut state = self.lock();
            let drained = std::mem::take(&mut state.pending);
            drained
                .into_iter()
                .filter_map(|task| {
                    if task.op != SyncOp::Delete && state.buckets.is_tombstoned(task.kind, &task.id) {
                        tracing::debug!(id = %task.id, "dropping sync task for tombstoned record");
                        return None;
                    }
                    match task.op {
                        SyncOp::Delete => Some((task, None)),
                        _ => {
                            let payload = state.buckets.find(task.kind, &task.id).map(|record| {
                                let mut payload = record.clone();
                                payload.remove(IS_LOCAL_FIELD_NAME);
                                payload
                            });
                            // record gone without a tombstone: nothing to push
                            payload.map(|payload| (task, Some(payload)))
                        }
                    }
                })
                .collect()
        };

        if prepared.is_empty() {
            return;
        }

        let outcomes = join_all(prepared.into_iter().map(|(task, payload)| async move {
            let result = match (task.op, &payload) {
                (SyncOp::Delete, _) => self.remote.delete(task.kind, &task.id).await,
                (SyncOp::Create, Some(payload)) => self.remote.create(task.kind, payload).await,
                (_, Some(payload)) => self.remote.update(task.kind, &task.id, payload).await,
                (_, None) => return None,
            };
            Some((task, result))
        }))
        .await;

        let mut state = self.lock();
        for (mut task, result) in outcomes.into_iter().flatten() {
            match result {
                Ok(ack) => {
                    if task.op == SyncOp::Create {
                        adopt_server_ack(&mut state.buckets, task.kind, &task.id, ack);
                    }
                }
                Err(cause) => {
                    task.attempts += 1;
                    if task.attempts >= MAX_SYNC_ATTEMPTS {
                        tracing::error!(
                            kind = %task.kind,
                            id = %task.id,
                            "sync task exceeded its retry budget, dropping: {:?}",
                            cause
                        );
                    } else {
                        tracing::debug!(
                            kind = %task.kind,
                            id = %task.id,
                            attempts = task.attempts,
                            "remote sync failed, will retry: {:?}",
                            cause
                        );
                        state.pending.push(task);
                    }
                }
            }
        }
        self.persist(&state);
    }

    /// Bulk reconciliation, run once per authenticated session: every
    /// record still flagged local is queued for a remote create, then the
    /// queue is drained.
    pub async fn reconcile(&self) {
        if !self.session.is_authenticated {
            return;
        }
        {
            let mut state = self.lock();
            if state.reconciled {
                return;
            }
            state.reconciled = true;

            let mut local: Vec<(PublicationKind, String)> = Vec::new();
            for kind in PublicationKind::ALL {
                for record in state.buckets.bucket(kind) {
                    if !record::bool_field(record, IS_LOCAL_FIELD_NAME) {
                        continue;
                    }
                    if let Some(id) = record::record_id(record) {
                        if !state.buckets.is_tombstoned(kind, &id) {
                            local.push((kind, id));
                        }
                    }
                }
            }
            for (kind, id) in local {
                enqueue(&mut state.pending, kind, id, SyncOp::Create);
            }
        }
        self.flush_pending().await;
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &StoreState) {
        match serde_json::to_string(&state.buckets.to_snapshot()) {
            Ok(blob) => self.storage.set(STORAGE_KEY, &blob),
            Err(cause) => tracing::error!("failed to serialize snapshot: {:?}", cause),
        }
    }
}

fn enqueue(pending: &mut Vec<SyncTask>, kind: PublicationKind, id: String, op: SyncOp) {
    let duplicate = pending
        .iter()
        .any(|task| task.kind == kind && task.id == id && task.op == op);
    if !duplicate {
        pending.push(SyncTask {
            kind,
            id,
            op,
            attempts: 0,
        });
    }
}

/// After a confirmed remote create: clear the local flag and adopt the
/// server-issued id if one came back.
fn adopt_server_ack(buckets: &mut BucketState, kind: PublicationKind, id: &str, ack: RemoteAck) {
    let mut fields = RawRecord::new();
    fields.insert(IS_LOCAL_FIELD_NAME.to_string(), Value::Bool(false));
    if let Some(server_id) = ack.id {
        if server_id != id {
            fields.insert(ID_FIELD_NAME.to_string(), Value::String(server_id));
        }
    }
    command::apply(
        buckets,
        Command::Update {
            kind,
            id: id.to_string(),
            fields,
        },
    );
}

/// Listing order: publication date, falling back to creation date, falling
/// back to epoch.
fn sort_key(record: &RawRecord) -> DateTime<Utc> {
    record::timestamp_field(record, PUBLICATION_DATE_FIELD_NAME)
        .or_else(|| record::timestamp_field(record, CREATED_FIELD_NAME))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Client-side ids are timestamp-derived and strictly increasing, even for
/// two creations in the same millisecond.
fn next_local_id() -> String {
    static LAST_ID: AtomicI64 = AtomicI64::new(0);
    let now = Utc::now().timestamp_millis();
    let previous = LAST_ID
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(last.max(now - 1) + 1)
        })
        .unwrap_or(now - 1);
    (previous.max(now - 1) + 1).to_string()
}
