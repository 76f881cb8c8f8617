use std::collections::{BTreeMap, BTreeSet};

use residences_common::record;
use residences_common::{PublicationKind, RawRecord};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything that can mutate bucket state. The store is the single
/// writer: each mutation is expressed as a command and goes through
/// [`apply`], exhaustively matched.
#[derive(Debug, Clone)]
pub enum Command {
    Create {
        kind: PublicationKind,
        record: RawRecord,
    },
    Update {
        kind: PublicationKind,
        id: String,
        fields: RawRecord,
    },
    Delete {
        kind: PublicationKind,
        id: String,
    },
    Load {
        snapshot: Snapshot,
    },
}

/// In-memory bucket state: one record list per kind, plus the ids of
/// locally deleted records. Tombstones persist with the snapshot so a
/// record deleted here can never be resurrected by a later sync pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketState {
    pub buckets: BTreeMap<PublicationKind, Vec<RawRecord>>,
    pub tombstones: BTreeMap<PublicationKind, BTreeSet<String>>,
}

/// Persisted shape of the bucket state, serialized as one JSON blob under
/// a fixed storage key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    #[serde(default)]
    pub buckets: BTreeMap<PublicationKind, Vec<RawRecord>>,
    #[serde(default)]
    pub tombstones: BTreeMap<PublicationKind, BTreeSet<String>>,
}

impl BucketState {
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            buckets: self.buckets.clone(),
            tombstones: self.tombstones.clone(),
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            buckets: snapshot.buckets,
            tombstones: snapshot.tombstones,
        }
    }

    pub fn bucket(&self, kind: PublicationKind) -> &[RawRecord] {
        self.buckets.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, kind: PublicationKind, id: &str) -> Option<&RawRecord> {
        self.bucket(kind)
            .iter()
            .find(|record| record::record_id_matches(record, id))
    }

    pub fn is_tombstoned(&self, kind: PublicationKind, id: &str) -> bool {
        self.tombstones
            .get(&kind)
            .is_some_and(|ids| ids.contains(id))
    }
}

/// Apply one command. Single-writer invariant: callers other than the
/// store never touch `BucketState` directly.
pub fn apply(state: &mut BucketState, command: Command) {
    match command {
        Command::Create { kind, record } => {
            state.buckets.entry(kind).or_default().push(record);
        }
        Command::Update { kind, id, fields } => {
            let target = state
                .buckets
                .get_mut(&kind)
                .and_then(|bucket| {
                    bucket
                        .iter_mut()
                        .find(|record| record::record_id_matches(record, &id))
                });
            if let Some(record) = target {
                for (name, value) in fields {
                    record.insert(name, value);
                }
            }
        }
        Command::Delete { kind, id } => {
            if let Some(bucket) = state.buckets.get_mut(&kind) {
                bucket.retain(|record| !record::record_id_matches(record, &id));
            }
            state.tombstones.entry(kind).or_default().insert(id);
        }
        Command::Load { snapshot } => {
            *state = BucketState::from_snapshot(snapshot);
        }
    }
}
