use residences_common::{PublicationKind, RawRecord};

use crate::domain::error::RemoteError;

pub mod command;
pub mod error;
pub mod pipeline;
pub mod security;
pub mod session;
pub mod store;

/// Durable key/value storage for the publication snapshot.
///
/// The dashboard runs on whatever the host platform provides (browser
/// storage, app preferences, a flat file); the store only needs these two
/// calls. `set` is infallible from the store's point of view: an adapter
/// that cannot write logs the failure itself.
pub trait LocalStorage: Clone + Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// Outbound port to the remote content API.
///
/// Every call is best-effort: the store never blocks a local mutation on a
/// `RemoteError` and never rolls one back.
pub trait RemoteApi: Clone + Send + Sync + 'static {
    /// Create a publication; the server may assign its own id.
    fn create(
        &self,
        kind: PublicationKind,
        payload: &RawRecord,
    ) -> impl Future<Output = Result<RemoteAck, RemoteError>> + Send;

    /// Merge partial fields into an existing publication.
    fn update(
        &self,
        kind: PublicationKind,
        id: &str,
        payload: &RawRecord,
    ) -> impl Future<Output = Result<RemoteAck, RemoteError>> + Send;

    /// Mark a publication deleted.
    fn delete(
        &self,
        kind: PublicationKind,
        id: &str,
    ) -> impl Future<Output = Result<RemoteAck, RemoteError>> + Send;
}

/// Server acknowledgement of a successful call.
#[derive(Debug, Clone, Default)]
pub struct RemoteAck {
    /// Server-issued id, when the server assigns one on create.
    pub id: Option<String>,
}
