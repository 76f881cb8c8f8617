use residences_common::{Residence, ResidenceId};
use serde::Deserialize;

/// The acting user's session, injected into the store and the pipeline by
/// the identity layer. No component reads authentication state from any
/// ambient/global source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthSession {
    pub is_authenticated: bool,
    pub user: Option<UserIdentity>,
    pub authorized_residences: Vec<Residence>,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserIdentity {
    pub user_id: String,
    pub email: String,
}

impl AuthSession {
    /// Ids of the residences the user may act on.
    pub fn authorized_ids(&self) -> Vec<ResidenceId> {
        self.authorized_residences
            .iter()
            .map(|residence| residence.residence_id.clone())
            .collect()
    }
}
