use residences_common::ResidenceId;

use crate::domain::error::StoreError;

/// Filter requested residences down to the caller's grant.
///
/// Never fails: an over-broad request is logged as a security event and the
/// unauthorized ids are silently dropped, so read paths can keep working on
/// the reduced set. Mutating paths must go through [`require_full`].
pub fn authorize(requested: &[ResidenceId], authorized: &[ResidenceId]) -> Vec<ResidenceId> {
    let allowed: Vec<ResidenceId> = requested
        .iter()
        .filter(|id| authorized.contains(id))
        .cloned()
        .collect();

    if allowed.len() < requested.len() {
        let denied: Vec<String> = requested
            .iter()
            .filter(|id| !authorized.contains(id))
            .map(ToString::to_string)
            .collect();
        tracing::warn!(?denied, "request targeted residences outside the user's grant");
    }

    allowed
}

/// Strict variant for mutating call sites: the full requested set must be
/// inside the grant, and must not be empty.
pub fn require_full(
    requested: &[ResidenceId],
    authorized: &[ResidenceId],
) -> Result<Vec<ResidenceId>, StoreError> {
    let allowed = authorize(requested, authorized);
    if allowed.is_empty() || allowed.len() != requested.len() {
        return Err(StoreError::UnauthorizedResidences);
    }
    Ok(allowed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<ResidenceId> {
        raw.iter().map(|id| ResidenceId::try_new(*id).unwrap()).collect()
    }

    #[test]
    fn result_is_exactly_the_intersection() {
        let granted = authorize(&ids(&["R1", "R9"]), &ids(&["R1", "R2"]));
        assert_eq!(granted, ids(&["R1"]));
    }

    #[test]
    fn full_grant_passes_through() {
        let granted = authorize(&ids(&["R1", "R2"]), &ids(&["R1", "R2", "R3"]));
        assert_eq!(granted, ids(&["R1", "R2"]));
    }

    #[test]
    fn require_full_rejects_shrunk_result() {
        let result = require_full(&ids(&["R1", "R9"]), &ids(&["R1"]));
        assert_eq!(result, Err(StoreError::UnauthorizedResidences));
    }

    #[test]
    fn require_full_rejects_empty_request() {
        let result = require_full(&[], &ids(&["R1"]));
        assert_eq!(result, Err(StoreError::UnauthorizedResidences));
    }

    #[test]
    fn require_full_accepts_exact_grant() {
        let result = require_full(&ids(&["R2"]), &ids(&["R1", "R2"]));
        assert_eq!(result, Ok(ids(&["R2"])));
    }
}
