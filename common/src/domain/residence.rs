use nutype::nutype;
use serde::{Deserialize, Serialize};

/// Identifier of a managed housing property, the tenant-scoping unit for
/// every publication.
#[nutype(
    sanitize(trim),
    validate(not_empty),
    derive(
        Clone,
        Debug,
        Display,
        FromStr,
        AsRef,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Hash,
        Serialize,
        Deserialize
    )
)]
pub struct ResidenceId(String);

/// One entry of the acting user's authorization grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Residence {
    pub residence_id: ResidenceId,
    pub residence_name: String,
}
