use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The five content kinds manageable through the dashboard.
///
/// Each kind owns one store bucket and its own field schema; buckets are
/// never merged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum PublicationKind {
    Posts,
    Events,
    Surveys,
    Alerts,
    DailyAdvice,
}

impl PublicationKind {
    pub const ALL: [PublicationKind; 5] = [
        PublicationKind::Posts,
        PublicationKind::Events,
        PublicationKind::Surveys,
        PublicationKind::Alerts,
        PublicationKind::DailyAdvice,
    ];

    /// Bucket name, also the `{type}` segment of the content API routes.
    pub fn as_bucket(&self) -> &'static str {
        match self {
            PublicationKind::Posts => "posts",
            PublicationKind::Events => "events",
            PublicationKind::Surveys => "surveys",
            PublicationKind::Alerts => "alerts",
            PublicationKind::DailyAdvice => "daily-advice",
        }
    }
}

impl fmt::Display for PublicationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_bucket())
    }
}

impl FromStr for PublicationKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PublicationKind::ALL
            .into_iter()
            .find(|kind| kind.as_bucket() == s.trim().to_lowercase())
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_names_round_trip() {
        for kind in PublicationKind::ALL {
            assert_eq!(kind.as_bucket().parse::<PublicationKind>(), Ok(kind));
        }
    }

    #[test]
    fn unknown_bucket_is_rejected() {
        assert!("newsletters".parse::<PublicationKind>().is_err());
    }

    #[test]
    fn serializes_as_bucket_name() {
        let json = serde_json::to_string(&PublicationKind::DailyAdvice).unwrap();
        assert_eq!(json, "\"daily-advice\"");
    }
}
