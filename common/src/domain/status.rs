use serde::{Deserialize, Serialize};

/// Canonical publication status.
///
/// Raw records carry status tokens in French or English, in any case.
/// Tokens outside the synonym table are preserved under [`Status::Other`]
/// rather than rejected: normalization is total and never fails.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Draft,
    Published,
    Scheduled,
    Archived,
    /// Terminal state for surveys
    PollClosed,
    /// Terminal state for events
    EventCancelled,
    /// Terminal state for alerts
    AlertResolved,
    /// Pass-through for unknown tokens
    Other(String),
}

impl Status {
    /// Case-insensitive lookup across the French/English synonym table.
    pub fn normalize(raw: &str) -> Status {
        match raw.trim().to_lowercase().as_str() {
            "draft" | "brouillon" => Status::Draft,
            "published" | "publié" | "publier" => Status::Published,
            "scheduled" | "programmé" => Status::Scheduled,
            "archived" | "archivé" => Status::Archived,
            "closed" | "fermé" => Status::PollClosed,
            "cancelled" | "annulé" => Status::EventCancelled,
            "resolved" | "résolu" => Status::AlertResolved,
            _ => Status::Other(raw.to_string()),
        }
    }

    /// Lowercase English wire token, inverse of [`Status::normalize`].
    pub fn as_wire(&self) -> String {
        match self {
            Status::Draft => "draft".to_string(),
            Status::Published => "published".to_string(),
            Status::Scheduled => "scheduled".to_string(),
            Status::Archived => "archived".to_string(),
            Status::PollClosed => "closed".to_string(),
            Status::EventCancelled => "cancelled".to_string(),
            Status::AlertResolved => "resolved".to_string(),
            Status::Other(token) => token.to_lowercase(),
        }
    }

    /// Badge color shown next to the status in listings.
    pub fn color(&self) -> SemanticColor {
        match self {
            Status::Draft => SemanticColor::Warning,
            Status::Published => SemanticColor::Success,
            Status::Scheduled => SemanticColor::Info,
            Status::Archived => SemanticColor::Default,
            Status::PollClosed => SemanticColor::Default,
            Status::EventCancelled => SemanticColor::Error,
            Status::AlertResolved => SemanticColor::Success,
            Status::Other(_) => SemanticColor::Default,
        }
    }

    /// Only an already published item can be pushed out to residents again.
    pub fn can_repost(&self) -> bool {
        matches!(self, Status::Published)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticColor {
    Warning,
    Success,
    Info,
    Default,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: [Status; 7] = [
        Status::Draft,
        Status::Published,
        Status::Scheduled,
        Status::Archived,
        Status::PollClosed,
        Status::EventCancelled,
        Status::AlertResolved,
    ];

    #[test]
    fn wire_tokens_round_trip() {
        for status in CANONICAL {
            assert_eq!(Status::normalize(&status.as_wire()), status);
        }
    }

    #[test]
    fn french_synonyms_normalize() {
        assert_eq!(Status::normalize("Brouillon"), Status::Draft);
        assert_eq!(Status::normalize("Publié"), Status::Published);
        assert_eq!(Status::normalize("PROGRAMMÉ"), Status::Scheduled);
        assert_eq!(Status::normalize("archivé"), Status::Archived);
        assert_eq!(Status::normalize("fermé"), Status::PollClosed);
        assert_eq!(Status::normalize("Annulé"), Status::EventCancelled);
        assert_eq!(Status::normalize("résolu"), Status::AlertResolved);
    }

    #[test]
    fn publier_counts_as_published() {
        assert_eq!(Status::normalize("publier"), Status::Published);
    }

    #[test]
    fn unknown_token_passes_through() {
        let status = Status::normalize("en attente");
        assert_eq!(status, Status::Other("en attente".to_string()));
        assert_eq!(status.as_wire(), "en attente");
        assert_eq!(status.color(), SemanticColor::Default);
    }

    #[test]
    fn only_published_can_repost() {
        for status in CANONICAL {
            assert_eq!(status.can_repost(), status == Status::Published);
        }
        assert!(!Status::Other("pending".into()).can_repost());
    }
}
