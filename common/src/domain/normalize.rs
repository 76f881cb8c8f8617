use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use itertools::Itertools;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::domain::kind::PublicationKind;
use crate::domain::record::{self, RawRecord};
use crate::domain::residence::ResidenceId;
use crate::domain::status::Status;
use crate::{
    CAPACITY_FIELD_NAME, CATEGORY_ID_FIELD_NAME, CREATED_FIELD_NAME, END_AT_FIELD_NAME,
    LEGACY_CATEGORY_FIELD_NAME, LEGACY_END_DATE_FIELD_NAME, LEGACY_EVENT_DATE_FIELD_NAME,
    LEGACY_EVENT_TIME_FIELD_NAME, LEGACY_PLACE_FIELD_NAME, LEGACY_RESIDENCE_FIELD_NAME,
    LEGACY_START_DATE_FIELD_NAME, LEGACY_TARGET_RESIDENCES_FIELD_NAME, LOCATION_FIELD_NAME,
    PRIORITY_FIELD_NAME, PUBLICATION_DATE_FIELD_NAME, PUBLISH_AT_FIELD_NAME, QUESTION_FIELD_NAME,
    RESIDENCE_IDS_FIELD_NAME, START_AT_FIELD_NAME, STATUS_FIELD_NAME, TITLE_FIELD_NAME,
};

static HTML_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new("<[^>]*>").unwrap());

/// Maximum title length shown in listings.
const TITLE_DISPLAY_LIMIT: usize = 100;

/// One publication reduced to the shape every listing screen consumes,
/// regardless of kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRecord {
    pub id: Option<String>,
    pub kind: PublicationKind,
    pub title: String,
    pub display_date: DateTime<Utc>,
    pub status: Status,
    pub residence_ids: Vec<ResidenceId>,
    /// Kind-specific listing fields copied forward when present.
    pub extras: RawRecord,
    /// Untransformed source record, kept for edit/delete/publish actions.
    pub original_data: RawRecord,
}

/// Convert one raw record into its display shape.
///
/// Returns `None` only when the value is not an object (null, missing) —
/// malformed field content degrades to fallbacks, it never drops a record.
pub fn normalize(kind: PublicationKind, raw: &Value) -> Option<DisplayRecord> {
    let record = raw.as_object()?;

    let status = record::string_field(record, STATUS_FIELD_NAME)
        .map(Status::normalize)
        .unwrap_or(Status::Draft);

    Some(DisplayRecord {
        id: record::record_id(record),
        kind,
        title: derive_title(kind, record),
        display_date: derive_display_date(kind, record).unwrap_or_else(Utc::now),
        status,
        residence_ids: residence_ids_of(record),
        extras: copy_display_extras(record),
        original_data: record.clone(),
    })
}

/// Normalize a list: drop non-records, newest first.
pub fn normalize_list(kind: PublicationKind, items: &[Value]) -> Vec<DisplayRecord> {
    items
        .iter()
        .filter_map(|item| normalize(kind, item))
        .sorted_by(|a, b| b.display_date.cmp(&a.display_date))
        .collect()
}

// title derivation

fn derive_title(kind: PublicationKind, record: &RawRecord) -> String {
    let title = match kind {
        PublicationKind::Surveys => record::string_field(record, QUESTION_FIELD_NAME)
            .map(strip_html)
            .filter(|question| !question.is_empty()),
        _ => record::string_field(record, TITLE_FIELD_NAME).map(str::to_string),
    };
    let title = title.unwrap_or_else(|| fallback_title(kind).to_string());
    truncate_chars(&title, TITLE_DISPLAY_LIMIT)
}

fn fallback_title(kind: PublicationKind) -> &'static str {
    match kind {
        PublicationKind::Posts => "Publication",
        PublicationKind::Events => "Évènement",
        PublicationKind::Surveys => "Sondage",
        PublicationKind::Alerts => "Alerte",
        PublicationKind::DailyAdvice => "Message du jour",
    }
}

fn strip_html(text: &str) -> String {
    HTML_TAG_REGEX.replace_all(text, "").trim().to_string()
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}

// display date derivation

type DateAccessor = fn(&RawRecord) -> Option<DateTime<Utc>>;

/// Ordered date accessors per kind; the first hit wins. Events prefer their
/// own start timestamp over the publication date, every other kind goes
/// straight to the publish/creation chain.
fn date_accessors(kind: PublicationKind) -> &'static [DateAccessor] {
    const EVENTS: &[DateAccessor] = &[
        start_at,
        legacy_start_date,
        legacy_event_date_time,
        publish_at,
        publication_date,
        created_at,
    ];
    const DEFAULT: &[DateAccessor] = &[publish_at, publication_date, created_at];
    match kind {
        PublicationKind::Events => EVENTS,
        _ => DEFAULT,
    }
}

fn derive_display_date(kind: PublicationKind, record: &RawRecord) -> Option<DateTime<Utc>> {
    date_accessors(kind)
        .iter()
        .find_map(|accessor| accessor(record))
}

fn start_at(record: &RawRecord) -> Option<DateTime<Utc>> {
    record::timestamp_field(record, START_AT_FIELD_NAME)
}

fn legacy_start_date(record: &RawRecord) -> Option<DateTime<Utc>> {
    record::timestamp_field(record, LEGACY_START_DATE_FIELD_NAME)
}

/// Oldest event records split the start into a `eventDate` day and an
/// optional `eventTime` hour.
fn legacy_event_date_time(record: &RawRecord) -> Option<DateTime<Utc>> {
    let date = record::string_field(record, LEGACY_EVENT_DATE_FIELD_NAME)?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = record::string_field(record, LEGACY_EVENT_TIME_FIELD_NAME)
        .and_then(|time| NaiveTime::parse_from_str(time, "%H:%M").ok())
        .unwrap_or(NaiveTime::MIN);
    Some(Utc.from_utc_datetime(&date.and_time(time)))
}

fn publish_at(record: &RawRecord) -> Option<DateTime<Utc>> {
    record::timestamp_field(record, PUBLISH_AT_FIELD_NAME)
}

fn publication_date(record: &RawRecord) -> Option<DateTime<Utc>> {
    record::timestamp_field(record, PUBLICATION_DATE_FIELD_NAME)
}

fn created_at(record: &RawRecord) -> Option<DateTime<Utc>> {
    record::timestamp_field(record, CREATED_FIELD_NAME)
}

// residence reconciliation

/// Reconcile the three raw shapes of residence targeting: a
/// `residenceIds` array, a legacy `targetResidences` array, or a single
/// `residence_id` scalar. First non-empty shape wins.
pub fn residence_ids_of(record: &RawRecord) -> Vec<ResidenceId> {
    let from_array = |name: &str| -> Vec<ResidenceId> {
        record::string_list_field(record, name)
            .into_iter()
            .filter_map(|id| parse_residence_id(&id))
            .collect()
    };

    let ids = from_array(RESIDENCE_IDS_FIELD_NAME);
    if !ids.is_empty() {
        return ids;
    }
    let ids = from_array(LEGACY_TARGET_RESIDENCES_FIELD_NAME);
    if !ids.is_empty() {
        return ids;
    }
    record::string_field(record, LEGACY_RESIDENCE_FIELD_NAME)
        .and_then(parse_residence_id)
        .map(|id| vec![id])
        .unwrap_or_default()
}

fn parse_residence_id(id: &str) -> Option<ResidenceId> {
    match ResidenceId::try_new(id) {
        Ok(id) => Some(id),
        Err(_) => {
            tracing::debug!(id, "skipping blank residence id");
            None
        }
    }
}

// display extras

/// Canonical extra field → ordered source fields, legacy name last.
const EXTRA_FIELD_SOURCES: &[(&str, &[&str])] = &[
    (CATEGORY_ID_FIELD_NAME, &[CATEGORY_ID_FIELD_NAME, LEGACY_CATEGORY_FIELD_NAME]),
    (PRIORITY_FIELD_NAME, &[PRIORITY_FIELD_NAME]),
    (LOCATION_FIELD_NAME, &[LOCATION_FIELD_NAME, LEGACY_PLACE_FIELD_NAME]),
    (CAPACITY_FIELD_NAME, &[CAPACITY_FIELD_NAME]),
    (START_AT_FIELD_NAME, &[START_AT_FIELD_NAME, LEGACY_START_DATE_FIELD_NAME]),
    (END_AT_FIELD_NAME, &[END_AT_FIELD_NAME, LEGACY_END_DATE_FIELD_NAME]),
];

fn copy_display_extras(record: &RawRecord) -> RawRecord {
    let mut extras = RawRecord::new();
    for (target, sources) in EXTRA_FIELD_SOURCES {
        let value = sources
            .iter()
            .find_map(|source| record.get(*source))
            .filter(|value| !value.is_null());
        if let Some(value) = value {
            extras.insert(target.to_string(), value.clone());
        }
    }
    extras
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn survey_title_strips_html_and_trims() {
        let raw = json!({"question": "<p>Do you <b>like</b> cats?</p>"});
        let display = normalize(PublicationKind::Surveys, &raw).unwrap();
        assert_eq!(display.title, "Do you like cats?");
    }

    #[test]
    fn missing_title_falls_back_per_kind() {
        let raw = json!({});
        let post = normalize(PublicationKind::Posts, &raw).unwrap();
        let advice = normalize(PublicationKind::DailyAdvice, &raw).unwrap();
        assert_eq!(post.title, "Publication");
        assert_eq!(advice.title, "Message du jour");
    }

    #[test]
    fn title_is_truncated_to_display_limit() {
        let raw = json!({"title": "x".repeat(250)});
        let display = normalize(PublicationKind::Posts, &raw).unwrap();
        assert_eq!(display.title.chars().count(), 100);
    }

    #[test]
    fn legacy_residence_scalar_becomes_one_element_list() {
        let raw = json!({"residence_id": "R1", "title": "T"});
        let display = normalize(PublicationKind::Posts, &raw).unwrap();
        let ids: Vec<String> = display.residence_ids.iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["R1"]);
    }

    #[test]
    fn residence_ids_array_wins_over_legacy_shapes() {
        let raw = json!({
            "residenceIds": ["R2"],
            "targetResidences": ["R3"],
            "residence_id": "R4",
        });
        let display = normalize(PublicationKind::Posts, &raw).unwrap();
        let ids: Vec<String> = display.residence_ids.iter().map(ToString::to_string).collect();
        assert_eq!(ids, vec!["R2"]);
    }

    #[test]
    fn events_prefer_start_timestamp_over_publish_date() {
        let raw = json!({
            "startAt": "2025-06-01 18:00:00",
            "publishAt": "2025-05-01 09:00:00",
        });
        let display = normalize(PublicationKind::Events, &raw).unwrap();
        assert_eq!(record::format_wire(&display.display_date), "2025-06-01 18:00:00");
    }

    #[test]
    fn legacy_event_date_and_time_combine() {
        let raw = json!({"eventDate": "2024-11-20", "eventTime": "19:30"});
        let display = normalize(PublicationKind::Events, &raw).unwrap();
        assert_eq!(record::format_wire(&display.display_date), "2024-11-20 19:30:00");
    }

    #[test]
    fn posts_use_publish_then_legacy_then_created() {
        let raw = json!({"publicationDate": "2025-02-02 08:00:00", "createdAt": "2025-01-01 08:00:00"});
        let display = normalize(PublicationKind::Posts, &raw).unwrap();
        assert_eq!(record::format_wire(&display.display_date), "2025-02-02 08:00:00");
    }

    #[test]
    fn extras_fall_back_to_legacy_names() {
        let raw = json!({"category": "CAT-001", "place": "Salle commune"});
        let display = normalize(PublicationKind::Events, &raw).unwrap();
        assert_eq!(display.extras.get("categoryId"), Some(&json!("CAT-001")));
        assert_eq!(display.extras.get("location"), Some(&json!("Salle commune")));
    }

    #[test]
    fn normalization_is_idempotent() {
        let raw = json!({
            "id": "42",
            "title": "Fête des voisins",
            "status": "Publié",
            "publishAt": "2025-05-01 09:00:00",
            "residenceIds": ["R1", "R2"],
            "category": "CAT-002",
        });
        let first = normalize(PublicationKind::Posts, &raw).unwrap();
        let again = normalize(
            PublicationKind::Posts,
            &Value::Object(first.original_data.clone()),
        )
        .unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn list_is_sorted_newest_first_and_drops_nulls() {
        let items = vec![
            json!({"title": "old", "publishAt": "2024-01-01 00:00:00"}),
            Value::Null,
            json!({"title": "new", "publishAt": "2025-01-01 00:00:00"}),
        ];
        let displays = normalize_list(PublicationKind::Posts, &items);
        assert_eq!(displays.len(), 2);
        assert_eq!(displays[0].title, "new");
        assert!(displays[0].display_date >= displays[1].display_date);
    }

    #[test]
    fn status_normalizes_via_synonym_table() {
        let raw = json!({"status": "Brouillon"});
        let display = normalize(PublicationKind::Alerts, &raw).unwrap();
        assert_eq!(display.status, Status::Draft);
    }
}
