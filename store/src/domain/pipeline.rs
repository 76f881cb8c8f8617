use chrono::Utc;
use residences_common::record::{self, RawRecord};
use residences_common::{
    AUTHOR_FIELD_NAME, CAPACITY_FIELD_NAME, CATEGORY_ID_FIELD_NAME, CLOSES_AT_FIELD_NAME,
    CREATED_FIELD_NAME, DESCRIPTION_FIELD_NAME, DESCRIPTION_HTML_FIELD_NAME, END_AT_FIELD_NAME,
    LOCATION_FIELD_NAME, MESSAGE_FIELD_NAME, MESSAGE_HTML_FIELD_NAME, OPTIONS_FIELD_NAME,
    PRIORITY_FIELD_NAME, PUBLISH_AT_FIELD_NAME, PUBLISH_DATE_TIME_FIELD_NAME,
    PUBLISH_LATER_FIELD_NAME, PublicationKind, QUESTION_FIELD_NAME, RESIDENCE_IDS_FIELD_NAME,
    ResidenceId, STATUS_FIELD_NAME, START_AT_FIELD_NAME, Status, TITLE_FIELD_NAME,
};
use serde_json::Value;

use crate::domain::error::{FieldError, StoreError};
use crate::domain::security;
use crate::domain::store::PublicationStore;
use crate::domain::{LocalStorage, RemoteApi};

/// What the form layer renders for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    RichText,
    DateTime,
    Select,
    Number,
    OptionList,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub input: InputKind,
    pub required: bool,
    pub options: &'static [&'static str],
}

/// Per-kind submission template: form fields, validation rules and the
/// mapping from form field names to the wire contract.
pub struct Template {
    pub kind: PublicationKind,
    pub entity_name: &'static str,
    /// Message stems for the success notification.
    created_label: &'static str,
    updated_label: &'static str,
    pub fields: &'static [FieldSpec],
    pub required: &'static [&'static str],
    validate: Option<fn(&RawRecord, &SubmitContext) -> Vec<FieldError>>,
    contract: fn(&RawRecord, &SubmitContext) -> RawRecord,
}

pub fn template_for(kind: PublicationKind) -> &'static Template {
    match kind {
        PublicationKind::Posts => &POSTS_TEMPLATE,
        PublicationKind::Events => &EVENTS_TEMPLATE,
        PublicationKind::Surveys => &SURVEYS_TEMPLATE,
        PublicationKind::Alerts => &ALERTS_TEMPLATE,
        PublicationKind::DailyAdvice => &DAILY_ADVICE_TEMPLATE,
    }
}

static POSTS_TEMPLATE: Template = Template {
    kind: PublicationKind::Posts,
    entity_name: "Publication",
    created_label: "Publication créée",
    updated_label: "Publication mise à jour",
    fields: &[
        FieldSpec { name: TITLE_FIELD_NAME, label: "Titre", input: InputKind::Text, required: true, options: &[] },
        FieldSpec { name: MESSAGE_FIELD_NAME, label: "Message", input: InputKind::RichText, required: true, options: &[] },
        FieldSpec { name: CATEGORY_ID_FIELD_NAME, label: "Catégorie", input: InputKind::Select, required: true, options: &[] },
    ],
    required: &[TITLE_FIELD_NAME, MESSAGE_FIELD_NAME, CATEGORY_ID_FIELD_NAME],
    validate: None,
    contract: post_contract,
};

static EVENTS_TEMPLATE: Template = Template {
    kind: PublicationKind::Events,
    entity_name: "Évènement",
    created_label: "Évènement créé",
    updated_label: "Évènement mis à jour",
    fields: &[
        FieldSpec { name: TITLE_FIELD_NAME, label: "Titre", input: InputKind::Text, required: true, options: &[] },
        FieldSpec { name: DESCRIPTION_FIELD_NAME, label: "Description", input: InputKind::RichText, required: false, options: &[] },
        FieldSpec { name: START_AT_FIELD_NAME, label: "Début", input: InputKind::DateTime, required: true, options: &[] },
        FieldSpec { name: END_AT_FIELD_NAME, label: "Fin", input: InputKind::DateTime, required: true, options: &[] },
        FieldSpec { name: LOCATION_FIELD_NAME, label: "Lieu", input: InputKind::Text, required: false, options: &[] },
        FieldSpec { name: CAPACITY_FIELD_NAME, label: "Capacité", input: InputKind::Number, required: false, options: &[] },
    ],
    required: &[TITLE_FIELD_NAME, START_AT_FIELD_NAME, END_AT_FIELD_NAME],
    validate: Some(validate_event),
    contract: event_contract,
};

static SURVEYS_TEMPLATE: Template = Template {
    kind: PublicationKind::Surveys,
    entity_name: "Sondage",
    created_label: "Sondage créé",
    updated_label: "Sondage mis à jour",
    fields: &[
        FieldSpec { name: QUESTION_FIELD_NAME, label: "Question", input: InputKind::RichText, required: true, options: &[] },
        FieldSpec { name: OPTIONS_FIELD_NAME, label: "Réponses", input: InputKind::OptionList, required: true, options: &[] },
        FieldSpec { name: CLOSES_AT_FIELD_NAME, label: "Clôture", input: InputKind::DateTime, required: false, options: &[] },
    ],
    required: &[QUESTION_FIELD_NAME],
    validate: Some(validate_survey),
    contract: survey_contract,
};

static ALERTS_TEMPLATE: Template = Template {
    kind: PublicationKind::Alerts,
    entity_name: "Alerte",
    created_label: "Alerte créée",
    updated_label: "Alerte mise à jour",
    fields: &[
        FieldSpec { name: TITLE_FIELD_NAME, label: "Titre", input: InputKind::Text, required: true, options: &[] },
        FieldSpec { name: MESSAGE_FIELD_NAME, label: "Message", input: InputKind::RichText, required: true, options: &[] },
        FieldSpec { name: PRIORITY_FIELD_NAME, label: "Priorité", input: InputKind::Select, required: true, options: &["low", "medium", "high", "critical"] },
    ],
    required: &[TITLE_FIELD_NAME, MESSAGE_FIELD_NAME, PRIORITY_FIELD_NAME],
    validate: None,
    contract: alert_contract,
};

static DAILY_ADVICE_TEMPLATE: Template = Template {
    kind: PublicationKind::DailyAdvice,
    entity_name: "Message du jour",
    created_label: "Message du jour créé",
    updated_label: "Message du jour mis à jour",
    fields: &[
        FieldSpec { name: TITLE_FIELD_NAME, label: "Titre", input: InputKind::Text, required: true, options: &[] },
        FieldSpec { name: MESSAGE_FIELD_NAME, label: "Message", input: InputKind::RichText, required: true, options: &[] },
    ],
    required: &[TITLE_FIELD_NAME, MESSAGE_FIELD_NAME],
    validate: None,
    contract: advice_contract,
};

/// Submission context carried alongside the form data.
#[derive(Debug, Clone, Default)]
pub struct SubmitContext {
    pub is_editing: bool,
    pub editing_id: Option<String>,
    pub residence_ids: Vec<ResidenceId>,
    /// Requested status token, any synonym accepted. Blank means draft.
    pub status: String,
    pub publish_later: bool,
    pub publish_date_time: String,
    /// Survey answers collected by the dedicated option editor.
    pub poll_answers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub message: String,
}

/// Drives a form submission end to end: authorization, validation,
/// contract mapping, persistence. Authorization and validation run
/// strictly before any store mutation, so a failed submit never leaves a
/// partial record behind.
pub struct SubmissionPipeline<S: LocalStorage, R: RemoteApi> {
    store: PublicationStore<S, R>,
}

impl<S: LocalStorage, R: RemoteApi> SubmissionPipeline<S, R> {
    pub fn new(store: PublicationStore<S, R>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &PublicationStore<S, R> {
        &self.store
    }

    pub fn submit(
        &self,
        kind: PublicationKind,
        form_data: RawRecord,
        ctx: SubmitContext,
    ) -> Result<SubmitOutcome, StoreError> {
        let session = self.store.session();
        if !session.is_authenticated {
            return Err(StoreError::Unauthenticated);
        }

        let granted = security::require_full(&ctx.residence_ids, &session.authorized_ids())?;

        let template = template_for(kind);
        let mut errors: Vec<FieldError> = template
            .required
            .iter()
            .copied()
            .filter(|name| !has_value(&form_data, name))
            .map(|name| FieldError::new(name, "champ requis"))
            .collect();
        if let Some(validate) = template.validate {
            errors.extend(validate(&form_data, &ctx));
        }
        let publish_at = if ctx.publish_later {
            let parsed = record::parse_timestamp(&Value::String(ctx.publish_date_time.clone()));
            if parsed.is_none() {
                errors.push(FieldError::new(
                    PUBLISH_DATE_TIME_FIELD_NAME,
                    "date de publication invalide",
                ));
            }
            parsed
        } else {
            None
        };
        if !errors.is_empty() {
            return Err(StoreError::InvalidData(errors));
        }

        let mut payload = (template.contract)(&form_data, &ctx);
        payload.insert(
            RESIDENCE_IDS_FIELD_NAME.to_string(),
            Value::Array(
                granted
                    .iter()
                    .map(|id| Value::String(id.to_string()))
                    .collect(),
            ),
        );
        let status = if ctx.status.trim().is_empty() {
            Status::Draft
        } else {
            Status::normalize(&ctx.status)
        };
        payload.insert(STATUS_FIELD_NAME.to_string(), Value::String(status.as_wire()));
        payload.insert(
            PUBLISH_LATER_FIELD_NAME.to_string(),
            Value::Bool(ctx.publish_later),
        );
        if let Some(user) = &session.user {
            payload.insert(
                AUTHOR_FIELD_NAME.to_string(),
                Value::String(user.user_id.clone()),
            );
        }
        if let Some(publish_at) = publish_at {
            payload.insert(
                PUBLISH_AT_FIELD_NAME.to_string(),
                Value::String(record::format_wire(&publish_at)),
            );
        }

        if ctx.is_editing {
            let id = ctx.editing_id.as_deref().ok_or(StoreError::NotFound)?;
            self.store.update(kind, id, payload)?;
            tracing::info!(kind = %kind, id, "publication updated");
            Ok(SubmitOutcome {
                message: template.updated_label.to_string(),
            })
        } else {
            payload.insert(
                CREATED_FIELD_NAME.to_string(),
                Value::String(record::format_wire(&Utc::now())),
            );
            let count = granted.len();
            let record = self.store.create(kind, payload);
            tracing::info!(
                kind = %kind,
                id = %record::record_id(&record).unwrap_or_default(),
                residences = count,
                "publication created"
            );
            Ok(SubmitOutcome {
                message: format!(
                    "{} dans {} résidence{}",
                    template.created_label,
                    count,
                    if count > 1 { "s" } else { "" }
                ),
            })
        }
    }
}

/// A required field counts as filled when it is present and, for strings,
/// not blank.
fn has_value(form: &RawRecord, name: &str) -> bool {
    match form.get(name) {
        None | Some(Value::Null) => false,
        Some(Value::String(value)) => !value.trim().is_empty(),
        Some(_) => true,
    }
}

fn copy_field(form: &RawRecord, payload: &mut RawRecord, name: &str) {
    if let Some(value) = form.get(name).filter(|value| !value.is_null()) {
        payload.insert(name.to_string(), value.clone());
    }
}

fn copy_string_as(form: &RawRecord, payload: &mut RawRecord, source: &str, target: &str) {
    if let Some(value) = record::string_field(form, source) {
        payload.insert(target.to_string(), Value::String(value.to_string()));
    }
}

fn copy_wire_datetime(form: &RawRecord, payload: &mut RawRecord, name: &str) {
    if let Some(at) = record::timestamp_field(form, name) {
        payload.insert(name.to_string(), Value::String(record::format_wire(&at)));
    }
}

/// Survey answers come from the option editor, falling back to an
/// `options` array in the form data; blank entries are dropped either way.
fn survey_options(form: &RawRecord, ctx: &SubmitContext) -> Vec<String> {
    let from_ctx: Vec<String> = ctx
        .poll_answers
        .iter()
        .map(|answer| answer.trim())
        .filter(|answer| !answer.is_empty())
        .map(str::to_string)
        .collect();
    if !from_ctx.is_empty() {
        return from_ctx;
    }
    record::string_list_field(form, OPTIONS_FIELD_NAME)
}

// contract mappings

fn post_contract(form: &RawRecord, _ctx: &SubmitContext) -> RawRecord {
    let mut payload = RawRecord::new();
    copy_field(form, &mut payload, TITLE_FIELD_NAME);
    copy_string_as(form, &mut payload, MESSAGE_FIELD_NAME, MESSAGE_HTML_FIELD_NAME);
    copy_field(form, &mut payload, CATEGORY_ID_FIELD_NAME);
    payload
}

fn event_contract(form: &RawRecord, _ctx: &SubmitContext) -> RawRecord {
    let mut payload = RawRecord::new();
    copy_field(form, &mut payload, TITLE_FIELD_NAME);
    copy_string_as(form, &mut payload, DESCRIPTION_FIELD_NAME, DESCRIPTION_HTML_FIELD_NAME);
    copy_wire_datetime(form, &mut payload, START_AT_FIELD_NAME);
    copy_wire_datetime(form, &mut payload, END_AT_FIELD_NAME);
    copy_field(form, &mut payload, LOCATION_FIELD_NAME);
    copy_field(form, &mut payload, CAPACITY_FIELD_NAME);
    payload
}

fn survey_contract(form: &RawRecord, ctx: &SubmitContext) -> RawRecord {
    let mut payload = RawRecord::new();
    copy_field(form, &mut payload, QUESTION_FIELD_NAME);
    payload.insert(
        OPTIONS_FIELD_NAME.to_string(),
        Value::Array(
            survey_options(form, ctx)
                .into_iter()
                .map(Value::String)
                .collect(),
        ),
    );
    copy_wire_datetime(form, &mut payload, CLOSES_AT_FIELD_NAME);
    payload
}

fn alert_contract(form: &RawRecord, _ctx: &SubmitContext) -> RawRecord {
    let mut payload = RawRecord::new();
    copy_field(form, &mut payload, TITLE_FIELD_NAME);
    copy_string_as(form, &mut payload, MESSAGE_FIELD_NAME, MESSAGE_HTML_FIELD_NAME);
    copy_field(form, &mut payload, PRIORITY_FIELD_NAME);
    payload
}

fn advice_contract(form: &RawRecord, _ctx: &SubmitContext) -> RawRecord {
    let mut payload = RawRecord::new();
    copy_field(form, &mut payload, TITLE_FIELD_NAME);
    copy_string_as(form, &mut payload, MESSAGE_FIELD_NAME, MESSAGE_HTML_FIELD_NAME);
    payload
}

// cross-field validators

fn validate_event(form: &RawRecord, _ctx: &SubmitContext) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let start = record::timestamp_field(form, START_AT_FIELD_NAME);
    let end = record::timestamp_field(form, END_AT_FIELD_NAME);
    if has_value(form, START_AT_FIELD_NAME) && start.is_none() {
        errors.push(FieldError::new(START_AT_FIELD_NAME, "date invalide"));
    }
    if has_value(form, END_AT_FIELD_NAME) && end.is_none() {
        errors.push(FieldError::new(END_AT_FIELD_NAME, "date invalide"));
    }
    if let (Some(start), Some(end)) = (start, end) {
        if end <= start {
            errors.push(FieldError::new(
                END_AT_FIELD_NAME,
                "la fin doit être postérieure au début",
            ));
        }
    }
    errors
}

fn validate_survey(form: &RawRecord, ctx: &SubmitContext) -> Vec<FieldError> {
    if survey_options(form, ctx).len() < 2 {
        return vec![FieldError::new(
            OPTIONS_FIELD_NAME,
            "au moins deux réponses sont requises",
        )];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MemoryStorage, RecordingRemote, obj, session_for};
    use residences_common::IS_LOCAL_FIELD_NAME;
    use serde_json::json;

    fn pipeline_for(
        residences: &[&str],
    ) -> SubmissionPipeline<MemoryStorage, RecordingRemote> {
        let store = PublicationStore::open(
            MemoryStorage::default(),
            RecordingRemote::default(),
            session_for(residences),
        );
        SubmissionPipeline::new(store)
    }

    fn ids(raw: &[&str]) -> Vec<ResidenceId> {
        raw.iter().map(|id| ResidenceId::try_new(*id).unwrap()).collect()
    }

    #[test]
    fn post_submission_creates_record_with_mapped_payload() {
        let pipeline = pipeline_for(&["R1", "R2"]);
        let outcome = pipeline
            .submit(
                PublicationKind::Posts,
                obj(json!({
                    "title": "Hi",
                    "message": "body",
                    "categoryId": "CAT-001",
                    "publishAt": "2025-01-01 10:00:00",
                })),
                SubmitContext {
                    residence_ids: ids(&["R1"]),
                    status: "published".to_string(),
                    ..SubmitContext::default()
                },
            )
            .unwrap();

        assert!(outcome.message.contains("1 résidence"));
        let records = pipeline.store().get(PublicationKind::Posts, None);
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.get("residenceIds"), Some(&json!(["R1"])));
        assert_eq!(record.get("status"), Some(&json!("published")));
        assert_eq!(record.get("messageHtml"), Some(&json!("body")));
        assert_eq!(record.get("authorId"), Some(&json!("user-1")));
        assert!(record.get("message").is_none());
    }

    #[test]
    fn unauthorized_residences_abort_before_any_mutation() {
        let pipeline = pipeline_for(&["R1"]);
        let result = pipeline.submit(
            PublicationKind::Posts,
            obj(json!({"title": "Hi", "message": "body", "categoryId": "CAT-001"})),
            SubmitContext {
                residence_ids: ids(&["R1", "R9"]),
                ..SubmitContext::default()
            },
        );

        assert_eq!(result, Err(StoreError::UnauthorizedResidences));
        assert_eq!(pipeline.store().stats().total, 0);
    }

    #[test]
    fn unauthenticated_submit_is_rejected() {
        let store = PublicationStore::open(
            MemoryStorage::default(),
            RecordingRemote::default(),
            crate::domain::session::AuthSession::default(),
        );
        let pipeline = SubmissionPipeline::new(store);
        let result = pipeline.submit(
            PublicationKind::Posts,
            obj(json!({"title": "Hi"})),
            SubmitContext::default(),
        );
        assert_eq!(result, Err(StoreError::Unauthenticated));
    }

    #[test]
    fn missing_required_fields_are_aggregated() {
        let pipeline = pipeline_for(&["R1"]);
        let result = pipeline.submit(
            PublicationKind::Posts,
            obj(json!({"title": "  "})),
            SubmitContext {
                residence_ids: ids(&["R1"]),
                ..SubmitContext::default()
            },
        );

        match result {
            Err(StoreError::InvalidData(errors)) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["title", "message", "categoryId"]);
            }
            other => panic!("expected InvalidData, got {:?}", other),
        }
        assert_eq!(pipeline.store().stats().total, 0);
    }

    #[test]
    fn event_end_must_follow_start() {
        let pipeline = pipeline_for(&["R1"]);
        let result = pipeline.submit(
            PublicationKind::Events,
            obj(json!({
                "title": "Fête",
                "startAt": "2025-06-01 20:00:00",
                "endAt": "2025-06-01 18:00:00",
            })),
            SubmitContext {
                residence_ids: ids(&["R1"]),
                ..SubmitContext::default()
            },
        );

        match result {
            Err(StoreError::InvalidData(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "endAt");
            }
            other => panic!("expected InvalidData, got {:?}", other),
        }
    }

    #[test]
    fn survey_needs_two_non_blank_options() {
        let pipeline = pipeline_for(&["R1"]);
        let base_ctx = SubmitContext {
            residence_ids: ids(&["R1"]),
            poll_answers: vec!["Oui".to_string(), "   ".to_string()],
            ..SubmitContext::default()
        };
        let result = pipeline.submit(
            PublicationKind::Surveys,
            obj(json!({"question": "<p>Chats ?</p>"})),
            base_ctx.clone(),
        );
        assert!(matches!(result, Err(StoreError::InvalidData(_))));

        let result = pipeline.submit(
            PublicationKind::Surveys,
            obj(json!({"question": "<p>Chats ?</p>"})),
            SubmitContext {
                poll_answers: vec!["Oui".to_string(), "Non".to_string()],
                ..base_ctx
            },
        );
        assert!(result.is_ok());
        let records = pipeline.store().get(PublicationKind::Surveys, None);
        assert_eq!(records[0].get("options"), Some(&json!(["Oui", "Non"])));
    }

    #[test]
    fn publish_later_requires_a_parseable_date() {
        let pipeline = pipeline_for(&["R1"]);
        let result = pipeline.submit(
            PublicationKind::Posts,
            obj(json!({"title": "Hi", "message": "b", "categoryId": "C"})),
            SubmitContext {
                residence_ids: ids(&["R1"]),
                publish_later: true,
                publish_date_time: "bientôt".to_string(),
                ..SubmitContext::default()
            },
        );
        assert!(matches!(result, Err(StoreError::InvalidData(_))));

        let outcome = pipeline
            .submit(
                PublicationKind::Posts,
                obj(json!({"title": "Hi", "message": "b", "categoryId": "C"})),
                SubmitContext {
                    residence_ids: ids(&["R1"]),
                    publish_later: true,
                    publish_date_time: "2025-09-01 08:00:00".to_string(),
                    status: "scheduled".to_string(),
                    ..SubmitContext::default()
                },
            )
            .unwrap();
        assert!(outcome.message.contains("1 résidence"));

        let records = pipeline.store().get(PublicationKind::Posts, None);
        assert_eq!(records[0].get("publishAt"), Some(&json!("2025-09-01 08:00:00")));
        assert_eq!(records[0].get("publishLater"), Some(&json!(true)));
    }

    #[test]
    fn editing_updates_the_existing_record() {
        let pipeline = pipeline_for(&["R1"]);
        pipeline
            .submit(
                PublicationKind::Posts,
                obj(json!({"title": "v1", "message": "b", "categoryId": "C"})),
                SubmitContext {
                    residence_ids: ids(&["R1"]),
                    ..SubmitContext::default()
                },
            )
            .unwrap();
        let records = pipeline.store().get(PublicationKind::Posts, None);
        let id = record::record_id(&records[0]).unwrap();

        let outcome = pipeline
            .submit(
                PublicationKind::Posts,
                obj(json!({"title": "v2", "message": "b", "categoryId": "C"})),
                SubmitContext {
                    is_editing: true,
                    editing_id: Some(id.clone()),
                    residence_ids: ids(&["R1"]),
                    ..SubmitContext::default()
                },
            )
            .unwrap();

        assert_eq!(outcome.message, "Publication mise à jour");
        let records = pipeline.store().get(PublicationKind::Posts, None);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("title"), Some(&json!("v2")));
        assert!(record::bool_field(&records[0], IS_LOCAL_FIELD_NAME));
    }

    #[test]
    fn status_synonym_is_normalized_to_wire_token() {
        let pipeline = pipeline_for(&["R1"]);
        pipeline
            .submit(
                PublicationKind::Alerts,
                obj(json!({"title": "Panne", "message": "ascenseur", "priority": "high"})),
                SubmitContext {
                    residence_ids: ids(&["R1"]),
                    status: "Brouillon".to_string(),
                    ..SubmitContext::default()
                },
            )
            .unwrap();
        let records = pipeline.store().get(PublicationKind::Alerts, None);
        assert_eq!(records[0].get("status"), Some(&json!("draft")));
    }
}
