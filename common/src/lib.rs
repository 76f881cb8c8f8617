mod domain;

// Stored record field names shared by every publication kind

pub const ID_FIELD_NAME: &'static str = "id";
pub const STATUS_FIELD_NAME: &'static str = "status";
pub const CREATED_FIELD_NAME: &'static str = "createdAt";
pub const PUBLICATION_DATE_FIELD_NAME: &'static str = "publicationDate";
pub const PUBLISH_AT_FIELD_NAME: &'static str = "publishAt";
pub const PUBLISH_LATER_FIELD_NAME: &'static str = "publishLater";
pub const PUBLISH_DATE_TIME_FIELD_NAME: &'static str = "publishDateTime";
pub const RESIDENCE_IDS_FIELD_NAME: &'static str = "residenceIds";
pub const AUTHOR_FIELD_NAME: &'static str = "authorId";

// Internal bookkeeping fields, never exposed to business logic

pub const IS_LOCAL_FIELD_NAME: &'static str = "_isLocal";
pub const DELETED_FIELD_NAME: &'static str = "_deleted";

// Kind-specific payload fields

pub const TITLE_FIELD_NAME: &'static str = "title";
pub const MESSAGE_FIELD_NAME: &'static str = "message";
pub const MESSAGE_HTML_FIELD_NAME: &'static str = "messageHtml";
pub const DESCRIPTION_FIELD_NAME: &'static str = "description";
pub const DESCRIPTION_HTML_FIELD_NAME: &'static str = "descriptionHtml";
pub const QUESTION_FIELD_NAME: &'static str = "question";
pub const OPTIONS_FIELD_NAME: &'static str = "options";
pub const CLOSES_AT_FIELD_NAME: &'static str = "closesAt";
pub const CATEGORY_ID_FIELD_NAME: &'static str = "categoryId";
pub const PRIORITY_FIELD_NAME: &'static str = "priority";
pub const LOCATION_FIELD_NAME: &'static str = "location";
pub const CAPACITY_FIELD_NAME: &'static str = "capacity";
pub const START_AT_FIELD_NAME: &'static str = "startAt";
pub const END_AT_FIELD_NAME: &'static str = "endAt";

// Legacy field names still found in older stored records

pub const LEGACY_START_DATE_FIELD_NAME: &'static str = "startDate";
pub const LEGACY_END_DATE_FIELD_NAME: &'static str = "endDate";
pub const LEGACY_EVENT_DATE_FIELD_NAME: &'static str = "eventDate";
pub const LEGACY_EVENT_TIME_FIELD_NAME: &'static str = "eventTime";
pub const LEGACY_TARGET_RESIDENCES_FIELD_NAME: &'static str = "targetResidences";
pub const LEGACY_RESIDENCE_FIELD_NAME: &'static str = "residence_id";
pub const LEGACY_CATEGORY_FIELD_NAME: &'static str = "category";
pub const LEGACY_PLACE_FIELD_NAME: &'static str = "place";

// expose domain module

pub use domain::*;
