use residences_common::record::RawRecord;
use residences_common::{DELETED_FIELD_NAME, PublicationKind};
use serde_json::Value;

use crate::domain::error::RemoteError;
use crate::domain::{RemoteAck, RemoteApi};

/// Client for the remote content API.
///
/// Create: `POST /api/{type}`, body a single-element array.
/// Update: `POST /api/{type}/{id}`, same body shape.
/// Delete: `POST /api/{type}/{id}` with a `{"_deleted": true}` marker.
/// Any 2xx counts as success; everything else is reported as a
/// [`RemoteError`] for the store to log and retry.
#[derive(Debug, Clone)]
pub struct ContentApiClient {
    http: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl ContentApiClient {
    pub fn new(base_url: &str, access_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    async fn post(&self, path: String, body: Value) -> Result<RemoteAck, RemoteError> {
        let mut request = self.http.post(format!("{}{path}", self.base_url)).json(&body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|cause| RemoteError::Network(cause.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status(status.as_u16()));
        }

        // The server usually echoes the stored record; pick up an assigned
        // id when one comes back.
        let id = response
            .json::<Value>()
            .await
            .ok()
            .as_ref()
            .and_then(extract_id);
        Ok(RemoteAck { id })
    }
}

fn extract_id(body: &Value) -> Option<String> {
    let first = match body {
        Value::Array(items) => items.first()?,
        other => other,
    };
    match first.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

impl RemoteApi for ContentApiClient {
    async fn create(
        &self,
        kind: PublicationKind,
        payload: &RawRecord,
    ) -> Result<RemoteAck, RemoteError> {
        self.post(
            format!("/api/{}", kind.as_bucket()),
            Value::Array(vec![Value::Object(payload.clone())]),
        )
        .await
    }

    async fn update(
        &self,
        kind: PublicationKind,
        id: &str,
        payload: &RawRecord,
    ) -> Result<RemoteAck, RemoteError> {
        self.post(
            format!("/api/{}/{}", kind.as_bucket(), id),
            Value::Array(vec![Value::Object(payload.clone())]),
        )
        .await
    }

    async fn delete(&self, kind: PublicationKind, id: &str) -> Result<RemoteAck, RemoteError> {
        let mut marker = RawRecord::new();
        marker.insert(DELETED_FIELD_NAME.to_string(), Value::Bool(true));
        self.post(
            format!("/api/{}/{}", kind.as_bucket(), id),
            Value::Object(marker),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_id_reads_first_array_element() {
        assert_eq!(
            extract_id(&json!([{"id": "srv-7", "title": "t"}])),
            Some("srv-7".to_string())
        );
    }

    #[test]
    fn extract_id_coerces_numeric_ids() {
        assert_eq!(extract_id(&json!({"id": 12})), Some("12".to_string()));
    }

    #[test]
    fn extract_id_handles_bodies_without_one() {
        assert_eq!(extract_id(&json!([])), None);
        assert_eq!(extract_id(&json!({"ok": true})), None);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ContentApiClient::new("http://api.test/", None);
        assert_eq!(client.base_url, "http://api.test");
    }
}
