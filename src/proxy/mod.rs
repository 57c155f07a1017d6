//! Forwarding of task and annotation operations to the upstream API.
//!
//! Each operation validates its inputs locally, sends one JSON request to the
//! upstream service and hands back the upstream status with the parsed body.
//!
//! ```text
//! get_user_tasks      POST {base}/get-user-tasks   {contact_number}
//! create              POST {base}/create           {filename}
//! append              POST {base}/append           {filename, data}
//! get_bounding_boxes  GET  {base}/get/{name}
//! ```
//!
//! There are no timeouts or retries. A body that is not JSON is turned into a
//! synthesized 500 payload carrying the raw text.

use http::StatusCode;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use crate::error::ProxyError;
use crate::store::{file_name_from_url, normalize, NormalizePolicy, JSON_SUFFIX};

/// Error text used when the upstream body does not parse as JSON.
pub const INVALID_JSON_ERROR: &str = "Invalid JSON response from API";

/// A response relayed from the upstream service.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: Value,
}

impl UpstreamReply {
    /// Build a reply from a raw upstream status and body text.
    pub fn from_text(status: StatusCode, text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(body) => Self { status, body },
            Err(_) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: json!({ "error": INVALID_JSON_ERROR, "content": text }),
            },
        }
    }
}

/// HTTP client for the upstream annotation API.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: Url,
}

impl UpstreamClient {
    /// Create a client for the API rooted at `base_url`.
    pub fn new(base_url: &str) -> Result<Self, ProxyError> {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, ProxyError> {
        let invalid = |reason: String| ProxyError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason,
        };

        let parsed = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(invalid("not a hierarchical URL".to_string()));
        }
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
        }

        Ok(Self {
            client,
            base_url: parsed,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST {base}/get-user-tasks`.
    ///
    /// The contact number may arrive as a string or a number; it is always
    /// forwarded as a string.
    pub async fn get_user_tasks(
        &self,
        contact_number: Option<&Value>,
    ) -> Result<UpstreamReply, ProxyError> {
        let contact_number = contact_number
            .and_then(contact_number_text)
            .ok_or_else(|| ProxyError::InvalidRequest("Contact number is required".to_string()))?;

        self.post(
            &["get-user-tasks"],
            &json!({ "contact_number": contact_number }),
        )
        .await
    }

    /// `POST {base}/create`.
    pub async fn create(&self, filename: Option<&str>) -> Result<UpstreamReply, ProxyError> {
        let filename = filename
            .filter(|f| !f.is_empty())
            .ok_or_else(|| ProxyError::InvalidRequest("Filename is required".to_string()))?;

        self.post(&["create"], &json!({ "filename": filename })).await
    }

    /// `POST {base}/append`.
    ///
    /// The upstream keys files by bare name, so the `.json` suffix is dropped.
    /// Every record must carry a selector and a label; one bad record rejects
    /// the whole batch.
    pub async fn append(
        &self,
        filename: Option<&str>,
        data: Option<Value>,
    ) -> Result<UpstreamReply, ProxyError> {
        let missing = || ProxyError::InvalidRequest("Filename and data are required".to_string());

        let name = filename.map(file_name_from_url).unwrap_or_default();
        let name = name.strip_suffix(JSON_SUFFIX).unwrap_or(&name);
        if name.is_empty() {
            return Err(missing());
        }

        let records = match data {
            Some(Value::Array(records)) if !records.is_empty() => records,
            _ => return Err(missing()),
        };

        let normalized = records
            .into_iter()
            .map(|record| {
                normalize(record, NormalizePolicy::upstream())
                    .map(|annotation| Value::Object(annotation.into_record()))
                    .map_err(|_| {
                        ProxyError::InvalidRequest(
                            "Selector and label are required in each annotation".to_string(),
                        )
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.post(&["append"], &json!({ "filename": name, "data": normalized }))
            .await
    }

    /// `GET {base}/get/{name}`, with `name` the JSON file name minus `.json`.
    pub async fn get_bounding_boxes(
        &self,
        json_name: Option<&str>,
    ) -> Result<UpstreamReply, ProxyError> {
        let json_name = json_name.filter(|n| !n.is_empty()).ok_or_else(|| {
            ProxyError::InvalidRequest("json_name parameter is required".to_string())
        })?;
        let name = json_name.strip_suffix(JSON_SUFFIX).unwrap_or(json_name);

        let response = self
            .client
            .get(self.endpoint(&["get", name]))
            .header(http::header::ACCEPT, "application/json")
            .send()
            .await?;

        Self::relay(response).await
    }

    /// Send a plain GET to the base URL and return the status.
    pub async fn probe(&self) -> Result<StatusCode, ProxyError> {
        let response = self.client.get(self.base_url.clone()).send().await?;
        Ok(response.status())
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // Checked in the constructor
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn post(&self, segments: &[&str], body: &Value) -> Result<UpstreamReply, ProxyError> {
        let response = self
            .client
            .post(self.endpoint(segments))
            .json(body)
            .send()
            .await?;

        Self::relay(response).await
    }

    async fn relay(response: reqwest::Response) -> Result<UpstreamReply, ProxyError> {
        let status = response.status();
        let url = response.url().clone();
        let text = response.text().await?;

        debug!(url = %url, status = status.as_u16(), body = %text, "Upstream response");
        Ok(UpstreamReply::from_text(status, &text))
    }
}

/// Text form of a submitted contact number.
fn contact_number_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
