use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::input::{InputSource, Payload, IMAGE_INPUT_ID, STYLE_INPUT_ID};
use super::render::{OutputSink, Rendered};

pub const ANALYZE_PATH: &str = "/analyze-page";
pub const NO_NOTES_TEXT: &str = "No notes returned";
pub const FALLBACK_ERROR_TEXT: &str = "Something went wrong.";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid endpoint {0}")]
    Endpoint(String),
}

/// Every response shape `/analyze-page` may answer with.
#[derive(Debug, Default, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub notes: Option<Vec<Value>>,
    #[serde(default, deserialize_with = "present")]
    pub data: Option<Value>,
    #[serde(default)]
    pub detail: Option<Value>,
}

/// A key that is present maps to `Some`, even when its value is `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Posts the form to `/analyze-page` and renders the outcome.
///
/// Overlapping submissions race: only the newest one renders its result,
/// older completions are dropped.
pub struct Submitter {
    http: Client,
    endpoint: Url,
    latest: AtomicU64,
}

impl Submitter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SubmitError> {
        let http = Client::builder().timeout(timeout).build()?;
        Self::with_client(http, base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, SubmitError> {
        let base = Url::parse(base_url)
            .map_err(|e| SubmitError::Endpoint(format!("{}: {}", base_url, e)))?;
        let endpoint = base
            .join(ANALYZE_PATH)
            .map_err(|e| SubmitError::Endpoint(format!("{}: {}", base_url, e)))?;
        Ok(Submitter {
            http,
            endpoint,
            latest: AtomicU64::new(0),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Runs one submission. Never fails: every error ends up rendered.
    pub async fn submit(&self, inputs: &dyn InputSource, sink: &dyn OutputSink) -> Rendered {
        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        sink.render(&Rendered::Pending);

        let payload = Payload::collect(inputs);
        let rendered = match self.send(payload).await {
            Ok(rendered) => rendered,
            Err(err) => {
                warn!(error = %err, "submission failed");
                Rendered::Error(format!("Network or parse error: {}", err))
            }
        };

        if self.latest.load(Ordering::SeqCst) == ticket {
            sink.render(&rendered);
        } else {
            debug!(ticket, "newer submission started, dropping result");
        }
        rendered
    }

    async fn send(&self, payload: Payload) -> Result<Rendered, SubmitError> {
        let request = self.http.post(self.endpoint.clone());
        let request = match payload {
            Payload::Json(query) => {
                info!(url = %query.url, "submitting page url");
                request.json(&query)
            }
            Payload::Form { image, style } => {
                info!(file = %image.file_name, %style, "submitting page upload");
                let part = Part::bytes(image.bytes)
                    .file_name(image.file_name)
                    .mime_str(&image.content_type)?;
                request.multipart(Form::new().part(IMAGE_INPUT_ID, part).text(STYLE_INPUT_ID, style))
            }
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        debug!(status = status.as_u16(), len = body.len(), "response received");
        render_response(status.is_success(), &body)
    }
}

/// Turns a settled response into what the output region shows.
pub fn render_response(success: bool, body: &[u8]) -> Result<Rendered, SubmitError> {
    if !success {
        let detail = serde_json::from_slice::<ResponseEnvelope>(body)
            .ok()
            .and_then(|envelope| envelope.detail)
            .and_then(|detail| detail.as_str().map(str::to_string))
            .filter(|detail| !detail.is_empty());
        let message = detail.as_deref().unwrap_or(FALLBACK_ERROR_TEXT);
        return Ok(Rendered::Error(format!("Error: {}", message)));
    }

    let envelope: ResponseEnvelope = serde_json::from_slice(body)?;

    if let Some(data) = envelope.data {
        // `data` may arrive JSON-encoded a second time
        let data = match data {
            Value::String(encoded) => serde_json::from_str(&encoded)?,
            other => other,
        };
        return Ok(Rendered::Json(serde_json::to_string_pretty(&data)?));
    }

    let notes = match envelope.notes {
        Some(notes) => notes
            .into_iter()
            .map(|note| match note {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        None => vec![NO_NOTES_TEXT.to_string()],
    };
    Ok(Rendered::Notes(notes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error(s: &str) -> Rendered {
        Rendered::Error(s.to_string())
    }

    fn json(s: &str) -> Rendered {
        Rendered::Json(s.to_string())
    }

    #[test]
    fn notes_keep_count_and_order() {
        let out = render_response(true, br#"{"notes":["one","two","three"]}"#).unwrap();
        assert_eq!(out, Rendered::Notes(vec!["one".into(), "two".into(), "three".into()]));
    }

    #[test]
    fn missing_notes_gets_placeholder() {
        let out = render_response(true, br#"{"model":"m"}"#).unwrap();
        assert_eq!(out, Rendered::Notes(vec![NO_NOTES_TEXT.into()]));
    }

    #[test]
    fn empty_notes_stay_empty() {
        let out = render_response(true, br#"{"notes":[]}"#).unwrap();
        assert_eq!(out, Rendered::Notes(Vec::new()));
    }

    #[test]
    fn detail_is_shown_on_failure() {
        let out = render_response(false, br#"{"detail":"Bad URL"}"#).unwrap();
        assert_eq!(out, error("Error: Bad URL"));
    }

    #[test]
    fn failure_without_detail_uses_fallback() {
        assert_eq!(render_response(false, b"{}").unwrap(), error("Error: Something went wrong."));
        assert_eq!(
            render_response(false, b"<html>502</html>").unwrap(),
            error("Error: Something went wrong.")
        );
        assert_eq!(
            render_response(false, br#"{"detail":""}"#).unwrap(),
            error("Error: Something went wrong.")
        );
    }

    #[test]
    fn failure_body_is_not_read_as_success() {
        let out = render_response(false, br#"{"notes":["stale"],"detail":"nope"}"#).unwrap();
        assert_eq!(out, error("Error: nope"));
    }

    #[test]
    fn string_data_is_decoded_before_display() {
        let out = render_response(true, br#"{"data":"{\"a\":1}"}"#).unwrap();
        assert_eq!(out, json("{\n  \"a\": 1\n}"));
    }

    #[test]
    fn structured_data_is_displayed_directly() {
        let out = render_response(true, br#"{"data":{"a":1}}"#).unwrap();
        assert_eq!(out, json("{\n  \"a\": 1\n}"));
    }

    #[test]
    fn null_data_is_displayed_not_replaced_by_notes() {
        let out = render_response(true, br#"{"data":null}"#).unwrap();
        assert_eq!(out, json("null"));
    }

    #[test]
    fn undecodable_data_string_is_a_parse_error() {
        let err = render_response(true, br#"{"data":"not json"}"#).unwrap_err();
        assert!(matches!(err, SubmitError::Decode(_)));
    }

    #[test]
    fn non_json_success_body_is_a_parse_error() {
        assert!(matches!(render_response(true, b"ok"), Err(SubmitError::Decode(_))));
    }

    #[test]
    fn endpoint_is_fixed_path() {
        let submitter = Submitter::new("http://127.0.0.1:3000/app/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(submitter.endpoint().as_str(), "http://127.0.0.1:3000/analyze-page");
        assert!(Submitter::new("nowhere", DEFAULT_TIMEOUT).is_err());
    }
}
