use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::error::{SentimentError, SentimentResult};
use super::types::{SentimentClass, SentimentTuple};

/// One text sent for classification. `id` is the text's digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItem {
    pub id: String,
    pub text: String,
}

/// A validated, clamped classification for one requested id.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedItem {
    pub id: String,
    pub sentiment: SentimentTuple,
}

/// External sentiment classification service.
pub trait SentimentClassifier: Send + Sync {
    /// Identifier recorded as the `source` of cache entries.
    fn model_id(&self) -> &str;

    /// Classifies one batch. Any malformed item fails the whole batch.
    fn classify(
        &self,
        batch: &[BatchItem],
    ) -> impl Future<Output = SentimentResult<Vec<ClassifiedItem>>> + Send;
}

/// HTTP classifier: POSTs the batch as a JSON array and parses a JSON array back.
#[derive(Clone)]
pub struct HttpSentimentClassifier {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
}

impl HttpSentimentClassifier {
    /// Creates a classifier. A missing or blank API key is rejected up front.
    pub fn new(
        url: impl Into<String>,
        api_key: Option<&str>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> SentimentResult<Self> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(SentimentError::MissingCredentials)?
            .to_string();
        let url = url.into();

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SentimentError::Request {
                url: url.clone(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url,
            api_key,
            model: model.into(),
        })
    }

    /// Returns the endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post_batch(&self, batch: &[BatchItem]) -> SentimentResult<String> {
        let request_err = |e: reqwest::Error| SentimentError::Request {
            url: self.url.clone(),
            message: e.to_string(),
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .query(&[("model", self.model.as_str())])
            .json(batch)
            .send()
            .await
            .map_err(request_err)?;

        let status = response.status();
        let body = response.text().await.map_err(request_err)?;

        if !status.is_success() {
            return Err(SentimentError::Status {
                status: status.as_u16(),
                body: truncate(&body, 512).to_string(),
            });
        }

        Ok(body)
    }
}

impl SentimentClassifier for HttpSentimentClassifier {
    fn model_id(&self) -> &str {
        &self.model
    }

    async fn classify(&self, batch: &[BatchItem]) -> SentimentResult<Vec<ClassifiedItem>> {
        debug!(url = %self.url, size = batch.len(), "Sending sentiment batch");
        let body = self.post_batch(batch).await?;
        parse_classifier_response(&body)
    }
}

impl std::fmt::Debug for HttpSentimentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSentimentClassifier")
            .field("url", &self.url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Parses and validates a classifier response.
///
/// Every item must carry a string `id` and numeric `polarity`, `intensity` and
/// `density` (numeric strings are accepted). A missing or unknown `sentiment_class`
/// becomes neutral. Values are clamped to their ranges.
pub fn parse_classifier_response(raw: &str) -> SentimentResult<Vec<ClassifiedItem>> {
    extract_json_array(raw)?
        .iter()
        .enumerate()
        .map(|(index, item)| parse_item(index, item))
        .collect()
}

/// Extracts a JSON array from model output.
///
/// Tries the raw text, then the first fenced `json` block, then the outermost
/// `[ ... ]` slice.
pub fn extract_json_array(raw: &str) -> SentimentResult<Vec<Value>> {
    let trimmed = raw.trim();

    let candidates = [
        Some(trimmed),
        fenced_json(trimmed),
        outer_brackets(trimmed),
    ];

    for candidate in candidates.into_iter().flatten() {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(candidate.trim()) {
            return Ok(items);
        }
    }

    Err(SentimentError::protocol(format!(
        "response is not a JSON array: {}",
        truncate(trimmed, 120)
    )))
}

fn fenced_json(text: &str) -> Option<&str> {
    const FENCE: &str = "```json";
    let start = text.to_ascii_lowercase().find(FENCE)? + FENCE.len();
    let end = text[start..].find("```")? + start;
    Some(&text[start..end])
}

fn outer_brackets(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

fn parse_item(index: usize, item: &Value) -> SentimentResult<ClassifiedItem> {
    let object = item
        .as_object()
        .ok_or_else(|| SentimentError::protocol(format!("item {index} is not an object")))?;

    let id = match object.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(SentimentError::protocol(format!("item {index} has no id"))),
    };

    let polarity = required_number(object, "polarity", &id)?;
    let intensity = required_number(object, "intensity", &id)?;
    let density = required_number(object, "density", &id)?;
    let sentiment_class = object
        .get("sentiment_class")
        .and_then(Value::as_str)
        .map(SentimentClass::parse_lenient)
        .unwrap_or_default();

    Ok(ClassifiedItem {
        id,
        sentiment: SentimentTuple::new(polarity, intensity, density, sentiment_class).clamped(),
    })
}

fn required_number(object: &Map<String, Value>, field: &str, id: &str) -> SentimentResult<f64> {
    let value = match object.get(field) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    value
        .filter(|v| v.is_finite())
        .ok_or_else(|| SentimentError::protocol(format!("item '{id}' has no numeric {field}")))
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
