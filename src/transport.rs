use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::{sleep, timeout};
use url::form_urlencoded;

use crate::{
    auth::{AuthStrategy, RequestView},
    ApiError, ClientError, ClientOptions, Result, RetryPolicy,
};

/// Per-call request options.
#[derive(Clone, Debug)]
pub struct RequestOptions {
    query: Vec<(String, Option<String>)>,
    json: Option<serde_json::Value>,
    content: Option<Vec<u8>>,
    headers: Vec<(String, String)>,
    parse_json: bool,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            query: Vec::new(),
            json: None,
            content: None,
            headers: Vec::new(),
            parse_json: true,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), Some(value.to_string())));
        self
    }

    /// Adds a query parameter; `None` values are left out of the URL.
    pub fn query_opt<V: ToString>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        self.query
            .push((key.into(), value.map(|value| value.to_string())));
        self
    }

    /// Sets a JSON body. Takes precedence over [`RequestOptions::content`]
    /// and implies `Content-Type: application/json` unless a header sets it.
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.json = Some(body);
        self
    }

    /// Serializes `body` as the JSON body.
    pub fn json_from<T: Serialize + ?Sized>(self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|err| ClientError::Auth(format!("request body is not serializable: {err}")))?;
        Ok(self.json(value))
    }

    /// Sets a raw binary body sent verbatim.
    pub fn content(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.content = Some(bytes.into());
        self
    }

    /// Adds a header that overrides configuration defaults.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Skips body decoding and returns [`Payload::Response`].
    pub fn raw_response(mut self) -> Self {
        self.parse_json = false;
        self
    }
}

/// Decoded result of a successful request.
#[derive(Debug)]
pub enum Payload {
    /// Empty response body.
    Null,
    Json(serde_json::Value),
    /// Body that is not valid JSON.
    Text(String),
    /// Unread response, returned when decoding is suppressed.
    Response(Response),
}

impl Payload {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Converts to a JSON value; text becomes a JSON string.
    pub fn into_json(self) -> Result<serde_json::Value> {
        match self {
            Self::Null => Ok(serde_json::Value::Null),
            Self::Json(value) => Ok(value),
            Self::Text(text) => Ok(serde_json::Value::String(text)),
            Self::Response(_) => Err(ClientError::Decode(
                "raw response payload has not been decoded".to_owned(),
            )),
        }
    }

    pub fn deserialize<T: DeserializeOwned>(self) -> Result<T> {
        let value = self.into_json()?;
        serde_json::from_value(value).map_err(|err| ClientError::Decode(err.to_string()))
    }

    pub fn into_response(self) -> Option<Response> {
        match self {
            Self::Response(response) => Some(response),
            _ => None,
        }
    }
}

/// Request body and addressing, fixed across attempts.
#[derive(Debug)]
struct PreparedRequest {
    url: String,
    path: String,
    body: Option<Vec<u8>>,
    headers: HeaderMap,
}

/// HTTP transport shared by the API clients.
///
/// Builds requests, injects auth headers, applies the retry policy and
/// normalizes failures into [`ClientError`]. Holds no mutable state, so one
/// instance can serve concurrent calls.
#[derive(Clone)]
pub struct Transport {
    http: reqwest::Client,
    options: Arc<ClientOptions>,
    retry: RetryPolicy,
    auth: Arc<dyn AuthStrategy>,
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("options", &self.options)
            .field("retry", &self.retry)
            .field("auth", &self.auth)
            .finish()
    }
}

impl Transport {
    pub fn new(options: ClientOptions, auth: impl AuthStrategy + 'static) -> Self {
        Self::with_shared_auth(options, Arc::new(auth))
    }

    pub fn with_shared_auth(options: ClientOptions, auth: Arc<dyn AuthStrategy>) -> Self {
        Self {
            http: reqwest::Client::new(),
            options: Arc::new(options),
            retry: RetryPolicy::default(),
            auth,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Uses a preconfigured `reqwest` client (proxies, TLS roots, ...).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Sends `method path` and decodes the response.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Payload> {
        let parse_json = options.parse_json;
        let prepared = self.prepare(path, options)?;
        let response = self.send_with_retry(&method, &prepared).await?;

        if !parse_json {
            return Ok(Payload::Response(response));
        }
        decode_response(response).await
    }

    fn prepare(&self, path: &str, options: RequestOptions) -> Result<PreparedRequest> {
        let RequestOptions {
            query,
            json,
            content,
            headers: call_headers,
            ..
        } = options;

        let path = build_path(path, &query);
        let url = format!("{}{}", self.options.base_url(), path);

        let mut headers = HeaderMap::new();
        for (name, value) in &self.options.default_headers {
            insert_header(&mut headers, name, value)?;
        }
        if !headers.contains_key(USER_AGENT) {
            insert_header(&mut headers, USER_AGENT.as_str(), &self.options.user_agent)?;
        }
        for (name, value) in &call_headers {
            insert_header(&mut headers, name, value)?;
        }

        let body = match (json, content) {
            (Some(json), _) => {
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                Some(json.to_string().into_bytes())
            }
            (None, Some(bytes)) => Some(bytes),
            (None, None) => None,
        };

        Ok(PreparedRequest {
            url,
            path,
            body,
            headers,
        })
    }

    async fn send_with_retry(
        &self,
        method: &Method,
        prepared: &PreparedRequest,
    ) -> Result<Response> {
        let policy = &self.retry;
        let retryable_method = policy.allows_method(method);

        for attempt in 1..=policy.attempts {
            let request = self.build_attempt(method, prepared).await?;

            #[cfg(feature = "tracing")]
            tracing::debug!(%method, url = %prepared.url, attempt, "sending request");

            match self.execute(request).await {
                Err(message) => {
                    if !retryable_method || attempt == policy.attempts {
                        return Err(ClientError::Transport(message));
                    }
                    let delay = policy.backoff_delay(attempt);
                    wait_before_retry(attempt, delay, &message).await;
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    if status < 400 {
                        return Ok(response);
                    }

                    if retryable_method && policy.allows_status(status) && attempt < policy.attempts
                    {
                        let retry_after = response
                            .headers()
                            .get(RETRY_AFTER)
                            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());
                        let delay = policy.retry_delay(attempt, retry_after.as_deref());
                        drop(response);
                        wait_before_retry(attempt, delay, &format!("status {status}")).await;
                        continue;
                    }

                    let err = api_error(response).await;
                    #[cfg(feature = "tracing")]
                    tracing::warn!(%method, url = %prepared.url, attempt, error = %err, "request failed");
                    return Err(err);
                }
            }
        }

        Err(ClientError::Transport(
            "All retry attempts exhausted".to_owned(),
        ))
    }

    /// Builds one attempt with freshly computed auth headers.
    async fn build_attempt(
        &self,
        method: &Method,
        prepared: &PreparedRequest,
    ) -> Result<reqwest::Request> {
        let body = prepared.body.as_deref().unwrap_or_default();
        let view = RequestView {
            method,
            url: &prepared.url,
            path: &prepared.path,
            body,
        };
        let auth_headers = self.auth.build_headers(&view).await?;

        let mut headers = prepared.headers.clone();
        for (name, value) in &auth_headers {
            insert_header(&mut headers, name, value)?;
        }

        let mut builder = self
            .http
            .request(method.clone(), &prepared.url)
            .headers(headers);
        if let Some(body) = &prepared.body {
            builder = builder.body(body.clone());
        }
        builder
            .build()
            .map_err(|err| ClientError::Auth(format!("invalid request: {err}")))
    }

    /// Runs one network call under the configured timeout. The timer is
    /// dropped with the future on every exit path.
    async fn execute(&self, request: reqwest::Request) -> std::result::Result<Response, String> {
        let limit = self.options.timeout;
        match timeout(limit, self.http.execute(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Err(describe_error(&err)),
            Err(_) => Err(format!(
                "request timed out after {} ms",
                limit.as_millis()
            )),
        }
    }
}

async fn wait_before_retry(attempt: u32, delay: Duration, reason: &str) {
    #[cfg(feature = "tracing")]
    tracing::debug!(
        attempt,
        delay_ms = delay.as_millis() as u64,
        reason,
        "retrying request"
    );
    #[cfg(not(feature = "tracing"))]
    let _ = (attempt, reason);

    if !delay.is_zero() {
        sleep(delay).await;
    }
}

/// Appends an encoded query string to `path`; unset values are skipped.
fn build_path(path: &str, query: &[(String, Option<String>)]) -> String {
    let mut path = if path.starts_with('/') {
        path.to_owned()
    } else {
        format!("/{path}")
    };

    let pairs: Vec<(&str, &str)> = query
        .iter()
        .filter_map(|(key, value)| value.as_deref().map(|value| (key.as_str(), value)))
        .collect();
    if pairs.is_empty() {
        return path;
    }

    let encoded = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    path.push(if path.contains('?') { '&' } else { '?' });
    path.push_str(&encoded);
    path
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) -> Result<()> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| ClientError::Auth(format!("invalid header name '{name}'")))?;
    let header_value = HeaderValue::from_str(value)
        .map_err(|_| ClientError::Auth(format!("invalid value for header '{name}'")))?;
    headers.insert(header_name, header_value);
    Ok(())
}

async fn decode_response(response: Response) -> Result<Payload> {
    let text = response
        .text()
        .await
        .map_err(|err| ClientError::Transport(describe_error(&err)))?;

    if text.is_empty() {
        return Ok(Payload::Null);
    }
    Ok(match serde_json::from_str(&text) {
        Ok(value) => Payload::Json(value),
        Err(_) => Payload::Text(text),
    })
}

/// Normalizes an error response. An unreadable body leaves the message empty.
async fn api_error(response: Response) -> ClientError {
    let status = response.status().as_u16();
    let headers = collect_headers(response.headers());
    let text = response.text().await.unwrap_or_default();
    ClientError::Api(ApiError::from_parts(status, headers, text))
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut collected: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        collected
            .entry(name.as_str().to_owned())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    collected
}

fn describe_error(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
    use serde_json::json;

    use super::{build_path, collect_headers, Payload, RequestOptions, Transport};
    use crate::{auth::AnonymousAuth, ClientOptions, DEFAULT_USER_AGENT};

    fn transport(options: ClientOptions) -> Transport {
        Transport::new(options, AnonymousAuth)
    }

    #[test]
    fn empty_query_leaves_bare_path() {
        assert_eq!(build_path("/items", &[]), "/items");
        assert_eq!(
            build_path("/items", &[("skip".to_owned(), None)]),
            "/items"
        );
        assert_eq!(build_path("items", &[]), "/items");
    }

    #[test]
    fn query_is_encoded_and_unset_values_skipped() {
        let query = vec![
            ("limit".to_owned(), Some("2".to_owned())),
            ("cursor".to_owned(), None),
            ("q".to_owned(), Some("a b&c".to_owned())),
        ];
        assert_eq!(build_path("/items", &query), "/items?limit=2&q=a+b%26c");
        assert_eq!(
            build_path("/items?x=1", &query[..1]),
            "/items?x=1&limit=2"
        );
    }

    #[test]
    fn header_priority_defaults_then_user_agent_then_call() {
        let options = ClientOptions::new("https://api.example.com")
            .unwrap()
            .with_default_header("X-Tenant", "acme")
            .with_default_header("X-Trace", "default");
        let prepared = transport(options)
            .prepare(
                "/items",
                RequestOptions::new().header("x-trace", "call"),
            )
            .unwrap();

        assert_eq!(prepared.url, "https://api.example.com/items");
        assert_eq!(prepared.headers["x-tenant"], "acme");
        assert_eq!(prepared.headers["x-trace"], "call");
        assert_eq!(prepared.headers[USER_AGENT], DEFAULT_USER_AGENT);
        assert!(prepared.body.is_none());
    }

    #[test]
    fn default_user_agent_header_is_kept() {
        let options = ClientOptions::new("https://api.example.com")
            .unwrap()
            .with_default_header("User-Agent", "configured/2");
        let prepared = transport(options)
            .prepare("/", RequestOptions::new())
            .unwrap();
        assert_eq!(prepared.headers[USER_AGENT], "configured/2");
    }

    #[test]
    fn json_body_wins_over_content_and_sets_content_type() {
        let options = ClientOptions::new("https://api.example.com").unwrap();
        let prepared = transport(options)
            .prepare(
                "/items",
                RequestOptions::new()
                    .content(b"raw".to_vec())
                    .json(json!({"name": "x"})),
            )
            .unwrap();
        assert_eq!(prepared.body.as_deref(), Some(&br#"{"name":"x"}"#[..]));
        assert_eq!(prepared.headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn explicit_content_type_is_preserved() {
        let options = ClientOptions::new("https://api.example.com").unwrap();
        let prepared = transport(options)
            .prepare(
                "/items",
                RequestOptions::new()
                    .header("Content-Type", "application/merge-patch+json")
                    .json(json!({})),
            )
            .unwrap();
        assert_eq!(
            prepared.headers[CONTENT_TYPE],
            "application/merge-patch+json"
        );
    }

    #[test]
    fn raw_content_is_sent_verbatim_without_content_type() {
        let options = ClientOptions::new("https://api.example.com").unwrap();
        let prepared = transport(options)
            .prepare("/upload", RequestOptions::new().content(vec![0u8, 159, 146]))
            .unwrap();
        assert_eq!(prepared.body, Some(vec![0u8, 159, 146]));
        assert!(!prepared.headers.contains_key(CONTENT_TYPE));
    }

    #[test]
    fn invalid_header_is_a_construction_error() {
        let options = ClientOptions::new("https://api.example.com").unwrap();
        let err = transport(options)
            .prepare("/", RequestOptions::new().header("bad header", "x"))
            .unwrap_err();
        assert!(err.is_auth());
    }

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        headers.insert("x-request-id", HeaderValue::from_static("r1"));

        let collected = collect_headers(&headers);
        assert_eq!(collected["set-cookie"], "a=1, b=2");
        assert_eq!(collected["x-request-id"], "r1");
    }

    #[test]
    fn payload_conversions() {
        assert!(Payload::Null.is_null());
        assert_eq!(Payload::Null.into_json().unwrap(), json!(null));
        assert_eq!(
            Payload::Text("plain".to_owned()).into_json().unwrap(),
            json!("plain")
        );
        let parsed: Vec<u32> = Payload::Json(json!([1, 2])).deserialize().unwrap();
        assert_eq!(parsed, vec![1, 2]);
        let err = Payload::Json(json!({"a": 1}))
            .deserialize::<Vec<u32>>()
            .unwrap_err();
        assert!(matches!(err, crate::ClientError::Decode(_)));
    }
}
