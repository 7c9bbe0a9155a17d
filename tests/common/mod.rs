#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::Value as JsonValue;

#[derive(Clone)]
pub struct MockResponse {
    status: StatusCode,
    body: String,
    headers: Vec<(String, String)>,
    delay: Duration,
}

impl MockResponse {
    pub fn json(status: u16, body: JsonValue) -> Self {
        Self::text(status, body.to_string())
            .with_header("content-type", "application/json")
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status: StatusCode::from_u16(status).expect("valid status code"),
            body: body.into(),
            headers: Vec::new(),
            delay: Duration::from_millis(0),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self::text(status, "")
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request as seen by the mock server.
#[derive(Clone, Debug)]
pub struct Captured {
    pub method: Method,
    /// Path and query string.
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Clone)]
struct MockState {
    queue: Arc<Mutex<VecDeque<MockResponse>>>,
    routes: Arc<HashMap<String, MockResponse>>,
    requests: Arc<Mutex<Vec<Captured>>>,
    hits: Arc<AtomicUsize>,
}

async fn handler(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let target = uri
        .path_and_query()
        .map(|value| value.as_str().to_owned())
        .unwrap_or_else(|| uri.path().to_owned());
    state
        .requests
        .lock()
        .expect("request log mutex must not be poisoned")
        .push(Captured {
            method: method.clone(),
            uri: target,
            headers,
            body: body.to_vec(),
        });

    let route_key = format!("{} {}", method, uri.path());
    let response = match state.routes.get(&route_key) {
        Some(response) => response.clone(),
        None => state
            .queue
            .lock()
            .expect("response queue mutex must not be poisoned")
            .pop_front()
            .unwrap_or_else(|| MockResponse::text(500, "no mock response available")),
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    let mut headers = HeaderMap::new();
    for (name, value) in &response.headers {
        headers.append(
            HeaderName::from_bytes(name.as_bytes()).expect("valid header name"),
            HeaderValue::from_str(value).expect("valid header value"),
        );
    }
    (response.status, headers, response.body).into_response()
}

pub struct TestServer {
    pub base_url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Captured>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.requests
            .lock()
            .expect("request log mutex must not be poisoned")
            .clone()
    }

    pub fn last_request(&self) -> Captured {
        self.requests()
            .pop()
            .expect("at least one request must have been captured")
    }
}

/// Serves `responses` in order, one per request.
pub async fn spawn_server(responses: Vec<MockResponse>) -> TestServer {
    spawn_server_with_routes(responses, Vec::new()).await
}

/// Like [`spawn_server`], but `"METHOD /path"` routes always answer with a
/// fixed response and take priority over the queue.
pub async fn spawn_server_with_routes(
    responses: Vec<MockResponse>,
    routes: Vec<(&str, MockResponse)>,
) -> TestServer {
    let state = MockState {
        queue: Arc::new(Mutex::new(responses.into())),
        routes: Arc::new(
            routes
                .into_iter()
                .map(|(route, response)| (route.to_owned(), response))
                .collect(),
        ),
        requests: Arc::new(Mutex::new(Vec::new())),
        hits: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new().fallback(handler).with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url: format!("http://{address}"),
        hits: state.hits,
        requests: state.requests,
        task,
    }
}

/// An address nothing listens on.
pub async fn closed_address() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind probe listener");
    let address = listener.local_addr().expect("must have local addr");
    drop(listener);
    format!("http://{address}")
}
