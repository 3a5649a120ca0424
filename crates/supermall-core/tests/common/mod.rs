//! In-process HTTP backend for integration tests.
//!
//! Every request is recorded. Responses are looked up by method and path;
//! unknown routes answer 404 `{"error": "Not found"}`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::Router;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    /// Path and query, e.g. `/api/products?category=Books`
    pub uri: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }
}

#[derive(Clone)]
struct Canned {
    status: StatusCode,
    body: String,
}

#[derive(Default)]
struct Shared {
    routes: Mutex<HashMap<(Method, String), Canned>>,
    requests: Mutex<Vec<Recorded>>,
}

pub struct MockBackend {
    addr: std::net::SocketAddr,
    shared: Arc<Shared>,
    handle: JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let shared = Arc::new(Shared::default());
        let app = Router::new()
            .fallback(handle_request)
            .with_state(Arc::clone(&shared));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            shared,
            handle,
        }
    }

    /// Base URL of the marketplace API, i.e. with the `/api` prefix.
    pub fn api_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Root URL without any prefix.
    pub fn root_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer `method path` (path without query) with JSON.
    pub fn respond(&self, method: Method, path: &str, status: u16, body: Value) {
        self.respond_raw(method, path, status, &body.to_string());
    }

    pub fn respond_raw(&self, method: Method, path: &str, status: u16, body: &str) {
        self.shared.routes.lock().insert(
            (method, path.to_string()),
            Canned {
                status: StatusCode::from_u16(status).unwrap(),
                body: body.to_string(),
            },
        );
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.shared.requests.lock().clone()
    }

    pub fn last_request(&self) -> Recorded {
        self.requests().pop().expect("no request was recorded")
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_request(
    State(shared): State<Arc<Shared>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let canned = shared
        .routes
        .lock()
        .get(&(method.clone(), uri.path().to_string()))
        .cloned();

    shared.requests.lock().push(Recorded {
        method,
        uri: uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string()),
        headers,
        body,
    });

    let Canned { status, body } = canned.unwrap_or(Canned {
        status: StatusCode::NOT_FOUND,
        body: r#"{"error":"Not found"}"#.to_string(),
    });
    (status, [(header::CONTENT_TYPE, "application/json")], body)
}

/// A base URL nothing is listening on.
pub fn unused_api_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/api", port)
}
