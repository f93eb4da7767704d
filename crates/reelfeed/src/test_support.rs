//! Local HTTP server for exercising the reqwest-backed collaborators.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::{Body, Bytes, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::{StreamExt, stream};
use parking_lot::Mutex;

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Debug, Clone)]
struct Route {
    status: StatusCode,
    body: String,
    /// Wait before answering
    delay: Duration,
    /// Send the body, then keep the response open without ending it
    stall: bool,
}

impl Route {
    fn new(status: StatusCode, body: String) -> Self {
        Self {
            status,
            body,
            delay: Duration::ZERO,
            stall: false,
        }
    }
}

#[derive(Default)]
struct ServerState {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

pub struct TestServer {
    base: String,
    state: Arc<ServerState>,
}

impl TestServer {
    pub async fn start() -> Self {
        let state = Arc::new(ServerState::default());
        let app = Router::new().fallback(serve).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test server");
        let addr = listener.local_addr().expect("test server address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("test server");
        });

        Self {
            base: format!("http://{addr}"),
            state,
        }
    }

    /// Serve `body` with `200 OK` at `path`.
    pub fn route(&self, path: &str, body: impl Into<String>) -> &Self {
        self.route_with_status(path, StatusCode::OK, body)
    }

    pub fn route_with_status(&self, path: &str, status: StatusCode, body: impl Into<String>) -> &Self {
        self.insert(path, Route::new(status, body.into()))
    }

    /// Answer `200 OK` at `path` only after `delay`.
    pub fn route_delayed(&self, path: &str, delay: Duration, body: impl Into<String>) -> &Self {
        self.insert(
            path,
            Route {
                delay,
                ..Route::new(StatusCode::OK, body.into())
            },
        )
    }

    /// Send `body` at `path` and never finish the response.
    pub fn route_stalled(&self, path: &str, body: impl Into<String>) -> &Self {
        self.insert(
            path,
            Route {
                stall: true,
                ..Route::new(StatusCode::OK, body.into())
            },
        )
    }

    fn insert(&self, path: &str, route: Route) -> &Self {
        self.state.routes.lock().insert(path.to_string(), route);
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state
            .requests
            .lock()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }
}

async fn serve(State(state): State<Arc<ServerState>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, usize::MAX).await.unwrap_or_default();
    let path = parts.uri.path().to_string();

    state.requests.lock().push(RecordedRequest {
        method: parts.method,
        path: path.clone(),
        query: parts.uri.query().map(str::to_string),
        headers: parts.headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    let Some(route) = state.routes.lock().get(&path).cloned() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if !route.delay.is_zero() {
        tokio::time::sleep(route.delay).await;
    }
    if route.stall {
        let chunks = stream::iter([Ok::<_, std::io::Error>(Bytes::from(route.body))])
            .chain(stream::pending());
        return (route.status, Body::from_stream(chunks)).into_response();
    }
    (route.status, route.body).into_response()
}
