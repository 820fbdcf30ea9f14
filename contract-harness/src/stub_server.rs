//! A local stand-in for the System Under Test.
//!
//! Serves canned responses per `(method, path)` on an ephemeral port and
//! records every request it receives, so scenarios can be exercised without
//! the remote service.

use crate::{
    data::{Headers, Method},
    error::{Error, Result},
    normalizer::extract_headers,
};
use hyper::{
    body,
    header::{HeaderName, HeaderValue},
    service::{make_service_fn, service_fn},
    Body, HeaderMap, Request, Response, Server,
};
use serde_json::{json, Value};
use std::{
    collections::{HashMap, VecDeque},
    convert::Infallible,
    io,
    net::SocketAddr,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::{sync::oneshot, task::JoinHandle};

#[derive(Debug, Clone, PartialEq)]
pub struct StubResponse {
    pub status_code: u16,
    pub headers: Headers,
    pub body: String,
    pub delay: Option<Duration>,
}

impl StubResponse {
    pub fn json(status_code: u16, body: Value) -> Self {
        let mut headers = Headers::new();
        headers.insert("content-type", "application/json");
        Self {
            status_code,
            headers,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn text<S: Into<String>>(status_code: u16, body: S) -> Self {
        let mut headers = Headers::new();
        headers.insert("content-type", "text/plain");
        Self {
            status_code,
            headers,
            body: body.into(),
            delay: None,
        }
    }

    pub fn empty(status_code: u16) -> Self {
        Self {
            status_code,
            headers: Headers::new(),
            body: String::new(),
            delay: None,
        }
    }

    pub fn with_header<S1: AsRef<str>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: Headers,
    pub body: String,
}

/// Canned responses keyed by method and path (query string excluded).
///
/// Responses for one route are served in order; the last one repeats.
#[derive(Debug, Default, Clone)]
pub struct StubRoutes {
    routes: HashMap<(String, String), VecDeque<StubResponse>>,
}

impl StubRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<S: Into<String>>(
        mut self,
        method: Method,
        path: S,
        response: StubResponse,
    ) -> Self {
        self.push(method, path, response);
        self
    }

    fn push<S: Into<String>>(&mut self, method: Method, path: S, response: StubResponse) {
        self.routes
            .entry((method.as_str().into(), path.into()))
            .or_default()
            .push_back(response);
    }

    fn next_response(&mut self, method: &str, path: &str) -> Option<StubResponse> {
        let queue = self.routes.get_mut(&(method.into(), path.into()))?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[derive(Debug, Default)]
struct StubState {
    routes: StubRoutes,
    requests: Vec<RecordedRequest>,
}

#[derive(Debug)]
pub struct StubServer {
    addr: SocketAddr,
    state: Arc<Mutex<StubState>>,
    shutdown: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl StubServer {
    /// Binds to an ephemeral local port and starts serving on the current tokio runtime.
    pub async fn start(routes: StubRoutes) -> Result<Self> {
        let state = Arc::new(Mutex::new(StubState {
            routes,
            requests: Vec::new(),
        }));

        let service_state = state.clone();
        let make_service = make_service_fn(move |_| {
            let state = service_state.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |request| {
                    handle_request(state.clone(), request)
                }))
            }
        });

        let server = Server::try_bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
            .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::AddrNotAvailable, e.to_string())))?
            .serve(make_service);
        let addr = server.local_addr();

        let (shutdown, shutdown_signal) = oneshot::channel::<()>();
        let join_handle = tokio::spawn(async move {
            let graceful = server.with_graceful_shutdown(async {
                shutdown_signal.await.ok();
            });
            if let Err(e) = graceful.await {
                tracing::error!("Stub server error: {}", e);
            }
        });

        tracing::debug!(%addr, "stub server listening");

        Ok(Self {
            addr,
            state,
            shutdown: Some(shutdown),
            join_handle: Some(join_handle),
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Queues another response for a route while the server is running.
    pub fn push<S: Into<String>>(&self, method: Method, path: S, response: StubResponse) {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .routes
            .push(method, path, response);
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .requests
            .clone()
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            // connections kept alive by clients would delay a graceful stop
            join_handle.abort();
        }
    }
}

async fn handle_request(
    state: Arc<Mutex<StubState>>,
    request: Request<Body>,
) -> std::result::Result<Response<Body>, Infallible> {
    let (parts, request_body) = request.into_parts();
    let body = body::to_bytes(request_body).await.unwrap_or_default();

    let recorded = RecordedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().into(),
        query: parts.uri.query().map(String::from),
        headers: extract_headers(&parts.headers),
        body: String::from_utf8_lossy(&body).into(),
    };

    let stub_response = {
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        let response = state
            .routes
            .next_response(&recorded.method, &recorded.path);
        state.requests.push(recorded);
        response
    }
    .unwrap_or_else(|| {
        StubResponse::json(404, json!({ "title": "Not Found", "status": 404 }))
    });

    if let Some(delay) = stub_response.delay {
        tokio::time::sleep(delay).await;
    }

    Ok(build_response(&stub_response).unwrap_or_else(|e| {
        tracing::error!("Couldn't build stub response: {}", e);
        let mut response = Response::new(Body::empty());
        *response.status_mut() = hyper::StatusCode::INTERNAL_SERVER_ERROR;
        response
    }))
}

fn build_response(stub_response: &StubResponse) -> Result<Response<Body>> {
    let mut response_builder = Response::builder().status(stub_response.status_code);

    if let Some(header_map) = response_builder.headers_mut() {
        put_headers(header_map, stub_response.headers.iter())?;
    }

    response_builder
        .body(stub_response.body.clone().into())
        .map_err(|e| Error::MalformedDescriptor(e.to_string()))
}

pub(crate) fn put_headers<'a, I: IntoIterator<Item = (&'a String, &'a String)>>(
    header_map: &mut HeaderMap<HeaderValue>,
    headers: I,
) -> Result<()> {
    for (key, value) in headers {
        let header_name = HeaderName::from_lowercase(key.to_lowercase().as_bytes())
            .map_err(|_| Error::InvalidHeaderName(key.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| Error::InvalidHeaderValue(key.clone()))?;
        header_map.append(header_name, header_value);
    }

    Ok(())
}
