//! Stand-in backend
//!
//! A real axum server on an ephemeral port. Each route answers with a canned
//! reply and records what it received.

use axum::body::Bytes;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Canned response for one route
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
    pub delay: Duration,
}

impl Reply {
    pub fn json(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(code: u16, body: &str) -> Self {
        Self {
            status: StatusCode::from_u16(code).unwrap(),
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Request as received by the stand-in
#[derive(Debug, Clone)]
pub struct Seen {
    pub path: &'static str,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Seen {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

pub struct Backend {
    /// Base URL, e.g. `http://127.0.0.1:49152`
    pub url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Backend {
    /// Serve `routes` (all POST) until the test runtime shuts down
    pub async fn start(routes: Vec<(&'static str, Reply)>) -> Self {
        let seen: Arc<Mutex<Vec<Seen>>> = Arc::new(Mutex::new(Vec::new()));
        let mut router = Router::new();

        for (path, reply) in routes {
            let seen = Arc::clone(&seen);
            router = router.route(
                path,
                post(move |headers: HeaderMap, body: Bytes| {
                    let seen = Arc::clone(&seen);
                    let reply = reply.clone();
                    async move {
                        seen.lock().unwrap().push(Seen {
                            path,
                            headers,
                            body: body.to_vec(),
                        });
                        if !reply.delay.is_zero() {
                            tokio::time::sleep(reply.delay).await;
                        }
                        (
                            reply.status,
                            [(header::CONTENT_TYPE, "application/json")],
                            reply.body,
                        )
                    }
                }),
            );
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            seen,
        }
    }

    /// Everything received so far, in arrival order
    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn last(&self) -> Seen {
        self.seen().pop().expect("backend received no request")
    }
}

/// Base URL of a port nothing listens on
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}
