//! Test fakes: scripted transport and unsigned tokens.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::AuthError;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};
use crate::Result;

pub(crate) fn make_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}

pub(crate) fn student_claims(exp: i64) -> Value {
    json!({
        "sub": "42",
        "email": "asha@example.com",
        "name": "Asha Verma",
        "role": "student",
        "exp": exp,
        "current_class": 10,
        "school_name": "Delhi Public School",
    })
}

pub(crate) fn token_pair_body(access_token: &str, refresh_token: &str) -> String {
    json!({
        "access_token": access_token,
        "refresh_token": refresh_token,
        "token_type": "Bearer",
    })
    .to_string()
}

pub(crate) enum FakeReply {
    Respond(HttpResponse),
    Fail(AuthError),
    Delayed(Duration, Box<FakeReply>),
}

type Handler = Box<dyn Fn(&HttpRequest, usize) -> FakeReply + Send + Sync>;

/// Routes requests by URL path to a handler that also receives how many
/// earlier calls that path has seen. Unrouted paths answer 404.
#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: Mutex<HashMap<String, Handler>>,
    calls: Mutex<Vec<(String, Instant, HttpRequest)>>,
}

impl FakeTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn route<F>(&self, path: &str, handler: F)
    where
        F: Fn(&HttpRequest, usize) -> FakeReply + Send + Sync + 'static,
    {
        self.routes
            .lock()
            .insert(path.to_string(), Box::new(handler));
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().iter().filter(|(p, _, _)| p == path).count()
    }

    pub(crate) fn call_times(&self, path: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .iter()
            .filter(|(p, _, _)| p == path)
            .map(|(_, t, _)| *t)
            .collect()
    }

    pub(crate) fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        self.calls
            .lock()
            .iter()
            .filter(|(p, _, _)| p == path)
            .map(|(_, _, r)| r.clone())
            .collect()
    }
}

fn path_of(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string())
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let path = path_of(&request.url);

        let mut reply = {
            let mut calls = self.calls.lock();
            let seen = calls.iter().filter(|(p, _, _)| *p == path).count();
            calls.push((path.clone(), Instant::now(), request.clone()));

            match self.routes.lock().get(&path) {
                Some(handler) => handler(&request, seen),
                None => FakeReply::Respond(HttpResponse::new(404, r#"{"detail":"Not Found"}"#)),
            }
        };

        loop {
            match reply {
                FakeReply::Respond(response) => return Ok(response),
                FakeReply::Fail(error) => return Err(error),
                FakeReply::Delayed(delay, next) => {
                    tokio::time::sleep(delay).await;
                    reply = *next;
                }
            }
        }
    }
}
