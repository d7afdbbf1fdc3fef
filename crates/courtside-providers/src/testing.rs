//! Scripted in-memory transport for tests.
//!
//! Responses are served from two sources: routes, matched by a substring of
//! the request URL or body and consumed on first use, and a FIFO queue used
//! when no route matches. Every request is recorded for assertions.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::BoxFuture;
use crate::transport::{HttpRequest, HttpResponse, HttpTransport};

enum Scripted {
    Respond(HttpResponse),
    Fail(ProviderError),
    /// Never completes; used to test aborts mid-request.
    Hang,
}

#[derive(Default)]
pub struct ScriptedTransport {
    queue: Mutex<VecDeque<Scripted>>,
    routes: Mutex<Vec<(String, Scripted)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn respond(&self, response: HttpResponse) {
        lock(&self.queue).push_back(Scripted::Respond(response));
    }

    /// Queues a transport error.
    pub fn fail(&self, error: ProviderError) {
        lock(&self.queue).push_back(Scripted::Fail(error));
    }

    /// Queues a request that never answers.
    pub fn hang(&self) {
        lock(&self.queue).push_back(Scripted::Hang);
    }

    /// Answers the first request whose URL or body contains `pattern`.
    pub fn route(&self, pattern: impl Into<String>, response: HttpResponse) {
        lock(&self.routes).push((pattern.into(), Scripted::Respond(response)));
    }

    /// Fails the first request whose URL or body contains `pattern`.
    pub fn route_error(&self, pattern: impl Into<String>, error: ProviderError) {
        lock(&self.routes).push((pattern.into(), Scripted::Fail(error)));
    }

    /// Hangs the first request whose URL or body contains `pattern`.
    pub fn route_hang(&self, pattern: impl Into<String>) {
        lock(&self.routes).push((pattern.into(), Scripted::Hang));
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// Requests whose URL contains `fragment`.
    pub fn requests_to(&self, fragment: &str) -> Vec<HttpRequest> {
        lock(&self.requests)
            .iter()
            .filter(|r| r.url.contains(fragment))
            .cloned()
            .collect()
    }

    fn next(&self, request: &HttpRequest) -> Option<Scripted> {
        {
            let mut routes = lock(&self.routes);
            let body = request.body.as_deref().unwrap_or_default();
            if let Some(pos) = routes
                .iter()
                .position(|(p, _)| request.url.contains(p.as_str()) || body.contains(p.as_str()))
            {
                return Some(routes.remove(pos).1);
            }
        }
        lock(&self.queue).pop_front()
    }
}

impl HttpTransport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, ProviderResult<HttpResponse>> {
        let scripted = self.next(&request);
        let url = request.url.clone();
        lock(&self.requests).push(request);

        Box::pin(async move {
            match scripted {
                Some(Scripted::Respond(response)) => Ok(response),
                Some(Scripted::Fail(error)) => Err(error),
                Some(Scripted::Hang) => std::future::pending().await,
                None => Err(ProviderError::internal(format!(
                    "no scripted response for {}",
                    url
                ))),
            }
        })
    }
}
