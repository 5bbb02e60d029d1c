//! A transport that answers from a script instead of the network.
//!
//! Replies are queued per `(method, path)`. Each call consumes the front
//! of its queue, except the last reply, which keeps repeating so that any
//! number of concurrent calls to the same endpoint all get an answer.
//! Every request is recorded, headers included, for later assertions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::{HttpRequest, HttpResponse, HttpTransport, Method, TransportError};

#[derive(Debug, Clone)]
enum Reply {
    Response(HttpResponse),
    Fail(TransportError),
}

/// An [`HttpTransport`] for tests.
///
/// Unscripted endpoints answer `404 {"detail":"Not Found"}`.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Option<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call wait `latency` before answering. This yields to
    /// the runtime, so concurrently started calls all pass their request
    /// stages before any response is handled.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queues a response for `method path`.
    pub fn respond(
        &self,
        method: Method,
        path: &str,
        status: u16,
        body: &str,
    ) -> &Self {
        self.push(
            method,
            path,
            Reply::Response(HttpResponse::new(status, body.as_bytes().to_vec())),
        )
    }

    /// Queues a transport failure for `method path`.
    pub fn fail(
        &self,
        method: Method,
        path: &str,
        error: TransportError,
    ) -> &Self {
        self.push(method, path, Reply::Fail(error))
    }

    fn push(&self, method: Method, path: &str, reply: Reply) -> &Self {
        lock(&self.replies)
            .entry((method, path.to_string()))
            .or_default()
            .push_back(reply);
        self
    }

    /// Returns every request sent so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        lock(&self.requests).clone()
    }

    /// Returns the requests sent to `path`, in order.
    pub fn requests_to(&self, path: &str) -> Vec<HttpRequest> {
        lock(&self.requests)
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    fn next_reply(&self, request: &HttpRequest) -> Reply {
        let mut replies = lock(&self.replies);
        let Some(queue) = replies.get_mut(&(request.method, request.path.clone()))
        else {
            return Reply::Response(HttpResponse::new(
                404,
                br#"{"detail":"Not Found"}"#.to_vec(),
            ));
        };
        if queue.len() > 1 {
            if let Some(reply) = queue.pop_front() {
                return reply;
            }
        }
        queue.front().cloned().unwrap_or_else(|| {
            Reply::Response(HttpResponse::new(404, Vec::new()))
        })
    }
}

impl HttpTransport for ScriptedTransport {
    async fn send(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        lock(&self.requests).push(request.clone());
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.next_reply(&request) {
            Reply::Response(response) => Ok(response),
            Reply::Fail(error) => Err(error),
        }
    }
}
