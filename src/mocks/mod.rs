//! Mock implementations for testing.
//!
//! [`MockTransport`] answers from a queue of canned replies and records every
//! request, so executor and client behavior can be tested without a network.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::http::{RawReply, RestRequest, Transport};

/// Mock HTTP transport for testing.
#[derive(Debug, Default)]
pub struct MockTransport {
    /// Recorded requests.
    requests: Arc<Mutex<Vec<RestRequest>>>,
    /// Queued replies.
    replies: Arc<Mutex<VecDeque<RawReply>>>,
    /// Delay before every reply.
    delay: Option<Duration>,
}

impl MockTransport {
    /// Creates a mock answering `200` with an empty body unless replies are
    /// queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every reply by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues a reply.
    pub fn push_reply(&self, reply: RawReply) -> &Self {
        lock(&self.replies).push_back(reply);
        self
    }

    /// Queues a successful JSON reply.
    pub fn push_json(&self, status: u16, body: &serde_json::Value) -> &Self {
        self.push_reply(RawReply::new(status, body.to_string()))
    }

    /// Returns the recorded requests.
    pub fn requests(&self) -> Vec<RestRequest> {
        lock(&self.requests).clone()
    }

    /// Returns the most recent request.
    pub fn last_request(&self) -> Option<RestRequest> {
        lock(&self.requests).last().cloned()
    }

    /// Clears recorded requests and queued replies.
    pub fn clear(&self) {
        lock(&self.requests).clear();
        lock(&self.replies).clear();
    }

    fn next_reply(&self) -> RawReply {
        lock(&self.replies)
            .pop_front()
            .unwrap_or_else(|| RawReply::new(200, Vec::new()))
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: RestRequest) -> RawReply {
        lock(&self.requests).push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next_reply()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
