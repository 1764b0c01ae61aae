use std::collections::VecDeque;

use crate::transport::RequestKind;

/// Callback invoked with the request's topic and the raw response body once
/// the transport reports completion.
pub type CompletionFn = Box<dyn FnOnce(&str, &str) + Send + Sync>;

/// One queued operation awaiting dispatch. The target URL is resolved at
/// dispatch time from the endpoint currently connected, so requests queued
/// before a failover follow the engine to the new server.
pub struct PendingRequest {
    pub kind: RequestKind,
    pub topic: String,
    pub payload: Option<String>,
    pub on_complete: CompletionFn,
}

/// Strictly FIFO queue of pending requests with at most one in flight.
///
/// The queue itself only tracks ordering and the in-flight flag; the engine
/// decides when the logical channel is ready and performs the actual
/// transport send. Unbounded: backpressure is not modeled.
#[derive(Default)]
pub struct RequestQueue {
    pending: VecDeque<PendingRequest>,
    in_flight: bool,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, request: PendingRequest) {
        self.pending.push_back(request);
    }

    /// Claims the head for dispatch, returning its fields. `None` when a
    /// request is already in flight or the queue is empty. The head stays
    /// queued until completion so a failed send only delays it.
    pub fn claim_head(&mut self) -> Option<(RequestKind, String, Option<String>)> {
        if self.in_flight {
            return None;
        }
        let head = self.pending.front()?;
        self.in_flight = true;
        Some((head.kind, head.topic.clone(), head.payload.clone()))
    }

    /// Releases the in-flight claim without popping, after a synchronous
    /// send failure.
    pub fn release_head(&mut self) {
        self.in_flight = false;
    }

    /// Pops the completed head and clears the in-flight flag, handing back
    /// the request so the caller can run its completion callback.
    pub fn complete_head(&mut self) -> Option<PendingRequest> {
        if !self.in_flight {
            return None;
        }
        self.in_flight = false;
        self.pending.pop_front()
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops everything, deliberate-disconnect path.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.in_flight = false;
    }
}
