//! In-memory tracking of publish requests started over HTTP.
//!
//! Each request gets an id, collects the progress events emitted while it
//! runs and finally the per-platform results. Finished requests are evicted
//! oldest first once the tracker holds more than [`MAX_TRACKED_REQUESTS`].

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use reelpost_models::{Platform, ProgressEvent};
use reelpost_worker::{NotificationSink, PublishReport};
use serde::Serialize;
use uuid::Uuid;

/// Upper bound on remembered requests.
pub const MAX_TRACKED_REQUESTS: usize = 1_000;

/// Lifecycle of a tracked request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestState {
    Running,
    Completed,
    Failed,
}

/// Snapshot of one publish request.
#[derive(Debug, Clone, Serialize)]
pub struct PublishStatus {
    pub request_id: String,
    pub state: RequestState,
    pub platforms: Vec<Platform>,
    /// Progress events in emission order
    pub events: Vec<ProgressEvent>,
    /// One line per platform, present once the request finished
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub status_lines: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<PublishReport>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct PublishTracker {
    requests: RwLock<HashMap<String, PublishStatus>>,
}

impl PublishTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new running request and return its id.
    pub fn start(&self, platforms: Vec<Platform>) -> String {
        let request_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let status = PublishStatus {
            request_id: request_id.clone(),
            state: RequestState::Running,
            platforms,
            events: Vec::new(),
            status_lines: Vec::new(),
            summary: None,
            report: None,
            created_at: now,
            updated_at: now,
        };

        let mut requests = self.requests.write().unwrap_or_else(|e| e.into_inner());
        requests.insert(request_id.clone(), status);
        evict_finished(&mut requests);
        request_id
    }

    pub fn record_event(&self, request_id: &str, event: ProgressEvent) {
        let mut requests = self.requests.write().unwrap_or_else(|e| e.into_inner());
        if let Some(status) = requests.get_mut(request_id) {
            status.updated_at = event.timestamp;
            status.events.push(event);
        }
    }

    pub fn finish(&self, request_id: &str, report: PublishReport) {
        let mut requests = self.requests.write().unwrap_or_else(|e| e.into_inner());
        if let Some(status) = requests.get_mut(request_id) {
            status.state = if report.all_succeeded() {
                RequestState::Completed
            } else {
                RequestState::Failed
            };
            status.status_lines = report.results.iter().map(|r| r.status_line()).collect();
            status.summary = Some(report.summary());
            status.report = Some(report);
            status.updated_at = Utc::now();
        }
    }

    /// Mark a request that never produced a report as failed.
    pub fn abort(&self, request_id: &str, reason: impl Into<String>) {
        let mut requests = self.requests.write().unwrap_or_else(|e| e.into_inner());
        if let Some(status) = requests.get_mut(request_id) {
            if status.state == RequestState::Running {
                status.state = RequestState::Failed;
                status.summary = Some(reason.into());
                status.updated_at = Utc::now();
            }
        }
    }

    pub fn get(&self, request_id: &str) -> Option<PublishStatus> {
        self.requests
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(request_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.requests.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sink that appends events to `request_id`.
    pub fn sink(self: &Arc<Self>, request_id: impl Into<String>) -> TrackerSink {
        TrackerSink {
            tracker: Arc::clone(self),
            request_id: request_id.into(),
        }
    }
}

fn evict_finished(requests: &mut HashMap<String, PublishStatus>) {
    if requests.len() <= MAX_TRACKED_REQUESTS {
        return;
    }

    let mut finished: Vec<_> = requests
        .values()
        .filter(|s| s.state != RequestState::Running)
        .map(|s| (s.updated_at, s.request_id.clone()))
        .collect();
    finished.sort();

    let excess = requests.len() - MAX_TRACKED_REQUESTS;
    for (_, id) in finished.into_iter().take(excess) {
        requests.remove(&id);
    }
}

/// Notification sink bound to one tracked request.
pub struct TrackerSink {
    tracker: Arc<PublishTracker>,
    request_id: String,
}

impl NotificationSink for TrackerSink {
    fn notify(&self, event: ProgressEvent) {
        self.tracker.record_event(&self.request_id, event);
    }
}
