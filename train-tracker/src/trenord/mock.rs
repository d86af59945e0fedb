//! Mock Trenord client for testing without API access.
//!
//! Serves canned payloads keyed by train id. Unknown trains get an empty
//! array, which is what the live API returns for an id that does not run.

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use tokio::sync::RwLock;

use super::client::TrainFetcher;
use super::error::TrenordError;

/// Canned reply for one train.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Return this body.
    Body(String),
    /// Fail with this HTTP status.
    Status(u16),
    /// Never complete; exercises timeouts and single-flight.
    Hang,
}

/// Mock Trenord client that serves in-memory or on-disk payloads.
#[derive(Clone, Default)]
pub struct MockTrenordClient {
    responses: Arc<RwLock<HashMap<String, MockResponse>>>,
    calls: Arc<AtomicUsize>,
}

impl MockTrenordClient {
    /// Create an empty mock; every train is "not found".
    pub fn new() -> Self {
        Self::default()
    }

    /// Load payloads from a directory.
    ///
    /// Expects files named `{train_id}.json` (e.g. `10512.json`).
    pub fn from_dir(data_dir: impl AsRef<Path>) -> Result<Self, TrenordError> {
        let data_dir = data_dir.as_ref();
        let mut responses = HashMap::new();

        let entries = std::fs::read_dir(data_dir).map_err(|e| {
            TrenordError::NotConfigured(format!("failed to read mock data directory: {e}"))
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                TrenordError::NotConfigured(format!("failed to read directory entry: {e}"))
            })?;

            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }

            let train_id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| TrenordError::NotConfigured(format!("invalid filename: {path:?}")))?
                .to_string();

            let body = std::fs::read_to_string(&path).map_err(|e| {
                TrenordError::NotConfigured(format!("failed to read {path:?}: {e}"))
            })?;

            responses.insert(train_id, MockResponse::Body(body));
        }

        if responses.is_empty() {
            return Err(TrenordError::NotConfigured(format!(
                "no mock train files found in {data_dir:?}"
            )));
        }

        Ok(Self {
            responses: Arc::new(RwLock::new(responses)),
            calls: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Set the reply for a train.
    pub async fn respond_with(&self, train_id: impl Into<String>, response: MockResponse) {
        self.responses.write().await.insert(train_id.into(), response);
    }

    /// Number of fetches served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Train ids with a canned reply.
    pub async fn available_trains(&self) -> Vec<String> {
        self.responses.read().await.keys().cloned().collect()
    }

    async fn reply(&self, train_id: &str) -> Result<String, TrenordError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let response = self.responses.read().await.get(train_id).cloned();

        match response {
            Some(MockResponse::Body(body)) => Ok(body),
            Some(MockResponse::Status(status)) => Err(TrenordError::Api {
                status,
                message: format!("mock status {status}"),
            }),
            Some(MockResponse::Hang) => std::future::pending().await,
            None => Ok("[]".to_string()),
        }
    }
}

impl TrainFetcher for MockTrenordClient {
    fn fetch(
        &self,
        train_id: &str,
        _date: NaiveDate,
    ) -> impl Future<Output = Result<String, TrenordError>> + Send {
        self.reply(train_id)
    }
}
