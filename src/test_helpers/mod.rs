// Test Helpers Module - in-memory remote platform
//
// Provides a mock implementation of every remote collaborator with failure injection
// and call recording, plus small fixtures shared by unit and integration tests.

use crate::config::{BatchSize, RunConfig};
use crate::models::ProcessingWindow;
use crate::remote::{
    ArtifactStorage, ExportAck, ExportRequest, ExportService, RawFeature, RemoteError, Session,
    SessionProvider, TileSource,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_OUTPUT_LOCATION: &str = "projects/test/assets/ndvi";
pub const TEST_CATALOG_ID: &str = "projects/test/assets/grid";

#[derive(Debug, Default)]
struct MockState {
    features: Vec<RawFeature>,
    catalog_error: Option<RemoteError>,
    session_error: Option<RemoteError>,
    session_limit: Option<usize>,
    session_expiry: Option<DateTime<Utc>>,
    session_lifetimes: VecDeque<ChronoDuration>,
    existing: Vec<String>,
    listing_error: Option<RemoteError>,
    submission_failures: HashMap<String, RemoteError>,
    complete_on_submit: bool,
    submissions: Vec<ExportRequest>,
    session_calls: usize,
    catalog_calls: usize,
    listing_calls: usize,
}

/// In-memory remote platform. Clones share state, so a test can hand one clone to the
/// orchestrator and inspect another.
#[derive(Debug, Clone, Default)]
pub struct MockPlatform {
    state: Arc<Mutex<MockState>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog of unit squares laid out left to right, identified by `CODIGO`
    pub fn with_square_tiles(self, identifiers: &[&str]) -> Self {
        let features = identifiers
            .iter()
            .enumerate()
            .map(|(i, id)| square_feature(id, i as f64 * 1000.0, 1000.0))
            .collect();
        self.with_features(features)
    }

    pub fn with_features(self, features: Vec<RawFeature>) -> Self {
        self.state.lock().features = features;
        self
    }

    pub fn with_catalog_error(self, error: RemoteError) -> Self {
        self.state.lock().catalog_error = Some(error);
        self
    }

    pub fn with_session_error(self, error: RemoteError) -> Self {
        self.state.lock().session_error = Some(error);
        self
    }

    /// Sessions after the first `calls` requests fail as unauthenticated
    pub fn with_session_failing_after(self, calls: usize) -> Self {
        self.state.lock().session_limit = Some(calls);
        self
    }

    /// Issued sessions carry this expiry
    pub fn with_session_expiry(self, expires_at: DateTime<Utc>) -> Self {
        self.state.lock().session_expiry = Some(expires_at);
        self
    }

    /// Each issued session lives for the next lifetime in `lifetimes`, counted from the
    /// moment it is issued. Once the list is used up, sessions fall back to
    /// [`with_session_expiry`](Self::with_session_expiry) or never expire.
    pub fn with_session_lifetimes(self, lifetimes: impl IntoIterator<Item = ChronoDuration>) -> Self {
        self.state.lock().session_lifetimes.extend(lifetimes);
        self
    }

    pub fn with_existing_artifacts<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .lock()
            .existing
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_listing_error(self, error: RemoteError) -> Self {
        self.state.lock().listing_error = Some(error);
        self
    }

    /// Reject the submission for `tile_identifier` with `error`
    pub fn with_submission_failure(self, tile_identifier: &str, error: RemoteError) -> Self {
        self.state
            .lock()
            .submission_failures
            .insert(tile_identifier.to_string(), error);
        self
    }

    /// Accepted exports appear in storage immediately
    pub fn completing_exports(self) -> Self {
        self.state.lock().complete_on_submit = true;
        self
    }

    pub fn add_existing_artifact(&self, name: impl Into<String>) {
        self.state.lock().existing.push(name.into());
    }

    pub fn set_listing_error(&self, error: RemoteError) {
        self.state.lock().listing_error = Some(error);
    }

    pub fn clear_listing_error(&self) {
        self.state.lock().listing_error = None;
    }

    pub fn submissions(&self) -> Vec<ExportRequest> {
        self.state.lock().submissions.clone()
    }

    pub fn submitted_tiles(&self) -> Vec<String> {
        self.state
            .lock()
            .submissions
            .iter()
            .map(|r| r.tile_identifier.clone())
            .collect()
    }

    pub fn session_calls(&self) -> usize {
        self.state.lock().session_calls
    }

    pub fn catalog_calls(&self) -> usize {
        self.state.lock().catalog_calls
    }

    pub fn listing_calls(&self) -> usize {
        self.state.lock().listing_calls
    }
}

#[async_trait]
impl SessionProvider for MockPlatform {
    async fn session(&self) -> Result<Session, RemoteError> {
        let mut state = self.state.lock();
        state.session_calls += 1;
        if let Some(error) = &state.session_error {
            return Err(error.clone());
        }
        let calls = state.session_calls;
        if state.session_limit.is_some_and(|limit| calls > limit) {
            return Err(RemoteError::unauthenticated("credentials revoked"));
        }
        let session = Session::new("mock@test");
        let expiry = match state.session_lifetimes.pop_front() {
            Some(lifetime) => Some(Utc::now() + lifetime),
            None => state.session_expiry,
        };
        Ok(match expiry {
            Some(expiry) => session.with_expiry(expiry),
            None => session,
        })
    }
}

#[async_trait]
impl TileSource for MockPlatform {
    fn source_name(&self) -> &str {
        "mock"
    }

    async fn fetch_features(
        &self,
        _session: &Session,
        _collection_id: &str,
    ) -> Result<Vec<RawFeature>, RemoteError> {
        let mut state = self.state.lock();
        state.catalog_calls += 1;
        match &state.catalog_error {
            Some(error) => Err(error.clone()),
            None => Ok(state.features.clone()),
        }
    }
}

#[async_trait]
impl ExportService for MockPlatform {
    async fn submit_export(
        &self,
        _session: &Session,
        request: ExportRequest,
    ) -> Result<ExportAck, RemoteError> {
        let mut state = self.state.lock();
        let failure = state
            .submission_failures
            .get(&request.tile_identifier)
            .cloned();
        let target_path = request.target_path.clone();
        state.submissions.push(request);

        if let Some(error) = failure {
            return Err(error);
        }
        if state.complete_on_submit {
            state.existing.push(target_path);
        }
        Ok(ExportAck::new(format!("mock-job-{}", state.submissions.len())))
    }
}

#[async_trait]
impl ArtifactStorage for MockPlatform {
    async fn list_artifacts(
        &self,
        _session: &Session,
        _location: &str,
    ) -> Result<Vec<String>, RemoteError> {
        let mut state = self.state.lock();
        state.listing_calls += 1;
        match &state.listing_error {
            Some(error) => Err(error.clone()),
            None => Ok(state.existing.clone()),
        }
    }
}

/// Axis-aligned square feature with `CODIGO = identifier`
pub fn square_feature(identifier: &str, x_offset: f64, size: f64) -> RawFeature {
    RawFeature {
        properties: json!({ "CODIGO": identifier })
            .as_object()
            .cloned()
            .unwrap_or_default(),
        geometry: json!({
            "type": "Polygon",
            "coordinates": [[
                [x_offset, 0.0],
                [x_offset + size, 0.0],
                [x_offset + size, size],
                [x_offset, size],
                [x_offset, 0.0]
            ]]
        }),
    }
}

pub fn test_window() -> ProcessingWindow {
    ProcessingWindow::parse("2024-01-01", "2024-07-01").expect("valid test window")
}

/// Run configuration for a projected (meter) catalog with no pacing
pub fn test_config(batch_size: usize) -> RunConfig {
    RunConfig::new(
        TEST_CATALOG_ID,
        TEST_OUTPUT_LOCATION,
        test_window(),
        BatchSize::Explicit(batch_size),
    )
    .with_catalog_crs_epsg(32718)
    .with_pacing(Duration::ZERO, Duration::ZERO)
}
