//! # Remote Collaborators
//!
//! Trait seams for everything this core talks to but does not own: the authenticated
//! session provider, the tile source, the export service and the storage listing.
//! Production integrations and the in-memory test platform both implement these.
//!
//! All calls are request/response. The export service only acknowledges a submission;
//! the heavy computation runs remotely and completion is observed out of band.

pub mod request;

pub use request::{ExportAck, ExportRequest};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Authenticated session handle supplied before any remote call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub principal: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expiry| expiry <= now)
    }
}

/// Coarse failure kinds reported by remote collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// Credentials missing, invalid or expired
    Unauthenticated,
    /// Concurrent task or request quota exhausted
    QuotaExceeded,
    /// Request rejected as malformed (bad geometry, bad parameters)
    InvalidRequest,
    /// Network failure or service outage
    Unavailable,
    /// Collection or location does not exist
    NotFound,
    /// Any other explicit rejection
    Rejected,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unauthenticated => "unauthenticated",
            Self::QuotaExceeded => "quota_exceeded",
            Self::InvalidRequest => "invalid_request",
            Self::Unavailable => "unavailable",
            Self::NotFound => "not_found",
            Self::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Unauthenticated, message)
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::QuotaExceeded, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::InvalidRequest, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Unavailable, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, message)
    }
}

/// A feature as delivered by the tile source: a property bag plus a GeoJSON geometry
/// object. Interpretation happens in the catalog reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeature {
    #[serde(default)]
    pub properties: serde_json::Map<String, serde_json::Value>,
    pub geometry: serde_json::Value,
}

/// Supplies a valid session. Failure is run-fatal.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn session(&self) -> Result<Session, RemoteError>;
}

/// Queryable feature collection returning features in stable order
#[async_trait]
pub trait TileSource: Send + Sync {
    /// Source name for logging
    fn source_name(&self) -> &str;

    async fn fetch_features(
        &self,
        session: &Session,
        collection_id: &str,
    ) -> Result<Vec<RawFeature>, RemoteError>;
}

/// Remote compute/export service. Returns as soon as the job is accepted.
#[async_trait]
pub trait ExportService: Send + Sync {
    async fn submit_export(
        &self,
        session: &Session,
        request: ExportRequest,
    ) -> Result<ExportAck, RemoteError>;
}

/// Storage listing under a location prefix. Entries may be bare names or full paths.
#[async_trait]
pub trait ArtifactStorage: Send + Sync {
    async fn list_artifacts(
        &self,
        session: &Session,
        location: &str,
    ) -> Result<Vec<String>, RemoteError>;
}
