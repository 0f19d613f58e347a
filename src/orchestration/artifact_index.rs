//! # Existing-Artifact Index
//!
//! One storage listing per run (or per refresh interval), cached as a set of artifact
//! names. `exists` is a local set-membership check, never a remote call.
//!
//! The cache is authoritative for the whole run. Artifacts submitted by the current run
//! are tracked in its submission records instead of being re-queried.
//!
//! If the listing fails for any reason other than an invalid session, the index falls
//! back to an empty set and logs a warning. Possible duplicate work is preferred over
//! blocking the run.

use crate::error::{GridExportError, Result};
use crate::naming::ArtifactName;
use crate::orchestration::error_classifier::{
    ErrorClassifier, ErrorContext, RemoteOperation, StandardErrorClassifier,
};
use crate::remote::{ArtifactStorage, Session};
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Where the cached names came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOrigin {
    Listing,
    /// Listing failed; assuming nothing exists
    Fallback,
}

#[derive(Debug, Clone)]
pub struct ExistingArtifactIndex {
    location: String,
    names: HashSet<ArtifactName>,
    origin: IndexOrigin,
    built_at: Instant,
    refresh_interval: Option<Duration>,
}

impl ExistingArtifactIndex {
    /// Index from an explicit set of names
    pub fn from_names(
        location: impl Into<String>,
        names: impl IntoIterator<Item = ArtifactName>,
    ) -> Self {
        Self {
            location: location.into(),
            names: names.into_iter().collect(),
            origin: IndexOrigin::Listing,
            built_at: Instant::now(),
            refresh_interval: None,
        }
    }

    fn fallback(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            names: HashSet::new(),
            origin: IndexOrigin::Fallback,
            built_at: Instant::now(),
            refresh_interval: None,
        }
    }

    /// List `location` once and cache the names found there.
    pub async fn build(
        storage: &dyn ArtifactStorage,
        session: &Session,
        location: &str,
    ) -> Result<Self> {
        Self::build_with_classifier(storage, session, location, &StandardErrorClassifier::new())
            .await
    }

    pub async fn build_with_classifier(
        storage: &dyn ArtifactStorage,
        session: &Session,
        location: &str,
        classifier: &dyn ErrorClassifier,
    ) -> Result<Self> {
        match storage.list_artifacts(session, location).await {
            Ok(entries) => {
                let index = Self::from_names(
                    location,
                    entries.iter().map(|e| ArtifactName::from_listing(e)),
                );
                info!(location, existing = index.len(), "Existing-artifact index built");
                Ok(index)
            }
            Err(error) => {
                let classification =
                    classifier.classify_error(&error, &ErrorContext::new(RemoteOperation::Listing));
                if classification.is_run_fatal {
                    return Err(GridExportError::SessionError(classification.error_message));
                }
                warn!(
                    location,
                    error = %error,
                    category = %classification.error_category,
                    remediation = ?classification.remediation_suggestions,
                    "Artifact listing failed; assuming no artifacts exist"
                );
                Ok(Self::fallback(location))
            }
        }
    }

    pub fn with_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn exists(&self, name: &ArtifactName) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn origin(&self) -> IndexOrigin {
        self.origin
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == IndexOrigin::Fallback
    }

    pub fn built_at(&self) -> Instant {
        self.built_at
    }

    /// Whether the configured refresh interval has elapsed
    pub fn needs_refresh(&self) -> bool {
        self.refresh_interval
            .is_some_and(|interval| self.built_at.elapsed() >= interval)
    }

    /// Re-list the location, classifying failures with the same classifier the index
    /// was built with. A non-fatal failure keeps the current cache.
    pub async fn refresh(
        &mut self,
        storage: &dyn ArtifactStorage,
        session: &Session,
        classifier: &dyn ErrorClassifier,
    ) -> Result<()> {
        let refreshed =
            Self::build_with_classifier(storage, session, &self.location, classifier).await?;
        if refreshed.is_fallback() {
            warn!(
                location = %self.location,
                cached = self.names.len(),
                "Index refresh failed; keeping previous listing"
            );
            self.built_at = Instant::now();
            return Ok(());
        }

        self.names = refreshed.names;
        self.origin = IndexOrigin::Listing;
        self.built_at = refreshed.built_at;
        Ok(())
    }
}
