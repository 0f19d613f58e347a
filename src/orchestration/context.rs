use crate::events::RunEventPublisher;
use crate::orchestration::error_classifier::{ErrorClassifier, StandardErrorClassifier};
use crate::remote::{ArtifactStorage, ExportService, SessionProvider, TileSource};
use std::sync::Arc;

/// Remote collaborators and shared services for one or more runs
///
/// Holds no run state, so independent schedulers (for example over different
/// catalogs) can share one context.
#[derive(Clone)]
pub struct PlatformContext {
    pub session_provider: Arc<dyn SessionProvider>,
    pub tile_source: Arc<dyn TileSource>,
    pub export_service: Arc<dyn ExportService>,
    pub artifact_storage: Arc<dyn ArtifactStorage>,
    pub classifier: Arc<dyn ErrorClassifier>,
    pub event_publisher: RunEventPublisher,
}

impl std::fmt::Debug for PlatformContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformContext")
            .field("session_provider", &"Arc<dyn SessionProvider>")
            .field("tile_source", &self.tile_source.source_name())
            .field("export_service", &"Arc<dyn ExportService>")
            .field("artifact_storage", &"Arc<dyn ArtifactStorage>")
            .field("classifier", &self.classifier.classifier_name())
            .field("subscribers", &self.event_publisher.subscriber_count())
            .finish()
    }
}

impl PlatformContext {
    pub fn new(
        session_provider: Arc<dyn SessionProvider>,
        tile_source: Arc<dyn TileSource>,
        export_service: Arc<dyn ExportService>,
        artifact_storage: Arc<dyn ArtifactStorage>,
    ) -> Self {
        Self {
            session_provider,
            tile_source,
            export_service,
            artifact_storage,
            classifier: Arc::new(StandardErrorClassifier::new()),
            event_publisher: RunEventPublisher::default(),
        }
    }

    /// Context where a single integration implements every collaborator
    pub fn from_platform<P>(platform: P) -> Self
    where
        P: SessionProvider + TileSource + ExportService + ArtifactStorage + 'static,
    {
        let platform = Arc::new(platform);
        Self::new(
            platform.clone(),
            platform.clone(),
            platform.clone(),
            platform,
        )
    }

    pub fn with_event_publisher(mut self, publisher: RunEventPublisher) -> Self {
        self.event_publisher = publisher;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }
}
