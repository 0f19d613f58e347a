//! Shared fixtures for integration tests.

#![allow(dead_code)]

pub mod strategies;

use gridexport_core::config::RunConfig;
use gridexport_core::events::{PublishedEvent, RunEventPublisher};
use gridexport_core::orchestration::{BatchScheduler, PlatformContext};
use gridexport_core::test_helpers::{test_config, MockPlatform};
use gridexport_core::ArtifactNamer;
use tokio::sync::broadcast;

/// Artifact name the scheduler derives for `tile` under [`test_config`]
pub fn artifact_for(tile: &str) -> String {
    let config = test_config(1);
    ArtifactNamer::from_config(&config)
        .unwrap()
        .name(tile, &config.window, config.variant)
        .unwrap()
        .to_string()
}

pub fn scheduler_for(platform: &MockPlatform, config: RunConfig) -> BatchScheduler {
    BatchScheduler::new(config, PlatformContext::from_platform(platform.clone())).unwrap()
}

/// Scheduler plus a subscription to its progress stream
pub fn observed_scheduler(
    platform: &MockPlatform,
    config: RunConfig,
) -> (BatchScheduler, broadcast::Receiver<PublishedEvent>) {
    let publisher = RunEventPublisher::new(256);
    let events = publisher.subscribe();
    let context = PlatformContext::from_platform(platform.clone()).with_event_publisher(publisher);
    (BatchScheduler::new(config, context).unwrap(), events)
}

pub fn drain(events: &mut broadcast::Receiver<PublishedEvent>) -> Vec<PublishedEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}
