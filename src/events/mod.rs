pub mod publisher;

pub use publisher::{PublishedEvent, RunEvent, RunEventPublisher};
