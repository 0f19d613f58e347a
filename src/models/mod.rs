//! # Models
//!
//! Run-scoped data: tiles and their geometry, the processing window, and the
//! append-only submission records.

pub mod record;
pub mod tile;
pub mod window;

pub use record::{SubmissionOutcome, SubmissionRecord};
pub use tile::{CoordinateReference, Tile, TileGeometry};
pub use window::ProcessingWindow;
