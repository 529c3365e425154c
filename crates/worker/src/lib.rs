//! Background maintenance for Signbank video storage.
//!
//! Poster generation runs here, off the request path: the sweep walks every
//! current gloss video and every plain video and fills in missing posters.

pub mod config;
pub mod sweep;

pub use config::WorkerConfig;
pub use sweep::{PosterSweep, SweepReport};
