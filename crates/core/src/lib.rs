//! Core domain logic for Signbank's video storage.
//!
//! Gloss videos live in a shadow tree under the media root, partitioned by
//! the first two characters of their filename. Superseded versions stay on
//! disk as a `.bak` chain next to the current file, and poster images are a
//! regenerable cache derived from each video's path.

pub mod assets;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod fs;
pub mod library;
pub mod locks;
pub mod naming;
pub mod poster;
pub mod storage;
pub mod store;
pub mod types;
pub mod versioning;
