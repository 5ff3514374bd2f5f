//! Livedash - live H.264 timing and MPEG-DASH manifest packaging
//!
//! This library crate exposes configuration and the stream packager for the
//! driver binary and integration tests.

pub mod config;
pub mod packager;

pub use packager::Packager;
