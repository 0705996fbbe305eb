//! Ride Replay Server Library
//!
//! Exposes server components for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod playback;
pub mod replay;
pub mod state;
