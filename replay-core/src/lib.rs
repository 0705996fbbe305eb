//! Ride Replay Core Library
//!
//! This crate provides the ride track model, route interpolation and the
//! playback clock used to replay a recorded scooter ride.

pub mod clock;
pub mod config;
pub mod error;
pub mod interpolate;
pub mod model;
pub mod source;
pub mod units;

pub use clock::{ClockSnapshot, PlaybackClock};
pub use config::ReplayConfig;
pub use error::{ReplayError, Result};
pub use interpolate::{derive_state, DerivedPlaybackState};
pub use model::{RideRecord, RideTrack};
pub use source::RideTrackSource;
