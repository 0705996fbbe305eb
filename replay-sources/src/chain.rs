//! Ordered fallback across several sources

use replay_core::{
    error::{ReplayError, Result},
    model::{RideListing, RideTrack},
    source::RideTrackSource,
};
use std::collections::HashSet;
use tracing::debug;

/// Tries each source in order; the first answer other than `NotFound` wins
pub struct SourceChain {
    sources: Vec<Box<dyn RideTrackSource>>,
}

impl SourceChain {
    pub fn new(sources: Vec<Box<dyn RideTrackSource>>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> impl Iterator<Item = &dyn RideTrackSource> {
        self.sources.iter().map(|s| s.as_ref())
    }
}

impl RideTrackSource for SourceChain {
    fn name(&self) -> &str {
        "Chain"
    }

    fn load_ride_track(&self, ride_id: &str) -> Result<RideTrack> {
        for source in &self.sources {
            match source.load_ride_track(ride_id) {
                Err(ReplayError::NotFound { .. }) => {
                    debug!(ride_id, source = source.name(), "Ride not in source");
                }
                other => return other,
            }
        }
        Err(ReplayError::not_found(ride_id))
    }

    fn list_rides(&self) -> Result<Vec<RideListing>> {
        let mut seen = HashSet::new();
        let mut rides = Vec::new();
        for source in &self.sources {
            for ride in source.list_rides()? {
                // Earlier sources shadow later ones, matching load order
                if seen.insert(ride.ride_id.clone()) {
                    rides.push(ride);
                }
            }
        }
        Ok(rides)
    }
}
