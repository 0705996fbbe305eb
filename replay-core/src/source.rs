//! Ride track source trait definition

use crate::error::Result;
use crate::model::{RideListing, RideTrack};

/// Trait for data-access collaborators that produce ride tracks
///
/// Each source is responsible for:
/// - Resolving a ride identifier to its recorded data
/// - Validating that data into a [`RideTrack`]
///
/// Sources own their own retry policy; the replay engine never retries.
pub trait RideTrackSource: Send + Sync {
    /// Get the name of this source (e.g., "Demo", "JSON files")
    fn name(&self) -> &str;

    /// Load and validate one ride
    ///
    /// Returns:
    /// - `Ok(track)` for a ride that satisfies every track invariant
    /// - `Err(ReplayError::NotFound)` if the id does not resolve
    /// - `Err(ReplayError::MalformedTrack)` if the data is unusable
    fn load_ride_track(&self, ride_id: &str) -> Result<RideTrack>;

    /// List the rides this source can load
    fn list_rides(&self) -> Result<Vec<RideListing>>;
}
