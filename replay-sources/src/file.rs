//! JSON file source
//!
//! Reads one ride per file, `<dir>/<ride_id>.json`, in the [`RideRecord`]
//! wire format.

use replay_core::{
    error::{ReplayError, Result},
    model::{RideListing, RideRecord, RideTrack},
    source::RideTrackSource,
};
use std::path::PathBuf;
use tracing::{debug, warn};

pub struct JsonFileSource {
    dir: PathBuf,
}

impl JsonFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Platform data directory, e.g. `~/.local/share/ride-replay/rides`
    pub fn default_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("ride-replay").join("rides"))
    }

    fn path_for(&self, ride_id: &str) -> Option<PathBuf> {
        let safe = !ride_id.is_empty()
            && !ride_id.contains(['/', '\\'])
            && !ride_id.contains("..");
        safe.then(|| self.dir.join(format!("{}.json", ride_id)))
    }
}

impl RideTrackSource for JsonFileSource {
    fn name(&self) -> &str {
        "JSON files"
    }

    fn load_ride_track(&self, ride_id: &str) -> Result<RideTrack> {
        let path = self
            .path_for(ride_id)
            .ok_or_else(|| ReplayError::not_found(ride_id))?;

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReplayError::not_found(ride_id));
            }
            Err(e) => {
                return Err(ReplayError::malformed(
                    ride_id,
                    format!("failed to read {}: {}", path.display(), e),
                ));
            }
        };

        let record: RideRecord = serde_json::from_str(&contents).map_err(|e| {
            ReplayError::malformed(ride_id, format!("invalid ride JSON: {}", e))
        })?;

        if record.id != ride_id {
            return Err(ReplayError::malformed(
                ride_id,
                format!("file declares ride id '{}'", record.id),
            ));
        }

        debug!(ride_id, path = %path.display(), "Loaded ride file");
        RideTrack::try_from(record)
    }

    fn list_rides(&self) -> Result<Vec<RideListing>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                warn!("Failed to read ride directory {}: {}", self.dir.display(), e);
                return Ok(Vec::new());
            }
        };

        let mut rides: Vec<RideListing> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    return None;
                }
                let ride_id = path.file_stem()?.to_str()?.to_string();
                match self.load_ride_track(&ride_id) {
                    Ok(track) => Some(track.listing()),
                    Err(e) => {
                        warn!("Skipping {}: {}", path.display(), e);
                        None
                    }
                }
            })
            .collect();

        rides.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(rides)
    }
}
