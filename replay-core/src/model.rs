//! Ride track data model
//!
//! A [`RideRecord`] is the raw shape a data-access collaborator produces.
//! It becomes a [`RideTrack`] only after validation, so every track handed
//! to the interpolator and the playback clock satisfies:
//!
//! - at least two samples, the first at offset 0
//! - strictly increasing sample offsets
//! - finite, in-range coordinates, speeds and battery levels
//! - every event offset within `[0, total_duration]`
//! - an end time representable as a UTC timestamp
//!
//! Offsets are seconds since the ride's start time and are the only time
//! axis the engine uses.

use crate::error::{ReplayError, Result};
use crate::units::*;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One recorded telemetry reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,

    /// Seconds since ride start
    #[serde(rename = "offset_seconds")]
    pub offset: Seconds,

    #[serde(rename = "speed_kmh")]
    pub speed: KilometersPerHour,

    #[serde(rename = "battery_percent")]
    pub battery: Percent,

    /// Optional waypoint name ("Start", "Olaya St", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl TrackPoint {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

/// Kind of a discrete ride event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RideStart,
    RideEnd,
    SpeedWarning,
    BatteryLow,
    Pause,
    Resume,
    ZoneEnter,
    Custom,
}

/// A timestamped notable occurrence during a ride
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackEvent {
    #[serde(rename = "offset_seconds")]
    pub offset: Seconds,

    pub kind: EventKind,

    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    /// Free-form payload (zone name, speed limit, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// Rider reference carried by a ride
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rider {
    pub id: String,
    pub name: String,
}

/// Unvalidated ride as produced by a track source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideRecord {
    pub id: String,
    pub rider: Rider,
    pub vehicle_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    pub samples: Vec<TrackPoint>,
    #[serde(default)]
    pub events: Vec<TrackEvent>,
}

/// Validated, immutable ride track
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RideTrack {
    id: String,
    rider: Rider,
    vehicle_id: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    ends_at: DateTime<Utc>,
    samples: Vec<TrackPoint>,
    events: Vec<TrackEvent>,
}

impl TryFrom<RideRecord> for RideTrack {
    type Error = ReplayError;

    fn try_from(record: RideRecord) -> Result<Self> {
        let RideRecord {
            id,
            rider,
            vehicle_id,
            start_time,
            end_time,
            samples,
            mut events,
        } = record;

        let malformed = |reason: String| {
            debug!(ride_id = %id, %reason, "Rejecting ride track");
            ReplayError::malformed(id.clone(), reason)
        };

        if samples.len() < 2 {
            return Err(malformed(format!(
                "track has {} samples, at least 2 required",
                samples.len()
            )));
        }

        if let Some(end) = end_time {
            if end < start_time {
                return Err(malformed(format!(
                    "end time {} precedes start time {}",
                    end, start_time
                )));
            }
        }

        for (i, sample) in samples.iter().enumerate() {
            if let Some(reason) = invalid_sample_reason(sample) {
                return Err(malformed(format!("sample {}: {}", i, reason)));
            }
        }

        if samples[0].offset.0 != 0.0 {
            return Err(malformed(format!(
                "first sample offset is {}, expected 0",
                samples[0].offset.0
            )));
        }

        if let Some(i) = samples
            .windows(2)
            .position(|pair| pair[1].offset.0 <= pair[0].offset.0)
        {
            return Err(malformed(format!(
                "sample offsets not strictly increasing at sample {} ({} -> {})",
                i + 1,
                samples[i].offset.0,
                samples[i + 1].offset.0
            )));
        }

        let total = samples[samples.len() - 1].offset.0;
        if let Some(event) = events
            .iter()
            .find(|e| !e.offset.0.is_finite() || e.offset.0 < 0.0 || e.offset.0 > total)
        {
            return Err(malformed(format!(
                "event '{}' at offset {} lies outside [0, {}]",
                event.description, event.offset.0, total
            )));
        }

        let ends_at = match end_time {
            Some(end) => end,
            None => TimeDelta::try_milliseconds((total * 1000.0).round() as i64)
                .and_then(|duration| start_time.checked_add_signed(duration))
                .ok_or_else(|| {
                    malformed(format!(
                        "duration of {} seconds from {} is not a representable end time",
                        total, start_time
                    ))
                })?,
        };

        // Stable, so same-offset events keep their recorded order
        events.sort_by(|a, b| a.offset.0.total_cmp(&b.offset.0));

        Ok(RideTrack {
            id,
            rider,
            vehicle_id,
            start_time,
            end_time,
            ends_at,
            samples,
            events,
        })
    }
}

fn invalid_sample_reason(sample: &TrackPoint) -> Option<String> {
    if !sample.offset.0.is_finite() {
        return Some(format!("offset {} is not finite", sample.offset.0));
    }
    if !sample.position().is_valid() {
        return Some(format!(
            "coordinate ({}, {}) is out of range",
            sample.latitude, sample.longitude
        ));
    }
    if !sample.speed.0.is_finite() || sample.speed.0 < 0.0 {
        return Some(format!("speed {} km/h is invalid", sample.speed.0));
    }
    if !sample.battery.0.is_finite() || !(0.0..=100.0).contains(&sample.battery.0) {
        return Some(format!("battery {}% is outside [0, 100]", sample.battery.0));
    }
    None
}

impl RideTrack {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn rider(&self) -> &Rider {
        &self.rider
    }

    pub fn vehicle_id(&self) -> &str {
        &self.vehicle_id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Recorded end time, or start time plus the track duration
    pub fn ends_at(&self) -> DateTime<Utc> {
        self.ends_at
    }

    pub fn samples(&self) -> &[TrackPoint] {
        &self.samples
    }

    pub fn events(&self) -> &[TrackEvent] {
        &self.events
    }

    pub fn first_sample(&self) -> &TrackPoint {
        &self.samples[0]
    }

    pub fn last_sample(&self) -> &TrackPoint {
        &self.samples[self.samples.len() - 1]
    }

    /// Offset of the last sample
    pub fn total_duration(&self) -> Seconds {
        self.last_sample().offset
    }

    /// The recorded polyline, for drawing the route
    pub fn route(&self) -> Vec<GeoPoint> {
        self.samples.iter().map(TrackPoint::position).collect()
    }

    pub fn listing(&self) -> RideListing {
        RideListing {
            ride_id: self.id.clone(),
            rider_name: self.rider.name.clone(),
            vehicle_id: self.vehicle_id.clone(),
            start_time: self.start_time,
        }
    }

    pub fn summary(&self) -> RideSummary {
        let distance_m: f64 = self
            .samples
            .windows(2)
            .map(|pair| pair[0].position().haversine_distance(&pair[1].position()))
            .sum();
        let distance_km = distance_m / 1000.0;

        let duration = self.total_duration();
        let average_speed = if duration.0 > 0.0 {
            distance_km / (duration.0 / 3600.0)
        } else {
            0.0
        };

        let max_speed = self
            .samples
            .iter()
            .map(|s| s.speed.0)
            .fold(0.0_f64, f64::max);

        let battery_used = (self.first_sample().battery.0 - self.last_sample().battery.0).max(0.0);

        RideSummary {
            distance_km,
            duration,
            max_speed: KilometersPerHour(max_speed),
            average_speed: KilometersPerHour(average_speed),
            battery_used: Percent(battery_used),
            event_count: self.events.len(),
        }
    }
}

/// Entry in a ride-history listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideListing {
    pub ride_id: String,
    pub rider_name: String,
    pub vehicle_id: String,
    pub start_time: DateTime<Utc>,
}

/// Aggregate figures for a whole ride
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RideSummary {
    pub distance_km: f64,
    pub duration: Seconds,
    pub max_speed: KilometersPerHour,
    pub average_speed: KilometersPerHour,
    pub battery_used: Percent,
    pub event_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn point(lat: f64, lng: f64, offset: f64, speed: f64, battery: f64) -> TrackPoint {
        TrackPoint {
            latitude: lat,
            longitude: lng,
            offset: Seconds(offset),
            speed: KilometersPerHour(speed),
            battery: Percent(battery),
            label: None,
        }
    }

    fn event(offset: f64, kind: EventKind) -> TrackEvent {
        TrackEvent {
            offset: Seconds(offset),
            kind,
            description: format!("{:?}", kind),
            latitude: None,
            longitude: None,
            extra: None,
        }
    }

    fn make_record(samples: Vec<TrackPoint>, events: Vec<TrackEvent>) -> RideRecord {
        RideRecord {
            id: "R-1".to_string(),
            rider: Rider {
                id: "U-1".to_string(),
                name: "Test Rider".to_string(),
            },
            vehicle_id: "SC-1".to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            end_time: None,
            samples,
            events,
        }
    }

    fn two_points() -> Vec<TrackPoint> {
        vec![
            point(24.7136, 46.6753, 0.0, 0.0, 85.0),
            point(24.6877, 46.7219, 720.0, 0.0, 74.0),
        ]
    }

    fn reason_of(result: Result<RideTrack>) -> String {
        match result {
            Err(ReplayError::MalformedTrack { reason, .. }) => reason,
            other => panic!("expected MalformedTrack, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_track_derives_duration() {
        let track = RideTrack::try_from(make_record(two_points(), vec![])).unwrap();
        assert_eq!(track.total_duration(), Seconds(720.0));
        assert_eq!(track.route().len(), 2);
        assert_eq!(
            track.ends_at(),
            Utc.with_ymd_and_hms(2024, 3, 1, 8, 12, 0).unwrap()
        );
    }

    #[test]
    fn test_rejects_single_sample() {
        let record = make_record(vec![point(24.7, 46.6, 0.0, 0.0, 80.0)], vec![]);
        assert!(reason_of(RideTrack::try_from(record)).contains("at least 2"));
    }

    #[test]
    fn test_rejects_non_monotonic_offsets() {
        let samples = vec![
            point(24.70, 46.60, 0.0, 0.0, 80.0),
            point(24.71, 46.61, 60.0, 10.0, 79.0),
            point(24.72, 46.62, 60.0, 12.0, 78.0),
        ];
        let reason = reason_of(RideTrack::try_from(make_record(samples, vec![])));
        assert!(reason.contains("strictly increasing"), "{}", reason);
    }

    #[test]
    fn test_rejects_nonzero_first_offset() {
        let samples = vec![
            point(24.70, 46.60, 5.0, 0.0, 80.0),
            point(24.71, 46.61, 60.0, 10.0, 79.0),
        ];
        assert!(RideTrack::try_from(make_record(samples, vec![])).is_err());
    }

    #[test]
    fn test_rejects_event_outside_duration() {
        let record = make_record(two_points(), vec![event(721.0, EventKind::RideEnd)]);
        let reason = reason_of(RideTrack::try_from(record));
        assert!(reason.contains("outside"), "{}", reason);
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let mut samples = two_points();
        samples[1].battery = Percent(101.0);
        assert!(RideTrack::try_from(make_record(samples, vec![])).is_err());

        let mut samples = two_points();
        samples[0].latitude = 95.0;
        assert!(RideTrack::try_from(make_record(samples, vec![])).is_err());

        let mut samples = two_points();
        samples[1].speed = KilometersPerHour(-1.0);
        assert!(RideTrack::try_from(make_record(samples, vec![])).is_err());
    }

    #[test]
    fn test_rejects_duration_past_representable_end_time() {
        let samples = vec![
            point(24.70, 46.60, 0.0, 0.0, 80.0),
            point(24.71, 46.61, 1e13, 0.0, 79.0),
        ];
        let reason = reason_of(RideTrack::try_from(make_record(samples, vec![])));
        assert!(reason.contains("not a representable end time"), "{}", reason);
    }

    #[test]
    fn test_recorded_end_time_wins_over_duration() {
        let mut record = make_record(two_points(), vec![]);
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 8, 15, 0).unwrap();
        record.end_time = Some(end);
        let track = RideTrack::try_from(record).unwrap();
        assert_eq!(track.ends_at(), end);
    }

    #[test]
    fn test_rejects_end_before_start() {
        let mut record = make_record(two_points(), vec![]);
        record.end_time = Some(Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap());
        assert!(RideTrack::try_from(record).is_err());
    }

    #[test]
    fn test_events_sorted_by_offset() {
        let record = make_record(
            two_points(),
            vec![
                event(720.0, EventKind::RideEnd),
                event(0.0, EventKind::RideStart),
                event(180.0, EventKind::SpeedWarning),
            ],
        );
        let track = RideTrack::try_from(record).unwrap();
        let kinds: Vec<EventKind> = track.events().iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::RideStart, EventKind::SpeedWarning, EventKind::RideEnd]
        );
    }

    #[test]
    fn test_summary() {
        let samples = vec![
            point(0.0, 0.0, 0.0, 0.0, 90.0),
            point(0.0, 0.01, 180.0, 22.0, 85.0),
            point(0.0, 0.02, 360.0, 18.0, 80.0),
        ];
        let track = RideTrack::try_from(make_record(samples, vec![])).unwrap();
        let summary = track.summary();

        // 0.02 degrees of longitude on the equator is ~2.224 km
        assert!((summary.distance_km - 2.224).abs() < 0.01);
        assert_eq!(summary.duration, Seconds(360.0));
        assert_eq!(summary.max_speed, KilometersPerHour(22.0));
        assert!((summary.average_speed.0 - 22.24).abs() < 0.1);
        assert_eq!(summary.battery_used, Percent(10.0));
        assert_eq!(summary.event_count, 0);
    }

    #[test]
    fn test_record_deserializes_from_snake_case_json() {
        let json = r#"{
            "id": "R-9",
            "rider": {"id": "U-9", "name": "Sara"},
            "vehicle_id": "SC-9",
            "start_time": "2024-03-01T08:00:00Z",
            "samples": [
                {"latitude": 24.71, "longitude": 46.67, "offset_seconds": 0, "speed_kmh": 0, "battery_percent": 85, "label": "Start"},
                {"latitude": 24.68, "longitude": 46.72, "offset_seconds": 600, "speed_kmh": 0, "battery_percent": 75}
            ],
            "events": [
                {"offset_seconds": 300, "kind": "zone_enter", "description": "Entered slow zone", "extra": {"zone": "Olaya"}}
            ]
        }"#;
        let record: RideRecord = serde_json::from_str(json).unwrap();
        let track = RideTrack::try_from(record).unwrap();

        assert_eq!(track.samples()[0].label.as_deref(), Some("Start"));
        assert_eq!(track.events()[0].kind, EventKind::ZoneEnter);
        assert!(track.end_time().is_none());
    }
}
