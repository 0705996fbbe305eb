//! Route interpolation
//!
//! Derives the rider's position, speed and battery level at an arbitrary
//! offset by linear interpolation between the two bracketing samples, plus
//! the events that lie close to that offset.

use crate::config::ReplayConfig;
use crate::model::{RideTrack, TrackEvent, TrackPoint};
use crate::units::*;
use serde::Serialize;

/// Playback state derived for a single offset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedPlaybackState {
    /// The clamped offset this state was derived for
    pub offset_seconds: Seconds,

    pub position: GeoPoint,

    pub speed_kmh: KilometersPerHour,

    pub battery_percent: Percent,

    /// Events within the proximity window, in offset order
    pub active_events: Vec<TrackEvent>,

    /// Index of the sample that starts the bracketing segment
    pub segment_index: usize,

    /// Progress through the bracketing segment (0.0 to 1.0)
    pub segment_progress: f64,

    /// Progress through the whole ride (0.0 to 1.0)
    pub fraction_complete: f64,

    /// Label of the last waypoint passed, if it has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Clamp an offset into `[0, total_duration]`; NaN maps to 0
pub fn clamp_offset(track: &RideTrack, offset: Seconds) -> Seconds {
    let total = track.total_duration().0;
    if offset.0.is_nan() {
        return Seconds(0.0);
    }
    Seconds(offset.0.clamp(0.0, total))
}

/// Locate the bracketing segment for `offset`.
///
/// Returns `(i, progress)` where `samples[i]` starts the segment and
/// `progress` is the fraction of the way to `samples[i + 1]`. Offsets at or
/// before the first sample return `(0, 0.0)`; offsets at or after the last
/// return `(last, 0.0)`.
pub fn locate_segment(samples: &[TrackPoint], offset: Seconds) -> (usize, f64) {
    let last = samples.len().saturating_sub(1);
    if samples.is_empty() || offset.0 <= samples[0].offset.0 || offset.0.is_nan() {
        return (0, 0.0);
    }
    if offset.0 >= samples[last].offset.0 {
        return (last, 0.0);
    }

    // First sample strictly after offset; the one before it starts the segment
    let after = samples.partition_point(|s| s.offset.0 <= offset.0);
    let i = after - 1;
    let (a, b) = (&samples[i], &samples[i + 1]);

    let span = b.offset.0 - a.offset.0;
    if span <= 0.0 {
        return (i, 0.0);
    }
    let progress = ((offset.0 - a.offset.0) / span).clamp(0.0, 1.0);
    (i, progress)
}

/// Events whose offset lies within `window` of `offset`, inclusive
pub fn events_near(events: &[TrackEvent], offset: Seconds, window: Seconds) -> Vec<TrackEvent> {
    events
        .iter()
        .filter(|e| (e.offset.0 - offset.0).abs() <= window.0)
        .cloned()
        .collect()
}

/// Derive the playback state of `track` at `offset`.
///
/// Pure and total: any offset is accepted and clamped into the track.
pub fn derive_state(track: &RideTrack, offset: Seconds, config: &ReplayConfig) -> DerivedPlaybackState {
    let offset = clamp_offset(track, offset);
    let samples = track.samples();
    let (i, progress) = locate_segment(samples, offset);

    let a = &samples[i];
    let (position, speed_kmh, battery_percent) = match samples.get(i + 1) {
        Some(b) if progress > 0.0 => (
            a.position().lerp(b.position(), progress),
            a.speed.lerp(b.speed, progress),
            a.battery.lerp(b.battery, progress),
        ),
        _ => (a.position(), a.speed, a.battery),
    };

    let total = track.total_duration().0;
    let fraction_complete = if total > 0.0 { offset.0 / total } else { 1.0 };

    DerivedPlaybackState {
        offset_seconds: offset,
        position,
        speed_kmh,
        battery_percent,
        active_events: events_near(track.events(), offset, config.proximity_window()),
        segment_index: i,
        segment_progress: progress,
        fraction_complete,
        label: a.label.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventKind, RideRecord, Rider};
    use chrono::{TimeZone, Utc};

    const TOLERANCE: f64 = 1e-4;

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

    fn make_track(samples: Vec<TrackPoint>, events: Vec<TrackEvent>) -> RideTrack {
        RideTrack::try_from(RideRecord {
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
        })
        .unwrap()
    }

    fn riyadh_track() -> RideTrack {
        make_track(
            vec![
                point(24.7136, 46.6753, 0.0, 0.0, 85.0),
                point(24.6877, 46.7219, 720.0, 0.0, 74.0),
            ],
            vec![],
        )
    }

    fn city_track() -> RideTrack {
        let mut samples = vec![
            point(24.7136, 46.6753, 0.0, 0.0, 85.0),
            point(24.7100, 46.6800, 120.0, 18.0, 83.0),
            point(24.7050, 46.6900, 300.0, 24.0, 80.0),
            point(24.6950, 46.7100, 540.0, 12.0, 77.0),
            point(24.6877, 46.7219, 720.0, 0.0, 74.0),
        ];
        samples[2].label = Some("Olaya St".to_string());
        let events = vec![TrackEvent {
            offset: Seconds(180.0),
            kind: EventKind::SpeedWarning,
            description: "Speed above 25 km/h".to_string(),
            latitude: None,
            longitude: None,
            extra: None,
        }];
        make_track(samples, events)
    }

    fn assert_matches_sample(state: &DerivedPlaybackState, sample: &TrackPoint) {
        assert_eq!(state.position, sample.position());
        assert_eq!(state.speed_kmh, sample.speed);
        assert_eq!(state.battery_percent, sample.battery);
    }

    #[test]
    fn test_midpoint_of_two_sample_track() {
        let track = riyadh_track();
        let state = derive_state(&track, Seconds(360.0), &ReplayConfig::default());

        assert!((state.position.latitude - 24.70065).abs() < TOLERANCE);
        assert!((state.position.longitude - 46.6986).abs() < TOLERANCE);
        assert!(state.speed_kmh.0.abs() < TOLERANCE);
        assert!((state.battery_percent.0 - 79.5).abs() < TOLERANCE);
        assert!((state.fraction_complete - 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn test_offsets_before_start_return_first_sample() {
        let track = city_track();
        let config = ReplayConfig::default();
        for offset in [0.0, -0.001, -5.0, -1e9, f64::NEG_INFINITY, f64::NAN] {
            let state = derive_state(&track, Seconds(offset), &config);
            assert_matches_sample(&state, track.first_sample());
            assert_eq!(state.offset_seconds, Seconds(0.0));
            assert_eq!(state.segment_progress, 0.0);
        }
    }

    #[test]
    fn test_offsets_after_end_return_last_sample() {
        let track = city_track();
        let config = ReplayConfig::default();
        for offset in [720.0, 720.5, 5000.0, f64::INFINITY] {
            let state = derive_state(&track, Seconds(offset), &config);
            assert_matches_sample(&state, track.last_sample());
            assert_eq!(state.offset_seconds, Seconds(720.0));
            assert_eq!(state.fraction_complete, 1.0);
        }
    }

    #[test]
    fn test_exact_sample_offset_has_zero_progress() {
        let track = city_track();
        let state = derive_state(&track, Seconds(300.0), &ReplayConfig::default());
        assert_eq!(state.segment_index, 2);
        assert_eq!(state.segment_progress, 0.0);
        assert_matches_sample(&state, &track.samples()[2]);
        assert_eq!(state.label.as_deref(), Some("Olaya St"));
    }

    #[test]
    fn test_converges_at_sample_boundaries() {
        let track = city_track();
        let config = ReplayConfig::default();
        let eps = 1e-6;

        for sample in &track.samples()[1..track.samples().len() - 1] {
            let before = derive_state(&track, Seconds(sample.offset.0 - eps), &config);
            let after = derive_state(&track, Seconds(sample.offset.0 + eps), &config);
            for state in [&before, &after] {
                assert!((state.position.latitude - sample.latitude).abs() < TOLERANCE);
                assert!((state.position.longitude - sample.longitude).abs() < TOLERANCE);
                assert!((state.speed_kmh.0 - sample.speed.0).abs() < TOLERANCE);
                assert!((state.battery_percent.0 - sample.battery.0).abs() < TOLERANCE);
            }
        }
    }

    #[test]
    fn test_continuous_between_samples() {
        let track = city_track();
        let config = ReplayConfig::default();
        let step = 0.5;
        let mut prev = derive_state(&track, Seconds(0.0), &config);
        let mut t = step;
        while t <= 720.0 {
            let next = derive_state(&track, Seconds(t), &config);
            // Fixture segments change by well under these bounds per half second
            assert!((next.position.latitude - prev.position.latitude).abs() < 1e-4);
            assert!((next.position.longitude - prev.position.longitude).abs() < 1e-4);
            assert!((next.speed_kmh.0 - prev.speed_kmh.0).abs() < 0.1);
            assert!((next.battery_percent.0 - prev.battery_percent.0).abs() < 0.05);
            prev = next;
            t += step;
        }
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let track = city_track();
        let config = ReplayConfig::default();
        for offset in [0.0, 37.25, 180.0, 611.9, 720.0] {
            let first = derive_state(&track, Seconds(offset), &config);
            let second = derive_state(&track, Seconds(offset), &config);
            assert_eq!(first, second);
            assert_eq!(
                first.position.latitude.to_bits(),
                second.position.latitude.to_bits()
            );
        }
    }

    #[test]
    fn test_event_proximity_window() {
        let track = city_track();
        let config = ReplayConfig::default();

        for offset in [170.0, 175.0, 180.0, 185.0, 190.0] {
            let state = derive_state(&track, Seconds(offset), &config);
            assert_eq!(state.active_events.len(), 1, "offset {}", offset);
            assert_eq!(state.active_events[0].kind, EventKind::SpeedWarning);
        }
        for offset in [169.0, 191.0] {
            let state = derive_state(&track, Seconds(offset), &config);
            assert!(state.active_events.is_empty(), "offset {}", offset);
        }
    }

    #[test]
    fn test_custom_proximity_window() {
        let track = city_track();
        let config = ReplayConfig {
            proximity_window_seconds: 2.0,
            ..Default::default()
        };
        assert_eq!(derive_state(&track, Seconds(182.0), &config).active_events.len(), 1);
        assert!(derive_state(&track, Seconds(183.0), &config).active_events.is_empty());
    }

    #[test]
    fn test_locate_segment_zero_length_segment() {
        // Not constructible through RideTrack, but must not panic
        let samples = vec![
            point(0.0, 0.0, 0.0, 0.0, 90.0),
            point(1.0, 1.0, 10.0, 5.0, 89.0),
            point(2.0, 2.0, 10.0, 6.0, 88.0),
            point(3.0, 3.0, 20.0, 7.0, 87.0),
        ];
        let (i, progress) = locate_segment(&samples, Seconds(10.0));
        assert_eq!(progress, 0.0);
        assert!(i == 1 || i == 2);

        let (i, progress) = locate_segment(&samples, Seconds(15.0));
        assert_eq!(i, 2);
        assert!((progress - 0.5).abs() < TOLERANCE);
    }

    #[test]
    fn test_locate_segment_empty_and_single() {
        assert_eq!(locate_segment(&[], Seconds(5.0)), (0, 0.0));
        let one = vec![point(0.0, 0.0, 0.0, 0.0, 50.0)];
        assert_eq!(locate_segment(&one, Seconds(5.0)), (0, 0.0));
    }
}
