//! Demo source that generates synthetic scooter rides for testing
//!
//! Each ride is described as a sequence of legs between waypoints. Samples
//! are laid down every 30 seconds along each leg with a little deterministic
//! jitter, and events (start/end, pauses, slow zones, speed and battery
//! warnings) are derived from the generated samples, so the data looks like
//! a real recording without needing a fleet backend.

use chrono::{DateTime, Utc};
use replay_core::{
    error::{ReplayError, Result},
    model::*,
    source::RideTrackSource,
    units::*,
};
use tracing::debug;

const SAMPLE_INTERVAL_SECS: u32 = 30;
const SPEED_LIMIT_KMH: f64 = 25.0;
const SLOW_ZONE_LIMIT_KMH: f64 = 15.0;
const BATTERY_LOW_PERCENT: f64 = 20.0;

// =============================================================================
// Route definition: a sequence of legs that form a ride
// =============================================================================

#[derive(Clone, Copy, PartialEq)]
enum LegKind {
    Ride,     // Normal riding at cruise speed
    SlowZone, // Geofenced low-speed area
    Stop,     // Stationary (traffic light, rider pause)
}

#[derive(Clone, Copy)]
struct RouteLeg {
    kind: LegKind,
    to: (f64, f64),   // destination waypoint (lat, lng); ignored for stops
    duration: u32,    // seconds
    cruise_kmh: f64,  // representative speed along the leg
    label: &'static str,
}

struct DemoRide {
    id: &'static str,
    rider_id: &'static str,
    rider_name: &'static str,
    vehicle_id: &'static str,
    start_unix: i64,
    origin: (f64, f64),
    origin_label: &'static str,
    battery: f64,
    drain_per_min: f64,
    legs: Vec<RouteLeg>,
}

fn leg(kind: LegKind, to: (f64, f64), duration: u32, cruise_kmh: f64, label: &'static str) -> RouteLeg {
    RouteLeg { kind, to, duration, cruise_kmh, label }
}

/// Three rides across Riyadh, Jeddah and Dammam
fn demo_rides() -> Vec<DemoRide> {
    vec![
        // Olaya to King Fahd Rd, ~12 minutes with a slow zone and a red light
        DemoRide {
            id: "RIDE-1001",
            rider_id: "USR-2001",
            rider_name: "Ahmed Al-Rashid",
            vehicle_id: "SC-0142",
            start_unix: 1_709_280_000, // 2024-03-01T08:00:00Z
            origin: (24.7136, 46.6753),
            origin_label: "Olaya Hub",
            battery: 85.0,
            drain_per_min: 1.0,
            legs: vec![
                leg(LegKind::Ride,     (24.7080, 46.6850), 180, 21.0, "Olaya St"),
                leg(LegKind::SlowZone, (24.7010, 46.6960), 150, 12.0, "Tahlia St"),
                leg(LegKind::Stop,     (0.0, 0.0),          60,  0.0, "Traffic light"),
                leg(LegKind::Ride,     (24.6877, 46.7219), 330, 27.0, "King Fahd Rd"),
            ],
        },
        // Jeddah Corniche on a nearly flat battery
        DemoRide {
            id: "RIDE-1002",
            rider_id: "USR-2002",
            rider_name: "Sara Al-Harbi",
            vehicle_id: "SC-0377",
            start_unix: 1_709_400_600, // 2024-03-02T17:30:00Z
            origin: (21.5433, 39.1728),
            origin_label: "Corniche North",
            battery: 28.0,
            drain_per_min: 0.9,
            legs: vec![
                leg(LegKind::Ride,     (21.5360, 39.1660), 240, 19.0, "Corniche Rd"),
                leg(LegKind::Stop,     (0.0, 0.0),         120,  0.0, "Photo stop"),
                leg(LegKind::Ride,     (21.5250, 39.1600), 300, 22.0, "Fountain view"),
                leg(LegKind::SlowZone, (21.5205, 39.1575), 180, 10.0, "Waterfront promenade"),
            ],
        },
        // Short Dammam commute
        DemoRide {
            id: "RIDE-1003",
            rider_id: "USR-2003",
            rider_name: "Khalid Al-Otaibi",
            vehicle_id: "SC-0519",
            start_unix: 1_709_450_100, // 2024-03-03T07:15:00Z
            origin: (26.4207, 50.0888),
            origin_label: "Dammam Station",
            battery: 64.0,
            drain_per_min: 1.2,
            legs: vec![
                leg(LegKind::Ride, (26.4290, 50.0990), 210, 24.0, "King Saud St"),
                leg(LegKind::Ride, (26.4345, 50.1050), 150, 26.0, "Prince Mohammed Rd"),
            ],
        },
    ]
}

// =============================================================================
// Sample and event generation
// =============================================================================

/// Simple deterministic noise from a seed
fn noise(seed: f64) -> f64 {
    let x = (seed * 12.9898 + 78.233).sin() * 43_758.547;
    x - x.floor()
}

/// Small jitter centered around 0
fn jitter(seed: f64, amplitude: f64) -> f64 {
    (noise(seed) - 0.5) * 2.0 * amplitude
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn event(offset: f64, kind: EventKind, description: String, at: (f64, f64)) -> TrackEvent {
    TrackEvent {
        offset: Seconds(offset),
        kind,
        description,
        latitude: Some(at.0),
        longitude: Some(at.1),
        extra: None,
    }
}

fn build_record(ride: &DemoRide) -> RideRecord {
    let start_time = DateTime::<Utc>::from_timestamp(ride.start_unix, 0).unwrap_or_default();

    let mut samples = vec![TrackPoint {
        latitude: ride.origin.0,
        longitude: ride.origin.1,
        offset: Seconds(0.0),
        speed: KilometersPerHour(0.0),
        battery: Percent(ride.battery),
        label: Some(ride.origin_label.to_string()),
    }];
    let mut events = vec![event(
        0.0,
        EventKind::RideStart,
        format!("Ride started at {}", ride.origin_label),
        ride.origin,
    )];

    let mut position = ride.origin;
    let mut battery = ride.battery;
    let mut leg_start = 0u32;
    let mut warned_speed = false;
    let mut warned_battery = false;

    for (leg_idx, leg) in ride.legs.iter().enumerate() {
        let from = position;
        let to = if leg.kind == LegKind::Stop { from } else { leg.to };
        let leg_end = leg_start + leg.duration;

        match leg.kind {
            LegKind::Stop => events.push(event(
                leg_start as f64,
                EventKind::Pause,
                format!("Paused: {}", leg.label),
                from,
            )),
            LegKind::SlowZone => {
                let mut zone = event(
                    leg_start as f64,
                    EventKind::ZoneEnter,
                    format!("Entered slow zone: {}", leg.label),
                    from,
                );
                zone.extra = Some(serde_json::json!({
                    "zone": leg.label,
                    "speed_limit_kmh": SLOW_ZONE_LIMIT_KMH,
                }));
                events.push(zone);
            }
            LegKind::Ride => {}
        }

        let steps = leg.duration.div_ceil(SAMPLE_INTERVAL_SECS).max(1);
        for k in 1..=steps {
            let t = k as f64 / steps as f64;
            let offset = leg_start as f64 + leg.duration as f64 * t;
            let seed = leg_idx as f64 * 100.0 + k as f64;

            let (lat, lng) = (Lerp::lerp(from.0, to.0, t), Lerp::lerp(from.1, to.1, t));
            let speed = match leg.kind {
                LegKind::Stop => 0.0,
                _ => (leg.cruise_kmh + jitter(seed, 1.5)).max(0.0),
            };

            let drain = match leg.kind {
                LegKind::Stop => ride.drain_per_min * 0.1,
                _ => ride.drain_per_min,
            };
            let dt = leg.duration as f64 / steps as f64;
            battery = Percent::new(battery - drain * dt / 60.0).0;

            samples.push(TrackPoint {
                latitude: lat,
                longitude: lng,
                offset: Seconds(offset),
                speed: KilometersPerHour(round2(speed)),
                battery: Percent(round2(battery)),
                label: (k == steps && leg.kind != LegKind::Stop).then(|| leg.label.to_string()),
            });

            if speed > SPEED_LIMIT_KMH && !warned_speed {
                warned_speed = true;
                events.push(event(
                    offset,
                    EventKind::SpeedWarning,
                    format!("Speed {:.1} km/h above {} km/h limit", speed, SPEED_LIMIT_KMH),
                    (lat, lng),
                ));
            } else if speed <= SPEED_LIMIT_KMH {
                warned_speed = false;
            }

            if battery < BATTERY_LOW_PERCENT && !warned_battery {
                warned_battery = true;
                events.push(event(
                    offset,
                    EventKind::BatteryLow,
                    format!("Battery low ({:.0}%)", battery),
                    (lat, lng),
                ));
            }
        }

        if leg.kind == LegKind::Stop {
            events.push(event(
                leg_end as f64,
                EventKind::Resume,
                "Ride resumed".to_string(),
                from,
            ));
        }

        position = to;
        leg_start = leg_end;
    }

    // The scooter is parked at the end of every ride
    if let Some(last) = samples.last_mut() {
        last.speed = KilometersPerHour(0.0);
    }
    events.push(event(
        leg_start as f64,
        EventKind::RideEnd,
        "Ride ended".to_string(),
        position,
    ));

    RideRecord {
        id: ride.id.to_string(),
        rider: Rider {
            id: ride.rider_id.to_string(),
            name: ride.rider_name.to_string(),
        },
        vehicle_id: ride.vehicle_id.to_string(),
        start_time,
        end_time: Some(start_time + chrono::Duration::seconds(leg_start as i64)),
        samples,
        events,
    }
}

// =============================================================================
// DemoSource
// =============================================================================

pub struct DemoSource {
    records: Vec<RideRecord>,
}

impl DemoSource {
    pub fn new() -> Self {
        Self {
            records: demo_rides().iter().map(build_record).collect(),
        }
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RideTrackSource for DemoSource {
    fn name(&self) -> &str {
        "Demo"
    }

    fn load_ride_track(&self, ride_id: &str) -> Result<RideTrack> {
        let record = self
            .records
            .iter()
            .find(|r| r.id == ride_id)
            .ok_or_else(|| ReplayError::not_found(ride_id))?;

        debug!(ride_id, samples = record.samples.len(), "Loading demo ride");
        RideTrack::try_from(record.clone())
    }

    fn list_rides(&self) -> Result<Vec<RideListing>> {
        Ok(self
            .records
            .iter()
            .map(|r| RideListing {
                ride_id: r.id.clone(),
                rider_name: r.rider.name.clone(),
                vehicle_id: r.vehicle_id.clone(),
                start_time: r.start_time,
            })
            .collect())
    }
}
