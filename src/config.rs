use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::DataError;

/// Below this groundspeed a pilot has no meaningful time to arrival.
pub const MIN_GROUNDSPEED_KTS: f64 = 50.0;

/// Which movements count towards an airport's congestion.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficFilter {
    /// When off, every filed movement counts.
    pub enabled: bool,
    /// Departures closer than this to their departure airport, and arrivals
    /// closer than this to their destination, count.
    pub distance_nm: f64,
    /// Arrivals expected within this many hours count.
    pub arriving_within_hours: f64,
    /// Pilots without a flight plan are attached to the nearest airport
    /// within this radius.
    pub snap_radius_nm: f64,
}

impl Default for TrafficFilter {
    fn default() -> Self {
        TrafficFilter {
            enabled: true,
            distance_nm: 5.0,
            arriving_within_hours: 1.0,
            snap_radius_nm: 3.0,
        }
    }
}

impl TrafficFilter {
    pub fn departure_counts(&self, distance_from_departure_nm: f64) -> bool {
        !self.enabled || distance_from_departure_nm < self.distance_nm
    }

    pub fn arrival_counts(&self, distance_to_destination_nm: f64, groundspeed_kts: f64) -> bool {
        !self.enabled
            || distance_to_destination_nm < self.distance_nm
            || hours_to_arrival(distance_to_destination_nm, groundspeed_kts)
                .is_some_and(|h| h < self.arriving_within_hours)
    }
}

/// Remaining flight time at the current groundspeed, if moving fast enough
/// for the estimate to mean anything.
pub fn hours_to_arrival(distance_nm: f64, groundspeed_kts: f64) -> Option<f64> {
    (groundspeed_kts > MIN_GROUNDSPEED_KTS).then(|| distance_nm / groundspeed_kts)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub traffic_filter: TrafficFilter,
    /// Point spacing used when tessellating routes and sector edges.
    pub great_circle_spacing_nm: f64,
    /// Longest polyline a single route request may produce.
    pub max_route_points: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            traffic_filter: TrafficFilter::default(),
            great_circle_spacing_nm: 30.0,
            max_route_points: 10_000,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, DataError> {
        let json = fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
