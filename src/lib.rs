pub mod config;
pub mod congestion;
pub mod data;
pub mod geodesy;
pub mod polygon;
pub mod spatial;

use serde::{Deserialize, Serialize};

/// Tolerance in degrees below which two coordinates are considered the same point.
pub const COORD_EPSILON_DEG: f64 = 1e-9;

/// A geographic position in decimal degrees on the reference sphere.
///
/// Coordinates are not range checked: latitudes outside ±90 or longitudes
/// outside ±180 flow through the math unchanged and give meaningless results.
/// Validation belongs to whoever parses the data.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        GeoPoint { lat, lon }
    }

    /// True if both coordinates agree within [`COORD_EPSILON_DEG`].
    pub fn approx_eq(&self, other: &GeoPoint) -> bool {
        (self.lat - other.lat).abs() < COORD_EPSILON_DEG
            && (self.lon - other.lon).abs() < COORD_EPSILON_DEG
    }

    pub fn distance_nm(&self, other: &GeoPoint) -> f64 {
        geodesy::great_circle::distance_nm(*self, *other)
    }

    /// Unit vector of this position (x towards 0/0, z towards the north pole).
    pub fn to_unit_vector(&self) -> [f64; 3] {
        let (lat, lon) = (self.lat.to_radians(), self.lon.to_radians());
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    }
}

/// Anything the engine can place on the globe: airports, pilots, controllers.
///
/// The engine only reads the identifier and position and never keeps a
/// reference past the call it was handed in.
pub trait TrafficEntity {
    fn id(&self) -> &str;
    fn position(&self) -> GeoPoint;
}

impl<T: TrafficEntity + ?Sized> TrafficEntity for &T {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn position(&self) -> GeoPoint {
        (**self).position()
    }
}
