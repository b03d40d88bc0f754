//! Great-circle math on a spherical Earth where one nautical mile is one
//! minute of arc.
//!
//! Every function here is total: identical or antipodal inputs fall back to
//! the start point or zero rather than producing NaN.

use crate::GeoPoint;

/// Nautical miles per degree of arc.
pub const NM_PER_DEGREE: f64 = 60.0;

/// Below this `sin(d)` the slerp denominator is treated as zero.
const SLERP_EPSILON: f64 = 1e-12;

const FRACTION_EPSILON: f64 = 1e-9;

/// Central angle between two points in radians.
fn central_angle(a: GeoPoint, b: GeoPoint) -> f64 {
    if a.approx_eq(&b) {
        return 0.0;
    }
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlon = (b.lon - a.lon).to_radians();
    let cos_d = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * dlon.cos();
    let d = cos_d.clamp(-1.0, 1.0).acos();
    if d.is_nan() {
        0.0
    } else {
        d
    }
}

/// Great-circle distance in nautical miles (spherical law of cosines).
pub fn distance_nm(a: GeoPoint, b: GeoPoint) -> f64 {
    central_angle(a, b).to_degrees() * NM_PER_DEGREE
}

/// Initial true course from `a` to `b` in `[0, 360)`. Identical points give 0.
pub fn bearing_deg(a: GeoPoint, b: GeoPoint) -> f64 {
    if a.approx_eq(&b) {
        return 0.0;
    }
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlon = (b.lon - a.lon).to_radians();
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    normalize_bearing(y.atan2(x).to_degrees())
}

/// Point at fraction `f` along the great circle from `a` to `b`.
///
/// `f` is normally in `[0, 1]` but is not clamped. Returns `a` when the arc is
/// undefined (identical or antipodal endpoints).
pub fn point_at_fraction(a: GeoPoint, b: GeoPoint, f: f64) -> GeoPoint {
    let d = central_angle(a, b);
    let sin_d = d.sin();
    if d == 0.0 || sin_d.abs() < SLERP_EPSILON {
        return a;
    }

    let wa = ((1.0 - f) * d).sin() / sin_d;
    let wb = (f * d).sin() / sin_d;
    let [ax, ay, az] = a.to_unit_vector();
    let [bx, by, bz] = b.to_unit_vector();
    let x = wa * ax + wb * bx;
    let y = wa * ay + wb * by;
    let z = wa * az + wb * bz;

    GeoPoint {
        lat: z.atan2((x * x + y * y).sqrt()).to_degrees(),
        lon: y.atan2(x).to_degrees(),
    }
}

/// Destination reached from `a` after `distance_nm` on initial course
/// `bearing_deg` (clockwise from true north).
pub fn point_at_distance_bearing(a: GeoPoint, distance_nm: f64, bearing_deg: f64) -> GeoPoint {
    let delta = (distance_nm / NM_PER_DEGREE).to_radians();
    let theta = bearing_deg.to_radians();
    let lat1 = a.lat.to_radians();
    let lon1 = a.lon.to_radians();

    let sin_lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos())
        .clamp(-1.0, 1.0);
    let lat2 = sin_lat2.asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * sin_lat2);

    GeoPoint {
        lat: lat2.to_degrees(),
        lon: normalize_lon(lon2.to_degrees()),
    }
}

/// Wraps a longitude into `[-180, 180)`.
pub fn normalize_lon(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Wraps a course into `[0, 360)`.
pub fn normalize_bearing(deg: f64) -> f64 {
    let b = deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if b >= 360.0 {
        0.0
    } else {
        b
    }
}

/// Intermediate points roughly `spacing_nm` apart along the arc from `a` to `b`.
///
/// The end point `b` is never yielded; callers drawing a full polyline push
/// it themselves. Identical endpoints, or a spacing that is not a positive
/// finite number, yield `a` alone. The iterator is `Clone`, so a copy taken
/// before iterating replays the same sequence.
pub fn great_circle_points(a: GeoPoint, b: GeoPoint, spacing_nm: f64) -> GreatCirclePoints {
    let distance = distance_nm(a, b);
    let count = if distance == 0.0 || !spacing_nm.is_finite() || spacing_nm <= 0.0 {
        1
    } else {
        let step = spacing_nm / distance;
        if step >= 1.0 {
            1
        } else {
            // number of k with k * step < 1, ignoring points rounding onto `b`
            ((1.0 / step) - FRACTION_EPSILON).ceil() as usize
        }
    };

    GreatCirclePoints {
        from: a,
        to: b,
        step: if count > 1 { spacing_nm / distance } else { 0.0 },
        next: 0,
        count,
    }
}

/// Complete polyline from `a` to `b` with the end point appended, or `None`
/// when the spacing would need more than `max_points` points.
pub fn route_polyline(
    a: GeoPoint,
    b: GeoPoint,
    spacing_nm: f64,
    max_points: usize,
) -> Option<Vec<GeoPoint>> {
    let points = great_circle_points(a, b, spacing_nm);
    let closes = !a.approx_eq(&b);
    if points.len() + usize::from(closes) > max_points {
        return None;
    }
    let mut polyline: Vec<GeoPoint> = points.collect();
    if closes {
        polyline.push(b);
    }
    Some(polyline)
}

#[derive(Clone, Debug)]
pub struct GreatCirclePoints {
    from: GeoPoint,
    to: GeoPoint,
    step: f64,
    next: usize,
    count: usize,
}

impl Iterator for GreatCirclePoints {
    type Item = GeoPoint;

    fn next(&mut self) -> Option<GeoPoint> {
        if self.next >= self.count {
            return None;
        }
        let f = self.next as f64 * self.step;
        self.next += 1;
        if f == 0.0 {
            Some(self.from)
        } else {
            Some(point_at_fraction(self.from, self.to, f))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.count - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for GreatCirclePoints {}
