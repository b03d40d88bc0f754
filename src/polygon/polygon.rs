use serde::{Deserialize, Serialize};

use crate::geodesy::great_circle::great_circle_points;
use crate::GeoPoint;

/// Edges whose latitude span is below this are treated as vertical in the
/// ray-casting test.
const VERTICAL_EPSILON: f64 = 1e-6;

/// Vertex count hardcoded into the edge wrap of the legacy renderer.
const LEGACY_WRAP: usize = 8;

/// How the containment test picks the vertex following index `i`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EdgeWrap {
    /// `(i + 1) % len`, a proper ring walk.
    #[default]
    Size,
    /// `(i + 1) % 8` as the legacy renderer did. Only useful for parity
    /// checks against old output; wrong for rings longer than eight points.
    LegacyEight,
}

/// Closed boundary ring of a control sector.
///
/// Construction appends the first vertex when the ring is open, so the
/// first and last points are always equal. Rings with fewer than three
/// distinct vertices are degenerate and contain nothing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<GeoPoint>", into = "Vec<GeoPoint>")]
pub struct Polygon {
    points: Vec<GeoPoint>,
    degenerate: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Polygon {
    pub fn new(mut points: Vec<GeoPoint>) -> Self {
        if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) {
            if !first.approx_eq(&last) {
                points.push(first);
            }
        }
        let degenerate = distinct_vertex_count(&points) < 3;
        Polygon { points, degenerate }
    }

    /// The closed ring, first point repeated at the end.
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Ring vertices without the closing duplicate.
    pub fn vertices(&self) -> &[GeoPoint] {
        match self.points.len() {
            0 | 1 => &self.points,
            n => &self.points[..n - 1],
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        self.contains_with(point, EdgeWrap::Size)
    }

    /// Ray-casting point-in-polygon with latitude as the scan axis.
    ///
    /// Points exactly on an edge may land on either side, but always the same
    /// side for the same input. Rings crossing the antimeridian are not
    /// unwrapped.
    pub fn contains_with(&self, point: GeoPoint, wrap: EdgeWrap) -> bool {
        if self.degenerate {
            return false;
        }
        let size = self.points.len();
        let modulus = match wrap {
            EdgeWrap::Size => size,
            EdgeWrap::LegacyEight => LEGACY_WRAP,
        };

        let mut crossings = 0usize;
        for (i, &from) in self.points.iter().enumerate() {
            let Some(&to) = self.points.get((i + 1) % modulus) else {
                continue;
            };
            if edge_crossed(from, to, point) {
                crossings += 1;
            }
        }
        crossings % 2 == 1
    }

    pub fn bounds(&self) -> Option<GeoBounds> {
        let first = self.points.first()?;
        let init = GeoBounds {
            south: first.lat,
            west: first.lon,
            north: first.lat,
            east: first.lon,
        };
        Some(self.points.iter().fold(init, |b, p| GeoBounds {
            south: b.south.min(p.lat),
            west: b.west.min(p.lon),
            north: b.north.max(p.lat),
            east: b.east.max(p.lon),
        }))
    }

    /// Mean of the vertices; where sector labels are drawn.
    pub fn label_point(&self) -> Option<GeoPoint> {
        let vertices = self.vertices();
        if vertices.is_empty() {
            return None;
        }
        let n = vertices.len() as f64;
        let (lat, lon) = vertices
            .iter()
            .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
        Some(GeoPoint::new(lat / n, lon / n))
    }

    /// The ring with every edge subdivided along its great circle, closing
    /// point included. Used to tessellate filled sector shapes.
    pub fn densified(&self, spacing_nm: f64) -> Vec<GeoPoint> {
        let mut out = Vec::with_capacity(self.points.len());
        for edge in self.points.windows(2) {
            out.extend(great_circle_points(edge[0], edge[1], spacing_nm));
        }
        if let Some(&last) = self.points.last() {
            out.push(last);
        }
        out
    }
}

impl From<Vec<GeoPoint>> for Polygon {
    fn from(points: Vec<GeoPoint>) -> Self {
        Polygon::new(points)
    }
}

impl From<Polygon> for Vec<GeoPoint> {
    fn from(polygon: Polygon) -> Self {
        polygon.points
    }
}

fn distinct_vertex_count(points: &[GeoPoint]) -> usize {
    let mut distinct: Vec<GeoPoint> = Vec::new();
    for p in points {
        if !distinct.iter().any(|d| d.approx_eq(p)) {
            distinct.push(*p);
            if distinct.len() >= 3 {
                break;
            }
        }
    }
    distinct.len()
}

/// Whether the eastward ray from `p` crosses the edge `a`-`b`.
///
/// The edge only counts when `p.lat` lies in the half-open span
/// `(low.lat, high.lat]`, so a ray through a shared vertex is counted once.
fn edge_crossed(a: GeoPoint, b: GeoPoint, p: GeoPoint) -> bool {
    let (low, high) = if a.lat <= b.lat { (a, b) } else { (b, a) };
    if !(low.lat < p.lat && p.lat <= high.lat) {
        return false;
    }
    let span = high.lat - low.lat;
    let k = if span.abs() < VERTICAL_EPSILON {
        f64::INFINITY
    } else {
        (high.lon - low.lon) / span
    };
    let edge_lon = if k.is_infinite() {
        low.lon
    } else {
        low.lon + k * (p.lat - low.lat)
    };
    p.lon <= edge_lon
}
