use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::geodesy::great_circle::{distance_nm, NM_PER_DEGREE};
use crate::spatial::proximity::{within_radius, COINCIDENCE_EPSILON_NM};
use crate::GeoPoint;

/// Extra chord slack so rounding never drops a point the exact check accepts.
const CHORD_SLACK_NM: f64 = 1e-3;

/// Node in a 3D k-d tree over unit-sphere vectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KDNode {
    pub point: [f64; 3],
    pub index: usize,
    pub axis: usize,
    pub left: Option<Box<KDNode>>,
    pub right: Option<Box<KDNode>>,
}

/// k-d tree over positions mapped onto the unit sphere.
///
/// Arc radius maps monotonically to straight-line chord length, so a
/// Euclidean ball search finds exactly the points within a great-circle
/// radius. Candidates are then confirmed with [`distance_nm`], giving the
/// same matches as the linear scan in [`crate::spatial::proximity`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SphereIndex {
    pub root: Option<Box<KDNode>>,
    positions: Vec<GeoPoint>,
}

impl SphereIndex {
    pub fn build(positions: &[GeoPoint]) -> Self {
        let points: Vec<[f64; 3]> = positions.iter().map(GeoPoint::to_unit_vector).collect();
        let mut indices: Vec<usize> = (0..points.len()).collect();
        let root = Self::build_recursive(&points, &mut indices, 0);
        SphereIndex {
            root,
            positions: positions.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    fn build_recursive(
        points: &[[f64; 3]],
        idx: &mut [usize],
        depth: usize,
    ) -> Option<Box<KDNode>> {
        if idx.is_empty() {
            return None;
        }

        let axis = depth % 3;
        idx.sort_by(|&a, &b| points[a][axis].total_cmp(&points[b][axis]));
        let mid = idx.len() / 2;
        let median = idx[mid];

        Some(Box::new(KDNode {
            point: points[median],
            index: median,
            axis,
            left: Self::build_recursive(points, &mut idx[..mid], depth + 1),
            right: Self::build_recursive(points, &mut idx[mid + 1..], depth + 1),
        }))
    }

    /// Up to `n` positions within `radius_nm` of `target` as
    /// `(index, distance_nm)`, nearest first, ties by index.
    pub fn nearest_n_within_nm(
        &self,
        target: GeoPoint,
        radius_nm: f64,
        n: usize,
    ) -> Vec<(usize, f64)> {
        if radius_nm < 0.0 {
            return Vec::new();
        }
        let chord = chord_for_nm(radius_nm + COINCIDENCE_EPSILON_NM + CHORD_SLACK_NM);
        let mut candidates = Vec::new();
        self.search_recursive(&self.root, target.to_unit_vector(), chord * chord, &mut candidates);

        let mut results: Vec<(usize, f64)> = candidates
            .into_iter()
            .map(|idx| (idx, distance_nm(target, self.positions[idx])))
            .filter(|&(_, d)| within_radius(d, radius_nm))
            .collect();
        results.sort_by(|a, b| match a.1.total_cmp(&b.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        results.truncate(n);
        results
    }

    #[allow(clippy::only_used_in_recursion)]
    fn search_recursive(
        &self,
        node: &Option<Box<KDNode>>,
        target: [f64; 3],
        radius2: f64,
        results: &mut Vec<usize>,
    ) {
        if let Some(noderef) = node {
            let dx = noderef.point[0] - target[0];
            let dy = noderef.point[1] - target[1];
            let dz = noderef.point[2] - target[2];
            if dx * dx + dy * dy + dz * dz <= radius2 {
                results.push(noderef.index);
            }

            let axis = noderef.axis;
            let delta = target[axis] - noderef.point[axis];
            let (first, second) = if delta < 0.0 {
                (&noderef.left, &noderef.right)
            } else {
                (&noderef.right, &noderef.left)
            };

            self.search_recursive(first, target, radius2, results);
            if delta * delta <= radius2 {
                self.search_recursive(second, target, radius2, results);
            }
        }
    }
}

/// Straight-line distance through the unit sphere for an arc of `nm`.
fn chord_for_nm(nm: f64) -> f64 {
    let angle = (nm / NM_PER_DEGREE).to_radians();
    if angle >= std::f64::consts::PI {
        2.0
    } else {
        2.0 * (angle / 2.0).sin()
    }
}

#[cfg(test)]
mod tests {
    use super::SphereIndex;
    use crate::spatial::proximity::entities_within_nm;
    use crate::{GeoPoint, TrafficEntity};

    struct Pos(GeoPoint);

    impl TrafficEntity for Pos {
        fn id(&self) -> &str {
            "pos"
        }

        fn position(&self) -> GeoPoint {
            self.0
        }
    }

    #[test]
    fn nearest_n_within_radius_basic() {
        let pts = [
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 1.0),
            GeoPoint::new(2.0, 2.0),
            GeoPoint::new(0.0, -2.0),
        ];
        let index = SphereIndex::build(&pts);
        let res = index.nearest_n_within_nm(GeoPoint::new(0.0, 0.0), 90.0, 3);
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].0, 0);
        assert_eq!(res[1].0, 1);
        assert!((res[1].1 - 60.0).abs() < 1e-6);
    }

    #[test]
    fn matches_linear_scan_across_antimeridian() {
        let mut pts = Vec::new();
        for lat in (-80..=80).step_by(10) {
            for lon in (-180..180).step_by(15) {
                pts.push(GeoPoint::new(lat as f64, lon as f64));
            }
        }
        let index = SphereIndex::build(&pts);
        let wrapped: Vec<Pos> = pts.iter().map(|&p| Pos(p)).collect();

        for (center, radius) in [
            (GeoPoint::new(0.0, 179.0), 1000.0),
            (GeoPoint::new(85.0, 0.0), 900.0),
            (GeoPoint::new(-33.9, 151.2), 2500.0),
        ] {
            let mut from_tree: Vec<usize> = index
                .nearest_n_within_nm(center, radius, usize::MAX)
                .into_iter()
                .map(|(i, _)| i)
                .collect();
            from_tree.sort_unstable();
            let from_scan: Vec<usize> = entities_within_nm(center, radius, &wrapped)
                .iter()
                .map(|n| {
                    wrapped
                        .iter()
                        .position(|w| std::ptr::eq(w, n.entity))
                        .expect("entity from slice")
                })
                .collect();
            assert!(!from_scan.is_empty());
            assert_eq!(from_tree, from_scan);
        }
    }

    #[test]
    fn truncates_to_n_nearest() {
        let pts: Vec<GeoPoint> = (0..10).map(|i| GeoPoint::new(0.0, i as f64 * 0.1)).collect();
        let index = SphereIndex::build(&pts);
        let res = index.nearest_n_within_nm(GeoPoint::new(0.0, 0.0), 100.0, 3);
        let ids: Vec<usize> = res.iter().map(|r| r.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(index.nearest_n_within_nm(GeoPoint::new(0.0, 0.0), -1.0, 3).is_empty());
    }

    #[test]
    fn zero_radius_matches_only_coincident_positions() {
        let pts = [GeoPoint::new(12.500001, 45.25), GeoPoint::new(12.5, 45.25)];
        let index = SphereIndex::build(&pts);
        let res = index.nearest_n_within_nm(GeoPoint::new(12.5, 45.25), 0.0, 5);
        assert!(res.iter().all(|&(_, d)| d == 0.0));
        assert!(res.iter().any(|&(i, _)| i == 1));
    }
}
