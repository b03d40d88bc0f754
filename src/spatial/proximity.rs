//! Radius queries over caller-supplied candidates.
//!
//! Plain linear scans: a few thousand airports and a few hundred pilots per
//! snapshot. [`crate::spatial::kd_tree::SphereIndex`] answers the same
//! question for tables that are queried many times.

use crate::congestion::traffic::Controller;
use crate::geodesy::great_circle::{distance_nm, NM_PER_DEGREE};
use crate::{GeoPoint, TrafficEntity, COORD_EPSILON_DEG};

/// Slack added to every radius: the same tolerance under which
/// [`distance_nm`] reports two points as coincident.
pub const COINCIDENCE_EPSILON_NM: f64 = COORD_EPSILON_DEG * NM_PER_DEGREE;

/// A candidate that matched a radius query.
#[derive(Debug)]
pub struct Nearby<'a, T> {
    pub entity: &'a T,
    pub distance_nm: f64,
}

impl<T> Clone for Nearby<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Nearby<'_, T> {}

pub fn within_radius(distance: f64, radius_nm: f64) -> bool {
    distance <= radius_nm + COINCIDENCE_EPSILON_NM
}

/// Every candidate within `radius_nm` of `center`, in input order.
pub fn entities_within_nm<'a, T: TrafficEntity>(
    center: GeoPoint,
    radius_nm: f64,
    candidates: &'a [T],
) -> Vec<Nearby<'a, T>> {
    candidates
        .iter()
        .filter_map(|entity| {
            let d = distance_nm(center, entity.position());
            within_radius(d, radius_nm).then_some(Nearby {
                entity,
                distance_nm: d,
            })
        })
        .collect()
}

/// Closest candidate within `radius_nm`; the earlier one wins a tie.
pub fn nearest_within_nm<'a, T: TrafficEntity>(
    center: GeoPoint,
    radius_nm: f64,
    candidates: &'a [T],
) -> Option<Nearby<'a, T>> {
    entities_within_nm(center, radius_nm, candidates)
        .into_iter()
        .fold(None, |best: Option<Nearby<'a, T>>, n| match best {
            Some(b) if b.distance_nm <= n.distance_nm => Some(b),
            _ => Some(n),
        })
}

/// Controllers whose own visual range reaches `point`.
pub fn controllers_in_range(point: GeoPoint, controllers: &[Controller]) -> Vec<&Controller> {
    controllers
        .iter()
        .filter(|c| within_radius(distance_nm(point, c.position), c.visual_range_nm))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fix {
        name: &'static str,
        at: GeoPoint,
    }

    impl TrafficEntity for Fix {
        fn id(&self) -> &str {
            self.name
        }

        fn position(&self) -> GeoPoint {
            self.at
        }
    }

    fn fix(name: &'static str, lat: f64, lon: f64) -> Fix {
        Fix {
            name,
            at: GeoPoint::new(lat, lon),
        }
    }

    #[test]
    fn hundred_mile_radius() {
        let candidates = [fix("NEAR", 0.0, 1.0), fix("FAR", 10.0, 10.0)];
        let hits = entities_within_nm(GeoPoint::new(0.0, 0.0), 100.0, &candidates);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity.id(), "NEAR");
        assert!((hits[0].distance_nm - 60.0).abs() < 1e-6);
    }

    #[test]
    fn empty_candidates() {
        let none: [Fix; 0] = [];
        assert!(entities_within_nm(GeoPoint::default(), 500.0, &none).is_empty());
        assert!(nearest_within_nm(GeoPoint::default(), 500.0, &none).is_none());
    }

    #[test]
    fn zero_radius_only_matches_coincident() {
        let candidates = [fix("SAME", 12.5, 45.25), fix("CLOSE", 12.5, 45.26)];
        let hits = entities_within_nm(GeoPoint::new(12.5, 45.25), 0.0, &candidates);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity.id(), "SAME");
        assert_eq!(hits[0].distance_nm, 0.0);
    }

    #[test]
    fn zero_radius_rejects_micro_offsets() {
        let center = GeoPoint::new(12.5, 45.25);
        let candidates = [fix("OFFSET", 12.500001, 45.25), fix("SAME", 12.5, 45.25)];
        let hits = entities_within_nm(center, 0.0, &candidates);
        assert!(hits.iter().all(|n| n.distance_nm == 0.0));
        assert!(hits.iter().any(|n| n.entity.id() == "SAME"));
        assert!(nearest_within_nm(center, 0.0, &candidates[..1])
            .map_or(true, |n| n.distance_nm == 0.0));
    }

    #[test]
    fn results_keep_input_order() {
        let candidates = [fix("B", 0.0, 0.5), fix("A", 0.0, 0.1), fix("C", 0.0, 0.3)];
        let ids: Vec<&str> = entities_within_nm(GeoPoint::default(), 60.0, &candidates)
            .iter()
            .map(|n| n.entity.id())
            .collect();
        assert_eq!(ids, vec!["B", "A", "C"]);
    }

    #[test]
    fn nearest_prefers_first_on_tie() {
        let candidates = [fix("FAR", 0.0, 0.04), fix("EAST", 0.0, 0.02), fix("WEST", 0.0, -0.02)];
        let best = nearest_within_nm(GeoPoint::default(), 3.0, &candidates).expect("nearest");
        assert_eq!(best.entity.id(), "EAST");
        assert!(nearest_within_nm(GeoPoint::new(45.0, 45.0), 3.0, &candidates).is_none());
    }

    #[test]
    fn controller_visual_range() {
        let controllers = vec![
            Controller {
                callsign: "EDDM_TWR".into(),
                position: GeoPoint::new(48.35, 11.79),
                visual_range_nm: 50.0,
            },
            Controller {
                callsign: "EDMM_CTR".into(),
                position: GeoPoint::new(49.5, 11.0),
                visual_range_nm: 300.0,
            },
            Controller {
                callsign: "LOWW_TWR".into(),
                position: GeoPoint::new(48.11, 16.57),
                visual_range_nm: 50.0,
            },
        ];
        let ids: Vec<&str> = controllers_in_range(GeoPoint::new(48.35, 11.79), &controllers)
            .iter()
            .map(|c| c.callsign.as_str())
            .collect();
        assert_eq!(ids, vec!["EDDM_TWR", "EDMM_CTR"]);
    }
}
