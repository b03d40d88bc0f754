//! Per-airport movement counts for one traffic snapshot.

use std::collections::{BTreeMap, HashMap};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::TrafficFilter;
use crate::congestion::traffic::{Controller, Facility, Movement};
use crate::geodesy::great_circle::distance_nm;
use crate::spatial::proximity::nearest_within_nm;
use crate::{GeoPoint, TrafficEntity};

/// What happened at one airport in a snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportActivity {
    pub icao: String,
    /// Every movement filed out of the airport.
    pub departures: usize,
    /// Every movement filed into the airport.
    pub arrivals: usize,
    pub filtered_departures: usize,
    pub filtered_arrivals: usize,
    /// Staffed airport positions, sorted and without repeats.
    pub staffed: Vec<Facility>,
}

impl AirportActivity {
    fn new(icao: &str) -> Self {
        AirportActivity {
            icao: icao.to_string(),
            ..Default::default()
        }
    }

    pub fn congestion(&self) -> usize {
        self.filtered_departures + self.filtered_arrivals
    }

    pub fn is_active(&self) -> bool {
        self.congestion() > 0 || !self.staffed.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CongestionRecord {
    pub id: String,
    pub movements: usize,
}

/// Active airports, least congested first.
///
/// Airports with equal congestion stay in identifier order, so the same
/// snapshot always yields the same sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CongestionReport {
    airports: Vec<AirportActivity>,
}

impl CongestionReport {
    pub fn airports(&self) -> &[AirportActivity] {
        &self.airports
    }

    pub fn get(&self, icao: &str) -> Option<&AirportActivity> {
        self.airports.iter().find(|a| a.icao == icao)
    }

    pub fn len(&self) -> usize {
        self.airports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airports.is_empty()
    }

    pub fn records(&self) -> Vec<CongestionRecord> {
        self.airports
            .iter()
            .map(|a| CongestionRecord {
                id: a.icao.clone(),
                movements: a.congestion(),
            })
            .collect()
    }

    /// Label priority order: draw in reverse so the busiest airport wins.
    pub fn most_congested_first(&self) -> impl Iterator<Item = &AirportActivity> {
        self.airports.iter().rev()
    }
}

/// Counts filtered arrivals and departures and staffed positions per airport.
///
/// Nothing passed in is modified. Airports with no counted movement and no
/// staffed position are left out of the report altogether.
pub fn aggregate_congestion<A: TrafficEntity>(
    airports: &[A],
    movements: &[Movement],
    controllers: &[Controller],
    filter: &TrafficFilter,
) -> CongestionReport {
    let positions: HashMap<String, GeoPoint> = airports
        .iter()
        .map(|a| (a.id().to_ascii_uppercase(), a.position()))
        .collect();
    let mut tally: BTreeMap<String, AirportActivity> = BTreeMap::new();

    for movement in movements {
        if !movement.has_flight_plan() {
            match nearest_within_nm(movement.position, filter.snap_radius_nm, airports) {
                Some(nearby) => {
                    let icao = nearby.entity.id().to_ascii_uppercase();
                    let activity = activity_for(&mut tally, &icao);
                    activity.departures += 1;
                    activity.filtered_departures += 1;
                }
                None => debug!("{} has no flight plan and no airport nearby", movement.callsign),
            }
            continue;
        }

        if let Some(dep) = movement.departure() {
            let dep = dep.to_ascii_uppercase();
            match positions.get(&dep) {
                Some(&at) => {
                    let counts = filter.departure_counts(distance_nm(movement.position, at));
                    let activity = activity_for(&mut tally, &dep);
                    activity.departures += 1;
                    if counts {
                        activity.filtered_departures += 1;
                    }
                }
                None => debug!("{}: departure {} not in airport table", movement.callsign, dep),
            }
        }

        if let Some(dest) = movement.destination() {
            let dest = dest.to_ascii_uppercase();
            match positions.get(&dest) {
                Some(&at) => {
                    let remaining = distance_nm(movement.position, at);
                    let counts = filter.arrival_counts(remaining, movement.groundspeed_kts);
                    let activity = activity_for(&mut tally, &dest);
                    activity.arrivals += 1;
                    if counts {
                        activity.filtered_arrivals += 1;
                    }
                }
                None => debug!("{}: destination {} not in airport table", movement.callsign, dest),
            }
        }
    }

    for controller in controllers {
        let facility = controller.facility();
        if !facility.is_airport_position() {
            continue;
        }
        let Some(icao) = controller
            .airport_candidates()
            .into_iter()
            .find(|c| positions.contains_key(c))
        else {
            debug!("{}: no airport matches callsign", controller.callsign);
            continue;
        };
        let activity = activity_for(&mut tally, &icao);
        if !activity.staffed.contains(&facility) {
            activity.staffed.push(facility);
        }
    }

    let mut active: Vec<AirportActivity> = tally
        .into_values()
        .filter(AirportActivity::is_active)
        .map(|mut a| {
            a.staffed.sort_unstable();
            a
        })
        .collect();
    // stable: ties keep identifier order
    active.sort_by_key(AirportActivity::congestion);

    debug!(
        "congestion: {} active airports from {} movements and {} controllers",
        active.len(),
        movements.len(),
        controllers.len()
    );
    CongestionReport { airports: active }
}

fn activity_for<'a>(
    tally: &'a mut BTreeMap<String, AirportActivity>,
    icao: &str,
) -> &'a mut AirportActivity {
    tally
        .entry(icao.to_string())
        .or_insert_with(|| AirportActivity::new(icao))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Field {
        icao: &'static str,
        at: GeoPoint,
    }

    impl TrafficEntity for Field {
        fn id(&self) -> &str {
            self.icao
        }

        fn position(&self) -> GeoPoint {
            self.at
        }
    }

    fn airports() -> Vec<Field> {
        vec![
            Field { icao: "KJFK", at: GeoPoint::new(40.64, -73.78) },
            Field { icao: "KBOS", at: GeoPoint::new(42.36, -71.01) },
            Field { icao: "EGLL", at: GeoPoint::new(51.47, -0.45) },
            Field { icao: "EDDM", at: GeoPoint::new(48.35, 11.79) },
        ]
    }

    fn pilot(callsign: &str, at: GeoPoint, dep: Option<&str>, dest: Option<&str>, gs: f64) -> Movement {
        Movement {
            callsign: callsign.into(),
            position: at,
            departure: dep.map(String::from),
            destination: dest.map(String::from),
            groundspeed_kts: gs,
        }
    }

    fn controller(callsign: &str) -> Controller {
        Controller {
            callsign: callsign.into(),
            position: GeoPoint::default(),
            visual_range_nm: 20.0,
        }
    }

    #[test]
    fn only_filtered_arrival_counts() {
        let movements = vec![
            // on final, 2 NM out
            pilot("AAL1", GeoPoint::new(40.67, -73.78), Some("KBOS"), Some("KJFK"), 140.0),
            // still over the Atlantic
            pilot("BAW1", GeoPoint::new(50.0, -30.0), Some("EGLL"), Some("KJFK"), 480.0),
        ];
        let report = aggregate_congestion(&airports(), &movements, &[], &TrafficFilter::default());

        let jfk = report.get("KJFK").expect("KJFK active");
        assert_eq!(jfk.arrivals, 2);
        assert_eq!(jfk.filtered_arrivals, 1);
        assert_eq!(jfk.congestion(), 1);
        // departed long ago: listed but not counted, so not active
        assert!(report.get("EGLL").is_none());
        assert!(report.get("KBOS").is_none());
    }

    #[test]
    fn idle_airports_are_excluded() {
        let report = aggregate_congestion(&airports(), &[], &[], &TrafficFilter::default());
        assert!(report.is_empty());
        assert!(report.records().is_empty());
    }

    #[test]
    fn staffed_airport_is_active_without_traffic() {
        let controllers = vec![
            controller("EDDM_TWR"),
            controller("EDDM_GND"),
            controller("EDDM_TWR"),
            controller("EDDM_ATIS"),
            controller("EDMM_CTR"),
            controller("JFK_DEL"),
        ];
        let report = aggregate_congestion(&airports(), &[], &controllers, &TrafficFilter::default());
        let eddm = report.get("EDDM").expect("EDDM staffed");
        assert_eq!(eddm.staffed, vec![Facility::Ground, Facility::Tower]);
        assert_eq!(eddm.congestion(), 0);
        assert_eq!(report.get("KJFK").expect("KJFK staffed").staffed, vec![Facility::Delivery]);
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn pilot_without_plan_snaps_to_nearby_airport() {
        let movements = vec![
            pilot("N123AB", GeoPoint::new(42.37, -71.02), None, None, 0.0),
            pilot("N456CD", GeoPoint::new(30.0, -60.0), None, None, 0.0),
        ];
        let report = aggregate_congestion(&airports(), &movements, &[], &TrafficFilter::default());
        let bos = report.get("KBOS").expect("KBOS");
        assert_eq!(bos.departures, 1);
        assert_eq!(bos.filtered_departures, 1);
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn unknown_airports_are_skipped() {
        let movements = vec![pilot("X1", GeoPoint::new(40.64, -73.78), Some("ZZZZ"), Some("KJFK"), 0.0)];
        let report = aggregate_congestion(&airports(), &movements, &[], &TrafficFilter::default());
        assert_eq!(report.len(), 1);
        assert!(report.get("ZZZZ").is_none());
    }

    #[test]
    fn lowercase_airport_ids_match_plans_and_snaps() {
        let fields = vec![
            Field { icao: "kjfk", at: GeoPoint::new(40.64, -73.78) },
            Field { icao: "kbos", at: GeoPoint::new(42.36, -71.01) },
        ];
        let movements = vec![
            pilot("AAL1", GeoPoint::new(40.67, -73.78), Some("KBOS"), Some("kjfk"), 140.0),
            pilot("N123AB", GeoPoint::new(42.37, -71.02), None, None, 0.0),
        ];
        let controllers = vec![controller("BOS_TWR")];
        let report = aggregate_congestion(&fields, &movements, &controllers, &TrafficFilter::default());

        let order: Vec<&str> = report.airports().iter().map(|a| a.icao.as_str()).collect();
        assert_eq!(order, vec!["KBOS", "KJFK"]);
        assert_eq!(report.get("KJFK").expect("KJFK").filtered_arrivals, 1);
        let bos = report.get("KBOS").expect("KBOS");
        assert_eq!(bos.departures, 2);
        assert_eq!(bos.filtered_departures, 1);
        assert_eq!(bos.staffed, vec![Facility::Tower]);
    }

    #[test]
    fn disabled_filter_counts_everything() {
        let movements = vec![pilot("BAW1", GeoPoint::new(50.0, -30.0), Some("EGLL"), Some("KJFK"), 480.0)];
        let filter = TrafficFilter {
            enabled: false,
            ..TrafficFilter::default()
        };
        let report = aggregate_congestion(&airports(), &movements, &[], &filter);
        assert_eq!(report.get("EGLL").expect("EGLL").filtered_departures, 1);
        assert_eq!(report.get("KJFK").expect("KJFK").filtered_arrivals, 1);
    }

    #[test]
    fn ascending_with_ties_in_identifier_order() {
        let near_jfk = GeoPoint::new(40.65, -73.78);
        let near_bos = GeoPoint::new(42.36, -71.00);
        let near_eddm = GeoPoint::new(48.35, 11.78);
        let movements = vec![
            pilot("A", near_jfk, Some("KJFK"), None, 0.0),
            pilot("B", near_jfk, Some("KJFK"), None, 0.0),
            pilot("C", near_bos, Some("KBOS"), None, 0.0),
            pilot("D", near_eddm, Some("EDDM"), None, 0.0),
        ];
        let report = aggregate_congestion(&airports(), &movements, &[], &TrafficFilter::default());
        let order: Vec<&str> = report.airports().iter().map(|a| a.icao.as_str()).collect();
        assert_eq!(order, vec!["EDDM", "KBOS", "KJFK"]);

        let busiest = report.most_congested_first().next().expect("busiest");
        assert_eq!(busiest.icao, "KJFK");
        assert_eq!(
            report.records()[2],
            CongestionRecord { id: "KJFK".into(), movements: 2 }
        );
    }
}
