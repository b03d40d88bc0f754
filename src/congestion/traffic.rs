//! Traffic snapshot types handed to the engine by the ingestion layer.

use serde::{Deserialize, Serialize};

use crate::{GeoPoint, TrafficEntity};

/// Controller position type, taken from the last `_` segment of the callsign.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facility {
    Delivery,
    Ground,
    Tower,
    Approach,
    Departure,
    Center,
    Fss,
    Atis,
    Observer,
    Other,
}

impl Facility {
    pub fn from_callsign(callsign: &str) -> Self {
        let suffix = callsign.rsplit('_').next().unwrap_or_default();
        match suffix.to_ascii_uppercase().as_str() {
            "DEL" => Facility::Delivery,
            "GND" => Facility::Ground,
            "TWR" => Facility::Tower,
            "APP" => Facility::Approach,
            "DEP" => Facility::Departure,
            "CTR" => Facility::Center,
            "FSS" => Facility::Fss,
            "ATIS" => Facility::Atis,
            "OBS" => Facility::Observer,
            _ => Facility::Other,
        }
    }

    /// Positions that staff an airport and make it active.
    pub fn is_airport_position(self) -> bool {
        matches!(
            self,
            Facility::Delivery
                | Facility::Ground
                | Facility::Tower
                | Facility::Approach
                | Facility::Departure
        )
    }

    /// Positions bound to a FIR/sector polygon.
    pub fn is_sector_position(self) -> bool {
        matches!(self, Facility::Center | Facility::Fss)
    }
}

/// A pilot in the snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub callsign: String,
    pub position: GeoPoint,
    #[serde(default)]
    pub departure: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub groundspeed_kts: f64,
}

impl Movement {
    pub fn departure(&self) -> Option<&str> {
        non_blank(self.departure.as_deref())
    }

    pub fn destination(&self) -> Option<&str> {
        non_blank(self.destination.as_deref())
    }

    pub fn has_flight_plan(&self) -> bool {
        self.departure().is_some() || self.destination().is_some()
    }
}

impl TrafficEntity for Movement {
    fn id(&self) -> &str {
        &self.callsign
    }

    fn position(&self) -> GeoPoint {
        self.position
    }
}

/// An online controller in the snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Controller {
    pub callsign: String,
    pub position: GeoPoint,
    #[serde(default)]
    pub visual_range_nm: f64,
}

impl Controller {
    pub fn facility(&self) -> Facility {
        Facility::from_callsign(&self.callsign)
    }

    /// ICAO codes this controller may be staffing, best guess first.
    ///
    /// This is a naming heuristic: the part before the first `_`, and for
    /// three-letter prefixes also the US form with a leading `K`
    /// (`JFK_TWR` staffs `KJFK`).
    pub fn airport_candidates(&self) -> Vec<String> {
        let prefix = self
            .callsign
            .split('_')
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        if prefix.is_empty() {
            return Vec::new();
        }
        let mut candidates = vec![prefix.clone()];
        if prefix.len() == 3 {
            candidates.push(format!("K{prefix}"));
        }
        candidates
    }
}

impl TrafficEntity for Controller {
    fn id(&self) -> &str {
        &self.callsign
    }

    fn position(&self) -> GeoPoint {
        self.position
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(callsign: &str) -> Controller {
        Controller {
            callsign: callsign.into(),
            position: GeoPoint::default(),
            visual_range_nm: 50.0,
        }
    }

    #[test]
    fn facility_from_suffix() {
        assert_eq!(Facility::from_callsign("EDDM_TWR"), Facility::Tower);
        assert_eq!(Facility::from_callsign("EDDM_N_APP"), Facility::Approach);
        assert_eq!(Facility::from_callsign("EDMM_S_CTR"), Facility::Center);
        assert_eq!(Facility::from_callsign("eddf_del"), Facility::Delivery);
        assert_eq!(Facility::from_callsign("KJFK_ATIS"), Facility::Atis);
        assert_eq!(Facility::from_callsign("SUPERVISOR"), Facility::Other);
        assert!(Facility::Ground.is_airport_position());
        assert!(!Facility::Atis.is_airport_position());
        assert!(Facility::Fss.is_sector_position());
    }

    #[test]
    fn airport_candidates_include_us_form() {
        assert_eq!(controller("JFK_TWR").airport_candidates(), vec!["JFK", "KJFK"]);
        assert_eq!(controller("eddm_gnd").airport_candidates(), vec!["EDDM"]);
        assert!(controller("_TWR").airport_candidates().is_empty());
    }

    #[test]
    fn blank_plan_fields_count_as_missing() {
        let m = Movement {
            callsign: "DLH1".into(),
            position: GeoPoint::default(),
            departure: Some("  ".into()),
            destination: None,
            groundspeed_kts: 0.0,
        };
        assert!(!m.has_flight_plan());
    }
}
