use lambda_runtime::{service_fn, Error, LambdaEvent};
use log::{info, warn};
use once_cell::sync::Lazy;
use qutescoop_engine::config::EngineConfig;
use qutescoop_engine::congestion::aggregate::{aggregate_congestion, AirportActivity};
use qutescoop_engine::congestion::traffic::{Controller, Movement};
use qutescoop_engine::data::{read_navdata_from_file, NavData};
use qutescoop_engine::geodesy::great_circle::{bearing_deg, distance_nm, route_polyline};
use qutescoop_engine::polygon::sector::{staffed_sectors, SectorAssignment};
use qutescoop_engine::spatial::kd_tree::SphereIndex;
use qutescoop_engine::GeoPoint;
use serde::{Deserialize, Serialize};

const NAVDATA_ENV: &str = "QUTESCOOP_NAVDATA";
const CONFIG_ENV: &str = "QUTESCOOP_ENGINE_CONFIG";

static NAVDATA: Lazy<NavData> = Lazy::new(|| {
    let Ok(path) = std::env::var(NAVDATA_ENV) else {
        warn!("{NAVDATA_ENV} not set, serving without airports or sectors");
        return NavData::default();
    };
    match read_navdata_from_file(&path) {
        Ok(navdata) => {
            info!(
                "loaded {} airports and {} sectors from {path}",
                navdata.airports().len(),
                navdata.sectors.len()
            );
            navdata
        }
        Err(e) => {
            warn!("failed to load navdata from {path}: {e}");
            NavData::default()
        }
    }
});

static AIRPORT_INDEX: Lazy<SphereIndex> = Lazy::new(|| {
    let positions: Vec<GeoPoint> = NAVDATA.airports().iter().map(|a| a.position).collect();
    SphereIndex::build(&positions)
});

static CONFIG: Lazy<EngineConfig> = Lazy::new(|| match std::env::var(CONFIG_ENV) {
    Ok(path) => EngineConfig::from_json_file(&path).unwrap_or_else(|e| {
        warn!("failed to read config {path}: {e}, using defaults");
        EngineConfig::default()
    }),
    Err(_) => EngineConfig::default(),
});

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EngineRequest {
    Distance {
        from: GeoPoint,
        to: GeoPoint,
    },
    Route {
        from: GeoPoint,
        to: GeoPoint,
        spacing_nm: Option<f64>,
    },
    Within {
        center: GeoPoint,
        radius_nm: f64,
    },
    Sector {
        callsign: String,
    },
    Contains {
        sector_id: String,
        point: GeoPoint,
    },
    Congestion {
        #[serde(default)]
        movements: Vec<Movement>,
        #[serde(default)]
        controllers: Vec<Controller>,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EngineResponse {
    Distance {
        distance_nm: f64,
        bearing_deg: f64,
    },
    Route {
        points: Vec<GeoPoint>,
    },
    Within {
        airports: Vec<NearbyResult>,
    },
    Sector {
        id: String,
        name: Option<String>,
        label_point: Option<GeoPoint>,
        boundary: Vec<GeoPoint>,
    },
    Contains {
        contained: bool,
    },
    Congestion {
        airports: Vec<AirportActivity>,
        sectors: Vec<SectorAssignment>,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Serialize)]
struct NearbyResult {
    icao: String,
    name: String,
    distance_nm: f64,
}

async fn handler(event: LambdaEvent<EngineRequest>) -> Result<EngineResponse, Error> {
    let req = event.payload;
    let navdata = &*NAVDATA;
    let config = &*CONFIG;
    match req {
        EngineRequest::Distance { from, to } => Ok(EngineResponse::Distance {
            distance_nm: distance_nm(from, to),
            bearing_deg: bearing_deg(from, to),
        }),
        EngineRequest::Route { from, to, spacing_nm } => {
            let spacing = spacing_nm.unwrap_or(config.great_circle_spacing_nm);
            match route_polyline(from, to, spacing, config.max_route_points) {
                Some(points) => Ok(EngineResponse::Route { points }),
                None => Ok(EngineResponse::Error {
                    message: format!(
                        "Route spacing {} NM needs more than {} points",
                        spacing, config.max_route_points
                    ),
                }),
            }
        }
        EngineRequest::Within { center, radius_nm } => {
            let airports = AIRPORT_INDEX
                .nearest_n_within_nm(center, radius_nm, usize::MAX)
                .into_iter()
                .filter_map(|(idx, distance_nm)| {
                    navdata.airports().get(idx).map(|a| NearbyResult {
                        icao: a.icao.clone(),
                        name: a.name.clone(),
                        distance_nm,
                    })
                })
                .collect();
            Ok(EngineResponse::Within { airports })
        }
        EngineRequest::Sector { callsign } => {
            let Some(sector) = navdata.sectors.resolve(&callsign) else {
                return Ok(EngineResponse::Error { message: format!("No sector for {}", callsign) });
            };
            Ok(EngineResponse::Sector {
                id: sector.id.clone(),
                name: sector.name.clone(),
                label_point: sector.polygon.label_point(),
                boundary: sector.polygon.densified(config.great_circle_spacing_nm),
            })
        }
        EngineRequest::Contains { sector_id, point } => {
            let Some(sector) = navdata.sectors.get(&sector_id) else {
                return Ok(EngineResponse::Error { message: format!("Unknown sector {}", sector_id) });
            };
            Ok(EngineResponse::Contains { contained: sector.polygon.contains(point) })
        }
        EngineRequest::Congestion { movements, controllers } => {
            let report = aggregate_congestion(
                navdata.airports(),
                &movements,
                &controllers,
                &config.traffic_filter,
            );
            Ok(EngineResponse::Congestion {
                airports: report.airports().to_vec(),
                sectors: staffed_sectors(&navdata.sectors, &controllers),
            })
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    let func = service_fn(handler);
    lambda_runtime::run(func).await
}
