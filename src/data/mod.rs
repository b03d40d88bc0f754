pub mod parse;

use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;

use bincode::ErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::polygon::sector::SectorTable;
use crate::{GeoPoint, TrafficEntity};

/// Compression level used when encoding navdata bundles.
///
/// Bundles are built once and loaded at every start, so we trade encode time
/// for size.
const BUNDLE_COMPRESSION_LEVEL: i32 = 19;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] Box<ErrorKind>),
    #[error("Compression error: {0}")]
    Compression(#[source] std::io::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Airport {
    pub icao: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub position: GeoPoint,
}

impl TrafficEntity for Airport {
    fn id(&self) -> &str {
        &self.icao
    }

    fn position(&self) -> GeoPoint {
        self.position
    }
}

/// Static navigation data: airports and sector boundaries.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NavData {
    airports: Vec<Airport>,
    pub sectors: SectorTable,
    #[serde(skip)]
    icao_index: HashMap<String, usize>,
}

impl NavData {
    pub fn new(airports: Vec<Airport>, sectors: SectorTable) -> Self {
        let mut navdata = NavData {
            airports,
            sectors,
            icao_index: HashMap::new(),
        };
        navdata.rebuild_indices();
        navdata
    }

    pub fn airports(&self) -> &[Airport] {
        &self.airports
    }

    pub fn airport(&self, icao: &str) -> Option<&Airport> {
        self.icao_index
            .get(icao)
            .and_then(|&idx| self.airports.get(idx))
            .filter(|airport| airport.icao == icao)
    }

    pub fn rebuild_indices(&mut self) {
        self.icao_index = self
            .airports
            .iter()
            .enumerate()
            .map(|(idx, airport)| (airport.icao.clone(), idx))
            .collect();
    }
}

/// Reads a navdata text file. These files are often Latin-1, so invalid
/// UTF-8 is replaced rather than rejected.
pub fn read_text_lossy<P: AsRef<Path>>(path: P) -> Result<String, DataError> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads the three text tables and joins them into [`NavData`].
pub fn load_navdata<P: AsRef<Path>>(
    airports: P,
    sector_names: P,
    sector_boundaries: P,
) -> Result<NavData, DataError> {
    let airports = parse::parse_airports(read_text_lossy(airports)?.as_bytes())?;
    let names = parse::parse_sector_names(read_text_lossy(sector_names)?.as_bytes())?;
    let boundaries =
        parse::parse_sector_boundaries(read_text_lossy(sector_boundaries)?.as_bytes())?;
    Ok(NavData::new(
        airports,
        parse::build_sector_table(&names, boundaries),
    ))
}

pub fn serialize_navdata(navdata: &NavData) -> Result<Vec<u8>, DataError> {
    let encoded = bincode::serialize(navdata)?;
    let mut cursor = Cursor::new(encoded);
    zstd::stream::encode_all(&mut cursor, BUNDLE_COMPRESSION_LEVEL).map_err(DataError::Compression)
}

pub fn deserialize_navdata(bytes: &[u8]) -> Result<NavData, DataError> {
    let mut cursor = Cursor::new(bytes);
    let decoded = zstd::stream::decode_all(&mut cursor).map_err(DataError::Compression)?;
    let mut navdata: NavData = bincode::deserialize(&decoded)?;
    navdata.rebuild_indices();
    Ok(navdata)
}

pub fn write_navdata_to_file<P: AsRef<Path>>(navdata: &NavData, path: P) -> Result<(), DataError> {
    let bytes = serialize_navdata(navdata)?;
    fs::write(path, bytes)?;
    Ok(())
}

pub fn read_navdata_from_file<P: AsRef<Path>>(path: P) -> Result<NavData, DataError> {
    let bytes = fs::read(path)?;
    deserialize_navdata(&bytes)
}
