//! Readers for the colon-delimited navdata text files.
//!
//! * airports: `ICAO:Name:City:Country:lat:lon`
//! * sector names: `ID:Name`
//! * sector boundaries: `DISPLAY_LIST_<ID>` followed by `lat:lon` lines,
//!   closed by a bare `DISPLAY_LIST_`
//!
//! Blank lines and lines starting with `;` or `//` are ignored.

use std::collections::HashMap;
use std::io::BufRead;

use log::warn;

use crate::data::{Airport, DataError};
use crate::polygon::polygon::Polygon;
use crate::polygon::sector::{Sector, SectorTable};
use crate::GeoPoint;

const DISPLAY_LIST_PREFIX: &str = "DISPLAY_LIST_";

fn is_comment(line: &str) -> bool {
    line.is_empty() || line.starts_with(';') || line.starts_with("//")
}

fn parse_error(line: usize, message: impl Into<String>) -> DataError {
    DataError::Parse {
        line,
        message: message.into(),
    }
}

fn parse_coord(field: &str, line: usize, what: &str) -> Result<f64, DataError> {
    field
        .trim()
        .parse::<f64>()
        .map_err(|e| parse_error(line, format!("bad {what} {field:?}: {e}")))
}

/// Numbered, trimmed, non-comment lines.
fn content_lines<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = Result<(usize, String), DataError>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| match line {
            Ok(line) => {
                let trimmed = line.trim();
                (!is_comment(trimmed)).then(|| Ok((idx + 1, trimmed.to_string())))
            }
            Err(e) => Some(Err(DataError::Io(e))),
        })
}

pub fn parse_airports<R: BufRead>(reader: R) -> Result<Vec<Airport>, DataError> {
    let mut airports = Vec::new();
    for entry in content_lines(reader) {
        let (line, text) = entry?;
        let fields: Vec<&str> = text.split(':').collect();
        if fields.len() < 6 {
            return Err(parse_error(
                line,
                format!("expected 6 fields, found {}", fields.len()),
            ));
        }
        let icao = fields[0].trim().to_ascii_uppercase();
        if icao.is_empty() {
            return Err(parse_error(line, "empty ICAO code"));
        }
        airports.push(Airport {
            icao,
            name: fields[1].trim().to_string(),
            city: fields[2].trim().to_string(),
            country: fields[3].trim().to_string(),
            position: GeoPoint::new(
                parse_coord(fields[4], line, "latitude")?,
                parse_coord(fields[5], line, "longitude")?,
            ),
        });
    }
    Ok(airports)
}

/// `(id, name)` pairs; the name is optional.
pub fn parse_sector_names<R: BufRead>(reader: R) -> Result<Vec<(String, Option<String>)>, DataError> {
    let mut names = Vec::new();
    for entry in content_lines(reader) {
        let (line, text) = entry?;
        let (id, name) = match text.split_once(':') {
            Some((id, name)) => (id.trim(), Some(name.trim())),
            None => (text.as_str(), None),
        };
        if id.is_empty() {
            return Err(parse_error(line, "empty sector id"));
        }
        names.push((
            id.to_ascii_uppercase(),
            name.filter(|n| !n.is_empty()).map(String::from),
        ));
    }
    Ok(names)
}

/// Boundary point lists in file order.
pub fn parse_sector_boundaries<R: BufRead>(
    reader: R,
) -> Result<Vec<(String, Vec<GeoPoint>)>, DataError> {
    let mut boundaries = Vec::new();
    let mut open: Option<(String, Vec<GeoPoint>)> = None;

    for entry in content_lines(reader) {
        let (line, text) = entry?;
        if let Some(id) = text.strip_prefix(DISPLAY_LIST_PREFIX) {
            if let Some(done) = open.take() {
                boundaries.push(done);
            }
            let id = id.trim();
            if !id.is_empty() {
                open = Some((id.to_ascii_uppercase(), Vec::new()));
            }
            continue;
        }

        let Some((lat, lon)) = text.split_once(':') else {
            return Err(parse_error(line, format!("expected lat:lon, found {text:?}")));
        };
        let point = GeoPoint::new(
            parse_coord(lat, line, "latitude")?,
            parse_coord(lon, line, "longitude")?,
        );
        match open.as_mut() {
            Some((_, points)) => points.push(point),
            None => warn!("line {line}: boundary point outside of a display list"),
        }
    }

    if let Some((id, points)) = open {
        warn!("display list {id} not terminated");
        boundaries.push((id, points));
    }
    Ok(boundaries)
}

/// Joins names and boundaries. A later boundary for the same id replaces
/// the earlier one.
pub fn build_sector_table(
    names: &[(String, Option<String>)],
    boundaries: Vec<(String, Vec<GeoPoint>)>,
) -> SectorTable {
    let names: HashMap<&str, Option<&String>> = names
        .iter()
        .map(|(id, name)| (id.as_str(), name.as_ref()))
        .collect();

    let mut table = SectorTable::new();
    for (id, points) in boundaries {
        let name = names.get(id.as_str()).copied().flatten().cloned();
        let sector = Sector {
            polygon: Polygon::new(points),
            id,
            name,
        };
        if sector.polygon.is_degenerate() {
            warn!("sector {} has a degenerate boundary", sector.id);
        }
        if let Some(previous) = table.insert(sector) {
            warn!("sector {} defined more than once", previous.id);
        }
    }

    for id in names.keys() {
        if table.get(id).is_none() {
            warn!("sector {id} has a name but no boundary");
        }
    }
    table
}
