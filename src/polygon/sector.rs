use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::congestion::traffic::Controller;
use crate::polygon::polygon::Polygon;
use crate::GeoPoint;

/// A FIR or sub-sector with its lateral boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub id: String,
    pub name: Option<String>,
    pub polygon: Polygon,
}

/// Binds a controller callsign to the sector it staffs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorAssignment {
    pub callsign: String,
    pub sector_id: String,
}

/// Sectors keyed by identifier, iterated in identifier order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorTable {
    sectors: BTreeMap<String, Sector>,
}

impl SectorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a sector, returning the one it replaced.
    pub fn insert(&mut self, sector: Sector) -> Option<Sector> {
        self.sectors.insert(sector.id.clone(), sector)
    }

    pub fn get(&self, id: &str) -> Option<&Sector> {
        self.sectors.get(id)
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sector> {
        self.sectors.values()
    }

    /// Finds the sector a callsign belongs to by trying ever shorter
    /// `_`-separated prefixes: `EDMM_S_CTR` tries `EDMM_S`, then `EDMM`.
    ///
    /// This mirrors how network callsigns happen to be named and is not a
    /// general matching scheme. A callsign without `_` is looked up as is.
    pub fn resolve(&self, callsign: &str) -> Option<&Sector> {
        let upper = callsign.trim().to_ascii_uppercase();
        let mut segments: Vec<&str> = upper.split('_').collect();
        if segments.len() > 1 {
            segments.pop();
        }
        while !segments.is_empty() {
            let candidate = segments.join("_");
            if let Some(sector) = self.sectors.get(&candidate) {
                return Some(sector);
            }
            segments.pop();
        }
        None
    }

    /// All sectors whose boundary encloses `point`, in identifier order.
    pub fn sectors_containing(&self, point: GeoPoint) -> Vec<&Sector> {
        self.sectors
            .values()
            .filter(|s| s.polygon.contains(point))
            .collect()
    }
}

impl FromIterator<Sector> for SectorTable {
    fn from_iter<I: IntoIterator<Item = Sector>>(iter: I) -> Self {
        let mut table = SectorTable::new();
        for sector in iter {
            table.insert(sector);
        }
        table
    }
}

/// Resolves every online centre/FSS controller to its sector.
///
/// Controllers whose callsign matches no known sector are skipped.
pub fn staffed_sectors(table: &SectorTable, controllers: &[Controller]) -> Vec<SectorAssignment> {
    controllers
        .iter()
        .filter(|c| c.facility().is_sector_position())
        .filter_map(|c| match table.resolve(&c.callsign) {
            Some(sector) => Some(SectorAssignment {
                callsign: c.callsign.clone(),
                sector_id: sector.id.clone(),
            }),
            None => {
                debug!("no sector known for {}", c.callsign);
                None
            }
        })
        .collect()
}
