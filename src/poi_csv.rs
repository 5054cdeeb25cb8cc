//! Headerless POI lists: `latitude, longitude, name, notes[, type]`.

use crate::error::{Result, RouteError};
use crate::format::{Parser, required_number};
use crate::model::{Poi, RouteFragment};

/// Yields POIs only; a CSV file never carries a track.
pub struct CsvParser;

impl Parser for CsvParser {
    fn parse(&self, bytes: &[u8]) -> Result<RouteFragment> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let mut pois = Vec::new();
        for (i, record) in reader.records().enumerate() {
            let record = record?;
            let row = i + 1;
            if record.len() < 3 {
                return Err(RouteError::malformed(format!(
                    "row {row}: expected latitude, longitude and name, found {} column(s)",
                    record.len()
                )));
            }
            let field = |n: usize| record.get(n).filter(|v| !v.is_empty());

            let latitude = required_number(field(0), &format!("latitude in row {row}"))?;
            let longitude = required_number(field(1), &format!("longitude in row {row}"))?;
            let mut poi = Poi::new(latitude, longitude, record.get(2).unwrap_or_default());
            poi.notes = field(3).map(str::to_string);
            poi.category = field(4).map(str::to_string);
            pois.push(poi);
        }

        Ok(RouteFragment {
            metadata: None,
            trackpoints: None,
            pois,
        })
    }
}

/// One five-column row per POI, in list order. Absent fields are empty.
pub fn export_pois(pois: &[Poi]) -> Result<Vec<u8>> {
    if pois.is_empty() {
        return Err(RouteError::EmptyPoiExport);
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    for poi in pois {
        writer.write_record([
            poi.latitude.to_string().as_str(),
            poi.longitude.to_string().as_str(),
            poi.name.as_str(),
            poi.notes.as_deref().unwrap_or_default(),
            poi.category.as_deref().unwrap_or_default(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| RouteError::malformed(format!("CSV error: {}", e.error())))
}
