//! KML and KMZ import. Coordinates are written `lon,lat[,alt]` and get
//! swapped on the way in.

use std::io::{Cursor, Read};

use log::debug;

use crate::error::{Result, RouteError};
use crate::format::{Parser, optional_number, required_number};
use crate::model::{Metadata, Poi, RouteFragment, Trackpoint};
use crate::xml::{self, Element};

pub struct KmlParser;

impl Parser for KmlParser {
    fn parse(&self, bytes: &[u8]) -> Result<RouteFragment> {
        parse_kml(bytes)
    }
}

/// A zip archive holding a KML document.
pub struct KmzParser;

impl Parser for KmzParser {
    fn parse(&self, bytes: &[u8]) -> Result<RouteFragment> {
        parse_kml(&extract_kml(bytes)?)
    }
}

/// Contents of the first archive entry whose name ends in `.kml`.
fn extract_kml(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut zip = zip::ZipArchive::new(Cursor::new(bytes))?;
    let index = (0..zip.len())
        .find(|&i| {
            zip.name_for_index(i)
                .is_some_and(|name| name.to_ascii_lowercase().ends_with(".kml"))
        })
        .ok_or_else(|| RouteError::malformed("no .kml entry found in KMZ archive"))?;

    // declared entry sizes are untrusted
    let mut entry = zip.by_index(index)?;
    let mut content = Vec::new();
    entry
        .read_to_end(&mut content)
        .map_err(|e| RouteError::malformed(format!("failed to read {}: {e}", entry.name())))?;
    Ok(content)
}

fn parse_kml(bytes: &[u8]) -> Result<RouteFragment> {
    let root = xml::parse(bytes)?;
    let metadata = Metadata::new(root.find_text_anywhere("Document/name"), None);

    let mut trackpoints = Vec::new();
    let mut pois = Vec::new();
    for placemark in root.descendants("Placemark") {
        let lines = placemark.descendants("LineString");
        if !lines.is_empty() {
            for line in lines {
                let text = line.find_text("coordinates").unwrap_or_default();
                for tuple in coordinate_tuples(&text) {
                    trackpoints.push(parse_tuple(&tuple)?);
                }
            }
        } else if let Some(point) = placemark.find("Point") {
            pois.push(parse_point(placemark, point)?);
        } else {
            debug!(
                "skipping placemark {:?} without LineString or Point",
                placemark.find_text("name")
            );
        }
    }

    Ok(RouteFragment {
        metadata: Some(metadata),
        trackpoints: Some(trackpoints),
        pois,
    })
}

fn parse_point(placemark: &Element, point: &Element) -> Result<Poi> {
    let text = point
        .find_text("coordinates")
        .ok_or_else(|| RouteError::malformed("Point without coordinates"))?;
    let first = coordinate_tuples(&text)
        .into_iter()
        .next()
        .ok_or_else(|| RouteError::malformed("Point without coordinates"))?;
    let location = parse_tuple(&first)?;

    let mut poi = Poi::new(
        location.latitude,
        location.longitude,
        placemark.find_text("name").unwrap_or_default(),
    );
    poi.notes = placemark.find_text("description");
    Ok(poi)
}

/// Split a `<coordinates>` body into `lon,lat[,alt]` tuples. Tuples may be
/// separated by newlines or spaces; spaces around commas are ignored.
fn coordinate_tuples(text: &str) -> Vec<String> {
    let joined = text.split(',').map(str::trim).collect::<Vec<_>>().join(",");
    joined.split_whitespace().map(str::to_string).collect()
}

fn parse_tuple(tuple: &str) -> Result<Trackpoint> {
    let parts: Vec<&str> = tuple.split(',').collect();
    if parts.len() < 2 {
        return Err(RouteError::malformed(format!(
            "coordinate tuple '{tuple}' needs longitude and latitude"
        )));
    }
    let longitude = required_number(Some(parts[0]), "longitude")?;
    let latitude = required_number(Some(parts[1]), "latitude")?;
    let mut point = Trackpoint::new(latitude, longitude);
    point.elevation = optional_number(parts.get(2).copied(), "altitude")?;
    Ok(point)
}
