use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, RouteError};
use crate::model::{Route, RouteFragment};
use crate::options::ConvertOptions;
use crate::xml::Element;
use crate::{course_point::BuildReport, gpx, kml, poi_csv, tcx};

/// Every route file format the engine knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Format {
    Csv,
    Gpx,
    Kml,
    Kmz,
    Tcx,
}

impl Format {
    pub const ALL: [Format; 5] = [
        Format::Csv,
        Format::Gpx,
        Format::Kml,
        Format::Kmz,
        Format::Tcx,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            Format::Csv => "csv",
            Format::Gpx => "gpx",
            Format::Kml => "kml",
            Format::Kmz => "kmz",
            Format::Tcx => "tcx",
        }
    }

    /// Case-insensitive lookup of a bare tag such as `"TCX"` or `"gpx"`.
    pub fn from_tag(tag: &str) -> Option<Format> {
        Format::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(tag))
    }

    /// The text after the last `.` of the file name, as written.
    pub fn extension_of(path: &str) -> String {
        Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.rsplit_once('.'))
            .map(|(_, ext)| ext.to_string())
            .unwrap_or_default()
    }

    /// Detect the format from the filename extension only.
    pub fn from_path(path: &str) -> Option<Format> {
        Format::from_tag(&Format::extension_of(path))
    }

    /// Whether a file of this format may serve as the base route.
    pub fn has_track(self) -> bool {
        !matches!(self, Format::Csv)
    }

    pub fn parser(self) -> &'static dyn Parser {
        match self {
            Format::Csv => &poi_csv::CsvParser,
            Format::Gpx => &gpx::GpxParser,
            Format::Kml => &kml::KmlParser,
            Format::Kmz => &kml::KmzParser,
            Format::Tcx => &tcx::TcxParser,
        }
    }

    /// Only GPX and TCX can be written.
    pub fn builder(self) -> Option<&'static dyn Builder> {
        match self {
            Format::Gpx => Some(&gpx::GpxBuilder),
            Format::Tcx => Some(&tcx::TcxBuilder),
            Format::Csv | Format::Kml | Format::Kmz => None,
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.extension().to_ascii_uppercase())
    }
}

impl TryFrom<String> for Format {
    type Error = RouteError;

    fn try_from(tag: String) -> Result<Self> {
        Format::from_tag(&tag).ok_or(RouteError::UnsupportedFormat {
            path: String::new(),
            found: tag.to_ascii_uppercase(),
            role: "output type",
        })
    }
}

/// Turns raw file bytes into a route fragment.
pub trait Parser: Sync {
    fn parse(&self, bytes: &[u8]) -> Result<RouteFragment>;
}

/// Renders a route into an output document tree.
pub trait Builder: Sync {
    fn build(&self, route: &Route, options: &ConvertOptions) -> Result<Built>;
}

/// A built document tree plus what happened to each POI along the way.
#[derive(Debug, Clone)]
pub struct Built {
    pub root: Element,
    pub report: BuildReport,
}

/// Parse a required numeric field; `what` names it in the error.
pub(crate) fn required_number(value: Option<&str>, what: &str) -> Result<f64> {
    let value = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| RouteError::malformed(format!("missing {what}")))?;
    parse_number(value, what)
}

/// Parse an optional numeric field; absent or empty is `None`.
pub(crate) fn optional_number(value: Option<&str>, what: &str) -> Result<Option<f64>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => parse_number(value, what).map(Some),
        None => Ok(None),
    }
}

fn parse_number(value: &str, what: &str) -> Result<f64> {
    value
        .parse::<f64>()
        .map_err(|_| RouteError::malformed(format!("invalid {what} '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_path_case_insensitive() {
        assert_eq!(Format::from_path("ride.GPX"), Some(Format::Gpx));
        assert_eq!(Format::from_path("/tmp/a.b/route.Kmz"), Some(Format::Kmz));
        assert_eq!(Format::from_path("pois.csv"), Some(Format::Csv));
        assert_eq!(Format::from_path("course.tcx"), Some(Format::Tcx));
        assert_eq!(Format::from_path("map.kml"), Some(Format::Kml));
    }

    #[test]
    fn test_from_path_unknown() {
        assert_eq!(Format::from_path("route.fit"), None);
        assert_eq!(Format::from_path("route"), None);
        assert_eq!(Format::from_path("/tmp/gpx/route"), None);
        assert_eq!(Format::extension_of("route.Fit"), "Fit");
    }

    #[test]
    fn test_roles() {
        assert!(!Format::Csv.has_track());
        assert!(Format::Kmz.has_track());
        assert!(Format::Gpx.builder().is_some());
        assert!(Format::Tcx.builder().is_some());
        assert!(Format::Kml.builder().is_none());
        assert!(Format::Csv.builder().is_none());
    }

    #[test]
    fn test_number_fields() {
        assert_eq!(required_number(Some(" 35.5 "), "lat").unwrap(), 35.5);
        assert!(required_number(None, "lat").is_err());
        assert!(required_number(Some(""), "lat").is_err());
        let err = required_number(Some("north"), "lat").unwrap_err();
        assert_eq!(err.to_string(), "Malformed input: invalid lat 'north'");
        assert_eq!(optional_number(None, "ele").unwrap(), None);
        assert_eq!(optional_number(Some("12"), "ele").unwrap(), Some(12.0));
        assert!(optional_number(Some("high"), "ele").is_err());
    }

    #[test]
    fn test_display_and_deserialize() {
        assert_eq!(Format::Tcx.to_string(), "TCX");
        let f: Format = serde_json::from_str("\"Gpx\"").unwrap();
        assert_eq!(f, Format::Gpx);
        assert!(serde_json::from_str::<Format>("\"fit\"").is_err());
    }
}
