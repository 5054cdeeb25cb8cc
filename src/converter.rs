//! The conversion lifecycle: parse a base route, merge POIs, build and
//! write an output document.

use std::fs;

use log::info;

use crate::course_point::BuildReport;
use crate::error::{Result, RouteError};
use crate::format::Format;
use crate::model::{Poi, Route};
use crate::options::ConvertOptions;
use crate::poi_csv;
use crate::xml::{self, Element};

fn read_file(path: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| RouteError::Io {
        path: path.to_string(),
        source,
    })
}

fn write_file(path: &str, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).map_err(|source| RouteError::Io {
        path: path.to_string(),
        source,
    })?;
    info!("Wrote to: {path}");
    Ok(())
}

fn detect(file_name: &str, role: &'static str) -> Result<Format> {
    Format::from_path(file_name).ok_or_else(|| RouteError::UnsupportedFormat {
        path: file_name.to_string(),
        found: Format::extension_of(file_name).to_ascii_uppercase(),
        role,
    })
}

/// Formats that carry a track; CSV only holds POIs.
fn detect_base(file_name: &str) -> Result<Format> {
    let format = detect(file_name, "base route file")?;
    if !format.has_track() {
        return Err(RouteError::UnsupportedFormat {
            path: file_name.to_string(),
            found: format.to_string(),
            role: "base route file",
        });
    }
    Ok(format)
}

/// Parse a base route file (anything but CSV) from its bytes. The file
/// name only selects the format.
pub fn parse_base_bytes(file_name: &str, bytes: &[u8]) -> Result<Route> {
    let format = detect_base(file_name)?;
    let fragment = format
        .parser()
        .parse(bytes)
        .map_err(|e| e.in_file(file_name))?;
    let metadata = fragment.metadata.ok_or_else(|| {
        RouteError::malformed(format!("{format} file carries no route metadata")).in_file(file_name)
    })?;
    let trackpoints = fragment.trackpoints.unwrap_or_default();
    info!(
        "{file_name}: {} trackpoints, {} POIs",
        trackpoints.len(),
        fragment.pois.len()
    );
    Ok(Route::new(metadata, trackpoints, fragment.pois))
}

/// POIs from any supported file; its metadata and track are ignored.
pub fn parse_pois_bytes(file_name: &str, bytes: &[u8]) -> Result<Vec<Poi>> {
    let format = detect(file_name, "POI file")?;
    let fragment = format
        .parser()
        .parse(bytes)
        .map_err(|e| e.in_file(file_name))?;
    info!("{file_name}: {} POIs", fragment.pois.len());
    Ok(fragment.pois)
}

/// Render `route` into the requested output format.
pub fn build(route: &Route, options: &ConvertOptions) -> Result<Document> {
    let format = options.output_type;
    let builder = format
        .builder()
        .ok_or_else(|| RouteError::UnsupportedFormat {
            path: String::new(),
            found: format.to_string(),
            role: "output type",
        })?;
    let built = builder.build(route, options)?;
    Ok(Document {
        format,
        root: built.root,
        report: built.report,
        indent: options.indent,
    })
}

/// A built output document, ready to serialize.
#[derive(Debug, Clone)]
pub struct Document {
    format: Format,
    root: Element,
    report: BuildReport,
    indent: usize,
}

impl Document {
    pub fn format(&self) -> Format {
        self.format
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Matched and skipped course points (empty for GPX).
    pub fn report(&self) -> &BuildReport {
        &self.report
    }

    /// Indented UTF-8 XML with a declaration.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        xml::to_bytes(&self.root, self.indent)
    }

    /// Write to `path`, whose extension must name the built format.
    /// Nothing is written on mismatch.
    pub fn write(&self, path: &str) -> Result<()> {
        let requested = Format::extension_of(path);
        if Format::from_tag(&requested) != Some(self.format) {
            return Err(RouteError::OutputTypeMismatch {
                path: path.to_string(),
                built: self.format,
                requested: requested.to_ascii_uppercase(),
            });
        }
        write_file(path, &self.serialize()?)
    }
}

/// One conversion flow. A session always holds a parsed base route.
#[derive(Debug, Clone)]
pub struct Session {
    route: Route,
    options: ConvertOptions,
}

impl Session {
    /// Parse the base route file at `path`.
    pub fn open(path: &str, options: ConvertOptions) -> Result<Self> {
        // reject unusable extensions before touching the file
        detect_base(path)?;
        let bytes = read_file(path)?;
        Self::from_bytes(path, &bytes, options)
    }

    pub fn from_bytes(file_name: &str, bytes: &[u8], options: ConvertOptions) -> Result<Self> {
        Ok(Self {
            route: parse_base_bytes(file_name, bytes)?,
            options,
        })
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Append the POIs of the file at `path` after the current ones.
    pub fn merge_pois(&mut self, path: &str) -> Result<usize> {
        detect(path, "POI file")?;
        let bytes = read_file(path)?;
        self.merge_pois_bytes(path, &bytes)
    }

    pub fn merge_pois_bytes(&mut self, file_name: &str, bytes: &[u8]) -> Result<usize> {
        let pois = parse_pois_bytes(file_name, bytes)?;
        let added = pois.len();
        self.route.merge_pois(pois);
        Ok(added)
    }

    pub fn clear_pois(&mut self) {
        self.route.clear_pois();
    }

    /// Build with the session's options.
    pub fn build(&self) -> Result<Document> {
        build(&self.route, &self.options)
    }

    /// Build a specific output format, keeping the other options.
    pub fn build_as(&self, output_type: Format) -> Result<Document> {
        build(&self.route, &self.options.clone().with_output_type(output_type))
    }

    /// The POI list as CSV rows.
    pub fn export_pois(&self) -> Result<Vec<u8>> {
        poi_csv::export_pois(&self.route.pois)
    }

    pub fn export_pois_to(&self, path: &str) -> Result<()> {
        write_file(path, &self.export_pois()?)
    }
}
