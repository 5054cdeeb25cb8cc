pub mod converter;
pub mod course_point;
pub mod distance;
pub mod error;
pub mod format;
pub mod gpx;
pub mod kml;
pub mod model;
pub mod options;
pub mod poi_csv;
pub mod tcx;
pub mod xml;

use wasm_bindgen::prelude::*;

use crate::converter::Session;
use crate::course_point::BuildReport;
use crate::format::Format;
use crate::options::ConvertOptions;

/// Convert a route file's bytes to the output format named in `options`,
/// returned as an XML string.
#[wasm_bindgen(js_name = convertRoute)]
pub fn convert_route(file_name: &str, bytes: &[u8], options: JsValue) -> Result<String, JsValue> {
    console_error_panic_hook::set_once();

    let opts = parse_options(options)?;
    let session = Session::from_bytes(file_name, bytes, opts)?;
    let xml = session.build()?.serialize()?;
    String::from_utf8(xml).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// A conversion session for JavaScript callers, who hand over file
/// contents instead of paths.
#[wasm_bindgen]
pub struct RouteSession {
    session: Session,
    last_report: BuildReport,
}

#[wasm_bindgen]
impl RouteSession {
    /// Parse the base route file.
    #[wasm_bindgen(constructor)]
    pub fn new(file_name: &str, bytes: &[u8], options: JsValue) -> Result<RouteSession, JsValue> {
        console_error_panic_hook::set_once();

        let opts = parse_options(options)?;
        Ok(RouteSession {
            session: Session::from_bytes(file_name, bytes, opts)?,
            last_report: BuildReport::default(),
        })
    }

    /// Append POIs from another file; returns how many were added.
    #[wasm_bindgen(js_name = mergePois)]
    pub fn merge_pois(&mut self, file_name: &str, bytes: &[u8]) -> Result<usize, JsValue> {
        Ok(self.session.merge_pois_bytes(file_name, bytes)?)
    }

    #[wasm_bindgen(js_name = clearPois)]
    pub fn clear_pois(&mut self) {
        self.session.clear_pois();
    }

    /// Build and serialize. `output_type` overrides the session options.
    pub fn build(&mut self, output_type: Option<String>) -> Result<Vec<u8>, JsValue> {
        let document = match output_type {
            Some(tag) => self.session.build_as(Format::try_from(tag)?)?,
            None => self.session.build()?,
        };
        self.last_report = document.report().clone();
        Ok(document.serialize()?)
    }

    /// The POI list as CSV.
    #[wasm_bindgen(js_name = exportPois)]
    pub fn export_pois(&self) -> Result<Vec<u8>, JsValue> {
        Ok(self.session.export_pois()?)
    }

    /// The current POIs as plain objects.
    pub fn pois(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.session.route().pois)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Matched and skipped course points from the latest build.
    #[wasm_bindgen(js_name = lastReport)]
    pub fn last_report(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.last_report)
            .map_err(|e| JsValue::from_str(&e.to_string()))
    }
}

fn parse_options(options: JsValue) -> Result<ConvertOptions, JsValue> {
    if options.is_undefined() || options.is_null() {
        Ok(ConvertOptions::default())
    } else {
        serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
    }
}
