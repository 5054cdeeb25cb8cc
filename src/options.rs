use serde::Deserialize;

use crate::course_point::DEFAULT_TOLERANCE_METERS;
use crate::format::Format;

/// Options for building an output document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Output format tag, case-insensitive (default: TCX)
    #[serde(default = "default_output_type")]
    pub output_type: Format,

    /// Maximum POI-to-track distance for a TCX course point (default: 100 m)
    #[serde(default = "default_tolerance")]
    pub tolerance_meters: f64,

    /// Spaces per nesting level in the serialized document (default: 1)
    #[serde(default = "default_indent")]
    pub indent: usize,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            output_type: default_output_type(),
            tolerance_meters: default_tolerance(),
            indent: default_indent(),
        }
    }
}

impl ConvertOptions {
    pub fn with_output_type(mut self, output_type: Format) -> Self {
        self.output_type = output_type;
        self
    }
}

fn default_output_type() -> Format {
    Format::Tcx
}

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE_METERS
}

fn default_indent() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let opts: ConvertOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, ConvertOptions::default());
        assert_eq!(opts.output_type, Format::Tcx);
        assert_eq!(opts.tolerance_meters, 100.0);
        assert_eq!(opts.indent, 1);
    }

    #[test]
    fn test_camel_case_fields() {
        let opts: ConvertOptions =
            serde_json::from_str(r#"{"outputType":"GPX","toleranceMeters":25.5,"indent":2}"#)
                .unwrap();
        assert_eq!(opts.output_type, Format::Gpx);
        assert_eq!(opts.tolerance_meters, 25.5);
        assert_eq!(opts.indent, 2);
    }

    #[test]
    fn test_unknown_output_type_rejected() {
        assert!(serde_json::from_str::<ConvertOptions>(r#"{"outputType":"kml2"}"#).is_err());
    }
}
