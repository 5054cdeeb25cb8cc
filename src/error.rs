use wasm_bindgen::JsValue;

use crate::format::Format;

pub type Result<T> = std::result::Result<T, RouteError>;

/// Coarse error category, for callers that only need to branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnsupportedFormat,
    MalformedInput,
    OutputTypeMismatch,
    EmptyPoiExport,
    Io,
}

#[derive(Debug)]
pub enum RouteError {
    /// Unknown extension, or a known one used in a role it cannot fill.
    UnsupportedFormat {
        path: String,
        found: String,
        role: &'static str,
    },
    MalformedInput {
        path: Option<String>,
        reason: String,
    },
    OutputTypeMismatch {
        path: String,
        built: Format,
        requested: String,
    },
    EmptyPoiExport,
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl RouteError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedInput {
            path: None,
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            Self::MalformedInput { .. } => ErrorKind::MalformedInput,
            Self::OutputTypeMismatch { .. } => ErrorKind::OutputTypeMismatch,
            Self::EmptyPoiExport => ErrorKind::EmptyPoiExport,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// Attach the offending file to a malformed-input error raised by a
    /// parser that only saw bytes.
    pub fn in_file(self, file: &str) -> Self {
        match self {
            Self::MalformedInput { path: None, reason } => Self::MalformedInput {
                path: Some(file.to_string()),
                reason,
            },
            other => other,
        }
    }
}

impl std::fmt::Display for RouteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedFormat { path, found, role } if path.is_empty() => {
                write!(f, "{found} is not supported yet for {role}")
            }
            Self::UnsupportedFormat { path, found, role } => {
                write!(f, "{found} is not supported yet for {role} ({path})")
            }
            Self::MalformedInput {
                path: Some(path),
                reason,
            } => write!(f, "Malformed input in {path}: {reason}"),
            Self::MalformedInput { path: None, reason } => {
                write!(f, "Malformed input: {reason}")
            }
            Self::OutputTypeMismatch {
                path,
                built,
                requested,
            } => write!(
                f,
                "Output type is different: built {built} but output filename {path} implies {requested}; no output file written"
            ),
            Self::EmptyPoiExport => write!(f, "There are no POI to output"),
            Self::Io { path, source } => write!(f, "I/O error on {path}: {source}"),
        }
    }
}

impl std::error::Error for RouteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for RouteError {
    fn from(e: quick_xml::Error) -> Self {
        Self::malformed(format!("XML parse error: {e}"))
    }
}

impl From<zip::result::ZipError> for RouteError {
    fn from(e: zip::result::ZipError) -> Self {
        Self::malformed(format!("Archive error: {e}"))
    }
}

impl From<csv::Error> for RouteError {
    fn from(e: csv::Error) -> Self {
        Self::malformed(format!("CSV error: {e}"))
    }
}

impl From<RouteError> for JsValue {
    fn from(e: RouteError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_file_attaches_path_once() {
        let err = RouteError::malformed("missing lat").in_file("a.gpx");
        assert_eq!(err.to_string(), "Malformed input in a.gpx: missing lat");

        let err = err.in_file("b.gpx");
        assert_eq!(err.to_string(), "Malformed input in a.gpx: missing lat");
    }

    #[test]
    fn test_kind() {
        assert_eq!(RouteError::EmptyPoiExport.kind(), ErrorKind::EmptyPoiExport);
        assert_eq!(
            RouteError::malformed("x").kind(),
            ErrorKind::MalformedInput
        );
    }
}
