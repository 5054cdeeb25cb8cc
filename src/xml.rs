//! Namespace-agnostic XML element tree.
//!
//! Parsing keeps only local names, so `gpx:trkpt` and `{uri}trkpt` both
//! answer to `trkpt`. Lookups take `/`-separated local-name paths.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::error::{Result, RouteError};

/// Deepest element nesting accepted by [`parse`]. Tree walks recurse per
/// level, so this also bounds their stack use.
pub const MAX_DEPTH: usize = 1024;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Appends a child and returns a handle to it.
    pub fn child(&mut self, element: Element) -> &mut Element {
        self.children.push(element);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// Appends a text-only child.
    pub fn text_child(&mut self, name: &str, text: impl Into<String>) {
        self.children.push(Element::new(name).with_text(text));
    }

    /// Appends a text-only child when the value is present.
    pub fn optional_child(&mut self, name: &str, text: Option<impl Into<String>>) {
        if let Some(text) = text {
            self.text_child(name, text);
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First element reached by following `path` through direct children.
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/').try_fold(self, |current, step| {
            current.children.iter().find(|c| c.name == step)
        })
    }

    /// Trimmed text of the element at `path`; empty text counts as absent.
    pub fn find_text(&self, path: &str) -> Option<String> {
        self.find(path)
            .and_then(|e| e.text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }

    /// All descendants (not including `self`) with the given local name,
    /// in document order.
    pub fn descendants<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        collect_descendants(self, name, &mut found);
        found
    }

    /// Like [`Element::find`], but the first step may match at any depth.
    pub fn find_anywhere(&self, path: &str) -> Option<&Element> {
        let (first, rest) = match path.split_once('/') {
            Some((first, rest)) => (first, Some(rest)),
            None => (path, None),
        };
        self.descendants(first)
            .into_iter()
            .find_map(|e| match rest {
                Some(rest) => e.find(rest),
                None => Some(e),
            })
    }

    pub fn find_text_anywhere(&self, path: &str) -> Option<String> {
        let (first, rest) = match path.split_once('/') {
            Some((first, rest)) => (first, Some(rest)),
            None => (path, None),
        };
        self.descendants(first).into_iter().find_map(|e| match rest {
            Some(rest) => e.find_text(rest),
            None => e
                .text
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        })
    }
}

fn collect_descendants<'a>(element: &'a Element, name: &str, found: &mut Vec<&'a Element>) {
    for child in &element.children {
        if child.name == name {
            found.push(child);
        }
        collect_descendants(child, name, found);
    }
}

/// Parse an XML document into its root element.
pub fn parse(bytes: &[u8]) -> Result<Element> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = Reader::from_reader(bytes);
    let mut stack: Vec<Element> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(RouteError::malformed("element nesting too deep"));
                }
                stack.push(start_element(&e)?);
            }
            Event::Empty(e) => {
                let element = start_element(&e)?;
                if let Some(root) = close(&mut stack, element) {
                    return Ok(root);
                }
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| RouteError::malformed("unexpected closing tag"))?;
                if let Some(root) = close(&mut stack, element) {
                    return Ok(root);
                }
            }
            Event::Text(e) => {
                let raw = std::str::from_utf8(e.as_ref())
                    .map_err(|e| RouteError::malformed(format!("invalid UTF-8: {e}")))?;
                push_text(&mut stack, raw);
            }
            Event::CData(e) => {
                let raw = std::str::from_utf8(e.as_ref())
                    .map_err(|e| RouteError::malformed(format!("invalid UTF-8: {e}")))?;
                push_text(&mut stack, raw);
            }
            Event::GeneralRef(e) => {
                let ch = match e.resolve_char_ref() {
                    Ok(Some(ch)) => Some(ch),
                    _ => match std::str::from_utf8(e.as_ref()).unwrap_or_default() {
                        "amp" => Some('&'),
                        "lt" => Some('<'),
                        "gt" => Some('>'),
                        "quot" => Some('"'),
                        "apos" => Some('\''),
                        _ => None,
                    },
                };
                if let Some(ch) = ch {
                    push_text(&mut stack, ch.encode_utf8(&mut [0; 4]));
                }
            }
            Event::Eof if stack.is_empty() => {
                return Err(RouteError::malformed("no root element"));
            }
            Event::Eof => return Err(RouteError::malformed("unexpected end of document")),
            _ => {}
        }
    }
}

fn start_element(e: &BytesStart<'_>) -> Result<Element> {
    let name = std::str::from_utf8(e.local_name().as_ref())
        .map_err(|e| RouteError::malformed(format!("invalid element name: {e}")))?
        .to_string();
    let mut element = Element::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| RouteError::malformed(format!("bad attribute: {e}")))?;
        let key = attr.key.local_name();
        let key = std::str::from_utf8(key.as_ref()).unwrap_or_default();
        // namespace declarations are not data
        if key == "xmlns" || attr.key.as_ref().starts_with(b"xmlns:") {
            continue;
        }
        let raw = std::str::from_utf8(&attr.value).unwrap_or_default();
        let value = quick_xml::escape::unescape(raw)
            .map_err(|e| RouteError::malformed(format!("bad attribute value '{raw}': {e}")))?;
        element.attributes.push((key.to_string(), value.into_owned()));
    }
    Ok(element)
}

/// Attach a finished element to its parent; returns it if it was the root.
fn close(stack: &mut Vec<Element>, element: Element) -> Option<Element> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(element);
            None
        }
        None => Some(element),
    }
}

fn push_text(stack: &mut [Element], text: &str) {
    if let Some(current) = stack.last_mut() {
        current.text.get_or_insert_with(String::new).push_str(text);
    }
}

/// Serialize with an XML declaration, UTF-8 encoding and `indent` spaces
/// per nesting level.
pub fn to_bytes(root: &Element, indent: usize) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', indent);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(write_error)?;
    write_element(&mut writer, root)?;
    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.text.is_none() && element.children.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(write_error);
    }

    writer.write_event(Event::Start(start)).map_err(write_error)?;
    if let Some(text) = &element.text {
        writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(write_error)?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(write_error)
}

fn write_error(e: std::io::Error) -> RouteError {
    RouteError::Io {
        path: "<document>".to_string(),
        source: e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_names_ignore_namespace() {
        let xml = br#"<?xml version="1.0"?>
<g:gpx xmlns:g="http://www.topografix.com/GPX/1/1">
  <g:metadata><g:name>Loop</g:name></g:metadata>
</g:gpx>"#;
        let root = parse(xml).unwrap();
        assert_eq!(root.name, "gpx");
        assert!(root.attributes.is_empty());
        assert_eq!(root.find_text("metadata/name").as_deref(), Some("Loop"));
    }

    #[test]
    fn test_default_namespace() {
        let xml = br#"<gpx xmlns="http://www.topografix.com/GPX/1/1"><trk><trkseg>
            <trkpt lat="1" lon="2"/><trkpt lat="3" lon="4"/></trkseg></trk></gpx>"#;
        let root = parse(xml).unwrap();
        let points = root.descendants("trkpt");
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].attr("lat"), Some("3"));
    }

    #[test]
    fn test_text_with_entities_and_cdata() {
        let xml = br#"<a><b>Caf&#233; &amp; Bar</b><c><![CDATA[x < y]]></c></a>"#;
        let root = parse(xml).unwrap();
        assert_eq!(root.find_text("b").as_deref(), Some("Café & Bar"));
        assert_eq!(root.find_text("c").as_deref(), Some("x < y"));
    }

    #[test]
    fn test_attribute_unescaped() {
        let root = parse(br#"<a name="Fish &amp; Chips"/>"#).unwrap();
        assert_eq!(root.attr("name"), Some("Fish & Chips"));
    }

    #[test]
    fn test_find_anywhere() {
        let xml = br#"<kml><Document><Folder><name>inner</name></Folder><name>outer</name></Document></kml>"#;
        let root = parse(xml).unwrap();
        assert_eq!(
            root.find_text_anywhere("Document/name").as_deref(),
            Some("outer")
        );
        assert!(root.find_anywhere("Folder/name").is_some());
        assert!(root.find_anywhere("Missing/name").is_none());
    }

    #[test]
    fn test_mismatched_tags_fail() {
        assert!(parse(b"<a><b></a>").is_err());
        assert!(parse(b"").is_err());
    }

    #[test]
    fn test_nesting_depth_limit() {
        let nested = |depth: usize| {
            format!("<gpx>{}{}</gpx>", "<a>".repeat(depth), "</a>".repeat(depth))
        };
        let root = parse(nested(MAX_DEPTH - 1).as_bytes()).unwrap();
        assert_eq!(root.descendants("a").len(), MAX_DEPTH - 1);

        let err = parse(nested(200_000).as_bytes()).unwrap_err();
        assert_eq!(err.to_string(), "Malformed input: element nesting too deep");
    }

    #[test]
    fn test_write_then_parse() {
        let mut root = Element::new("gpx").with_attr("version", "1.1");
        let wpt = root.child(Element::new("wpt").with_attr("lat", "1.5"));
        wpt.text_child("name", "A & B");
        wpt.optional_child("desc", None::<String>);
        let bytes = to_bytes(&root, 2).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(text.contains("A &amp; B"));
        assert!(!text.contains("desc"));

        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed.find_text("wpt/name").as_deref(), Some("A & B"));
        assert_eq!(parsed.find("wpt").unwrap().attr("lat"), Some("1.5"));
    }
}
