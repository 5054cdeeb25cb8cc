use crate::course_point::BuildReport;
use crate::error::Result;
use crate::format::{Builder, Built, Parser, optional_number, required_number};
use crate::model::{Metadata, Poi, Route, RouteFragment, Trackpoint};
use crate::options::ConvertOptions;
use crate::xml::{self, Element};

const GPX_NAMESPACE: &str = "http://www.topografix.com/GPX/1/1";
const DEFAULT_SYMBOL: &str = "Flag";
const DEFAULT_TYPE: &str = "Flag";

pub struct GpxParser;

impl Parser for GpxParser {
    fn parse(&self, bytes: &[u8]) -> Result<RouteFragment> {
        let root = xml::parse(bytes)?;

        let metadata = Metadata::new(
            root.find_text_anywhere("metadata/name"),
            root.find_text_anywhere("trk/type"),
        );

        // route-only files (<rte>/<rtept>) fall back to their route points
        let mut points = root.descendants("trkpt");
        if points.is_empty() {
            points = root.descendants("rtept");
        }
        let trackpoints = points
            .into_iter()
            .map(parse_trkpt)
            .collect::<Result<Vec<_>>>()?;

        let pois = root
            .descendants("wpt")
            .into_iter()
            .map(parse_wpt)
            .collect::<Result<Vec<_>>>()?;

        Ok(RouteFragment {
            metadata: Some(metadata),
            trackpoints: Some(trackpoints),
            pois,
        })
    }
}

fn parse_lat_lon(e: &Element) -> Result<(f64, f64)> {
    let what = e.name.as_str();
    Ok((
        required_number(e.attr("lat"), &format!("{what} lat"))?,
        required_number(e.attr("lon"), &format!("{what} lon"))?,
    ))
}

fn parse_trkpt(e: &Element) -> Result<Trackpoint> {
    let (lat, lon) = parse_lat_lon(e)?;
    let mut point = Trackpoint::new(lat, lon);
    point.elevation = optional_number(e.find_text("ele").as_deref(), "ele")?;
    Ok(point)
}

fn parse_wpt(e: &Element) -> Result<Poi> {
    let (lat, lon) = parse_lat_lon(e)?;
    let mut poi = Poi::new(lat, lon, e.find_text("name").unwrap_or_default());
    poi.notes = e.find_text("desc");
    poi.category = e.find_text("type");
    poi.symbol = e.find_text("sym");
    Ok(poi)
}

pub struct GpxBuilder;

impl Builder for GpxBuilder {
    fn build(&self, route: &Route, _options: &ConvertOptions) -> Result<Built> {
        let mut root = Element::new("gpx")
            .with_attr("version", "1.1")
            .with_attr("creator", "routetools")
            .with_attr("xmlns", GPX_NAMESPACE);

        root.child(Element::new("metadata"))
            .text_child("name", &route.metadata.name);

        for poi in &route.pois {
            let wpt = root.child(
                Element::new("wpt")
                    .with_attr("lat", poi.latitude.to_string())
                    .with_attr("lon", poi.longitude.to_string()),
            );
            wpt.text_child("name", &poi.name);
            wpt.optional_child("desc", poi.notes.as_deref());
            wpt.text_child("sym", poi.symbol.as_deref().unwrap_or(DEFAULT_SYMBOL));
            wpt.text_child("type", poi.category.as_deref().unwrap_or(DEFAULT_TYPE));
        }

        let trk = root.child(Element::new("trk"));
        trk.text_child("name", &route.metadata.name);
        trk.text_child("type", &route.metadata.activity_type);
        let trkseg = trk.child(Element::new("trkseg"));
        for point in &route.trackpoints {
            let trkpt = trkseg.child(
                Element::new("trkpt")
                    .with_attr("lat", point.latitude.to_string())
                    .with_attr("lon", point.longitude.to_string()),
            );
            trkpt.optional_child("ele", point.elevation.map(|e| e.to_string()));
        }

        Ok(Built {
            root,
            report: BuildReport::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> RouteFragment {
        GpxParser.parse(xml.as_bytes()).unwrap()
    }

    #[test]
    fn test_metadata_and_type() {
        let frag = parse(
            r#"<?xml version="1.0"?>
<gpx xmlns="http://www.topografix.com/GPX/1/1" version="1.1">
  <metadata><name>Morning Loop</name></metadata>
  <trk><name>ignored</name><type>Run</type><trkseg/></trk>
</gpx>"#,
        );
        let meta = frag.metadata.unwrap();
        assert_eq!(meta.name, "Morning Loop");
        assert_eq!(meta.activity_type, "Run");
        assert!(frag.trackpoints.unwrap().is_empty());
    }

    #[test]
    fn test_defaults_without_metadata() {
        let frag = parse(r#"<gpx><trk><trkseg><trkpt lat="1" lon="2"/></trkseg></trk></gpx>"#);
        let meta = frag.metadata.unwrap();
        assert_eq!(meta.name, "");
        assert_eq!(meta.activity_type, "Ride");
    }

    #[test]
    fn test_trackpoints_in_order() {
        let frag = parse(
            r#"<gpx><trk><trkseg>
      <trkpt lat="35.0" lon="139.0"><ele>10.0</ele></trkpt>
      <trkpt lat="35.001" lon="139.001"/>
    </trkseg><trkseg>
      <trkpt lat="35.002" lon="139.002"><ele>12.5</ele></trkpt>
    </trkseg></trk></gpx>"#,
        );
        let points = frag.trackpoints.unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].coords(), (35.0, 139.0));
        assert_eq!(points[0].elevation, Some(10.0));
        assert_eq!(points[1].elevation, None);
        assert_eq!(points[2].elevation, Some(12.5));
        assert!(points.iter().all(|p| p.cumulative_distance.is_none()));
    }

    #[test]
    fn test_route_points_when_no_track() {
        let frag = parse(
            r#"<gpx><rte><name>Plan</name>
      <rtept lat="1.0" lon="2.0"><ele>3</ele></rtept>
      <rtept lat="1.1" lon="2.1"/>
    </rte></gpx>"#,
        );
        let points = frag.trackpoints.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].elevation, Some(3.0));
        assert_eq!(points[1].coords(), (1.1, 2.1));
    }

    #[test]
    fn test_waypoint_fields() {
        let frag = parse(
            r#"<gpx><wpt lat="35.6762" lon="139.6503">
    <name>Tokyo Tower</name><desc>Landmark</desc><sym>Flag, Blue</sym><type>Summit</type>
  </wpt><wpt lat="1" lon="2"/></gpx>"#,
        );
        assert_eq!(frag.pois.len(), 2);
        let poi = &frag.pois[0];
        assert_eq!(poi.name, "Tokyo Tower");
        assert_eq!(poi.notes.as_deref(), Some("Landmark"));
        assert_eq!(poi.symbol.as_deref(), Some("Flag, Blue"));
        assert_eq!(poi.category.as_deref(), Some("Summit"));
        assert_eq!(frag.pois[1].name, "");
        assert_eq!(frag.pois[1].notes, None);
    }

    #[test]
    fn test_missing_coordinate_is_error() {
        let err = GpxParser
            .parse(br#"<gpx><wpt lat="35.0"><name>Half</name></wpt></gpx>"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "Malformed input: missing wpt lon");

        assert!(
            GpxParser
                .parse(br#"<gpx><trk><trkseg><trkpt lat="x" lon="1"/></trkseg></trk></gpx>"#)
                .is_err()
        );
    }

    #[test]
    fn test_build_defaults_symbol_and_type() {
        let mut route = Route::new(
            Metadata::new(Some("Loop".to_string()), None),
            vec![Trackpoint::new(35.0, 139.0)],
            vec![Poi::new(35.0, 139.0, "Start")],
        );
        route.trackpoints[0].elevation = Some(7.0);
        let built = GpxBuilder.build(&route, &ConvertOptions::default()).unwrap();
        let root = built.root;

        assert_eq!(root.attr("version"), Some("1.1"));
        assert_eq!(
            root.attr("xmlns"),
            Some("http://www.topografix.com/GPX/1/1")
        );
        assert_eq!(root.find_text("metadata/name").as_deref(), Some("Loop"));
        let wpt = root.find("wpt").unwrap();
        assert_eq!(wpt.attr("lat"), Some("35"));
        assert_eq!(wpt.find_text("sym").as_deref(), Some("Flag"));
        assert_eq!(wpt.find_text("type").as_deref(), Some("Flag"));
        assert!(wpt.find("desc").is_none());
        assert_eq!(root.find_text("trk/name").as_deref(), Some("Loop"));
        assert_eq!(root.find_text("trk/type").as_deref(), Some("Ride"));
        assert_eq!(
            root.find_text("trk/trkseg/trkpt/ele").as_deref(),
            Some("7")
        );
        assert!(built.report.matched.is_empty());
    }
}
