use log::debug;

use crate::course_point::{BuildReport, cumulative_distances};
use crate::error::{Result, RouteError};
use crate::format::{Builder, Built, Parser, optional_number, required_number};
use crate::model::{Metadata, Poi, Route, RouteFragment, Trackpoint};
use crate::options::ConvertOptions;
use crate::xml::{self, Element};

const TCX_NAMESPACE: &str = "http://www.garmin.com/xmlschemas/TrainingCenterDatabase/v2";
const DEFAULT_POINT_TYPE: &str = "Generic";

pub struct TcxParser;

impl Parser for TcxParser {
    fn parse(&self, bytes: &[u8]) -> Result<RouteFragment> {
        let root = xml::parse(bytes)?;

        let name = root
            .find_text_anywhere("CourseNameRef/Id")
            .or_else(|| root.find_text_anywhere("Course/Name"));
        let metadata = Metadata::new(name, None);

        let trackpoints = root
            .descendants("Trackpoint")
            .into_iter()
            .map(parse_trackpoint)
            .collect::<Result<Vec<_>>>()?;

        let pois = root
            .descendants("CoursePoint")
            .into_iter()
            .map(parse_course_point)
            .collect::<Result<Vec<_>>>()?;

        Ok(RouteFragment {
            metadata: Some(metadata),
            trackpoints: Some(trackpoints),
            pois,
        })
    }
}

fn parse_position(e: &Element) -> Result<(f64, f64)> {
    Ok((
        required_number(
            e.find_text("Position/LatitudeDegrees").as_deref(),
            &format!("{} LatitudeDegrees", e.name),
        )?,
        required_number(
            e.find_text("Position/LongitudeDegrees").as_deref(),
            &format!("{} LongitudeDegrees", e.name),
        )?,
    ))
}

fn parse_trackpoint(e: &Element) -> Result<Trackpoint> {
    let (lat, lon) = parse_position(e)?;
    let mut point = Trackpoint::new(lat, lon);
    point.elevation = optional_number(e.find_text("AltitudeMeters").as_deref(), "AltitudeMeters")?;
    point.cumulative_distance =
        optional_number(e.find_text("DistanceMeters").as_deref(), "DistanceMeters")?;
    Ok(point)
}

fn parse_course_point(e: &Element) -> Result<Poi> {
    let name = e
        .find_text("Name")
        .ok_or_else(|| RouteError::malformed("CoursePoint without Name"))?;
    let (lat, lon) = parse_position(e)?;
    let mut poi = Poi::new(lat, lon, name);
    poi.category = e.find_text("PointType");
    poi.notes = e.find_text("Notes");
    Ok(poi)
}

pub struct TcxBuilder;

impl Builder for TcxBuilder {
    fn build(&self, route: &Route, options: &ConvertOptions) -> Result<Built> {
        let name = &route.metadata.name;
        let mut root = Element::new("TrainingCenterDatabase").with_attr("xmlns", TCX_NAMESPACE);

        root.child(Element::new("Folders"))
            .child(Element::new("Courses"))
            .child(Element::new("CourseFolder").with_attr("Name", "Courses"))
            .child(Element::new("CourseNameRef"))
            .text_child("Id", name);

        let course = root
            .child(Element::new("Courses"))
            .child(Element::new("Course"));
        course.text_child("Name", name);

        let distances = cumulative_distances(&route.trackpoints);
        let track = course.child(Element::new("Track"));
        for (point, distance) in route.trackpoints.iter().zip(distances) {
            let trackpoint = track.child(Element::new("Trackpoint"));
            position(trackpoint, point);
            trackpoint.optional_child("AltitudeMeters", point.elevation.map(|e| e.to_string()));
            if distance.is_finite() {
                trackpoint.text_child("DistanceMeters", distance.to_string());
            } else {
                debug!(
                    "no distance for trackpoint at {}, {}",
                    point.latitude, point.longitude
                );
            }
        }

        let mut report = BuildReport::default();
        for (i, poi) in route.pois.iter().enumerate() {
            let Some(index) = report.record(i + 1, poi, &route.trackpoints, options.tolerance_meters)
            else {
                continue;
            };
            let course_point = course.child(Element::new("CoursePoint"));
            course_point.text_child("Name", &poi.name);
            // course points sit exactly on the track
            position(course_point, &route.trackpoints[index]);
            course_point.text_child(
                "PointType",
                poi.category.as_deref().unwrap_or(DEFAULT_POINT_TYPE),
            );
            course_point.optional_child("Notes", poi.notes.as_deref());
        }

        Ok(Built { root, report })
    }
}

fn position(parent: &mut Element, point: &Trackpoint) {
    let position = parent.child(Element::new("Position"));
    position.text_child("LatitudeDegrees", point.latitude.to_string());
    position.text_child("LongitudeDegrees", point.longitude.to_string());
}
