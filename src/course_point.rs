//! Snapping POIs onto the track for TCX course points.

use log::{info, warn};
use serde::Serialize;

use crate::distance::geodesic_distance;
use crate::model::{Poi, Trackpoint};

pub const DEFAULT_TOLERANCE_METERS: f64 = 100.0;

/// The nearest trackpoint to a POI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Nearest {
    pub index: usize,
    pub distance: f64,
}

/// Index and distance of the closest trackpoint. Ties go to the lowest
/// index. `None` for an empty track, or when no distance is finite
/// (latitudes outside +-90 have no geodesic).
pub fn nearest_trackpoint(poi: &Poi, trackpoints: &[Trackpoint]) -> Option<Nearest> {
    let mut best: Option<Nearest> = None;
    for (index, trackpoint) in trackpoints.iter().enumerate() {
        let distance = geodesic_distance(poi.coords(), trackpoint.coords());
        if !distance.is_finite() {
            continue;
        }
        if best.is_none_or(|b| distance < b.distance) {
            best = Some(Nearest { index, distance });
        }
    }
    best
}

/// The nearest trackpoint if it is strictly closer than `tolerance_meters`.
pub fn match_course_point(
    poi: &Poi,
    trackpoints: &[Trackpoint],
    tolerance_meters: f64,
) -> Option<Nearest> {
    nearest_trackpoint(poi, trackpoints).filter(|n| n.distance < tolerance_meters)
}

/// Cumulative distance for every trackpoint.
///
/// Distances carried by the source are used only when every point has
/// one; otherwise the whole track is measured: 0 for the first point,
/// then the running sum of consecutive geodesic distances. An
/// out-of-range coordinate makes the sum NaN from that point on.
pub fn cumulative_distances(trackpoints: &[Trackpoint]) -> Vec<f64> {
    let carried: Option<Vec<f64>> = trackpoints
        .iter()
        .map(|t| t.cumulative_distance)
        .collect();
    if let Some(carried) = carried {
        return carried;
    }

    let mut distances = Vec::with_capacity(trackpoints.len());
    let mut total = 0.0;
    for (i, trackpoint) in trackpoints.iter().enumerate() {
        if i > 0 {
            total += geodesic_distance(trackpoints[i - 1].coords(), trackpoint.coords());
        }
        distances.push(total);
    }
    distances
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedPoi {
    /// 1-based position in the POI list.
    pub number: usize,
    pub name: String,
    pub trackpoint_index: usize,
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedPoi {
    pub number: usize,
    pub name: String,
    /// Distance to the nearest trackpoint, absent for an empty track.
    pub nearest_distance: Option<f64>,
}

/// Per-POI outcome of a build. Skips are expected, not errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub matched: Vec<MatchedPoi>,
    pub skipped: Vec<SkippedPoi>,
}

impl BuildReport {
    /// Match one POI, log the outcome and record it.
    pub fn record(
        &mut self,
        number: usize,
        poi: &Poi,
        trackpoints: &[Trackpoint],
        tolerance_meters: f64,
    ) -> Option<usize> {
        match match_course_point(poi, trackpoints, tolerance_meters) {
            Some(n) => {
                info!(
                    "#{number} {}: found nearest trackpoint: {:.2} m",
                    poi.name, n.distance
                );
                self.matched.push(MatchedPoi {
                    number,
                    name: poi.name.clone(),
                    trackpoint_index: n.index,
                    distance: n.distance,
                });
                Some(n.index)
            }
            None => {
                warn!("#{number} {}: skip", poi.name);
                self.skipped.push(SkippedPoi {
                    number,
                    name: poi.name.clone(),
                    nearest_distance: nearest_trackpoint(poi, trackpoints).map(|n| n.distance),
                });
                None
            }
        }
    }
}
