use serde::{Deserialize, Serialize};

pub const DEFAULT_ACTIVITY_TYPE: &str = "Ride";

/// Route-level metadata, one per route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub name: String,
    pub activity_type: String,
}

impl Metadata {
    /// An absent or empty activity type falls back to "Ride".
    pub fn new(name: Option<String>, activity_type: Option<String>) -> Self {
        Self {
            name: name.unwrap_or_default(),
            activity_type: activity_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_ACTIVITY_TYPE.to_string()),
        }
    }
}

/// A single sample along the track, in traversal order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trackpoint {
    pub latitude: f64,
    pub longitude: f64,
    pub elevation: Option<f64>,
    /// Meters from the route start.
    pub cumulative_distance: Option<f64>,
}

impl Trackpoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: None,
            cumulative_distance: None,
        }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// A named point of interest, independent of track order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poi {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub notes: Option<String>,
    /// Format-specific vocabulary, passed through untouched.
    pub category: Option<String>,
    /// GPX display hint.
    pub symbol: Option<String>,
}

impl Poi {
    pub fn new(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            name: name.into(),
            notes: None,
            category: None,
            symbol: None,
        }
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// What a single parser produces. POI-only formats leave `metadata` and
/// `trackpoints` empty.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RouteFragment {
    pub metadata: Option<Metadata>,
    pub trackpoints: Option<Vec<Trackpoint>>,
    pub pois: Vec<Poi>,
}

/// The canonical route: one metadata record, ordered trackpoints, POIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub metadata: Metadata,
    pub trackpoints: Vec<Trackpoint>,
    pub pois: Vec<Poi>,
}

impl Route {
    pub fn new(metadata: Metadata, trackpoints: Vec<Trackpoint>, pois: Vec<Poi>) -> Self {
        Self {
            metadata,
            trackpoints,
            pois,
        }
    }

    /// Appends POIs after the existing ones, keeping both orders.
    pub fn merge_pois(&mut self, pois: impl IntoIterator<Item = Poi>) {
        self.pois.extend(pois);
    }

    pub fn clear_pois(&mut self) {
        self.pois.clear();
    }
}
