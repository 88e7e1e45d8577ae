// Shared data structures: the drawn-feature snapshot going in, and the
// metrics / label collections coming out.
use geo_types::{Coord, Point};
use serde::{Deserialize, Serialize};

use crate::errors::{MeasureError, MeasureResult};

/// A longitude/latitude pair in degrees. On the wire this is a GeoJSON
/// position (`[lon, lat]`); any extra ordinates are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Finite and inside lon ∈ [-180, 180], lat ∈ [-90, 90].
    pub fn is_valid(&self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && (-180.0..=180.0).contains(&self.lon)
            && (-90.0..=90.0).contains(&self.lat)
    }

    pub fn validate(&self) -> MeasureResult<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(MeasureError::InvalidCoordinate {
                lon: self.lon,
                lat: self.lat,
            })
        }
    }
}

impl TryFrom<Vec<f64>> for Coordinate {
    type Error = MeasureError;

    fn try_from(position: Vec<f64>) -> Result<Self, Self::Error> {
        match position.as_slice() {
            [lon, lat, ..] => Ok(Coordinate::new(*lon, *lat)),
            _ => Err(MeasureError::ShortPosition(position.len())),
        }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(c: Coordinate) -> Self {
        [c.lon, c.lat]
    }
}

impl From<Coordinate> for Coord<f64> {
    fn from(c: Coordinate) -> Self {
        Coord { x: c.lon, y: c.lat }
    }
}

impl From<Coordinate> for Point<f64> {
    fn from(c: Coordinate) -> Self {
        Point::new(c.lon, c.lat)
    }
}

impl From<Point<f64>> for Coordinate {
    fn from(p: Point<f64>) -> Self {
        Coordinate::new(p.x(), p.y())
    }
}

/// The three geometry kinds the drawing tool produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    LineString,
    Polygon,
}

impl GeometryKind {
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "Point" => Some(GeometryKind::Point),
            "LineString" => Some(GeometryKind::LineString),
            "Polygon" => Some(GeometryKind::Polygon),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            GeometryKind::Point => "Point",
            GeometryKind::LineString => "LineString",
            GeometryKind::Polygon => "Polygon",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawnGeometry {
    Point(Coordinate),
    LineString(Vec<Coordinate>),
    /// Rings in GeoJSON order: exterior first, then holes.
    Polygon(Vec<Vec<Coordinate>>),
    /// A known kind whose coordinates could not be read. Still counted.
    Malformed { kind: GeometryKind, reason: String },
    /// Any other GeoJSON geometry type; ignored by the engine.
    Unsupported(String),
}

impl DrawnGeometry {
    /// Build a geometry from a GeoJSON `type` name and its raw `coordinates`.
    pub fn from_parts(type_name: &str, coordinates: serde_json::Value) -> Self {
        let Some(kind) = GeometryKind::from_type_name(type_name) else {
            return DrawnGeometry::Unsupported(type_name.to_string());
        };

        let parsed = match kind {
            GeometryKind::Point => serde_json::from_value(coordinates).map(DrawnGeometry::Point),
            GeometryKind::LineString => {
                serde_json::from_value(coordinates).map(DrawnGeometry::LineString)
            }
            GeometryKind::Polygon => serde_json::from_value(coordinates).map(DrawnGeometry::Polygon),
        };

        parsed.unwrap_or_else(|e| DrawnGeometry::Malformed {
            kind,
            reason: e.to_string(),
        })
    }

    pub fn kind(&self) -> Option<GeometryKind> {
        match self {
            DrawnGeometry::Point(_) => Some(GeometryKind::Point),
            DrawnGeometry::LineString(_) => Some(GeometryKind::LineString),
            DrawnGeometry::Polygon(_) => Some(GeometryKind::Polygon),
            DrawnGeometry::Malformed { kind, .. } => Some(*kind),
            DrawnGeometry::Unsupported(_) => None,
        }
    }
}

/// One feature of the snapshot owned by the drawing collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnFeature {
    pub id: Option<String>,
    pub geometry: DrawnGeometry,
}

impl DrawnFeature {
    pub fn new(geometry: DrawnGeometry) -> Self {
        Self { id: None, geometry }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

// Loose GeoJSON shapes; the typed conversion happens per feature so that one
// bad geometry cannot fail the whole collection.
#[derive(Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    coordinates: serde_json::Value,
}

#[derive(Deserialize)]
struct RawFeature {
    #[serde(default)]
    id: Option<serde_json::Value>,
    geometry: Option<RawGeometry>,
}

#[derive(Deserialize)]
struct RawFeatureCollection {
    #[serde(default)]
    features: Vec<RawFeature>,
}

/// Parse the drawing tool's `FeatureCollection` (the `draw.getAll()` shape).
///
/// Only invalid JSON, or a document without a feature array, is an error.
/// Features with no geometry are dropped.
pub fn parse_feature_collection(json: &str) -> MeasureResult<Vec<DrawnFeature>> {
    let collection: RawFeatureCollection =
        serde_json::from_str(json).map_err(|e| MeasureError::Parse(e.to_string()))?;

    Ok(collection
        .features
        .into_iter()
        .filter_map(|raw| {
            let geometry = raw.geometry?;
            let id = raw.id.map(|id| match id {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            });
            Some(DrawnFeature {
                id,
                geometry: DrawnGeometry::from_parts(&geometry.type_name, geometry.coordinates),
            })
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    kind: &'static str,
    pub coordinates: Coordinate,
}

/// The single text property a label carries.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LabelProperties {
    Distance {
        #[serde(rename = "distanceLabel")]
        distance_label: String,
    },
    Area {
        #[serde(rename = "areaLabel")]
        area_label: String,
    },
}

/// A synthetic Point feature used only for on-map annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelFeature {
    #[serde(rename = "type")]
    kind: &'static str,
    pub geometry: PointGeometry,
    pub properties: LabelProperties,
}

impl LabelFeature {
    fn at(position: Coordinate, properties: LabelProperties) -> Self {
        Self {
            kind: "Feature",
            geometry: PointGeometry {
                kind: "Point",
                coordinates: position,
            },
            properties,
        }
    }

    pub fn distance(position: Coordinate, text: impl Into<String>) -> Self {
        Self::at(
            position,
            LabelProperties::Distance {
                distance_label: text.into(),
            },
        )
    }

    pub fn area(position: Coordinate, text: impl Into<String>) -> Self {
        Self::at(
            position,
            LabelProperties::Area {
                area_label: text.into(),
            },
        )
    }

    pub fn position(&self) -> Coordinate {
        self.geometry.coordinates
    }

    pub fn text(&self) -> &str {
        match &self.properties {
            LabelProperties::Distance { distance_label } => distance_label,
            LabelProperties::Area { area_label } => area_label,
        }
    }
}

/// A GeoJSON `FeatureCollection` of labels, replaced wholesale on every recompute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    pub features: Vec<LabelFeature>,
}

impl Default for LabelCollection {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl LabelCollection {
    pub fn new(features: Vec<LabelFeature>) -> Self {
        Self {
            kind: "FeatureCollection",
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn push(&mut self, label: LabelFeature) {
        self.features.push(label);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub point_count: usize,
    pub line_count: usize,
    pub polygon_count: usize,
    pub total_distance_km: f64,
    pub total_area_m2: f64,
}

impl Metrics {
    pub fn feature_count(&self) -> usize {
        self.point_count + self.line_count + self.polygon_count
    }
}

/// A feature whose contribution was skipped in one recompute.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureFailure {
    pub feature_index: usize,
    pub feature_id: Option<String>,
    pub reason: String,
    #[serde(skip)]
    pub error: MeasureError,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementReport {
    pub metrics: Metrics,
    pub segment_labels: LabelCollection,
    pub polygon_labels: LabelCollection,
    pub failures: Vec<FeatureFailure>,
}
