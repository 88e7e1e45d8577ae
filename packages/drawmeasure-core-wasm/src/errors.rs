use thiserror::Error;

/// Everything that can go wrong while measuring a snapshot or pushing its labels.
///
/// Geometry variants are recoverable: the engine records them against the
/// offending feature and keeps going with the rest of the snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeasureError {
    #[error("position needs at least 2 ordinates, got {0}")]
    ShortPosition(usize),

    #[error("coordinate ({lon}, {lat}) is not a finite longitude/latitude pair")]
    InvalidCoordinate { lon: f64, lat: f64 },

    #[error("malformed {kind} geometry: {reason}")]
    MalformedGeometry { kind: String, reason: String },

    #[error("polygon has no rings")]
    EmptyPolygon,

    #[error("exterior ring has {distinct} distinct vertices, need at least 3")]
    DegenerateRing { distinct: usize },

    #[error("exterior ring intersects itself")]
    SelfIntersecting,

    #[error("segment endpoints are antipodal, midpoint is undefined")]
    UndefinedMidpoint,

    #[error("polygon area is zero or not finite ({0} m²)")]
    ZeroArea(f64),

    #[error("center of mass could not be computed")]
    NoCenterOfMass,

    #[error("failed to parse feature collection: {0}")]
    Parse(String),

    #[error("failed to parse config: {0}")]
    Config(String),

    #[error("unknown draw event '{0}'")]
    UnknownEvent(String),

    #[error("label source '{source_id}' rejected update: {reason}")]
    Sink { source_id: String, reason: String },

    #[error("recompute {0} was superseded by a newer one")]
    Superseded(u64),
}

pub type MeasureResult<T> = Result<T, MeasureError>;
