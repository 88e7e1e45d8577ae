//! The measurement engine: snapshot in, counts, totals and labels out.
//!
//! `compute` is a pure function of its input. Every call starts from zero;
//! nothing is carried over from earlier snapshots. A feature that cannot be
//! measured is reported in `MeasurementReport::failures` and skipped, and the
//! rest of the snapshot is measured as usual.

use crate::config::MeasureConfig;
use crate::console_warn;
use crate::errors::{MeasureError, MeasureResult};
use crate::geodesy;
use crate::models::{
    Coordinate, DrawnFeature, DrawnGeometry, FeatureFailure, GeometryKind, LabelFeature,
    MeasurementReport,
};
use crate::units::{format_area_km2, format_distance_km};

struct LineMeasure {
    length_km: f64,
    labels: Vec<LabelFeature>,
}

struct PolygonMeasure {
    area_m2: f64,
    label: LabelFeature,
}

/// Length of a line plus one label per segment at the segment's midpoint.
/// Fewer than two vertices measures as zero with no labels.
fn measure_line(coords: &[Coordinate], decimals: usize) -> MeasureResult<LineMeasure> {
    for c in coords {
        c.validate()?;
    }

    let mut length_km = 0.0;
    let mut labels = Vec::with_capacity(coords.len().saturating_sub(1));
    for pair in coords.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let segment_km = geodesy::segment_distance_km(a, b);
        length_km += segment_km;
        labels.push(LabelFeature::distance(
            geodesy::segment_midpoint(a, b)?,
            format_distance_km(segment_km, decimals),
        ));
    }

    Ok(LineMeasure { length_km, labels })
}

fn measure_polygon(rings: &[Vec<Coordinate>], decimals: usize) -> MeasureResult<PolygonMeasure> {
    let polygon = geodesy::build_polygon(rings)?;
    let area_m2 = geodesy::polygon_area_m2(&polygon)?;
    let center = geodesy::polygon_center_of_mass(&polygon)?;

    Ok(PolygonMeasure {
        area_m2,
        label: LabelFeature::area(center, format_area_km2(area_m2, decimals)),
    })
}

pub fn compute(features: &[DrawnFeature], config: &MeasureConfig) -> MeasurementReport {
    let mut report = MeasurementReport::default();
    let decimals = config.decimals;

    for (index, feature) in features.iter().enumerate() {
        match feature.geometry.kind() {
            Some(GeometryKind::Point) => report.metrics.point_count += 1,
            Some(GeometryKind::LineString) => report.metrics.line_count += 1,
            Some(GeometryKind::Polygon) => report.metrics.polygon_count += 1,
            None => continue,
        }

        let outcome = match &feature.geometry {
            DrawnGeometry::Point(c) => c.validate(),
            DrawnGeometry::LineString(coords) => {
                measure_line(coords, decimals).map(|line| {
                    report.metrics.total_distance_km += line.length_km;
                    report.segment_labels.features.extend(line.labels);
                })
            }
            DrawnGeometry::Polygon(rings) => measure_polygon(rings, decimals).map(|polygon| {
                report.metrics.total_area_m2 += polygon.area_m2;
                report.polygon_labels.push(polygon.label);
            }),
            DrawnGeometry::Malformed { kind, reason } => Err(MeasureError::MalformedGeometry {
                kind: kind.type_name().to_string(),
                reason: reason.clone(),
            }),
            DrawnGeometry::Unsupported(_) => Ok(()),
        };

        if let Err(error) = outcome {
            console_warn!(
                "Skipping feature {} ({}): {}",
                index,
                feature.id.as_deref().unwrap_or("no id"),
                error
            );
            report.failures.push(FeatureFailure {
                feature_index: index,
                feature_id: feature.id.clone(),
                reason: error.to_string(),
                error,
            });
        }
    }

    report
}
