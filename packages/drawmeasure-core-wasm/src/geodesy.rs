//! Thin adapter over the `geo` crate's geodesic measures.
//!
//! Lengths and midpoints use the haversine formula on a sphere of mean Earth
//! radius. Areas use Karney's algorithm on the WGS84 ellipsoid. Centers of
//! mass are area-weighted centroids taken in longitude/latitude degrees.

use geo::orient::Direction;
use geo::{Centroid, Distance, GeodesicArea, Haversine, InterpolatePoint, Intersects, Orient};
use geo_types::{Line, LineString, Point, Polygon};

use crate::errors::{MeasureError, MeasureResult};
use crate::models::Coordinate;

const METERS_PER_KM: f64 = 1000.0;
const MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Segments whose central angle is this close to π have no unique great circle.
const ANTIPODAL_EPSILON_RAD: f64 = 1e-9;

/// Anything at or below this is treated as a collapsed ring.
const MIN_AREA_M2: f64 = 1e-3;

/// Great-circle distance between two positions, in kilometers.
pub fn segment_distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let (a, b): (Point<f64>, Point<f64>) = (a.into(), b.into());
    Haversine::distance(a, b) / METERS_PER_KM
}

/// Point halfway along the great circle from `a` to `b`.
/// Undefined for antipodal endpoints.
pub fn segment_midpoint(a: Coordinate, b: Coordinate) -> MeasureResult<Coordinate> {
    let (start, end): (Point<f64>, Point<f64>) = (a.into(), b.into());
    let central_angle = Haversine::distance(start, end) / MEAN_EARTH_RADIUS_M;
    if std::f64::consts::PI - central_angle < ANTIPODAL_EPSILON_RAD {
        return Err(MeasureError::UndefinedMidpoint);
    }

    Some(Coordinate::from(Haversine::point_at_ratio_between(start, end, 0.5)))
        .filter(Coordinate::is_valid)
        .ok_or(MeasureError::UndefinedMidpoint)
}

fn ring(coords: &[Coordinate]) -> LineString<f64> {
    LineString::new(coords.iter().map(|&c| c.into()).collect())
}

// Ring vertices without consecutive repeats and without the closing vertex.
fn open_ring(coords: &[Coordinate]) -> Vec<Coordinate> {
    let mut vertices: Vec<Coordinate> = Vec::with_capacity(coords.len());
    for c in coords {
        if vertices.last() != Some(c) {
            vertices.push(*c);
        }
    }
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    vertices
}

/// Number of distinct vertices in a ring, ignoring consecutive repeats and
/// the closing vertex.
pub fn distinct_vertex_count(coords: &[Coordinate]) -> usize {
    open_ring(coords).len()
}

/// True if any two non-adjacent edges of the closed ring touch or cross.
pub fn ring_self_intersects(coords: &[Coordinate]) -> bool {
    let vertices = open_ring(coords);
    let n = vertices.len();
    if n < 4 {
        return false;
    }

    let edges: Vec<Line<f64>> = (0..n)
        .map(|i| Line::new(vertices[i], vertices[(i + 1) % n]))
        .collect();

    for i in 0..n {
        for j in (i + 2)..n {
            // first and last edge share the closing vertex
            if i == 0 && j == n - 1 {
                continue;
            }
            if edges[i].intersects(&edges[j]) {
                return true;
            }
        }
    }
    false
}

/// Checks rings and builds the `geo` polygon (rings are closed on the way).
pub fn build_polygon(rings: &[Vec<Coordinate>]) -> MeasureResult<Polygon<f64>> {
    let (exterior, holes) = rings.split_first().ok_or(MeasureError::EmptyPolygon)?;

    for c in rings.iter().flatten() {
        c.validate()?;
    }

    let distinct = distinct_vertex_count(exterior);
    if distinct < 3 {
        return Err(MeasureError::DegenerateRing { distinct });
    }
    if ring_self_intersects(exterior) {
        return Err(MeasureError::SelfIntersecting);
    }

    Ok(Polygon::new(
        ring(exterior),
        holes.iter().map(|h| ring(h)).collect(),
    ))
}

/// Geodesic surface area in square meters, exterior minus holes.
///
/// Rings are re-wound first (exterior counter-clockwise, holes clockwise);
/// the drawing tool does not guarantee either winding.
pub fn polygon_area_m2(polygon: &Polygon<f64>) -> MeasureResult<f64> {
    let area = polygon
        .orient(Direction::Default)
        .geodesic_area_signed()
        .abs();
    if area.is_finite() && area > MIN_AREA_M2 {
        Ok(area)
    } else {
        Err(MeasureError::ZeroArea(area))
    }
}

pub fn polygon_center_of_mass(polygon: &Polygon<f64>) -> MeasureResult<Coordinate> {
    polygon
        .centroid()
        .map(Coordinate::from)
        .filter(Coordinate::is_valid)
        .ok_or(MeasureError::NoCenterOfMass)
}
