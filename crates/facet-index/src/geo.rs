//! Geospatial decomposition.
//!
//! Turns bounding boxes and radius requests into simple polygons the spatial
//! predicates of the backend can evaluate. Bounding boxes that cross the
//! antimeridian are walked in fixed longitude slices; the slice straddling
//! ±180° is emitted as two polygons.

use tracing::{debug, warn};

use crate::config::DistanceUnit;
use crate::sql::{SpatialDialect, SqlFragment};
use crate::types::GeoPoint;

/// Kilometres per statute mile.
pub const KM_PER_MILE: f64 = 1.609344;

/// Mean earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

const EPSILON: f64 = 1e-9;

/// A longitude/latitude aligned rectangle that does not cross ±180°.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRect {
    /// South-west corner.
    pub sw: GeoPoint,
    /// North-east corner.
    pub ne: GeoPoint,
}

impl GeoRect {
    /// Longitude width in degrees.
    pub fn width(&self) -> f64 {
        self.ne.lng - self.sw.lng
    }
}

/// A geometry ready for a containment predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchGeometry {
    /// Geometry expression with bound WKT.
    pub geometry: SqlFragment,
    /// Whether an exact containment test is required.
    pub exact: bool,
}

/// Maps a longitude from (-360, 360] into [-180, 180].
///
/// Map widgets report longitudes past ±180 after the user pans across the
/// antimeridian. Values that are still out of range after one ±360 shift are
/// returned unchanged so validation rejects them.
pub fn normalize_longitude(lng: f64) -> f64 {
    if lng > 180.0 && lng <= 360.0 {
        lng - 360.0
    } else if lng > -360.0 && lng < -180.0 {
        lng + 360.0
    } else {
        lng
    }
}

/// Converts a radius to meters, rounded to the nearest centimetre.
pub fn radius_in_meters(radius: f64, units: DistanceUnit) -> f64 {
    let km = match units {
        DistanceUnit::Km => radius,
        DistanceUnit::Mi => radius * KM_PER_MILE,
    };
    (km * 1000.0 * 100.0).round() / 100.0
}

/// Longitude span from `sw_lng` eastwards to `ne_lng`, in degrees.
pub fn longitude_span(sw_lng: f64, ne_lng: f64) -> f64 {
    if ne_lng >= sw_lng {
        ne_lng - sw_lng
    } else {
        360.0 - (sw_lng - ne_lng)
    }
}

/// Splits a bounding box into rectangles that never cross the antimeridian.
///
/// A box that does not cross ±180° is returned as one rectangle. A crossing box
/// is walked eastwards in slices of at most `max_span` degrees; the slice that
/// straddles ±180° becomes two rectangles. At most `max_polygons` rectangles
/// are returned.
pub fn split_bounding_box(
    sw: GeoPoint,
    ne: GeoPoint,
    max_span: f64,
    max_polygons: usize,
) -> Vec<GeoRect> {
    let south = sw.lat.min(ne.lat);
    let north = sw.lat.max(ne.lat);
    let rect = |west: f64, east: f64| GeoRect {
        sw: GeoPoint::new(south, west),
        ne: GeoPoint::new(north, east),
    };

    if sw.lng <= ne.lng {
        return vec![rect(sw.lng, ne.lng)];
    }

    let max_span = if max_span > EPSILON { max_span } else { 360.0 };
    let max_polygons = max_polygons.max(1);
    let mut rects = Vec::new();
    let mut west = sw.lng;
    let mut remaining = longitude_span(sw.lng, ne.lng);

    while remaining > EPSILON && rects.len() < max_polygons {
        let width = remaining.min(max_span);
        let east = west + width;
        if east > 180.0 {
            if 180.0 - west > EPSILON {
                rects.push(rect(west, 180.0));
            }
            let wrapped = east - 360.0;
            if wrapped + 180.0 > EPSILON {
                rects.push(rect(-180.0, wrapped));
            }
            west = wrapped;
        } else {
            rects.push(rect(west, east));
            west = east;
        }
        remaining -= width;
    }

    if rects.len() > max_polygons || remaining > EPSILON {
        warn!(
            polygons = rects.len(),
            max_polygons, "bounding box decomposition capped"
        );
        rects.truncate(max_polygons);
    }

    debug!(polygons = rects.len(), "split bounding box across antimeridian");
    rects
}

/// Center of a bounding box, following the box eastwards across ±180°.
pub fn bounding_box_center(sw: GeoPoint, ne: GeoPoint) -> GeoPoint {
    let span = longitude_span(sw.lng, ne.lng);
    let lng = normalize_longitude(sw.lng + span / 2.0);
    GeoPoint::new((sw.lat + ne.lat) / 2.0, lng)
}

/// Point reached by travelling `meters` from `origin` along `bearing` radians.
pub fn destination(origin: GeoPoint, meters: f64, bearing: f64) -> GeoPoint {
    let delta = meters / EARTH_RADIUS_METERS;
    let phi1 = origin.lat.to_radians();
    let lambda1 = origin.lng.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * bearing.cos()).asin();
    let lambda2 = lambda1
        + (bearing.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    GeoPoint::new(phi2.to_degrees(), lambda2.to_degrees())
}

/// Approximates a geographic circle with a closed polygon ring.
///
/// Vertices past ±180° are clamped to the antimeridian, so circles that cross
/// it are cut off there.
pub fn buffer_ring(center: GeoPoint, meters: f64, segments: usize) -> Vec<GeoPoint> {
    let segments = segments.max(8);
    let mut ring: Vec<GeoPoint> = (0..segments)
        .map(|i| {
            let bearing = std::f64::consts::TAU * i as f64 / segments as f64;
            let point = destination(center, meters, bearing);
            GeoPoint::new(point.lat.clamp(-90.0, 90.0), point.lng.clamp(-180.0, 180.0))
        })
        .collect();
    if let Some(first) = ring.first().copied() {
        ring.push(first);
    }
    ring
}

/// Builds the containment geometry for a bounding box request.
pub fn area_geometry(dialect: &dyn SpatialDialect, rects: &[GeoRect]) -> Option<SearchGeometry> {
    match rects {
        [] => None,
        [single] => {
            let ring = dialect.rectangle_ring(single.sw, single.ne);
            Some(SearchGeometry {
                geometry: dialect.geometry(dialect.polygon_wkt(&ring)),
                exact: false,
            })
        }
        many => {
            let rings: Vec<Vec<GeoPoint>> = many
                .iter()
                .map(|r| dialect.rectangle_ring(r.sw, r.ne))
                .collect();
            Some(SearchGeometry {
                geometry: dialect.geometry(dialect.multipolygon_wkt(&rings)),
                exact: true,
            })
        }
    }
}

/// Builds the containment geometry for a radius request.
///
/// Uses the backend's native buffer when available and a precomputed polygon
/// otherwise.
pub fn radius_geometry(
    dialect: &dyn SpatialDialect,
    center: GeoPoint,
    meters: f64,
    segments: usize,
) -> SearchGeometry {
    let geometry = match dialect.buffer(center, meters) {
        Some(buffer) => buffer,
        None => {
            let ring = dialect.orient_ring(buffer_ring(center, meters, segments));
            dialect.geometry(dialect.polygon_wkt(&ring))
        }
    };
    SearchGeometry {
        geometry,
        exact: true,
    }
}

/// Great-circle distance between two points in meters.
pub fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}
