//! Spatial SQL dialects.
//!
//! MySQL and MariaDB disagree on axis order and ring orientation for SRID 4326
//! geometries, and only MySQL can buffer a geographic point natively. All of
//! those differences live behind [`SpatialDialect`]; filters never branch on
//! the backend themselves.

use std::fmt;

use crate::config::DialectKind;
use crate::types::GeoPoint;

use super::fragment::{SqlFragment, SqlParam};

/// Spatial reference system of every stored geometry.
pub const SRID: u32 = 4326;

/// Coordinate order inside WKT text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrder {
    /// `lat lng`
    LatLng,
    /// `lng lat`
    LngLat,
}

/// Orientation of polygon rings, seen with longitude on the x axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winding {
    /// Counter-clockwise rings.
    CounterClockwise,
    /// Clockwise rings.
    Clockwise,
}

/// Backend-specific spatial SQL.
pub trait SpatialDialect: fmt::Debug + Send + Sync {
    /// Dialect identifier.
    fn kind(&self) -> DialectKind;

    /// Coordinate order used in WKT.
    fn axis_order(&self) -> AxisOrder;

    /// Required polygon ring orientation.
    fn winding(&self) -> Winding;

    /// Native geographic buffer around a point, if the backend supports it.
    fn buffer(&self, center: GeoPoint, meters: f64) -> Option<SqlFragment>;

    /// Formats one coordinate pair.
    fn coordinate(&self, point: GeoPoint) -> String {
        match self.axis_order() {
            AxisOrder::LatLng => format!("{} {}", point.lat, point.lng),
            AxisOrder::LngLat => format!("{} {}", point.lng, point.lat),
        }
    }

    /// WKT for a point.
    fn point_wkt(&self, point: GeoPoint) -> String {
        format!("POINT({})", self.coordinate(point))
    }

    /// Returns the closed ring of a rectangle in this dialect's orientation.
    fn rectangle_ring(&self, sw: GeoPoint, ne: GeoPoint) -> Vec<GeoPoint> {
        let se = GeoPoint::new(sw.lat, ne.lng);
        let nw = GeoPoint::new(ne.lat, sw.lng);
        self.orient_ring(vec![sw, se, ne, nw, sw])
    }

    /// Closes a ring and reverses it if its orientation is wrong.
    fn orient_ring(&self, mut ring: Vec<GeoPoint>) -> Vec<GeoPoint> {
        if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
            if first != last {
                ring.push(first);
            }
        }
        let counter_clockwise = signed_area(&ring) > 0.0;
        let wanted = self.winding() == Winding::CounterClockwise;
        if counter_clockwise != wanted {
            ring.reverse();
        }
        ring
    }

    /// WKT for a single polygon ring.
    fn polygon_wkt(&self, ring: &[GeoPoint]) -> String {
        format!("POLYGON({})", self.ring_wkt(ring))
    }

    /// WKT for several polygon rings.
    fn multipolygon_wkt(&self, rings: &[Vec<GeoPoint>]) -> String {
        let polygons: Vec<String> = rings
            .iter()
            .map(|ring| format!("({})", self.ring_wkt(ring)))
            .collect();
        format!("MULTIPOLYGON({})", polygons.join(","))
    }

    /// Formats a ring as `(x y,x y,...)`.
    fn ring_wkt(&self, ring: &[GeoPoint]) -> String {
        let coordinates: Vec<String> = ring.iter().map(|p| self.coordinate(*p)).collect();
        format!("({})", coordinates.join(","))
    }

    /// Geometry constructor bound to WKT text.
    fn geometry(&self, wkt: String) -> SqlFragment {
        SqlFragment::with_params(
            format!("ST_GeomFromText(?, {})", SRID),
            vec![SqlParam::string(wkt)],
        )
    }

    /// Point value for an index row.
    fn point_value(&self, point: GeoPoint) -> SqlFragment {
        self.geometry(self.point_wkt(point))
    }

    /// Containment predicate. Rectangles may use the cheaper bounding
    /// rectangle test; anything else needs an exact test.
    fn contains(&self, geometry: SqlFragment, column: &str, exact: bool) -> SqlFragment {
        let function = if exact { "ST_Contains" } else { "MBRContains" };
        SqlFragment::with_params(
            format!("{}({}, {})", function, geometry.sql, column),
            geometry.params,
        )
    }

    /// Spherical distance in meters between a point column and a point.
    fn distance(&self, column: &str, point: GeoPoint) -> SqlFragment {
        let target = self.point_value(point);
        SqlFragment::with_params(
            format!("ST_Distance_Sphere({}, {})", column, target.sql),
            target.params,
        )
    }
}

/// Shoelace area with longitude as x; positive for counter-clockwise rings.
fn signed_area(ring: &[GeoPoint]) -> f64 {
    ring.windows(2)
        .map(|pair| pair[0].lng * pair[1].lat - pair[1].lng * pair[0].lat)
        .sum::<f64>()
        / 2.0
}

/// MySQL 8: latitude first, counter-clockwise rings, native geographic buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl SpatialDialect for MySqlDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Mysql
    }

    fn axis_order(&self) -> AxisOrder {
        AxisOrder::LatLng
    }

    fn winding(&self) -> Winding {
        Winding::CounterClockwise
    }

    fn buffer(&self, center: GeoPoint, meters: f64) -> Option<SqlFragment> {
        let point = self.point_value(center);
        let mut params = point.params;
        params.push(SqlParam::float(meters));
        Some(SqlFragment::with_params(
            format!("ST_Buffer({}, ?)", point.sql),
            params,
        ))
    }
}

/// MariaDB: longitude first, clockwise rings, no geographic buffering.
#[derive(Debug, Clone, Copy, Default)]
pub struct MariaDbDialect;

impl SpatialDialect for MariaDbDialect {
    fn kind(&self) -> DialectKind {
        DialectKind::Mariadb
    }

    fn axis_order(&self) -> AxisOrder {
        AxisOrder::LngLat
    }

    fn winding(&self) -> Winding {
        Winding::Clockwise
    }

    fn buffer(&self, _center: GeoPoint, _meters: f64) -> Option<SqlFragment> {
        None
    }
}

static MYSQL: MySqlDialect = MySqlDialect;
static MARIADB: MariaDbDialect = MariaDbDialect;

/// Returns the dialect implementation for a configured backend.
pub fn dialect_for(kind: DialectKind) -> &'static dyn SpatialDialect {
    match kind {
        DialectKind::Mysql => &MYSQL,
        DialectKind::Mariadb => &MARIADB,
    }
}
