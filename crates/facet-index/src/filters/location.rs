//! Location filter.
//!
//! Wire grammar, tried in this order:
//!
//! - area: `<address>;<swlat>,<swlng>..<nelat>,<nelng>`
//! - radius: `<address>;<lat>,<lng>,<radius>`
//!
//! Longitudes in (-360, 360] are shifted into [-180, 180]. Anything out of
//! range after that makes the whole value absent. Radii are clamped to the
//! configured maximum.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DistanceUnit;
use crate::geo::{
    area_geometry, bounding_box_center, normalize_longitude, radius_geometry, radius_in_meters,
    split_bounding_box,
};
use crate::query::{Direction, IndexQuery};
use crate::schema::{ColumnDef, ColumnType, IndexSchemaBuilder, IndexValues, KeyDef, KeyKind};
use crate::types::{
    resolve_path, ContentItem, FieldValue, GeoArea, GeoPoint, GeoRadius, ParsedValue, RawValue,
};

use super::controls::{common_controls, ControlSpec};
use super::{Filter, FilterContext};

const NUMBER: &str = r"\s*([-+]?\d+(?:\.\d+)?)\s*";

fn area_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(&format!(r"^(.*);{n},{n}\.\.{n},{n}$", n = NUMBER)).ok()
        })
        .as_ref()
}

fn radius_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(&format!(r"^(.*);{n},{n},{n}$", n = NUMBER)).ok())
        .as_ref()
}

fn number(captures: &Captures<'_>, index: usize) -> Option<f64> {
    captures
        .get(index)?
        .as_str()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

fn point(lat: f64, lng: f64) -> Option<GeoPoint> {
    let point = GeoPoint::new(lat, normalize_longitude(lng));
    point.is_valid().then_some(point)
}

/// Area and radius location filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationFilter {
    /// Filter key.
    pub key: String,
    /// Display label.
    #[serde(default)]
    pub label: String,
    /// Default wire value.
    #[serde(default)]
    pub default: Option<String>,
    /// Source location field path.
    #[serde(default)]
    pub source: String,
    /// Radius units; falls back to the configured units.
    #[serde(default)]
    pub units: Option<DistanceUnit>,
    /// Radius cap; falls back to the configured maximum.
    #[serde(default)]
    pub max_radius: Option<f64>,
}

impl LocationFilter {
    /// Creates a location filter over a source field.
    pub fn new(key: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: String::new(),
            default: None,
            source: source.into(),
            units: None,
            max_radius: None,
        }
    }

    fn distance_name(&self) -> String {
        format!("{}_distance", self.key)
    }

    fn units(&self, ctx: &FilterContext<'_>) -> DistanceUnit {
        self.units.unwrap_or(ctx.config.location.units)
    }

    fn parse_area(&self, text: &str) -> Option<Option<ParsedValue>> {
        let captures = area_pattern()?.captures(text)?;
        let parsed = (|| {
            let sw = point(number(&captures, 2)?, number(&captures, 3)?)?;
            let ne = point(number(&captures, 4)?, number(&captures, 5)?)?;
            if sw.lat > ne.lat {
                return None;
            }
            Some(ParsedValue::Area(GeoArea {
                address: captures[1].trim().to_string(),
                sw,
                ne,
            }))
        })();
        Some(parsed)
    }

    fn parse_radius(&self, text: &str, ctx: &FilterContext<'_>) -> Option<ParsedValue> {
        let captures = radius_pattern()?.captures(text)?;
        let center = point(number(&captures, 2)?, number(&captures, 3)?)?;
        let radius = number(&captures, 4)?;
        if radius <= 0.0 {
            return None;
        }
        let max_radius = self.max_radius.unwrap_or(ctx.config.location.max_radius);
        Some(ParsedValue::Radius(GeoRadius {
            address: captures[1].trim().to_string(),
            center,
            radius: radius.min(max_radius),
        }))
    }

    /// Reference point for distance ordering.
    pub fn reference_point(value: &ParsedValue) -> Option<GeoPoint> {
        match value {
            ParsedValue::Radius(radius) => Some(radius.center),
            ParsedValue::Area(area) => Some(bounding_box_center(area.sw, area.ne)),
            _ => None,
        }
    }
}

impl Filter for LocationFilter {
    fn key(&self) -> &str {
        &self.key
    }

    fn filter_type(&self) -> &'static str {
        "location"
    }

    fn setup(&self, schema: &mut IndexSchemaBuilder) {
        schema.add_column(ColumnDef::new(self.column(), ColumnType::Point).not_null());
        schema.add_key(KeyDef::on(KeyKind::Spatial, self.column()));
    }

    fn index(&self, item: &dyn ContentItem, ctx: &FilterContext<'_>) -> IndexValues {
        let point = resolve_path(item, &self.source)
            .into_iter()
            .find_map(|value| match value {
                FieldValue::Location(location) => location.point.filter(GeoPoint::is_valid),
                _ => None,
            })
            .unwrap_or_default();

        let mut values = IndexValues::new();
        values.insert(self.column(), ctx.dialect.point_value(point));
        values
    }

    fn parse_value(&self, raw: &RawValue, ctx: &FilterContext<'_>) -> Option<ParsedValue> {
        let text = raw.as_str()?.trim();
        match self.parse_area(text) {
            Some(area) => area,
            None => self.parse_radius(text, ctx),
        }
    }

    fn apply(&self, query: &mut IndexQuery, value: &ParsedValue, ctx: &FilterContext<'_>) {
        let location = &ctx.config.location;
        let geometry = match value {
            ParsedValue::Area(area) => {
                let rects = split_bounding_box(
                    area.sw,
                    area.ne,
                    location.max_polygon_span,
                    location.max_polygons,
                );
                area_geometry(ctx.dialect, &rects)
            }
            ParsedValue::Radius(radius) => {
                let meters = radius_in_meters(radius.radius, self.units(ctx));
                debug!(filter = %self.key, meters, "radius search");
                Some(radius_geometry(
                    ctx.dialect,
                    radius.center,
                    meters,
                    location.buffer_segments,
                ))
            }
            _ => None,
        };

        if let Some(geometry) = geometry {
            query.filter(ctx.dialect.contains(
                geometry.geometry,
                &IndexQuery::column(&self.column()),
                geometry.exact,
            ));
        }
    }

    fn order(&self, query: &mut IndexQuery, raw: Option<&RawValue>, ctx: &FilterContext<'_>) -> bool {
        let Some(reference) = raw
            .and_then(|raw| self.parse_value(raw, ctx))
            .as_ref()
            .and_then(Self::reference_point)
        else {
            return false;
        };
        let name = self.distance_name();
        query.select(
            name.clone(),
            ctx.dialect
                .distance(&IndexQuery::column(&self.column()), reference),
        );
        query.order_by_select(&name, Direction::Asc);
        true
    }

    fn controls(&self) -> Vec<ControlSpec> {
        let mut controls = common_controls(&self.label);
        controls.push(ControlSpec::text("source", "Location field"));
        controls.push(ControlSpec::select("units", "Units", &[("km", "Kilometers"), ("mi", "Miles")]));
        controls.push(ControlSpec::number("max_radius", "Maximum radius"));
        controls
    }

    fn default_value(&self) -> Option<String> {
        self.default.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DialectKind, SearchConfig};
    use crate::filters::test_support::{context, term_cache};
    use crate::sql::SqlParam;
    use crate::types::{Location, StaticItem};

    fn parse(filter: &LocationFilter, config: &SearchConfig, text: &str) -> Option<ParsedValue> {
        let terms = term_cache();
        let ctx = context(config, &terms);
        filter.parse_value(&RawValue::single(text), &ctx)
    }

    #[test]
    fn test_area_round_trip() {
        let filter = LocationFilter::new("near", "address");
        let config = SearchConfig::default();
        let wire = "NYC;40.1,-74.1..40.9,-73.1";
        let value = parse(&filter, &config, wire).unwrap();
        assert_eq!(
            value,
            ParsedValue::Area(GeoArea {
                address: "NYC".to_string(),
                sw: GeoPoint::new(40.1, -74.1),
                ne: GeoPoint::new(40.9, -73.1),
            })
        );
        assert_eq!(value.to_wire(), wire);
    }

    #[test]
    fn test_radius_round_trip_and_clamp() {
        let filter = LocationFilter::new("near", "address");
        let config = SearchConfig::default();
        let value = parse(&filter, &config, "Paris;48.8566,2.3522,10").unwrap();
        assert_eq!(value.to_wire(), "Paris;48.8566,2.3522,10");

        match parse(&filter, &config, "Paris;48.8566,2.3522,9000").unwrap() {
            ParsedValue::Radius(radius) => assert_eq!(radius.radius, 500.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_longitude_normalization() {
        let filter = LocationFilter::new("near", "address");
        let config = SearchConfig::default();
        match parse(&filter, &config, "Fiji;-20,170..-10,190").unwrap() {
            ParsedValue::Area(area) => assert_eq!(area.ne.lng, -170.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_malformed_values_are_absent() {
        let filter = LocationFilter::new("near", "address");
        let config = SearchConfig::default();
        for text in [
            "",
            "NYC",
            "NYC;40.1,-74.1..40.9",
            "NYC;95,-74.1..96,-73.1",
            "NYC;40.1,-400..40.9,-73.1",
            "NYC;41,-74.1..40,-73.1",
            "Paris;48.8566,2.3522,0",
            "Paris;48.8566,2.3522,-5",
            "Paris;48.8566,abc,10",
        ] {
            assert_eq!(parse(&filter, &config, text), None, "input {:?}", text);
        }
    }

    #[test]
    fn test_index_point_per_dialect() {
        let item = StaticItem::new(1).with_field(
            "address",
            FieldValue::Location(Location {
                address: "NYC".to_string(),
                point: Some(GeoPoint::new(40.7, -74.0)),
            }),
        );
        let filter = LocationFilter::new("near", "address");
        let terms = term_cache();

        let config = SearchConfig::default();
        let values = filter.index(&item, &context(&config, &terms));
        assert_eq!(values["filter_near"].params, vec![SqlParam::string("POINT(40.7 -74)")]);

        let config = SearchConfig::default().with_dialect(DialectKind::Mariadb);
        let values = filter.index(&item, &context(&config, &terms));
        assert_eq!(values["filter_near"].params, vec![SqlParam::string("POINT(-74 40.7)")]);

        let values = filter.index(&StaticItem::new(2), &context(&config, &terms));
        assert_eq!(values["filter_near"].params, vec![SqlParam::string("POINT(0 0)")]);
    }

    #[test]
    fn test_area_query_single_polygon() {
        let filter = LocationFilter::new("near", "address");
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);

        let mut query = IndexQuery::new("facets_place");
        filter.query(&mut query, Some(&RawValue::single("NYC;40.1,-74.1..40.9,-73.1")), &ctx);
        let compiled = query.compile();
        assert!(compiled
            .statement
            .sql
            .contains("MBRContains(ST_GeomFromText(?, 4326), `idx`.`filter_near`)"));
    }

    #[test]
    fn test_area_query_across_antimeridian() {
        let filter = LocationFilter::new("near", "address");
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);

        let mut query = IndexQuery::new("facets_place");
        filter.query(&mut query, Some(&RawValue::single("Fiji;-20,170..-10,-170")), &ctx);
        let compiled = query.compile();
        assert!(compiled.statement.sql.contains("ST_Contains(ST_GeomFromText(?, 4326)"));
        match &compiled.statement.params[0] {
            SqlParam::String(wkt) => assert!(wkt.starts_with("MULTIPOLYGON(")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_radius_meters_per_unit() {
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);
        let raw = RawValue::single("Paris;48.8566,2.3522,10");

        let filter = LocationFilter::new("near", "address");
        let mut query = IndexQuery::new("facets_place");
        filter.query(&mut query, Some(&raw), &ctx);
        let compiled = query.compile();
        assert!(compiled.statement.sql.contains("ST_Contains(ST_Buffer("));
        assert_eq!(compiled.statement.params[1], SqlParam::float(10000.0));

        let mut filter = LocationFilter::new("near", "address");
        filter.units = Some(DistanceUnit::Mi);
        let mut query = IndexQuery::new("facets_place");
        filter.query(&mut query, Some(&raw), &ctx);
        let compiled = query.compile();
        assert_eq!(compiled.statement.params[1], SqlParam::float(16093.44));
    }

    #[test]
    fn test_distance_order() {
        let filter = LocationFilter::new("near", "address");
        let config = SearchConfig::default();
        let terms = term_cache();
        let ctx = context(&config, &terms);

        let mut query = IndexQuery::new("facets_place");
        assert!(filter.order(&mut query, Some(&RawValue::single("Paris;48.8566,2.3522,10")), &ctx));
        let compiled = query.compile();
        assert!(compiled.statement.sql.contains(
            "ST_Distance_Sphere(`idx`.`filter_near`, ST_GeomFromText(?, 4326)) AS `near_distance`"
        ));
        assert!(compiled.statement.sql.contains("ORDER BY `near_distance` ASC"));
        assert_eq!(
            compiled.statement.params,
            vec![SqlParam::string("POINT(48.8566 2.3522)")]
        );
    }
}
