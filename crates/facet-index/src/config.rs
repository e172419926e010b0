//! Configuration for the facet index.
//!
//! Every field has a default so an empty JSON object is a valid
//! configuration:
//!
//! ```
//! use facet_index::config::SearchConfig;
//!
//! let config = SearchConfig::from_json(r#"{ "dialect": "mariadb", "utc_offset": "+02:00" }"#)
//!     .unwrap();
//! assert_eq!(config.keywords.min_word_length, 3);
//! assert_eq!(config.utc_offset.local_minus_utc(), 7200);
//! ```

use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Supported relational backend dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// MySQL 8 with geographic SRID 4326 support.
    #[default]
    Mysql,
    /// MariaDB (cartesian spatial functions, no geographic buffering).
    Mariadb,
}

/// Distance units for radius searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    /// Kilometres.
    #[default]
    Km,
    /// Statute miles.
    Mi,
}

/// Top-level search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Prefix of every index table; the content type name is appended.
    #[serde(default = "default_table_prefix")]
    pub table_prefix: String,

    /// Backend dialect.
    #[serde(default)]
    pub dialect: DialectKind,

    /// Site time zone as a fixed UTC offset.
    #[serde(with = "utc_offset_serde", default = "default_utc_offset")]
    pub utc_offset: FixedOffset,

    /// Keyword normalization settings.
    #[serde(default)]
    pub keywords: KeywordsConfig,

    /// Location search settings.
    #[serde(default)]
    pub location: LocationConfig,

    /// Term list cache settings.
    #[serde(default)]
    pub term_cache: TermCacheConfig,

    /// Satellite tables joined by specialized filters.
    #[serde(default)]
    pub tables: SatelliteTables,

    /// Default page size.
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Largest page size a request may ask for.
    #[serde(default = "default_max_per_page")]
    pub max_per_page: u32,
}

fn default_table_prefix() -> String {
    "facets_".to_string()
}

fn default_utc_offset() -> FixedOffset {
    Utc.fix()
}

fn default_per_page() -> u32 {
    12
}

fn default_max_per_page() -> u32 {
    100
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            table_prefix: default_table_prefix(),
            dialect: DialectKind::default(),
            utc_offset: default_utc_offset(),
            keywords: KeywordsConfig::default(),
            location: LocationConfig::default(),
            term_cache: TermCacheConfig::default(),
            tables: SatelliteTables::default(),
            per_page: default_per_page(),
            max_per_page: default_max_per_page(),
        }
    }
}

impl SearchConfig {
    /// Parses a configuration document.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Sets the dialect.
    pub fn with_dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    /// Sets the site UTC offset.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Name of the index table for a content type.
    pub fn index_table(&self, content_type: &str) -> String {
        format!("{}{}", self.table_prefix, content_type)
    }

    /// Name of a satellite table for a content type.
    pub fn satellite_table(&self, content_type: &str, suffix: &str) -> String {
        format!("{}{}_{}", self.table_prefix, content_type, suffix)
    }

    /// Clamps a requested page size.
    pub fn page_size(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.per_page)
            .clamp(1, self.max_per_page.max(1))
    }
}

/// Keyword normalization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsConfig {
    /// Query tokens shorter than this many characters are dropped.
    #[serde(default = "default_min_word_length")]
    pub min_word_length: usize,

    /// Submitted text is truncated to this many characters.
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,

    /// Query tokens dropped regardless of case.
    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,
}

fn default_min_word_length() -> usize {
    3
}

fn default_max_query_length() -> usize {
    150
}

fn default_stopwords() -> Vec<String> {
    // InnoDB default full-text stopword list.
    [
        "a", "about", "an", "are", "as", "at", "be", "by", "com", "de", "en", "for", "from",
        "how", "i", "in", "is", "it", "la", "of", "on", "or", "that", "the", "this", "to", "was",
        "what", "when", "where", "who", "will", "with", "und", "www",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            min_word_length: default_min_word_length(),
            max_query_length: default_max_query_length(),
            stopwords: default_stopwords(),
        }
    }
}

/// Location search settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Largest radius a request may use, in `units`.
    #[serde(default = "default_max_radius")]
    pub max_radius: f64,

    /// Units of submitted radius values.
    #[serde(default)]
    pub units: DistanceUnit,

    /// Upper bound on polygons produced for one bounding box.
    #[serde(default = "default_max_polygons")]
    pub max_polygons: usize,

    /// Widest longitude span of a single polygon slice, in degrees.
    #[serde(default = "default_max_polygon_span")]
    pub max_polygon_span: f64,

    /// Vertex count of client-side buffer polygons.
    #[serde(default = "default_buffer_segments")]
    pub buffer_segments: usize,
}

fn default_max_radius() -> f64 {
    500.0
}

fn default_max_polygons() -> usize {
    15
}

fn default_max_polygon_span() -> f64 {
    30.0
}

fn default_buffer_segments() -> usize {
    32
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            max_radius: default_max_radius(),
            units: DistanceUnit::default(),
            max_polygons: default_max_polygons(),
            max_polygon_span: default_max_polygon_span(),
            buffer_segments: default_buffer_segments(),
        }
    }
}

/// Term list cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermCacheConfig {
    /// How long a cached term list stays fresh.
    #[serde(with = "humantime_serde", default = "default_term_ttl")]
    pub ttl: Duration,
}

fn default_term_ttl() -> Duration {
    Duration::from_secs(60 * 60)
}

impl Default for TermCacheConfig {
    fn default() -> Self {
        Self {
            ttl: default_term_ttl(),
        }
    }
}

/// Names of auxiliary tables.
///
/// Pricing and events tables are per content type and get the index table
/// prefix and content type prepended; the platform tables are used as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteTables {
    /// Suffix of the per content type pricing index.
    #[serde(default = "default_pricing_table")]
    pub pricing: String,

    /// Suffix of the per content type recurrence occurrence table.
    #[serde(default = "default_events_table")]
    pub events: String,

    /// Platform term relationships table.
    #[serde(default = "default_term_relationships_table")]
    pub term_relationships: String,

    /// Platform followers table.
    #[serde(default = "default_followers_table")]
    pub followers: String,
}

fn default_pricing_table() -> String {
    "pricing".to_string()
}

fn default_events_table() -> String {
    "events".to_string()
}

fn default_term_relationships_table() -> String {
    "term_relationships".to_string()
}

fn default_followers_table() -> String {
    "followers".to_string()
}

impl Default for SatelliteTables {
    fn default() -> Self {
        Self {
            pricing: default_pricing_table(),
            events: default_events_table(),
            term_relationships: default_term_relationships_table(),
            followers: default_followers_table(),
        }
    }
}

/// Parses an offset such as `+02:00`, `-0530` or `Z`.
pub fn parse_utc_offset(value: &str) -> ConfigResult<FixedOffset> {
    let invalid = || ConfigError::InvalidUtcOffset {
        value: value.to_string(),
    };
    let trimmed = value.trim();
    if trimmed.eq_ignore_ascii_case("z") || trimmed.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };
    let digits: String = rest.chars().filter(|c| *c != ':').collect();
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let hours: i32 = digits[..2].parse().map_err(|_| invalid())?;
    let minutes: i32 = digits[2..].parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

/// Serde module for FixedOffset as `+HH:MM`.
mod utc_offset_serde {
    use chrono::FixedOffset;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(offset: &FixedOffset, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&offset.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<FixedOffset, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        super::parse_utc_offset(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde module for Duration with humantime format.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
