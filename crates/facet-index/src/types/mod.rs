//! Core types shared by filters, the schema builder and the query compiler.
//!
//! - [`item`] - content item accessor contract and field values
//! - [`value`] - raw request values and parsed filter values
//! - [`request`] - search requests and ordering

pub mod item;
pub mod request;
pub mod value;

pub use item::{
    is_truthy, resolve_path, ContentItem, FieldType, FieldValue, GeoPoint, Location, RecurrenceRule,
    RepeatUnit, StaticItem,
};
pub use request::{OrderRequest, SearchRequest};
pub use value::{DateBound, DateRange, GeoArea, GeoRadius, ParsedValue, RawValue, DATETIME_FORMAT};
