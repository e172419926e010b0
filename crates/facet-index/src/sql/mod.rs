//! SQL building blocks shared by the schema builder, filters and compiler.

pub mod dialect;
pub mod fragment;

pub use dialect::{dialect_for, AxisOrder, MariaDbDialect, MySqlDialect, SpatialDialect, Winding, SRID};
pub use fragment::{placeholders, qualified, quote_identifier, SqlFragment, SqlParam};
