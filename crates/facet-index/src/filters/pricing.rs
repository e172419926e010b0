//! Joins against the per content type pricing satellite table.
//!
//! The pricing table holds one row per priced sub-entity of an item
//! (`item_id`, `price`, `sale_price`, `in_stock` and one column per add-on
//! attribute named `<entity>_addon_<addon>_<attribute>`).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::query::{AddonFilter, IndexQuery};
use crate::schema::ITEM_ID_COLUMN;
use crate::sql::{qualified, quote_identifier, SqlFragment, SqlParam};

use super::FilterContext;

/// Alias of the shared minimum price join.
pub const MIN_PRICE_ALIAS: &str = "pricing";

/// A numeric or boolean attribute of a priced sub-entity's add-on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonAttribute {
    /// Sub-entity name.
    #[serde(default = "default_entity")]
    pub entity: String,
    /// Add-on key.
    pub addon: String,
    /// Attribute suffix.
    pub attribute: String,
}

fn default_entity() -> String {
    "product".to_string()
}

impl AddonAttribute {
    /// Satellite column of the attribute.
    pub fn column(&self) -> String {
        format!("{}_addon_{}_{}", self.entity, self.addon, self.attribute)
    }
}

/// Multiplier turning values with the precision of `step` into integers.
pub fn step_multiplier(step: f64) -> f64 {
    let scale = step
        .to_string()
        .parse::<Decimal>()
        .map(|d| d.normalize().scale())
        .unwrap_or(0);
    10f64.powi(scale as i32)
}

/// Scales a value to the integral index representation.
pub fn scaled(value: f64, multiplier: f64) -> SqlParam {
    SqlParam::integer((value * multiplier).round() as i64)
}

/// Joins the lowest effective price per item and returns its column.
pub fn join_min_price(query: &mut IndexQuery, ctx: &FilterContext<'_>) -> String {
    let table = ctx.satellite_table(&ctx.config.tables.pricing);
    query.join(
        MIN_PRICE_ALIAS,
        SqlFragment::new(format!(
            "LEFT JOIN (SELECT {item}, MIN(LEAST({price}, COALESCE({sale}, {price}))) AS {min} \
             FROM {table} GROUP BY {item}) AS {alias} ON {alias_item} = {idx_item}",
            item = quote_identifier(ITEM_ID_COLUMN),
            price = quote_identifier("price"),
            sale = quote_identifier("sale_price"),
            min = quote_identifier("min_price"),
            table = quote_identifier(&table),
            alias = quote_identifier(MIN_PRICE_ALIAS),
            alias_item = qualified(MIN_PRICE_ALIAS, ITEM_ID_COLUMN),
            idx_item = IndexQuery::column(ITEM_ID_COLUMN),
        )),
    );
    qualified(MIN_PRICE_ALIAS, "min_price")
}

/// Joins the pricing rows of each item under `alias` and groups by item.
pub fn join_pricing_rows(query: &mut IndexQuery, ctx: &FilterContext<'_>, alias: &str) {
    let table = ctx.satellite_table(&ctx.config.tables.pricing);
    query.join(
        alias.to_string(),
        SqlFragment::new(format!(
            "INNER JOIN {} AS {} ON {} = {}",
            quote_identifier(&table),
            quote_identifier(alias),
            qualified(alias, ITEM_ID_COLUMN),
            IndexQuery::column(ITEM_ID_COLUMN),
        )),
    );
    query.group_by_item();
}

/// Constrains a pricing row column and records it for adaptive display.
pub fn constrain_pricing_column(
    query: &mut IndexQuery,
    ctx: &FilterContext<'_>,
    filter_key: &str,
    column: String,
    operator: &str,
    value: SqlParam,
) {
    let alias = format!("pricing_{}", filter_key);
    join_pricing_rows(query, ctx, &alias);
    query.filter(SqlFragment::with_params(
        format!("{} {} ?", qualified(&alias, &column), operator),
        vec![value.clone()],
    ));
    query.addons_mut().record(AddonFilter {
        filter_key: filter_key.to_string(),
        column,
        operator: operator.to_string(),
        value,
    });
}
