//! Index query compiler.
//!
//! An [`IndexQuery`] is created per search request, mutated by every active
//! filter and consumed once by [`IndexQuery::compile`]. Fragments stay
//! structured until then: joins are keyed and identical predicates are kept
//! once, so a filter applied twice compiles like a filter applied once. Select
//! expressions are named so ordering can refer to them.
//!
//! Parameters are bound in statement order: select expressions, joins, where
//! predicates, then `LIMIT`/`OFFSET`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::schema::{ITEM_ID_COLUMN, PRIORITY_COLUMN};
use crate::sql::{qualified, quote_identifier, SqlFragment, SqlParam};

/// Alias of the index table inside compiled statements.
pub const INDEX_ALIAS: &str = "idx";

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    fn sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// An `ORDER BY` term.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderClause {
    /// Sort expression.
    pub expression: String,
    /// Sort direction.
    pub direction: Direction,
}

/// A constraint on a priced sub-entity's add-on, recorded for adaptive display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddonFilter {
    /// Key of the filter that added the constraint.
    pub filter_key: String,
    /// Satellite column the constraint applies to.
    pub column: String,
    /// Comparison operator.
    pub operator: String,
    /// Compared value.
    pub value: SqlParam,
}

/// Request-scoped accumulator of add-on constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddonFilters {
    entries: Vec<AddonFilter>,
}

impl AddonFilters {
    /// Records a constraint, replacing an earlier one from the same filter.
    pub fn record(&mut self, filter: AddonFilter) {
        self.entries.retain(|f| f.filter_key != filter.filter_key);
        self.entries.push(filter);
    }

    /// Recorded constraints in insertion order.
    pub fn entries(&self) -> &[AddonFilter] {
        &self.entries
    }

    /// Returns the constraint recorded by a filter.
    pub fn get(&self, filter_key: &str) -> Option<&AddonFilter> {
        self.entries.iter().find(|f| f.filter_key == filter_key)
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The executable result of compiling an [`IndexQuery`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// Page statement selecting item ids.
    pub statement: SqlFragment,
    /// Statement counting all matching items.
    pub count: SqlFragment,
    /// Add-on constraints contributed by the request.
    pub addons: AddonFilters,
}

/// Accumulates fragments contributed by filters for one search request.
#[derive(Debug, Clone)]
pub struct IndexQuery {
    table: String,
    selects: Vec<(String, SqlFragment)>,
    joins: Vec<(String, SqlFragment)>,
    wheres: Vec<SqlFragment>,
    group_by: Vec<String>,
    order_by: Vec<OrderClause>,
    addons: AddonFilters,
    limit: Option<(u32, u32)>,
}

impl IndexQuery {
    /// Creates an empty query against an index table.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            selects: Vec::new(),
            joins: Vec::new(),
            wheres: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            addons: AddonFilters::default(),
            limit: None,
        }
    }

    /// Index table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Quoted reference to an index table column.
    pub fn column(name: &str) -> String {
        qualified(INDEX_ALIAS, name)
    }

    /// Adds a join under `key`. Returns false if a join with that key exists.
    pub fn join(&mut self, key: impl Into<String>, fragment: SqlFragment) -> bool {
        let key = key.into();
        if self.has_join(&key) {
            debug!(join = %key, "join already present");
            return false;
        }
        self.joins.push((key, fragment));
        true
    }

    /// Returns true if a join with `key` exists.
    pub fn has_join(&self, key: &str) -> bool {
        self.joins.iter().any(|(k, _)| k == key)
    }

    /// Adds a conjoined where predicate unless an identical one is present.
    pub fn filter(&mut self, predicate: SqlFragment) {
        if predicate.is_empty() {
            return;
        }
        if self.wheres.contains(&predicate) {
            debug!(predicate = %predicate.sql, "predicate already present");
            return;
        }
        self.wheres.push(predicate);
    }

    /// Adds a named select expression, replacing one with the same name.
    pub fn select(&mut self, name: impl Into<String>, expression: SqlFragment) {
        let name = name.into();
        self.selects.retain(|(n, _)| n != &name);
        self.selects.push((name, expression));
    }

    /// Groups by an expression once.
    pub fn group_by(&mut self, expression: impl Into<String>) {
        let expression = expression.into();
        if !self.group_by.contains(&expression) {
            self.group_by.push(expression);
        }
    }

    /// Groups rows by item, collapsing duplicates from one-to-many joins.
    pub fn group_by_item(&mut self) {
        self.group_by(Self::column(ITEM_ID_COLUMN));
    }

    /// Orders by an expression once; the first request for an expression wins.
    pub fn order_by(&mut self, expression: impl Into<String>, direction: Direction) {
        let expression = expression.into();
        if self.order_by.iter().any(|o| o.expression == expression) {
            return;
        }
        self.order_by.push(OrderClause {
            expression,
            direction,
        });
    }

    /// Orders by a named select expression.
    pub fn order_by_select(&mut self, name: &str, direction: Direction) {
        self.order_by(quote_identifier(name), direction);
    }

    /// Add-on accumulator of this request.
    pub fn addons_mut(&mut self) -> &mut AddonFilters {
        &mut self.addons
    }

    /// Add-on constraints recorded so far.
    pub fn addons(&self) -> &AddonFilters {
        &self.addons
    }

    /// Restricts the statement to a zero-based page.
    pub fn paginate(&mut self, page: u32, per_page: u32) {
        self.limit = Some((page, per_page));
    }

    /// Number of where predicates.
    pub fn predicate_count(&self) -> usize {
        self.wheres.len()
    }

    /// Number of joins.
    pub fn join_count(&self) -> usize {
        self.joins.len()
    }

    /// Consumes the query and renders the final statements.
    pub fn compile(self) -> CompiledQuery {
        let from = self.from_clause();

        let mut select_list = vec![SqlFragment::new(format!(
            "{} AS {}",
            Self::column(ITEM_ID_COLUMN),
            quote_identifier(ITEM_ID_COLUMN)
        ))];
        select_list.extend(self.selects.iter().map(|(name, expression)| {
            SqlFragment::with_params(
                format!("{} AS {}", expression.sql, quote_identifier(name)),
                expression.params.clone(),
            )
        }));

        let mut statement = SqlFragment::new("SELECT ");
        statement.push(SqlFragment::join(select_list, ", "));
        statement.push(from.clone());
        if !self.group_by.is_empty() {
            statement.push(SqlFragment::new(format!(
                " GROUP BY {}",
                self.group_by.join(", ")
            )));
        }
        statement.push(SqlFragment::new(format!(" ORDER BY {}", self.order_clause())));
        if let Some((page, per_page)) = self.limit {
            let offset = i64::from(page) * i64::from(per_page);
            statement.push(SqlFragment::with_params(
                " LIMIT ? OFFSET ?",
                vec![
                    SqlParam::integer(i64::from(per_page)),
                    SqlParam::integer(offset),
                ],
            ));
        }

        let mut count = SqlFragment::new(format!(
            "SELECT COUNT(DISTINCT {})",
            Self::column(ITEM_ID_COLUMN)
        ));
        count.push(from);

        debug!(
            table = %self.table,
            joins = self.joins.len(),
            predicates = self.wheres.len(),
            params = statement.params.len(),
            "compiled index query"
        );

        CompiledQuery {
            statement,
            count,
            addons: self.addons,
        }
    }

    fn from_clause(&self) -> SqlFragment {
        let mut from = SqlFragment::new(format!(
            " FROM {} AS {}",
            quote_identifier(&self.table),
            quote_identifier(INDEX_ALIAS)
        ));
        for (_, join) in &self.joins {
            from.push(SqlFragment::new(" "));
            from.push(join.clone());
        }
        if !self.wheres.is_empty() {
            let predicates = self.wheres.iter().cloned().map(|w| {
                SqlFragment::with_params(format!("({})", w.sql), w.params)
            });
            from.push(SqlFragment::new(" WHERE "));
            from.push(SqlFragment::join(predicates, " AND "));
        }
        from
    }

    fn order_clause(&self) -> String {
        let item_id = Self::column(ITEM_ID_COLUMN);
        let mut terms: Vec<String> = if self.order_by.is_empty() {
            vec![format!("{} DESC", Self::column(PRIORITY_COLUMN))]
        } else {
            self.order_by
                .iter()
                .map(|o| format!("{} {}", o.expression, o.direction.sql()))
                .collect()
        };
        if !self.order_by.iter().any(|o| o.expression == item_id) {
            terms.push(format!("{} DESC", item_id));
        }
        terms.join(", ")
    }
}
