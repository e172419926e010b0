//! Index table schema builder.
//!
//! Filters declare the columns and keys they need; the builder collects them
//! into one table definition per content type. Declarations are idempotent: a
//! column or key that already exists is ignored.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::DialectKind;
use crate::sql::{quote_identifier, SpatialDialect, SqlFragment, SqlParam, SRID};

/// Primary key column of every index table.
pub const ITEM_ID_COLUMN: &str = "item_id";

/// Listing priority column of every index table.
pub const PRIORITY_COLUMN: &str = "priority";

/// Author column, declared by filters that correlate items with their author.
pub const AUTHOR_ID_COLUMN: &str = "author_id";

/// Column types used by index tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// `BIGINT UNSIGNED`
    BigIntUnsigned,
    /// `BIGINT`
    BigInt,
    /// `INT`
    Int,
    /// `TINYINT(1)`
    Bool,
    /// `TEXT`
    Text,
    /// `DATETIME`
    DateTime,
    /// Geographic `POINT`.
    Point,
}

impl ColumnType {
    fn sql(&self, dialect: &dyn SpatialDialect) -> String {
        match self {
            ColumnType::BigIntUnsigned => "BIGINT UNSIGNED".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Int => "INT".to_string(),
            ColumnType::Bool => "TINYINT(1)".to_string(),
            ColumnType::Text => "TEXT".to_string(),
            ColumnType::DateTime => "DATETIME".to_string(),
            ColumnType::Point => match dialect.kind() {
                DialectKind::Mysql => format!("POINT SRID {}", SRID),
                DialectKind::Mariadb => format!("POINT REF_SYSTEM_ID={}", SRID),
            },
        }
    }
}

/// A column declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Column type.
    pub column_type: ColumnType,
    /// Whether the column accepts NULL.
    pub nullable: bool,
    /// Literal default, if any.
    pub default: Option<String>,
}

impl ColumnDef {
    /// Creates a nullable column without a default.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            default: None,
        }
    }

    /// Marks the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Sets a literal default.
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    fn sql(&self, dialect: &dyn SpatialDialect) -> String {
        let mut sql = format!(
            "{} {}",
            quote_identifier(&self.name),
            self.column_type.sql(dialect)
        );
        sql.push_str(if self.nullable { " NULL" } else { " NOT NULL" });
        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        sql
    }
}

/// Index kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// Primary key.
    Primary,
    /// Ordinary B-tree index.
    Index,
    /// Full-text index.
    Fulltext,
    /// Spatial index.
    Spatial,
}

/// A key declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyDef {
    /// Key name.
    pub name: String,
    /// Key kind.
    pub kind: KeyKind,
    /// Indexed columns.
    pub columns: Vec<String>,
}

impl KeyDef {
    /// Creates a key over one column, named after it.
    pub fn on(kind: KeyKind, column: impl Into<String>) -> Self {
        let column = column.into();
        Self {
            name: column.clone(),
            kind,
            columns: vec![column],
        }
    }

    fn sql(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(|c| quote_identifier(c)).collect();
        let columns = columns.join(", ");
        match self.kind {
            KeyKind::Primary => format!("PRIMARY KEY ({})", columns),
            KeyKind::Index => format!("KEY {} ({})", quote_identifier(&self.name), columns),
            KeyKind::Fulltext => {
                format!("FULLTEXT KEY {} ({})", quote_identifier(&self.name), columns)
            }
            KeyKind::Spatial => {
                format!("SPATIAL KEY {} ({})", quote_identifier(&self.name), columns)
            }
        }
    }
}

/// Collects column and key declarations for one index table.
#[derive(Debug, Clone)]
pub struct IndexSchemaBuilder {
    table: String,
    dialect: &'static dyn SpatialDialect,
    columns: Vec<ColumnDef>,
    keys: Vec<KeyDef>,
}

impl IndexSchemaBuilder {
    /// Creates a builder holding the system columns.
    pub fn new(table: impl Into<String>, dialect: &'static dyn SpatialDialect) -> Self {
        let mut builder = Self {
            table: table.into(),
            dialect,
            columns: Vec::new(),
            keys: Vec::new(),
        };
        builder.add_column(ColumnDef::new(ITEM_ID_COLUMN, ColumnType::BigIntUnsigned).not_null());
        builder.add_column(
            ColumnDef::new(PRIORITY_COLUMN, ColumnType::Int)
                .not_null()
                .with_default("0"),
        );
        builder.add_key(KeyDef::on(KeyKind::Primary, ITEM_ID_COLUMN));
        builder.add_key(KeyDef::on(KeyKind::Index, PRIORITY_COLUMN));
        builder
    }

    /// Table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Declares a column. Returns false if a column with that name exists.
    pub fn add_column(&mut self, column: ColumnDef) -> bool {
        if self.has_column(&column.name) {
            debug!(table = %self.table, column = %column.name, "column already declared");
            return false;
        }
        self.columns.push(column);
        true
    }

    /// Declares a key. Returns false if a key with that name exists.
    pub fn add_key(&mut self, key: KeyDef) -> bool {
        if self.keys.iter().any(|k| k.name == key.name && k.kind == key.kind) {
            debug!(table = %self.table, key = %key.name, "key already declared");
            return false;
        }
        self.keys.push(key);
        true
    }

    /// Returns true if the column is declared.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Declared columns in declaration order.
    pub fn columns(&self) -> &[ColumnDef] {
        &self.columns
    }

    /// Declared keys in declaration order.
    pub fn keys(&self) -> &[KeyDef] {
        &self.keys
    }

    /// `CREATE TABLE` statement for the collected declarations.
    pub fn create_table_sql(&self) -> String {
        let definitions: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.sql(self.dialect))
            .chain(self.keys.iter().map(KeyDef::sql))
            .map(|d| format!("  {}", d))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4",
            quote_identifier(&self.table),
            definitions.join(",\n")
        )
    }

    /// `DROP TABLE` statement.
    pub fn drop_table_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", quote_identifier(&self.table))
    }
}

/// Column values of one content item, keyed by column name.
pub type IndexValues = BTreeMap<String, SqlFragment>;

/// One index table row.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRow {
    /// Target table.
    pub table: String,
    /// Item identifier.
    pub item_id: u64,
    /// Value expressions by column.
    pub values: IndexValues,
}

impl IndexRow {
    /// Creates a row holding the system columns.
    pub fn new(table: impl Into<String>, item_id: u64, priority: i64) -> Self {
        let mut values = IndexValues::new();
        values.insert(
            ITEM_ID_COLUMN.to_string(),
            SqlFragment::param(SqlParam::integer(item_id as i64)),
        );
        values.insert(
            PRIORITY_COLUMN.to_string(),
            SqlFragment::param(SqlParam::integer(priority)),
        );
        Self {
            table: table.into(),
            item_id,
            values,
        }
    }

    /// Merges filter-provided values. System columns are never overwritten.
    pub fn extend(&mut self, values: IndexValues) {
        for (column, value) in values {
            if column == ITEM_ID_COLUMN || column == PRIORITY_COLUMN {
                continue;
            }
            self.values.insert(column, value);
        }
    }

    /// `INSERT ... ON DUPLICATE KEY UPDATE` statement for the row.
    pub fn upsert(&self) -> SqlFragment {
        let columns: Vec<String> = self.values.keys().map(|c| quote_identifier(c)).collect();
        let values = SqlFragment::join(self.values.values().cloned(), ", ");
        let updates: Vec<String> = self
            .values
            .keys()
            .filter(|c| c.as_str() != ITEM_ID_COLUMN)
            .map(|c| {
                let column = quote_identifier(c);
                format!("{} = VALUES({})", column, column)
            })
            .collect();

        SqlFragment::with_params(
            format!(
                "INSERT INTO {} ({}) VALUES ({}) ON DUPLICATE KEY UPDATE {}",
                quote_identifier(&self.table),
                columns.join(", "),
                values.sql,
                updates.join(", ")
            ),
            values.params,
        )
    }

    /// `DELETE` statement for an item.
    pub fn delete(table: &str, item_id: u64) -> SqlFragment {
        SqlFragment::with_params(
            format!(
                "DELETE FROM {} WHERE {} = ?",
                quote_identifier(table),
                quote_identifier(ITEM_ID_COLUMN)
            ),
            vec![SqlParam::integer(item_id as i64)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{MariaDbDialect, MySqlDialect};

    static MYSQL: MySqlDialect = MySqlDialect;
    static MARIADB: MariaDbDialect = MariaDbDialect;

    #[test]
    fn test_system_columns() {
        let builder = IndexSchemaBuilder::new("facets_place", &MYSQL);
        assert!(builder.has_column("item_id"));
        assert!(builder.has_column("priority"));
        assert_eq!(builder.keys().len(), 2);
    }

    #[test]
    fn test_declarations_are_idempotent() {
        let mut builder = IndexSchemaBuilder::new("facets_place", &MYSQL);
        assert!(builder.add_column(ColumnDef::new("filter_q", ColumnType::Text)));
        assert!(!builder.add_column(ColumnDef::new("filter_q", ColumnType::Text)));
        assert!(builder.add_key(KeyDef::on(KeyKind::Fulltext, "filter_q")));
        assert!(!builder.add_key(KeyDef::on(KeyKind::Fulltext, "filter_q")));
        assert_eq!(builder.columns().len(), 3);
        assert_eq!(builder.keys().len(), 3);
    }

    #[test]
    fn test_create_table_sql() {
        let mut builder = IndexSchemaBuilder::new("facets_place", &MYSQL);
        builder.add_column(ColumnDef::new("filter_loc", ColumnType::Point).not_null());
        builder.add_key(KeyDef::on(KeyKind::Spatial, "filter_loc"));

        let sql = builder.create_table_sql();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS `facets_place`"));
        assert!(sql.contains("`item_id` BIGINT UNSIGNED NOT NULL"));
        assert!(sql.contains("`priority` INT NOT NULL DEFAULT 0"));
        assert!(sql.contains("`filter_loc` POINT SRID 4326 NOT NULL"));
        assert!(sql.contains("PRIMARY KEY (`item_id`)"));
        assert!(sql.contains("SPATIAL KEY `filter_loc` (`filter_loc`)"));
        assert!(sql.ends_with("ENGINE=InnoDB DEFAULT CHARSET=utf8mb4"));
    }

    #[test]
    fn test_point_column_per_dialect() {
        let mut builder = IndexSchemaBuilder::new("facets_place", &MARIADB);
        builder.add_column(ColumnDef::new("filter_loc", ColumnType::Point).not_null());
        assert!(builder
            .create_table_sql()
            .contains("`filter_loc` POINT REF_SYSTEM_ID=4326 NOT NULL"));
    }

    #[test]
    fn test_row_upsert() {
        let mut row = IndexRow::new("facets_place", 7, 2);
        let mut values = IndexValues::new();
        values.insert(
            "filter_q".to_string(),
            SqlFragment::param(SqlParam::string("toms diner")),
        );
        values.insert(
            "priority".to_string(),
            SqlFragment::param(SqlParam::integer(99)),
        );
        row.extend(values);

        let statement = row.upsert();
        assert_eq!(
            statement.sql,
            "INSERT INTO `facets_place` (`filter_q`, `item_id`, `priority`) VALUES (?, ?, ?) \
             ON DUPLICATE KEY UPDATE `filter_q` = VALUES(`filter_q`), `priority` = VALUES(`priority`)"
        );
        assert_eq!(
            statement.params,
            vec![
                SqlParam::string("toms diner"),
                SqlParam::integer(7),
                SqlParam::integer(2)
            ]
        );
    }

    #[test]
    fn test_row_delete() {
        let statement = IndexRow::delete("facets_place", 7);
        assert_eq!(statement.sql, "DELETE FROM `facets_place` WHERE `item_id` = ?");
        assert_eq!(statement.params, vec![SqlParam::integer(7)]);
    }
}
