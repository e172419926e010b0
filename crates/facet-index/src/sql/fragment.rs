//! Bound SQL fragments.
//!
//! Fragments use positional `?` placeholders. Parameters are bound in the
//! order their fragments appear in the final statement, so composing code
//! must concatenate `params` in the same order it concatenates `sql`.

use serde::{Deserialize, Serialize};

/// A fragment of SQL with bound parameters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlFragment {
    /// The SQL clause.
    pub sql: String,
    /// Bound parameter values.
    pub params: Vec<SqlParam>,
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlParam {
    /// String parameter.
    String(String),
    /// Integer parameter.
    Integer(i64),
    /// Float parameter.
    Float(f64),
    /// Null parameter.
    Null,
}

impl SqlParam {
    /// Creates a string parameter.
    pub fn string(s: impl Into<String>) -> Self {
        SqlParam::String(s.into())
    }

    /// Creates an integer parameter.
    pub fn integer(i: i64) -> Self {
        SqlParam::Integer(i)
    }

    /// Creates a float parameter.
    pub fn float(f: f64) -> Self {
        SqlParam::Float(f)
    }
}

impl SqlFragment {
    /// Creates a new SQL fragment.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Creates a fragment with parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Creates a single placeholder bound to `param`.
    pub fn param(param: SqlParam) -> Self {
        Self::with_params("?", vec![param])
    }

    /// Joins fragments with a separator, keeping parameter order.
    pub fn join(fragments: impl IntoIterator<Item = SqlFragment>, separator: &str) -> Self {
        let mut sql = Vec::new();
        let mut params = Vec::new();
        for fragment in fragments {
            if fragment.is_empty() {
                continue;
            }
            sql.push(fragment.sql);
            params.extend(fragment.params);
        }
        Self {
            sql: sql.join(separator),
            params,
        }
    }

    /// Appends raw SQL and parameters to this fragment.
    pub fn push(&mut self, other: SqlFragment) {
        self.sql.push_str(&other.sql);
        self.params.extend(other.params);
    }

    /// Returns true if this fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Quotes an identifier with backticks, doubling embedded backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quotes a `table.column` reference.
pub fn qualified(table_alias: &str, column: &str) -> String {
    format!("{}.{}", quote_identifier(table_alias), quote_identifier(column))
}

/// Builds a comma separated `?` list for an IN clause.
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_fragment() {
        let mut frag = SqlFragment::new("value = ?");
        frag.params.push(SqlParam::string("test"));

        assert!(!frag.is_empty());
        assert_eq!(frag.params.len(), 1);
    }

    #[test]
    fn test_join_skips_empty() {
        let joined = SqlFragment::join(
            vec![
                SqlFragment::with_params("a = ?", vec![SqlParam::integer(1)]),
                SqlFragment::default(),
                SqlFragment::with_params("b = ?", vec![SqlParam::integer(2)]),
            ],
            " AND ",
        );
        assert_eq!(joined.sql, "a = ? AND b = ?");
        assert_eq!(joined.params.len(), 2);
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("price"), "`price`");
        assert_eq!(quote_identifier("we`ird"), "`we``ird`");
        assert_eq!(qualified("idx", "item_id"), "`idx`.`item_id`");
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(0), "");
    }
}
