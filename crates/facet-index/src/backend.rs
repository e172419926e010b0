//! Relational backend contract.
//!
//! The compiler never talks to a database itself. Statements leave it as
//! [`SqlFragment`]s with `?` placeholders and are handed to an
//! [`IndexBackend`], which owns connections, timeouts and cancellation.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::config::DialectKind;
use crate::error::BackendError;
use crate::sql::SqlFragment;

/// A SQL backend able to run index maintenance and search statements.
///
/// Implementations must bind `params` to the placeholders in order and must
/// not retry or swallow failures.
#[async_trait]
pub trait IndexBackend: Send + Sync + Debug {
    /// Human-readable backend name, used in errors.
    fn name(&self) -> &'static str;

    /// Spatial dialect the backend speaks.
    fn dialect(&self) -> DialectKind;

    /// Runs a statement that returns no rows. Returns the affected row count.
    async fn execute(&self, statement: &SqlFragment) -> Result<u64, BackendError>;

    /// Runs a search statement and returns the first column of every row.
    async fn fetch_item_ids(&self, statement: &SqlFragment) -> Result<Vec<u64>, BackendError>;

    /// Runs a `COUNT` statement.
    async fn fetch_count(&self, statement: &SqlFragment) -> Result<u64, BackendError>;

    /// Checks that the backend accepts statements.
    async fn health_check(&self) -> Result<(), BackendError> {
        Ok(())
    }
}
