//! SQL execution boundary

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

pub use nlq_core::format::Row;

/// Trait for the database collaborator that runs validated SQL.
///
/// The orchestrator only calls this with statements the validator has
/// approved for execution. Implementations bind `params` by name and cap
/// the result at `row_limit` rows.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    async fn execute(
        &self,
        sql: &str,
        params: &BTreeMap<String, String>,
        row_limit: usize,
    ) -> Result<Vec<Row>>;
}
