//! Query execution tool.
//!
//! This module implements the `execute_query` MCP tool. Only statements
//! starting with SELECT are run; everything else is rejected before a
//! connection is acquired.

use crate::db::QueryExecutor;
use crate::error::DbResult;
use crate::models::QueryResult;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

/// Input for the execute_query tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct QueryInput {
    /// SQL SELECT statement to execute. Anything not starting with SELECT is rejected.
    pub query: String,
}

/// Handler for query execution.
#[derive(Debug, Clone)]
pub struct QueryToolHandler {
    executor: QueryExecutor,
}

impl QueryToolHandler {
    pub fn new(executor: QueryExecutor) -> Self {
        Self { executor }
    }

    pub async fn query(&self, input: QueryInput) -> DbResult<QueryResult> {
        let result = self.executor.run(&input.query).await?;

        info!(
            row_count = result.row_count(),
            columns = result.columns.len(),
            "Query executed"
        );
        Ok(result)
    }
}
