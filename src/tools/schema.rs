//! Schema introspection tools.
//!
//! This module implements the `get_all_tables`, `get_table_info` and
//! `get_database_info` MCP tools.

use crate::db::{ConnectionProvider, SchemaInspector};
use crate::error::{DbError, DbResult};
use crate::models::{DatabaseInfo, Table, TableList};
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

/// Input for the get_table_info and get_table_description tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TableNameInput {
    /// Exact table name (case-sensitive)
    pub table_name: String,
}

impl TableNameInput {
    /// The requested name. Blank names are rejected before any lookup.
    pub fn name(&self) -> DbResult<&str> {
        if self.table_name.trim().is_empty() {
            Err(DbError::invalid_input("table_name must not be empty"))
        } else {
            Ok(&self.table_name)
        }
    }
}

/// Handler for live schema introspection.
#[derive(Debug, Clone)]
pub struct SchemaToolHandler {
    provider: Arc<ConnectionProvider>,
}

impl SchemaToolHandler {
    pub fn new(provider: Arc<ConnectionProvider>) -> Self {
        Self { provider }
    }

    pub async fn list_tables(&self) -> DbResult<TableList> {
        let mut conn = self.provider.acquire().await?;
        let tables = SchemaInspector::list_tables(&mut conn).await?;

        info!(count = tables.len(), "Listed tables");
        Ok(TableList { tables })
    }

    pub async fn describe_table(&self, table_name: &str) -> DbResult<Table> {
        let mut conn = self.provider.acquire().await?;
        let table = SchemaInspector::describe_table(&mut conn, table_name).await?;

        info!(
            table = %table.name,
            columns = table.columns.len(),
            "Described table"
        );
        Ok(table)
    }

    pub async fn database_info(&self) -> DbResult<DatabaseInfo> {
        self.provider.describe().await
    }
}
