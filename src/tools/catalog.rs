//! Catalog description tools.
//!
//! This module implements the `get_table_description` and
//! `get_all_table_descriptions` MCP tools. They never touch the database.

use crate::catalog::MetadataCatalog;
use crate::error::DbResult;
use crate::models::{CatalogEntry, CatalogEntryList};
use tracing::info;

#[derive(Debug, Clone)]
pub struct CatalogToolHandler {
    catalog: MetadataCatalog,
}

impl CatalogToolHandler {
    pub fn new(catalog: MetadataCatalog) -> Self {
        Self { catalog }
    }

    pub async fn describe(&self, table_name: &str) -> DbResult<CatalogEntry> {
        let entry = self.catalog.describe(table_name).await?;
        info!(table = %entry.name(), "Loaded table description");
        Ok(entry)
    }

    pub async fn describe_all(&self) -> DbResult<CatalogEntryList> {
        let tables = self.catalog.describe_all().await?;
        info!(count = tables.len(), "Loaded table descriptions");
        Ok(CatalogEntryList { tables })
    }
}
