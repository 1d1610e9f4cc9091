//! Metadata catalog.
//!
//! Curated, human-written table descriptions kept in a JSON file next to the
//! server. The file is re-read on every call so edits take effect without a
//! restart.

use crate::error::{DbError, DbResult};
use crate::models::{CatalogDocument, CatalogEntry, CatalogTable};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct MetadataCatalog {
    path: PathBuf,
}

impl MetadataCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the catalog file.
    pub async fn load(&self) -> DbResult<Vec<CatalogTable>> {
        let path = self.path.display().to_string();
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| DbError::config(&path, format!("Cannot read catalog file: {}", e)))?;

        let doc: CatalogDocument = serde_json::from_str(&raw)
            .map_err(|e| DbError::config(&path, format!("Invalid catalog JSON: {}", e)))?;

        let tables = doc.into_tables();
        debug!(path = %path, tables = tables.len(), "Loaded catalog");
        Ok(tables)
    }

    /// Look up one table by exact name. The first matching entry wins.
    pub async fn describe(&self, table_name: &str) -> DbResult<CatalogEntry> {
        let tables = self.load().await?;

        let table = tables
            .into_iter()
            .find(|t| t.name() == Some(table_name))
            .ok_or_else(|| {
                DbError::not_found(format!("Table '{}' not found in catalog", table_name))
            })?;

        table.into_entry().ok_or_else(|| {
            DbError::not_found(format!(
                "Catalog entry for table '{}' is incomplete (missing or non-text description)",
                table_name
            ))
        })
    }

    /// All complete entries, in file order.
    ///
    /// A catalog with no tables at all is an error; one whose entries are
    /// all incomplete yields an empty list.
    pub async fn describe_all(&self) -> DbResult<Vec<CatalogEntry>> {
        let tables = self.load().await?;
        if tables.is_empty() {
            return Err(DbError::not_found("No table descriptions are configured"));
        }

        let total = tables.len();
        let entries: Vec<CatalogEntry> =
            tables.into_iter().filter_map(CatalogTable::into_entry).collect();

        if entries.len() < total {
            debug!(
                skipped = total - entries.len(),
                "Skipped incomplete catalog entries"
            );
        }
        Ok(entries)
    }
}
