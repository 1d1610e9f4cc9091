//! Data models for the Expert SQL MCP server.
//!
//! This module re-exports all model types used throughout the application.

pub mod catalog;
pub mod connection;
pub mod query;
pub mod schema;

// Re-export commonly used types
pub use catalog::{CatalogColumn, CatalogDocument, CatalogEntry, CatalogEntryList, CatalogTable};
pub use connection::{DatabaseInfo, DatabaseType};
pub use query::QueryResult;
pub use schema::{Column, ColumnType, Table, TableList};
