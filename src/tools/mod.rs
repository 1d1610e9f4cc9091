//! MCP tool implementations.
//!
//! This module contains the tool handlers:
//! - `schema`: `get_all_tables`, `get_table_info`, `get_database_info`
//! - `catalog`: `get_table_description`, `get_all_table_descriptions`
//! - `query`: `execute_query`
//! - `format`: structured and markdown rendering of tool outputs
//! - `sql_validator`: read-only prefix check

pub mod catalog;
pub mod format;
pub mod query;
pub mod schema;
pub mod sql_validator;

pub use catalog::CatalogToolHandler;
pub use format::{OutputMode, Render};
pub use query::{QueryInput, QueryToolHandler};
pub use schema::{SchemaToolHandler, TableNameInput};
