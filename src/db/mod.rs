//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection provider with lazily-connecting pools
//! - Read-only query execution
//! - Schema introspection
//! - Value normalization

pub mod executor;
pub mod pool;
pub mod schema;
pub mod types;

pub use executor::QueryExecutor;
pub use pool::{ConnectionProvider, DbConnection, DbPool};
pub use schema::SchemaInspector;
