//! Expert SQL MCP Server Library
//!
//! This library provides MCP (Model Context Protocol) tools for AI assistants
//! to explore SQL databases (SQLite, PostgreSQL, MySQL), read curated table
//! descriptions and run read-only queries.

pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::{AppContext, ExpertSqlService};
