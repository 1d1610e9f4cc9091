//! MCP service implementation using rmcp.
//!
//! This module defines the ExpertSqlService struct with all tools exposed via
//! the MCP protocol using the rmcp framework's macros. Failures of a tool are
//! returned as tool results flagged `isError`; protocol errors are reserved
//! for malformed requests and serialization failures.

use crate::catalog::MetadataCatalog;
use crate::config::DEFAULT_QUERY_TIMEOUT_SECS;
use crate::db::{ConnectionProvider, QueryExecutor};
use crate::error::DbResult;
use crate::tools::format::{self, OutputMode, Render};
use crate::tools::{
    CatalogToolHandler, QueryInput, QueryToolHandler, SchemaToolHandler, TableNameInput,
};
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{
        CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
    },
    tool, tool_handler, tool_router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const INSTRUCTIONS: &str = "You are an expert in SQL and database management. \
Your task is to assist users with SQL queries, database schema understanding, and data manipulation. \
You will provide accurate and efficient SQL code snippets based on user requests.\n\
You will also help users understand their database schema, including tables and columns.\n\
\n\
## Tools\n\
- `get_all_tables` / `get_table_info`: live schema of the connected database\n\
- `get_table_description` / `get_all_table_descriptions`: curated descriptions from the catalog file\n\
- `execute_query`: run a read-only query (must start with SELECT)\n\
- `get_database_info`: dialect and server version";

/// Shared state for every tool call.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub provider: Arc<ConnectionProvider>,
    pub catalog: MetadataCatalog,
    pub query_timeout: Duration,
    pub output_mode: OutputMode,
}

impl AppContext {
    pub fn new(provider: Arc<ConnectionProvider>, catalog: MetadataCatalog) -> Self {
        Self {
            provider,
            catalog,
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            output_mode: OutputMode::default(),
        }
    }

    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn with_output_mode(mut self, output_mode: OutputMode) -> Self {
        self.output_mode = output_mode;
        self
    }
}

#[derive(Clone)]
pub struct ExpertSqlService {
    schema: SchemaToolHandler,
    catalog: CatalogToolHandler,
    query: QueryToolHandler,
    output_mode: OutputMode,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl ExpertSqlService {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        let executor = QueryExecutor::with_timeout(ctx.provider.clone(), ctx.query_timeout);
        Self {
            schema: SchemaToolHandler::new(ctx.provider.clone()),
            catalog: CatalogToolHandler::new(ctx.catalog.clone()),
            query: QueryToolHandler::new(executor),
            output_mode: ctx.output_mode,
            tool_router: Self::tool_router(),
        }
    }

    pub fn output_mode(&self) -> OutputMode {
        self.output_mode
    }

    /// Reject a missing table name at the protocol level.
    /// Malformed arguments are a protocol error, not a tool result.
    fn validate_table_name(input: &TableNameInput) -> Result<&str, McpError> {
        input
            .name()
            .map_err(|e| McpError::invalid_params(e.to_string(), None))
    }

    /// Translate a handler outcome into a tool result.
    fn finish<T>(&self, tool: &str, result: DbResult<T>) -> Result<CallToolResult, McpError>
    where
        T: Serialize + Render,
    {
        match result {
            Ok(value) => format::render(&value, self.output_mode).map_err(|e| {
                McpError::internal_error(format!("Failed to serialize {} output: {}", tool, e), None)
            }),
            Err(e) => {
                warn!(tool = tool, kind = %e.kind(), error = %e, "Tool call failed");
                Ok(CallToolResult::error(vec![Content::text(e.user_message())]))
            }
        }
    }
}

#[tool_router]
impl ExpertSqlService {
    #[tool(description = "Retrieve all tables in the database")]
    pub async fn get_all_tables(&self) -> Result<CallToolResult, McpError> {
        let result = self.schema.list_tables().await;
        self.finish("get_all_tables", result)
    }

    #[tool(
        description = "Retrieve information about a specific table: its columns, their types and primary key flags"
    )]
    pub async fn get_table_info(
        &self,
        Parameters(input): Parameters<TableNameInput>,
    ) -> Result<CallToolResult, McpError> {
        let table_name = Self::validate_table_name(&input)?;
        let result = self.schema.describe_table(table_name).await;
        self.finish("get_table_info", result)
    }

    #[tool(
        description = "Retrieve the predefined description of a specific table from the configuration file"
    )]
    pub async fn get_table_description(
        &self,
        Parameters(input): Parameters<TableNameInput>,
    ) -> Result<CallToolResult, McpError> {
        let table_name = Self::validate_table_name(&input)?;
        let result = self.catalog.describe(table_name).await;
        self.finish("get_table_description", result)
    }

    #[tool(
        description = "Retrieve descriptions of all predefined tables in the configuration file"
    )]
    pub async fn get_all_table_descriptions(&self) -> Result<CallToolResult, McpError> {
        let result = self.catalog.describe_all().await;
        self.finish("get_all_table_descriptions", result)
    }

    #[tool(
        description = "Execute a SQL query and return the results.\nOnly queries starting with SELECT are allowed.\nAll values are returned as text; NULL is returned as \"NULL\"."
    )]
    pub async fn execute_query(
        &self,
        Parameters(input): Parameters<QueryInput>,
    ) -> Result<CallToolResult, McpError> {
        let result = self.query.query(input).await;
        self.finish("execute_query", result)
    }

    #[tool(
        description = "Retrieve the database dialect, server version and connection details (never credentials)"
    )]
    pub async fn get_database_info(&self) -> Result<CallToolResult, McpError> {
        let result = self.schema.database_info().await;
        self.finish("get_database_info", result)
    }
}

#[tool_handler]
impl ServerHandler for ExpertSqlService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "expert-sql-mcp".to_owned(),
                title: Some("Expert SQL".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> ExpertSqlService {
        let provider = Arc::new(
            ConnectionProvider::from_url("postgres://u:p@127.0.0.1:1/db", Duration::from_secs(1))
                .unwrap(),
        );
        let ctx = AppContext::new(provider, MetadataCatalog::new("./missing-config.json"));
        ExpertSqlService::new(Arc::new(ctx))
    }

    #[tokio::test]
    async fn test_service_creation() {
        let service = create_test_service();
        assert_eq!(service.output_mode(), OutputMode::Structured);
    }

    #[tokio::test]
    async fn test_validate_table_name() {
        assert_eq!(
            ExpertSqlService::validate_table_name(&TableNameInput { table_name: "users".to_string() }).unwrap(),
            "users"
        );
        assert!(ExpertSqlService::validate_table_name(&TableNameInput { table_name: "".to_string() }).is_err());
        assert!(ExpertSqlService::validate_table_name(&TableNameInput { table_name: "   ".to_string() }).is_err());
    }

    #[tokio::test]
    async fn test_server_info() {
        let service = create_test_service();
        let info = service.get_info();
        assert_eq!(info.server_info.name, "expert-sql-mcp");
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("expert in SQL"));
    }

    #[tokio::test]
    async fn test_all_tools_registered() {
        let service = create_test_service();
        let mut names: Vec<String> = service
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "execute_query",
                "get_all_table_descriptions",
                "get_all_tables",
                "get_database_info",
                "get_table_description",
                "get_table_info",
            ]
        );
    }

    #[tokio::test]
    async fn test_policy_violation_is_tool_error() {
        let service = create_test_service();
        let result = service
            .execute_query(Parameters(QueryInput {
                query: "DELETE FROM users".into(),
            }))
            .await
            .unwrap();
        assert_eq!(result.is_error, Some(true));
        let text = result.content[0].as_text().unwrap().text.clone();
        assert!(text.contains("Only SELECT queries are allowed."));
    }

    #[tokio::test]
    async fn test_missing_catalog_is_tool_error() {
        let service = create_test_service();
        let result = service.get_all_table_descriptions().await.unwrap();
        assert_eq!(result.is_error, Some(true));
    }

    #[tokio::test]
    async fn test_empty_table_name_is_protocol_error() {
        let service = create_test_service();
        let err = service
            .get_table_info(Parameters(TableNameInput {
                table_name: String::new(),
            }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("table_name"));

        let err = service
            .get_table_description(Parameters(TableNameInput {
                table_name: "  ".to_string(),
            }))
            .await
            .unwrap_err();
        assert!(err.message.contains("Invalid input"));
    }
}
