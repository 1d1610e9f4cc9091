//! Integration tests for the schema and query tools against an on-disk SQLite database.

use expert_sql_mcp::catalog::MetadataCatalog;
use expert_sql_mcp::db::{ConnectionProvider, QueryExecutor};
use expert_sql_mcp::error::DbError;
use expert_sql_mcp::mcp::{AppContext, ExpertSqlService};
use expert_sql_mcp::models::ColumnType;
use expert_sql_mcp::tools::format::OutputMode;
use expert_sql_mcp::tools::{QueryInput, SchemaToolHandler, TableNameInput};
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::CallToolResult;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email VARCHAR(100),
        active BOOLEAN,
        joined DATE,
        last_login DATETIME,
        score REAL,
        avatar BLOB
    )"#,
    r#"CREATE TABLE orders (
        order_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        total DECIMAL(10,2),
        PRIMARY KEY (order_id, user_id)
    )"#,
    "CREATE VIEW active_users AS SELECT * FROM users WHERE active = 1",
    r#"INSERT INTO users VALUES
        (1, 'Ada', 'ada@example.com', 1, '2024-01-15', '2024-01-15 10:30:00', 9.5, X'616263'),
        (2, 'Bob', NULL, 0, '2024-02-01', '2024-02-01', NULL, NULL)"#,
];

/// Create a populated SQLite file and return its URL. The directory must outlive the test.
async fn setup_db() -> (TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db");
    let url = format!("sqlite:{}", path.display());

    let options = SqliteConnectOptions::from_str(&url)
        .unwrap()
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .unwrap();
    for stmt in SCHEMA {
        sqlx::query(stmt).execute(&pool).await.unwrap();
    }
    pool.close().await;

    (dir, url)
}

fn provider_for(url: &str) -> Arc<ConnectionProvider> {
    Arc::new(ConnectionProvider::from_url(url, Duration::from_secs(5)).unwrap())
}

fn service_for(url: &str, mode: OutputMode) -> ExpertSqlService {
    let ctx = AppContext::new(provider_for(url), MetadataCatalog::new("./no-such-config.json"))
        .with_output_mode(mode);
    ExpertSqlService::new(Arc::new(ctx))
}

fn text_of(result: &CallToolResult) -> String {
    result.content[0].as_text().unwrap().text.clone()
}

#[tokio::test]
async fn test_list_tables_excludes_views() {
    let (_dir, url) = setup_db().await;
    let handler = SchemaToolHandler::new(provider_for(&url));

    let mut tables = handler.list_tables().await.unwrap().tables;
    tables.sort();
    assert_eq!(tables, vec!["orders", "users"]);
}

#[tokio::test]
async fn test_describe_table_columns_and_keys() {
    let (_dir, url) = setup_db().await;
    let handler = SchemaToolHandler::new(provider_for(&url));

    let table = handler.describe_table("users").await.unwrap();
    assert_eq!(table.name, "users");
    let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["id", "name", "email", "active", "joined", "last_login", "score", "avatar"]
    );
    assert!(table.columns[0].primary_key);
    assert!(!table.columns[1].primary_key);
    assert_eq!(table.columns[0].column_type, ColumnType::Integer);
    assert_eq!(table.columns[2].column_type, ColumnType::Varchar);
    assert_eq!(table.columns[3].column_type, ColumnType::Boolean);
    assert_eq!(table.columns[5].column_type, ColumnType::Timestamp);
    assert_eq!(table.columns[7].column_type, ColumnType::Binary);

    let orders = handler.describe_table("orders").await.unwrap();
    let pks: Vec<_> = orders
        .columns
        .iter()
        .filter(|c| c.primary_key)
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(pks, vec!["order_id", "user_id"]);
    assert_eq!(orders.columns[2].column_type, ColumnType::Decimal);
}

#[tokio::test]
async fn test_describe_missing_table_is_not_found() {
    let (_dir, url) = setup_db().await;
    let handler = SchemaToolHandler::new(provider_for(&url));

    let err = handler.describe_table("nonexistent").await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
    assert!(err.to_string().contains("nonexistent"));
}

#[tokio::test]
async fn test_table_name_is_bound_not_spliced() {
    let (_dir, url) = setup_db().await;
    let handler = SchemaToolHandler::new(provider_for(&url));

    let err = handler
        .describe_table("users'); DROP TABLE users; --")
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
    assert!(handler.describe_table("users").await.is_ok());
}

#[tokio::test]
async fn test_select_literal() {
    let (_dir, url) = setup_db().await;
    let executor = QueryExecutor::new(provider_for(&url));

    let result = executor.run("SELECT 1 AS x").await.unwrap();
    assert_eq!(result.columns, vec!["x"]);
    assert_eq!(result.rows, vec![vec!["1".to_string()]]);
}

#[tokio::test]
async fn test_value_normalization() {
    let (_dir, url) = setup_db().await;
    let executor = QueryExecutor::new(provider_for(&url));

    let result = executor
        .run("SELECT id, name, email, active, joined, last_login, score, avatar FROM users ORDER BY id")
        .await
        .unwrap();

    assert_eq!(result.row_count(), 2);
    assert_eq!(
        result.rows[0],
        vec!["1", "Ada", "ada@example.com", "true", "2024-01-15", "2024-01-15T10:30:00", "9.5", "abc"]
    );
    assert_eq!(
        result.rows[1],
        vec!["2", "Bob", "NULL", "false", "2024-02-01", "2024-02-01T00:00:00", "NULL", "NULL"]
    );
}

#[tokio::test]
async fn test_empty_result_keeps_headers() {
    let (_dir, url) = setup_db().await;
    let executor = QueryExecutor::new(provider_for(&url));

    let result = executor
        .run("SELECT id, name FROM users WHERE id > 100")
        .await
        .unwrap();
    assert!(result.is_empty());
    assert_eq!(result.columns, vec!["id", "name"]);
}

#[tokio::test]
async fn test_policy_violation_leaves_data_intact() {
    let (_dir, url) = setup_db().await;
    let executor = QueryExecutor::new(provider_for(&url));

    for sql in ["DROP TABLE users", "DELETE FROM users", "  update users set name = 'x'"] {
        let err = executor.run(sql).await.unwrap_err();
        assert!(matches!(err, DbError::PolicyViolation { .. }), "{sql}");
    }

    let result = executor.run("SELECT COUNT(*) AS n FROM users").await.unwrap();
    assert_eq!(result.rows[0][0], "2");
}

#[tokio::test]
async fn test_stacked_statement_never_runs() {
    let (_dir, url) = setup_db().await;
    let executor = QueryExecutor::new(provider_for(&url));

    let err = executor.run("SELECT 1; DELETE FROM users").await.unwrap_err();
    assert!(matches!(err, DbError::PolicyViolation { .. }));

    let result = executor.run("SELECT COUNT(*) AS n FROM users").await.unwrap();
    assert_eq!(result.rows[0][0], "2");
    // A lone trailing semicolon is still one statement
    assert!(executor.run("SELECT 1;").await.is_ok());
}

#[tokio::test]
async fn test_datetime_in_date_column_keeps_time() {
    let (_dir, url) = setup_db().await;
    let executor = QueryExecutor::new(provider_for(&url));

    let result = executor
        .run("SELECT joined FROM users WHERE id = 1")
        .await
        .unwrap();
    assert_eq!(result.rows[0][0], "2024-01-15");

    // Write through a separate pool; the tool itself only reads
    let pool = sqlx::SqlitePool::connect(&url).await.unwrap();
    sqlx::query("UPDATE users SET joined = '2024-01-15 10:30:00' WHERE id = 2")
        .execute(&pool)
        .await
        .unwrap();
    pool.close().await;

    let result = executor
        .run("SELECT joined FROM users WHERE id = 2")
        .await
        .unwrap();
    assert_eq!(result.rows[0][0], "2024-01-15T10:30:00");
}

/// Emits a row roughly every million recursion steps, so it runs for seconds.
const SLOW_QUERY: &str = "SELECT x FROM (WITH RECURSIVE c(x) AS \
    (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 1000000000) \
    SELECT x FROM c WHERE x % 1000000 = 0)";

#[tokio::test]
async fn test_query_timeout_is_execution_error() {
    let (_dir, url) = setup_db().await;
    // SQLite pools hold a single connection, so the follow-up query only
    // succeeds once the timed-out connection is released.
    let provider = Arc::new(ConnectionProvider::from_url(&url, Duration::from_secs(10)).unwrap());
    let executor = QueryExecutor::with_timeout(provider.clone(), Duration::from_millis(300));

    let err = executor.run(SLOW_QUERY).await.unwrap_err();
    match &err {
        DbError::Execution { query, message, .. } => {
            assert_eq!(query, SLOW_QUERY);
            assert!(message.contains("timeout"), "{message}");
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let result = QueryExecutor::new(provider)
        .run("SELECT COUNT(*) FROM users")
        .await
        .unwrap();
    assert_eq!(result.rows[0][0], "2");
}

#[tokio::test]
async fn test_cancelled_query_releases_connection() {
    let (_dir, url) = setup_db().await;
    let provider = Arc::new(ConnectionProvider::from_url(&url, Duration::from_secs(10)).unwrap());
    let executor = QueryExecutor::new(provider);

    // Dropping the future mid-query stands in for a cancelled tool call
    let cancelled = tokio::time::timeout(Duration::from_millis(300), executor.run(SLOW_QUERY)).await;
    assert!(cancelled.is_err());

    let result = executor.run("SELECT 1 AS x").await.unwrap();
    assert_eq!(result.rows, vec![vec!["1".to_string()]]);
}

#[tokio::test]
async fn test_database_error_is_execution_error() {
    let (_dir, url) = setup_db().await;
    let executor = QueryExecutor::new(provider_for(&url));

    let err = executor.run("SELECT * FROM missing_table").await.unwrap_err();
    match err {
        DbError::Execution { query, message, .. } => {
            assert_eq!(query, "SELECT * FROM missing_table");
            assert!(message.contains("missing_table"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_connection_reused_after_failure() {
    let (_dir, url) = setup_db().await;
    // SQLite pools hold a single connection, so a leaked connection would hang here.
    let executor = QueryExecutor::new(provider_for(&url));

    for _ in 0..5 {
        assert!(executor.run("SELECT nope FROM users").await.is_err());
    }
    assert!(executor.run("SELECT 1").await.is_ok());
}

#[tokio::test]
async fn test_concurrent_queries() {
    let (_dir, url) = setup_db().await;
    let executor = QueryExecutor::new(provider_for(&url));

    let mut handles = Vec::new();
    for i in 0..8 {
        let executor = executor.clone();
        handles.push(tokio::spawn(async move {
            executor.run(&format!("SELECT {} AS n", i)).await
        }));
    }
    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.rows[0][0], i.to_string());
    }
}

#[tokio::test]
async fn test_database_info() {
    let (_dir, url) = setup_db().await;
    let handler = SchemaToolHandler::new(provider_for(&url));

    let info = handler.database_info().await.unwrap();
    assert!(info.version.starts_with('3'));
    assert_eq!(info.database.as_deref(), Some("test.db"));
    assert!(info.user.is_none());
}

#[tokio::test]
async fn test_service_structured_output() {
    let (_dir, url) = setup_db().await;
    let service = service_for(&url, OutputMode::Structured);

    let result = service
        .execute_query(Parameters(QueryInput {
            query: "SELECT name FROM users ORDER BY id".into(),
        }))
        .await
        .unwrap();
    assert_eq!(result.is_error, Some(false));
    let value = result.structured_content.unwrap();
    assert_eq!(value["columns"], serde_json::json!(["name"]));
    assert_eq!(value["rows"], serde_json::json!([["Ada"], ["Bob"]]));

    let info = service
        .get_table_info(Parameters(TableNameInput {
            table_name: "orders".into(),
        }))
        .await
        .unwrap();
    let value = info.structured_content.unwrap();
    assert_eq!(value["name"], "orders");
    assert_eq!(value["columns"][0]["type"], "INTEGER");
    assert_eq!(value["columns"][0]["primary_key"], true);
}

#[tokio::test]
async fn test_service_markdown_output() {
    let (_dir, url) = setup_db().await;
    let service = service_for(&url, OutputMode::Markdown);

    let result = service
        .execute_query(Parameters(QueryInput {
            query: "SELECT id, email FROM users ORDER BY id".into(),
        }))
        .await
        .unwrap();
    assert!(result.structured_content.is_none());
    let text = text_of(&result);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "| id  | email           |");
    assert_eq!(lines[1], "|-----|-----------------|");
    assert_eq!(lines[2], "| 1   | ada@example.com |");
    assert_eq!(lines[3], "| 2   | NULL            |");
    assert_eq!(lines[4], "*2 rows*");

    let empty = service
        .execute_query(Parameters(QueryInput {
            query: "SELECT id FROM users WHERE 0".into(),
        }))
        .await
        .unwrap();
    assert_eq!(text_of(&empty), "Query returned no data.");
}

#[tokio::test]
async fn test_service_errors_are_tool_results() {
    let (_dir, url) = setup_db().await;
    let service = service_for(&url, OutputMode::Structured);

    let missing = service
        .get_table_info(Parameters(TableNameInput {
            table_name: "nonexistent".into(),
        }))
        .await
        .unwrap();
    assert_eq!(missing.is_error, Some(true));
    assert!(text_of(&missing).contains("nonexistent"));

    let rejected = service
        .execute_query(Parameters(QueryInput {
            query: "DROP TABLE users".into(),
        }))
        .await
        .unwrap();
    assert_eq!(rejected.is_error, Some(true));
    assert!(text_of(&rejected).contains("Only SELECT queries are allowed."));

    let failed = service
        .execute_query(Parameters(QueryInput {
            query: "SELECT * FROM missing_table".into(),
        }))
        .await
        .unwrap();
    assert_eq!(failed.is_error, Some(true));
    assert!(text_of(&failed).contains("missing_table"));
}

#[tokio::test]
async fn test_unreachable_database_is_tool_error() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("absent.db").display());
    let service = service_for(&url, OutputMode::Structured);

    let result = service.get_all_tables().await.unwrap();
    assert_eq!(result.is_error, Some(true));
    assert!(text_of(&result).contains("Connection failed"));
}
