//! Query execution engine.
//!
//! Runs one read-only statement on a freshly acquired connection and returns
//! a [`QueryResult`] whose cells are already normalized to text.
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific fetch
//! - `postgres`: PostgreSQL-specific fetch
//! - `sqlite`: SQLite-specific fetch
//!
//! Each submodule provides identical functionality adapted to the database's
//! row type. Statements are sent as raw SQL, without prepared parameters.

use crate::config::DEFAULT_QUERY_TIMEOUT_SECS;
use crate::db::pool::{ConnectionProvider, DbConnection};
use crate::db::types::RowToText;
use crate::error::{DbError, DbResult};
use crate::models::QueryResult;
use crate::tools::sql_validator;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Query executor that enforces the read-only policy and a per-query timeout.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    provider: Arc<ConnectionProvider>,
    query_timeout: Duration,
}

impl QueryExecutor {
    pub fn new(provider: Arc<ConnectionProvider>) -> Self {
        Self::with_timeout(provider, Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS))
    }

    pub fn with_timeout(provider: Arc<ConnectionProvider>, query_timeout: Duration) -> Self {
        Self {
            provider,
            query_timeout,
        }
    }

    pub fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Execute a SELECT statement and return normalized results.
    ///
    /// The policy check runs before a connection is acquired, so a rejected
    /// statement never reaches the database.
    pub async fn run(&self, sql: &str) -> DbResult<QueryResult> {
        sql_validator::validate_readonly(sql)?;

        let start = Instant::now();
        let mut conn = self.provider.acquire().await?;

        debug!(
            sql = %sql,
            timeout_secs = self.query_timeout.as_secs(),
            "Executing query"
        );

        let outcome = match &mut conn {
            DbConnection::MySql(c) => timeout(self.query_timeout, mysql::fetch(c, sql)).await,
            DbConnection::Postgres(c) => {
                timeout(self.query_timeout, postgres::fetch(c, sql)).await
            }
            DbConnection::SQLite(c) => timeout(self.query_timeout, sqlite::fetch(c, sql)).await,
        };

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => return Err(DbError::from_sqlx(e, sql)),
            Err(_) => {
                // The statement may still be running server-side
                conn.close_on_drop();
                warn!(
                    timeout_secs = self.query_timeout.as_secs(),
                    "Query timed out"
                );
                return Err(DbError::execution(
                    sql,
                    format!(
                        "Query exceeded {} second timeout",
                        self.query_timeout.as_secs()
                    ),
                    None,
                ));
            }
        };

        check_shape(&result, sql)?;

        debug!(
            rows = result.row_count(),
            columns = result.columns.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query completed"
        );
        Ok(result)
    }
}

/// Every row must have exactly one cell per column.
fn check_shape(result: &QueryResult, sql: &str) -> DbResult<()> {
    let width = result.columns.len();
    match result.rows.iter().position(|row| row.len() != width) {
        Some(idx) => Err(DbError::execution(
            sql,
            format!(
                "Row {} has {} values but the result has {} columns",
                idx,
                result.rows[idx].len(),
                width
            ),
            None,
        )),
        None => Ok(()),
    }
}

// =============================================================================
// Common Helper Functions
// =============================================================================

fn collect_rows<R>(results: Vec<Result<R, sqlx::Error>>) -> Result<Vec<R>, sqlx::Error> {
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result?);
    }
    Ok(rows)
}

/// Build the result, taking headers from the first row when there is one.
fn to_result<R: RowToText>(rows: Vec<R>, described: Vec<String>) -> QueryResult {
    let columns = match rows.first() {
        Some(first) => first.column_names(),
        None => described,
    };
    let rows = rows.iter().map(RowToText::to_text_cells).collect();
    QueryResult::new(columns, rows)
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// The code structure is intentionally parallel to make differences obvious.

mod mysql {
    use super::*;
    use sqlx::mysql::MySqlRow;
    use sqlx::{Column, Executor, MySqlConnection};

    pub async fn fetch(conn: &mut MySqlConnection, sql: &str) -> Result<QueryResult, sqlx::Error> {
        let results = (&mut *conn).fetch(sql).collect::<Vec<_>>().await;
        let rows: Vec<MySqlRow> = collect_rows(results)?;

        let described = if rows.is_empty() {
            match (&mut *conn).describe(sql).await {
                Ok(d) => d.columns().iter().map(|c| c.name().to_string()).collect(),
                Err(e) => {
                    warn!(error = %e, "Could not describe empty result");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Ok(to_result(rows, described))
    }
}

mod postgres {
    use super::*;
    use sqlx::postgres::PgRow;
    use sqlx::{Column, Executor, PgConnection};

    pub async fn fetch(conn: &mut PgConnection, sql: &str) -> Result<QueryResult, sqlx::Error> {
        let results = (&mut *conn).fetch(sql).collect::<Vec<_>>().await;
        let rows: Vec<PgRow> = collect_rows(results)?;

        let described = if rows.is_empty() {
            match (&mut *conn).describe(sql).await {
                Ok(d) => d.columns().iter().map(|c| c.name().to_string()).collect(),
                Err(e) => {
                    warn!(error = %e, "Could not describe empty result");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Ok(to_result(rows, described))
    }
}

mod sqlite {
    use super::*;
    use sqlx::sqlite::SqliteRow;
    use sqlx::{Column, Executor, SqliteConnection};

    pub async fn fetch(
        conn: &mut SqliteConnection,
        sql: &str,
    ) -> Result<QueryResult, sqlx::Error> {
        let results = (&mut *conn).fetch(sql).collect::<Vec<_>>().await;
        let rows: Vec<SqliteRow> = collect_rows(results)?;

        let described = if rows.is_empty() {
            match (&mut *conn).describe(sql).await {
                Ok(d) => d.columns().iter().map(|c| c.name().to_string()).collect(),
                Err(e) => {
                    warn!(error = %e, "Could not describe empty result");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Ok(to_result(rows, described))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_shape_accepts_rectangular() {
        let result = QueryResult::new(
            vec!["a".into(), "b".into()],
            vec![vec!["1".into(), "2".into()], vec!["3".into(), "4".into()]],
        );
        assert!(check_shape(&result, "SELECT a, b FROM t").is_ok());
    }

    #[test]
    fn test_check_shape_rejects_ragged() {
        let result = QueryResult::new(
            vec!["a".into(), "b".into()],
            vec![vec!["1".into(), "2".into()], vec!["3".into()]],
        );
        let err = check_shape(&result, "SELECT a, b FROM t").unwrap_err();
        assert!(matches!(err, DbError::Execution { .. }));
    }

    #[tokio::test]
    async fn test_policy_checked_before_acquire() {
        // Nothing listens here; a connection attempt would surface as a Connection error.
        let provider = Arc::new(
            ConnectionProvider::from_url("postgres://u:p@127.0.0.1:1/db", Duration::from_secs(1))
                .unwrap(),
        );
        let executor = QueryExecutor::new(provider);
        let err = executor.run("DROP TABLE users").await.unwrap_err();
        assert!(matches!(err, DbError::PolicyViolation { .. }));
    }

    #[tokio::test]
    async fn test_default_timeout() {
        let provider = Arc::new(
            ConnectionProvider::from_url("postgres://u:p@127.0.0.1:1/db", Duration::from_secs(1))
                .unwrap(),
        );
        let executor = QueryExecutor::new(provider);
        assert_eq!(
            executor.query_timeout(),
            Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS)
        );
    }
}
