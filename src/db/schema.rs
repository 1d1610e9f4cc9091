//! Schema introspection module.
//!
//! Lists the base tables visible to the connection and describes the columns
//! of one table, for SQLite, PostgreSQL, and MySQL.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! database type. Database-specific implementations are in their respective
//! submodules (postgres, mysql, sqlite), each providing the same interface.
//! Table names are always bound as parameters, never spliced into SQL.

use crate::db::pool::DbConnection;
use crate::error::{DbError, DbResult};
use crate::models::{Column, Table};
use tracing::debug;

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// List the base tables of the current database/schema.
    ///
    /// Views and system tables are excluded. Order is whatever the catalog
    /// returns.
    pub async fn list_tables(conn: &mut DbConnection) -> DbResult<Vec<String>> {
        match conn {
            DbConnection::Postgres(c) => postgres::list_tables(c).await,
            DbConnection::MySql(c) => mysql::list_tables(c).await,
            DbConnection::SQLite(c) => sqlite::list_tables(c).await,
        }
    }

    /// Describe a table's columns in ordinal order.
    ///
    /// A table with no visible columns is reported as not found.
    pub async fn describe_table(conn: &mut DbConnection, table_name: &str) -> DbResult<Table> {
        let columns = match conn {
            DbConnection::Postgres(c) => postgres::fetch_columns(c, table_name).await?,
            DbConnection::MySql(c) => mysql::fetch_columns(c, table_name).await?,
            DbConnection::SQLite(c) => sqlite::fetch_columns(c, table_name).await?,
        };

        if columns.is_empty() {
            return Err(DbError::not_found(format!(
                "Table '{}' not found",
                table_name
            )));
        }

        debug!(table = table_name, columns = columns.len(), "Described table");
        Ok(Table {
            name: table_name.to_string(),
            columns,
        })
    }
}

// =============================================================================
// SQL Query Templates
// =============================================================================

mod queries {
    pub mod postgres {
        pub const LIST_TABLES: &str = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = current_schema()
            AND table_type = 'BASE TABLE'
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            a.attname::text AS column_name,
            format_type(a.atttypid, a.atttypmod) AS column_type,
            EXISTS (
                SELECT 1 FROM pg_index i
                WHERE i.indrelid = c.oid
                AND i.indisprimary
                AND a.attnum = ANY(i.indkey)
            ) AS is_primary_key
        FROM pg_class c
        JOIN pg_namespace n ON n.oid = c.relnamespace
        JOIN pg_attribute a ON a.attrelid = c.oid
        WHERE c.relname = $1
        AND n.nspname = current_schema()
        AND c.relkind IN ('r', 'p', 'v', 'm', 'f')
        AND a.attnum > 0
        AND NOT a.attisdropped
        ORDER BY a.attnum
        "#;
    }

    pub mod mysql {
        pub const LIST_TABLES: &str = r#"
            SELECT CONVERT(TABLE_NAME USING utf8) AS TABLE_NAME
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE()
            AND TABLE_TYPE = 'BASE TABLE'
            "#;

        pub const DESCRIBE_COLUMNS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8) AS COLUMN_NAME,
            CONVERT(COLUMN_TYPE USING utf8) AS COLUMN_TYPE,
            CONVERT(COLUMN_KEY USING utf8) AS COLUMN_KEY
        FROM information_schema.COLUMNS
        WHERE TABLE_NAME = ? AND TABLE_SCHEMA = DATABASE()
        ORDER BY ORDINAL_POSITION
        "#;
    }

    pub mod sqlite {
        pub const LIST_TABLES: &str = r#"
            SELECT name FROM sqlite_master
            WHERE type = 'table'
            AND name NOT LIKE 'sqlite_%'
            "#;

        pub const DESCRIBE_COLUMNS: &str = "SELECT name, type, pk FROM pragma_table_info(?)";
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================

mod postgres {
    use super::*;
    use sqlx::{PgConnection, Row};

    pub async fn list_tables(conn: &mut PgConnection) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::postgres::LIST_TABLES)
            .fetch_all(&mut *conn)
            .await?;

        let tables = rows
            .iter()
            .map(|row| row.try_get::<String, _>("table_name"))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = tables.len(), "Listed PostgreSQL tables");
        Ok(tables)
    }

    pub async fn fetch_columns(conn: &mut PgConnection, table_name: &str) -> DbResult<Vec<Column>> {
        let rows = sqlx::query(queries::postgres::DESCRIBE_COLUMNS)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        rows.iter()
            .map(|row| {
                let name: String = row.try_get("column_name")?;
                let column_type: String = row.try_get("column_type")?;
                let is_pk: bool = row.try_get("is_primary_key")?;
                Ok(Column::new(name, column_type, is_pk))
            })
            .collect()
    }
}

mod mysql {
    use super::*;
    use sqlx::mysql::MySqlRow;
    use sqlx::{MySqlConnection, Row};

    /// Safely get a string from a MySQL row.
    /// MySQL may return VARBINARY instead of VARCHAR depending on charset configuration.
    fn get_string(row: &MySqlRow, column: &str) -> String {
        row.try_get::<String, _>(column)
            .ok()
            .or_else(|| {
                row.try_get::<Vec<u8>, _>(column)
                    .ok()
                    .and_then(|bytes| String::from_utf8(bytes).ok())
            })
            .unwrap_or_default()
    }

    pub async fn list_tables(conn: &mut MySqlConnection) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::mysql::LIST_TABLES)
            .fetch_all(&mut *conn)
            .await?;

        let tables = rows
            .iter()
            .map(|row| get_string(row, "TABLE_NAME"))
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>();

        debug!(count = tables.len(), "Listed MySQL tables");
        Ok(tables)
    }

    pub async fn fetch_columns(
        conn: &mut MySqlConnection,
        table_name: &str,
    ) -> DbResult<Vec<Column>> {
        let rows = sqlx::query(queries::mysql::DESCRIBE_COLUMNS)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let name = get_string(row, "COLUMN_NAME");
                let column_type = get_string(row, "COLUMN_TYPE");
                let is_pk = get_string(row, "COLUMN_KEY") == "PRI";
                Column::new(name, column_type, is_pk)
            })
            .collect())
    }
}

mod sqlite {
    use super::*;
    use sqlx::{Row, SqliteConnection};

    pub async fn list_tables(conn: &mut SqliteConnection) -> DbResult<Vec<String>> {
        let rows = sqlx::query(queries::sqlite::LIST_TABLES)
            .fetch_all(&mut *conn)
            .await?;

        let tables = rows
            .iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = tables.len(), "Listed SQLite tables");
        Ok(tables)
    }

    pub async fn fetch_columns(
        conn: &mut SqliteConnection,
        table_name: &str,
    ) -> DbResult<Vec<Column>> {
        let rows = sqlx::query(queries::sqlite::DESCRIBE_COLUMNS)
            .bind(table_name)
            .fetch_all(&mut *conn)
            .await?;

        rows.iter()
            .map(|row| {
                let name: String = row.try_get("name")?;
                // Untyped columns have an empty declared type.
                let data_type: Option<String> = row.try_get("type")?;
                let pk: i64 = row.try_get("pk")?;
                Ok(Column::new(name, data_type.unwrap_or_default(), pk > 0))
            })
            .collect()
    }
}
