//! SQL statement validation for read-only enforcement.
//!
//! The `execute_query` tool only runs statements whose text starts with
//! `SELECT` (case-insensitive, after trimming surrounding whitespace). The
//! check is textual: it does not parse the statement, so a leading comment
//! or a `WITH ... SELECT` is rejected, and a `SELECT` that calls a
//! side-effecting function is let through.
//!
//! Only one statement may be sent. Any `;` followed by something other than
//! whitespace is rejected, including one inside a string literal, since the
//! drivers run every statement of a multi-statement string.

use crate::error::{DbError, DbResult};

const READ_ONLY_PREFIX: &str = "select";

pub const POLICY_MESSAGE: &str = "Only SELECT queries are allowed.";

pub const SINGLE_STATEMENT_MESSAGE: &str = "Only a single SELECT statement is allowed.";

/// Returns `true` if `sql` passes the read-only prefix check.
pub fn is_select(sql: &str) -> bool {
    sql.trim().to_lowercase().starts_with(READ_ONLY_PREFIX)
}

/// Returns `true` if anything other than whitespace follows a `;`.
pub fn has_multiple_statements(sql: &str) -> bool {
    match sql.find(';') {
        Some(idx) => !sql[idx + 1..].trim().is_empty(),
        None => false,
    }
}

/// Validate SQL for read-only execution.
///
/// # Examples
///
/// ```
/// use expert_sql_mcp::tools::sql_validator::validate_readonly;
///
/// assert!(validate_readonly("  select * from users").is_ok());
/// assert!(validate_readonly("DROP TABLE users").is_err());
/// assert!(validate_readonly("SELECT 1; DELETE FROM users").is_err());
/// ```
pub fn validate_readonly(sql: &str) -> DbResult<()> {
    if !is_select(sql) {
        return Err(DbError::policy_violation(sql, POLICY_MESSAGE));
    }
    if has_multiple_statements(sql) {
        return Err(DbError::policy_violation(sql, SINGLE_STATEMENT_MESSAGE));
    }
    Ok(())
}
