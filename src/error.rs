//! Error types for the Expert SQL MCP server.
//!
//! Every failure the core can produce is a [`DbError`]. The tool dispatcher
//! converts them into a single protocol-visible kind (a tool result flagged
//! as an error) so the agent always sees a readable message.

use std::fmt;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}. {suggestion}")]
    Connection { message: String, suggestion: String },

    #[error("Query rejected: {reason} (query: {query})")]
    PolicyViolation { query: String, reason: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Catalog error ({path}): {message}")]
    Config { path: String, message: String },

    #[error("Query failed: {message} (query: {query})")]
    Execution {
        query: String,
        message: String,
        /// e.g., "42P01" for undefined table
        sql_state: Option<String>,
    },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Stable tag for each error variant, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    PolicyViolation,
    NotFound,
    Config,
    Execution,
    InvalidInput,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::PolicyViolation => "policy_violation",
            Self::NotFound => "not_found",
            Self::Config => "config",
            Self::Execution => "execution",
            Self::InvalidInput => "invalid_input",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a policy violation for a rejected statement.
    pub fn policy_violation(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::PolicyViolation {
            query: query.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create a catalog configuration error for the given file path.
    pub fn config(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an execution error carrying the offending query text.
    pub fn execution(
        query: impl Into<String>,
        message: impl Into<String>,
        sql_state: Option<String>,
    ) -> Self {
        Self::Execution {
            query: query.into(),
            message: message.into(),
            sql_state,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } => ErrorKind::Connection,
            Self::PolicyViolation { .. } => ErrorKind::PolicyViolation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Config { .. } => ErrorKind::Config,
            Self::Execution { .. } => ErrorKind::Execution,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Human-readable message shown to the agent, including SQLSTATE when known.
    pub fn user_message(&self) -> String {
        match self {
            Self::Execution {
                sql_state: Some(code),
                ..
            } => format!("{} (SQLSTATE: {})", self, code),
            _ => self.to_string(),
        }
    }

    /// Classify a driver error raised while running `query`.
    ///
    /// Transport-level failures become [`DbError::Connection`]; everything the
    /// server reported about the statement itself becomes [`DbError::Execution`].
    pub fn from_sqlx(err: sqlx::Error, query: &str) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::execution(query, db_err.message(), code)
            }
            other => match DbError::from(other) {
                DbError::Internal { message } => DbError::execution(query, message, None),
                classified => classified,
            },
        }
    }
}

/// Convert sqlx errors that are not tied to a particular statement.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let message = match db_err.code() {
                    Some(code) => format!("{} (SQLSTATE: {})", db_err.message(), code),
                    None => db_err.message().to_string(),
                };
                DbError::internal(message)
            }
            sqlx::Error::PoolTimedOut => DbError::connection(
                "Timed out waiting for a database connection",
                "Check that the database server is reachable or raise the connect timeout",
            ),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Restart the server")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::AnyDriverError(err) => DbError::connection(
                format!("Driver error: {}", err),
                "Check database driver configuration",
            ),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            other => DbError::internal(other.to_string()),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
