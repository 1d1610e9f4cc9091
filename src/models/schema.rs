//! Schema-related data models.
//!
//! A [`Table`] is rebuilt from live introspection on every call. Column types
//! are reported as a closed set of stable tags ([`ColumnType`]) rather than
//! driver-specific names.

use serde::{Deserialize, Serialize};

/// Names of the base tables visible to the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableList {
    pub tables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    pub name: String,
    /// In the database's native ordinal order.
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub primary_key: bool,
    /// Type as declared in the database, e.g. `varchar(30)`.
    pub native_type: String,
}

impl Column {
    pub fn new(name: impl Into<String>, native_type: impl Into<String>, primary_key: bool) -> Self {
        let native_type = native_type.into();
        Self {
            name: name.into(),
            column_type: ColumnType::from_native(&native_type),
            primary_key,
            native_type,
        }
    }
}

/// Semantic column type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Smallint,
    Integer,
    Bigint,
    Decimal,
    Float,
    Double,
    Boolean,
    Char,
    Varchar,
    Text,
    Date,
    Time,
    Timestamp,
    Interval,
    Binary,
    Json,
    Uuid,
    Array,
    Other,
}

impl ColumnType {
    /// Map a native type declaration from PostgreSQL, MySQL or SQLite.
    ///
    /// Length/precision arguments and modifiers such as `unsigned` or
    /// `with time zone` are ignored. Anything unrecognized maps to `Other`.
    pub fn from_native(native: &str) -> Self {
        let lower = native.trim().to_lowercase();
        if lower.ends_with("[]") || lower.starts_with('_') {
            return Self::Array;
        }
        // MySQL's BOOLEAN is an alias for tinyint(1)
        if lower.starts_with("tinyint(1)") || lower == "bit" || lower.starts_with("bit(1)") {
            return Self::Boolean;
        }

        let mut base = lower.split('(').next().unwrap_or(&lower).trim();
        // Modifiers may be stacked in any order, e.g. `int unsigned zerofill`
        loop {
            let current = base;
            let stripped = ["unsigned", "zerofill", "signed"].iter().find_map(|m| {
                current
                    .strip_suffix(*m)
                    .filter(|rest| rest.ends_with(' '))
            });
            match stripped {
                Some(rest) => base = rest.trim_end(),
                None => break,
            }
        }

        match base {
            "smallint" | "int2" | "tinyint" | "smallserial" | "serial2" => Self::Smallint,
            "integer" | "int" | "int4" | "mediumint" | "serial" | "serial4" | "year" => {
                Self::Integer
            }
            "bigint" | "int8" | "bigserial" | "serial8" => Self::Bigint,
            "decimal" | "numeric" | "money" | "dec" | "fixed" => Self::Decimal,
            "float" | "float4" | "real" => Self::Float,
            "double" | "double precision" | "float8" => Self::Double,
            "boolean" | "bool" => Self::Boolean,
            "char" | "character" | "bpchar" | "nchar" | "native character" => Self::Char,
            "varchar" | "character varying" | "nvarchar" | "varying character"
            | "nvarchar2" | "varchar2" => Self::Varchar,
            "text" | "tinytext" | "mediumtext" | "longtext" | "clob" | "citext" | "name"
            | "enum" | "set" | "string" => Self::Text,
            "date" => Self::Date,
            "time" | "timetz" | "time without time zone" | "time with time zone" => Self::Time,
            "timestamp" | "timestamptz" | "datetime" | "timestamp without time zone"
            | "timestamp with time zone" => Self::Timestamp,
            "interval" => Self::Interval,
            "bytea" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary"
            | "varbinary" => Self::Binary,
            "json" | "jsonb" => Self::Json,
            "uuid" => Self::Uuid,
            _ if base.starts_with("interval") => Self::Interval,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Smallint => "SMALLINT",
            Self::Integer => "INTEGER",
            Self::Bigint => "BIGINT",
            Self::Decimal => "DECIMAL",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::Boolean => "BOOLEAN",
            Self::Char => "CHAR",
            Self::Varchar => "VARCHAR",
            Self::Text => "TEXT",
            Self::Date => "DATE",
            Self::Time => "TIME",
            Self::Timestamp => "TIMESTAMP",
            Self::Interval => "INTERVAL",
            Self::Binary => "BINARY",
            Self::Json => "JSON",
            Self::Uuid => "UUID",
            Self::Array => "ARRAY",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
