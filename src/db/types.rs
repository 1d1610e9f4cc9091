//! Result value normalization.
//!
//! Every cell of a query result is rendered as a string. Type conversion
//! uses a two-phase approach:
//! 1. `TypeCategory` classifies the column's driver type into a logical category
//! 2. Database-specific decoders extract a [`SqlValue`] for that category
//!
//! PostgreSQL and MySQL queries run over the text protocol, so most values
//! are taken verbatim. Only the categories whose textual form needs
//! normalizing (booleans, temporal values, binary) are decoded into typed
//! values first. SQLite values are read according to their runtime
//! storage class.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use sqlx::mysql::MySqlRow;
use sqlx::postgres::PgRow;
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row, TypeInfo};

/// Rendering of SQL `NULL`.
pub const NULL_TEXT: &str = "NULL";

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Boolean,
    Date,
    Time,
    DateTime,
    DateTimeTz,
    Binary,
    Text,
}

/// Classify a driver type name into a logical category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let upper = type_name.trim().to_uppercase();
    if upper.ends_with("[]") {
        return TypeCategory::Text;
    }
    match upper.as_str() {
        "BOOL" | "BOOLEAN" => TypeCategory::Boolean,
        "DATE" => TypeCategory::Date,
        "TIME" => TypeCategory::Time,
        "TIMESTAMP" | "DATETIME" => TypeCategory::DateTime,
        "TIMESTAMPTZ" => TypeCategory::DateTimeTz,
        "BYTEA" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
            TypeCategory::Binary
        }
        _ => TypeCategory::Text,
    }
}

// =============================================================================
// Normalized Values
// =============================================================================

/// A decoded cell before it is rendered as text.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeTz(DateTime<FixedOffset>),
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Render the value the way it appears in a query result.
    ///
    /// Dates and timestamps use ISO-8601 (`2024-01-31`, `2024-01-31T13:45:00`),
    /// binary data is shown as UTF-8 when valid and base64 otherwise.
    pub fn into_text(self) -> String {
        match self {
            Self::Null => NULL_TEXT.to_string(),
            Self::Text(s) => s,
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format_float(f),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Time(t) => t.format("%H:%M:%S%.f").to_string(),
            Self::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            Self::DateTimeTz(dt) => dt.to_rfc3339(),
            Self::Bytes(bytes) => match String::from_utf8(bytes) {
                Ok(s) => s,
                Err(e) => STANDARD.encode(e.as_bytes()),
            },
        }
    }
}

/// Integral floats keep a trailing `.0` so they stay distinguishable from integers.
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

/// Parse the textual temporal formats SQLite applications commonly store.
pub fn parse_temporal_text(text: &str, category: TypeCategory) -> Option<SqlValue> {
    let s = text.trim();
    match category {
        // A full timestamp stored in a DATE column keeps its time part
        TypeCategory::Date => parse_date(s)
            .map(SqlValue::Date)
            .or_else(|| parse_datetime(s).map(SqlValue::DateTime)),
        TypeCategory::Time => parse_time(s).map(SqlValue::Time),
        TypeCategory::DateTime | TypeCategory::DateTimeTz => parse_datetime_tz(s)
            .map(SqlValue::DateTimeTz)
            .or_else(|| parse_datetime(s).map(SqlValue::DateTime))
            .or_else(|| {
                // A date-only value in a timestamp column means midnight
                parse_date(s).map(|d| SqlValue::DateTime(d.and_time(NaiveTime::MIN)))
            }),
        _ => None,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn parse_datetime_tz(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%#z"]
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(s, fmt).ok())
}

// =============================================================================
// Row Decoding
// =============================================================================

/// Trait for converting database rows into normalized string cells.
pub trait RowToText {
    fn column_names(&self) -> Vec<String>;
    fn to_text_cells(&self) -> Vec<String>;
}

impl RowToText for MySqlRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_text_cells(&self) -> Vec<String> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name());
                mysql::decode_column(self, idx, category).into_text()
            })
            .collect()
    }
}

impl RowToText for PgRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_text_cells(&self) -> Vec<String> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name());
                postgres::decode_column(self, idx, category).into_text()
            })
            .collect()
    }
}

impl RowToText for SqliteRow {
    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.name().to_string()).collect()
    }

    fn to_text_cells(&self) -> Vec<String> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let category = categorize_type(col.type_info().name());
                sqlite::decode_column(self, idx, category).into_text()
            })
            .collect()
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> SqlValue {
        let typed = match category {
            TypeCategory::Boolean => row
                .try_get::<Option<bool>, _>(idx)
                .map(|v| v.map(SqlValue::Bool)),
            TypeCategory::Date => row
                .try_get::<Option<NaiveDate>, _>(idx)
                .map(|v| v.map(SqlValue::Date)),
            TypeCategory::Time => row
                .try_get::<Option<NaiveTime>, _>(idx)
                .map(|v| v.map(SqlValue::Time)),
            TypeCategory::DateTime | TypeCategory::DateTimeTz => row
                .try_get::<Option<NaiveDateTime>, _>(idx)
                .map(|v| v.map(SqlValue::DateTime)),
            TypeCategory::Binary => row
                .try_get_unchecked::<Option<Vec<u8>>, _>(idx)
                .map(|v| v.map(SqlValue::Bytes)),
            TypeCategory::Text => return decode_text(row, idx),
        };
        match typed {
            Ok(Some(v)) => v,
            Ok(None) => SqlValue::Null,
            // Values chrono cannot represent, e.g. zero dates or negative TIME
            Err(_) => decode_text(row, idx),
        }
    }

    fn decode_text(row: &MySqlRow, idx: usize) -> SqlValue {
        match row.try_get_unchecked::<Option<String>, _>(idx) {
            Ok(Some(s)) => SqlValue::Text(s),
            Ok(None) => SqlValue::Null,
            Err(_) => row
                .try_get_unchecked::<Option<Vec<u8>>, _>(idx)
                .ok()
                .flatten()
                .map(SqlValue::Bytes)
                .unwrap_or(SqlValue::Null),
        }
    }
}

mod postgres {
    use super::*;
    use chrono::Utc;

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> SqlValue {
        let typed = match category {
            TypeCategory::Boolean => row
                .try_get::<Option<bool>, _>(idx)
                .map(|v| v.map(SqlValue::Bool)),
            TypeCategory::Date => row
                .try_get::<Option<NaiveDate>, _>(idx)
                .map(|v| v.map(SqlValue::Date)),
            TypeCategory::Time => row
                .try_get::<Option<NaiveTime>, _>(idx)
                .map(|v| v.map(SqlValue::Time)),
            TypeCategory::DateTime => row
                .try_get::<Option<NaiveDateTime>, _>(idx)
                .map(|v| v.map(SqlValue::DateTime)),
            TypeCategory::DateTimeTz => row
                .try_get::<Option<DateTime<Utc>>, _>(idx)
                .map(|v| v.map(|dt| SqlValue::DateTimeTz(dt.into()))),
            TypeCategory::Binary => row
                .try_get::<Option<Vec<u8>>, _>(idx)
                .map(|v| v.map(SqlValue::Bytes)),
            TypeCategory::Text => return decode_text(row, idx),
        };
        match typed {
            Ok(Some(v)) => v,
            Ok(None) => SqlValue::Null,
            // e.g. 'infinity' timestamps
            Err(_) => decode_text(row, idx),
        }
    }

    fn decode_text(row: &PgRow, idx: usize) -> SqlValue {
        row.try_get_unchecked::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .map(SqlValue::Text)
            .unwrap_or(SqlValue::Null)
    }
}

mod sqlite {
    use super::*;
    use sqlx::ValueRef;

    pub fn decode_column(row: &SqliteRow, idx: usize, category: TypeCategory) -> SqlValue {
        let storage = match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => return SqlValue::Null,
            Ok(raw) => raw.type_info().name().to_string(),
            Err(_) => return SqlValue::Null,
        };

        match storage.as_str() {
            "INTEGER" => match row.try_get_unchecked::<i64, _>(idx) {
                Ok(v) if category == TypeCategory::Boolean => SqlValue::Bool(v != 0),
                Ok(v) => SqlValue::Int(v),
                Err(_) => SqlValue::Null,
            },
            "REAL" => row
                .try_get_unchecked::<f64, _>(idx)
                .map(SqlValue::Float)
                .unwrap_or(SqlValue::Null),
            "BLOB" => row
                .try_get_unchecked::<Vec<u8>, _>(idx)
                .map(SqlValue::Bytes)
                .unwrap_or(SqlValue::Null),
            _ => match row.try_get_unchecked::<String, _>(idx) {
                Ok(text) => parse_temporal_text(&text, category).unwrap_or(SqlValue::Text(text)),
                Err(_) => SqlValue::Null,
            },
        }
    }
}
