//! Catalog data models.
//!
//! Each table in the catalog file is kept as the raw JSON value it was
//! written as. Only an object that carries a string `name` and a string
//! `description` becomes a [`CatalogEntry`]; anything else is incomplete.
//! Entries are returned with every key they were written with.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level shape of the catalog JSON file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogDocument {
    /// `null` and a missing key both mean no tables.
    #[serde(default)]
    pub tables: Option<Vec<CatalogTable>>,
}

impl CatalogDocument {
    pub fn into_tables(self) -> Vec<CatalogTable> {
        self.tables.unwrap_or_default()
    }
}

/// One table as written in the catalog file, possibly incomplete or off-shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct CatalogTable(pub Value);

impl CatalogTable {
    /// The table name, if the entry has a string `name`.
    pub fn name(&self) -> Option<&str> {
        self.0.get("name").and_then(Value::as_str)
    }

    /// Convert into a complete entry, or `None` if name or description is
    /// missing or not a string.
    pub fn into_entry(self) -> Option<CatalogEntry> {
        match self.0 {
            Value::Object(fields) => CatalogEntry::from_fields(fields),
            _ => None,
        }
    }
}

/// A column as shown in markdown output. Read from the entry's `columns`
/// array on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogColumn {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// Curated description of a table, serialized exactly as written in the file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CatalogEntry {
    fields: Map<String, Value>,
}

impl CatalogEntry {
    /// Build an entry from a catalog object. `name` and `description` must be strings.
    pub fn from_fields(fields: Map<String, Value>) -> Option<Self> {
        let complete = fields.get("name").is_some_and(Value::is_string)
            && fields.get("description").is_some_and(Value::is_string);
        complete.then_some(Self { fields })
    }

    pub fn name(&self) -> &str {
        self.str_field("name")
    }

    pub fn description(&self) -> &str {
        self.str_field("description")
    }

    /// Columns listed under `columns`. A missing or non-array value yields none.
    pub fn columns(&self) -> Vec<CatalogColumn> {
        let Some(Value::Array(items)) = self.fields.get("columns") else {
            return Vec::new();
        };
        items
            .iter()
            .map(|item| CatalogColumn {
                name: text_of(item.get("name")),
                description: text_of(item.get("description")),
            })
            .collect()
    }

    /// The entry as written in the catalog file.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn str_field(&self, key: &str) -> &str {
        self.fields.get(key).and_then(Value::as_str).unwrap_or_default()
    }
}

/// Display text of a column attribute. Non-string scalars use their JSON form.
fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogEntryList {
    pub tables: Vec<CatalogEntry>,
}
