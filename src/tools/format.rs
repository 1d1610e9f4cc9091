//! Output formatting utilities for MCP tools.
//!
//! Every tool result is rendered in one of two modes. `structured` returns the
//! entity as MCP structured content; `markdown` returns a GitHub-flavored
//! markdown rendering as text.

use crate::models::{CatalogEntry, CatalogEntryList, DatabaseInfo, QueryResult, Table, TableList};
use rmcp::model::{CallToolResult, Content};
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

/// Presentation of tool results.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// JSON structured content (default)
    #[default]
    Structured,
    /// Markdown text
    Markdown,
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputMode::Structured => f.write_str("structured"),
            OutputMode::Markdown => f.write_str("markdown"),
        }
    }
}

/// Markdown rendering of a tool output entity.
pub trait Render {
    fn to_markdown(&self) -> String;
}

/// Render a successful tool output in the requested mode.
pub fn render<T>(value: &T, mode: OutputMode) -> Result<CallToolResult, serde_json::Error>
where
    T: Serialize + Render,
{
    match mode {
        OutputMode::Structured => Ok(CallToolResult::structured(serde_json::to_value(value)?)),
        OutputMode::Markdown => Ok(CallToolResult::success(vec![Content::text(
            value.to_markdown(),
        )])),
    }
}

/// Make cell text safe inside a markdown table row.
pub fn escape_cell(value: &str) -> String {
    value
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
        .replace('|', "\\|")
}

/// Format a GFM table. Cells are padded to a common display width per column.
pub fn markdown_table<H: AsRef<str>>(headers: &[H], rows: &[Vec<String>]) -> String {
    let headers: Vec<String> = headers.iter().map(|h| escape_cell(h.as_ref())).collect();
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|c| escape_cell(c)).collect())
        .collect();

    // The separator needs at least three dashes.
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width().max(3)).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.width());
            }
        }
    }

    let mut output = String::new();
    output.push_str(&format_row(&headers, &widths));
    let sep: String = widths
        .iter()
        .map(|w| format!("|{}", "-".repeat(w + 2)))
        .collect::<String>()
        + "|\n";
    output.push_str(&sep);
    for row in &rows {
        output.push_str(&format_row(row, &widths));
    }
    output
}

fn format_row(cells: &[String], widths: &[usize]) -> String {
    widths
        .iter()
        .enumerate()
        .map(|(i, w)| {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            // `{:<width$}` pads by char count, not display width
            let pad = w.saturating_sub(cell.width());
            format!("| {}{} ", cell, " ".repeat(pad))
        })
        .collect::<String>()
        + "|\n"
}

fn row_count_line(count: usize) -> String {
    let noun = if count == 1 { "row" } else { "rows" };
    format!("*{} {}*", count, noun)
}

impl Render for TableList {
    fn to_markdown(&self) -> String {
        if self.tables.is_empty() {
            return "No tables found.".to_string();
        }
        let rows: Vec<Vec<String>> = self.tables.iter().map(|t| vec![t.clone()]).collect();
        format!(
            "{}\n{}",
            markdown_table(&["Table"], &rows),
            row_count_line(self.tables.len())
        )
    }
}

impl Render for Table {
    fn to_markdown(&self) -> String {
        let rows: Vec<Vec<String>> = self
            .columns
            .iter()
            .map(|c| {
                vec![
                    c.name.clone(),
                    c.column_type.to_string(),
                    if c.primary_key { "yes" } else { "" }.to_string(),
                    c.native_type.clone(),
                ]
            })
            .collect();
        format!(
            "### {}\n\n{}",
            escape_cell(&self.name),
            markdown_table(&["Column", "Type", "Primary Key", "Native Type"], &rows)
        )
    }
}

impl Render for CatalogEntry {
    fn to_markdown(&self) -> String {
        let mut output = format!(
            "### {}\n\n{}\n",
            escape_cell(self.name()),
            self.description()
        );
        let columns = self.columns();
        if !columns.is_empty() {
            let rows: Vec<Vec<String>> = columns
                .into_iter()
                .map(|c| {
                    vec![
                        c.name.unwrap_or_default(),
                        c.description.unwrap_or_default(),
                    ]
                })
                .collect();
            output.push('\n');
            output.push_str(&markdown_table(&["Column", "Description"], &rows));
        }
        output
    }
}

impl Render for CatalogEntryList {
    fn to_markdown(&self) -> String {
        if self.tables.is_empty() {
            return "No complete table descriptions found.".to_string();
        }
        self.tables
            .iter()
            .map(Render::to_markdown)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Render for QueryResult {
    fn to_markdown(&self) -> String {
        if self.is_empty() {
            return "Query returned no data.".to_string();
        }
        format!(
            "{}\n{}",
            markdown_table(&self.columns, &self.rows),
            row_count_line(self.row_count())
        )
    }
}

impl Render for DatabaseInfo {
    fn to_markdown(&self) -> String {
        let mut rows = vec![
            vec!["Dialect".to_string(), self.dialect.display_name().to_string()],
            vec!["Version".to_string(), self.version.clone()],
        ];
        if let Some(database) = &self.database {
            rows.push(vec!["Database".to_string(), database.clone()]);
        }
        if let Some(host) = &self.host {
            rows.push(vec!["Host".to_string(), host.clone()]);
        }
        if let Some(user) = &self.user {
            rows.push(vec!["User".to_string(), user.clone()]);
        }
        markdown_table(&["Property", "Value"], &rows)
    }
}
