//! Result rendering for the CLI
//!
//! Formats a [`QueryResult`] as an aligned text table, JSON, or CSV.

use clap::ValueEnum;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::Table;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::sqlite::QueryResult;

/// Output format for query results
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// Render a query result in the requested format.
pub fn render(result: &QueryResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(result)),
        OutputFormat::Json => render_json(result),
        OutputFormat::Csv => Ok(render_csv(result)),
    }
}

fn render_text(result: &QueryResult) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(&result.columns);
    for row in &result.rows {
        table.add_row(row.values.iter().map(|v| v.as_deref().unwrap_or("")));
    }
    format!("{}\n({} rows)", table, result.row_count)
}

fn render_json(result: &QueryResult) -> Result<String> {
    let rows: Vec<Value> = result
        .rows
        .iter()
        .map(|row| {
            let mut object = Map::new();
            for (column, value) in result.columns.iter().zip(&row.values) {
                object.insert(
                    column.clone(),
                    value.as_deref().map(Value::from).unwrap_or(Value::Null),
                );
            }
            Value::Object(object)
        })
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

fn render_csv(result: &QueryResult) -> String {
    let mut out = String::new();
    let header: Vec<String> = result.columns.iter().map(|c| csv_escape(c)).collect();
    out.push_str(&header.join(","));
    out.push('\n');
    for row in &result.rows {
        let fields: Vec<String> = row
            .values
            .iter()
            .map(|v| csv_escape(v.as_deref().unwrap_or("")))
            .collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

/// Escape a field for CSV output (handles commas, quotes, newlines)
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
