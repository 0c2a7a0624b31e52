//! Output formatting for command results.
//!
//! One decoded JSON payload is adapted to three audiences: machine mode
//! (pretty JSON, parser-stable), raw mode (generic JSON or YAML dump), and
//! the per-resource human rendering. An absent payload produces no output.

use std::io::Write;

use serde_json::Value;

use crate::config::{GlobalConfig, RenderMode};
use crate::error::{CommandContext, Error};

/// Renders payloads according to the resolved global configuration.
#[derive(Debug, Clone, Copy)]
pub struct Formatter<'a> {
    config: &'a GlobalConfig,
}

impl<'a> Formatter<'a> {
    /// Formatter for the given configuration.
    #[must_use]
    pub fn new(config: &'a GlobalConfig) -> Self {
        Self { config }
    }

    /// Render `payload` for the command described by `context`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn render<W: Write>(
        &self,
        writer: &mut W,
        context: &CommandContext,
        payload: Option<&Value>,
    ) -> Result<(), Error> {
        let Some(payload) = payload else {
            return Ok(());
        };
        if payload.is_null() {
            return Ok(());
        }

        match self.config.render {
            RenderMode::Machine | RenderMode::Raw => {
                let text = serde_json::to_string_pretty(payload)
                    .map_err(|e| Error::Format(e.to_string()))?;
                writeln!(writer, "{text}")?;
            }
            RenderMode::Yaml => {
                let text =
                    serde_yaml::to_string(payload).map_err(|e| Error::Format(e.to_string()))?;
                write!(writer, "{text}")?;
            }
            RenderMode::Human => self.render_human(writer, context, payload)?,
        }
        Ok(())
    }

    fn render_human<W: Write>(
        &self,
        writer: &mut W,
        context: &CommandContext,
        payload: &Value,
    ) -> Result<(), Error> {
        match context.verb() {
            Some("list") => self.render_list(writer, context, payload),
            _ => self.render_detail(writer, context, payload),
        }
    }

    fn render_list<W: Write>(
        &self,
        writer: &mut W,
        context: &CommandContext,
        payload: &Value,
    ) -> Result<(), Error> {
        let Some(rows) = rows_of(payload) else {
            return render_fallback(writer, payload);
        };
        let resource = context.resource().unwrap_or("resource");

        if rows.is_empty() {
            writeln!(writer, "No {resource}s found")?;
            return Ok(());
        }

        if self.config.verbose {
            for (index, row) in rows.iter().enumerate() {
                if index > 0 {
                    writeln!(writer)?;
                }
                self.render_detail(writer, context, row)?;
            }
            return Ok(());
        }

        let columns = columns_for(resource);
        let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
        let mut cells: Vec<Vec<String>> = Vec::with_capacity(rows.len());
        for row in rows {
            let row_cells: Vec<String> = columns
                .iter()
                .map(|column| cell_text(column, row.get(*column)))
                .collect();
            for (index, cell) in row_cells.iter().enumerate() {
                widths[index] = widths[index].max(cell.len());
            }
            cells.push(row_cells);
        }

        let header: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(column, &width)| format!("{:<width$}", column.to_uppercase()))
            .collect();
        writeln!(writer, "{}", header.join("  "))?;
        let total = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
        writeln!(writer, "{}", "─".repeat(total))?;

        for row_cells in cells {
            let line: Vec<String> = row_cells
                .iter()
                .zip(&widths)
                .map(|(cell, &width)| format!("{cell:<width$}"))
                .collect();
            writeln!(writer, "{}", line.join("  ").trim_end())?;
        }

        writeln!(writer)?;
        writeln!(writer, "Total: {} {resource}(s)", rows.len())?;
        Ok(())
    }

    fn render_detail<W: Write>(
        &self,
        writer: &mut W,
        context: &CommandContext,
        payload: &Value,
    ) -> Result<(), Error> {
        let Value::Object(fields) = payload else {
            return render_fallback(writer, payload);
        };

        if let Some(name) = fields.get("name").and_then(Value::as_str) {
            let resource = context.resource().unwrap_or("resource");
            writeln!(writer, "{} {name}", title(resource))?;
            writeln!(writer, "{}", "═".repeat(34))?;
        }

        for (key, value) in fields {
            if key == "name" {
                continue;
            }
            writeln!(writer, "  {:<16}{}", format!("{key}:"), cell_text(key, Some(value)))?;
        }
        Ok(())
    }
}

/// The list rows of a payload: a bare array, or the first array field.
fn rows_of(payload: &Value) -> Option<&Vec<Value>> {
    match payload {
        Value::Array(rows) => Some(rows),
        Value::Object(map) => map.values().find_map(Value::as_array),
        _ => None,
    }
}

/// Columns shown in non-verbose list tables.
fn columns_for(resource: &str) -> &'static [&'static str] {
    match resource {
        "volume" => &["name", "type", "capacity", "iops", "status"],
        "profile" => &["name", "type", "capacity", "iops"],
        "backup" => &["name", "volume", "size", "created"],
        _ => &["name"],
    }
}

/// Dump a payload with an unexpected shape as pretty JSON.
fn render_fallback<W: Write>(writer: &mut W, payload: &Value) -> Result<(), Error> {
    let text = serde_json::to_string_pretty(payload).map_err(|e| Error::Format(e.to_string()))?;
    writeln!(writer, "{text}")?;
    Ok(())
}

/// Cell text for one field, sizes humanized.
fn cell_text(key: &str, value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "-".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => {
            if matches!(key, "capacity" | "size") {
                number.as_u64().map_or_else(|| number.to_string(), format_bytes)
            } else {
                number.to_string()
            }
        }
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(other) => other.to_string(),
    }
}

/// Human-readable byte size, binary units.
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["KiB", "MiB", "GiB", "TiB", "PiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

/// Capitalized resource name for headings.
fn title(resource: &str) -> String {
    let mut chars = resource.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
