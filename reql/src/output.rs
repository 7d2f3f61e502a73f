//! Streaming output formatters (spec §4.9): JSON / JSONL / raw / aligned
//! table, consuming a [`crate::cursor::Cursor`] lazily. Grounded on
//! `src/sink/stdout.rs`'s `RowEventSink::spawn` streaming-consumer shape;
//! the table algorithm itself has no pack analogue and is spec-original.

use std::io::{self, Write};

use serde_json::Value;

use crate::cursor::Cursor;
use crate::error::Result;

const TABLE_ROW_LIMIT: usize = 10_000;
const TABLE_COLUMN_WIDTH_CAP: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
  Json,
  Jsonl,
  Raw,
  Table,
}

impl std::str::FromStr for Format {
  type Err = String;

  fn from_str(s: &str) -> std::result::Result<Self, String> {
    match s {
      "json" => Ok(Format::Json),
      "jsonl" => Ok(Format::Jsonl),
      "raw" => Ok(Format::Raw),
      "table" => Ok(Format::Table),
      other => Err(format!("unknown output format '{}'", other)),
    }
  }
}

/// `json` for a TTY, `jsonl` otherwise, unless a format was explicitly
/// requested on the command line (spec §4.9 `DetectFormat`).
pub fn detect_format<S: io::IsTerminal>(stdout: &S, flag: Option<Format>) -> Format {
  if let Some(f) = flag {
    return f;
  }
  if stdout.is_terminal() {
    Format::Json
  } else {
    Format::Jsonl
  }
}

/// True iff `NO_COLOR` is set in the environment (spec §4.9 `NoColor`).
pub fn no_color() -> bool {
  std::env::var_os("NO_COLOR").is_some()
}

/// Drains `cursor` through the formatter for `format`, writing to `out`.
pub async fn write_all<W: Write>(cursor: &mut Cursor, format: Format, color: bool, out: &mut W) -> Result<()> {
  match format {
    Format::Jsonl => write_jsonl(cursor, out).await,
    Format::Json => write_json(cursor, color, out).await,
    Format::Raw => write_raw(cursor, out).await,
    Format::Table => write_table(cursor, out).await,
  }
}

/// One compact JSON document per line; never wraps in an array; streams
/// without buffering (spec §4.9, §8 invariant 11).
async fn write_jsonl<W: Write>(cursor: &mut Cursor, out: &mut W) -> Result<()> {
  while let Some(row) = cursor.next().await? {
    let line = serde_json::to_string(&row).unwrap_or_else(|_| row.to_string());
    writeln!(out, "{}", line)?;
  }
  Ok(())
}

/// Peeks two rows: zero → `[]`; exactly one → pretty-print that value;
/// two-or-more → pretty-printed array, 2-space indent (spec §4.9).
async fn write_json<W: Write>(cursor: &mut Cursor, color: bool, out: &mut W) -> Result<()> {
  let first = match cursor.next().await? {
    Some(v) => v,
    None => {
      writeln!(out, "[]")?;
      return Ok(());
    }
  };
  let second = cursor.next().await?;
  let value = match second {
    None => first,
    Some(second) => {
      let mut items = vec![first, second];
      while let Some(v) = cursor.next().await? {
        items.push(v);
      }
      Value::Array(items)
    }
  };
  write_pretty(out, &value, color)?;
  writeln!(out)?;
  Ok(())
}

fn write_pretty<W: Write>(out: &mut W, value: &Value, color: bool) -> Result<()> {
  match serde_json::to_string_pretty(value) {
    Ok(pretty) => {
      if color {
        match colored_json::to_colored_json_auto(value) {
          Ok(colored) => write!(out, "{}", colored)?,
          Err(_) => write!(out, "{}", pretty)?,
        }
      } else {
        write!(out, "{}", pretty)?;
      }
    }
    // Re-indenting an already-valid `Value` practically never fails, but
    // the spec calls for forward progress regardless (spec §4.9).
    Err(_) => out.write_all(value.to_string().as_bytes())?,
  }
  Ok(())
}

/// A row that parses as a string prints unquoted; anything else prints as
/// compact JSON. One line per row (spec §4.9).
async fn write_raw<W: Write>(cursor: &mut Cursor, out: &mut W) -> Result<()> {
  while let Some(row) = cursor.next().await? {
    write_raw_row(out, &row)?;
  }
  Ok(())
}

fn write_raw_row<W: Write>(out: &mut W, row: &Value) -> Result<()> {
  match row {
    Value::String(s) => writeln!(out, "{}", s)?,
    other => writeln!(out, "{}", serde_json::to_string(other).unwrap_or_else(|_| other.to_string()))?,
  }
  Ok(())
}

/// Buffers up to 10 000 rows (a stderr warning and truncation beyond
/// that); falls back to raw if the first row isn't an object; otherwise
/// prints the union of keys in first-seen order with capped, truncated
/// column widths (spec §4.9, §8 invariant 12).
async fn write_table<W: Write>(cursor: &mut Cursor, out: &mut W) -> Result<()> {
  let mut rows = Vec::new();
  let mut truncated = false;
  while let Some(row) = cursor.next().await? {
    if rows.len() >= TABLE_ROW_LIMIT {
      truncated = true;
      // Drain the rest so the cursor/connection isn't left half-read;
      // we've already decided the output is truncated.
      continue;
    }
    rows.push(row);
  }
  if truncated {
    eprintln!("warning: table output truncated at {} rows", TABLE_ROW_LIMIT);
  }

  let first = match rows.first() {
    Some(v) => v,
    None => return Ok(()),
  };
  let Value::Object(_) = first else {
    for row in &rows {
      write_raw_row(out, row)?;
    }
    return Ok(());
  };

  let mut columns = Vec::new();
  for row in &rows {
    if let Value::Object(map) = row {
      for key in map.keys() {
        if !columns.contains(key) {
          columns.push(key.clone());
        }
      }
    }
  }

  let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count().min(TABLE_COLUMN_WIDTH_CAP)).collect();
  let cell_text: Vec<Vec<String>> = rows
    .iter()
    .map(|row| {
      columns
        .iter()
        .map(|col| match row {
          Value::Object(map) => map.get(col).map(cell_value).unwrap_or_default(),
          _ => String::new(),
        })
        .collect()
    })
    .collect();
  for row in &cell_text {
    for (w, cell) in widths.iter_mut().zip(row.iter()) {
      *w = (*w).max(truncate_cell(cell, TABLE_COLUMN_WIDTH_CAP).chars().count());
    }
  }

  let header: Vec<String> = columns
    .iter()
    .zip(&widths)
    .map(|(c, w)| format!("{:width$}", truncate_cell(c, TABLE_COLUMN_WIDTH_CAP), width = w))
    .collect();
  writeln!(out, "{}", header.join(" | "))?;

  let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
  writeln!(out, "{}", separator.join("-+-"))?;

  for row in &cell_text {
    let cells: Vec<String> = row
      .iter()
      .zip(&widths)
      .map(|(cell, w)| format!("{:width$}", truncate_cell(cell, TABLE_COLUMN_WIDTH_CAP), width = w))
      .collect();
    writeln!(out, "{}", cells.join(" | "))?;
  }

  Ok(())
}

fn cell_value(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    other => serde_json::to_string(other).unwrap_or_default(),
  }
}

fn truncate_cell(s: &str, cap: usize) -> String {
  if s.chars().count() <= cap {
    return s.to_string();
  }
  let mut truncated: String = s.chars().take(cap.saturating_sub(1)).collect();
  truncated.push('~');
  truncated
}

#[cfg(test)]
mod test {
  use super::*;
  use std::collections::VecDeque;

  fn sequence_cursor(values: Vec<Value>) -> Cursor {
    Cursor::Sequence(VecDeque::from(values))
  }

  #[tokio::test]
  async fn jsonl_emits_one_line_per_row_without_wrapping() {
    let mut cursor = sequence_cursor(vec![serde_json::json!(1), serde_json::json!(2), serde_json::json!(3)]);
    let mut buf = Vec::new();
    write_all(&mut cursor, Format::Jsonl, false, &mut buf).await.unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert_eq!(text.lines().count(), 3);
    assert_eq!(text.lines().next().unwrap(), "1");
  }

  #[tokio::test]
  async fn json_with_zero_rows_is_empty_array() {
    let mut cursor = sequence_cursor(vec![]);
    let mut buf = Vec::new();
    write_all(&mut cursor, Format::Json, false, &mut buf).await.unwrap();
    assert_eq!(String::from_utf8(buf).unwrap().trim(), "[]");
  }

  #[tokio::test]
  async fn json_with_one_row_prints_the_value_not_an_array() {
    let mut cursor = sequence_cursor(vec![serde_json::json!({"id": 1})]);
    let mut buf = Vec::new();
    write_all(&mut cursor, Format::Json, false, &mut buf).await.unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(!text.trim_start().starts_with('['));
  }

  #[tokio::test]
  async fn json_with_multiple_rows_prints_an_array() {
    let mut cursor = sequence_cursor(vec![serde_json::json!(1), serde_json::json!(2)]);
    let mut buf = Vec::new();
    write_all(&mut cursor, Format::Json, false, &mut buf).await.unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.trim_start().starts_with('['));
  }

  #[tokio::test]
  async fn raw_unquotes_string_rows() {
    let mut cursor = sequence_cursor(vec![serde_json::json!("hello"), serde_json::json!(42)]);
    let mut buf = Vec::new();
    write_all(&mut cursor, Format::Raw, false, &mut buf).await.unwrap();
    let text = String::from_utf8(buf).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next().unwrap(), "hello");
    assert_eq!(lines.next().unwrap(), "42");
  }

  #[tokio::test]
  async fn table_renders_union_of_keys_in_first_seen_order() {
    let mut cursor = sequence_cursor(vec![
      serde_json::json!({"id": 1, "name": "a"}),
      serde_json::json!({"id": 2, "extra": "x"}),
    ]);
    let mut buf = Vec::new();
    write_all(&mut cursor, Format::Table, false, &mut buf).await.unwrap();
    let text = String::from_utf8(buf).unwrap();
    let header = text.lines().next().unwrap();
    assert!(header.starts_with("id"));
    assert!(header.contains("name"));
    assert!(header.contains("extra"));
  }

  #[tokio::test]
  async fn table_falls_back_to_raw_when_first_row_is_not_an_object() {
    let mut cursor = sequence_cursor(vec![serde_json::json!("x"), serde_json::json!("y")]);
    let mut buf = Vec::new();
    write_all(&mut cursor, Format::Table, false, &mut buf).await.unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "x\ny\n");
  }

  #[tokio::test]
  async fn table_truncates_beyond_row_limit() {
    let rows: Vec<Value> = (0..TABLE_ROW_LIMIT + 5).map(|i| serde_json::json!({"n": i})).collect();
    let mut cursor = sequence_cursor(rows);
    let mut buf = Vec::new();
    write_all(&mut cursor, Format::Table, false, &mut buf).await.unwrap();
    let text = String::from_utf8(buf).unwrap();
    // header + separator + TABLE_ROW_LIMIT data rows.
    assert_eq!(text.lines().count(), TABLE_ROW_LIMIT + 2);
  }

  #[test]
  fn truncate_cell_marks_overflow_with_tilde() {
    let long = "x".repeat(60);
    let truncated = truncate_cell(&long, TABLE_COLUMN_WIDTH_CAP);
    assert_eq!(truncated.chars().count(), TABLE_COLUMN_WIDTH_CAP);
    assert!(truncated.ends_with('~'));
  }
}
