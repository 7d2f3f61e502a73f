//! Bulk inserter (spec §6 "Insert bulk format"): newline-delimited JSON or
//! a JSON array, auto-detected by file extension, chunked into batches of
//! N documents with a configurable conflict strategy.

use std::fs;
use std::path::Path;

use clap::ArgMatches;
use reql::r;
use serde_json::Value;

use super::{run_and_print, Context};

pub async fn dispatch(ctx: &Context, matches: &ArgMatches) -> reql::Result<()> {
  let target = matches.get_one::<String>("target").unwrap();
  let file = matches.get_one::<String>("file").unwrap();
  let conflict = matches.get_one::<String>("conflict").map(String::as_str);
  let batch_size = *matches.get_one::<usize>("batch-size").unwrap();

  let (db, table) = split_target(ctx, target);
  let docs = read_documents(file)?;

  for chunk in docs.chunks(batch_size.max(1)) {
    let array = Value::Array(chunk.to_vec());
    let term = r::db(db.clone()).table_method(table.clone()).insert(array, conflict);
    run_and_print(ctx, &term).await?;
  }
  Ok(())
}

fn split_target(ctx: &Context, target: &str) -> (String, String) {
  match target.split_once('.') {
    Some((db, table)) => (db.to_string(), table.to_string()),
    None => (ctx.default_db.clone().unwrap_or_else(|| "test".to_string()), target.to_string()),
  }
}

fn read_documents(path: &str) -> reql::Result<Vec<Value>> {
  let contents = fs::read_to_string(path)?;
  let is_ndjson = Path::new(path).extension().and_then(|e| e.to_str()) == Some("ndjson")
    || Path::new(path).extension().and_then(|e| e.to_str()) == Some("jsonl");

  if is_ndjson {
    contents
      .lines()
      .filter(|line| !line.trim().is_empty())
      .map(|line| serde_json::from_str(line).map_err(|e| reql::Error::Parse { message: e.to_string(), position: 0 }))
      .collect()
  } else {
    let value: Value =
      serde_json::from_str(&contents).map_err(|e| reql::Error::Parse { message: e.to_string(), position: 0 })?;
    match value {
      Value::Array(items) => Ok(items),
      other => Ok(vec![other]),
    }
  }
}
