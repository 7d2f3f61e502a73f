use std::fs;
use std::io::{self, BufRead, Write};

use clap::ArgMatches;
use reql::parser;

use super::{run_and_print, Context};

/// `query [expr]|--file`: parses the fluent surface syntax and runs it
/// (spec §6, §4.6).
pub async fn query(ctx: &Context, matches: &ArgMatches) -> reql::Result<()> {
  let source = source_text(matches)?;
  for chunk in parser::split_queries(&source) {
    let term = parser::parse(&chunk)?;
    run_and_print(ctx, &term).await?;
  }
  Ok(())
}

/// `run [term]`: takes a raw wire-format term JSON and sends it directly,
/// bypassing the fluent parser (spec §6).
pub async fn run(ctx: &Context, matches: &ArgMatches) -> reql::Result<()> {
  let source = matches.get_one::<String>("term").cloned().unwrap_or_else(|| read_stdin());
  let json: serde_json::Value =
    serde_json::from_str(source.trim()).map_err(|e| reql::Error::Parse { message: e.to_string(), position: 0 })?;
  let term = reql::term::json_value_to_term(json);
  run_and_print(ctx, &term).await
}

pub async fn status(ctx: &Context) -> reql::Result<()> {
  let info = ctx.executor.server_info().await?;
  println!("{{\"id\":\"{}\",\"name\":\"{}\"}}", info.id, info.name);
  Ok(())
}

/// A stdin read-eval-print loop with no history or line-editing — a stand-in
/// loop, per spec's REPL history-file note (spec §6).
pub async fn repl(ctx: &Context) -> reql::Result<()> {
  let history_path = std::env::var("HOME").map(|h| format!("{}/.r-cli_history", h)).ok();
  let stdin = io::stdin();
  print!("> ");
  io::stdout().flush()?;
  for line in stdin.lock().lines() {
    let line = line?;
    if line.trim().is_empty() {
      print!("> ");
      io::stdout().flush()?;
      continue;
    }
    if let Some(path) = &history_path {
      if let Ok(mut f) = fs::OpenOptions::new().create(true).append(true).open(path) {
        let _ = writeln!(f, "{}", line);
      }
    }
    match parser::parse(&line) {
      Ok(term) => {
        if let Err(e) = run_and_print(ctx, &term).await {
          eprintln!("error: {}", e);
        }
      }
      Err(e) => eprintln!("error: {}", e),
    }
    print!("> ");
    io::stdout().flush()?;
  }
  println!();
  Ok(())
}

fn source_text(matches: &ArgMatches) -> reql::Result<String> {
  if let Some(path) = matches.get_one::<String>("file") {
    Ok(fs::read_to_string(path)?)
  } else if let Some(expr) = matches.get_one::<String>("expr") {
    Ok(expr.clone())
  } else {
    Ok(read_stdin())
  }
}

fn read_stdin() -> String {
  use std::io::Read;
  let mut buf = String::new();
  let _ = io::stdin().read_to_string(&mut buf);
  buf
}
