pub mod db;
pub mod index;
pub mod insert;
pub mod misc;
pub mod table;
pub mod user;

use std::io::{self, IsTerminal};

use reql::{Executor, Format};

/// Everything a command handler needs: an executor, the default database
/// (for bare `table`/`index` subcommands), and the chosen output format.
pub struct Context {
  pub executor: Executor,
  pub default_db: Option<String>,
  pub format: Option<Format>,
  pub color: bool,
  pub quiet: bool,
  pub profile: bool,
}

impl Context {
  /// Prints a single yes/no destructive-operation prompt unless `--yes` was
  /// passed; returns `false` if the user declines (spec §6 `--yes/-y`).
  pub fn confirm(&self, assume_yes: bool, prompt: &str) -> bool {
    if assume_yes || self.quiet {
      return true;
    }
    if !io::stdin().is_terminal() {
      return true;
    }
    eprint!("{} [y/N] ", prompt);
    use io::Write;
    let _ = io::stderr().flush();
    let mut line = String::new();
    if io::stdin().read_line(&mut line).is_err() {
      return false;
    }
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
  }
}

/// Runs `term` through the executor and streams the result to stdout in
/// the context's chosen format (spec §4.8/§4.9).
pub async fn run_and_print(ctx: &Context, term: &reql::Term) -> reql::Result<()> {
  let mut opts = reql::QueryOptions::default();
  opts.profile = ctx.profile;
  let cursor = ctx.executor.run(term, opts).await?;
  let stdout = io::stdout();
  let format = reql::output::detect_format(&stdout, ctx.format);
  match cursor {
    Some(mut cursor) => {
      let mut lock = stdout.lock();
      reql::output::write_all(&mut cursor, format, ctx.color, &mut lock).await?;
    }
    None => {}
  }
  Ok(())
}
