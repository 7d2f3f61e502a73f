//! Environment-variable and password-file resolution (spec §6, §10.6).
//! Kept out of the library: the core honors whatever options it is handed.

use std::fs;
use std::path::Path;

use reql::Result;

pub struct Resolved {
  pub host: String,
  pub port: u16,
  pub user: String,
  pub password: Option<String>,
  pub database: Option<String>,
}

/// Merges, in increasing priority: built-in defaults, `RETHINKDB_*`
/// environment variables, then explicit CLI flags (already applied by the
/// caller before `password`/`password_file` reach here).
pub fn resolve(
  host_flag: &str,
  port_flag: u16,
  user_flag: &str,
  db_flag: Option<&str>,
  password_prompt: bool,
  password_file: Option<&str>,
) -> Result<Resolved> {
  let host = std::env::var("RETHINKDB_HOST").unwrap_or_else(|_| host_flag.to_string());
  let port = std::env::var("RETHINKDB_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(port_flag);
  let user = std::env::var("RETHINKDB_USER").unwrap_or_else(|_| user_flag.to_string());
  let database = db_flag.map(str::to_string).or_else(|| std::env::var("RETHINKDB_DATABASE").ok());

  let password = if let Some(path) = password_file {
    Some(read_password_file(path)?)
  } else if password_prompt {
    Some(prompt_password("Password: ")?)
  } else {
    std::env::var("RETHINKDB_PASSWORD").ok()
  };

  Ok(Resolved { host, port, user, password, database })
}

fn read_password_file(path: &str) -> Result<String> {
  let contents = fs::read_to_string(Path::new(path))?;
  Ok(contents.trim_end_matches(['\n', '\r']).to_string())
}

/// No line-editing dependency is part of the teacher's stack, so a password
/// prompt reads one line from stdin without echo suppression.
pub fn prompt_password(prompt: &str) -> Result<String> {
  use std::io::{self, Write};
  eprint!("{}", prompt);
  io::stderr().flush()?;
  let mut line = String::new();
  io::stdin().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

/// `RUST_LOG`-independent debug toggle: dumps wire frames to stderr when
/// set to `wire` (spec §6).
pub fn wire_debug_enabled() -> bool {
  std::env::var("RETHINKDB_DEBUG").map(|v| v == "wire").unwrap_or(false)
}
