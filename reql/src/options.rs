//! Connection configuration, grounded on `src/pg/conn.rs::ConnectionOptions`.
//!
//! Unlike the teacher, this struct never derives `Debug` — the password must
//! never appear in a log line or panic message (spec §8 invariant 2).

use std::fmt;
use std::time::Duration;

#[derive(Clone)]
pub struct ConnectionOptions {
  pub host: String,
  pub port: u16,
  pub user: String,
  pub password: Option<String>,
  pub database: Option<String>,
  pub connect_timeout: Duration,
}

impl Default for ConnectionOptions {
  fn default() -> Self {
    Self {
      host: "localhost".to_string(),
      port: 28015,
      user: "admin".to_string(),
      password: None,
      database: None,
      connect_timeout: Duration::from_secs(20),
    }
  }
}

impl fmt::Debug for ConnectionOptions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ConnectionOptions")
      .field("host", &self.host)
      .field("port", &self.port)
      .field("user", &self.user)
      .field("password", &self.password.as_ref().map(|_| "***"))
      .field("database", &self.database)
      .field("connect_timeout", &self.connect_timeout)
      .finish()
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn debug_never_leaks_password() {
    let opts = ConnectionOptions {
      password: Some("super-secret".to_string()),
      ..Default::default()
    };
    let rendered = format!("{:?}", opts);
    assert!(!rendered.contains("super-secret"));
    assert!(rendered.contains("***"));
  }
}
