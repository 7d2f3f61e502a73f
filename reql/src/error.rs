/// Exit classes from the CLI's perspective. The library has no notion of
/// signals, so 130 (interrupted) is applied by the binary, not here.
pub const EXIT_OK: i32 = 0;
pub const EXIT_CONNECTION: i32 = 1;
pub const EXIT_QUERY: i32 = 2;
pub const EXIT_AUTH: i32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error("connection closed")]
  Closed,

  #[error("authentication failed (code {error_code}): {message}")]
  Auth { error_code: i32, message: String },

  #[error("handshake failed: {0}")]
  Handshake(String),

  #[error(transparent)]
  Query(#[from] QueryError),

  #[error("parse error at byte {position}: {message}")]
  Parse { message: String, position: usize },

  #[error("builder error: {0}")]
  Builder(String),

  #[error("protocol error: {0}")]
  Protocol(String),

  #[error("cancelled")]
  Cancelled,
}

impl Error {
  pub fn exit_code(&self) -> i32 {
    match self {
      Error::Io(_) | Error::Closed | Error::Handshake(_) | Error::Protocol(_) => EXIT_CONNECTION,
      Error::Auth { .. } => EXIT_AUTH,
      Error::Query(_) | Error::Parse { .. } | Error::Builder(_) => EXIT_QUERY,
      Error::Cancelled => EXIT_CONNECTION,
    }
  }

  pub fn handshake(msg: impl Into<String>) -> Self {
    Error::Handshake(msg.into())
  }

  pub fn builder(msg: impl Into<String>) -> Self {
    Error::Builder(msg.into())
  }
}

/// Server-reported query errors, distinguished by the response's `t`/`e` fields.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
  #[error("client error: {0}")]
  Client(String),

  #[error("compile error: {0}")]
  Compile(String),

  #[error("runtime error: {0}")]
  Runtime(String),

  #[error("non-existence error: {0}")]
  NonExistence(String),

  #[error("permission error: {0}")]
  Permission(String),

  #[error("{0}")]
  Reql(String),
}

pub type Result<T> = std::result::Result<T, Error>;
