//! A client for a document-oriented database's JSON-based wire protocol:
//! wire transport, handshake/authentication, the query term model and its
//! fluent-syntax parser, and the executor/cursor/output pipeline built on
//! top of them.
//!
//! Layout mirrors the teacher's library-crate-plus-thin-binary split
//! (`pg`/`mysql` + `pg2kafka`/`mysql2kafka`): this crate is the library,
//! `reql-cli` is the thin binary consuming it.

pub mod connection;
pub mod cursor;
pub mod error;
pub mod executor;
pub mod handshake;
pub mod manager;
pub mod options;
pub mod output;
pub mod parser;
pub mod response;
pub mod scram;
pub mod term;
pub mod wire;

#[cfg(feature = "ssl")]
pub mod stream;

pub use connection::Connection;
pub use cursor::Cursor;
pub use error::{Error, QueryError, Result};
pub use executor::{Executor, QueryOptions, ServerInfo};
pub use manager::ConnManager;
pub use options::ConnectionOptions;
pub use output::Format;
pub use term::build::r;
pub use term::Term;
