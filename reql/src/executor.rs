//! Query dispatch (spec §4.8): builds the wire payload, acquires a
//! connection via the manager, and hands the response to the right cursor
//! flavor. Grounded on `src/pg/conn.rs::query`'s build-send-parse shape,
//! generalized to dispatch through `Connection`/`ConnManager`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::cursor::{BatchCursor, Cursor};
use crate::error::{Error, Result};
use crate::manager::ConnManager;
use crate::response::{self, Outcome};
use crate::term::encode;
use crate::term::kinds::query_type;
use crate::term::Term;

/// The options object carried as the query payload's third element
/// (spec §4.8, §6). Defaults to serializing as `{}`.
#[derive(Default, Clone)]
pub struct QueryOptions {
  pub noreply: bool,
  pub profile: bool,
  /// Any further named options (`db`, `durability`, …) the caller wants
  /// to pass through verbatim; values follow the same term-or-scalar
  /// convention as everywhere else in the term model.
  pub extra: BTreeMap<String, Term>,
}

impl QueryOptions {
  fn to_json(&self) -> Result<Value> {
    let mut map = Map::new();
    if self.noreply {
      map.insert("noreply".to_string(), Value::Bool(true));
    }
    if self.profile {
      map.insert("profile".to_string(), Value::Bool(true));
    }
    for (k, v) in &self.extra {
      map.insert(k.clone(), encode::to_json(v)?);
    }
    Ok(Value::Object(map))
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
  pub id: String,
  pub name: String,
}

pub struct Executor {
  manager: Arc<ConnManager>,
}

impl Executor {
  pub fn new(manager: Arc<ConnManager>) -> Self {
    Executor { manager }
  }

  /// Runs `term` and classifies the response into a cursor (spec §4.8,
  /// §4.7). Returns `None` for a no-reply query or a bare `WAIT_COMPLETE`.
  pub async fn run(&self, term: &Term, opts: QueryOptions) -> Result<Option<Cursor>> {
    let conn = self.manager.get().await?;
    let token = conn.next_token();

    let term_json = encode::to_json(term)?;
    let opts_json = opts.to_json()?;
    let payload = serde_json::to_vec(&serde_json::json!([query_type::START, term_json, opts_json]))
      .map_err(|e| Error::Protocol(e.to_string()))?;

    if opts.noreply {
      conn.write_frame(token, &payload).await?;
      return Ok(None);
    }

    let raw_bytes = conn.send(token, &payload).await?;
    let raw = response::decode(&raw_bytes)?;
    let notes = raw.n.clone();
    match response::classify(raw)? {
      Outcome::Atom(v) => Ok(Some(Cursor::Atom(Some(v)))),
      Outcome::Sequence(items) => Ok(Some(Cursor::Sequence(items.into()))),
      Outcome::Partial(items) => {
        let cursor = BatchCursor::new(conn, token, items);
        if response::feed_kind(&notes).is_some() {
          Ok(Some(Cursor::Changefeed(cursor)))
        } else {
          Ok(Some(Cursor::Stream(cursor)))
        }
      }
      Outcome::WaitComplete => Ok(None),
      Outcome::ServerInfo(_) => Err(Error::Protocol("unexpected SERVER_INFO response to a query".to_string())),
    }
  }

  /// `r.js`-free server identification query (spec §4.8 `ServerInfo`).
  pub async fn server_info(&self) -> Result<ServerInfo> {
    let conn = self.manager.get().await?;
    let token = conn.next_token();
    let payload = serde_json::to_vec(&serde_json::json!([query_type::SERVER_INFO]))
      .map_err(|e| Error::Protocol(e.to_string()))?;
    let raw_bytes = conn.send(token, &payload).await?;
    let raw = response::decode(&raw_bytes)?;
    match response::classify(raw)? {
      Outcome::ServerInfo(v) => serde_json::from_value(v).map_err(|e| Error::Protocol(e.to_string())),
      other => Err(Error::Protocol(format!("expected SERVER_INFO, got {:?}", other))),
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::connection::Connection;
  use crate::options::ConnectionOptions;
  use crate::term::build::r;
  use crate::term::kinds::response_type;
  use std::net::SocketAddr;
  use tokio::io::{duplex, AsyncWriteExt};

  fn frame_bytes(token: u64, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&token.to_le_bytes());
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    out
  }

  #[tokio::test]
  async fn run_dispatches_start_payload_and_classifies_atom() {
    let (a, mut server) = duplex(65536);
    let conn = Arc::new(Connection::from_io(a));
    let manager = Arc::new(ConnManager::new("127.0.0.1:1".parse::<SocketAddr>().unwrap(), ConnectionOptions::default()));
    seed_manager(&manager, conn).await;

    let server_task = tokio::spawn(async move {
      let frame = crate::wire::read_frame(&mut server).await.unwrap();
      let payload: Value = serde_json::from_slice(&frame.body).unwrap();
      assert_eq!(payload[0], query_type::START);
      assert_eq!(payload[2], serde_json::json!({}));
      let body = format!(r#"{{"t":{},"r":[{{"id":1}}]}}"#, response_type::SUCCESS_ATOM);
      server.write_all(&frame_bytes(frame.token, body.as_bytes())).await.unwrap();
    });

    let executor = Executor::new(manager);
    let term = r::table("users").get("1");
    let mut cursor = executor.run(&term, QueryOptions::default()).await.unwrap().unwrap();
    assert_eq!(cursor.next().await.unwrap(), Some(serde_json::json!({"id": 1})));
    assert_eq!(cursor.next().await.unwrap(), None);
    server_task.await.unwrap();
  }

  #[tokio::test]
  async fn noreply_writes_without_waiting_for_a_response() {
    let (a, mut server) = duplex(65536);
    let conn = Arc::new(Connection::from_io(a));
    let manager = Arc::new(ConnManager::new("127.0.0.1:1".parse::<SocketAddr>().unwrap(), ConnectionOptions::default()));
    seed_manager(&manager, conn).await;

    let executor = Executor::new(manager);
    let term = r::table("users").delete();
    let mut opts = QueryOptions::default();
    opts.noreply = true;
    let result = executor.run(&term, opts).await.unwrap();
    assert!(result.is_none());

    let frame = crate::wire::read_frame(&mut server).await.unwrap();
    let payload: Value = serde_json::from_slice(&frame.body).unwrap();
    assert_eq!(payload[2], serde_json::json!({"noreply": true}));
  }

  /// Test-only helper: seeds a manager's slot directly since we can't dial
  /// a real socket in a unit test (mirrors `ConnManager::get`'s shape
  /// without requiring a TCP listener).
  async fn seed_manager(manager: &Arc<ConnManager>, conn: Arc<Connection>) {
    manager.test_seed(conn).await;
  }
}
