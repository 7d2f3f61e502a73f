//! Forward-only row streams over a running query (spec §3 "Cursor", §4.7).
//!
//! Stream/changefeed cursors hold the current batch and, once drained,
//! fetch the next one via a background `CONTINUE` task so `next` never
//! blocks holding any cursor-internal state across the wire round trip
//! (spec §9 "Coroutine control flow").

use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::Value;

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::response::{self, Outcome};
use crate::term::kinds::query_type;

/// A forward-only result stream (spec §3 "Cursor").
pub enum Cursor {
  /// A single pre-computed row (`SUCCESS_ATOM`).
  Atom(Option<Value>),
  /// A pre-materialized finite slice (`SUCCESS_SEQUENCE`).
  Sequence(VecDeque<Value>),
  /// Current batch plus a `CONTINUE`/`STOP` handle; terminates on the next
  /// `SUCCESS_SEQUENCE`.
  Stream(BatchCursor),
  /// Like `Stream` but infinite; closes only on explicit `Close` or error.
  Changefeed(BatchCursor),
}

impl Cursor {
  pub async fn next(&mut self) -> Result<Option<Value>> {
    match self {
      Cursor::Atom(slot) => Ok(slot.take()),
      Cursor::Sequence(buf) => Ok(buf.pop_front()),
      Cursor::Stream(c) | Cursor::Changefeed(c) => c.next().await,
    }
  }

  /// Idempotent on stream/changefeed; a no-op on atom/sequence (spec §5
  /// "Resource release").
  pub async fn close(&mut self) -> Result<()> {
    match self {
      Cursor::Stream(c) | Cursor::Changefeed(c) => c.close().await,
      _ => Ok(()),
    }
  }

  pub fn is_feed(&self) -> bool {
    matches!(self, Cursor::Changefeed(_))
  }
}

/// The shared machinery behind `Stream` and `Changefeed`; only the flavor
/// (terminate on `SUCCESS_SEQUENCE` vs. run forever) differs, and that
/// distinction lives in `Cursor` rather than here.
pub struct BatchCursor {
  conn: Arc<Connection>,
  token: u64,
  buffer: VecDeque<Value>,
  /// Set once a `SUCCESS_SEQUENCE` continuation has been observed — the
  /// stream flavor's terminal state. Changefeeds never set this.
  exhausted: bool,
  closed: bool,
}

impl BatchCursor {
  pub fn new(conn: Arc<Connection>, token: u64, first_batch: Vec<Value>) -> Self {
    BatchCursor { conn, token, buffer: first_batch.into(), exhausted: false, closed: false }
  }

  pub async fn next(&mut self) -> Result<Option<Value>> {
    if let Some(v) = self.buffer.pop_front() {
      return Ok(Some(v));
    }
    if self.exhausted || self.closed {
      return Ok(None);
    }

    let conn = self.conn.clone();
    let token = self.token;
    let payload = serde_json::to_vec(&serde_json::json!([query_type::CONTINUE]))
      .expect("a one-element integer array always serializes");

    // Fetching happens on its own task: the caller of `next` is never
    // blocked holding this cursor's state across the await (spec §4.7,
    // §9). A panic or transport error surfaces through the ordinary
    // `Result` path here — the equivalent of the Go core's "inject a
    // synthetic CLIENT_ERROR response" trick, expressed as `Err` instead
    // of a sentinel value on the channel.
    let handle = tokio::spawn(async move { conn.send(token, &payload).await });
    let raw = match handle.await {
      Ok(result) => result?,
      Err(_) => return Err(Error::Protocol("continue task panicked".to_string())),
    };

    let response = response::decode(&raw)?;
    let notes = response.n.clone();
    match response::classify(response)? {
      Outcome::Sequence(items) => {
        self.buffer = items.into();
        self.exhausted = true;
        Ok(self.buffer.pop_front())
      }
      Outcome::Partial(items) => {
        self.buffer = items.into();
        let _ = response::feed_kind(&notes);
        Ok(self.buffer.pop_front())
      }
      other => Err(Error::Protocol(format!("unexpected cursor continuation response {:?}", other))),
    }
  }

  /// Sends `STOP` if the server might still be producing (spec §3
  /// "Close sends STOP if the last batch was partial"). Idempotent.
  pub async fn close(&mut self) -> Result<()> {
    if self.closed || self.exhausted {
      self.closed = true;
      return Ok(());
    }
    self.closed = true;
    let payload = serde_json::to_vec(&serde_json::json!([query_type::STOP]))
      .expect("a one-element integer array always serializes");
    // Best-effort: errors from STOP are silently dropped (spec §7).
    let _ = self.conn.write_frame(self.token, &payload).await;
    Ok(())
  }
}
