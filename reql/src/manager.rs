//! Lazy single-connection holder (spec §4.4). No pack repo dials lazily —
//! the teacher's binaries dial once in `main` and reuse the handle for the
//! process lifetime (`pg2kafka/src/main.rs`) — so this is shaped after that
//! single-dial-then-reuse pattern, generalized into an on-demand `Get`.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::connection::Connection;
use crate::error::Result;
use crate::options::ConnectionOptions;

/// Holds at most one live connection. A failed dial is never cached — the
/// next `get` tries again. A connection observed closed by `get` is
/// returned as-is; the manager does NOT auto-reconnect (spec §9 open
/// question (a), preserved verbatim).
pub struct ConnManager {
  addr: SocketAddr,
  options: ConnectionOptions,
  slot: Mutex<Option<Arc<Connection>>>,
}

impl ConnManager {
  pub fn new(addr: SocketAddr, options: ConnectionOptions) -> Self {
    ConnManager { addr, options, slot: Mutex::new(None) }
  }

  /// Returns the existing connection or dials one attempt under the slot
  /// mutex. Two concurrent callers racing an empty slot serialize on the
  /// mutex; the second sees the first's freshly-dialed connection.
  pub async fn get(&self) -> Result<Arc<Connection>> {
    let mut slot = self.slot.lock().await;
    if let Some(conn) = slot.as_ref() {
      return Ok(conn.clone());
    }
    let conn = Arc::new(Connection::dial(self.addr, &self.options).await?);
    *slot = Some(conn.clone());
    Ok(conn)
  }

  /// Idempotent: closes the held connection, if any, and clears the slot
  /// so a subsequent `get` dials fresh.
  pub async fn close(&self) {
    let conn = self.slot.lock().await.take();
    if let Some(conn) = conn {
      conn.close().await;
    }
  }

  /// Test-only: seeds the slot directly since tests can't dial a real
  /// socket (no listener to dial against).
  #[cfg(test)]
  pub(crate) async fn test_seed(&self, conn: Arc<Connection>) {
    *self.slot.lock().await = Some(conn);
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::error::Error;
  use tokio::io::duplex;

  #[tokio::test]
  async fn get_after_close_does_not_reconnect_and_surfaces_closed() {
    // We can't dial a real socket in a unit test, so this exercises the
    // no-auto-reconnect contract directly against a manually-seeded slot.
    let (a, _b) = duplex(4096);
    let conn = Arc::new(Connection::from_io(a));
    conn.close().await;

    let manager = ConnManager {
      addr: "127.0.0.1:1".parse().unwrap(),
      options: ConnectionOptions::default(),
      slot: Mutex::new(Some(conn.clone())),
    };

    let got = manager.get().await.unwrap();
    assert!(got.is_closed());
    let err = got.send(got.next_token(), b"[1]").await.unwrap_err();
    assert!(matches!(err, Error::Closed));
  }

  #[tokio::test]
  async fn close_is_idempotent() {
    let manager = ConnManager::new("127.0.0.1:1".parse().unwrap(), ConnectionOptions::default());
    manager.close().await;
    manager.close().await;
  }
}
