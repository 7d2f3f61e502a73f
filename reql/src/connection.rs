//! The single-socket multiplexed connection (spec §4.3) — the core of this
//! crate. Grounded on `src/pg/conn.rs`'s connect-then-dispatch shape,
//! generalized from single-inflight request/response into a concurrent
//! token-keyed multiplex: a monotonic token allocator, a write mutex, a
//! background read loop, and a waiter map keyed by token.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::handshake;
use crate::options::ConnectionOptions;
use crate::term::kinds::query_type;
use crate::wire;

#[cfg(feature = "ssl")]
use crate::stream::Stream;

type BoxedRead = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWrite = Box<dyn AsyncWrite + Send + Unpin>;

struct Waiters {
  closed: bool,
  map: HashMap<u64, oneshot::Sender<Result<Vec<u8>>>>,
}

/// A single multiplexed connection. Cheap to clone the `Arc` a caller wraps
/// around it; `Connection` itself is `Send + Sync` and every method takes
/// `&self` so many callers can dispatch concurrently (spec §4.3).
pub struct Connection {
  next_token: AtomicU64,
  write: AsyncMutex<BoxedWrite>,
  waiters: Arc<StdMutex<Waiters>>,
  reader: AsyncMutex<Option<JoinHandle<()>>>,
  close_tx: AsyncMutex<Option<oneshot::Sender<()>>>,
}

impl Connection {
  /// Dials a plain-TCP connection and runs the handshake (spec §4.2, §4.3
  /// lifecycle: "created by Dial after a successful handshake").
  pub async fn dial(addr: SocketAddr, options: &ConnectionOptions) -> Result<Self> {
    let password = options.password.as_deref().unwrap_or("");
    let connect = async {
      let mut socket = tokio::net::TcpStream::connect(addr).await?;
      handshake::handshake(&mut socket, &options.user, password).await?;
      Ok::<_, Error>(socket)
    };
    let socket = tokio::time::timeout(options.connect_timeout, connect)
      .await
      .map_err(|_| Error::handshake("connect timed out"))??;
    Ok(Self::from_io(socket))
  }

  /// Dials over TLS (only available with the `ssl` feature, matching the
  /// teacher's optional `openssl`/`tokio-openssl` stack).
  #[cfg(feature = "ssl")]
  pub async fn dial_tls(
    addr: SocketAddr,
    domain: &str,
    connector: &openssl::ssl::SslConnector,
    options: &ConnectionOptions,
  ) -> Result<Self> {
    let password = options.password.as_deref().unwrap_or("");
    let connect = async {
      let mut socket = Stream::connect_tls(addr, domain, connector).await?;
      handshake::handshake(&mut socket, &options.user, password).await?;
      Ok::<_, Error>(socket)
    };
    let socket = tokio::time::timeout(options.connect_timeout, connect)
      .await
      .map_err(|_| Error::handshake("connect timed out"))??;
    Ok(Self::from_io(socket))
  }

  /// Builds a connection directly over an already-handshaken socket. Used
  /// by `dial`/`dial_tls` and by tests driving a `tokio::io::duplex` mock
  /// server (spec §10.4).
  pub fn from_io<S>(stream: S) -> Self
  where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
  {
    let (read_half, write_half) = tokio::io::split(stream);
    Self::from_halves(Box::new(read_half), Box::new(write_half))
  }

  fn from_halves(mut read: BoxedRead, write: BoxedWrite) -> Self {
    let waiters = Arc::new(StdMutex::new(Waiters { closed: false, map: HashMap::new() }));
    let waiters_for_task = waiters.clone();
    let (close_tx, mut close_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
      loop {
        tokio::select! {
          _ = &mut close_rx => {
            tracing::debug!("read loop closed by request");
            break;
          }
          result = wire::read_frame(&mut read) => {
            match result {
              Ok(frame) => {
                let mut w = waiters_for_task.lock().unwrap();
                if let Some(tx) = w.map.remove(&frame.token) {
                  drop(w);
                  // Non-blocking by construction: a oneshot has exactly one
                  // slot and at most one consumer, so a send here never
                  // waits on the receiver (spec §4.3 "Waiter channel
                  // discipline"). If the receiver already went away (the
                  // caller cancelled and removed its waiter, racing this
                  // dispatch) the send is simply dropped.
                  let _ = tx.send(Ok(frame.body));
                } else {
                  tracing::trace!(token = frame.token, "dropped late response, no waiter registered");
                }
              }
              Err(err) => {
                tracing::error!(error = %err, "read loop terminating on transport error");
                break;
              }
            }
          }
        }
      }
      let mut w = waiters_for_task.lock().unwrap();
      w.closed = true;
      for (_, tx) in w.map.drain() {
        let _ = tx.send(Err(Error::Closed));
      }
    });

    Connection {
      next_token: AtomicU64::new(0),
      write: AsyncMutex::new(write),
      waiters,
      reader: AsyncMutex::new(Some(handle)),
      close_tx: AsyncMutex::new(Some(close_tx)),
    }
  }

  /// Next unique token (spec §8 invariant 1: atomic, monotonic, never reused).
  pub fn next_token(&self) -> u64 {
    self.next_token.fetch_add(1, Ordering::SeqCst) + 1
  }

  /// Fire-and-forget write, used for no-reply queries and explicit STOPs
  /// (spec §4.3 `WriteFrame`).
  pub async fn write_frame(&self, token: u64, payload: &[u8]) -> Result<()> {
    let mut w = self.write.lock().await;
    wire::write_frame(&mut *w, token, payload).await
  }

  /// Dispatches `payload` under `token` and awaits its response with no
  /// cancellation source (spec §4.3 `Send`).
  pub async fn send(&self, token: u64, payload: &[u8]) -> Result<Vec<u8>> {
    self.send_cancellable(token, payload, std::future::pending::<()>()).await
  }

  /// `Send` with an arbitrary cancellation future (spec §4.3, §5
  /// "Cancellation"). On cancellation the waiter is removed before this
  /// call returns, a best-effort `STOP` frame is written, and
  /// `Error::Cancelled` is returned.
  pub async fn send_cancellable<F>(&self, token: u64, payload: &[u8], cancel: F) -> Result<Vec<u8>>
  where
    F: Future<Output = ()>,
  {
    let (tx, rx) = oneshot::channel();
    {
      let mut w = self.waiters.lock().unwrap();
      if w.closed {
        return Err(Error::Closed);
      }
      w.map.insert(token, tx);
    }

    if let Err(err) = self.write_frame(token, payload).await {
      self.waiters.lock().unwrap().map.remove(&token);
      return Err(err);
    }

    tokio::pin!(cancel);
    tokio::select! {
      biased;
      result = rx => match result {
        Ok(inner) => inner,
        Err(_) => Err(Error::Closed),
      },
      _ = &mut cancel => {
        self.waiters.lock().unwrap().map.remove(&token);
        if let Ok(stop) = serde_json::to_vec(&serde_json::json!([query_type::STOP])) {
          // Best-effort: the server may have already finished (spec §4.3).
          let _ = self.write_frame(token, &stop).await;
        }
        Err(Error::Cancelled)
      }
    }
  }

  /// Idempotent. Closes the read loop, unblocking every remaining waiter
  /// with `ErrClosed` (spec §4.3 `Close`, §5 "Resource release").
  pub async fn close(&self) {
    if let Some(tx) = self.close_tx.lock().await.take() {
      let _ = tx.send(());
    }
    let handle = self.reader.lock().await.take();
    if let Some(handle) = handle {
      let _ = handle.await;
    }
    let _ = self.write.lock().await.shutdown().await;
  }

  pub fn is_closed(&self) -> bool {
    self.waiters.lock().unwrap().closed
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::term::kinds::response_type;
  use std::sync::atomic::AtomicUsize;
  use tokio::io::{duplex, AsyncReadExt};

  fn server_response(token: u64, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&token.to_le_bytes());
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    out
  }

  #[tokio::test]
  async fn token_allocation_is_monotonic_and_unique() {
    let (a, _b) = duplex(4096);
    let conn = Arc::new(Connection::from_io(a));
    let counters: Vec<_> = (0..50)
      .map(|_| {
        let conn = conn.clone();
        tokio::spawn(async move {
          (0..100).map(|_| conn.next_token()).collect::<Vec<_>>()
        })
      })
      .collect();
    let mut all = Vec::new();
    for c in counters {
      all.extend(c.await.unwrap());
    }
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), 5000);
    assert_eq!(all, (1..=5000).collect::<Vec<_>>());
  }

  #[tokio::test]
  async fn multiplex_correctness_reverse_order_responses() {
    let (a, mut server) = duplex(65536);
    let conn = Arc::new(Connection::from_io(a));

    let server_task = tokio::spawn(async move {
      let mut frames = Vec::new();
      for _ in 0..3 {
        frames.push(wire::read_frame(&mut server).await.unwrap());
      }
      for frame in frames.into_iter().rev() {
        let body = format!("{{\"t\":{},\"r\":[{}]}}", response_type::SUCCESS_ATOM, frame.token);
        server.write_all(&server_response(frame.token, body.as_bytes())).await.unwrap();
      }
    });

    let mut handles = Vec::new();
    for _ in 0..3 {
      let conn = conn.clone();
      let token = conn.next_token();
      handles.push(tokio::spawn(async move {
        let resp = conn.send(token, b"[1]").await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&resp).unwrap();
        (token, parsed["r"][0].as_u64().unwrap())
      }));
    }

    for h in handles {
      let (token, echoed) = h.await.unwrap();
      assert_eq!(token, echoed);
    }
    server_task.await.unwrap();
  }

  #[tokio::test]
  async fn cancellation_removes_waiter_and_discards_late_response() {
    let (a, mut server) = duplex(65536);
    let conn = Connection::from_io(a);
    let token = conn.next_token();

    let (cancel_tx, cancel_rx) = oneshot::channel();
    let send_task = {
      let cancel = async move {
        let _ = cancel_rx.await;
      };
      tokio::spawn(async move { conn.send_cancellable(token, b"[1]", cancel).await })
    };

    // Server observes the query, then we cancel before it replies.
    let frame = wire::read_frame(&mut server).await.unwrap();
    assert_eq!(frame.token, token);
    cancel_tx.send(()).unwrap();
    let result = send_task.await.unwrap();
    assert!(matches!(result, Err(Error::Cancelled)));

    // The STOP frame the cancellation wrote arrives at the server.
    let stop_frame = wire::read_frame(&mut server).await.unwrap();
    assert_eq!(stop_frame.token, token);
    let stop: serde_json::Value = serde_json::from_slice(&stop_frame.body).unwrap();
    assert_eq!(stop, serde_json::json!([3]));

    // A late response for the same token must not panic or block.
    let late = server_response(token, br#"{"t":1,"r":[1]}"#);
    server.write_all(&late).await.unwrap();
  }

  #[tokio::test]
  async fn close_unblocks_pending_send() {
    let (a, mut server) = duplex(65536);
    let conn = Arc::new(Connection::from_io(a));
    let token = conn.next_token();

    let send_conn = conn.clone();
    let send_task = tokio::spawn(async move { send_conn.send(token, b"[1]").await });

    let _ = wire::read_frame(&mut server).await.unwrap();
    conn.close().await;

    let result = tokio::time::timeout(std::time::Duration::from_secs(1), send_task)
      .await
      .expect("send should return promptly after close")
      .unwrap();
    assert!(matches!(result, Err(Error::Closed)));
  }

  #[tokio::test]
  async fn send_after_close_returns_closed_without_registering_waiter() {
    let (a, _server) = duplex(4096);
    let conn = Connection::from_io(a);
    conn.close().await;
    let token = conn.next_token();
    let err = conn.send(token, b"[1]").await.unwrap_err();
    assert!(matches!(err, Error::Closed));
  }

  #[tokio::test]
  async fn concurrent_sends_do_not_interleave_writes() {
    // Regression guard for the write mutex: every frame the server reads
    // must have a well-formed length prefix, i.e. no two writers tore a
    // frame in half.
    let (a, mut server) = duplex(1 << 20);
    let conn = Arc::new(Connection::from_io(a));
    let seen = Arc::new(AtomicUsize::new(0));

    let server_task = {
      let seen = seen.clone();
      tokio::spawn(async move {
        for _ in 0..20 {
          let frame = wire::read_frame(&mut server).await.unwrap();
          assert!(frame.body.starts_with(b"[1,"));
          seen.fetch_add(1, Ordering::SeqCst);
        }
      })
    };

    let mut handles = Vec::new();
    for i in 0..20 {
      let conn = conn.clone();
      handles.push(tokio::spawn(async move {
        let token = conn.next_token();
        let payload = format!("[1,{}]", i);
        conn.write_frame(token, payload.as_bytes()).await.unwrap();
      }));
    }
    for h in handles {
      h.await.unwrap();
    }
    server_task.await.unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 20);
  }
}
