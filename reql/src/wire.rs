//! Frame and handshake-message codec over an `AsyncRead + AsyncWrite` socket.
//!
//! Query/response frames: 8 bytes token (LE) + 4 bytes length (LE) + body.
//! Handshake messages: a run of non-null bytes terminated by a single 0x00,
//! capped at `HANDSHAKE_MAX_LEN` to bound memory use against a hostile peer.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

pub const HANDSHAKE_MAGIC: u32 = 0x34c2bdc3;
pub const HANDSHAKE_MAX_LEN: usize = 16 * 1024;

pub struct Frame {
  pub token: u64,
  pub body: Vec<u8>,
}

pub async fn read_frame<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Frame> {
  let token = stream.read_u64_le().await?;
  let len = stream.read_u32_le().await? as usize;
  let mut body = vec![0u8; len];
  stream.read_exact(&mut body).await?;
  tracing::trace!(token, len, "read frame");
  Ok(Frame { token, body })
}

pub async fn write_frame<S: AsyncWrite + Unpin>(stream: &mut S, token: u64, body: &[u8]) -> Result<()> {
  stream.write_u64_le(token).await?;
  stream.write_u32_le(body.len() as u32).await?;
  stream.write_all(body).await?;
  stream.flush().await?;
  tracing::trace!(token, len = body.len(), "wrote frame");
  Ok(())
}

/// Reads a null-terminated handshake message, rejecting anything over the cap.
pub async fn read_handshake_message<S: AsyncRead + Unpin>(stream: &mut S) -> Result<Vec<u8>> {
  let mut buf = Vec::new();
  let mut byte = [0u8; 1];
  loop {
    let n = stream.read(&mut byte).await?;
    if n == 0 {
      return Err(Error::handshake("unexpected eof reading handshake message"));
    }
    if byte[0] == 0 {
      return Ok(buf);
    }
    buf.push(byte[0]);
    if buf.len() > HANDSHAKE_MAX_LEN {
      return Err(Error::handshake("handshake message exceeds maximum size"));
    }
  }
}

pub async fn write_handshake_message<S: AsyncWrite + Unpin>(stream: &mut S, body: &[u8]) -> Result<()> {
  stream.write_all(body).await?;
  stream.write_u8(0).await?;
  Ok(())
}

pub async fn write_handshake_magic<S: AsyncWrite + Unpin>(stream: &mut S) -> Result<()> {
  stream.write_u32_le(HANDSHAKE_MAGIC).await?;
  Ok(())
}

#[cfg(test)]
mod test {
  use super::*;
  use tokio::io::duplex;

  #[tokio::test]
  async fn frame_round_trips() {
    let (mut a, mut b) = duplex(1024);
    write_frame(&mut a, 42, b"hello").await.unwrap();
    let frame = read_frame(&mut b).await.unwrap();
    assert_eq!(frame.token, 42);
    assert_eq!(frame.body, b"hello");
  }

  #[tokio::test]
  async fn handshake_message_round_trips() {
    let (mut a, mut b) = duplex(1024);
    write_handshake_message(&mut a, b"{\"ok\":true}").await.unwrap();
    let msg = read_handshake_message(&mut b).await.unwrap();
    assert_eq!(msg, b"{\"ok\":true}");
  }

  #[tokio::test]
  async fn handshake_message_rejects_oversize() {
    let (mut a, mut b) = duplex(HANDSHAKE_MAX_LEN + 1024);
    let huge = vec![b'x'; HANDSHAKE_MAX_LEN + 1];
    tokio::spawn(async move {
      let _ = a.write_all(&huge).await;
    });
    let err = read_handshake_message(&mut b).await.unwrap_err();
    assert!(matches!(err, Error::Handshake(_)));
  }
}
