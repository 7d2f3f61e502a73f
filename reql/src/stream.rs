//! A transport abstraction over plain TCP and (optionally) TLS, grounded on
//! `src/pg/stream.rs`'s `Stream` enum: `Connection` is generic over nothing,
//! it just holds one of these and the enum's `poll_*` impls delegate to
//! whichever variant is live.

use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;

#[cfg(feature = "ssl")]
use tokio_openssl::SslStream;

pub enum Stream {
  Tcp(TcpStream),
  #[cfg(feature = "ssl")]
  Tls(SslStream<TcpStream>),
}

impl Stream {
  pub async fn connect_tcp(addr: SocketAddr) -> io::Result<Self> {
    TcpStream::connect(addr).await.map(Stream::Tcp)
  }

  #[cfg(feature = "ssl")]
  pub async fn connect_tls(
    addr: SocketAddr,
    domain: &str,
    connector: &openssl::ssl::SslConnector,
  ) -> io::Result<Self> {
    let tcp = TcpStream::connect(addr).await?;
    let ssl = connector
      .configure()
      .and_then(|c| c.into_ssl(domain))
      .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    let mut tls = SslStream::new(ssl, tcp).map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    Pin::new(&mut tls)
      .connect()
      .await
      .map_err(|e| io::Error::new(io::ErrorKind::ConnectionRefused, e.to_string()))?;
    Ok(Stream::Tls(tls))
  }
}

impl AsyncRead for Stream {
  fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
    match self.get_mut() {
      Stream::Tcp(s) => Pin::new(s).poll_read(cx, buf),
      #[cfg(feature = "ssl")]
      Stream::Tls(s) => Pin::new(s).poll_read(cx, buf),
    }
  }
}

impl AsyncWrite for Stream {
  fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
    match self.get_mut() {
      Stream::Tcp(s) => Pin::new(s).poll_write(cx, buf),
      #[cfg(feature = "ssl")]
      Stream::Tls(s) => Pin::new(s).poll_write(cx, buf),
    }
  }

  fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
    match self.get_mut() {
      Stream::Tcp(s) => Pin::new(s).poll_flush(cx),
      #[cfg(feature = "ssl")]
      Stream::Tls(s) => Pin::new(s).poll_flush(cx),
    }
  }

  fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
    match self.get_mut() {
      Stream::Tcp(s) => Pin::new(s).poll_shutdown(cx),
      #[cfg(feature = "ssl")]
      Stream::Tls(s) => Pin::new(s).poll_shutdown(cx),
    }
  }
}
