//! Pipelined version exchange + SCRAM-SHA-256 handshake (spec §4.2).
//!
//! Step 1 (magic) and step 3 (client-first) are written in one shot before
//! step 2 (server version reply) is read, eliminating a round-trip the way
//! `src/pg/conn.rs`'s startup sequence pipelines its own preamble.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::{Error, Result};
use crate::scram;
use crate::wire;

#[derive(Serialize)]
struct ClientHandshake<'a> {
  protocol_version: u32,
  authentication_method: &'a str,
  authentication: String,
}

#[derive(Deserialize)]
struct ServerVersion {
  success: bool,
  min_protocol_version: Option<u32>,
  max_protocol_version: Option<u32>,
  server_version: Option<String>,
  error: Option<String>,
}

#[derive(Deserialize)]
struct ServerFirstEnvelope {
  success: bool,
  authentication: Option<String>,
  error_code: Option<i32>,
  error: Option<String>,
}

#[derive(Serialize)]
struct ClientFinal {
  authentication: String,
}

#[derive(Deserialize)]
struct ServerFinalEnvelope {
  success: bool,
  authentication: Option<String>,
  error_code: Option<i32>,
  error: Option<String>,
}

pub async fn handshake<S: AsyncRead + AsyncWrite + Unpin>(
  stream: &mut S,
  user: &str,
  password: &str,
) -> Result<()> {
  let client_nonce = scram::client_nonce();
  let client_first_bare = format!("n={},r={}", escape(user), client_nonce);
  let client_first = ClientHandshake {
    protocol_version: 0,
    authentication_method: "SCRAM-SHA-256",
    authentication: format!("n,,{}", client_first_bare),
  };
  let client_first_json = serde_json::to_vec(&client_first).map_err(|e| Error::handshake(e.to_string()))?;

  // Pipeline: write magic + client-first before reading anything back.
  wire::write_handshake_magic(stream).await?;
  wire::write_handshake_message(stream, &client_first_json).await?;

  let version_raw = wire::read_handshake_message(stream).await?;
  let version: ServerVersion =
    serde_json::from_slice(&version_raw).map_err(|e| Error::handshake(e.to_string()))?;
  if !version.success {
    return Err(Error::handshake(version.error.unwrap_or_else(|| "unsupported protocol version".into())));
  }
  if version.min_protocol_version.unwrap_or(0) > 0 {
    return Err(Error::handshake("server requires a newer protocol version"));
  }
  let _ = version.max_protocol_version;
  let _ = version.server_version;

  let server_first_raw = wire::read_handshake_message(stream).await?;
  let server_first_env: ServerFirstEnvelope =
    serde_json::from_slice(&server_first_raw).map_err(|e| Error::handshake(e.to_string()))?;
  if !server_first_env.success {
    let code = server_first_env.error_code.unwrap_or(0);
    let message = server_first_env.error.unwrap_or_else(|| "authentication failed".into());
    if (10..=20).contains(&code) {
      return Err(Error::Auth { error_code: code, message });
    }
    return Err(Error::handshake(message));
  }
  let server_first_message = server_first_env
    .authentication
    .ok_or_else(|| Error::handshake("server-first response missing authentication field"))?;

  let parsed = scram::parse_server_first(&server_first_message, &client_nonce)?;
  let client_final_without_proof = format!("c=biws,r={}", parsed.nonce);
  let auth_message = format!(
    "{},{},{}",
    client_first_bare, server_first_message, client_final_without_proof
  );

  let proof = scram::compute_proof(password, &parsed.salt, parsed.iterations, &auth_message);
  let client_final_message = scram::client_final_message(&parsed.nonce, &proof.proof);

  let client_final = ClientFinal { authentication: client_final_message };
  let client_final_json = serde_json::to_vec(&client_final).map_err(|e| Error::handshake(e.to_string()))?;
  wire::write_handshake_message(stream, &client_final_json).await?;

  let server_final_raw = wire::read_handshake_message(stream).await?;
  let server_final_env: ServerFinalEnvelope =
    serde_json::from_slice(&server_final_raw).map_err(|e| Error::handshake(e.to_string()))?;
  if !server_final_env.success {
    let code = server_final_env.error_code.unwrap_or(0);
    let message = server_final_env.error.unwrap_or_else(|| "authentication failed".into());
    if (10..=20).contains(&code) {
      return Err(Error::Auth { error_code: code, message });
    }
    return Err(Error::handshake(message));
  }
  let server_final_message = server_final_env
    .authentication
    .ok_or_else(|| Error::handshake("server-final response missing authentication field"))?;
  scram::verify_server_signature(&proof.server_signature, &server_final_message)?;

  tracing::debug!("handshake complete");
  Ok(())
}

fn escape(user: &str) -> String {
  user.replace('=', "=3D").replace(',', "=2C")
}

#[cfg(test)]
mod test {
  use super::*;
  use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

  /// Verifies the pipelining requirement (spec §8 invariant 3): a mock
  /// server only sends step 2 after reading the client's full step 1+3
  /// write, so a client that waited for step 2 before writing step 3 would
  /// deadlock against this server.
  #[tokio::test]
  async fn handshake_pipelines_and_completes() {
    let (client, mut server) = duplex(8192);
    let mut client = client;

    let server_task = tokio::spawn(async move {
      let mut magic = [0u8; 4];
      server.read_exact(&mut magic).await.unwrap();
      assert_eq!(u32::from_le_bytes(magic), wire::HANDSHAKE_MAGIC);

      let client_first = wire::read_handshake_message(&mut server).await.unwrap();
      let client_first: serde_json::Value = serde_json::from_slice(&client_first).unwrap();
      let auth = client_first["authentication"].as_str().unwrap().to_string();
      let client_nonce_bare = auth.splitn(3, ',').nth(2).unwrap();
      let client_nonce = client_nonce_bare.strip_prefix("r=").unwrap().to_string();

      wire::write_handshake_message(
        &mut server,
        br#"{"success":true,"min_protocol_version":0,"max_protocol_version":0,"server_version":"1.0"}"#,
      )
      .await
      .unwrap();

      let salt = base64::encode("saltsaltsalt");
      let server_nonce = format!("{}serverhalf", client_nonce);
      let server_first = format!(
        r#"{{"success":true,"authentication":"r={},s={},i=4096"}}"#,
        server_nonce, salt
      );
      wire::write_handshake_message(&mut server, server_first.as_bytes()).await.unwrap();

      let client_final = wire::read_handshake_message(&mut server).await.unwrap();
      let client_final: serde_json::Value = serde_json::from_slice(&client_final).unwrap();
      let client_final_auth = client_final["authentication"].as_str().unwrap();
      assert!(client_final_auth.starts_with("c=biws,r="));

      // Compute the real server signature so verify_server_signature passes.
      let salt_bytes: Vec<u8> = base64::decode(salt).unwrap();
      let client_first_bare = format!("n={},r={}", "tester", client_nonce);
      let client_final_without_proof = format!("c=biws,r={}", server_nonce);
      let auth_message = format!("{},{},{}", client_first_bare, server_first, client_final_without_proof);
      let proof = scram::compute_proof("hunter2", &salt_bytes, 4096, &auth_message);
      let v = base64::encode(&proof.server_signature);

      wire::write_handshake_message(
        &mut server,
        format!(r#"{{"success":true,"authentication":"v={}"}}"#, v).as_bytes(),
      )
      .await
      .unwrap();
    });

    handshake(&mut client, "tester", "hunter2").await.unwrap();
    server_task.await.unwrap();
  }

  #[tokio::test]
  async fn handshake_maps_auth_error_code() {
    let (mut client, mut server) = duplex(8192);
    let server_task = tokio::spawn(async move {
      let mut magic = [0u8; 4];
      server.read_exact(&mut magic).await.unwrap();
      let _ = wire::read_handshake_message(&mut server).await.unwrap();
      wire::write_handshake_message(&mut server, br#"{"success":true,"min_protocol_version":0}"#)
        .await
        .unwrap();
      wire::write_handshake_message(
        &mut server,
        br#"{"success":false,"error_code":12,"error":"Wrong password"}"#,
      )
      .await
      .unwrap();
    });

    let err = handshake(&mut client, "tester", "wrong").await.unwrap_err();
    assert!(matches!(err, Error::Auth { error_code: 12, .. }));
    server_task.await.unwrap();
  }
}
