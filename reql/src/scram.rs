//! SCRAM-SHA-256 client conversation primitives (RFC 5802 / RFC 7677).

use hmac::{Hmac, Mac};
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

type HmacSha256 = Hmac<Sha256>;

fn escape_username(user: &str) -> String {
  user.replace('=', "=3D").replace(',', "=2C")
}

pub fn client_nonce() -> String {
  rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(24)
    .map(char::from)
    .collect()
}

/// `gs2_header` is always `"n,,"`: no channel binding, no authzid.
pub fn client_first_message(user: &str, nonce: &str) -> String {
  format!("n,,n={},r={}", escape_username(user), nonce)
}

pub struct ServerFirst {
  pub nonce: String,
  pub salt: Vec<u8>,
  pub iterations: u32,
}

pub fn parse_server_first(message: &str, client_nonce: &str) -> Result<ServerFirst> {
  let mut nonce = None;
  let mut salt = None;
  let mut iterations = None;

  for field in message.split(',') {
    if let Some(v) = field.strip_prefix("r=") {
      nonce = Some(v.to_string());
    } else if let Some(v) = field.strip_prefix("s=") {
      salt = Some(
        base64::decode(v).map_err(|_| Error::handshake("malformed scram salt"))?,
      );
    } else if let Some(v) = field.strip_prefix("i=") {
      iterations = Some(
        v.parse::<u32>()
          .map_err(|_| Error::handshake("malformed scram iteration count"))?,
      );
    }
  }

  let nonce = nonce.ok_or_else(|| Error::handshake("server-first message missing nonce"))?;
  if !nonce.starts_with(client_nonce) {
    return Err(Error::handshake("server nonce does not extend client nonce"));
  }
  let salt = salt.ok_or_else(|| Error::handshake("server-first message missing salt"))?;
  let iterations = iterations.ok_or_else(|| Error::handshake("server-first message missing iteration count"))?;
  if iterations == 0 {
    return Err(Error::handshake("server-first message has zero iterations"));
  }

  Ok(ServerFirst { nonce, salt, iterations })
}

/// `Hi(password, salt, i)`: PBKDF2 specialized to HMAC-SHA-256, RFC 5802 §2.2.
fn hi(password: &[u8], salt: &[u8], iterations: u32) -> [u8; 32] {
  let mut mac = HmacSha256::new_from_slice(password).expect("hmac accepts any key length");
  mac.update(salt);
  mac.update(&1u32.to_be_bytes());
  let mut u: [u8; 32] = mac.finalize().into_bytes().into();

  let mut result = u;
  for _ in 1..iterations {
    let mut mac = HmacSha256::new_from_slice(password).expect("hmac accepts any key length");
    mac.update(&u);
    u = mac.finalize().into_bytes().into();
    for (r, b) in result.iter_mut().zip(u.iter()) {
      *r ^= b;
    }
  }
  result
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
  let mut mac = HmacSha256::new_from_slice(key).expect("hmac accepts any key length");
  mac.update(data);
  mac.finalize().into_bytes().to_vec()
}

pub struct ClientProof {
  pub proof: Vec<u8>,
  pub server_signature: Vec<u8>,
}

/// Derives the client proof and expected server signature per RFC 5802 §3.
pub fn compute_proof(password: &str, salt: &[u8], iterations: u32, auth_message: &str) -> ClientProof {
  let salted_password = hi(password.as_bytes(), salt, iterations);
  let client_key = hmac(&salted_password, b"Client Key");
  let stored_key = Sha256::digest(&client_key);
  let client_signature = hmac(&stored_key, auth_message.as_bytes());

  let proof: Vec<u8> = client_key
    .iter()
    .zip(client_signature.iter())
    .map(|(a, b)| a ^ b)
    .collect();

  let server_key = hmac(&salted_password, b"Server Key");
  let server_signature = hmac(&server_key, auth_message.as_bytes());

  ClientProof { proof, server_signature }
}

pub fn client_final_message(client_nonce_and_server: &str, proof: &[u8]) -> String {
  format!(
    "c=biws,r={},p={}",
    client_nonce_and_server,
    base64::encode(proof)
  )
}

pub fn verify_server_signature(expected: &[u8], server_final: &str) -> Result<()> {
  let got = server_final
    .split(',')
    .find_map(|f| f.strip_prefix("v="))
    .ok_or_else(|| Error::handshake("server-final message missing signature"))?;
  let got = base64::decode(got).map_err(|_| Error::handshake("malformed server signature"))?;
  if got != expected {
    return Err(Error::handshake("server signature verification failed"));
  }
  Ok(())
}

#[cfg(test)]
mod test {
  use super::*;

  // RFC 7677 test vector.
  #[test]
  fn rfc7677_vector() {
    let salt = base64::decode("W22ZaJ0SNY7soEsUEjb6gQ==").unwrap();
    let iterations = 4096;
    let client_nonce = "rOprNGfwEbeRWgbNEkqO";
    let server_nonce = "%hvYDpWUa2RaTCAfuxFIlj)hNlF$k0";
    let full_nonce = format!("{}{}", client_nonce, server_nonce);

    let client_first_bare = format!("n=user,r={}", client_nonce);
    let server_first = format!("r={},s=W22ZaJ0SNY7soEsUEjb6gQ==,i=4096", full_nonce);
    let client_final_without_proof = format!("c=biws,r={}", full_nonce);

    let auth_message = format!(
      "{},{},{}",
      client_first_bare, server_first, client_final_without_proof
    );

    let result = compute_proof("pencil", &salt, iterations, &auth_message);

    assert_eq!(
      base64::encode(&result.proof),
      "dHzbZapWIk4jUhN+Ute9ytag9zjfMHgsqmmiz7AndVQ="
    );
    assert_eq!(
      base64::encode(&result.server_signature),
      "6rriTRBi23WpRR/wtup+mMhUZUn/dB5nLTJRsjl95G4="
    );
  }

  #[test]
  fn parses_server_first() {
    let parsed = parse_server_first(
      "r=rOprNGfwEbeRWgbNEkqOextra,s=W22ZaJ0SNY7soEsUEjb6gQ==,i=4096",
      "rOprNGfwEbeRWgbNEkqO",
    )
    .unwrap();
    assert_eq!(parsed.nonce, "rOprNGfwEbeRWgbNEkqOextra");
    assert_eq!(parsed.iterations, 4096);
  }

  #[test]
  fn rejects_nonce_not_extending_client_nonce() {
    let err = parse_server_first("r=somethingelse,s=AAAA,i=10", "rOprNGfwEbeRWgbNEkqO").unwrap_err();
    assert!(matches!(err, Error::Handshake(_)));
  }

  #[test]
  fn client_first_message_escapes_reserved_chars() {
    assert_eq!(client_first_message("a=b,c", "nonce"), "n,,n=a=3Db=2Cc,r=nonce");
  }
}
