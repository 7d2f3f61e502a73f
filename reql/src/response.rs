//! Response decoding and error classification (spec §4.7).

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, QueryError, Result};
use crate::term::kinds::{error_type, notes, response_type};

/// The raw JSON envelope the server sends back for every frame (spec §3).
#[derive(Debug, Clone, Deserialize)]
pub struct RawResponse {
  pub t: i32,
  #[serde(default)]
  pub r: Value,
  #[serde(default)]
  pub n: Vec<i32>,
  #[serde(default)]
  pub e: Option<i32>,
}

pub fn decode(body: &[u8]) -> Result<RawResponse> {
  serde_json::from_slice(body).map_err(|e| Error::Protocol(format!("malformed response: {e}")))
}

/// What a classified response means to the caller (spec §4.7).
#[derive(Debug, Clone)]
pub enum Outcome {
  Atom(Value),
  Sequence(Vec<Value>),
  /// One batch of a streamed result; more batches follow via `CONTINUE`
  /// until a non-`SUCCESS_PARTIAL` response arrives.
  Partial(Vec<Value>),
  WaitComplete,
  ServerInfo(Value),
}

/// Feed kind carried on a `SUCCESS_PARTIAL`'s `n` array, if any (spec §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
  Sequence,
  Atom,
  OrderByLimit,
  Unioned,
}

pub fn feed_kind(notes_field: &[i32]) -> Option<Feed> {
  notes_field.iter().find_map(|n| match *n {
    notes::SEQUENCE_FEED => Some(Feed::Sequence),
    notes::ATOM_FEED => Some(Feed::Atom),
    notes::ORDER_BY_LIMIT_FEED => Some(Feed::OrderByLimit),
    notes::UNIONED_FEED => Some(Feed::Unioned),
    _ => None,
  })
}

/// Classifies a decoded response, turning the three error response types
/// into `Err` (spec §4.7 "Error classification").
pub fn classify(raw: RawResponse) -> Result<Outcome> {
  match raw.t {
    t if t == response_type::SUCCESS_ATOM => Ok(Outcome::Atom(first_of(raw.r))),
    t if t == response_type::SUCCESS_SEQUENCE => Ok(Outcome::Sequence(as_array(raw.r))),
    t if t == response_type::SUCCESS_PARTIAL => Ok(Outcome::Partial(as_array(raw.r))),
    t if t == response_type::WAIT_COMPLETE => Ok(Outcome::WaitComplete),
    t if t == response_type::SERVER_INFO => Ok(Outcome::ServerInfo(first_of(raw.r))),
    t if t == response_type::CLIENT_ERROR => Err(QueryError::Client(error_message(&raw.r)).into()),
    t if t == response_type::COMPILE_ERROR => Err(QueryError::Compile(error_message(&raw.r)).into()),
    t if t == response_type::RUNTIME_ERROR => Err(map_runtime_error(raw.e, error_message(&raw.r))),
    other => Err(Error::Protocol(format!("unknown response type {other}"))),
  }
}

fn map_runtime_error(code: Option<i32>, message: String) -> Error {
  let query_err = match code {
    Some(c) if c == error_type::NON_EXISTENCE => QueryError::NonExistence(message),
    Some(c) if c == error_type::PERMISSION_ERROR => QueryError::Permission(message),
    Some(_) => QueryError::Runtime(message),
    None => QueryError::Reql(message),
  };
  Error::Query(query_err)
}

fn error_message(value: &Value) -> String {
  match value {
    Value::Array(items) => items.first().and_then(Value::as_str).unwrap_or("").to_string(),
    Value::String(s) => s.clone(),
    other => other.to_string(),
  }
}

fn first_of(value: Value) -> Value {
  match value {
    Value::Array(mut items) if items.len() == 1 => items.remove(0),
    other => other,
  }
}

fn as_array(value: Value) -> Vec<Value> {
  match value {
    Value::Array(items) => items,
    other => vec![other],
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use serde_json::json;

  #[test]
  fn decodes_success_atom() {
    let raw = decode(br#"{"t":1,"r":[{"id":1}]}"#).unwrap();
    match classify(raw).unwrap() {
      Outcome::Atom(v) => assert_eq!(v, json!({"id": 1})),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn decodes_success_sequence() {
    let raw = decode(br#"{"t":2,"r":[1,2,3]}"#).unwrap();
    match classify(raw).unwrap() {
      Outcome::Sequence(items) => assert_eq!(items, vec![json!(1), json!(2), json!(3)]),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn success_partial_carries_feed_notes() {
    let raw = decode(br#"{"t":3,"r":[1],"n":[2]}"#).unwrap();
    assert_eq!(feed_kind(&raw.n), Some(Feed::Atom));
    match classify(raw).unwrap() {
      Outcome::Partial(items) => assert_eq!(items, vec![json!(1)]),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn runtime_error_with_non_existence_code_maps_to_non_existence() {
    let raw = decode(br#"{"t":18,"r":["no such document"],"e":3100000}"#).unwrap();
    let err = classify(raw).unwrap_err();
    assert!(matches!(err, Error::Query(QueryError::NonExistence(_))));
  }

  #[test]
  fn runtime_error_with_permission_code_maps_to_permission() {
    let raw = decode(br#"{"t":18,"r":["not allowed"],"e":6000000}"#).unwrap();
    let err = classify(raw).unwrap_err();
    assert!(matches!(err, Error::Query(QueryError::Permission(_))));
  }

  #[test]
  fn client_error_maps_to_client_variant() {
    let raw = decode(br#"{"t":16,"r":["bad protocol usage"]}"#).unwrap();
    let err = classify(raw).unwrap_err();
    assert!(matches!(err, Error::Query(QueryError::Client(_))));
  }

  #[test]
  fn compile_error_maps_to_compile_variant() {
    let raw = decode(br#"{"t":17,"r":["syntax error"]}"#).unwrap();
    let err = classify(raw).unwrap_err();
    assert!(matches!(err, Error::Query(QueryError::Compile(_))));
  }

  #[test]
  fn malformed_json_is_a_protocol_error() {
    let err = decode(b"not json").unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
  }
}
