//! JSON wire marshaling (spec §3 "Encoding contract").

use serde_json::{Map, Value};

use crate::error::{Error, Result};

use super::{Datum, Term};

pub fn to_json(term: &Term) -> Result<Value> {
  match term {
    Term::Datum(d) => datum_to_json(d),
    Term::Compound(c) => {
      if let Some(message) = &c.error {
        return Err(Error::builder(message.clone()));
      }
      let args: Vec<Value> = c.args.iter().map(to_json).collect::<Result<_>>()?;
      match &c.opts {
        None => Ok(Value::Array(vec![Value::from(c.kind), Value::Array(args)])),
        Some(opts) => {
          let mut map = Map::new();
          for (k, v) in opts {
            map.insert(k.clone(), to_json(v)?);
          }
          Ok(Value::Array(vec![Value::from(c.kind), Value::Array(args), Value::Object(map)]))
        }
      }
    }
  }
}

fn datum_to_json(datum: &Datum) -> Result<Value> {
  match datum {
    Datum::Null => Ok(Value::Null),
    Datum::Bool(b) => Ok(Value::Bool(*b)),
    Datum::Int(n) => Ok(Value::from(*n)),
    Datum::Number(n) => Ok(serde_json::Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null)),
    Datum::String(s) => Ok(Value::String(s.clone())),
    Datum::Object(map) => {
      let mut out = Map::new();
      for (k, v) in map {
        out.insert(k.clone(), to_json(v)?);
      }
      Ok(Value::Object(out))
    }
    Datum::Array(items) => {
      let encoded: Vec<Value> = items.iter().map(to_json).collect::<Result<_>>()?;
      Ok(Value::Array(encoded))
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::term::kinds;

  #[test]
  fn datum_marshals_as_raw_value() {
    assert_eq!(to_json(&Term::string("hi")).unwrap(), serde_json::json!("hi"));
    assert_eq!(to_json(&Term::number(3.0)).unwrap(), serde_json::json!(3.0));
    assert_eq!(to_json(&Term::null()).unwrap(), serde_json::json!(null));
  }

  #[test]
  fn int_datum_marshals_without_trailing_decimal() {
    let json = to_json(&Term::int(30)).unwrap();
    assert_eq!(json, serde_json::json!(30));
    assert_eq!(json.to_string(), "30");
  }

  #[test]
  fn compound_without_opts_has_no_third_element() {
    let t = Term::compound(kinds::DB, vec![Term::string("test")]);
    let json = to_json(&t).unwrap();
    assert_eq!(json, serde_json::json!([14, ["test"]]));
  }

  #[test]
  fn compound_with_empty_args_serializes_empty_array_not_omitted() {
    let t = Term::compound(kinds::IMPLICIT_VAR, Vec::new());
    assert_eq!(to_json(&t).unwrap(), serde_json::json!([13, []]));
  }

  #[test]
  fn deferred_error_fails_marshal() {
    let t = Term::error(kinds::GET_ALL, "get_all requires at least one key");
    let err = to_json(&t).unwrap_err();
    assert!(matches!(err, Error::Builder(_)));
  }

  #[test]
  fn deferred_error_nested_in_tree_fails_marshal() {
    let bad = Term::error(kinds::GET_ALL, "get_all requires at least one key");
    let wrapper = Term::compound(kinds::FILTER, vec![bad]);
    assert!(to_json(&wrapper).is_err());
  }
}
