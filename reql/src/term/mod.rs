//! The term tree: a tagged union of scalar datums and typed compounds,
//! matching the wire encoding contract in spec §3.

pub mod build;
pub mod encode;
pub mod implicit;
pub mod kinds;

use std::collections::BTreeMap;

/// Either a term or a bare scalar; binary operators accept both and wrap
/// scalars in a `Datum` automatically (spec §4.5).
#[derive(Debug, Clone)]
pub enum Term {
  Datum(Datum),
  Compound(Compound),
}

#[derive(Debug, Clone)]
pub struct Compound {
  pub kind: i32,
  pub args: Vec<Term>,
  pub opts: Option<BTreeMap<String, Term>>,
  /// A deferred construction error (e.g. wrong arity). Marshaling fails if
  /// any term in the tree carries one (spec §3, §4.5).
  pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Datum {
  Null,
  Bool(bool),
  Int(i64),
  Number(f64),
  String(String),
  /// An object literal whose values are themselves terms, so e.g.
  /// `{name: r.row("x")}` round-trips through Filter's shorthand.
  Object(BTreeMap<String, Term>),
  Array(Vec<Term>),
}

impl Term {
  pub fn compound(kind: i32, args: Vec<Term>) -> Self {
    Term::Compound(Compound { kind, args, opts: None, error: None })
  }

  pub fn compound_with_opts(kind: i32, args: Vec<Term>, opts: BTreeMap<String, Term>) -> Self {
    Term::Compound(Compound { kind, args, opts: Some(opts), error: None })
  }

  pub fn error(kind: i32, message: impl Into<String>) -> Self {
    Term::Compound(Compound { kind, args: Vec::new(), opts: None, error: Some(message.into()) })
  }

  pub fn null() -> Self {
    Term::Datum(Datum::Null)
  }

  pub fn string(s: impl Into<String>) -> Self {
    Term::Datum(Datum::String(s.into()))
  }

  /// An integer scalar — serializes without a trailing `.0` (spec §3).
  pub fn int(n: i64) -> Self {
    Term::Datum(Datum::Int(n))
  }

  pub fn number(n: f64) -> Self {
    Term::Datum(Datum::Number(n))
  }

  pub fn bool(b: bool) -> Self {
    Term::Datum(Datum::Bool(b))
  }

  pub fn is_implicit_var(&self) -> bool {
    matches!(self, Term::Compound(Compound { kind, .. }) if *kind == kinds::IMPLICIT_VAR)
  }
}

/// Anything that can appear where the spec allows "a term or a scalar"
/// (spec §4.5, §9 "Dynamic typing"). Scalar values are lifted to `Term::Datum`.
pub trait IntoTerm {
  fn into_term(self) -> Term;
}

impl IntoTerm for Term {
  fn into_term(self) -> Term {
    self
  }
}

impl IntoTerm for &str {
  fn into_term(self) -> Term {
    Term::string(self)
  }
}

impl IntoTerm for String {
  fn into_term(self) -> Term {
    Term::string(self)
  }
}

impl IntoTerm for bool {
  fn into_term(self) -> Term {
    Term::bool(self)
  }
}

impl IntoTerm for i32 {
  fn into_term(self) -> Term {
    Term::int(self as i64)
  }
}

impl IntoTerm for i64 {
  fn into_term(self) -> Term {
    Term::int(self)
  }
}

impl IntoTerm for f64 {
  fn into_term(self) -> Term {
    Term::number(self)
  }
}

impl IntoTerm for serde_json::Value {
  fn into_term(self) -> Term {
    json_value_to_term(self)
  }
}

pub fn json_value_to_term(v: serde_json::Value) -> Term {
  match v {
    serde_json::Value::Null => Term::null(),
    serde_json::Value::Bool(b) => Term::bool(b),
    serde_json::Value::Number(n) => match n.as_i64() {
      Some(i) => Term::int(i),
      None => Term::number(n.as_f64().unwrap_or(0.0)),
    },
    serde_json::Value::String(s) => Term::string(s),
    serde_json::Value::Array(items) => {
      Term::Datum(Datum::Array(items.into_iter().map(json_value_to_term).collect()))
    }
    serde_json::Value::Object(map) => {
      let mut out = BTreeMap::new();
      for (k, v) in map {
        out.insert(k, json_value_to_term(v));
      }
      Term::Datum(Datum::Object(out))
    }
  }
}
