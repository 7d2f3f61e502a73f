//! The implicit-variable lift (spec §3, §9 "Implicit variable as implicit
//! closure", invariant 5): rewrites `r.row`/`IMPLICIT_VAR` occurrences into
//! `VAR(1)` wrapped in a single `FUNC([2,[1]], body)`, once per wrapping
//! operator (e.g. `Filter`).

use std::collections::BTreeMap;

use super::kinds;
use super::{Compound, Datum, Term};

/// Lifts `body` if it contains any `IMPLICIT_VAR`; otherwise returns it
/// unchanged. Builder-time only — never re-applied once wrapped.
pub fn lift(body: Term) -> Term {
  let mut found = false;
  let walked = walk(body, false, &mut found);
  if !found {
    return walked;
  }
  let param_list = Term::compound(kinds::MAKE_ARRAY, vec![Term::int(1)]);
  Term::compound(kinds::FUNC, vec![param_list, walked])
}

fn walk(term: Term, inside_func: bool, found: &mut bool) -> Term {
  match term {
    Term::Datum(Datum::Object(map)) => {
      let mut out = BTreeMap::new();
      for (k, v) in map {
        out.insert(k, walk(v, inside_func, found));
      }
      Term::Datum(Datum::Object(out))
    }
    Term::Datum(Datum::Array(items)) => {
      Term::Datum(Datum::Array(items.into_iter().map(|t| walk(t, inside_func, found)).collect()))
    }
    Term::Datum(other) => Term::Datum(other),
    Term::Compound(c) => {
      if c.error.is_some() {
        return Term::Compound(c);
      }
      if c.kind == kinds::IMPLICIT_VAR {
        if inside_func {
          return Term::error(
            kinds::IMPLICIT_VAR,
            "r.row is ambiguous inside an explicit function; bind a named parameter instead",
          );
        }
        *found = true;
        return Term::compound(kinds::VAR, vec![Term::int(1)]);
      }
      let nested_inside_func = inside_func || c.kind == kinds::FUNC;
      let args = c.args.into_iter().map(|a| walk(a, nested_inside_func, found)).collect();
      let opts = c.opts.map(|opts| {
        opts
          .into_iter()
          .map(|(k, v)| (k, walk(v, nested_inside_func, found)))
          .collect()
      });
      Term::Compound(Compound { kind: c.kind, args, opts, error: c.error })
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::term::encode::to_json;

  fn implicit_bracket_gt(field: &str, value: f64) -> Term {
    let implicit = Term::compound(kinds::IMPLICIT_VAR, Vec::new());
    let bracket = Term::compound(kinds::BRACKET, vec![implicit, Term::string(field)]);
    Term::compound(kinds::GT, vec![bracket, Term::number(value)])
  }

  #[test]
  fn lifts_bare_implicit_var() {
    let lifted = lift(implicit_bracket_gt("field", 21.0));
    let json = to_json(&lifted).unwrap();
    // [69,[[2,[1]], [21,[[170,[[10,[1]],"field"]],21]]]]
    assert_eq!(json[0], 69);
    assert_eq!(json[1][0][0], 2);
    assert_eq!(json[1][0][1][0], 1);
    assert_eq!(json[1][1][0], 21);
    assert_eq!(json[1][1][1][0][0], 170);
    assert_eq!(json[1][1][1][0][1][0][0], 10);
  }

  #[test]
  fn leaves_tree_without_implicit_var_untouched() {
    let t = Term::number(5.0);
    let lifted = lift(t);
    assert_eq!(to_json(&lifted).unwrap(), serde_json::json!(5.0));
  }

  #[test]
  fn rejects_implicit_var_inside_explicit_func() {
    let implicit = Term::compound(kinds::IMPLICIT_VAR, Vec::new());
    let params = Term::compound(kinds::MAKE_ARRAY, vec![Term::int(1)]);
    let explicit = Term::compound(kinds::FUNC, vec![params, implicit]);
    let lifted = lift(explicit);
    assert!(to_json(&lifted).is_err());
  }
}
