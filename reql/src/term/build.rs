//! Term builders: the `r::*` factories and the chainable methods on `Term`
//! (spec §4.5). Arity-enforcing builders store a deferred error rather than
//! panicking; `Filter` and every predicate-taking method run the
//! implicit-variable lift before wrapping (spec §3).

use std::collections::BTreeMap;

use super::implicit::lift;
use super::kinds;
use super::{Datum, IntoTerm, Term};

fn opts_map(pairs: Vec<(&str, Term)>) -> BTreeMap<String, Term> {
  pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// Top-level `r.*` factories.
pub mod r {
  use super::*;

  pub fn db(name: impl Into<String>) -> Term {
    Term::compound(kinds::DB, vec![Term::string(name.into())])
  }

  pub fn db_create(name: impl Into<String>) -> Term {
    Term::compound(kinds::DB_CREATE, vec![Term::string(name.into())])
  }

  pub fn db_drop(name: impl Into<String>) -> Term {
    Term::compound(kinds::DB_DROP, vec![Term::string(name.into())])
  }

  pub fn db_list() -> Term {
    Term::compound(kinds::DB_LIST, Vec::new())
  }

  pub fn table(name: impl Into<String>) -> Term {
    Term::compound(kinds::TABLE, vec![Term::string(name.into())])
  }

  /// `r.row` — the anonymous implicit-variable reference (spec §3).
  pub fn row() -> Term {
    Term::compound(kinds::IMPLICIT_VAR, Vec::new())
  }

  pub fn expr(value: impl IntoTerm) -> Term {
    value.into_term()
  }

  pub fn var(id: i64) -> Term {
    Term::compound(kinds::VAR, vec![Term::int(id)])
  }

  /// `Func(body, paramIds…)` → `[69, [[2, [ids…]], body]]` (spec §4.5).
  pub fn func(param_ids: &[i64], body: Term) -> Term {
    let params = Term::compound(kinds::MAKE_ARRAY, param_ids.iter().map(|id| Term::int(*id)).collect());
    Term::compound(kinds::FUNC, vec![params, body])
  }

  /// One-parameter convenience: builds `Func` for a closure taking `Var(1)`.
  pub fn func1(body: impl FnOnce(Term) -> Term) -> Term {
    func(&[1], body(var(1)))
  }

  /// Two-parameter convenience: builds `Func` for a closure taking `Var(1), Var(2)`.
  pub fn func2(body: impl FnOnce(Term, Term) -> Term) -> Term {
    func(&[1, 2], body(var(1), var(2)))
  }

  /// `Do(args…, fn)` serializes function-first on the wire (spec §4.5).
  pub fn do_(args: Vec<Term>, f: Term) -> Term {
    let mut wire_args = vec![f];
    wire_args.extend(args);
    Term::compound(kinds::FUNCALL, wire_args)
  }

  /// Branch arity: at least 3 args, and the count must be odd
  /// (if/then, …, else) — spec §4.5.
  pub fn branch(args: Vec<Term>) -> Term {
    if args.len() < 3 || args.len() % 2 == 0 {
      return Term::error(kinds::BRANCH, "branch requires an odd number of arguments, at least 3");
    }
    Term::compound(kinds::BRANCH, args)
  }

  pub fn asc(f: Term) -> Term {
    Term::compound(kinds::ASC, vec![f])
  }

  pub fn desc(f: Term) -> Term {
    Term::compound(kinds::DESC, vec![f])
  }

  pub fn uuid() -> Term {
    Term::compound(kinds::UUID, Vec::new())
  }

  pub fn now() -> Term {
    Term::compound(kinds::NOW, Vec::new())
  }

  /// `r.time` distinguishes a 4-arg form (year, month, day, timezone) from
  /// a 7-arg form (…, hour, minute, second, timezone); any other count is
  /// rejected loudly rather than guessed at (spec §9 design note (c)).
  pub fn time(args: Vec<Term>) -> Term {
    match args.len() {
      4 | 7 => Term::compound(kinds::TIME, args),
      n => Term::error(kinds::TIME, format!("r.time expects 4 or 7 arguments, got {}", n)),
    }
  }

  /// `r.object(k0, v0, k1, v1, …)` — the flat-pair-list count must be even
  /// (spec §4.5 "Object even").
  pub fn object(pairs: Vec<Term>) -> Term {
    if pairs.len() % 2 != 0 {
      return Term::error(kinds::MAKE_OBJ, "object requires an even number of arguments");
    }
    Term::compound(kinds::MAKE_OBJ, pairs)
  }

  pub fn array(items: Vec<Term>) -> Term {
    Term::compound(kinds::MAKE_ARRAY, items)
  }

  /// `Line` requires at least two points (spec §4.5 "Line ≥2").
  pub fn line(points: Vec<Term>) -> Term {
    if points.len() < 2 {
      return Term::error(kinds::LINE, "line requires at least two points");
    }
    Term::compound(kinds::LINE, points)
  }

  /// `Polygon` requires at least three points (spec §4.5 "Polygon ≥3").
  pub fn polygon(points: Vec<Term>) -> Term {
    if points.len() < 3 {
      return Term::error(kinds::POLYGON, "polygon requires at least three points");
    }
    Term::compound(kinds::POLYGON, points)
  }

  /// `Range` takes at most two bounds (spec §4.5 "Range ≤2").
  pub fn range(bounds: Vec<Term>) -> Term {
    if bounds.len() > 2 {
      return Term::error(kinds::RANGE, "range accepts at most two arguments");
    }
    Term::compound(kinds::RANGE, bounds)
  }
}

impl Term {
  pub fn table_method(self, name: impl Into<String>) -> Term {
    Term::compound(kinds::TABLE, vec![self, Term::string(name.into())])
  }

  pub fn get(self, key: impl IntoTerm) -> Term {
    Term::compound(kinds::GET, vec![self, key.into_term()])
  }

  /// `GetAll` requires at least one key (spec §4.5).
  pub fn get_all(self, keys: Vec<Term>) -> Term {
    if keys.is_empty() {
      return Term::error(kinds::GET_ALL, "get_all requires at least one key");
    }
    let mut args = vec![self];
    args.extend(keys);
    Term::compound(kinds::GET_ALL, args)
  }

  pub fn filter(self, predicate: impl IntoTerm) -> Term {
    let predicate = lift(predicate.into_term());
    Term::compound(kinds::FILTER, vec![self, predicate])
  }

  pub fn map(self, f: impl IntoTerm) -> Term {
    Term::compound(kinds::MAP, vec![self, lift(f.into_term())])
  }

  pub fn concat_map(self, f: impl IntoTerm) -> Term {
    Term::compound(kinds::CONCAT_MAP, vec![self, lift(f.into_term())])
  }

  pub fn reduce(self, f: impl IntoTerm) -> Term {
    Term::compound(kinds::REDUCE, vec![self, lift(f.into_term())])
  }

  pub fn order_by(self, fields: Vec<Term>) -> Term {
    let mut args = vec![self];
    args.extend(fields);
    Term::compound(kinds::ORDER_BY, args)
  }

  pub fn limit(self, n: i64) -> Term {
    Term::compound(kinds::LIMIT, vec![self, Term::int(n)])
  }

  pub fn skip(self, n: i64) -> Term {
    Term::compound(kinds::SKIP, vec![self, Term::int(n)])
  }

  pub fn count(self) -> Term {
    Term::compound(kinds::COUNT, vec![self])
  }

  pub fn distinct(self) -> Term {
    Term::compound(kinds::DISTINCT, vec![self])
  }

  pub fn union(self, other: Term) -> Term {
    Term::compound(kinds::UNION, vec![self, other])
  }

  pub fn nth(self, n: i64) -> Term {
    Term::compound(kinds::NTH, vec![self, Term::int(n)])
  }

  /// The bracket-notation chain's string-argument form (spec §4.6
  /// `s(string) -> Bracket(string)`).
  pub fn bracket(self, field: impl Into<String>) -> Term {
    Term::compound(kinds::BRACKET, vec![self, Term::string(field.into())])
  }

  pub fn get_field(self, field: impl Into<String>) -> Term {
    Term::compound(kinds::GET_FIELD, vec![self, Term::string(field.into())])
  }

  pub fn is_empty(self) -> Term {
    Term::compound(kinds::IS_EMPTY, vec![self])
  }

  /// `Contains` requires at least one value (spec §4.5).
  pub fn contains(self, values: Vec<Term>) -> Term {
    if values.is_empty() {
      return Term::error(kinds::CONTAINS, "contains requires at least one value");
    }
    let mut args = vec![self];
    args.extend(values);
    Term::compound(kinds::CONTAINS, args)
  }

  pub fn has_fields(self, fields: Vec<String>) -> Term {
    let mut args = vec![self];
    args.extend(fields.into_iter().map(Term::string));
    Term::compound(kinds::HAS_FIELDS, args)
  }

  pub fn pluck(self, fields: Vec<String>) -> Term {
    let mut args = vec![self];
    args.extend(fields.into_iter().map(Term::string));
    Term::compound(kinds::PLUCK, args)
  }

  pub fn without(self, fields: Vec<String>) -> Term {
    let mut args = vec![self];
    args.extend(fields.into_iter().map(Term::string));
    Term::compound(kinds::WITHOUT, args)
  }

  pub fn merge(self, other: impl IntoTerm) -> Term {
    Term::compound(kinds::MERGE, vec![self, other.into_term()])
  }

  pub fn append(self, value: impl IntoTerm) -> Term {
    Term::compound(kinds::APPEND, vec![self, value.into_term()])
  }

  pub fn slice(self, start: i64, end: i64) -> Term {
    Term::compound(kinds::SLICE, vec![self, Term::int(start), Term::int(end)])
  }

  pub fn eq(self, other: impl IntoTerm) -> Term {
    Term::compound(kinds::EQ, vec![self, other.into_term()])
  }

  pub fn ne(self, other: impl IntoTerm) -> Term {
    Term::compound(kinds::NE, vec![self, other.into_term()])
  }

  pub fn lt(self, other: impl IntoTerm) -> Term {
    Term::compound(kinds::LT, vec![self, other.into_term()])
  }

  pub fn le(self, other: impl IntoTerm) -> Term {
    Term::compound(kinds::LE, vec![self, other.into_term()])
  }

  pub fn gt(self, other: impl IntoTerm) -> Term {
    Term::compound(kinds::GT, vec![self, other.into_term()])
  }

  pub fn ge(self, other: impl IntoTerm) -> Term {
    Term::compound(kinds::GE, vec![self, other.into_term()])
  }

  pub fn and(self, other: impl IntoTerm) -> Term {
    Term::compound(kinds::AND, vec![self, other.into_term()])
  }

  pub fn or(self, other: impl IntoTerm) -> Term {
    Term::compound(kinds::OR, vec![self, other.into_term()])
  }

  pub fn not_(self) -> Term {
    Term::compound(kinds::NOT, vec![self])
  }

  pub fn add(self, other: impl IntoTerm) -> Term {
    Term::compound(kinds::ADD, vec![self, other.into_term()])
  }

  pub fn sub(self, other: impl IntoTerm) -> Term {
    Term::compound(kinds::SUB, vec![self, other.into_term()])
  }

  pub fn mul(self, other: impl IntoTerm) -> Term {
    Term::compound(kinds::MUL, vec![self, other.into_term()])
  }

  pub fn div(self, other: impl IntoTerm) -> Term {
    Term::compound(kinds::DIV, vec![self, other.into_term()])
  }

  pub fn rem(self, other: impl IntoTerm) -> Term {
    Term::compound(kinds::MOD, vec![self, other.into_term()])
  }

  pub fn match_(self, regex: impl Into<String>) -> Term {
    Term::compound(kinds::MATCH, vec![self, Term::string(regex.into())])
  }

  pub fn keys(self) -> Term {
    Term::compound(kinds::KEYS, vec![self])
  }

  pub fn info(self) -> Term {
    Term::compound(kinds::INFO, vec![self])
  }

  pub fn changes(self) -> Term {
    Term::compound(kinds::CHANGES, vec![self])
  }

  pub fn for_each(self, f: impl IntoTerm) -> Term {
    Term::compound(kinds::FOR_EACH, vec![self, lift(f.into_term())])
  }

  pub fn do_(self, f: Term) -> Term {
    r::do_(vec![self], f)
  }

  pub fn insert(self, docs: impl IntoTerm, conflict: Option<&str>) -> Term {
    match conflict {
      None => Term::compound(kinds::INSERT, vec![self, docs.into_term()]),
      Some(strategy) => Term::compound_with_opts(
        kinds::INSERT,
        vec![self, docs.into_term()],
        opts_map(vec![("conflict", Term::string(strategy))]),
      ),
    }
  }

  pub fn update(self, patch: impl IntoTerm) -> Term {
    Term::compound(kinds::UPDATE, vec![self, lift(patch.into_term())])
  }

  pub fn delete(self) -> Term {
    Term::compound(kinds::DELETE, vec![self])
  }

  pub fn replace(self, f: impl IntoTerm) -> Term {
    Term::compound(kinds::REPLACE, vec![self, lift(f.into_term())])
  }

  pub fn table_create(self, name: impl Into<String>) -> Term {
    Term::compound(kinds::TABLE_CREATE, vec![self, Term::string(name.into())])
  }

  pub fn table_drop(self, name: impl Into<String>) -> Term {
    Term::compound(kinds::TABLE_DROP, vec![self, Term::string(name.into())])
  }

  pub fn table_list(self) -> Term {
    Term::compound(kinds::TABLE_LIST, vec![self])
  }

  pub fn index_create(self, name: impl Into<String>, f: impl IntoTerm) -> Term {
    Term::compound(kinds::INDEX_CREATE, vec![self, Term::string(name.into()), lift(f.into_term())])
  }

  pub fn index_drop(self, name: impl Into<String>) -> Term {
    Term::compound(kinds::INDEX_DROP, vec![self, Term::string(name.into())])
  }

  pub fn index_list(self) -> Term {
    Term::compound(kinds::INDEX_LIST, vec![self])
  }

  pub fn index_status(self, names: Vec<String>) -> Term {
    let mut args = vec![self];
    args.extend(names.into_iter().map(Term::string));
    Term::compound(kinds::INDEX_STATUS, args)
  }

  pub fn index_wait(self, names: Vec<String>) -> Term {
    let mut args = vec![self];
    args.extend(names.into_iter().map(Term::string));
    Term::compound(kinds::INDEX_WAIT, args)
  }

  pub fn index_rename(self, old: impl Into<String>, new: impl Into<String>) -> Term {
    Term::compound(kinds::INDEX_RENAME, vec![self, Term::string(old.into()), Term::string(new.into())])
  }

  pub fn sync(self) -> Term {
    Term::compound(kinds::SYNC, vec![self])
  }

  pub fn config(self) -> Term {
    Term::compound(kinds::CONFIG, vec![self])
  }

  pub fn status(self) -> Term {
    Term::compound(kinds::STATUS, vec![self])
  }

  pub fn reconfigure(self, opts: BTreeMap<String, Term>) -> Term {
    Term::compound_with_opts(kinds::RECONFIGURE, vec![self], opts)
  }

  pub fn rebalance(self) -> Term {
    Term::compound(kinds::REBALANCE, vec![self])
  }

  pub fn wait(self) -> Term {
    Term::compound(kinds::WAIT, vec![self])
  }

  /// `Grant(target, user, permissions)` — `target` is a db or table term,
  /// `permissions` a plain object of booleans (e.g. `{read: true}`).
  pub fn grant(self, user: impl Into<String>, permissions: impl IntoTerm) -> Term {
    Term::compound(kinds::GRANT, vec![self, Term::string(user.into()), permissions.into_term()])
  }
}

/// Object-literal helper shared by the parser: converts a field map into a
/// `Datum::Object` term, leaving nested terms untouched (spec §3).
pub fn object_literal(fields: BTreeMap<String, Term>) -> Term {
  Term::Datum(Datum::Object(fields))
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::term::encode::to_json;
  use serde_json::json;

  #[test]
  fn s1_scenario_filter_with_object_shorthand() {
    let mut fields = BTreeMap::new();
    fields.insert("age".to_string(), Term::int(30));
    let predicate = object_literal(fields);
    let query = r::db("test").table_method("users").filter(predicate);
    let wire = to_json(&query).unwrap();
    assert_eq!(wire, json!([39, [[15, [[14, ["test"]], "users"]], {"age": 30}]]));
  }

  #[test]
  fn get_all_with_no_keys_defers_error() {
    let t = r::table("users").get_all(Vec::new());
    assert!(to_json(&t).is_err());
  }

  #[test]
  fn branch_requires_odd_arity_at_least_three() {
    let bad = r::branch(vec![Term::bool(true), Term::number(1.0)]);
    assert!(to_json(&bad).is_err());
    let ok = r::branch(vec![Term::bool(true), Term::number(1.0), Term::number(2.0)]);
    assert!(to_json(&ok).is_ok());
  }

  #[test]
  fn time_accepts_4_or_7_args_and_rejects_other_counts() {
    let four = r::time(vec![Term::number(2020.0), Term::number(1.0), Term::number(1.0), Term::string("Z")]);
    assert!(to_json(&four).is_ok());
    let seven = r::time(vec![
      Term::number(2020.0),
      Term::number(1.0),
      Term::number(1.0),
      Term::number(0.0),
      Term::number(0.0),
      Term::number(0.0),
      Term::string("Z"),
    ]);
    assert!(to_json(&seven).is_ok());
    let bad = r::time(vec![Term::number(2020.0), Term::number(1.0)]);
    assert!(to_json(&bad).is_err());
  }

  #[test]
  fn line_requires_at_least_two_points() {
    let bad = r::line(vec![Term::array(vec![Term::number(0.0), Term::number(0.0)])]);
    assert!(to_json(&bad).is_err());
    let ok = r::line(vec![
      Term::array(vec![Term::number(0.0), Term::number(0.0)]),
      Term::array(vec![Term::number(1.0), Term::number(1.0)]),
    ]);
    assert!(to_json(&ok).is_ok());
  }

  #[test]
  fn polygon_requires_at_least_three_points() {
    let bad = r::polygon(vec![
      Term::array(vec![Term::number(0.0), Term::number(0.0)]),
      Term::array(vec![Term::number(1.0), Term::number(1.0)]),
    ]);
    assert!(to_json(&bad).is_err());
    let ok = r::polygon(vec![
      Term::array(vec![Term::number(0.0), Term::number(0.0)]),
      Term::array(vec![Term::number(1.0), Term::number(1.0)]),
      Term::array(vec![Term::number(1.0), Term::number(0.0)]),
    ]);
    assert!(to_json(&ok).is_ok());
  }

  #[test]
  fn range_accepts_at_most_two_args() {
    let ok = r::range(vec![Term::number(0.0), Term::number(10.0)]);
    assert!(to_json(&ok).is_ok());
    let bad = r::range(vec![Term::number(0.0), Term::number(10.0), Term::number(20.0)]);
    assert!(to_json(&bad).is_err());
  }

  #[test]
  fn do_serializes_function_first() {
    let f = r::func1(|x| x.add(Term::number(1.0)));
    let wire = to_json(&r::do_(vec![Term::number(41.0)], f)).unwrap();
    assert_eq!(wire[0], 64);
    assert_eq!(wire[1][0][0], 69); // function first
    assert_eq!(wire[1][1], json!(41.0));
  }
}
