//! Recursive-descent parser over the fluent surface syntax (spec §4.6).

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::term::build::{object_literal, r};
use crate::term::{Datum, Term};

use super::lexer::{Lexer, Token, TokenKind};
use super::registry;

const MAX_DEPTH: usize = 256;

pub struct Parser {
  tokens: Vec<Token>,
  pos: usize,
  depth: usize,
  scopes: Vec<HashMap<String, i64>>,
  next_var_id: i64,
}

pub fn parse(input: &str) -> Result<Term> {
  let tokens = Lexer::new(input).tokenize()?;
  let mut parser = Parser { tokens, pos: 0, depth: 0, scopes: Vec::new(), next_var_id: 1 };
  let term = parser.parse_expr()?;
  parser.expect_eof()?;
  Ok(term)
}

/// Splits a multi-query file on lines whose trimmed content is exactly
/// `---`; empty segments are dropped (spec §4.6 "Multi-query files").
pub fn split_queries(source: &str) -> Vec<String> {
  let lines: Vec<&str> = source.split('\n').collect();
  lines
    .split(|line| line.trim() == "---")
    .map(|segment| segment.join("\n").trim().to_string())
    .filter(|segment| !segment.is_empty())
    .collect()
}

impl Parser {
  pub(super) fn peek(&self) -> &Token {
    &self.tokens[self.pos]
  }

  fn position(&self) -> usize {
    self.peek().position
  }

  fn bump(&mut self) -> Token {
    let tok = self.tokens[self.pos].clone();
    if self.pos + 1 < self.tokens.len() {
      self.pos += 1;
    }
    tok
  }

  pub(super) fn err(&self, message: impl Into<String>) -> Error {
    Error::Parse { message: message.into(), position: self.position() }
  }

  fn expect_eof(&mut self) -> Result<()> {
    if matches!(self.peek().kind, TokenKind::Eof) {
      Ok(())
    } else {
      Err(self.err("unexpected trailing input"))
    }
  }

  fn expect(&mut self, kind: TokenKind) -> Result<()> {
    if self.peek().kind == kind {
      self.bump();
      Ok(())
    } else {
      Err(self.err(format!("expected {:?}", kind)))
    }
  }

  fn expect_ident(&mut self) -> Result<String> {
    match self.bump().kind {
      TokenKind::Ident(name) => Ok(name),
      other => Err(Error::Parse { message: format!("expected identifier, found {:?}", other), position: self.position() }),
    }
  }

  // ---- lambda scope management (spec §4.6 "Lambdas") ----

  fn enter_lambda(&mut self, params: &[String], form: &str) -> Result<Vec<i64>> {
    if !self.scopes.is_empty() {
      let message = if form == "arrow" { "nested arrow functions" } else { "nested functions" };
      return Err(self.err(message));
    }
    let mut map = HashMap::new();
    let mut ids = Vec::new();
    for p in params {
      if p.is_empty() {
        return Err(self.err("lambda parameter name must not be empty"));
      }
      if p == "return" || p == "function" {
        return Err(self.err(format!("'{}' is a reserved word and cannot be used as a parameter", p)));
      }
      if map.contains_key(p) {
        return Err(self.err(format!("duplicate parameter name '{}'", p)));
      }
      let id = self.next_var_id;
      self.next_var_id += 1;
      map.insert(p.clone(), id);
      ids.push(id);
    }
    self.scopes.push(map);
    Ok(ids)
  }

  fn exit_lambda(&mut self) {
    self.scopes.pop();
    if self.scopes.is_empty() {
      self.next_var_id = 1;
    }
  }

  fn resolve_ident(&self, name: &str) -> Option<i64> {
    self.scopes.iter().rev().find_map(|scope| scope.get(name).copied())
  }

  pub(super) fn in_lambda_scope(&self) -> bool {
    !self.scopes.is_empty()
  }

  // ---- expression grammar ----

  pub(super) fn parse_expr(&mut self) -> Result<Term> {
    self.depth += 1;
    if self.depth > MAX_DEPTH {
      self.depth -= 1;
      return Err(self.err("expression nested too deeply"));
    }
    let result = self.parse_expr_inner();
    self.depth -= 1;
    result
  }

  fn parse_expr_inner(&mut self) -> Result<Term> {
    let mut term = self.parse_primary()?;
    loop {
      match &self.peek().kind {
        TokenKind::Dot => {
          self.bump();
          let name = self.expect_ident()?;
          term = registry::dispatch_chain(self, &name, term)?;
        }
        TokenKind::LParen => {
          term = self.parse_bracket_chain(term)?;
        }
        _ => break,
      }
    }
    Ok(term)
  }

  fn parse_primary(&mut self) -> Result<Term> {
    match self.peek().kind.clone() {
      TokenKind::Ident(name) if name == "function" => self.parse_function_expr(),
      TokenKind::Ident(name) if name == "r" => self.parse_r_builder(),
      TokenKind::Ident(ref name) if self.peek_ahead_kind(1) == Some(TokenKind::Arrow) => {
        let name = name.clone();
        self.bump(); // ident
        self.bump(); // arrow
        let ids = self.enter_lambda(&[name], "arrow")?;
        let body = self.parse_expr()?;
        self.exit_lambda();
        Ok(r::func(&ids, body))
      }
      TokenKind::LParen => {
        if let Some(params) = self.try_parse_arrow_params()? {
          let ids = self.enter_lambda(&params, "arrow")?;
          let body = self.parse_expr()?;
          self.exit_lambda();
          Ok(r::func(&ids, body))
        } else {
          self.bump(); // (
          let inner = self.parse_expr()?;
          self.expect(TokenKind::RParen)?;
          Ok(inner)
        }
      }
      TokenKind::Ident(name) => {
        if let Some(id) = self.resolve_ident(&name) {
          self.bump();
          Ok(r::var(id))
        } else {
          Err(self.err(format!("unknown identifier '{}'", name)))
        }
      }
      TokenKind::LBrace => self.parse_object_literal(),
      TokenKind::LBracket => self.parse_array_literal(),
      TokenKind::Str(s) => {
        self.bump();
        Ok(Term::string(s))
      }
      TokenKind::Int(n) => {
        self.bump();
        Ok(Term::int(n))
      }
      TokenKind::Float(n) => {
        self.bump();
        Ok(Term::number(n))
      }
      TokenKind::True => {
        self.bump();
        Ok(Term::bool(true))
      }
      TokenKind::False => {
        self.bump();
        Ok(Term::bool(false))
      }
      TokenKind::Null => {
        self.bump();
        Ok(Term::null())
      }
      other => Err(self.err(format!("unexpected token {:?}", other))),
    }
  }

  fn peek_ahead_kind(&self, offset: usize) -> Option<TokenKind> {
    self.tokens.get(self.pos + offset).map(|t| t.kind.clone())
  }

  /// Attempts to parse `(ident, ident, …) =>`; on mismatch, rewinds and
  /// returns `None` so the caller falls back to a grouped expression.
  fn try_parse_arrow_params(&mut self) -> Result<Option<Vec<String>>> {
    let start = self.pos;
    self.bump(); // (
    let mut params = Vec::new();
    if !matches!(self.peek().kind, TokenKind::RParen) {
      loop {
        match self.peek().kind.clone() {
          TokenKind::Ident(name) => {
            self.bump();
            params.push(name);
          }
          _ => {
            self.pos = start;
            return Ok(None);
          }
        }
        match self.peek().kind {
          TokenKind::Comma => {
            self.bump();
          }
          TokenKind::RParen => break,
          _ => {
            self.pos = start;
            return Ok(None);
          }
        }
      }
    }
    if !matches!(self.peek().kind, TokenKind::RParen) {
      self.pos = start;
      return Ok(None);
    }
    self.bump(); // )
    if !matches!(self.peek().kind, TokenKind::Arrow) {
      self.pos = start;
      return Ok(None);
    }
    self.bump(); // =>
    Ok(Some(params))
  }

  fn parse_function_expr(&mut self) -> Result<Term> {
    self.bump(); // "function"
    self.expect(TokenKind::LParen)?;
    let mut params = Vec::new();
    if !matches!(self.peek().kind, TokenKind::RParen) {
      loop {
        params.push(self.expect_ident()?);
        if matches!(self.peek().kind, TokenKind::Comma) {
          self.bump();
          continue;
        }
        break;
      }
    }
    self.expect(TokenKind::RParen)?;
    self.expect(TokenKind::LBrace)?;
    let ids = self.enter_lambda(&params, "function")?;
    if matches!(&self.peek().kind, TokenKind::Ident(kw) if kw == "return") {
      self.bump();
    }
    let body = self.parse_expr()?;
    self.exit_lambda();
    if matches!(self.peek().kind, TokenKind::Semicolon) {
      self.bump();
    }
    self.expect(TokenKind::RBrace)?;
    Ok(r::func(&ids, body))
  }

  fn parse_object_literal(&mut self) -> Result<Term> {
    self.bump(); // {
    let mut map = BTreeMap::new();
    if !matches!(self.peek().kind, TokenKind::RBrace) {
      loop {
        let key = match self.bump().kind {
          TokenKind::Ident(name) => name,
          TokenKind::Str(s) => s,
          other => return Err(Error::Parse { message: format!("expected object key, found {:?}", other), position: self.position() }),
        };
        self.expect(TokenKind::Colon)?;
        let value = self.parse_expr()?;
        map.insert(key, value);
        if matches!(self.peek().kind, TokenKind::Comma) {
          self.bump();
          continue;
        }
        break;
      }
    }
    self.expect(TokenKind::RBrace)?;
    Ok(object_literal(map))
  }

  fn parse_array_literal(&mut self) -> Result<Term> {
    self.bump(); // [
    let mut items = Vec::new();
    if !matches!(self.peek().kind, TokenKind::RBracket) {
      loop {
        items.push(self.parse_expr()?);
        if matches!(self.peek().kind, TokenKind::Comma) {
          self.bump();
          continue;
        }
        break;
      }
    }
    self.expect(TokenKind::RBracket)?;
    Ok(Term::Datum(Datum::Array(items)))
  }

  /// Bracket-notation chain: `s(string) -> Bracket(string)`, `s(int) ->
  /// Nth(int)`, `s(float)` is an error (spec §4.6).
  fn parse_bracket_chain(&mut self, target: Term) -> Result<Term> {
    self.bump(); // (
    let arg = self.parse_expr()?;
    self.expect(TokenKind::RParen)?;
    match arg {
      Term::Datum(Datum::String(s)) => Ok(target.bracket(s)),
      Term::Datum(Datum::Int(n)) => Ok(target.nth(n)),
      Term::Datum(Datum::Number(_)) => Err(self.err("bracket notation does not accept a non-integer number")),
      _ => Err(self.err("bracket notation requires a string or integer literal")),
    }
  }

  fn parse_r_builder(&mut self) -> Result<Term> {
    self.bump(); // "r"
    self.expect(TokenKind::Dot)?;
    let name = self.expect_ident()?;
    registry::dispatch_r(self, &name)
  }

  // ---- argument-shape helpers shared by the registries ----

  pub(super) fn parse_no_args(&mut self) -> Result<()> {
    self.expect(TokenKind::LParen)?;
    self.expect(TokenKind::RParen)
  }

  pub(super) fn parse_single_arg(&mut self) -> Result<Term> {
    self.expect(TokenKind::LParen)?;
    let arg = self.parse_expr()?;
    self.expect(TokenKind::RParen)?;
    Ok(arg)
  }

  pub(super) fn parse_string_arg(&mut self) -> Result<String> {
    match self.parse_single_arg()? {
      Term::Datum(Datum::String(s)) => Ok(s),
      _ => Err(self.err("expected a string literal argument")),
    }
  }

  pub(super) fn parse_int_arg(&mut self) -> Result<i64> {
    match self.parse_single_arg()? {
      Term::Datum(Datum::Int(n)) => Ok(n),
      _ => Err(self.err("expected an integer literal argument")),
    }
  }

  pub(super) fn parse_variadic_args(&mut self) -> Result<Vec<Term>> {
    self.expect(TokenKind::LParen)?;
    let mut args = Vec::new();
    if !matches!(self.peek().kind, TokenKind::RParen) {
      loop {
        args.push(self.parse_expr()?);
        if matches!(self.peek().kind, TokenKind::Comma) {
          self.bump();
          continue;
        }
        break;
      }
    }
    self.expect(TokenKind::RParen)?;
    Ok(args)
  }

  pub(super) fn parse_string_list_args(&mut self) -> Result<Vec<String>> {
    self
      .parse_variadic_args()?
      .into_iter()
      .map(|t| match t {
        Term::Datum(Datum::String(s)) => Ok(s),
        _ => Err(self.err("expected a string literal argument")),
      })
      .collect()
  }

  pub(super) fn err_unknown_r(&self, name: &str) -> Error {
    self.err(format!("unknown r.{}", name))
  }

  pub(super) fn err_unknown_method(&self, name: &str) -> Error {
    self.err(format!("unknown method .{}", name))
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::term::encode::to_json;
  use serde_json::json;

  #[test]
  fn s1_filter_with_object_shorthand() {
    let term = parse(r#"r.db("test").table("users").filter({name:"foo"})"#).unwrap();
    let wire = to_json(&term).unwrap();
    assert_eq!(wire, json!([39, [[15, [[14, ["test"]], "users"]], {"name": "foo"}]]));
  }

  #[test]
  fn row_bracket_gt() {
    let term = parse(r#"r.row("age").gt(21)"#).unwrap();
    let wire = to_json(&term).unwrap();
    assert_eq!(wire, json!([21, [[170, [[13, []], "age"]], 21]]));
  }

  #[test]
  fn arrow_lambda_bracket_gt() {
    let term = parse(r#"(x) => x('age').gt(21)"#).unwrap();
    let wire = to_json(&term).unwrap();
    assert_eq!(wire[0], 69);
    assert_eq!(wire[1][1][0], 21);
  }

  #[test]
  fn function_expr_bracket_eq() {
    let term = parse(r#"function(x){ return x('enabled').eq(false) }"#).unwrap();
    let wire = to_json(&term).unwrap();
    assert_eq!(wire[0], 69);
    assert_eq!(wire[1][1][0], 17);
  }

  #[test]
  fn bare_single_param_arrow() {
    let term = parse("x => x.gt(1)").unwrap();
    let wire = to_json(&term).unwrap();
    assert_eq!(wire[0], 69);
  }

  #[test]
  fn rejects_row_inside_lambda() {
    let err = parse("x => r.row.gt(1)").unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
  }

  #[test]
  fn rejects_nested_arrow_functions() {
    let err = parse("x => (y => y)").unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
  }

  #[test]
  fn depth_guard_trips_on_257_levels() {
    let mut src = String::new();
    for _ in 0..257 {
      src.push_str("r.expr(");
    }
    src.push('1');
    for _ in 0..257 {
      src.push(')');
    }
    let err = parse(&src).unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
  }

  #[test]
  fn unknown_r_builder_reports_position() {
    let err = parse("r.bogus()").unwrap_err();
    match err {
      Error::Parse { message, .. } => assert!(message.contains("bogus")),
      _ => panic!("expected parse error"),
    }
  }

  #[test]
  fn splits_multi_query_file() {
    let src = "r.dbList()\n---\nr.uuid()\n";
    let parts = split_queries(src);
    assert_eq!(parts, vec!["r.dbList()".to_string(), "r.uuid()".to_string()]);
  }
}
