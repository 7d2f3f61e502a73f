//! Dispatch tables mapping `r.<name>` and `.<name>` chain calls to parse
//! functions (spec §4.6 "Builders"). Populated once, read-only thereafter
//! (spec §9 "Global state").

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::Result;
use crate::term::build::r;
use crate::term::{Datum, Term};

use super::grammar::Parser;

type RBuilderFn = fn(&mut Parser) -> Result<Term>;
type ChainFn = fn(&mut Parser, Term) -> Result<Term>;

fn r_builder_table() -> &'static HashMap<&'static str, RBuilderFn> {
  static TABLE: OnceLock<HashMap<&'static str, RBuilderFn>> = OnceLock::new();
  TABLE.get_or_init(|| {
    let mut m: HashMap<&'static str, RBuilderFn> = HashMap::new();
    // `r.row` takes no parens of its own: `r.row("age")` parses as the bare
    // `row` builder followed by the chain loop's bracket-call handling, and
    // `r.row.gt(1)` as `row` followed by a dotted method (spec §4.6).
    m.insert("row", |p| {
      if p.in_lambda_scope() {
        return Err(p.err("r.row is ambiguous inside an arrow or function body"));
      }
      Ok(r::row())
    });
    m.insert("expr", |p| p.parse_single_arg());
    m.insert("db", |p| Ok(r::db(p.parse_string_arg()?)));
    m.insert("dbCreate", |p| Ok(r::db_create(p.parse_string_arg()?)));
    m.insert("dbDrop", |p| Ok(r::db_drop(p.parse_string_arg()?)));
    m.insert("dbList", |p| {
      p.parse_no_args()?;
      Ok(r::db_list())
    });
    m.insert("table", |p| Ok(r::table(p.parse_string_arg()?)));
    m.insert("uuid", |p| {
      p.parse_no_args()?;
      Ok(r::uuid())
    });
    m.insert("now", |p| {
      p.parse_no_args()?;
      Ok(r::now())
    });
    m.insert("time", |p| Ok(r::time(p.parse_variadic_args()?)));
    m.insert("branch", |p| Ok(r::branch(p.parse_variadic_args()?)));
    m.insert("object", |p| Ok(r::object(p.parse_variadic_args()?)));
    m.insert("array", |p| Ok(r::array(p.parse_variadic_args()?)));
    m.insert("line", |p| Ok(r::line(p.parse_variadic_args()?)));
    m.insert("polygon", |p| Ok(r::polygon(p.parse_variadic_args()?)));
    m.insert("range", |p| Ok(r::range(p.parse_variadic_args()?)));
    m.insert("asc", |p| Ok(r::asc(p.parse_single_arg()?)));
    m.insert("desc", |p| Ok(r::desc(p.parse_single_arg()?)));
    m.insert("do", |p| {
      let mut args = p.parse_variadic_args()?;
      let f = args.pop().ok_or_else(|| p.err_unknown_r("do (missing function argument)"))?;
      Ok(r::do_(args, f))
    });
    m
  })
}

/// `row` needs access to parser lambda-scope state before consuming its
/// (empty) argument list, so its table entry above special-cases the error
/// rather than reporting an "unknown r.row" message.
pub fn dispatch_r(parser: &mut Parser, name: &str) -> Result<Term> {
  match r_builder_table().get(name) {
    Some(f) => f(parser),
    None => Err(parser.err_unknown_r(name)),
  }
}

fn chain_table() -> &'static HashMap<&'static str, ChainFn> {
  static TABLE: OnceLock<HashMap<&'static str, ChainFn>> = OnceLock::new();
  TABLE.get_or_init(|| {
    let mut m: HashMap<&'static str, ChainFn> = HashMap::new();
    m.insert("table", |p, t| Ok(t.table_method(p.parse_string_arg()?)));
    m.insert("get", |p, t| Ok(t.get(p.parse_single_arg()?)));
    m.insert("getAll", |p, t| Ok(t.get_all(p.parse_variadic_args()?)));
    m.insert("filter", |p, t| Ok(t.filter(p.parse_single_arg()?)));
    m.insert("map", |p, t| Ok(t.map(p.parse_single_arg()?)));
    m.insert("concatMap", |p, t| Ok(t.concat_map(p.parse_single_arg()?)));
    m.insert("reduce", |p, t| Ok(t.reduce(p.parse_single_arg()?)));
    m.insert("orderBy", |p, t| Ok(t.order_by(p.parse_variadic_args()?)));
    m.insert("limit", |p, t| Ok(t.limit(p.parse_int_arg()?)));
    m.insert("skip", |p, t| Ok(t.skip(p.parse_int_arg()?)));
    m.insert("count", |p, t| {
      p.parse_no_args()?;
      Ok(t.count())
    });
    m.insert("distinct", |p, t| {
      p.parse_no_args()?;
      Ok(t.distinct())
    });
    m.insert("union", |p, t| Ok(t.union(p.parse_single_arg()?)));
    m.insert("nth", |p, t| Ok(t.nth(p.parse_int_arg()?)));
    m.insert("isEmpty", |p, t| {
      p.parse_no_args()?;
      Ok(t.is_empty())
    });
    m.insert("contains", |p, t| Ok(t.contains(p.parse_variadic_args()?)));
    m.insert("hasFields", |p, t| Ok(t.has_fields(p.parse_string_list_args()?)));
    m.insert("pluck", |p, t| Ok(t.pluck(p.parse_string_list_args()?)));
    m.insert("without", |p, t| Ok(t.without(p.parse_string_list_args()?)));
    m.insert("merge", |p, t| Ok(t.merge(p.parse_single_arg()?)));
    m.insert("append", |p, t| Ok(t.append(p.parse_single_arg()?)));
    m.insert("getField", |p, t| Ok(t.get_field(p.parse_string_arg()?)));
    m.insert("slice", |p, t| {
      let args = p.parse_variadic_args()?;
      if args.len() != 2 {
        return Err(p.err_unknown_method("slice (expected exactly 2 integer arguments)"));
      }
      let mut it = args.into_iter();
      let start = match it.next().unwrap() {
        Term::Datum(Datum::Int(n)) => n,
        _ => return Err(p.err_unknown_method("slice (arguments must be integers)")),
      };
      let end = match it.next().unwrap() {
        Term::Datum(Datum::Int(n)) => n,
        _ => return Err(p.err_unknown_method("slice (arguments must be integers)")),
      };
      Ok(t.slice(start, end))
    });
    m.insert("eq", |p, t| Ok(t.eq(p.parse_single_arg()?)));
    m.insert("ne", |p, t| Ok(t.ne(p.parse_single_arg()?)));
    m.insert("lt", |p, t| Ok(t.lt(p.parse_single_arg()?)));
    m.insert("le", |p, t| Ok(t.le(p.parse_single_arg()?)));
    m.insert("gt", |p, t| Ok(t.gt(p.parse_single_arg()?)));
    m.insert("ge", |p, t| Ok(t.ge(p.parse_single_arg()?)));
    m.insert("and", |p, t| Ok(t.and(p.parse_single_arg()?)));
    m.insert("or", |p, t| Ok(t.or(p.parse_single_arg()?)));
    m.insert("not", |p, t| {
      p.parse_no_args()?;
      Ok(t.not_())
    });
    m.insert("add", |p, t| Ok(t.add(p.parse_single_arg()?)));
    m.insert("sub", |p, t| Ok(t.sub(p.parse_single_arg()?)));
    m.insert("mul", |p, t| Ok(t.mul(p.parse_single_arg()?)));
    m.insert("div", |p, t| Ok(t.div(p.parse_single_arg()?)));
    m.insert("mod", |p, t| Ok(t.rem(p.parse_single_arg()?)));
    m.insert("match", |p, t| Ok(t.match_(p.parse_string_arg()?)));
    m.insert("keys", |p, t| {
      p.parse_no_args()?;
      Ok(t.keys())
    });
    m.insert("info", |p, t| {
      p.parse_no_args()?;
      Ok(t.info())
    });
    m.insert("changes", |p, t| {
      p.parse_no_args()?;
      Ok(t.changes())
    });
    m.insert("forEach", |p, t| Ok(t.for_each(p.parse_single_arg()?)));
    m.insert("do", |p, t| Ok(t.do_(p.parse_single_arg()?)));
    m.insert("insert", |p, t| Ok(t.insert(p.parse_single_arg()?, None)));
    m.insert("update", |p, t| Ok(t.update(p.parse_single_arg()?)));
    m.insert("delete", |p, t| {
      p.parse_no_args()?;
      Ok(t.delete())
    });
    m.insert("replace", |p, t| Ok(t.replace(p.parse_single_arg()?)));
    m.insert("tableCreate", |p, t| Ok(t.table_create(p.parse_string_arg()?)));
    m.insert("tableDrop", |p, t| Ok(t.table_drop(p.parse_string_arg()?)));
    m.insert("tableList", |p, t| {
      p.parse_no_args()?;
      Ok(t.table_list())
    });
    m.insert("indexCreate", |p, t| {
      let mut args = p.parse_variadic_args()?;
      if args.len() != 2 {
        return Err(p.err_unknown_method("indexCreate (expected a name and a function argument)"));
      }
      let f = args.pop().unwrap();
      let name = match args.pop().unwrap() {
        Term::Datum(Datum::String(s)) => s,
        _ => return Err(p.err_unknown_method("indexCreate (first argument must be a string)")),
      };
      Ok(t.index_create(name, f))
    });
    m.insert("indexDrop", |p, t| Ok(t.index_drop(p.parse_string_arg()?)));
    m.insert("indexList", |p, t| {
      p.parse_no_args()?;
      Ok(t.index_list())
    });
    m.insert("indexStatus", |p, t| Ok(t.index_status(p.parse_string_list_args()?)));
    m.insert("indexWait", |p, t| Ok(t.index_wait(p.parse_string_list_args()?)));
    m.insert("indexRename", |p, t| {
      let args = p.parse_variadic_args()?;
      if args.len() != 2 {
        return Err(p.err_unknown_method("indexRename (expected exactly 2 string arguments)"));
      }
      let mut it = args.into_iter();
      let old = match it.next().unwrap() {
        Term::Datum(Datum::String(s)) => s,
        _ => return Err(p.err_unknown_method("indexRename (arguments must be strings)")),
      };
      let new = match it.next().unwrap() {
        Term::Datum(Datum::String(s)) => s,
        _ => return Err(p.err_unknown_method("indexRename (arguments must be strings)")),
      };
      Ok(t.index_rename(old, new))
    });
    m
  })
}

pub fn dispatch_chain(parser: &mut Parser, name: &str, target: Term) -> Result<Term> {
  match chain_table().get(name) {
    Some(f) => f(parser, target),
    None => Err(parser.err_unknown_method(name)),
  }
}
