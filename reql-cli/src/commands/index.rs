use clap::ArgMatches;
use reql::r;

use super::{run_and_print, Context};

fn table_term(ctx: &Context, name: &str) -> reql::Term {
  r::db(ctx.default_db.clone().unwrap_or_else(|| "test".to_string())).table_method(name.to_string())
}

pub async fn dispatch(ctx: &Context, matches: &ArgMatches) -> reql::Result<()> {
  match matches.subcommand() {
    Some(("list", m)) => {
      let table = m.get_one::<String>("table").unwrap();
      run_and_print(ctx, &table_term(ctx, table).index_list()).await
    }
    Some(("create", m)) => {
      let table = m.get_one::<String>("table").unwrap();
      let name = m.get_one::<String>("name").unwrap();
      let field = r::func1(|row| row.get_field(name.clone()));
      run_and_print(ctx, &table_term(ctx, table).index_create(name.clone(), field)).await
    }
    Some(("drop", m)) => {
      let table = m.get_one::<String>("table").unwrap();
      let name = m.get_one::<String>("name").unwrap();
      if !ctx.confirm(m.get_flag("yes"), &format!("drop index '{}' on '{}'?", name, table)) {
        return Ok(());
      }
      run_and_print(ctx, &table_term(ctx, table).index_drop(name.clone())).await
    }
    Some(("rename", m)) => {
      let table = m.get_one::<String>("table").unwrap();
      let old = m.get_one::<String>("old").unwrap();
      let new = m.get_one::<String>("new").unwrap();
      run_and_print(ctx, &table_term(ctx, table).index_rename(old.clone(), new.clone())).await
    }
    Some(("status", m)) => {
      let table = m.get_one::<String>("table").unwrap();
      run_and_print(ctx, &table_term(ctx, table).index_status(Vec::new())).await
    }
    Some(("wait", m)) => {
      let table = m.get_one::<String>("table").unwrap();
      run_and_print(ctx, &table_term(ctx, table).index_wait(Vec::new())).await
    }
    _ => unreachable!("clap enforces an index subcommand"),
  }
}
