use std::collections::BTreeMap;

use clap::ArgMatches;
use reql::r;

use super::{run_and_print, Context};

/// Mirrors the real driver's implicit default database: absent an explicit
/// `--db`/`RETHINKDB_DATABASE`, table operations target `"test"`.
fn target_db(ctx: &Context) -> reql::Term {
  r::db(ctx.default_db.clone().unwrap_or_else(|| "test".to_string()))
}

pub async fn dispatch(ctx: &Context, matches: &ArgMatches) -> reql::Result<()> {
  match matches.subcommand() {
    Some(("list", m)) => {
      let db = m.get_one::<String>("db").cloned().unwrap_or_else(|| ctx.default_db.clone().unwrap_or_else(|| "test".to_string()));
      run_and_print(ctx, &r::db(db).table_list()).await
    }
    Some(("create", m)) => {
      let name = m.get_one::<String>("name").unwrap();
      run_and_print(ctx, &target_db(ctx).table_create(name.clone())).await
    }
    Some(("drop", m)) => {
      let name = m.get_one::<String>("name").unwrap();
      if !ctx.confirm(m.get_flag("yes"), &format!("drop table '{}'?", name)) {
        return Ok(());
      }
      run_and_print(ctx, &target_db(ctx).table_drop(name.clone())).await
    }
    Some(("info", m)) => {
      let name = m.get_one::<String>("name").unwrap();
      run_and_print(ctx, &target_db(ctx).table_method(name.clone()).info()).await
    }
    Some(("reconfigure", m)) => {
      let name = m.get_one::<String>("name").unwrap();
      run_and_print(ctx, &target_db(ctx).table_method(name.clone()).reconfigure(BTreeMap::new())).await
    }
    Some(("rebalance", m)) => {
      let name = m.get_one::<String>("name").unwrap();
      run_and_print(ctx, &target_db(ctx).table_method(name.clone()).rebalance()).await
    }
    Some(("wait", m)) => {
      let name = m.get_one::<String>("name").unwrap();
      run_and_print(ctx, &target_db(ctx).table_method(name.clone()).wait()).await
    }
    Some(("sync", m)) => {
      let name = m.get_one::<String>("name").unwrap();
      run_and_print(ctx, &target_db(ctx).table_method(name.clone()).sync()).await
    }
    _ => unreachable!("clap enforces a table subcommand"),
  }
}
