use clap::ArgMatches;
use reql::r;

use super::{run_and_print, Context};

pub async fn dispatch(ctx: &Context, matches: &ArgMatches) -> reql::Result<()> {
  match matches.subcommand() {
    Some(("list", _)) => run_and_print(ctx, &r::db_list()).await,
    Some(("create", m)) => {
      let name = m.get_one::<String>("name").unwrap();
      run_and_print(ctx, &r::db_create(name.clone())).await
    }
    Some(("drop", m)) => {
      let name = m.get_one::<String>("name").unwrap();
      if !ctx.confirm(m.get_flag("yes"), &format!("drop database '{}'?", name)) {
        return Ok(());
      }
      run_and_print(ctx, &r::db_drop(name.clone())).await
    }
    _ => unreachable!("clap enforces a db subcommand"),
  }
}
