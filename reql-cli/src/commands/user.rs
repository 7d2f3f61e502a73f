//! Account management against the system `rethinkdb.users` table, the way
//! the real driver's admin tooling manages accounts: plain table
//! operations rather than dedicated wire-protocol terms (spec's CLI glue
//! is "ordinary argument-parsing glue over" the core).

use clap::ArgMatches;
use reql::r;

use crate::env::prompt_password;

use super::{run_and_print, Context};

fn users_table() -> reql::Term {
  r::db("rethinkdb").table_method("users")
}

pub async fn dispatch(ctx: &Context, matches: &ArgMatches) -> reql::Result<()> {
  match matches.subcommand() {
    Some(("list", _)) => run_and_print(ctx, &users_table()).await,
    Some(("create", m)) => {
      let name = m.get_one::<String>("name").unwrap();
      let doc = serde_json::json!({"id": name, "password": false});
      run_and_print(ctx, &users_table().insert(doc, None)).await
    }
    Some(("delete", m)) => {
      let name = m.get_one::<String>("name").unwrap();
      if !ctx.confirm(m.get_flag("yes"), &format!("delete user '{}'?", name)) {
        return Ok(());
      }
      run_and_print(ctx, &users_table().get(name.clone()).delete()).await
    }
    Some(("set-password", m)) => {
      let name = m.get_one::<String>("name").unwrap();
      let password = prompt_password(&format!("New password for '{}': ", name))?;
      let patch = serde_json::json!({"password": password});
      run_and_print(ctx, &users_table().get(name.clone()).update(patch)).await
    }
    _ => unreachable!("clap enforces a user subcommand"),
  }
}

pub async fn grant(ctx: &Context, matches: &ArgMatches) -> reql::Result<()> {
  let user = matches.get_one::<String>("user").unwrap();
  let permissions: Vec<&String> = matches.get_many::<String>("permission").unwrap().collect();
  let mut map = serde_json::Map::new();
  for p in permissions {
    map.insert(p.clone(), serde_json::Value::Bool(true));
  }
  let target = r::db(ctx.default_db.clone().unwrap_or_else(|| "test".to_string()));
  run_and_print(ctx, &target.grant(user.clone(), serde_json::Value::Object(map))).await
}
