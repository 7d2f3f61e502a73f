//! Thin binary consuming the `reql` library, in the teacher's
//! library-plus-binary split (`pg`/`mysql` + `pg2kafka`/`mysql2kafka`).

mod cli;
mod commands;
mod env;

use std::io::IsTerminal;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;

use reql::{ConnManager, ConnectionOptions, Executor, Format};
use tracing_subscriber::EnvFilter;

use commands::Context;

#[tokio::main]
async fn main() {
  install_tracing();

  let matches = cli::build().get_matches();

  let resolved = match env::resolve(
    matches.get_one::<String>("host").unwrap(),
    *matches.get_one::<u16>("port").unwrap(),
    matches.get_one::<String>("user").unwrap(),
    matches.get_one::<String>("db").map(String::as_str),
    matches.get_flag("password"),
    matches.get_one::<String>("password-file").map(String::as_str),
  ) {
    Ok(r) => r,
    Err(e) => exit_on_error(&e),
  };

  let addr = match (resolved.host.as_str(), resolved.port).to_socket_addrs() {
    Ok(mut addrs) => match addrs.next() {
      Some(a) => a,
      None => {
        eprintln!("error: could not resolve '{}:{}'", resolved.host, resolved.port);
        std::process::exit(reql::error::EXIT_CONNECTION);
      }
    },
    Err(e) => {
      eprintln!("error: {}", e);
      std::process::exit(reql::error::EXIT_CONNECTION);
    }
  };

  let timeout_secs = *matches.get_one::<u64>("timeout").unwrap();
  let options = ConnectionOptions {
    host: resolved.host,
    port: resolved.port,
    user: resolved.user,
    password: resolved.password,
    database: resolved.database.clone(),
    connect_timeout: Duration::from_secs(timeout_secs),
  };

  let manager = Arc::new(ConnManager::new(addr, options));
  let executor = Executor::new(manager.clone());

  let format: Option<Format> = matches.get_one::<String>("format").map(|s| s.parse().unwrap());
  let stdout = std::io::stdout();
  let color = !reql::output::no_color() && stdout.is_terminal();

  let ctx = Context {
    executor,
    default_db: resolved.database,
    format,
    color,
    quiet: matches.get_flag("quiet"),
    profile: matches.get_flag("profile"),
  };

  let interrupt = tokio::signal::ctrl_c();
  tokio::pin!(interrupt);
  let work = dispatch(&ctx, &matches);
  tokio::pin!(work);

  let exit_code = tokio::select! {
    _ = &mut interrupt => 130,
    result = &mut work => match result {
      Ok(()) => reql::error::EXIT_OK,
      Err(e) => {
        eprintln!("error: {}", e);
        e.exit_code()
      }
    },
  };

  manager.close().await;
  std::process::exit(exit_code);
}

async fn dispatch(ctx: &Context, matches: &clap::ArgMatches) -> reql::Result<()> {
  match matches.subcommand() {
    Some(("db", m)) => commands::db::dispatch(ctx, m).await,
    Some(("table", m)) => commands::table::dispatch(ctx, m).await,
    Some(("index", m)) => commands::index::dispatch(ctx, m).await,
    Some(("user", m)) => commands::user::dispatch(ctx, m).await,
    Some(("grant", m)) => commands::user::grant(ctx, m).await,
    Some(("query", m)) => commands::misc::query(ctx, m).await,
    Some(("run", m)) => commands::misc::run(ctx, m).await,
    Some(("insert", m)) => commands::insert::dispatch(ctx, m).await,
    Some(("status", _)) => commands::misc::status(ctx).await,
    Some(("repl", _)) => commands::misc::repl(ctx).await,
    _ => unreachable!("clap requires a subcommand"),
  }
}

fn install_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
  let filter = if env::wire_debug_enabled() { filter.add_directive("reql=trace".parse().unwrap()) } else { filter };
  tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn exit_on_error(e: &reql::Error) -> ! {
  eprintln!("error: {}", e);
  std::process::exit(e.exit_code());
}
