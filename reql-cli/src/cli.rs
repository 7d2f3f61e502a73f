//! Subcommand and global-flag shape (spec §6), built with clap's builder
//! API the way the teacher's `pg2kafka`/`mysql2kafka` binaries are
//! (`Command::new(...).arg(Arg::new(...))`, not the derive macros).

use clap::{value_parser, Arg, ArgAction, Command};

pub fn build() -> Command {
  Command::new("reql")
    .version("0.1.0")
    .about("a command-line client for a document-oriented database's JSON wire protocol")
    .arg(Arg::new("host").long("host").short('H').default_value("localhost"))
    .arg(Arg::new("port").long("port").short('P').value_parser(value_parser!(u16)).default_value("28015"))
    .arg(Arg::new("db").long("db").short('d'))
    .arg(Arg::new("user").long("user").short('u').default_value("admin"))
    .arg(Arg::new("password").long("password").short('p').action(ArgAction::SetTrue))
    .arg(Arg::new("password-file").long("password-file"))
    .arg(Arg::new("timeout").long("timeout").short('t').value_parser(value_parser!(u64)).default_value("20"))
    .arg(Arg::new("format").long("format").short('f').value_parser(["json", "jsonl", "raw", "table"]))
    .arg(Arg::new("profile").long("profile").action(ArgAction::SetTrue))
    .arg(Arg::new("time-format").long("time-format"))
    .arg(Arg::new("binary-format").long("binary-format"))
    .arg(Arg::new("quiet").long("quiet").action(ArgAction::SetTrue))
    .arg(Arg::new("verbose").long("verbose").action(ArgAction::SetTrue))
    .subcommand_required(true)
    .subcommand(
      Command::new("db")
        .subcommand(Command::new("list"))
        .subcommand(Command::new("create").arg(Arg::new("name").required(true)))
        .subcommand(Command::new("drop").arg(Arg::new("name").required(true)).arg(yes_flag())),
    )
    .subcommand(
      Command::new("table")
        .subcommand(Command::new("list").arg(Arg::new("db")))
        .subcommand(Command::new("create").arg(Arg::new("name").required(true)))
        .subcommand(Command::new("drop").arg(Arg::new("name").required(true)).arg(yes_flag()))
        .subcommand(Command::new("info").arg(Arg::new("name").required(true)))
        .subcommand(Command::new("reconfigure").arg(Arg::new("name").required(true)))
        .subcommand(Command::new("rebalance").arg(Arg::new("name").required(true)))
        .subcommand(Command::new("wait").arg(Arg::new("name").required(true)))
        .subcommand(Command::new("sync").arg(Arg::new("name").required(true))),
    )
    .subcommand(
      Command::new("index")
        .subcommand(Command::new("list").arg(Arg::new("table").required(true)))
        .subcommand(
          Command::new("create")
            .arg(Arg::new("table").required(true))
            .arg(Arg::new("name").required(true)),
        )
        .subcommand(
          Command::new("drop")
            .arg(Arg::new("table").required(true))
            .arg(Arg::new("name").required(true))
            .arg(yes_flag()),
        )
        .subcommand(
          Command::new("rename")
            .arg(Arg::new("table").required(true))
            .arg(Arg::new("old").required(true))
            .arg(Arg::new("new").required(true)),
        )
        .subcommand(Command::new("status").arg(Arg::new("table").required(true)))
        .subcommand(Command::new("wait").arg(Arg::new("table").required(true))),
    )
    .subcommand(
      Command::new("user")
        .subcommand(Command::new("list"))
        .subcommand(Command::new("create").arg(Arg::new("name").required(true)))
        .subcommand(Command::new("delete").arg(Arg::new("name").required(true)).arg(yes_flag()))
        .subcommand(Command::new("set-password").arg(Arg::new("name").required(true))),
    )
    .subcommand(
      Command::new("grant")
        .arg(Arg::new("user").required(true))
        .arg(Arg::new("permission").required(true).num_args(1..)),
    )
    .subcommand(
      Command::new("query")
        .arg(Arg::new("expr"))
        .arg(Arg::new("file").long("file").short('F')),
    )
    .subcommand(Command::new("run").arg(Arg::new("term")))
    .subcommand(
      Command::new("insert")
        .arg(Arg::new("target").required(true))
        .arg(Arg::new("file").required(true))
        .arg(Arg::new("conflict").long("conflict").value_parser(["error", "replace", "update"]))
        .arg(Arg::new("batch-size").long("batch-size").value_parser(value_parser!(usize)).default_value("200")),
    )
    .subcommand(Command::new("status"))
    .subcommand(Command::new("repl"))
}

fn yes_flag() -> Arg {
  Arg::new("yes").long("yes").short('y').action(ArgAction::SetTrue)
}
