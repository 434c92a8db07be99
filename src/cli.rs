// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, value_parser};
use std::path::PathBuf;

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn id_arg() -> Arg {
    Arg::new("id")
        .required(true)
        .value_parser(value_parser!(i64))
        .help("Local record id")
}

fn month_arg() -> Arg {
    Arg::new("month")
        .long("month")
        .help("Month as YYYY-MM (default: current month)")
}

fn period_arg() -> Arg {
    Arg::new("period")
        .long("period")
        .short('p')
        .default_value("this-month")
        .help("this-week | this-month | last-month | last-3-months | this-year | custom")
}

fn tx_cmd() -> Command {
    Command::new("tx")
        .about("Record and manage transactions")
        .subcommand_required(true)
        .subcommand(
            Command::new("add")
                .about("Record a transaction")
                .arg(Arg::new("amount").long("amount").required(true))
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .default_value("expense")
                        .value_parser(["income", "expense"]),
                )
                .arg(Arg::new("category").long("category").required(true))
                .arg(Arg::new("description").long("description"))
                .arg(
                    Arg::new("date")
                        .long("date")
                        .help("YYYY-MM-DD (default: now)"),
                ),
        )
        .subcommand(json_flags(
            Command::new("list").about("List transactions, newest first").arg(
                Arg::new("limit")
                    .long("limit")
                    .value_parser(value_parser!(usize)),
            ),
        ))
        .subcommand(
            Command::new("edit")
                .about("Edit a transaction")
                .arg(id_arg())
                .arg(Arg::new("amount").long("amount"))
                .arg(
                    Arg::new("kind")
                        .long("kind")
                        .value_parser(["income", "expense"]),
                )
                .arg(Arg::new("category").long("category"))
                .arg(Arg::new("description").long("description"))
                .arg(Arg::new("date").long("date")),
        )
        .subcommand(Command::new("rm").about("Delete a transaction").arg(id_arg()))
}

fn budget_cmd() -> Command {
    Command::new("budget")
        .about("Monthly category budgets")
        .subcommand_required(true)
        .subcommand(
            Command::new("set")
                .about("Set the budget of a category for a month")
                .arg(Arg::new("category").long("category").required(true))
                .arg(Arg::new("amount").long("amount").required(true))
                .arg(month_arg()),
        )
        .subcommand(json_flags(
            Command::new("list")
                .about("List budgets")
                .arg(month_arg())
                .arg(
                    Arg::new("all")
                        .long("all")
                        .action(ArgAction::SetTrue)
                        .help("Include deactivated budgets"),
                ),
        ))
        .subcommand(json_flags(
            Command::new("report")
                .about("Budget vs actual for a month")
                .arg(month_arg()),
        ))
        .subcommand(Command::new("rm").about("Delete a budget").arg(id_arg()))
        .subcommand(
            Command::new("deactivate")
                .about("Deactivate a budget without deleting it")
                .arg(id_arg()),
        )
        .subcommand(Command::new("cleanup").about("Remove duplicate active budgets"))
}

fn analytics_cmd() -> Command {
    Command::new("analytics")
        .about("Spending analytics")
        .subcommand_required(true)
        .subcommand(json_flags(
            Command::new("summary")
                .about("Totals, breakdowns and trends for a period")
                .arg(period_arg()),
        ))
        .subcommand(json_flags(
            Command::new("compare")
                .about("Spending against the previous period")
                .arg(period_arg()),
        ))
        .subcommand(json_flags(
            Command::new("trends").about("Category spending, this month vs last"),
        ))
        .subcommand(json_flags(
            Command::new("insights")
                .about("Spending insights")
                .arg(period_arg()),
        ))
}

fn sync_cmd() -> Command {
    Command::new("sync")
        .about("Synchronize with the remote backend")
        .subcommand_required(true)
        .subcommand(json_flags(
            Command::new("status").about("Show sync state and pending records"),
        ))
        .subcommand(Command::new("enable").about("Enable remote sync"))
        .subcommand(Command::new("disable").about("Disable remote sync"))
        .subcommand(Command::new("test").about("Test the remote connection"))
        .subcommand(json_flags(
            Command::new("full").about("Fetch and ingest every remote record"),
        ))
        .subcommand(json_flags(
            Command::new("incremental").about("Ingest the most recent remote records"),
        ))
        .subcommand(json_flags(
            Command::new("clean").about("Remove local records deleted remotely"),
        ))
        .subcommand(json_flags(
            Command::new("retry").about("Push failed and pending records again"),
        ))
        .subcommand(json_flags(
            Command::new("smart").about("Incremental sync followed by retry"),
        ))
}

fn settings_cmd() -> Command {
    Command::new("settings")
        .about("Show or change settings")
        .subcommand_required(true)
        .subcommand(json_flags(Command::new("show").about("Show settings")))
        .subcommand(
            Command::new("set-currency")
                .about("Set the display currency")
                .arg(Arg::new("code").required(true)),
        )
        .subcommand(
            Command::new("set-remote")
                .about("Configure the remote backend")
                .arg(Arg::new("url").long("url").required(true))
                .arg(Arg::new("token").long("token"))
                .arg(Arg::new("function").long("function")),
        )
        .subcommand(
            Command::new("set-week-start")
                .about("Set the first day of the week")
                .arg(Arg::new("day").required(true)),
        )
}

pub fn build_cli() -> Command {
    Command::new("tallyhub")
        .about("Offline-first personal finance: transactions, budgets, analytics and sync")
        .version(clap::crate_version!())
        .arg(
            Arg::new("db")
                .long("db")
                .global(true)
                .env("TALLYHUB_DB")
                .value_parser(value_parser!(PathBuf))
                .help("Database file (default: platform data dir)"),
        )
        .arg(
            Arg::new("remote-url")
                .long("remote-url")
                .global(true)
                .env("TALLYHUB_REMOTE_URL")
                .help("Remote backend URL for this run"),
        )
        .arg(
            Arg::new("remote-token")
                .long("remote-token")
                .global(true)
                .env("TALLYHUB_REMOTE_TOKEN")
                .hide_env_values(true)
                .help("Remote bearer token for this run"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("More logging (-v debug, -vv trace)"),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(tx_cmd())
        .subcommand(budget_cmd())
        .subcommand(analytics_cmd())
        .subcommand(sync_cmd())
        .subcommand(settings_cmd())
}
