// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tallyhub::commands::{self, App};
use tallyhub::{cli, db, store::Store};

fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 => "tallyhub=info",
        1 => "tallyhub=debug",
        _ => "tallyhub=trace",
    };
    let filter = if verbosity > 0 {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into())
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli::build_cli().get_matches();
    init_tracing(matches.get_count("verbose"));

    let path = match matches.get_one::<PathBuf>("db") {
        Some(p) => p.clone(),
        None => db::db_path()?,
    };
    let store = Arc::new(Store::new(db::open_at(&path)?));
    let app = App::new(store, &matches);

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", path.display());
        }
        Some(("tx", sub)) => commands::transactions::handle(&app, sub).await?,
        Some(("budget", sub)) => commands::budgets::handle(&app, sub).await?,
        Some(("analytics", sub)) => commands::analytics::handle(&app, sub)?,
        Some(("sync", sub)) => commands::sync::handle(&app, sub).await?,
        Some(("settings", sub)) => commands::settings::handle(&app, sub)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
