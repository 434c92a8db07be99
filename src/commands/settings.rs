// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use serde::Serialize;

use super::{App, required};
use crate::models::Currency;
use crate::settings::{self as config, DEFAULT_REMOTE_FUNCTION, RemoteConfig};
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(app: &App, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", sub)) => show(app, sub)?,
        Some(("set-currency", sub)) => set_currency(app, sub)?,
        Some(("set-remote", sub)) => set_remote(app, sub)?,
        Some(("set-week-start", sub)) => {
            let day = config::parse_weekday(required(sub, "day")?)?;
            config::set_week_start(&app.store.conn(), day)?;
            println!("Weeks start on {}", day);
        }
        _ => {}
    }
    Ok(())
}

#[derive(Serialize)]
struct Shown {
    currency: String,
    week_start: String,
    sync_enabled: bool,
    remote: RemoteConfig,
}

fn show(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let conn = app.store.conn();
    let ccy = config::currency(&conn)?;
    let data = Shown {
        currency: format!("{} ({} {})", ccy.code(), ccy.symbol(), ccy.display_name()),
        week_start: config::week_start(&conn)?.to_string(),
        sync_enabled: config::sync_enabled(&conn)?,
        remote: config::remote_config(&conn)?,
    };
    drop(conn);
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        return Ok(());
    }
    let rows = vec![
        vec!["currency".to_string(), data.currency],
        vec!["week start".to_string(), data.week_start],
        vec!["sync enabled".to_string(), data.sync_enabled.to_string()],
        vec![
            "remote url".to_string(),
            data.remote.url.unwrap_or_else(|| "-".into()),
        ],
        vec!["remote function".to_string(), data.remote.function],
    ];
    println!("{}", pretty_table(&["Setting", "Value"], rows));
    Ok(())
}

fn set_currency(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let code = required(sub, "code")?.to_uppercase();
    let ccy = Currency::from_code(&code);
    if ccy.code() != code {
        let known: Vec<&str> = Currency::ALL.iter().map(|c| c.code()).collect();
        bail!("Unknown currency '{}'; expected one of {}", code, known.join(", "));
    }
    config::set_currency(&app.store.conn(), ccy)?;
    println!("Display currency set to {} ({})", ccy.code(), ccy.symbol());
    Ok(())
}

fn set_remote(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let cfg = RemoteConfig {
        url: Some(required(sub, "url")?.clone()),
        token: sub.get_one::<String>("token").cloned(),
        function: sub
            .get_one::<String>("function")
            .cloned()
            .unwrap_or_else(|| DEFAULT_REMOTE_FUNCTION.to_string()),
    };
    config::set_remote_config(&app.store.conn(), &cfg)?;
    println!(
        "Remote set to {} (function {})",
        cfg.url.as_deref().unwrap_or_default(),
        cfg.function
    );
    Ok(())
}
