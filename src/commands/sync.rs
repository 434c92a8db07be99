// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use serde::Serialize;

use super::App;
use crate::models::SyncState;
use crate::sync::{Reconciler, SyncReport, SyncSnapshot};
use crate::utils::{maybe_print_json, pretty_table};

pub async fn handle(app: &App, m: &clap::ArgMatches) -> Result<()> {
    let reconciler = app.reconciler()?;
    match m.subcommand() {
        Some(("status", sub)) => status(app, &reconciler, sub)?,
        Some(("enable", _)) => {
            reconciler.enable_sync()?;
            println!("{}", reconciler.snapshot().status);
        }
        Some(("disable", _)) => {
            reconciler.disable_sync()?;
            println!("{}", reconciler.snapshot().status);
        }
        Some(("test", _)) => {
            let ok = reconciler.test_connection().await;
            let snap = reconciler.snapshot();
            match snap.last_connection_error.filter(|_| !ok) {
                Some(e) => println!("{}: {}", snap.status, e),
                None => println!("{}", snap.status),
            }
        }
        Some(("full", sub)) => report(reconciler.full_sync().await?, sub)?,
        Some(("incremental", sub)) => report(reconciler.incremental_sync().await?, sub)?,
        Some(("clean", sub)) => report(reconciler.clean_sync().await?, sub)?,
        Some(("retry", sub)) => report(reconciler.retry_failed_sync().await?, sub)?,
        Some(("smart", sub)) => {
            let r = reconciler.smart_sync().await?;
            let snap = reconciler.snapshot();
            report(r, sub)?;
            if let Some(e) = snap.last_error {
                eprintln!("warning: {}", e);
            }
        }
        _ => {}
    }
    Ok(())
}

fn report(r: SyncReport, sub: &clap::ArgMatches) -> Result<()> {
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &r)? {
        println!("{}", r.message);
    }
    Ok(())
}

#[derive(Serialize)]
struct Status {
    #[serde(flatten)]
    snapshot: SyncSnapshot,
    remote_url: Option<String>,
    pending: Vec<(String, String, usize)>,
}

fn status(app: &App, reconciler: &Reconciler, sub: &clap::ArgMatches) -> Result<()> {
    let states = [
        SyncState::Local,
        SyncState::SyncPending,
        SyncState::SyncFailed,
    ];
    let mut pending = Vec::new();
    for s in states {
        let txs = app.store.transactions_by_sync_state(&[s])?.len();
        let budgets = app.store.budgets_by_sync_state(&[s])?.len();
        pending.push(("transactions".to_string(), s.to_string(), txs));
        pending.push(("budgets".to_string(), s.to_string(), budgets));
    }
    let remote_url = app
        .remote_url
        .clone()
        .or(crate::settings::remote_config(&app.store.conn())?.url);
    let data = Status {
        snapshot: reconciler.snapshot(),
        remote_url,
        pending,
    };
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        return Ok(());
    }
    println!(
        "Sync {} | remote: {}",
        if data.snapshot.sync_enabled {
            "enabled"
        } else {
            "disabled"
        },
        data.remote_url.as_deref().unwrap_or("not configured")
    );
    let rows = data
        .pending
        .iter()
        .map(|(kind, state, n)| vec![kind.clone(), state.clone(), n.to_string()])
        .collect();
    println!("{}", pretty_table(&["Records", "State", "Count"], rows));
    Ok(())
}
