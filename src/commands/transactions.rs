// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, bail};
use chrono::Utc;

use super::{App, required, required_id};
use crate::models::{Transaction, TransactionKind};
use crate::utils::{fmt_money, maybe_print_json, parse_day, parse_decimal, pretty_table};

pub async fn handle(app: &App, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(app, sub).await?,
        Some(("list", sub)) => list(app, sub)?,
        Some(("edit", sub)) => edit(app, sub).await?,
        Some(("rm", sub)) => rm(app, sub).await?,
        _ => {}
    }
    Ok(())
}

async fn add(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let amount = parse_decimal(required(sub, "amount")?)?;
    let kind = required(sub, "kind")?.parse::<TransactionKind>()?;
    let category = required(sub, "category")?;
    let description = sub.get_one::<String>("description").map(|s| s.as_str());
    let occurred_at = match sub.get_one::<String>("date") {
        Some(d) => parse_day(d)?,
        None => Utc::now(),
    };

    let tx = Transaction::new(amount, kind, category, description, occurred_at);
    let stored = app
        .reconciler()?
        .record_transaction(tx)
        .await
        .context("Failed to record transaction")?;
    println!(
        "Recorded {} {} in '{}' (id {}, {})",
        stored.kind,
        fmt_money(&stored.amount, app.currency()?),
        stored.category,
        stored.id,
        stored.sync_state
    );
    Ok(())
}

fn list(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let limit = sub.get_one::<usize>("limit").copied();
    let data = app.store.list_transactions(limit)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let ccy = app.currency()?;
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|t| {
                vec![
                    t.id.to_string(),
                    t.occurred_at.format("%Y-%m-%d").to_string(),
                    t.kind.to_string(),
                    t.category.clone(),
                    fmt_money(&t.amount, ccy),
                    t.description.clone().unwrap_or_default(),
                    t.sync_state.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Date", "Kind", "Category", "Amount", "Description", "Sync"],
                rows
            )
        );
    }
    Ok(())
}

async fn edit(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let id = required_id(sub)?;
    let Some(mut tx) = app.store.get_transaction(id)? else {
        bail!("Transaction {} not found", id);
    };
    if let Some(a) = sub.get_one::<String>("amount") {
        tx.amount = parse_decimal(a)?;
    }
    if let Some(k) = sub.get_one::<String>("kind") {
        tx.kind = k.parse()?;
    }
    if let Some(c) = sub.get_one::<String>("category") {
        tx.category = c.clone();
    }
    if let Some(d) = sub.get_one::<String>("description") {
        tx.description = Some(d.clone()).filter(|d| !d.is_empty());
    }
    if let Some(d) = sub.get_one::<String>("date") {
        tx.occurred_at = parse_day(d)?;
    }
    let stored = app.reconciler()?.edit_transaction(tx).await?;
    println!("Updated transaction {} ({})", stored.id, stored.sync_state);
    Ok(())
}

async fn rm(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let id = required_id(sub)?;
    if app.reconciler()?.remove_transaction(id).await? {
        println!("Deleted transaction {}", id);
    } else {
        bail!("Transaction {} not found", id);
    }
    Ok(())
}
