// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use serde::Serialize;

use super::{App, required, required_id};
use crate::budgets::BudgetEngine;
use crate::models::{Budget, BudgetOverview, BudgetSummary};
use crate::utils::{
    current_month, fmt_money, fmt_pct, maybe_print_json, parse_decimal, parse_month,
    pretty_table,
};

pub async fn handle(app: &App, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(app, sub).await?,
        Some(("list", sub)) => list(app, sub)?,
        Some(("report", sub)) => report(app, sub)?,
        Some(("rm", sub)) => rm(app, sub).await?,
        Some(("deactivate", sub)) => deactivate(app, sub).await?,
        Some(("cleanup", _)) => cleanup(app)?,
        _ => {}
    }
    Ok(())
}

fn month_of(sub: &clap::ArgMatches) -> Result<(u32, i32)> {
    match sub.get_one::<String>("month") {
        Some(m) => parse_month(m),
        None => Ok(current_month()),
    }
}

/// Updates the active budget for the key if there is one, otherwise
/// records a new one.
async fn set(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let category = required(sub, "category")?;
    let amount = parse_decimal(required(sub, "amount")?)?;
    let (month, year) = month_of(sub)?;
    let reconciler = app.reconciler()?;
    let engine = BudgetEngine::new(&app.store);

    let stored = match engine.budget_for_category_and_month(category, month, year)? {
        Some(mut existing) => {
            existing.amount = amount;
            reconciler.edit_budget(existing).await?
        }
        None => {
            reconciler
                .record_budget(Budget::new(category, amount, month, year))
                .await?
        }
    };
    println!(
        "Budget set for {}-{:02} / {} = {} ({})",
        year,
        month,
        category,
        fmt_money(&stored.amount, app.currency()?),
        stored.sync_state
    );
    Ok(())
}

fn list(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let mut data = app.store.list_budgets(sub.get_flag("all"))?;
    if sub.get_one::<String>("month").is_some() {
        let (month, year) = month_of(sub)?;
        data.retain(|b| b.month == month && b.year == year);
    }
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let ccy = app.currency()?;
        let rows = data
            .iter()
            .map(|b| {
                vec![
                    b.id.to_string(),
                    format!("{}-{:02}", b.year, b.month),
                    b.category.clone(),
                    fmt_money(&b.amount, ccy),
                    if b.is_active { "yes" } else { "no" }.to_string(),
                    b.sync_state.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["ID", "Month", "Category", "Budget", "Active", "Sync"], rows)
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct Report {
    summaries: Vec<BudgetSummary>,
    overview: BudgetOverview,
}

fn report(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let (month, year) = month_of(sub)?;
    let engine = BudgetEngine::new(&app.store);
    let data = Report {
        summaries: engine.all_budget_summaries_for_month(month, year)?,
        overview: engine.budget_overview(month, year)?,
    };
    if maybe_print_json(json_flag, jsonl_flag, &data)? {
        return Ok(());
    }

    let ccy = app.currency()?;
    let rows = data
        .summaries
        .iter()
        .map(|s| {
            vec![
                s.budget.category.clone(),
                fmt_money(&s.budget.amount, ccy),
                fmt_money(&s.spent_amount, ccy),
                fmt_money(&s.remaining_amount, ccy),
                fmt_pct(s.progress * 100.0),
                format!("{:?}", s.status),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Category", "Budget", "Spent", "Remaining", "Used", "Status"],
            rows
        )
    );
    let o = &data.overview;
    println!(
        "{}-{:02}: budgeted {}, spent {} ({}), {} over budget",
        o.year,
        o.month,
        fmt_money(&o.total_budgeted, ccy),
        fmt_money(&o.total_spent, ccy),
        fmt_pct(o.utilization * 100.0),
        o.over_budget.len()
    );
    Ok(())
}

async fn rm(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let id = required_id(sub)?;
    if !app.reconciler()?.remove_budget(id).await? {
        bail!("Budget {} not found", id);
    }
    println!("Deleted budget {}", id);
    Ok(())
}

async fn deactivate(app: &App, sub: &clap::ArgMatches) -> Result<()> {
    let id = required_id(sub)?;
    let b = app.reconciler()?.retire_budget(id).await?;
    println!(
        "Deactivated budget {} ({} {}-{:02})",
        b.id, b.category, b.year, b.month
    );
    Ok(())
}

fn cleanup(app: &App) -> Result<()> {
    let removed = BudgetEngine::new(&app.store).cleanup_duplicate_budgets();
    println!("Removed {} duplicate budget(s)", removed);
    Ok(())
}
