// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use serde::Serialize;

use super::{App, required};
use crate::analytics::AnalyticsEngine;
use crate::models::{AnalyticsPeriod, FinancialSummary, SpendingAnalytics};
use crate::utils::{fmt_money, fmt_pct, maybe_print_json, pretty_table};

pub fn handle(app: &App, m: &clap::ArgMatches) -> Result<()> {
    let week_start = crate::settings::week_start(&app.store.conn())?;
    let engine = AnalyticsEngine::new(&app.store, week_start);
    match m.subcommand() {
        Some(("summary", sub)) => summary(app, &engine, sub)?,
        Some(("compare", sub)) => compare(app, &engine, sub)?,
        Some(("trends", sub)) => trends(app, &engine, sub)?,
        Some(("insights", sub)) => insights(&engine, sub)?,
        _ => {}
    }
    Ok(())
}

fn period_of(sub: &clap::ArgMatches) -> Result<AnalyticsPeriod> {
    let p = required(sub, "period")?;
    p.parse::<AnalyticsPeriod>()
        .with_context(|| format!("Unknown period '{}'", p))
}

#[derive(Serialize)]
struct Summary {
    overall: FinancialSummary,
    period: SpendingAnalytics,
}

fn summary(app: &App, engine: &AnalyticsEngine, sub: &clap::ArgMatches) -> Result<()> {
    let data = Summary {
        overall: engine.financial_summary()?,
        period: engine.spending_analytics(period_of(sub)?)?,
    };
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        return Ok(());
    }
    let ccy = app.currency()?;
    let a = &data.period;
    println!(
        "Balance {} (income {}, expenses {})",
        fmt_money(&data.overall.balance, ccy),
        fmt_money(&data.overall.total_income, ccy),
        fmt_money(&data.overall.total_expense, ccy)
    );
    println!(
        "{:?}: spent {}, earned {}, saved {}, {} per active day",
        a.period,
        fmt_money(&a.total_spent, ccy),
        fmt_money(&a.total_income, ccy),
        fmt_pct(a.savings_rate),
        fmt_money(&a.average_daily_spending, ccy)
    );
    let rows = a
        .category_breakdown
        .iter()
        .map(|c| {
            vec![
                c.category.clone(),
                fmt_money(&c.total_spent, ccy),
                c.transaction_count.to_string(),
            ]
        })
        .collect();
    println!("{}", pretty_table(&["Category", "Spent", "Count"], rows));
    let rows = a
        .monthly_trends
        .iter()
        .map(|m| {
            vec![
                format!("{}-{}", m.year, m.month),
                fmt_money(&m.total_spent, ccy),
                fmt_money(&m.total_income, ccy),
                fmt_money(&m.net_savings, ccy),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Month", "Spent", "Income", "Net"], rows)
    );
    Ok(())
}

fn compare(app: &App, engine: &AnalyticsEngine, sub: &clap::ArgMatches) -> Result<()> {
    let c = engine.spending_comparison(period_of(sub)?)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &c)? {
        return Ok(());
    }
    let ccy = app.currency()?;
    println!(
        "{}",
        pretty_table(
            &["Current", "Previous", "Change", "Change %"],
            vec![vec![
                fmt_money(&c.current_period, ccy),
                fmt_money(&c.previous_period, ccy),
                fmt_money(&c.change_amount, ccy),
                fmt_pct(c.change_percentage),
            ]]
        )
    );
    Ok(())
}

fn trends(app: &App, engine: &AnalyticsEngine, sub: &clap::ArgMatches) -> Result<()> {
    let data = engine.category_trends()?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        return Ok(());
    }
    let ccy = app.currency()?;
    let rows = data
        .iter()
        .map(|t| {
            vec![
                t.category.clone(),
                fmt_money(&t.current_month, ccy),
                fmt_money(&t.previous_month, ccy),
                fmt_pct(t.change_percentage),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Category", "This month", "Last month", "Change"], rows)
    );
    Ok(())
}

fn insights(engine: &AnalyticsEngine, sub: &clap::ArgMatches) -> Result<()> {
    let data = engine.spending_insights(period_of(sub)?)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        return Ok(());
    }
    if data.is_empty() {
        println!("No insights for this period");
    }
    for i in &data {
        println!("* {}: {}", i.title, i.description);
    }
    Ok(())
}
