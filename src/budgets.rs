// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{debug, error, info};

use crate::error::{Error, Result};
use crate::models::{Budget, BudgetOverview, BudgetSummary, CategorySpending, ratio};
use crate::store::Store;

/// Budget CRUD plus spend-vs-budget summaries, read straight from the store.
pub struct BudgetEngine<'a> {
    store: &'a Store,
}

impl<'a> BudgetEngine<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn budget_for_category_and_month(
        &self,
        category: &str,
        month: u32,
        year: i32,
    ) -> Result<Option<Budget>> {
        self.store.find_active_budget(category, month, year)
    }

    /// Always inserts; a duplicate for the same key is left for cleanup.
    pub fn insert_budget(&self, budget: &Budget) -> Result<i64> {
        validate(budget)?;
        self.store.insert_budget(budget)
    }

    pub fn update_budget(&self, budget: &Budget) -> Result<()> {
        validate(budget)?;
        self.store.update_budget(budget)
    }

    pub fn delete_budget(&self, id: i64) -> Result<bool> {
        self.store.delete_budget(id)
    }

    pub fn deactivate_budget(&self, id: i64) -> Result<bool> {
        self.store.deactivate_budget(id)
    }

    pub fn spent_amount_for_category(&self, category: &str, month: u32, year: i32) -> Result<Decimal> {
        check_month(month)?;
        self.store.expense_total_for_month(category, month, year)
    }

    pub fn budget_summary_for_category(
        &self,
        category: &str,
        month: u32,
        year: i32,
    ) -> Result<Option<BudgetSummary>> {
        let Some(budget) = self.budget_for_category_and_month(category, month, year)? else {
            return Ok(None);
        };
        let spent = self.spent_amount_for_category(category, month, year)?;
        Ok(Some(BudgetSummary::new(budget, spent)))
    }

    /// One summary per active budget of the month. Categories with spending
    /// but no budget do not appear.
    pub fn all_budget_summaries_for_month(&self, month: u32, year: i32) -> Result<Vec<BudgetSummary>> {
        check_month(month)?;
        let budgets = self.store.active_budgets_for_month(month, year)?;
        let mut out = Vec::with_capacity(budgets.len());
        for b in budgets {
            let spent = self.store.expense_total_for_month(&b.category, month, year)?;
            out.push(BudgetSummary::new(b, spent));
        }
        Ok(out)
    }

    /// Expense totals per category for a month, largest first.
    pub fn category_spending_for_month(&self, month: u32, year: i32) -> Result<Vec<CategorySpending>> {
        check_month(month)?;
        let expenses = self.store.expenses_for_month(None, month, year)?;
        Ok(group_by_category(
            expenses.iter().map(|t| (t.category.as_str(), t.amount)),
        ))
    }

    pub fn budget_overview(&self, month: u32, year: i32) -> Result<BudgetOverview> {
        let summaries = self.all_budget_summaries_for_month(month, year)?;
        let total_budgeted: Decimal = summaries.iter().map(|s| s.budget.amount).sum();
        let total_spent: Decimal = summaries.iter().map(|s| s.spent_amount).sum();
        Ok(BudgetOverview {
            month,
            year,
            total_budgeted,
            total_spent,
            utilization: ratio(total_spent, total_budgeted),
            over_budget: summaries.into_iter().filter(|s| s.is_over_budget).collect(),
        })
    }

    /// Keeps one active budget per (category, month, year): the most recently
    /// synced, ties broken by the highest id. Returns the number removed.
    /// Failures are logged and reported as zero removals.
    pub fn cleanup_duplicate_budgets(&self) -> usize {
        match self.try_cleanup() {
            Ok(n) => {
                if n > 0 {
                    info!(removed = n, "removed duplicate budgets");
                }
                n
            }
            Err(e) => {
                error!(error = %e, "budget cleanup failed");
                0
            }
        }
    }

    fn try_cleanup(&self) -> Result<usize> {
        let mut groups: BTreeMap<(String, i32, u32), Vec<Budget>> = BTreeMap::new();
        for b in self.store.list_budgets(false)? {
            groups
                .entry((b.category.clone(), b.year, b.month))
                .or_default()
                .push(b);
        }
        let mut doomed = Vec::new();
        for ((category, year, month), mut group) in groups {
            if group.len() < 2 {
                continue;
            }
            // None < Some(_), so never-synced records fall behind synced ones
            group.sort_by(|a, b| (b.last_synced_at, b.id).cmp(&(a.last_synced_at, a.id)));
            debug!(%category, year, month, keep = group[0].id, dropped = group.len() - 1, "duplicate budgets");
            doomed.extend(group.iter().skip(1).map(|b| b.id));
        }
        if doomed.is_empty() {
            return Ok(0);
        }
        self.store.delete_budgets(&doomed)
    }
}

pub(crate) fn group_by_category<'t>(
    items: impl Iterator<Item = (&'t str, Decimal)>,
) -> Vec<CategorySpending> {
    let mut by_cat: BTreeMap<&str, (Decimal, usize)> = BTreeMap::new();
    for (cat, amount) in items {
        let e = by_cat.entry(cat).or_insert((Decimal::ZERO, 0));
        e.0 += amount;
        e.1 += 1;
    }
    let mut out: Vec<CategorySpending> = by_cat
        .into_iter()
        .map(|(category, (total_spent, transaction_count))| CategorySpending {
            category: category.to_string(),
            total_spent,
            transaction_count,
        })
        .collect();
    // stable: equal totals stay in name order
    out.sort_by(|a, b| b.total_spent.cmp(&a.total_spent));
    out
}

fn check_month(month: u32) -> Result<()> {
    if !(1..=12).contains(&month) {
        return Err(Error::Invalid(format!("month {} is outside 1-12", month)));
    }
    Ok(())
}

fn validate(b: &Budget) -> Result<()> {
    check_month(b.month)?;
    if b.amount < Decimal::ZERO {
        return Err(Error::Invalid(format!(
            "budget amount {} must not be negative",
            b.amount
        )));
    }
    Ok(())
}
