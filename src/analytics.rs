// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Period-scoped spending analytics and rule-based insights.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use crate::budgets::group_by_category;
use crate::error::Result;
use crate::models::{
    AnalyticsPeriod, CategorySpending, CategoryTrend, FinancialSummary, InsightType,
    MonthlySpending, SpendingAnalytics, SpendingComparison, SpendingInsight, Transaction,
    TransactionKind, percentage,
};
use crate::period::{DateRange, resolve_period, resolve_previous_period};
use crate::store::Store;

const TOP_CATEGORIES: usize = 5;
const SPENDING_CHANGE_THRESHOLD: f64 = 10.0;
const CATEGORY_TREND_THRESHOLD: f64 = 50.0;
const MAX_TREND_INSIGHTS: usize = 2;
const GOOD_SAVINGS_RATE: f64 = 20.0;
const LOW_SAVINGS_RATE: f64 = 5.0;

pub struct AnalyticsEngine<'a> {
    store: &'a Store,
    week_start: Weekday,
    now: Option<DateTime<Utc>>,
}

impl<'a> AnalyticsEngine<'a> {
    pub fn new(store: &'a Store, week_start: Weekday) -> Self {
        Self {
            store,
            week_start,
            now: None,
        }
    }

    /// Pins "now" for period resolution.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    pub fn period_range(&self, period: AnalyticsPeriod) -> Result<DateRange> {
        resolve_period(period, self.now(), self.week_start)
    }

    pub fn previous_period_range(&self, period: AnalyticsPeriod) -> Result<DateRange> {
        resolve_previous_period(period, self.now(), self.week_start)
    }

    fn in_range(&self, r: &DateRange) -> Result<Vec<Transaction>> {
        self.store.transactions_between(&r.start, &r.end)
    }

    pub fn spending_analytics(&self, period: AnalyticsPeriod) -> Result<SpendingAnalytics> {
        let txs = self.in_range(&self.period_range(period)?)?;
        let total_spent = total(&txs, TransactionKind::Expense);
        let total_income = total(&txs, TransactionKind::Income);
        let category_breakdown = category_breakdown(&txs);
        let top_expense_categories = category_breakdown
            .iter()
            .take(TOP_CATEGORIES)
            .cloned()
            .collect();
        let savings_rate = if total_income > Decimal::ZERO {
            percentage(total_income - total_spent, total_income)
        } else {
            0.0
        };
        Ok(SpendingAnalytics {
            period,
            total_spent,
            total_income,
            category_breakdown,
            monthly_trends: monthly_trends(&txs),
            top_expense_categories,
            average_daily_spending: average_daily_spending(&txs),
            savings_rate,
        })
    }

    pub fn spending_comparison(&self, period: AnalyticsPeriod) -> Result<SpendingComparison> {
        let current = total(
            &self.in_range(&self.period_range(period)?)?,
            TransactionKind::Expense,
        );
        let previous = total(
            &self.in_range(&self.previous_period_range(period)?)?,
            TransactionKind::Expense,
        );
        let change_amount = current - previous;
        let change_percentage = if previous > Decimal::ZERO {
            percentage(change_amount, previous)
        } else {
            0.0
        };
        Ok(SpendingComparison {
            current_period: current,
            previous_period: previous,
            change_amount,
            change_percentage,
            is_increase: change_amount > Decimal::ZERO,
        })
    }

    /// This month against the previous full month, per category spent on
    /// this month.
    pub fn category_trends(&self) -> Result<Vec<CategoryTrend>> {
        let current = category_breakdown(
            &self.in_range(&self.period_range(AnalyticsPeriod::ThisMonth)?)?,
        );
        let previous: HashMap<String, Decimal> = category_breakdown(
            &self.in_range(&self.previous_period_range(AnalyticsPeriod::ThisMonth)?)?,
        )
        .into_iter()
        .map(|c| (c.category, c.total_spent))
        .collect();

        Ok(current
            .into_iter()
            .map(|c| {
                let prev = previous.get(&c.category).copied().unwrap_or(Decimal::ZERO);
                let change = c.total_spent - prev;
                let change_percentage = if prev > Decimal::ZERO {
                    percentage(change, prev)
                } else if c.total_spent > Decimal::ZERO {
                    100.0
                } else {
                    0.0
                };
                CategoryTrend {
                    category: c.category,
                    current_month: c.total_spent,
                    previous_month: prev,
                    change_percentage,
                    is_increasing: change > Decimal::ZERO,
                }
            })
            .collect())
    }

    pub fn spending_insights(&self, period: AnalyticsPeriod) -> Result<Vec<SpendingInsight>> {
        let analytics = self.spending_analytics(period)?;
        let comparison = self.spending_comparison(period)?;
        let trends = self.category_trends()?;
        let mut insights = Vec::new();

        if let Some(top) = analytics.top_expense_categories.first() {
            let pct = percentage(top.total_spent, analytics.total_spent);
            insights.push(SpendingInsight {
                title: "Top Spending Category".into(),
                description: format!(
                    "{} accounts for {}% of your expenses",
                    top.category, pct as i64
                ),
                kind: InsightType::TopCategory,
                category: Some(top.category.clone()),
                amount: Some(top.total_spent),
                percentage: Some(pct),
            });
        }

        if comparison.change_percentage.abs() > SPENDING_CHANGE_THRESHOLD {
            let pct = comparison.change_percentage.abs();
            insights.push(SpendingInsight {
                title: "Spending Change".into(),
                description: format!(
                    "Your spending has {} by {}% compared to last period",
                    direction(comparison.is_increase),
                    pct as i64
                ),
                kind: change_kind(comparison.is_increase),
                category: None,
                amount: Some(comparison.change_amount.abs()),
                percentage: Some(pct),
            });
        }

        if analytics.savings_rate > GOOD_SAVINGS_RATE {
            insights.push(SpendingInsight {
                title: "Great Savings!".into(),
                description: format!(
                    "You're saving {}% of your income. Keep it up!",
                    analytics.savings_rate as i64
                ),
                kind: InsightType::SavingsAchievement,
                category: None,
                amount: None,
                percentage: Some(analytics.savings_rate),
            });
        } else if analytics.savings_rate < LOW_SAVINGS_RATE {
            insights.push(SpendingInsight {
                title: "Improve Savings".into(),
                description: "Consider reducing expenses to increase your savings rate".into(),
                kind: InsightType::Recommendation,
                category: None,
                amount: None,
                percentage: Some(analytics.savings_rate),
            });
        }

        // kept in trend order, not by magnitude
        for trend in trends
            .iter()
            .filter(|t| t.change_percentage.abs() > CATEGORY_TREND_THRESHOLD)
            .take(MAX_TREND_INSIGHTS)
        {
            let pct = trend.change_percentage.abs();
            insights.push(SpendingInsight {
                title: "Category Trend".into(),
                description: format!(
                    "{} spending has {} by {}%",
                    trend.category,
                    direction(trend.is_increasing),
                    pct as i64
                ),
                kind: change_kind(trend.is_increasing),
                category: Some(trend.category.clone()),
                amount: None,
                percentage: Some(pct),
            });
        }

        Ok(insights)
    }

    /// All-time income, expense and balance.
    pub fn financial_summary(&self) -> Result<FinancialSummary> {
        let txs = self.store.list_transactions(None)?;
        let total_income = total(&txs, TransactionKind::Income);
        let total_expense = total(&txs, TransactionKind::Expense);
        Ok(FinancialSummary {
            total_income,
            total_expense,
            balance: total_income - total_expense,
        })
    }
}

fn total(txs: &[Transaction], kind: TransactionKind) -> Decimal {
    txs.iter().filter(|t| t.kind == kind).map(|t| t.amount).sum()
}

fn category_breakdown(txs: &[Transaction]) -> Vec<CategorySpending> {
    group_by_category(
        txs.iter()
            .filter(|t| t.kind == TransactionKind::Expense)
            .map(|t| (t.category.as_str(), t.amount)),
    )
}

/// Newest month first.
fn monthly_trends(txs: &[Transaction]) -> Vec<MonthlySpending> {
    let mut by_month: BTreeMap<(i32, u32), (Decimal, Decimal)> = BTreeMap::new();
    for t in txs {
        let e = by_month
            .entry((t.occurred_at.year(), t.occurred_at.month()))
            .or_insert((Decimal::ZERO, Decimal::ZERO));
        match t.kind {
            TransactionKind::Expense => e.0 += t.amount,
            TransactionKind::Income => e.1 += t.amount,
        }
    }
    by_month
        .into_iter()
        .rev()
        .map(|((year, month), (spent, income))| MonthlySpending {
            month: format!("{:02}", month),
            year,
            total_spent: spent,
            total_income: income,
            net_savings: income - spent,
        })
        .collect()
}

/// Mean of per-day expense totals over days that had any expense.
fn average_daily_spending(txs: &[Transaction]) -> Decimal {
    let mut by_day: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    for t in txs.iter().filter(|t| t.kind == TransactionKind::Expense) {
        *by_day.entry(t.occurred_at.date_naive()).or_insert(Decimal::ZERO) += t.amount;
    }
    if by_day.is_empty() {
        return Decimal::ZERO;
    }
    let sum: Decimal = by_day.values().copied().sum();
    sum / Decimal::from(by_day.len())
}

fn direction(increase: bool) -> &'static str {
    if increase { "increased" } else { "decreased" }
}

fn change_kind(increase: bool) -> InsightType {
    if increase {
        InsightType::SpendingIncrease
    } else {
        InsightType::SpendingDecrease
    }
}
