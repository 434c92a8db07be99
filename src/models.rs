// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "INCOME",
            TransactionKind::Expense => "EXPENSE",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INCOME" => Ok(TransactionKind::Income),
            "EXPENSE" => Ok(TransactionKind::Expense),
            other => Err(Error::Invalid(format!("unknown transaction kind '{}'", other))),
        }
    }
}

/// Synchronization lifecycle of a locally held record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    /// Never synced.
    Local,
    /// A remote write was attempted and still needs confirmation.
    SyncPending,
    Synced,
    SyncFailed,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Local => "LOCAL",
            SyncState::SyncPending => "SYNC_PENDING",
            SyncState::Synced => "SYNCED",
            SyncState::SyncFailed => "SYNC_FAILED",
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOCAL" => Ok(SyncState::Local),
            "SYNC_PENDING" => Ok(SyncState::SyncPending),
            "SYNCED" => Ok(SyncState::Synced),
            "SYNC_FAILED" => Ok(SyncState::SyncFailed),
            other => Err(Error::Invalid(format!("unknown sync state '{}'", other))),
        }
    }
}

/// Largest amount (10^15) accepted for a transaction or budget. Sums over any
/// realistic number of records stay inside `Decimal` range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x3_8D7E, 0, false, 0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64, // 0 until stored
    pub amount: Decimal,
    pub kind: TransactionKind,
    pub category: String,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub remote_id: Option<String>,
    pub sync_state: SyncState,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Transaction {
    pub fn new(
        amount: Decimal,
        kind: TransactionKind,
        category: &str,
        description: Option<&str>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: 0,
            amount,
            kind,
            category: category.to_string(),
            description: description.map(|s| s.to_string()),
            occurred_at,
            remote_id: None,
            sync_state: SyncState::Local,
            last_synced_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub category: String,
    pub amount: Decimal,
    pub month: u32, // 1-12
    pub year: i32,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub remote_id: Option<String>,
    pub sync_state: SyncState,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Budget {
    pub fn new(category: &str, amount: Decimal, month: u32, year: i32) -> Self {
        Self {
            id: 0,
            category: category.to_string(),
            amount,
            month,
            year,
            created_at: Utc::now(),
            is_active: true,
            remote_id: None,
            sync_state: SyncState::Local,
            last_synced_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySpending {
    pub category: String,
    pub total_spent: Decimal,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetStatus {
    Safe,
    Good,
    Warning,
    OverBudget,
}

impl BudgetStatus {
    pub fn from_progress(progress: f64, is_over_budget: bool) -> Self {
        if is_over_budget {
            BudgetStatus::OverBudget
        } else if progress >= 0.9 {
            BudgetStatus::Warning
        } else if progress >= 0.7 {
            BudgetStatus::Good
        } else {
            BudgetStatus::Safe
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    pub budget: Budget,
    pub spent_amount: Decimal,
    pub remaining_amount: Decimal,
    /// Unclamped; exceeds 1.0 once the budget is overspent.
    pub progress: f64,
    pub is_over_budget: bool,
    pub status: BudgetStatus,
}

impl BudgetSummary {
    pub fn new(budget: Budget, spent_amount: Decimal) -> Self {
        let remaining_amount = budget.amount - spent_amount;
        let progress = if budget.amount.is_zero() {
            0.0
        } else {
            ratio(spent_amount, budget.amount)
        };
        let is_over_budget = spent_amount > budget.amount;
        Self {
            status: BudgetStatus::from_progress(progress, is_over_budget),
            budget,
            spent_amount,
            remaining_amount,
            progress,
            is_over_budget,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetOverview {
    pub month: u32,
    pub year: i32,
    pub total_budgeted: Decimal,
    pub total_spent: Decimal,
    pub utilization: f64,
    pub over_budget: Vec<BudgetSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySpending {
    pub month: String, // "01".."12"
    pub year: i32,
    pub total_spent: Decimal,
    pub total_income: Decimal,
    pub net_savings: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalyticsPeriod {
    ThisWeek,
    ThisMonth,
    LastMonth,
    Last3Months,
    ThisYear,
    /// Resolves like `ThisMonth`.
    Custom,
}

impl FromStr for AnalyticsPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "this-week" | "week" => Ok(AnalyticsPeriod::ThisWeek),
            "this-month" | "month" => Ok(AnalyticsPeriod::ThisMonth),
            "last-month" => Ok(AnalyticsPeriod::LastMonth),
            "last-3-months" | "quarter" => Ok(AnalyticsPeriod::Last3Months),
            "this-year" | "year" => Ok(AnalyticsPeriod::ThisYear),
            "custom" => Ok(AnalyticsPeriod::Custom),
            other => Err(Error::Invalid(format!("unknown period '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingAnalytics {
    pub period: AnalyticsPeriod,
    pub total_spent: Decimal,
    pub total_income: Decimal,
    pub category_breakdown: Vec<CategorySpending>,
    pub monthly_trends: Vec<MonthlySpending>,
    pub top_expense_categories: Vec<CategorySpending>,
    pub average_daily_spending: Decimal,
    pub savings_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingComparison {
    pub current_period: Decimal,
    pub previous_period: Decimal,
    pub change_amount: Decimal,
    pub change_percentage: f64,
    pub is_increase: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTrend {
    pub category: String,
    pub current_month: Decimal,
    pub previous_month: Decimal,
    pub change_percentage: f64,
    pub is_increasing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InsightType {
    SpendingIncrease,
    SpendingDecrease,
    TopCategory,
    SavingsAchievement,
    Recommendation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendingInsight {
    pub title: String,
    pub description: String,
    pub kind: InsightType,
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    INR,
    USD,
    EUR,
    GBP,
    JPY,
    AUD,
    CAD,
    CHF,
    CNY,
    SGD,
}

impl Currency {
    pub const DEFAULT: Currency = Currency::INR;

    pub const ALL: [Currency; 10] = [
        Currency::INR,
        Currency::USD,
        Currency::EUR,
        Currency::GBP,
        Currency::JPY,
        Currency::AUD,
        Currency::CAD,
        Currency::CHF,
        Currency::CNY,
        Currency::SGD,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Currency::INR => "INR",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::JPY => "JPY",
            Currency::AUD => "AUD",
            Currency::CAD => "CAD",
            Currency::CHF => "CHF",
            Currency::CNY => "CNY",
            Currency::SGD => "SGD",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::INR => "₹",
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::JPY | Currency::CNY => "¥",
            Currency::AUD => "A$",
            Currency::CAD => "C$",
            Currency::CHF => "CHF",
            Currency::SGD => "S$",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Currency::INR => "Indian Rupee",
            Currency::USD => "US Dollar",
            Currency::EUR => "Euro",
            Currency::GBP => "British Pound",
            Currency::JPY => "Japanese Yen",
            Currency::AUD => "Australian Dollar",
            Currency::CAD => "Canadian Dollar",
            Currency::CHF => "Swiss Franc",
            Currency::CNY => "Chinese Yuan",
            Currency::SGD => "Singapore Dollar",
        }
    }

    /// Unknown codes fall back to the default currency.
    pub fn from_code(code: &str) -> Currency {
        let code = code.trim().to_ascii_uppercase();
        Currency::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .unwrap_or(Currency::DEFAULT)
    }
}

/// `num / den` as a float; callers guard the zero denominator.
pub(crate) fn ratio(num: Decimal, den: Decimal) -> f64 {
    if den.is_zero() {
        return 0.0;
    }
    (num / den).to_f64().unwrap_or(0.0)
}

/// `num / den * 100`, or 0 when `den` is zero.
pub(crate) fn percentage(num: Decimal, den: Decimal) -> f64 {
    if den.is_zero() {
        return 0.0;
    }
    ((num / den) * Decimal::ONE_HUNDRED).to_f64().unwrap_or(0.0)
}
