// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{DateTime, TimeZone, Utc, Weekday};
use rust_decimal::Decimal;
use tallyhub::analytics::AnalyticsEngine;
use tallyhub::models::{AnalyticsPeriod, InsightType, Transaction, TransactionKind};
use tallyhub::store::Store;

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

// Saturday
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap()
}

fn add(store: &Store, kind: TransactionKind, amount: &str, category: &str, at: DateTime<Utc>) {
    store
        .insert_transaction(&Transaction::new(d(amount), kind, category, None, at))
        .unwrap();
}

fn spend(store: &Store, amount: &str, category: &str, m: u32, day: u32) {
    let at = Utc.with_ymd_and_hms(2025, m, day, 10, 0, 0).unwrap();
    add(store, TransactionKind::Expense, amount, category, at);
}

fn engine(store: &Store) -> AnalyticsEngine<'_> {
    AnalyticsEngine::new(store, Weekday::Mon).at(now())
}

#[test]
fn empty_store_yields_zeroes() {
    let store = Store::open_in_memory().unwrap();
    let e = engine(&store);

    let a = e.spending_analytics(AnalyticsPeriod::ThisMonth).unwrap();
    assert_eq!(a.total_spent, Decimal::ZERO);
    assert_eq!(a.total_income, Decimal::ZERO);
    assert_eq!(a.savings_rate, 0.0);
    assert_eq!(a.average_daily_spending, Decimal::ZERO);
    assert!(a.category_breakdown.is_empty());
    assert!(a.monthly_trends.is_empty());

    let c = e.spending_comparison(AnalyticsPeriod::ThisMonth).unwrap();
    assert_eq!(c.change_percentage, 0.0);
    assert!(!c.is_increase);

    assert!(e.category_trends().unwrap().is_empty());

    let insights = e.spending_insights(AnalyticsPeriod::ThisMonth).unwrap();
    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].kind, InsightType::Recommendation);
    assert_eq!(insights[0].title, "Improve Savings");
}

#[test]
fn period_bounds() {
    let store = Store::open_in_memory().unwrap();
    let e = engine(&store);

    let month = e.period_range(AnalyticsPeriod::ThisMonth).unwrap();
    assert_eq!(month.start, Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap());
    assert_eq!(month.end, now());
    assert_eq!(e.period_range(AnalyticsPeriod::Custom).unwrap(), month);

    let last = e.period_range(AnalyticsPeriod::LastMonth).unwrap();
    assert_eq!(last.start, Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap());
    assert_eq!(
        last.end,
        Utc.with_ymd_and_hms(2025, 2, 28, 23, 59, 59).unwrap() + chrono::TimeDelta::milliseconds(999)
    );

    let week = e.period_range(AnalyticsPeriod::ThisWeek).unwrap();
    assert_eq!(week.start, Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap());

    let quarter = e.period_range(AnalyticsPeriod::Last3Months).unwrap();
    assert_eq!(quarter.start, Utc.with_ymd_and_hms(2024, 12, 1, 0, 0, 0).unwrap());

    let year = e.period_range(AnalyticsPeriod::ThisYear).unwrap();
    assert_eq!(year.start, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());

    // no predecessor: compares against itself
    assert_eq!(e.previous_period_range(AnalyticsPeriod::ThisYear).unwrap(), year);
}

#[test]
fn sunday_week_start_moves_the_window() {
    let store = Store::open_in_memory().unwrap();
    let e = AnalyticsEngine::new(&store, Weekday::Sun).at(now());
    let week = e.period_range(AnalyticsPeriod::ThisWeek).unwrap();
    assert_eq!(week.start, Utc.with_ymd_and_hms(2025, 3, 9, 0, 0, 0).unwrap());
}

#[test]
fn analytics_for_this_month() {
    let store = Store::open_in_memory().unwrap();
    add(
        &store,
        TransactionKind::Income,
        "1000",
        "Salary",
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
    );
    spend(&store, "30", "Food", 3, 2);
    spend(&store, "10", "Rent", 3, 2);
    spend(&store, "20", "Food", 3, 5);
    // outside the window
    spend(&store, "500", "Food", 2, 20);
    spend(&store, "700", "Food", 3, 20);

    let a = engine(&store)
        .spending_analytics(AnalyticsPeriod::ThisMonth)
        .unwrap();
    assert_eq!(a.total_spent, d("60"));
    assert_eq!(a.total_income, d("1000"));
    assert_eq!(a.savings_rate, 94.0);
    // 40 on the 2nd, 20 on the 5th
    assert_eq!(a.average_daily_spending, d("30"));
    assert_eq!(a.category_breakdown.len(), 2);
    assert_eq!(a.category_breakdown[0].category, "Food");
    assert_eq!(a.category_breakdown[0].total_spent, d("50"));
    assert_eq!(a.category_breakdown[0].transaction_count, 2);
    assert_eq!(a.top_expense_categories, a.category_breakdown);
    assert_eq!(a.monthly_trends.len(), 1);
    assert_eq!(a.monthly_trends[0].month, "03");
    assert_eq!(a.monthly_trends[0].net_savings, d("940"));
}

#[test]
fn top_categories_are_capped_at_five() {
    let store = Store::open_in_memory().unwrap();
    for (i, cat) in ["A", "B", "C", "D", "E", "F", "G"].iter().enumerate() {
        spend(&store, &format!("{}", 10 * (i + 1)), cat, 3, 3);
    }
    let a = engine(&store)
        .spending_analytics(AnalyticsPeriod::ThisMonth)
        .unwrap();
    assert_eq!(a.category_breakdown.len(), 7);
    let top: Vec<&str> = a
        .top_expense_categories
        .iter()
        .map(|c| c.category.as_str())
        .collect();
    assert_eq!(top, vec!["G", "F", "E", "D", "C"]);
}

#[test]
fn overspending_gives_negative_savings_rate() {
    let store = Store::open_in_memory().unwrap();
    add(
        &store,
        TransactionKind::Income,
        "100",
        "Salary",
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
    );
    spend(&store, "150", "Food", 3, 3);
    let e = engine(&store);
    let a = e.spending_analytics(AnalyticsPeriod::ThisMonth).unwrap();
    assert_eq!(a.savings_rate, -50.0);
    let insights = e.spending_insights(AnalyticsPeriod::ThisMonth).unwrap();
    assert!(insights.iter().any(|i| i.kind == InsightType::Recommendation));
}

#[test]
fn monthly_trends_are_newest_first() {
    let store = Store::open_in_memory().unwrap();
    spend(&store, "10", "Food", 1, 10);
    spend(&store, "20", "Food", 3, 10);
    add(
        &store,
        TransactionKind::Income,
        "50",
        "Gift",
        Utc.with_ymd_and_hms(2025, 1, 11, 0, 0, 0).unwrap(),
    );
    let a = engine(&store)
        .spending_analytics(AnalyticsPeriod::Last3Months)
        .unwrap();
    let months: Vec<(String, i32)> = a
        .monthly_trends
        .iter()
        .map(|m| (m.month.clone(), m.year))
        .collect();
    assert_eq!(months, vec![("03".to_string(), 2025), ("01".to_string(), 2025)]);
    assert_eq!(a.monthly_trends[1].net_savings, d("40"));
}

#[test]
fn comparison_against_previous_month() {
    let store = Store::open_in_memory().unwrap();
    spend(&store, "100", "Food", 2, 10);
    spend(&store, "50", "Food", 3, 10);
    let c = engine(&store)
        .spending_comparison(AnalyticsPeriod::ThisMonth)
        .unwrap();
    assert_eq!(c.current_period, d("50"));
    assert_eq!(c.previous_period, d("100"));
    assert_eq!(c.change_amount, d("-50"));
    assert_eq!(c.change_percentage, -50.0);
    assert!(!c.is_increase);
}

#[test]
fn comparison_without_previous_spending_is_zero_percent() {
    let store = Store::open_in_memory().unwrap();
    spend(&store, "80", "Food", 3, 10);
    let c = engine(&store)
        .spending_comparison(AnalyticsPeriod::ThisMonth)
        .unwrap();
    assert_eq!(c.change_percentage, 0.0);
    assert!(c.is_increase);
}

#[test]
fn previous_week_ends_just_before_this_week() {
    let store = Store::open_in_memory().unwrap();
    add(
        &store,
        TransactionKind::Expense,
        "40",
        "Food",
        Utc.with_ymd_and_hms(2025, 3, 9, 23, 59, 59).unwrap(),
    );
    add(
        &store,
        TransactionKind::Expense,
        "60",
        "Food",
        Utc.with_ymd_and_hms(2025, 3, 10, 0, 0, 0).unwrap(),
    );
    // before the previous week
    add(
        &store,
        TransactionKind::Expense,
        "999",
        "Food",
        Utc.with_ymd_and_hms(2025, 3, 2, 23, 0, 0).unwrap(),
    );
    let c = engine(&store)
        .spending_comparison(AnalyticsPeriod::ThisWeek)
        .unwrap();
    assert_eq!(c.current_period, d("60"));
    assert_eq!(c.previous_period, d("40"));
    assert_eq!(c.change_percentage, 50.0);
}

#[test]
fn new_category_trends_at_one_hundred_percent() {
    let store = Store::open_in_memory().unwrap();
    spend(&store, "50", "Food", 3, 4);
    spend(&store, "40", "Fun", 2, 4);
    spend(&store, "20", "Fun", 3, 4);

    let trends = engine(&store).category_trends().unwrap();
    assert_eq!(trends.len(), 2);
    assert_eq!(trends[0].category, "Food");
    assert_eq!(trends[0].change_percentage, 100.0);
    assert!(trends[0].is_increasing);
    assert_eq!(trends[0].previous_month, Decimal::ZERO);
    assert_eq!(trends[1].category, "Fun");
    assert_eq!(trends[1].change_percentage, -50.0);
    assert!(!trends[1].is_increasing);
}

#[test]
fn insights_follow_rule_order() {
    let store = Store::open_in_memory().unwrap();
    spend(&store, "100", "Food", 2, 3);
    spend(&store, "100", "Rent", 2, 1);
    add(
        &store,
        TransactionKind::Income,
        "1000",
        "Salary",
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
    );
    spend(&store, "300", "Food", 3, 2);
    spend(&store, "100", "Rent", 3, 3);

    let insights = engine(&store)
        .spending_insights(AnalyticsPeriod::ThisMonth)
        .unwrap();
    let kinds: Vec<InsightType> = insights.iter().map(|i| i.kind).collect();
    assert_eq!(
        kinds,
        vec![
            InsightType::TopCategory,
            InsightType::SpendingIncrease,
            InsightType::SavingsAchievement,
            InsightType::SpendingIncrease,
        ]
    );
    assert_eq!(insights[0].description, "Food accounts for 75% of your expenses");
    assert_eq!(insights[0].amount, Some(d("300")));
    assert_eq!(
        insights[1].description,
        "Your spending has increased by 100% compared to last period"
    );
    assert_eq!(insights[1].amount, Some(d("200")));
    assert_eq!(insights[2].title, "Great Savings!");
    assert_eq!(
        insights[2].description,
        "You're saving 60% of your income. Keep it up!"
    );
    assert_eq!(insights[3].title, "Category Trend");
    assert_eq!(insights[3].description, "Food spending has increased by 200%");
    assert_eq!(insights[3].category.as_deref(), Some("Food"));
}

#[test]
fn at_most_two_trend_insights_in_trend_order() {
    let store = Store::open_in_memory().unwrap();
    add(
        &store,
        TransactionKind::Income,
        "10000",
        "Salary",
        Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap(),
    );
    spend(&store, "300", "A", 3, 2);
    spend(&store, "200", "B", 3, 2);
    spend(&store, "100", "C", 3, 2);

    let trends: Vec<_> = engine(&store)
        .spending_insights(AnalyticsPeriod::ThisMonth)
        .unwrap()
        .into_iter()
        .filter(|i| i.title == "Category Trend")
        .collect();
    assert_eq!(trends.len(), 2);
    assert_eq!(trends[0].category.as_deref(), Some("A"));
    assert_eq!(trends[1].category.as_deref(), Some("B"));
}

#[test]
fn small_changes_produce_no_change_insight() {
    let store = Store::open_in_memory().unwrap();
    spend(&store, "100", "Food", 2, 3);
    spend(&store, "105", "Food", 3, 3);
    let insights = engine(&store)
        .spending_insights(AnalyticsPeriod::ThisMonth)
        .unwrap();
    assert!(insights.iter().all(|i| i.title != "Spending Change"));
    assert!(insights.iter().all(|i| i.title != "Category Trend"));
}

#[test]
fn spending_decrease_insight() {
    let store = Store::open_in_memory().unwrap();
    spend(&store, "200", "Food", 2, 3);
    spend(&store, "50", "Food", 3, 3);
    let insights = engine(&store)
        .spending_insights(AnalyticsPeriod::ThisMonth)
        .unwrap();
    let change = insights
        .iter()
        .find(|i| i.title == "Spending Change")
        .unwrap();
    assert_eq!(change.kind, InsightType::SpendingDecrease);
    assert_eq!(
        change.description,
        "Your spending has decreased by 75% compared to last period"
    );
    assert_eq!(change.percentage, Some(75.0));
}

#[test]
fn financial_summary_covers_all_time() {
    let store = Store::open_in_memory().unwrap();
    add(
        &store,
        TransactionKind::Income,
        "2000",
        "Salary",
        Utc.with_ymd_and_hms(2019, 6, 1, 0, 0, 0).unwrap(),
    );
    spend(&store, "250.50", "Food", 3, 1);
    spend(&store, "49.50", "Food", 1, 1);
    let s = engine(&store).financial_summary().unwrap();
    assert_eq!(s.total_income, d("2000"));
    assert_eq!(s.total_expense, d("300"));
    assert_eq!(s.balance, d("1700"));
}

#[test]
fn period_names_parse() {
    assert_eq!("this-week".parse::<AnalyticsPeriod>().unwrap(), AnalyticsPeriod::ThisWeek);
    assert_eq!("LAST_MONTH".parse::<AnalyticsPeriod>().unwrap(), AnalyticsPeriod::LastMonth);
    assert_eq!("quarter".parse::<AnalyticsPeriod>().unwrap(), AnalyticsPeriod::Last3Months);
    assert!("fortnight".parse::<AnalyticsPeriod>().is_err());
}

#[test]
fn largest_amounts_sum_without_overflow() {
    let store = Store::open_in_memory().unwrap();
    let max = tallyhub::models::MAX_AMOUNT;
    for day in [2, 3] {
        let at = Utc.with_ymd_and_hms(2025, 3, day, 10, 0, 0).unwrap();
        store
            .insert_transaction(&Transaction::new(max, TransactionKind::Expense, "Food", None, at))
            .unwrap();
    }
    let a = engine(&store)
        .spending_analytics(AnalyticsPeriod::ThisMonth)
        .unwrap();
    assert_eq!(a.total_spent, max * Decimal::TWO);
    let f = engine(&store).financial_summary().unwrap();
    assert_eq!(f.balance, -(max * Decimal::TWO));
}
