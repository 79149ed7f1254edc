//! Insight rules engine.
//!
//! Turns the monthly aggregates into a bounded, ordered list of observations:
//! month-over-month trend, per-category trend and concentration, budget
//! alerts, then savings rate. Deterministic given the stored data and an
//! anchor date. A failed aggregate query degrades to zero-valued defaults
//! instead of aborting the whole run.

use chrono::{Local, Months, NaiveDate};
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;

use crate::database::db::queries;

/// Month-over-month expense growth (percent) above which we warn.
const EXPENSE_SURGE_PCT: f64 = 20.0;
/// Month-over-month expense drop (percent) above which we congratulate.
const EXPENSE_DROP_PCT: f64 = 10.0;
/// Per-category growth (percent) above which we flag the category.
const CATEGORY_SURGE_PCT: f64 = 30.0;
/// Per-category drop (percent) above which we note the saving.
const CATEGORY_DROP_PCT: f64 = 20.0;
/// Share of total expenses (percent) above which one category dominates.
const TOP_CATEGORY_SHARE_PCT: f64 = 40.0;
/// Fraction of a budget limit that triggers the near-limit warning.
const BUDGET_WARN_RATIO: f64 = 0.8;
/// Average savings rate (percent) below which the saving tip fires.
const LOW_SAVINGS_PCT: f64 = 10.0;
/// Average savings rate (percent) above which we congratulate.
const HIGH_SAVINGS_PCT: f64 = 20.0;
/// Months included in the savings-rate average, current month included.
const SAVINGS_WINDOW_MONTHS: u32 = 3;

const MAX_INSIGHTS: usize = 5;
const MAX_TIPS: usize = 4;

const GENERIC_TIPS: [&str; 8] = [
    "💡 Track every expense, no matter how small",
    "🎯 Set realistic budgets for each category",
    "📱 Review your expenses weekly",
    "🛒 Make a shopping list before going out",
    "☕ Consider making coffee at home instead of buying",
    "🚗 Use public transport or carpool to save on travel",
    "🍽️ Cook meals at home more often",
    "💳 Use cash for discretionary spending to stay mindful",
];

#[derive(Clone)]
pub struct InsightsEngine {
    pool: Pool<Sqlite>,
}

impl InsightsEngine {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Insights anchored at today's date. At most [`MAX_INSIGHTS`] entries.
    pub async fn generate_insights(&self, user_id: i64) -> Vec<String> {
        self.generate_insights_at(user_id, Local::now().date_naive())
            .await
    }

    /// Insights anchored at an explicit date, for deterministic evaluation.
    pub async fn generate_insights_at(&self, user_id: i64, today: NaiveDate) -> Vec<String> {
        let (year, month) = queries::year_month(today);
        let (prev_year, prev_month) = queries::month_back(year, month, 1);

        let mut insights = Vec::new();

        self.expense_trend(user_id, year, month, prev_year, prev_month, &mut insights)
            .await;
        self.category_trends(user_id, year, month, prev_year, prev_month, &mut insights)
            .await;
        self.budget_alerts(user_id, year, month, &mut insights).await;
        self.savings_rate(user_id, year, month, &mut insights).await;

        insights.truncate(MAX_INSIGHTS);
        insights
    }

    /// Month-over-month total expense movement. Emits at most one message.
    async fn expense_trend(
        &self,
        user_id: i64,
        year: i32,
        month: u32,
        prev_year: i32,
        prev_month: u32,
        insights: &mut Vec<String>,
    ) {
        let current = queries::monthly_summary(&self.pool, user_id, year, month)
            .await
            .unwrap_or_default();
        let previous = queries::monthly_summary(&self.pool, user_id, prev_year, prev_month)
            .await
            .unwrap_or_default();

        if previous.expense <= 0.0 {
            return;
        }
        let change = (current.expense - previous.expense) / previous.expense * 100.0;

        if change > EXPENSE_SURGE_PCT {
            insights.push(format!(
                "⚠️ Your expenses increased by {:.1}% this month. Consider reviewing your spending.",
                change
            ));
        } else if change < -EXPENSE_DROP_PCT {
            insights.push(format!(
                "✅ Great job! You reduced expenses by {:.1}% this month.",
                change.abs()
            ));
        }
    }

    /// Per-category movement against the previous month, then a concentration
    /// check on the current month's biggest category.
    async fn category_trends(
        &self,
        user_id: i64,
        year: i32,
        month: u32,
        prev_year: i32,
        prev_month: u32,
        insights: &mut Vec<String>,
    ) {
        let current = queries::category_totals(&self.pool, user_id, year, month)
            .await
            .unwrap_or_default();
        let previous: HashMap<String, f64> =
            queries::category_totals(&self.pool, user_id, prev_year, prev_month)
                .await
                .unwrap_or_default()
                .into_iter()
                .collect();

        for (name, amount) in &current {
            let Some(&prev_amount) = previous.get(name) else {
                continue;
            };
            if prev_amount <= 0.0 {
                continue;
            }
            let change = (amount - prev_amount) / prev_amount * 100.0;
            if change > CATEGORY_SURGE_PCT {
                insights.push(format!(
                    "📈 {} expenses increased by {:.1}% this month",
                    name, change
                ));
            } else if change < -CATEGORY_DROP_PCT {
                insights.push(format!(
                    "📉 You saved {:.1}% on {} this month",
                    change.abs(),
                    name
                ));
            }
        }

        if current.is_empty() {
            return;
        }
        // First-encountered entry wins ties, so a strict comparison.
        let mut top = &current[0];
        for entry in &current[1..] {
            if entry.1 > top.1 {
                top = entry;
            }
        }
        let total: f64 = current.iter().map(|(_, amount)| amount).sum();
        if total > 0.0 {
            let share = top.1 / total * 100.0;
            if share > TOP_CATEGORY_SHARE_PCT {
                insights.push(format!(
                    "💡 {} accounts for {:.1}% of your expenses",
                    top.0, share
                ));
            }
        }
    }

    /// Over-budget and near-limit alerts, one at most per budget row. The
    /// over-budget check takes precedence.
    async fn budget_alerts(&self, user_id: i64, year: i32, month: u32, insights: &mut Vec<String>) {
        let rows = queries::budget_spending(&self.pool, user_id, year, month)
            .await
            .unwrap_or_default();

        for row in rows {
            if row.spent > row.monthly_limit {
                insights.push(format!(
                    "🚨 You exceeded {} budget by ₹{:.0}",
                    row.category_name,
                    row.spent - row.monthly_limit
                ));
            } else if row.spent > row.monthly_limit * BUDGET_WARN_RATIO {
                insights.push(format!(
                    "⚠️ Only ₹{:.0} left in {} budget",
                    row.monthly_limit - row.spent,
                    row.category_name
                ));
            }
        }
    }

    /// Average savings rate over the trailing window; months without income
    /// do not qualify. Silence inside [LOW_SAVINGS_PCT, HIGH_SAVINGS_PCT].
    async fn savings_rate(&self, user_id: i64, year: i32, month: u32, insights: &mut Vec<String>) {
        let mut rates = Vec::new();
        for back in 0..SAVINGS_WINDOW_MONTHS {
            let (y, m) = queries::month_back(year, month, back);
            let summary = queries::monthly_summary(&self.pool, user_id, y, m)
                .await
                .unwrap_or_default();
            if summary.income > 0.0 {
                rates.push((summary.income - summary.expense) / summary.income * 100.0);
            }
        }

        if rates.is_empty() {
            return;
        }
        let average = rates.iter().sum::<f64>() / rates.len() as f64;

        if average < LOW_SAVINGS_PCT {
            insights.push("💡 Try to save at least 10% of your income each month".to_string());
        } else if average > HIGH_SAVINGS_PCT {
            insights.push(format!(
                "🎉 Excellent! You're saving {:.1}% of your income",
                average
            ));
        }
    }

    /// Spending tips anchored at today. At most [`MAX_TIPS`] entries.
    pub async fn get_spending_tips(&self, user_id: i64) -> Vec<String> {
        self.get_spending_tips_at(user_id, Local::now().date_naive())
            .await
    }

    /// The fixed tip list, with one targeted tip prepended when the user's top
    /// expense category over the trailing month matches a known keyword.
    pub async fn get_spending_tips_at(&self, user_id: i64, today: NaiveDate) -> Vec<String> {
        let mut tips: Vec<String> = GENERIC_TIPS.iter().map(|t| t.to_string()).collect();

        let since = today
            .checked_sub_months(Months::new(1))
            .unwrap_or(today);
        let top = queries::top_expense_category_since(&self.pool, user_id, since)
            .await
            .unwrap_or_default();

        if let Some((name, _)) = top {
            let name = name.to_lowercase();
            let targeted = if name.contains("food") {
                Some("🍽️ Plan your meals weekly to reduce food expenses")
            } else if name.contains("travel") {
                Some("🚗 Consider carpooling or public transport for daily commute")
            } else if name.contains("shopping") {
                Some("🛒 Wait 24 hours before making non-essential purchases")
            } else {
                None
            };
            if let Some(tip) = targeted {
                tips.insert(0, tip.to_string());
            }
        }

        tips.truncate(MAX_TIPS);
        tips
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::db::connection::test_pool;
    use crate::database::db::queries::{
        create_transaction, create_user, get_all_categories, seed_default_categories, set_budget,
    };
    use crate::database::models::TransactionKind;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    // Mid-month anchor so "previous month" and the savings window are stable.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 15).unwrap()
    }

    fn dec(v: &str) -> Decimal {
        Decimal::from_str(v).unwrap()
    }

    async fn engine_with_user() -> (InsightsEngine, Pool<Sqlite>, i64) {
        let pool = test_pool().await;
        seed_default_categories(&pool).await.unwrap();
        let user = create_user(&pool, "carol", "carol@example.com", "hash")
            .await
            .unwrap();
        (InsightsEngine::new(pool.clone()), pool, user)
    }

    async fn cat(pool: &Pool<Sqlite>, name: &str) -> i64 {
        get_all_categories(pool)
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.name == name)
            .unwrap()
            .id
    }

    async fn spend(pool: &Pool<Sqlite>, user: i64, category: i64, amount: &str, date: NaiveDate) {
        create_transaction(
            pool,
            user,
            dec(amount),
            TransactionKind::Expense,
            category,
            "card",
            None,
            date,
        )
        .await
        .unwrap();
    }

    async fn earn(pool: &Pool<Sqlite>, user: i64, category: i64, amount: &str, date: NaiveDate) {
        create_transaction(
            pool,
            user,
            dec(amount),
            TransactionKind::Income,
            category,
            "bank",
            None,
            date,
        )
        .await
        .unwrap();
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn expense_surge_warns_with_one_decimal() {
        let (engine, pool, user) = engine_with_user().await;
        let rent = cat(&pool, "Rent").await;

        spend(&pool, user, rent, "1000", ymd(2025, 6, 5)).await;
        spend(&pool, user, rent, "1250", ymd(2025, 7, 5)).await;

        let insights = engine.generate_insights_at(user, today()).await;
        assert!(
            insights
                .iter()
                .any(|i| i.contains("expenses increased by 25.0% this month")),
            "missing surge warning in {:?}",
            insights
        );
    }

    #[tokio::test]
    async fn expense_drop_congratulates() {
        let (engine, pool, user) = engine_with_user().await;
        let rent = cat(&pool, "Rent").await;

        spend(&pool, user, rent, "1000", ymd(2025, 6, 5)).await;
        spend(&pool, user, rent, "850", ymd(2025, 7, 5)).await;

        let insights = engine.generate_insights_at(user, today()).await;
        assert!(
            insights
                .iter()
                .any(|i| i.contains("reduced expenses by 15.0% this month")),
            "missing reduction message in {:?}",
            insights
        );
    }

    #[tokio::test]
    async fn small_expense_moves_stay_silent() {
        let (engine, pool, user) = engine_with_user().await;
        let rent = cat(&pool, "Rent").await;

        // +5%: between the -10% and +20% thresholds.
        spend(&pool, user, rent, "1000", ymd(2025, 6, 5)).await;
        spend(&pool, user, rent, "1050", ymd(2025, 7, 5)).await;

        let insights = engine.generate_insights_at(user, today()).await;
        assert!(!insights.iter().any(|i| i.contains("expenses increased")));
        assert!(!insights.iter().any(|i| i.contains("reduced expenses")));
    }

    #[tokio::test]
    async fn category_surge_and_saving_messages() {
        let (engine, pool, user) = engine_with_user().await;
        let food = cat(&pool, "Food").await;
        let travel = cat(&pool, "Travel").await;
        let rent = cat(&pool, "Rent").await;

        // Keep the overall trend quiet: totals 1000 -> 1000.
        spend(&pool, user, food, "200", ymd(2025, 6, 3)).await;
        spend(&pool, user, travel, "400", ymd(2025, 6, 3)).await;
        spend(&pool, user, rent, "400", ymd(2025, 6, 3)).await;

        spend(&pool, user, food, "300", ymd(2025, 7, 3)).await; // +50%
        spend(&pool, user, travel, "300", ymd(2025, 7, 3)).await; // -25%
        spend(&pool, user, rent, "400", ymd(2025, 7, 3)).await; // flat

        let insights = engine.generate_insights_at(user, today()).await;
        assert!(insights
            .iter()
            .any(|i| i.contains("📈 Food expenses increased by 50.0% this month")));
        assert!(insights
            .iter()
            .any(|i| i.contains("📉 You saved 25.0% on Travel this month")));
        assert!(!insights.iter().any(|i| i.contains("Rent expenses")));
    }

    #[tokio::test]
    async fn dominant_category_concentration() {
        let (engine, pool, user) = engine_with_user().await;
        let rent = cat(&pool, "Rent").await;
        let food = cat(&pool, "Food").await;

        spend(&pool, user, rent, "900", ymd(2025, 7, 2)).await;
        spend(&pool, user, food, "100", ymd(2025, 7, 2)).await;

        let insights = engine.generate_insights_at(user, today()).await;
        assert!(
            insights
                .iter()
                .any(|i| i.contains("💡 Rent accounts for 90.0% of your expenses")),
            "missing concentration message in {:?}",
            insights
        );
    }

    #[tokio::test]
    async fn budget_alert_thresholds() {
        let (engine, pool, user) = engine_with_user().await;
        let food = cat(&pool, "Food").await;
        let travel = cat(&pool, "Travel").await;
        let rent = cat(&pool, "Rent").await;

        set_budget(&pool, user, food, dec("5000")).await.unwrap();
        set_budget(&pool, user, travel, dec("5000")).await.unwrap();
        set_budget(&pool, user, rent, dec("5000")).await.unwrap();

        spend(&pool, user, food, "5200", ymd(2025, 7, 4)).await; // over
        spend(&pool, user, travel, "4100", ymd(2025, 7, 4)).await; // near limit
        spend(&pool, user, rent, "3000", ymd(2025, 7, 4)).await; // fine

        let insights = engine.generate_insights_at(user, today()).await;
        assert!(insights
            .iter()
            .any(|i| i.contains("🚨 You exceeded Food budget by ₹200")));
        assert!(insights
            .iter()
            .any(|i| i.contains("⚠️ Only ₹900 left in Travel budget")));
        assert!(!insights.iter().any(|i| i.contains("Rent budget")));
    }

    #[tokio::test]
    async fn low_average_savings_rate_tips() {
        let (engine, pool, user) = engine_with_user().await;
        let salary = cat(&pool, "Salary").await;
        let other = cat(&pool, "Other").await;

        // Rates 4%, 6%, 5% -> average 5.0, below the 10% floor.
        earn(&pool, user, salary, "10000", ymd(2025, 7, 1)).await;
        spend(&pool, user, other, "9600", ymd(2025, 7, 2)).await;
        earn(&pool, user, salary, "10000", ymd(2025, 6, 1)).await;
        spend(&pool, user, other, "9400", ymd(2025, 6, 2)).await;
        earn(&pool, user, salary, "10000", ymd(2025, 5, 1)).await;
        spend(&pool, user, other, "9500", ymd(2025, 5, 2)).await;

        let insights = engine.generate_insights_at(user, today()).await;
        assert!(insights
            .iter()
            .any(|i| i.contains("Try to save at least 10% of your income")));
    }

    #[tokio::test]
    async fn high_average_savings_rate_congratulates() {
        let (engine, pool, user) = engine_with_user().await;
        let salary = cat(&pool, "Salary").await;
        let other = cat(&pool, "Other").await;

        earn(&pool, user, salary, "10000", ymd(2025, 7, 1)).await;
        spend(&pool, user, other, "7000", ymd(2025, 7, 2)).await;

        let insights = engine.generate_insights_at(user, today()).await;
        assert!(
            insights
                .iter()
                .any(|i| i.contains("🎉 Excellent! You're saving 30.0% of your income")),
            "missing savings praise in {:?}",
            insights
        );
    }

    #[tokio::test]
    async fn no_data_yields_no_insights() {
        let (engine, _pool, user) = engine_with_user().await;
        let insights = engine.generate_insights_at(user, today()).await;
        assert!(insights.is_empty());
    }

    #[tokio::test]
    async fn insights_are_capped_at_five() {
        let (engine, pool, user) = engine_with_user().await;

        // Trip every rule at once: surge, several category moves,
        // budget alerts, and a low savings rate.
        let names = ["Food", "Travel", "Rent", "Shopping", "Entertainment"];
        for name in names {
            let id = cat(&pool, name).await;
            spend(&pool, user, id, "100", ymd(2025, 6, 5)).await;
            spend(&pool, user, id, "200", ymd(2025, 7, 5)).await;
            set_budget(&pool, user, id, dec("150")).await.unwrap();
        }
        let salary = cat(&pool, "Salary").await;
        earn(&pool, user, salary, "1000", ymd(2025, 7, 1)).await;

        let insights = engine.generate_insights_at(user, today()).await;
        assert_eq!(insights.len(), 5);
        // Rule order: the overall trend message comes first.
        assert!(insights[0].contains("expenses increased by 100.0%"));
    }

    #[tokio::test]
    async fn tips_capped_and_generic_without_history() {
        let (engine, _pool, user) = engine_with_user().await;

        let tips = engine.get_spending_tips_at(user, today()).await;
        assert_eq!(tips.len(), 4);
        assert_eq!(tips[0], "💡 Track every expense, no matter how small");
    }

    #[tokio::test]
    async fn top_food_category_prepends_meal_tip() {
        let (engine, pool, user) = engine_with_user().await;
        let food = cat(&pool, "Food").await;
        let rent = cat(&pool, "Rent").await;

        spend(&pool, user, food, "800", ymd(2025, 7, 10)).await;
        spend(&pool, user, rent, "300", ymd(2025, 7, 10)).await;

        let tips = engine.get_spending_tips_at(user, today()).await;
        assert_eq!(tips.len(), 4);
        assert_eq!(tips[0], "🍽️ Plan your meals weekly to reduce food expenses");
    }

    #[tokio::test]
    async fn top_shopping_category_prepends_waiting_tip() {
        let (engine, pool, user) = engine_with_user().await;
        let shopping = cat(&pool, "Shopping").await;

        spend(&pool, user, shopping, "500", ymd(2025, 7, 10)).await;

        let tips = engine.get_spending_tips_at(user, today()).await;
        assert_eq!(
            tips[0],
            "🛒 Wait 24 hours before making non-essential purchases"
        );
    }
}
