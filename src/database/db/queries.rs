use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;

use crate::database::models::{
    Budget, BudgetSpend, Category, CategoryExpense, MonthlySummary, MonthlyTrendPoint,
    Transaction, TransactionKind, User,
};
use crate::error::TrackerError;

/*
This file holds the SQL for the persistence interface: entity CRUD plus the
aggregate queries the insight engine consumes. Amounts are stored as decimal
text; monthly aggregates are summed as REAL inside SQLite.
 */

/* ==========User Queries=========== */

pub async fn create_user(
    pool: &Pool<Sqlite>,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<i64, TrackerError> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash)
        VALUES (?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => Ok(row.try_get("id")?),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(TrackerError::Duplicate(
            "username or email already exists".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

pub async fn get_user_by_username(
    pool: &Pool<Sqlite>,
    username: &str,
) -> Result<Option<User>, TrackerError> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, created_at, is_active
        FROM users
        WHERE username = ? AND is_active = 1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    row.map(user_from_row).transpose()
}

pub async fn get_user_by_id(pool: &Pool<Sqlite>, id: i64) -> Result<Option<User>, TrackerError> {
    let row = sqlx::query(
        r#"
        SELECT id, username, email, password_hash, created_at, is_active
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(user_from_row).transpose()
}

pub async fn user_count(pool: &Pool<Sqlite>) -> Result<i64, TrackerError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

fn user_from_row(row: sqlx::sqlite::SqliteRow) -> Result<User, TrackerError> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
        is_active: row.try_get::<i64, _>("is_active")? != 0,
    })
}

/* ==========Category Queries=========== */

const DEFAULT_CATEGORIES: [(&str, &str); 10] = [
    ("Food", "🍽️"),
    ("Travel", "🚗"),
    ("Rent", "🏠"),
    ("Shopping", "🛒"),
    ("Entertainment", "🎬"),
    ("Healthcare", "🏥"),
    ("Education", "📚"),
    ("Other", "📦"),
    ("Salary", "💼"),
    ("Freelance", "💻"),
];

/// Seeds the shared category taxonomy. Safe to run at every startup.
pub async fn seed_default_categories(pool: &Pool<Sqlite>) -> Result<(), TrackerError> {
    for (name, icon) in DEFAULT_CATEGORIES {
        sqlx::query("INSERT OR IGNORE INTO categories (name, icon, is_default) VALUES (?, ?, 1)")
            .bind(name)
            .bind(icon)
            .execute(pool)
            .await?;
    }
    Ok(())
}

pub async fn get_all_categories(pool: &Pool<Sqlite>) -> Result<Vec<Category>, TrackerError> {
    let rows = sqlx::query(
        r#"
        SELECT id, name, icon, is_default
        FROM categories
        ORDER BY name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(Category {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                icon: row.try_get("icon")?,
                is_default: row.try_get::<i64, _>("is_default")? != 0,
            })
        })
        .collect()
}

/// Extends the shared taxonomy with a user-defined category.
pub async fn create_category(
    pool: &Pool<Sqlite>,
    name: &str,
    icon: &str,
) -> Result<i64, TrackerError> {
    let result = sqlx::query(
        r#"
        INSERT INTO categories (name, icon, is_default)
        VALUES (?, ?, 0)
        RETURNING id
        "#,
    )
    .bind(name)
    .bind(icon)
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => Ok(row.try_get("id")?),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(TrackerError::Duplicate(
            "category already exists".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

/* ==========Transaction Queries=========== */

#[allow(clippy::too_many_arguments)]
pub async fn create_transaction(
    pool: &Pool<Sqlite>,
    user_id: i64,
    amount: Decimal,
    kind: TransactionKind,
    category_id: i64,
    payment_mode: &str,
    description: Option<&str>,
    transaction_date: NaiveDate,
) -> Result<i64, TrackerError> {
    if amount <= Decimal::ZERO {
        return Err(TrackerError::Validation(
            "amount must be greater than 0".to_string(),
        ));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO transactions
            (user_id, amount, type, category_id, payment_mode, description, transaction_date)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id
        "#,
    )
    .bind(user_id)
    .bind(amount.to_string())
    .bind(kind.as_str())
    .bind(category_id)
    .bind(payment_mode)
    .bind(description)
    .bind(transaction_date)
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => Ok(row.try_get("id")?),
        Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => Err(
            TrackerError::Validation("unknown user or category".to_string()),
        ),
        Err(e) => Err(e.into()),
    }
}

/// Recent transactions with category display info, newest first.
pub async fn get_user_transactions(
    pool: &Pool<Sqlite>,
    user_id: i64,
    limit: i64,
) -> Result<Vec<Transaction>, TrackerError> {
    let rows = sqlx::query(
        r#"
        SELECT
            t.id, t.user_id, t.amount, t.type AS kind, t.category_id,
            c.name AS category_name, c.icon AS category_icon,
            t.payment_mode, t.description, t.transaction_date, t.created_at
        FROM transactions t
        JOIN categories c ON t.category_id = c.id
        WHERE t.user_id = ?
        ORDER BY t.transaction_date DESC, t.created_at DESC, t.id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let amount_text: String = row.try_get("amount")?;
            let amount = Decimal::from_str(&amount_text).map_err(|e| {
                sqlx::Error::Decode(format!("Invalid Decimal format for amount: {}", e).into())
            })?;
            let kind_text: String = row.try_get("kind")?;
            let kind = TransactionKind::parse(&kind_text).ok_or_else(|| {
                sqlx::Error::Decode(format!("Unknown transaction type: {}", kind_text).into())
            })?;

            Ok(Transaction {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                amount,
                kind,
                category_id: row.try_get("category_id")?,
                category_name: row.try_get("category_name")?,
                category_icon: row.try_get("category_icon")?,
                payment_mode: row.try_get("payment_mode")?,
                description: row.try_get("description")?,
                transaction_date: row.try_get("transaction_date")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .collect()
}

/* ==========Aggregate Queries=========== */

/// Income/expense totals for one calendar month. Types with no rows sum to 0.
pub async fn monthly_summary(
    pool: &Pool<Sqlite>,
    user_id: i64,
    year: i32,
    month: u32,
) -> Result<MonthlySummary, TrackerError> {
    let rows = sqlx::query(
        r#"
        SELECT type AS kind, SUM(CAST(amount AS REAL)) AS total
        FROM transactions
        WHERE user_id = ?
          AND strftime('%Y', transaction_date) = ?
          AND strftime('%m', transaction_date) = ?
        GROUP BY type
        "#,
    )
    .bind(user_id)
    .bind(format!("{:04}", year))
    .bind(format!("{:02}", month))
    .fetch_all(pool)
    .await?;

    let mut summary = MonthlySummary::default();
    for row in rows {
        let kind: String = row.try_get("kind")?;
        let total: f64 = row.try_get("total")?;
        match kind.as_str() {
            "income" => summary.income = total,
            "expense" => summary.expense = total,
            _ => {}
        }
    }
    summary.balance = summary.income - summary.expense;
    Ok(summary)
}

/// Expense-only category breakdown for one calendar month, largest first.
pub async fn category_expenses(
    pool: &Pool<Sqlite>,
    user_id: i64,
    year: i32,
    month: u32,
) -> Result<Vec<CategoryExpense>, TrackerError> {
    let rows = sqlx::query(
        r#"
        SELECT c.name, c.icon, SUM(CAST(t.amount AS REAL)) AS total
        FROM transactions t
        JOIN categories c ON t.category_id = c.id
        WHERE t.user_id = ?
          AND t.type = 'expense'
          AND strftime('%Y', t.transaction_date) = ?
          AND strftime('%m', t.transaction_date) = ?
        GROUP BY c.id, c.name, c.icon
        ORDER BY total DESC
        "#,
    )
    .bind(user_id)
    .bind(format!("{:04}", year))
    .bind(format!("{:02}", month))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(CategoryExpense {
                name: row.try_get("name")?,
                icon: row.try_get("icon")?,
                total: row.try_get("total")?,
            })
        })
        .collect()
}

/// Same grouping as [`category_expenses`] but in category-id order, which the
/// category trend rule uses as its stable iteration order.
pub async fn category_totals(
    pool: &Pool<Sqlite>,
    user_id: i64,
    year: i32,
    month: u32,
) -> Result<Vec<(String, f64)>, TrackerError> {
    let rows = sqlx::query(
        r#"
        SELECT c.name, SUM(CAST(t.amount AS REAL)) AS total
        FROM transactions t
        JOIN categories c ON t.category_id = c.id
        WHERE t.user_id = ?
          AND t.type = 'expense'
          AND strftime('%Y', t.transaction_date) = ?
          AND strftime('%m', t.transaction_date) = ?
        GROUP BY c.id, c.name
        ORDER BY c.id ASC
        "#,
    )
    .bind(user_id)
    .bind(format!("{:04}", year))
    .bind(format!("{:02}", month))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| Ok((row.try_get("name")?, row.try_get("total")?)))
        .collect()
}

/// Trailing income/expense rollup ending at (year, month), oldest month first.
pub async fn monthly_trends(
    pool: &Pool<Sqlite>,
    user_id: i64,
    year: i32,
    month: u32,
    months: u32,
) -> Result<Vec<MonthlyTrendPoint>, TrackerError> {
    let mut points = Vec::with_capacity(months as usize);
    for back in 0..months {
        let (y, m) = month_back(year, month, back);
        let summary = monthly_summary(pool, user_id, y, m).await?;
        let label = NaiveDate::from_ymd_opt(y, m, 1)
            .map(|d| d.format("%b %Y").to_string())
            .unwrap_or_default();
        points.push(MonthlyTrendPoint {
            month: label,
            income: summary.income,
            expense: summary.expense,
        });
    }
    points.reverse();
    Ok(points)
}

/// Single highest expense category on or after `since`, if any.
pub async fn top_expense_category_since(
    pool: &Pool<Sqlite>,
    user_id: i64,
    since: NaiveDate,
) -> Result<Option<(String, f64)>, TrackerError> {
    let row = sqlx::query(
        r#"
        SELECT c.name, SUM(CAST(t.amount AS REAL)) AS total
        FROM transactions t
        JOIN categories c ON t.category_id = c.id
        WHERE t.user_id = ? AND t.type = 'expense' AND t.transaction_date >= ?
        GROUP BY c.id, c.name
        ORDER BY total DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(since)
    .fetch_optional(pool)
    .await?;

    row.map(|r| Ok((r.try_get("name")?, r.try_get("total")?)))
        .transpose()
}

/* ==========Budget Queries=========== */

/// Upsert: a second submission for the same (user, category) replaces the limit.
pub async fn set_budget(
    pool: &Pool<Sqlite>,
    user_id: i64,
    category_id: i64,
    monthly_limit: Decimal,
) -> Result<(), TrackerError> {
    if monthly_limit <= Decimal::ZERO {
        return Err(TrackerError::Validation(
            "budget limit must be greater than 0".to_string(),
        ));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO budgets (user_id, category_id, monthly_limit)
        VALUES (?, ?, ?)
        ON CONFLICT (user_id, category_id)
        DO UPDATE SET monthly_limit = excluded.monthly_limit
        "#,
    )
    .bind(user_id)
    .bind(category_id)
    .bind(monthly_limit.to_string())
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(e)) if e.is_foreign_key_violation() => Err(
            TrackerError::Validation("unknown user or category".to_string()),
        ),
        Err(e) => Err(e.into()),
    }
}

pub async fn get_user_budgets(
    pool: &Pool<Sqlite>,
    user_id: i64,
) -> Result<Vec<Budget>, TrackerError> {
    let rows = sqlx::query(
        r#"
        SELECT
            b.id, b.user_id, b.category_id, b.monthly_limit,
            c.name AS category_name, c.icon AS category_icon
        FROM budgets b
        JOIN categories c ON b.category_id = c.id
        WHERE b.user_id = ?
        ORDER BY c.name ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let limit_text: String = row.try_get("monthly_limit")?;
            let monthly_limit = Decimal::from_str(&limit_text).map_err(|e| {
                sqlx::Error::Decode(
                    format!("Invalid Decimal format for monthly_limit: {}", e).into(),
                )
            })?;

            Ok(Budget {
                id: row.try_get("id")?,
                user_id: row.try_get("user_id")?,
                category_id: row.try_get("category_id")?,
                category_name: row.try_get("category_name")?,
                category_icon: row.try_get("category_icon")?,
                monthly_limit,
            })
        })
        .collect()
}

/// Every budget row with the matching expense total for one calendar month
/// (0 when no matching transactions exist).
pub async fn budget_spending(
    pool: &Pool<Sqlite>,
    user_id: i64,
    year: i32,
    month: u32,
) -> Result<Vec<BudgetSpend>, TrackerError> {
    let rows = sqlx::query(
        r#"
        SELECT
            CAST(b.monthly_limit AS REAL) AS monthly_limit,
            c.name AS category_name,
            COALESCE(SUM(CAST(t.amount AS REAL)), 0.0) AS spent
        FROM budgets b
        JOIN categories c ON b.category_id = c.id
        LEFT JOIN transactions t ON (
            t.category_id = b.category_id
            AND t.user_id = b.user_id
            AND t.type = 'expense'
            AND strftime('%Y', t.transaction_date) = ?
            AND strftime('%m', t.transaction_date) = ?
        )
        WHERE b.user_id = ?
        GROUP BY b.id, b.monthly_limit, c.name
        "#,
    )
    .bind(format!("{:04}", year))
    .bind(format!("{:02}", month))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(BudgetSpend {
                category_name: row.try_get("category_name")?,
                monthly_limit: row.try_get("monthly_limit")?,
                spent: row.try_get("spent")?,
            })
        })
        .collect()
}

/* ==========Helpers=========== */

/// Calendar month `back` months before (year, month).
pub fn month_back(year: i32, month: u32, back: u32) -> (i32, u32) {
    let total = year * 12 + month as i32 - 1 - back as i32;
    (total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
}

/// (year, month) of the calendar month containing `date`.
pub fn year_month(date: NaiveDate) -> (i32, u32) {
    (date.year(), date.month())
}
