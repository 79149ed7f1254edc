// src/backend/handlers.rs
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Datelike, Local, NaiveDate};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

use crate::auth;
use crate::backend::AppState;
use crate::database::db::queries;
use crate::database::models::TransactionKind;
use crate::error::TrackerError;

const DEFAULT_TRANSACTION_LIMIT: i64 = 50;
const TREND_MONTHS: u32 = 6;
const DEFAULT_CATEGORY_ICON: &str = "💰";

/// Resolves a caller-supplied user id before touching its data. Read
/// endpoints carry the id as a plain query parameter, so an unknown id is an
/// authentication failure, not a storage one.
async fn require_user(state: &AppState, user_id: i64) -> Result<(), TrackerError> {
    queries::get_user_by_id(&state.db, user_id)
        .await?
        .map(|_| ())
        .ok_or(TrackerError::NotAuthenticated)
}

/* ==========Auth=========== */

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<impl IntoResponse, TrackerError> {
    let id = auth::signup(
        &state.db,
        &payload.username,
        &payload.email,
        &payload.password,
        &payload.confirm_password,
    )
    .await?;

    tracing::info!(user_id = id, "user created");
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, TrackerError> {
    let user = auth::authenticate(&state.db, &payload.username, &payload.password).await?;
    Ok(Json(LoginResponse {
        id: user.id,
        username: user.username,
        email: user.email,
    }))
}

/* ==========Categories=========== */

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, TrackerError> {
    let categories = queries::get_all_categories(&state.db).await?;
    Ok(Json(categories))
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub icon: Option<String>,
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, TrackerError> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(TrackerError::Validation(
            "category name must not be empty".to_string(),
        ));
    }
    let icon = payload
        .icon
        .as_deref()
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .unwrap_or(DEFAULT_CATEGORY_ICON);

    let id = queries::create_category(&state.db, name, icon).await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

/* ==========Transactions=========== */

#[derive(Debug, Deserialize)]
pub struct CreateTransactionRequest {
    pub user_id: i64,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category_id: i64,
    pub payment_mode: String,
    pub description: Option<String>,
    pub transaction_date: Option<NaiveDate>,
}

pub async fn add_transaction(
    State(state): State<AppState>,
    Json(payload): Json<CreateTransactionRequest>,
) -> Result<impl IntoResponse, TrackerError> {
    let amount = Decimal::from_f64(payload.amount)
        .filter(|a| a.is_sign_positive() && !a.is_zero())
        .ok_or_else(|| TrackerError::Validation("amount must be greater than 0".to_string()))?;

    let date = payload
        .transaction_date
        .unwrap_or_else(|| Local::now().date_naive());

    let description = payload
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty());

    let id = queries::create_transaction(
        &state.db,
        payload.user_id,
        amount,
        payload.kind,
        payload.category_id,
        &payload.payment_mode,
        description,
        date,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": id }))))
}

#[derive(Debug, Deserialize)]
pub struct TransactionListParams {
    pub user_id: i64,
    pub limit: Option<i64>,
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(params): Query<TransactionListParams>,
) -> Result<impl IntoResponse, TrackerError> {
    require_user(&state, params.user_id).await?;
    let limit = params.limit.unwrap_or(DEFAULT_TRANSACTION_LIMIT).max(0);
    let transactions = queries::get_user_transactions(&state.db, params.user_id, limit).await?;
    Ok(Json(transactions))
}

/* ==========Aggregates=========== */

#[derive(Debug, Deserialize)]
pub struct MonthParams {
    pub user_id: i64,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl MonthParams {
    /// Requested month, defaulting to the current one.
    fn resolve(&self) -> Result<(i32, u32), TrackerError> {
        let now = Local::now().date_naive();
        let year = self.year.unwrap_or_else(|| now.year());
        let month = self.month.unwrap_or_else(|| now.month());
        if !(1..=12).contains(&month) {
            return Err(TrackerError::Validation(
                "month must be between 1 and 12".to_string(),
            ));
        }
        Ok((year, month))
    }
}

pub async fn monthly_summary(
    State(state): State<AppState>,
    Query(params): Query<MonthParams>,
) -> Result<impl IntoResponse, TrackerError> {
    require_user(&state, params.user_id).await?;
    let (year, month) = params.resolve()?;
    let summary = queries::monthly_summary(&state.db, params.user_id, year, month).await?;
    Ok(Json(summary))
}

pub async fn category_expenses(
    State(state): State<AppState>,
    Query(params): Query<MonthParams>,
) -> Result<impl IntoResponse, TrackerError> {
    require_user(&state, params.user_id).await?;
    let (year, month) = params.resolve()?;
    let breakdown = queries::category_expenses(&state.db, params.user_id, year, month).await?;
    Ok(Json(breakdown))
}

pub async fn monthly_trends(
    State(state): State<AppState>,
    Query(params): Query<MonthParams>,
) -> Result<impl IntoResponse, TrackerError> {
    require_user(&state, params.user_id).await?;
    let (year, month) = params.resolve()?;
    let points =
        queries::monthly_trends(&state.db, params.user_id, year, month, TREND_MONTHS).await?;
    Ok(Json(points))
}

/* ==========Budgets=========== */

#[derive(Debug, Deserialize)]
pub struct SetBudgetRequest {
    pub user_id: i64,
    pub category_id: i64,
    pub monthly_limit: f64,
}

pub async fn set_budget(
    State(state): State<AppState>,
    Json(payload): Json<SetBudgetRequest>,
) -> Result<impl IntoResponse, TrackerError> {
    let limit = Decimal::from_f64(payload.monthly_limit)
        .filter(|l| l.is_sign_positive() && !l.is_zero())
        .ok_or_else(|| {
            TrackerError::Validation("budget limit must be greater than 0".to_string())
        })?;

    queries::set_budget(&state.db, payload.user_id, payload.category_id, limit).await?;
    Ok(Json(json!({ "ok": true })))
}

#[derive(Debug, Deserialize)]
pub struct UserParams {
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct BudgetView {
    pub id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub category_icon: String,
    pub monthly_limit: f64,
    pub current_spending: f64,
}

/// Budgets joined with the current month's spending per category.
pub async fn list_budgets(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<impl IntoResponse, TrackerError> {
    require_user(&state, params.user_id).await?;
    let budgets = queries::get_user_budgets(&state.db, params.user_id).await?;

    let now = Local::now().date_naive();
    let spending: HashMap<String, f64> =
        queries::category_expenses(&state.db, params.user_id, now.year(), now.month())
            .await?
            .into_iter()
            .map(|c| (c.name, c.total))
            .collect();

    let views: Vec<BudgetView> = budgets
        .into_iter()
        .map(|b| {
            let current_spending = spending.get(&b.category_name).copied().unwrap_or(0.0);
            BudgetView {
                id: b.id,
                category_id: b.category_id,
                category_icon: b.category_icon,
                monthly_limit: b.monthly_limit.to_f64().unwrap_or(0.0),
                current_spending,
                category_name: b.category_name,
            }
        })
        .collect();

    Ok(Json(views))
}

/* ==========Insights=========== */

pub async fn insights(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<impl IntoResponse, TrackerError> {
    require_user(&state, params.user_id).await?;
    let insights = state.insights.generate_insights(params.user_id).await;
    Ok(Json(insights))
}

pub async fn spending_tips(
    State(state): State<AppState>,
    Query(params): Query<UserParams>,
) -> Result<impl IntoResponse, TrackerError> {
    require_user(&state, params.user_id).await?;
    let tips = state.insights.get_spending_tips(params.user_id).await;
    Ok(Json(tips))
}
