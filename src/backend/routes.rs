use axum::{
    routing::{get, post},
    Router,
};

use crate::backend::{handlers, AppState};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(handlers::signup))
        .route("/api/auth/login", post(handlers::login))
        .route(
            "/api/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/api/transactions",
            post(handlers::add_transaction).get(handlers::list_transactions),
        )
        .route("/api/summary", get(handlers::monthly_summary))
        .route("/api/category_expenses", get(handlers::category_expenses))
        .route("/api/trends", get(handlers::monthly_trends))
        .route(
            "/api/budgets",
            post(handlers::set_budget).get(handlers::list_budgets),
        )
        .route("/api/insights", get(handlers::insights))
        .route("/api/tips", get(handlers::spending_tips))
}
