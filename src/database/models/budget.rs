use rust_decimal::Decimal;
use serde::Serialize;

/// A per-category monthly spending ceiling, joined with category display info.
#[derive(Debug, Clone, Serialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub category_name: String,
    pub category_icon: String,
    pub monthly_limit: Decimal,
}
