use serde::Serialize;

/// Aggregate income/expense totals for one user in one calendar month.
///
/// Aggregates are carried as f64: SQLite computes the sums over the stored
/// decimal text and the insight arithmetic is percentage-based.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

/// One slice of the per-category expense breakdown.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryExpense {
    pub name: String,
    pub icon: String,
    pub total: f64,
}

/// One month of the trailing income/expense rollup.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyTrendPoint {
    pub month: String,
    pub income: f64,
    pub expense: f64,
}

/// A budget row with its expense total for the month under inspection.
#[derive(Debug, Clone)]
pub struct BudgetSpend {
    pub category_name: String,
    pub monthly_limit: f64,
    pub spent: f64,
}
