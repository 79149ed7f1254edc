pub mod budget;
pub mod category;
pub mod summary;
pub mod transaction;
pub mod user;

pub use budget::Budget;
pub use category::Category;
pub use summary::{BudgetSpend, CategoryExpense, MonthlySummary, MonthlyTrendPoint};
pub use transaction::{Transaction, TransactionKind};
pub use user::User;
