//! Types that represent the core data model, such as `Transaction` and `MonthKey`.
mod amount;
pub mod labels;
mod month;
mod stats;
mod transaction;

pub use amount::{Amount, AmountError};
pub use labels::{Participants, EXPENSE_CATEGORIES, SHARED};
pub use month::MonthKey;
pub use stats::{breakdown, CategoryTotal, MonthlyStats};
pub use transaction::{filter_month, Transaction, TransactionColumn, TransactionType};
