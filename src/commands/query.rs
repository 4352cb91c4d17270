//! Read-only commands: `list`, `stats` and `version`.

use crate::commands::{count, Out};
use crate::config::StoreMode;
use crate::model::{MonthKey, MonthlyStats, Transaction, TransactionType};
use crate::store::DataService;
use crate::Result;
use std::fmt::Write;

/// Lists transactions, all of them or only those in `month`, oldest first.
pub async fn list(service: &DataService, month: Option<MonthKey>) -> Result<Out<Vec<Transaction>>> {
    let mut transactions = service.get_transactions(month).await;
    transactions.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

    let scope = match month {
        Some(m) => format!(" in {m}"),
        None => String::new(),
    };
    let mut message = format!("Found {}{scope}", count(transactions.len(), "transaction"));
    for t in &transactions {
        let sign = match t.kind {
            TransactionType::Income => '+',
            TransactionType::Expense => '-',
        };
        let _ = write!(
            message,
            "\n{}  {sign}{:>12}  {:<10} {:<16} {:<4} {}",
            t.date,
            t.amount.formatted(),
            t.category,
            t.merchant,
            t.consumer,
            t.id
        );
        if !t.memo.is_empty() {
            let _ = write!(message, "  ({})", t.memo);
        }
    }
    Ok(Out::new(message, transactions))
}

/// Summarizes `month`: income, expense, balance and expenses per category compared with the
/// month before.
pub async fn stats(service: &DataService, month: MonthKey) -> Result<Out<MonthlyStats>> {
    let all = service.get_transactions(None).await;
    let stats = MonthlyStats::compute(&all, month);

    let mut message = format!(
        "{month}: income {}, expense {}, balance {}",
        stats.total_income.formatted(),
        stats.total_expense.formatted(),
        stats.balance()
    );
    for c in &stats.by_category {
        let change = stats.change(&c.category);
        let _ = write!(
            message,
            "\n  {:<10} {:>12}  ({change:+} vs {})",
            c.category,
            c.amount.formatted(),
            month.previous()
        );
    }
    Ok(Out::new(message, stats))
}

/// Reports the sheet's last-modified marker.
pub async fn version(service: &DataService) -> Result<Out<String>> {
    match (service.mode(), service.actions()) {
        (StoreMode::Remote, Some(actions)) => {
            let version = actions.version().await;
            Ok(Out::new(format!("Data version: {version}"), version))
        }
        _ => Ok("The local store has no version marker".into()),
    }
}
