use crate::model::{Amount, MonthKey, Transaction, TransactionType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Total of one category within a month.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CategoryTotal {
    pub category: String,
    pub amount: Amount,
}

/// The figures shown on the statistics view for one month.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonthlyStats {
    pub month: MonthKey,
    pub total_income: Amount,
    pub total_expense: Amount,
    /// Expense totals per category, largest first.
    pub by_category: Vec<CategoryTotal>,
    /// Expense totals per category for the month before, largest first.
    pub previous_by_category: Vec<CategoryTotal>,
}

impl MonthlyStats {
    /// Computes stats for `month` from a list that may hold any number of months.
    pub fn compute(transactions: &[Transaction], month: MonthKey) -> Self {
        let in_month = |m: MonthKey| transactions.iter().filter(move |t| t.is_in(m));
        let total = |kind: TransactionType| {
            in_month(month)
                .filter(|t| t.kind == kind)
                .map(|t| t.amount)
                .sum()
        };
        Self {
            month,
            total_income: total(TransactionType::Income),
            total_expense: total(TransactionType::Expense),
            by_category: breakdown(in_month(month), TransactionType::Expense),
            previous_by_category: breakdown(in_month(month.previous()), TransactionType::Expense),
        }
    }

    /// Income minus expense. Negative when the month overspent.
    pub fn balance(&self) -> i128 {
        i128::from(self.total_income.value()) - i128::from(self.total_expense.value())
    }

    /// How much a category changed against the previous month.
    pub fn change(&self, category: &str) -> i128 {
        let find = |list: &[CategoryTotal]| {
            list.iter()
                .find(|c| c.category == category)
                .map(|c| i128::from(c.amount.value()))
                .unwrap_or(0)
        };
        find(&self.by_category) - find(&self.previous_by_category)
    }
}

/// Sums transactions of `kind` per category and sorts the result by amount descending. Ties are
/// broken by category name so the order is stable.
pub fn breakdown<'a>(
    transactions: impl Iterator<Item = &'a Transaction>,
    kind: TransactionType,
) -> Vec<CategoryTotal> {
    let mut sums: BTreeMap<&str, Amount> = BTreeMap::new();
    for t in transactions.filter(|t| t.kind == kind) {
        let entry = sums.entry(t.category.as_str()).or_default();
        *entry = entry.saturating_add(t.amount);
    }
    let mut totals: Vec<CategoryTotal> = sums
        .into_iter()
        .map(|(category, amount)| CategoryTotal {
            category: category.to_string(),
            amount,
        })
        .collect();
    totals.sort_by(|a, b| b.amount.cmp(&a.amount));
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(id: &str, date: &str, amount: u64, category: &str, kind: TransactionType) -> Transaction {
        Transaction {
            id: id.into(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            amount: Amount::new(amount),
            category: category.into(),
            merchant: "m".into(),
            consumer: "함께".into(),
            kind,
            memo: String::new(),
        }
    }

    #[test]
    fn test_compute() {
        use TransactionType::*;
        let all = vec![
            tx("1", "2024-03-01", 15000, "식비", Expense),
            tx("2", "2024-03-02", 5000, "교통", Expense),
            tx("3", "2024-03-03", 30000, "식비", Expense),
            tx("4", "2024-03-25", 3000000, "", Income),
            tx("5", "2024-02-10", 10000, "교통", Expense),
            tx("6", "2024-04-01", 99999, "쇼핑", Expense),
        ];
        let stats = MonthlyStats::compute(&all, "2024-03".parse().unwrap());
        assert_eq!(stats.total_income.value(), 3000000);
        assert_eq!(stats.total_expense.value(), 50000);
        assert_eq!(stats.balance(), 2950000);
        assert_eq!(
            stats.by_category,
            vec![
                CategoryTotal {
                    category: "식비".into(),
                    amount: Amount::new(45000)
                },
                CategoryTotal {
                    category: "교통".into(),
                    amount: Amount::new(5000)
                },
            ]
        );
        assert_eq!(stats.previous_by_category.len(), 1);
        assert_eq!(stats.change("교통"), -5000);
        assert_eq!(stats.change("식비"), 45000);
    }

    #[test]
    fn test_empty_month() {
        let stats = MonthlyStats::compute(&[], "2024-01".parse().unwrap());
        assert!(stats.total_expense.is_zero());
        assert!(stats.by_category.is_empty());
        assert_eq!(stats.balance(), 0);
    }
}
