use crate::model::labels::Participants;
use crate::model::{Amount, MonthKey};
use crate::Result;
use anyhow::{bail, Context};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Date layouts that a `USER_ENTERED` date cell may come back as, depending on the sheet locale.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y. %m. %d", "%Y.%m.%d", "%m/%d/%Y"];

/// Whether money came in or went out.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[derive(JsonSchema, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    #[default]
    Expense,
}

serde_plain::derive_display_from_serialize!(TransactionType);
serde_plain::derive_fromstr_from_deserialize!(TransactionType);

/// A single ledger entry. This is the only persisted entity.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub struct Transaction {
    /// Unique identifier of the transaction.
    pub id: String,
    /// Calendar date, `YYYY-MM-DD`.
    #[schemars(with = "String")]
    pub date: NaiveDate,
    /// Whole currency units, never negative.
    #[schemars(with = "u64")]
    pub amount: Amount,
    /// Expense category. Ignored for income.
    #[serde(default)]
    pub category: String,
    /// Who was paid, or who paid.
    pub merchant: String,
    /// Which participant the entry belongs to, or the shared label.
    pub consumer: String,
    /// `income` or `expense`.
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// Free text. Empty when there is no memo.
    #[serde(default)]
    pub memo: String,
}

impl Transaction {
    /// Encodes the transaction as a sheet row in `TransactionColumn::ALL` order.
    pub fn to_row(&self) -> Vec<String> {
        TransactionColumn::ALL
            .iter()
            .map(|col| self.cell(*col))
            .collect()
    }

    /// Decodes a sheet row laid out in `TransactionColumn::ALL` order. Cells past the end of a
    /// short row are read as empty strings. Text cells come back exactly as `to_row` wrote them;
    /// only the parsed cells (date, amount, type) tolerate surrounding whitespace.
    pub fn from_row<S: AsRef<str>>(row: &[S]) -> Result<Self> {
        if row.len() > TransactionColumn::ALL.len() {
            bail!(
                "A transaction row has {} cells but only {} columns are known",
                row.len(),
                TransactionColumn::ALL.len()
            );
        }
        let get = |col: TransactionColumn| -> &str {
            row.get(col.index()).map(|s| s.as_ref()).unwrap_or("")
        };

        let id = get(TransactionColumn::Id);
        if id.trim().is_empty() {
            bail!("A transaction row has no id");
        }
        let date = parse_date(get(TransactionColumn::Date))
            .with_context(|| format!("Bad date for transaction '{id}'"))?;
        let amount = Amount::from_str(get(TransactionColumn::Amount).trim())
            .with_context(|| format!("Bad amount for transaction '{id}'"))?;
        let kind = TransactionType::from_str(&get(TransactionColumn::Type).trim().to_lowercase())
            .with_context(|| format!("Bad type for transaction '{id}'"))?;

        Ok(Self {
            id: id.to_string(),
            date,
            amount,
            category: get(TransactionColumn::Category).to_string(),
            merchant: get(TransactionColumn::Merchant).to_string(),
            consumer: get(TransactionColumn::Consumer).to_string(),
            kind,
            memo: get(TransactionColumn::Memo).to_string(),
        })
    }

    /// The value written to `col` for this transaction.
    pub fn cell(&self, col: TransactionColumn) -> String {
        match col {
            TransactionColumn::Id => self.id.clone(),
            TransactionColumn::Date => self.date.format("%Y-%m-%d").to_string(),
            TransactionColumn::Amount => self.amount.to_string(),
            TransactionColumn::Category => self.category.clone(),
            TransactionColumn::Merchant => self.merchant.clone(),
            TransactionColumn::Consumer => self.consumer.clone(),
            TransactionColumn::Type => self.kind.to_string(),
            TransactionColumn::Memo => self.memo.clone(),
        }
    }

    pub fn is_in(&self, month: MonthKey) -> bool {
        month.contains(self.date)
    }

    /// Checks the fields a user picks from fixed lists: the category of an expense and the
    /// consumer label.
    pub fn validate(&self, participants: &Participants, categories: &[&str]) -> Result<()> {
        if self.id.trim().is_empty() {
            bail!("A transaction id must not be empty");
        }
        if self.merchant.trim().is_empty() {
            bail!("A merchant is required");
        }
        if self.kind == TransactionType::Expense && !categories.contains(&self.category.as_str())
        {
            bail!(
                "'{}' is not a known category, expected one of: {}",
                self.category,
                categories.join(", ")
            );
        }
        if !participants.contains(&self.consumer) {
            bail!(
                "'{}' is not a known consumer, expected one of: {}",
                self.consumer,
                participants.labels().join(", ")
            );
        }
        Ok(())
    }
}

/// Keeps the transactions that fall in `month`, or all of them when `month` is `None`.
pub fn filter_month(transactions: Vec<Transaction>, month: Option<MonthKey>) -> Vec<Transaction> {
    match month {
        None => transactions,
        Some(m) => transactions.into_iter().filter(|t| t.is_in(m)).collect(),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim().trim_end_matches('.');
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    bail!("Unrecognized date '{s}', expected YYYY-MM-DD")
}

/// The columns of the `Transactions` sheet. The order of `ALL` is the on-sheet layout; changing it
/// changes the serialization contract with existing sheets.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionColumn {
    Id,
    Date,
    Amount,
    Category,
    Merchant,
    Consumer,
    Type,
    Memo,
}

serde_plain::derive_display_from_serialize!(TransactionColumn);
serde_plain::derive_fromstr_from_deserialize!(TransactionColumn);

impl TransactionColumn {
    pub const ALL: [TransactionColumn; 8] = [
        TransactionColumn::Id,
        TransactionColumn::Date,
        TransactionColumn::Amount,
        TransactionColumn::Category,
        TransactionColumn::Merchant,
        TransactionColumn::Consumer,
        TransactionColumn::Type,
        TransactionColumn::Memo,
    ];

    /// Zero-based position of the column in the sheet.
    pub fn index(self) -> usize {
        // ALL is tiny; a linear search keeps ALL the only place the order is written down.
        TransactionColumn::ALL
            .iter()
            .position(|c| *c == self)
            .unwrap_or_default()
    }

    /// The header text in row 1.
    pub fn header(self) -> String {
        self.to_string()
    }

    /// The header row for a fresh `Transactions` sheet.
    pub fn header_row() -> Vec<String> {
        TransactionColumn::ALL.iter().map(|c| c.header()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::labels::EXPENSE_CATEGORIES;

    fn mcdonalds() -> Transaction {
        Transaction {
            id: "1".into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            amount: Amount::new(15000),
            category: "식비".into(),
            merchant: "맥도날드".into(),
            consumer: "남편".into(),
            kind: TransactionType::Expense,
            memo: String::new(),
        }
    }

    #[test]
    fn test_to_row_order() {
        let row = mcdonalds().to_row();
        assert_eq!(
            row,
            vec!["1", "2024-03-05", "15000", "식비", "맥도날드", "남편", "expense", ""]
        );
    }

    #[test]
    fn test_header_row() {
        assert_eq!(
            TransactionColumn::header_row(),
            vec!["id", "date", "amount", "category", "merchant", "consumer", "type", "memo"]
        );
    }

    #[test]
    fn test_from_row_missing_memo() {
        let row = vec!["1", "2024-03-05", "15000", "식비", "맥도날드", "남편", "expense"];
        assert_eq!(Transaction::from_row(&row).unwrap(), mcdonalds());
    }

    #[test]
    fn test_from_row_formatted_cells() {
        let row = vec![
            "7",
            "2024. 3. 5",
            "₩15,000",
            "",
            "월급",
            "아내",
            "Income",
            "3월",
        ];
        let t = Transaction::from_row(&row).unwrap();
        assert_eq!(t.date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(t.amount.value(), 15000);
        assert_eq!(t.kind, TransactionType::Income);
        assert_eq!(t.memo, "3월");
    }

    #[test]
    fn test_text_cells_are_kept_verbatim() {
        let mut t = mcdonalds();
        t.merchant = "맥도날드 ".into();
        t.memo = "  빅맥".into();
        assert_eq!(Transaction::from_row(&t.to_row()).unwrap(), t);
    }

    #[test]
    fn test_from_row_errors() {
        assert!(Transaction::from_row::<&str>(&[]).is_err());
        let bad_type = vec!["1", "2024-03-05", "1", "", "m", "c", "transfer"];
        assert!(Transaction::from_row(&bad_type).is_err());
        let bad_date = vec!["1", "2024-02-30", "1", "", "m", "c", "expense"];
        assert!(Transaction::from_row(&bad_date).is_err());
        let too_long = vec!["1", "2024-03-05", "1", "", "m", "c", "expense", "", "extra"];
        assert!(Transaction::from_row(&too_long).is_err());
    }

    #[test]
    fn test_column_index_follows_all() {
        for (ix, col) in TransactionColumn::ALL.iter().enumerate() {
            assert_eq!(col.index(), ix);
        }
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(mcdonalds()).unwrap();
        assert_eq!(json["type"], "expense");
        assert_eq!(json["date"], "2024-03-05");
        assert_eq!(json["amount"], 15000);
    }

    #[test]
    fn test_json_without_memo() {
        let json = r#"{"id":"2","date":"2024-03-06","amount":5000,"category":"교통",
            "merchant":"지하철","consumer":"아내","type":"expense"}"#;
        let t: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(t.memo, "");
    }

    #[test]
    fn test_validate() {
        let p = Participants::default();
        mcdonalds().validate(&p, EXPENSE_CATEGORIES).unwrap();

        let mut bad_category = mcdonalds();
        bad_category.category = "술".into();
        assert!(bad_category.validate(&p, EXPENSE_CATEGORIES).is_err());

        let mut income = bad_category.clone();
        income.kind = TransactionType::Income;
        income.validate(&p, EXPENSE_CATEGORIES).unwrap();

        let mut bad_consumer = mcdonalds();
        bad_consumer.consumer = "이웃".into();
        assert!(bad_consumer.validate(&p, EXPENSE_CATEGORIES).is_err());
    }

    #[test]
    fn test_filter_month() {
        let mut april = mcdonalds();
        april.id = "2".into();
        april.date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let all = vec![mcdonalds(), april];
        let march = filter_month(all.clone(), Some("2024-03".parse().unwrap()));
        assert_eq!(march, vec![mcdonalds()]);
        assert_eq!(filter_month(all.clone(), None).len(), 2);
    }
}
