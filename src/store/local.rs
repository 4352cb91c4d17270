use crate::clock::Clock;
use crate::error::StoreError;
use crate::model::{filter_month, Amount, MonthKey, Transaction, TransactionType};
use crate::{utils, Result};
use anyhow::{bail, Context};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Transactions kept as one JSON array in a file. Every write reads the whole array, changes it and
/// writes it back.
///
/// Until the file exists the store reads as a small demo seed. A store made with
/// `LocalStore::without_storage` never touches the disk: it always reads the seed and ignores
/// writes.
#[derive(Debug)]
pub struct LocalStore {
    path: Option<PathBuf>,
    clock: Arc<dyn Clock>,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: Some(path.into()),
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn without_storage(clock: Arc<dyn Clock>) -> Self {
        Self {
            path: None,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The records shown before anything has been saved: two dated `today` and one older.
    pub fn seed(today: NaiveDate) -> Vec<Transaction> {
        let past = NaiveDate::from_ymd_opt(2023, 10, 1).unwrap_or(today);
        vec![
            seed_expense("1", today, 15000, "식비", "맥도날드", "남편"),
            seed_expense("2", today, 5000, "교통", "지하철", "아내"),
            seed_expense("3", past, 200000, "쇼핑", "나이키", "남편"),
        ]
    }

    /// All records, or only those in `month`. An unreadable file is logged and reads as empty.
    pub async fn list(&self, month: Option<MonthKey>) -> Vec<Transaction> {
        match self.load().await {
            Ok(all) => filter_month(all, month),
            Err(e) => {
                error!("Unable to read local transactions: {e:#}");
                Vec::new()
            }
        }
    }

    pub async fn insert(&self, t: &Transaction) -> Result<()> {
        let Some(path) = self.writable() else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().await;
        let mut all = self.load().await?;
        if all.iter().any(|x| x.id == t.id) {
            bail!("A transaction with id '{}' already exists", t.id);
        }
        all.push(t.clone());
        self.save(path, &all).await?;
        info!("Added transaction '{}' to {}", t.id, path.display());
        Ok(())
    }

    /// Replaces the record whose id is `t.id`.
    pub async fn update(&self, t: &Transaction) -> Result<()> {
        let Some(path) = self.writable() else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().await;
        let mut all = self.load().await?;
        let existing = all
            .iter_mut()
            .find(|x| x.id == t.id)
            .ok_or_else(|| StoreError::RecordNotFound(t.id.clone()))?;
        *existing = t.clone();
        self.save(path, &all).await?;
        info!("Updated transaction '{}' in {}", t.id, path.display());
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> Result<()> {
        let Some(path) = self.writable() else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().await;
        let mut all = self.load().await?;
        let before = all.len();
        all.retain(|x| x.id != id);
        if all.len() == before {
            return Err(StoreError::RecordNotFound(id.to_string()).into());
        }
        self.save(path, &all).await?;
        info!("Deleted transaction '{id}' from {}", path.display());
        Ok(())
    }

    fn writable(&self) -> Option<&Path> {
        if self.path.is_none() {
            debug!("No local storage available, ignoring the write");
        }
        self.path.as_deref()
    }

    async fn load(&self) -> Result<Vec<Transaction>> {
        if let Some(path) = &self.path {
            if utils::is_file(path).await {
                return utils::deserialize(path)
                    .await
                    .context("The local transaction file is corrupt");
            }
        }
        Ok(Self::seed(self.clock.today()))
    }

    async fn save(&self, path: &Path, all: &[Transaction]) -> Result<()> {
        utils::serialize(path, all)
            .await
            .context("Unable to save local transactions")
    }
}

fn seed_expense(
    id: &str,
    date: NaiveDate,
    amount: u64,
    category: &str,
    merchant: &str,
    consumer: &str,
) -> Transaction {
    Transaction {
        id: id.to_string(),
        date,
        amount: Amount::new(amount),
        category: category.to_string(),
        merchant: merchant.to_string(),
        consumer: consumer.to_string(),
        kind: TransactionType::Expense,
        memo: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap(),
        ))
    }

    fn tx(id: &str, date: &str) -> Transaction {
        Transaction {
            id: id.into(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            amount: Amount::new(12000),
            category: "카페".into(),
            merchant: "스타벅스".into(),
            consumer: "함께".into(),
            kind: TransactionType::Expense,
            memo: "라떼".into(),
        }
    }

    #[tokio::test]
    async fn test_seed_until_first_write() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path().join("transactions.json"), clock());
        let all = store.list(None).await;
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(store.list(Some("2024-03".parse().unwrap())).await.len(), 2);
        assert_eq!(store.list(Some("2023-10".parse().unwrap())).await.len(), 1);
        assert!(!dir.path().join("transactions.json").exists());
    }

    #[tokio::test]
    async fn test_crud_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transactions.json");
        let store = LocalStore::new(&path, clock());
        let t = tx("x", "2024-03-06");
        store.insert(&t).await.unwrap();
        assert!(store.insert(&t).await.is_err());

        let reopened = LocalStore::new(&path, clock());
        let all = reopened.list(None).await;
        assert_eq!(all.len(), 4);
        assert_eq!(all[3], t);

        let mut changed = t.clone();
        changed.memo = String::new();
        reopened.update(&changed).await.unwrap();
        assert_eq!(store.list(None).await[3], changed);

        store.remove("x").await.unwrap();
        store.remove("1").await.unwrap();
        let ids: Vec<String> = store.list(None).await.into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["2", "3"]);
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path().join("t.json"), clock());
        let err = store.update(&tx("nope", "2024-03-01")).await.unwrap_err();
        assert!(StoreError::is_not_found(&err));
        let err = store.remove("nope").await.unwrap_err();
        assert!(StoreError::is_not_found(&err));
        assert_eq!(store.list(None).await.len(), 3);
    }

    #[tokio::test]
    async fn test_without_storage() {
        let store = LocalStore::without_storage(clock());
        store.insert(&tx("x", "2024-03-06")).await.unwrap();
        store.remove("1").await.unwrap();
        store.update(&tx("nope", "2024-03-06")).await.unwrap();
        assert_eq!(store.list(None).await, LocalStore::seed(clock().today()));
    }

    #[tokio::test]
    async fn test_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("transactions.json");
        utils::write(&path, "not json").await.unwrap();
        let store = LocalStore::new(&path, clock());
        assert!(store.list(None).await.is_empty());
        assert!(store.insert(&tx("x", "2024-03-06")).await.is_err());
        assert_eq!(utils::read(&path).await.unwrap(), "not json");
    }
}
