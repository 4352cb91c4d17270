use crate::api::{A1Range, Sheet, SheetRange, METADATA, TRANSACTIONS};
use crate::clock::Clock;
use crate::error::StoreError;
use crate::model::{MonthKey, Transaction, TransactionColumn};
use crate::Result;
use anyhow::Context;
use chrono::SecondsFormat;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info, warn};

/// The version reported before anything has ever been written, or whenever the marker cannot be
/// read.
pub const INITIAL_VERSION: &str = "initial";

/// Transaction CRUD on the `Transactions` sheet, plus the store-wide last-modified marker kept in
/// `Metadata!A1`.
///
/// A store built without a sheet has no credentials: reads come back empty and writes fail with
/// `StoreError::Unavailable`.
///
/// Updates and deletes locate their row by reading the whole id column and scanning it, so each
/// one costs a full column read. Nothing is locked on the spreadsheet side; concurrent writers to
/// the same row are last-write-wins.
pub struct SheetStore {
    sheet: Option<Mutex<Box<dyn Sheet + Send>>>,
    clock: Arc<dyn Clock>,
}

impl SheetStore {
    pub fn new(sheet: Option<Box<dyn Sheet + Send>>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sheet: sheet.map(Mutex::new),
            clock,
        }
    }

    /// False when no credentials were configured.
    pub fn is_connected(&self) -> bool {
        self.sheet.is_some()
    }

    async fn sheet(&self) -> Result<MutexGuard<'_, Box<dyn Sheet + Send>>> {
        match &self.sheet {
            Some(sheet) => Ok(sheet.lock().await),
            None => Err(StoreError::Unavailable.into()),
        }
    }

    /// Every transaction in the sheet. Failures are logged and read as an empty list.
    pub async fn list_all(&self) -> Vec<Transaction> {
        match self.fetch_all().await {
            Ok(transactions) => transactions,
            Err(e) => {
                error!("Error fetching transactions from Google Sheets: {e:#}");
                Vec::new()
            }
        }
    }

    /// Like `list_all` but transport errors are returned. Missing credentials still read as an
    /// empty list.
    pub async fn fetch_all(&self) -> Result<Vec<Transaction>> {
        if !self.is_connected() {
            warn!("{}", StoreError::Unavailable);
            return Ok(Vec::new());
        }
        let rows = self
            .sheet()
            .await?
            .get(&data_range())
            .await
            .context("Unable to read the Transactions sheet")?;

        let mut transactions = Vec::with_capacity(rows.len());
        for (ix, row) in rows.iter().enumerate() {
            if row.iter().all(|c| c.trim().is_empty()) {
                continue;
            }
            match Transaction::from_row(row) {
                Ok(t) => transactions.push(t),
                // Data starts on row 2.
                Err(e) => warn!("Skipping row {} of {TRANSACTIONS}: {e:#}", ix + 2),
            }
        }
        debug!("Read {} transactions from {TRANSACTIONS}", transactions.len());
        Ok(transactions)
    }

    /// The transactions dated inside `month`.
    pub async fn list_by_month(&self, month: MonthKey) -> Vec<Transaction> {
        self.list_all()
            .await
            .into_iter()
            .filter(|t| t.is_in(month))
            .collect()
    }

    /// Appends `t` as a new row.
    pub async fn insert(&self, t: &Transaction) -> Result<()> {
        {
            let mut sheet = self.sheet().await?;
            sheet
                .append(&all_columns(), &[t.to_row()])
                .await
                .with_context(|| format!("Unable to add transaction '{}'", t.id))?;
        }
        info!("Added transaction '{}'", t.id);
        self.touch_version().await;
        Ok(())
    }

    /// Overwrites the row whose id is `t.id` with all of `t`'s fields.
    pub async fn update(&self, t: &Transaction) -> Result<()> {
        {
            let mut sheet = self.sheet().await?;
            let ix = find_row(&mut **sheet, &t.id).await?;
            let range = row_range(ix);
            sheet
                .write_ranges(&[SheetRange::new(range, vec![t.to_row()])])
                .await
                .with_context(|| format!("Unable to update transaction '{}'", t.id))?;
        }
        info!("Updated transaction '{}'", t.id);
        self.touch_version().await;
        Ok(())
    }

    /// Deletes the row whose id is `id`. Rows below it move up by one.
    pub async fn remove(&self, id: &str) -> Result<()> {
        {
            let mut sheet = self.sheet().await?;
            let ix = find_row(&mut **sheet, id).await?;
            sheet
                .delete_rows(TRANSACTIONS, ix, ix + 1)
                .await
                .with_context(|| format!("Unable to delete transaction '{id}'"))?;
        }
        info!("Deleted transaction '{id}'");
        self.touch_version().await;
        Ok(())
    }

    /// The current last-modified marker, or `INITIAL_VERSION` when there is none or it cannot be
    /// read.
    pub async fn read_version(&self) -> String {
        let Ok(mut sheet) = self.sheet().await else {
            return INITIAL_VERSION.to_string();
        };
        let version = match sheet.get(&marker_range()).await {
            Ok(rows) => rows
                .into_iter()
                .next()
                .and_then(|row| row.into_iter().next())
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| INITIAL_VERSION.to_string()),
            Err(e) => {
                debug!("Unable to read the version marker: {e:#}");
                INITIAL_VERSION.to_string()
            }
        };
        debug!("Data version is {version}");
        version
    }

    /// Stamps the marker with the current time. If the write fails the `Metadata` sheet is created
    /// and the write is tried once more. A second failure is logged and otherwise ignored.
    pub async fn touch_version(&self) {
        let Ok(mut sheet) = self.sheet().await else {
            return;
        };
        let stamp = self.clock.now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let data = [SheetRange::new(marker_range(), vec![vec![stamp.clone()]])];
        if let Err(e) = sheet.write_ranges(&data).await {
            debug!("Unable to write the version marker, creating {METADATA}: {e:#}");
            let retry = async {
                sheet.add_sheet(METADATA, true).await?;
                sheet.write_ranges(&data).await
            };
            if let Err(e) = retry.await {
                error!("Failed to update metadata: {e:#}");
                return;
            }
        }
        debug!("Data version set to {stamp}");
    }
}

impl std::fmt::Debug for SheetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetStore")
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Zero-based row index of `id` in the sheet, found by scanning column A below the header.
async fn find_row(sheet: &mut (dyn Sheet + Send), id: &str) -> Result<usize> {
    let ids = sheet
        .get(&id_column())
        .await
        .context("Unable to read the transaction ids")?;
    ids.iter()
        .enumerate()
        .skip(1)
        .find(|(_, row)| row.first().map(String::as_str) == Some(id))
        .map(|(ix, _)| ix)
        .ok_or_else(|| StoreError::RecordNotFound(id.to_string()).into())
}

fn last_col() -> usize {
    TransactionColumn::ALL.len() - 1
}

/// `Transactions!A2:H`
fn data_range() -> A1Range {
    A1Range::from_row(TRANSACTIONS, 0, last_col(), 2)
}

/// `Transactions!A:H`
fn all_columns() -> A1Range {
    A1Range::columns(TRANSACTIONS, 0, last_col())
}

/// `Transactions!A:A`
fn id_column() -> A1Range {
    let col = TransactionColumn::Id.index();
    A1Range::columns(TRANSACTIONS, col, col)
}

/// The A1 range of the row at zero-based index `ix`.
fn row_range(ix: usize) -> A1Range {
    A1Range::row(TRANSACTIONS, 0, last_col(), ix + 1)
}

/// `Metadata!A1`
fn marker_range() -> A1Range {
    A1Range::cell(METADATA, 0, 1)
}
