//! Implements the `Sheet` trait using in-memory data for testing purposes.
//!
//! Note: this is compiled even in the "production" version of this app so that we can run the whole
//! app, top-to-bottom, without using Google Sheets.

use crate::api::{A1Range, Sheet, SheetRange, TRANSACTIONS};
use crate::model::TransactionColumn;
use crate::Result;
use anyhow::{bail, Context};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard};

/// An implementation of the `Sheet` trait that does not use Google sheets. Clones share the same
/// data, so a test can keep a handle to inspect what a `SheetStore` did with its copy.
#[derive(Debug, Clone)]
pub(crate) struct TestSheet {
    state: Arc<Mutex<State>>,
}

#[derive(Debug)]
struct State {
    sheets: HashMap<String, Vec<Vec<String>>>,
    reads: usize,
    offline: bool,
}

impl TestSheet {
    /// Create a new `TestSheet` using `data`. The map key is sheet name and the map value is the
    /// rows of the sheet.
    pub(crate) fn new(data: HashMap<String, Vec<Vec<String>>>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                sheets: data,
                reads: 0,
                offline: false,
            })),
        }
    }

    #[cfg(test)]
    /// A spreadsheet with a `Transactions` sheet holding only the header row.
    pub(crate) fn empty() -> Self {
        let mut map = HashMap::new();
        map.insert(TRANSACTIONS.to_string(), vec![TransactionColumn::header_row()]);
        Self::new(map)
    }

    #[cfg(test)]
    /// The rows of `sheet_name`, or `None` if there is no such sheet.
    pub(crate) fn rows(&self, sheet_name: &str) -> Option<Vec<Vec<String>>> {
        self.lock().sheets.get(sheet_name).cloned()
    }

    #[cfg(test)]
    /// How many times `get` has been called.
    pub(crate) fn reads(&self) -> usize {
        self.lock().reads
    }

    #[cfg(test)]
    /// While offline every call fails as if the network were down.
    pub(crate) fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl State {
    fn check_online(&self) -> Result<()> {
        if self.offline {
            bail!("The in-memory sheet is offline");
        }
        Ok(())
    }

    fn sheet_mut(&mut self, name: &str) -> Result<&mut Vec<Vec<String>>> {
        self.sheets
            .get_mut(name)
            .with_context(|| format!("Unable to parse range: sheet '{name}' not found"))
    }
}

#[async_trait::async_trait]
impl Sheet for TestSheet {
    async fn get(&mut self, range: &A1Range) -> Result<Vec<Vec<String>>> {
        let mut state = self.lock();
        state.reads += 1;
        state.check_online()?;
        let rows = state.sheet_mut(range.sheet())?;
        let first = range.first_row() - 1;
        let last = range.last_row().unwrap_or(rows.len()).min(rows.len());
        let mut out: Vec<Vec<String>> = rows
            .iter()
            .take(last)
            .skip(first)
            .map(|row| {
                let mut cells: Vec<String> = row
                    .iter()
                    .take(range.last_col() + 1)
                    .skip(range.first_col())
                    .cloned()
                    .collect();
                trim_trailing(&mut cells);
                cells
            })
            .collect();
        while out.last().is_some_and(|r| r.is_empty()) {
            out.pop();
        }
        Ok(out)
    }

    async fn append(&mut self, range: &A1Range, rows: &[Vec<String>]) -> Result<()> {
        let mut state = self.lock();
        state.check_online()?;
        let sheet = state.sheet_mut(range.sheet())?;
        while sheet.last().is_some_and(|r| r.iter().all(|c| c.is_empty())) {
            sheet.pop();
        }
        for row in rows {
            let mut cells = vec![String::new(); range.first_col()];
            cells.extend(row.iter().cloned());
            sheet.push(cells);
        }
        Ok(())
    }

    async fn write_ranges(&mut self, data: &[SheetRange]) -> Result<()> {
        let mut state = self.lock();
        state.check_online()?;
        for sr in data {
            let sheet = state.sheet_mut(sr.range.sheet())?;
            let first_row = sr.range.first_row() - 1;
            for (i, values) in sr.values.iter().enumerate() {
                let row_ix = first_row + i;
                if sheet.len() <= row_ix {
                    sheet.resize(row_ix + 1, Vec::new());
                }
                let row = &mut sheet[row_ix];
                for (j, value) in values.iter().enumerate() {
                    let col_ix = sr.range.first_col() + j;
                    if row.len() <= col_ix {
                        row.resize(col_ix + 1, String::new());
                    }
                    row[col_ix] = value.clone();
                }
            }
        }
        Ok(())
    }

    async fn delete_rows(&mut self, sheet_name: &str, start: usize, end: usize) -> Result<()> {
        let mut state = self.lock();
        state.check_online()?;
        let sheet = state.sheet_mut(sheet_name)?;
        if start >= end || end > sheet.len() {
            bail!(
                "Cannot delete rows {start}..{end} from '{sheet_name}', which has {} rows",
                sheet.len()
            );
        }
        sheet.drain(start..end);
        Ok(())
    }

    async fn add_sheet(&mut self, sheet_name: &str, _hidden: bool) -> Result<()> {
        let mut state = self.lock();
        state.check_online()?;
        if state.sheets.contains_key(sheet_name) {
            bail!("A sheet with the name '{sheet_name}' already exists");
        }
        state.sheets.insert(sheet_name.to_string(), Vec::new());
        Ok(())
    }
}

impl Default for TestSheet {
    /// Loads seed data from this module.
    fn default() -> Self {
        Self::new(default_data())
    }
}

fn trim_trailing(cells: &mut Vec<String>) {
    while cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
}

/// Provides the seed data from this module. There is no `Metadata` sheet yet; the first write
/// creates it.
fn default_data() -> HashMap<String, Vec<Vec<String>>> {
    let mut map = HashMap::new();
    match load_csv(TRANSACTION_DATA) {
        Ok(rows) => {
            map.insert(TRANSACTIONS.to_string(), rows);
        }
        Err(e) => {
            tracing::error!("Unable to load the seed transactions: {e:#}");
            map.insert(TRANSACTIONS.to_string(), vec![TransactionColumn::header_row()]);
        }
    }
    map
}

/// Loads data from a CSV-formatted string.
fn load_csv(csv_data: &str) -> Result<Vec<Vec<String>>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(Cursor::new(csv_data.as_bytes()));

    let mut rows: Vec<Vec<String>> = Vec::new();
    for result in rdr.records() {
        let record = result.context("Bad seed CSV")?;
        let mut row: Vec<String> = record.iter().map(|field| field.to_string()).collect();
        trim_trailing(&mut row);
        rows.push(row);
    }
    Ok(rows)
}

/// Seed transaction data, formatted the way `USER_ENTERED` cells read back.
const TRANSACTION_DATA: &str = r##"id,date,amount,category,merchant,consumer,type,memo
seed-01,2024-03-01,"3,200,000",,월급,남편,income,
seed-02,2024-03-02,15000,식비,맥도날드,남편,expense,
seed-03,2024-03-03,5000,교통,지하철,아내,expense,
seed-04,2024. 3. 9,"₩48,000",외식,아웃백,함께,expense,결혼기념일
seed-05,2024-03-15,4500,카페,스타벅스,아내,expense,
seed-06,2024-03-21,89000,주거/통신,SKT,함께,expense,인터넷+휴대폰
seed-07,2024-02-27,200000,쇼핑,나이키,남편,expense,
seed-08,2024-02-25,"2,800,000",,월급,아내,income,
"##;
