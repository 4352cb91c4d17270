//! Talks to the spreadsheet that backs the ledger in remote mode.
//!
//! `Sheet` is a thin async interface over a spreadsheet with two implementations: `GoogleSheet`
//! for the real Google Sheets API and `TestSheet`, which keeps everything in memory. `SheetStore`
//! turns transaction CRUD into row operations on whichever `Sheet` it is given.

mod auth;
mod range;
mod sheet;
mod sheet_test_client;
mod store;

use crate::config::Credentials;
use crate::Result;
use std::env;
use tracing::{debug, warn};

pub use range::{column_letters, A1Range};
pub(crate) use sheet_test_client::TestSheet;
pub use store::{SheetStore, INITIAL_VERSION};

pub(crate) use auth::TokenProvider;
use sheet::GoogleSheet;

/// The sheet holding one transaction per row.
pub const TRANSACTIONS: &str = "Transactions";

/// The hidden sheet whose `A1` cell holds the last-modified marker.
pub const METADATA: &str = "Metadata";

/// OAuth scope required for reading and writing spreadsheet values.
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// When this environment variable is set and non-empty, an in-memory sheet is used in place of
/// Google Sheets so that the whole program can run without network access.
pub const TEST_MODE_VAR: &str = "LEDGER_IN_TEST_MODE";

/// Selects which `Sheet` implementation backs remote mode.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    /// Use the Google Sheets API.
    #[default]
    Google,
    /// Use the in-memory `TestSheet`.
    Testing,
}

impl Mode {
    /// Reads `LEDGER_IN_TEST_MODE`.
    pub fn from_env() -> Self {
        match env::var(TEST_MODE_VAR) {
            Ok(v) if !v.is_empty() => Mode::Testing,
            _ => Mode::Google,
        }
    }
}

/// Values to be written to one range.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SheetRange {
    pub range: A1Range,
    pub values: Vec<Vec<String>>,
}

impl SheetRange {
    pub fn new(range: A1Range, values: Vec<Vec<String>>) -> Self {
        Self { range, values }
    }
}

/// A minimal async interface over a spreadsheet. Row and column positions follow the Sheets API:
/// ranges are A1 notation and `delete_rows` takes zero-based, end-exclusive row indexes.
#[async_trait::async_trait]
pub trait Sheet {
    /// Reads the values in `range`. Trailing empty rows and cells are omitted, so rows may be
    /// shorter than the range is wide.
    async fn get(&mut self, range: &A1Range) -> Result<Vec<Vec<String>>>;

    /// Appends `rows` after the last row that has data in `range`.
    async fn append(&mut self, range: &A1Range, rows: &[Vec<String>]) -> Result<()>;

    /// Overwrites each range with its values.
    async fn write_ranges(&mut self, data: &[SheetRange]) -> Result<()>;

    /// Removes rows `start..end` from `sheet_name`, shifting later rows up.
    async fn delete_rows(&mut self, sheet_name: &str, start: usize, end: usize) -> Result<()>;

    /// Creates an empty sheet with a 1x1 grid.
    async fn add_sheet(&mut self, sheet_name: &str, hidden: bool) -> Result<()>;
}

/// Creates the `Sheet` that remote mode should use. Returns `None` when `mode` is
/// `Mode::Google` and no credentials are configured; in `Mode::Testing` the in-memory sheet
/// always counts as connected.
pub async fn sheet(
    credentials: Option<&Credentials>,
    mode: Mode,
    clock: std::sync::Arc<dyn crate::clock::Clock>,
) -> Result<Option<Box<dyn Sheet + Send>>> {
    match mode {
        Mode::Testing => {
            debug!("Using the in-memory sheet");
            Ok(Some(Box::new(TestSheet::default())))
        }
        Mode::Google => match credentials {
            None => {
                warn!("Google Sheets credentials missing, remote reads will be empty");
                Ok(None)
            }
            Some(credentials) => {
                let token_provider = TokenProvider::new(credentials.clone(), clock);
                let sheet = GoogleSheet::new(credentials.spreadsheet_id(), token_provider);
                Ok(Some(Box::new(sheet)))
            }
        },
    }
}
