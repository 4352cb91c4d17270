//! These structs provide the CLI interface for the ledger CLI.

use crate::model::{Amount, MonthKey, Transaction, TransactionType};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// ledger: a shared expense ledger for two people.
///
/// Transactions are kept either in a local JSON file under --ledger-home or, when configured, in a
/// Google Sheet used as a row store. Set USE_GOOGLE_SHEETS together with GOOGLE_SHEET_ID,
/// GOOGLE_CLIENT_EMAIL and GOOGLE_PRIVATE_KEY (or run `ledger init --remote`) to use the sheet.
///
/// The mcp subcommand serves the same operations to an AI agent over stdio.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the ledger home directory and write an initial config.json.
    ///
    /// Without --remote the ledger keeps its data in $LEDGER_HOME/transactions.json. With --remote
    /// it uses the Google Sheet given by --sheet-url, authenticating as the service account in
    /// --service-account-key. Share the sheet with the service account's email address first.
    Init(InitArgs),
    /// List transactions, optionally only those in one month.
    List(ListArgs),
    /// Add a new transaction. A fresh id is generated for it.
    Add(TransactionArgs),
    /// Replace every field of an existing transaction.
    Update(UpdateArgs),
    /// Delete a transaction.
    Delete(DeleteArgs),
    /// Show totals and the per-category breakdown for a month.
    Stats(StatsArgs),
    /// Print the sheet's last-modified marker.
    Version,
    /// Run the MCP server over stdio.
    Mcp,
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where ledger data and configuration is held. Defaults to ~/couple-ledger
    #[arg(long, env = "LEDGER_HOME", default_value_t = default_ledger_home())]
    ledger_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, ledger_home: PathBuf) -> Self {
        Self {
            log_level,
            ledger_home: ledger_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn ledger_home(&self) -> &DisplayPath {
        &self.ledger_home
    }
}

/// Args for the `ledger init` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct InitArgs {
    /// The URL of the Google sheet. It looks like this:
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX
    #[arg(long)]
    sheet_url: Option<String>,

    /// The service account's email address, if it should not be taken from the key file.
    #[arg(long)]
    client_email: Option<String>,

    /// The path to a downloaded Google service account key (JSON).
    #[arg(long)]
    service_account_key: Option<PathBuf>,

    /// Store transactions in the Google sheet instead of the local file.
    #[arg(long)]
    remote: bool,
}

impl InitArgs {
    pub fn new(
        sheet_url: Option<String>,
        client_email: Option<String>,
        service_account_key: Option<PathBuf>,
        remote: bool,
    ) -> Self {
        Self {
            sheet_url,
            client_email,
            service_account_key,
            remote,
        }
    }

    pub fn sheet_url(&self) -> Option<&str> {
        self.sheet_url.as_deref()
    }

    pub fn client_email(&self) -> Option<&str> {
        self.client_email.as_deref()
    }

    pub fn service_account_key(&self) -> Option<&Path> {
        self.service_account_key.as_deref()
    }

    pub fn remote(&self) -> bool {
        self.remote
    }
}

/// Args for the `ledger list` command.
#[derive(Debug, Parser, Clone, Default)]
pub struct ListArgs {
    /// Only list transactions in this month (YYYY-MM).
    #[arg(long)]
    month: Option<MonthKey>,
}

impl ListArgs {
    pub fn new(month: Option<MonthKey>) -> Self {
        Self { month }
    }

    pub fn month(&self) -> Option<MonthKey> {
        self.month
    }
}

/// The fields of a transaction as given on the command line.
#[derive(Debug, Parser, Clone)]
pub struct TransactionArgs {
    /// The date of the transaction (YYYY-MM-DD).
    #[arg(long)]
    date: NaiveDate,

    /// The amount in whole currency units. Thousands separators are accepted.
    #[arg(long)]
    amount: Amount,

    /// Who was paid, or who paid.
    #[arg(long)]
    merchant: String,

    /// Whose spending this is: either participant or the shared label.
    #[arg(long)]
    consumer: String,

    /// Income or expense.
    #[arg(long = "type", value_enum, default_value_t = TransactionType::Expense)]
    kind: TransactionType,

    /// The expense category. Required for expenses.
    #[arg(long, default_value = "")]
    category: String,

    #[arg(long, default_value = "")]
    memo: String,
}

impl TransactionArgs {
    pub fn new(
        date: NaiveDate,
        amount: Amount,
        merchant: impl Into<String>,
        consumer: impl Into<String>,
        kind: TransactionType,
        category: impl Into<String>,
        memo: impl Into<String>,
    ) -> Self {
        Self {
            date,
            amount,
            merchant: merchant.into(),
            consumer: consumer.into(),
            kind,
            category: category.into(),
            memo: memo.into(),
        }
    }

    /// Builds the transaction stored under `id`.
    pub fn to_transaction(&self, id: impl Into<String>) -> Transaction {
        Transaction {
            id: id.into(),
            date: self.date,
            amount: self.amount,
            category: self.category.clone(),
            merchant: self.merchant.clone(),
            consumer: self.consumer.clone(),
            kind: self.kind,
            memo: self.memo.clone(),
        }
    }
}

/// Args for the `ledger update` command.
#[derive(Debug, Parser, Clone)]
pub struct UpdateArgs {
    /// The id of the transaction to replace.
    #[arg(long)]
    id: String,

    #[clap(flatten)]
    fields: TransactionArgs,
}

impl UpdateArgs {
    pub fn new(id: impl Into<String>, fields: TransactionArgs) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn to_transaction(&self) -> Transaction {
        self.fields.to_transaction(&self.id)
    }
}

/// Args for the `ledger delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The id of the transaction to delete.
    #[arg(long)]
    id: String,
}

impl DeleteArgs {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Args for the `ledger stats` command.
#[derive(Debug, Parser, Clone)]
pub struct StatsArgs {
    /// The month to summarize (YYYY-MM).
    #[arg(long)]
    month: MonthKey,
}

impl StatsArgs {
    pub fn new(month: MonthKey) -> Self {
        Self { month }
    }

    pub fn month(&self) -> MonthKey {
        self.month
    }
}

fn default_ledger_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("couple-ledger"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --ledger-home or LEDGER_HOME instead of relying on the default \
                ledger home directory.",
            );
            PathBuf::from("couple-ledger")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
