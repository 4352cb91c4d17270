use std::error::Error as StdError;
use std::fmt::{Display, Formatter};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// The failures of a transaction store that callers are expected to tell apart from transport or
/// decoding errors. These travel inside an `anyhow::Error`; use `StoreError::of` to recover them.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum StoreError {
    /// The remote store is not configured: the spreadsheet id, the service account email or the
    /// private key is missing.
    Unavailable,
    /// An update or delete named an id that the store does not contain.
    RecordNotFound(String),
}

impl StoreError {
    /// Finds a `StoreError` anywhere in the chain of `err`.
    pub fn of(err: &Error) -> Option<&StoreError> {
        err.chain().find_map(|e| e.downcast_ref::<StoreError>())
    }

    pub fn is_not_found(err: &Error) -> bool {
        matches!(Self::of(err), Some(StoreError::RecordNotFound(_)))
    }

    pub fn is_unavailable(err: &Error) -> bool {
        matches!(Self::of(err), Some(StoreError::Unavailable))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable => f.write_str("Google Sheets credentials missing"),
            StoreError::RecordNotFound(id) => write!(f, "Transaction '{id}' not found"),
        }
    }
}

impl StdError for StoreError {}
