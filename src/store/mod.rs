//! Where transactions are kept and how reads are cached.
//!
//! `DataService` is the facade the CLI uses; the MCP server talks to `Actions` directly. In remote
//! mode the facade reads through the `Actions` boundary with a 60 second `TtlCache` in front. The
//! boundary itself keeps a `VersionedCache` keyed by the sheet's last-modified marker. In local
//! mode `LocalStore` keeps everything in a JSON file and nothing is cached.

mod cache;
mod facade;
mod local;
mod versioned;

pub use cache::TtlCache;
pub use facade::{CacheKey, DataService};
pub use local::LocalStore;
pub use versioned::VersionedCache;
