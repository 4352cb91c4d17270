pub mod actions;
mod api;
pub mod args;
pub mod clock;
pub mod commands;
pub mod config;
mod error;
mod mcp;
pub mod model;
pub mod store;
mod utils;

#[cfg(test)]
mod test;

pub use api::{A1Range, Mode, Sheet, SheetRange, SheetStore, INITIAL_VERSION, TEST_MODE_VAR};
pub use config::Config;
pub use error::{Error, Result, StoreError};
