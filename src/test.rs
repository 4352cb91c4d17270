//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::actions::{Actions, RouteRevalidator};
use crate::api::{SheetStore, TestSheet};
use crate::clock;
use crate::config::{SHEET_ID_VAR, USE_GOOGLE_SHEETS_VAR};
use crate::model::Participants;
use crate::store::{DataService, LocalStore};
use crate::Config;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// A ledger home in a temporary directory together with a `DataService` over it. Holds the
/// `TempDir` to keep the directory alive for the duration of the test.
pub struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
    service: DataService,
    sheet: Option<TestSheet>,
}

impl TestEnv {
    /// Remote mode over the seeded in-memory sheet.
    pub async fn remote() -> Self {
        let sheet = TestSheet::default();
        Self::remote_with(Some(sheet)).await
    }

    /// Remote mode with no credentials: reads are empty and writes fail.
    pub async fn disconnected() -> Self {
        Self::remote_with(None).await
    }

    /// Local mode with a transaction file in the temporary home.
    pub async fn local() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_with(temp_dir.path().join("ledger"), |_| None)
            .await
            .unwrap();
        let store = LocalStore::new(config.local_store_path(), clock::system());
        Self {
            _temp_dir: temp_dir,
            config,
            service: DataService::local(store),
            sheet: None,
        }
    }

    async fn remote_with(sheet: Option<TestSheet>) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let sheet_id = Uuid::new_v4().simple().to_string();
        let config = Config::load_with(temp_dir.path().join("ledger"), move |name| match name {
            USE_GOOGLE_SHEETS_VAR => Some("true".to_string()),
            SHEET_ID_VAR => Some(sheet_id.clone()),
            _ => None,
        })
        .await
        .unwrap();

        let clock = clock::system();
        let boxed = sheet
            .clone()
            .map(|s| Box::new(s) as Box<dyn crate::api::Sheet + Send>);
        let store = Arc::new(SheetStore::new(boxed, clock.clone()));
        let actions = Actions::remote(
            store,
            config.version_ttl(),
            clock.clone(),
            Arc::new(RouteRevalidator::default()),
        );
        let service = DataService::remote(Arc::new(actions), config.read_ttl(), clock);
        Self {
            _temp_dir: temp_dir,
            config,
            service,
            sheet,
        }
    }

    /// Returns a clone of the Config.
    pub fn config(&self) -> Config {
        self.config.clone()
    }

    pub fn service(&self) -> &DataService {
        &self.service
    }

    pub fn participants(&self) -> &Participants {
        self.config.participants()
    }

    /// The in-memory sheet behind a remote environment.
    pub fn sheet(&self) -> Option<&TestSheet> {
        self.sheet.as_ref()
    }
}
