//! The server-side boundary for transaction operations.
//!
//! In remote mode every read first asks the sheet for its version marker and then serves the
//! dataset cached under that marker, so a write made anywhere invalidates the cache without
//! coordination. Writes go straight to the sheet and then mark the views that show transactions
//! as stale. Outside remote mode the boundary serves a fixed sample and ignores writes; it does
//! not share state with the local store.

use crate::api::{self, Mode, SheetStore};
use crate::clock::Clock;
use crate::config::StoreMode;
use crate::model::{filter_month, Amount, MonthKey, Transaction, TransactionType};
use crate::store::VersionedCache;
use crate::{Config, Result};
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info};

/// The views that display transactions and must be refreshed after a write.
pub const STALE_ROUTES: [&str; 2] = ["/", "/stats"];

/// Receives the routes whose rendered views are out of date.
pub trait Revalidator: Send + Sync + Debug {
    fn revalidate(&self, route: &str);
}

/// Records stale routes until a consumer drains them.
#[derive(Debug, Default)]
pub struct RouteRevalidator {
    stale: Mutex<Vec<String>>,
}

impl RouteRevalidator {
    /// Returns the routes marked stale since the last call, oldest first.
    pub fn take_stale(&self) -> Vec<String> {
        let mut stale = self.stale.lock().unwrap_or_else(|p| p.into_inner());
        std::mem::take(&mut *stale)
    }
}

impl Revalidator for RouteRevalidator {
    fn revalidate(&self, route: &str) {
        debug!("Marking route {route} stale");
        let mut stale = self.stale.lock().unwrap_or_else(|p| p.into_inner());
        stale.push(route.to_string());
    }
}

#[derive(Debug)]
enum Backend {
    Remote {
        store: Arc<SheetStore>,
        versions: VersionedCache,
    },
    ServerSample,
}

#[derive(Debug)]
pub struct Actions {
    backend: Backend,
    clock: Arc<dyn Clock>,
    revalidator: Arc<dyn Revalidator>,
}

impl Actions {
    pub fn remote(
        store: Arc<SheetStore>,
        version_ttl: Duration,
        clock: Arc<dyn Clock>,
        revalidator: Arc<dyn Revalidator>,
    ) -> Self {
        Self {
            backend: Backend::Remote {
                store,
                versions: VersionedCache::new(version_ttl, clock.clone()),
            },
            clock,
            revalidator,
        }
    }

    pub fn server_sample(clock: Arc<dyn Clock>, revalidator: Arc<dyn Revalidator>) -> Self {
        Self {
            backend: Backend::ServerSample,
            clock,
            revalidator,
        }
    }

    /// Builds the boundary for `config`: remote when the config says so, the server sample
    /// otherwise.
    pub async fn open(
        config: &Config,
        mode: Mode,
        clock: Arc<dyn Clock>,
        revalidator: Arc<dyn Revalidator>,
    ) -> Result<Self> {
        match config.store_mode() {
            StoreMode::Local => Ok(Self::server_sample(clock, revalidator)),
            StoreMode::Remote => {
                let sheet = api::sheet(config.credentials(), mode, clock.clone()).await?;
                let store = Arc::new(SheetStore::new(sheet, clock.clone()));
                Ok(Self::remote(store, config.version_ttl(), clock, revalidator))
            }
        }
    }

    /// The sheet store behind a remote boundary.
    pub fn store(&self) -> Option<&Arc<SheetStore>> {
        match &self.backend {
            Backend::Remote { store, .. } => Some(store),
            Backend::ServerSample => None,
        }
    }

    /// The dataset for the current version marker, shared with every other reader of that
    /// version.
    pub async fn snapshot(&self) -> Result<Arc<Vec<Transaction>>> {
        match &self.backend {
            Backend::ServerSample => Ok(Arc::new(self.sample())),
            Backend::Remote { store, versions } => {
                let version = store.read_version().await;
                debug!("Sheet version is {version}");
                versions.get_or_fetch(&version, || store.fetch_all()).await
            }
        }
    }

    /// All transactions, or those in `month`. Failures are logged and read as empty.
    pub async fn fetch(&self, month: Option<MonthKey>) -> Vec<Transaction> {
        match self.snapshot().await {
            Ok(all) => filter_month(all.as_ref().clone(), month),
            Err(e) => {
                error!("Failed to fetch transactions: {e:#}");
                Vec::new()
            }
        }
    }

    pub async fn create(&self, t: &Transaction) -> Result<()> {
        match &self.backend {
            Backend::Remote { store, .. } => store.insert(t).await?,
            Backend::ServerSample => info!("No remote store, not saving transaction '{}'", t.id),
        }
        self.revalidate();
        Ok(())
    }

    pub async fn update(&self, t: &Transaction) -> Result<()> {
        match &self.backend {
            Backend::Remote { store, .. } => store.update(t).await?,
            Backend::ServerSample => info!("No remote store, not updating transaction '{}'", t.id),
        }
        self.revalidate();
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        match &self.backend {
            Backend::Remote { store, .. } => store.remove(id).await?,
            Backend::ServerSample => info!("No remote store, not deleting transaction '{id}'"),
        }
        self.revalidate();
        Ok(())
    }

    /// The current version marker, or the initial marker outside remote mode.
    pub async fn version(&self) -> String {
        match &self.backend {
            Backend::Remote { store, .. } => store.read_version().await,
            Backend::ServerSample => api::INITIAL_VERSION.to_string(),
        }
    }

    fn revalidate(&self) {
        for route in STALE_ROUTES {
            self.revalidator.revalidate(route);
        }
    }

    /// The fixed records served outside remote mode, both dated today. `fetch` applies its month
    /// filter to them the same way it does to sheet data, so asking for any other month reads as
    /// empty instead of returning the sample regardless of the month.
    fn sample(&self) -> Vec<Transaction> {
        let today = self.clock.today();
        vec![
            Transaction {
                id: "1".into(),
                date: today,
                amount: Amount::new(15000),
                category: "식비".into(),
                merchant: "맥도날드 (Server Mock)".into(),
                consumer: "남편".into(),
                kind: TransactionType::Expense,
                memo: String::new(),
            },
            Transaction {
                id: "2".into(),
                date: today,
                amount: Amount::new(5000),
                category: "교통".into(),
                merchant: "지하철 (Server Mock)".into(),
                consumer: "아내".into(),
                kind: TransactionType::Expense,
                memo: String::new(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestSheet;
    use crate::clock::ManualClock;
    use crate::error::StoreError;
    use chrono::{NaiveDate, TimeZone, Utc};

    struct Fixture {
        actions: Actions,
        sheet: TestSheet,
        clock: ManualClock,
        routes: Arc<RouteRevalidator>,
    }

    fn fixture(sheet: TestSheet) -> Fixture {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap());
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        let store = Arc::new(SheetStore::new(Some(Box::new(sheet.clone())), shared.clone()));
        let routes = Arc::new(RouteRevalidator::default());
        let actions = Actions::remote(store, Duration::from_secs(3600), shared, routes.clone());
        Fixture {
            actions,
            sheet,
            clock,
            routes,
        }
    }

    fn tx(id: &str) -> Transaction {
        Transaction {
            id: id.into(),
            date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            amount: Amount::new(15000),
            category: "식비".into(),
            merchant: "맥도날드".into(),
            consumer: "남편".into(),
            kind: TransactionType::Expense,
            memo: String::new(),
        }
    }

    #[tokio::test]
    async fn test_same_version_shares_the_dataset() {
        let f = fixture(TestSheet::default());
        let a = f.actions.snapshot().await.unwrap();
        let b = f.actions.snapshot().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.len(), 8);

        f.actions.create(&tx("new")).await.unwrap();
        let c = f.actions.snapshot().await.unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(c.len(), 9);
    }

    #[tokio::test]
    async fn test_version_is_read_on_every_fetch() {
        let f = fixture(TestSheet::empty());
        f.actions.fetch(None).await;
        let reads = f.sheet.reads();
        f.actions.fetch(None).await;
        // One read for the marker, none for the data.
        assert_eq!(f.sheet.reads(), reads + 1);
    }

    #[tokio::test]
    async fn test_writes_mark_routes_stale() {
        let f = fixture(TestSheet::empty());
        f.actions.create(&tx("1")).await.unwrap();
        let mut changed = tx("1");
        changed.memo = "빅맥".into();
        f.clock.advance(Duration::from_secs(1));
        f.actions.update(&changed).await.unwrap();
        assert_eq!(f.actions.fetch(None).await, vec![changed]);
        f.actions.delete("1").await.unwrap();
        assert_eq!(
            f.routes.take_stale(),
            vec!["/", "/stats", "/", "/stats", "/", "/stats"]
        );
        assert!(f.routes.take_stale().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_does_not_revalidate() {
        let f = fixture(TestSheet::empty());
        let err = f.actions.update(&tx("ghost")).await.unwrap_err();
        assert!(StoreError::is_not_found(&err));
        assert!(f.routes.take_stale().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_degrades_when_offline() {
        let f = fixture(TestSheet::default());
        f.sheet.set_offline(true);
        assert!(f.actions.fetch(None).await.is_empty());
        assert!(f.actions.snapshot().await.is_err());
        f.sheet.set_offline(false);
        assert_eq!(f.actions.fetch(None).await.len(), 8);
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap(),
        ));
        let store = Arc::new(SheetStore::new(None, clock.clone()));
        let routes = Arc::new(RouteRevalidator::default());
        let actions = Actions::remote(store, Duration::from_secs(3600), clock, routes.clone());
        assert!(actions.fetch(None).await.is_empty());
        let err = actions.create(&tx("1")).await.unwrap_err();
        assert!(StoreError::is_unavailable(&err));
        assert!(routes.take_stale().is_empty());
        assert_eq!(actions.version().await, api::INITIAL_VERSION);
    }

    #[tokio::test]
    async fn test_server_sample() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap(),
        ));
        let routes = Arc::new(RouteRevalidator::default());
        let actions = Actions::server_sample(clock, routes.clone());
        assert!(actions.store().is_none());
        let march = actions.fetch(Some("2024-03".parse().unwrap())).await;
        assert_eq!(march.len(), 2);
        assert!(march[0].merchant.ends_with("(Server Mock)"));
        assert!(actions
            .fetch(Some("2024-02".parse().unwrap()))
            .await
            .is_empty());

        actions.create(&tx("9")).await.unwrap();
        assert_eq!(actions.fetch(None).await.len(), 2);
        assert_eq!(routes.take_stale(), vec!["/", "/stats"]);
    }
}
