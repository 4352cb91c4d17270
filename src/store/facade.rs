use crate::actions::{Actions, RouteRevalidator};
use crate::api::Mode;
use crate::clock::Clock;
use crate::config::StoreMode;
use crate::model::{MonthKey, Transaction};
use crate::store::{LocalStore, TtlCache};
use crate::{Config, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// What a facade read was for.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum CacheKey {
    All,
    Month(MonthKey),
}

impl From<Option<MonthKey>> for CacheKey {
    fn from(month: Option<MonthKey>) -> Self {
        match month {
            None => CacheKey::All,
            Some(m) => CacheKey::Month(m),
        }
    }
}

enum Backend {
    Remote {
        actions: Arc<Actions>,
        cache: Mutex<TtlCache<CacheKey, Vec<Transaction>>>,
    },
    Local(LocalStore),
}

/// The one entry point callers use for transactions. In remote mode it reads through the action
/// boundary with a short-lived cache in front; in local mode it goes straight to the JSON file.
pub struct DataService {
    backend: Backend,
}

impl DataService {
    pub fn remote(actions: Arc<Actions>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            backend: Backend::Remote {
                actions,
                cache: Mutex::new(TtlCache::new(ttl, clock)),
            },
        }
    }

    pub fn local(store: LocalStore) -> Self {
        Self {
            backend: Backend::Local(store),
        }
    }

    /// Builds the facade for the store mode `config` resolved.
    pub async fn open(config: &Config, mode: Mode, clock: Arc<dyn Clock>) -> Result<Self> {
        match config.store_mode() {
            StoreMode::Local => Ok(Self::local(LocalStore::new(
                config.local_store_path(),
                clock,
            ))),
            StoreMode::Remote => {
                let revalidator = Arc::new(RouteRevalidator::default());
                let actions = Actions::open(config, mode, clock.clone(), revalidator).await?;
                Ok(Self::remote(Arc::new(actions), config.read_ttl(), clock))
            }
        }
    }

    pub fn mode(&self) -> StoreMode {
        match &self.backend {
            Backend::Remote { .. } => StoreMode::Remote,
            Backend::Local(_) => StoreMode::Local,
        }
    }

    /// The action boundary behind a remote facade.
    pub fn actions(&self) -> Option<&Arc<Actions>> {
        match &self.backend {
            Backend::Remote { actions, .. } => Some(actions),
            Backend::Local(_) => None,
        }
    }

    pub async fn get_transactions(&self, month: Option<MonthKey>) -> Vec<Transaction> {
        match &self.backend {
            Backend::Local(store) => store.list(month).await,
            Backend::Remote { actions, cache } => {
                let key = CacheKey::from(month);
                if let Some(hit) = cache.lock().await.get(&key) {
                    debug!("Read cache hit for {key:?}");
                    return hit;
                }
                debug!("Read cache miss for {key:?}");
                let data = actions.fetch(month).await;
                cache.lock().await.set(key, data.clone());
                data
            }
        }
    }

    pub async fn add_transaction(&self, t: &Transaction) -> Result<()> {
        match &self.backend {
            Backend::Local(store) => store.insert(t).await,
            Backend::Remote { actions, cache } => {
                let result = actions.create(t).await;
                cache.lock().await.clear();
                result
            }
        }
    }

    pub async fn update_transaction(&self, t: &Transaction) -> Result<()> {
        match &self.backend {
            Backend::Local(store) => store.update(t).await,
            Backend::Remote { actions, cache } => {
                let result = actions.update(t).await;
                cache.lock().await.clear();
                result
            }
        }
    }

    pub async fn delete_transaction(&self, id: &str) -> Result<()> {
        match &self.backend {
            Backend::Local(store) => store.remove(id).await,
            Backend::Remote { actions, cache } => {
                let result = actions.delete(id).await;
                cache.lock().await.clear();
                result
            }
        }
    }
}
