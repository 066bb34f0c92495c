use crate::aggregate::ViewModels;
use crate::config::{AppConfig, CollectionPaths};
use crate::errors::StoreError;
use crate::identity::{Identity, LocalIdentityProvider};
use crate::models::{DailyReading, WeeklyReading};
use crate::store::{DocumentStore, LocalStore};
use crate::sync::LiveCollection;
use std::sync::Arc;
use tracing::error;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub identity: Arc<Identity>,
    pub paths: CollectionPaths,
    pub daily: Arc<LiveCollection<DailyReading>>,
    pub weekly: Arc<LiveCollection<WeeklyReading>>,
    pub views: Arc<ViewModels>,
}

impl AppState {
    pub fn new(store: Arc<dyn DocumentStore>, identity: Arc<Identity>, paths: CollectionPaths) -> Self {
        let daily = LiveCollection::bind(store.clone(), paths.daily.clone(), identity.subscribe());
        let weekly = LiveCollection::bind(store.clone(), paths.weekly.clone(), identity.subscribe());
        Self {
            store,
            identity,
            paths,
            daily: Arc::new(daily),
            weekly: Arc::new(weekly),
            views: Arc::new(ViewModels::default()),
        }
    }

    /// Opens the configured store and starts the identity bootstrap in the
    /// background. Collections begin syncing once a session is ready.
    pub async fn start(config: &AppConfig) -> Result<Self, StoreError> {
        let store: Arc<dyn DocumentStore> = match &config.store.data_path {
            Some(path) => Arc::new(LocalStore::open(path).await?),
            None => Arc::new(LocalStore::in_memory()),
        };
        let provider = Arc::new(LocalIdentityProvider::new(config.session_path.clone()));
        let identity = Arc::new(Identity::new(provider));
        let state = Self::new(store, identity.clone(), config.collections());

        let token = config.bootstrap_token.clone();
        tokio::spawn(async move {
            if let Err(err) = identity.bootstrap(token.as_deref()).await {
                error!("identity bootstrap failed, data stays unavailable: {err}");
            }
        });

        Ok(state)
    }

    pub fn shutdown(&self) {
        self.daily.shutdown();
        self.weekly.shutdown();
    }
}
