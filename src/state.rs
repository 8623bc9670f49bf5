use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::DynStore;
use crate::storage::ObjectStorage;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub config: Arc<AppConfig>,
    /// `None` when the backend URL or service-role key is missing
    pub storage: Option<Arc<dyn ObjectStorage>>,
}

impl AppState {
    pub fn new(store: DynStore, config: AppConfig) -> Self {
        Self { store, config: Arc::new(config), storage: None }
    }

    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = Some(storage);
        self
    }
}
