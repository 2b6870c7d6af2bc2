use std::sync::Arc;

use crate::config::Config;
use crate::services::export::FileResolver;
use crate::store::Store;
use axum::extract::FromRef;

pub type DynStore = Arc<dyn Store>;

#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub resolver: FileResolver,
    pub config: Config,
}

impl AppState {
    pub fn new(store: DynStore, config: Config) -> Self {
        let resolver = FileResolver::new(config.upload_dir.clone());
        Self {
            store,
            resolver,
            config,
        }
    }
}

impl FromRef<AppState> for DynStore {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for FileResolver {
    fn from_ref(state: &AppState) -> Self {
        state.resolver.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
