use std::sync::Arc;

use super::config::Settings;
use super::store::{SharedStore, Store};

/// Shared state handed to every request handler.
pub struct AppState {
    pub store: SharedStore,
    pub settings: Settings,
}

impl AppState {
    pub fn new<S: Store + 'static>(store: S, settings: Settings) -> AppState {
        AppState {
            store: Arc::new(store),
            settings,
        }
    }
}
