use coxswain_storage::ResourceStore;

/// Shared handler state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub store: ResourceStore,
}

impl AppState {
    pub fn new(store: ResourceStore) -> Self {
        Self { store }
    }
}
