use std::sync::Arc;

use crate::handler::Gateway;

/// Shared application state, cheaply cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
}

impl AppState {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway: Arc::new(gateway) }
    }
}
