use std::sync::Arc;

use crate::config::Settings;
use crate::core::{BroadcastHub, RoomStore};
use crate::middleware::RateLimiter;
use crate::services::SessionGateway;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RoomStore>,
    pub gateway: Arc<SessionGateway>,
    pub settings: Arc<Settings>,
    /// Key seat tokens are signed with
    pub secret_key: String,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Build the store, hub and gateway described by `settings`
    pub fn new(settings: Settings) -> Self {
        let hub = Arc::new(BroadcastHub::new(
            settings.subscriber_buffer,
            settings.max_delivery_failures,
        ));
        let store = Arc::new(RoomStore::new(settings.store_config(), hub));
        Self::with_store(settings, store)
    }

    /// Wrap an existing store, e.g. one with a scripted code generator
    pub fn with_store(settings: Settings, store: Arc<RoomStore>) -> Self {
        let gateway = Arc::new(SessionGateway::new(
            Arc::clone(&store),
            settings.secret_key.clone(),
        ));

        Self {
            store,
            gateway,
            secret_key: settings.secret_key.clone(),
            rate_limiter: RateLimiter::new(settings.rate_limit_per_second),
            settings: Arc::new(settings),
        }
    }
}
