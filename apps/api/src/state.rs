//! Shared application state handed to every handler.

use std::sync::Arc;

use meridian_db::Database;

use crate::config::ApiConfig;
use crate::kitchen::{KitchenHub, KitchenNotifier};
use crate::services::order_commit::OrderCommitService;
use crate::services::promo::PromoValidator;

/// Cheap to clone; everything inside is reference counted.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ApiConfig>,
    pub hub: KitchenHub,
    pub commits: Arc<OrderCommitService>,
    pub promos: PromoValidator,
}

impl AppState {
    /// Wires the commit pipeline to the in-process kitchen hub.
    pub fn new(db: Database, config: ApiConfig) -> Self {
        let hub = KitchenHub::new(config.kitchen_channel_capacity);
        Self::build(db, config, hub.clone(), Arc::new(hub))
    }

    /// Same as [`AppState::new`] but kitchen events go to `notifier`.
    pub fn with_notifier(db: Database, config: ApiConfig, notifier: Arc<dyn KitchenNotifier>) -> Self {
        let hub = KitchenHub::new(config.kitchen_channel_capacity);
        Self::build(db, config, hub, notifier)
    }

    fn build(
        db: Database,
        config: ApiConfig,
        hub: KitchenHub,
        notifier: Arc<dyn KitchenNotifier>,
    ) -> Self {
        let commits = OrderCommitService::new(db.clone(), &config, notifier);
        let promos = PromoValidator::new(db.clone(), config.business_offset);
        AppState {
            db,
            config: Arc::new(config),
            hub,
            commits: Arc::new(commits),
            promos,
        }
    }
}
