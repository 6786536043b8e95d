pub mod analytics;
pub mod common;
pub mod me;
pub mod payments;
pub mod profiles;
pub mod quotes;
pub mod shipments;
pub mod tracking;

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::{EventSender, TrackingFeed};
use crate::logging::component_logger;
use crate::models::TransitionPolicy;
use crate::pricing::{CostCalculator, TrackingIdGenerator};
use crate::services::{
    analytics::AnalyticsService, payments::PaymentService, profiles::ProfileService,
    quotes::QuoteService, shipments::ShipmentService, tracking::TrackingService,
};
use slog::Logger;
use std::sync::Arc;

pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub shipments: Arc<ShipmentService>,
    pub tracking: Arc<TrackingService>,
    pub quotes: Arc<QuoteService>,
    pub payments: Arc<PaymentService>,
    pub profiles: Arc<ProfileService>,
    pub analytics: Arc<AnalyticsService>,
}

impl AppServices {
    /// Wires every service to one calculator and one tracking-id generator,
    /// so quotes and shipments are priced identically.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &AppConfig,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        feed: Arc<TrackingFeed>,
        calculator: Arc<dyn CostCalculator>,
        tracking_ids: Arc<dyn TrackingIdGenerator>,
        base_logger: &Logger,
    ) -> Self {
        let shipments = Arc::new(ShipmentService::new(
            db_pool.clone(),
            event_sender.clone(),
            calculator.clone(),
            tracking_ids,
            feed.clone(),
            config.tracking.max_attempts,
            component_logger(base_logger, "shipments_service"),
        ));
        let tracking = Arc::new(TrackingService::new(
            db_pool.clone(),
            event_sender.clone(),
            feed,
            TransitionPolicy::from_config(&config.lifecycle),
            component_logger(base_logger, "tracking_service"),
        ));
        let quotes = Arc::new(QuoteService::new(
            db_pool.clone(),
            event_sender.clone(),
            calculator,
            config.quotes.validity_days,
            component_logger(base_logger, "quotes_service"),
        ));
        let payments = Arc::new(PaymentService::new(
            db_pool.clone(),
            event_sender.clone(),
            component_logger(base_logger, "payments_service"),
        ));
        let profiles = Arc::new(ProfileService::new(
            db_pool.clone(),
            event_sender,
            component_logger(base_logger, "profiles_service"),
        ));
        let analytics = Arc::new(AnalyticsService::new(db_pool));

        Self {
            shipments,
            tracking,
            quotes,
            payments,
            profiles,
            analytics,
        }
    }
}
