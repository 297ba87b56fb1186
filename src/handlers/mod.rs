pub mod admin;
pub mod analytics;
pub mod common;
pub mod messages;
pub mod routes;
pub mod shipments;
pub mod trucks;
pub mod users;

use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::services::{
    admin::AdminService, analytics::AnalyticsService, messages::MessageService,
    route_optimizer::RouteOptimizerClient, shipments::ShipmentService, trucks::TruckService,
    users::UserService,
};
use crate::db::DbPool;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub shipments: Arc<ShipmentService>,
    pub trucks: Arc<TruckService>,
    pub users: Arc<UserService>,
    pub admin: Arc<AdminService>,
    pub analytics: Arc<AnalyticsService>,
    pub messages: Arc<MessageService>,
    pub route_optimizer: Arc<RouteOptimizerClient>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: &AppConfig,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            shipments: Arc::new(ShipmentService::new(
                db_pool.clone(),
                event_sender.clone(),
                config.settlement.clone(),
            )),
            trucks: Arc::new(TruckService::new(db_pool.clone(), event_sender.clone())),
            users: Arc::new(UserService::new(db_pool.clone())),
            admin: Arc::new(AdminService::new(db_pool.clone(), event_sender.clone())),
            analytics: Arc::new(AnalyticsService::new(db_pool.clone())),
            messages: Arc::new(MessageService::new(db_pool, event_sender)),
            route_optimizer: Arc::new(RouteOptimizerClient::new(&config.route_optimizer)?),
        })
    }
}
