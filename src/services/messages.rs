use crate::{
    commands::shipments::find_shipment,
    db::DbPool,
    entities::{message, user},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Per-shipment chat between the warehouse and the dealer
#[derive(Clone)]
pub struct MessageService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl MessageService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Oldest first.
    #[instrument(skip(self))]
    pub async fn list_messages(&self, shipment_id: Uuid) -> Result<Vec<message::Model>, ServiceError> {
        let db = &*self.db_pool;
        find_shipment(db, shipment_id).await?;

        message::Entity::find()
            .filter(message::Column::ShipmentId.eq(shipment_id))
            .order_by_asc(message::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }

    #[instrument(skip(self, content))]
    pub async fn post_message(
        &self,
        shipment_id: Uuid,
        sender_id: Uuid,
        content: String,
    ) -> Result<message::Model, ServiceError> {
        let content = content.trim().to_string();
        if content.is_empty() {
            return Err(ServiceError::ValidationError(
                "content must not be empty".to_string(),
            ));
        }

        let db = &*self.db_pool;
        find_shipment(db, shipment_id).await?;
        user::Entity::find_by_id(sender_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("user {} not found", sender_id)))?;

        let saved = message::ActiveModel {
            id: Set(Uuid::new_v4()),
            shipment_id: Set(shipment_id),
            sender_id: Set(sender_id),
            content: Set(content),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        self.event_sender
            .publish(Event::MessagePosted {
                message_id: saved.id,
                shipment_id,
            });
        Ok(saved)
    }
}
