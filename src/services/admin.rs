use crate::{
    db::DbPool,
    entities::{message, shipment, truck, user, UserRole},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Number of shipments listed in the overview's activity feed.
pub const RECENT_ACTIVITY_LIMIT: u64 = 5;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SystemStats {
    pub total_users: u64,
    pub total_trucks: u64,
    pub total_shipments: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub shipment_count: u64,
    pub truck_count: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActivityEntry {
    pub shipment: shipment::Model,
    pub warehouse: Option<user::Model>,
    pub truck: Option<truck::Model>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdminOverview {
    pub stats: SystemStats,
    pub users: Vec<UserSummary>,
    pub recent_activity: Vec<ActivityEntry>,
}

#[derive(Clone)]
pub struct AdminService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl AdminService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    async fn counts_by(
        &self,
        query: sea_orm::Select<impl EntityTrait>,
        owner: impl ColumnTrait,
        id: impl ColumnTrait,
    ) -> Result<HashMap<Uuid, u64>, ServiceError> {
        let rows: Vec<(Uuid, i64)> = query
            .select_only()
            .column(owner)
            .column_as(Expr::col(id).count(), "count")
            .group_by(owner)
            .into_tuple()
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;
        Ok(rows
            .into_iter()
            .map(|(owner, count)| (owner, count.max(0) as u64))
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn overview(&self) -> Result<AdminOverview, ServiceError> {
        let db = &*self.db_pool;

        let (total_users, total_trucks, total_shipments) = futures::try_join!(
            user::Entity::find().count(db),
            truck::Entity::find().count(db),
            shipment::Entity::find().count(db),
        )
        .map_err(ServiceError::db_error)?;

        let shipment_counts = self
            .counts_by(
                shipment::Entity::find(),
                shipment::Column::WarehouseId,
                shipment::Column::Id,
            )
            .await?;
        let truck_counts = self
            .counts_by(truck::Entity::find(), truck::Column::DealerId, truck::Column::Id)
            .await?;

        let users = user::Entity::find()
            .order_by_desc(user::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|u| UserSummary {
                shipment_count: shipment_counts.get(&u.id).copied().unwrap_or(0),
                truck_count: truck_counts.get(&u.id).copied().unwrap_or(0),
                id: u.id,
                name: u.name,
                email: u.email,
                role: u.role,
                created_at: u.created_at,
            })
            .collect();

        let recent = shipment::Entity::find()
            .find_also_related(truck::Entity)
            .order_by_desc(shipment::Column::CreatedAt)
            .limit(RECENT_ACTIVITY_LIMIT)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut recent_activity = Vec::with_capacity(recent.len());
        for (shipment, truck) in recent {
            let warehouse = shipment
                .find_related(user::Entity)
                .one(db)
                .await
                .map_err(ServiceError::db_error)?;
            recent_activity.push(ActivityEntry {
                shipment,
                warehouse,
                truck,
            });
        }

        Ok(AdminOverview {
            stats: SystemStats {
                total_users,
                total_trucks,
                total_shipments,
            },
            users,
            recent_activity,
        })
    }

    /// Removes a user who owns nothing. Shipment history is never deleted, so a
    /// user still referenced by trucks, shipments or messages is a `Conflict`.
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let existing = user::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("user {} not found", id)))?;

        let (shipments, trucks, messages) = futures::try_join!(
            shipment::Entity::find()
                .filter(shipment::Column::WarehouseId.eq(id))
                .count(db),
            truck::Entity::find()
                .filter(truck::Column::DealerId.eq(id))
                .count(db),
            message::Entity::find()
                .filter(message::Column::SenderId.eq(id))
                .count(db),
        )
        .map_err(ServiceError::db_error)?;

        if shipments + trucks + messages > 0 {
            warn!(shipments, trucks, messages, "Refusing to delete user with records");
            return Err(ServiceError::Conflict(format!(
                "user {} still owns {} shipment(s), {} truck(s) and {} message(s)",
                id, shipments, trucks, messages
            )));
        }

        existing.delete(db).await.map_err(ServiceError::db_error)?;
        info!(user_id = %id, "User deleted");
        self.event_sender.publish(Event::UserDeleted(id));
        Ok(())
    }
}
