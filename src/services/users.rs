use crate::{
    db::DbPool,
    entities::{user, UserRole},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewUser {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    pub role: UserRole,
}

#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self), fields(email = %new.email))]
    pub async fn create_user(&self, new: NewUser) -> Result<user::Model, ServiceError> {
        new.validate()?;
        let email = new.email.trim().to_lowercase();
        let db = &*self.db_pool;

        let taken = user::Entity::find()
            .filter(user::Column::Email.eq(email.clone()))
            .one(db)
            .await
            .map_err(ServiceError::db_error)?;
        if taken.is_some() {
            return Err(ServiceError::Conflict(format!(
                "a user with email {} already exists",
                email
            )));
        }

        let saved = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(new.name.trim().to_string()),
            email: Set(email),
            role: Set(new.role),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(user_id = %saved.id, role = %saved.role, "User created");
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("user {} not found", id)))
    }
}
