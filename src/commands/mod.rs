//! Write-side operations on shipments.
//!
//! Each command owns one database transaction and publishes its events only
//! after that transaction has committed.

use crate::{db::DbPool, errors::ServiceError, events::EventSender};
use async_trait::async_trait;
use std::sync::Arc;

pub mod shipments;

/// A business operation that can be executed against the store.
#[async_trait]
pub trait Command: Send + Sync {
    type Result;

    /// Runs the command. Events go out on `event_sender` once the changes are durable.
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}
