use crate::models::Subscription;
use crate::services::filter::{ListQuery, SumQuery};
use crate::services::ServiceError;
use async_trait::async_trait;
use uuid::Uuid;

/// Persistence operations the store executes against.
///
/// Inputs are already validated; implementations only read and write.
#[async_trait]
pub trait SubscriptionBackend: Send + Sync {
    async fn insert(&self, subscription: &Subscription) -> Result<Subscription, ServiceError>;

    async fn fetch_one(&self, id: Uuid) -> Result<Option<Subscription>, ServiceError>;

    async fn fetch_all(&self) -> Result<Vec<Subscription>, ServiceError>;

    async fn fetch_page(&self, query: &ListQuery) -> Result<Vec<Subscription>, ServiceError>;

    async fn sum(&self, query: &SumQuery) -> Result<i64, ServiceError>;

    /// Overwrite the record with the same id. `None` when no row matched.
    async fn replace(
        &self,
        subscription: &Subscription,
    ) -> Result<Option<Subscription>, ServiceError>;

    /// Delete by id; removing an unknown id is not an error.
    async fn remove(&self, id: Uuid) -> Result<(), ServiceError>;

    async fn health_check(&self) -> Result<(), ServiceError>;
}
