//! In-process backend for local runs and tests.

use crate::models::Subscription;
use crate::services::backend::SubscriptionBackend;
use crate::services::error::StoreDiagnostic;
use crate::services::filter::{CompiledFilter, ListQuery, SumQuery};
use crate::services::ServiceError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryBackend {
    records: RwLock<HashMap<Uuid, Subscription>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn matching(&self, filter: &CompiledFilter) -> Result<Vec<Subscription>, ServiceError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        let mut rows: Vec<Subscription> = records
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.start_month.cmp(&b.start_month).then(a.id.cmp(&b.id)));
        Ok(rows)
    }
}

fn poisoned() -> ServiceError {
    ServiceError::Database(anyhow::anyhow!("memory backend lock poisoned"))
}

#[async_trait]
impl SubscriptionBackend for MemoryBackend {
    async fn insert(&self, subscription: &Subscription) -> Result<Subscription, ServiceError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        if records.contains_key(&subscription.id) {
            return Err(ServiceError::Store(StoreDiagnostic {
                message: "duplicate key value violates unique constraint".to_string(),
                code: Some("23505".to_string()),
                detail: Some(format!("Key (id)=({}) already exists.", subscription.id)),
                constraint: Some("subscriptions_pkey".to_string()),
                ..Default::default()
            }));
        }
        records.insert(subscription.id, subscription.clone());
        Ok(subscription.clone())
    }

    async fn fetch_one(&self, id: Uuid) -> Result<Option<Subscription>, ServiceError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(&id).cloned())
    }

    async fn fetch_all(&self) -> Result<Vec<Subscription>, ServiceError> {
        self.matching(&CompiledFilter::default())
    }

    async fn fetch_page(&self, query: &ListQuery) -> Result<Vec<Subscription>, ServiceError> {
        let offset = usize::try_from(query.pagination.offset).unwrap_or(0);
        let limit = usize::try_from(query.pagination.limit).unwrap_or(0);
        Ok(self
            .matching(&query.filter)?
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn sum(&self, query: &SumQuery) -> Result<i64, ServiceError> {
        self.matching(&query.filter)?
            .iter()
            .try_fold(0i64, |acc, s| acc.checked_add(s.price))
            .ok_or_else(|| {
                ServiceError::Store(StoreDiagnostic {
                    message: "bigint out of range".to_string(),
                    code: Some("22003".to_string()),
                    ..Default::default()
                })
            })
    }

    async fn replace(
        &self,
        subscription: &Subscription,
    ) -> Result<Option<Subscription>, ServiceError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        match records.get_mut(&subscription.id) {
            Some(existing) => {
                *existing = subscription.clone();
                Ok(Some(subscription.clone()))
            }
            None => Ok(None),
        }
    }

    async fn remove(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        records.remove(&id);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        self.records.read().map_err(|_| poisoned())?;
        Ok(())
    }
}
