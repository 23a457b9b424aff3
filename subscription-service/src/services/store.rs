//! Subscription store: validation, filter compilation and persistence.

use crate::models::{Month, Subscription, SubscriptionFields, SubscriptionInput};
use crate::services::backend::SubscriptionBackend;
use crate::services::filter::{compile_list, compile_sum, FilterSet, Pagination};
use crate::services::metrics::{ERRORS_TOTAL, OPERATIONS_TOTAL};
use crate::services::ServiceError;
use crate::utils::{is_valid_identifier, parse_identifier};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

#[derive(Clone)]
pub struct SubscriptionStore {
    backend: Arc<dyn SubscriptionBackend>,
}

impl SubscriptionStore {
    pub fn new(backend: Arc<dyn SubscriptionBackend>) -> Self {
        Self { backend }
    }

    /// Validate and persist a new subscription under a fresh id.
    ///
    /// An `id` in the payload must be well-formed but is otherwise ignored.
    #[instrument(skip(self, input), fields(service_name = %input.service_name))]
    pub async fn create(&self, input: SubscriptionInput) -> Result<Subscription, ServiceError> {
        let result = async {
            let fields = validate_input(&input)?;
            let subscription = Subscription::new(Uuid::new_v4(), fields);
            self.backend.insert(&subscription).await
        }
        .await;

        if let Ok(subscription) = &result {
            info!(subscription_id = %subscription.id, "Subscription created");
        }
        track("create", result)
    }

    #[instrument(skip(self))]
    pub async fn find_one(&self, id: Uuid) -> Result<Subscription, ServiceError> {
        let result = self
            .backend
            .fetch_one(id)
            .await
            .and_then(|found| found.ok_or_else(|| ServiceError::NotFound(id.to_string())));
        track("find_one", result)
    }

    /// Every record, unfiltered and unpaginated.
    #[instrument(skip(self))]
    pub async fn find_all(&self) -> Result<Vec<Subscription>, ServiceError> {
        track("find_all", self.backend.fetch_all().await)
    }

    #[instrument(skip(self, filters), fields(from = %filters.from, to = %filters.to))]
    pub async fn list(
        &self,
        filters: &FilterSet,
        pagination: Pagination,
    ) -> Result<Vec<Subscription>, ServiceError> {
        let result = async {
            let query = compile_list(filters, pagination)?;
            self.backend.fetch_page(&query).await
        }
        .await;
        track("list", result)
    }

    /// Total price over the filtered records; zero when nothing matches.
    #[instrument(skip(self, filters), fields(from = %filters.from, to = %filters.to))]
    pub async fn sum(&self, filters: &FilterSet) -> Result<i64, ServiceError> {
        let result = async {
            let query = compile_sum(filters)?;
            self.backend.sum(&query).await
        }
        .await;
        track("sum", result)
    }

    /// Replace every mutable field of `id`. The path id always wins over the payload's.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: SubscriptionInput,
    ) -> Result<Subscription, ServiceError> {
        let result = async {
            let fields = validate_input(&input)?;
            let subscription = Subscription::new(id, fields);
            self.backend
                .replace(&subscription)
                .await?
                .ok_or_else(|| ServiceError::NotFound(id.to_string()))
        }
        .await;

        if result.is_ok() {
            info!(subscription_id = %id, "Subscription updated");
        }
        track("update", result)
    }

    /// Remove `id`. Deleting an unknown id succeeds.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> Result<(), ServiceError> {
        track("delete", self.backend.remove(id).await)
    }

    pub async fn health_check(&self) -> Result<(), ServiceError> {
        track("health_check", self.backend.health_check().await)
    }
}

/// Count the outcome and log failures at a level matching who caused them.
fn track<T>(operation: &'static str, result: Result<T, ServiceError>) -> Result<T, ServiceError> {
    match &result {
        Ok(_) => OPERATIONS_TOTAL.with_label_values(&[operation, "ok"]).inc(),
        Err(err) => {
            OPERATIONS_TOTAL
                .with_label_values(&[operation, "error"])
                .inc();
            ERRORS_TOTAL.with_label_values(&[err.kind()]).inc();

            match err {
                ServiceError::Store(diag) if !diag.is_client_fault() => error!(
                    operation,
                    code = diag.code.as_deref().unwrap_or(""),
                    detail = diag.detail.as_deref().unwrap_or(""),
                    location = diag.location.as_deref().unwrap_or(""),
                    error = %err,
                    "Subscription backend failure"
                ),
                ServiceError::Database(_) => {
                    error!(operation, error = %err, "Subscription backend failure")
                }
                _ => warn!(operation, error = %err, "Subscription request rejected"),
            }
        }
    }
    result
}

/// Shared create/update rules, checked before anything reaches the backend.
fn validate_input(input: &SubscriptionInput) -> Result<SubscriptionFields, ServiceError> {
    let start = Month::parse_optional(&input.start_date)?;
    let end = Month::parse_optional(input.end_date.as_deref().unwrap_or(""))?;

    let owner = if input.user_id.is_empty() {
        None
    } else {
        let owner = parse_identifier(&input.user_id).ok_or_else(|| {
            ServiceError::Validation(format!("invalid subscription user: {}", input.user_id))
        })?;
        Some(owner)
    };

    if let Some(id) = input.id.as_deref().filter(|id| !id.is_empty()) {
        if !is_valid_identifier(id) {
            return Err(ServiceError::Validation(format!(
                "invalid subscription id: {}",
                id
            )));
        }
    }

    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(ServiceError::Validation(format!(
                "end date ({}) cannot be earlier than start ({})",
                end, start
            )));
        }
    }

    input.validate()?;

    let owner =
        owner.ok_or_else(|| ServiceError::Validation("user_id is required".to_string()))?;
    let start_month =
        start.ok_or_else(|| ServiceError::Validation("start_date is required".to_string()))?;

    Ok(SubscriptionFields {
        service_name: input.service_name.clone(),
        price: input.price,
        owner,
        start_month,
        end_month: end,
    })
}
