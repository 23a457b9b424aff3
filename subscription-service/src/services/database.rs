//! Postgres backend for subscription-service.

use crate::config::DatabaseConfig;
use crate::models::{Subscription, SubscriptionRow};
use crate::services::backend::SubscriptionBackend;
use crate::services::filter::{ListQuery, QueryParam, SqlQuery, SumQuery};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::ServiceError;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use service_core::utils::{do_with_tries, FixedRetry};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions};
use sqlx::Arguments;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

const SELECT_SUBSCRIPTIONS: &str =
    "SELECT id, service_name, price, user_id, start_date, end_date FROM subscriptions";

const SELECT_PRICE_SUM: &str = "SELECT COALESCE(SUM(price), 0)::BIGINT FROM subscriptions";

/// Open the pool, retrying with a fixed delay until the attempts run out.
#[instrument(skip(config), fields(attempts = config.connect_attempts))]
pub async fn connect_with_retry(config: &DatabaseConfig) -> Result<PgPool, ServiceError> {
    info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting to PostgreSQL"
    );

    let retry = FixedRetry::new(config.connect_attempts, config.retry_delay());
    let timeout = config.connect_timeout();

    let pool = do_with_tries(&retry, "postgres_connect", move || async move {
        let connect = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(config.url.expose_secret());

        match tokio::time::timeout(timeout, connect).await {
            Ok(result) => result.map_err(|e| anyhow::anyhow!("Failed to connect: {}", e)),
            Err(_) => Err(anyhow::anyhow!(
                "Failed to connect: timed out after {}s",
                timeout.as_secs()
            )),
        }
    })
    .await
    .map_err(ServiceError::Database)?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bootstrap schema in `./migrations`.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), ServiceError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ServiceError::Database(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }
}

/// Bind compiled parameters in placeholder order.
fn bind_params(params: &[QueryParam]) -> Result<PgArguments, ServiceError> {
    let mut args = PgArguments::default();
    for param in params {
        let bound = match param {
            QueryParam::Date(date) => args.add(*date),
            QueryParam::Uuid(id) => args.add(*id),
            QueryParam::Text(text) => args.add(text.clone()),
            QueryParam::Int(n) => args.add(*n),
        };
        bound.map_err(|e| {
            ServiceError::Database(anyhow::anyhow!("Failed to bind parameter: {}", e))
        })?;
    }
    Ok(args)
}

#[async_trait]
impl SubscriptionBackend for PgBackend {
    #[instrument(skip(self, subscription), fields(subscription_id = %subscription.id))]
    async fn insert(&self, subscription: &Subscription) -> Result<Subscription, ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert"])
            .start_timer();

        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            INSERT INTO subscriptions (id, service_name, price, user_id, start_date, end_date)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, service_name, price, user_id, start_date, end_date
            "#,
        )
        .bind(subscription.id)
        .bind(&subscription.service_name)
        .bind(subscription.price)
        .bind(subscription.owner)
        .bind(subscription.start_month.first_day())
        .bind(subscription.end_month.map(|m| m.first_day()))
        .fetch_one(&self.pool)
        .await
        .map_err(ServiceError::from)?;

        timer.observe_duration();
        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn fetch_one(&self, id: Uuid) -> Result<Option<Subscription>, ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_one"])
            .start_timer();

        let sql = format!("{} WHERE id = $1", SELECT_SUBSCRIPTIONS);
        let row = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(ServiceError::from)?;

        timer.observe_duration();
        Ok(row.map(Subscription::from))
    }

    #[instrument(skip(self))]
    async fn fetch_all(&self) -> Result<Vec<Subscription>, ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_all"])
            .start_timer();

        let sql = format!("{} ORDER BY start_date ASC, id ASC", SELECT_SUBSCRIPTIONS);
        let rows = sqlx::query_as::<_, SubscriptionRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(ServiceError::from)?;

        timer.observe_duration();
        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    #[instrument(skip(self, query), fields(limit = query.pagination.limit, offset = query.pagination.offset))]
    async fn fetch_page(&self, query: &ListQuery) -> Result<Vec<Subscription>, ServiceError> {
        let SqlQuery { sql, params } = query.to_sql(SELECT_SUBSCRIPTIONS);
        debug!(sql = %sql, params = ?params, "Executing list query");

        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_page"])
            .start_timer();

        let rows = sqlx::query_as_with::<_, SubscriptionRow, _>(&sql, bind_params(&params)?)
            .fetch_all(&self.pool)
            .await
            .map_err(ServiceError::from)?;

        timer.observe_duration();
        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    #[instrument(skip(self, query))]
    async fn sum(&self, query: &SumQuery) -> Result<i64, ServiceError> {
        let SqlQuery { sql, params } = query.to_sql(SELECT_PRICE_SUM);
        debug!(sql = %sql, params = ?params, "Executing sum query");

        let timer = DB_QUERY_DURATION.with_label_values(&["sum"]).start_timer();

        let total = sqlx::query_scalar_with::<_, i64, _>(&sql, bind_params(&params)?)
            .fetch_one(&self.pool)
            .await
            .map_err(ServiceError::from)?;

        timer.observe_duration();
        Ok(total)
    }

    #[instrument(skip(self, subscription), fields(subscription_id = %subscription.id))]
    async fn replace(
        &self,
        subscription: &Subscription,
    ) -> Result<Option<Subscription>, ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["replace"])
            .start_timer();

        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            UPDATE subscriptions
            SET service_name = $2, price = $3, user_id = $4, start_date = $5, end_date = $6
            WHERE id = $1
            RETURNING id, service_name, price, user_id, start_date, end_date
            "#,
        )
        .bind(subscription.id)
        .bind(&subscription.service_name)
        .bind(subscription.price)
        .bind(subscription.owner)
        .bind(subscription.start_month.first_day())
        .bind(subscription.end_month.map(|m| m.first_day()))
        .fetch_optional(&self.pool)
        .await
        .map_err(ServiceError::from)?;

        timer.observe_duration();
        Ok(row.map(Subscription::from))
    }

    #[instrument(skip(self))]
    async fn remove(&self, id: Uuid) -> Result<(), ServiceError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["remove"])
            .start_timer();

        let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(ServiceError::from)?;

        timer.observe_duration();
        debug!(rows_affected = result.rows_affected(), "Subscription delete executed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| ServiceError::Database(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Month;
    use chrono::NaiveDate;

    #[test]
    fn binds_every_parameter_kind() {
        let params = vec![
            QueryParam::Date(Month::new(2024, 1).unwrap().first_day()),
            QueryParam::Uuid(Uuid::new_v4()),
            QueryParam::Text("Netflix".to_string()),
            QueryParam::Int(20),
        ];
        let args = bind_params(&params).unwrap();
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn month_dates_are_first_of_month() {
        let month = Month::new(2025, 7).unwrap();
        assert_eq!(
            month.first_day(),
            NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
        );
    }
}
