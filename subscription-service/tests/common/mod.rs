//! Common test utilities for subscription-service integration tests.
#![allow(dead_code)]

use axum::Router;
use secrecy::Secret;
use service_core::config::Config as CommonConfig;
use std::sync::{Arc, Once};
use subscription_service::config::{DatabaseConfig, StorageBackend, SubscriptionConfig};
use subscription_service::services::{MemoryBackend, SubscriptionStore};
use subscription_service::{build_router, AppState, Application};

pub const OWNER: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,subscription_service=debug,sqlx=warn")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn test_config(storage: StorageBackend, database_url: &str) -> SubscriptionConfig {
    SubscriptionConfig {
        common: CommonConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        service_name: "subscription-service".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        http_timeout_secs: 15,
        storage,
        database: DatabaseConfig {
            url: Secret::new(database_url.to_string()),
            max_connections: 2,
            min_connections: 1,
            connect_attempts: 1,
            connect_retry_delay_secs: 0,
            connect_timeout_secs: 5,
        },
    }
}

/// Router over a fresh in-memory store, for `oneshot` requests.
pub fn memory_router() -> Router {
    init_tracing();
    let state = AppState {
        config: Arc::new(test_config(StorageBackend::Memory, "")),
        store: SubscriptionStore::new(Arc::new(MemoryBackend::new())),
    };
    build_router(state)
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    /// Spawn a server bound to a random port over the in-memory backend.
    pub async fn spawn() -> Self {
        init_tracing();

        let app = Application::build(test_config(StorageBackend::Memory, ""))
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
        }
    }
}
