pub mod backend;
pub mod database;
pub mod error;
pub mod filter;
pub mod memory;
pub mod metrics;
pub mod store;

pub use backend::SubscriptionBackend;
pub use database::{connect_with_retry, PgBackend};
pub use error::{ServiceError, StoreDiagnostic};
pub use filter::{FilterSet, Pagination};
pub use memory::MemoryBackend;
pub use store::SubscriptionStore;
