//! Domain models for subscription-service.

mod month;
mod subscription;

pub use month::{Month, MonthParseError};
pub use subscription::{Subscription, SubscriptionFields, SubscriptionInput, SubscriptionRow};
