//! Subscription record and its create/update input.

use super::Month;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A persisted subscription as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub service_name: String,
    pub price: i64,
    #[serde(rename = "user_id")]
    pub owner: Uuid,
    #[serde(rename = "start_date")]
    pub start_month: Month,
    #[serde(
        rename = "end_date",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub end_month: Option<Month>,
}

impl Subscription {
    pub fn new(id: Uuid, fields: SubscriptionFields) -> Self {
        Self {
            id,
            service_name: fields.service_name,
            price: fields.price,
            owner: fields.owner,
            start_month: fields.start_month,
            end_month: fields.end_month,
        }
    }
}

/// Create/update request body, still in its wire form.
///
/// Dates and identifiers stay strings here; the store parses and validates
/// them so malformed input is reported with the right error kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SubscriptionInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, message = "service_name must not be empty"))]
    pub service_name: String,
    #[serde(default)]
    #[validate(range(min = 0, message = "price must not be negative"))]
    pub price: i64,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

/// Validated mutable fields of a subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionFields {
    pub service_name: String,
    pub price: i64,
    pub owner: Uuid,
    pub start_month: Month,
    pub end_month: Option<Month>,
}

/// Row shape of the `subscriptions` table.
#[derive(Debug, Clone, FromRow)]
pub struct SubscriptionRow {
    pub id: Uuid,
    pub service_name: String,
    pub price: i64,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Self {
            id: row.id,
            service_name: row.service_name,
            price: row.price,
            owner: row.user_id,
            start_month: Month::from(row.start_date),
            end_month: row.end_date.map(Month::from),
        }
    }
}
