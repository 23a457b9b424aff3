//! subscription-service: subscription tracking with filtered listing and
//! price aggregation over a relational store.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
pub mod utils;

pub use startup::{build_router, AppState, Application};
