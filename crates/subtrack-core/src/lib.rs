//! Subtrack Core Library
//!
//! Shared functionality for the Subtrack subscription tracker:
//! - Date utilities and billing-cycle projection onto calendar months
//! - Spend analytics (monthly equivalents, trends, breakdowns, rankings)
//! - Renewal alert policy, rendering and pluggable transports
//! - Database access and migrations
//! - Currency normalization for display

pub mod alerts;
pub mod analytics;
pub mod calendar;
pub mod clock;
pub mod config;
pub mod currency;
pub mod db;
pub mod error;
pub mod models;
pub mod portfolio;
pub mod rate_limit;
pub mod recurrence;

/// Test utilities including a mock email API server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use alerts::{
    AlertDecision, AlertRunReport, AlertScheduler, AlertStore, AlertTransport, EmailMessage,
    SkipReason, TransportError,
};
pub use analytics::{AnalyticsAggregator, AnalyticsReport};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AppConfig, Secrets};
pub use currency::{CurrencyNormalizer, StaticRates};
pub use db::{AuditEntry, Database};
pub use error::{Error, Result};
pub use portfolio::Portfolio;
pub use rate_limit::{RateLimitStore, RateLimiter};
pub use recurrence::{MonthCalendar, UpcomingPayment};
