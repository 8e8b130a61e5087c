//! Subscription analytics
//!
//! Everything here is a pure function of a (currency-normalized)
//! subscription list, a trailing monthly trend and an explicit `today`.
//!
//! ```rust,ignore
//! use subtrack_core::analytics::AnalyticsAggregator;
//!
//! let report = AnalyticsAggregator::default().build(&subs, &trend, today, "USD");
//! println!("{:.2}/month", report.totals.monthly_total);
//! ```

pub mod aggregator;
pub mod metrics;
pub mod types;

pub use aggregator::AnalyticsAggregator;
pub use metrics::{
    breakdown, efficiency_score, month_over_month, monthly_equivalent, potential_savings,
    summarize_trend, top_subscriptions, SAVINGS_RATE, WEEKS_PER_MONTH,
};
pub use types::{
    AnalyticsReport, BreakdownBucket, Estimates, RankedSubscription, SpendTotals, TrendDirection,
    TrendPoint, TrendSummary,
};
