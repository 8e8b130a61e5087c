//! Report types for subscription analytics

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::BillingCycle;
use crate::recurrence::UpcomingPayment;

/// Total spend for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// "YYYY-MM"
    pub month: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Flat,
}

impl TrendDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendDirection::Increasing => "increasing",
            TrendDirection::Decreasing => "decreasing",
            TrendDirection::Flat => "flat",
        }
    }

    pub fn from_change(change: f64) -> Self {
        if change > 0.0 {
            TrendDirection::Increasing
        } else if change < 0.0 {
            TrendDirection::Decreasing
        } else {
            TrendDirection::Flat
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trailing spend series plus its month-over-month summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSummary {
    /// Oldest to newest
    pub points: Vec<TrendPoint>,
    pub current: f64,
    pub previous: f64,
    /// Percent change from `previous` to `current`
    pub monthly_change: f64,
    pub direction: TrendDirection,
    pub is_increasing: bool,
}

/// One slice of a breakdown chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownBucket {
    pub label: String,
    /// Monthly spend for the category breakdown, a count for the others
    pub value: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedSubscription {
    pub subscription_id: i64,
    pub name: String,
    pub category: Option<String>,
    pub billing_cycle: BillingCycle,
    pub monthly_equivalent: f64,
}

/// Factual totals, computed from active subscriptions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendTotals {
    pub monthly_total: f64,
    pub yearly_total: f64,
    pub average_monthly: f64,
    pub active_count: usize,
    pub total_count: usize,
}

/// Heuristic figures, kept apart from `SpendTotals`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Estimates {
    pub potential_savings: f64,
    /// How the estimate was derived
    pub basis: String,
}

/// Everything the analytics view renders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub as_of: NaiveDate,
    pub currency: String,
    pub totals: SpendTotals,
    pub trend: TrendSummary,
    pub category_breakdown: Vec<BreakdownBucket>,
    pub status_breakdown: Vec<BreakdownBucket>,
    pub cycle_breakdown: Vec<BreakdownBucket>,
    pub top_subscriptions: Vec<RankedSubscription>,
    pub upcoming: Vec<UpcomingPayment>,
    /// Percent of tracked subscriptions that are active
    pub efficiency_score: u32,
    pub estimates: Estimates,
}
