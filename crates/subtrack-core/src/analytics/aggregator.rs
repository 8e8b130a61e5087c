//! Builds the full analytics report for one user

use chrono::NaiveDate;

use super::metrics::{
    breakdown, efficiency_score, monthly_equivalent, potential_savings, summarize_trend,
    top_subscriptions, SAVINGS_RATE,
};
use super::types::{AnalyticsReport, Estimates, SpendTotals, TrendPoint};
use crate::models::{BillingCycle, Subscription, SubscriptionStatus};
use crate::recurrence::due_within;

/// Label for subscriptions without a category
pub const UNCATEGORIZED: &str = "Other";

/// Report builder with its list sizes
#[derive(Debug, Clone, Copy)]
pub struct AnalyticsAggregator {
    pub top_n: usize,
    pub upcoming_days: i64,
}

impl Default for AnalyticsAggregator {
    fn default() -> Self {
        Self {
            top_n: 5,
            upcoming_days: 7,
        }
    }
}

impl AnalyticsAggregator {
    pub fn new(top_n: usize, upcoming_days: i64) -> Self {
        Self {
            top_n,
            upcoming_days,
        }
    }

    /// Build a report from a user's full subscription list
    ///
    /// `subs` should already carry `display_amount` in `currency`. Spend
    /// totals, the category and cycle breakdowns and the ranking use active
    /// subscriptions only; the status breakdown and efficiency score count
    /// everything.
    pub fn build(
        &self,
        subs: &[Subscription],
        trend: &[TrendPoint],
        today: NaiveDate,
        currency: &str,
    ) -> AnalyticsReport {
        let active: Vec<Subscription> = subs
            .iter()
            .filter(|s| s.status == SubscriptionStatus::Active)
            .cloned()
            .collect();

        let monthly_total: f64 = active
            .iter()
            .map(|s| monthly_equivalent(s.effective_amount(), s.billing_cycle))
            .sum();
        let average_monthly = if active.is_empty() {
            0.0
        } else {
            monthly_total / active.len() as f64
        };

        let totals = SpendTotals {
            monthly_total,
            yearly_total: monthly_total * 12.0,
            average_monthly,
            active_count: active.len(),
            total_count: subs.len(),
        };

        let category_breakdown = breakdown(active.iter().map(|s| {
            (
                s.category
                    .clone()
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| UNCATEGORIZED.to_string()),
                monthly_equivalent(s.effective_amount(), s.billing_cycle),
            )
        }));
        let status_breakdown = breakdown(subs.iter().map(|s| (s.status.to_string(), 1.0)));
        let cycle_breakdown =
            breakdown(active.iter().map(|s| (s.billing_cycle.to_string(), 1.0)));

        let monthly_cycle_count = active
            .iter()
            .filter(|s| s.billing_cycle == BillingCycle::Monthly)
            .count();
        let estimates = Estimates {
            potential_savings: potential_savings(monthly_cycle_count, average_monthly),
            basis: format!(
                "{} monthly-billed subscriptions x average monthly spend x {:.0}% annual-plan discount",
                monthly_cycle_count,
                SAVINGS_RATE * 100.0
            ),
        };

        AnalyticsReport {
            as_of: today,
            currency: currency.to_string(),
            totals,
            trend: summarize_trend(trend),
            category_breakdown,
            status_breakdown,
            cycle_breakdown,
            top_subscriptions: top_subscriptions(&active, self.top_n),
            upcoming: due_within(subs, today, self.upcoming_days),
            efficiency_score: efficiency_score(active.len(), subs.len()),
            estimates,
        }
    }
}
