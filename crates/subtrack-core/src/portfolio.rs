//! A user's subscriptions, normalized to their display currency
//!
//! The glue between persistence and the pure engine: load once, then ask
//! for the calendar, upcoming payments or analytics.

use chrono::{Datelike, NaiveDate};
use tracing::{info, warn};

use crate::analytics::{monthly_equivalent, AnalyticsAggregator, AnalyticsReport};
use crate::currency::CurrencyNormalizer;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Subscription, SubscriptionStatus, User};
use crate::recurrence::{due_within, month_calendar, MonthCalendar, UpcomingPayment};

/// Months of history in the analytics trend
pub const TREND_MONTHS: u32 = 12;

#[derive(Debug, Clone)]
pub struct Portfolio {
    pub user: User,
    pub subscriptions: Vec<Subscription>,
}

impl Portfolio {
    pub fn load(db: &Database, user_id: i64, normalizer: &dyn CurrencyNormalizer) -> Result<Self> {
        let user = db
            .get_user(user_id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", user_id)))?;
        let mut subscriptions = db.list_subscriptions(user_id)?;
        normalizer.normalize(&mut subscriptions, &user.display_currency);
        Ok(Self {
            user,
            subscriptions,
        })
    }

    pub fn calendar(&self, year: i32, month: u32) -> Result<MonthCalendar> {
        month_calendar(&self.subscriptions, year, month)
            .ok_or_else(|| Error::InvalidData(format!("Invalid month: {}-{}", year, month)))
    }

    pub fn upcoming(&self, today: NaiveDate, days: i64) -> Vec<UpcomingPayment> {
        due_within(&self.subscriptions, today, days)
    }

    /// Current monthly-equivalent spend of active subscriptions
    pub fn monthly_total(&self) -> f64 {
        self.subscriptions
            .iter()
            .filter(|s| s.status == SubscriptionStatus::Active)
            .map(|s| monthly_equivalent(s.effective_amount(), s.billing_cycle))
            .sum()
    }

    /// Analytics with the stored trend, whose current month is the live total
    ///
    /// Stored months are converted to the user's current display currency.
    pub fn analytics(
        &self,
        db: &Database,
        normalizer: &dyn CurrencyNormalizer,
        aggregator: &AnalyticsAggregator,
        today: NaiveDate,
    ) -> Result<AnalyticsReport> {
        let mut trend = db.monthly_trend_in(
            self.user.id,
            today.year(),
            today.month(),
            TREND_MONTHS,
            &self.user.display_currency,
            normalizer,
        )?;
        if let Some(current) = trend.last_mut() {
            current.amount = self.monthly_total();
        }
        Ok(aggregator.build(
            &self.subscriptions,
            &trend,
            today,
            &self.user.display_currency,
        ))
    }
}

/// Record this month's spend for every user; returns how many were stored
///
/// Users whose data cannot be loaded are logged and skipped.
pub fn record_snapshots(
    db: &Database,
    normalizer: &dyn CurrencyNormalizer,
    today: NaiveDate,
) -> Result<usize> {
    let mut recorded = 0;
    for user in db.list_users()? {
        let result = Portfolio::load(db, user.id, normalizer).and_then(|p| {
            db.record_spend_snapshot(
                user.id,
                today.year(),
                today.month(),
                p.monthly_total(),
                &p.user.display_currency,
            )
        });
        match result {
            Ok(()) => recorded += 1,
            Err(e) => warn!(user_id = user.id, error = %e, "Failed to record spend snapshot"),
        }
    }
    info!(recorded, "Spend snapshots recorded");
    Ok(recorded)
}
