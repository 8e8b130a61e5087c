//! Recurrence projection
//!
//! Projects a subscription's billing anchor (`next_billing_date`) into an
//! arbitrary calendar month. Projection is a pure function of the anchor,
//! the cycle and the target month; nothing here advances the anchor.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::calendar::{date_only_diff_days, day_of_week, days_in_month, weekday_of};
use crate::models::{BillingCycle, Subscription, SubscriptionStatus};

/// Day of `month` on which a subscription anchored at `anchor` bills, if any
///
/// - An anchor inside the target month bills on its own day.
/// - Monthly bills on the anchor's day, clamped to the month length, so a
///   31st anchor shows on Feb 28 and the original day is not recovered.
/// - Weekly shows only the first occurrence of the anchor's weekday.
/// - Quarterly and yearly bill only in the anchor's month.
pub fn project(anchor: NaiveDate, cycle: BillingCycle, year: i32, month: u32) -> Option<u32> {
    let last_day = days_in_month(year, month);
    if last_day == 0 {
        return None;
    }

    if anchor.year() == year && anchor.month() == month {
        return Some(anchor.day());
    }

    match cycle {
        BillingCycle::Monthly => Some(anchor.day().min(last_day)),
        BillingCycle::Weekly => {
            let first_weekday = day_of_week(year, month, 1)?;
            Some(1 + (7 + weekday_of(anchor) - first_weekday) % 7)
        }
        BillingCycle::Quarterly | BillingCycle::Yearly => {
            if anchor.month() == month {
                Some(anchor.day().min(last_day))
            } else {
                None
            }
        }
    }
}

/// One subscription billing on a given day of a month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEntry {
    pub day: u32,
    pub subscription_id: i64,
    pub name: String,
    pub amount: f64,
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
}

/// Total billed on one day of the month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayTotal {
    pub day: u32,
    pub total: f64,
    pub count: usize,
}

/// A month grid ready for rendering
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthCalendar {
    pub year: i32,
    pub month: u32,
    pub days_in_month: u32,
    /// Weekday of the 1st, Sunday = 0
    pub first_weekday: u32,
    pub entries: Vec<CalendarEntry>,
    pub day_totals: Vec<DayTotal>,
    pub total: f64,
}

/// Build the calendar for a month from billing-relevant subscriptions
///
/// Returns `None` for an invalid month.
pub fn month_calendar(subs: &[Subscription], year: i32, month: u32) -> Option<MonthCalendar> {
    let first_weekday = day_of_week(year, month, 1)?;

    let mut entries: Vec<CalendarEntry> = subs
        .iter()
        .filter(|s| s.status.is_billing_relevant())
        .filter_map(|s| {
            project(s.next_billing_date, s.billing_cycle, year, month).map(|day| CalendarEntry {
                day,
                subscription_id: s.id,
                name: s.name.clone(),
                amount: s.effective_amount(),
                currency: s.currency.clone(),
                billing_cycle: s.billing_cycle,
                status: s.status,
            })
        })
        .collect();
    // Stable: same-day entries keep input order
    entries.sort_by_key(|e| e.day);

    let mut day_totals: Vec<DayTotal> = Vec::new();
    for entry in &entries {
        match day_totals.last_mut() {
            Some(last) if last.day == entry.day => {
                last.total += entry.amount;
                last.count += 1;
            }
            _ => day_totals.push(DayTotal {
                day: entry.day,
                total: entry.amount,
                count: 1,
            }),
        }
    }

    let total = entries.iter().map(|e| e.amount).sum();

    Some(MonthCalendar {
        year,
        month,
        days_in_month: days_in_month(year, month),
        first_weekday,
        entries,
        day_totals,
        total,
    })
}

/// A payment falling due within a rolling window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingPayment {
    pub subscription_id: i64,
    pub name: String,
    pub amount: f64,
    pub currency: String,
    pub billing_date: NaiveDate,
    pub days_until: i64,
}

/// Billing-relevant subscriptions with `0 <= days_until <= days`
///
/// Reads `next_billing_date` directly, sorted soonest first.
pub fn due_within(subs: &[Subscription], today: NaiveDate, days: i64) -> Vec<UpcomingPayment> {
    let mut upcoming: Vec<UpcomingPayment> = subs
        .iter()
        .filter(|s| s.status.is_billing_relevant())
        .filter_map(|s| {
            let days_until = date_only_diff_days(s.next_billing_date, today);
            (0..=days).contains(&days_until).then(|| UpcomingPayment {
                subscription_id: s.id,
                name: s.name.clone(),
                amount: s.effective_amount(),
                currency: s.currency.clone(),
                billing_date: s.next_billing_date,
                days_until,
            })
        })
        .collect();
    upcoming.sort_by_key(|u| u.days_until);
    upcoming
}
