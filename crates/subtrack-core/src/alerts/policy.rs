//! Which subscriptions get a reminder today
//!
//! `evaluate` is pure: the same candidate and day always give the same
//! decision. Same-day idempotence comes from `last_alert_sent`, which the
//! scheduler only writes after a confirmed send.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::{date_only, date_only_diff_days};
use crate::models::{AlertCandidate, SubscriptionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Not an active subscription
    Inactive,
    /// Alerts switched off for this subscription
    Disabled,
    /// Owner turned off email alerts
    EmailAlertsOff,
    /// Billing date already passed
    PastDue,
    /// Not at a reminder point yet
    NotDue,
    /// Reminder already went out today
    AlreadySentToday,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Disabled => "disabled",
            Self::EmailAlertsOff => "email_alerts_off",
            Self::PastDue => "past_due",
            Self::NotDue => "not_due",
            Self::AlreadySentToday => "already_sent_today",
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Inactive => "subscription is not active",
            Self::Disabled => "alerts are disabled for this subscription",
            Self::EmailAlertsOff => "email alerts are turned off for this account",
            Self::PastDue => "billing date has already passed",
            Self::NotDue => "no reminder is due today",
            Self::AlreadySentToday => "a reminder was already sent today",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AlertDecision {
    Send { days_until: i64 },
    Skip { reason: SkipReason },
}

impl AlertDecision {
    fn skip(reason: SkipReason) -> Self {
        Self::Skip { reason }
    }
}

/// Decide whether the scheduled run should remind about `candidate` on `today`
///
/// A reminder is due `alert_days` before billing, and again one day before
/// and on the day itself.
pub fn evaluate(candidate: &AlertCandidate, today: NaiveDate) -> AlertDecision {
    let sub = &candidate.subscription;

    if sub.status != SubscriptionStatus::Active {
        return AlertDecision::skip(SkipReason::Inactive);
    }
    if !sub.alert_enabled {
        return AlertDecision::skip(SkipReason::Disabled);
    }
    if !candidate.email_alerts {
        return AlertDecision::skip(SkipReason::EmailAlertsOff);
    }
    if sub.last_alert_sent.map(date_only) == Some(today) {
        return AlertDecision::skip(SkipReason::AlreadySentToday);
    }

    let days_until = date_only_diff_days(sub.next_billing_date, today);
    if days_until < 0 {
        return AlertDecision::skip(SkipReason::PastDue);
    }
    if days_until == i64::from(sub.alert_days) || days_until == 1 || days_until == 0 {
        AlertDecision::Send { days_until }
    } else {
        AlertDecision::skip(SkipReason::NotDue)
    }
}

/// Eligibility for a user-requested reminder
///
/// Skips the due-window and same-day checks. The subscription must still
/// bill (active or trial), have alerts on, belong to an owner with email
/// alerts on, and not be past due.
pub fn evaluate_manual(
    candidate: &AlertCandidate,
    today: NaiveDate,
) -> std::result::Result<i64, SkipReason> {
    let sub = &candidate.subscription;

    if !sub.status.is_billing_relevant() {
        return Err(SkipReason::Inactive);
    }
    if !sub.alert_enabled {
        return Err(SkipReason::Disabled);
    }
    if !candidate.email_alerts {
        return Err(SkipReason::EmailAlertsOff);
    }
    let days_until = date_only_diff_days(sub.next_billing_date, today);
    if days_until < 0 {
        return Err(SkipReason::PastDue);
    }
    Ok(days_until)
}
