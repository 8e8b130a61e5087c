//! Alert batch runner
//!
//! Reads candidates from an [`AlertStore`], applies the policy, sends through
//! an [`AlertTransport`] and records `last_alert_sent` only after the
//! transport accepted the message. Items are processed one at a time and a
//! failure on one never stops the rest.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::message::AlertPayload;
use super::policy::{evaluate, evaluate_manual, AlertDecision};
use super::transport::AlertTransport;
use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::models::AlertCandidate;
use crate::rate_limit::{RateLimitStore, RateLimiter};

/// Idempotency scope for scheduled reminders
const SCHEDULED_SCOPE: &str = "renewal-alert";

/// Where alert candidates come from and where sends are recorded
pub trait AlertStore: Send + Sync {
    /// Every subscription with its owner's contact details
    fn alert_candidates(&self) -> Result<Vec<AlertCandidate>>;

    fn alert_candidate(&self, subscription_id: i64) -> Result<Option<AlertCandidate>>;

    fn mark_alert_sent(&self, subscription_id: i64, at: DateTime<Utc>) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertItemStatus {
    Sent,
    /// The transport refused or could not deliver the message
    Failed,
    /// Timed out, or sent but not recorded
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertItemResult {
    pub subscription_id: i64,
    pub name: String,
    pub recipient: String,
    pub status: AlertItemStatus,
    pub days_until: i64,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRunReport {
    pub run_at: DateTime<Utc>,
    pub today: NaiveDate,
    pub evaluated: usize,
    pub skipped: usize,
    /// Skip counts keyed by reason
    pub skip_reasons: BTreeMap<String, usize>,
    pub sent: usize,
    pub failed: usize,
    pub errors: usize,
    pub results: Vec<AlertItemResult>,
}

/// What a run would do, without sending
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPreview {
    pub subscription_id: i64,
    pub name: String,
    pub recipient: String,
    pub decision: AlertDecision,
}

pub struct AlertScheduler {
    store: Arc<dyn AlertStore>,
    transport: Arc<dyn AlertTransport>,
    clock: Arc<dyn Clock>,
    send_timeout: Duration,
    manual_limit: Option<(RateLimiter, Arc<dyn RateLimitStore>)>,
}

impl AlertScheduler {
    pub fn new(
        store: Arc<dyn AlertStore>,
        transport: Arc<dyn AlertTransport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            transport,
            clock,
            send_timeout: Duration::from_secs(10),
            manual_limit: None,
        }
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Apply a per-user limit to manual sends
    pub fn with_manual_limit(
        mut self,
        limiter: RateLimiter,
        store: Arc<dyn RateLimitStore>,
    ) -> Self {
        self.manual_limit = Some((limiter, store));
        self
    }

    /// Decisions for every candidate as of now
    pub fn preview(&self) -> Result<Vec<AlertPreview>> {
        let today = self.clock.today();
        Ok(self
            .store
            .alert_candidates()?
            .into_iter()
            .map(|c| AlertPreview {
                subscription_id: c.subscription.id,
                name: c.subscription.name.clone(),
                recipient: c.recipient.clone(),
                decision: evaluate(&c, today),
            })
            .collect())
    }

    /// Send every reminder due today
    ///
    /// Fails only when the candidate list cannot be read; per-item problems
    /// are reported in the result list.
    pub async fn run_due(&self) -> Result<AlertRunReport> {
        let run_at = self.clock.now();
        let today = self.clock.today();
        let candidates = self.store.alert_candidates()?;

        let mut report = AlertRunReport {
            run_at,
            today,
            evaluated: candidates.len(),
            skipped: 0,
            skip_reasons: BTreeMap::new(),
            sent: 0,
            failed: 0,
            errors: 0,
            results: Vec::new(),
        };

        for candidate in &candidates {
            match evaluate(candidate, today) {
                AlertDecision::Skip { reason } => {
                    debug!(
                        subscription_id = candidate.subscription.id,
                        reason = %reason,
                        "Alert skipped"
                    );
                    report.skipped += 1;
                    *report
                        .skip_reasons
                        .entry(reason.as_str().to_string())
                        .or_insert(0) += 1;
                }
                AlertDecision::Send { days_until } => {
                    let result = self.deliver(candidate, days_until, SCHEDULED_SCOPE).await;
                    match result.status {
                        AlertItemStatus::Sent => report.sent += 1,
                        AlertItemStatus::Failed => report.failed += 1,
                        AlertItemStatus::Error => report.errors += 1,
                    }
                    report.results.push(result);
                }
            }
        }

        info!(
            evaluated = report.evaluated,
            sent = report.sent,
            failed = report.failed,
            errors = report.errors,
            skipped = report.skipped,
            transport = self.transport.name(),
            "Alert run complete"
        );
        Ok(report)
    }

    /// Send a reminder for one subscription now
    ///
    /// Ignores the due window and same-day dedup. Returns `NotFound` for an
    /// unknown id, `InvalidData` when the subscription is not eligible and
    /// `RateLimited` when the owner has used up their manual sends.
    pub async fn send_one(&self, subscription_id: i64) -> Result<AlertItemResult> {
        let candidate = self
            .store
            .alert_candidate(subscription_id)?
            .ok_or_else(|| Error::NotFound(format!("Subscription {}", subscription_id)))?;

        let today = self.clock.today();
        let days_until = evaluate_manual(&candidate, today).map_err(|reason| {
            Error::InvalidData(format!("Reminder not sent: {}", reason.describe()))
        })?;

        if let Some((limiter, store)) = &self.manual_limit {
            let key = format!("manual-alert:{}", candidate.subscription.user_id);
            limiter.check(store.as_ref(), &key, self.clock.now())?;
        }

        let scope = format!("manual-alert:{}", self.clock.now().timestamp());
        Ok(self.deliver(&candidate, days_until, &scope).await)
    }

    async fn deliver(
        &self,
        candidate: &AlertCandidate,
        days_until: i64,
        scope: &str,
    ) -> AlertItemResult {
        let sub = &candidate.subscription;
        let message = AlertPayload::from_candidate(candidate, days_until).render(scope);

        let mut result = AlertItemResult {
            subscription_id: sub.id,
            name: sub.name.clone(),
            recipient: candidate.recipient.clone(),
            status: AlertItemStatus::Error,
            days_until,
            message_id: None,
            error: None,
        };

        match tokio::time::timeout(self.send_timeout, self.transport.send(&message)).await {
            Err(_) => {
                warn!(
                    subscription_id = sub.id,
                    timeout_secs = self.send_timeout.as_secs(),
                    "Alert send timed out"
                );
                result.error = Some(format!(
                    "Send timed out after {}s",
                    self.send_timeout.as_secs_f64()
                ));
            }
            Ok(Err(e)) => {
                warn!(subscription_id = sub.id, error = %e, "Alert send failed");
                result.status = AlertItemStatus::Failed;
                result.error = Some(e.to_string());
            }
            Ok(Ok(receipt)) => {
                result.message_id = receipt.message_id;
                match self.store.mark_alert_sent(sub.id, self.clock.now()) {
                    Ok(()) => {
                        info!(subscription_id = sub.id, days_until, "Alert sent");
                        result.status = AlertItemStatus::Sent;
                    }
                    Err(e) => {
                        warn!(
                            subscription_id = sub.id,
                            error = %e,
                            "Alert sent but last_alert_sent not recorded"
                        );
                        result.error = Some(format!("Sent but not recorded: {}", e));
                    }
                }
            }
        }

        result
    }
}
