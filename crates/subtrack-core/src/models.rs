//! Domain models for Subtrack

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An account that owns subscriptions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: Option<String>,
    /// Account-level switch for renewal reminder emails
    pub email_alerts: bool,
    /// Default currency for new subscriptions
    pub currency: String,
    /// Currency that analytics and calendar amounts are shown in
    pub display_currency: String,
    pub created_at: DateTime<Utc>,
}

/// A user to be created (before DB insertion)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub email_alerts: bool,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_currency")]
    pub display_currency: String,
}

/// Partial update of a user's preferences
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    pub name: Option<String>,
    pub email_alerts: Option<bool>,
    pub currency: Option<String>,
    pub display_currency: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_currency() -> String {
    "USD".to_string()
}

/// How often a subscription bills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl BillingCycle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }

    /// Billing events per year (weekly×52, monthly×12, quarterly×4, yearly×1)
    pub fn periods_per_year(&self) -> u32 {
        match self {
            Self::Weekly => 52,
            Self::Monthly => 12,
            Self::Quarterly => 4,
            Self::Yearly => 1,
        }
    }

    pub fn all() -> &'static [BillingCycle] {
        &[Self::Weekly, Self::Monthly, Self::Quarterly, Self::Yearly]
    }
}

impl std::str::FromStr for BillingCycle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "quarterly" => Ok(Self::Quarterly),
            "yearly" | "annual" | "annually" => Ok(Self::Yearly),
            _ => Err(format!(
                "Unknown billing cycle: {} (valid: weekly, monthly, quarterly, yearly)",
                s
            )),
        }
    }
}

impl std::fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Subscription lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    /// Free trial that converts into a paid subscription
    Trial,
    Paused,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Trial => "trial",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether this subscription will actually bill on its next date
    pub fn is_billing_relevant(&self) -> bool {
        matches!(self, Self::Active | Self::Trial)
    }

    pub fn all() -> &'static [SubscriptionStatus] {
        &[Self::Active, Self::Trial, Self::Paused, Self::Cancelled]
    }
}

impl std::str::FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "trial" => Ok(Self::Trial),
            "paused" => Ok(Self::Paused),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            _ => Err(format!(
                "Unknown subscription status: {} (valid: active, trial, paused, cancelled)",
                s
            )),
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tracked subscription
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub category: Option<String>,
    pub amount: f64,
    /// ISO 4217 code of `amount`
    pub currency: String,
    /// `amount` converted to the owner's display currency (filled by a normalizer)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_amount: Option<f64>,
    pub billing_cycle: BillingCycle,
    /// Anchor for all projection; advanced by persistence, never by the engine
    pub next_billing_date: NaiveDate,
    pub status: SubscriptionStatus,
    pub alert_enabled: bool,
    /// Days before the billing date at which a reminder fires
    pub alert_days: u32,
    pub last_alert_sent: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Amount in display currency when normalized, otherwise the raw amount
    pub fn effective_amount(&self) -> f64 {
        self.display_amount.unwrap_or(self.amount)
    }
}

/// A subscription to be created (before DB insertion)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubscription {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub billing_cycle: BillingCycle,
    pub next_billing_date: NaiveDate,
    #[serde(default = "default_status")]
    pub status: SubscriptionStatus,
    #[serde(default = "default_true")]
    pub alert_enabled: bool,
    #[serde(default = "default_alert_days")]
    pub alert_days: u32,
}

fn default_status() -> SubscriptionStatus {
    SubscriptionStatus::Active
}

fn default_alert_days() -> u32 {
    3
}

impl NewSubscription {
    /// Reject values the engine cannot reason about
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidData(
                "Subscription name must not be empty".to_string(),
            ));
        }
        validate_amount(self.amount)?;
        validate_currency(&self.currency)?;
        Ok(())
    }
}

/// Partial update of a subscription; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub billing_cycle: Option<BillingCycle>,
    pub next_billing_date: Option<NaiveDate>,
    pub status: Option<SubscriptionStatus>,
    pub alert_enabled: Option<bool>,
    pub alert_days: Option<u32>,
}

impl SubscriptionUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(Error::InvalidData(
                    "Subscription name must not be empty".to_string(),
                ));
            }
        }
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        if let Some(currency) = &self.currency {
            validate_currency(currency)?;
        }
        Ok(())
    }
}

fn validate_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidData(format!(
            "Amount must be a positive number, got {}",
            amount
        )));
    }
    Ok(())
}

/// Currency codes are three ASCII letters
pub fn validate_currency(code: &str) -> Result<()> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::InvalidData(format!(
            "Currency must be a 3-letter ISO code, got {:?}",
            code
        )));
    }
    Ok(())
}

/// A subscription joined with the owner details the alert job needs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertCandidate {
    pub subscription: Subscription,
    pub recipient: String,
    pub recipient_name: Option<String>,
    /// Owner's account-level email preference
    pub email_alerts: bool,
}
