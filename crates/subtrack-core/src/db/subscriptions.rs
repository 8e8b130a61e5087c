//! Subscription operations
//!
//! Cycle, status and billing date are stored as text. Amount and the alert
//! columns are read untyped since SQLite does not enforce column types.
//! Rows whose values do not parse are left out of every listing (and
//! logged) rather than being guessed at.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::{params, OptionalExtension, Row};
use tracing::warn;

use super::{parse_datetime, Database};
use crate::alerts::AlertStore;
use crate::error::{Error, Result};
use crate::models::{
    AlertCandidate, NewSubscription, Subscription, SubscriptionStatus, SubscriptionUpdate,
};

const SUBSCRIPTION_COLUMNS: &str = "s.id, s.user_id, s.name, s.category, s.amount, s.currency, \
     s.billing_cycle, s.next_billing_date, s.status, s.alert_enabled, s.alert_days, \
     s.last_alert_sent, s.created_at";

/// A subscription row before its columns are validated
struct SubscriptionRow {
    id: i64,
    user_id: i64,
    name: String,
    category: Option<String>,
    amount: Value,
    currency: String,
    billing_cycle: String,
    next_billing_date: String,
    status: String,
    alert_enabled: Value,
    alert_days: Value,
    last_alert_sent: Option<String>,
    created_at: Option<String>,
}

impl SubscriptionRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            category: row.get(3)?,
            amount: row.get(4)?,
            currency: row.get(5)?,
            billing_cycle: row.get(6)?,
            next_billing_date: row.get(7)?,
            status: row.get(8)?,
            alert_enabled: row.get(9)?,
            alert_days: row.get(10)?,
            last_alert_sent: row.get(11)?,
            created_at: row.get(12)?,
        })
    }

    fn into_subscription(self) -> std::result::Result<Subscription, String> {
        let billing_cycle = self.billing_cycle.parse()?;
        let status = self.status.parse()?;
        let next_billing_date = NaiveDate::parse_from_str(&self.next_billing_date, "%Y-%m-%d")
            .map_err(|e| format!("bad next_billing_date {:?}: {}", self.next_billing_date, e))?;
        let alert_days = match self.alert_days {
            Value::Integer(n) => u32::try_from(n).map_err(|_| format!("bad alert_days {}", n))?,
            other => return Err(format!("bad alert_days {:?}", other)),
        };
        let alert_enabled = match self.alert_enabled {
            Value::Integer(0) => false,
            Value::Integer(1) => true,
            other => return Err(format!("bad alert_enabled {:?}", other)),
        };
        let amount = match self.amount {
            Value::Real(a) => a,
            Value::Integer(a) => a as f64,
            other => return Err(format!("bad amount {:?}", other)),
        };
        let last_alert_sent = match self.last_alert_sent.as_deref() {
            None => None,
            Some(s) => Some(
                parse_datetime(s).ok_or_else(|| format!("bad last_alert_sent {:?}", s))?,
            ),
        };
        if !amount.is_finite() || amount <= 0.0 {
            return Err(format!("bad amount {}", amount));
        }

        Ok(Subscription {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            category: self.category,
            amount,
            currency: self.currency,
            display_amount: None,
            billing_cycle,
            next_billing_date,
            status,
            alert_enabled,
            alert_days,
            last_alert_sent,
            created_at: self
                .created_at
                .as_deref()
                .and_then(parse_datetime)
                .unwrap_or_default(),
        })
    }
}

/// Parse rows, dropping (and logging) the malformed ones
fn collect_valid<T>(
    rows: impl Iterator<Item = rusqlite::Result<(SubscriptionRow, T)>>,
) -> Result<Vec<(Subscription, T)>> {
    let mut out = Vec::new();
    for row in rows {
        let (raw, extra) = row?;
        let id = raw.id;
        match raw.into_subscription() {
            Ok(sub) => out.push((sub, extra)),
            Err(e) => warn!(subscription_id = id, error = %e, "Skipping malformed subscription"),
        }
    }
    Ok(out)
}

impl Database {
    pub fn create_subscription(&self, user_id: i64, sub: &NewSubscription) -> Result<i64> {
        sub.validate()?;
        if self.get_user(user_id)?.is_none() {
            return Err(Error::NotFound(format!("User {}", user_id)));
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO subscriptions
                (user_id, name, category, amount, currency, billing_cycle, next_billing_date,
                 status, alert_enabled, alert_days)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                sub.name.trim(),
                sub.category.as_deref().map(str::trim).filter(|c| !c.is_empty()),
                sub.amount,
                sub.currency.to_uppercase(),
                sub.billing_cycle.as_str(),
                sub.next_billing_date.to_string(),
                sub.status.as_str(),
                sub.alert_enabled,
                sub.alert_days,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn get_subscription(&self, id: i64) -> Result<Option<Subscription>> {
        let conn = self.conn()?;
        let raw = conn
            .query_row(
                &format!(
                    "SELECT {} FROM subscriptions s WHERE s.id = ?",
                    SUBSCRIPTION_COLUMNS
                ),
                params![id],
                SubscriptionRow::from_row,
            )
            .optional()?;

        match raw.map(SubscriptionRow::into_subscription) {
            None => Ok(None),
            Some(Ok(sub)) => Ok(Some(sub)),
            Some(Err(e)) => {
                warn!(subscription_id = id, error = %e, "Malformed subscription");
                Err(Error::InvalidData(format!("Subscription {} is malformed: {}", id, e)))
            }
        }
    }

    /// All well-formed subscriptions for a user, in creation order
    pub fn list_subscriptions(&self, user_id: i64) -> Result<Vec<Subscription>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM subscriptions s WHERE s.user_id = ? ORDER BY s.id",
            SUBSCRIPTION_COLUMNS
        ))?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((SubscriptionRow::from_row(row)?, ()))
        })?;
        Ok(collect_valid(rows)?.into_iter().map(|(s, _)| s).collect())
    }

    pub fn update_subscription(&self, id: i64, update: &SubscriptionUpdate) -> Result<Subscription> {
        update.validate()?;
        let mut sub = self
            .get_subscription(id)?
            .ok_or_else(|| Error::NotFound(format!("Subscription {}", id)))?;

        if let Some(name) = &update.name {
            sub.name = name.trim().to_string();
        }
        if let Some(category) = &update.category {
            sub.category = Some(category.trim().to_string()).filter(|c| !c.is_empty());
        }
        if let Some(amount) = update.amount {
            sub.amount = amount;
        }
        if let Some(currency) = &update.currency {
            sub.currency = currency.to_uppercase();
        }
        if let Some(cycle) = update.billing_cycle {
            sub.billing_cycle = cycle;
        }
        if let Some(date) = update.next_billing_date {
            sub.next_billing_date = date;
        }
        if let Some(status) = update.status {
            sub.status = status;
        }
        if let Some(enabled) = update.alert_enabled {
            sub.alert_enabled = enabled;
        }
        if let Some(days) = update.alert_days {
            sub.alert_days = days;
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE subscriptions
            SET name = ?, category = ?, amount = ?, currency = ?, billing_cycle = ?,
                next_billing_date = ?, status = ?, alert_enabled = ?, alert_days = ?
            WHERE id = ?
            "#,
            params![
                sub.name,
                sub.category,
                sub.amount,
                sub.currency,
                sub.billing_cycle.as_str(),
                sub.next_billing_date.to_string(),
                sub.status.as_str(),
                sub.alert_enabled,
                sub.alert_days,
                id,
            ],
        )?;

        Ok(sub)
    }

    pub fn set_subscription_status(&self, id: i64, status: SubscriptionStatus) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE subscriptions SET status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Subscription {}", id)));
        }
        Ok(())
    }

    pub fn delete_subscription(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM subscriptions WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Subscription {}", id)));
        }
        Ok(())
    }

    /// Every subscription joined with its owner's contact details
    pub fn list_alert_candidates(&self) -> Result<Vec<AlertCandidate>> {
        self.query_alert_candidates("", None)
    }

    pub fn get_alert_candidate(&self, subscription_id: i64) -> Result<Option<AlertCandidate>> {
        Ok(self
            .query_alert_candidates("WHERE s.id = ?", Some(subscription_id))?
            .into_iter()
            .next())
    }

    fn query_alert_candidates(
        &self,
        filter: &str,
        id: Option<i64>,
    ) -> Result<Vec<AlertCandidate>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT {}, u.email, u.name, u.email_alerts
            FROM subscriptions s
            JOIN users u ON u.id = s.user_id
            {}
            ORDER BY s.next_billing_date, s.id
            "#,
            SUBSCRIPTION_COLUMNS, filter
        ))?;

        type Owner = (String, Option<String>, bool);
        let map_row = |row: &Row| -> rusqlite::Result<(SubscriptionRow, Owner)> {
            let raw = SubscriptionRow::from_row(row)?;
            Ok((raw, (row.get(13)?, row.get(14)?, row.get(15)?)))
        };
        let rows = match id {
            Some(id) => collect_valid(stmt.query_map(params![id], map_row)?)?,
            None => collect_valid(stmt.query_map([], map_row)?)?,
        };

        Ok(rows
            .into_iter()
            .map(|(subscription, (recipient, recipient_name, email_alerts))| AlertCandidate {
                subscription,
                recipient,
                recipient_name,
                email_alerts,
            })
            .collect())
    }

    /// Record a confirmed reminder send
    pub fn mark_alert_sent(&self, subscription_id: i64, at: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE subscriptions SET last_alert_sent = ? WHERE id = ?",
            params![at.to_rfc3339(), subscription_id],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("Subscription {}", subscription_id)));
        }
        Ok(())
    }
}

impl AlertStore for Database {
    fn alert_candidates(&self) -> Result<Vec<AlertCandidate>> {
        self.list_alert_candidates()
    }

    fn alert_candidate(&self, subscription_id: i64) -> Result<Option<AlertCandidate>> {
        self.get_alert_candidate(subscription_id)
    }

    fn mark_alert_sent(&self, subscription_id: i64, at: DateTime<Utc>) -> Result<()> {
        Database::mark_alert_sent(self, subscription_id, at)
    }
}
