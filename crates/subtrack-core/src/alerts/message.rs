//! Renewal reminder content

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::transport::EmailMessage;
use crate::models::AlertCandidate;

/// Everything a reminder needs to say
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertPayload {
    pub subscription_id: i64,
    pub subscription_name: String,
    pub amount: f64,
    pub currency: String,
    pub billing_date: NaiveDate,
    pub days_until: i64,
    pub recipient: String,
    pub recipient_name: Option<String>,
}

impl AlertPayload {
    /// Reminders quote the subscription's own amount and currency
    pub fn from_candidate(candidate: &AlertCandidate, days_until: i64) -> Self {
        let sub = &candidate.subscription;
        Self {
            subscription_id: sub.id,
            subscription_name: sub.name.clone(),
            amount: sub.amount,
            currency: sub.currency.clone(),
            billing_date: sub.next_billing_date,
            days_until,
            recipient: candidate.recipient.clone(),
            recipient_name: candidate.recipient_name.clone(),
        }
    }

    /// "today", "tomorrow" or "in N days"
    pub fn when(&self) -> String {
        match self.days_until {
            0 => "today".to_string(),
            1 => "tomorrow".to_string(),
            n => format!("in {} days", n),
        }
    }

    /// Key identifying this reminder for this billing date and lead time
    pub fn idempotency_key(&self, scope: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!(
            "{}:{}:{}:{}",
            scope, self.subscription_id, self.billing_date, self.days_until
        ));
        hex::encode(hasher.finalize())
    }

    pub fn render(&self, scope: &str) -> EmailMessage {
        let greeting = match &self.recipient_name {
            Some(name) if !name.trim().is_empty() => format!("Hi {},", name.trim()),
            _ => "Hi,".to_string(),
        };
        let amount = format!("{:.2} {}", self.amount, self.currency);
        let date = self.billing_date.format("%B %-d, %Y").to_string();
        let when = self.when();

        let subject = format!("{} renews {}", self.subscription_name, when);
        let text = format!(
            "{}\n\nYour {} subscription renews {} ({}) for {}.\n\n\
             If you no longer use it, now is a good time to cancel or pause it.\n\n\
             Subtrack",
            greeting, self.subscription_name, when, date, amount
        );
        let html = format!(
            "<p>{}</p>\
             <p>Your <strong>{}</strong> subscription renews {} ({}) for <strong>{}</strong>.</p>\
             <p>If you no longer use it, now is a good time to cancel or pause it.</p>\
             <p>Subtrack</p>",
            escape_html(&greeting),
            escape_html(&self.subscription_name),
            when,
            date,
            escape_html(&amount)
        );

        EmailMessage {
            to: self.recipient.clone(),
            subject,
            text,
            html,
            idempotency_key: self.idempotency_key(scope),
        }
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
