//! Display-currency normalization
//!
//! Conversion rates are an external input; nothing here claims exchange
//! accuracy. A subscription in a currency without a known rate keeps
//! `display_amount = None` and is reported in its own amount.

use std::collections::HashMap;

use tracing::debug;

use crate::config::CurrencySettings;
use crate::models::Subscription;

pub trait CurrencyNormalizer: Send + Sync {
    /// Convert `amount` from one currency to another, if both are known
    fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64>;

    /// Fill `display_amount` on every subscription
    fn normalize(&self, subs: &mut [Subscription], display_currency: &str) {
        for sub in subs.iter_mut() {
            sub.display_amount = self.convert(sub.amount, &sub.currency, display_currency);
            if sub.display_amount.is_none() {
                debug!(
                    subscription_id = sub.id,
                    currency = %sub.currency,
                    display_currency,
                    "No exchange rate, using raw amount"
                );
            }
        }
    }
}

/// Fixed rate table relative to a base currency
#[derive(Debug, Clone)]
pub struct StaticRates {
    base: String,
    rates: HashMap<String, f64>,
}

impl StaticRates {
    pub fn new(base: &str, rates: HashMap<String, f64>) -> Self {
        let mut rates: HashMap<String, f64> = rates
            .into_iter()
            .map(|(code, rate)| (code.to_uppercase(), rate))
            .collect();
        rates.entry(base.to_uppercase()).or_insert(1.0);
        Self {
            base: base.to_uppercase(),
            rates,
        }
    }

    pub fn from_settings(settings: &CurrencySettings) -> Self {
        Self::new(&settings.base, settings.rates.clone())
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn supports(&self, code: &str) -> bool {
        self.rates.contains_key(&code.to_uppercase())
    }
}

impl CurrencyNormalizer for StaticRates {
    fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        if from == to {
            return Some(amount);
        }
        let rate_from = self.rates.get(&from)?;
        let rate_to = self.rates.get(&to)?;
        Some(amount / rate_from * rate_to)
    }
}
