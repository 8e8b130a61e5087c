//! Monthly spend snapshots
//!
//! One row per user per month holding that month's monthly-equivalent
//! spend in the user's display currency. Trends are read back from here.

use std::collections::HashMap;

use rusqlite::params;
use tracing::debug;

use super::Database;
use crate::analytics::TrendPoint;
use crate::calendar::{month_key, shift_month};
use crate::currency::CurrencyNormalizer;
use crate::error::Result;

impl Database {
    /// Store (or replace) a user's total for a month
    pub fn record_spend_snapshot(
        &self,
        user_id: i64,
        year: i32,
        month: u32,
        total: f64,
        currency: &str,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO spend_snapshots (user_id, month, total, currency)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, month) DO UPDATE SET
                total = excluded.total,
                currency = excluded.currency,
                recorded_at = CURRENT_TIMESTAMP
            "#,
            params![user_id, month_key(year, month), total, currency],
        )?;
        Ok(())
    }

    /// Trailing `months` of spend ending at (end_year, end_month)
    ///
    /// Oldest first; months without a snapshot are 0. Totals are returned as
    /// stored, whatever currency they were recorded in.
    pub fn monthly_trend(
        &self,
        user_id: i64,
        end_year: i32,
        end_month: u32,
        months: u32,
    ) -> Result<Vec<TrendPoint>> {
        self.trend_points(user_id, end_year, end_month, months, |total, _| Some(total))
    }

    /// Like `monthly_trend`, with every stored total converted to `currency`
    ///
    /// A month recorded in a currency the normalizer cannot convert counts
    /// as missing (0) rather than being compared across currencies.
    pub fn monthly_trend_in(
        &self,
        user_id: i64,
        end_year: i32,
        end_month: u32,
        months: u32,
        currency: &str,
        normalizer: &dyn CurrencyNormalizer,
    ) -> Result<Vec<TrendPoint>> {
        self.trend_points(user_id, end_year, end_month, months, |total, stored| {
            let converted = normalizer.convert(total, stored, currency);
            if converted.is_none() {
                debug!(user_id, from = stored, to = currency, "Dropping unconvertible snapshot");
            }
            converted
        })
    }

    fn trend_points(
        &self,
        user_id: i64,
        end_year: i32,
        end_month: u32,
        months: u32,
        convert: impl Fn(f64, &str) -> Option<f64>,
    ) -> Result<Vec<TrendPoint>> {
        if months == 0 {
            return Ok(Vec::new());
        }
        let (start_year, start_month) = shift_month(end_year, end_month, -(months as i32 - 1));
        let start = month_key(start_year, start_month);
        let end = month_key(end_year, end_month);

        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT month, total, currency FROM spend_snapshots
            WHERE user_id = ? AND month >= ? AND month <= ?
            "#,
        )?;
        let stored: HashMap<String, (f64, String)> = stmt
            .query_map(params![user_id, start, end], |row| {
                Ok((row.get(0)?, (row.get(1)?, row.get(2)?)))
            })?
            .collect::<std::result::Result<_, _>>()?;

        Ok((0..months as i32)
            .map(|offset| {
                let (y, m) = shift_month(start_year, start_month, offset);
                let key = month_key(y, m);
                let amount = stored
                    .get(&key)
                    .and_then(|(total, cur)| convert(*total, cur))
                    .unwrap_or(0.0);
                TrendPoint { month: key, amount }
            })
            .collect())
    }
}
