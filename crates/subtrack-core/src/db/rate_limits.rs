//! Rate-limit counters

use rusqlite::params;

use super::Database;
use crate::error::Result;
use crate::rate_limit::RateLimitStore;

/// Windows older than this many seconds are pruned on write
const RETENTION_SECS: i64 = 7 * 24 * 3600;

impl RateLimitStore for Database {
    fn increment(&self, key: &str, window_start: i64) -> Result<u32> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM rate_limits WHERE key = ? AND window_start < ?",
            params![key, window_start - RETENTION_SECS],
        )?;
        let count: i64 = conn.query_row(
            r#"
            INSERT INTO rate_limits (key, window_start, count)
            VALUES (?, ?, 1)
            ON CONFLICT(key, window_start) DO UPDATE SET count = count + 1
            RETURNING count
            "#,
            params![key, window_start],
            |row| row.get(0),
        )?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}
