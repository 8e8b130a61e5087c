//! User operations

use rusqlite::{params, OptionalExtension, Row};
use tracing::info;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{validate_currency, NewUser, User, UserPreferences};

const USER_COLUMNS: &str = "id, email, name, email_alerts, currency, display_currency, created_at";

fn row_to_user(row: &Row) -> rusqlite::Result<User> {
    let created_at: Option<String> = row.get(6)?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        email_alerts: row.get(3)?,
        currency: row.get(4)?,
        display_currency: row.get(5)?,
        created_at: created_at
            .as_deref()
            .and_then(parse_datetime)
            .unwrap_or_default(),
    })
}

impl Database {
    /// Create a user, or return the existing id for that email
    pub fn upsert_user(&self, user: &NewUser) -> Result<i64> {
        let email = user.email.trim().to_lowercase();
        if !email.contains('@') {
            return Err(Error::InvalidData(format!("Invalid email: {}", user.email)));
        }
        validate_currency(&user.currency)?;
        validate_currency(&user.display_currency)?;

        let conn = self.conn()?;
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM users WHERE email = ?",
                params![email],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        conn.execute(
            r#"
            INSERT INTO users (email, name, email_alerts, currency, display_currency)
            VALUES (?, ?, ?, ?, ?)
            "#,
            params![
                email,
                user.name,
                user.email_alerts,
                user.currency.to_uppercase(),
                user.display_currency.to_uppercase(),
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
                params![id],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS),
                params![email.trim().to_lowercase()],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Apply a partial preferences update
    pub fn update_user_preferences(&self, id: i64, prefs: &UserPreferences) -> Result<User> {
        let mut user = self
            .get_user(id)?
            .ok_or_else(|| Error::NotFound(format!("User {}", id)))?;

        if let Some(name) = &prefs.name {
            user.name = Some(name.trim().to_string()).filter(|n| !n.is_empty());
        }
        if let Some(email_alerts) = prefs.email_alerts {
            user.email_alerts = email_alerts;
        }
        if let Some(currency) = &prefs.currency {
            validate_currency(currency)?;
            user.currency = currency.to_uppercase();
        }
        if let Some(display_currency) = &prefs.display_currency {
            validate_currency(display_currency)?;
            user.display_currency = display_currency.to_uppercase();
        }

        let conn = self.conn()?;
        conn.execute(
            r#"
            UPDATE users
            SET name = ?, email_alerts = ?, currency = ?, display_currency = ?
            WHERE id = ?
            "#,
            params![
                user.name,
                user.email_alerts,
                user.currency,
                user.display_currency,
                id
            ],
        )?;

        if !user.email_alerts {
            info!(user_id = id, "Email alerts turned off");
        }
        Ok(user)
    }
}
