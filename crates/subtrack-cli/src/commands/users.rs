//! User command implementations

use anyhow::Result;
use subtrack_core::db::Database;
use subtrack_core::models::{NewUser, UserPreferences};

use super::{resolve_user, truncate};

pub fn cmd_users_add(
    db: &Database,
    email: &str,
    name: Option<&str>,
    currency: &str,
    display_currency: &str,
    email_alerts: bool,
) -> Result<i64> {
    let id = db.upsert_user(&NewUser {
        email: email.to_string(),
        name: name.map(str::to_string),
        email_alerts,
        currency: currency.to_string(),
        display_currency: display_currency.to_string(),
    })?;

    db.log_audit("cli", "create", Some("user"), Some(id), Some(email))?;

    println!("✅ User {} (ID: {})", email.trim().to_lowercase(), id);
    if !email_alerts {
        println!("   🔕 Email alerts off");
    }
    Ok(id)
}

pub fn cmd_users_list(db: &Database) -> Result<()> {
    let users = db.list_users()?;

    if users.is_empty() {
        println!("No users yet. Run:");
        println!("  subtrack users add you@example.com");
        return Ok(());
    }

    println!();
    println!("👥 Users");
    println!("   ─────────────────────────────────────────────────────────────");

    for user in users {
        println!(
            "   {:>4} │ {:30} │ {:20} │ {} │ {}",
            user.id,
            truncate(&user.email, 30),
            truncate(user.name.as_deref().unwrap_or("-"), 20),
            user.display_currency,
            if user.email_alerts { "🔔" } else { "🔕" },
        );
    }

    Ok(())
}

pub fn cmd_users_prefs(db: &Database, user: &str, prefs: &UserPreferences) -> Result<()> {
    let user = resolve_user(db, user)?;
    let updated = db.update_user_preferences(user.id, prefs)?;

    db.log_audit("cli", "update", Some("user"), Some(user.id), None)?;

    println!("✅ Preferences updated for {}", updated.email);
    println!(
        "   Email alerts: {}",
        if updated.email_alerts { "on" } else { "off" }
    );
    println!("   Currency: {}", updated.currency);
    println!("   Display currency: {}", updated.display_currency);
    Ok(())
}
