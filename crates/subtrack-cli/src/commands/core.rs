//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_settings` - Config file loading
//! - `resolve_user` - Look a user up by email or ID
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use subtrack_core::config::{load_config, AppConfig};
use subtrack_core::db::Database;
use subtrack_core::models::User;

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow!("Database path must be valid UTF-8: {}", db_path.display()))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn load_settings(config_path: Option<&Path>) -> Result<AppConfig> {
    load_config(config_path).context("Failed to load configuration")
}

/// Find a user by numeric ID or email address
pub fn resolve_user(db: &Database, user: &str) -> Result<User> {
    let found = match user.trim().parse::<i64>() {
        Ok(id) => db.get_user(id)?,
        Err(_) => db.get_user_by_email(user)?,
    };
    found.ok_or_else(|| anyhow!("User not found: {}", user))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    if db.is_encrypted()? {
        println!("   🔒 Encryption: ENABLED");
    } else {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Add a user: subtrack users add you@example.com");
    println!("  2. Add a subscription: subtrack subscriptions add -u you@example.com Netflix -a 15.49 --next 2026-01-15");
    println!("  3. Start the API: subtrack serve");

    Ok(())
}
