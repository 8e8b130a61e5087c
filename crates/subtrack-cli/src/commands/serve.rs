//! Server command implementation

use std::path::Path;

use anyhow::Result;
use subtrack_core::config::{AppConfig, Secrets, API_KEYS_ENV, CRON_SECRET_ENV};

use super::{build_transport, open_db};

#[allow(clippy::too_many_arguments)]
pub async fn cmd_serve(
    db_path: &Path,
    settings: AppConfig,
    host: &str,
    port: u16,
    no_auth: bool,
    no_encrypt: bool,
    allowed_origins: Vec<String>,
) -> Result<()> {
    let secrets = Secrets::from_env();
    let transport = build_transport(&settings)?;

    println!("🚀 Starting Subtrack server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    println!("   Alert transport: {}", transport.name());
    match settings.alerts.daily_run_hour_utc {
        Some(hour) => println!("   Daily alert run: {:02}:00 UTC", hour),
        None => println!("   Daily alert run: disabled (use /api/alerts/cron)"),
    }

    if no_auth {
        println!();
        println!("   ⚠️  Authentication DISABLED - do not expose to network!");
    } else if secrets.api_keys.is_empty() {
        println!("   ❌ No API keys configured. Set {} (comma-separated)", API_KEYS_ENV);
    } else {
        println!(
            "   🔑 API keys: {} configured ({})",
            secrets.api_keys.len(),
            API_KEYS_ENV
        );
    }
    if secrets.cron_secret.is_some() {
        println!("   ⏰ Cron trigger enabled ({})", CRON_SECRET_ENV);
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let config = subtrack_server::ServerConfig {
        require_auth: !no_auth,
        allowed_origins,
        api_keys: secrets.api_keys,
        cron_secret: secrets.cron_secret,
    };

    subtrack_server::serve_with_config(db, host, port, config, settings, transport).await?;

    Ok(())
}
