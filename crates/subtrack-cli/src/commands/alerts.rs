//! Alert and snapshot command implementations

use std::sync::Arc;

use anyhow::{Context, Result};
use subtrack_core::alerts::{
    transport_from_config, AlertDecision, AlertItemStatus, AlertScheduler, AlertTransport,
};
use subtrack_core::clock::Clock;
use subtrack_core::config::{AppConfig, Secrets};
use subtrack_core::currency::CurrencyNormalizer;
use subtrack_core::db::Database;
use subtrack_core::portfolio::record_snapshots;

use super::truncate;

/// Transport selected in config, with credentials from the environment
pub fn build_transport(settings: &AppConfig) -> Result<Arc<dyn AlertTransport>> {
    transport_from_config(&settings.transport, &Secrets::from_env())
        .context("Failed to set up alert transport")
}

fn scheduler(
    db: &Database,
    transport: Arc<dyn AlertTransport>,
    settings: &AppConfig,
    clock: Arc<dyn Clock>,
) -> AlertScheduler {
    AlertScheduler::new(Arc::new(db.clone()), transport, clock)
        .with_send_timeout(settings.alerts.send_timeout)
}

pub async fn cmd_alerts_run(
    db: &Database,
    transport: Arc<dyn AlertTransport>,
    settings: &AppConfig,
    clock: Arc<dyn Clock>,
    dry_run: bool,
) -> Result<()> {
    let scheduler = scheduler(db, transport.clone(), settings, clock.clone());

    if dry_run {
        println!();
        println!("🔍 Alert preview for {} (nothing sent)", clock.today());
        println!("   ─────────────────────────────────────────────────────────────");
        let previews = scheduler.preview()?;
        if previews.is_empty() {
            println!("   No subscriptions.");
        }
        for preview in previews {
            let decision = match preview.decision {
                AlertDecision::Send { days_until } => format!("📨 send (due in {} days)", days_until),
                AlertDecision::Skip { reason } => format!("   skip: {}", reason.describe()),
            };
            println!(
                "   {:>4} │ {:20} │ {:28} │ {}",
                preview.subscription_id,
                truncate(&preview.name, 20),
                truncate(&preview.recipient, 28),
                decision
            );
        }
        return Ok(());
    }

    println!("📨 Running renewal alerts via {} transport...", transport.name());
    let report = scheduler.run_due().await?;

    db.log_audit(
        "cli",
        "alerts_run",
        Some("alert"),
        None,
        Some(&format!(
            "evaluated={}, sent={}, failed={}, errors={}, skipped={}",
            report.evaluated, report.sent, report.failed, report.errors, report.skipped
        )),
    )?;

    for result in &report.results {
        let icon = match result.status {
            AlertItemStatus::Sent => "✅",
            AlertItemStatus::Failed => "❌",
            AlertItemStatus::Error => "⚠️",
        };
        println!(
            "   {} {:20} → {}{}",
            icon,
            truncate(&result.name, 20),
            result.recipient,
            result
                .error
                .as_deref()
                .map(|e| format!(" ({})", e))
                .unwrap_or_default()
        );
    }

    println!();
    println!(
        "   Evaluated {}, sent {}, failed {}, errors {}, skipped {}",
        report.evaluated, report.sent, report.failed, report.errors, report.skipped
    );
    for (reason, count) in &report.skip_reasons {
        println!("     {}: {}", reason, count);
    }

    Ok(())
}

pub async fn cmd_alerts_send(
    db: &Database,
    transport: Arc<dyn AlertTransport>,
    settings: &AppConfig,
    clock: Arc<dyn Clock>,
    id: i64,
) -> Result<()> {
    let result = scheduler(db, transport, settings, clock)
        .send_one(id)
        .await?;

    db.log_audit(
        "cli",
        "send_alert",
        Some("subscription"),
        Some(id),
        Some(&format!("status={:?}", result.status)),
    )?;

    match result.status {
        AlertItemStatus::Sent => {
            println!("✅ Reminder for {} sent to {}", result.name, result.recipient);
            Ok(())
        }
        _ => anyhow::bail!(
            "Reminder for {} not delivered: {}",
            result.name,
            result.error.unwrap_or_default()
        ),
    }
}

pub fn cmd_snapshot(
    db: &Database,
    normalizer: &dyn CurrencyNormalizer,
    clock: &dyn Clock,
) -> Result<usize> {
    let recorded = record_snapshots(db, normalizer, clock.today())?;
    println!("✅ Recorded spend for {} user(s)", recorded);
    Ok(recorded)
}
