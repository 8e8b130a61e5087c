//! Subscription command implementations

use anyhow::Result;
use subtrack_core::currency::CurrencyNormalizer;
use subtrack_core::db::Database;
use subtrack_core::models::{NewSubscription, SubscriptionStatus};
use subtrack_core::Portfolio;

use super::{money, resolve_user, truncate};

fn status_icon(status: SubscriptionStatus) -> &'static str {
    match status {
        SubscriptionStatus::Active => "✅",
        SubscriptionStatus::Trial => "🧪",
        SubscriptionStatus::Paused => "⏸️",
        SubscriptionStatus::Cancelled => "❌",
    }
}

pub fn cmd_subscriptions_list(
    db: &Database,
    normalizer: &dyn CurrencyNormalizer,
    user: &str,
) -> Result<()> {
    let user = resolve_user(db, user)?;
    let portfolio = Portfolio::load(db, user.id, normalizer)?;

    if portfolio.subscriptions.is_empty() {
        println!("No subscriptions yet. Run:");
        println!("  subtrack subscriptions add -u {} <name> -a <amount> --next <date>", user.email);
        return Ok(());
    }

    println!();
    println!("📋 Subscriptions for {}", user.email);
    println!("   ─────────────────────────────────────────────────────────────");

    for sub in &portfolio.subscriptions {
        let display = match sub.display_amount {
            Some(amount) if sub.currency != user.display_currency => {
                format!(" (≈ {})", money(amount, &user.display_currency))
            }
            _ => String::new(),
        };
        println!(
            "   {} {:>4} │ {:20} │ {:>12}/{:<9} │ next {}{}",
            status_icon(sub.status),
            sub.id,
            truncate(&sub.name, 20),
            money(sub.amount, &sub.currency),
            sub.billing_cycle.as_str(),
            sub.next_billing_date,
            display,
        );
    }

    println!();
    println!(
        "   Monthly total (active): {}",
        money(portfolio.monthly_total(), &user.display_currency)
    );

    Ok(())
}

pub fn cmd_subscriptions_add(db: &Database, user: &str, mut sub: NewSubscription) -> Result<i64> {
    let user = resolve_user(db, user)?;
    if sub.currency.trim().is_empty() {
        sub.currency = user.currency.clone();
    }

    let id = db.create_subscription(user.id, &sub)?;

    db.log_audit(
        "cli",
        "create",
        Some("subscription"),
        Some(id),
        Some(&format!("name={}, user={}", sub.name, user.email)),
    )?;

    println!(
        "✅ Added {} (ID: {}) {} {} next on {}",
        sub.name,
        id,
        money(sub.amount, &sub.currency.to_uppercase()),
        sub.billing_cycle,
        sub.next_billing_date
    );
    Ok(id)
}

pub fn cmd_subscriptions_status(db: &Database, id: i64, status: SubscriptionStatus) -> Result<()> {
    db.set_subscription_status(id, status)?;

    db.log_audit(
        "cli",
        "update",
        Some("subscription"),
        Some(id),
        Some(&format!("status={}", status)),
    )?;

    println!("{} Subscription {} is now {}", status_icon(status), id, status);
    Ok(())
}

pub fn cmd_subscriptions_delete(db: &Database, id: i64) -> Result<()> {
    db.delete_subscription(id)?;

    db.log_audit("cli", "delete", Some("subscription"), Some(id), None)?;

    println!("🗑️  Subscription {} deleted", id);
    Ok(())
}
