//! Subtrack CLI - Subscription spend tracker with renewal alerts
//!
//! Usage:
//!   subtrack init                                   Initialize database
//!   subtrack users add you@example.com              Add a user
//!   subtrack subscriptions add -u 1 Netflix -a 15.49 --next 2026-04-01
//!   subtrack alerts run                             Send reminders due today
//!   subtrack serve --port 3000                      Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use subtrack_core::models::{NewSubscription, UserPreferences};
use subtrack_core::{AnalyticsAggregator, Clock, StaticRates, SystemClock};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let settings = commands::load_settings(cli.config.as_deref())?;
    let rates = StaticRates::from_settings(&settings.currency);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Users { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                UsersAction::Add {
                    email,
                    name,
                    currency,
                    display_currency,
                    no_alerts,
                } => commands::cmd_users_add(
                    &db,
                    &email,
                    name.as_deref(),
                    &currency,
                    &display_currency,
                    !no_alerts,
                )
                .map(|_| ()),
                UsersAction::List => commands::cmd_users_list(&db),
                UsersAction::Prefs {
                    user,
                    name,
                    alerts,
                    currency,
                    display_currency,
                } => commands::cmd_users_prefs(
                    &db,
                    &user,
                    &UserPreferences {
                        name,
                        email_alerts: alerts,
                        currency,
                        display_currency,
                    },
                ),
            }
        }
        Commands::Subscriptions { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                SubscriptionsAction::List { user } => {
                    commands::cmd_subscriptions_list(&db, &rates, &user)
                }
                SubscriptionsAction::Add {
                    user,
                    name,
                    amount,
                    cycle,
                    next,
                    category,
                    currency,
                    status,
                    alert_days,
                    no_alerts,
                } => commands::cmd_subscriptions_add(
                    &db,
                    &user,
                    NewSubscription {
                        name,
                        category,
                        amount,
                        currency: currency.unwrap_or_default(),
                        billing_cycle: cycle,
                        next_billing_date: next,
                        status,
                        alert_enabled: !no_alerts,
                        alert_days,
                    },
                )
                .map(|_| ()),
                SubscriptionsAction::Status { id, status } => {
                    commands::cmd_subscriptions_status(&db, id, status)
                }
                SubscriptionsAction::Delete { id } => commands::cmd_subscriptions_delete(&db, id),
            }
        }
        Commands::Calendar { user, year, month } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_calendar(&db, &rates, &user, year, month, clock.today())
        }
        Commands::Upcoming { user, days } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let days = days.unwrap_or(settings.alerts.upcoming_days);
            commands::cmd_upcoming(&db, &rates, &user, days, clock.today())
        }
        Commands::Analytics { user, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let aggregator =
                AnalyticsAggregator::new(settings.alerts.top_n, settings.alerts.upcoming_days);
            commands::cmd_analytics(&db, &rates, &aggregator, &user, json, clock.today())
        }
        Commands::Alerts { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let transport = commands::build_transport(&settings)?;
            match action {
                AlertsAction::Run { dry_run } => {
                    commands::cmd_alerts_run(&db, transport, &settings, clock, dry_run).await
                }
                AlertsAction::Send { id } => {
                    commands::cmd_alerts_send(&db, transport, &settings, clock, id).await
                }
            }
        }
        Commands::Snapshot => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_snapshot(&db, &rates, clock.as_ref()).map(|_| ())
        }
        Commands::Serve {
            port,
            host,
            no_auth,
            allowed_origins,
        } => {
            commands::cmd_serve(
                &cli.db,
                settings,
                &host,
                port,
                no_auth,
                cli.no_encrypt,
                allowed_origins,
            )
            .await
        }
    }
}
