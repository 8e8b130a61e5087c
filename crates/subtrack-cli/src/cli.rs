//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use subtrack_core::models::{BillingCycle, SubscriptionStatus};

/// Subtrack - Know what your subscriptions cost and when they renew
#[derive(Parser)]
#[command(name = "subtrack")]
#[command(about = "Self-hosted subscription tracker with renewal alerts", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "subtrack.db", global = true)]
    pub db: PathBuf,

    /// Config file (defaults to ~/.config/subtrack/config.toml, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set SUBTRACK_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Manage users
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },

    /// Manage subscriptions
    Subscriptions {
        #[command(subcommand)]
        action: SubscriptionsAction,
    },

    /// Show the billing calendar for a month
    Calendar {
        /// User email or ID
        #[arg(short, long)]
        user: String,

        /// Year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,

        /// Month 1-12 (defaults to the current month)
        #[arg(long)]
        month: Option<u32>,
    },

    /// List payments due soon
    Upcoming {
        /// User email or ID
        #[arg(short, long)]
        user: String,

        /// Look-ahead in days (defaults to [alerts] upcoming_days)
        #[arg(short, long)]
        days: Option<i64>,
    },

    /// Spend analytics
    Analytics {
        /// User email or ID
        #[arg(short, long)]
        user: String,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Renewal alerts
    Alerts {
        #[command(subcommand)]
        action: AlertsAction,
    },

    /// Record this month's spend for every user (feeds the trend)
    Snapshot,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server requires a bearer key from SUBTRACK_API_KEYS.
        #[arg(long)]
        no_auth: bool,

        /// Allowed CORS origin (repeatable)
        #[arg(long = "allow-origin")]
        allowed_origins: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum UsersAction {
    /// Add a user (no-op if the email exists)
    Add {
        /// Email address (alerts are sent here)
        email: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        /// Default currency for new subscriptions
        #[arg(long, default_value = "USD")]
        currency: String,

        /// Currency used for totals and analytics
        #[arg(long, default_value = "USD")]
        display_currency: String,

        /// Turn email alerts off
        #[arg(long)]
        no_alerts: bool,
    },

    /// List users
    List,

    /// Update a user's preferences
    Prefs {
        /// User email or ID
        user: String,

        #[arg(short, long)]
        name: Option<String>,

        /// Email alerts on or off
        #[arg(long)]
        alerts: Option<bool>,

        #[arg(long)]
        currency: Option<String>,

        #[arg(long)]
        display_currency: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum SubscriptionsAction {
    /// List a user's subscriptions
    List {
        /// User email or ID
        #[arg(short, long)]
        user: String,
    },

    /// Add a subscription
    Add {
        /// User email or ID
        #[arg(short, long)]
        user: String,

        /// Service name
        name: String,

        /// Amount per billing period
        #[arg(short, long)]
        amount: f64,

        /// Billing cycle: weekly, monthly, quarterly, yearly
        #[arg(short, long, default_value = "monthly")]
        cycle: BillingCycle,

        /// Next billing date (YYYY-MM-DD)
        #[arg(long)]
        next: NaiveDate,

        #[arg(long)]
        category: Option<String>,

        /// Currency (defaults to the user's currency)
        #[arg(long)]
        currency: Option<String>,

        /// Status: active, trial, paused, cancelled
        #[arg(long, default_value = "active")]
        status: SubscriptionStatus,

        /// Days before billing to send a reminder
        #[arg(long, default_value = "3")]
        alert_days: u32,

        /// Disable reminders for this subscription
        #[arg(long)]
        no_alerts: bool,
    },

    /// Change a subscription's status
    Status {
        /// Subscription ID
        id: i64,

        /// New status: active, trial, paused, cancelled
        status: SubscriptionStatus,
    },

    /// Delete a subscription
    Delete {
        /// Subscription ID
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum AlertsAction {
    /// Send every reminder due today
    Run {
        /// Show what would be sent without sending
        #[arg(long)]
        dry_run: bool,
    },

    /// Send a reminder for one subscription now
    Send {
        /// Subscription ID
        id: i64,
    },
}
