//! CLI command tests

use std::sync::Arc;

use clap::Parser;
use subtrack_core::config::AppConfig;
use subtrack_core::db::Database;
use subtrack_core::models::{BillingCycle, SubscriptionStatus, UserPreferences};
use subtrack_core::test_utils::{
    date, seed_subscription, seed_user, subscription, RecordingTransport,
};
use subtrack_core::{AlertTransport, AnalyticsAggregator, Clock, FixedClock, StaticRates};

use crate::cli::{AlertsAction, Cli, Commands, SubscriptionsAction};
use crate::commands::{self, money, truncate};

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

fn rates() -> StaticRates {
    StaticRates::from_settings(&AppConfig::default().currency)
}

fn clock_on(day: chrono::NaiveDate) -> Arc<dyn Clock> {
    Arc::new(FixedClock::at(day, 9, 0).unwrap())
}

// ========== Argument Parsing Tests ==========

#[test]
fn test_parse_subscriptions_add() {
    let cli = Cli::try_parse_from([
        "subtrack",
        "subscriptions",
        "add",
        "-u",
        "a@example.com",
        "Netflix",
        "-a",
        "15.49",
        "--cycle",
        "yearly",
        "--next",
        "2026-04-01",
    ])
    .unwrap();

    match cli.command {
        Commands::Subscriptions {
            action:
                SubscriptionsAction::Add {
                    name,
                    amount,
                    cycle,
                    next,
                    status,
                    alert_days,
                    no_alerts,
                    ..
                },
        } => {
            assert_eq!(name, "Netflix");
            assert_eq!(amount, 15.49);
            assert_eq!(cycle, BillingCycle::Yearly);
            assert_eq!(next, date(2026, 4, 1));
            assert_eq!(status, SubscriptionStatus::Active);
            assert_eq!(alert_days, 3);
            assert!(!no_alerts);
        }
        _ => panic!("expected subscriptions add"),
    }
}

#[test]
fn test_parse_rejects_bad_cycle_and_date() {
    assert!(Cli::try_parse_from([
        "subtrack", "subscriptions", "add", "-u", "1", "X", "-a", "1", "--cycle", "daily",
        "--next", "2026-04-01",
    ])
    .is_err());
    assert!(Cli::try_parse_from([
        "subtrack", "subscriptions", "add", "-u", "1", "X", "-a", "1", "--next", "2026-02-30",
    ])
    .is_err());
}

#[test]
fn test_parse_global_flags() {
    let cli = Cli::try_parse_from([
        "subtrack",
        "alerts",
        "run",
        "--dry-run",
        "--db",
        "/tmp/x.db",
        "--no-encrypt",
    ])
    .unwrap();
    assert!(cli.no_encrypt);
    assert_eq!(cli.db.to_str(), Some("/tmp/x.db"));
    assert!(matches!(
        cli.command,
        Commands::Alerts {
            action: AlertsAction::Run { dry_run: true }
        }
    ));
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a very long service name", 10), "a very ...");
    assert_eq!(truncate("Écoute Plus", 6), "Éco...");
}

#[test]
fn test_money() {
    assert_eq!(money(15.499, "USD"), "15.50 USD");
    assert_eq!(money(0.0, "EUR"), "0.00 EUR");
}

// ========== User Command Tests ==========

#[test]
fn test_cmd_users_add_and_resolve() {
    let db = setup_test_db();
    let id = commands::cmd_users_add(&db, "Ann@Example.com", Some("Ann"), "USD", "EUR", true)
        .unwrap();

    assert_eq!(commands::resolve_user(&db, "ann@example.com").unwrap().id, id);
    assert_eq!(commands::resolve_user(&db, &id.to_string()).unwrap().id, id);
    assert!(commands::resolve_user(&db, "nobody@example.com").is_err());

    // Same email again is the same user
    let again = commands::cmd_users_add(&db, "ann@example.com", None, "USD", "USD", true).unwrap();
    assert_eq!(again, id);

    assert!(commands::cmd_users_list(&db).is_ok());
}

#[test]
fn test_cmd_users_add_invalid_email() {
    let db = setup_test_db();
    assert!(commands::cmd_users_add(&db, "not-an-email", None, "USD", "USD", true).is_err());
}

#[test]
fn test_cmd_users_prefs() {
    let db = setup_test_db();
    let id = seed_user(&db, "pref@example.com");

    commands::cmd_users_prefs(
        &db,
        "pref@example.com",
        &UserPreferences {
            email_alerts: Some(false),
            display_currency: Some("eur".to_string()),
            ..Default::default()
        },
    )
    .unwrap();

    let user = db.get_user(id).unwrap().unwrap();
    assert!(!user.email_alerts);
    assert_eq!(user.display_currency, "EUR");
}

// ========== Subscription Command Tests ==========

#[test]
fn test_cmd_subscriptions_add_uses_user_currency() {
    let db = setup_test_db();
    let uid = commands::cmd_users_add(&db, "eur@example.com", None, "EUR", "EUR", true).unwrap();

    let mut sub = subscription("Spotify", 9.99, BillingCycle::Monthly, date(2026, 3, 20));
    sub.currency = String::new();
    let id = commands::cmd_subscriptions_add(&db, "eur@example.com", sub).unwrap();

    let stored = db.get_subscription(id).unwrap().unwrap();
    assert_eq!(stored.user_id, uid);
    assert_eq!(stored.currency, "EUR");

    let audit = db.list_audit_log(10).unwrap();
    assert!(audit
        .iter()
        .any(|e| e.actor == "cli" && e.action == "create" && e.entity_id == Some(id)));
}

#[test]
fn test_cmd_subscriptions_status_and_delete() {
    let db = setup_test_db();
    let uid = seed_user(&db, "s@example.com");
    let id = seed_subscription(
        &db,
        uid,
        &subscription("Gym", 40.0, BillingCycle::Monthly, date(2026, 3, 15)),
    );

    commands::cmd_subscriptions_status(&db, id, SubscriptionStatus::Paused).unwrap();
    assert_eq!(
        db.get_subscription(id).unwrap().unwrap().status,
        SubscriptionStatus::Paused
    );
    assert!(commands::cmd_subscriptions_list(&db, &rates(), "s@example.com").is_ok());

    commands::cmd_subscriptions_delete(&db, id).unwrap();
    assert!(db.get_subscription(id).unwrap().is_none());
    assert!(commands::cmd_subscriptions_delete(&db, id).is_err());
}

// ========== View Tests ==========

#[test]
fn test_render_month_grid() {
    let db = setup_test_db();
    let uid = seed_user(&db, "grid@example.com");
    seed_subscription(
        &db,
        uid,
        &subscription("Rent", 1000.0, BillingCycle::Monthly, date(2026, 1, 31)),
    );

    let portfolio = subtrack_core::Portfolio::load(&db, uid, &rates()).unwrap();
    let calendar = portfolio.calendar(2026, 2).unwrap();
    let grid = render_lines(&commands::render_month_grid(&calendar));

    // February 2026 starts on a Sunday and has four full weeks
    assert_eq!(grid[0].trim(), "February 2026");
    assert_eq!(grid[1], " Su  Mo  Tu  We  Th  Fr  Sa");
    assert!(grid[2].starts_with("  1 "));
    assert_eq!(grid.len(), 6);
    // Day 31 clamps to the 28th
    assert!(grid[5].ends_with("28*"));
}

fn render_lines(grid: &str) -> Vec<String> {
    grid.lines().map(str::to_string).collect()
}

#[test]
fn test_render_month_grid_leading_blanks() {
    let db = setup_test_db();
    let uid = seed_user(&db, "blank@example.com");
    let calendar = subtrack_core::Portfolio::load(&db, uid, &rates())
        .unwrap()
        .calendar(2026, 3)
        .unwrap();
    let grid = render_lines(&commands::render_month_grid(&calendar));

    // March 2026 starts on a Sunday too; April starts on a Wednesday
    assert!(grid[2].starts_with("  1 "));
    let april = subtrack_core::Portfolio::load(&db, uid, &rates())
        .unwrap()
        .calendar(2026, 4)
        .unwrap();
    let grid = render_lines(&commands::render_month_grid(&april));
    assert!(grid[2].starts_with(&format!("{}  1", " ".repeat(12))));
    assert!(!grid.iter().any(|l| l.contains('*')));
}

#[test]
fn test_view_commands() {
    let db = setup_test_db();
    let uid = seed_user(&db, "views@example.com");
    seed_subscription(
        &db,
        uid,
        &subscription("Netflix", 15.0, BillingCycle::Monthly, date(2026, 3, 13)),
    );
    let today = date(2026, 3, 10);
    let normalizer = rates();

    assert!(commands::cmd_calendar(&db, &normalizer, "views@example.com", None, None, today).is_ok());
    assert!(
        commands::cmd_calendar(&db, &normalizer, "views@example.com", Some(2026), Some(13), today)
            .is_err()
    );
    assert!(commands::cmd_upcoming(&db, &normalizer, "views@example.com", 7, today).is_ok());
    assert!(commands::cmd_upcoming(&db, &normalizer, "views@example.com", -1, today).is_err());

    let aggregator = AnalyticsAggregator::new(5, 7);
    assert!(
        commands::cmd_analytics(&db, &normalizer, &aggregator, "views@example.com", true, today)
            .is_ok()
    );
    assert!(
        commands::cmd_analytics(&db, &normalizer, &aggregator, "views@example.com", false, today)
            .is_ok()
    );
}

// ========== Alert Command Tests ==========

#[tokio::test]
async fn test_cmd_alerts_run_sends_due_reminders() {
    let db = setup_test_db();
    let uid = seed_user(&db, "due@example.com");
    let due = seed_subscription(
        &db,
        uid,
        &subscription("Netflix", 15.0, BillingCycle::Monthly, date(2026, 3, 13)),
    );
    seed_subscription(
        &db,
        uid,
        &subscription("Later", 5.0, BillingCycle::Monthly, date(2026, 3, 25)),
    );

    let recorder = Arc::new(RecordingTransport::new());
    let transport: Arc<dyn AlertTransport> = recorder.clone();
    let settings = AppConfig::default();
    let clock = clock_on(date(2026, 3, 10));

    commands::cmd_alerts_run(&db, transport.clone(), &settings, clock.clone(), false)
        .await
        .unwrap();

    let sent = recorder.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "due@example.com");
    assert!(db
        .get_subscription(due)
        .unwrap()
        .unwrap()
        .last_alert_sent
        .is_some());

    // Second run the same day sends nothing new
    commands::cmd_alerts_run(&db, transport, &settings, clock, false)
        .await
        .unwrap();
    assert_eq!(recorder.sent().len(), 1);
}

#[tokio::test]
async fn test_cmd_alerts_dry_run_sends_nothing() {
    let db = setup_test_db();
    let uid = seed_user(&db, "dry@example.com");
    seed_subscription(
        &db,
        uid,
        &subscription("Netflix", 15.0, BillingCycle::Monthly, date(2026, 3, 13)),
    );

    let recorder = Arc::new(RecordingTransport::new());
    commands::cmd_alerts_run(
        &db,
        recorder.clone(),
        &AppConfig::default(),
        clock_on(date(2026, 3, 10)),
        true,
    )
    .await
    .unwrap();

    assert!(recorder.sent().is_empty());
    assert!(db.list_audit_log(10).unwrap().is_empty());
}

#[tokio::test]
async fn test_cmd_alerts_send() {
    let db = setup_test_db();
    let uid = seed_user(&db, "manual@example.com");
    let id = seed_subscription(
        &db,
        uid,
        &subscription("Gym", 40.0, BillingCycle::Monthly, date(2026, 3, 28)),
    );
    let recorder = Arc::new(RecordingTransport::new());
    let settings = AppConfig::default();
    let clock = clock_on(date(2026, 3, 10));

    commands::cmd_alerts_send(&db, recorder.clone(), &settings, clock.clone(), id)
        .await
        .unwrap();
    assert_eq!(recorder.sent().len(), 1);

    // Transport failure surfaces as an error
    recorder.fail_for("manual@example.com");
    assert!(
        commands::cmd_alerts_send(&db, recorder.clone(), &settings, clock.clone(), id)
            .await
            .is_err()
    );

    // Unknown subscription
    assert!(
        commands::cmd_alerts_send(&db, recorder, &settings, clock, 9999)
            .await
            .is_err()
    );
}

#[test]
fn test_cmd_snapshot() {
    let db = setup_test_db();
    let uid = seed_user(&db, "snap@example.com");
    seed_subscription(
        &db,
        uid,
        &subscription("Netflix", 15.0, BillingCycle::Monthly, date(2026, 3, 13)),
    );
    seed_user(&db, "empty@example.com");

    let clock = clock_on(date(2026, 3, 10));
    let recorded = commands::cmd_snapshot(&db, &rates(), clock.as_ref()).unwrap();
    assert_eq!(recorded, 2);

    let trend = db.monthly_trend(uid, 2026, 3, 1).unwrap();
    assert_eq!(trend.len(), 1);
    assert_eq!(trend[0].month, "2026-03");
    assert!((trend[0].amount - 15.0).abs() < 1e-9);
}

// ========== Database Tests ==========

#[test]
fn test_open_db_unencrypted_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cli.db");

    commands::cmd_init(&path, true).unwrap();
    let db = commands::open_db(&path, true).unwrap();
    seed_user(&db, "file@example.com");
    drop(db);

    let reopened = commands::open_db(&path, true).unwrap();
    assert_eq!(reopened.list_users().unwrap().len(), 1);
}

#[test]
fn test_load_settings_missing_file_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    assert!(commands::load_settings(Some(&missing)).is_err());
}
