//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (open_db, load_settings, resolve_user) and init
//! - `users` - User management commands (add, list, prefs)
//! - `subscriptions` - Subscription management commands (list, add, status, delete)
//! - `views` - Calendar, upcoming payments and analytics
//! - `alerts` - Alert run, manual send and spend snapshots
//! - `serve` - Web server command

pub mod alerts;
pub mod core;
pub mod serve;
pub mod subscriptions;
pub mod users;
pub mod views;

// Re-export command functions for main.rs
pub use alerts::*;
pub use core::*;
pub use serve::*;
pub use subscriptions::*;
pub use users::*;
pub use views::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Format an amount with its currency code
pub fn money(amount: f64, currency: &str) -> String {
    format!("{:.2} {}", amount, currency)
}
