//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod alerts;
pub mod audit;
pub mod health;
pub mod subscriptions;
pub mod users;
pub mod views;

// Re-export all handlers for use in router
pub use alerts::*;
pub use audit::*;
pub use health::*;
pub use subscriptions::*;
pub use users::*;
pub use views::*;
