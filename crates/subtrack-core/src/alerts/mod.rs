//! Renewal alerts
//!
//! - `policy` decides, purely, whether a subscription is due a reminder
//! - `message` renders the reminder
//! - `transport` delivers it (HTTP email API, SMTP, or log only)
//! - `scheduler` runs the daily batch and manual sends

pub mod message;
pub mod policy;
pub mod scheduler;
pub mod transport;

pub use message::AlertPayload;
pub use policy::{evaluate, evaluate_manual, AlertDecision, SkipReason};
pub use scheduler::{
    AlertItemResult, AlertItemStatus, AlertPreview, AlertRunReport, AlertScheduler, AlertStore,
};
pub use transport::{
    transport_from_config, AlertTransport, EmailMessage, HttpEmailTransport, LogTransport,
    SmtpEmailTransport, TransportError, TransportReceipt,
};
