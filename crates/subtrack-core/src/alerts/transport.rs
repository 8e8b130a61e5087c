//! Notification transports
//!
//! - `HttpEmailTransport` posts to a transactional email API (Resend-style
//!   JSON body, bearer key, `Idempotency-Key` header)
//! - `SmtpEmailTransport` relays through an SMTP server with STARTTLS
//! - `LogTransport` only logs, for development and dry runs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{Secrets, TransportKind, TransportSettings};
use crate::error::{Error, Result};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),

    /// The provider refused the message (4xx); retrying will not help
    #[error("Rejected by provider: {0}")]
    Rejected(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Send timed out: {0}")]
    Timeout(String),
}

/// A rendered notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
    /// Stable per logical alert so providers can drop duplicates
    pub idempotency_key: String,
}

/// Provider acknowledgement of an accepted message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportReceipt {
    pub message_id: Option<String>,
}

#[async_trait]
pub trait AlertTransport: Send + Sync {
    async fn send(
        &self,
        message: &EmailMessage,
    ) -> std::result::Result<TransportReceipt, TransportError>;

    /// Short name for logs and health output
    fn name(&self) -> &'static str;
}

/// Build the transport selected in config, taking credentials from `secrets`
pub fn transport_from_config(
    settings: &TransportSettings,
    secrets: &Secrets,
) -> Result<Arc<dyn AlertTransport>> {
    match settings.kind {
        TransportKind::Log => Ok(Arc::new(LogTransport)),
        TransportKind::Http => {
            let api_key = secrets.email_api_key.clone().ok_or_else(|| {
                TransportError::NotConfigured(format!(
                    "transport kind \"http\" requires {}",
                    crate::config::EMAIL_API_KEY_ENV
                ))
            })?;
            Ok(Arc::new(HttpEmailTransport::new(
                &settings.api_url,
                &api_key,
                &sender(settings),
            )?))
        }
        TransportKind::Smtp => {
            let (user, password) = match (&secrets.smtp_user, &secrets.smtp_password) {
                (Some(user), Some(password)) => (user.clone(), password.clone()),
                _ => {
                    return Err(TransportError::NotConfigured(format!(
                        "transport kind \"smtp\" requires {} and {}",
                        crate::config::SMTP_USER_ENV,
                        crate::config::SMTP_PASSWORD_ENV
                    ))
                    .into())
                }
            };
            Ok(Arc::new(SmtpEmailTransport::new(
                &settings.smtp_host,
                settings.smtp_port,
                &user,
                &password,
                &sender(settings),
            )?))
        }
    }
}

fn sender(settings: &TransportSettings) -> String {
    format!("{} <{}>", settings.from_name, settings.from_email)
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: Option<String>,
}

/// Transactional email over HTTP
#[derive(Clone)]
pub struct HttpEmailTransport {
    http_client: Client,
    api_url: String,
    api_key: String,
    from: String,
}

impl HttpEmailTransport {
    pub fn new(api_url: &str, api_key: &str, from: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http_client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
        })
    }
}

#[async_trait]
impl AlertTransport for HttpEmailTransport {
    async fn send(
        &self,
        message: &EmailMessage,
    ) -> std::result::Result<TransportReceipt, TransportError> {
        if !message.to.contains('@') {
            return Err(TransportError::InvalidRecipient(message.to.clone()));
        }

        let request = SendEmailRequest {
            from: &self.from,
            to: [&message.to],
            subject: &message.subject,
            text: &message.text,
            html: &message.html,
        };

        let response = self
            .http_client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Idempotency-Key", &message.idempotency_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(e.to_string())
                } else {
                    TransportError::SendFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Rejected(format!("{}: {}", status, body)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::SendFailed(format!("{}: {}", status, body)));
        }

        // Some providers return an empty body; the send still counts
        let message_id = response
            .json::<SendEmailResponse>()
            .await
            .ok()
            .and_then(|r| r.id);

        debug!(to = %message.to, ?message_id, "Email accepted by API");
        Ok(TransportReceipt { message_id })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// SMTP relay with STARTTLS
pub struct SmtpEmailTransport {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailTransport {
    pub fn new(host: &str, port: u16, user: &str, password: &str, from: &str) -> Result<Self> {
        let creds = Credentials::new(user.to_string(), password.to_string());

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| Error::Config(format!("Failed to create SMTP relay: {}", e)))?
            .port(port)
            .credentials(creds)
            .build();

        let from: Mailbox = from
            .parse()
            .map_err(|e| Error::Config(format!("Invalid from address: {}", e)))?;

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl AlertTransport for SmtpEmailTransport {
    async fn send(
        &self,
        message: &EmailMessage,
    ) -> std::result::Result<TransportReceipt, TransportError> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| TransportError::InvalidRecipient(format!("{}: {}", message.to, e)))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(message.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(message.html.clone()),
                    ),
            )
            .map_err(|e| TransportError::SendFailed(format!("Failed to build message: {}", e)))?;

        let response = self.transport.send(email).await.map_err(|e| {
            if e.is_permanent() {
                TransportError::Rejected(e.to_string())
            } else {
                TransportError::SendFailed(e.to_string())
            }
        })?;

        let message_id = response.message().next().map(|s| s.to_string());
        Ok(TransportReceipt { message_id })
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

/// Logs each message instead of delivering it
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

#[async_trait]
impl AlertTransport for LogTransport {
    async fn send(
        &self,
        message: &EmailMessage,
    ) -> std::result::Result<TransportReceipt, TransportError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Alert email (log transport, not delivered)"
        );
        let short_key: String = message.idempotency_key.chars().take(12).collect();
        Ok(TransportReceipt {
            message_id: Some(format!("log-{}", short_key)),
        })
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
