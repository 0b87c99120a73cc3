//! # inkpost-email
//!
//! Outgoing e-mail for the blog: the [`Email`] message type, the
//! [`EmailProvider`] abstraction with SMTP and in-memory implementations,
//! and the tera templates for subscriber mail.

pub mod config;
pub mod error;
pub mod providers;
pub mod templates;

pub use config::{EmailConfig, SmtpConfig, SmtpTlsConfig};
pub use error::EmailError;
pub use providers::{provider_from_config, MemoryProvider, SmtpProvider};
pub use templates::{EmailTemplates, FeaturedPost, SiteInfo};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Core email message structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Email {
    /// Unique identifier for tracking
    pub id: Uuid,
    /// Sender, either `addr@host` or `Name <addr@host>`
    pub from: String,
    pub to: Vec<String>,
    pub reply_to: Option<String>,
    pub subject: String,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
}

impl Email {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            from: String::new(),
            to: Vec::new(),
            reply_to: None,
            subject: String::new(),
            html_body: None,
            text_body: None,
        }
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    /// Add recipient
    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.to.push(to.into());
        self
    }

    pub fn reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn html_body(mut self, html: impl Into<String>) -> Self {
        self.html_body = Some(html.into());
        self
    }

    pub fn text_body(mut self, text: impl Into<String>) -> Self {
        self.text_body = Some(text.into());
        self
    }

    /// Structural checks shared by every provider
    pub fn validate(&self) -> Result<(), EmailError> {
        if self.from.trim().is_empty() {
            return Err(EmailError::validation("from", "Sender is required"));
        }
        if self.to.is_empty() {
            return Err(EmailError::validation("to", "At least one recipient is required"));
        }
        if self.subject.trim().is_empty() {
            return Err(EmailError::validation("subject", "Subject is required"));
        }
        if self.html_body.is_none() && self.text_body.is_none() {
            return Err(EmailError::validation(
                "body",
                "Email must have either HTML or text body",
            ));
        }
        Ok(())
    }
}

impl Default for Email {
    fn default() -> Self {
        Self::new()
    }
}

/// Email provider abstraction
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send an email immediately
    async fn send(&self, email: &Email) -> Result<EmailResult, EmailError>;

    async fn validate_config(&self) -> Result<(), EmailError>;

    fn provider_name(&self) -> &'static str;
}

/// Email sending result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailResult {
    pub email_id: Uuid,
    /// Provider-specific message ID
    pub message_id: String,
    pub sent_at: chrono::DateTime<chrono::Utc>,
    pub provider: String,
}
