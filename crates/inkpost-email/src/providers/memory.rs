use crate::{Email, EmailError, EmailProvider, EmailResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Records messages instead of delivering them.
///
/// Used when no SMTP host is configured and throughout the test suites.
/// Clones share the same mailbox.
#[derive(Clone, Default)]
pub struct MemoryProvider {
    sent: Arc<Mutex<Vec<Email>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, address: &str) -> Vec<Email> {
        self.sent
            .lock()
            .iter()
            .filter(|email| email.to.iter().any(|to| to == address))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }

    /// Make subsequent sends fail with a provider error
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl EmailProvider for MemoryProvider {
    async fn send(&self, email: &Email) -> Result<EmailResult, EmailError> {
        email.validate()?;
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmailError::provider("memory", "delivery disabled"));
        }

        info!(
            email_id = %email.id,
            to = ?email.to,
            subject = %email.subject,
            "email captured by memory provider"
        );
        self.sent.lock().push(email.clone());

        Ok(EmailResult {
            email_id: email.id,
            message_id: format!("memory-{}", email.id),
            sent_at: chrono::Utc::now(),
            provider: self.provider_name().to_string(),
        })
    }

    async fn validate_config(&self) -> Result<(), EmailError> {
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
