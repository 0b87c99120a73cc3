mod memory;
mod smtp;

pub use memory::MemoryProvider;
pub use smtp::SmtpProvider;

use crate::{EmailConfig, EmailError, EmailProvider};
use std::sync::Arc;

/// SMTP when a host is configured, otherwise the logging in-memory provider
pub fn provider_from_config(config: &EmailConfig) -> Result<Arc<dyn EmailProvider>, EmailError> {
    match &config.smtp {
        Some(smtp) => Ok(Arc::new(SmtpProvider::new(smtp.clone())?)),
        None => {
            tracing::info!("SMTP_HOST not set, outgoing e-mail is logged instead of delivered");
            Ok(Arc::new(MemoryProvider::new()))
        }
    }
}
