use crate::{
    config::{SmtpConfig, SmtpTlsConfig},
    Email, EmailError, EmailProvider, EmailResult,
};
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::time::Duration;
use tracing::{debug, error};

/// SMTP email provider using lettre
#[derive(Clone)]
pub struct SmtpProvider {
    config: SmtpConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpProvider {
    pub fn new(config: SmtpConfig) -> Result<Self, EmailError> {
        let mut builder = match config.tls {
            SmtpTlsConfig::Tls => AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
                .map_err(|e| EmailError::configuration(format!("Invalid SMTP host: {}", e)))?,
            SmtpTlsConfig::StartTls => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                    .map_err(|e| EmailError::configuration(format!("Invalid SMTP host: {}", e)))?
            }
            SmtpTlsConfig::None => {
                AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            }
        };

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        let transport = builder
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        Ok(Self { config, transport })
    }

    fn convert_email(&self, email: &Email) -> Result<Message, EmailError> {
        let mut builder = Message::builder()
            .from(email.from.parse().map_err(|e| {
                EmailError::validation("from", format!("Invalid from address: {}", e))
            })?)
            .subject(&email.subject);

        for to in &email.to {
            builder = builder.to(to
                .parse()
                .map_err(|e| EmailError::validation("to", format!("Invalid to address: {}", e)))?);
        }

        if let Some(reply_to) = &email.reply_to {
            builder = builder.reply_to(reply_to.parse().map_err(|e| {
                EmailError::validation("reply_to", format!("Invalid reply-to address: {}", e))
            })?);
        }

        match (&email.html_body, &email.text_body) {
            (Some(html), Some(text)) => Ok(builder.multipart(
                MultiPart::alternative()
                    .singlepart(SinglePart::plain(text.clone()))
                    .singlepart(SinglePart::html(html.clone())),
            )?),
            (Some(html), None) => Ok(builder.header(ContentType::TEXT_HTML).body(html.clone())?),
            (None, Some(text)) => Ok(builder.header(ContentType::TEXT_PLAIN).body(text.clone())?),
            (None, None) => Err(EmailError::validation(
                "body",
                "Email must have either HTML or text body",
            )),
        }
    }
}

#[async_trait]
impl EmailProvider for SmtpProvider {
    async fn send(&self, email: &Email) -> Result<EmailResult, EmailError> {
        email.validate()?;
        debug!("Sending email via SMTP: {} -> {:?}", email.from, email.to);

        let message = self.convert_email(email)?;
        match self.transport.send(message).await {
            Ok(response) => {
                let now = chrono::Utc::now();
                let message_id = response
                    .message()
                    .next()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("smtp-{}-{}", email.id, now.timestamp()));
                Ok(EmailResult {
                    email_id: email.id,
                    message_id,
                    sent_at: now,
                    provider: self.provider_name().to_string(),
                })
            }
            Err(e) => {
                error!("SMTP send to {:?} failed: {}", email.to, e);
                Err(e.into())
            }
        }
    }

    async fn validate_config(&self) -> Result<(), EmailError> {
        debug!(
            "Validating SMTP configuration for {}:{}",
            self.config.host, self.config.port
        );
        match self.transport.test_connection().await {
            Ok(true) => Ok(()),
            Ok(false) => Err(EmailError::provider(
                "SMTP",
                format!("{} did not accept the connection", self.config.host),
            )),
            Err(e) => Err(e.into()),
        }
    }

    fn provider_name(&self) -> &'static str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> SmtpProvider {
        SmtpProvider::new(SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: Some("mailer".to_string()),
            password: Some("secret".to_string()),
            tls: SmtpTlsConfig::StartTls,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_convert_multipart_email() {
        let email = Email::new()
            .from("Inkpost <blog@example.com>")
            .to("reader@example.com")
            .subject("Hello")
            .html_body("<p>Hi</p>")
            .text_body("Hi");
        let message = provider().convert_email(&email).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("Subject: Hello"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_rejected() {
        let email = Email::new()
            .from("blog@example.com")
            .to("not an address")
            .subject("Hello")
            .text_body("Hi");
        assert!(matches!(
            provider().convert_email(&email),
            Err(EmailError::Validation { ref field, .. }) if field == "to"
        ));
    }
}
