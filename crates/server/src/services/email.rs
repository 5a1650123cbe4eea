//! Email service for magic link delivery.
//!
//! Uses SMTP via lettre with Askama templates. Without an SMTP block in the
//! configuration the link is written to the log instead, which is how local
//! development signs in.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use ez_apps_core::Email;

use crate::config::EmailConfig;

/// HTML template for the magic link email.
#[derive(Template)]
#[template(path = "email/magic_link.html")]
struct MagicLinkEmailHtml<'a> {
    name: &'a str,
    link: &'a str,
    ttl_minutes: i64,
}

/// Plain text template for the magic link email.
#[derive(Template)]
#[template(path = "email/magic_link.txt")]
struct MagicLinkEmailText<'a> {
    name: &'a str,
    link: &'a str,
    ttl_minutes: i64,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Clone)]
struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    smtp: Option<SmtpMailer>,
}

impl EmailService {
    /// Create a new email service.
    ///
    /// `None` builds a log-only service.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: Option<&EmailConfig>) -> Result<Self, SmtpError> {
        let Some(config) = config else {
            return Ok(Self::log_only());
        };

        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            smtp: Some(SmtpMailer {
                mailer,
                from_address: config.from_address.clone(),
            }),
        })
    }

    /// A service that logs messages instead of sending them.
    #[must_use]
    pub const fn log_only() -> Self {
        Self { smtp: None }
    }

    /// Send a sign-in link.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_magic_link(
        &self,
        to: &Email,
        name: &str,
        link: &str,
        ttl_minutes: i64,
    ) -> Result<(), EmailError> {
        let name = if name.trim().is_empty() { "there" } else { name };
        let html = MagicLinkEmailHtml {
            name,
            link,
            ttl_minutes,
        }
        .render()?;
        let text = MagicLinkEmailText {
            name,
            link,
            ttl_minutes,
        }
        .render()?;

        let Some(smtp) = &self.smtp else {
            tracing::warn!(to = %to, link = %link, "SMTP not configured, magic link not mailed");
            return Ok(());
        };

        smtp.send_multipart_email(to.as_str(), "Your EZ Apps sign-in link", &text, &html)
            .await
    }
}

impl SmtpMailer {
    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_link_templates_render_link() {
        let link = "https://api.ezapps.io/api/auth/verify?token=abc_DEF-123";
        let html = MagicLinkEmailHtml {
            name: "Ada",
            link,
            ttl_minutes: 15,
        }
        .render()
        .unwrap();
        let text = MagicLinkEmailText {
            name: "Ada",
            link,
            ttl_minutes: 15,
        }
        .render()
        .unwrap();

        assert!(html.contains("Hi Ada"));
        assert!(html.contains("token=abc_DEF-123"));
        assert!(text.contains(link));
        assert!(text.contains("15 minutes"));
    }

    #[tokio::test]
    async fn test_log_only_service_succeeds() {
        let service = EmailService::log_only();
        let to = Email::parse("merchant@example.com").unwrap();
        assert!(
            service
                .send_magic_link(&to, "", "https://api.ezapps.io/api/auth/verify?token=x", 15)
                .await
                .is_ok()
        );
    }
}
