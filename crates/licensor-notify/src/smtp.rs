// SPDX-FileCopyrightText: 2026 Licensor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP delivery through lettre's async transport.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use licensor_core::{LicensorError, Notifier, SmtpSettings, SnIssuedNotice};
use licensor_storage::Database;
use licensor_storage::queries::settings;
use tracing::{debug, info};

use crate::template::{RenderedEmail, render_sn_issued};

fn notify_err(message: impl Into<String>) -> impl FnOnce(lettre::error::Error) -> LicensorError {
    let message = message.into();
    move |e| LicensorError::Notify {
        message,
        source: Some(Box::new(e)),
    }
}

/// Build the outgoing message from stored settings.
pub fn build_message(
    smtp: &SmtpSettings,
    to: &str,
    email: &RenderedEmail,
) -> Result<Message, LicensorError> {
    let from_address = if smtp.from_email.is_empty() {
        &smtp.username
    } else {
        &smtp.from_email
    };
    let from_address: Address = from_address.parse().map_err(|e| LicensorError::Notify {
        message: format!("invalid sender address '{from_address}'"),
        source: Some(Box::new(e)),
    })?;
    let to_address: Address = to.parse().map_err(|e| LicensorError::Notify {
        message: format!("invalid recipient address '{to}'"),
        source: Some(Box::new(e)),
    })?;
    let from_name = (!smtp.from_name.is_empty()).then(|| smtp.from_name.clone());

    Message::builder()
        .from(Mailbox::new(from_name, from_address))
        .to(Mailbox::new(None, to_address))
        .subject(email.subject.clone())
        .header(ContentType::TEXT_HTML)
        .body(email.html.clone())
        .map_err(notify_err("failed to build email"))
}

fn transport(
    smtp: &SmtpSettings,
    timeout: Duration,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, LicensorError> {
    let smtp_err = |e: lettre::transport::smtp::Error| LicensorError::Notify {
        message: format!("invalid SMTP relay '{}'", smtp.host),
        source: Some(Box::new(e)),
    };
    let builder = if smtp.use_tls {
        AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host).map_err(smtp_err)?
    } else if smtp.use_starttls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host).map_err(smtp_err)?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&smtp.host)
    };

    let mut builder = builder.port(smtp.port).timeout(Some(timeout));
    if !smtp.username.is_empty() {
        builder = builder.credentials(Credentials::new(
            smtp.username.clone(),
            smtp.password.clone(),
        ));
    }
    Ok(builder.build())
}

/// [`Notifier`] backed by the SMTP settings stored in the database.
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    db: Database,
    timeout: Duration,
}

impl SmtpNotifier {
    pub fn new(db: Database, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    async fn send(
        &self,
        smtp: &SmtpSettings,
        to: &str,
        email: &RenderedEmail,
    ) -> Result<(), LicensorError> {
        let message = build_message(smtp, to, email)?;
        let mailer = transport(smtp, self.timeout)?;
        match tokio::time::timeout(self.timeout, mailer.send(message)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(LicensorError::Notify {
                message: format!("SMTP delivery to {to} failed"),
                source: Some(Box::new(e)),
            }),
            Err(_) => Err(LicensorError::Timeout {
                duration: self.timeout,
            }),
        }
    }

    /// Send a fixed test message to `to`, even when notifications are disabled.
    pub async fn send_test(&self, to: &str) -> Result<(), LicensorError> {
        let smtp = settings::smtp(&self.db).await?;
        if smtp.host.is_empty() {
            return Err(LicensorError::Validation("SMTP host is not configured".to_string()));
        }
        let email = RenderedEmail {
            subject: "Licensor SMTP test".to_string(),
            html: "<p>SMTP settings are working.</p>".to_string(),
        };
        self.send(&smtp, to, &email).await?;
        info!(to = %to, "SMTP test email sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_sn_issued(&self, notice: &SnIssuedNotice) -> Result<(), LicensorError> {
        let smtp = settings::smtp(&self.db).await?;
        if !smtp.enabled || smtp.host.is_empty() {
            debug!(email = %notice.email, "SMTP disabled, skipping SN notification");
            return Ok(());
        }
        let email = render_sn_issued(notice);
        self.send(&smtp, &notice.email, &email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smtp() -> SmtpSettings {
        SmtpSettings {
            enabled: true,
            host: "smtp.example.com".into(),
            port: 587,
            username: "mailer@example.com".into(),
            password: "pw".into(),
            from_email: "noreply@example.com".into(),
            from_name: "Licensor".into(),
            use_tls: false,
            use_starttls: true,
        }
    }

    fn rendered() -> RenderedEmail {
        RenderedEmail {
            subject: "Subject".into(),
            html: "<p>hi</p>".into(),
        }
    }

    #[test]
    fn message_uses_from_name_and_address() {
        let message = build_message(&smtp(), "user@example.com", &rendered()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("From: Licensor <noreply@example.com>"));
        assert!(raw.contains("To: user@example.com"));
        assert!(raw.contains("Content-Type: text/html"));
    }

    #[test]
    fn sender_falls_back_to_username() {
        let mut settings = smtp();
        settings.from_email.clear();
        let message = build_message(&settings, "user@example.com", &rendered()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();
        assert!(raw.contains("mailer@example.com"));
    }

    #[test]
    fn bad_recipient_is_a_notify_error() {
        let err = build_message(&smtp(), "not an address", &rendered()).unwrap_err();
        assert!(matches!(err, LicensorError::Notify { .. }));
    }

    #[tokio::test]
    async fn disabled_smtp_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("n.db").to_str().unwrap())
            .await
            .unwrap();
        let notifier = SmtpNotifier::new(db, Duration::from_secs(1));
        let notice = SnIssuedNotice {
            email: "user@example.com".into(),
            sn: "SN".into(),
            expires_at: "2027-01-01".into(),
            days_left: 1,
            product_id: 0,
            product_name: "Licensor".into(),
        };
        notifier.send_sn_issued(&notice).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_requires_host() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("n.db").to_str().unwrap())
            .await
            .unwrap();
        let notifier = SmtpNotifier::new(db, Duration::from_secs(1));
        assert!(matches!(
            notifier.send_test("user@example.com").await.unwrap_err(),
            LicensorError::Validation(_)
        ));
    }
}
