//! Outbound email notifications.
//!
//! Services talk to a [`Notifier`]; which transport sits behind it is a
//! start-up decision (`mail_transport`): SMTP via lettre, the tracing log,
//! or an in-memory outbox used by tests.

use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::AppConfig;

/// Plain-text email ready to hand to a transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Notification delivery errors
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Notifier misconfigured: {0}")]
    Config(String),
}

/// Delivery seam for every outbound message
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotificationError>;
}

/// SMTP delivery through lettre's async transport
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpNotifier {
    pub fn new(
        host: &str,
        port: u16,
        credentials: Option<(String, String)>,
        from_address: String,
    ) -> Result<Self, NotificationError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?.port(port);
        if let Some((username, password)) = credentials {
            builder = builder.credentials(Credentials::new(username, password));
        }

        Ok(Self {
            mailer: builder.build(),
            from_address,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    #[instrument(skip(self, email), fields(to = %email.to, subject = %email.subject))]
    async fn send(&self, email: OutboundEmail) -> Result<(), NotificationError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotificationError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|_| NotificationError::InvalidAddress(email.to.clone()))?)
            .subject(email.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)?;

        self.mailer.send(message).await?;

        info!("Email sent successfully");
        Ok(())
    }
}

/// Writes messages to the log instead of delivering them
#[derive(Clone, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotificationError> {
        info!(to = %email.to, subject = %email.subject, body = %email.body, "outbound email (log transport)");
        Ok(())
    }
}

/// Keeps every message in memory; tests read confirmation tokens from here.
#[derive(Clone, Debug, Default)]
pub struct InMemoryNotifier {
    outbox: Arc<Mutex<Vec<OutboundEmail>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of delivered messages, oldest first
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.outbox.lock().map(|o| o.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, to: &str) -> Vec<OutboundEmail> {
        self.sent().into_iter().filter(|m| m.to == to).collect()
    }

    /// Makes subsequent sends fail, to exercise delivery error paths.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Notifier for InMemoryNotifier {
    async fn send(&self, email: OutboundEmail) -> Result<(), NotificationError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::Config(
                "in-memory transport set to fail".to_string(),
            ));
        }
        if let Ok(mut outbox) = self.outbox.lock() {
            outbox.push(email);
        }
        Ok(())
    }
}

/// Builds the notifier selected by `mail_transport`.
pub fn notifier_from_config(cfg: &AppConfig) -> Result<Arc<dyn Notifier>, NotificationError> {
    match cfg.mail_transport.to_ascii_lowercase().as_str() {
        "smtp" => {
            let host = cfg
                .smtp_host
                .as_deref()
                .filter(|h| !h.trim().is_empty())
                .ok_or_else(|| NotificationError::Config("smtp_host is not set".to_string()))?;
            let credentials = cfg.smtp_username.clone().zip(cfg.smtp_password.clone());
            info!(host = %host, port = cfg.smtp_port, "using SMTP mail transport");
            Ok(Arc::new(SmtpNotifier::new(
                host,
                cfg.smtp_port,
                credentials,
                cfg.mail_from.clone(),
            )?))
        }
        "memory" => Ok(Arc::new(InMemoryNotifier::new())),
        _ => Ok(Arc::new(LogNotifier)),
    }
}

/// One order line as shown in order emails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLine {
    pub name: String,
    pub shop: String,
    pub quantity: i32,
    pub price: i64,
}

pub fn registration_confirmation(to: &str, token: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: format!("Registration confirmation for {}", to),
        body: format!(
            "Welcome!\n\nUse this token to confirm your email address:\n\n{}\n",
            token
        ),
    }
}

pub fn password_reset(to: &str, token: &str) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: format!("Password reset token for {}", to),
        body: format!(
            "A password reset was requested for your account.\n\nReset token:\n\n{}\n\nIgnore this message if you did not ask for it.\n",
            token
        ),
    }
}

fn render_lines(lines: &[OrderLine], total: i64) -> String {
    let mut body = String::new();
    for line in lines {
        body.push_str(&format!(
            "  {} ({}) | {} x {} = {}\n",
            line.name,
            line.shop,
            line.quantity,
            line.price,
            i64::from(line.quantity) * line.price
        ));
    }
    body.push_str(&format!("Total: {}\n", total));
    body
}

/// Confirmation sent to the buyer after checkout
pub fn order_placed(to: &str, order_id: i32, lines: &[OrderLine], total: i64) -> OutboundEmail {
    OutboundEmail {
        to: to.to_string(),
        subject: "Order status update".to_string(),
        body: format!(
            "Your order #{} has been placed.\n\n{}",
            order_id,
            render_lines(lines, total)
        ),
    }
}

/// Operator notice about a freshly placed order
pub fn new_order_for_admin(
    admin: &str,
    buyer: &str,
    order_id: i32,
    lines: &[OrderLine],
    total: i64,
) -> OutboundEmail {
    OutboundEmail {
        to: admin.to_string(),
        subject: format!("New order #{}", order_id),
        body: format!(
            "Order #{} placed by {}.\n\n{}",
            order_id,
            buyer,
            render_lines(lines, total)
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines() -> Vec<OrderLine> {
        vec![
            OrderLine {
                name: "Widget".into(),
                shop: "Acme".into(),
                quantity: 2,
                price: 100,
            },
            OrderLine {
                name: "Gadget".into(),
                shop: "Acme".into(),
                quantity: 1,
                price: 250,
            },
        ]
    }

    #[test]
    fn order_emails_list_lines_and_total() {
        let email = order_placed("buyer@example.com", 12, &lines(), 450);
        assert_eq!(email.to, "buyer@example.com");
        assert!(email.body.contains("#12"));
        assert!(email.body.contains("Widget (Acme) | 2 x 100 = 200"));
        assert!(email.body.contains("Gadget (Acme) | 1 x 250 = 250"));
        assert!(email.body.ends_with("Total: 450\n"));

        let admin = new_order_for_admin("admin@example.com", "buyer@example.com", 12, &lines(), 450);
        assert_eq!(admin.subject, "New order #12");
        assert!(admin.body.contains("buyer@example.com"));
    }

    #[test]
    fn token_emails_carry_the_token() {
        assert!(registration_confirmation("a@b.c", "deadbeef")
            .body
            .contains("deadbeef"));
        assert!(password_reset("a@b.c", "r3set").body.contains("r3set"));
    }

    #[tokio::test]
    async fn in_memory_notifier_records_and_fails_on_demand() {
        let notifier = InMemoryNotifier::new();
        notifier
            .send(registration_confirmation("a@b.c", "t1"))
            .await
            .unwrap();
        assert_eq!(notifier.sent_to("a@b.c").len(), 1);

        notifier.set_failing(true);
        assert!(notifier
            .send(registration_confirmation("a@b.c", "t2"))
            .await
            .is_err());
        assert_eq!(notifier.sent().len(), 1);
    }

    #[test]
    fn log_transport_is_default() {
        let cfg = AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "development".into(),
        );
        assert!(notifier_from_config(&cfg).is_ok());
    }
}
