//! Outbound e-mail providers.
//!
//! [`ConsoleMailer`] logs messages for development; [`SmtpMailer`] sends
//! real mail via SMTP. Both are fire-and-forget from the caller's point of
//! view - delivery failures are logged upstream, never propagated into the
//! payment flow.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use rifa_core::error::{CoreError, Result};
use rifa_core::notify::{Notification, Notifier};
use rifa_core::types::TicketNumber;

fn render(notification: &Notification) -> (String, String, String) {
    match notification {
        Notification::PaymentApproved {
            to,
            raffle_name,
            numbers,
        } => {
            let list = numbers
                .iter()
                .map(TicketNumber::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            (
                to.clone(),
                format!("Your numbers for {raffle_name} are confirmed"),
                format!(
                    "Payment received! Your numbers for {raffle_name}: {list}.\n\
                     Good luck on draw day."
                ),
            )
        }
    }
}

/// Console e-mail provider for development and testing.
///
/// Logs the rendered message instead of sending it.
#[derive(Clone, Debug, Default)]
pub struct ConsoleMailer;

impl ConsoleMailer {
    /// Create a new console mailer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for ConsoleMailer {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let (to, subject, body) = render(notification);
        tracing::info!(
            to = %to,
            subject = %subject,
            body = %body,
            "e-mail (console mode)"
        );
        Ok(())
    }
}

/// SMTP e-mail provider using Lettre.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    /// Create an SMTP mailer against `host` with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Upstream`] if the relay configuration is
    /// invalid.
    pub fn new(host: &str, username: String, password: String, from: String) -> Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| CoreError::Upstream(format!("invalid SMTP relay: {e}")))?
            .credentials(Credentials::new(username, password))
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl Notifier for SmtpMailer {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        let (to, subject, body) = render(notification);

        let message = Message::builder()
            .from(
                self.from
                    .parse()
                    .map_err(|e| CoreError::Upstream(format!("invalid sender address: {e}")))?,
            )
            .to(to
                .parse()
                .map_err(|e| CoreError::Upstream(format!("invalid recipient address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| CoreError::Upstream(format!("failed to build message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| CoreError::Upstream(format!("SMTP send failed: {e}")))?;

        Ok(())
    }
}
