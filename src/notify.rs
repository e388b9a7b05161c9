//! Outbound notification of the batch report.
//!
//! Escalation is best-effort: a delivery failure is logged by the caller and
//! never retried.

use chrono::{DateTime, Utc};
use lettre::message::Mailbox;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid mail address `{raw}`: {reason}")]
    Address { raw: String, reason: String },
    #[error("failed to compose mail: {reason}")]
    Compose { reason: String },
    #[error("failed to send mail via `{relay}`: {reason}")]
    Transport { relay: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct MailMessage {
    pub subject: String,
    pub from_name: String,
    pub from_address: String,
    pub to_name: String,
    pub to_address: String,
    pub sent_at: DateTime<Utc>,
    pub body: String,
}

pub trait Notifier {
    fn send(&self, message: &MailMessage) -> Result<(), NotifyError>;
}

pub struct SmtpNotifier {
    relay: String,
}

impl SmtpNotifier {
    pub fn new(relay: impl Into<String>) -> Self {
        Self {
            relay: relay.into(),
        }
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, message: &MailMessage) -> Result<(), NotifyError> {
        let from = mailbox(&message.from_name, &message.from_address)?;
        let to = mailbox(&message.to_name, &message.to_address)?;
        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone())
            .date(message.sent_at.into())
            .body(message.body.clone())
            .map_err(|e| NotifyError::Compose {
                reason: e.to_string(),
            })?;

        let mailer = SmtpTransport::relay(&self.relay)
            .map_err(|e| NotifyError::Transport {
                relay: self.relay.clone(),
                reason: e.to_string(),
            })?
            .build();
        mailer.send(&email).map_err(|e| NotifyError::Transport {
            relay: self.relay.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

fn mailbox(name: &str, address: &str) -> Result<Mailbox, NotifyError> {
    let raw = if name.is_empty() {
        address.to_string()
    } else {
        format!("{name} <{address}>")
    };
    raw.parse().map_err(|e| NotifyError::Address {
        raw,
        reason: format!("{e}"),
    })
}
