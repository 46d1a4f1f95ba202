//! services/api/src/adapters/email.rs
//!
//! An `EmailSender` that records outgoing mail in the log instead of delivering it.

use async_trait::async_trait;
use bookstore_core::ports::{EmailSender, PortResult};
use tracing::info;

#[derive(Clone, Debug)]
pub struct LogEmailSender {
    from: String,
}

impl LogEmailSender {
    pub fn new(from: Option<String>) -> Self {
        Self {
            from: from.unwrap_or_else(|| "no-reply@bookstore.local".to_string()),
        }
    }
}

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, to: &str, subject: &str, body: &str) -> PortResult<()> {
        info!(
            from = %self.from,
            to,
            subject,
            chars = body.len(),
            "Outgoing e-mail"
        );
        Ok(())
    }
}
