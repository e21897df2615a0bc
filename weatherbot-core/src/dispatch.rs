use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    error::DeliveryError,
    model::{NotificationContent, Recipient},
};

/// A channel that can put one notification in front of one recipient.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send(
        &self,
        recipient: &Recipient,
        content: &NotificationContent,
    ) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAttempt {
    pub recipient: Recipient,
    pub outcome: DeliveryOutcome,
}

/// Outcome of one fan-out, in recipient order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub attempts: Vec<DeliveryAttempt>,
}

impl DeliveryReport {
    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }

    pub fn delivered(&self) -> usize {
        self.attempts
            .iter()
            .filter(|a| a.outcome == DeliveryOutcome::Delivered)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.attempts.len() - self.delivered()
    }
}

/// Fans a notification out to every recipient.
///
/// Each recipient gets exactly one attempt. A failure is logged and recorded
/// and the remaining recipients are still attempted.
#[derive(Clone)]
pub struct Dispatcher {
    messenger: Arc<dyn Messenger>,
}

impl Dispatcher {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }

    pub async fn deliver(
        &self,
        content: &NotificationContent,
        recipients: &[Recipient],
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();

        for recipient in recipients {
            let outcome = match self.messenger.send(recipient, content).await {
                Ok(()) => {
                    tracing::info!(%recipient, with_media = content.media.is_some(), "notification delivered");
                    DeliveryOutcome::Delivered
                }
                Err(err) => {
                    tracing::warn!(%recipient, error = %err, "delivery failed");
                    DeliveryOutcome::Failed(err.to_string())
                }
            };

            report.attempts.push(DeliveryAttempt {
                recipient: recipient.clone(),
                outcome,
            });
        }

        report
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}
