//! Domain event publishing.

use async_trait::async_trait;
use tracing::{debug, error};

use crate::domain::events::DomainEvent;

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publishes events best-effort; failures are logged, never surfaced to callers.
    async fn publish(&self, events: Vec<DomainEvent>);
}

/// Publishes JSON-encoded events to NATS.
pub struct NatsPublisher {
    client: async_nats::Client,
}

impl NatsPublisher {
    pub fn new(client: async_nats::Client) -> Self { Self { client } }
}

#[async_trait]
impl EventPublisher for NatsPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            let subject = event.subject();
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => {
                    error!(%subject, error = %e, "failed to encode event");
                    continue;
                }
            };
            if let Err(e) = self.client.publish(subject.clone(), payload.into()).await {
                error!(%subject, error = %e, "failed to publish event");
            }
        }
    }
}

/// Used when no broker is configured.
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            debug!(subject = %event.subject(), ?event, "domain event");
        }
    }
}
