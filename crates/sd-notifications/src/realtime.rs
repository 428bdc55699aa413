//! Real-time events
//!
//! Events are addressed to one actor's channel or to everybody. Transport
//! (WebSocket, SSE) subscribes to a [`BroadcastHub`] and filters by target.

use chrono::{DateTime, Utc};
use sd_core::traits::Id;
use sd_models::{ActorRef, ApplicationStatus};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

#[derive(Debug, Error)]
pub enum BroadcastError {
    #[error("Broadcast channel closed")]
    Closed,
}

pub type BroadcastResult<T> = Result<T, BroadcastError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "actor")]
pub enum Target {
    Actor(ActorRef),
    All,
}

impl Target {
    pub fn includes(&self, actor: &ActorRef) -> bool {
        match self {
            Target::All => true,
            Target::Actor(target) => target == actor,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "payload")]
pub enum RealtimeEvent {
    #[serde(rename_all = "camelCase")]
    NewApplication {
        application_id: Id,
        index: String,
        issue: String,
        created_at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    AppAssigned {
        application_id: Id,
        employee_id: Id,
        employee_name: String,
    },
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        application_id: Id,
        new_status: ApplicationStatus,
        changed_by: String,
        timestamp: DateTime<Utc>,
        #[serde(skip_serializing_if = "Option::is_none")]
        employee_id: Option<Id>,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_id: Option<Id>,
    },
}

impl RealtimeEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RealtimeEvent::NewApplication { .. } => "newApplication",
            RealtimeEvent::AppAssigned { .. } => "appAssigned",
            RealtimeEvent::StatusChanged { .. } => "statusChanged",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub target: Target,
    pub event: RealtimeEvent,
}

pub trait Broadcaster: Send + Sync {
    fn publish(&self, target: Target, event: RealtimeEvent) -> BroadcastResult<()>;
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBroadcaster;

impl Broadcaster for NoopBroadcaster {
    fn publish(&self, _target: Target, _event: RealtimeEvent) -> BroadcastResult<()> {
        Ok(())
    }
}

/// In-process fan-out over a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastHub {
    sender: broadcast::Sender<Envelope>,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Broadcaster for BroadcastHub {
    fn publish(&self, target: Target, event: RealtimeEvent) -> BroadcastResult<()> {
        // send() errors when there are no receivers
        if self.sender.receiver_count() == 0 {
            tracing::trace!(event = event.name(), "No realtime subscribers");
            return Ok(());
        }
        self.sender
            .send(Envelope { target, event })
            .map(|_| ())
            .map_err(|_| BroadcastError::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assigned() -> RealtimeEvent {
        RealtimeEvent::AppAssigned {
            application_id: 1,
            employee_id: 2,
            employee_name: "Dilshod".into(),
        }
    }

    #[tokio::test]
    async fn test_hub_delivers_to_subscribers() {
        let hub = BroadcastHub::new(8);
        let mut rx = hub.subscribe();

        hub.publish(Target::Actor(ActorRef::employee(2)), assigned())
            .unwrap();
        let envelope = rx.recv().await.unwrap();
        assert!(envelope.target.includes(&ActorRef::employee(2)));
        assert!(!envelope.target.includes(&ActorRef::employee(3)));
        assert_eq!(envelope.event.name(), "appAssigned");
    }

    #[test]
    fn test_publish_without_subscribers() {
        let hub = BroadcastHub::new(8);
        assert!(hub.publish(Target::All, assigned()).is_ok());
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[test]
    fn test_event_wire_shape() {
        let json = serde_json::to_value(RealtimeEvent::StatusChanged {
            application_id: 5,
            new_status: ApplicationStatus::InProgress,
            changed_by: "Admin".into(),
            timestamp: Utc::now(),
            employee_id: None,
            user_id: Some(9),
        })
        .unwrap();
        assert_eq!(json["type"], "statusChanged");
        assert_eq!(json["payload"]["newStatus"], "inProgress");
        assert_eq!(json["payload"]["userId"], 9);
        assert!(json["payload"].get("employeeId").is_none());
    }
}
