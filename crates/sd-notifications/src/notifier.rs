//! Fire-and-forget notification of committed workflow changes

use std::sync::Arc;

use sd_models::{Actor, ActorRef, Application};

use crate::messages;
use crate::realtime::{Broadcaster, NoopBroadcaster, RealtimeEvent, Target};
use crate::sink::{DisabledSink, NotificationSink};

/// How chat messages are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Spawned onto the runtime; the caller never waits
    Background,
    /// Awaited in place (tests)
    Inline,
}

#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn NotificationSink>,
    chat_id: Option<String>,
    broadcaster: Arc<dyn Broadcaster>,
    delivery: Delivery,
}

impl Notifier {
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        chat_id: Option<String>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            sink,
            chat_id,
            broadcaster,
            delivery: Delivery::Background,
        }
    }

    /// Notifier that awaits chat delivery before returning
    pub fn inline(
        sink: Arc<dyn NotificationSink>,
        chat_id: Option<String>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            delivery: Delivery::Inline,
            ..Self::new(sink, chat_id, broadcaster)
        }
    }

    /// Sends nothing anywhere
    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledSink), None, Arc::new(NoopBroadcaster))
    }

    pub fn delivery(&self) -> Delivery {
        self.delivery
    }

    pub async fn application_created(&self, application: &Application) {
        self.broadcast(
            Target::All,
            RealtimeEvent::NewApplication {
                application_id: application.id,
                index: application.index.clone(),
                issue: application.issue.clone(),
                created_at: application.created_at,
            },
        );
        self.chat(messages::created(application)).await;
    }

    pub async fn application_assigned(&self, application: &Application, employees: &[Actor]) {
        for employee in employees {
            self.broadcast(
                Target::Actor(employee.reference),
                RealtimeEvent::AppAssigned {
                    application_id: application.id,
                    employee_id: employee.id(),
                    employee_name: employee.name.clone(),
                },
            );
        }
        self.chat(messages::assigned(application, employees)).await;
    }

    pub async fn status_changed(&self, application: &Application, by: &Actor) {
        self.broadcast_status(application, by);
        self.chat(messages::status_changed(application, by)).await;
    }

    pub async fn deadline_extended(&self, application: &Application, by: &Actor, reason: &str) {
        self.chat(messages::deadline_extended(application, by, reason))
            .await;
    }

    pub async fn application_completed(&self, application: &Application, by: &Actor) {
        self.broadcast_status(application, by);
        self.chat(messages::completed(application, by)).await;
    }

    /// Status events go to the filing user and every assigned employee
    fn broadcast_status(&self, application: &Application, by: &Actor) {
        let timestamp = application.updated_at;
        let event = |employee_id, user_id| RealtimeEvent::StatusChanged {
            application_id: application.id,
            new_status: application.status,
            changed_by: by.name.clone(),
            timestamp,
            employee_id,
            user_id,
        };

        self.broadcast(
            Target::Actor(ActorRef::user(application.user_id)),
            event(None, Some(application.user_id)),
        );
        for employee_id in &application.assigned_to {
            self.broadcast(
                Target::Actor(ActorRef::employee(*employee_id)),
                event(Some(*employee_id), None),
            );
        }
    }

    fn broadcast(&self, target: Target, event: RealtimeEvent) {
        let name = event.name();
        if let Err(e) = self.broadcaster.publish(target, event) {
            tracing::warn!(event = name, error = %e, "Realtime broadcast failed");
        }
    }

    async fn chat(&self, text: String) {
        let Some(chat_id) = self.chat_id.clone() else {
            tracing::debug!("Chat notifications not configured");
            return;
        };
        if !self.sink.is_enabled() {
            return;
        }

        match self.delivery {
            Delivery::Inline => deliver(self.sink.as_ref(), &chat_id, &text).await,
            Delivery::Background => {
                let sink = self.sink.clone();
                tokio::spawn(async move {
                    deliver(sink.as_ref(), &chat_id, &text).await;
                });
            }
        }
    }
}

async fn deliver(sink: &dyn NotificationSink, chat_id: &str, text: &str) {
    if let Err(e) = sink.send(chat_id, text).await {
        tracing::warn!(chat_id, error = %e, "Chat notification failed");
    }
}
