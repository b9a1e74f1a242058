use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::entities::{service::ServiceStatus, user::UserRole};

/// Domain events published after a transaction commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // Service request events
    ServiceCreated {
        service_id: i32,
        client_id: i32,
        vehicle_id: i32,
    },
    ServiceStatusChanged {
        service_id: i32,
        old_status: ServiceStatus,
        new_status: ServiceStatus,
        actor_id: i32,
    },
    ServiceAssigned {
        service_id: i32,
        employee_id: i32,
        previous_employee_id: Option<i32>,
    },
    ServiceDetailsUpdated {
        service_id: i32,
        actor_id: i32,
    },
    ServiceDeleted {
        service_id: i32,
        actor_id: i32,
    },

    // Vehicle events
    VehicleRegistered {
        vehicle_id: i32,
        owner_id: i32,
    },
    VehicleUpdated(i32),
    VehicleRemoved(i32),

    // User events
    UserCreated {
        user_id: i32,
        role: UserRole,
    },
    UserUpdated(i32),
    UserRoleChanged {
        user_id: i32,
        old_role: UserRole,
        new_role: UserRole,
    },
    UserActivationChanged {
        user_id: i32,
        active: bool,
    },
}

impl Event {
    /// Short, stable name used as a log field.
    pub fn name(&self) -> &'static str {
        match self {
            Event::ServiceCreated { .. } => "service.created",
            Event::ServiceStatusChanged { .. } => "service.status_changed",
            Event::ServiceAssigned { .. } => "service.assigned",
            Event::ServiceDetailsUpdated { .. } => "service.details_updated",
            Event::ServiceDeleted { .. } => "service.deleted",
            Event::VehicleRegistered { .. } => "vehicle.registered",
            Event::VehicleUpdated(_) => "vehicle.updated",
            Event::VehicleRemoved(_) => "vehicle.removed",
            Event::UserCreated { .. } => "user.created",
            Event::UserUpdated(_) => "user.updated",
            Event::UserRoleChanged { .. } => "user.role_changed",
            Event::UserActivationChanged { .. } => "user.activation_changed",
        }
    }
}

/// Envelope stamped when the event is handed to the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event: Event,
    pub emitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<EventEnvelope>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<EventEnvelope>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(EventEnvelope {
                event,
                emitted_at: Utc::now(),
            })
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event whose delivery must not fail the caller. The state
    /// change it describes is already committed.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "Event dropped after commit");
        }
    }
}

/// Handlers registered with [`process_events_with_handlers`].
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &EventEnvelope) -> Result<(), String>;
}

/// Logs every event until the channel closes.
pub async fn process_events(rx: mpsc::Receiver<EventEnvelope>) {
    process_events_with_handlers(rx, Vec::new()).await
}

/// Logs every event and fans it out to the given handlers. A failing handler
/// is logged and does not stop the loop.
pub async fn process_events_with_handlers(
    mut rx: mpsc::Receiver<EventEnvelope>,
    handlers: Vec<Arc<dyn EventHandler>>,
) {
    info!("Starting event processing loop");

    while let Some(envelope) = rx.recv().await {
        info!(
            event = envelope.event.name(),
            emitted_at = %envelope.emitted_at,
            payload = ?envelope.event,
            "Received event"
        );

        for handler in &handlers {
            if let Err(e) = handler.handle_event(&envelope).await {
                error!(
                    event = envelope.event.name(),
                    error = %e,
                    "Event handler failed"
                );
            }
        }
    }

    info!("Event channel closed; stopping event processing loop");
}
