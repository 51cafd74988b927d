//! Boundaries to the document-management and notification
//! collaborators. The core emits intents and alerts; it never checks
//! that either side acted on them.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::domain::request::{ApproverId, Decision, DocumentId, RequestId, RequestStatus};

/// Instruction for the document store to move a document out of the
/// archive. Emitted once per request, on approval or direct completion.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestorationIntent {
    pub request_id: RequestId,
    pub document_id: DocumentId,
    pub target_module: String,
}

pub trait RestorationSink: Send + Sync {
    fn emit(&self, intent: RestorationIntent);
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationEvent {
    RequestCreated { request_id: RequestId, document_title: String },
    DecisionRecorded { request_id: RequestId, approver_id: ApproverId, decision: Decision },
    RequestFinalized { request_id: RequestId, status: RequestStatus },
}

/// Fire-and-forget user-facing alerts; no response is expected.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: NotificationEvent);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRestorationSink;

impl RestorationSink for NoopRestorationSink {
    fn emit(&self, _intent: RestorationIntent) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotificationSink;

impl NotificationSink for NoopNotificationSink {
    fn notify(&self, _event: NotificationEvent) {}
}

#[derive(Clone, Default)]
pub struct InMemoryRestorationSink {
    intents: Arc<Mutex<Vec<RestorationIntent>>>,
}

impl InMemoryRestorationSink {
    pub fn intents(&self) -> Vec<RestorationIntent> {
        match self.intents.lock() {
            Ok(intents) => intents.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl RestorationSink for InMemoryRestorationSink {
    fn emit(&self, intent: RestorationIntent) {
        match self.intents.lock() {
            Ok(mut intents) => intents.push(intent),
            Err(poisoned) => poisoned.into_inner().push(intent),
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryNotificationSink {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
}

impl InMemoryNotificationSink {
    pub fn events(&self) -> Vec<NotificationEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationSink for InMemoryNotificationSink {
    fn notify(&self, event: NotificationEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
