use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink};
use crate::catalog::TemplateCatalog;
use crate::domain::request::{ApproverId, DocumentId, RequestId, RequestStatus, UnarchiveRequest};
use crate::domain::template::{TemplateId, WorkflowTemplate};
use crate::errors::{ApplicationError, WorkflowError};
use crate::outbound::{
    NoopNotificationSink, NoopRestorationSink, NotificationEvent, NotificationSink,
    RestorationIntent, RestorationSink,
};
use crate::store::{Mutation, RequestStore, StatusFilter};
use crate::workflow::{self, CreateRequestInput, Verdict};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreateMode {
    Direct,
    Workflow { template_id: TemplateId },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewRequest {
    pub document_id: DocumentId,
    pub document_title: String,
    pub document_category: String,
    pub mode: CreateMode,
    pub reason: Option<String>,
    pub target_module: String,
}

/// In-process API for the presentation layer. All mutation funnels
/// through the workflow engine inside the store's per-record critical
/// section; the service itself adds template resolution, outbound
/// intents, notifications, and audit.
///
/// Authorization is explicitly not handled here: verifying that the
/// caller actually is the named approver belongs to the calling layer.
pub struct UnarchiveService<S> {
    store: S,
    catalog: TemplateCatalog,
    restorations: Arc<dyn RestorationSink>,
    notifications: Arc<dyn NotificationSink>,
    audit: Arc<dyn AuditSink>,
}

impl<S> UnarchiveService<S>
where
    S: RequestStore,
{
    pub fn new(store: S, catalog: TemplateCatalog) -> Self {
        Self {
            store,
            catalog,
            restorations: Arc::new(NoopRestorationSink),
            notifications: Arc::new(NoopNotificationSink),
            audit: Arc::new(NoopAuditSink),
        }
    }

    pub fn with_restoration_sink(mut self, sink: Arc<dyn RestorationSink>) -> Self {
        self.restorations = sink;
        self
    }

    pub fn with_notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifications = sink;
        self
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn list_templates(&self) -> &[WorkflowTemplate] {
        self.catalog.list()
    }

    pub async fn create_request(
        &self,
        input: NewRequest,
    ) -> Result<UnarchiveRequest, ApplicationError> {
        let id = RequestId(Uuid::new_v4().to_string());
        let now = Utc::now();
        let fields = CreateRequestInput {
            document_id: input.document_id,
            document_title: input.document_title,
            document_category: input.document_category,
            reason: input.reason,
            target_module: input.target_module,
        };

        let request = match &input.mode {
            CreateMode::Direct => workflow::create_direct(fields, id, now),
            CreateMode::Workflow { template_id } => {
                let template = self.catalog.get(template_id).ok_or_else(|| {
                    WorkflowError::InvalidInput(format!(
                        "unknown workflow template `{template_id}`"
                    ))
                })?;
                workflow::create_workflow(fields, template, id, now)?
            }
        };

        self.store.insert(request.clone()).await?;

        tracing::info!(
            event_name = "request.created",
            request_id = %request.id,
            document_id = %request.document_id,
            status = ?request.status,
            "unarchive request created"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(request.id.clone()),
                Uuid::new_v4().to_string(),
                "request.created",
                AuditCategory::Request,
                "unarchive-service",
                AuditOutcome::Success,
            )
            .with_metadata("status", format!("{:?}", request.status)),
        );
        self.notifications.notify(NotificationEvent::RequestCreated {
            request_id: request.id.clone(),
            document_title: request.document_title.clone(),
        });

        if request.status == RequestStatus::Completed {
            self.emit_restoration(&request);
        }

        Ok(request)
    }

    pub async fn get_request(&self, id: &RequestId) -> Result<UnarchiveRequest, ApplicationError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| WorkflowError::RequestNotFound { id: id.clone() }.into())
    }

    pub async fn list_requests(
        &self,
        filter: StatusFilter,
    ) -> Result<Vec<UnarchiveRequest>, ApplicationError> {
        self.store.list(filter).await
    }

    pub async fn approve(
        &self,
        request_id: &RequestId,
        approver_id: &ApproverId,
        comment: Option<String>,
    ) -> Result<UnarchiveRequest, ApplicationError> {
        self.decide(request_id, approver_id, Verdict::Approve, comment).await
    }

    /// Unlike approval, rejection demands a non-empty comment; the
    /// engine enforces that contract.
    pub async fn reject(
        &self,
        request_id: &RequestId,
        approver_id: &ApproverId,
        comment: String,
    ) -> Result<UnarchiveRequest, ApplicationError> {
        self.decide(request_id, approver_id, Verdict::Reject, Some(comment)).await
    }

    pub async fn cancel(&self, request_id: &RequestId) -> Result<UnarchiveRequest, ApplicationError> {
        let now = Utc::now();
        let mutation: Mutation = Box::new(move |current| workflow::cancel(current, now));

        match self.store.update(request_id, mutation).await {
            Ok(updated) => {
                tracing::info!(
                    event_name = "request.cancelled",
                    request_id = %updated.id,
                    "unarchive request cancelled"
                );
                self.audit.emit(AuditEvent::new(
                    Some(updated.id.clone()),
                    Uuid::new_v4().to_string(),
                    "request.cancelled",
                    AuditCategory::Request,
                    "unarchive-service",
                    AuditOutcome::Success,
                ));
                self.notifications.notify(NotificationEvent::RequestFinalized {
                    request_id: updated.id.clone(),
                    status: updated.status,
                });
                Ok(updated)
            }
            Err(error) => {
                self.record_rejected_mutation(request_id, "request.cancel_rejected", &error);
                Err(error)
            }
        }
    }

    async fn decide(
        &self,
        request_id: &RequestId,
        approver_id: &ApproverId,
        verdict: Verdict,
        comment: Option<String>,
    ) -> Result<UnarchiveRequest, ApplicationError> {
        let now = Utc::now();
        let slot = approver_id.clone();
        let mutation: Mutation = Box::new(move |current| {
            workflow::record_decision(current, &slot, verdict, comment, now)
        });

        match self.store.update(request_id, mutation).await {
            Ok(updated) => {
                let decision = updated
                    .approver(approver_id)
                    .map(|approver| approver.decision)
                    .unwrap_or(crate::domain::request::Decision::Pending);

                tracing::info!(
                    event_name = "request.decision_recorded",
                    request_id = %updated.id,
                    approver_id = %approver_id,
                    decision = ?decision,
                    status = ?updated.status,
                    "approver decision recorded"
                );
                self.audit.emit(
                    AuditEvent::new(
                        Some(updated.id.clone()),
                        Uuid::new_v4().to_string(),
                        "request.decision_recorded",
                        AuditCategory::Decision,
                        "unarchive-service",
                        AuditOutcome::Success,
                    )
                    .with_metadata("approver_id", approver_id.0.clone())
                    .with_metadata("decision", format!("{decision:?}"))
                    .with_metadata("status", format!("{:?}", updated.status)),
                );
                self.notifications.notify(NotificationEvent::DecisionRecorded {
                    request_id: updated.id.clone(),
                    approver_id: approver_id.clone(),
                    decision,
                });

                if updated.status.is_terminal() {
                    tracing::info!(
                        event_name = "request.finalized",
                        request_id = %updated.id,
                        status = ?updated.status,
                        "unarchive request finalized"
                    );
                    self.notifications.notify(NotificationEvent::RequestFinalized {
                        request_id: updated.id.clone(),
                        status: updated.status,
                    });
                }
                if updated.status == RequestStatus::Approved {
                    self.emit_restoration(&updated);
                }

                Ok(updated)
            }
            Err(error) => {
                self.record_rejected_mutation(request_id, "request.decision_rejected", &error);
                Err(error)
            }
        }
    }

    fn emit_restoration(&self, request: &UnarchiveRequest) {
        tracing::info!(
            event_name = "request.restoration_emitted",
            request_id = %request.id,
            document_id = %request.document_id,
            target_module = %request.target_module,
            "restoration intent handed to document store"
        );
        self.restorations.emit(RestorationIntent {
            request_id: request.id.clone(),
            document_id: request.document_id.clone(),
            target_module: request.target_module.clone(),
        });
    }

    fn record_rejected_mutation(
        &self,
        request_id: &RequestId,
        event_type: &str,
        error: &ApplicationError,
    ) {
        tracing::warn!(
            event_name = event_type,
            request_id = %request_id,
            error = %error,
            "request mutation rejected"
        );
        self.audit.emit(
            AuditEvent::new(
                Some(request_id.clone()),
                Uuid::new_v4().to_string(),
                event_type,
                AuditCategory::Decision,
                "unarchive-service",
                AuditOutcome::Rejected,
            )
            .with_metadata("error", error.to_string()),
        );
    }
}
