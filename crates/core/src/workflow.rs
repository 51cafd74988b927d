use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::request::{
    Approver, ApproverId, Decision, DocumentId, RequestId, RequestMode, RequestStatus,
    UnarchiveRequest,
};
use crate::domain::template::{ApprovalPolicy, WorkflowTemplate};
use crate::errors::WorkflowError;

/// Caller-supplied fields for a new unarchive request. Template
/// resolution happens in the service layer; the engine only sees the
/// resolved template.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateRequestInput {
    pub document_id: DocumentId,
    pub document_title: String,
    pub document_category: String,
    pub reason: Option<String>,
    pub target_module: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    Reject,
}

/// Direct mode skips approval entirely: the request materializes
/// already completed, with no approver slots.
pub fn create_direct(
    input: CreateRequestInput,
    id: RequestId,
    now: DateTime<Utc>,
) -> UnarchiveRequest {
    UnarchiveRequest {
        id,
        document_id: input.document_id,
        document_title: input.document_title,
        document_category: input.document_category,
        mode: RequestMode::Direct,
        status: RequestStatus::Completed,
        reason: input.reason.filter(|reason| !reason.trim().is_empty()),
        target_module: input.target_module,
        initiated_at: now,
        updated_at: now,
        finalized_at: Some(now),
    }
}

pub fn create_workflow(
    input: CreateRequestInput,
    template: &WorkflowTemplate,
    id: RequestId,
    now: DateTime<Utc>,
) -> Result<UnarchiveRequest, WorkflowError> {
    let reason = input.reason.as_deref().map(str::trim).unwrap_or_default();
    if reason.is_empty() {
        return Err(WorkflowError::InvalidInput(
            "a non-empty reason is required for workflow mode".to_owned(),
        ));
    }
    if template.approvers.is_empty() {
        return Err(WorkflowError::InvalidInput(format!(
            "template `{}` has no approvers",
            template.id
        )));
    }

    Ok(UnarchiveRequest {
        id,
        document_id: input.document_id,
        document_title: input.document_title,
        document_category: input.document_category,
        mode: RequestMode::Workflow {
            policy: template.policy,
            approvers: snapshot_approvers(template),
        },
        status: RequestStatus::Pending,
        reason: Some(reason.to_owned()),
        target_module: input.target_module,
        initiated_at: now,
        updated_at: now,
        finalized_at: None,
    })
}

/// Copies the template blueprint into fresh approver slots. Each slot
/// gets its own id so the snapshot stays addressable even if the same
/// person appears twice in the blueprint.
fn snapshot_approvers(template: &WorkflowTemplate) -> Vec<Approver> {
    template
        .approvers
        .iter()
        .map(|blueprint| Approver {
            id: ApproverId(Uuid::new_v4().to_string()),
            user_name: blueprint.user_name.clone(),
            role: blueprint.role.clone(),
            decision: Decision::Pending,
            decided_at: None,
            comment: None,
        })
        .collect()
}

/// Records one approver's verdict and recomputes the aggregate status.
/// Returns a new request value; the input is never half-mutated.
pub fn record_decision(
    request: &UnarchiveRequest,
    approver_id: &ApproverId,
    verdict: Verdict,
    comment: Option<String>,
    now: DateTime<Utc>,
) -> Result<UnarchiveRequest, WorkflowError> {
    let mut updated = request.clone();

    let RequestMode::Workflow { policy, approvers } = &mut updated.mode else {
        return Err(WorkflowError::ApproverNotFound {
            request_id: request.id.clone(),
            approver_id: approver_id.clone(),
        });
    };
    let policy = *policy;

    let Some(slot) = approvers.iter_mut().find(|approver| &approver.id == approver_id) else {
        return Err(WorkflowError::ApproverNotFound {
            request_id: request.id.clone(),
            approver_id: approver_id.clone(),
        });
    };

    if request.status.is_terminal() {
        return Err(WorkflowError::AlreadyFinalized {
            id: request.id.clone(),
            status: request.status,
        });
    }

    if slot.decision != Decision::Pending {
        return Err(WorkflowError::AlreadyDecided {
            approver_id: slot.id.clone(),
            decision: slot.decision,
        });
    }

    let comment = match verdict {
        Verdict::Approve => comment.filter(|comment| !comment.trim().is_empty()),
        Verdict::Reject => {
            let comment = comment.unwrap_or_default();
            if comment.trim().is_empty() {
                return Err(WorkflowError::InvalidInput(
                    "a rejection requires a non-empty comment".to_owned(),
                ));
            }
            Some(comment)
        }
    };

    slot.decision = match verdict {
        Verdict::Approve => Decision::Approved,
        Verdict::Reject => Decision::Rejected,
    };
    slot.decided_at = Some(now);
    slot.comment = comment;

    let aggregate = aggregate(policy, approvers);
    updated.status = aggregate;
    updated.updated_at = now;
    if aggregate.is_terminal() {
        updated.finalized_at = Some(now);
    }

    Ok(updated)
}

/// The one authoritative aggregation of slot decisions into a request
/// status. Returns `Pending`, `Approved`, or `Rejected`.
///
/// Policy semantics:
/// - `Any`: one approval finalizes as approved. A rejection only
///   removes that slot from consideration; the request stays pending
///   until an approval arrives or every slot has rejected.
/// - `All`: every slot must approve; one rejection finalizes as
///   rejected immediately.
/// - `Majority`: strict majority either way. When all slots have
///   decided and neither side holds a strict majority, the request
///   finalizes as rejected: a tie never grants approval.
pub fn aggregate(policy: ApprovalPolicy, approvers: &[Approver]) -> RequestStatus {
    let total = approvers.len();
    let approved =
        approvers.iter().filter(|approver| approver.decision == Decision::Approved).count();
    let rejected =
        approvers.iter().filter(|approver| approver.decision == Decision::Rejected).count();

    match policy {
        ApprovalPolicy::Any => {
            if approved >= 1 {
                RequestStatus::Approved
            } else if rejected == total {
                RequestStatus::Rejected
            } else {
                RequestStatus::Pending
            }
        }
        ApprovalPolicy::All => {
            if rejected >= 1 {
                RequestStatus::Rejected
            } else if approved == total {
                RequestStatus::Approved
            } else {
                RequestStatus::Pending
            }
        }
        ApprovalPolicy::Majority => {
            if approved * 2 > total {
                RequestStatus::Approved
            } else if rejected * 2 > total {
                RequestStatus::Rejected
            } else if approved + rejected == total {
                RequestStatus::Rejected
            } else {
                RequestStatus::Pending
            }
        }
    }
}

/// Aborts a pending request. Partial decisions are preserved for
/// audit, not erased.
pub fn cancel(
    request: &UnarchiveRequest,
    now: DateTime<Utc>,
) -> Result<UnarchiveRequest, WorkflowError> {
    if request.status.is_terminal() {
        return Err(WorkflowError::AlreadyFinalized {
            id: request.id.clone(),
            status: request.status,
        });
    }

    let mut updated = request.clone();
    updated.status = RequestStatus::Cancelled;
    updated.updated_at = now;
    updated.finalized_at = Some(now);
    Ok(updated)
}
