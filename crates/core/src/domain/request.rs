use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::template::ApprovalPolicy;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApproverId(pub String);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Display for ApproverId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One approver slot snapshotted into a request. Slots are addressed by
/// their own id rather than a global user id, so the same person listed
/// twice in a template remains individually decidable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    pub id: ApproverId,
    pub user_name: String,
    pub role: String,
    pub decision: Decision,
    pub decided_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Pending,
    Approved,
    Rejected,
}

/// How a request was initiated. Workflow mode carries the approver and
/// policy snapshot, so a direct request structurally cannot hold
/// approvers and a template edit cannot reach an in-flight request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequestMode {
    Direct,
    Workflow { policy: ApprovalPolicy, approvers: Vec<Approver> },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnarchiveRequest {
    pub id: RequestId,
    pub document_id: DocumentId,
    pub document_title: String,
    pub document_category: String,
    pub mode: RequestMode,
    pub status: RequestStatus,
    pub reason: Option<String>,
    pub target_module: String,
    pub initiated_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finalized_at: Option<DateTime<Utc>>,
}

impl UnarchiveRequest {
    pub fn approvers(&self) -> &[Approver] {
        match &self.mode {
            RequestMode::Direct => &[],
            RequestMode::Workflow { approvers, .. } => approvers,
        }
    }

    pub fn policy(&self) -> Option<ApprovalPolicy> {
        match &self.mode {
            RequestMode::Direct => None,
            RequestMode::Workflow { policy, .. } => Some(*policy),
        }
    }

    pub fn approver(&self, id: &ApproverId) -> Option<&Approver> {
        self.approvers().iter().find(|approver| &approver.id == id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{
        Approver, ApproverId, Decision, DocumentId, RequestId, RequestMode, RequestStatus,
        UnarchiveRequest,
    };
    use crate::domain::template::ApprovalPolicy;

    fn workflow_request() -> UnarchiveRequest {
        let now = Utc::now();
        UnarchiveRequest {
            id: RequestId("REQ-1".to_string()),
            document_id: DocumentId("DOC-1".to_string()),
            document_title: "Supplier contract 2019".to_string(),
            document_category: "contracts".to_string(),
            mode: RequestMode::Workflow {
                policy: ApprovalPolicy::Majority,
                approvers: vec![Approver {
                    id: ApproverId("slot-1".to_string()),
                    user_name: "Alice".to_string(),
                    role: "records_officer".to_string(),
                    decision: Decision::Pending,
                    decided_at: None,
                    comment: None,
                }],
            },
            status: RequestStatus::Pending,
            reason: Some("legal hold lifted".to_string()),
            target_module: "contracts".to_string(),
            initiated_at: now,
            updated_at: now,
            finalized_at: None,
        }
    }

    #[test]
    fn direct_mode_has_no_approver_slots() {
        let mut request = workflow_request();
        request.mode = RequestMode::Direct;
        request.status = RequestStatus::Completed;

        assert!(request.approvers().is_empty());
        assert_eq!(request.policy(), None);
    }

    #[test]
    fn approver_lookup_is_by_slot_id() {
        let request = workflow_request();

        assert!(request.approver(&ApproverId("slot-1".to_string())).is_some());
        assert!(request.approver(&ApproverId("slot-9".to_string())).is_none());
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!RequestStatus::Pending.is_terminal());
        for status in [
            RequestStatus::Approved,
            RequestStatus::Rejected,
            RequestStatus::Completed,
            RequestStatus::Cancelled,
        ] {
            assert!(status.is_terminal());
        }
    }
}
