pub mod audit;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod outbound;
pub mod service;
pub mod store;
pub mod workflow;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use catalog::{CatalogError, TemplateCatalog};
pub use domain::request::{
    Approver, ApproverId, Decision, DocumentId, RequestId, RequestMode, RequestStatus,
    UnarchiveRequest,
};
pub use domain::template::{ApprovalPolicy, TemplateApprover, TemplateId, WorkflowTemplate};
pub use errors::{ApplicationError, InterfaceError, WorkflowError};
pub use outbound::{
    InMemoryNotificationSink, InMemoryRestorationSink, NotificationEvent, NotificationSink,
    RestorationIntent, RestorationSink,
};
pub use service::{CreateMode, NewRequest, UnarchiveService};
pub use store::{InMemoryRequestStore, Mutation, RequestStore, StatusFilter};
pub use workflow::{CreateRequestInput, Verdict};
