use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::request::{RequestId, RequestStatus, UnarchiveRequest};
use crate::errors::{ApplicationError, WorkflowError};

/// Synchronous read-modify-write applied inside the backend's
/// per-record critical section. The closure sees the current record
/// and returns the replacement, or a workflow error that aborts the
/// update with nothing written.
pub type Mutation = Box<dyn FnOnce(&UnarchiveRequest) -> Result<UnarchiveRequest, WorkflowError> + Send>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Pending,
    Finalized,
}

impl StatusFilter {
    pub fn matches(self, status: RequestStatus) -> bool {
        match self {
            Self::All => true,
            Self::Pending => status == RequestStatus::Pending,
            Self::Finalized => status.is_terminal(),
        }
    }
}

/// Sole point of truth for unarchive requests. Backends must apply
/// `update` atomically per record: two concurrent mutations of the
/// same request may never interleave between read and write.
/// Requests are independent, so no cross-record coordination is
/// required.
#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert(&self, request: UnarchiveRequest) -> Result<(), ApplicationError>;

    async fn find_by_id(
        &self,
        id: &RequestId,
    ) -> Result<Option<UnarchiveRequest>, ApplicationError>;

    /// Lists matching requests, newest first by `initiated_at`.
    async fn list(&self, filter: StatusFilter) -> Result<Vec<UnarchiveRequest>, ApplicationError>;

    async fn update(
        &self,
        id: &RequestId,
        mutation: Mutation,
    ) -> Result<UnarchiveRequest, ApplicationError>;
}

/// Map-backed store for tests and the offline smoke path. The mutex
/// doubles as the per-record critical section.
#[derive(Default)]
pub struct InMemoryRequestStore {
    requests: Mutex<HashMap<String, UnarchiveRequest>>,
}

impl InMemoryRequestStore {
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, UnarchiveRequest>> {
        match self.requests.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn insert(&self, request: UnarchiveRequest) -> Result<(), ApplicationError> {
        let mut requests = self.lock();
        requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &RequestId,
    ) -> Result<Option<UnarchiveRequest>, ApplicationError> {
        let requests = self.lock();
        Ok(requests.get(&id.0).cloned())
    }

    async fn list(&self, filter: StatusFilter) -> Result<Vec<UnarchiveRequest>, ApplicationError> {
        let requests = self.lock();
        let mut matching: Vec<UnarchiveRequest> =
            requests.values().filter(|request| filter.matches(request.status)).cloned().collect();
        matching.sort_by(|left, right| right.initiated_at.cmp(&left.initiated_at));
        Ok(matching)
    }

    async fn update(
        &self,
        id: &RequestId,
        mutation: Mutation,
    ) -> Result<UnarchiveRequest, ApplicationError> {
        let mut requests = self.lock();
        let current = requests
            .get(&id.0)
            .ok_or_else(|| WorkflowError::RequestNotFound { id: id.clone() })?;
        let updated = mutation(current)?;
        requests.insert(id.0.clone(), updated.clone());
        Ok(updated)
    }
}
