use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use recall_core::domain::request::{
    Approver, ApproverId, Decision, DocumentId, RequestId, RequestMode, RequestStatus,
    UnarchiveRequest,
};
use recall_core::domain::template::ApprovalPolicy;
use recall_core::errors::{ApplicationError, WorkflowError};
use recall_core::store::{Mutation, RequestStore, StatusFilter};

use crate::DbPool;

/// SQLite-backed request store. Every `update` runs its
/// read-modify-write inside one write transaction, which serializes
/// writers and gives the engine its per-record critical section.
pub struct SqlRequestStore {
    pool: DbPool,
}

impl SqlRequestStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn persistence(error: impl std::fmt::Display) -> ApplicationError {
    ApplicationError::Persistence(error.to_string())
}

fn status_as_str(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::Pending => "pending",
        RequestStatus::Approved => "approved",
        RequestStatus::Rejected => "rejected",
        RequestStatus::Completed => "completed",
        RequestStatus::Cancelled => "cancelled",
    }
}

fn parse_status(raw: &str) -> Result<RequestStatus, ApplicationError> {
    match raw {
        "pending" => Ok(RequestStatus::Pending),
        "approved" => Ok(RequestStatus::Approved),
        "rejected" => Ok(RequestStatus::Rejected),
        "completed" => Ok(RequestStatus::Completed),
        "cancelled" => Ok(RequestStatus::Cancelled),
        other => Err(persistence(format!("unknown request status `{other}`"))),
    }
}

fn decision_as_str(decision: Decision) -> &'static str {
    match decision {
        Decision::Pending => "pending",
        Decision::Approved => "approved",
        Decision::Rejected => "rejected",
    }
}

fn parse_decision(raw: &str) -> Result<Decision, ApplicationError> {
    match raw {
        "pending" => Ok(Decision::Pending),
        "approved" => Ok(Decision::Approved),
        "rejected" => Ok(Decision::Rejected),
        other => Err(persistence(format!("unknown approver decision `{other}`"))),
    }
}

fn policy_as_str(policy: ApprovalPolicy) -> &'static str {
    match policy {
        ApprovalPolicy::Any => "any",
        ApprovalPolicy::All => "all",
        ApprovalPolicy::Majority => "majority",
    }
}

fn parse_policy(raw: &str) -> Result<ApprovalPolicy, ApplicationError> {
    match raw {
        "any" => Ok(ApprovalPolicy::Any),
        "all" => Ok(ApprovalPolicy::All),
        "majority" => Ok(ApprovalPolicy::Majority),
        other => Err(persistence(format!("unknown approval policy `{other}`"))),
    }
}

fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, ApplicationError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)).map_err(persistence)
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, ApplicationError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name).map_err(persistence)
}

fn row_to_approver(row: &SqliteRow) -> Result<Approver, ApplicationError> {
    let decision: String = column(row, "decision")?;
    let decided_at: Option<String> = column(row, "decided_at")?;

    Ok(Approver {
        id: ApproverId(column(row, "id")?),
        user_name: column(row, "user_name")?,
        role: column(row, "role")?,
        decision: parse_decision(&decision)?,
        decided_at: decided_at.as_deref().map(parse_datetime).transpose()?,
        comment: column(row, "comment")?,
    })
}

fn row_to_request(
    row: &SqliteRow,
    approvers: Vec<Approver>,
) -> Result<UnarchiveRequest, ApplicationError> {
    let id: String = column(row, "id")?;
    let mode_str: String = column(row, "mode")?;
    let status_str: String = column(row, "status")?;
    let initiated_at: String = column(row, "initiated_at")?;
    let updated_at: String = column(row, "updated_at")?;
    let finalized_at: Option<String> = column(row, "finalized_at")?;

    let mode = match mode_str.as_str() {
        "direct" => RequestMode::Direct,
        "workflow" => {
            let policy: Option<String> = column(row, "approval_policy")?;
            let policy = policy
                .ok_or_else(|| persistence(format!("request `{id}` lacks an approval policy")))?;
            RequestMode::Workflow { policy: parse_policy(&policy)?, approvers }
        }
        other => return Err(persistence(format!("unknown request mode `{other}`"))),
    };

    Ok(UnarchiveRequest {
        id: RequestId(id),
        document_id: DocumentId(column(row, "document_id")?),
        document_title: column(row, "document_title")?,
        document_category: column(row, "document_category")?,
        mode,
        status: parse_status(&status_str)?,
        reason: column(row, "reason")?,
        target_module: column(row, "target_module")?,
        initiated_at: parse_datetime(&initiated_at)?,
        updated_at: parse_datetime(&updated_at)?,
        finalized_at: finalized_at.as_deref().map(parse_datetime).transpose()?,
    })
}

async fn load_request(
    conn: &mut SqliteConnection,
    id: &RequestId,
) -> Result<Option<UnarchiveRequest>, ApplicationError> {
    let row = sqlx::query(
        "SELECT id, document_id, document_title, document_category, mode, approval_policy,
                status, reason, target_module, initiated_at, updated_at, finalized_at
         FROM unarchive_request WHERE id = ?",
    )
    .bind(&id.0)
    .fetch_optional(&mut *conn)
    .await
    .map_err(persistence)?;

    let Some(row) = row else {
        return Ok(None);
    };

    let approver_rows = sqlx::query(
        "SELECT id, user_name, role, decision, decided_at, comment
         FROM request_approver WHERE request_id = ? ORDER BY position ASC",
    )
    .bind(&id.0)
    .fetch_all(&mut *conn)
    .await
    .map_err(persistence)?;

    let approvers =
        approver_rows.iter().map(row_to_approver).collect::<Result<Vec<_>, _>>()?;
    Ok(Some(row_to_request(&row, approvers)?))
}

async fn insert_request_rows(
    conn: &mut SqliteConnection,
    request: &UnarchiveRequest,
) -> Result<(), ApplicationError> {
    let mode = match request.mode {
        RequestMode::Direct => "direct",
        RequestMode::Workflow { .. } => "workflow",
    };

    sqlx::query(
        "INSERT INTO unarchive_request (id, document_id, document_title, document_category,
                                        mode, approval_policy, status, reason, target_module,
                                        initiated_at, updated_at, finalized_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&request.id.0)
    .bind(&request.document_id.0)
    .bind(&request.document_title)
    .bind(&request.document_category)
    .bind(mode)
    .bind(request.policy().map(policy_as_str))
    .bind(status_as_str(request.status))
    .bind(&request.reason)
    .bind(&request.target_module)
    .bind(request.initiated_at.to_rfc3339())
    .bind(request.updated_at.to_rfc3339())
    .bind(request.finalized_at.map(|dt| dt.to_rfc3339()))
    .execute(&mut *conn)
    .await
    .map_err(persistence)?;

    for (position, approver) in request.approvers().iter().enumerate() {
        sqlx::query(
            "INSERT INTO request_approver (id, request_id, position, user_name, role,
                                           decision, decided_at, comment)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&approver.id.0)
        .bind(&request.id.0)
        .bind(position as i64)
        .bind(&approver.user_name)
        .bind(&approver.role)
        .bind(decision_as_str(approver.decision))
        .bind(approver.decided_at.map(|dt| dt.to_rfc3339()))
        .bind(&approver.comment)
        .execute(&mut *conn)
        .await
        .map_err(persistence)?;
    }

    Ok(())
}

/// Writes back only what the engine may legally change: the request's
/// aggregate fields and each approver slot's decision columns. Mode,
/// policy, and slot membership are immutable after creation.
async fn write_back(
    conn: &mut SqliteConnection,
    request: &UnarchiveRequest,
) -> Result<(), ApplicationError> {
    sqlx::query(
        "UPDATE unarchive_request
         SET status = ?, updated_at = ?, finalized_at = ?
         WHERE id = ?",
    )
    .bind(status_as_str(request.status))
    .bind(request.updated_at.to_rfc3339())
    .bind(request.finalized_at.map(|dt| dt.to_rfc3339()))
    .bind(&request.id.0)
    .execute(&mut *conn)
    .await
    .map_err(persistence)?;

    for approver in request.approvers() {
        sqlx::query(
            "UPDATE request_approver SET decision = ?, decided_at = ?, comment = ?
             WHERE id = ? AND request_id = ?",
        )
        .bind(decision_as_str(approver.decision))
        .bind(approver.decided_at.map(|dt| dt.to_rfc3339()))
        .bind(&approver.comment)
        .bind(&approver.id.0)
        .bind(&request.id.0)
        .execute(&mut *conn)
        .await
        .map_err(persistence)?;
    }

    Ok(())
}

#[async_trait]
impl RequestStore for SqlRequestStore {
    async fn insert(&self, request: UnarchiveRequest) -> Result<(), ApplicationError> {
        let mut tx = self.pool.begin().await.map_err(persistence)?;
        insert_request_rows(&mut tx, &request).await?;
        tx.commit().await.map_err(persistence)
    }

    async fn find_by_id(
        &self,
        id: &RequestId,
    ) -> Result<Option<UnarchiveRequest>, ApplicationError> {
        let mut conn = self.pool.acquire().await.map_err(persistence)?;
        load_request(&mut conn, id).await
    }

    async fn list(&self, filter: StatusFilter) -> Result<Vec<UnarchiveRequest>, ApplicationError> {
        let mut conn = self.pool.acquire().await.map_err(persistence)?;

        let query = match filter {
            StatusFilter::All => {
                "SELECT id FROM unarchive_request ORDER BY initiated_at DESC"
            }
            StatusFilter::Pending => {
                "SELECT id FROM unarchive_request WHERE status = 'pending'
                 ORDER BY initiated_at DESC"
            }
            StatusFilter::Finalized => {
                "SELECT id FROM unarchive_request WHERE status != 'pending'
                 ORDER BY initiated_at DESC"
            }
        };
        let rows = sqlx::query(query).fetch_all(&mut *conn).await.map_err(persistence)?;

        let mut requests = Vec::with_capacity(rows.len());
        for row in &rows {
            let id = RequestId(column(row, "id")?);
            let request = load_request(&mut conn, &id)
                .await?
                .ok_or_else(|| persistence(format!("request `{id}` vanished during list")))?;
            requests.push(request);
        }
        Ok(requests)
    }

    async fn update(
        &self,
        id: &RequestId,
        mutation: Mutation,
    ) -> Result<UnarchiveRequest, ApplicationError> {
        // A sqlx transaction rolls back when dropped, so a cancelled
        // update can never hand a dirty connection back to the pool.
        let mut tx = self.pool.begin().await.map_err(persistence)?;

        // The no-op write promotes the transaction to a writer before
        // the read, so concurrent updaters queue on the busy timeout
        // instead of failing on a later read-to-write upgrade.
        sqlx::query("UPDATE unarchive_request SET id = id WHERE id = ?")
            .bind(&id.0)
            .execute(&mut *tx)
            .await
            .map_err(persistence)?;

        let current = load_request(&mut tx, id)
            .await?
            .ok_or(WorkflowError::RequestNotFound { id: id.clone() })?;
        let updated = mutation(&current)?;
        write_back(&mut tx, &updated).await?;
        tx.commit().await.map_err(persistence)?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use recall_core::domain::request::{Decision, DocumentId, RequestId, RequestStatus};
    use recall_core::domain::template::{
        ApprovalPolicy, TemplateApprover, TemplateId, WorkflowTemplate,
    };
    use recall_core::errors::{ApplicationError, WorkflowError};
    use recall_core::store::{RequestStore, StatusFilter};
    use recall_core::workflow::{self, CreateRequestInput, Verdict};

    use super::SqlRequestStore;
    use crate::connection::test_support::memory_config;
    use crate::{connect, migrations, DbPool};

    async fn setup() -> (SqlRequestStore, DbPool) {
        let pool = connect(&memory_config()).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        (SqlRequestStore::new(pool.clone()), pool)
    }

    fn template() -> WorkflowTemplate {
        WorkflowTemplate {
            id: TemplateId("tpl-board".to_string()),
            name: "Board review".to_string(),
            description: "Majority of three".to_string(),
            approvers: vec![
                TemplateApprover { user_name: "Alice".to_string(), role: "board".to_string() },
                TemplateApprover { user_name: "Bob".to_string(), role: "board".to_string() },
                TemplateApprover { user_name: "Carol".to_string(), role: "board".to_string() },
            ],
            policy: ApprovalPolicy::Majority,
            default_due_days: 7,
        }
    }

    fn workflow_request(id: &str) -> recall_core::UnarchiveRequest {
        workflow::create_workflow(
            CreateRequestInput {
                document_id: DocumentId("DOC-7".to_string()),
                document_title: "Supplier contract 2019".to_string(),
                document_category: "contracts".to_string(),
                reason: Some("legal hold lifted".to_string()),
                target_module: "contracts".to_string(),
            },
            &template(),
            RequestId(id.to_string()),
            Utc::now(),
        )
        .expect("create workflow request")
    }

    fn direct_request(id: &str) -> recall_core::UnarchiveRequest {
        workflow::create_direct(
            CreateRequestInput {
                document_id: DocumentId("DOC-9".to_string()),
                document_title: "Invoice batch 2017".to_string(),
                document_category: "finance".to_string(),
                reason: None,
                target_module: "finance".to_string(),
            },
            RequestId(id.to_string()),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn insert_and_find_round_trips_the_snapshot() {
        let (store, _pool) = setup().await;
        let request = workflow_request("REQ-1");

        store.insert(request.clone()).await.expect("insert");
        let found = store
            .find_by_id(&request.id)
            .await
            .expect("find")
            .expect("request present");

        assert_eq!(found, request);
        let names: Vec<_> =
            found.approvers().iter().map(|approver| approver.user_name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
    }

    #[tokio::test]
    async fn update_applies_an_engine_decision() {
        let (store, _pool) = setup().await;
        let request = workflow_request("REQ-1");
        let slot = request.approvers()[0].id.clone();
        store.insert(request.clone()).await.expect("insert");

        let now = Utc::now();
        let updated = store
            .update(
                &request.id,
                Box::new(move |current| {
                    workflow::record_decision(current, &slot, Verdict::Approve, None, now)
                }),
            )
            .await
            .expect("update");

        assert_eq!(updated.status, RequestStatus::Pending);
        let stored = store.find_by_id(&request.id).await.expect("find").expect("present");
        assert_eq!(stored.approvers()[0].decision, Decision::Approved);
        assert!(stored.approvers()[0].decided_at.is_some());
    }

    #[tokio::test]
    async fn rejected_mutation_rolls_back() {
        let (store, _pool) = setup().await;
        let request = workflow_request("REQ-1");
        store.insert(request.clone()).await.expect("insert");

        let error = store
            .update(
                &request.id,
                Box::new(|current| {
                    Err(WorkflowError::AlreadyFinalized {
                        id: current.id.clone(),
                        status: current.status,
                    })
                }),
            )
            .await
            .expect_err("mutation error propagates");
        assert!(matches!(
            error,
            ApplicationError::Workflow(WorkflowError::AlreadyFinalized { .. })
        ));

        let stored = store.find_by_id(&request.id).await.expect("find").expect("present");
        assert_eq!(stored, request);
    }

    #[tokio::test]
    async fn abandoned_write_transaction_does_not_poison_the_pool() {
        let (store, pool) = setup().await;
        let request = workflow_request("REQ-1");
        let slot = request.approvers()[0].id.clone();
        store.insert(request.clone()).await.expect("insert");

        // Open a write transaction the way `update` does and drop it
        // uncommitted, as happens when an update future is cancelled
        // mid-flight.
        {
            let mut tx = pool.begin().await.expect("begin");
            sqlx::query("UPDATE unarchive_request SET id = id WHERE id = ?")
                .bind(&request.id.0)
                .execute(&mut *tx)
                .await
                .expect("write intent");
        }

        // The single pool connection must come back clean: the next
        // update begins its own transaction and succeeds.
        let now = Utc::now();
        let updated = store
            .update(
                &request.id,
                Box::new(move |current| {
                    workflow::record_decision(current, &slot, Verdict::Approve, None, now)
                }),
            )
            .await
            .expect("update after abandoned transaction");
        assert_eq!(updated.approvers()[0].decision, Decision::Approved);
    }

    #[tokio::test]
    async fn update_of_unknown_request_is_not_found() {
        let (store, _pool) = setup().await;

        let error = store
            .update(
                &RequestId("REQ-missing".to_string()),
                Box::new(|current| Ok(current.clone())),
            )
            .await
            .expect_err("unknown id");

        assert!(matches!(
            error,
            ApplicationError::Workflow(WorkflowError::RequestNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn list_filters_and_orders_by_initiated_at() {
        let (store, _pool) = setup().await;
        let mut old = workflow_request("REQ-old");
        old.initiated_at = Utc::now() - chrono::Duration::hours(2);
        store.insert(old).await.expect("insert old");
        store.insert(workflow_request("REQ-new")).await.expect("insert new");
        store.insert(direct_request("REQ-done")).await.expect("insert direct");

        let pending = store.list(StatusFilter::Pending).await.expect("pending");
        assert_eq!(
            pending.iter().map(|r| r.id.0.as_str()).collect::<Vec<_>>(),
            vec!["REQ-new", "REQ-old"]
        );

        let finalized = store.list(StatusFilter::Finalized).await.expect("finalized");
        assert_eq!(finalized.len(), 1);
        assert_eq!(finalized[0].status, RequestStatus::Completed);

        let all = store.list(StatusFilter::All).await.expect("all");
        assert_eq!(all.len(), 3);
    }
}
