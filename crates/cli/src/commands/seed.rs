use chrono::Utc;

use crate::commands::{load_catalog, CommandResult};
use recall_core::catalog::TemplateCatalog;
use recall_core::config::{AppConfig, LoadOptions};
use recall_core::domain::request::{DocumentId, RequestId, UnarchiveRequest};
use recall_core::domain::template::TemplateId;
use recall_core::store::RequestStore;
use recall_core::workflow::{self, CreateRequestInput, Verdict};
use recall_db::{connect, migrations, SqlRequestStore};

/// Demo fixtures covering the three request shapes an operator will
/// meet: an auto-completed direct restoration, a workflow still waiting
/// on its approvers, and a workflow that reached majority approval.
fn demo_requests(catalog: &TemplateCatalog) -> Result<Vec<UnarchiveRequest>, String> {
    let now = Utc::now();

    let direct = workflow::create_direct(
        CreateRequestInput {
            document_id: DocumentId("DOC-demo-1001".to_string()),
            document_title: "Vendor invoice batch 2018".to_string(),
            document_category: "finance".to_string(),
            reason: None,
            target_module: "finance".to_string(),
        },
        RequestId("REQ-demo-direct".to_string()),
        now,
    );

    let records = catalog
        .get(&TemplateId("tpl-records-any".to_string()))
        .ok_or_else(|| "catalog is missing template `tpl-records-any`".to_string())?;
    let pending = workflow::create_workflow(
        CreateRequestInput {
            document_id: DocumentId("DOC-demo-1002".to_string()),
            document_title: "Employment contract draft".to_string(),
            document_category: "hr".to_string(),
            reason: Some("retention review follow-up".to_string()),
            target_module: "hr".to_string(),
        },
        records,
        RequestId("REQ-demo-pending".to_string()),
        now,
    )
    .map_err(|error| error.to_string())?;

    let board = catalog
        .get(&TemplateId("tpl-archive-board".to_string()))
        .ok_or_else(|| "catalog is missing template `tpl-archive-board`".to_string())?;
    let mut approved = workflow::create_workflow(
        CreateRequestInput {
            document_id: DocumentId("DOC-demo-1003".to_string()),
            document_title: "Board minutes 2015-Q4".to_string(),
            document_category: "governance".to_string(),
            reason: Some("audit inquiry".to_string()),
            target_module: "governance".to_string(),
        },
        board,
        RequestId("REQ-demo-approved".to_string()),
        now,
    )
    .map_err(|error| error.to_string())?;
    for slot in approved.approvers().iter().take(2).map(|a| a.id.clone()).collect::<Vec<_>>() {
        approved = workflow::record_decision(&approved, &slot, Verdict::Approve, None, now)
            .map_err(|error| error.to_string())?;
    }

    Ok(vec![direct, pending, approved])
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let catalog = match load_catalog(&config) {
        Ok(catalog) => catalog,
        Err(message) => return CommandResult::failure("seed", "catalog_validation", message, 2),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let store = SqlRequestStore::new(pool.clone());
        let requests =
            demo_requests(&catalog).map_err(|message| ("seed_execution", message, 5u8))?;

        let mut inserted = Vec::new();
        let mut skipped = Vec::new();
        for request in requests {
            let existing = store
                .find_by_id(&request.id)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
            if existing.is_some() {
                skipped.push(request.id.0.clone());
                continue;
            }
            let id = request.id.0.clone();
            store
                .insert(request)
                .await
                .map_err(|error| ("seed_execution", error.to_string(), 5u8))?;
            inserted.push(id);
        }

        pool.close().await;
        Ok::<(Vec<String>, Vec<String>), (&'static str, String, u8)>((inserted, skipped))
    });

    match result {
        Ok((inserted, skipped)) => {
            let mut message = format!("seeded {} demo request(s)", inserted.len());
            if !inserted.is_empty() {
                message.push_str(&format!(": {}", inserted.join(", ")));
            }
            if !skipped.is_empty() {
                message.push_str(&format!(" (already present: {})", skipped.join(", ")));
            }
            CommandResult::success("seed", message)
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

#[cfg(test)]
mod tests {
    use recall_core::catalog::TemplateCatalog;
    use recall_core::domain::request::RequestStatus;

    use super::demo_requests;

    #[test]
    fn demo_dataset_covers_all_request_shapes() {
        let requests = demo_requests(&TemplateCatalog::builtin()).expect("demo requests");

        let statuses: Vec<_> = requests.iter().map(|request| request.status).collect();
        assert_eq!(
            statuses,
            vec![RequestStatus::Completed, RequestStatus::Pending, RequestStatus::Approved]
        );
        assert!(requests.iter().all(|request| request.id.0.starts_with("REQ-demo-")));
    }
}
