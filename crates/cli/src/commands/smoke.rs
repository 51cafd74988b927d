use std::time::Instant;

use crate::commands::{load_catalog, CommandResult};
use recall_core::catalog::TemplateCatalog;
use recall_core::config::{AppConfig, LoadOptions};
use recall_core::domain::request::{DocumentId, RequestStatus};
use recall_core::domain::template::TemplateId;
use recall_core::service::{CreateMode, NewRequest, UnarchiveService};
use recall_core::store::InMemoryRequestStore;
use recall_db::{connect, migrations};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config = match timed_check(|| AppConfig::load(LoadOptions::default())) {
        Ok((elapsed_ms, config)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Pass,
                elapsed_ms,
                message: "configuration loaded and validated".to_string(),
            });
            config
        }
        Err((elapsed_ms, error)) => {
            checks.push(SmokeCheck {
                name: "config_validation",
                status: SmokeStatus::Fail,
                elapsed_ms,
                message: error.to_string(),
            });
            checks.push(skipped("catalog_validation"));
            checks.push(skipped("workflow_transitions"));
            checks.push(skipped("db_connectivity"));
            checks.push(skipped("migration_visibility"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let catalog_started = Instant::now();
    match load_catalog(&config) {
        Ok(catalog) => checks.push(SmokeCheck {
            name: "catalog_validation",
            status: SmokeStatus::Pass,
            elapsed_ms: catalog_started.elapsed().as_millis() as u64,
            message: format!("{} workflow template(s) available", catalog.list().len()),
        }),
        Err(message) => checks.push(SmokeCheck {
            name: "catalog_validation",
            status: SmokeStatus::Fail,
            elapsed_ms: catalog_started.elapsed().as_millis() as u64,
            message,
        }),
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(SmokeCheck {
                name: "workflow_transitions",
                status: SmokeStatus::Fail,
                elapsed_ms: 0,
                message: format!("failed to initialize async runtime: {error}"),
            });
            checks.push(skipped("db_connectivity"));
            checks.push(skipped("migration_visibility"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let workflow_started = Instant::now();
    match runtime.block_on(workflow_probe()) {
        Ok(()) => checks.push(SmokeCheck {
            name: "workflow_transitions",
            status: SmokeStatus::Pass,
            elapsed_ms: workflow_started.elapsed().as_millis() as u64,
            message: "majority workflow finalized after two approvals".to_string(),
        }),
        Err(message) => checks.push(SmokeCheck {
            name: "workflow_transitions",
            status: SmokeStatus::Fail,
            elapsed_ms: workflow_started.elapsed().as_millis() as u64,
            message,
        }),
    }

    let db_started = Instant::now();
    let db_result = runtime.block_on(async { connect(&config.database).await });

    let pool = match db_result {
        Ok(pool) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Pass,
                elapsed_ms: db_started.elapsed().as_millis() as u64,
                message: format!("connected using `{}`", config.database.url),
            });
            pool
        }
        Err(error) => {
            checks.push(SmokeCheck {
                name: "db_connectivity",
                status: SmokeStatus::Fail,
                elapsed_ms: db_started.elapsed().as_millis() as u64,
                message: format!("failed to connect: {error}"),
            });
            checks.push(skipped("migration_visibility"));
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    let migration_started = Instant::now();
    let migration_result = runtime.block_on(async { migrations::run_pending(&pool).await });
    runtime.block_on(async {
        pool.close().await;
    });

    match migration_result {
        Ok(applied) => checks.push(SmokeCheck {
            name: "migration_visibility",
            status: SmokeStatus::Pass,
            elapsed_ms: migration_started.elapsed().as_millis() as u64,
            message: format!("{applied} migration(s) applied and visible"),
        }),
        Err(error) => checks.push(SmokeCheck {
            name: "migration_visibility",
            status: SmokeStatus::Fail,
            elapsed_ms: migration_started.elapsed().as_millis() as u64,
            message: format!("migration execution failed: {error}"),
        }),
    }

    finalize_report(checks, started.elapsed().as_millis() as u64)
}

/// Offline end-to-end probe: walks a majority-policy request through
/// two approvals against the in-memory store and checks the expected
/// transitions.
async fn workflow_probe() -> Result<(), String> {
    let service =
        UnarchiveService::new(InMemoryRequestStore::default(), TemplateCatalog::builtin());

    let request = service
        .create_request(NewRequest {
            document_id: DocumentId("DOC-smoke".to_string()),
            document_title: "Smoke probe document".to_string(),
            document_category: "governance".to_string(),
            mode: CreateMode::Workflow {
                template_id: TemplateId("tpl-archive-board".to_string()),
            },
            reason: Some("readiness probe".to_string()),
            target_module: "governance".to_string(),
        })
        .await
        .map_err(|error| format!("create failed: {error}"))?;
    if request.status != RequestStatus::Pending {
        return Err(format!("expected a pending request, got {:?}", request.status));
    }

    let slots: Vec<_> = request.approvers().iter().map(|approver| approver.id.clone()).collect();
    let after_first = service
        .approve(&request.id, &slots[0], None)
        .await
        .map_err(|error| format!("first approval failed: {error}"))?;
    if after_first.status != RequestStatus::Pending {
        return Err(format!(
            "one of three approvals should not finalize, got {:?}",
            after_first.status
        ));
    }

    let after_second = service
        .approve(&request.id, &slots[1], None)
        .await
        .map_err(|error| format!("second approval failed: {error}"))?;
    if after_second.status != RequestStatus::Approved {
        return Err(format!(
            "majority of three should finalize as approved, got {:?}",
            after_second.status
        ));
    }

    Ok(())
}

fn timed_check<T, E>(check: impl FnOnce() -> Result<T, E>) -> Result<(u64, T), (u64, E)> {
    let started = Instant::now();
    match check() {
        Ok(value) => Ok((started.elapsed().as_millis() as u64, value)),
        Err(error) => Err((started.elapsed().as_millis() as u64, error)),
    }
}

fn skipped(name: &'static str) -> SmokeCheck {
    SmokeCheck {
        name,
        status: SmokeStatus::Skipped,
        elapsed_ms: 0,
        message: "skipped due previous failure".to_string(),
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let passed = checks.iter().filter(|check| check.status == SmokeStatus::Pass).count();
    let total = checks.len();
    let failed = checks.iter().any(|check| check.status == SmokeStatus::Fail);

    let report = SmokeReport {
        command: "smoke",
        status: if failed { SmokeStatus::Fail } else { SmokeStatus::Pass },
        summary: format!("smoke: {passed}/{total} checks passed in {total_elapsed_ms}ms"),
        total_elapsed_ms,
        checks,
    };

    let human = report.summary.clone();
    let machine = serde_json::to_string(&report).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"smoke\",\"status\":\"fail\",\"summary\":\"serialization failed\",\"error\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    });

    CommandResult { exit_code: if failed { 6 } else { 0 }, output: format!("{human}\n{machine}") }
}
