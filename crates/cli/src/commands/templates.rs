use serde::Serialize;

use crate::commands::{load_catalog, CommandResult};
use recall_core::config::{AppConfig, LoadOptions};
use recall_core::domain::template::WorkflowTemplate;

#[derive(Debug, Serialize)]
struct TemplateRow<'a> {
    id: &'a str,
    name: &'a str,
    policy: &'static str,
    approvers: usize,
    default_due_days: u32,
}

#[derive(Debug, Serialize)]
struct TemplateListing<'a> {
    command: &'static str,
    status: &'static str,
    templates: Vec<TemplateRow<'a>>,
}

fn rows(templates: &[WorkflowTemplate]) -> Vec<TemplateRow<'_>> {
    use recall_core::domain::template::ApprovalPolicy;

    templates
        .iter()
        .map(|template| TemplateRow {
            id: &template.id.0,
            name: &template.name,
            policy: match template.policy {
                ApprovalPolicy::Any => "any",
                ApprovalPolicy::All => "all",
                ApprovalPolicy::Majority => "majority",
            },
            approvers: template.approvers.len(),
            default_due_days: template.default_due_days,
        })
        .collect()
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "templates",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let catalog = match load_catalog(&config) {
        Ok(catalog) => catalog,
        Err(message) => {
            return CommandResult::failure("templates", "catalog_validation", message, 2);
        }
    };

    let listing =
        TemplateListing { command: "templates", status: "ok", templates: rows(catalog.list()) };
    match serde_json::to_string(&listing) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure(
            "templates",
            "serialization",
            format!("failed to serialize template listing: {error}"),
            7,
        ),
    }
}

#[cfg(test)]
mod tests {
    use recall_core::catalog::TemplateCatalog;

    use super::rows;

    #[test]
    fn rows_summarize_the_builtin_catalog() {
        let catalog = TemplateCatalog::builtin();
        let rows = rows(catalog.list());

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().any(|row| row.id == "tpl-archive-board" && row.policy == "majority"));
        assert!(rows.iter().all(|row| row.approvers >= 2));
    }
}
