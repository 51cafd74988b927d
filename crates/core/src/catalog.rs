use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;

use crate::domain::template::{ApprovalPolicy, TemplateApprover, TemplateId, WorkflowTemplate};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("duplicate template id `{0}`")]
    DuplicateId(TemplateId),
    #[error("template `{0}` has no approvers")]
    EmptyApprovers(TemplateId),
    #[error("template `{0}` has a blank name")]
    BlankName(TemplateId),
    #[error("could not parse template file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Read-only set of workflow templates, validated at construction.
/// Requests snapshot from the catalog; nothing ever writes back.
#[derive(Clone, Debug)]
pub struct TemplateCatalog {
    templates: Vec<WorkflowTemplate>,
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    template: Vec<WorkflowTemplate>,
}

impl TemplateCatalog {
    pub fn new(templates: Vec<WorkflowTemplate>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for template in &templates {
            if !seen.insert(template.id.clone()) {
                return Err(CatalogError::DuplicateId(template.id.clone()));
            }
            if template.approvers.is_empty() {
                return Err(CatalogError::EmptyApprovers(template.id.clone()));
            }
            if template.name.trim().is_empty() {
                return Err(CatalogError::BlankName(template.id.clone()));
            }
        }
        Ok(Self { templates })
    }

    /// Parses a `[[template]]` TOML document, validated like built-ins.
    pub fn from_toml_str(raw: &str) -> Result<Self, CatalogError> {
        let file: TemplateFile = toml::from_str(raw)?;
        Self::new(file.template)
    }

    /// Default catalog shipped with the service; one template per
    /// approval policy.
    pub fn builtin() -> Self {
        let templates = vec![
            WorkflowTemplate {
                id: TemplateId("tpl-records-any".to_string()),
                name: "Records office sign-off".to_string(),
                description: "Any records officer may release the document".to_string(),
                approvers: vec![
                    TemplateApprover {
                        user_name: "Dana Whitfield".to_string(),
                        role: "records_officer".to_string(),
                    },
                    TemplateApprover {
                        user_name: "Miguel Serrano".to_string(),
                        role: "records_officer".to_string(),
                    },
                ],
                policy: ApprovalPolicy::Any,
                default_due_days: 3,
            },
            WorkflowTemplate {
                id: TemplateId("tpl-legal-release".to_string()),
                name: "Legal retention release".to_string(),
                description: "Unanimous sign-off before a retained document leaves the archive"
                    .to_string(),
                approvers: vec![
                    TemplateApprover {
                        user_name: "Priya Raman".to_string(),
                        role: "legal_counsel".to_string(),
                    },
                    TemplateApprover {
                        user_name: "Jonas Keller".to_string(),
                        role: "compliance_manager".to_string(),
                    },
                    TemplateApprover {
                        user_name: "Dana Whitfield".to_string(),
                        role: "records_officer".to_string(),
                    },
                ],
                policy: ApprovalPolicy::All,
                default_due_days: 10,
            },
            WorkflowTemplate {
                id: TemplateId("tpl-archive-board".to_string()),
                name: "Archive board review".to_string(),
                description: "Majority vote of the archive review board".to_string(),
                approvers: vec![
                    TemplateApprover {
                        user_name: "Ana Costa".to_string(),
                        role: "board_member".to_string(),
                    },
                    TemplateApprover {
                        user_name: "Felix Braun".to_string(),
                        role: "board_member".to_string(),
                    },
                    TemplateApprover {
                        user_name: "Sofia Lindqvist".to_string(),
                        role: "board_chair".to_string(),
                    },
                ],
                policy: ApprovalPolicy::Majority,
                default_due_days: 7,
            },
        ];

        // Built-ins are maintained in this file; construction cannot fail.
        Self { templates }
    }

    pub fn get(&self, id: &TemplateId) -> Option<&WorkflowTemplate> {
        self.templates.iter().find(|template| &template.id == id)
    }

    pub fn list(&self) -> &[WorkflowTemplate] {
        &self.templates
    }
}

impl Default for TemplateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogError, TemplateCatalog};
    use crate::domain::template::{
        ApprovalPolicy, TemplateApprover, TemplateId, WorkflowTemplate,
    };

    fn template(id: &str) -> WorkflowTemplate {
        WorkflowTemplate {
            id: TemplateId(id.to_string()),
            name: "Chain".to_string(),
            description: String::new(),
            approvers: vec![TemplateApprover {
                user_name: "Alice".to_string(),
                role: "records_officer".to_string(),
            }],
            policy: ApprovalPolicy::Any,
            default_due_days: 5,
        }
    }

    #[test]
    fn builtin_catalog_covers_every_policy() {
        let catalog = TemplateCatalog::builtin();

        let policies: Vec<_> = catalog.list().iter().map(|template| template.policy).collect();
        assert!(policies.contains(&ApprovalPolicy::Any));
        assert!(policies.contains(&ApprovalPolicy::All));
        assert!(policies.contains(&ApprovalPolicy::Majority));
    }

    #[test]
    fn duplicate_template_ids_are_rejected() {
        let error = TemplateCatalog::new(vec![template("tpl-a"), template("tpl-a")])
            .expect_err("duplicate id");
        assert!(matches!(error, CatalogError::DuplicateId(_)));
    }

    #[test]
    fn templates_without_approvers_are_rejected() {
        let mut empty = template("tpl-empty");
        empty.approvers.clear();

        let error = TemplateCatalog::new(vec![empty]).expect_err("empty approvers");
        assert!(matches!(error, CatalogError::EmptyApprovers(_)));
    }

    #[test]
    fn catalog_loads_from_toml() {
        let catalog = TemplateCatalog::from_toml_str(
            r#"
[[template]]
id = "tpl-file"
name = "File chain"
description = "Loaded from disk"
policy = "majority"
default_due_days = 4
approvers = [
  { user_name = "Alice", role = "records_officer" },
  { user_name = "Bob", role = "legal_counsel" },
]
"#,
        )
        .expect("parse catalog");

        let loaded = catalog.get(&TemplateId("tpl-file".to_string())).expect("template present");
        assert_eq!(loaded.policy, ApprovalPolicy::Majority);
        assert_eq!(loaded.approvers.len(), 2);
    }

    #[test]
    fn lookup_misses_return_none() {
        let catalog = TemplateCatalog::builtin();
        assert!(catalog.get(&TemplateId("tpl-unknown".to_string())).is_none());
    }
}
