use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub String);

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Blueprint entry copied into a request's approver snapshot. Carries
/// display strings only; identity verification belongs to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateApprover {
    pub user_name: String,
    pub role: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPolicy {
    Any,
    All,
    Majority,
}

impl std::str::FromStr for ApprovalPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "all" => Ok(Self::All),
            "majority" => Ok(Self::Majority),
            other => Err(format!("unsupported approval policy `{other}` (expected any|all|majority)")),
        }
    }
}

/// Named, reusable approval blueprint. Templates are configuration:
/// requests copy the approver list and policy at creation and never
/// reference the template again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub id: TemplateId,
    pub name: String,
    pub description: String,
    pub approvers: Vec<TemplateApprover>,
    pub policy: ApprovalPolicy,
    /// Informational SLA hint surfaced to callers; nothing in the
    /// engine enforces it.
    pub default_due_days: u32,
}
