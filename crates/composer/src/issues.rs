//! Issue plans.
//!
//! A plan is one parent issue built from a project code template plus one
//! subtask per selected task code. All templates of a plan are expanded in
//! a single generation cycle.

use serde::Serialize;
use tracing::{info, instrument};

use crate::ai::TokenUsage;
use crate::errors::{ComposerError, ComposerResult};
use crate::jira::{IssueFields, JiraClient};
use crate::store::{CodeKind, CodeRecord, CodeStore};
use crate::template::{ExpansionWarning, TemplateExpander};

/// Issue type used for project codes without one.
pub const DEFAULT_PARENT_TYPE: &str = "Story";
/// Issue type used for task codes without one.
pub const DEFAULT_SUBTASK_TYPE: &str = "Sub-task";

/// What the user asked for.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub project_code: String,
    pub task_codes: Vec<String>,
    pub summary: String,
    /// Shared AI context; blank means no generation
    pub context: String,
}

/// One issue ready to be created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueDraft {
    pub code: String,
    pub issue_type: String,
    pub summary: String,
    pub description: String,
}

/// Parent issue plus its subtasks.
#[derive(Debug, Clone, Serialize)]
pub struct IssuePlan {
    pub parent: IssueDraft,
    pub subtasks: Vec<IssueDraft>,
    pub usage: Option<TokenUsage>,
    pub warnings: Vec<ExpansionWarning>,
}

/// Keys of the issues created from a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushedPlan {
    pub parent_key: String,
    pub subtask_keys: Vec<String>,
}

/// Builds issue plans from stored codes.
pub struct IssuePlanner<'a> {
    store: &'a dyn CodeStore,
    expander: &'a TemplateExpander,
}

fn require_kind(record: &CodeRecord, kind: CodeKind) -> ComposerResult<()> {
    if record.kind != kind {
        return Err(ComposerError::InvalidArgument {
            reason: format!("'{}' is a {} code, expected a {kind} code", record.code, record.kind),
        });
    }
    Ok(())
}

impl<'a> IssuePlanner<'a> {
    pub fn new(store: &'a dyn CodeStore, expander: &'a TemplateExpander) -> Self {
        Self { store, expander }
    }

    /// Expand the project template and every task template in one cycle.
    #[instrument(skip(self, request), fields(project = %request.project_code, tasks = request.task_codes.len()))]
    pub async fn plan(&self, request: &IssueRequest) -> ComposerResult<IssuePlan> {
        if request.summary.trim().is_empty() {
            return Err(ComposerError::InvalidArgument {
                reason: "summary is empty".to_string(),
            });
        }

        let project = self.store.require(&request.project_code).await?;
        require_kind(&project, CodeKind::Project)?;

        let mut tasks = Vec::with_capacity(request.task_codes.len());
        for code in &request.task_codes {
            let task = self.store.require(code).await?;
            require_kind(&task, CodeKind::Task)?;
            if tasks.iter().any(|t: &CodeRecord| t.code == task.code) {
                return Err(ComposerError::InvalidArgument {
                    reason: format!("task code '{}' selected twice", task.code),
                });
            }
            tasks.push(task);
        }

        let templates = std::iter::once(&project)
            .chain(tasks.iter())
            .map(|record| (record.template_id(), record.template.as_str()));
        let expansion = self
            .expander
            .expand_templates(&request.context, templates)
            .await?;

        let mut documents = expansion.documents.into_iter();
        let mut next_body = || documents.next().map(|d| d.body).unwrap_or_default();

        let summary = request.summary.trim();
        let parent = IssueDraft {
            code: project.code.clone(),
            issue_type: project
                .issue_type
                .clone()
                .unwrap_or_else(|| DEFAULT_PARENT_TYPE.to_string()),
            summary: summary.to_string(),
            description: next_body(),
        };

        let subtasks = tasks
            .iter()
            .map(|task| IssueDraft {
                code: task.code.clone(),
                issue_type: task
                    .issue_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SUBTASK_TYPE.to_string()),
                summary: format!("{summary} - {}", task.name),
                description: next_body(),
            })
            .collect();

        Ok(IssuePlan {
            parent,
            subtasks,
            usage: expansion.usage,
            warnings: expansion.warnings,
        })
    }
}

/// Create the parent issue, then each subtask under it.
#[instrument(skip(client, plan), fields(subtasks = plan.subtasks.len()))]
pub async fn push_plan(
    client: &JiraClient,
    project_key: &str,
    plan: &IssuePlan,
) -> ComposerResult<PushedPlan> {
    let parent = client
        .create_issue(&IssueFields::new(
            project_key,
            &plan.parent.issue_type,
            &plan.parent.summary,
            &plan.parent.description,
        ))
        .await?;

    let mut subtask_keys = Vec::with_capacity(plan.subtasks.len());
    for draft in &plan.subtasks {
        let fields = IssueFields::new(
            project_key,
            &draft.issue_type,
            &draft.summary,
            &draft.description,
        )
        .with_parent(&parent.key)
        .with_labels(vec![draft.code.clone()]);

        let created = client.create_issue(&fields).await.map_err(|e| match e {
            ComposerError::Jira { status, message } => ComposerError::Jira {
                status,
                message: format!("{message} (parent {} was already created)", parent.key),
            },
            other => other,
        })?;
        subtask_keys.push(created.key);
    }

    info!(parent = %parent.key, subtasks = subtask_keys.len(), "Issue plan pushed to Jira");

    Ok(PushedPlan {
        parent_key: parent.key,
        subtask_keys,
    })
}
