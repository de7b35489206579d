//! Jira REST client.
//!
//! Only what issue creation needs: `POST /rest/api/2/issue` with a wiki
//! markup description, authenticated with an account email and API token.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::JiraConfig;
use crate::errors::{ComposerError, ComposerResult};

/// Fields of an issue to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueFields {
    pub project: ProjectRef,
    pub summary: String,
    pub description: String,
    #[serde(rename = "issuetype")]
    pub issue_type: IssueTypeRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<IssueRef>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRef {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueTypeRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssueRef {
    pub key: String,
}

impl IssueFields {
    pub fn new(
        project_key: impl Into<String>,
        issue_type: impl Into<String>,
        summary: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            project: ProjectRef {
                key: project_key.into(),
            },
            summary: summary.into(),
            description: description.into(),
            issue_type: IssueTypeRef {
                name: issue_type.into(),
            },
            parent: None,
            labels: Vec::new(),
        }
    }

    pub fn with_parent(mut self, key: impl Into<String>) -> Self {
        self.parent = Some(IssueRef { key: key.into() });
        self
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Self {
        self.labels = labels;
        self
    }
}

#[derive(Debug, Serialize)]
struct CreateIssueRequest<'a> {
    fields: &'a IssueFields,
}

/// A newly created issue.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreatedIssue {
    pub id: String,
    pub key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraErrorResponse {
    #[serde(default)]
    error_messages: Vec<String>,
    #[serde(default)]
    errors: std::collections::BTreeMap<String, String>,
}

impl JiraErrorResponse {
    fn summary(&self) -> Option<String> {
        let mut parts = self.error_messages.clone();
        parts.extend(self.errors.iter().map(|(field, msg)| format!("{field}: {msg}")));
        (!parts.is_empty()).then(|| parts.join("; "))
    }
}

/// Jira REST client
#[derive(Debug, Clone)]
pub struct JiraClient {
    client: reqwest::Client,
    base_url: String,
}

impl JiraClient {
    /// Create a client for `base_url` using basic auth.
    pub fn new(base_url: &str, email: &str, api_token: &str) -> ComposerResult<Self> {
        let credentials = STANDARD.encode(format!("{email}:{api_token}"));

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {credentials}")).map_err(|e| {
                ComposerError::InvalidConfigValue {
                    key: "JIRA_API_TOKEN".to_string(),
                    reason: e.to_string(),
                }
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ComposerError::Internal {
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &JiraConfig) -> ComposerResult<Self> {
        Self::new(&config.base_url, &config.email, &config.api_token)
    }

    /// Create an issue and return its key.
    #[instrument(skip(self, issue), fields(project = %issue.project.key, issue_type = %issue.issue_type.name))]
    pub async fn create_issue(&self, issue: &IssueFields) -> ComposerResult<CreatedIssue> {
        let url = format!("{}/rest/api/2/issue", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&CreateIssueRequest { fields: issue })
            .send()
            .await
            .map_err(|e| ComposerError::Jira {
                status: 0,
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let message = serde_json::from_str::<JiraErrorResponse>(&body)
                .ok()
                .and_then(|e| e.summary())
                .unwrap_or(body);
            return Err(ComposerError::Jira {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreatedIssue = serde_json::from_str(&body)?;
        debug!(key = %created.key, "Created Jira issue");
        Ok(created)
    }
}
