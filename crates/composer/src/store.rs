//! Project and task code storage.
//!
//! A code record owns one template. Project codes carry the epic/story body
//! template, task codes carry subtask templates.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::config::COMPOSER_DIR;
use crate::errors::{ComposerError, ComposerResult};
use crate::template::TemplateId;

/// Whether a record configures a project or a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeKind {
    Project,
    Task,
}

impl std::fmt::Display for CodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::Task => write!(f, "task"),
        }
    }
}

impl std::str::FromStr for CodeKind {
    type Err = ComposerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "project" => Ok(Self::Project),
            "task" => Ok(Self::Task),
            _ => Err(ComposerError::InvalidArgument {
                reason: format!("unknown code kind '{s}' (expected project or task)"),
            }),
        }
    }
}

/// A project or task code with its template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeRecord {
    pub id: Uuid,
    /// Short unique key, e.g. `WEB` or `QA`
    pub code: String,
    pub name: String,
    pub kind: CodeKind,
    /// Jira issue type created from this code, e.g. `Story` or `Sub-task`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<String>,
    /// Jira wiki markup, possibly with `<AI/>` tags
    #[serde(default)]
    pub template: String,
    pub updated_at: DateTime<Utc>,
}

impl CodeRecord {
    pub fn new(code: impl Into<String>, name: impl Into<String>, kind: CodeKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            name: name.into(),
            kind,
            issue_type: None,
            template: String::new(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_issue_type(mut self, issue_type: impl Into<String>) -> Self {
        self.issue_type = Some(issue_type.into());
        self
    }

    /// Identifier of this record's template in an expansion.
    pub fn template_id(&self) -> TemplateId {
        TemplateId::new(self.code.clone())
    }

    /// Whether `key` names this record, by code or by id.
    fn matches(&self, key: &str) -> bool {
        self.code == key || self.id.to_string() == key
    }
}

/// Storage interface for code records.
#[async_trait]
pub trait CodeStore: Send + Sync {
    /// All records, in insertion order
    async fn list(&self) -> ComposerResult<Vec<CodeRecord>>;

    /// Look a record up by code or id
    async fn get(&self, key: &str) -> ComposerResult<Option<CodeRecord>>;

    /// Insert a record, or replace the record with the same code
    async fn save(&self, record: CodeRecord) -> ComposerResult<()>;

    /// Delete a record by code or id
    async fn remove(&self, key: &str) -> ComposerResult<()>;

    /// Template of a record, erroring when the record does not exist
    async fn get_template(&self, key: &str) -> ComposerResult<String> {
        self.get(key)
            .await?
            .map(|record| record.template)
            .ok_or_else(|| ComposerError::CodeNotFound {
                code: key.to_string(),
            })
    }

    /// Look a record up, erroring when it does not exist
    async fn require(&self, key: &str) -> ComposerResult<CodeRecord> {
        self.get(key)
            .await?
            .ok_or_else(|| ComposerError::CodeNotFound {
                code: key.to_string(),
            })
    }
}

fn upsert(records: &mut Vec<CodeRecord>, mut record: CodeRecord) {
    record.updated_at = Utc::now();
    match records.iter_mut().find(|r| r.code == record.code) {
        Some(existing) => {
            record.id = existing.id;
            *existing = record;
        }
        None => records.push(record),
    }
}

fn delete(records: &mut Vec<CodeRecord>, key: &str) -> ComposerResult<()> {
    let before = records.len();
    records.retain(|r| !r.matches(key));
    if records.len() == before {
        return Err(ComposerError::CodeNotFound {
            code: key.to_string(),
        });
    }
    Ok(())
}

/// On-disk layout of the codes file
#[derive(Debug, Default, Serialize, Deserialize)]
struct CodesFile {
    #[serde(default)]
    codes: Vec<CodeRecord>,
}

/// JSON file storage under `.composer/codes.json`
pub struct FileCodeStore {
    codes_file: PathBuf,
    /// Serialises read-modify-write cycles
    write_lock: Mutex<()>,
}

impl FileCodeStore {
    pub fn new(project_path: impl AsRef<Path>) -> Self {
        Self {
            codes_file: project_path.as_ref().join(COMPOSER_DIR).join("codes.json"),
            write_lock: Mutex::new(()),
        }
    }

    pub fn codes_file(&self) -> &Path {
        &self.codes_file
    }

    async fn read(&self) -> ComposerResult<CodesFile> {
        match fs::read_to_string(&self.codes_file).await {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CodesFile::default()),
            Err(e) => Err(ComposerError::FileReadError {
                path: self.codes_file.display().to_string(),
                reason: e.to_string(),
            }),
        }
    }

    async fn write(&self, data: &CodesFile) -> ComposerResult<()> {
        if let Some(parent) = self.codes_file.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(data)?;
        fs::write(&self.codes_file, content)
            .await
            .map_err(|e| ComposerError::FileWriteError {
                path: self.codes_file.display().to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl CodeStore for FileCodeStore {
    async fn list(&self) -> ComposerResult<Vec<CodeRecord>> {
        Ok(self.read().await?.codes)
    }

    async fn get(&self, key: &str) -> ComposerResult<Option<CodeRecord>> {
        Ok(self.read().await?.codes.into_iter().find(|r| r.matches(key)))
    }

    async fn save(&self, record: CodeRecord) -> ComposerResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut data = self.read().await?;
        debug!(code = %record.code, "Saving code record");
        upsert(&mut data.codes, record);
        self.write(&data).await
    }

    async fn remove(&self, key: &str) -> ComposerResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut data = self.read().await?;
        delete(&mut data.codes, key)?;
        self.write(&data).await
    }
}

/// In-memory storage, for tests and embedding
#[derive(Default)]
pub struct MemoryCodeStore {
    codes: RwLock<Vec<CodeRecord>>,
}

impl MemoryCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = CodeRecord>) -> Self {
        Self {
            codes: RwLock::new(records.into_iter().collect()),
        }
    }
}

#[async_trait]
impl CodeStore for MemoryCodeStore {
    async fn list(&self) -> ComposerResult<Vec<CodeRecord>> {
        Ok(self.codes.read().await.clone())
    }

    async fn get(&self, key: &str) -> ComposerResult<Option<CodeRecord>> {
        Ok(self.codes.read().await.iter().find(|r| r.matches(key)).cloned())
    }

    async fn save(&self, record: CodeRecord) -> ComposerResult<()> {
        upsert(&mut *self.codes.write().await, record);
        Ok(())
    }

    async fn remove(&self, key: &str) -> ComposerResult<()> {
        delete(&mut *self.codes.write().await, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn web() -> CodeRecord {
        CodeRecord::new("WEB", "Web storefront", CodeKind::Project)
            .with_issue_type("Story")
            .with_template("h2. Goal\n<AI prompt=\"state the goal\" />")
    }

    #[tokio::test]
    async fn test_file_store_save_and_get() {
        let dir = TempDir::new().unwrap();
        let store = FileCodeStore::new(dir.path());

        assert!(store.list().await.unwrap().is_empty());

        let record = web();
        let id = record.id;
        store.save(record).await.unwrap();

        let loaded = store.get("WEB").await.unwrap().unwrap();
        assert_eq!(loaded.name, "Web storefront");
        assert_eq!(loaded.issue_type.as_deref(), Some("Story"));
        assert_eq!(store.get(&id.to_string()).await.unwrap().unwrap().code, "WEB");
        assert!(store.codes_file().exists());
    }

    #[tokio::test]
    async fn test_save_replaces_by_code_and_keeps_id() {
        let dir = TempDir::new().unwrap();
        let store = FileCodeStore::new(dir.path());

        let original = web();
        let id = original.id;
        store.save(original).await.unwrap();
        store
            .save(web().with_template("h2. Changed"))
            .await
            .unwrap();

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].template, "h2. Changed");
    }

    #[tokio::test]
    async fn test_get_template_missing_code() {
        let store = MemoryCodeStore::new();
        let err = store.get_template("NOPE").await.unwrap_err();
        assert!(matches!(err, ComposerError::CodeNotFound { code } if code == "NOPE"));
    }

    #[tokio::test]
    async fn test_remove() {
        let store = MemoryCodeStore::with_records([web()]);
        store.remove("WEB").await.unwrap();
        assert!(store.get("WEB").await.unwrap().is_none());
        assert!(store.remove("WEB").await.is_err());
    }

    #[tokio::test]
    async fn test_record_serialises_type_field() {
        let value = serde_json::to_value(web()).unwrap();
        assert_eq!(value["type"], "Story");
        assert_eq!(value["kind"], "project");
        assert!(value.get("updatedAt").is_some());
    }

    #[test]
    fn test_code_kind_parse() {
        assert_eq!("Task".parse::<CodeKind>().unwrap(), CodeKind::Task);
        assert!("epic".parse::<CodeKind>().is_err());
    }
}
