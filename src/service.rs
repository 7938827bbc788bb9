//! Task data backends.
//!
//! Every backend answers with raw JSON; shaping and validation happen in
//! the aggregator and the template store.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use serde_json::{json, Map, Value};

use crate::config::Config;
use crate::{dlog, dlog_debug, dlog_error, Error, Result};

/// Stored task results, a JSON array of records.
pub const TASKS_FILE: &str = "all_task_results.json";
/// Stored templates, a JSON object of file name → text.
pub const TEMPLATES_FILE: &str = "task_collection.json";
/// Folder scanned for `*.md` templates on refresh.
pub const TEMPLATE_SOURCE_DIR: &str = "templates";

#[async_trait]
pub trait TaskDataService: Send + Sync {
    /// `{ tasks: [...] }`
    async fn get_all_tasks(&self) -> Result<Value>;

    /// `{ templates: {...} }` or a bare key → text mapping.
    async fn get_task_templates(&self) -> Result<Value>;

    /// Regenerate templates. `{ content?, file_count?, error? }`
    async fn refresh_templates(&self) -> Result<Value>;

    /// Store one task record, returning the id the backend assigned.
    async fn save_result(&self, record: Value) -> Result<String>;
}

/// Check that a record carries the metadata the task list relies on.
///
/// `taskMetadata` needs a non-empty `runId` plus `taskType`, `taskName` and
/// `createdAt`; `summary` needs `status` (or `overallStatus`). Returns the
/// task type.
pub fn validate_result(record: &Value) -> Result<&str> {
    let invalid = |what: &str| Error::InvalidResult(format!("missing {}", what));

    let meta = record
        .get("taskMetadata")
        .filter(|m| m.is_object())
        .ok_or_else(|| invalid("taskMetadata"))?;
    if !str_field(meta, "runId").is_some_and(|id| !id.trim().is_empty()) {
        return Err(invalid("taskMetadata.runId"));
    }
    for name in ["taskName", "createdAt"] {
        if str_field(meta, name).is_none() {
            return Err(invalid(&format!("taskMetadata.{}", name)));
        }
    }
    let task_type = str_field(meta, "taskType").ok_or_else(|| invalid("taskMetadata.taskType"))?;

    let summary = record.get("summary").ok_or_else(|| invalid("summary"))?;
    let has_status = ["status", "overallStatus"]
        .iter()
        .any(|key| str_field(summary, key).is_some());
    if !has_status {
        return Err(invalid("summary.status"));
    }
    Ok(task_type)
}

fn str_field<'a>(value: &'a Value, name: &str) -> Option<&'a str> {
    value.get(name).and_then(Value::as_str)
}

/// Pick the backend the configuration asks for.
pub fn from_config(config: &Config) -> Result<Arc<dyn TaskDataService>> {
    match config.effective_data_dir() {
        Some(dir) => {
            dlog!("Using local task data in {}", dir.display());
            Ok(Arc::new(LocalTaskService::new(dir)))
        }
        None => {
            dlog!("Using task API at {}", config.effective_base_url());
            Ok(Arc::new(HttpTaskService::new(
                config.effective_base_url(),
                config.request_timeout(),
            )?))
        }
    }
}

/// REST backend.
pub struct HttpTaskService {
    inner: reqwest::Client,
    base_url: String,
}

impl HttpTaskService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let inner = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            inner,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        dlog_debug!("GET {}", url);

        let response = self.inner.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Fetch(format!("HTTP {}: {}", response.status(), path)));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl TaskDataService for HttpTaskService {
    async fn get_all_tasks(&self) -> Result<Value> {
        self.get_json("/tasks/results").await
    }

    async fn get_task_templates(&self) -> Result<Value> {
        self.get_json("/tasks/task-templates").await
    }

    async fn refresh_templates(&self) -> Result<Value> {
        let path = "/tasks/refresh-templates";
        let url = format!("{}{}", self.base_url, path);
        dlog_debug!("POST {}", url);

        let response = self.inner.post(&url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Refresh(format!("HTTP {}: {}", response.status(), path)));
        }
        Ok(response.json().await?)
    }

    async fn save_result(&self, record: Value) -> Result<String> {
        validate_result(&record)?;
        let path = "/tasks/save-result";
        let url = format!("{}{}", self.base_url, path);
        dlog_debug!("POST {}", url);

        let response = self
            .inner
            .post(&url)
            .json(&json!({ "task_data": record }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Error::Fetch(format!("HTTP {}: {}", response.status(), path)));
        }
        let body: Value = response.json().await?;
        body.get("task_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Fetch(format!("no task_id in response: {}", path)))
    }
}

/// Directory backend. Missing data files read as empty.
pub struct LocalTaskService {
    dir: PathBuf,
}

impl LocalTaskService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read_json(&self, file: &str, default: Value) -> Result<Value> {
        let path = self.dir.join(file);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                dlog_debug!("{} not found, using empty default", path.display());
                Ok(default)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Read every `*.md` file of the template source folder, by name.
    async fn scan_templates(&self) -> Result<Map<String, Value>> {
        let source = self.dir.join(TEMPLATE_SOURCE_DIR);
        let mut entries = tokio::fs::read_dir(&source).await?;
        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_md = path.extension().is_some_and(|ext| ext == "md");
            if !is_md || !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            let text = tokio::fs::read_to_string(&path).await?;
            found.push((name, Value::String(text)));
        }
        found.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(found.into_iter().collect())
    }
}

#[async_trait]
impl TaskDataService for LocalTaskService {
    async fn get_all_tasks(&self) -> Result<Value> {
        let tasks = self.read_json(TASKS_FILE, json!([])).await?;
        Ok(json!({ "tasks": tasks }))
    }

    async fn get_task_templates(&self) -> Result<Value> {
        self.read_json(TEMPLATES_FILE, json!({})).await
    }

    async fn refresh_templates(&self) -> Result<Value> {
        let templates = match self.scan_templates().await {
            Ok(templates) => templates,
            Err(e) => {
                dlog_error!("Template scan failed: {}", e);
                return Ok(json!({ "error": format!("Could not read templates folder: {}", e) }));
            }
        };

        let file_count = templates.len();
        let content = Value::Object(templates);
        tokio::fs::write(
            self.dir.join(TEMPLATES_FILE),
            serde_json::to_string_pretty(&content)?,
        )
        .await?;
        dlog!("Saved {} templates to {}", file_count, TEMPLATES_FILE);

        Ok(json!({ "content": content, "file_count": file_count }))
    }

    /// Append the record to the task file under a fresh `taskId`.
    async fn save_result(&self, mut record: Value) -> Result<String> {
        let task_type = validate_result(&record)?;
        let safe_type: String = task_type
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        let task_id = format!("{}_{}", safe_type, Local::now().format("%Y%m%d_%H%M%S_%6f"));

        let run_id = record["taskMetadata"]["runId"].clone();
        let mut tasks = match self.read_json(TASKS_FILE, json!([])).await? {
            Value::Array(tasks) => tasks,
            _ => return Err(Error::InvalidResult(format!("{} is not a list", TASKS_FILE))),
        };
        if tasks.iter().any(|t| t["taskMetadata"]["runId"] == run_id) {
            return Err(Error::InvalidResult(format!("runId {} already stored", run_id)));
        }

        if let Some(obj) = record.as_object_mut() {
            obj.insert("taskId".to_string(), Value::String(task_id.clone()));
        }
        tasks.push(record);
        tokio::fs::write(
            self.dir.join(TASKS_FILE),
            serde_json::to_string_pretty(&tasks)?,
        )
        .await?;
        dlog!("Saved task {} ({} stored)", task_id, tasks.len());
        Ok(task_id)
    }
}
