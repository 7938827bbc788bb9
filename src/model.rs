//! Task record data model.
//!
//! Records come from an external analysis pipeline and are only loosely
//! shaped, so every field deserializes leniently: missing strings become
//! empty, lists that are not lists become empty, list items that do not
//! fit are dropped. A single bad field never rejects the whole record.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Task type assigned to records that do not declare one.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Identifying metadata of a task run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    #[serde(default, deserialize_with = "lenient_string")]
    pub run_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub task_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub task_type: String,
    /// Raw timestamp as written by the pipeline.
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: String,
}

impl TaskMetadata {
    /// Parse `created_at`. Accepts RFC 3339, naive date-times (read as
    /// UTC) and bare dates. Anything else is `None`.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Summary block of a task run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    #[serde(default, alias = "overallStatus", deserialize_with = "lenient_opt_string")]
    pub status: Option<String>,
    /// Metric name to scalar value, in pipeline order.
    #[serde(default, deserialize_with = "lenient_map")]
    pub metrics: Map<String, Value>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub key_findings: Vec<String>,
}

/// A diagram description attached to a task.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Visualization {
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub description: Option<String>,
}

/// A markdown section. Lower priority values display first.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Section {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(default, deserialize_with = "lenient_priority")]
    pub priority: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPriority {
    Low,
    Medium,
    High,
}

impl ActionPriority {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// A recommended follow-up action.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Action {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_action_priority")]
    pub priority: Option<ActionPriority>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub impact: Option<String>,
}

/// A pointer to a file or resource the analysis looked at.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Reference {
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub path: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
}

/// One structured result of an external analysis run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskRecord {
    #[serde(
        rename = "taskMetadata",
        alias = "metadata",
        default,
        deserialize_with = "lenient_default"
    )]
    pub metadata: TaskMetadata,
    #[serde(default, deserialize_with = "lenient_option")]
    pub summary: Option<TaskSummary>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub visualizations: Vec<Visualization>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub sections: Vec<Section>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub actions: Vec<Action>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub references: Vec<Reference>,
}

impl TaskRecord {
    pub fn run_id(&self) -> &str {
        &self.metadata.run_id
    }

    pub fn task_type(&self) -> &str {
        &self.metadata.task_type
    }

    pub fn status(&self) -> Option<&str> {
        self.summary.as_ref().and_then(|s| s.status.as_deref())
    }

    pub fn key_findings(&self) -> &[String] {
        self.summary
            .as_ref()
            .map(|s| s.key_findings.as_slice())
            .unwrap_or(&[])
    }
}

/// Status classes recognized by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Completed,
    IssuesFound,
    NeedsAttention,
    InProgress,
    SeekClarification,
    Unknown,
}

impl StatusKind {
    /// Case-insensitive classification; anything unrecognized is `Unknown`.
    pub fn classify(status: Option<&str>) -> Self {
        let Some(status) = status else {
            return Self::Unknown;
        };
        match status.trim().to_ascii_lowercase().as_str() {
            "completed" => Self::Completed,
            "issues-found" => Self::IssuesFound,
            "needs-attention" => Self::NeedsAttention,
            "in-progress" => Self::InProgress,
            "seek-clarification" => Self::SeekClarification,
            _ => Self::Unknown,
        }
    }
}

// Lenient field deserializers

fn lenient_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(&Value::deserialize(d)?).unwrap_or_default())
}

fn lenient_opt_string<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(&Value::deserialize(d)?).filter(|s| !s.is_empty()))
}

fn lenient_priority<'de, D>(d: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_action_priority<'de, D>(d: D) -> Result<Option<ActionPriority>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::String(s) => ActionPriority::parse(&s),
        _ => None,
    })
}

fn lenient_map<'de, D>(d: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

fn lenient_vec<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(d)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn lenient_option<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(serde_json::from_value(Value::deserialize(d)?).ok())
}

fn lenient_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(serde_json::from_value(Value::deserialize(d)?).unwrap_or_default())
}

/// Text of a scalar JSON value; `None` for null, arrays and objects.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> TaskRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_full_record_deserializes() {
        let task = record(json!({
            "taskMetadata": {
                "runId": "run-1",
                "taskName": "Login loop",
                "taskType": "bug-hunt",
                "createdAt": "2025-03-01T10:00:00Z"
            },
            "summary": {
                "status": "issues-found",
                "metrics": {"filesScanned": 12, "ratio": 0.5},
                "keyFindings": ["token expires early"]
            },
            "visualizations": [{"content": "graph TD\nA-->B", "title": "Flow"}],
            "sections": [{"title": "Cause", "content": "x", "priority": 1}],
            "actions": [{"title": "Fix", "description": "d", "priority": "high", "impact": "large"}],
            "references": [{"type": "file", "path": "src/auth.ts", "description": "entry"}]
        }));

        assert_eq!(task.run_id(), "run-1");
        assert_eq!(task.task_type(), "bug-hunt");
        assert_eq!(task.status(), Some("issues-found"));
        assert_eq!(task.key_findings(), ["token expires early".to_string()]);
        assert_eq!(task.visualizations[0].title, "Flow");
        assert_eq!(task.sections[0].priority, Some(1));
        assert_eq!(task.actions[0].priority, Some(ActionPriority::High));
        assert_eq!(task.references[0].kind, "file");
        let keys: Vec<&String> = task.summary.as_ref().unwrap().metrics.keys().collect();
        assert_eq!(keys, ["filesScanned", "ratio"]);
    }

    #[test]
    fn test_metadata_alias_and_overall_status() {
        let task = record(json!({
            "metadata": {"runId": "r", "taskName": "n", "createdAt": "2025-01-01"},
            "summary": {"overallStatus": "completed"}
        }));
        assert_eq!(task.run_id(), "r");
        assert_eq!(task.status(), Some("completed"));
        assert_eq!(task.task_type(), "");
    }

    #[test]
    fn test_malformed_fields_default_instead_of_failing() {
        let task = record(json!({
            "taskMetadata": {"runId": 42, "taskName": null, "createdAt": {"nested": true}},
            "summary": "not an object",
            "visualizations": "nope",
            "sections": [{"title": "ok", "content": "c"}, 7],
            "actions": [{"title": "a", "description": "d", "priority": "urgent"}]
        }));
        assert_eq!(task.run_id(), "42");
        assert_eq!(task.metadata.task_name, "");
        assert_eq!(task.metadata.created_at, "");
        assert!(task.summary.is_none());
        assert!(task.visualizations.is_empty());
        assert_eq!(task.sections.len(), 1);
        assert_eq!(task.actions[0].priority, None);
    }

    #[test]
    fn test_non_object_metadata_defaults() {
        let task = record(json!({"taskMetadata": null}));
        assert_eq!(task.metadata, TaskMetadata::default());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert!(parse_timestamp("2025-03-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2025-03-01T10:00:00.123+02:00").is_some());
        assert!(parse_timestamp("2025-03-01T10:00:00.123456").is_some());
        assert!(parse_timestamp("2025-03-01 10:00:00").is_some());
        assert!(parse_timestamp("2025-03-01").is_some());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());

        let a = parse_timestamp("2025-03-01T10:00:00+02:00").unwrap();
        let b = parse_timestamp("2025-03-01T08:00:00Z").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_section_priority_accepts_numeric_strings() {
        let section: Section =
            serde_json::from_value(json!({"title": "t", "content": "c", "priority": "2"})).unwrap();
        assert_eq!(section.priority, Some(2));
        let section: Section =
            serde_json::from_value(json!({"title": "t", "content": "c", "priority": null})).unwrap();
        assert_eq!(section.priority, None);
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(StatusKind::classify(Some("Completed")), StatusKind::Completed);
        assert_eq!(StatusKind::classify(Some("issues-found")), StatusKind::IssuesFound);
        assert_eq!(StatusKind::classify(Some("NEEDS-ATTENTION")), StatusKind::NeedsAttention);
        assert_eq!(StatusKind::classify(Some("in-progress")), StatusKind::InProgress);
        assert_eq!(
            StatusKind::classify(Some("seek-clarification")),
            StatusKind::SeekClarification
        );
        assert_eq!(StatusKind::classify(Some("exploded")), StatusKind::Unknown);
        assert_eq!(StatusKind::classify(None), StatusKind::Unknown);
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(scalar_text(&json!("x")), Some("x".to_string()));
        assert_eq!(scalar_text(&json!(3)), Some("3".to_string()));
        assert_eq!(scalar_text(&json!(true)), Some("true".to_string()));
        assert_eq!(scalar_text(&json!(null)), None);
        assert_eq!(scalar_text(&json!([1])), None);
    }
}
