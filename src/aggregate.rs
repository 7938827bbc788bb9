//! Task aggregation: envelope validation, recency ordering and grouping.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::model::{TaskRecord, UNCATEGORIZED};
use crate::service::TaskDataService;
use crate::{dlog, dlog_trace, dlog_warn, Result};

/// The core task type. It is shown through the Templates category, so it
/// never becomes a custom category of its own.
pub const CORE_TYPE: &str = "tasks";

/// All fetched tasks plus their grouping by type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskCollection {
    /// Newest first.
    pub all_tasks: Vec<TaskRecord>,
    /// Type → records, each list in `all_tasks` order.
    pub tasks_by_type: BTreeMap<String, Vec<TaskRecord>>,
    /// Sorted task types other than [`CORE_TYPE`].
    pub custom_types: Vec<String>,
}

impl TaskCollection {
    /// Build from a `{ tasks: [...] }` envelope.
    ///
    /// A missing or non-array `tasks` field gives an empty collection.
    /// Array items that are not objects are skipped.
    pub fn from_value(envelope: &Value) -> Self {
        let Some(items) = envelope.get("tasks").and_then(Value::as_array) else {
            if !envelope.is_null() {
                dlog_warn!("Task envelope has no 'tasks' array, treating as empty");
            }
            return Self::default();
        };

        let records = items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| {
                if !item.is_object() {
                    dlog_warn!("Skipping task record #{}: not an object", index);
                    return None;
                }
                match serde_json::from_value::<TaskRecord>(item.clone()) {
                    Ok(record) => Some((index, record)),
                    Err(e) => {
                        dlog_warn!("Skipping task record #{}: {}", index, e);
                        None
                    }
                }
            })
            .map(|(index, mut record)| {
                if record.metadata.run_id.is_empty() {
                    record.metadata.run_id = format!("#{}", index);
                }
                record
            })
            .collect();

        Self::from_records(records)
    }

    /// Order, default and group already-parsed records.
    pub fn from_records(mut records: Vec<TaskRecord>) -> Self {
        for record in &mut records {
            if record.metadata.task_type.trim().is_empty() {
                record.metadata.task_type = UNCATEGORIZED.to_string();
            }
        }

        // `sort_by_key` is stable, so equal timestamps keep fetch order.
        // `None` orders below every `Some`, which puts bad timestamps last
        // once reversed.
        records.sort_by_key(|r| std::cmp::Reverse(r.metadata.created_at_utc()));

        let mut tasks_by_type: BTreeMap<String, Vec<TaskRecord>> = BTreeMap::new();
        for record in &records {
            dlog_trace!("Grouping {} under '{}'", record.run_id(), record.task_type());
            tasks_by_type
                .entry(record.task_type().to_string())
                .or_default()
                .push(record.clone());
        }

        let custom_types = tasks_by_type
            .keys()
            .filter(|t| t.as_str() != CORE_TYPE)
            .cloned()
            .collect();

        Self {
            all_tasks: records,
            tasks_by_type,
            custom_types,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.all_tasks.is_empty()
    }

    /// Records of one type, newest first. Unknown types give an empty slice.
    pub fn tasks_of(&self, task_type: &str) -> &[TaskRecord] {
        self.tasks_by_type
            .get(task_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn find(&self, run_id: &str) -> Option<&TaskRecord> {
        self.all_tasks.iter().find(|r| r.run_id() == run_id)
    }
}

/// Fetch and aggregate all tasks. Transport and parse failures are
/// returned as errors; no partial collection is ever produced.
pub async fn fetch_tasks(service: &dyn TaskDataService) -> Result<TaskCollection> {
    let envelope = service.get_all_tasks().await?;
    let collection = TaskCollection::from_value(&envelope);
    dlog!(
        "Fetched {} tasks in {} types",
        collection.all_tasks.len(),
        collection.tasks_by_type.len()
    );
    Ok(collection)
}
