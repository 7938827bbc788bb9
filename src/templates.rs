//! Template collection and the fetch / refresh-then-refetch cycle.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::service::TaskDataService;
use crate::{dlog, dlog_warn, Result};

/// Template key → raw template text, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateCollection {
    templates: BTreeMap<String, String>,
}

impl TemplateCollection {
    /// Read a template payload. Both `{ templates: {...} }` and a bare
    /// mapping are accepted; anything else is empty. Values that are not
    /// strings are skipped.
    pub fn from_value(payload: &Value) -> Self {
        let mapping = match payload.get("templates") {
            Some(inner) => inner,
            None => payload,
        };
        let Some(object) = mapping.as_object() else {
            if !mapping.is_null() {
                dlog_warn!("Template payload is not a mapping, treating as empty");
            }
            return Self::default();
        };

        let templates = object
            .iter()
            .filter_map(|(key, value)| match value.as_str() {
                Some(text) => Some((key.clone(), text.to_string())),
                None => {
                    dlog_warn!("Skipping template '{}': value is not text", key);
                    None
                }
            })
            .collect();
        Self { templates }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.templates.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    pub fn first_key(&self) -> Option<&str> {
        self.keys().next()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.templates.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys whose name mentions `task_type`, ignoring case.
    pub fn for_task_type(&self, task_type: &str) -> Vec<&str> {
        let needle = task_type.to_lowercase();
        self.keys()
            .filter(|key| key.to_lowercase().contains(&needle))
            .collect()
    }
}

/// Template key without a trailing `.md`.
pub fn display_name(key: &str) -> &str {
    key.strip_suffix(".md").unwrap_or(key)
}

/// Result of asking the backend to regenerate its templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// New template content was produced; exactly one refetch follows.
    Refreshed { file_count: Option<u64> },
    /// The backend reported an error. No refetch.
    Rejected { error: String },
    /// Neither content nor error. No refetch.
    Empty,
}

impl RefreshOutcome {
    pub fn from_value(response: &Value) -> Self {
        if let Some(error) = response.get("error").filter(|e| !e.is_null()) {
            let error = match error.as_str() {
                Some(s) => s.to_string(),
                None => error.to_string(),
            };
            return Self::Rejected { error };
        }
        if response.get("content").is_some_and(|c| !c.is_null()) {
            return Self::Refreshed {
                file_count: response.get("file_count").and_then(Value::as_u64),
            };
        }
        Self::Empty
    }

    pub fn needs_refetch(&self) -> bool {
        matches!(self, Self::Refreshed { .. })
    }
}

/// Templates as last successfully fetched.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    collection: TemplateCollection,
    loaded: bool,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection(&self) -> &TemplateCollection {
        &self.collection
    }

    /// Whether at least one fetch has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Replace the collection on success. On failure the previous
    /// collection stays and the error is handed back for reporting.
    pub fn apply_fetch(&mut self, result: Result<TemplateCollection>) -> Result<&TemplateCollection> {
        let collection = result?;
        self.collection = collection;
        self.loaded = true;
        Ok(&self.collection)
    }
}

pub async fn fetch_templates(service: &dyn TaskDataService) -> Result<TemplateCollection> {
    let payload = service.get_task_templates().await?;
    let collection = TemplateCollection::from_value(&payload);
    dlog!("Fetched {} templates", collection.len());
    Ok(collection)
}

/// Ask the backend to regenerate templates. Only the refresh call is made
/// here; the caller issues the refetch when [`RefreshOutcome::needs_refetch`].
pub async fn refresh_templates(service: &dyn TaskDataService) -> Result<RefreshOutcome> {
    let response = service.refresh_templates().await?;
    let outcome = RefreshOutcome::from_value(&response);
    dlog!("Template refresh finished: {:?}", outcome);
    Ok(outcome)
}
