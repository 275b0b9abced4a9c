//! JSON encoding of the task list, shared by storage and import/export.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::datetime::{DATE_FORMAT, optional_date_serde};
use crate::task::{Priority, Subtask, Task, TaskId};

pub const EXPORT_FILE_NAME: &str = "todo-tasks.json";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("import is not valid JSON")]
    Parse(#[source] serde_json::Error),

    #[error("import must be a JSON array of tasks, found {found}")]
    NotAnArray { found: &'static str },

    #[error("record {index} is not a task")]
    InvalidRecord {
        index: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// A task as found in storage or in an import file. Only `text` is required;
/// everything else falls back to the documented defaults.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    #[serde(default)]
    id: Option<TaskId>,
    text: String,
    #[serde(default)]
    markdown: Option<String>,
    #[serde(default, deserialize_with = "lenient_priority")]
    priority: Option<Priority>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default, with = "optional_date_serde")]
    start_date: Option<NaiveDate>,
    #[serde(default, with = "optional_date_serde")]
    end_date: Option<NaiveDate>,
    #[serde(default)]
    completed: bool,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    subtasks: Option<Vec<Subtask>>,
}

impl TaskRecord {
    fn into_task(self, now: DateTime<Utc>) -> Task {
        Task {
            id: self.id.unwrap_or_default(),
            text: self.text,
            markdown: self.markdown.unwrap_or_default(),
            priority: self.priority,
            category: self.category.filter(|c| !c.is_empty()),
            start_date: self.start_date,
            end_date: self.end_date,
            completed: self.completed,
            created_at: self.created_at.unwrap_or(now),
            subtasks: self.subtasks.unwrap_or_default(),
        }
    }
}

fn lenient_priority<'de, D>(deserializer: D) -> Result<Option<Priority>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Parses a task list, backfilling `createdAt` with `now` and assigning ids
/// to records that have none. Ids repeated within the list are reassigned so
/// identity stays unique.
#[instrument(skip(text, now), fields(bytes = text.len()))]
pub fn decode_tasks(text: &str, now: DateTime<Utc>) -> Result<Vec<Task>, ImportError> {
    let items = parse_array(text)?;

    let mut tasks: Vec<Task> = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let record: TaskRecord = serde_json::from_value(item)
            .map_err(|source| ImportError::InvalidRecord { index, source })?;
        push_unique(&mut tasks, record.into_task(now));
    }

    debug!(count = tasks.len(), "decoded tasks");
    Ok(tasks)
}

/// Reads the task list kept in storage. A damaged record never rejects the
/// list: fields that do not parse fall back to their defaults, and only
/// records without usable `text` are dropped.
#[instrument(skip(text, now), fields(bytes = text.len()))]
pub fn load_tasks(text: &str, now: DateTime<Utc>) -> Result<Vec<Task>, ImportError> {
    let items = parse_array(text)?;

    let mut tasks: Vec<Task> = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let task = match TaskRecord::deserialize(item) {
            Ok(record) => {
                Some(record.into_task(now)).filter(|task| !task.text.trim().is_empty())
            }
            Err(err) => {
                warn!(index, error = %err, "stored task is damaged; keeping readable fields");
                salvage(item, now)
            }
        };
        match task {
            Some(task) => push_unique(&mut tasks, task),
            None => warn!(index, "dropping stored task without text"),
        }
    }

    debug!(count = tasks.len(), "loaded tasks");
    Ok(tasks)
}

fn parse_array(text: &str) -> Result<Vec<Value>, ImportError> {
    match serde_json::from_str(text).map_err(ImportError::Parse)? {
        Value::Array(items) => Ok(items),
        other => Err(ImportError::NotAnArray {
            found: json_kind(&other),
        }),
    }
}

fn push_unique(tasks: &mut Vec<Task>, mut task: Task) {
    if tasks.iter().any(|existing| existing.id == task.id) {
        task.id = TaskId::new();
    }
    tasks.push(task);
}

fn salvage(item: &Value, now: DateTime<Utc>) -> Option<Task> {
    let object = item.as_object()?;
    let text = field(object, "text").filter(|text| !text.trim().is_empty())?;
    let date = |key| {
        field(object, key).and_then(|raw| NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok())
    };

    Some(Task {
        id: field(object, "id")
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .map(TaskId::from)
            .unwrap_or_default(),
        text: text.to_string(),
        markdown: field(object, "markdown").unwrap_or_default().to_string(),
        priority: field(object, "priority").and_then(|raw| raw.trim().parse().ok()),
        category: field(object, "category")
            .map(str::trim)
            .filter(|category| !category.is_empty())
            .map(str::to_string),
        start_date: date("startDate"),
        end_date: date("endDate"),
        completed: object
            .get("completed")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        created_at: field(object, "createdAt")
            .and_then(|raw| raw.trim().parse::<DateTime<Utc>>().ok())
            .unwrap_or(now),
        subtasks: object
            .get("subtasks")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| Subtask::deserialize(item).ok())
                    .collect()
            })
            .unwrap_or_default(),
    })
}

fn field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

pub fn encode_tasks(tasks: &[Task]) -> serde_json::Result<String> {
    serde_json::to_string(tasks)
}

/// Human-readable export document.
pub fn export_tasks(tasks: &[Task]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(tasks)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
