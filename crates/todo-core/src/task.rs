use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::datetime::optional_date_serde;
use crate::markup::Sanitizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// First eight hex digits, used wherever a compact handle is displayed.
    pub fn short(&self) -> String {
        let mut simple = self.0.simple().to_string();
        simple.truncate(8);
        simple
    }

    pub fn matches_prefix(&self, prefix: &str) -> bool {
        let prefix = prefix.trim().to_ascii_lowercase().replace('-', "");
        !prefix.is_empty() && self.0.simple().to_string().starts_with(&prefix)
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for TaskId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    /// Rank with a missing priority ordered below `Low`.
    pub fn rank_of(priority: Option<Priority>) -> u8 {
        priority.map_or(0, Priority::rank)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The Vietnamese labels are what older exports stored verbatim.
        match s.trim().to_lowercase().as_str() {
            "low" | "thấp" => Ok(Priority::Low),
            "medium" | "trung bình" => Ok(Priority::Medium),
            "high" | "cao" => Ok(Priority::High),
            other => Err(anyhow!("unknown priority: {other}")),
        }
    }
}

impl TryFrom<String> for Priority {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Priority> for String {
    fn from(value: Priority) -> Self {
        value.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,

    pub text: String,

    #[serde(default)]
    pub markdown: String,

    #[serde(default)]
    pub priority: Option<Priority>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default, with = "optional_date_serde")]
    pub start_date: Option<NaiveDate>,

    #[serde(default, with = "optional_date_serde")]
    pub end_date: Option<NaiveDate>,

    #[serde(default)]
    pub completed: bool,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub subtasks: Vec<Subtask>,
}

/// The user-editable fields of a task, as collected by the add and edit forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInput {
    pub markdown: String,
    pub priority: Priority,
    pub category: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TaskInput {
    pub fn new(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            priority: Priority::Low,
            category: String::new(),
            start_date: None,
            end_date: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.markdown.trim().is_empty()
    }
}

impl Task {
    pub fn create(input: &TaskInput, sanitizer: &dyn Sanitizer, now: DateTime<Utc>) -> Self {
        Self {
            id: TaskId::new(),
            text: sanitizer.sanitize(&input.markdown),
            markdown: input.markdown.clone(),
            priority: Some(input.priority),
            category: clean_category(&input.category, sanitizer),
            start_date: input.start_date,
            end_date: input.end_date,
            completed: false,
            created_at: now,
            subtasks: vec![],
        }
    }

    /// Overwrites the editable fields; identity, status, creation time and
    /// subtasks are kept.
    pub fn apply_edit(&mut self, input: &TaskInput, sanitizer: &dyn Sanitizer) {
        self.text = sanitizer.sanitize(&input.markdown);
        self.markdown = input.markdown.clone();
        self.priority = Some(input.priority);
        self.category = clean_category(&input.category, sanitizer);
        self.start_date = input.start_date;
        self.end_date = input.end_date;
    }

    pub fn set_category(&mut self, raw: &str, sanitizer: &dyn Sanitizer) {
        self.category = clean_category(raw, sanitizer);
    }

    /// Prefill for the edit form: the markdown source, or the summary for
    /// records that never had one.
    pub fn to_input(&self) -> TaskInput {
        TaskInput {
            markdown: self.source().to_string(),
            priority: self.priority.unwrap_or(Priority::Low),
            category: self.category.clone().unwrap_or_default(),
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }

    pub fn source(&self) -> &str {
        if self.markdown.is_empty() {
            &self.text
        } else {
            &self.markdown
        }
    }

    pub fn has_category(&self) -> bool {
        self.category.as_deref().is_some_and(|c| !c.is_empty())
    }
}

fn clean_category(raw: &str, sanitizer: &dyn Sanitizer) -> Option<String> {
    let cleaned = sanitizer.sanitize(raw.trim());
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::markup::HtmlSanitizer;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap()
    }

    #[test]
    fn create_sanitizes_and_defaults() {
        let mut input = TaskInput::new("Buy **milk** <script>alert(1)</script>");
        input.category = "  <b>Home</b>  ".to_string();
        let task = Task::create(&input, &HtmlSanitizer, now());

        assert_eq!(task.text, "Buy **milk** ");
        assert_eq!(task.markdown, input.markdown);
        assert_eq!(task.category.as_deref(), Some("Home"));
        assert_eq!(task.priority, Some(Priority::Low));
        assert!(!task.completed);
        assert_eq!(task.created_at, now());
        assert!(task.subtasks.is_empty());
    }

    #[test]
    fn blank_category_clears() {
        let mut task = Task::create(&TaskInput::new("x"), &HtmlSanitizer, now());
        task.set_category("Work", &HtmlSanitizer);
        assert!(task.has_category());
        task.set_category("   ", &HtmlSanitizer);
        assert_eq!(task.category, None);
    }

    #[test]
    fn edit_keeps_identity_and_creation_time() {
        let mut task = Task::create(&TaskInput::new("first"), &HtmlSanitizer, now());
        task.completed = true;
        let id = task.id;

        let mut edit = task.to_input();
        edit.markdown = "second".to_string();
        edit.priority = Priority::High;
        task.apply_edit(&edit, &HtmlSanitizer);

        assert_eq!(task.id, id);
        assert_eq!(task.created_at, now());
        assert!(task.completed);
        assert_eq!(task.text, "second");
        assert_eq!(task.priority, Some(Priority::High));
    }

    #[test]
    fn priority_parses_english_and_legacy_labels() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("Trung bình".parse::<Priority>().unwrap(), Priority::Medium);
        assert_eq!("Thấp".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
        assert!(Priority::High.rank() > Priority::Medium.rank());
        assert_eq!(Priority::rank_of(None), 0);
    }

    #[test]
    fn short_id_matches_its_own_prefix() {
        let id = TaskId::new();
        assert_eq!(id.short().len(), 8);
        assert!(id.matches_prefix(&id.short()));
        assert!(id.matches_prefix(&id.short().to_uppercase()));
        assert!(!id.matches_prefix(""));
    }
}
