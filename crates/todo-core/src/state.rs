use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;

use crate::task::{Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    English,
    Vietnamese,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Vietnamese => "vi",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Language::English => Language::Vietnamese,
            Language::Vietnamese => Language::English,
        }
    }
}

impl FromStr for Language {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "vi" | "vietnamese" => Ok(Language::Vietnamese),
            other => Err(anyhow!("unsupported language: {other}")),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn storage_value(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl FromStr for Theme {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" | "day" => Ok(Theme::Light),
            "dark" | "night" => Ok(Theme::Dark),
            other => Err(anyhow!("unsupported theme: {other}")),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.storage_value())
    }
}

/// Everything the repository owns. Categories are derived from `tasks` on
/// demand and never stored here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    pub tasks: Vec<Task>,
    pub language: Language,
    pub theme: Theme,
}

impl AppState {
    pub fn position_of(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Resolves a user-typed id prefix; `None` when nothing or more than one
    /// task matches.
    pub fn find_by_prefix(&self, prefix: &str) -> Option<&Task> {
        let mut matches = self.tasks.iter().filter(|task| task.id.matches_prefix(prefix));
        let first = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(first)
    }
}

/// A partial update for [`crate::repository::TaskRepository::set_state`].
#[derive(Debug, Clone, Default)]
pub struct StatePatch {
    pub tasks: Option<Vec<Task>>,
    pub language: Option<Language>,
    pub theme: Option<Theme>,
}

impl StatePatch {
    pub fn tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Some(tasks),
            ..Self::default()
        }
    }

    pub fn language(language: Language) -> Self {
        Self {
            language: Some(language),
            ..Self::default()
        }
    }

    pub fn theme(theme: Theme) -> Self {
        Self {
            theme: Some(theme),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_none() && self.language.is_none() && self.theme.is_none()
    }

    pub(crate) fn apply_to(self, state: &mut AppState) {
        if let Some(tasks) = self.tasks {
            state.tasks = tasks;
        }
        if let Some(language) = self.language {
            state.language = language;
        }
        if let Some(theme) = self.theme {
            state.theme = theme;
        }
    }
}
