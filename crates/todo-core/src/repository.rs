use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::bus::{SubscriberList, Subscription};
use crate::state::{AppState, Language, StatePatch, Theme};
use crate::storage::{
    KeyValueStore, LANGUAGE_KEY, LEGACY_DARK_MODE_KEY, StorageError, TASKS_KEY, THEME_KEY,
    UNREADABLE_TASKS_KEY,
};
use crate::transfer::{encode_tasks, load_tasks};
use crate::transform::extract_categories;

/// A write that did not reach the store. The in-memory state has already been
/// updated and subscribers notified when this is returned.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to save {key}")]
    Storage {
        key: &'static str,
        #[source]
        source: StorageError,
    },

    #[error("failed to encode {key}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Owns the canonical state and is the only place it changes.
pub struct TaskRepository<S> {
    state: AppState,
    store: S,
    subscribers: SubscriberList,
}

impl<S: KeyValueStore> TaskRepository<S> {
    /// Seeds state from `store`. Damaged task records keep whatever fields
    /// still parse. A task list that cannot be read at all is copied to
    /// [`UNREADABLE_TASKS_KEY`] and the session starts empty. Nothing else is
    /// written back until the first mutation.
    #[tracing::instrument(skip(store, now))]
    pub fn open(mut store: S, now: DateTime<Utc>) -> Self {
        let tasks = match store.get(TASKS_KEY) {
            Ok(Some(raw)) => match load_tasks(&raw, now) {
                Ok(tasks) => tasks,
                Err(err) => {
                    warn!(error = %err, "stored tasks are unreadable; starting empty");
                    if let Err(err) = store.set(UNREADABLE_TASKS_KEY, &raw) {
                        error!(error = %err, "failed to keep a copy of unreadable tasks");
                    }
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "failed to read stored tasks; starting empty");
                Vec::new()
            }
        };

        let language = read_pref(&store, LANGUAGE_KEY)
            .and_then(|raw| raw.parse::<Language>().ok())
            .unwrap_or_default();

        let theme = read_pref(&store, THEME_KEY)
            .and_then(|raw| raw.parse::<Theme>().ok())
            .or_else(|| {
                read_pref(&store, LEGACY_DARK_MODE_KEY).map(|raw| {
                    if raw.trim() == "true" {
                        Theme::Dark
                    } else {
                        Theme::Light
                    }
                })
            })
            .unwrap_or_default();

        info!(
            tasks = tasks.len(),
            language = %language,
            theme = %theme,
            "opened task repository"
        );

        Self {
            state: AppState {
                tasks,
                language,
                theme,
            },
            store,
            subscribers: SubscriberList::new(),
        }
    }

    /// Current state. Mutate only through [`Self::set_state`].
    pub fn get_state(&self) -> &AppState {
        &self.state
    }

    /// Merges `patch`, persists the fields it carries, then notifies every
    /// subscriber with the full new state. A storage failure is reported after
    /// the update and notification have happened; the in-memory state stays
    /// authoritative for the session.
    #[tracing::instrument(skip(self, patch), fields(
        tasks = patch.tasks.as_ref().map(Vec::len),
        language = ?patch.language,
        theme = ?patch.theme
    ))]
    pub fn set_state(&mut self, patch: StatePatch) -> Result<(), PersistError> {
        if patch.is_empty() {
            debug!("empty patch; nothing to do");
            return Ok(());
        }

        let persist_tasks = patch.tasks.is_some();
        let persist_language = patch.language.is_some();
        let persist_theme = patch.theme.is_some();
        patch.apply_to(&mut self.state);

        let mut first_failure = None;
        if persist_tasks {
            let outcome = encode_tasks(&self.state.tasks)
                .map_err(|source| PersistError::Encode {
                    key: TASKS_KEY,
                    source,
                })
                .and_then(|encoded| self.write(TASKS_KEY, &encoded));
            record_failure(&mut first_failure, outcome);
        }
        if persist_language {
            let code = self.state.language.code();
            let outcome = self.write(LANGUAGE_KEY, code);
            record_failure(&mut first_failure, outcome);
        }
        if persist_theme {
            let value = self.state.theme.storage_value();
            let outcome = self.write(THEME_KEY, value);
            record_failure(&mut first_failure, outcome);
        }

        debug!(subscribers = self.subscribers.len(), "notifying subscribers");
        self.subscribers.notify(&self.state);

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&AppState) + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Category set derived from the current tasks.
    pub fn categories(&self) -> BTreeSet<String> {
        extract_categories(&self.state.tasks)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn write(&mut self, key: &'static str, value: &str) -> Result<(), PersistError> {
        self.store.set(key, value).map_err(|source| {
            error!(key, error = %source, "failed to persist state");
            PersistError::Storage { key, source }
        })
    }
}

fn read_pref<S: KeyValueStore>(store: &S, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(err) => {
            warn!(key, error = %err, "failed to read preference");
            None
        }
    }
}

fn record_failure(slot: &mut Option<PersistError>, outcome: Result<(), PersistError>) {
    if let Err(err) = outcome
        && slot.is_none()
    {
        *slot = Some(err);
    }
}
