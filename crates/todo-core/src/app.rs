use std::cell::{Ref, RefCell};
use std::rc::Rc;

use anyhow::Context;
use tracing::{debug, info, warn};

use crate::bus::Subscription;
use crate::datetime::Clock;
use crate::i18n::{self, Label};
use crate::intent::{Command, TaskCommand, ViewIntent};
use crate::markup::{CommonMarkRenderer, HtmlSanitizer, Sanitizer};
use crate::repository::TaskRepository;
use crate::resolver::{self, Resolution};
use crate::state::{AppState, StatePatch};
use crate::storage::KeyValueStore;
use crate::task::{TaskId, TaskInput};
use crate::transfer::{decode_tasks, export_tasks};
use crate::transform::{FilterCriteria, SortBy};
use crate::view::{DEFAULT_ITEMS_PER_PAGE, FilterPanel, ListView, TaskForm, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A localized message for the user about the outcome of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    fn success(message: &str) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.to_string(),
        }
    }

    fn error(message: &str) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NoticeKind::Error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppOptions {
    pub items_per_page: usize,
    pub sort_by: Option<SortBy>,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            sort_by: None,
        }
    }
}

/// The repository plus the views subscribed to it. Every gesture enters
/// through [`App::dispatch`] or [`App::apply`].
pub struct App<S> {
    repo: TaskRepository<S>,
    clock: Rc<dyn Clock>,
    sanitizer: Box<dyn Sanitizer>,
    list: Rc<RefCell<ListView>>,
    form: Rc<RefCell<TaskForm>>,
    filters: Rc<RefCell<FilterPanel>>,
    subscriptions: Vec<Subscription>,
}

impl<S: KeyValueStore> App<S> {
    #[tracing::instrument(skip(store, clock))]
    pub fn new(store: S, options: AppOptions, clock: Rc<dyn Clock>) -> Self {
        let repo = TaskRepository::open(store, clock.now());
        let criteria = FilterCriteria {
            sort_by: options.sort_by,
            ..FilterCriteria::default()
        };

        let list = Rc::new(RefCell::new(ListView::new(
            options.items_per_page,
            criteria.clone(),
            Rc::clone(&clock),
            Rc::new(CommonMarkRenderer),
        )));
        let form = Rc::new(RefCell::new(TaskForm::default()));
        let filters = Rc::new(RefCell::new(FilterPanel::new(criteria)));

        let subscriptions = vec![
            attach(&repo, &list),
            attach(&repo, &form),
            attach(&repo, &filters),
        ];

        Self {
            repo,
            clock,
            sanitizer: Box::new(HtmlSanitizer),
            list,
            form,
            filters,
            subscriptions,
        }
    }

    pub fn state(&self) -> &AppState {
        self.repo.get_state()
    }

    pub fn repository(&self) -> &TaskRepository<S> {
        &self.repo
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn list(&self) -> Ref<'_, ListView> {
        self.list.borrow()
    }

    pub fn form(&self) -> Ref<'_, TaskForm> {
        self.form.borrow()
    }

    pub fn filters(&self) -> Ref<'_, FilterPanel> {
        self.filters.borrow()
    }

    /// Id of the only task whose id starts with `prefix`.
    pub fn find(&self, prefix: &str) -> Option<TaskId> {
        self.state().find_by_prefix(prefix).map(|task| task.id)
    }

    /// Edit-form prefill for the row at `view_index`.
    pub fn prefill(&self, view_index: usize) -> Option<TaskInput> {
        let id = resolver::row_id(self.list.borrow().model(), view_index)?;
        self.state().task(id).map(TaskForm::prefill)
    }

    /// Resolves `intent` against the last rendered list and runs it.
    #[tracing::instrument(skip(self, intent))]
    pub fn dispatch(&mut self, intent: ViewIntent) -> Option<Notice> {
        let resolution = resolver::resolve(self.list.borrow().model(), intent);
        match resolution {
            Resolution::Command(command) => self.apply(Command::Task(command)),
            Resolution::Filter(criteria) => {
                debug!(?criteria, "applying filter");
                self.filters.borrow_mut().set_criteria(criteria.clone());
                self.list
                    .borrow_mut()
                    .apply_filter(criteria, self.repo.get_state());
                None
            }
            Resolution::Page(page) => {
                self.list
                    .borrow_mut()
                    .change_page(page, self.repo.get_state());
                None
            }
            Resolution::Ignored => None,
        }
    }

    #[tracing::instrument(skip(self, command))]
    pub fn apply(&mut self, command: Command) -> Option<Notice> {
        let state = self.repo.get_state();
        let language = state.language;

        let (patch, success) = match command {
            Command::Task(command) => {
                if let Err(label) = self.form.borrow().validate(&command) {
                    warn!(command = command.name(), "rejected blank draft");
                    return Some(Notice::error(i18n::text(language, label)));
                }
                match command.apply(&state.tasks, self.sanitizer.as_ref(), self.clock.now()) {
                    Some(tasks) => {
                        info!(command = command.name(), tasks = tasks.len(), "applying command");
                        (StatePatch::tasks(tasks), None)
                    }
                    None => {
                        debug!(command = command.name(), "command changed nothing");
                        return None;
                    }
                }
            }
            Command::ToggleTheme => (StatePatch::theme(state.theme.toggled()), None),
            Command::SetTheme(theme) => (StatePatch::theme(theme), None),
            Command::ToggleLanguage => (StatePatch::language(language.toggled()), None),
            Command::SetLanguage(language) => (StatePatch::language(language), None),
            Command::Import(text) => match decode_tasks(&text, self.clock.now()) {
                Ok(tasks) => {
                    info!(tasks = tasks.len(), "importing tasks");
                    (StatePatch::tasks(tasks), Some(Label::ImportSuccess))
                }
                Err(err) => {
                    warn!(error = %err, "import rejected; tasks unchanged");
                    return Some(Notice::error(i18n::text(language, Label::ImportError)));
                }
            },
        };

        if let Err(err) = self.repo.set_state(patch) {
            debug!(error = %err, "state updated but not persisted");
            let language = self.repo.get_state().language;
            return Some(Notice::error(i18n::text(language, Label::SaveError)));
        }
        success.map(|label| Notice::success(i18n::text(self.repo.get_state().language, label)))
    }

    /// Convenience for [`Command::Task`].
    pub fn run(&mut self, command: TaskCommand) -> Option<Notice> {
        self.apply(Command::Task(command))
    }

    /// The current collection as an export document.
    pub fn export(&self) -> anyhow::Result<String> {
        export_tasks(&self.state().tasks).context("failed to encode tasks for export")
    }
}

impl<S> Drop for App<S> {
    fn drop(&mut self) {
        for subscription in &self.subscriptions {
            subscription.unsubscribe();
        }
    }
}

/// Renders `view` once from the current state, then on every change.
fn attach<S, V>(repo: &TaskRepository<S>, view: &Rc<RefCell<V>>) -> Subscription
where
    S: KeyValueStore,
    V: View + 'static,
{
    view.borrow_mut().render(repo.get_state());
    let view = Rc::clone(view);
    repo.subscribe(move |state| view.borrow_mut().render(state))
}
