//! Declarative views. Each one rebuilds its model from the complete state on
//! every notification and holds no task data of its own.

use std::collections::BTreeSet;
use std::rc::Rc;

use chrono::NaiveDate;
use tracing::debug;

use crate::datetime::Clock;
use crate::i18n::{self, Label};
use crate::intent::TaskCommand;
use crate::markup::{MarkdownRenderer, escape_html};
use crate::state::{AppState, Language, Theme};
use crate::task::{Priority, Subtask, Task, TaskId, TaskInput};
use crate::transform::{
    DueDateStatus, FilterCriteria, derive_view, due_date_status, extract_categories, page_window,
};

pub const DEFAULT_ITEMS_PER_PAGE: usize = 10;

/// Something kept current by a repository subscription.
pub trait View {
    fn render(&mut self, state: &AppState);
}

/// One rendered task, positioned within the current page.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRow {
    pub view_index: usize,
    pub id: TaskId,
    /// Tag-stripped plain summary, unescaped. Use `html` for markup.
    pub text: String,
    /// Rendered markdown, or the escaped summary when there is none.
    pub html: String,
    pub completed: bool,
    pub priority: Option<Priority>,
    pub priority_label: &'static str,
    pub category: Option<String>,
    pub category_label: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub due: DueDateStatus,
    pub due_label: &'static str,
    pub subtasks: Vec<Subtask>,
}

impl TaskRow {
    pub fn new(
        view_index: usize,
        task: &Task,
        language: Language,
        today: NaiveDate,
        renderer: &dyn MarkdownRenderer,
    ) -> Self {
        let html = if task.markdown.is_empty() {
            escape_html(&task.text)
        } else {
            renderer.render(&task.markdown)
        };
        let category_label = match task.category.as_deref() {
            Some(category) if !category.is_empty() => category.to_string(),
            _ => i18n::text(language, Label::NoCategory).to_string(),
        };
        let due = due_date_status(task.end_date, today);

        Self {
            view_index,
            id: task.id,
            text: task.text.clone(),
            html,
            completed: task.completed,
            priority: task.priority,
            priority_label: i18n::priority_label(language, task.priority),
            category: task.category.clone(),
            category_label,
            start_date: task.start_date,
            end_date: task.end_date,
            due,
            due_label: i18n::due_label(language, due),
            subtasks: task.subtasks.clone(),
        }
    }

    pub fn completed_subtasks(&self) -> usize {
        self.subtasks.iter().filter(|subtask| subtask.completed).count()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListViewModel {
    pub rows: Vec<TaskRow>,
    pub page: usize,
    pub total_pages: usize,
    /// Tasks accepted by the criteria, across all pages.
    pub total_matches: usize,
    pub language: Language,
    pub theme: Theme,
}

/// The filtered, sorted, paginated task list. Owns the pagination cursor.
pub struct ListView {
    items_per_page: usize,
    current_page: usize,
    criteria: FilterCriteria,
    clock: Rc<dyn Clock>,
    renderer: Rc<dyn MarkdownRenderer>,
    model: ListViewModel,
}

impl ListView {
    pub fn new(
        items_per_page: usize,
        criteria: FilterCriteria,
        clock: Rc<dyn Clock>,
        renderer: Rc<dyn MarkdownRenderer>,
    ) -> Self {
        Self {
            items_per_page: items_per_page.max(1),
            current_page: 1,
            criteria,
            clock,
            renderer,
            model: ListViewModel::default(),
        }
    }

    pub fn model(&self) -> &ListViewModel {
        &self.model
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    /// New criteria always start from the first page.
    pub fn apply_filter(&mut self, criteria: FilterCriteria, state: &AppState) {
        self.criteria = criteria;
        self.current_page = 1;
        self.render(state);
    }

    pub fn change_page(&mut self, page: usize, state: &AppState) {
        self.current_page = page;
        self.render(state);
    }
}

impl View for ListView {
    fn render(&mut self, state: &AppState) {
        let today = self.clock.today();
        let derived = derive_view(&state.tasks, &self.criteria);
        let window = page_window(derived.len(), self.current_page, self.items_per_page);
        self.current_page = window.page;

        let rows = derived[window.start..window.end]
            .iter()
            .enumerate()
            .map(|(view_index, task)| {
                TaskRow::new(
                    view_index,
                    task,
                    state.language,
                    today,
                    self.renderer.as_ref(),
                )
            })
            .collect();

        self.model = ListViewModel {
            rows,
            page: window.page,
            total_pages: window.total_pages,
            total_matches: derived.len(),
            language: state.language,
            theme: state.theme,
        };
        debug!(
            page = window.page,
            total_pages = window.total_pages,
            matches = derived.len(),
            "rendered task list"
        );
    }
}

/// The add/edit form: category suggestions and draft validation.
#[derive(Debug, Clone, Default)]
pub struct TaskForm {
    categories: BTreeSet<String>,
    language: Language,
}

impl TaskForm {
    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Rejects drafts with nothing to save.
    pub fn validate(&self, command: &TaskCommand) -> Result<(), Label> {
        match command {
            TaskCommand::Create(input) | TaskCommand::Edit(_, input) if input.is_blank() => {
                Err(Label::EmptyTask)
            }
            TaskCommand::AddSubtask(_, text) if text.trim().is_empty() => {
                Err(Label::EmptySubtask)
            }
            _ => Ok(()),
        }
    }

    pub fn prefill(task: &Task) -> TaskInput {
        task.to_input()
    }
}

impl View for TaskForm {
    fn render(&mut self, state: &AppState) {
        self.categories = extract_categories(&state.tasks);
        self.language = state.language;
    }
}

/// Filter controls. The category options follow the tasks; the selected
/// criteria only change when the user applies new ones.
#[derive(Debug, Clone, Default)]
pub struct FilterPanel {
    categories: BTreeSet<String>,
    criteria: FilterCriteria,
    language: Language,
}

impl FilterPanel {
    pub fn new(criteria: FilterCriteria) -> Self {
        Self {
            criteria,
            ..Self::default()
        }
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    /// Category choices with their display labels; `None` selects every
    /// category.
    pub fn category_options(&self) -> Vec<(Option<String>, String)> {
        let all = i18n::text(self.language, Label::AllCategories).to_string();
        std::iter::once((None, all))
            .chain(
                self.categories
                    .iter()
                    .map(|category| (Some(category.clone()), category.clone())),
            )
            .collect()
    }
}

impl View for FilterPanel {
    fn render(&mut self, state: &AppState) {
        self.categories = extract_categories(&state.tasks);
        self.language = state.language;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::datetime::FixedClock;
    use crate::markup::{CommonMarkRenderer, HtmlSanitizer, Sanitizer};
    use crate::transform::{SortBy, SortCriterion, SortDirection};

    fn clock() -> Rc<dyn Clock> {
        Rc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap(),
        ))
    }

    fn state_with(count: usize) -> AppState {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        AppState {
            tasks: (0..count)
                .map(|n| Task::create(&TaskInput::new(format!("task {n}")), &HtmlSanitizer, now))
                .collect(),
            ..AppState::default()
        }
    }

    fn list(per_page: usize) -> ListView {
        ListView::new(
            per_page,
            FilterCriteria::default(),
            clock(),
            Rc::new(CommonMarkRenderer),
        )
    }

    #[test]
    fn render_paginates_with_page_local_indices() {
        let state = state_with(25);
        let mut view = list(10);
        view.change_page(3, &state);

        let model = view.model();
        assert_eq!(model.page, 3);
        assert_eq!(model.total_pages, 3);
        assert_eq!(model.total_matches, 25);
        assert_eq!(model.rows.len(), 5);
        assert_eq!(model.rows[0].view_index, 0);
        assert_eq!(model.rows[0].text, "task 20");
    }

    #[test]
    fn refresh_keeps_page_and_filter_resets_it() {
        let mut state = state_with(25);
        let mut view = list(10);
        view.change_page(2, &state);

        state.theme = Theme::Dark;
        view.render(&state);
        assert_eq!(view.current_page(), 2);
        assert_eq!(view.model().theme, Theme::Dark);

        let criteria = FilterCriteria {
            sort_by: Some(SortBy::new(SortCriterion::DateCreated, SortDirection::Desc)),
            ..FilterCriteria::default()
        };
        view.apply_filter(criteria, &state);
        assert_eq!(view.current_page(), 1);
    }

    #[test]
    fn page_past_the_end_is_clamped() {
        let mut state = state_with(25);
        let mut view = list(10);
        view.change_page(3, &state);

        state.tasks.truncate(12);
        view.render(&state);
        assert_eq!(view.model().page, 2);
        assert_eq!(view.model().rows.len(), 2);
    }

    #[test]
    fn rows_carry_labels_and_markup() {
        let mut state = state_with(1);
        state.tasks[0].markdown = "**bold** <script>x</script>".into();
        state.tasks[0].end_date = NaiveDate::from_ymd_opt(2024, 6, 9);
        state.language = Language::Vietnamese;

        let mut view = list(10);
        view.render(&state);
        let row = &view.model().rows[0];

        assert!(row.html.contains("<strong>bold</strong>"));
        assert!(!row.html.contains("<script>"));
        assert_eq!(row.category_label, "Không có danh mục");
        assert_eq!(row.due, DueDateStatus::Overdue);
        assert_eq!(row.due_label, "Quá hạn");
        assert_eq!(row.priority_label, "Thấp");
    }

    #[test]
    fn plain_summary_is_escaped_only_in_html() {
        let mut state = state_with(1);
        state.tasks[0].text = HtmlSanitizer.sanitize("a < b & <i>c</i> > \"d\"");
        state.tasks[0].markdown = String::new();

        let mut view = list(10);
        view.render(&state);
        let row = &view.model().rows[0];

        assert_eq!(row.text, "a < b & c > \"d\"");
        assert_eq!(row.html, "a &lt; b &amp; c &gt; &quot;d&quot;");
    }

    #[test]
    fn form_tracks_categories_and_rejects_blank_drafts() {
        let mut state = state_with(2);
        state.tasks[0].category = Some("Work".into());
        let mut form = TaskForm::default();
        form.render(&state);

        assert_eq!(form.categories().iter().collect::<Vec<_>>(), vec!["Work"]);
        assert_eq!(
            form.validate(&TaskCommand::Create(TaskInput::new("  "))),
            Err(Label::EmptyTask)
        );
        assert_eq!(
            form.validate(&TaskCommand::AddSubtask(state.tasks[0].id, "".into())),
            Err(Label::EmptySubtask)
        );
        assert_eq!(form.validate(&TaskCommand::Delete(state.tasks[0].id)), Ok(()));
    }

    #[test]
    fn filter_panel_lists_every_category_option() {
        let mut state = state_with(3);
        state.tasks[0].category = Some("B".into());
        state.tasks[1].category = Some("A".into());
        let mut panel = FilterPanel::default();
        panel.render(&state);

        let options = panel.category_options();
        assert_eq!(options.len(), 3);
        assert_eq!(options[0].0, None);
        assert_eq!(options[1].0.as_deref(), Some("A"));
    }
}
