//! Turns view-local positions into stable ids, and ids into positions in the
//! canonical sequence.

use tracing::{trace, warn};

use crate::intent::{TaskCommand, ViewIntent};
use crate::task::{Task, TaskId};
use crate::transform::FilterCriteria;
use crate::view::ListViewModel;

/// Where a [`ViewIntent`] ends up once its indices are resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Command(TaskCommand),
    Filter(FilterCriteria),
    Page(usize),
    /// An index did not name a rendered row.
    Ignored,
}

/// Id of the row rendered at `view_index`.
pub fn row_id(model: &ListViewModel, view_index: usize) -> Option<TaskId> {
    model
        .rows
        .iter()
        .find(|row| row.view_index == view_index)
        .map(|row| row.id)
}

/// Resolves `intent` against the rows of the most recent render.
pub fn resolve(model: &ListViewModel, intent: ViewIntent) -> Resolution {
    let lookup = |view_index: usize| {
        let id = row_id(model, view_index);
        if id.is_none() {
            warn!(
                view_index,
                rows = model.rows.len(),
                "view index out of range; intent ignored"
            );
        }
        id
    };

    let command = match intent {
        ViewIntent::SubmitNewTask(input) => Some(TaskCommand::Create(input)),
        ViewIntent::ToggleStatus(index) => lookup(index).map(TaskCommand::ToggleStatus),
        ViewIntent::Edit(index, input) => lookup(index).map(|id| TaskCommand::Edit(id, input)),
        ViewIntent::Delete(index) => lookup(index).map(TaskCommand::Delete),
        ViewIntent::EditCategory(index, text) => {
            lookup(index).map(|id| TaskCommand::SetCategory(id, text))
        }
        ViewIntent::Reorder { from, to } => match (lookup(from), lookup(to)) {
            (Some(source), Some(target)) => Some(TaskCommand::Move { source, target }),
            _ => None,
        },
        ViewIntent::AddSubtask(index, text) => {
            lookup(index).map(|id| TaskCommand::AddSubtask(id, text))
        }
        ViewIntent::ToggleSubtask(index, subtask) => {
            lookup(index).map(|id| TaskCommand::ToggleSubtask(id, subtask))
        }
        ViewIntent::DeleteSubtask(index, subtask) => {
            lookup(index).map(|id| TaskCommand::DeleteSubtask(id, subtask))
        }
        ViewIntent::ApplyFilter(criteria) => return Resolution::Filter(criteria),
        ViewIntent::ChangePage(page) => return Resolution::Page(page),
    };

    match command {
        Some(command) => {
            trace!(command = command.name(), "resolved intent");
            Resolution::Command(command)
        }
        None => Resolution::Ignored,
    }
}

/// Removes the task at `source` and inserts it at `target`. `None` when the
/// positions are equal or either is out of range.
pub fn reorder(tasks: &[Task], source: usize, target: usize) -> Option<Vec<Task>> {
    if source == target || source >= tasks.len() || target >= tasks.len() {
        return None;
    }
    let mut next = tasks.to_vec();
    let moved = next.remove(source);
    next.insert(target, moved);
    Some(next)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::markup::{CommonMarkRenderer, HtmlSanitizer};
    use crate::state::Language;
    use crate::task::TaskInput;
    use crate::view::TaskRow;

    fn tasks(names: &[&str]) -> Vec<Task> {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap();
        names
            .iter()
            .map(|name| Task::create(&TaskInput::new(*name), &HtmlSanitizer, now))
            .collect()
    }

    fn names(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|task| task.text.as_str()).collect()
    }

    fn model_of(rows: &[&Task]) -> ListViewModel {
        let today = Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap().date_naive();
        ListViewModel {
            rows: rows
                .iter()
                .enumerate()
                .map(|(view_index, task)| {
                    TaskRow::new(view_index, task, Language::English, today, &CommonMarkRenderer)
                })
                .collect(),
            ..ListViewModel::default()
        }
    }

    #[test]
    fn reorder_moves_source_to_target() {
        let current = tasks(&["T0", "T1", "T2", "T3"]);
        let next = reorder(&current, 0, 2).unwrap();
        assert_eq!(names(&next), vec!["T1", "T2", "T0", "T3"]);

        let next = reorder(&current, 3, 1).unwrap();
        assert_eq!(names(&next), vec!["T0", "T3", "T1", "T2"]);
    }

    #[test]
    fn reorder_onto_itself_or_out_of_range_is_none() {
        let current = tasks(&["T0", "T1"]);
        assert!(reorder(&current, 1, 1).is_none());
        assert!(reorder(&current, 0, 2).is_none());
    }

    #[test]
    fn indices_resolve_through_the_rendered_rows() {
        let current = tasks(&["T0", "T1", "T2"]);
        // Rendered in reverse, as a sorted view would.
        let model = model_of(&[&current[2], &current[1], &current[0]]);

        assert_eq!(
            resolve(&model, ViewIntent::Delete(0)),
            Resolution::Command(TaskCommand::Delete(current[2].id))
        );
        assert_eq!(
            resolve(&model, ViewIntent::Reorder { from: 2, to: 0 }),
            Resolution::Command(TaskCommand::Move {
                source: current[0].id,
                target: current[2].id,
            })
        );
    }

    #[test]
    fn out_of_range_index_is_ignored() {
        let current = tasks(&["T0"]);
        let model = model_of(&[&current[0]]);
        assert_eq!(resolve(&model, ViewIntent::ToggleStatus(4)), Resolution::Ignored);
        assert_eq!(
            resolve(&model, ViewIntent::Reorder { from: 0, to: 9 }),
            Resolution::Ignored
        );
        assert_eq!(resolve(&model, ViewIntent::ChangePage(3)), Resolution::Page(3));
    }
}
