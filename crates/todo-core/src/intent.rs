//! Gestures as values. A [`ViewIntent`] names rows by their position in the
//! rendered list; a [`Command`] names tasks by id and is what actually runs.

use chrono::{DateTime, Utc};

use crate::markup::Sanitizer;
use crate::resolver::reorder;
use crate::state::{Language, Theme};
use crate::task::{Subtask, Task, TaskId, TaskInput};
use crate::transform::FilterCriteria;

/// What a user can do to the list view. Indices are positions within the
/// page that was last rendered.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewIntent {
    SubmitNewTask(TaskInput),
    ToggleStatus(usize),
    Edit(usize, TaskInput),
    Delete(usize),
    EditCategory(usize, String),
    Reorder { from: usize, to: usize },
    AddSubtask(usize, String),
    ToggleSubtask(usize, usize),
    DeleteSubtask(usize, usize),
    ApplyFilter(FilterCriteria),
    ChangePage(usize),
}

/// A change to the task collection, addressed by stable id.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskCommand {
    Create(TaskInput),
    ToggleStatus(TaskId),
    Edit(TaskId, TaskInput),
    Delete(TaskId),
    SetCategory(TaskId, String),
    /// Moves `source` to the canonical position currently held by `target`.
    Move { source: TaskId, target: TaskId },
    AddSubtask(TaskId, String),
    ToggleSubtask(TaskId, usize),
    DeleteSubtask(TaskId, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Task(TaskCommand),
    ToggleTheme,
    SetTheme(Theme),
    ToggleLanguage,
    SetLanguage(Language),
    /// Replaces the whole collection with the tasks in a JSON document.
    Import(String),
}

impl From<TaskCommand> for Command {
    fn from(command: TaskCommand) -> Self {
        Command::Task(command)
    }
}

impl TaskCommand {
    /// The sequence that results from running this command against `tasks`,
    /// or `None` when nothing would change (unknown id, blank text, subtask
    /// index out of range, move onto itself).
    pub fn apply(
        &self,
        tasks: &[Task],
        sanitizer: &dyn Sanitizer,
        now: DateTime<Utc>,
    ) -> Option<Vec<Task>> {
        match self {
            TaskCommand::Create(input) => {
                if input.is_blank() {
                    return None;
                }
                let mut next = tasks.to_vec();
                next.push(Task::create(input, sanitizer, now));
                Some(next)
            }
            TaskCommand::ToggleStatus(id) => update(tasks, *id, |task| {
                task.completed = !task.completed;
                true
            }),
            TaskCommand::Edit(id, input) => {
                if input.is_blank() {
                    return None;
                }
                update(tasks, *id, |task| {
                    task.apply_edit(input, sanitizer);
                    true
                })
            }
            TaskCommand::Delete(id) => {
                let position = position(tasks, *id)?;
                let mut next = tasks.to_vec();
                next.remove(position);
                Some(next)
            }
            TaskCommand::SetCategory(id, raw) => update(tasks, *id, |task| {
                task.set_category(raw, sanitizer);
                true
            }),
            TaskCommand::Move { source, target } => {
                let from = position(tasks, *source)?;
                let to = position(tasks, *target)?;
                reorder(tasks, from, to)
            }
            TaskCommand::AddSubtask(id, raw) => {
                let text = sanitizer.sanitize(raw.trim()).trim().to_string();
                if text.is_empty() {
                    return None;
                }
                update(tasks, *id, |task| {
                    task.subtasks.push(Subtask {
                        text,
                        completed: false,
                    });
                    true
                })
            }
            TaskCommand::ToggleSubtask(id, index) => update(tasks, *id, |task| {
                match task.subtasks.get_mut(*index) {
                    Some(subtask) => {
                        subtask.completed = !subtask.completed;
                        true
                    }
                    None => false,
                }
            }),
            TaskCommand::DeleteSubtask(id, index) => update(tasks, *id, |task| {
                if *index < task.subtasks.len() {
                    task.subtasks.remove(*index);
                    true
                } else {
                    false
                }
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TaskCommand::Create(_) => "create",
            TaskCommand::ToggleStatus(_) => "toggle-status",
            TaskCommand::Edit(..) => "edit",
            TaskCommand::Delete(_) => "delete",
            TaskCommand::SetCategory(..) => "set-category",
            TaskCommand::Move { .. } => "move",
            TaskCommand::AddSubtask(..) => "add-subtask",
            TaskCommand::ToggleSubtask(..) => "toggle-subtask",
            TaskCommand::DeleteSubtask(..) => "delete-subtask",
        }
    }
}

fn position(tasks: &[Task], id: TaskId) -> Option<usize> {
    tasks.iter().position(|task| task.id == id)
}

fn update<F>(tasks: &[Task], id: TaskId, edit: F) -> Option<Vec<Task>>
where
    F: FnOnce(&mut Task) -> bool,
{
    let position = position(tasks, id)?;
    let mut next = tasks.to_vec();
    if edit(&mut next[position]) {
        Some(next)
    } else {
        None
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

    fn tasks(names: &[&str]) -> Vec<Task> {
        names
            .iter()
            .map(|name| Task::create(&TaskInput::new(*name), &HtmlSanitizer, now()))
            .collect()
    }

    fn run(command: TaskCommand, tasks: &[Task]) -> Option<Vec<Task>> {
        command.apply(tasks, &HtmlSanitizer, now())
    }

    #[test]
    fn create_appends_sanitized_task() {
        let next = run(
            TaskCommand::Create(TaskInput::new("Buy <b>milk</b>")),
            &tasks(&["a"]),
        )
        .unwrap();
        assert_eq!(next.len(), 2);
        assert_eq!(next[1].text, "Buy milk");
        assert_eq!(next[1].markdown, "Buy <b>milk</b>");
        assert_eq!(next[1].created_at, now());
    }

    #[test]
    fn blank_inputs_change_nothing() {
        let current = tasks(&["a"]);
        assert!(run(TaskCommand::Create(TaskInput::new("   ")), &current).is_none());
        assert!(run(TaskCommand::Edit(current[0].id, TaskInput::new("")), &current).is_none());
        assert!(run(TaskCommand::AddSubtask(current[0].id, " <i></i> ".into()), &current).is_none());
    }

    #[test]
    fn unknown_id_changes_nothing() {
        let current = tasks(&["a"]);
        assert!(run(TaskCommand::Delete(TaskId::new()), &current).is_none());
        assert!(run(TaskCommand::ToggleStatus(TaskId::new()), &current).is_none());
    }

    #[test]
    fn edit_keeps_identity_status_and_subtasks() {
        let mut current = tasks(&["a"]);
        current[0].completed = true;
        current[0].subtasks.push(Subtask {
            text: "step".into(),
            completed: false,
        });
        let id = current[0].id;

        let mut input = TaskInput::new("b");
        input.category = "  Home ".into();
        let next = run(TaskCommand::Edit(id, input), &current).unwrap();

        assert_eq!(next[0].id, id);
        assert!(next[0].completed);
        assert_eq!(next[0].subtasks.len(), 1);
        assert_eq!(next[0].text, "b");
        assert_eq!(next[0].category.as_deref(), Some("Home"));
    }

    #[test]
    fn subtask_lifecycle() {
        let current = tasks(&["a"]);
        let id = current[0].id;

        let next = run(TaskCommand::AddSubtask(id, " call <b>bank</b> ".into()), &current).unwrap();
        assert_eq!(next[0].subtasks[0].text, "call bank");

        let next = run(TaskCommand::ToggleSubtask(id, 0), &next).unwrap();
        assert!(next[0].subtasks[0].completed);
        assert!(run(TaskCommand::ToggleSubtask(id, 5), &next).is_none());

        let next = run(TaskCommand::DeleteSubtask(id, 0), &next).unwrap();
        assert!(next[0].subtasks.is_empty());
        assert!(run(TaskCommand::DeleteSubtask(id, 0), &next).is_none());
    }

    #[test]
    fn empty_category_clears() {
        let mut current = tasks(&["a"]);
        current[0].category = Some("Work".into());
        let next = run(TaskCommand::SetCategory(current[0].id, "   ".into()), &current).unwrap();
        assert_eq!(next[0].category, None);
    }

    #[test]
    fn move_uses_canonical_positions() {
        let current = tasks(&["t0", "t1", "t2", "t3"]);
        let next = run(
            TaskCommand::Move {
                source: current[0].id,
                target: current[2].id,
            },
            &current,
        )
        .unwrap();
        let order: Vec<&str> = next.iter().map(|task| task.text.as_str()).collect();
        assert_eq!(order, vec!["t1", "t2", "t0", "t3"]);

        let same = TaskCommand::Move {
            source: current[1].id,
            target: current[1].id,
        };
        assert!(run(same, &current).is_none());
    }
}
