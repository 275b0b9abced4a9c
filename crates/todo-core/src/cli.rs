use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, anyhow};
use chrono::NaiveDate;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::app::{App, Notice};
use crate::datetime::parse_date_expr;
use crate::intent::{Command, TaskCommand, ViewIntent};
use crate::render::Renderer;
use crate::state::{Language, Theme};
use crate::storage::KeyValueStore;
use crate::task::{Priority, TaskId, TaskInput};
use crate::transfer::EXPORT_FILE_NAME;
use crate::transform::{FilterCriteria, SortBy, StatusFilter};
use crate::view::TaskForm;

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "todo",
    version,
    about = "Task list with categories, subtasks and due dates",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "todorc")]
    pub todorc: Option<PathBuf>,

    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    /// Defaults to `list`.
    #[command(subcommand)]
    pub command: Option<TodoCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TodoCommand {
    /// Add a task
    Add(AddArgs),
    /// Show tasks
    #[command(alias = "ls")]
    List(ListArgs),
    /// Mark a task done, or not done again
    Toggle { id: String },
    /// Change a task; omitted fields keep their values
    Edit(EditArgs),
    /// Delete a task
    #[command(alias = "delete")]
    Rm { id: String },
    /// Set a task's category; no text clears it
    Category { id: String, text: Vec<String> },
    /// Move a task to the position of another
    Move { id: String, target: String },
    #[command(subcommand)]
    Subtask(SubtaskCommand),
    /// List the categories in use
    Categories,
    /// Write all tasks as JSON (`-` for stdout)
    Export { path: Option<PathBuf> },
    /// Replace all tasks with those in a JSON export
    Import { path: PathBuf },
    /// Switch or set the theme
    Theme { value: Option<Theme> },
    /// Switch or set the language
    Lang { value: Option<Language> },
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    /// Markdown description
    #[arg(required = true, num_args = 1..)]
    pub text: Vec<String>,

    #[arg(short, long, default_value = "low")]
    pub priority: Priority,

    #[arg(short, long, default_value = "")]
    pub category: String,

    /// YYYY-MM-DD, today, tomorrow, +3d, -1w
    #[arg(long)]
    pub start: Option<String>,

    #[arg(long)]
    pub end: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: String,

    #[arg(short, long)]
    pub text: Option<String>,

    #[arg(short, long)]
    pub priority: Option<Priority>,

    #[arg(short, long)]
    pub category: Option<String>,

    /// `none` clears the date
    #[arg(long)]
    pub start: Option<String>,

    #[arg(long)]
    pub end: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    #[arg(short, long)]
    pub search: Option<String>,

    #[arg(short, long)]
    pub priority: Option<Priority>,

    #[arg(long, default_value = "all")]
    pub status: StatusFilter,

    #[arg(short, long)]
    pub category: Option<String>,

    /// e.g. dueDate-asc, priority-desc
    #[arg(long)]
    pub sort: Option<SortBy>,

    #[arg(long, default_value_t = 1)]
    pub page: usize,
}

impl Default for ListArgs {
    fn default() -> Self {
        Self {
            search: None,
            priority: None,
            status: StatusFilter::All,
            category: None,
            sort: None,
            page: 1,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubtaskCommand {
    /// Append a subtask
    Add {
        id: String,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Toggle subtask NUMBER (1-based)
    Toggle { id: String, number: usize },
    /// Delete subtask NUMBER (1-based)
    Rm { id: String, number: usize },
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Runs one command against `app` and prints the outcome.
#[tracing::instrument(skip(app, renderer, command))]
pub fn execute<S: KeyValueStore>(
    app: &mut App<S>,
    renderer: &mut Renderer,
    command: TodoCommand,
) -> anyhow::Result<()> {
    let today = app.clock().today();

    match command {
        TodoCommand::Add(args) => {
            let mut input = TaskInput::new(args.text.join(" "));
            input.priority = args.priority;
            input.category = args.category;
            input.start_date = parse_optional_date(args.start.as_deref(), today)?;
            input.end_date = parse_optional_date(args.end.as_deref(), today)?;

            let before = app.state().tasks.len();
            finish(renderer, app.dispatch(ViewIntent::SubmitNewTask(input)))?;
            if app.state().tasks.len() > before
                && let Some(task) = app.state().tasks.last()
            {
                renderer.print_line(&format!("Created task {}.", task.id.short()))?;
            }
        }
        TodoCommand::List(args) => list(app, renderer, args)?,
        TodoCommand::Toggle { id } => {
            let id = resolve(app, &id)?;
            finish(renderer, app.run(TaskCommand::ToggleStatus(id)))?;
            if let Some(task) = app.state().task(id) {
                let state = if task.completed { "done" } else { "open" };
                renderer.print_line(&format!("Task {} is {state}.", id.short()))?;
            }
        }
        TodoCommand::Edit(args) => {
            let id = resolve(app, &args.id)?;
            let mut input = app
                .state()
                .task(id)
                .map(TaskForm::prefill)
                .ok_or_else(|| anyhow!("task {} disappeared", id.short()))?;
            if let Some(text) = args.text {
                input.markdown = text;
            }
            if let Some(priority) = args.priority {
                input.priority = priority;
            }
            if let Some(category) = args.category {
                input.category = category;
            }
            if let Some(start) = args.start {
                input.start_date = parse_optional_date(Some(&start), today)?;
            }
            if let Some(end) = args.end {
                input.end_date = parse_optional_date(Some(&end), today)?;
            }
            finish(renderer, app.run(TaskCommand::Edit(id, input)))?;
            renderer.print_line(&format!("Modified task {}.", id.short()))?;
        }
        TodoCommand::Rm { id } => {
            let id = resolve(app, &id)?;
            finish(renderer, app.run(TaskCommand::Delete(id)))?;
            renderer.print_line(&format!("Deleted task {}.", id.short()))?;
        }
        TodoCommand::Category { id, text } => {
            let id = resolve(app, &id)?;
            finish(renderer, app.run(TaskCommand::SetCategory(id, text.join(" "))))?;
        }
        TodoCommand::Move { id, target } => {
            let source = resolve(app, &id)?;
            let target = resolve(app, &target)?;
            finish(renderer, app.run(TaskCommand::Move { source, target }))?;
        }
        TodoCommand::Subtask(command) => subtask(app, renderer, command)?,
        TodoCommand::Categories => {
            let language = app.state().language;
            renderer.print_categories(app.form().categories(), language)?;
        }
        TodoCommand::Export { path } => {
            let document = app.export()?;
            let path = path.unwrap_or_else(|| PathBuf::from(EXPORT_FILE_NAME));
            if path.as_os_str() == "-" {
                renderer.print_line(&document)?;
            } else {
                fs::write(&path, document)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(file = %path.display(), "exported tasks");
                renderer.print_line(&format!(
                    "Exported {} tasks to {}.",
                    app.state().tasks.len(),
                    path.display()
                ))?;
            }
        }
        TodoCommand::Import { path } => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            finish(renderer, app.apply(Command::Import(text)))?;
        }
        TodoCommand::Theme { value } => {
            let command = value.map_or(Command::ToggleTheme, Command::SetTheme);
            finish(renderer, app.apply(command))?;
            renderer.print_line(&format!("theme = {}", app.state().theme))?;
        }
        TodoCommand::Lang { value } => {
            let command = value.map_or(Command::ToggleLanguage, Command::SetLanguage);
            finish(renderer, app.apply(command))?;
            renderer.print_line(&format!("language = {}", app.state().language))?;
        }
    }

    Ok(())
}

fn list<S: KeyValueStore>(
    app: &mut App<S>,
    renderer: &mut Renderer,
    args: ListArgs,
) -> anyhow::Result<()> {
    let default_sort = app.list().criteria().sort_by;
    let criteria = FilterCriteria {
        search: args.search.unwrap_or_default(),
        priority: args.priority,
        status: args.status,
        category: category_filter(args.category),
        sort_by: args.sort.or(default_sort),
    };

    app.dispatch(ViewIntent::ApplyFilter(criteria));
    if args.page > 1 {
        app.dispatch(ViewIntent::ChangePage(args.page));
    }
    renderer.print_list(app.list().model())
}

/// `all` (any case) and blank select every category.
fn category_filter(raw: Option<String>) -> Option<String> {
    raw.map(|category| category.trim().to_string())
        .filter(|category| !category.is_empty() && !category.eq_ignore_ascii_case("all"))
}

fn subtask<S: KeyValueStore>(
    app: &mut App<S>,
    renderer: &mut Renderer,
    command: SubtaskCommand,
) -> anyhow::Result<()> {
    let command = match command {
        SubtaskCommand::Add { id, text } => {
            TaskCommand::AddSubtask(resolve(app, &id)?, text.join(" "))
        }
        SubtaskCommand::Toggle { id, number } => {
            TaskCommand::ToggleSubtask(resolve(app, &id)?, subtask_index(number)?)
        }
        SubtaskCommand::Rm { id, number } => {
            TaskCommand::DeleteSubtask(resolve(app, &id)?, subtask_index(number)?)
        }
    };
    finish(renderer, app.run(command))
}

fn resolve<S: KeyValueStore>(app: &App<S>, prefix: &str) -> anyhow::Result<TaskId> {
    app.find(prefix)
        .ok_or_else(|| anyhow!("no single task has an id starting with {prefix:?}"))
}

fn subtask_index(number: usize) -> anyhow::Result<usize> {
    number
        .checked_sub(1)
        .ok_or_else(|| anyhow!("subtask numbers start at 1"))
}

fn parse_optional_date(raw: Option<&str>, today: NaiveDate) -> anyhow::Result<Option<NaiveDate>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) if value.eq_ignore_ascii_case("none") => Ok(None),
        Some(value) => parse_date_expr(value, today).map(Some),
    }
}

/// Error notices become command failures so the exit status reflects them.
fn finish(renderer: &mut Renderer, notice: Option<Notice>) -> anyhow::Result<()> {
    match notice {
        Some(notice) if notice.is_error() => Err(anyhow!(notice.message)),
        Some(notice) => renderer.print_notice(&notice),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{SortCriterion, SortDirection};

    #[test]
    fn parses_commands_and_global_flags() {
        let cli = GlobalCli::try_parse_from([
            "todo",
            "-vv",
            "--rc",
            "list.items_per_page=3",
            "add",
            "Pay",
            "rent",
            "--priority",
            "high",
            "--end",
            "+2d",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rc_overrides[0].key, "list.items_per_page");
        match cli.command {
            Some(TodoCommand::Add(args)) => {
                assert_eq!(args.text, vec!["Pay", "rent"]);
                assert_eq!(args.priority, Priority::High);
                assert_eq!(args.end.as_deref(), Some("+2d"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn list_parses_sort_and_status() {
        let cli = GlobalCli::try_parse_from([
            "todo", "list", "--sort", "dueDate-desc", "--status", "done",
        ])
        .unwrap();
        match cli.command {
            Some(TodoCommand::List(args)) => {
                assert_eq!(
                    args.sort,
                    Some(SortBy::new(SortCriterion::DueDate, SortDirection::Desc))
                );
                assert_eq!(args.status, StatusFilter::Completed);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn optional_dates_accept_none() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        assert_eq!(parse_optional_date(Some("none"), today).unwrap(), None);
        assert_eq!(
            parse_optional_date(Some("tomorrow"), today).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 11)
        );
        assert!(subtask_index(0).is_err());
    }

    #[test]
    fn all_category_selects_every_category() {
        let cli = GlobalCli::try_parse_from(["todo", "list", "--category", "All"]).unwrap();
        match cli.command {
            Some(TodoCommand::List(args)) => assert_eq!(category_filter(args.category), None),
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(category_filter(Some("  ".into())), None);
        assert_eq!(category_filter(Some(" Work ".into())), Some("Work".into()));
    }
}
