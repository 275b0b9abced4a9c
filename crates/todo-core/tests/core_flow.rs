use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use chrono::{NaiveDate, TimeZone, Utc};
use tempfile::tempdir;
use todo_core::app::{App, AppOptions};
use todo_core::datetime::FixedClock;
use todo_core::intent::{Command, ViewIntent};
use todo_core::state::Theme;
use todo_core::storage::{FileStore, KeyValueStore, TASKS_KEY};
use todo_core::task::TaskInput;
use todo_core::transfer::{decode_tasks, load_tasks};
use todo_core::transform::{DueDateStatus, SortBy, SortCriterion, SortDirection};

fn clock() -> Rc<FixedClock> {
    Rc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap(),
    ))
}

fn due_first() -> AppOptions {
    AppOptions {
        items_per_page: 10,
        sort_by: Some(SortBy::new(SortCriterion::DueDate, SortDirection::Asc)),
    }
}

fn input(text: &str, category: &str, end: Option<NaiveDate>) -> TaskInput {
    let mut input = TaskInput::new(text);
    input.category = category.to_string();
    input.end_date = end;
    input
}

#[test]
fn add_sort_delete_and_reload_from_disk() {
    let temp = tempdir().expect("tempdir");
    let store = FileStore::open(temp.path()).expect("open store");
    let mut app = App::new(store, due_first(), clock());

    let later = NaiveDate::from_ymd_opt(2024, 6, 30);
    let yesterday = NaiveDate::from_ymd_opt(2024, 6, 9);
    app.dispatch(ViewIntent::SubmitNewTask(input("Paint fence", "Home", later)));
    app.dispatch(ViewIntent::SubmitNewTask(input("Plan sprint", "Work", None)));
    app.dispatch(ViewIntent::SubmitNewTask(input("Return books", "Errands", yesterday)));

    {
        let list = app.list();
        let first = &list.model().rows[0];
        assert_eq!(first.text, "Return books");
        assert_eq!(first.due, DueDateStatus::Overdue);
        assert_eq!(list.model().rows[2].text, "Plan sprint");
    }
    assert_eq!(
        app.form().categories().iter().collect::<Vec<_>>(),
        vec!["Errands", "Home", "Work"]
    );

    assert_eq!(app.dispatch(ViewIntent::Delete(0)), None);
    assert_eq!(app.state().tasks.len(), 2);
    assert_eq!(
        app.filters().categories().iter().collect::<Vec<_>>(),
        vec!["Home", "Work"]
    );

    let stored = app
        .repository()
        .store()
        .get(TASKS_KEY)
        .expect("read store")
        .expect("tasks written");
    let stored = decode_tasks(&stored, Utc::now()).expect("stored tasks decode");
    assert_eq!(stored, app.state().tasks);

    let ids: Vec<_> = app.state().tasks.iter().map(|task| task.id).collect();
    drop(app);

    let store = FileStore::open(temp.path()).expect("reopen store");
    let reopened = App::new(store, due_first(), clock());
    let reloaded: Vec<_> = reopened.state().tasks.iter().map(|task| task.id).collect();
    assert_eq!(reloaded, ids);
}

#[test]
fn rejected_import_leaves_tasks_and_store_alone() {
    let temp = tempdir().expect("tempdir");
    let store = FileStore::open(temp.path()).expect("open store");
    let mut app = App::new(store, AppOptions::default(), clock());
    app.dispatch(ViewIntent::SubmitNewTask(TaskInput::new("Keep me")));
    let before = fs::read_to_string(temp.path().join("tasks.data")).expect("tasks file");

    let notice = app
        .apply(Command::Import(r#"{"text":"single object"}"#.to_string()))
        .expect("notice");

    assert!(notice.is_error());
    assert_eq!(notice.message, "Error importing tasks. Please check the file format.");
    assert_eq!(app.state().tasks.len(), 1);
    assert_eq!(app.state().tasks[0].text, "Keep me");
    assert_eq!(
        fs::read_to_string(temp.path().join("tasks.data")).expect("tasks file"),
        before
    );
}

#[test]
fn reorder_onto_itself_fires_no_notification() {
    let temp = tempdir().expect("tempdir");
    let store = FileStore::open(temp.path()).expect("open store");
    let mut app = App::new(store, AppOptions::default(), clock());
    for name in ["T0", "T1", "T2", "T3"] {
        app.dispatch(ViewIntent::SubmitNewTask(TaskInput::new(name)));
    }

    let notifications = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&notifications);
    let subscription = app
        .repository()
        .subscribe(move |_| *counter.borrow_mut() += 1);

    app.dispatch(ViewIntent::Reorder { from: 2, to: 2 });
    assert_eq!(*notifications.borrow(), 0);

    app.dispatch(ViewIntent::Reorder { from: 0, to: 2 });
    assert_eq!(*notifications.borrow(), 1);
    let order: Vec<&str> = app.state().tasks.iter().map(|task| task.text.as_str()).collect();
    assert_eq!(order, vec!["T1", "T2", "T0", "T3"]);

    subscription.unsubscribe();
    subscription.unsubscribe();
    app.dispatch(ViewIntent::ToggleStatus(0));
    assert_eq!(*notifications.borrow(), 1);
}

#[test]
fn legacy_data_directory_is_upgraded_in_memory() {
    let temp = tempdir().expect("tempdir");
    fs::write(
        temp.path().join("tasks.data"),
        r#"[{"text":"Old task","priority":"Trung bình","category":"","startDate":"","endDate":"2024-06-12","completed":false}]"#,
    )
    .expect("seed tasks");
    fs::write(temp.path().join("darkMode.data"), "true").expect("seed theme");

    let store = FileStore::open(temp.path()).expect("open store");
    let mut app = App::new(store, AppOptions::default(), clock());

    assert_eq!(app.state().theme, Theme::Dark);
    let row = app.list().model().rows[0].clone();
    assert_eq!(row.due, DueDateStatus::DueSoon);
    assert_eq!(row.category, None);
    assert_eq!(app.prefill(0).expect("prefill").markdown, "Old task");

    let exported = app.export().expect("export");
    assert!(exported.contains("\"id\""));
    assert!(exported.contains("\"priority\": \"Medium\""));

    app.apply(Command::ToggleTheme);
    assert_eq!(
        fs::read_to_string(temp.path().join("theme.data")).expect("theme file"),
        "light"
    );
}

#[test]
fn damaged_stored_records_are_not_lost_on_the_next_add() {
    let temp = tempdir().expect("tempdir");
    fs::write(
        temp.path().join("tasks.data"),
        r#"[{"text":"rent","priority":"Cao"},{"text":"gym","priority":"Urgent"},{"text":"mail"}]"#,
    )
    .expect("seed tasks");

    let store = FileStore::open(temp.path()).expect("open store");
    let mut app = App::new(store, AppOptions::default(), clock());
    assert_eq!(app.state().tasks.len(), 3);

    assert_eq!(app.dispatch(ViewIntent::SubmitNewTask(TaskInput::new("new"))), None);

    let stored = fs::read_to_string(temp.path().join("tasks.data")).expect("tasks file");
    let stored = load_tasks(&stored, Utc::now()).expect("stored tasks load");
    let mut texts: Vec<&str> = stored.iter().map(|task| task.text.as_str()).collect();
    texts.sort_unstable();
    assert_eq!(texts, vec!["gym", "mail", "new", "rent"]);
}
