use std::ffi::OsString;
use std::fs;
use std::path::Path;

use brighttodo_core::preferences::{PreferenceStore, THEME_KEY, Theme};
use brighttodo_core::repository::{TASKS_KEY, TaskRepository};
use brighttodo_core::store::{FileStore, PersistentStore};
use brighttodo_core::task::Task;
use tempfile::tempdir;

fn run_cli(rc: &Path, data: &Path, args: &[&str]) -> anyhow::Result<()> {
    let mut argv: Vec<OsString> = vec![
        "todo".into(),
        "--config".into(),
        rc.as_os_str().to_owned(),
        "--data".into(),
        data.as_os_str().to_owned(),
    ];
    argv.extend(args.iter().map(OsString::from));
    brighttodo_core::run(argv)
}

#[test]
fn file_store_round_trip_through_repository_and_preferences() {
    let temp = tempdir().expect("tempdir");
    {
        let store = FileStore::open(temp.path()).expect("open store");
        let mut repo = TaskRepository::load(&store);
        repo.add("buy milk").expect("add");
        repo.add("walk the dog").expect("add");
        let id = repo.tasks()[1].id.clone();
        repo.toggle(&id).expect("toggle");

        let mut prefs = PreferenceStore::load(&store);
        prefs.set(Theme::Dark).expect("set theme");
    }

    let store = FileStore::open(temp.path()).expect("reopen store");
    let repo = TaskRepository::load(&store);
    let texts: Vec<(&str, bool)> = repo
        .tasks()
        .iter()
        .map(|t| (t.text.as_str(), t.completed))
        .collect();
    assert_eq!(texts, vec![("walk the dog", false), ("buy milk", true)]);
    assert_eq!(repo.remaining_count(), 1);
    assert_eq!(PreferenceStore::load(&store).theme(), Theme::Dark);
}

#[test]
fn stored_layout_is_a_json_array_and_a_literal_theme() {
    let temp = tempdir().expect("tempdir");
    let store = FileStore::open(temp.path()).expect("open store");
    let mut repo = TaskRepository::load(&store);
    repo.add("a").expect("add");
    PreferenceStore::load(&store).toggle().expect("toggle theme");

    let raw = store.get(TASKS_KEY).expect("tasks stored");
    let parsed: Vec<Task> = serde_json::from_str(&raw).expect("array of tasks");
    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].text, "a");
    assert_eq!(store.get(THEME_KEY).as_deref(), Some("dark"));
}

#[test]
fn cli_commands_mutate_the_data_directory() {
    let temp = tempdir().expect("tempdir");
    let rc = temp.path().join("rc");
    fs::write(&rc, "color = off\n").expect("write rc");
    let data = temp.path().join("data");

    run_cli(&rc, &data, &["add", "buy", "milk"]).expect("add");
    run_cli(&rc, &data, &["add", "   "]).expect("blank add");
    run_cli(&rc, &data, &["tog", "1"]).expect("toggle");
    run_cli(&rc, &data, &["theme", "toggle"]).expect("theme");
    run_cli(&rc, &data, &["list", "completed"]).expect("list");

    let store = FileStore::open(&data).expect("open store");
    let repo = TaskRepository::load(&store);
    assert_eq!(repo.len(), 1);
    assert_eq!(repo.tasks()[0].text, "buy milk");
    assert!(repo.tasks()[0].completed);
    assert_eq!(PreferenceStore::load(&store).theme(), Theme::Dark);

    run_cli(&rc, &data, &["clear-completed"]).expect("clear");
    let store = FileStore::open(&data).expect("reopen store");
    assert!(TaskRepository::load(&store).is_empty());
}

#[test]
fn cli_recovers_from_garbage_task_data() {
    let temp = tempdir().expect("tempdir");
    let rc = temp.path().join("rc");
    fs::write(&rc, "").expect("write rc");
    let data = temp.path().join("data");

    FileStore::open(&data)
        .expect("open store")
        .set(TASKS_KEY, "<<garbage>>")
        .expect("seed garbage");

    run_cli(&rc, &data, &["list"]).expect("list survives garbage");
    run_cli(&rc, &data, &["add", "fresh", "start"]).expect("add");

    let store = FileStore::open(&data).expect("reopen store");
    let repo = TaskRepository::load(&store);
    assert_eq!(repo.len(), 1);
    assert_eq!(repo.tasks()[0].text, "fresh start");
}

#[test]
fn cli_rejects_unknown_commands_and_values() {
    let temp = tempdir().expect("tempdir");
    let rc = temp.path().join("rc");
    fs::write(&rc, "").expect("write rc");
    let data = temp.path().join("data");

    assert!(run_cli(&rc, &data, &["frobnicate"]).is_err());
    assert!(run_cli(&rc, &data, &["theme", "sepia"]).is_err());
    assert!(run_cli(&rc, &data, &["filter", "someday"]).is_err());
}

#[test]
fn cli_accepts_short_boolean_color_values() {
    let temp = tempdir().expect("tempdir");
    let rc = temp.path().join("rc");
    let data = temp.path().join("data");

    fs::write(&rc, "color = y\n").expect("write rc");
    run_cli(&rc, &data, &["list"]).expect("y is a valid color setting");

    fs::write(&rc, "color = sepia\n").expect("write rc");
    let err = run_cli(&rc, &data, &["list"]).expect_err("sepia is not a boolean");
    assert!(format!("{err:#}").contains("invalid color setting"));
}

#[test]
fn override_syntax_after_the_command_is_kept_as_task_text() {
    let temp = tempdir().expect("tempdir");
    let rc = temp.path().join("rc");
    fs::write(&rc, "").expect("write rc");
    let data = temp.path().join("data");

    run_cli(&rc, &data, &["rc.color=off", "add", "rc.note=x", "later"]).expect("add");

    let store = FileStore::open(&data).expect("open store");
    let repo = TaskRepository::load(&store);
    assert_eq!(repo.len(), 1);
    assert_eq!(repo.tasks()[0].text, "rc.note=x later");
}
