// End-to-end tests of the advfilter CLI

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use std::fs;

const FORM_JSON: &str = r#"{
    "id": 1,
    "title": "Orders",
    "fields": [
        {"id": 3, "label": "Name", "type": "text"},
        {"id": 4, "label": "Colors", "type": "checkbox",
         "choices": [{"text": "Red", "value": "Red"}, {"text": "Blue", "value": "Blue"}],
         "inputs": [{"id": "4.1", "label": "Red"}, {"id": "4.2", "label": "Blue"}]},
        {"id": 7, "label": "Quantity", "type": "number"}
    ]
}"#;

/// Helper to create a temporary database and set it as the data location
fn setup_test_env() -> (TempDir, std::sync::MutexGuard<'static, ()>) {
    let guard = test_env::lock_test_env();
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let config_dir = temp_dir.path().join(".advfilter");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("rc"), format!("data.location={}\n", db_path.display())).unwrap();
    (temp_dir, guard)
}

/// Helper to create a new command with test environment
fn new_cmd(temp_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("advfilter").unwrap();
    cmd.env("HOME", temp_dir.path());
    cmd
}

fn run_ok(temp_dir: &TempDir, args: &[&str]) {
    new_cmd(temp_dir).args(args).assert().success();
}

/// Form 1, users alice (1, subscriber), bob (2, subscriber) and root (3,
/// administrator), and one entry by each of alice and bob. View 1 lists form 1.
fn setup_orders(temp_dir: &TempDir) {
    let form_path = temp_dir.path().join("form.json");
    fs::write(&form_path, FORM_JSON).unwrap();
    run_ok(temp_dir, &["form", "import", form_path.to_str().unwrap()]);

    run_ok(temp_dir, &["user", "add", "alice", "--role", "subscriber"]);
    run_ok(temp_dir, &["user", "add", "bob", "--role", "subscriber"]);
    run_ok(temp_dir, &["user", "add", "root", "--role", "administrator"]);

    run_ok(temp_dir, &["entry", "add", "1", "--by", "alice", "3=Ana", "4.2=Blue", "7=12"]);
    run_ok(temp_dir, &["entry", "add", "1", "--by", "bob", "3=Bo", "7=3"]);
    run_ok(temp_dir, &["view", "create", "1", "Orders directory"]);
}

fn set_filters(temp_dir: &TempDir, filters: &str) {
    new_cmd(temp_dir)
        .args(["view", "filters", "1", "--set", filters])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved filters of view 1"));
}

/// Entry ids `view entries 1` lists for a viewer
fn listed_ids(temp_dir: &TempDir, as_user: Option<&str>) -> Vec<i64> {
    let mut cmd = new_cmd(temp_dir);
    cmd.args(["view", "entries", "1", "--json"]);
    if let Some(login) = as_user {
        cmd.args(["--as", login]);
    }
    let output = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output).unwrap();
    if text.trim() == "No entries found." {
        return Vec::new();
    }
    let entries: serde_json::Value = serde_json::from_str(&text).unwrap();
    entries
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_i64().unwrap())
        .collect()
}

#[test]
fn test_form_import_and_show() {
    let (temp_dir, _guard) = setup_test_env();
    let form_path = temp_dir.path().join("form.json");
    fs::write(&form_path, FORM_JSON).unwrap();

    new_cmd(&temp_dir)
        .args(["form", "import", form_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported form 1 'Orders' (3 fields)"));

    new_cmd(&temp_dir)
        .args(["form", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Form 1: Orders"))
        .stdout(predicate::str::contains("4.2"))
        .stdout(predicate::str::contains("choices: Red, Blue"));
}

#[test]
fn test_form_not_found() {
    let (temp_dir, _guard) = setup_test_env();
    new_cmd(&temp_dir)
        .args(["form", "show", "9"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Form 9 not found"));
}

#[test]
fn test_view_without_filters_lists_everything() {
    let (temp_dir, _guard) = setup_test_env();
    setup_orders(&temp_dir);

    assert_eq!(listed_ids(&temp_dir, None), vec![1, 2]);
    new_cmd(&temp_dir)
        .args(["view", "filters", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No filters."));
}

#[test]
fn test_created_by_or_admin_filter() {
    let (temp_dir, _guard) = setup_test_env();
    setup_orders(&temp_dir);
    set_filters(&temp_dir, r#"[{"key":"created_by","operator":"is","value":"created_by_or_admin"}]"#);

    assert_eq!(listed_ids(&temp_dir, Some("alice")), vec![1]);
    assert_eq!(listed_ids(&temp_dir, Some("bob")), vec![2]);
    assert_eq!(listed_ids(&temp_dir, Some("root")), vec![1, 2]);
    assert!(listed_ids(&temp_dir, None).is_empty());
}

#[test]
fn test_anonymous_viewer_gets_lock_filter() {
    let (temp_dir, _guard) = setup_test_env();
    setup_orders(&temp_dir);
    set_filters(&temp_dir, r#"[{"key":"created_by","operator":"is","value":"created_by"}]"#);

    new_cmd(&temp_dir)
        .args(["view", "sql", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("advanced_filter_lock"));
}

#[test]
fn test_numeric_and_any_mode_filters() {
    let (temp_dir, _guard) = setup_test_env();
    setup_orders(&temp_dir);

    set_filters(&temp_dir, r#"[{"key":"7","operator":">","value":"5"}]"#);
    assert_eq!(listed_ids(&temp_dir, None), vec![1]);

    set_filters(
        &temp_dir,
        r#"{"mode":"any","0":{"key":"3","operator":"is","value":"Bo"},"1":{"key":"4.2","operator":"is","value":"Blue"}}"#,
    );
    assert_eq!(listed_ids(&temp_dir, None), vec![1, 2]);

    set_filters(&temp_dir, r#"[{"key":"4.2","operator":"isnot","value":""}]"#);
    assert_eq!(listed_ids(&temp_dir, None), vec![1]);
}

#[test]
fn test_nested_tree_and_clear() {
    let (temp_dir, _guard) = setup_test_env();
    setup_orders(&temp_dir);
    set_filters(
        &temp_dir,
        r#"{"_id":"r","version":2,"mode":"and","conditions":[
            {"_id":"g","mode":"or","conditions":[
                {"_id":"a","key":"3","operator":"contains","value":"an"},
                {"_id":"b","key":"7","operator":"<","value":"1"}
            ]}
        ]}"#,
    );
    assert_eq!(listed_ids(&temp_dir, None), vec![1]);

    new_cmd(&temp_dir)
        .args(["view", "filters", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"conditions\""));

    new_cmd(&temp_dir)
        .args(["view", "filters", "1", "--clear"])
        .assert()
        .success();
    assert_eq!(listed_ids(&temp_dir, None), vec![1, 2]);
}

#[test]
fn test_view_filters_rejects_invalid_json() {
    let (temp_dir, _guard) = setup_test_env();
    setup_orders(&temp_dir);

    new_cmd(&temp_dir)
        .args(["view", "filters", "1", "--set", "{not json"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("status 400"));
}

#[test]
fn test_view_not_found() {
    let (temp_dir, _guard) = setup_test_env();
    setup_orders(&temp_dir);

    new_cmd(&temp_dir)
        .args(["view", "entries", "7"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("status 404"));
}

#[test]
fn test_entry_table_output() {
    let (temp_dir, _guard) = setup_test_env();
    setup_orders(&temp_dir);

    new_cmd(&temp_dir)
        .args(["view", "entries", "1"])
        .env("COLUMNS", "120")
        .assert()
        .success()
        .stdout(predicate::str::contains("Quantity"))
        .stdout(predicate::str::contains("Ana"))
        .stdout(predicate::str::contains("Blue"));

    new_cmd(&temp_dir)
        .args(["entry", "show", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entry 1 (form 1)"))
        .stdout(predicate::str::contains("Created by:     1 (alice)"));

    new_cmd(&temp_dir)
        .args(["entry", "list", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bo"));

    new_cmd(&temp_dir)
        .args(["form", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Orders"));
}

#[test]
fn test_entry_visible() {
    let (temp_dir, _guard) = setup_test_env();
    setup_orders(&temp_dir);
    let config = r#"{"conditional_logic":[{"key":"7","operator":">","value":"10"}],"conditional_logic_fallback":"Too few"}"#;

    new_cmd(&temp_dir)
        .args(["entry", "visible", "1", "--config", config])
        .assert()
        .success()
        .stdout(predicate::str::contains("shown"));

    new_cmd(&temp_dir)
        .args(["entry", "visible", "2", "--config", config])
        .assert()
        .success()
        .stdout(predicate::str::contains("hidden: Too few"));

    // Unreadable settings show the field
    new_cmd(&temp_dir)
        .args(["entry", "visible", "2", "--config", "{oops"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shown"));
}

#[test]
fn test_entry_visible_admin_bypass() {
    let (temp_dir, _guard) = setup_test_env();
    setup_orders(&temp_dir);
    let config_path = temp_dir.path().join("field.json");
    fs::write(
        &config_path,
        r#"{"conditional_logic":[{"key":"3","operator":"is","value":"Nobody:disabled_admin"}]}"#,
    )
    .unwrap();
    let arg = format!("@{}", config_path.display());

    new_cmd(&temp_dir)
        .args(["entry", "visible", "1", "--config", &arg, "--as", "alice"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hidden:"));

    new_cmd(&temp_dir)
        .args(["entry", "visible", "1", "--config", &arg, "--as", "root"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shown"));
}

#[test]
fn test_field_catalogue() {
    let (temp_dir, _guard) = setup_test_env();
    setup_orders(&temp_dir);

    new_cmd(&temp_dir)
        .args(["form", "fields", "1", "--as", "root"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"key\": \"4.1\""))
        .stdout(predicate::str::contains("Colors (Red)"))
        .stdout(predicate::str::contains("created_by_user_role"));
}

#[test]
fn test_field_catalogue_rejections() {
    let (temp_dir, _guard) = setup_test_env();
    setup_orders(&temp_dir);

    new_cmd(&temp_dir)
        .args(["form", "fields", "1", "--as", "root", "--token", "stale"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("status 400"));

    new_cmd(&temp_dir)
        .args(["form", "fields", "1", "--as", "alice"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("status 403"));

    new_cmd(&temp_dir)
        .args(["form", "fields", "--as", "root"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("form_id"));

    new_cmd(&temp_dir)
        .args(["form", "fields", "5", "--as", "root"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("status 404"));
}

#[test]
fn test_unknown_viewer_login() {
    let (temp_dir, _guard) = setup_test_env();
    setup_orders(&temp_dir);

    new_cmd(&temp_dir)
        .args(["view", "entries", "1", "--as", "mallory"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("User 'mallory' not found"));
}
