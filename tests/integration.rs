//! Binary-driven tests over the offline command surface: database
//! initialization, preferences, bookmarks, history, cache stats, and
//! clear-data. Network-touching commands (tree, ls, get, search,
//! sources) are exercised by unit tests over their pure parts instead.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn codex_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("codex");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    let config_content = format!(
        r#"[repository]
owner = "octo-org"
repo = "codex-fabric"
branch_candidates = ["master", "main"]
root = "weaves"

[db]
path = "{}/data/codex.sqlite"
"#,
        root.display()
    );

    let config_path = config_dir.join("codex.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_codex(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = codex_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run codex binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_codex(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_codex(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_codex(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_config_validation_rejects_empty_owner() {
    let (tmp, _) = setup_test_env();
    let bad_config = tmp.path().join("config").join("bad.toml");
    fs::write(
        &bad_config,
        r#"[repository]
owner = ""
repo = "codex-fabric"

[db]
path = "./data/codex.sqlite"
"#,
    )
    .unwrap();

    let (_, stderr, success) = run_codex(&bad_config, &["init"]);
    assert!(!success);
    assert!(stderr.contains("repository.owner"));
}

#[test]
fn test_prefs_set_get_list() {
    let (_tmp, config_path) = setup_test_env();
    run_codex(&config_path, &["init"]);

    let (stdout, _, success) = run_codex(&config_path, &["prefs", "set", "theme", "dark"]);
    assert!(success, "prefs set failed: {}", stdout);

    let (stdout, _, success) = run_codex(&config_path, &["prefs", "get", "theme"]);
    assert!(success);
    assert_eq!(stdout.trim(), "dark");

    run_codex(&config_path, &["prefs", "set", "font_size", "14"]);
    let (stdout, _, _) = run_codex(&config_path, &["prefs", "list"]);
    assert!(stdout.contains("theme"));
    assert!(stdout.contains("dark"));
    assert!(stdout.contains("font_size"));
}

#[test]
fn test_prefs_overwrite_takes_latest() {
    let (_tmp, config_path) = setup_test_env();
    run_codex(&config_path, &["init"]);

    run_codex(&config_path, &["prefs", "set", "theme", "dark"]);
    run_codex(&config_path, &["prefs", "set", "theme", "light"]);

    let (stdout, _, _) = run_codex(&config_path, &["prefs", "get", "theme"]);
    assert_eq!(stdout.trim(), "light");
}

#[test]
fn test_prefs_unknown_key_rejected() {
    let (_tmp, config_path) = setup_test_env();
    run_codex(&config_path, &["init"]);

    let (_, stderr, success) = run_codex(&config_path, &["prefs", "set", "cursor_blink", "on"]);
    assert!(!success);
    assert!(stderr.contains("Unknown preference key"));
    assert!(stderr.contains("theme"));
}

#[test]
fn test_prefs_get_unset() {
    let (_tmp, config_path) = setup_test_env();
    run_codex(&config_path, &["init"]);

    let (stdout, _, success) = run_codex(&config_path, &["prefs", "get", "sidebar_width"]);
    assert!(success);
    assert!(stdout.contains("(unset)"));
}

#[test]
fn test_bookmark_add_list_remove() {
    let (_tmp, config_path) = setup_test_env();
    run_codex(&config_path, &["init"]);

    let (stdout, _, success) = run_codex(
        &config_path,
        &[
            "bookmark",
            "add",
            "physics/optics/lenses.md",
            "--title",
            "Lenses",
        ],
    );
    assert!(success, "bookmark add failed: {}", stdout);

    let (stdout, _, _) = run_codex(&config_path, &["bookmark", "list"]);
    assert!(stdout.contains("physics/optics/lenses.md"));
    assert!(stdout.contains("Lenses"));

    let (stdout, _, success) =
        run_codex(&config_path, &["bookmark", "remove", "physics/optics/lenses.md"]);
    assert!(success);
    assert!(stdout.contains("Removed"));

    let (stdout, _, _) = run_codex(&config_path, &["bookmark", "list"]);
    assert!(stdout.contains("No bookmarks."));
}

#[test]
fn test_bookmark_add_same_path_twice_keeps_one() {
    let (_tmp, config_path) = setup_test_env();
    run_codex(&config_path, &["init"]);

    run_codex(&config_path, &["bookmark", "add", "a/one.md"]);
    run_codex(&config_path, &["bookmark", "add", "a/one.md", "--title", "One"]);

    let (stdout, _, _) = run_codex(&config_path, &["bookmark", "list"]);
    assert_eq!(stdout.matches("a/one.md").count(), 1);
    assert!(stdout.contains("One"));
}

#[test]
fn test_bookmark_remove_missing_is_not_an_error() {
    let (_tmp, config_path) = setup_test_env();
    run_codex(&config_path, &["init"]);

    let (stdout, _, success) = run_codex(&config_path, &["bookmark", "remove", "ghost.md"]);
    assert!(success);
    assert!(stdout.contains("No bookmark for"));
}

#[test]
fn test_history_empty_then_clear() {
    let (_tmp, config_path) = setup_test_env();
    run_codex(&config_path, &["init"]);

    let (stdout, _, success) = run_codex(&config_path, &["history", "list"]);
    assert!(success);
    assert!(stdout.contains("No history."));

    let (stdout, _, success) = run_codex(&config_path, &["history", "clear"]);
    assert!(success);
    assert!(stdout.contains("History cleared."));
}

#[test]
fn test_cache_stats_empty() {
    let (_tmp, config_path) = setup_test_env();
    run_codex(&config_path, &["init"]);

    let (stdout, _, success) = run_codex(&config_path, &["cache", "stats"]);
    assert!(success, "cache stats failed: {}", stdout);
    assert!(stdout.contains("Cached strands: 0"));
    assert!(stdout.contains("Bookmarks:      0"));
}

#[test]
fn test_cache_clear_on_empty_db() {
    let (_tmp, config_path) = setup_test_env();
    run_codex(&config_path, &["init"]);

    let (stdout, _, success) = run_codex(&config_path, &["cache", "clear"]);
    assert!(success);
    assert!(stdout.contains("Cache cleared."));
}

#[test]
fn test_clear_data_wipes_everything() {
    let (_tmp, config_path) = setup_test_env();
    run_codex(&config_path, &["init"]);

    run_codex(&config_path, &["prefs", "set", "theme", "dark"]);
    run_codex(&config_path, &["bookmark", "add", "a/one.md"]);

    let (stdout, _, success) = run_codex(&config_path, &["clear-data"]);
    assert!(success);
    assert!(stdout.contains("cleared"));

    let (stdout, _, _) = run_codex(&config_path, &["prefs", "list"]);
    assert!(stdout.contains("No preferences set."));
    let (stdout, _, _) = run_codex(&config_path, &["bookmark", "list"]);
    assert!(stdout.contains("No bookmarks."));
}

#[test]
fn test_completions_without_config() {
    // Completions must work with no config file at all.
    let (stdout, stderr, success) = {
        let binary = codex_binary();
        let output = Command::new(&binary)
            .args(["completions", "bash"])
            .output()
            .unwrap();
        (
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.success(),
        )
    };
    assert!(success, "completions failed: {}", stderr);
    assert!(stdout.contains("codex"));
}

#[test]
fn test_search_rejects_unknown_scope_before_fetching() {
    let (_tmp, config_path) = setup_test_env();
    run_codex(&config_path, &["init"]);

    let (_, stderr, success) =
        run_codex(&config_path, &["search", "anything", "--scope", "fuzzy"]);
    assert!(!success);
    assert!(stderr.contains("Unknown scope"));
}
