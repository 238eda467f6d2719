use super::*;

#[test]
fn expand_home_tilde_slash() {
    let result = expand_home("~/foo/bar.db");
    let home = dirs::home_dir().unwrap();
    assert_eq!(result, home.join("foo/bar.db"));
}

#[test]
fn expand_home_tilde_only() {
    let home = dirs::home_dir().unwrap();
    assert_eq!(expand_home("~"), home);
}

#[test]
fn expand_home_relative_untouched() {
    assert_eq!(expand_home("relative/path"), PathBuf::from("relative/path"));
    assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
}

#[test]
fn ensure_dir_creates_and_returns() {
    let tmp = tempfile::tempdir().unwrap();
    let new_dir = tmp.path().join("subdir");
    let result = ensure_dir(&new_dir).unwrap();
    assert_eq!(result, new_dir);
    assert!(new_dir.exists());
}

#[test]
fn atomic_write_overwrites() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("test.txt");
    atomic_write(&path, "first").unwrap();
    atomic_write(&path, "second").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
}

#[test]
fn truncate_chars_short_input_unchanged() {
    assert_eq!(truncate_chars("buy milk", 30), "buy milk");
}

#[test]
fn truncate_chars_cuts_at_limit() {
    let text = "a".repeat(45);
    assert_eq!(truncate_chars(&text, 30).chars().count(), 30);
}

#[test]
fn truncate_chars_respects_multibyte() {
    let text = "日本語のタスクを追加してください";
    let out = truncate_chars(text, 3);
    assert_eq!(out, "日本語");
}
