///
/// # Use Statement Parser Tests
///
/// Alias tables built from files on disk, and the errors reported for paths
/// that are missing, directories or unreadable.
///

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use vardump::uses::ImportKind;
use vardump::{UseError, UseStatementParser};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/closures.php")
}

#[test]
fn test_fixture_alias_table() {
    let table = UseStatementParser::from_file(fixture()).expect("fixture should parse");

    assert_eq!(table.namespace.as_deref(), Some("Fixtures\\Closures"));
    assert_eq!(
        table.iter(ImportKind::Class).collect::<Vec<_>>(),
        vec![
            ("DateTimeZone", "DateTimeZone"),
            ("User", "Fixtures\\Models\\User"),
            ("Article", "Fixtures\\Models\\Post"),
        ]
    );
    assert_eq!(table.function("format_date"), Some("Fixtures\\Support\\format_date"));
    assert_eq!(table.constant("DEFAULT_ZONE"), Some("Fixtures\\Support\\DEFAULT_ZONE"));
}

#[test]
fn test_parsing_is_idempotent() {
    let first = UseStatementParser::from_file(fixture()).unwrap();
    let second = UseStatementParser::from_file(fixture()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_non_existing_file() {
    let err = UseStatementParser::from_file("non-exists-file").unwrap_err();
    assert!(matches!(err, UseError::FileNotFound { .. }));
    assert_eq!(err.to_string(), "File \"non-exists-file\" does not exist.");
}

#[test]
fn test_directory_does_not_exist() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let err = UseStatementParser::from_file(temp_dir.path()).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("File \"{}\" does not exist.", temp_dir.path().display())
    );
}

#[cfg(unix)]
#[test]
fn test_not_readable() {
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file = temp_dir.path().join("locked.php");
    fs::write(&file, "<?php use A\\B;").unwrap();
    fs::set_permissions(&file, fs::Permissions::from_mode(0o333)).unwrap();

    // Privileged users can read the file regardless of its mode
    if fs::File::open(&file).is_ok() {
        return;
    }

    let err = UseStatementParser::from_file(&file).unwrap_err();
    assert!(matches!(err, UseError::FileUnreadable { .. }));
    assert_eq!(
        err.to_string(),
        format!("File \"{}\" is not readable.", file.display())
    );
}

#[test]
fn test_imports_after_code_are_ignored() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file = temp_dir.path().join("late.php");
    fs::write(
        &file,
        "<html>\n<?php\nuse A\\First;\n\nclass Foo {\n    use SomeTrait;\n}\n\nuse B\\Second;\n",
    )
    .unwrap();

    let table = UseStatementParser::from_file(&file).unwrap();
    assert_eq!(table.class("First"), Some("A\\First"));
    assert_eq!(table.class("Second"), None);
    assert_eq!(table.class("SomeTrait"), None);
}

#[test]
fn test_non_utf8_source_is_readable() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file = temp_dir.path().join("latin1.php");
    let mut source = b"<?php\nuse App\\Clock;\n\n$label = 'caf".to_vec();
    source.push(0xE9);
    source.extend_from_slice(b"';\n");
    fs::write(&file, source).unwrap();

    let table = UseStatementParser::from_file(&file).expect("latin-1 source should parse");
    assert_eq!(table.class("Clock"), Some("App\\Clock"));
}
