///
/// # Closure Source Recovery Tests
///
/// Extracts closures from a fixture file and checks the recovered source,
/// including alias rewriting and export through the value API.
///

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use vardump::{Array, Closure, ClosureError, Value, VarDumper, closure_exporter, export};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/closures.php")
}

fn extract(line: u32) -> String {
    closure_exporter()
        .extract(fixture(), line, 1)
        .expect("closure should be extracted")
}

#[test]
fn test_regular_closure() {
    assert_eq!(
        extract(12),
        "function (int $test): int {\n    return 42 + $test;\n}"
    );
}

#[test]
fn test_static_closure() {
    assert_eq!(
        extract(16),
        "static function (int $test): int {\n    return 42 + $test;\n}"
    );
}

#[test]
fn test_short_closure() {
    assert_eq!(extract(20), "fn (int $test): int => 42 + $test");
}

#[test]
fn test_short_static_closure_as_argument() {
    assert_eq!(extract(22), "static fn (int $test): int => 42 + $test");
}

#[test]
fn test_group_imported_names_are_qualified() {
    assert_eq!(
        extract(24),
        "fn (\\Fixtures\\Models\\User $user): \\Fixtures\\Models\\Post => $user->latest()"
    );
}

#[test]
fn test_class_and_constant_imports_are_qualified() {
    assert_eq!(
        extract(26),
        "function (?string $name = null): \\DateTimeZone {\n    return new \\DateTimeZone($name ?? \\Fixtures\\Support\\DEFAULT_ZONE);\n}"
    );
}

#[test]
fn test_function_imports_are_qualified() {
    assert_eq!(
        extract(30),
        "static fn (\\Fixtures\\Models\\Post $post): string => \\Fixtures\\Support\\format_date($post->published, \"{$post->zone}\")"
    );
}

#[test]
fn test_heredoc_braces_do_not_end_the_body() {
    assert_eq!(
        extract(32),
        "function (): string {\n    return <<<HTML\n    <div class=\"{wrapper}\">}</div>\n    HTML;\n}"
    );
}

#[test]
fn test_line_without_closure() {
    let err = closure_exporter().extract(fixture(), 38, 1).unwrap_err();
    assert!(matches!(err, ClosureError::NotFound { line: 38, .. }));
}

#[test]
fn test_missing_file() {
    let err = closure_exporter()
        .extract("tests/fixtures/missing.php", 1, 1)
        .unwrap_err();
    assert!(matches!(err, ClosureError::Resolve(_)));
    assert!(err.to_string().contains("missing.php"));
}

#[test]
fn test_export_closure_values() {
    let closure = Closure::arrow("(int $test): int", "42 + $test").declared_at(fixture(), 20, 1);
    let value = Value::Closure(closure.clone());
    assert_eq!(
        VarDumper::create(&value).export(true),
        "fn (int $test): int => 42 + $test"
    );
    assert_eq!(
        VarDumper::create(&value).export(false),
        "fn (int $test): int => 42 + $test"
    );

    let mut array = Array::new();
    array.insert("f", closure);
    assert_eq!(
        export(&Value::Array(array), 10, true),
        "[\n    'f' => fn (int $test): int => 42 + $test,\n]"
    );
}

#[test]
fn test_closure_written_at_runtime() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file = temp_dir.path().join("generated.php");
    fs::write(
        &file,
        "<?php\nuse App\\Clock;\n\n$now = static fn (): Clock => Clock::system();\n",
    )
    .expect("Failed to write source");

    let closure = Closure::arrow("(): Clock", "Clock::system()")
        .with_static()
        .declared_at(&file, 4, 1);
    assert_eq!(
        export(&Value::Closure(closure), 10, true),
        "static fn (): \\App\\Clock => \\App\\Clock::system()"
    );
}

#[test]
fn test_closure_without_location_is_synthesized() {
    let closure = Closure::regular("()", "\n    return 1;\n");
    assert_eq!(
        export(&Value::Closure(closure), 10, true),
        "function () {\n    return 1;\n}"
    );
}

#[test]
fn test_closure_exporter_is_cached() {
    let first = VarDumper::closure_exporter();
    let second = closure_exporter();
    assert!(std::ptr::eq(first, second));
    assert_eq!(std::mem::size_of_val(first), 0);
}

#[test]
fn test_closure_in_non_utf8_source() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let file = temp_dir.path().join("latin1.php");
    let mut source = b"<?php\nuse App\\Clock;\n\n$greet = fn (): string => 'caf".to_vec();
    source.push(0xE9);
    source.extend_from_slice(b"' . Clock::now();\n");
    fs::write(&file, source).expect("Failed to write source");

    assert_eq!(
        closure_exporter().extract(&file, 4, 1).unwrap(),
        "fn (): string => 'caf\u{FFFD}' . \\App\\Clock::now()"
    );

    let closure = Closure::arrow("(): string", "'cafe'").declared_at(&file, 4, 1);
    assert_ne!(
        export(&Value::Closure(closure), 10, true),
        "function() {/* Error: unable to determine Closure source */}"
    );
}
