use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_docbook-cli"))
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

fn run(dir: &Path, args: &[&str]) -> Output {
    Command::new(bin_path())
        .current_dir(dir)
        .args(args)
        .output()
        .expect("run")
}

const INTRO: &str = r#"{"type": "document", "children": [
  {"type": "section", "children": [
    {"type": "title", "children": [{"type": "text", "content": "Intro"}]},
    {"type": "paragraph", "children": [{"type": "text", "content": "Hello & welcome"}]}
  ]}
]}"#;

const GHOST: &str = r#"{"type": "document", "children": [
  {"type": "section", "children": [
    {"type": "title", "children": [{"type": "text", "content": "Refs"}]},
    {"type": "paragraph", "children": [{"type": "reference", "target": "ghost"}]}
  ]}
]}"#;

const TWO_ROOTS: &str = r#"{"type": "document", "children": [
  {"type": "section", "children": [{"type": "title", "children": [{"type": "text", "content": "One"}]}]},
  {"type": "section", "children": [{"type": "title", "children": [{"type": "text", "content": "Two"}]}]}
]}"#;

#[test]
fn converts_a_file_to_stdout() {
    let dir = TempDir::new().expect("temp dir");
    write_file(dir.path(), "intro.json", INTRO);
    let output = run(dir.path(), &["intro.json"]);

    assert!(output.status.success(), "expected success exit code");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(stdout.contains("<!DOCTYPE section PUBLIC"));
    assert!(stdout.contains("<section id=\"intro\">"));
    assert!(stdout.contains("<title>Intro</title>"));
    assert!(stdout.contains("<para>Hello &amp; welcome</para>"));
}

#[test]
fn diagnostics_json_reports_unresolved_reference() {
    let dir = TempDir::new().expect("temp dir");
    write_file(dir.path(), "refs.json", GHOST);
    let output = run(dir.path(), &["--diagnostics", "json", "refs.json"]);

    assert!(output.status.success(), "warnings alone must not fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("\"code\": \"W_REF_UNRESOLVED\""),
        "expected W_REF_UNRESOLVED in stderr: {stderr}"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("<link linkend=\"ghost\">ghost</link>"));
}

#[test]
fn diagnostics_pretty_names_document_and_path() {
    let dir = TempDir::new().expect("temp dir");
    write_file(dir.path(), "refs.json", GHOST);
    let output = run(dir.path(), &["--diagnostics", "pretty", "refs.json"]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("refs.json:/0/1/0 warning W_REF_UNRESOLVED"),
        "unexpected stderr: {stderr}"
    );
}

#[test]
fn deny_warnings_turns_warnings_into_failure() {
    let dir = TempDir::new().expect("temp dir");
    write_file(dir.path(), "refs.json", GHOST);
    let output = run(dir.path(), &["--deny-warnings", "refs.json"]);

    assert!(!output.status.success(), "expected failure exit code");
}

#[test]
fn batch_writes_each_document_and_isolates_failures() {
    let dir = TempDir::new().expect("temp dir");
    write_file(dir.path(), "good.json", INTRO);
    write_file(dir.path(), "bad.json", TWO_ROOTS);
    let output = run(dir.path(), &["-o", "out", "good.json", "bad.json"]);

    assert!(!output.status.success(), "expected failure exit code");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("bad.json"), "expected failing input named: {stderr}");

    let good = fs::read_to_string(dir.path().join("out/good.xml")).expect("good.xml written");
    assert!(good.contains("<section id=\"good\">"));
    assert!(!dir.path().join("out/bad.xml").exists());
}

#[test]
fn several_inputs_need_an_output_directory() {
    let dir = TempDir::new().expect("temp dir");
    write_file(dir.path(), "a.json", INTRO);
    write_file(dir.path(), "b.json", INTRO);
    let output = run(dir.path(), &["a.json", "b.json"]);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn reads_stdin_without_inputs() {
    let dir = TempDir::new().expect("temp dir");
    let mut child = Command::new(bin_path())
        .current_dir(dir.path())
        .args(["--compact"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(INTRO.as_bytes())
        .expect("write stdin");
    let output = child.wait_with_output().expect("wait");

    assert!(output.status.success(), "expected success exit code");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(
        "<section><title>Intro</title><para>Hello &amp; welcome</para></section>"
    ));
}

#[test]
fn config_file_sets_root_element_and_template() {
    let dir = TempDir::new().expect("temp dir");
    write_file(dir.path(), "intro.json", INTRO);
    write_file(
        dir.path(),
        "shell.xml",
        "<{{data.root_element}} lang=\"en\">\n{{data.contents}}\n</{{data.root_element}}>\n",
    );
    write_file(
        dir.path(),
        "docbook.toml",
        "docbook_default_root_element = \"chapter\"\ndocbook_template_file = \"shell.xml\"\n",
    );
    let output = run(dir.path(), &["--compact", "intro.json"]);

    assert!(output.status.success(), "expected success exit code");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout,
        "<chapter lang=\"en\">\n<title>Intro</title><para>Hello &amp; welcome</para>\n</chapter>\n"
    );
}

#[test]
fn missing_explicit_config_is_a_usage_error() {
    let dir = TempDir::new().expect("temp dir");
    write_file(dir.path(), "intro.json", INTRO);
    let output = run(dir.path(), &["--config", "nope.toml", "intro.json"]);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn inputs_sharing_an_output_name_are_rejected() {
    let dir = TempDir::new().expect("temp dir");
    fs::create_dir_all(dir.path().join("a")).expect("mkdir a");
    fs::create_dir_all(dir.path().join("b")).expect("mkdir b");
    write_file(&dir.path().join("a"), "intro.json", INTRO);
    write_file(&dir.path().join("b"), "intro.json", INTRO);
    let output = run(dir.path(), &["-o", "out", "a/intro.json", "b/intro.json"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("intro.xml"), "expected clashing name: {stderr}");
    assert!(!dir.path().join("out/intro.xml").exists());
}

#[test]
fn template_without_placeholders_is_a_usage_error() {
    let dir = TempDir::new().expect("temp dir");
    write_file(dir.path(), "intro.json", INTRO);
    write_file(dir.path(), "shell.xml", "<article>{{data.contents}}</article>\n");
    let output = run(dir.path(), &["--template", "shell.xml", "intro.json"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}
