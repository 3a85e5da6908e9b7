use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

const GIT_SCHEMA: &str = r#"{
    "prog": "git",
    "fromfile-prefix-chars": "@",
    "args": [
        { "flags": ["-v", "--verbose"], "action": "count" },
        { "flags": ["--version"], "action": "version", "version": "git 2.0" }
    ],
    "subcommands": {
        "dest": "command",
        "required": true,
        "commands": [
            {
                "name": "add",
                "help": "add file contents to the index",
                "args": [
                    { "flags": ["-n", "--dry-run"], "action": "store_true" },
                    { "flags": ["pathspec"], "nargs": "+" }
                ]
            },
            {
                "name": "commit",
                "args": [ { "flags": ["-m", "--message"], "required": true } ]
            }
        ]
    }
}"#;

fn make_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before UNIX_EPOCH")
        .as_nanos();
    let pid = std::process::id();
    let dir = std::env::temp_dir().join(format!("argbind-integ-{prefix}-{pid}-{nanos}"));
    fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}

fn write_schema(dir: &Path) -> PathBuf {
    let path = dir.join("argbind.json");
    fs::write(&path, GIT_SCHEMA).expect("failed to write schema");
    path
}

fn argbind() -> Command {
    Command::new(env!("CARGO_BIN_EXE_argbind"))
}

fn run(dir: &Path, args: &[&str]) -> Output {
    argbind()
        .current_dir(dir)
        .args(args)
        .output()
        .expect("failed to run argbind")
}

fn assert_success(out: &Output, what: &str) {
    assert!(
        out.status.success(),
        "{what} failed:\nstatus: {}\nstderr:\n{}",
        out.status,
        String::from_utf8_lossy(&out.stderr),
    );
}

#[test]
fn help_works() {
    let out = argbind()
        .arg("--help")
        .output()
        .expect("failed to run argbind --help");
    assert_success(&out, "argbind --help");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(
        stdout.contains("argbind") && stdout.contains("parse") && stdout.contains("init"),
        "unexpected help output:\n{stdout}"
    );
}

#[test]
fn init_writes_a_declaration_that_checks() {
    let dir = make_temp_dir("init");

    let out = run(&dir, &["init", "--prog", "demo"]);
    assert_success(&out, "argbind init");
    assert!(dir.join("argbind.json").is_file(), "argbind.json not created");

    let out = run(&dir, &["check"]);
    assert_success(&out, "argbind check");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("demo: 1 positional, 3 optional"), "{stdout}");

    let out = run(&dir, &["init"]);
    assert!(!out.status.success(), "second init should refuse to overwrite");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn parse_prints_bindings() {
    let dir = make_temp_dir("parse");
    write_schema(&dir);

    let out = run(&dir, &["parse", "--", "-vv", "add", "-n", "a.txt", "b.txt"]);
    assert_success(&out, "argbind parse");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("verbose = 2"), "{stdout}");
    assert!(stdout.contains("command = [add]"), "{stdout}");
    assert!(stdout.contains("dry-run = true"), "{stdout}");
    assert!(stdout.contains("pathspec = [a.txt, b.txt]"), "{stdout}");
    assert!(stdout.contains("# commands: add"), "{stdout}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn parse_json_output() {
    let dir = make_temp_dir("json");
    write_schema(&dir);

    let out = run(&dir, &["parse", "--json", "--", "commit", "-m", "msg"]);
    assert_success(&out, "argbind parse --json");
    let value: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("stdout is not JSON");
    assert_eq!(value["entries"]["message"]["values"][0], "msg");
    assert_eq!(value["entries"]["message"]["action"], "store");
    assert_eq!(value["subcommands"][0], "commit");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn parse_errors_exit_with_usage() {
    let dir = make_temp_dir("error");
    write_schema(&dir);

    let out = run(&dir, &["parse", "--", "commit"]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("usage: git commit "), "{stderr}");
    assert!(
        stderr.contains("git commit: error: the following arguments are required: -m/--message"),
        "{stderr}"
    );

    let out = run(&dir, &["parse", "--", "push"]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("usage: git [-h]"), "{stderr}");
    assert!(stderr.contains("git: error: argument"), "{stderr}");
    assert!(stderr.contains("invalid choice: 'push'"), "{stderr}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn parse_help_and_version_outcomes() {
    let dir = make_temp_dir("outcomes");
    write_schema(&dir);

    let out = run(&dir, &["parse", "--", "add", "--help"]);
    assert_success(&out, "argbind parse -- add --help");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.starts_with("usage: git add"), "{stdout}");

    let out = run(&dir, &["parse", "--", "--version"]);
    assert_success(&out, "argbind parse -- --version");
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "git 2.0");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn parse_expands_argument_files() {
    let dir = make_temp_dir("fromfile");
    write_schema(&dir);
    fs::write(dir.join("args.txt"), "add\n-n\nmy file.txt\n").expect("failed to write args");

    let out = run(&dir, &["parse", "--", "@args.txt"]);
    assert_success(&out, "argbind parse -- @args.txt");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("pathspec = [my file.txt]"), "{stdout}");

    let out = run(&dir, &["parse", "--", "@missing.txt"]);
    assert_eq!(out.status.code(), Some(2));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn help_and_usage_walk_subcommands() {
    let dir = make_temp_dir("help");
    write_schema(&dir);

    let out = run(&dir, &["usage"]);
    assert_success(&out, "argbind usage");
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        "usage: git [-h] [-v] [--version] {add,commit} ..."
    );

    let out = run(&dir, &["help", "add"]);
    assert_success(&out, "argbind help add");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("usage: git add [-h] [-n] pathspec [pathspec ...]"), "{stdout}");

    let out = run(&dir, &["help", "nope"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("no subcommand 'nope'"));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn check_rejects_invalid_declarations() {
    let dir = make_temp_dir("invalid");
    fs::write(
        dir.join("argbind.json"),
        r#"{ "args": [ { "flags": ["-x"] }, { "flags": ["-x"] } ] }"#,
    )
    .expect("failed to write schema");

    let out = run(&dir, &["check"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("invalid declaration"), "{stderr}");

    let _ = fs::remove_dir_all(&dir);
}
