//! Drive the installed binary the way a user would: a source file in, an
//! assembly file out, diagnostics on stderr, and a non-zero exit when the
//! program is bad.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

fn cmmc() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_cmmc"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn write_file(base: &Path, rel: &str, contents: &str) -> std::path::PathBuf {
    let full = base.join(rel);
    fs::write(&full, contents).unwrap();
    full
}

#[test]
fn compiles_a_clean_program_to_a_file() {
    let dir = tempdir().unwrap();
    let src = write_file(dir.path(), "hello.cmm", "void main() { cout << \"hi\"; }\n");
    let out = dir.path().join("hello.asm");

    let result = cmmc()
        .arg(&src)
        .arg("-o")
        .arg(&out)
        .output()
        .expect("failed to run cmmc");

    assert!(result.status.success(), "stderr: {}", String::from_utf8_lossy(&result.stderr));
    let asm = fs::read_to_string(&out).unwrap();
    assert!(asm.contains(".text"));
    assert!(asm.contains(".asciiz \"hi\""));
    assert!(result.stdout.is_empty());
}

#[test]
fn reports_errors_on_stderr_and_exits_nonzero() {
    let dir = tempdir().unwrap();
    let src = write_file(
        dir.path(),
        "bad.cmm",
        "void main() {\n    int x;\n    bool b;\n    x = b;\n}\n",
    );
    let out = dir.path().join("bad.asm");

    let result = cmmc().arg(&src).arg("-o").arg(&out).output().unwrap();

    assert_eq!(result.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert_eq!(stderr, "4:5 ***ERROR*** Type mismatch\n");
    assert!(!out.exists(), "no assembly may be written for a bad program");
}

#[test]
fn emit_ast_pretty_prints_to_stdout() {
    let dir = tempdir().unwrap();
    let src = write_file(
        dir.path(),
        "p.cmm",
        "void main() { int a; a = 1 + 2; }\n",
    );

    let result = cmmc().arg(&src).arg("--emit").arg("ast").output().unwrap();

    assert!(result.status.success());
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("a = (1 + 2);"), "got:\n{stdout}");
}

#[test]
fn emit_names_annotates_and_still_fails_on_errors() {
    let dir = tempdir().unwrap();
    let src = write_file(dir.path(), "n.cmm", "int g;\nvoid main() { g = x; }\n");

    let result = cmmc().arg(&src).arg("--emit").arg("names").output().unwrap();

    assert_eq!(result.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&result.stdout);
    assert!(stdout.contains("g(int)"), "got:\n{stdout}");
    let stderr = String::from_utf8_lossy(&result.stderr);
    assert!(stderr.contains("***ERROR*** Undeclared identifier"));
}

#[test]
fn missing_input_file_exits_with_usage_error() {
    let dir = tempdir().unwrap();
    let result = cmmc().arg(dir.path().join("nope.cmm")).output().unwrap();
    assert_eq!(result.status.code(), Some(2));
}
