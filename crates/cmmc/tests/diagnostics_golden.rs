//! Walk the fixture programs and compare the diagnostics each one produces
//! against its `.err` golden file; fixtures without a golden must compile
//! cleanly.

use std::fs;
use std::path::{Path, PathBuf};

use cmmc::{run, Emit};

fn programs_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("programs")
}

fn find_programs(dir: &Path) -> Vec<PathBuf> {
    let mut programs = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.extension().is_some_and(|e| e == "cmm") {
            programs.push(path);
        }
    }
    programs.sort();
    programs
}

#[test]
fn diagnostics_match_the_golden_files() {
    let programs = find_programs(&programs_dir());
    assert!(!programs.is_empty(), "no fixture programs found");

    for program in programs {
        let src = fs::read_to_string(&program).unwrap();
        let compilation = run(&src, Emit::Asm).unwrap();

        let mut actual = String::new();
        for diag in compilation.reporter.diags() {
            actual.push_str(&diag.to_string());
            actual.push('\n');
        }

        let golden_path = program.with_extension("err");
        let expected = if golden_path.exists() {
            fs::read_to_string(&golden_path).unwrap()
        } else {
            String::new()
        };

        assert_eq!(
            actual,
            expected,
            "diagnostics mismatch for {}",
            program.display()
        );

        // the error flag and the emitted output must agree with the goldens
        assert_eq!(compilation.reporter.errored(), !expected.is_empty());
        assert_eq!(compilation.output.is_some(), expected.is_empty());
    }
}
