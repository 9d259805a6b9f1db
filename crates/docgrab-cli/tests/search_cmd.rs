//! Integration tests for the `search` subcommand.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("docgrab").unwrap()
}

#[test]
fn search_highlights_matching_corpus_files() {
    let docs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    common::write_pdf(&docs.path().join("hit.pdf"), "the needle sits here");
    common::write_pdf(&docs.path().join("miss.pdf"), "nothing of note");

    cmd()
        .arg("search")
        .arg("needle")
        .arg("--dir")
        .arg(docs.path())
        .arg("--out")
        .arg(out.path())
        .arg("--no-open")
        .assert()
        .success()
        .stdout(predicate::str::contains("scanned 2 file(s), 1 hit(s) in 1 file(s)"))
        .stdout(predicate::str::contains("hit.pdf"));

    // One timestamped run directory with one highlighted copy inside.
    let runs: Vec<_> = std::fs::read_dir(out.path()).unwrap().collect();
    assert_eq!(runs.len(), 1);
    let run_dir = runs[0].as_ref().unwrap().path();
    assert!(run_dir.file_name().unwrap().to_string_lossy().ends_with("__needle"));
    let copies: Vec<_> = std::fs::read_dir(&run_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(copies, vec!["hit.pdf"]);
}

#[test]
fn search_case_variants_hit_uppercase_text() {
    let docs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    common::write_pdf(&docs.path().join("caps.pdf"), "SAFETY DATA SHEET");

    cmd()
        .arg("search")
        .arg("safety")
        .arg("--dir")
        .arg(docs.path())
        .arg("--out")
        .arg(out.path())
        .arg("--no-open")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 hit(s) in 1 file(s)"));
}

#[test]
fn blank_query_exits_with_code_1() {
    let docs = tempfile::tempdir().unwrap();
    cmd()
        .arg("search")
        .arg("   ")
        .arg("--dir")
        .arg(docs.path())
        .arg("--no-open")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn missing_corpus_dir_exits_with_code_2() {
    let out = tempfile::tempdir().unwrap();
    cmd()
        .arg("search")
        .arg("needle")
        .arg("--dir")
        .arg(out.path().join("does-not-exist"))
        .arg("--no-open")
        .assert()
        .code(2);
}

#[test]
fn corpus_without_pdfs_exits_with_code_3() {
    let docs = tempfile::tempdir().unwrap();
    std::fs::write(docs.path().join("notes.txt"), b"plain text").unwrap();
    cmd()
        .arg("search")
        .arg("needle")
        .arg("--dir")
        .arg(docs.path())
        .arg("--no-open")
        .assert()
        .code(3);
}

#[test]
fn no_matches_still_succeeds_with_empty_report() {
    let docs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    common::write_pdf(&docs.path().join("a.pdf"), "unrelated content");

    cmd()
        .arg("search")
        .arg("needle")
        .arg("--dir")
        .arg(docs.path())
        .arg("--out")
        .arg(out.path())
        .arg("--no-open")
        .assert()
        .success()
        .stdout(predicate::str::contains("no matches"));
}
