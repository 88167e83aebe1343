use std::io::Write;

use assert_cmd::Command;

#[test]
fn running_a_script_that_prints_exits_zero_and_writes_stdout() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "print 1 + 2;").unwrap();

    Command::cargo_bin("lox")
        .unwrap()
        .arg(file.path())
        .assert()
        .success()
        .stdout("3\n");
}

#[test]
fn a_script_with_a_syntax_error_exits_65() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "var x = ;").unwrap();

    Command::cargo_bin("lox").unwrap().arg(file.path()).assert().code(65);
}

#[test]
fn a_script_with_a_runtime_error_exits_70() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "print 1 + nil;").unwrap();

    Command::cargo_bin("lox").unwrap().arg(file.path()).assert().code(70);
}

#[test]
fn too_many_arguments_exits_64_with_a_usage_message() {
    Command::cargo_bin("lox")
        .unwrap()
        .arg("one")
        .arg("two")
        .assert()
        .code(64)
        .stderr("Usage: lox [script]\n");
}

#[test]
fn a_missing_script_file_exits_64() {
    Command::cargo_bin("lox").unwrap().arg("/no/such/file.lox").assert().code(64);
}
