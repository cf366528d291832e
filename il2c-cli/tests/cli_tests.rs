//! Integration tests for the il2c CLI.
//!
//! These tests invoke the `il2c` binary as a subprocess and check
//! exit codes, stdout, and stderr.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[allow(deprecated)]
fn il2c() -> Command {
    Command::cargo_bin("il2c").unwrap()
}

/// Write `content` to `name` inside `dir` and return its path.
fn write_input(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const PROGRAM: &str = "\
.class Demo.Counter
.field static Demo.Counter total int64

.method Demo.Native.puts int32
.param text nint
.native stdio.h
.end

.method Demo.Program.Max int32
.param a int32
.param b int32
  ldarg.0
  ldarg.1
  bge.s first
  ldarg.1
  ret
first:
  ldarg.0
  ret
.end

.method Demo.Program.Add int32
.param a int32
.param b int32
  ldarg.0
  ldarg.1
  add
  ret
.end
";

// ---- No-args / help ----

#[test]
fn no_args_prints_usage_and_exits_1() {
    il2c()
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Usage: il2c"));
}

#[test]
fn help_flag_exits_0() {
    il2c()
        .arg("--help")
        .assert()
        .success()
        .stderr(predicate::str::contains("Commands:"));
}

#[test]
fn unknown_command_exits_1() {
    il2c()
        .arg("frobnicate")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown command"));
}

// ---- Translate ----

#[test]
fn translate_prints_c_unit() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "demo.il", PROGRAM);

    il2c()
        .args(["translate", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("#include <stdint.h>\n"))
        .stdout(predicate::str::contains("#include <stdio.h>\n"))
        .stdout(predicate::str::contains("typedef struct Demo_Counter Demo_Counter;\n"))
        .stdout(predicate::str::contains("extern int64_t Demo_Counter_total;\n"))
        .stdout(predicate::str::contains(
            "int32_t Demo_Program_Max(int32_t a, int32_t b);\n",
        ))
        .stdout(predicate::str::contains("    if (a >= b) goto IL_0006;\n"))
        .stdout(predicate::str::contains("    __t0 = a + b;\n"))
        .stdout(predicate::str::contains("Demo_Native_puts").not());
}

#[test]
fn translate_single_method() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "demo.il", PROGRAM);

    il2c()
        .args([
            "translate",
            input.to_str().unwrap(),
            "--method",
            "Demo.Program.Add",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Demo_Program_Add"))
        .stdout(predicate::str::contains("Demo_Program_Max").not());
}

#[test]
fn translate_with_comments() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "demo.il", PROGRAM);

    il2c()
        .args([
            "translate",
            input.to_str().unwrap(),
            "--debug",
            "full",
            "--jobs",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("/* IL_0002: add [depth 2] */"));
}

#[test]
fn translate_is_deterministic_across_job_counts() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "demo.il", PROGRAM);
    let path = input.to_str().unwrap();

    let serial = il2c()
        .args(["translate", path, "--jobs", "1"])
        .output()
        .unwrap();
    let parallel = il2c()
        .args(["translate", path, "--jobs", "8"])
        .output()
        .unwrap();
    assert!(serial.status.success());
    assert_eq!(serial.stdout, parallel.stdout);
}

#[test]
fn translation_failure_exits_2() {
    let dir = TempDir::new().unwrap();
    let text = "\
.method Demo.Bad void
  ldc.i4.1
  ret
.end
.method Demo.Good void
  ret
.end
";
    let input = write_input(&dir, "bad.il", text);

    il2c()
        .args(["translate", input.to_str().unwrap()])
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::contains("void Demo_Good(void)"))
        .stderr(predicate::str::contains(
            "error: Demo.Bad: IL_0001 (ret): 1 value(s) on the stack at return, expected 0",
        ));
}

#[test]
fn unsupported_instruction_exits_2() {
    let dir = TempDir::new().unwrap();
    let input = write_input(
        &dir,
        "str.il",
        ".method Demo.Str void\n  ldstr 0x70000001\n  pop\n  ret\n.end\n",
    );

    il2c()
        .args(["translate", input.to_str().unwrap()])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("unsupported instruction 0x72"));
}

#[test]
fn assembly_error_exits_1() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "typo.il", ".method Demo.M void\n  bogus\n.end\n");

    il2c()
        .args(["translate", input.to_str().unwrap()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn unknown_method_exits_1() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "demo.il", PROGRAM);

    il2c()
        .args(["translate", input.to_str().unwrap(), "--method", "Demo.Nope"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no method named 'Demo.Nope'"));
}

#[test]
fn bad_debug_level_exits_1() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "demo.il", PROGRAM);

    il2c()
        .args(["translate", input.to_str().unwrap(), "--debug", "loud"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("unknown debug level 'loud'"));
}

#[test]
fn missing_input_exits_1() {
    il2c()
        .args(["translate", "/nonexistent/demo.il"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("cannot read"));
}

#[test]
fn verbose_logs_to_stderr() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "demo.il", PROGRAM);

    il2c()
        .args(["translate", input.to_str().unwrap(), "--verbose"])
        .assert()
        .success()
        .stderr(predicate::str::contains("translating block"));
}

// ---- Listing ----

#[test]
fn listing_labels_every_instruction() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "demo.il", PROGRAM);

    il2c()
        .args(["listing", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("  IL_0002: bge.s IL_0006\n"))
        .stdout(predicate::str::contains(".native stdio.h\n"));
}

#[test]
fn listing_reassembles() {
    let dir = TempDir::new().unwrap();
    let input = write_input(&dir, "demo.il", PROGRAM);

    let first = il2c()
        .args(["listing", input.to_str().unwrap()])
        .output()
        .unwrap();
    let relisted = write_input(&dir, "again.il", &String::from_utf8(first.stdout.clone()).unwrap());
    let second = il2c()
        .args(["listing", relisted.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(first.stdout, second.stdout);
}

// ---- Disassemble ----

#[test]
fn disassemble_raw_body() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("body.bin");
    fs::write(&input, [0x17, 0x18, 0x58, 0x2A]).unwrap();

    il2c()
        .args(["disassemble", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout("IL_0000: ldc.i4.1\nIL_0001: ldc.i4.2\nIL_0002: add\nIL_0003: ret\n");
}

#[test]
fn disassemble_truncated_body_exits_1() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("body.bin");
    fs::write(&input, [0x20, 0x01]).unwrap();

    il2c()
        .args(["disassemble", input.to_str().unwrap()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error:"));
}
