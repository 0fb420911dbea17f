use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// Test context running the binary inside an isolated project directory.
struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn write(&self, name: &str, content: &str) {
        let path = self.temp_dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(path, content).expect("failed to write file");
    }

    fn read(&self, name: &str) -> String {
        fs::read_to_string(self.temp_dir.path().join(name)).expect("failed to read file")
    }

    fn exists(&self, name: &str) -> bool {
        self.temp_dir.path().join(name).exists()
    }

    fn rulegen(&self) -> Command {
        let bin_path = env!("CARGO_BIN_EXE_rulegen");
        let mut cmd = Command::new(bin_path);
        cmd.current_dir(self.temp_dir.path());
        cmd
    }
}

const SIMPLE_RULES: &str = r#"
[vars]
CC = "cc"

[[copy]]
out = "out/a.txt"
from = "a.txt"

[[rule]]
out = "all"
in = "out/a.txt"
phony = true
"#;

#[test]
fn test_help() {
    let ctx = TestContext::new();
    let output = ctx
        .rulegen()
        .arg("--help")
        .output()
        .expect("failed to run rulegen");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("makefile"));
}

#[test]
fn test_version() {
    let ctx = TestContext::new();
    let output = ctx
        .rulegen()
        .arg("--version")
        .output()
        .expect("failed to run rulegen");
    assert!(output.status.success());
}

#[test]
fn test_default_subcommand_writes_makefile() {
    let ctx = TestContext::new();
    ctx.write("Rules.toml", SIMPLE_RULES);
    ctx.write("a.txt", "payload\n");

    let output = ctx.rulegen().output().expect("failed to run rulegen");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let makefile = ctx.read("Makefile");
    assert!(makefile.contains("out/a.txt : a.txt"));
    assert!(makefile.contains("\t@cp a.txt out/a.txt"));
    // The copy depends on its directory mark, which mkdirs out/.
    assert!(makefile.contains("out/.mark :"));
    assert!(makefile.contains("-@mkdir -p out"));
    // Housekeeping rules are all present.
    assert!(makefile.contains(".PHONY : "));
    assert!(makefile.contains("clean :"));
    assert!(makefile.contains("Makefile : "));
    assert!(makefile.contains("--infile=Rules.toml"));
    // Hash markers track the copy rule.
    assert!(makefile.contains(".hash/"));
    // The staging file is gone after the atomic rename.
    assert!(!ctx.exists("Makefile.new"));
}

#[test]
fn test_rerun_is_byte_identical() {
    let ctx = TestContext::new();
    ctx.write("Rules.toml", SIMPLE_RULES);
    ctx.write("a.txt", "payload\n");

    assert!(ctx.rulegen().output().unwrap().status.success());
    let first = ctx.read("Makefile");
    assert!(ctx.rulegen().output().unwrap().status.success());
    let second = ctx.read("Makefile");
    assert_eq!(first, second);
}

#[test]
fn test_user_variables_reach_commands_and_regen_rule() {
    let ctx = TestContext::new();
    ctx.write(
        "Rules.toml",
        "[vars]\nCC = \"cc\"\n\n[[rule]]\nout = \"x\"\nrun = \"$(CC) -o x x.c\"\n",
    );
    ctx.write("x.c", "int main(void) { return 0; }\n");

    let output = ctx
        .rulegen()
        .args(["CC=clang", "--with-ssl", "makefile"])
        .output()
        .expect("failed to run rulegen");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let makefile = ctx.read("Makefile");
    // The override wins over the script default.
    assert!(makefile.contains("\tclang -o x x.c"));
    // And is re-embedded into the self-rebuild command with the toggle.
    assert!(makefile.contains("CC=clang"));
    assert!(makefile.contains("WITH_SSL=1"));
}

#[test]
fn test_ninjafile_subcommand() {
    let ctx = TestContext::new();
    ctx.write("Rules.toml", SIMPLE_RULES);
    ctx.write("a.txt", "payload\n");

    let output = ctx
        .rulegen()
        .arg("ninjafile")
        .output()
        .expect("failed to run rulegen");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let ninja = ctx.read("build.ninja");
    assert!(ninja.starts_with("# Generated by rulegen"));
    assert!(ninja.contains("rule generic\n  command = $command"));
    assert!(ninja.contains("build out/a.txt: generic"));
    assert!(ninja.contains("build all: phony out/a.txt"));
    assert!(ninja.trim_end().ends_with("default all"));
}

#[test]
fn test_scriptfile_subcommand() {
    let ctx = TestContext::new();
    ctx.write("Rules.toml", SIMPLE_RULES);
    ctx.write("a.txt", "payload\n");

    let output = ctx
        .rulegen()
        .args(["scriptfile", "all"])
        .output()
        .expect("failed to run rulegen");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let script = ctx.read("build.sh");
    assert!(script.starts_with("#!/bin/sh\n"));
    let mkdir = script.find("mkdir -p out").expect("mkdir line");
    let copy = script.find("cp a.txt out/a.txt").expect("copy line");
    assert!(mkdir < copy, "directory must be created before the copy");
}

#[test]
fn test_scriptfile_requires_targets() {
    let ctx = TestContext::new();
    ctx.write("Rules.toml", SIMPLE_RULES);
    let output = ctx
        .rulegen()
        .arg("scriptfile")
        .output()
        .expect("failed to run rulegen");
    assert!(!output.status.success());
}

#[test]
fn test_unknown_flag_is_fatal() {
    let ctx = TestContext::new();
    ctx.write("Rules.toml", SIMPLE_RULES);
    let output = ctx
        .rulegen()
        .arg("--frobnicate")
        .output()
        .expect("failed to run rulegen");
    assert!(!output.status.success());
}

#[test]
fn test_missing_rules_file_is_fatal() {
    let ctx = TestContext::new();
    let output = ctx.rulegen().output().expect("failed to run rulegen");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Rules.toml"));
    assert!(!ctx.exists("Makefile"));
}

#[test]
fn test_show_vars_annotations() {
    let ctx = TestContext::new();
    ctx.write("Rules.toml", "[vars]\nCC = \"cc\"\n");

    let output = ctx
        .rulegen()
        .args(["CC=clang", "show-vars"])
        .output()
        .expect("failed to run rulegen");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("CC = clang  # user-set"));
    assert!(stdout.contains("OUT = .  # directory"));
    assert!(stdout.contains("IN = .  # directory"));
}

#[test]
fn test_subdirectories_and_out_root() {
    let ctx = TestContext::new();
    ctx.write(
        "Rules.toml",
        "[[rule]]\nout = \"all\"\nphony = true\n\nsubdirs = [\"lib\"]\n",
    );
    ctx.write(
        "lib/Rules.toml",
        "[[rule]]\nout = \"$(OUT)/lib.a\"\nin = \"$(IN)/lib.c\"\nrun = \"ar rc $@ $<\"\n\n[[rule]]\nout = \"all\"\nin = \"$(OUT)/lib.a\"\nphony = true\n",
    );
    ctx.write("lib/lib.c", "int x;\n");

    let output = ctx
        .rulegen()
        .args(["--out=build", "makefile"])
        .output()
        .expect("failed to run rulegen");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    assert!(ctx.exists("build/Makefile"));
    let makefile = ctx.read("build/Makefile");
    // The subdirectory rule landed under the rebased OUT and extended `all`.
    assert!(makefile.contains("build/lib/lib.a"));
    assert!(makefile.contains("all : build/lib/lib.a"));
}

#[test]
fn test_missing_input_warns_on_stderr() {
    let ctx = TestContext::new();
    ctx.write(
        "Rules.toml",
        "[[rule]]\nout = \"x\"\nin = \"nonexistent.c\"\nrun = \"cc -o x nonexistent.c\"\n",
    );
    let output = ctx.rulegen().output().expect("failed to run rulegen");
    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nonexistent.c"));
}

#[test]
fn test_command_change_moves_the_hash_marker() {
    let ctx = TestContext::new();
    ctx.write(
        "Rules.toml",
        "[[rule]]\nout = \"o\"\nin = \"i\"\nrun = \"gen --mode=A < i > o\"\n",
    );
    ctx.write("i", "");

    assert!(ctx.rulegen().output().unwrap().status.success());
    let first = marker_tokens(&ctx.read("Makefile"));
    assert!(!first.is_empty());

    ctx.write(
        "Rules.toml",
        "[[rule]]\nout = \"o\"\nin = \"i\"\nrun = \"gen --mode=B < i > o\"\n",
    );
    assert!(ctx.rulegen().output().unwrap().status.success());
    let second = marker_tokens(&ctx.read("Makefile"));

    assert_ne!(first, second, "marker paths must follow the command text");
}

fn marker_tokens(makefile: &str) -> Vec<String> {
    let mut tokens: Vec<String> = makefile
        .split_whitespace()
        .filter(|token| token.contains(".hash/") && !token.ends_with('*'))
        .map(ToString::to_string)
        .collect();
    tokens.sort_unstable();
    tokens.dedup();
    tokens
}
