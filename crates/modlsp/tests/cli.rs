use std::path::PathBuf;
use std::process::Command;

fn modlsp_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_modlsp"))
}

#[test]
fn help_lists_the_serve_subcommand() {
    let output = Command::new(modlsp_binary()).arg("--help").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"), "expected `serve` in help output:\n{stdout}");
}

#[test]
fn an_unknown_subcommand_is_a_usage_error() {
    let output = Command::new(modlsp_binary()).arg("not-a-real-command").output().unwrap();

    assert!(!output.status.success());
}
