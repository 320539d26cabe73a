use std::io::Write;
use std::process::Command;

fn cli() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_datapoint_cli"));
    command.env("DATAPOINT_LOG_LEVEL", "off").env_remove("RUST_LOG");
    command
}

#[test]
fn test_cli_resolves_expression() {
    let output = cli()
        .args(["--expression", "$a.b | string.upperCase()", "--value", r#"{"a": {"b": "x"}}"#])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), r#""X""#);
}

#[test]
fn test_cli_uses_config_entities() {
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, r#"{{"entities": {{"hash:pick": {{"pickKeys": ["keep"]}}}}}}"#).unwrap();

    let output = cli()
        .args(["--config"])
        .arg(file.path())
        .args(["--expression", "hash:pick", "--value", r#"{"keep": 1, "drop": 2}"#])
        .output()
        .unwrap();

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), r#"{"keep":1}"#);
}

#[test]
fn test_cli_reports_failures() {
    let output = cli()
        .args(["--expression", "INVALID TYPE"])
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("INVALID TYPE"));
}
