use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(prefix: &str, ext: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push("spimode-tests");
    let _ = std::fs::create_dir_all(&dir);

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    dir.join(format!("{}-{}.{}", prefix, nonce, ext))
}

fn write_temp_file(prefix: &str, contents: &str) -> PathBuf {
    let path = temp_path(prefix, "yaml");
    std::fs::write(&path, contents).expect("Failed to write temp file");
    path
}

fn run_script(script: &PathBuf, output_dir: Option<&PathBuf>) -> std::process::Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_spimode"));
    cmd.args(["test", "--script", script.to_str().unwrap()]);
    if let Some(dir) = output_dir {
        cmd.args(["--output-dir", dir.to_str().unwrap()]);
    }
    cmd.output().expect("Failed to execute command")
}

#[test]
fn test_cli_test_mode_outputs() {
    let script = write_temp_file(
        "script-outputs",
        r#"
schema_version: "1.0"
variant: a
write_data: 1
limits:
  iterations: 3
assertions:
  - receive_data: 1
  - chip_select_framing: true
  - sck_hz: 500000
"#,
    );
    let output_dir = temp_path("artifacts", "d");

    let output = run_script(&script, Some(&output_dir));
    assert!(output.status.success());

    let result_path = output_dir.join("result.json");
    assert!(result_path.exists());

    let result_content = std::fs::read_to_string(&result_path).unwrap();
    let result: serde_json::Value = serde_json::from_str(&result_content).unwrap();

    assert_eq!(result["status"], "pass");
    assert_eq!(result["variant"], "a");
    assert_eq!(result["receive_data"], 1);
    assert_eq!(result["iterations"], 3);
    assert_eq!(result["polls"], 24);
    assert!(result["exchanges_per_second"].as_f64().unwrap() > 0.0);
    assert_eq!(result["script_hash"].as_str().unwrap().len(), 64);

    let assertions = result["assertions"].as_array().unwrap();
    assert_eq!(assertions.len(), 3);
    assert!(assertions.iter().all(|a| a["passed"] == true));

    assert_eq!(result["snapshot"]["registers"]["registers"]["OSCFRQ"], 2);

    let _ = std::fs::remove_dir_all(&output_dir);
    let _ = std::fs::remove_file(&script);
}

#[test]
fn test_cli_test_mode_variant_b_rate() {
    let script = write_temp_file(
        "script-variant-b",
        r#"
schema_version: "1.0"
variant: b
limits:
  iterations: 1
assertions:
  - sck_hz: 8000000
  - receive_data: 1
"#,
    );

    let output = run_script(&script, None);
    assert!(output.status.success());
}

#[test]
fn test_cli_test_mode_mode_mismatch_fails() {
    let script = write_temp_file(
        "script-mismatch",
        r#"
schema_version: "1.0"
variant: b
write_data: 1
device:
  type: echo
  mode: 2
limits:
  iterations: 2
assertions:
  - receive_data: 1
"#,
    );
    let output_dir = temp_path("artifacts-mismatch", "d");

    let output = run_script(&script, Some(&output_dir));
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1)); // EXIT_ASSERT_FAIL

    let result: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(output_dir.join("result.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(result["status"], "fail");
    assert_eq!(result["receive_data"], 0xC0);
    assert_eq!(result["assertions"][0]["passed"], false);

    let _ = std::fs::remove_dir_all(&output_dir);
}

#[test]
fn test_cli_test_mode_matching_echo_passes() {
    let script = write_temp_file(
        "script-echo",
        r#"
schema_version: "1.0"
variant: a
write_data: 90
device:
  type: echo
  mode: 2
limits:
  iterations: 2
assertions:
  - receive_data: 90
"#,
    );

    let output = run_script(&script, None);
    assert!(output.status.success());
}

#[test]
fn test_cli_test_mode_timeout() {
    let script = write_temp_file(
        "script-timeout",
        r#"
schema_version: "1.0"
variant: a
limits:
  iterations: 1
  max_polls: 4
assertions:
  - receive_data: 1
"#,
    );
    let output_dir = temp_path("artifacts-timeout", "d");

    let output = run_script(&script, Some(&output_dir));
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(3)); // EXIT_RUNTIME_ERROR

    let result: serde_json::Value = serde_json::from_str(
        &std::fs::read_to_string(output_dir.join("result.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(result["status"], "error");
    assert!(result["error"].as_str().unwrap().contains("4 polls"));
    assert_eq!(result["iterations"], 0);

    let _ = std::fs::remove_dir_all(&output_dir);
    let _ = std::fs::remove_file(&script);
}

#[test]
fn test_cli_test_mode_bad_schema() {
    let script = write_temp_file(
        "script-bad-schema",
        r#"
schema_version: "2.0"
limits:
  iterations: 1
"#,
    );

    let output = run_script(&script, None);
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(2)); // EXIT_CONFIG_ERROR
}

#[test]
fn test_cli_test_mode_zero_iterations() {
    let script = write_temp_file(
        "script-zero",
        r#"
schema_version: "1.0"
limits:
  iterations: 0
"#,
    );

    let output = run_script(&script, None);
    assert_eq!(output.status.code(), Some(2)); // EXIT_CONFIG_ERROR
}

#[test]
fn test_cli_writes_snapshot_and_pin_trace() {
    let snapshot_path = temp_path("snapshot", "json");
    let trace_path = temp_path("pins", "json");

    let output = Command::new(env!("CARGO_BIN_EXE_spimode"))
        .args([
            "--variant",
            "b",
            "--write-data",
            "0xA5",
            "--iterations",
            "2",
            "--snapshot",
            snapshot_path.to_str().unwrap(),
            "--pin-trace",
            trace_path.to_str().unwrap(),
        ])
        .output()
        .expect("Failed to execute spimode");

    assert!(output.status.success());

    let snapshot: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&snapshot_path).unwrap()).unwrap();
    assert_eq!(snapshot["variant"], "b");
    assert_eq!(snapshot["write_data"], 0xA5);
    assert_eq!(snapshot["receive_data"], 0xA5);
    assert_eq!(snapshot["system_clock_hz"], 64_000_000);
    assert_eq!(snapshot["spi_mode"], 0);

    let events: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&trace_path).unwrap()).unwrap();
    let cs_levels: Vec<bool> = events
        .as_array()
        .unwrap()
        .iter()
        .filter(|e| e["pin"] == 6)
        .map(|e| e["high"].as_bool().unwrap())
        .collect();
    assert_eq!(cs_levels, vec![true, false, true, false, true]);

    let _ = std::fs::remove_file(&snapshot_path);
    let _ = std::fs::remove_file(&trace_path);
}

#[test]
fn test_cli_rejects_bad_write_data() {
    let output = Command::new(env!("CARGO_BIN_EXE_spimode"))
        .args(["--write-data", "0x1FF"])
        .output()
        .expect("Failed to execute spimode");

    assert!(!output.status.success());
}
