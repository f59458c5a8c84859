use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "grindsim-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_fighting_console_report_writes_output() {
    let exe = env!("CARGO_BIN_EXE_grindsim");
    let output_path = temp_path("fighting");
    let status = Command::new(exe)
        .args(["fighting", "--trials", "40", "--seed", "7", "--quiet", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Mean time: "));
    assert!(content.contains("Max killed: "));
    assert!(content.contains("Trials: "));
}

#[test]
fn cli_thieving_json_report_is_parseable() {
    let exe = env!("CARGO_BIN_EXE_grindsim");
    let output = Command::new(exe)
        .args([
            "theft",
            "--trials",
            "30",
            "--seed",
            "11",
            "--workers",
            "2",
            "--tail-count",
            "3",
            "--report",
            "json",
            "--quiet",
        ])
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is json");
    assert_eq!(report["family"], "thieving");
    assert_eq!(report["outcome"]["completed"], 30);
    assert_eq!(report["summary"]["tail_window"], 3);
}

#[test]
fn cli_seeded_runs_are_reproducible() {
    let exe = env!("CARGO_BIN_EXE_grindsim");
    let run = |workers: &str| {
        let output = Command::new(exe)
            .args([
                "fighting",
                "--trials",
                "25",
                "--seed",
                "2024",
                "--workers",
                workers,
                "--report",
                "json",
                "--quiet",
            ])
            .output()
            .expect("run cli");
        assert!(output.status.success());
        let report: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("stdout is json");
        report["summary"].clone()
    };
    assert_eq!(run("1"), run("3"));
}

#[test]
fn cli_saves_and_reloads_parameter_sheet() {
    let exe = env!("CARGO_BIN_EXE_grindsim");
    let sheet_path = temp_path("sheet.json");
    let status = Command::new(exe)
        .args([
            "thieving",
            "--trials",
            "5",
            "--quiet",
            "--set",
            "Max Gold=2000",
            "--report",
            "markdown",
            "--save-params",
        ])
        .arg(&sheet_path)
        .output()
        .expect("run cli")
        .status;
    assert!(status.success());

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&sheet_path).expect("sheet written"))
            .expect("sheet is json");
    assert_eq!(saved["Max Gold"], "2000");
    assert_eq!(saved["Steal Interval"], "2.6");

    let output = Command::new(exe)
        .args(["thieving", "--trials", "5", "--quiet", "--report", "markdown", "--params"])
        .arg(&sheet_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("# Thieving Simulation Results"));
    assert!(stdout.contains("| Mean money earned |"));
    assert!(stdout.contains("| Median time |"));
    let _ = std::fs::remove_file(sheet_path);
}

#[test]
fn cli_rejects_invalid_parameters() {
    let exe = env!("CARGO_BIN_EXE_grindsim");
    let output = Command::new(exe)
        .args(["fighting", "--quiet", "--set", "Player Damage Min=500"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("player_damage"));

    let output = Command::new(exe)
        .args(["fighting", "--quiet", "--set", "Steal Interval=2.6"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown fighting parameter"));
}
