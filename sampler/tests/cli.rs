//! CLI tests: spawn the sampler binary and check exit codes and output.

#![cfg(unix)]

use std::fs;
use std::process::Command;

use sampler::exit_codes;
use sampler::io::record_store::load_record;
use sampler::test_support::{TestRoot, fake_gem5, fake_simulator};

fn sampler_cmd(root: &TestRoot) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_sampler"));
    cmd.current_dir(root.path()).env("RUST_LOG", "off");
    cmd
}

fn write_config(root: &TestRoot, exe: &str, args: &[String]) {
    let args = args
        .iter()
        .map(|arg| format!("{arg:?}"))
        .collect::<Vec<_>>()
        .join(", ");
    let config = format!(
        "[batch]\nexecutable = {exe:?}\nargs = [{args}]\noutput_root = \"out\"\nconcurrency = 2\n\n[extract]\nmetrics = [\"simInsts\"]\n"
    );
    fs::write(root.path().join("sampler.toml"), config).expect("config");
}

#[test]
fn run_then_extract_to_csv() {
    let root = TestRoot::new().expect("root");
    let (exe, args) = fake_gem5();
    write_config(&root, &exe.to_string_lossy(), &args);

    let output = sampler_cmd(&root)
        .args(["run", "--samples", "3", "--report", "report.json"])
        .output()
        .expect("sampler run");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("succeeded=3 failed=0 cancelled=0"));

    let report: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(root.path().join("report.json")).expect("report"),
    )
    .expect("report json");
    assert_eq!(report["trials"].as_array().map(Vec::len), Some(3));

    let output = sampler_cmd(&root)
        .args(["extract", "--scale", "0.001", "--csv", "kilo.csv"])
        .output()
        .expect("sampler extract");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "0\t1\n1\t2\n2\t3\n"
    );
    assert_eq!(
        load_record(&root.path().join("kilo.csv")).expect("csv"),
        vec![1.0, 2.0, 3.0]
    );

    let output = sampler_cmd(&root)
        .args(["show", "kilo.csv"])
        .output()
        .expect("sampler show");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "1\n2\n3\n");

    let output = sampler_cmd(&root)
        .args(["next-index"])
        .output()
        .expect("sampler next-index");
    assert_eq!(String::from_utf8_lossy(&output.stdout), "3\n");
}

#[test]
fn failed_trials_exit_with_trials_failed() {
    let root = TestRoot::new().expect("root");
    let (exe, args) = fake_simulator("exit 4");
    write_config(&root, &exe.to_string_lossy(), &args);

    let status = sampler_cmd(&root)
        .args(["run", "--samples", "2"])
        .status()
        .expect("sampler run");
    assert_eq!(status.code(), Some(exit_codes::TRIALS_FAILED));
}

#[test]
fn multi_metric_without_reducer_is_invalid() {
    let root = TestRoot::new().expect("root");
    root.write_stats("run_0", "a 1\nb 2\n").expect("stats");

    let output = sampler_cmd(&root)
        .args(["extract", ".", "-m", "a", "-m", "b"])
        .output()
        .expect("sampler extract");
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("reducer is required"));
}

#[test]
fn missing_metric_names_file() {
    let root = TestRoot::new().expect("root");
    root.write_stats("run_0", "a 1\n").expect("stats");

    let output = sampler_cmd(&root)
        .args(["extract", ".", "-m", "simInsts"])
        .output()
        .expect("sampler extract");
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("metric `simInsts` not found"));
    assert!(stderr.contains("run_0"));
}

#[test]
fn init_writes_loadable_defaults() {
    let root = TestRoot::new().expect("root");

    let status = sampler_cmd(&root).arg("init").status().expect("sampler init");
    assert_eq!(status.code(), Some(exit_codes::OK));
    let written = fs::read_to_string(root.path().join("sampler.toml")).expect("config");
    assert!(written.contains("outdir_flag = \"--outdir\""));
    assert!(written.contains("result_filename = \"stats.txt\""));

    let status = sampler_cmd(&root).arg("init").status().expect("sampler init");
    assert_eq!(status.code(), Some(exit_codes::INVALID));

    let status = sampler_cmd(&root)
        .args(["init", "--force"])
        .status()
        .expect("sampler init --force");
    assert_eq!(status.code(), Some(exit_codes::OK));
}
