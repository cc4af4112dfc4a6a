use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn idchain() -> Command {
    Command::new(env!("CARGO_BIN_EXE_idchain"))
}

#[test]
fn test_compute_prints_intersection() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    fs::write(&a, "id\n10\n20\n30\n20\n").unwrap();
    fs::write(&b, "id\n20\n30\n40\n").unwrap();

    let output = idchain()
        .args(["compute", "--op", "intersection", "--skip", "1"])
        .arg(&a)
        .arg(&b)
        .output()
        .expect("Failed to execute idchain binary");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "idchain failed. stderr: {}", stderr);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), vec!["20", "30"]);
    assert!(stderr.contains("passes=2"), "summary line missing: {}", stderr);
}

#[test]
fn test_job_writes_output_file_and_report() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.txt");
    fs::write(&a, "1\n2\n3\n").unwrap();
    let job = dir.path().join("job.json");
    fs::write(
        &job,
        serde_json::json!({"operator": "union", "sources": [{"path": a}], "sample": 2}).to_string(),
    )
    .unwrap();
    let out = dir.path().join("out.txt");

    let output = idchain()
        .arg("job")
        .arg(&job)
        .arg("--output")
        .arg(&out)
        .arg("--report")
        .output()
        .expect("Failed to execute idchain binary");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "idchain failed. stderr: {}", stderr);
    let written = fs::read_to_string(&out).unwrap();
    assert_eq!(written.lines().count(), 2, "sample of two expected");
    assert!(stderr.contains("\"read\": 3"), "report missing: {}", stderr);
}

#[test]
fn test_parse_failure_exits_non_zero() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.txt");
    fs::write(&a, "1\nnope\n").unwrap();

    let output = idchain()
        .arg("compute")
        .arg(&a)
        .output()
        .expect("Failed to execute idchain binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("parse stage failed"), "unexpected stderr: {}", stderr);
}
