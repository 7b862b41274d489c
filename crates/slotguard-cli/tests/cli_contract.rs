use std::process::Command;

fn slotguard() -> Command {
    Command::new(env!("CARGO_BIN_EXE_slotguard"))
}

fn contract(name: &str) -> String {
    format!("{}/../../contracts/{name}", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn help_lists_commands() {
    let output = slotguard()
        .arg("--help")
        .output()
        .expect("failed to execute slotguard --help");
    assert!(output.status.success(), "--help should succeed");
    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["check", "demo", "smt"] {
        assert!(stdout.contains(command), "help should mention {command}");
    }
}

#[test]
fn missing_contract_is_an_error() {
    let output = slotguard()
        .args(["check", "/nonexistent/contract.json"])
        .output()
        .expect("failed to execute slotguard check");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("could not read"), "stderr: {stderr}");
}

#[test]
fn unknown_solver_is_an_error() {
    let output = slotguard()
        .args(["check", &contract("multisig.json"), "--solver", "yices"])
        .output()
        .expect("failed to execute slotguard check");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unknown solver"), "stderr: {stderr}");
}

#[test]
fn smt_prints_one_script_per_query() {
    let output = slotguard()
        .args(["smt", &contract("withdraw_strict.json")])
        .output()
        .expect("failed to execute slotguard smt");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches("(check-sat)").count(), 2);
    assert!(stdout.contains("; query: arithmetic/no_underflow"));
    assert!(stdout.contains("(declare-const pre.balance (_ BitVec 256))"));
}

#[cfg(feature = "z3")]
mod solving {
    use super::*;

    #[test]
    fn multisig_passes() {
        let output = slotguard()
            .args(["check", &contract("multisig.json")])
            .output()
            .expect("failed to execute slotguard check");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(output.status.code(), Some(0), "stdout: {stdout}");
        assert!(stdout.contains("4 passed, 0 failed, 0 inconclusive"));
    }

    #[test]
    fn unguarded_withdraw_fails_with_counterexample() {
        let output = slotguard()
            .args(["check", &contract("withdraw_unguarded.json")])
            .output()
            .expect("failed to execute slotguard check");
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(output.status.code(), Some(1), "stdout: {stdout}");
        assert!(stdout.contains("[FAIL] arithmetic/no_underflow: violated (expected proved)"));
        assert!(stdout.contains("counterexample:"));
        assert!(stdout.contains("pre.balance = 0"));
    }

    #[test]
    fn json_report_is_machine_readable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let output = slotguard()
            .args(["check", &contract("multisig_relaxed.json"), "--format", "json"])
            .arg("--dump-smt")
            .arg(dir.path())
            .output()
            .expect("failed to execute slotguard check");
        assert_eq!(output.status.code(), Some(1));
        let report: serde_json::Value =
            serde_json::from_slice(&output.stdout).expect("stdout is JSON");
        let outcomes: Vec<&str> = report["cases"]
            .as_array()
            .expect("cases array")
            .iter()
            .filter_map(|c| c["outcome"].as_str())
            .collect();
        assert_eq!(outcomes, vec!["pass", "pass", "fail", "fail"]);
        assert!(dir.path().join("threshold_double_approval.smt2").exists());
    }
}
