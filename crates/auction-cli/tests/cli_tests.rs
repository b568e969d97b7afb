//! Integration tests for the auction CLI
//!
//! These tests invoke the actual auction-cli binary and verify:
//! - Exit codes (0 = all steps matched, 1 = mismatch, 2 = error)
//! - stdout/stderr output
//! - JSON report format

use std::path::PathBuf;
use std::process::Command;

// ── Helpers ───────────────────────────────────────────────

fn cli_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_auction-cli"))
}

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join(format!("../../tests/fixtures/scenarios/{}", name))
}

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(cli_bin())
        .args(args)
        .env_remove("RUST_LOG")
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .output()
        .expect("failed to execute auction-cli")
}

fn report_json(args: &[&str]) -> (std::process::Output, serde_json::Value) {
    let output = run_cli(args);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let json = serde_json::from_str(&stdout).expect("should be valid JSON");
    (output, json)
}

// ── Version ───────────────────────────────────────────────

#[test]
fn test_version_command() {
    let output = run_cli(&["version"]);
    assert!(output.status.success(), "version should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("auction-cli"));
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_version_flag() {
    let output = run_cli(&["--version"]);
    assert!(output.status.success(), "--version should exit 0");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(env!("CARGO_PKG_VERSION")));
}

// ── Run ───────────────────────────────────────────────────

#[test]
fn test_run_cancel_and_refund() {
    let output = run_cli(&["run", fixture("cancel-and-refund.json").to_str().unwrap()]);
    assert!(output.status.success(), "all expectations should hold");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Cancelled"));
    assert!(stdout.contains("LogWithdrawal"));
    assert!(stdout.contains("all as expected"));
}

#[test]
fn test_run_json_cancel_and_refund() {
    let (output, json) = report_json(&[
        "run",
        "--json",
        fixture("cancel-and-refund.json").to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert_eq!(json["success"], true);
    assert_eq!(json["finalState"]["state"], "Cancelled");

    let steps = json["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 9);

    let bid = &steps[3]["events"][0];
    assert_eq!(bid["event"], "LogBid");
    assert_eq!(bid["bidder"], "0x0000000000000000000000000000000000000002");
    assert_eq!(bid["highestBidder"], bid["bidder"]);
    assert_eq!(bid["highestBid"], 1);
    assert_eq!(bid["highestBindingBid"], 1);

    assert_eq!(steps[4]["errorKind"], "ZeroAmount");
    assert_eq!(steps[4]["error"], "Auction: Amount == 0");
    assert_eq!(steps[6]["error"], "incorrect auction state");

    let withdrawal = &steps[8]["events"][0];
    assert_eq!(withdrawal["event"], "LogWithdrawal");
    assert_eq!(withdrawal["withdrawer"], withdrawal["withdrawalAccount"]);
    assert_eq!(withdrawal["amount"], 1);
}

#[test]
fn test_run_finalized_auction_payouts() {
    let (output, json) = report_json(&[
        "run",
        "--json",
        fixture("finalized-auction.json").to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert_eq!(json["finalState"]["state"], "Finalized");
    assert_eq!(json["finalState"]["highestBindingBid"], 50);

    let finalize = &json["steps"][5]["events"][0];
    assert_eq!(finalize["event"], "LogFinalized");
    assert_eq!(finalize["winner"], "0x0000000000000000000000000000000000000002");
    assert_eq!(finalize["price"], 50);

    let owner_payout = &json["steps"][6];
    assert_eq!(owner_payout["value"], 50);
    assert_eq!(
        owner_payout["events"][0]["withdrawalAccount"],
        "0x0000000000000000000000000000000000000002"
    );
    assert_eq!(json["steps"][7]["value"], 50);
    assert_eq!(json["steps"][8]["value"], 50);
}

#[test]
fn test_run_mismatch_exits_1() {
    let output = run_cli(&["run", fixture("mismatched-expectation.json").to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1), "mismatch should exit 1");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("MISMATCH"));
}

#[test]
fn test_run_malformed_scenario_exits_2() {
    let output = run_cli(&["run", fixture("malformed.json").to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error"), "should mention error");
}

#[test]
fn test_run_nonexistent_file() {
    let output = run_cli(&["run", "nonexistent.json"]);
    assert_eq!(output.status.code(), Some(2), "missing file should exit 2");
}

#[test]
fn test_run_quiet_produces_no_stdout() {
    let output = run_cli(&[
        "--quiet",
        "run",
        fixture("cancel-and-refund.json").to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert!(output.stdout.is_empty(), "quiet mode should produce no stdout");
    assert!(output.stderr.is_empty(), "quiet mode should silence logging");
}

#[test]
fn test_rejections_logged_by_default() {
    let (output, json) = report_json(&[
        "run",
        "--json",
        fixture("cancel-and-refund.json").to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert_eq!(json["success"], true);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("auction call rejected"));
    assert!(!stderr.contains("auction call committed"));
}

#[test]
fn test_verbose_logs_to_stderr_only() {
    let (output, json) = report_json(&[
        "-v",
        "run",
        "--json",
        fixture("cancel-and-refund.json").to_str().unwrap(),
    ]);
    assert!(output.status.success());
    assert_eq!(json["success"], true);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("auction call committed"));
}

// ── Digest ────────────────────────────────────────────────

#[test]
fn test_digest_is_sha256_hex() {
    let output = run_cli(&["digest", fixture("cancel-and-refund.json").to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    assert_eq!(stdout.len(), 64, "SHA-256 digest should be 64 hex chars");
    assert!(stdout.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_digest_determinism() {
    let path = fixture("finalized-auction.json");
    let path = path.to_str().unwrap();
    let first = run_cli(&["digest", path]);
    let first = String::from_utf8_lossy(&first.stdout).trim().to_string();
    for _ in 0..10 {
        let output = run_cli(&["digest", path]);
        assert_eq!(first, String::from_utf8_lossy(&output.stdout).trim());
    }
}

#[test]
fn test_digest_differs_between_scenarios() {
    let a = run_cli(&["digest", fixture("cancel-and-refund.json").to_str().unwrap()]);
    let b = run_cli(&["digest", fixture("finalized-auction.json").to_str().unwrap()]);
    assert_ne!(a.stdout, b.stdout);
}

// ── Init ──────────────────────────────────────────────────

#[test]
fn test_init_template_runs_clean() {
    let temp = std::env::temp_dir().join("auction_cli_init_template.json");
    let output = run_cli(&["init", "--output", temp.to_str().unwrap()]);
    assert!(output.status.success());

    let (run, json) = report_json(&["run", "--json", temp.to_str().unwrap()]);
    assert!(run.status.success(), "template scenario should pass");
    assert_eq!(json["finalState"]["state"], "Finalized");
    let _ = std::fs::remove_file(&temp);
}

#[test]
fn test_init_prints_to_stdout() {
    let output = run_cli(&["init"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json: serde_json::Value = serde_json::from_str(&stdout).expect("should be valid JSON");
    assert_eq!(json["steps"][0]["call"]["op"], "startAuction");
}
