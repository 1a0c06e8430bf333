use assert_cmd::Command;
use predicates::prelude::*;

fn autorev() -> Command {
    let mut cmd = Command::cargo_bin("autorev").unwrap();
    // Keep host credentials and PR fallbacks out of the tests
    cmd.env_remove("PR_URL")
        .env_remove("GITHUB_TOKEN")
        .env_remove("GH_TOKEN");
    cmd
}

#[test]
fn schema_prints_config_schema() {
    autorev()
        .arg("schema")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"concurrency\""))
        .stdout(predicate::str::contains("\"retry\""));
}

#[test]
fn run_without_any_pr_reference_fails() {
    let dir = tempfile::tempdir().unwrap();
    autorev()
        .arg("run")
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no pull request given"));
}

#[test]
fn run_rejects_malformed_pr_url() {
    let dir = tempfile::tempdir().unwrap();
    autorev()
        .args(["run", "https://github.com/octo/widgets/issues/7"])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid pull request reference"));
}

#[test]
fn dry_run_prints_plan_without_credentials() {
    let dir = tempfile::tempdir().unwrap();
    autorev()
        .args(["run", "https://github.com/octo/widgets/pull/5", "--dry-run"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Execution Plan"))
        .stdout(predicate::str::contains("octo/widgets#5"))
        .stdout(predicate::str::contains("fetch_files"))
        .stdout(predicate::str::contains("publish_report (after: assemble_report)"));
}

#[test]
fn run_without_token_asks_for_one() {
    let dir = tempfile::tempdir().unwrap();
    autorev()
        .args(["run", "https://github.com/octo/widgets/pull/5"])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_TOKEN"));
}

#[test]
fn explicit_missing_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    autorev()
        .args([
            "run",
            "https://github.com/octo/widgets/pull/5",
            "--config",
            "missing.yaml",
            "--dry-run",
        ])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.yaml"));
}
