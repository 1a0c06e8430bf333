use crate::cli::RunArgs;
use crate::config::Config;
use crate::github::{self, FileSelector, GitHubClient, PrRef};
use crate::llm::GeminiCli;
use crate::report::write_run_files;
use crate::runner::{Collaborators, Orchestrator, RunStatus, StageId};
use crate::tools::{BanditScanner, PytestRunner, RuffAnalyzer};
use anyhow::{anyhow, bail};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub async fn execute(args: RunArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    // Apply CLI overrides
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(report_dir) = args.report_dir {
        config.report_dir = report_dir;
    }
    if let Some(run_timeout) = args.run_timeout {
        config.run_timeout_sec = Some(run_timeout);
    }
    config.validate()?;

    // CLI positional (or $PR_URL via clap) wins over the config default
    let raw = args
        .pr
        .or_else(|| config.default_pr.clone())
        .ok_or_else(|| {
            anyhow!("no pull request given: pass a PR URL, set PR_URL, or set default_pr in the config")
        })?;
    let pr = PrRef::parse(&raw)?;

    if args.dry_run {
        print_execution_plan(&config, &pr);
        return Ok(());
    }

    let token = github::token_from_env()?;
    let selector = FileSelector::new(&config.files)?;
    let collaborators = Collaborators {
        host: Arc::new(GitHubClient::new(
            config.github.api_url.clone(),
            token,
            selector,
        )),
        llm: Arc::new(GeminiCli::new(&config.llm)),
        lint: Arc::new(RuffAnalyzer::new(&config.tools.ruff)),
        security: Arc::new(BanditScanner::new(&config.tools.bandit)),
        tests: Arc::new(PytestRunner::new(&config.tools.pytest)),
    };

    info!("Reviewing {}", pr);
    let orchestrator = Orchestrator::new(config.clone(), collaborators)?;
    let outcome = orchestrator.run(pr).await?;

    // Local copies survive a failed publish
    let local_dir = match write_run_files(&config.report_dir, &outcome) {
        Ok(dir) => {
            info!("Wrote local report files to {:?}", dir);
            Some(dir)
        }
        Err(e) => {
            warn!("Failed to write local report files: {}", e);
            None
        }
    };

    match outcome.status {
        RunStatus::Completed => {
            info!(
                "Completed in {:.1}s; report posted to {}",
                outcome.total_duration.as_secs_f64(),
                outcome.pr
            );
            Ok(())
        }
        RunStatus::PublishFailed { error } => {
            match local_dir {
                Some(dir) => bail!(
                    "report computed but publishing failed: {} (local copy in {:?})",
                    error,
                    dir
                ),
                None => bail!("report computed but publishing failed: {}", error),
            }
        }
        RunStatus::Aborted { error } => bail!("run aborted: {}", error),
    }
}

/// Explicit --config must exist; the default autorev.yaml is optional
/// and built-in defaults apply when it is absent.
fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None => {
            let default = Path::new("autorev.yaml");
            if default.exists() {
                info!("Loading config from {:?}", default);
                Ok(Config::load(default)?)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn print_execution_plan(config: &Config, pr: &PrRef) {
    println!("\n=== Execution Plan ===\n");
    println!("PR: {}", pr);
    println!("Concurrency: {}", config.concurrency);
    println!("Report dir: {:?}", config.report_dir);
    println!(
        "Timeouts: {}s per attempt, {}s per stage",
        config.timeout_sec, config.stage_budget_sec
    );
    if let Some(run_timeout) = config.run_timeout_sec {
        println!("Run deadline: {}s", run_timeout);
    }
    println!("Files: include {:?} exclude {:?}", config.files.include, config.files.exclude);
    println!(
        "Tools: ruff={:?} bandit={:?} pytest={:?} llm={:?} ({})",
        config.tools.ruff.binary,
        config.tools.bandit.binary,
        config.tools.pytest.binary,
        config.llm.binary,
        config.llm.model
    );

    println!("\nStages:");
    for stage in StageId::ALL {
        let deps: Vec<String> = stage
            .dependencies()
            .iter()
            .map(|d| d.to_string())
            .collect();
        if deps.is_empty() {
            println!("  - {}", stage);
        } else {
            println!("  - {} (after: {})", stage, deps.join(", "));
        }
    }
    println!();
}
