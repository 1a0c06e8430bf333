use crate::config::Config;
use schemars::schema_for;

/// Print the JSON Schema for `autorev.yaml`, covering the pipeline
/// knobs (concurrency, timeouts, retry), the GitHub and LLM backends,
/// the tool binaries, and the review scope globs. Meant for editor
/// validation and CI checks of config files.
pub fn execute() -> anyhow::Result<()> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
