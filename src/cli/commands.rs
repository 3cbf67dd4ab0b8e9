//! Command implementations

use anyhow::{Context, Result};
use tracing::info;

use crate::app::container::AppContainer;
use crate::app::simulate_interactor::{Script, SimulationRequest};
use crate::cli::args::{ResolveArgs, SimulateArgs};
use crate::domain::model::TimeSpec;

fn parse_time(value: &str, what: &str) -> Result<f64> {
    TimeSpec::parse(value)
        .map(|t| t.as_seconds())
        .map_err(|e| anyhow::anyhow!("Invalid {} '{}': {}", what, value, e))
}

/// Execute the resolve command
pub async fn resolve(container: &dyn AppContainer, args: ResolveArgs) -> Result<()> {
    info!(asset = %args.asset_id, "Starting resolve operation");

    let response = container
        .resolve_interactor()
        .execute(&args.asset_id)
        .await
        .with_context(|| format!("Failed to resolve duration of '{}'", args.asset_id))?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Execute the simulate command
pub async fn simulate(container: &dyn AppContainer, args: SimulateArgs) -> Result<()> {
    let duration = parse_time(&args.duration, "duration")?;
    let saved_start = args
        .saved_start
        .as_deref()
        .map(|v| parse_time(v, "saved start"))
        .transpose()?;
    let saved_end = args
        .saved_end
        .as_deref()
        .map(|v| parse_time(v, "saved end"))
        .transpose()?;

    let content = std::fs::read_to_string(&args.script)
        .with_context(|| format!("Failed to read script {}", args.script.display()))?;
    let script = Script::from_json(&content)
        .with_context(|| format!("Failed to parse script {}", args.script.display()))?;

    info!(duration, steps = script.steps.len(), "Starting simulate operation");

    let request = SimulationRequest {
        duration,
        managed: args.managed,
        saved_start,
        saved_end,
        mode: args.mode.into(),
        script,
    };
    let report = container
        .simulate_interactor()
        .execute(request)
        .await
        .context("Simulation failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

/// Execute the config command
pub fn config(container: &dyn AppContainer) -> Result<()> {
    let rendered = container
        .config()
        .to_toml_string()
        .context("Failed to render configuration")?;
    print!("{}", rendered);
    Ok(())
}
