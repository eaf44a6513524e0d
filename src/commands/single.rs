use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;

use crate::config::resolve_scenario;
use crate::performance::run_single_user;
use crate::utils::parse_duration;

pub struct SingleOptions {
    pub host: String,
    pub scenario: Option<PathBuf>,
    pub iterations: Option<u64>,
    pub timeout: String,
}

/// Smoke-tests the scenario with one user in-process.
pub async fn handle_single(options: SingleOptions) -> Result<()> {
    let request_timeout = parse_duration(&options.timeout)?;
    let scenario = resolve_scenario(options.scenario.as_deref()).await?;

    println!(
        "{} Running one user of '{}' against {}",
        "→".cyan(),
        scenario.name(),
        options.host.bright_white()
    );
    println!("Think time: {}", scenario.wait_time().describe());
    println!();

    let results = run_single_user(&scenario, &options.host, options.iterations, request_timeout).await?;

    println!();
    println!(
        "{} tasks run: {} requests ({} failed), {} task errors",
        "•".dimmed(),
        results.total_requests + results.total_task_errors,
        results.failed_requests,
        results.total_task_errors
    );

    Ok(())
}
