use anyhow::Result;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::resolve_scenario;
use crate::performance::PerformanceTestRunner;
use crate::report::ReportGenerator;
use crate::utils::parse_duration;

pub struct RunOptions {
    pub host: String,
    pub users: u32,
    pub spawn_rate: f64,
    pub run_time: Option<String>,
    pub scenario: Option<PathBuf>,
    pub report_interval: String,
    pub timeout: String,
    pub report: Option<String>,
    pub out: PathBuf,
}

pub async fn handle_run(options: RunOptions) -> Result<()> {
    let run_time = options.run_time.as_deref().map(parse_duration).transpose()?;
    let report_interval = parse_duration(&options.report_interval)?;
    let request_timeout = parse_duration(&options.timeout)?;

    let scenario = Arc::new(resolve_scenario(options.scenario.as_deref()).await?);

    let runner = PerformanceTestRunner::new(
        options.users,
        options.spawn_rate,
        run_time,
        report_interval,
        request_timeout,
    )?;

    let results = runner.run(scenario, &options.host).await?;

    if let Some(formats) = options.report.as_deref() {
        let paths = ReportGenerator::generate_reports(&results, formats, &options.out)?;
        for path in paths {
            println!("{} Report written to {}", "✔".green(), path.display());
        }
    }

    println!();
    if results.is_clean() {
        println!(
            "{} {} requests, no failures",
            "✔".green().bold(),
            results.total_requests
        );
        Ok(())
    } else {
        anyhow::bail!(
            "Load test finished with {} failed requests and {} task errors",
            results.failed_requests,
            results.total_task_errors
        );
    }
}
