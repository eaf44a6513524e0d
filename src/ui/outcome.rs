use crate::error::TaskResult;
use crate::scenario::UploadTask;
use crate::session::RequestOutcome;
use crate::utils::format_size;
use owo_colors::OwoColorize;
use std::time::Duration;

/// One line per executed task, used by the single-user runner.
pub fn print_task_outcome(task: &UploadTask, result: &TaskResult<RequestOutcome>, elapsed: Duration) {
    match result {
        Ok(outcome) => {
            let status = outcome.status.to_string();
            let status = if outcome.is_success() {
                status.green().to_string()
            } else {
                status.red().to_string()
            };
            let mark = if outcome.is_success() {
                "✔".green().to_string()
            } else {
                "✖".red().to_string()
            };
            println!(
                "{} {} POST {} → {} • {}ms • sent {} • received {}",
                mark,
                task.name.bright_white(),
                outcome.name,
                status,
                outcome.duration.as_millis(),
                format_size(outcome.bytes_sent),
                format_size(outcome.bytes_received),
            );
        }
        Err(e) => {
            println!(
                "{} {} failed after {}ms: {}",
                "✖".red(),
                task.name.bright_white(),
                elapsed.as_millis(),
                e.to_string().red()
            );
        }
    }
}
