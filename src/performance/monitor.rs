use crate::performance::metrics::AGGREGATED;
use crate::performance::spawn::SpawnSchedule;
use crate::performance::{PerformanceMetrics, PerformanceResults};
use owo_colors::OwoColorize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub struct PerformanceMonitor {
    start_time: Instant,
    report_interval: Duration,
    last_report: Instant,
    last_total: u64,
}

impl PerformanceMonitor {
    pub fn new(report_interval: Duration) -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            report_interval,
            last_report: now,
            last_total: 0,
        }
    }

    /// Requests per second since the previous call.
    fn current_rps(&mut self, total_requests: u64, now: Instant) -> f64 {
        let window = now.saturating_duration_since(self.last_report).as_secs_f64();
        let delta = total_requests.saturating_sub(self.last_total);
        self.last_report = now;
        self.last_total = total_requests;
        if window > 0.0 {
            delta as f64 / window
        } else {
            0.0
        }
    }

    /// Print a progress report
    pub fn print_progress_report(
        &mut self,
        metrics: &PerformanceMetrics,
        run_time: Option<Duration>,
        schedule: &SpawnSchedule,
    ) {
        let elapsed = self.start_time.elapsed();
        let results = metrics.calculate_results();
        let current_rps = self.current_rps(results.total_requests, Instant::now());

        println!();
        println!("{} Load Test Progress", "📊".bright_white());

        match run_time {
            Some(target) if target > Duration::ZERO => {
                let progress_percent =
                    (elapsed.as_secs_f64() / target.as_secs_f64() * 100.0).min(100.0);
                let bar_width = 20;
                let filled = ((progress_percent / 100.0) * bar_width as f64) as usize;
                let empty = bar_width - filled;
                let progress_bar = format!(
                    "[{}{}]",
                    "=".repeat(filled).green(),
                    "-".repeat(empty).dimmed()
                );
                println!(
                    "  {} {:.1}% ({:?} / {:?})",
                    progress_bar, progress_percent, elapsed, target
                );
            }
            _ => println!("  Elapsed: {:?} (until stopped)", elapsed),
        }

        println!(
            "  Users: {}",
            schedule.current_phase_description().bright_white()
        );

        if results.total_requests > 0 {
            println!(
                "  Current RPS: {}",
                format!("{:.1}", current_rps).bright_white()
            );
            println!(
                "  Total Requests: {}",
                results.total_requests.to_string().bright_white()
            );
            println!(
                "  P95 Response Time: {}ms",
                results.p95_response_time.as_millis().to_string().bright_white()
            );
            if results.failed_requests > 0 {
                println!(
                    "  {} Failures: {}",
                    "⚠".yellow(),
                    results.failed_requests.to_string().bright_white()
                );
            }
        }

        if results.total_task_errors > 0 {
            println!(
                "  {} Task errors: {}",
                "⚠".yellow(),
                results.total_task_errors.to_string().bright_white()
            );
        }
    }

    /// Print the final summary when the run completes
    pub fn print_final_summary(&self, results: &PerformanceResults) {
        println!();
        println!("{}", "=".repeat(96).dimmed());
        println!("{} Final Load Test Results", "🎯".bright_white());
        println!("{}", "=".repeat(96).dimmed());
        println!();

        println!(
            "{:<6} {:<28} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8}",
            "Type", "Name", "# reqs", "# fails", "Avg", "Min", "Max", "p95", "req/s"
        );
        println!("{}", "-".repeat(96).dimmed());
        for entry in &results.entries {
            println!(
                "{:<6} {:<28} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8.2}",
                entry.method,
                entry.name,
                entry.num_requests,
                entry.num_failures,
                entry.average_response_time.as_millis(),
                entry.min_response_time.as_millis(),
                entry.max_response_time.as_millis(),
                entry.p95_response_time.as_millis(),
                entry.requests_per_second,
            );
        }
        println!("{}", "-".repeat(96).dimmed());
        println!(
            "{:<6} {:<28} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8} {:>8.2}",
            "",
            AGGREGATED,
            results.total_requests,
            results.failed_requests,
            results.average_response_time.as_millis(),
            results.min_response_time.as_millis(),
            results.max_response_time.as_millis(),
            results.p95_response_time.as_millis(),
            results.requests_per_second,
        );

        let failures: Vec<_> = results
            .entries
            .iter()
            .flat_map(|e| e.failures.iter().map(move |(msg, n)| (e, msg, n)))
            .collect();
        if !failures.is_empty() {
            println!();
            println!("{} Failures:", "❌".red());
            for (entry, message, count) in failures {
                println!(
                    "  {:>6}  {} {}: {}",
                    count.to_string().red(),
                    entry.method,
                    entry.name,
                    message
                );
            }
        }

        if !results.task_errors.is_empty() {
            println!();
            println!("{} Errors:", "⚠".yellow());
            for error in &results.task_errors {
                println!(
                    "  {:>6}  {}: {}",
                    error.occurrences.to_string().yellow(),
                    error.task,
                    error.message
                );
            }
        }

        if !results.status_code_distribution.is_empty() {
            println!();
            println!("{} Status Code Distribution:", "🔍".bright_white());
            let mut sorted_codes: Vec<_> = results.status_code_distribution.iter().collect();
            sorted_codes.sort_by_key(|(code, _)| *code);

            for (code, count) in sorted_codes {
                let count_str = count.to_string();
                if (200..300).contains(code) {
                    println!("  {}: {}", code, count_str.green());
                } else if *code >= 400 {
                    println!("  {}: {}", code, count_str.red());
                } else {
                    println!("  {}: {}", code, count_str.yellow());
                }
            }
        }

        println!();
        println!(
            "  Total Duration: {:?} • Success Rate: {:.2}% • Upload rate: {:.2} MB/s",
            results.total_duration,
            results.success_rate * 100.0,
            results.bytes_per_second_sent / 1024.0 / 1024.0
        );
        println!("{}", "=".repeat(96).dimmed());
    }

    /// Print progress every `report_interval` until `shutdown` is cancelled.
    pub fn start_background_monitoring(
        mut self,
        metrics: Arc<Mutex<PerformanceMetrics>>,
        run_time: Option<Duration>,
        schedule: Arc<SpawnSchedule>,
        shutdown: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.report_interval);
            interval.tick().await; // first tick fires immediately

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        // Users block on this lock; summarize a copy instead.
                        let snapshot = metrics.lock().await.clone();
                        self.print_progress_report(&snapshot, run_time, &schedule);
                    }
                }
            }
        })
    }
}
