use crate::performance::monitor::PerformanceMonitor;
use crate::performance::spawn::SpawnSchedule;
use crate::performance::{PerformanceMetrics, PerformanceResults};
use crate::scenario::Scenario;
use crate::session::UserSession;
use crate::ui::outcome::print_task_outcome;
use crate::ui::spinner::Spinner;
use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct PerformanceTestRunner {
    users: u32,
    spawn_rate: f64,
    run_time: Option<Duration>,
    report_interval: Duration,
    request_timeout: Duration,
}

impl PerformanceTestRunner {
    pub fn new(
        users: u32,
        spawn_rate: f64,
        run_time: Option<Duration>,
        report_interval: Duration,
        request_timeout: Duration,
    ) -> Result<Self> {
        if users == 0 {
            anyhow::bail!("At least one user is required");
        }
        if spawn_rate.is_nan() || spawn_rate <= 0.0 {
            anyhow::bail!("Spawn rate must be positive, got {}", spawn_rate);
        }
        if SpawnSchedule::new(users, spawn_rate)
            .try_delay_for(users - 1)
            .is_none()
        {
            anyhow::bail!(
                "Spawn rate {} is too low to start {} users",
                spawn_rate,
                users
            );
        }
        if report_interval.is_zero() {
            anyhow::bail!("Report interval must be positive");
        }

        Ok(Self {
            users,
            spawn_rate,
            run_time,
            report_interval,
            request_timeout,
        })
    }

    /// Runs the scenario against `host` until the run time elapses or Ctrl-C.
    pub async fn run(&self, scenario: Arc<Scenario>, host: &str) -> Result<PerformanceResults> {
        // Surface a bad host once instead of once per user.
        UserSession::new(0, host, self.request_timeout)
            .with_context(|| format!("Cannot target host '{}'", host))?;

        println!("🚀 Starting load test: {}", scenario.name());
        println!("   Host: {}", host);
        println!(
            "   Tasks: {}",
            scenario
                .tasks()
                .iter()
                .map(|t| t.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!("   Users: {} (spawn rate {}/s)", self.users, self.spawn_rate);
        println!("   Think time: {}", scenario.wait_time().describe());
        match self.run_time {
            Some(run_time) => println!("   Run time: {:?}", run_time),
            None => println!("   Run time: until Ctrl-C"),
        }

        let metrics = Arc::new(Mutex::new(PerformanceMetrics::new()));
        let schedule = Arc::new(SpawnSchedule::new(self.users, self.spawn_rate));
        let shutdown = CancellationToken::new();

        let monitor = PerformanceMonitor::new(self.report_interval).start_background_monitoring(
            Arc::clone(&metrics),
            self.run_time,
            Arc::clone(&schedule),
            shutdown.clone(),
        );

        println!("\n🔥 Spawning users...");
        let mut users = FuturesUnordered::new();
        for user_id in 0..self.users {
            let scenario = Arc::clone(&scenario);
            let host = host.to_string();
            let timeout = self.request_timeout;
            let metrics = Arc::clone(&metrics);
            let delay = schedule.delay_for(user_id);
            let shutdown = shutdown.clone();

            users.push(tokio::spawn(async move {
                user_task(user_id, scenario, host, timeout, delay, metrics, shutdown).await
            }));
        }

        let run_time = self.run_time;
        let deadline = async move {
            match run_time {
                Some(run_time) => sleep(run_time).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                _ = &mut deadline => {
                    println!("\n⏱️  Run time reached, stopping users...");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    println!("\n🛑 Interrupted, stopping users...");
                    break;
                }
                result = users.next() => {
                    match result {
                        Some(Ok(Ok(()))) => {}
                        Some(Ok(Err(e))) => warn!("user stopped with error: {:#}", e),
                        Some(Err(e)) => warn!("user task failed: {}", e),
                        None => break,
                    }
                }
            }
        }

        shutdown.cancel();
        while let Some(result) = users.next().await {
            if let Ok(Err(e)) = result {
                warn!("user stopped with error: {:#}", e);
            }
        }
        if let Err(e) = monitor.await {
            warn!("monitor task failed: {}", e);
        }

        let results = metrics.lock().await.calculate_results();
        PerformanceMonitor::new(self.report_interval).print_final_summary(&results);

        Ok(results)
    }
}

async fn user_task(
    user_id: u32,
    scenario: Arc<Scenario>,
    host: String,
    timeout: Duration,
    spawn_delay: Duration,
    metrics: Arc<Mutex<PerformanceMetrics>>,
    shutdown: CancellationToken,
) -> Result<()> {
    tokio::select! {
        _ = shutdown.cancelled() => return Ok(()),
        _ = sleep(spawn_delay) => {}
    }

    let session = UserSession::new(user_id, &host, timeout)?;
    let mut rng = SmallRng::seed_from_u64(rand::random());
    debug!(user = user_id, "user started");

    loop {
        let task = scenario.pick_task(&mut rng);
        let started = Instant::now();

        // In-flight requests are abandoned when the run stops.
        let result = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = task.execute(&session) => result,
        };
        let elapsed = started.elapsed();

        if let Err(e) = &result {
            debug!(user = user_id, task = %task.name, error = %e, "task failed");
        }
        metrics
            .lock()
            .await
            .record_task_result(&task.name, &task.request_name(), &result, elapsed);

        let pause = scenario.wait_time().next_pause(&mut rng, elapsed);
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = sleep(pause) => {}
        }
    }

    debug!(user = user_id, "user stopped");
    Ok(())
}

/// Runs one simulated user in-process, printing each task's outcome.
///
/// Stops after `iterations` tasks when given, otherwise on Ctrl-C. Task
/// failures are recorded and printed, never returned as errors.
pub async fn run_single_user(
    scenario: &Scenario,
    host: &str,
    iterations: Option<u64>,
    request_timeout: Duration,
) -> Result<PerformanceResults> {
    let session = UserSession::new(0, host, request_timeout)?;
    let mut metrics = PerformanceMetrics::new();
    let mut rng = SmallRng::seed_from_u64(rand::random());
    let mut completed = 0u64;

    info!(host, scenario = scenario.name(), "running single user");

    loop {
        let task = scenario.pick_task(&mut rng);
        let spinner = Spinner::new(&format!("{} → POST {}", task.name, task.request_name()));
        let started = Instant::now();

        let result = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                spinner.finish_and_clear();
                break;
            }
            result = task.execute(&session) => result,
        };
        let elapsed = started.elapsed();
        spinner.finish_and_clear();

        print_task_outcome(task, &result, elapsed);
        metrics.record_task_result(&task.name, &task.request_name(), &result, elapsed);

        completed += 1;
        if iterations.is_some_and(|limit| completed >= limit) {
            break;
        }

        let pause = scenario.wait_time().next_pause(&mut rng, elapsed);
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = sleep(pause) => {}
        }
    }

    Ok(metrics.calculate_results())
}
