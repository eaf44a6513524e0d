use crate::error::{TaskError, TaskResult};
use crate::session::RequestOutcome;
use anyhow::Result;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

pub const AGGREGATED: &str = "Aggregated";

/// Counters for one request name.
///
/// Response times are kept as a histogram of rounded milliseconds, so memory
/// stays bounded however long the run lasts.
#[derive(Debug, Clone, Default)]
pub struct RequestStats {
    pub response_times: BTreeMap<u64, u64>,
    pub total_response_time: Duration,
    pub min_response_time: Option<Duration>,
    pub max_response_time: Duration,
    pub request_count: u64,
    pub failure_count: u64,
    pub connection_errors: u64,
    pub status_codes: HashMap<u16, u64>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub failures: IndexMap<String, u64>,
}

/// Exact below 100ms, then 10ms, 100ms and 1s buckets.
fn bucket_millis(response_time: Duration) -> u64 {
    let millis = u64::try_from(response_time.as_millis()).unwrap_or(u64::MAX);
    let step = match millis {
        0..=99 => return millis,
        100..=999 => 10,
        1_000..=9_999 => 100,
        _ => 1_000,
    };
    millis.saturating_add(step / 2) / step * step
}

impl RequestStats {
    fn record_response_time(&mut self, response_time: Duration) {
        *self
            .response_times
            .entry(bucket_millis(response_time))
            .or_insert(0) += 1;
        self.total_response_time += response_time;
        self.min_response_time = Some(
            self.min_response_time
                .map_or(response_time, |min| min.min(response_time)),
        );
        self.max_response_time = self.max_response_time.max(response_time);
    }

    fn sample_count(&self) -> u64 {
        self.response_times.values().sum()
    }

    /// Bucket holding the sample at `percent` of the sorted samples.
    fn percentile(&self, percent: u64) -> Duration {
        let index = self.sample_count() * percent / 100;
        let mut seen = 0;
        for (millis, count) in &self.response_times {
            seen += count;
            if seen > index {
                return Duration::from_millis(*millis);
            }
        }
        Duration::ZERO
    }

    fn merge(&mut self, other: &RequestStats) {
        for (millis, count) in &other.response_times {
            *self.response_times.entry(*millis).or_insert(0) += count;
        }
        self.total_response_time += other.total_response_time;
        self.min_response_time = match (self.min_response_time, other.min_response_time) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max_response_time = self.max_response_time.max(other.max_response_time);
        self.request_count += other.request_count;
        self.failure_count += other.failure_count;
        self.connection_errors += other.connection_errors;
        self.bytes_sent += other.bytes_sent;
        self.bytes_received += other.bytes_received;

        for (status, count) in &other.status_codes {
            *self.status_codes.entry(*status).or_insert(0) += count;
        }
        for (message, count) in &other.failures {
            *self.failures.entry(message.clone()).or_insert(0) += count;
        }
    }
}

#[derive(Debug, Clone)]
pub struct PerformanceMetrics {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub start_time: Instant,
    pub entries: IndexMap<String, RequestStats>,
    /// Task failures that never produced a request, keyed by task then message.
    pub task_errors: IndexMap<String, IndexMap<String, u64>>,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMetrics {
    pub fn new() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            start_time: Instant::now(),
            entries: IndexMap::new(),
            task_errors: IndexMap::new(),
        }
    }

    pub fn record_request(
        &mut self,
        name: &str,
        response_time: Duration,
        status_code: u16,
        bytes_sent: u64,
        bytes_received: u64,
        is_error: bool,
    ) {
        let stats = self.entries.entry(name.to_string()).or_default();
        stats.record_response_time(response_time);
        stats.request_count += 1;
        stats.bytes_sent += bytes_sent;
        stats.bytes_received += bytes_received;

        *stats.status_codes.entry(status_code).or_insert(0) += 1;

        if is_error {
            stats.failure_count += 1;
            *stats
                .failures
                .entry(format!("HTTP {}", status_code))
                .or_insert(0) += 1;
        }
    }

    /// A request that was attempted but never got a response.
    pub fn record_connection_error(&mut self, name: &str, response_time: Duration, message: &str) {
        let stats = self.entries.entry(name.to_string()).or_default();
        stats.record_response_time(response_time);
        stats.request_count += 1;
        stats.failure_count += 1;
        stats.connection_errors += 1;
        *stats.failures.entry(message.to_string()).or_insert(0) += 1;
    }

    pub fn record_task_error(&mut self, task: &str, message: &str) {
        *self
            .task_errors
            .entry(task.to_string())
            .or_default()
            .entry(message.to_string())
            .or_insert(0) += 1;
    }

    /// Records whatever a task execution produced.
    pub fn record_task_result(
        &mut self,
        task: &str,
        request_name: &str,
        result: &TaskResult<RequestOutcome>,
        elapsed: Duration,
    ) {
        match result {
            Ok(outcome) => self.record_request(
                &outcome.name,
                outcome.duration,
                outcome.status,
                outcome.bytes_sent,
                outcome.bytes_received,
                !outcome.is_success(),
            ),
            Err(TaskError::Transport(e)) => {
                self.record_connection_error(request_name, elapsed, &e.to_string())
            }
            Err(e) => self.record_task_error(task, &e.to_string()),
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.entries.values().map(|s| s.request_count).sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.entries.values().map(|s| s.failure_count).sum()
    }

    pub fn total_task_errors(&self) -> u64 {
        self.task_errors
            .values()
            .flat_map(|messages| messages.values())
            .sum()
    }

    pub fn calculate_results(&self) -> PerformanceResults {
        let total_duration = self.start_time.elapsed();

        let mut aggregated = RequestStats::default();
        let entries: Vec<EntryResults> = self
            .entries
            .iter()
            .map(|(name, stats)| {
                aggregated.merge(stats);
                summarize(name, stats, total_duration)
            })
            .collect();
        let summary = summarize(AGGREGATED, &aggregated, total_duration);

        let task_errors = self
            .task_errors
            .iter()
            .flat_map(|(task, messages)| {
                messages.iter().map(move |(message, occurrences)| TaskErrorEntry {
                    task: task.clone(),
                    message: message.clone(),
                    occurrences: *occurrences,
                })
            })
            .collect::<Vec<_>>();

        let secs = total_duration.as_secs_f64();
        PerformanceResults {
            run_id: self.run_id.clone(),
            started_at: self.started_at,
            total_requests: summary.num_requests,
            successful_requests: summary.num_requests - summary.num_failures,
            failed_requests: summary.num_failures,
            success_rate: if summary.num_requests > 0 {
                (summary.num_requests - summary.num_failures) as f64 / summary.num_requests as f64
            } else {
                0.0
            },
            requests_per_second: summary.requests_per_second,
            average_response_time: summary.average_response_time,
            min_response_time: summary.min_response_time,
            max_response_time: summary.max_response_time,
            p50_response_time: summary.p50_response_time,
            p95_response_time: summary.p95_response_time,
            p99_response_time: summary.p99_response_time,
            status_code_distribution: aggregated.status_codes.clone(),
            bytes_per_second_sent: per_second(aggregated.bytes_sent, secs),
            bytes_per_second_received: per_second(aggregated.bytes_received, secs),
            connection_errors: aggregated.connection_errors,
            total_task_errors: task_errors.iter().map(|e| e.occurrences).sum(),
            total_duration,
            entries,
            task_errors,
        }
    }
}

fn per_second(count: u64, secs: f64) -> f64 {
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

fn summarize(name: &str, stats: &RequestStats, total_duration: Duration) -> EntryResults {
    let secs = total_duration.as_secs_f64();
    let samples = stats.sample_count();
    let average_response_time = if samples == 0 {
        Duration::ZERO
    } else {
        Duration::from_nanos((stats.total_response_time.as_nanos() / samples as u128) as u64)
    };

    EntryResults {
        method: "POST".to_string(),
        name: name.to_string(),
        num_requests: stats.request_count,
        num_failures: stats.failure_count,
        requests_per_second: per_second(stats.request_count, secs),
        failures_per_second: per_second(stats.failure_count, secs),
        average_response_time,
        min_response_time: stats.min_response_time.unwrap_or(Duration::ZERO),
        max_response_time: stats.max_response_time,
        p50_response_time: stats.percentile(50),
        p95_response_time: stats.percentile(95),
        p99_response_time: stats.percentile(99),
        average_content_size: if stats.request_count > 0 {
            stats.bytes_received / stats.request_count
        } else {
            0
        },
        failures: stats.failures.clone(),
    }
}

/// Statistics for one request name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryResults {
    pub method: String,
    pub name: String,
    pub num_requests: u64,
    pub num_failures: u64,
    pub requests_per_second: f64,
    pub failures_per_second: f64,

    #[serde(with = "duration_serde")]
    pub average_response_time: Duration,
    #[serde(with = "duration_serde")]
    pub min_response_time: Duration,
    #[serde(with = "duration_serde")]
    pub max_response_time: Duration,
    #[serde(with = "duration_serde")]
    pub p50_response_time: Duration,
    #[serde(with = "duration_serde")]
    pub p95_response_time: Duration,
    #[serde(with = "duration_serde")]
    pub p99_response_time: Duration,

    pub average_content_size: u64,
    pub failures: IndexMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskErrorEntry {
    pub task: String,
    pub message: String,
    pub occurrences: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PerformanceResults {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub requests_per_second: f64,

    #[serde(with = "duration_serde")]
    pub average_response_time: Duration,
    #[serde(with = "duration_serde")]
    pub min_response_time: Duration,
    #[serde(with = "duration_serde")]
    pub max_response_time: Duration,
    #[serde(with = "duration_serde")]
    pub p50_response_time: Duration,
    #[serde(with = "duration_serde")]
    pub p95_response_time: Duration,
    #[serde(with = "duration_serde")]
    pub p99_response_time: Duration,

    pub status_code_distribution: HashMap<u16, u64>,
    pub bytes_per_second_sent: f64,
    pub bytes_per_second_received: f64,
    pub connection_errors: u64,
    pub total_task_errors: u64,

    #[serde(with = "duration_serde")]
    pub total_duration: Duration,

    pub entries: Vec<EntryResults>,
    pub task_errors: Vec<TaskErrorEntry>,
}

impl PerformanceResults {
    /// True when every request succeeded and no task failed locally.
    pub fn is_clean(&self) -> bool {
        self.failed_requests == 0 && self.total_task_errors == 0
    }

    pub fn save_report(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

// Durations are serialized as whole milliseconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metrics() {
        let results = PerformanceMetrics::new().calculate_results();
        assert_eq!(results.total_requests, 0);
        assert_eq!(results.success_rate, 0.0);
        assert!(results.entries.is_empty());
        assert!(results.is_clean());
    }

    #[test]
    fn test_response_times_are_bucketed() {
        assert_eq!(bucket_millis(Duration::from_millis(42)), 42);
        assert_eq!(bucket_millis(Duration::from_millis(147)), 150);
        assert_eq!(bucket_millis(Duration::from_millis(1_234)), 1_200);
        assert_eq!(bucket_millis(Duration::from_millis(45_678)), 46_000);
        assert_eq!(bucket_millis(Duration::MAX), u64::MAX / 1_000 * 1_000);
    }

    #[test]
    fn test_histogram_stays_bounded() {
        let mut metrics = PerformanceMetrics::new();
        for _ in 0..50 {
            for millis in 1..=1_000 {
                metrics.record_request("/upload", Duration::from_millis(millis), 200, 1, 1, false);
            }
        }

        let stats = &metrics.entries["/upload"];
        assert_eq!(stats.request_count, 50_000);
        assert!(stats.response_times.len() < 200, "{} buckets", stats.response_times.len());

        let results = metrics.calculate_results();
        assert_eq!(results.min_response_time, Duration::from_millis(1));
        assert_eq!(results.max_response_time, Duration::from_millis(1_000));
        assert_eq!(results.average_response_time, Duration::from_micros(500_500));
        assert!(results.p50_response_time >= Duration::from_millis(490));
        assert!(results.p50_response_time <= Duration::from_millis(510));
        assert!(results.p99_response_time >= Duration::from_millis(980));
    }

    #[test]
    fn test_entries_keep_registration_order() {
        let mut metrics = PerformanceMetrics::new();
        metrics.record_request("/upload?command=test", Duration::from_millis(5), 200, 1, 1, false);
        metrics.record_request("/upload", Duration::from_millis(5), 200, 1, 1, false);

        let results = metrics.calculate_results();
        let names: Vec<_> = results.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["/upload?command=test", "/upload"]);
    }

    #[test]
    fn test_connection_errors_count_as_failed_requests() {
        let mut metrics = PerformanceMetrics::new();
        metrics.record_request("/upload", Duration::from_millis(10), 200, 10, 10, false);
        metrics.record_connection_error("/upload", Duration::from_millis(3), "connection refused");

        let results = metrics.calculate_results();
        assert_eq!(results.total_requests, 2);
        assert_eq!(results.failed_requests, 1);
        assert_eq!(results.connection_errors, 1);
        assert_eq!(results.entries[0].failures.get("connection refused"), Some(&1));
        assert!(!results.is_clean());
    }

    #[test]
    fn test_task_errors_are_not_requests() {
        let mut metrics = PerformanceMetrics::new();
        let err: TaskResult<RequestOutcome> = Err(TaskError::ArtifactNotFound {
            path: "./src.zip".into(),
        });
        metrics.record_task_result("upload_build", "/upload", &err, Duration::ZERO);
        metrics.record_task_result("upload_build", "/upload", &err, Duration::ZERO);

        let results = metrics.calculate_results();
        assert_eq!(results.total_requests, 0);
        assert_eq!(results.total_task_errors, 2);
        assert_eq!(results.task_errors.len(), 1);
        assert_eq!(results.task_errors[0].task, "upload_build");
        assert_eq!(results.task_errors[0].message, "artifact not found: ./src.zip");
        assert!(!results.is_clean());
    }

    #[test]
    fn test_failed_status_is_recorded_with_message() {
        let mut metrics = PerformanceMetrics::new();
        let outcome = RequestOutcome {
            name: "/upload".to_string(),
            status: 500,
            duration: Duration::from_millis(40),
            bytes_sent: 100,
            bytes_received: 20,
        };
        metrics.record_task_result("upload_build", "/upload", &Ok(outcome), Duration::ZERO);

        let results = metrics.calculate_results();
        assert_eq!(results.failed_requests, 1);
        assert_eq!(results.entries[0].failures.get("HTTP 500"), Some(&1));
        assert_eq!(results.status_code_distribution.get(&500), Some(&1));
    }
}
