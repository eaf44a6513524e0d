use crate::performance::metrics::AGGREGATED;
use crate::performance::PerformanceResults;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use std::fs;
use std::path::{Path, PathBuf};
use tera::Tera;

const HTML_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>zipswarm report {{ run_id }}</title>
<style>
body { font-family: -apple-system, BlinkMacSystemFont, sans-serif; margin: 2rem; color: #222; }
table { border-collapse: collapse; width: 100%; margin-bottom: 2rem; }
th, td { padding: .4rem .8rem; border-bottom: 1px solid #ddd; text-align: right; }
th:nth-child(-n+2), td:nth-child(-n+2) { text-align: left; }
.fail { color: #c0392b; }
.ok { color: #27ae60; }
</style>
</head>
<body>
<h1>Load test report</h1>
<p>Run {{ run_id }} started {{ started_at }}, lasted {{ total_duration }} ms.</p>
<p>
  Requests: {{ total_requests }} •
  <span class="{% if failed_requests > 0 %}fail{% else %}ok{% endif %}">Failures: {{ failed_requests }}</span> •
  {% set success_pct = success_rate * 100 %}Success rate: {{ success_pct | round(precision=2) }}% •
  RPS: {{ requests_per_second | round(precision=2) }}
</p>
<h2>Request statistics</h2>
<table>
<tr><th>Type</th><th>Name</th><th># reqs</th><th># fails</th><th>Avg (ms)</th><th>Min (ms)</th><th>Max (ms)</th><th>p50 (ms)</th><th>p95 (ms)</th><th>p99 (ms)</th><th>req/s</th></tr>
{% for entry in entries %}
<tr><td>{{ entry.method }}</td><td>{{ entry.name }}</td><td>{{ entry.num_requests }}</td><td class="{% if entry.num_failures > 0 %}fail{% endif %}">{{ entry.num_failures }}</td><td>{{ entry.average_response_time }}</td><td>{{ entry.min_response_time }}</td><td>{{ entry.max_response_time }}</td><td>{{ entry.p50_response_time }}</td><td>{{ entry.p95_response_time }}</td><td>{{ entry.p99_response_time }}</td><td>{{ entry.requests_per_second | round(precision=2) }}</td></tr>
{% endfor %}
</table>
{% if task_errors %}
<h2>Errors</h2>
<table>
<tr><th>Task</th><th>Message</th><th>Occurrences</th></tr>
{% for error in task_errors %}
<tr><td>{{ error.task }}</td><td>{{ error.message }}</td><td>{{ error.occurrences }}</td></tr>
{% endfor %}
</table>
{% endif %}
</body>
</html>
"#;

pub struct ReportGenerator;

impl ReportGenerator {
    /// Writes one report per comma-separated format (`json`, `csv`, `html`).
    pub fn generate_reports(
        results: &PerformanceResults,
        formats: &str,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(output_dir).with_context(|| {
            format!("Failed to create report directory: {}", output_dir.display())
        })?;

        let mut generated = Vec::new();
        for format in formats.split(',').map(str::trim).filter(|f| !f.is_empty()) {
            match format {
                "json" => generated.push(Self::generate_json_report(results, output_dir)?),
                "csv" => generated.extend(Self::generate_csv_reports(results, output_dir)?),
                "html" => generated.push(Self::generate_html_report(results, output_dir)?),
                other => {
                    eprintln!("{} Unknown report format '{}', skipping", "⚠".yellow(), other);
                }
            }
        }

        Ok(generated)
    }

    fn generate_json_report(results: &PerformanceResults, output_dir: &Path) -> Result<PathBuf> {
        let path = output_dir.join("zipswarm_report.json");
        results.save_report(&path)?;
        Ok(path)
    }

    fn generate_csv_reports(results: &PerformanceResults, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let stats_path = output_dir.join("zipswarm_stats.csv");
        let mut writer = csv::Writer::from_path(&stats_path)?;
        writer.write_record([
            "Type",
            "Name",
            "Request Count",
            "Failure Count",
            "Median Response Time",
            "Average Response Time",
            "Min Response Time",
            "Max Response Time",
            "Average Content Size",
            "Requests/s",
            "Failures/s",
            "95%",
            "99%",
        ])?;
        for entry in &results.entries {
            writer.write_record([
                entry.method.clone(),
                entry.name.clone(),
                entry.num_requests.to_string(),
                entry.num_failures.to_string(),
                entry.p50_response_time.as_millis().to_string(),
                entry.average_response_time.as_millis().to_string(),
                entry.min_response_time.as_millis().to_string(),
                entry.max_response_time.as_millis().to_string(),
                entry.average_content_size.to_string(),
                format!("{:.4}", entry.requests_per_second),
                format!("{:.4}", entry.failures_per_second),
                entry.p95_response_time.as_millis().to_string(),
                entry.p99_response_time.as_millis().to_string(),
            ])?;
        }
        let secs = results.total_duration.as_secs_f64();
        writer.write_record([
            String::new(),
            AGGREGATED.to_string(),
            results.total_requests.to_string(),
            results.failed_requests.to_string(),
            results.p50_response_time.as_millis().to_string(),
            results.average_response_time.as_millis().to_string(),
            results.min_response_time.as_millis().to_string(),
            results.max_response_time.as_millis().to_string(),
            String::new(),
            format!("{:.4}", results.requests_per_second),
            format!(
                "{:.4}",
                if secs > 0.0 {
                    results.failed_requests as f64 / secs
                } else {
                    0.0
                }
            ),
            results.p95_response_time.as_millis().to_string(),
            results.p99_response_time.as_millis().to_string(),
        ])?;
        writer.flush()?;

        let failures_path = output_dir.join("zipswarm_failures.csv");
        let mut writer = csv::Writer::from_path(&failures_path)?;
        writer.write_record(["Method", "Name", "Error", "Occurrences"])?;
        for entry in &results.entries {
            for (message, count) in &entry.failures {
                writer.write_record([
                    entry.method.as_str(),
                    entry.name.as_str(),
                    message.as_str(),
                    count.to_string().as_str(),
                ])?;
            }
        }
        for error in &results.task_errors {
            writer.write_record([
                "",
                error.task.as_str(),
                error.message.as_str(),
                error.occurrences.to_string().as_str(),
            ])?;
        }
        writer.flush()?;

        Ok(vec![stats_path, failures_path])
    }

    fn generate_html_report(results: &PerformanceResults, output_dir: &Path) -> Result<PathBuf> {
        let context =
            tera::Context::from_serialize(results).context("Failed to build report context")?;
        let html = Tera::one_off(HTML_TEMPLATE, &context, true)
            .context("Failed to render HTML report")?;

        let path = output_dir.join("zipswarm_report.html");
        fs::write(&path, html)?;
        Ok(path)
    }
}
