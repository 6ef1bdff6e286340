/// Per-source request metrics
///
/// Tracks success rates, failure categories and response times for each source

use crate::error::SourceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetrics {
    pub source_name: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub average_response_time_ms: f64,
    pub total_response_time_ms: u64,
    pub rate_limit_hits: u64,
    pub timeout_count: u64,
    pub network_errors: u64,
}

impl SourceMetrics {
    pub fn new(source_name: String) -> Self {
        Self {
            source_name,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            last_success: None,
            last_failure: None,
            last_error: None,
            average_response_time_ms: 0.0,
            total_response_time_ms: 0,
            rate_limit_hits: 0,
            timeout_count: 0,
            network_errors: 0,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            (self.successful_requests as f64 / self.total_requests as f64) * 100.0
        }
    }

    pub fn record_success(&mut self, response_time: Duration) {
        self.total_requests += 1;
        self.successful_requests += 1;
        self.last_success = Some(Utc::now());

        let response_ms = response_time.as_millis() as u64;
        self.total_response_time_ms += response_ms;
        self.average_response_time_ms =
            self.total_response_time_ms as f64 / self.successful_requests as f64;
    }

    pub fn record_failure(&mut self, error: &SourceError) {
        self.total_requests += 1;
        self.failed_requests += 1;
        self.last_failure = Some(Utc::now());
        self.last_error = Some(error.to_string());

        // Categorize errors
        if error.upstream_status() == Some(429) {
            self.rate_limit_hits += 1;
        } else if error.is_timeout() {
            self.timeout_count += 1;
        } else if matches!(error, SourceError::Network { .. }) {
            self.network_errors += 1;
        }
    }
}

/// Totals across every source
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    pub sources: usize,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
}

/// Shared tracker; one entry per source name
pub struct MetricsTracker {
    metrics: Mutex<HashMap<String, SourceMetrics>>,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            metrics: Mutex::new(HashMap::new()),
        }
    }

    // A panic while holding the lock leaves plain counters behind; keep serving them
    fn lock(&self) -> MutexGuard<'_, HashMap<String, SourceMetrics>> {
        self.metrics.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record_success(&self, source_name: &str, response_time: Duration) {
        let mut metrics = self.lock();
        let source_metrics = metrics
            .entry(source_name.to_string())
            .or_insert_with(|| SourceMetrics::new(source_name.to_string()));
        source_metrics.record_success(response_time);

        log::debug!(
            "[{}] Success - Response time: {}ms - Success rate: {:.2}%",
            source_name,
            response_time.as_millis(),
            source_metrics.success_rate()
        );
    }

    pub fn record_failure(&self, source_name: &str, error: &SourceError) {
        let mut metrics = self.lock();
        let source_metrics = metrics
            .entry(source_name.to_string())
            .or_insert_with(|| SourceMetrics::new(source_name.to_string()));
        source_metrics.record_failure(error);

        log::warn!(
            "[{}] Failure - Error: {} - Success rate: {:.2}%",
            source_name,
            error,
            source_metrics.success_rate()
        );
    }

    pub fn get_metrics(&self, source_name: &str) -> Option<SourceMetrics> {
        self.lock().get(source_name).cloned()
    }

    /// All sources, sorted by name
    pub fn get_all_metrics(&self) -> Vec<SourceMetrics> {
        let mut all: Vec<SourceMetrics> = self.lock().values().cloned().collect();
        all.sort_by(|a, b| a.source_name.cmp(&b.source_name));
        all
    }

    pub fn summary(&self) -> MetricsSummary {
        let metrics = self.lock();
        let total: u64 = metrics.values().map(|m| m.total_requests).sum();
        let ok: u64 = metrics.values().map(|m| m.successful_requests).sum();
        MetricsSummary {
            sources: metrics.len(),
            total_requests: total,
            successful_requests: ok,
            failed_requests: metrics.values().map(|m| m.failed_requests).sum(),
            success_rate: if total == 0 {
                0.0
            } else {
                ok as f64 / total as f64 * 100.0
            },
        }
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Time an adapter call and record its outcome against `source_name`.
/// Caller mistakes (validation, unknown source) are not upstream failures.
pub async fn track_request<F, T>(
    tracker: &MetricsTracker,
    source_name: &str,
    operation: F,
) -> Result<T, SourceError>
where
    F: std::future::Future<Output = Result<T, SourceError>>,
{
    let start = Instant::now();
    let result = operation.await;
    let duration = start.elapsed();

    match &result {
        Ok(_) => tracker.record_success(source_name, duration),
        Err(SourceError::Validation(_)) | Err(SourceError::UnknownSource(_)) => {}
        Err(e) => tracker.record_failure(source_name, e),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkErrorKind;

    #[test]
    fn test_metrics_creation() {
        let metrics = SourceMetrics::new("test_source".to_string());
        assert_eq!(metrics.source_name, "test_source");
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.success_rate(), 0.0);
    }

    #[test]
    fn test_record_success() {
        let mut metrics = SourceMetrics::new("test_source".to_string());
        metrics.record_success(Duration::from_millis(100));

        assert_eq!(metrics.total_requests, 1);
        assert_eq!(metrics.successful_requests, 1);
        assert_eq!(metrics.success_rate(), 100.0);
        assert!(metrics.last_success.is_some());
    }

    #[test]
    fn test_failure_categories() {
        let mut metrics = SourceMetrics::new("test_source".to_string());
        metrics.record_failure(&SourceError::http(429, "https://x/"));
        metrics.record_failure(&SourceError::Network {
            kind: NetworkErrorKind::Timeout,
            url: "https://x/".into(),
        });
        metrics.record_failure(&SourceError::Network {
            kind: NetworkErrorKind::Dns,
            url: "https://x/".into(),
        });
        metrics.record_failure(&SourceError::Parse("bad".into()));

        assert_eq!(metrics.failed_requests, 4);
        assert_eq!(metrics.rate_limit_hits, 1);
        assert_eq!(metrics.timeout_count, 1);
        assert_eq!(metrics.network_errors, 1);
        assert!(metrics.last_error.unwrap().contains("bad"));
    }

    #[test]
    fn test_success_rate_calculation() {
        let mut metrics = SourceMetrics::new("test_source".to_string());

        metrics.record_success(Duration::from_millis(100));
        metrics.record_success(Duration::from_millis(200));
        metrics.record_failure(&SourceError::Parse("Error".into()));

        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.average_response_time_ms, 150.0);
        assert!((metrics.success_rate() - 66.66).abs() < 0.1);
    }

    #[test]
    fn test_tracker_summary() {
        let tracker = MetricsTracker::new();

        tracker.record_success("kiryuu", Duration::from_millis(100));
        tracker.record_failure("shinigami", &SourceError::Parse("Error".into()));

        assert_eq!(tracker.get_metrics("kiryuu").unwrap().success_rate(), 100.0);
        assert_eq!(tracker.get_metrics("shinigami").unwrap().success_rate(), 0.0);

        let all = tracker.get_all_metrics();
        assert_eq!(all[0].source_name, "kiryuu");
        let summary = tracker.summary();
        assert_eq!(summary.sources, 2);
        assert_eq!(summary.total_requests, 2);
        assert_eq!(summary.success_rate, 50.0);
    }

    #[tokio::test]
    async fn test_track_request_ignores_caller_errors() {
        let tracker = MetricsTracker::new();
        let _ = track_request(&tracker, "kiryuu", async {
            Err::<(), _>(SourceError::Validation("blank".into()))
        })
        .await;
        assert!(tracker.get_metrics("kiryuu").is_none());

        let v = track_request(&tracker, "kiryuu", async { Ok::<_, SourceError>(7) }).await;
        assert_eq!(v.unwrap(), 7);
        assert_eq!(tracker.get_metrics("kiryuu").unwrap().successful_requests, 1);
    }
}
