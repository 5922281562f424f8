//! Rolling performance metrics for a single agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Smoothed performance profile of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Smoothed response time in milliseconds
    pub average_response_time_ms: f64,
    /// Smoothed success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Throughput estimate
    pub throughput: f64,
    /// Resource utilization estimate
    pub resource_utilization: f64,
    /// Smoothed error rate (0.0 to 1.0)
    pub error_rate: f64,
    /// Last time a sample was folded in
    pub last_updated: DateTime<Utc>,
}

impl Default for PerformanceMetrics {
    /// Starting profile of a configured pool agent.
    fn default() -> Self {
        Self {
            average_response_time_ms: 500.0,
            success_rate: 0.98,
            throughput: 20.0,
            resource_utilization: 0.3,
            error_rate: 0.02,
            last_updated: Utc::now(),
        }
    }
}

impl PerformanceMetrics {
    /// Starting profile of an agent the profiler has never seen.
    pub fn unobserved() -> Self {
        Self {
            average_response_time_ms: 1000.0,
            success_rate: 0.95,
            throughput: 10.0,
            resource_utilization: 0.5,
            error_rate: 0.05,
            last_updated: Utc::now(),
        }
    }

    /// Folds one execution sample in with exponential smoothing factor
    /// `alpha`. Rates stay within `[0, 1]`.
    pub fn apply_sample(&mut self, alpha: f64, response_time_ms: f64, success: bool) {
        let (succeeded, errored) = if success { (1.0, 0.0) } else { (0.0, 1.0) };
        self.average_response_time_ms =
            alpha.mul_add(response_time_ms, (1.0 - alpha) * self.average_response_time_ms);
        self.success_rate =
            alpha.mul_add(succeeded, (1.0 - alpha) * self.success_rate).clamp(0.0, 1.0);
        self.error_rate = alpha.mul_add(errored, (1.0 - alpha) * self.error_rate).clamp(0.0, 1.0);
        self.last_updated = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let pool = PerformanceMetrics::default();
        assert!((pool.success_rate - 0.98).abs() < f64::EPSILON);
        let fresh = PerformanceMetrics::unobserved();
        assert!((fresh.average_response_time_ms - 1000.0).abs() < f64::EPSILON);
        assert!((fresh.error_rate - 0.05).abs() < f64::EPSILON);
    }

    #[test]
    fn test_apply_sample() {
        let mut metrics = PerformanceMetrics::unobserved();
        metrics.apply_sample(0.1, 2000.0, false);
        assert!((metrics.average_response_time_ms - 1100.0).abs() < 1e-9);
        assert!((metrics.success_rate - 0.855).abs() < 1e-9);
        assert!((metrics.error_rate - 0.145).abs() < 1e-9);
    }

    #[test]
    fn test_rates_stay_bounded() {
        let mut metrics = PerformanceMetrics::default();
        for _ in 0..500 {
            metrics.apply_sample(1.0, 10.0, true);
        }
        assert!((metrics.success_rate - 1.0).abs() < f64::EPSILON);
        assert!(metrics.error_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_camel_case_serialization() {
        let json = serde_json::to_string(&PerformanceMetrics::default()).expect("serialize");
        assert!(json.contains("averageResponseTimeMs"));
        assert!(json.contains("lastUpdated"));
    }
}
