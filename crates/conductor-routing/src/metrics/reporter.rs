//! Report generation for pool performance.

use conductor_core::{AgentId, PerformanceMetrics};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{Error as FmtError, Write as _};

/// One agent's line in a pool report
#[derive(Debug, Clone, Serialize)]
pub struct AgentBreakdown {
    /// Agent id
    pub agent_id: AgentId,
    /// Smoothed response time in milliseconds
    pub average_response_time_ms: f64,
    /// Smoothed success rate (0.0 to 1.0)
    pub success_rate: f64,
    /// Smoothed error rate (0.0 to 1.0)
    pub error_rate: f64,
}

/// Pool-wide performance summary
#[derive(Debug, Clone, Serialize)]
pub struct PoolReport {
    /// Number of profiled agents
    pub agent_count: usize,
    /// Mean response time across agents
    pub average_response_time_ms: f64,
    /// Mean success rate across agents
    pub average_success_rate: f64,
    /// Per-agent lines, in id order
    pub agents: Vec<AgentBreakdown>,
}

/// Pool report generator
pub struct PerformanceReporter;

impl PerformanceReporter {
    /// Summarizes a metrics snapshot
    pub fn summarize(snapshot: &BTreeMap<AgentId, PerformanceMetrics>) -> PoolReport {
        let agents: Vec<AgentBreakdown> = snapshot
            .iter()
            .map(|(agent_id, metrics)| AgentBreakdown {
                agent_id: agent_id.clone(),
                average_response_time_ms: metrics.average_response_time_ms,
                success_rate: metrics.success_rate,
                error_rate: metrics.error_rate,
            })
            .collect();

        if agents.is_empty() {
            return PoolReport {
                agent_count: 0,
                average_response_time_ms: 0.0,
                average_success_rate: 0.0,
                agents,
            };
        }

        let count = agents.len() as f64;
        let average_response_time_ms = agents
            .iter()
            .map(|line| line.average_response_time_ms)
            .sum::<f64>()
            / count;
        let average_success_rate = agents.iter().map(|line| line.success_rate).sum::<f64>() / count;

        PoolReport {
            agent_count: agents.len(),
            average_response_time_ms,
            average_success_rate,
            agents,
        }
    }

    /// Formats a report as a human-readable string
    ///
    /// # Errors
    /// Returns an error if formatting fails
    pub fn format_report(report: &PoolReport) -> Result<String, FmtError> {
        let mut output = String::new();

        writeln!(output, "Agents: {}", report.agent_count)?;
        writeln!(
            output,
            "Average Response Time: {:.1}ms",
            report.average_response_time_ms
        )?;
        writeln!(
            output,
            "Average Success Rate: {:.1}%",
            report.average_success_rate * 100.0
        )?;

        writeln!(output, "\nPer Agent:")?;
        for line in &report.agents {
            writeln!(
                output,
                "  {}: {:.1}ms, {:.1}% success, {:.1}% errors",
                line.agent_id,
                line.average_response_time_ms,
                line.success_rate * 100.0,
                line.error_rate * 100.0
            )?;
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report() {
        let report = PerformanceReporter::summarize(&BTreeMap::new());
        assert_eq!(report.agent_count, 0);
        assert!(report.average_success_rate.abs() < f64::EPSILON);
    }

    #[test]
    fn test_format_report() -> Result<(), FmtError> {
        let mut snapshot = BTreeMap::new();
        snapshot.insert(AgentId::from("alpha"), PerformanceMetrics::default());
        snapshot.insert(AgentId::from("beta"), PerformanceMetrics::unobserved());

        let report = PerformanceReporter::summarize(&snapshot);
        assert_eq!(report.agent_count, 2);
        assert!((report.average_response_time_ms - 750.0).abs() < 1e-9);

        let formatted = PerformanceReporter::format_report(&report)?;
        assert!(formatted.contains("Agents: 2"));
        assert!(formatted.contains("Average Response Time: 750.0ms"));
        assert!(formatted.contains("  alpha: 500.0ms, 98.0% success, 2.0% errors"));
        Ok(())
    }
}
