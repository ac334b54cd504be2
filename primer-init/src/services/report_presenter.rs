//! Human-readable rendering of a [`ReadinessReport`]
//!
//! The summary is what the CLI prints by default; verbose mode appends every
//! consistency finding. JSON output is the report's own serialization.

use crate::models::{ReadinessReport, ResolutionStatus};
use std::fmt::Write;

/// Counts, score and gate decision
pub fn render_summary(report: &ReadinessReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Readiness report {}", report.run_id);
    if report.incomplete {
        let _ = writeln!(out, "  status:            INCOMPLETE (cancelled)");
    }
    let _ = writeln!(
        out,
        "  files:             {} processed / {} discovered",
        report.files_processed, report.total_files_discovered
    );
    let _ = writeln!(
        out,
        "  modules:           {} ready / {} registered",
        report.pipelines_ready.len(),
        report.module_health_summary.len()
    );
    let _ = writeln!(out, "  consistency:       {} issue(s)", report.total_issues);
    let _ = writeln!(out, "  security:          {}", report.security_status.as_str());
    let _ = writeln!(
        out,
        "  score:             {:.3} (threshold {:.2})",
        report.overall_score, report.approval_threshold
    );
    let _ = writeln!(
        out,
        "  approval required: {}",
        if report.approval_required { "yes" } else { "no" }
    );

    if !report.identified_gaps.is_empty() {
        let _ = writeln!(out, "Gaps:");
        for gap in &report.identified_gaps {
            let _ = writeln!(out, "  - {}", gap);
        }
    }

    if !report.recommendations.is_empty() {
        let _ = writeln!(out, "Recommendations:");
        for recommendation in &report.recommendations {
            let _ = writeln!(out, "  - {}", recommendation);
        }
    }

    out
}

/// Summary plus factors, module table and every finding
pub fn render_verbose(report: &ReadinessReport) -> String {
    let mut out = render_summary(report);

    let factors = &report.factors;
    let _ = writeln!(out, "Factors:");
    let _ = writeln!(out, "  files processed     {:.3}", factors.files_processed_ratio);
    let _ = writeln!(out, "  modules initialized {:.3}", factors.modules_initialized_ratio);
    let _ = writeln!(out, "  consistency         {:.3}", factors.consistency_factor);
    let _ = writeln!(out, "  security            {:.3}", factors.security_factor);

    let _ = writeln!(out, "Modules:");
    for (module, summary) in &report.module_health_summary {
        let health = match summary.health {
            crate::models::HealthStatus::Healthy => "healthy",
            crate::models::HealthStatus::Unknown => "unknown",
        };
        let _ = writeln!(out, "  {:<16} {:<14} {}", module.as_str(), summary.status.as_str(), health);
    }

    let _ = writeln!(out, "Consistency checks:");
    if report.consistency_results.is_empty() {
        let _ = writeln!(out, "  (not run)");
    }
    for result in &report.consistency_results {
        let marker = match result.resolution_status {
            ResolutionStatus::Resolved => "ok",
            ResolutionStatus::Pending => "issues",
            ResolutionStatus::Failed => "failed",
        };
        let _ = writeln!(out, "  [{}] {}", marker, result.check_type);
        for issue in &result.issues_found {
            let _ = writeln!(out, "      - {}", issue.message);
        }
    }

    out
}

pub fn render_json(report: &ReadinessReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}
