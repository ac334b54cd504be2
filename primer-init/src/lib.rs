//! primer-init library interface
//!
//! The initialization pipeline behind the `primer` binary: walk a root
//! folder, extract facts per file, aggregate them into shared memory
//! structures, bring modules up in dependency order, verify consistency and
//! score readiness. Exposed as a library so integration tests can drive it.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
pub mod validators;

pub use crate::config::{CliOverrides, ExtractorKind, PipelineSettings};
pub use crate::error::{PipelineError, PipelineResult};
pub use crate::models::ReadinessReport;
pub use crate::services::PipelineOrchestrator;

/// Process exit code for a report whose gate says "ready"
pub const EXIT_READY: u8 = 0;

/// Process exit code for an unrecoverable pipeline error
pub const EXIT_FAILURE: u8 = 1;

/// Process exit code for a report that needs human approval
pub const EXIT_APPROVAL_REQUIRED: u8 = 2;

/// Exit code the CLI reports for a finished run
pub fn exit_code_for(report: &ReadinessReport) -> u8 {
    if report.approval_required {
        EXIT_APPROVAL_REQUIRED
    } else {
        EXIT_READY
    }
}
