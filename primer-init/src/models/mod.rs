//! Data model for the initialization pipeline

pub mod consistency;
pub mod file_record;
pub mod memory_structure;
pub mod module_state;
pub mod pipeline_run;
pub mod report;

pub use consistency::{ConsistencyCheckResult, ConsistencyIssue, ResolutionStatus};
pub use file_record::{ExtractedFacts, FileCategory, FileRecord, FileStatus};
pub use memory_structure::{MemoryStructure, StructureType, ALL_FILES};
pub use module_state::{HealthSnapshot, HealthStatus, ModuleKind, ModuleState, ModuleStatus};
pub use pipeline_run::{PipelineRun, StateTransition};
pub use primer_common::events::PipelineState;
pub use report::{ModuleSummary, ReadinessReport, ScoreFactors, SecurityStatus};
