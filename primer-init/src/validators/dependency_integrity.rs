//! Dependency integrity: module states agree with the registry
//!
//! Flags states whose dependency list drifted from the registry, registered
//! dependencies that are not initialized, references to unregistered
//! modules, and registry modules that have no state at all.

use super::{CheckError, ConsistencyCheck, VerificationInput};
use crate::models::{ConsistencyIssue, ModuleKind, ModuleStatus};
use std::collections::BTreeMap;

pub struct DependencyIntegrityCheck;

impl ConsistencyCheck for DependencyIntegrityCheck {
    fn check_type(&self) -> &'static str {
        "dependency_integrity"
    }

    fn run(&self, input: &VerificationInput<'_>) -> Result<Vec<ConsistencyIssue>, CheckError> {
        let statuses: BTreeMap<ModuleKind, ModuleStatus> =
            input.module_states.iter().map(|s| (s.module_id, s.status)).collect();
        let mut issues = Vec::new();

        for module in input.registry.modules() {
            if !statuses.contains_key(&module.id) {
                issues.push(ConsistencyIssue::with_subjects(
                    format!("module {} has no recorded state", module.id),
                    vec![module.id.to_string()],
                ));
            }
        }

        for state in input.module_states {
            let Some(spec) = input.registry.get(state.module_id) else {
                issues.push(ConsistencyIssue::with_subjects(
                    format!("module {} has a state but is not registered", state.module_id),
                    vec![state.module_id.to_string()],
                ));
                continue;
            };

            if state.dependencies != spec.depends_on {
                issues.push(ConsistencyIssue::with_subjects(
                    format!("module {} dependency list differs from the registry", state.module_id),
                    vec![state.module_id.to_string()],
                ));
            }

            for dep in &state.dependencies {
                match statuses.get(dep) {
                    _ if !input.registry.contains(*dep) => issues.push(ConsistencyIssue::with_subjects(
                        format!("module {} depends on unregistered module {}", state.module_id, dep),
                        vec![state.module_id.to_string(), dep.to_string()],
                    )),
                    Some(ModuleStatus::Initialized) => {}
                    Some(status) => issues.push(ConsistencyIssue::with_subjects(
                        format!("module {} depends on {} which is {}", state.module_id, dep, status),
                        vec![state.module_id.to_string(), dep.to_string()],
                    )),
                    None => issues.push(ConsistencyIssue::with_subjects(
                        format!("module {} depends on {} which has no recorded state", state.module_id, dep),
                        vec![state.module_id.to_string(), dep.to_string()],
                    )),
                }
            }
        }

        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModuleState;
    use crate::services::module_registry::{ModuleRegistry, ModuleSpec};
    use crate::validators::test_support::Fixture;
    use ModuleKind::*;

    fn initialized(id: ModuleKind, deps: Vec<ModuleKind>) -> ModuleState {
        let mut state = ModuleState::uninitialized(id, deps);
        state.status = ModuleStatus::Initialized;
        state
    }

    #[test]
    fn test_fully_initialized_builtin_is_clean() {
        let mut fixture = Fixture::default();
        fixture.module_states = fixture
            .registry
            .modules()
            .iter()
            .map(|m| initialized(m.id, m.depends_on.clone()))
            .collect();
        assert!(DependencyIntegrityCheck.run(&fixture.input()).unwrap().is_empty());
    }

    #[test]
    fn test_uninitialized_dependency_and_drift() {
        let mut fixture = Fixture::default();
        fixture.registry = ModuleRegistry::from_specs(
            "test",
            vec![
                ModuleSpec::new(Storage, vec![]),
                ModuleSpec::new(Security, vec![Storage]),
            ],
        );
        fixture.module_states = vec![
            ModuleState::uninitialized(Storage, vec![]),
            initialized(Security, vec![Storage, MemoryCore]),
        ];

        let issues = DependencyIntegrityCheck.run(&fixture.input()).unwrap();
        let messages: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "module security dependency list differs from the registry",
                "module security depends on storage which is uninitialized",
                "module security depends on unregistered module memory_core",
            ]
        );
    }

    #[test]
    fn test_missing_state_is_reported() {
        let fixture = Fixture::default();
        let issues = DependencyIntegrityCheck.run(&fixture.input()).unwrap();
        assert_eq!(issues.len(), fixture.registry.len());
    }
}
