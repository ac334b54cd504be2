//! Module registry
//!
//! Process-lifetime, read-only description of which modules exist and what
//! each depends on. The built-in registry is acyclic; an override loaded
//! from `[[modules]]` in the config file may not be, so [`ModuleRegistry`]
//! records its defects instead of refusing to load. The initializer leaves
//! defective modules uninitialized and reports them as gaps.

use crate::models::ModuleKind;
use primer_common::config::{ModuleEntry, TomlConfig};
use primer_common::{Error, Result};
use std::collections::BTreeSet;
use std::fmt;

/// Version label of the built-in registry
pub const BUILTIN_REGISTRY_VERSION: &str = "builtin-1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpec {
    pub id: ModuleKind,
    pub depends_on: Vec<ModuleKind>,
}

impl ModuleSpec {
    pub fn new(id: ModuleKind, depends_on: Vec<ModuleKind>) -> Self {
        Self { id, depends_on }
    }
}

/// Structural problem found while loading a registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryDefect {
    /// `module` depends on a module the registry does not contain
    DanglingDependency { module: ModuleKind, missing: ModuleKind },
    /// Modules that (transitively) depend on each other
    Cycle { members: Vec<ModuleKind> },
    /// A module was declared more than once; the first declaration is kept
    Duplicate(ModuleKind),
}

impl fmt::Display for RegistryDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryDefect::DanglingDependency { module, missing } => {
                write!(f, "module {} depends on unregistered module {}", module, missing)
            }
            RegistryDefect::Cycle { members } => {
                let names: Vec<&str> = members.iter().map(|m| m.as_str()).collect();
                write!(f, "dependency cycle between {}", names.join(", "))
            }
            RegistryDefect::Duplicate(module) => write!(f, "module {} declared more than once", module),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    version: String,
    modules: Vec<ModuleSpec>,
    defects: Vec<RegistryDefect>,
}

impl ModuleRegistry {
    /// Built-in dependency graph
    ///
    /// ```text
    /// storage
    /// ├── security ──────────┐
    /// └── memory_core ───────┤
    ///     └── knowledge_index│
    ///                        integrations
    /// orchestrator ← knowledge_index, integrations
    /// reporting    ← orchestrator
    /// ```
    pub fn builtin() -> Self {
        use ModuleKind::*;
        Self::from_specs(
            BUILTIN_REGISTRY_VERSION,
            vec![
                ModuleSpec::new(Storage, vec![]),
                ModuleSpec::new(Security, vec![Storage]),
                ModuleSpec::new(MemoryCore, vec![Storage]),
                ModuleSpec::new(KnowledgeIndex, vec![MemoryCore]),
                ModuleSpec::new(Integrations, vec![Security, MemoryCore]),
                ModuleSpec::new(Orchestrator, vec![KnowledgeIndex, Integrations]),
                ModuleSpec::new(Reporting, vec![Orchestrator]),
            ],
        )
    }

    /// Build and validate a registry; never fails, defects are recorded
    pub fn from_specs(version: impl Into<String>, specs: Vec<ModuleSpec>) -> Self {
        let mut modules: Vec<ModuleSpec> = Vec::with_capacity(specs.len());
        let mut defects = Vec::new();

        for spec in specs {
            if modules.iter().any(|m| m.id == spec.id) {
                defects.push(RegistryDefect::Duplicate(spec.id));
            } else {
                modules.push(spec);
            }
        }

        let mut registry = Self {
            version: version.into(),
            modules,
            defects,
        };
        let structural = registry.validate();
        registry.defects.extend(structural);

        for defect in &registry.defects {
            tracing::warn!(registry = %registry.version, "Module registry defect: {}", defect);
        }
        registry
    }

    /// Parse `[[modules]]` entries
    ///
    /// Module ids outside the closed [`ModuleKind`] set are a config error.
    pub fn from_entries(version: impl Into<String>, entries: &[ModuleEntry]) -> Result<Self> {
        let parse = |id: &str| {
            ModuleKind::parse(id).ok_or_else(|| Error::Config(format!("Unknown module id in registry: {}", id)))
        };

        let specs = entries
            .iter()
            .map(|entry| {
                let id = parse(entry.id.as_str())?;
                let depends_on = entry.depends_on.iter().map(|d| parse(d.as_str())).collect::<Result<Vec<_>>>()?;
                Ok(ModuleSpec::new(id, depends_on))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::from_specs(version, specs))
    }

    /// Built-in registry unless the config file declares `[[modules]]`
    pub fn from_config(config: &TomlConfig) -> Result<Self> {
        if config.modules.is_empty() {
            return Ok(Self::builtin());
        }
        let version = config
            .registry_version
            .clone()
            .unwrap_or_else(|| "config".to_string());
        Self::from_entries(version, &config.modules)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Modules in declaration order
    pub fn modules(&self) -> &[ModuleSpec] {
        &self.modules
    }

    pub fn get(&self, id: ModuleKind) -> Option<&ModuleSpec> {
        self.modules.iter().find(|m| m.id == id)
    }

    pub fn contains(&self, id: ModuleKind) -> bool {
        self.get(id).is_some()
    }

    pub fn dependencies_of(&self, id: ModuleKind) -> &[ModuleKind] {
        self.get(id).map(|m| m.depends_on.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn defects(&self) -> &[RegistryDefect] {
        &self.defects
    }

    /// Modules that can reach themselves through dependency edges
    pub fn cyclic_members(&self) -> BTreeSet<ModuleKind> {
        self.modules
            .iter()
            .map(|m| m.id)
            .filter(|id| self.reaches_from_deps(*id, *id))
            .collect()
    }

    /// Dangling references and cycles
    pub fn validate(&self) -> Vec<RegistryDefect> {
        let mut defects = Vec::new();

        for module in &self.modules {
            for dep in &module.depends_on {
                if !self.contains(*dep) {
                    defects.push(RegistryDefect::DanglingDependency {
                        module: module.id,
                        missing: *dep,
                    });
                }
            }
        }

        let mut remaining = self.cyclic_members();
        while let Some(first) = remaining.iter().next().copied() {
            let members: Vec<ModuleKind> = remaining
                .iter()
                .copied()
                .filter(|m| *m == first || (self.reaches_from_deps(first, *m) && self.reaches_from_deps(*m, first)))
                .collect();
            for member in &members {
                remaining.remove(member);
            }
            defects.push(RegistryDefect::Cycle { members });
        }

        defects
    }

    /// True when `target` is reachable from `start` via at least one edge
    fn reaches_from_deps(&self, start: ModuleKind, target: ModuleKind) -> bool {
        let mut stack: Vec<ModuleKind> = self.dependencies_of(start).to_vec();
        let mut seen = BTreeSet::new();
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if seen.insert(current) {
                stack.extend(self.dependencies_of(current).iter().copied());
            }
        }
        false
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ModuleKind::*;

    #[test]
    fn test_builtin_registry_is_sound() {
        let registry = ModuleRegistry::builtin();
        assert_eq!(registry.len(), 7);
        assert!(registry.defects().is_empty());
        assert!(registry.cyclic_members().is_empty());
        assert_eq!(registry.dependencies_of(Integrations), &[Security, MemoryCore]);
    }

    #[test]
    fn test_builtin_dependencies_are_declared_before_dependents() {
        let registry = ModuleRegistry::builtin();
        for (index, module) in registry.modules().iter().enumerate() {
            for dep in &module.depends_on {
                let dep_index = registry.modules().iter().position(|m| m.id == *dep).unwrap();
                assert!(dep_index < index, "{} declared after {}", dep, module.id);
            }
        }
    }

    #[test]
    fn test_cycle_is_recorded_not_fatal() {
        let registry = ModuleRegistry::from_specs(
            "test",
            vec![
                ModuleSpec::new(Storage, vec![]),
                ModuleSpec::new(Security, vec![MemoryCore]),
                ModuleSpec::new(MemoryCore, vec![Security]),
                ModuleSpec::new(Reporting, vec![Security]),
            ],
        );

        assert_eq!(
            registry.cyclic_members().into_iter().collect::<Vec<_>>(),
            vec![Security, MemoryCore]
        );
        assert_eq!(
            registry.defects(),
            &[RegistryDefect::Cycle {
                members: vec![Security, MemoryCore]
            }]
        );
    }

    #[test]
    fn test_dangling_dependency_is_recorded() {
        let registry = ModuleRegistry::from_specs(
            "test",
            vec![ModuleSpec::new(Reporting, vec![Orchestrator])],
        );
        assert_eq!(
            registry.defects(),
            &[RegistryDefect::DanglingDependency {
                module: Reporting,
                missing: Orchestrator
            }]
        );
    }

    #[test]
    fn test_duplicate_keeps_first_declaration() {
        let registry = ModuleRegistry::from_specs(
            "test",
            vec![
                ModuleSpec::new(Storage, vec![]),
                ModuleSpec::new(Storage, vec![Security]),
            ],
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.dependencies_of(Storage).is_empty());
        assert_eq!(registry.defects(), &[RegistryDefect::Duplicate(Storage)]);
    }

    #[test]
    fn test_from_entries_rejects_unknown_ids() {
        let entries = vec![ModuleEntry {
            id: "billing".to_string(),
            depends_on: vec![],
        }];
        assert!(matches!(
            ModuleRegistry::from_entries("test", &entries),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_from_config_defaults_to_builtin() {
        let registry = ModuleRegistry::from_config(&TomlConfig::default()).unwrap();
        assert_eq!(registry.version(), BUILTIN_REGISTRY_VERSION);

        let config: TomlConfig = toml::from_str(
            r#"
            registry_version = "lab-2"

            [[modules]]
            id = "storage"

            [[modules]]
            id = "security"
            depends_on = ["storage"]
            "#,
        )
        .unwrap();
        let registry = ModuleRegistry::from_config(&config).unwrap();
        assert_eq!(registry.version(), "lab-2");
        assert_eq!(registry.len(), 2);
        assert!(registry.defects().is_empty());
    }
}
