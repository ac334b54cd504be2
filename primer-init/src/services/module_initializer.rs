//! Module dependency initialization
//!
//! Brings registry modules up in dependency order. Each pass initializes
//! every uninitialized module whose dependencies are all registered and
//! initialized; passes repeat until one makes no progress. Modules still
//! uninitialized at that point are reported as gaps, never as errors, which
//! is what keeps cycles and dangling references from hanging or aborting
//! the run.

use super::module_registry::ModuleRegistry;
use crate::db;
use crate::models::{HealthSnapshot, ModuleKind, ModuleState, ModuleStatus};
use primer_common::Result;
use serde_json::Value;
use sqlx::SqlitePool;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Config keys every module receives regardless of prefix
pub const CROSS_CUTTING_KEYS: &[&str] = &["environment", "log_level", "timezone", "region", "debug"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GapReason {
    /// Depends on a module that is not registered
    DanglingDependency(ModuleKind),
    /// Member of a dependency cycle
    Cycle,
    /// Waiting on dependencies that never initialized
    BlockedBy(Vec<ModuleKind>),
}

/// A module left uninitialized after the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleGap {
    pub module: ModuleKind,
    pub reason: GapReason,
}

impl fmt::Display for ModuleGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            GapReason::DanglingDependency(missing) => {
                write!(f, "{} not initialized: depends on unregistered module {}", self.module, missing)
            }
            GapReason::Cycle => write!(f, "{} not initialized: part of a dependency cycle", self.module),
            GapReason::BlockedBy(deps) => {
                let names: Vec<&str> = deps.iter().map(|d| d.as_str()).collect();
                write!(f, "{} not initialized: blocked by {}", self.module, names.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct InitializationOutcome {
    /// One state per registry module, registry order
    pub states: Vec<ModuleState>,
    pub gaps: Vec<ModuleGap>,
}

/// Order in which modules can be initialized
///
/// Scan in declaration order, repeat until a pass adds nothing. Modules not
/// in the result can never initialize.
pub fn initialization_order(registry: &ModuleRegistry) -> Vec<ModuleKind> {
    let mut done: BTreeSet<ModuleKind> = BTreeSet::new();
    let mut order = Vec::with_capacity(registry.len());

    loop {
        let mut progressed = false;
        for module in registry.modules() {
            if done.contains(&module.id) {
                continue;
            }
            let ready = module
                .depends_on
                .iter()
                .all(|dep| registry.contains(*dep) && done.contains(dep));
            if ready {
                done.insert(module.id);
                order.push(module.id);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    order
}

/// Config entries that belong to `module`
///
/// Keys equal to the module id or prefixed `<id>.` / `<id>_`, plus the
/// cross-cutting keys.
pub fn effective_config(module: ModuleKind, config: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    let id = module.as_str();
    let dotted = format!("{}.", id);
    let underscored = format!("{}_", id);

    config
        .iter()
        .filter(|(key, _)| {
            let lower = key.to_lowercase();
            lower == id
                || lower.starts_with(&dotted)
                || lower.starts_with(&underscored)
                || CROSS_CUTTING_KEYS.contains(&lower.as_str())
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

pub struct ModuleDependencyInitializer {
    db: SqlitePool,
    registry: Arc<ModuleRegistry>,
}

impl ModuleDependencyInitializer {
    pub fn new(db: SqlitePool, registry: Arc<ModuleRegistry>) -> Self {
        Self { db, registry }
    }

    /// Initialize every reachable module and persist each state change
    pub async fn initialize(&self, config: &BTreeMap<String, Value>) -> Result<InitializationOutcome> {
        let mut states: BTreeMap<ModuleKind, ModuleState> = BTreeMap::new();

        // Each run starts from a clean slate
        for module in self.registry.modules() {
            let state = ModuleState::uninitialized(module.id, module.depends_on.clone());
            db::save_module_state(&self.db, &state).await?;
            states.insert(module.id, state);
        }

        for module_id in initialization_order(&self.registry) {
            let Some(state) = states.get_mut(&module_id) else {
                continue;
            };

            state.status = ModuleStatus::Initializing;
            state.last_updated = primer_common::time::now();
            db::save_module_state(&self.db, state).await?;

            let now = primer_common::time::now();
            state.config = effective_config(module_id, config);
            state.health = HealthSnapshot::healthy_at(now);
            state.status = ModuleStatus::Initialized;
            state.last_updated = now;
            db::save_module_state(&self.db, state).await?;

            tracing::debug!(module = %module_id, config_keys = state.config.len(), "Module initialized");
        }

        let gaps = self.find_gaps(&states);
        for gap in &gaps {
            tracing::warn!("Module gap: {}", gap);
        }

        let states: Vec<ModuleState> = self
            .registry
            .modules()
            .iter()
            .filter_map(|m| states.remove(&m.id))
            .collect();

        tracing::info!(
            initialized = states.iter().filter(|s| s.is_initialized()).count(),
            registered = self.registry.len(),
            gaps = gaps.len(),
            "Module initialization finished"
        );

        Ok(InitializationOutcome { states, gaps })
    }

    fn find_gaps(&self, states: &BTreeMap<ModuleKind, ModuleState>) -> Vec<ModuleGap> {
        let cyclic = self.registry.cyclic_members();

        self.registry
            .modules()
            .iter()
            .filter(|m| states.get(&m.id).map(|s| !s.is_initialized()).unwrap_or(true))
            .map(|m| {
                let reason = if let Some(missing) = m.depends_on.iter().find(|d| !self.registry.contains(**d)) {
                    GapReason::DanglingDependency(*missing)
                } else if cyclic.contains(&m.id) {
                    GapReason::Cycle
                } else {
                    let blocked = m
                        .depends_on
                        .iter()
                        .copied()
                        .filter(|d| states.get(d).map(|s| !s.is_initialized()).unwrap_or(true))
                        .collect();
                    GapReason::BlockedBy(blocked)
                };
                ModuleGap { module: m.id, reason }
            })
            .collect()
    }
}
