//! Test Helper Utilities
//!
//! Shared utilities for primer-init integration tests

#![allow(dead_code)]

pub mod db_utils;
pub mod extractors;
pub mod fixtures;

pub use db_utils::{create_test_db, test_orchestrator, test_settings};
pub use extractors::{CancellingExtractor, FailingExtractor, SlowExtractor, StaticExtractor, TreeMutatingExtractor};
pub use fixtures::{write_file, write_tree};
