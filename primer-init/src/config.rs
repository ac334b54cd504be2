//! Resolved pipeline settings
//!
//! Every field is layered CLI > `PRIMER_*` environment > TOML > default and
//! validated once, before a run starts.

use crate::services::content_extractor::DEFAULT_MAX_LENGTH;
use crate::services::file_walker::{DEFAULT_DATA_PREFIX_BYTES, DEFAULT_EXCLUDES, DEFAULT_MAX_FILE_SIZE};
use crate::services::readiness_scorer::{ScoringPolicy, DEFAULT_APPROVAL_THRESHOLD, DEFAULT_MAX_ISSUES};
use crate::validators::plausibility::DEFAULT_VARIANCE;
use primer_common::config::{env_list_override, env_override, TomlConfig};
use primer_common::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_EXTRACT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_STORE_LOCK_WAIT_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorKind {
    Noop,
    Rule,
    Http,
}

impl ExtractorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractorKind::Noop => "noop",
            ExtractorKind::Rule => "rule",
            ExtractorKind::Http => "http",
        }
    }
}

impl FromStr for ExtractorKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "noop" => Ok(ExtractorKind::Noop),
            "rule" => Ok(ExtractorKind::Rule),
            "http" => Ok(ExtractorKind::Http),
            other => Err(format!("unknown extractor '{}' (expected noop, rule or http)", other)),
        }
    }
}

impl fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorSettings {
    pub kind: ExtractorKind,
    pub endpoint: Option<String>,
    pub max_length: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub exclude: Vec<String>,
    pub max_file_size: u64,
    pub concurrency: usize,
    pub approval_threshold: f64,
    pub max_issues: usize,
    pub extract_timeout: Duration,
    pub data_prefix_bytes: usize,
    pub expected_files: Vec<String>,
    pub plausibility_variance: f64,
    pub store_lock_wait_ms: u64,
    pub extractor: ExtractorSettings,
}

/// Values given on the command line; `None` means "not given"
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub exclude: Option<Vec<String>>,
    pub max_file_size: Option<u64>,
    pub concurrency: Option<usize>,
    pub approval_threshold: Option<f64>,
    pub max_issues: Option<usize>,
    pub extract_timeout_secs: Option<u64>,
    pub expected_files: Option<Vec<String>>,
    pub extractor: Option<ExtractorKind>,
    pub extractor_endpoint: Option<String>,
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
}

fn layer<T>(cli: Option<T>, env: Option<T>, toml: Option<T>, default: impl FnOnce() -> T) -> T {
    cli.or(env).or(toml).unwrap_or_else(default)
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            concurrency: default_concurrency(),
            approval_threshold: DEFAULT_APPROVAL_THRESHOLD,
            max_issues: DEFAULT_MAX_ISSUES,
            extract_timeout: Duration::from_secs(DEFAULT_EXTRACT_TIMEOUT_SECS),
            data_prefix_bytes: DEFAULT_DATA_PREFIX_BYTES,
            expected_files: Vec::new(),
            plausibility_variance: DEFAULT_VARIANCE,
            store_lock_wait_ms: DEFAULT_STORE_LOCK_WAIT_MS,
            extractor: ExtractorSettings {
                kind: ExtractorKind::Rule,
                endpoint: None,
                max_length: DEFAULT_MAX_LENGTH,
            },
        }
    }
}

impl PipelineSettings {
    /// Layer CLI, environment and TOML over the defaults, then validate
    pub fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> Result<Self> {
        let defaults = Self::default();
        let pipeline = &toml.pipeline;
        let extractor = &toml.extractor;

        let toml_kind = extractor
            .kind
            .as_deref()
            .map(ExtractorKind::from_str)
            .transpose()
            .map_err(Error::Config)?;

        let settings = Self {
            exclude: layer(
                cli.exclude.clone(),
                env_list_override("PRIMER_EXCLUDE"),
                pipeline.exclude.clone(),
                || defaults.exclude.clone(),
            ),
            max_file_size: layer(
                cli.max_file_size,
                env_override("PRIMER_MAX_FILE_SIZE")?,
                pipeline.max_file_size,
                || defaults.max_file_size,
            ),
            concurrency: layer(
                cli.concurrency,
                env_override("PRIMER_CONCURRENCY")?,
                pipeline.concurrency,
                || defaults.concurrency,
            ),
            approval_threshold: layer(
                cli.approval_threshold,
                env_override("PRIMER_APPROVAL_THRESHOLD")?,
                pipeline.approval_threshold,
                || defaults.approval_threshold,
            ),
            max_issues: layer(
                cli.max_issues,
                env_override("PRIMER_MAX_ISSUES")?,
                pipeline.max_issues,
                || defaults.max_issues,
            ),
            extract_timeout: Duration::from_secs(layer(
                cli.extract_timeout_secs,
                env_override("PRIMER_EXTRACT_TIMEOUT_SECS")?,
                pipeline.extract_timeout_secs,
                || DEFAULT_EXTRACT_TIMEOUT_SECS,
            )),
            data_prefix_bytes: layer(
                None,
                env_override("PRIMER_DATA_PREFIX_BYTES")?,
                pipeline.data_prefix_bytes,
                || defaults.data_prefix_bytes,
            ),
            expected_files: layer(
                cli.expected_files.clone(),
                env_list_override("PRIMER_EXPECTED_FILES"),
                pipeline.expected_files.clone(),
                Vec::new,
            ),
            plausibility_variance: layer(
                None,
                env_override("PRIMER_PLAUSIBILITY_VARIANCE")?,
                pipeline.plausibility_variance,
                || defaults.plausibility_variance,
            ),
            store_lock_wait_ms: layer(
                None,
                env_override("PRIMER_STORE_LOCK_WAIT_MS")?,
                pipeline.store_lock_wait_ms,
                || defaults.store_lock_wait_ms,
            ),
            extractor: ExtractorSettings {
                kind: layer(cli.extractor, env_override("PRIMER_EXTRACTOR")?, toml_kind, || {
                    defaults.extractor.kind
                }),
                endpoint: cli
                    .extractor_endpoint
                    .clone()
                    .or(env_override("PRIMER_EXTRACTOR_ENDPOINT")?)
                    .or(extractor.endpoint.clone()),
                max_length: layer(
                    None,
                    env_override("PRIMER_EXTRACTOR_MAX_LENGTH")?,
                    extractor.max_length,
                    || defaults.extractor.max_length,
                ),
            },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.approval_threshold) {
            return Err(Error::Config(format!(
                "approval_threshold must be within [0, 1], got {}",
                self.approval_threshold
            )));
        }
        if self.concurrency == 0 {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }
        if self.plausibility_variance.is_nan() || self.plausibility_variance < 0.0 {
            return Err(Error::Config(format!(
                "plausibility_variance must be >= 0, got {}",
                self.plausibility_variance
            )));
        }
        if self.extract_timeout.is_zero() {
            return Err(Error::Config("extract timeout must be at least 1 second".to_string()));
        }
        if self.extractor.max_length == 0 {
            return Err(Error::Config("extractor max_length must be at least 1".to_string()));
        }
        if self.extractor.kind == ExtractorKind::Http && self.extractor.endpoint.is_none() {
            return Err(Error::Config("the http extractor requires an endpoint".to_string()));
        }
        Ok(())
    }

    pub fn scoring_policy(&self) -> ScoringPolicy {
        ScoringPolicy {
            approval_threshold: self.approval_threshold,
            max_issues: self.max_issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const ENV_VARS: &[&str] = &[
        "PRIMER_EXCLUDE",
        "PRIMER_MAX_FILE_SIZE",
        "PRIMER_CONCURRENCY",
        "PRIMER_APPROVAL_THRESHOLD",
        "PRIMER_MAX_ISSUES",
        "PRIMER_EXTRACTOR",
        "PRIMER_EXTRACTOR_ENDPOINT",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_any_layer() {
        clear_env();
        let settings = PipelineSettings::resolve(&CliOverrides::default(), &TomlConfig::default()).unwrap();
        assert_eq!(settings.approval_threshold, 0.90);
        assert_eq!(settings.max_issues, 5);
        assert_eq!(settings.max_file_size, 10 * 1024 * 1024);
        assert_eq!(settings.extractor.kind, ExtractorKind::Rule);
        assert!(settings.exclude.contains(&".git".to_string()));
        assert!(settings.concurrency >= 1);
    }

    #[test]
    #[serial]
    fn test_priority_cli_over_env_over_toml() {
        clear_env();
        let toml: TomlConfig = toml::from_str(
            r#"
            [pipeline]
            max_issues = 7
            concurrency = 3
            approval_threshold = 0.5
            "#,
        )
        .unwrap();

        std::env::set_var("PRIMER_CONCURRENCY", "6");
        std::env::set_var("PRIMER_APPROVAL_THRESHOLD", "0.6");
        let cli = CliOverrides {
            approval_threshold: Some(0.75),
            ..Default::default()
        };

        let settings = PipelineSettings::resolve(&cli, &toml).unwrap();
        clear_env();

        assert_eq!(settings.max_issues, 7);
        assert_eq!(settings.concurrency, 6);
        assert_eq!(settings.approval_threshold, 0.75);
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_rejected() {
        clear_env();
        let cli = CliOverrides {
            approval_threshold: Some(1.5),
            ..Default::default()
        };
        assert!(matches!(
            PipelineSettings::resolve(&cli, &TomlConfig::default()),
            Err(Error::Config(_))
        ));

        std::env::set_var("PRIMER_CONCURRENCY", "many");
        let result = PipelineSettings::resolve(&CliOverrides::default(), &TomlConfig::default());
        clear_env();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    #[serial]
    fn test_http_extractor_needs_endpoint() {
        clear_env();
        let cli = CliOverrides {
            extractor: Some(ExtractorKind::Http),
            ..Default::default()
        };
        assert!(PipelineSettings::resolve(&cli, &TomlConfig::default()).is_err());

        let cli = CliOverrides {
            extractor: Some(ExtractorKind::Http),
            extractor_endpoint: Some("http://127.0.0.1:9/extract".to_string()),
            ..Default::default()
        };
        let settings = PipelineSettings::resolve(&cli, &TomlConfig::default()).unwrap();
        assert_eq!(settings.extractor.kind, ExtractorKind::Http);
    }

    #[test]
    fn test_extractor_kind_parsing() {
        assert_eq!("RULE".parse::<ExtractorKind>(), Ok(ExtractorKind::Rule));
        assert!("magic".parse::<ExtractorKind>().is_err());
    }
}
