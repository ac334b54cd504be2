//! Content extraction seam
//!
//! A [`ContentExtractor`] turns a file's text into [`ExtractedFacts`]. The
//! pipeline only sees the trait; which concrete extractor runs is a
//! configuration choice (`noop`, `rule`, `http`).
//!
//! Extractors must be safe to call concurrently. Failures are reported as
//! [`ExtractionError`]; the caller decides how a failure maps onto the
//! record status.

use crate::models::ExtractedFacts;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Characters handed to the extractor per file unless configured otherwise
pub const DEFAULT_MAX_LENGTH: usize = 4000;

/// Longest single fact line kept
const MAX_FACT_CHARS: usize = 500;

/// Nesting depth flattened from structured configuration files
const MAX_CONFIG_DEPTH: usize = 4;

/// One extraction call
///
/// Serialized as the request body of the HTTP extractor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRequest {
    pub path: String,
    pub content: String,
    pub max_length: usize,
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[async_trait]
pub trait ContentExtractor: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractedFacts, ExtractionError>;
}

/// Always returns empty facts
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopExtractor;

#[async_trait]
impl ContentExtractor for NoopExtractor {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn extract(&self, _request: ExtractionRequest) -> Result<ExtractedFacts, ExtractionError> {
        Ok(ExtractedFacts::default())
    }
}

static REQUIREMENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(must|shall|required|requirements?)\b").unwrap());

static STRATEGY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(strategy|strategic|plan|planned|goals?|targets?|roadmap|objectives?)\b").unwrap()
});

static URL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?://[^\s"'<>()\[\]{}`]+"#).unwrap());

static ASSIGNMENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:export\s+)?([A-Za-z_][A-Za-z0-9_.\-]*)\s*[=:]\s*(.*)$").unwrap()
});

static SECTION_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[([A-Za-z0-9_.\-]+)\]$").unwrap());

/// Deterministic, offline extractor driven by line patterns
///
/// - requirement lines contain must/shall/required
/// - strategy lines mention a plan, goal, target, roadmap or objective
/// - integration points are the URLs found anywhere in the text
/// - configs come from structured config files (JSON, TOML, `.env`/INI-style
///   assignments, top-level YAML scalars); secret-looking keys are dropped
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleExtractor;

impl RuleExtractor {
    pub fn extract_sync(&self, request: &ExtractionRequest) -> ExtractedFacts {
        let text = truncate_chars(&request.content, request.max_length);
        let mut facts = ExtractedFacts::default();

        for line in text.lines() {
            let fact = clean_line(line);
            if fact.is_empty() {
                continue;
            }
            if REQUIREMENT_PATTERN.is_match(fact) {
                push_unique(&mut facts.requirements, truncate_chars(fact, MAX_FACT_CHARS));
            }
            if STRATEGY_PATTERN.is_match(fact) {
                push_unique(&mut facts.strategies, truncate_chars(fact, MAX_FACT_CHARS));
            }
        }

        for url in URL_PATTERN.find_iter(text) {
            let url = url.as_str().trim_end_matches(['.', ',', ';', ':', '!', '?']);
            push_unique(&mut facts.integration_points, url);
        }

        facts.configs = extract_configs(&request.path, text);
        facts
    }
}

#[async_trait]
impl ContentExtractor for RuleExtractor {
    fn name(&self) -> &'static str {
        "rule"
    }

    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractedFacts, ExtractionError> {
        Ok(self.extract_sync(&request))
    }
}

/// Keys whose values must never be copied into facts, issues or logs
pub fn is_secret_key(key: &str) -> bool {
    let key = key.to_lowercase();
    [
        "password",
        "passwd",
        "secret",
        "token",
        "api_key",
        "apikey",
        "api-key",
        "access_key",
        "private_key",
        "credential",
    ]
    .iter()
    .any(|marker| key.contains(marker))
}

/// Longest prefix of `text` holding at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

fn clean_line(line: &str) -> &str {
    line.trim()
        .trim_start_matches(['-', '*', '#', '>', '+'])
        .trim()
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|existing| existing == value) {
        list.push(value.to_string());
    }
}

fn extension_of(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path).to_lowercase();
    if name == ".env" || name.starts_with(".env.") {
        return "env".to_string();
    }
    name.rsplit_once('.').map(|(_, ext)| ext.to_string()).unwrap_or_default()
}

fn extract_configs(path: &str, text: &str) -> BTreeMap<String, Value> {
    let mut configs = BTreeMap::new();
    match extension_of(path).as_str() {
        "json" => {
            if let Ok(value) = serde_json::from_str::<Value>(text) {
                flatten_into(&mut configs, "", &value, 0);
            }
        }
        "toml" => {
            if let Ok(value) = toml::from_str::<toml::Value>(text) {
                if let Ok(value) = serde_json::to_value(value) {
                    flatten_into(&mut configs, "", &value, 0);
                }
            }
        }
        "env" | "ini" | "cfg" | "conf" | "properties" => parse_assignments(&mut configs, text),
        "yaml" | "yml" => parse_top_level_yaml(&mut configs, text),
        _ => {}
    }
    configs.retain(|key, _| !is_secret_key(key));
    configs
}

fn flatten_into(configs: &mut BTreeMap<String, Value>, prefix: &str, value: &Value, depth: usize) {
    match value {
        Value::Object(map) if depth < MAX_CONFIG_DEPTH => {
            for (key, child) in map {
                let full_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(configs, &full_key, child, depth + 1);
            }
        }
        _ if !prefix.is_empty() => {
            configs.insert(prefix.to_string(), value.clone());
        }
        _ => {}
    }
}

fn parse_assignments(configs: &mut BTreeMap<String, Value>, text: &str) {
    let mut section = String::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(captures) = SECTION_PATTERN.captures(line) {
            section = captures[1].to_string();
            continue;
        }
        if let Some(captures) = ASSIGNMENT_PATTERN.captures(line) {
            let key = if section.is_empty() {
                captures[1].to_string()
            } else {
                format!("{}.{}", section, &captures[1])
            };
            configs.insert(key, scalar_value(&captures[2]));
        }
    }
}

fn parse_top_level_yaml(configs: &mut BTreeMap<String, Value>, text: &str) {
    for line in text.lines() {
        if line.starts_with(char::is_whitespace) || line.trim_start().starts_with('#') {
            continue;
        }
        if let Some((key, raw)) = line.split_once(':') {
            let key = key.trim();
            let raw = raw.trim();
            if key.is_empty() || raw.is_empty() || key.contains(' ') {
                continue;
            }
            configs.insert(key.to_string(), scalar_value(raw));
        }
    }
}

/// Typed JSON value for a raw scalar: bool, integer, float, else string
fn scalar_value(raw: &str) -> Value {
    let raw = raw.trim();
    let unquoted = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')));
    if let Some(text) = unquoted {
        return Value::String(text.to_string());
    }

    let without_comment = raw.split(" #").next().unwrap_or(raw).trim();
    match without_comment {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => {
            if let Ok(n) = other.parse::<i64>() {
                Value::from(n)
            } else if let Ok(f) = other.parse::<f64>() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(other.to_string()))
            } else {
                Value::String(other.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(path: &str, content: &str) -> ExtractionRequest {
        ExtractionRequest {
            path: path.to_string(),
            content: content.to_string(),
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    #[tokio::test]
    async fn test_noop_returns_empty_facts() {
        let facts = NoopExtractor.extract(request("a.md", "The system must boot")).await.unwrap();
        assert!(facts.is_empty());
    }

    #[test]
    fn test_requirement_and_strategy_lines() {
        let text = "# Plan\n- The service must respond within 200ms\n- Our goal is 10k users by Q3\nplain line\n";
        let facts = RuleExtractor.extract_sync(&request("docs/plan.md", text));
        assert_eq!(facts.requirements, vec!["The service must respond within 200ms".to_string()]);
        assert_eq!(facts.strategies, vec!["Plan".to_string(), "Our goal is 10k users by Q3".to_string()]);
        assert!(facts.configs.is_empty());
    }

    #[test]
    fn test_urls_become_integration_points() {
        let text = "Webhook: https://hooks.example.com/in.\nSee (https://docs.example.com/api) and https://hooks.example.com/in";
        let facts = RuleExtractor.extract_sync(&request("README.md", text));
        assert_eq!(
            facts.integration_points,
            vec![
                "https://hooks.example.com/in".to_string(),
                "https://docs.example.com/api".to_string()
            ]
        );
    }

    #[test]
    fn test_json_configs_are_flattened_without_secrets() {
        let text = r#"{"port": 8080, "db": {"host": "localhost", "password": "hunter2"}, "debug": true}"#;
        let facts = RuleExtractor.extract_sync(&request("config/app.json", text));
        assert_eq!(facts.configs.get("port"), Some(&json!(8080)));
        assert_eq!(facts.configs.get("db.host"), Some(&json!("localhost")));
        assert_eq!(facts.configs.get("debug"), Some(&json!(true)));
        assert!(!facts.configs.contains_key("db.password"));
    }

    #[test]
    fn test_toml_and_ini_configs() {
        let toml_facts = RuleExtractor.extract_sync(&request("app.toml", "port = 9000\n[server]\nhost = \"0.0.0.0\"\n"));
        assert_eq!(toml_facts.configs.get("port"), Some(&json!(9000)));
        assert_eq!(toml_facts.configs.get("server.host"), Some(&json!("0.0.0.0")));

        let ini_facts = RuleExtractor.extract_sync(&request("app.ini", "; comment\n[cache]\nttl = 30\nmode=lru\n"));
        assert_eq!(ini_facts.configs.get("cache.ttl"), Some(&json!(30)));
        assert_eq!(ini_facts.configs.get("cache.mode"), Some(&json!("lru")));
    }

    #[test]
    fn test_yaml_top_level_scalars_only() {
        let text = "port: 8080\nname: 'primer'\nnested:\n  inner: 1\n";
        let facts = RuleExtractor.extract_sync(&request("app.yml", text));
        assert_eq!(facts.configs.get("port"), Some(&json!(8080)));
        assert_eq!(facts.configs.get("name"), Some(&json!("primer")));
        assert!(!facts.configs.contains_key("inner"));
        assert!(!facts.configs.contains_key("nested"));
    }

    #[test]
    fn test_source_files_yield_no_configs() {
        let facts = RuleExtractor.extract_sync(&request("src/main.rs", "let port = 8080;"));
        assert!(facts.configs.is_empty());
    }

    #[test]
    fn test_content_truncated_to_max_length() {
        let mut req = request("notes.md", "héllo must\nthe plan must wait");
        req.max_length = 10;
        let facts = RuleExtractor.extract_sync(&req);
        assert_eq!(facts.requirements, vec!["héllo must".to_string()]);
        assert!(facts.strategies.is_empty());
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("ééé", 2), "éé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn test_secret_key_detection() {
        assert!(is_secret_key("OPENAI_API_KEY"));
        assert!(is_secret_key("db.password"));
        assert!(is_secret_key("GITHUB_TOKEN"));
        assert!(is_secret_key("AWS_ACCESS_KEY_ID"));
        assert!(!is_secret_key("DATABASE_HOST"));
        assert!(!is_secret_key("port"));
    }
}
