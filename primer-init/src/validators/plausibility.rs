//! Plausibility: monetary claims about the same subject should roughly agree
//!
//! Scans the aggregated strategy lines for labelled amounts (revenue, budget,
//! cost, ...). Amounts sharing a label and currency that spread wider than the
//! allowed variance band are flagged.

use super::{CheckError, ConsistencyCheck, VerificationInput};
use crate::models::ConsistencyIssue;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Allowed relative spread between the smallest and largest claim
pub const DEFAULT_VARIANCE: f64 = 0.5;

static AMOUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\$|€|£|\busd\s?|\beur\s?|\bgbp\s?)(\d[\d,]*(?:\.\d+)?)\s*(k|mm|m|bn|b|thousand|million|billion)?\b",
    )
    .unwrap()
});

static LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(revenue|budget|costs?|price|pricing|funding|valuation|profit|spend|spending|salary|salaries|arr|mrr|sales)\b",
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq)]
struct Claim {
    label: String,
    currency: &'static str,
    amount: f64,
    line: String,
}

pub struct PlausibilityCheck {
    variance: f64,
}

impl PlausibilityCheck {
    pub fn new(variance: f64) -> Self {
        Self {
            variance: variance.max(0.0),
        }
    }
}

impl ConsistencyCheck for PlausibilityCheck {
    fn check_type(&self) -> &'static str {
        "plausibility"
    }

    fn run(&self, input: &VerificationInput<'_>) -> Result<Vec<ConsistencyIssue>, CheckError> {
        let mut groups: BTreeMap<(String, &'static str), Vec<Claim>> = BTreeMap::new();
        for line in input.aggregates.strategies() {
            for claim in claims_in(&line) {
                groups
                    .entry((claim.label.clone(), claim.currency))
                    .or_default()
                    .push(claim);
            }
        }

        let mut issues = Vec::new();
        for ((label, currency), claims) in groups {
            let (Some(low), Some(high)) = (
                claims.iter().min_by(|a, b| a.amount.total_cmp(&b.amount)),
                claims.iter().max_by(|a, b| a.amount.total_cmp(&b.amount)),
            ) else {
                continue;
            };
            if high.amount / low.amount > 1.0 + self.variance {
                issues.push(ConsistencyIssue::with_subjects(
                    format!(
                        "{} claims disagree: {} {} vs {} {} (allowed spread {:.0}%)",
                        label,
                        currency,
                        format_amount(low.amount),
                        currency,
                        format_amount(high.amount),
                        self.variance * 100.0
                    ),
                    vec![low.line.clone(), high.line.clone()],
                ));
            }
        }

        Ok(issues)
    }
}

/// Labelled, positive amounts in one line
///
/// The label is the nearest keyword before the amount.
fn claims_in(line: &str) -> Vec<Claim> {
    AMOUNT
        .captures_iter(line)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            let label = LABEL
                .find_iter(&line[..whole.start()])
                .last()
                .map(|m| normalize_label(m.as_str()))?;
            let currency = currency_of(captures.get(1)?.as_str());
            let number: f64 = captures.get(2)?.as_str().replace(',', "").parse().ok()?;
            let multiplier = captures.get(3).map(|m| multiplier_of(m.as_str())).unwrap_or(1.0);
            let amount = number * multiplier;
            if amount <= 0.0 {
                return None;
            }
            Some(Claim {
                label,
                currency,
                amount,
                line: line.to_string(),
            })
        })
        .collect()
}

fn normalize_label(raw: &str) -> String {
    match raw.to_lowercase().as_str() {
        "costs" => "cost".to_string(),
        "pricing" => "price".to_string(),
        "spending" => "spend".to_string(),
        "salaries" => "salary".to_string(),
        other => other.to_string(),
    }
}

fn currency_of(raw: &str) -> &'static str {
    match raw.trim().to_lowercase().as_str() {
        "€" | "eur" => "EUR",
        "£" | "gbp" => "GBP",
        _ => "USD",
    }
}

fn multiplier_of(raw: &str) -> f64 {
    match raw.to_lowercase().as_str() {
        "k" | "thousand" => 1e3,
        "m" | "mm" | "million" => 1e6,
        "b" | "bn" | "billion" => 1e9,
        _ => 1.0,
    }
}

fn format_amount(amount: f64) -> String {
    if amount >= 1e9 {
        format!("{:.1}B", amount / 1e9)
    } else if amount >= 1e6 {
        format!("{:.1}M", amount / 1e6)
    } else if amount >= 1e3 {
        format!("{:.1}K", amount / 1e3)
    } else {
        format!("{:.0}", amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractedFacts, FileCategory, FileRecord, FileStatus};
    use crate::services::memory_aggregator::compute_aggregates;
    use crate::validators::test_support::Fixture;
    use chrono::Utc;

    fn fixture_with_strategies(lines: &[&str]) -> Fixture {
        let record = FileRecord {
            path: "plan.md".to_string(),
            size: 1,
            category: FileCategory::Documentation,
            content_hash: String::new(),
            extracted_facts: ExtractedFacts {
                strategies: lines.iter().map(|l| l.to_string()).collect(),
                ..Default::default()
            },
            status: FileStatus::Completed,
            timestamp: Utc::now(),
        };
        Fixture {
            aggregates: compute_aggregates(&[record]),
            ..Default::default()
        }
    }

    #[test]
    fn test_claim_parsing() {
        let claims = claims_in("Our revenue target is $1.5M and the marketing budget is €200k");
        assert_eq!(claims.len(), 2);
        assert_eq!(claims[0].label, "revenue");
        assert_eq!(claims[0].currency, "USD");
        assert_eq!(claims[0].amount, 1_500_000.0);
        assert_eq!(claims[1].label, "budget");
        assert_eq!(claims[1].currency, "EUR");
        assert_eq!(claims[1].amount, 200_000.0);
    }

    #[test]
    fn test_unlabelled_amounts_are_ignored() {
        assert!(claims_in("We raised $5M last year").is_empty());
    }

    #[test]
    fn test_wide_spread_is_flagged() {
        let fixture = fixture_with_strategies(&[
            "Goal: revenue of $1M by year end",
            "Plan for revenue of $5M by year end",
        ]);
        let issues = PlausibilityCheck::new(DEFAULT_VARIANCE).run(&fixture.input()).unwrap();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.starts_with("revenue claims disagree"));
        assert!(issues[0].message.contains("USD 1.0M vs USD 5.0M"));
    }

    #[test]
    fn test_claims_within_band_pass() {
        let fixture = fixture_with_strategies(&[
            "Goal: revenue of $1M",
            "Target revenue $1,200,000",
            "Plan: budget $10k",
        ]);
        assert!(PlausibilityCheck::new(DEFAULT_VARIANCE)
            .run(&fixture.input())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_currencies_are_not_compared() {
        let fixture = fixture_with_strategies(&["Goal: budget $10k", "Plan: budget €90k"]);
        assert!(PlausibilityCheck::new(DEFAULT_VARIANCE)
            .run(&fixture.input())
            .unwrap()
            .is_empty());
    }
}
