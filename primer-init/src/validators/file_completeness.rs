//! File completeness: every expected file exists and every walked file was
//! processed

use super::{CheckError, ConsistencyCheck, VerificationInput};
use crate::models::{ConsistencyIssue, FileStatus};

pub struct FileCompletenessCheck {
    /// Root-relative paths that must be present
    expected: Vec<String>,
}

impl FileCompletenessCheck {
    pub fn new(expected: Vec<String>) -> Self {
        let expected = expected
            .into_iter()
            .map(|p| p.trim_start_matches("./").replace('\\', "/"))
            .filter(|p| !p.is_empty())
            .collect();
        Self { expected }
    }
}

impl ConsistencyCheck for FileCompletenessCheck {
    fn check_type(&self) -> &'static str {
        "file_completeness"
    }

    fn run(&self, input: &VerificationInput<'_>) -> Result<Vec<ConsistencyIssue>, CheckError> {
        let mut issues = Vec::new();

        for expected in &self.expected {
            if !input.walked_paths.contains(expected) {
                issues.push(ConsistencyIssue::with_subjects(
                    format!("expected file {} was not found", expected),
                    vec![expected.clone()],
                ));
            }
        }

        for record in input.file_records {
            if !input.walked_paths.contains(&record.path) {
                continue;
            }
            match record.status {
                FileStatus::Completed => {}
                FileStatus::ExtractionFailed => issues.push(ConsistencyIssue::with_subjects(
                    format!("extraction failed for {}", record.path),
                    vec![record.path.clone()],
                )),
                FileStatus::Skipped => issues.push(ConsistencyIssue::with_subjects(
                    format!("{} was skipped (unreadable or over the size limit)", record.path),
                    vec![record.path.clone()],
                )),
                FileStatus::Pending => issues.push(ConsistencyIssue::with_subjects(
                    format!("{} was never processed", record.path),
                    vec![record.path.clone()],
                )),
            }
        }

        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractedFacts, FileCategory, FileRecord};
    use crate::validators::test_support::Fixture;
    use chrono::Utc;

    fn record(path: &str, status: FileStatus) -> FileRecord {
        FileRecord {
            path: path.to_string(),
            size: 1,
            category: FileCategory::Documentation,
            content_hash: String::new(),
            extracted_facts: ExtractedFacts::default(),
            status,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_missing_expected_file_is_reported() {
        let mut fixture = Fixture::default();
        fixture.walked_paths.insert("README.md".to_string());
        fixture.file_records.push(record("README.md", FileStatus::Completed));

        let check = FileCompletenessCheck::new(vec!["./README.md".to_string(), "docs/plan.md".to_string()]);
        let issues = check.run(&fixture.input()).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].subjects, vec!["docs/plan.md".to_string()]);
    }

    #[test]
    fn test_unprocessed_walked_files_are_reported() {
        let mut fixture = Fixture::default();
        for (path, status) in [
            ("a.md", FileStatus::Completed),
            ("b.md", FileStatus::ExtractionFailed),
            ("c.bin", FileStatus::Skipped),
        ] {
            fixture.walked_paths.insert(path.to_string());
            fixture.file_records.push(record(path, status));
        }
        // left over from an earlier run over a different tree
        fixture.file_records.push(record("gone.md", FileStatus::Pending));

        let issues = FileCompletenessCheck::new(Vec::new()).run(&fixture.input()).unwrap();
        let subjects: Vec<&str> = issues.iter().map(|i| i.subjects[0].as_str()).collect();
        assert_eq!(subjects, vec!["b.md", "c.bin"]);
    }
}
