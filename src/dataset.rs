use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use tracing::{info, warn};

use crate::matcher::{CitationFlags, CitationTargets};

pub const PROMPT_COLUMN: &str = "Prompt";
pub const ANSWER_COLUMN: &str = "Answer";
pub const SOURCES_COLUMN: &str = "Sources";
pub const EXECUTION_DATE_COLUMN: &str = "Execution Date";
pub const WEEK_COLUMN: &str = "week";
pub const PLATFORM_COLUMN: &str = "platform";
pub const EXACT_COLUMN: &str = "selected_url_cited?";
pub const ANY_DOMAIN_COLUMN: &str = "any_url_from_domain";
pub const OTHER_DOMAIN_COLUMN: &str = "any_url_from_domain_excluding_specified_URLs";

/// Columns appended after the source columns, in output order.
pub const DERIVED_COLUMNS: [&str; 5] = [
    WEEK_COLUMN,
    PLATFORM_COLUMN,
    EXACT_COLUMN,
    ANY_DOMAIN_COLUMN,
    OTHER_DOMAIN_COLUMN,
];

/// One platform response.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatasetRow {
    pub week: String,
    pub platform: String,
    pub prompt: String,
    pub answer: Option<String>,
    pub sources: Option<String>,
    pub execution_date: Option<String>,
    /// Remaining source columns as `(header, value)`.
    pub extra: Vec<(String, String)>,
    pub flags: CitationFlags,
}

impl DatasetRow {
    /// Value of a source column by header name.
    pub fn column(&self, header: &str) -> Option<&str> {
        match header {
            PROMPT_COLUMN => Some(self.prompt.as_str()),
            ANSWER_COLUMN => self.answer.as_deref(),
            SOURCES_COLUMN => self.sources.as_deref(),
            EXECUTION_DATE_COLUMN => self.execution_date.as_deref(),
            _ => self
                .extra
                .iter()
                .find(|(name, _)| name == header)
                .map(|(_, value)| value.as_str()),
        }
    }
}

/// Rows gathered from one or more input files.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Source column headers, union of all inputs in first-seen order.
    pub headers: Vec<String>,
    pub rows: Vec<DatasetRow>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, header: &str) -> bool {
        self.headers.iter().any(|h| h == header)
    }

    /// Append another dataset, merging headers.
    pub fn extend(&mut self, other: Dataset) {
        for header in other.headers {
            if !self.has_column(&header) {
                self.headers.push(header);
            }
        }
        self.rows.extend(other.rows);
    }

    /// Derive the citation flags of every row from its Sources cell.
    pub fn annotate(&mut self, targets: &CitationTargets) {
        if !self.has_column(SOURCES_COLUMN) {
            warn!(
                action = "annotate",
                component = "row_annotator",
                row_count = self.rows.len(),
                "Dataset has no Sources column, all citation flags set to N"
            );
            for row in &mut self.rows {
                row.flags = CitationFlags::default();
            }
            return;
        }
        for row in &mut self.rows {
            row.flags = targets.flags(row.sources.as_deref());
        }
    }

    /// Drop rows repeating an earlier (prompt, answer, week, platform). Returns
    /// the number removed; skipped when there is no Answer column.
    pub fn dedupe(&mut self) -> usize {
        if !self.has_column(ANSWER_COLUMN) {
            warn!(
                action = "skip",
                component = "dedupe",
                "Answer column not found, skipping duplicate check"
            );
            return 0;
        }

        let before = self.rows.len();
        let mut seen = HashSet::new();
        self.rows.retain(|row| {
            seen.insert((
                row.prompt.clone(),
                row.answer.clone(),
                row.week.clone(),
                row.platform.clone(),
            ))
        });
        let removed = before - self.rows.len();

        info!(
            action = "complete",
            component = "dedupe",
            rows_before = before,
            rows_removed = removed,
            "Duplicate Prompt+Answer check completed"
        );
        removed
    }

    /// Rewrite Execution Date values as `YYYY-MM-DD`; unparseable values are cleared.
    pub fn cleanse_execution_dates(&mut self) {
        if !self.has_column(EXECUTION_DATE_COLUMN) {
            return;
        }
        for row in &mut self.rows {
            row.execution_date = row.execution_date.as_deref().and_then(cleanse_date);
        }
    }

    /// Distinct execution dates, sorted.
    pub fn execution_dates(&self) -> Vec<&str> {
        let mut dates: Vec<&str> = self
            .rows
            .iter()
            .filter_map(|row| row.execution_date.as_deref())
            .collect();
        dates.sort_unstable();
        dates.dedup();
        dates
    }

    pub fn count_flags(&self) -> (usize, usize, usize) {
        self.rows.iter().fold((0, 0, 0), |(exact, any, other), row| {
            (
                exact + usize::from(row.flags.exact_cited),
                any + usize::from(row.flags.any_domain_cited),
                other + usize::from(row.flags.other_domain_cited),
            )
        })
    }

    pub fn weeks(&self) -> Vec<&str> {
        sorted_distinct(self.rows.iter().map(|row| row.week.as_str()))
    }

    pub fn platforms(&self) -> Vec<&str> {
        sorted_distinct(self.rows.iter().map(|row| row.platform.as_str()))
    }
}

fn sorted_distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut values: Vec<&str> = values.collect();
    values.sort_unstable();
    values.dedup();
    values
}

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M:%S"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

fn cleanse_date(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let date = DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        })?;

    Some(date.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(prompt: &str, answer: &str, week: &str, platform: &str) -> DatasetRow {
        DatasetRow {
            week: week.to_string(),
            platform: platform.to_string(),
            prompt: prompt.to_string(),
            answer: Some(answer.to_string()),
            ..Default::default()
        }
    }

    fn dataset(rows: Vec<DatasetRow>) -> Dataset {
        Dataset {
            headers: vec![PROMPT_COLUMN.to_string(), ANSWER_COLUMN.to_string()],
            rows,
        }
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        let mut first = row("p1", "a1", "w44", "chatgpt");
        first.extra.push(("Region".to_string(), "US".to_string()));
        let mut ds = dataset(vec![
            first.clone(),
            row("p1", "a1", "w44", "chatgpt"),
            row("p1", "a2", "w44", "chatgpt"),
        ]);

        assert_eq!(ds.dedupe(), 1);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows[0], first);
        assert_eq!(ds.rows[1].answer.as_deref(), Some("a2"));
    }

    #[test]
    fn test_dedupe_is_scoped_to_week_and_platform() {
        let mut ds = dataset(vec![
            row("p1", "a1", "w44", "chatgpt"),
            row("p1", "a1", "w45", "chatgpt"),
            row("p1", "a1", "w44", "gemini"),
        ]);
        assert_eq!(ds.dedupe(), 0);
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn test_dedupe_skipped_without_answer_column() {
        let mut ds = Dataset {
            headers: vec![PROMPT_COLUMN.to_string()],
            rows: vec![row("p1", "a1", "w44", "x"), row("p1", "a1", "w44", "x")],
        };
        assert_eq!(ds.dedupe(), 0);
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_annotate_is_idempotent() {
        let targets = CitationTargets::new(vec!["https://example.com/a".to_string()]);
        let mut cited = row("p1", "a1", "w44", "chatgpt");
        cited.sources = Some("https://example.com/a/; https://example.com/b".to_string());
        let mut ds = Dataset {
            headers: vec![PROMPT_COLUMN.to_string(), SOURCES_COLUMN.to_string()],
            rows: vec![cited, row("p2", "a2", "w44", "chatgpt")],
        };

        ds.annotate(&targets);
        let first_pass = ds.rows.clone();
        ds.annotate(&targets);

        assert_eq!(ds.rows, first_pass);
        assert_eq!(
            ds.rows[0].flags,
            CitationFlags {
                exact_cited: true,
                any_domain_cited: true,
                other_domain_cited: true,
            }
        );
        assert_eq!(ds.rows[1].flags, CitationFlags::default());
        assert_eq!(ds.count_flags(), (1, 1, 1));
    }

    #[test]
    fn test_annotate_without_sources_column_clears_flags() {
        let targets = CitationTargets::new(vec!["https://example.com/a".to_string()]);
        let mut stale = row("p1", "a1", "w44", "chatgpt");
        stale.flags = CitationFlags {
            exact_cited: true,
            any_domain_cited: true,
            other_domain_cited: false,
        };
        let mut ds = dataset(vec![stale, row("p2", "a2", "w44", "chatgpt")]);
        assert!(!ds.has_column(SOURCES_COLUMN));

        ds.annotate(&targets);

        assert_eq!(ds.len(), 2);
        assert!(ds.rows.iter().all(|r| r.flags == CitationFlags::default()));
        assert_eq!(ds.count_flags(), (0, 0, 0));
    }

    #[test]
    fn test_extend_merges_headers_in_first_seen_order() {
        let mut ds = Dataset {
            headers: vec!["Prompt".to_string(), "Sources".to_string()],
            rows: vec![row("p1", "a", "w1", "x")],
        };
        ds.extend(Dataset {
            headers: vec!["Prompt".to_string(), "Region".to_string(), "Sources".to_string()],
            rows: vec![row("p2", "a", "w1", "x")],
        });
        assert_eq!(ds.headers, vec!["Prompt", "Sources", "Region"]);
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_cleanse_dates() {
        assert_eq!(cleanse_date("2025-10-27").as_deref(), Some("2025-10-27"));
        assert_eq!(cleanse_date("2025-10-27 14:03:00").as_deref(), Some("2025-10-27"));
        assert_eq!(cleanse_date("10/27/2025").as_deref(), Some("2025-10-27"));
        assert_eq!(cleanse_date("2025-10-27T14:03:00Z").as_deref(), Some("2025-10-27"));
        assert_eq!(cleanse_date("yesterday"), None);
        assert_eq!(cleanse_date(""), None);
    }

    #[test]
    fn test_execution_dates_are_distinct_and_sorted() {
        let mut a = row("p1", "a", "w1", "x");
        a.execution_date = Some("2025-10-28".to_string());
        let mut b = row("p2", "a", "w1", "x");
        b.execution_date = Some("2025-10-27".to_string());
        let c = a.clone();
        let ds = dataset(vec![a, b, c]);
        assert_eq!(ds.execution_dates(), vec!["2025-10-27", "2025-10-28"]);
    }

    #[test]
    fn test_column_lookup() {
        let mut r = row("p1", "a1", "w1", "x");
        r.extra.push(("Region".to_string(), "US".to_string()));
        assert_eq!(r.column("Prompt"), Some("p1"));
        assert_eq!(r.column("Region"), Some("US"));
        assert_eq!(r.column("Sources"), None);
    }
}
