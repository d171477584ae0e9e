use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tracing::info;

use crate::dataset::DatasetRow;
use crate::matcher::is_url_cited;
use crate::stats::{OwnedCitationSummary, RateReport, UrlCitationRate, WeekPlatformBreakdown};

/// `count / total`, defined as 0 for an empty group.
pub fn citation_rate(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Percentage rounded to two decimals, ties to even.
pub fn percent(count: usize, total: usize) -> f64 {
    (citation_rate(count, total) * 10_000.0).round_ties_even() / 100.0
}

fn group_rows(rows: &[DatasetRow]) -> BTreeMap<(&str, &str), Vec<&DatasetRow>> {
    let mut groups: BTreeMap<(&str, &str), Vec<&DatasetRow>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.week.as_str(), row.platform.as_str()))
            .or_default()
            .push(row);
    }
    groups
}

pub fn owned_citation_summary(rows: &[DatasetRow]) -> Vec<OwnedCitationSummary> {
    group_rows(rows)
        .into_iter()
        .map(|((week, platform), group)| {
            let owned_prompts: HashSet<&str> = group
                .iter()
                .filter(|row| row.flags.any_domain_cited)
                .map(|row| row.prompt.trim())
                .filter(|prompt| !prompt.is_empty())
                .collect();

            OwnedCitationSummary {
                week: week.to_string(),
                platform: platform.to_string(),
                total_rows: group.len(),
                exact_cited: group.iter().filter(|row| row.flags.exact_cited).count(),
                other_domain_cited: group.iter().filter(|row| row.flags.other_domain_cited).count(),
                unique_owned_prompts: owned_prompts.len(),
            }
        })
        .collect()
}

/// Per-URL rates. A row counts for a URL only when that URL is cited exactly
/// and the row's selected flag is set.
pub fn url_citation_rates(rows: &[DatasetRow], urls: &[String]) -> Vec<UrlCitationRate> {
    let mut results = Vec::new();
    for ((week, platform), group) in group_rows(rows) {
        let total_rows = group.len();
        for url in urls {
            let rows_cited = group
                .iter()
                .filter(|row| row.flags.exact_cited && is_url_cited(row.sources.as_deref(), url))
                .count();

            results.push(UrlCitationRate {
                week: week.to_string(),
                platform: platform.to_string(),
                url: url.clone(),
                total_rows,
                rows_cited,
                rate: citation_rate(rows_cited, total_rows),
            });
        }
    }
    results
}

pub fn breakdown(rows: &[DatasetRow]) -> Vec<WeekPlatformBreakdown> {
    group_rows(rows)
        .into_iter()
        .map(|((week, platform), group)| {
            let total_rows = group.len();
            let exact_cited = group.iter().filter(|row| row.flags.exact_cited).count();
            let any_domain_cited = group.iter().filter(|row| row.flags.any_domain_cited).count();
            let other_domain_cited = group.iter().filter(|row| row.flags.other_domain_cited).count();

            WeekPlatformBreakdown {
                week: week.to_string(),
                platform: platform.to_string(),
                exact_cited,
                any_domain_cited,
                other_domain_cited,
                total_rows,
                exact_rate_pct: percent(exact_cited, total_rows),
                any_domain_rate_pct: percent(any_domain_cited, total_rows),
                other_domain_rate_pct: percent(other_domain_cited, total_rows),
            }
        })
        .collect()
}

pub fn build_report(rows: &[DatasetRow], urls: &[String]) -> RateReport {
    let start_time = Instant::now();
    info!(
        action = "start",
        component = "rate_aggregation",
        row_count = rows.len(),
        url_count = urls.len(),
        "Calculating citation rates by week and platform"
    );

    let report = RateReport {
        owned: owned_citation_summary(rows),
        by_url: url_citation_rates(rows, urls),
    };

    info!(
        action = "complete",
        component = "rate_aggregation",
        group_count = report.owned.len(),
        url_rows = report.by_url.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Citation rates calculated"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::CitationFlags;

    fn row(week: &str, platform: &str, prompt: &str, sources: &str, flags: (bool, bool, bool)) -> DatasetRow {
        DatasetRow {
            week: week.to_string(),
            platform: platform.to_string(),
            prompt: prompt.to_string(),
            sources: Some(sources.to_string()),
            flags: CitationFlags {
                exact_cited: flags.0,
                any_domain_cited: flags.1,
                other_domain_cited: flags.2,
            },
            ..Default::default()
        }
    }

    fn sample() -> Vec<DatasetRow> {
        vec![
            row("w44", "chatgpt", "p1", "https://example.com/a", (true, true, false)),
            row("w44", "chatgpt", "p1", "https://example.com/b", (false, true, true)),
            row("w44", "chatgpt", "p2", "https://other.org", (false, false, false)),
            row("w44", "gemini", "p1", "https://example.com/a/", (true, true, false)),
            row("w45", "chatgpt", "p3", "https://example.com/a", (false, true, false)),
        ]
    }

    #[test]
    fn test_zero_total_rate_is_zero() {
        assert_eq!(citation_rate(0, 0), 0.0);
        assert_eq!(percent(3, 0), 0.0);
        assert_eq!(percent(1, 3), 33.33);
    }

    #[test]
    fn test_percent_rounds_ties_to_even() {
        assert_eq!(percent(1, 32), 3.12);
        assert_eq!(percent(3, 32), 9.38);
    }

    #[test]
    fn test_blank_prompts_are_not_owned_prompts() {
        let rows = vec![
            row("w44", "chatgpt", "p1", "https://example.com/a", (false, true, false)),
            row("w44", "chatgpt", "", "https://example.com/b", (false, true, true)),
            row("w44", "chatgpt", "   ", "https://example.com/c", (false, true, true)),
        ];
        let summary = owned_citation_summary(&rows);
        assert_eq!(summary[0].total_rows, 3);
        assert_eq!(summary[0].unique_owned_prompts, 1);
    }

    #[test]
    fn test_owned_summary_counts_distinct_prompts() {
        let summary = owned_citation_summary(&sample());
        assert_eq!(summary.len(), 3);

        let chatgpt = &summary[0];
        assert_eq!((chatgpt.week.as_str(), chatgpt.platform.as_str()), ("w44", "chatgpt"));
        assert_eq!(chatgpt.total_rows, 3);
        assert_eq!(chatgpt.exact_cited, 1);
        assert_eq!(chatgpt.other_domain_cited, 1);
        assert_eq!(chatgpt.unique_owned_prompts, 1);

        assert_eq!(summary[1].platform, "gemini");
        assert_eq!(summary[2].week, "w45");
        assert_eq!(summary[2].unique_owned_prompts, 1);
    }

    #[test]
    fn test_url_rates_require_selected_flag() {
        let urls = vec!["https://example.com/a".to_string(), "https://example.com/b".to_string()];
        let rates = url_citation_rates(&sample(), &urls);
        assert_eq!(rates.len(), 6);

        let w44_a = &rates[0];
        assert_eq!(w44_a.url, "https://example.com/a");
        assert_eq!(w44_a.rows_cited, 1);
        assert_eq!(w44_a.total_rows, 3);
        assert!((w44_a.rate - 1.0 / 3.0).abs() < 1e-12);

        // cited, but the selected flag is not set
        assert_eq!(rates[1].rows_cited, 0);

        let w45_a = rates
            .iter()
            .find(|r| r.week == "w45" && r.url.ends_with("/a"))
            .unwrap();
        assert_eq!(w45_a.rows_cited, 0);
        assert_eq!(w45_a.rate, 0.0);
    }

    #[test]
    fn test_single_url_count_never_exceeds_group_total() {
        let urls = vec!["https://example.com/a".to_string()];
        for rate in url_citation_rates(&sample(), &urls) {
            assert!(rate.rows_cited <= rate.total_rows);
            assert!(rate.rate <= 1.0);
        }
    }

    #[test]
    fn test_breakdown_rates() {
        let breakdown = breakdown(&sample());
        let chatgpt = &breakdown[0];
        assert_eq!(chatgpt.total_rows, 3);
        assert_eq!(chatgpt.any_domain_cited, 2);
        assert_eq!(chatgpt.any_domain_rate_pct, 66.67);
        assert_eq!(chatgpt.exact_rate_pct, 33.33);
    }

    #[test]
    fn test_empty_rows_produce_empty_report() {
        let report = build_report(&[], &["https://example.com".to_string()]);
        assert!(report.owned.is_empty());
        assert!(report.by_url.is_empty());
    }
}
