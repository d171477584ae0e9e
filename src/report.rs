use std::collections::{BTreeMap, BTreeSet};

use crate::pipeline::{CombineOutcome, RatesOutcome};
use crate::stats::UrlCitationRate;
use crate::utils::{format_number, format_percent};

const RULE: &str = "================================================================================";
const PREVIEW_LIMIT: usize = 10;

fn heading(title: &str) {
    println!("\n{RULE}\n{title}\n{RULE}");
}

fn print_url_preview(urls: &[String]) {
    for (i, url) in urls.iter().take(PREVIEW_LIMIT).enumerate() {
        println!("  {}. {}", i + 1, url);
    }
    if urls.len() > PREVIEW_LIMIT {
        println!("  ... and {} more URLs", urls.len() - PREVIEW_LIMIT);
    }
}

/// Left-aligned text table.
fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    println!("{}", format_row(headers, &widths));
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        println!("{}", format_row(&cells, &widths));
    }
}

fn format_row(cells: &[&str], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<w$}", cell, w = *width))
        .collect::<Vec<_>>()
        .join("  ")
}

pub fn print_combine_results(outcome: &CombineOutcome) {
    heading(&format!("SELECTED FOLDER: {}", outcome.folder_name));

    println!("\nUsing {} target URL(s):", outcome.targets.urls().len());
    print_url_preview(outcome.targets.urls());
    println!(
        "\nTarget domains for matching: {}",
        outcome.targets.domains().iter().cloned().collect::<Vec<_>>().join(", ")
    );

    heading("COLUMN DEFINITIONS");
    println!("  * selected_url_cited? = Y if an exact target URL is cited");
    println!("  * any_url_from_domain = Y if ANY URL from a target domain is cited");
    println!("  * any_url_from_domain_excluding_specified_URLs = Y if a target-domain URL");
    println!("    other than the listed target URLs is cited");

    println!("\nProcessed files:");
    for file in &outcome.files {
        println!("  {}", file.file_name);
        println!(
            "    Week: {}, Platform: {}, Rows: {}",
            file.week,
            file.platform,
            format_number(file.rows)
        );
        println!(
            "    Selected URL Citations: {}, Any Domain URLs: {}, Other Domain URLs: {}",
            format_number(file.exact_cited),
            format_number(file.any_domain_cited),
            format_number(file.other_domain_cited)
        );
    }
    for skipped in &outcome.skipped {
        println!("  Skipped {skipped}");
    }

    heading("COMBINED DATA");
    let dates = outcome.dataset.execution_dates();
    match dates.as_slice() {
        [] => {}
        [first, .., last] if dates.len() > 10 => {
            println!("Execution dates: {} unique, {} to {}", dates.len(), first, last);
        }
        _ => println!("Execution dates: {}", dates.join(", ")),
    }
    println!(
        "Duplicate Prompt+Answer rows removed: {}",
        format_number(outcome.duplicates_removed)
    );

    let (exact, any, other) = outcome.dataset.count_flags();
    println!("Total rows: {}", format_number(outcome.dataset.len()));
    println!("Selected URL citations: {}", format_number(exact));
    println!("Any domain URL citations: {}", format_number(any));
    println!("Other domain URL citations (excluding specified): {}", format_number(other));
    println!("Weeks: {}", outcome.dataset.weeks().join(", "));
    println!("Platforms: {}", outcome.dataset.platforms().join(", "));

    heading("BREAKDOWN BY WEEK AND PLATFORM");
    let rows: Vec<Vec<String>> = outcome
        .breakdown
        .iter()
        .map(|b| {
            vec![
                b.week.clone(),
                b.platform.clone(),
                b.exact_cited.to_string(),
                b.any_domain_cited.to_string(),
                b.other_domain_cited.to_string(),
                b.total_rows.to_string(),
                format!("{:.2}", b.exact_rate_pct),
                format!("{:.2}", b.any_domain_rate_pct),
                format!("{:.2}", b.other_domain_rate_pct),
            ]
        })
        .collect();
    print_table(
        &[
            "Week",
            "Platform",
            "Selected_URL_Citations",
            "Any_Domain_URLs",
            "Other_Domain_URLs",
            "Total_prompt_executions",
            "Selected_URL_Rate_%",
            "Any_Domain_Rate_%",
            "Other_Domain_Rate_%",
        ],
        &rows,
    );

    println!("\nData saved to: {}", outcome.combined_path.display());
    println!("Target URLs saved to: {}", outcome.urls_path.display());

    if let Some(rates) = &outcome.rates {
        print_rate_results(rates);
    }
    if let Some(error) = &outcome.rates_error {
        println!("\nCitation rate calculation failed: {error}");
        println!("Rerun the rates command against {}", outcome.combined_path.display());
    }
}

/// Platform × week grid of one URL's citation rate.
fn print_url_pivot(rates: &[&UrlCitationRate]) {
    let weeks: BTreeSet<&str> = rates.iter().map(|r| r.week.as_str()).collect();
    let mut grid: BTreeMap<&str, BTreeMap<&str, f64>> = BTreeMap::new();
    for rate in rates {
        grid.entry(rate.platform.as_str())
            .or_default()
            .insert(rate.week.as_str(), rate.rate);
    }

    let mut headers = vec!["Platform"];
    headers.extend(weeks.iter().copied());
    let rows: Vec<Vec<String>> = grid
        .iter()
        .map(|(platform, by_week)| {
            let mut row = vec![platform.to_string()];
            row.extend(
                weeks
                    .iter()
                    .map(|week| format_percent(by_week.get(week).copied().unwrap_or(0.0))),
            );
            row
        })
        .collect();
    print_table(&headers, &rows);
}

pub fn print_rate_results(outcome: &RatesOutcome) {
    heading("CITATION RATE CALCULATION");
    println!("Analyzing: {}", outcome.input.display());
    println!("Folder: {}", outcome.folder_name);
    println!("URLs source: {}", outcome.urls_source.display());
    println!("\nURLs to analyze ({}):", outcome.urls.len());
    print_url_preview(&outcome.urls);
    println!("\nTotal rows in dataset: {}", format_number(outcome.dataset.len()));
    println!("Weeks: {}", outcome.dataset.weeks().join(", "));
    println!("Platforms: {}", outcome.dataset.platforms().join(", "));

    heading("OWNED CITATIONS SUMMARY (Any domain URL cited)");
    println!("  * Total_prompt_executions = Total prompts for week/platform");
    println!("  * Selected_URL_Citations = Rows with target URLs cited");
    println!("  * any_url_from_domain_excluding_specified_URLs_Citations = Rows with OTHER domain URLs cited");
    println!("  * Unique_Prompts_with_Owned_Citations = UNIQUE prompts with ANY domain URL cited\n");
    let rows: Vec<Vec<String>> = outcome
        .report
        .owned
        .iter()
        .map(|s| {
            vec![
                s.week.clone(),
                s.platform.clone(),
                s.total_rows.to_string(),
                s.exact_cited.to_string(),
                s.other_domain_cited.to_string(),
                s.unique_owned_prompts.to_string(),
            ]
        })
        .collect();
    print_table(
        &[
            "Week",
            "Platform",
            "Total_prompt_executions",
            "Selected_URL_Citations",
            "any_url_from_domain_excluding_specified_URLs_Citations",
            "Unique_Prompts_with_Owned_Citations",
        ],
        &rows,
    );

    heading("PLATFORM BREAKDOWN: Citation Rates by Platform and Week");
    for url in &outcome.urls {
        println!("\nURL: {url}");
        let url_rates: Vec<&UrlCitationRate> =
            outcome.report.by_url.iter().filter(|r| &r.url == url).collect();
        if url_rates.is_empty() {
            println!("  No data available");
            continue;
        }
        print_url_pivot(&url_rates);
    }

    println!("\nResults saved to:");
    println!("  {}", outcome.summary_path.display());
    println!("  {}", outcome.by_url_path.display());
}
