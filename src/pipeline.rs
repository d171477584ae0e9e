use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::aggregate::{breakdown, build_report};
use crate::dataset::Dataset;
use crate::labels::{extract_platform, extract_week};
use crate::matcher::CitationTargets;
use crate::stats::{RateReport, WeekPlatformBreakdown};
use crate::{store, targets};

pub const TARGETS_PREFIX: &str = "brandpresence-target-urls-";
pub const RATES_PREFIX: &str = "citation_rates_by_url-";
pub const FALLBACK_URLS_FILE: &str = "urls.csv";

static TIMESTAMP_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_(\d{8}_\d{6})\.csv$").expect("valid timestamp regex"));

pub fn timestamp_now() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[derive(Debug, Clone)]
pub struct CombineOptions {
    pub data_dir: PathBuf,
    pub urls_file: PathBuf,
    pub output_root: PathBuf,
    pub timestamp: Option<String>,
    pub run_rates: bool,
}

/// Per-file annotation counts.
#[derive(Debug, Clone)]
pub struct FileSummary {
    pub file_name: String,
    pub week: String,
    pub platform: String,
    pub rows: usize,
    pub exact_cited: usize,
    pub any_domain_cited: usize,
    pub other_domain_cited: usize,
}

#[derive(Debug)]
pub struct CombineOutcome {
    pub folder_name: String,
    pub timestamp: String,
    pub targets: CitationTargets,
    pub files: Vec<FileSummary>,
    pub skipped: Vec<String>,
    pub dataset: Dataset,
    pub duplicates_removed: usize,
    pub breakdown: Vec<WeekPlatformBreakdown>,
    pub output_dir: PathBuf,
    pub combined_path: PathBuf,
    pub urls_path: PathBuf,
    pub rates: Option<RatesOutcome>,
    /// Why the chained rate calculation failed, if it did.
    pub rates_error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RatesOptions {
    pub input: Option<PathBuf>,
    pub urls_file: Option<PathBuf>,
    pub output_root: PathBuf,
    pub report_dir: Option<PathBuf>,
    pub folder_name: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug)]
pub struct RatesOutcome {
    pub input: PathBuf,
    pub folder_name: String,
    pub urls: Vec<String>,
    pub urls_source: PathBuf,
    pub dataset: Dataset,
    pub report: RateReport,
    pub summary_path: PathBuf,
    pub by_url_path: PathBuf,
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Name of the data folder, resolving `.` and `..` through the filesystem.
pub fn resolve_folder_name(data_dir: &Path) -> Result<String> {
    let name = file_name_of(data_dir);
    if !name.is_empty() {
        return Ok(name);
    }
    let canonical = fs::canonicalize(data_dir)
        .with_context(|| format!("Failed to resolve data folder {:?}", data_dir))?;
    let name = file_name_of(&canonical);
    if name.is_empty() {
        anyhow::bail!("Could not derive a folder name from {:?}", data_dir);
    }
    Ok(name)
}

/// Sidecar target URL list written next to a combined dataset.
pub fn target_urls_path_for(combined: &Path) -> PathBuf {
    let name = file_name_of(combined);
    let rest = name.strip_prefix(store::COMBINED_PREFIX).unwrap_or(&name);
    combined.with_file_name(format!("{TARGETS_PREFIX}{rest}"))
}

/// Folder name and timestamp recovered from a combined dataset's file name.
pub fn parse_combined_name(path: &Path) -> (String, Option<String>) {
    let name = file_name_of(path);
    let rest = name.strip_prefix(store::COMBINED_PREFIX).unwrap_or(&name);

    match TIMESTAMP_SUFFIX_RE.captures(rest) {
        Some(caps) => {
            let timestamp = caps[1].to_string();
            let folder = rest[..caps.get(0).map_or(rest.len(), |m| m.start())].to_string();
            (folder, Some(timestamp))
        }
        None => (rest.trim_end_matches(".csv").to_string(), None),
    }
}

/// Stage one: annotate every export in the data folder and write the combined dataset.
pub fn combine(options: &CombineOptions) -> Result<CombineOutcome> {
    let total_start_time = Instant::now();
    info!(action = "start", component = "combine", data_dir = ?options.data_dir, "Starting brand presence data combination");

    let folder_name = resolve_folder_name(&options.data_dir)?;
    let timestamp = options.timestamp.clone().unwrap_or_else(timestamp_now);

    let targets = CitationTargets::new(targets::load_target_urls(&options.urls_file)?);
    info!(
        action = "resolve",
        component = "target_domains",
        domains = ?targets.domains(),
        "Target domains for matching"
    );

    let input_files = store::list_input_files(&options.data_dir)?;
    if input_files.is_empty() {
        anyhow::bail!("No CSV files found in {:?}", options.data_dir);
    }

    let mut dataset = Dataset::default();
    let mut files = Vec::new();
    let mut skipped = Vec::new();

    for path in &input_files {
        let file_name = file_name_of(path);
        let Some(week) = extract_week(path) else {
            warn!(action = "skip", component = "combine", file = %file_name, "Could not extract week from file name");
            skipped.push(file_name);
            continue;
        };
        let platform = extract_platform(path);

        let mut file_data = match store::read_platform_file(path, &week, &platform) {
            Ok(data) => data,
            Err(e) => {
                warn!(action = "skip", component = "combine", file = %file_name, error = %e, "Failed to read file");
                skipped.push(file_name);
                continue;
            }
        };
        file_data.annotate(&targets);

        let (exact_cited, any_domain_cited, other_domain_cited) = file_data.count_flags();
        info!(
            action = "annotate",
            component = "combine",
            file = %file_name,
            week = %week,
            platform = %platform,
            rows = file_data.len(),
            exact_cited,
            any_domain_cited,
            other_domain_cited,
            "File annotated"
        );
        files.push(FileSummary {
            file_name,
            week,
            platform,
            rows: file_data.len(),
            exact_cited,
            any_domain_cited,
            other_domain_cited,
        });
        dataset.extend(file_data);
    }

    if files.is_empty() {
        anyhow::bail!("No data to combine in {:?}", options.data_dir);
    }

    dataset.cleanse_execution_dates();
    let duplicates_removed = dataset.dedupe();

    let fallback_name = options
        .urls_file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "targets".to_string());
    let output_dir = options
        .output_root
        .join(targets::output_domain_name(&targets, &fallback_name));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output folder {:?}", output_dir))?;

    let combined_path =
        output_dir.join(format!("{}{}_{}.csv", store::COMBINED_PREFIX, folder_name, timestamp));
    let urls_path = target_urls_path_for(&combined_path);
    store::write_combined(&combined_path, &dataset)?;
    targets::write_target_urls(&urls_path, targets.urls())?;

    let breakdown = breakdown(&dataset.rows);

    // Stage one output is already on disk; a stage-two failure is reported, not fatal
    let mut rates_error = None;
    let rates = if options.run_rates {
        match rates(&RatesOptions {
            input: Some(combined_path.clone()),
            urls_file: Some(urls_path.clone()),
            output_root: options.output_root.clone(),
            report_dir: Some(output_dir.clone()),
            folder_name: Some(folder_name.clone()),
            timestamp: Some(timestamp.clone()),
        }) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                let message = format!("{e:#}");
                error!(action = "fail", component = "rates", error = %message, "Citation rate calculation failed");
                rates_error = Some(message);
                None
            }
        }
    } else {
        None
    };

    info!(
        action = "complete",
        component = "combine",
        row_count = dataset.len(),
        duplicates_removed,
        duration_ms = total_start_time.elapsed().as_millis(),
        "Combination completed"
    );

    Ok(CombineOutcome {
        folder_name,
        timestamp,
        targets,
        files,
        skipped,
        dataset,
        duplicates_removed,
        breakdown,
        output_dir,
        combined_path,
        urls_path,
        rates,
        rates_error,
    })
}

fn resolve_urls_source(options: &RatesOptions, input: &Path) -> Result<PathBuf> {
    if let Some(path) = &options.urls_file {
        return Ok(path.clone());
    }
    let sidecar = target_urls_path_for(input);
    if sidecar.exists() {
        return Ok(sidecar);
    }
    let fallback = PathBuf::from(FALLBACK_URLS_FILE);
    if fallback.exists() {
        warn!(action = "fallback", component = "rates", file_path = ?fallback, "Target URL list not found next to dataset, using fallback");
        return Ok(fallback);
    }
    anyhow::bail!(
        "Could not find target URLs: expected {:?} or {:?}",
        sidecar,
        fallback
    )
}

/// Stage two: compute citation-rate reports from a combined dataset.
pub fn rates(options: &RatesOptions) -> Result<RatesOutcome> {
    let total_start_time = Instant::now();

    let input = match &options.input {
        Some(path) => path.clone(),
        None => {
            let latest = store::find_latest_combined(&options.output_root)?.with_context(|| {
                format!(
                    "No {}*.csv file found under {:?}; run combine first",
                    store::COMBINED_PREFIX,
                    options.output_root
                )
            })?;
            warn!(action = "discover", component = "rates", file_path = ?latest, "No input file specified, using most recent");
            latest
        }
    };

    let (parsed_folder, parsed_timestamp) = parse_combined_name(&input);
    let folder_name = options.folder_name.clone().unwrap_or(parsed_folder);
    let timestamp = options.timestamp.clone().or(parsed_timestamp);

    let urls_source = resolve_urls_source(options, &input)?;
    let urls = targets::load_target_urls(&urls_source)?;
    let dataset = store::read_combined(&input)?;

    let report = build_report(&dataset.rows, &urls);

    let report_dir = options
        .report_dir
        .clone()
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| options.output_root.clone());
    fs::create_dir_all(&report_dir)
        .with_context(|| format!("Failed to create report folder {:?}", report_dir))?;

    let base = match &timestamp {
        Some(ts) => format!("{RATES_PREFIX}{folder_name}_{ts}"),
        None => format!("{RATES_PREFIX}{folder_name}"),
    };
    let summary_path = report_dir.join(format!("{base}-owned-citations-summary.csv"));
    let by_url_path = report_dir.join(format!("{base}-by-week-url-platform.csv"));
    store::write_records(&summary_path, &report.owned)?;
    store::write_records(&by_url_path, &report.by_url)?;

    info!(
        action = "complete",
        component = "rates",
        duration_ms = total_start_time.elapsed().as_millis(),
        "Citation rate calculation completed"
    );

    Ok(RatesOutcome {
        input,
        folder_name,
        urls,
        urls_source,
        dataset,
        report,
        summary_path,
        by_url_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_combined_name() {
        let (folder, ts) = parse_combined_name(Path::new(
            "Output/example.com/brandpresence-full-combined-october_run_20251027_143000.csv",
        ));
        assert_eq!(folder, "october_run");
        assert_eq!(ts.as_deref(), Some("20251027_143000"));

        let (folder, ts) = parse_combined_name(Path::new("brandpresence-full-combined-adhoc.csv"));
        assert_eq!(folder, "adhoc");
        assert_eq!(ts, None);
    }

    #[test]
    fn test_folder_name_resolves_parent_reference() {
        let dir = tempfile::TempDir::new().unwrap();
        let data_dir = dir.path().join("october");
        fs::create_dir_all(data_dir.join("sub")).unwrap();

        assert_eq!(resolve_folder_name(&data_dir).unwrap(), "october");
        assert_eq!(resolve_folder_name(&data_dir.join("sub").join("..")).unwrap(), "october");
    }

    #[test]
    fn test_target_urls_path_for() {
        let path = target_urls_path_for(Path::new(
            "out/brandpresence-full-combined-oct_20251027_143000.csv",
        ));
        assert_eq!(
            path,
            Path::new("out/brandpresence-target-urls-oct_20251027_143000.csv")
        );
    }
}
