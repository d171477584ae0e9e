use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Instant;
use tracing::info;

use crate::matcher::CitationTargets;

const URL_COLUMN_NAMES: [&str; 4] = ["url", "urls", "link", "links"];
pub const TARGET_URLS_COLUMN: &str = "urls";

static INVALID_FOLDER_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid folder regex"));

/// Read the target URL list from a CSV with a `url`/`urls`/`link`/`links` column.
pub fn load_target_urls(path: &Path) -> Result<Vec<String>> {
    let start_time = Instant::now();
    info!(action = "load", component = "target_urls", file_path = ?path, "Loading target URLs");

    if !path.exists() {
        anyhow::bail!("Target URL file not found: {:?}", path);
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open target URL file {:?}", path))?;

    let headers = reader.headers()?.clone();
    let Some(column) = headers
        .iter()
        .position(|h| URL_COLUMN_NAMES.contains(&h.trim().to_lowercase().as_str()))
    else {
        anyhow::bail!(
            "Could not find URL column in {:?}. Available columns: {}",
            path,
            headers.iter().collect::<Vec<_>>().join(", ")
        );
    };

    let mut urls = Vec::new();
    for (line_num, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Invalid CSV record at line {}", line_num + 2))?;
        if let Some(url) = record.get(column).map(str::trim).filter(|u| !u.is_empty()) {
            urls.push(url.to_string());
        }
    }

    if urls.is_empty() {
        anyhow::bail!("No target URLs found in {:?}", path);
    }

    info!(
        action = "loaded",
        component = "target_urls",
        url_count = urls.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Loaded target URLs"
    );
    Ok(urls)
}

pub fn write_target_urls(path: &Path, urls: &[String]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create target URL file {:?}", path))?;
    writer.write_record([TARGET_URLS_COLUMN])?;
    for url in urls {
        writer.write_record([url])?;
    }
    writer.flush()?;
    Ok(())
}

/// Folder name for a run's output: the first target domain without `www.`,
/// or `fallback` when no target has a domain.
pub fn output_domain_name(targets: &CitationTargets, fallback: &str) -> String {
    let name = targets
        .domains()
        .iter()
        .next()
        .map(|domain| domain.strip_prefix("www.").unwrap_or(domain).to_string())
        .unwrap_or_else(|| fallback.to_string());
    sanitize_folder_name(&name)
}

pub fn sanitize_folder_name(name: &str) -> String {
    INVALID_FOLDER_CHARS.replace_all(name, "_").into_owned()
}
