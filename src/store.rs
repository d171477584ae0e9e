use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};
use tracing::{info, warn};

use crate::dataset::{
    Dataset, DatasetRow, ANSWER_COLUMN, ANY_DOMAIN_COLUMN, DERIVED_COLUMNS, EXACT_COLUMN,
    EXECUTION_DATE_COLUMN, OTHER_DOMAIN_COLUMN, PLATFORM_COLUMN, PROMPT_COLUMN, SOURCES_COLUMN,
    WEEK_COLUMN,
};
use crate::matcher::{CitationFlags, YesNo};

pub const COMBINED_PREFIX: &str = "brandpresence-full-combined-";
pub const INPUT_EXTENSION: &str = "csv";

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty()).map(str::to_string)
}

/// Sorted `*.csv` files directly inside `dir`.
pub fn list_input_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Data folder not found: {:?}", dir);
    }

    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read data folder {:?}", dir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(INPUT_EXTENSION))
        })
        .collect();
    files.sort();

    info!(action = "scan", component = "input_files", folder = ?dir, file_count = files.len(), "Found input files");
    Ok(files)
}

/// Read one per-platform, per-week export, labelling every row.
pub fn read_platform_file(path: &Path, week: &str, platform: &str) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    // Labels and flags are recomputed, never carried over from an input file
    let source_headers: Vec<String> = headers
        .iter()
        .filter(|h| !DERIVED_COLUMNS.contains(&h.as_str()))
        .cloned()
        .collect();

    let mut rows = Vec::new();
    for (line_num, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Invalid record at line {} of {:?}", line_num + 2, path))?;
        let mut row = DatasetRow {
            week: week.to_string(),
            platform: platform.to_string(),
            ..Default::default()
        };

        for (header, value) in headers.iter().zip(record.iter()) {
            match header.as_str() {
                PROMPT_COLUMN => row.prompt = value.to_string(),
                ANSWER_COLUMN => row.answer = non_empty(Some(value)),
                SOURCES_COLUMN => row.sources = non_empty(Some(value)),
                EXECUTION_DATE_COLUMN => row.execution_date = non_empty(Some(value)),
                h if DERIVED_COLUMNS.contains(&h) => {}
                _ => row.extra.push((header.clone(), value.to_string())),
            }
        }
        rows.push(row);
    }

    Ok(Dataset {
        headers: source_headers,
        rows,
    })
}

fn write_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {:?}", path))?;

    let mut header_row: Vec<&str> = dataset.headers.iter().map(String::as_str).collect();
    header_row.extend(DERIVED_COLUMNS);
    writer.write_record(&header_row)?;

    for row in &dataset.rows {
        let mut record: Vec<String> = dataset
            .headers
            .iter()
            .map(|h| row.column(h).unwrap_or_default().to_string())
            .collect();
        record.push(row.week.clone());
        record.push(row.platform.clone());
        record.push(YesNo(row.flags.exact_cited).to_string());
        record.push(YesNo(row.flags.any_domain_cited).to_string());
        record.push(YesNo(row.flags.other_domain_cited).to_string());
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the combined, annotated dataset handed from stage one to stage two.
pub fn write_combined(path: &Path, dataset: &Dataset) -> Result<()> {
    let start_time = Instant::now();
    write_dataset(path, dataset)?;
    info!(
        action = "write",
        component = "combined_dataset",
        file_path = ?path,
        row_count = dataset.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Combined dataset written"
    );
    Ok(())
}

/// Read a combined dataset back, including its citation flags.
pub fn read_combined(path: &Path) -> Result<Dataset> {
    let start_time = Instant::now();
    if !path.exists() {
        anyhow::bail!("Combined dataset not found: {:?}", path);
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    for required in [WEEK_COLUMN, PLATFORM_COLUMN, PROMPT_COLUMN, SOURCES_COLUMN] {
        if !headers.iter().any(|h| h == required) {
            anyhow::bail!("Combined dataset {:?} is missing the '{}' column", path, required);
        }
    }
    for flag in [EXACT_COLUMN, ANY_DOMAIN_COLUMN, OTHER_DOMAIN_COLUMN] {
        if !headers.iter().any(|h| h == flag) {
            warn!(action = "read", component = "combined_dataset", column = flag, "Flag column missing, treating as N");
        }
    }

    let source_headers: Vec<String> = headers
        .iter()
        .filter(|h| !DERIVED_COLUMNS.contains(&h.as_str()))
        .cloned()
        .collect();

    let mut rows = Vec::new();
    for (line_num, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Invalid record at line {} of {:?}", line_num + 2, path))?;
        let mut row = DatasetRow::default();
        let mut flags = CitationFlags::default();

        for (header, value) in headers.iter().zip(record.iter()) {
            match header.as_str() {
                WEEK_COLUMN => row.week = value.to_string(),
                PLATFORM_COLUMN => row.platform = value.to_string(),
                PROMPT_COLUMN => row.prompt = value.to_string(),
                ANSWER_COLUMN => row.answer = non_empty(Some(value)),
                SOURCES_COLUMN => row.sources = non_empty(Some(value)),
                EXECUTION_DATE_COLUMN => row.execution_date = non_empty(Some(value)),
                EXACT_COLUMN => flags.exact_cited = YesNo::parse(value),
                ANY_DOMAIN_COLUMN => flags.any_domain_cited = YesNo::parse(value),
                OTHER_DOMAIN_COLUMN => flags.other_domain_cited = YesNo::parse(value),
                _ => row.extra.push((header.clone(), value.to_string())),
            }
        }
        row.flags = flags;
        rows.push(row);
    }

    info!(
        action = "read",
        component = "combined_dataset",
        file_path = ?path,
        row_count = rows.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Combined dataset loaded"
    );
    Ok(Dataset {
        headers: source_headers,
        rows,
    })
}

/// Write report rows using their serde field names as headers.
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("Failed to create {:?}", path))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!(action = "write", component = "report", file_path = ?path, row_count = records.len(), "Report written");
    Ok(())
}

fn collect_combined(dir: &Path, found: &mut Vec<(SystemTime, PathBuf)>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let path = entry?.path();
        if path.is_dir() {
            collect_combined(&path, found)?;
            continue;
        }
        let is_combined = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .is_some_and(|name| name.starts_with(COMBINED_PREFIX) && name.ends_with(".csv"));
        if is_combined {
            let modified = fs::metadata(&path)?.modified()?;
            found.push((modified, path));
        }
    }
    Ok(())
}

/// Most recently modified combined dataset anywhere under `output_root`.
pub fn find_latest_combined(output_root: &Path) -> Result<Option<PathBuf>> {
    if !output_root.is_dir() {
        return Ok(None);
    }
    let mut found = Vec::new();
    collect_combined(output_root, &mut found)?;
    Ok(found.into_iter().max_by_key(|(modified, _)| *modified).map(|(_, path)| path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_platform_file_maps_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("brandpresence-chatgpt-w44-2025.csv");
        fs::write(
            &path,
            "Prompt,Region,Answer,Sources,week\n\
             best crm,US,Try X,https://example.com/a;https://other.org,w99\n\
             best erp,EU,Try Y,,w99\n",
        )
        .unwrap();

        let ds = read_platform_file(&path, "w44", "chatgpt").unwrap();
        assert_eq!(ds.headers, vec!["Prompt", "Region", "Answer", "Sources"]);
        assert_eq!(ds.len(), 2);

        let first = &ds.rows[0];
        assert_eq!(first.week, "w44");
        assert_eq!(first.platform, "chatgpt");
        assert_eq!(first.prompt, "best crm");
        assert_eq!(first.column("Region"), Some("US"));
        assert_eq!(first.sources.as_deref(), Some("https://example.com/a;https://other.org"));
        assert_eq!(ds.rows[1].sources, None);
    }

    #[test]
    fn test_combined_round_trip_keeps_flags_and_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("brandpresence-full-combined-oct_20251027_120000.csv");
        let ds = Dataset {
            headers: vec!["Prompt".to_string(), "Region".to_string(), "Sources".to_string()],
            rows: vec![DatasetRow {
                week: "w44".to_string(),
                platform: "gemini".to_string(),
                prompt: "best crm".to_string(),
                sources: Some("https://example.com/a".to_string()),
                extra: vec![("Region".to_string(), "US".to_string())],
                flags: CitationFlags {
                    exact_cited: true,
                    any_domain_cited: true,
                    other_domain_cited: false,
                },
                ..Default::default()
            }],
        };

        write_combined(&path, &ds).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with(
            "Prompt,Region,Sources,week,platform,selected_url_cited?,any_url_from_domain,any_url_from_domain_excluding_specified_URLs"
        ));

        let back = read_combined(&path).unwrap();
        assert_eq!(back.headers, ds.headers);
        assert_eq!(back.rows, ds.rows);
    }

    #[test]
    fn test_read_combined_requires_label_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("combined.csv");
        fs::write(&path, "Prompt,Sources\np,https://example.com\n").unwrap();
        let err = read_combined(&path).unwrap_err();
        assert!(err.to_string().contains("'week'"));
    }

    #[test]
    fn test_list_input_files_only_csv_sorted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b-w2.csv"), "Prompt\n").unwrap();
        fs::write(dir.path().join("a-w1.CSV"), "Prompt\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = list_input_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a-w1.CSV", "b-w2.csv"]);
    }

    #[test]
    fn test_find_latest_combined_searches_subfolders() {
        let dir = TempDir::new().unwrap();
        assert_eq!(find_latest_combined(dir.path()).unwrap(), None);

        let nested = dir.path().join("example.com");
        fs::create_dir_all(&nested).unwrap();
        let combined = nested.join("brandpresence-full-combined-oct_20251027_120000.csv");
        fs::write(&combined, "week\n").unwrap();
        fs::write(nested.join("citation_rates_by_url-oct.csv"), "x\n").unwrap();

        assert_eq!(find_latest_combined(dir.path()).unwrap(), Some(combined));
    }
}
