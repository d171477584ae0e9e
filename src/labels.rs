use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static WEEK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"w(\d+)").expect("valid week regex"));
static WEEK_PART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^w\d+").expect("valid week part regex"));

const FILE_PREFIX: &str = "brandpresence";
const PAID_PLATFORM: &str = "ChatGPT-Paid";

const PLATFORM_ALIASES: &[(&str, &str)] = &[
    ("ai mode", "ai-mode"),
    ("google ai overviews", "google-ai-overviews"),
];

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Week label (`w44`) from a file name such as `brandpresence-chatgpt-w44-2025.csv`.
pub fn extract_week(path: &Path) -> Option<String> {
    WEEK_RE
        .captures(&file_name(path))
        .and_then(|caps| caps.get(1))
        .map(|digits| format!("w{}", digits.as_str()))
}

/// Platform label from a file name, with known aliases applied.
///
/// The `all` export is the paid ChatGPT tier and is relabelled accordingly.
pub fn extract_platform(path: &Path) -> String {
    let name = file_name(path);
    let stem = [".xlsx", ".xls", ".csv"]
        .iter()
        .find_map(|ext| name.strip_suffix(ext))
        .unwrap_or(&name);

    let mut parts = Vec::new();
    for (i, part) in stem.split('-').enumerate() {
        if i == 0 && part == FILE_PREFIX {
            continue;
        }
        if WEEK_PART_RE.is_match(part) {
            break;
        }
        if !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()) {
            break;
        }
        parts.push(part);
    }

    let platform = if parts.is_empty() {
        "unknown".to_string()
    } else {
        parts.join("-")
    };

    let platform = PLATFORM_ALIASES
        .iter()
        .find(|(alias, _)| *alias == platform)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(platform);

    if platform == "all" {
        PAID_PLATFORM.to_string()
    } else {
        platform
    }
}
