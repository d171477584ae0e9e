use time::macros::format_description;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::EnvFilter;

use crate::args::{Args, Command};

/// `RUST_LOG` wins when set; otherwise `--verbose` selects info over warn.
pub fn setup_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(LocalTime::new(format_description!(
            "[hour]:[minute]:[second].[subsecond digits:3]"
        )))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn format_number(num: usize) -> String {
    let digits = num.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// A 0..=1 rate as a percentage with two decimals.
pub fn format_percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

fn is_timestamp(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 15
        && bytes[8] == b'_'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 8 || b.is_ascii_digit())
}

pub fn validate_args(args: &Args) -> anyhow::Result<()> {
    match &args.command {
        Command::Combine(combine) => {
            if combine.data_dir.as_os_str().is_empty() {
                anyhow::bail!("--data-dir must not be empty");
            }
        }
        Command::Rates(rates) => {
            if let Some(folder) = &rates.folder_name {
                if folder.trim().is_empty() {
                    anyhow::bail!("--folder-name must not be empty");
                }
            }
            if let Some(timestamp) = &rates.timestamp {
                if !is_timestamp(timestamp) {
                    anyhow::bail!("--timestamp must look like YYYYMMDD_HHMMSS");
                }
            }
        }
    }

    Ok(())
}
