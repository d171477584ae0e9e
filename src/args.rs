use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "citerate",
    about = "Measure how often AI answer engines cite your URLs across weekly snapshots",
    version,
    long_about = None
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Annotate weekly platform exports with citation flags and combine them
    Combine(CombineArgs),
    /// Calculate citation rates from a combined dataset
    Rates(RatesArgs),
}

#[derive(clap::Args, Debug)]
pub struct CombineArgs {
    /// Folder of brandpresence-<platform>-w<NN>-<year>.csv exports
    #[arg(short, long)]
    pub data_dir: PathBuf,

    /// CSV file with a url/urls/link/links column of target URLs
    #[arg(short, long)]
    pub urls: PathBuf,

    /// Root folder for combined datasets and reports
    #[arg(short, long, default_value = "Output")]
    pub output: PathBuf,

    /// Do not calculate citation rates after combining
    #[arg(long)]
    pub no_rates: bool,
}

#[derive(clap::Args, Debug)]
pub struct RatesArgs {
    /// Combined dataset (defaults to the most recent one under --output)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Target URL list (defaults to the list saved next to the dataset)
    #[arg(short, long)]
    pub urls: Option<PathBuf>,

    /// Root folder searched for combined datasets
    #[arg(short, long, default_value = "Output")]
    pub output: PathBuf,

    /// Folder for the report files (defaults to the dataset's folder)
    #[arg(long)]
    pub report_dir: Option<PathBuf>,

    /// Name used in report file names
    #[arg(long)]
    pub folder_name: Option<String>,

    /// Timestamp (YYYYMMDD_HHMMSS) used in report file names
    #[arg(long)]
    pub timestamp: Option<String>,
}
