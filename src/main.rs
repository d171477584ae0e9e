use anyhow::Result;
use clap::Parser;
use tracing::error;

use citerate::args::{Args, Command};
use citerate::pipeline::{self, CombineOptions, RatesOptions};
use citerate::{report, utils};

fn run(args: &Args) -> Result<()> {
    match &args.command {
        Command::Combine(combine) => {
            let outcome = pipeline::combine(&CombineOptions {
                data_dir: combine.data_dir.clone(),
                urls_file: combine.urls.clone(),
                output_root: combine.output.clone(),
                timestamp: None,
                run_rates: !combine.no_rates,
            })?;
            report::print_combine_results(&outcome);
        }
        Command::Rates(rates) => {
            let outcome = pipeline::rates(&RatesOptions {
                input: rates.input.clone(),
                urls_file: rates.urls.clone(),
                output_root: rates.output.clone(),
                report_dir: rates.report_dir.clone(),
                folder_name: rates.folder_name.clone(),
                timestamp: rates.timestamp.clone(),
            })?;
            report::print_rate_results(&outcome);
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    utils::setup_logging(args.verbose);
    utils::validate_args(&args)?;

    if let Err(e) = run(&args) {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}
