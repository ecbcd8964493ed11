use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use cubefind::options::{read_pipeline_options, DEFAULT_OPTIONS_FILE};
use cubefind::pipeline::Pipeline;

#[derive(Parser)]
#[command(name = "cubefind")]
#[command(about = "Source finding pipeline for spectral data cubes", long_about = None)]
struct Cli {
    /// Pipeline options file
    #[arg(default_value = DEFAULT_OPTIONS_FILE)]
    options: PathBuf,

    /// Print the validated options as JSON and exit
    #[arg(long)]
    dump_options: bool,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cli.log_level))
        .init();

    let parsed = read_pipeline_options(&cli.options)?;
    info!(
        "Read {} parameters from {} ({} warnings)",
        parsed.store.len(),
        cli.options.display(),
        parsed.warnings.len()
    );

    if cli.dump_options {
        let json = serde_json::to_string_pretty(&parsed.store).context("serializing options")?;
        println!("{json}");
        return Ok(());
    }

    let pipeline = Pipeline::new(parsed.store);
    let (_, mask, summary) = pipeline.run()?;

    info!(
        "Pipeline finished: {} steps run, {} skipped, {} voxels detected",
        summary.executed.len(),
        summary.skipped.len(),
        mask.bits().iter().filter(|&&b| b != 0).count()
    );
    Ok(())
}
