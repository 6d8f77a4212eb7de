use std::path::PathBuf;
use std::time::Instant;

use age_harmonizer::algorithm::harmonize::select_age_columns;
use age_harmonizer::utils::logging::console::{print_batch_summary, print_schema_info};
use age_harmonizer::utils::logging::{create_spinner, finish_progress_bar};
use age_harmonizer::{
    AgeHarmonizer, HarmonizerConfig, load_input_async, write_harmonized_csv, write_report_json,
};
use anyhow::{Context, bail};
use log::info;

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

const USAGE: &str = "usage: harmonize-ages <INPUT> <OUTPUT_CSV> [REPORT_JSON]";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (input, output, report_path) = match args.as_slice() {
        [input, output] => (PathBuf::from(input), PathBuf::from(output), None),
        [input, output, report] => (
            PathBuf::from(input),
            PathBuf::from(output),
            Some(PathBuf::from(report)),
        ),
        _ => bail!(USAGE),
    };

    let config = HarmonizerConfig::from_env()
        .context("Invalid harmonizer environment configuration")?
        .with_progress(true);
    info!("{config}");

    let start = Instant::now();
    let spinner = create_spinner(Some("Loading input table"));
    let batches = load_input_async(&input, config.batch_size)
        .await
        .with_context(|| format!("Failed to load input table {}", input.display()))?;
    finish_progress_bar(&spinner, Some("Input loaded"));
    print_batch_summary(&batches, start.elapsed());
    if let Some(first) = batches.first() {
        print_schema_info(first, &select_age_columns(&first.schema()));
    }

    let harmonizer = AgeHarmonizer::new(config);
    let result = harmonizer
        .harmonize_batches(&batches)
        .context("Age harmonization failed")?;

    write_harmonized_csv(&output, &result.rows)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    if let Some(report_path) = report_path {
        write_report_json(&report_path, &result.report)
            .with_context(|| format!("Failed to write {}", report_path.display()))?;
    }

    println!("{}", result.report);
    info!("Finished in {:?}", start.elapsed());

    Ok(())
}
