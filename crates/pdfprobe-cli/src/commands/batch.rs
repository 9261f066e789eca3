//! Batch command - extract many PDF files.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use pdfprobe_core::{ExtractionResult, Extractor, ProbeConfig};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Input files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Directory receiving one `<name>.json` per input
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Indent JSON output
    #[arg(long)]
    pretty: bool,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Result of processing a single file.
struct ProcessResult {
    /// Position in the expanded input list.
    order: usize,
    path: PathBuf,
    result: ExtractionResult,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<ExitCode> {
    let start = Instant::now();
    let config = ProbeConfig::load(config_path.map(Path::new))?;
    let extractor = Extractor::with_config(config.pdf);

    // Expand glob pattern
    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    // Every job opens its own document. New jobs start only as running ones
    // finish, so a failure stops the batch without queueing the remaining files.
    let jobs = args.jobs.max(1);
    let mut queued = files.into_iter().enumerate();
    let mut running = JoinSet::new();
    let mut results = Vec::new();

    loop {
        while running.len() < jobs {
            let Some((order, path)) = queued.next() else {
                break;
            };
            let extractor = extractor.clone();
            let pb = pb.clone();

            running.spawn_blocking(move || {
                let file_start = Instant::now();
                let result = extractor.extract_path(&path);
                pb.inc(1);
                ProcessResult {
                    order,
                    path,
                    result,
                    processing_time_ms: file_start.elapsed().as_millis() as u64,
                }
            });
        }

        let Some(joined) = running.join_next().await else {
            break;
        };
        let processed = joined?;

        if let Some(error_msg) = processed.result.error() {
            if args.continue_on_error {
                warn!("Failed to process {}: {}", processed.path.display(), error_msg);
            } else {
                error!("Failed to process {}: {}", processed.path.display(), error_msg);
                // Blocking jobs already started run to completion; their results are dropped
                running.abort_all();
                pb.abandon();
                anyhow::bail!("Processing failed for {}: {}", processed.path.display(), error_msg);
            }
        }

        if let Some(output_dir) = &args.output_dir {
            write_result(output_dir, &processed, args.pretty)?;
        }

        results.push(processed);
    }

    results.sort_by_key(|processed| processed.order);
    pb.finish_and_clear();

    // Generate summary if requested
    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        println!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = results.iter().filter(|r| !r.result.success()).collect();
    let profiles = results
        .iter()
        .filter(|r| r.result.profile_image_base64().is_some())
        .count();

    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed, {} with profile photo",
        style(results.len() - failed.len()).green(),
        style(failed.len()).red(),
        profiles
    );

    if !failed.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for processed in &failed {
            println!(
                "  - {}: {}",
                processed.path.display(),
                processed.result.error().unwrap_or("unknown error")
            );
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn write_result(output_dir: &Path, processed: &ProcessResult, pretty: bool) -> anyhow::Result<()> {
    let output_name = processed
        .path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let output_path = output_dir.join(format!("{}.json", output_name));

    let content = if pretty {
        processed.result.to_json_pretty()?
    } else {
        processed.result.to_json()?
    };

    fs::write(&output_path, content)?;
    debug!("Wrote output to {}", output_path.display());
    Ok(())
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "text_length",
        "images_count",
        "has_profile_photo",
        "processing_time_ms",
        "error",
    ])?;

    for processed in results {
        let filename = processed
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");
        let result = &processed.result;

        wtr.write_record([
            filename,
            if result.success() { "success" } else { "error" },
            &result.text_length().to_string(),
            &result.images_count().to_string(),
            &result.profile_image_base64().is_some().to_string(),
            &processed.processing_time_ms.to_string(),
            result.error().unwrap_or(""),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
