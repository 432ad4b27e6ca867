use crate::RunArgs;
use anyhow::{Context, Result};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use zimdown::{
    archive::ZimArchive,
    batch::{BatchDriverBuilder, RunOutcome, RunReport, ShardLayout},
    config::Config,
    extract::ImagePolicy,
    tracker::ProgressTracker,
    types::ArticleId,
};

/// Apply CLI flags on top of file and environment configuration
pub fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(start) = args.start {
        config.batch.start = start;
    }
    if let Some(end) = args.end {
        config.batch.end = end;
    }
    if args.no_resume {
        config.batch.resume = false;
    } else if args.resume {
        config.batch.resume = true;
    }
    if let Some(max) = args.max_failures {
        config.batch.max_consecutive_failures = max;
    }
    if let Some(archive) = &args.archive {
        config.archive.path = Some(archive.clone());
    }
    if let Some(output) = &args.output {
        config.set_output_root(output.clone());
    }
    if let Some(prefix) = &args.prefix {
        config.batch.prefix = prefix.clone();
    }
    if args.all_images {
        config.batch.image_policy = ImagePolicy::All;
    }
}

pub async fn run(mut config: Config, args: RunArgs) -> Result<ExitCode> {
    apply_overrides(&mut config, &args);
    config.validate()?;

    let single = args
        .single
        .as_deref()
        .map(ArticleId::parse)
        .transpose()
        .context("Invalid --single id")?;

    let cancel = Arc::new(AtomicBool::new(false));
    if single.is_none() {
        let flag = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Received Ctrl+C, stopping after the current item");
                flag.store(true, Ordering::Relaxed);
            }
        });
    }

    let quiet = args.quiet;
    tokio::task::spawn_blocking(move || convert(config, single, quiet, cancel))
        .await
        .context("Conversion worker panicked")?
}

/// Open the archive and tracker, then run the driver on this thread
fn convert(
    config: Config,
    single: Option<ArticleId>,
    quiet: bool,
    cancel: Arc<AtomicBool>,
) -> Result<ExitCode> {
    let archive = ZimArchive::open_with_root(
        config.archive_path()?,
        config.archive.root_prefix.clone(),
    )
    .context("Failed to open archive")?;

    let state_dir = &config.tracking.state_dir;
    let tracker = ProgressTracker::open(state_dir).with_context(|| {
        format!("Failed to open tracker state in {}", state_dir.display())
    })?;

    let mut driver = BatchDriverBuilder::new(archive, tracker, config.output_root()?)
        .with_config(config.batch.clone())
        .with_shards(ShardLayout::new(
            config.output.shard_width,
            config.output.shard_limit,
        ))
        .with_cancel_flag(cancel)
        .with_quiet(quiet)
        .build()?;

    if let Some(id) = single {
        info!("Processing single id {}", id);
        let ok = driver.process_single(&id)?;

        if ok {
            println!("{}: converted -> {}", id, driver.output().article_path(&id).display());
        } else {
            let cause = driver
                .tracker()
                .failure(&id)
                .map(|r| r.error.clone())
                .unwrap_or_default();
            println!("{}: failed: {}", id, cause);
        }
        return Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE });
    }

    let report = driver.run(config.batch.start, config.batch.end, config.batch.resume)?;

    print_report(&report);
    println!();
    for line in driver.tracker().summary_lines() {
        println!("{}", line);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &RunReport) {
    let outcome = match report.outcome {
        RunOutcome::Completed => "completed",
        RunOutcome::CircuitBroken => "stopped after too many consecutive failures",
        RunOutcome::Interrupted => "interrupted",
    };
    let counts = &report.counts;

    println!("\nConversion Summary");
    println!("==================");
    println!("Outcome:         {}", outcome);
    println!("Range:           {}..={}", report.start, report.end);
    println!("Items attempted: {}", counts.attempted);
    println!("Items converted: {}", counts.succeeded);
    println!("Items failed:    {}", counts.failed);
    println!("Items skipped:   {}", counts.skipped);
    println!("Elapsed time:    {:.1}s", counts.elapsed_seconds);
    println!("Processing rate: {:.1} items/s", counts.items_per_second);
}
