use anyhow::Result;
use zimdown::{
    config::Config,
    tracker::{ProgressTracker, STATUS_FILE},
    util::{first_line, truncate_chars},
};

/// Print tracker statistics and failure records
pub fn show_status(config: &Config, limit: Option<usize>) -> Result<()> {
    let state_dir = &config.tracking.state_dir;
    if !state_dir.join(STATUS_FILE).exists() {
        println!("No tracker state found in {}", state_dir.display());
        return Ok(());
    }

    let tracker = ProgressTracker::open(state_dir)?;
    let state = tracker.state();

    for line in tracker.summary_lines() {
        println!("{}", line);
    }

    match state.last_run {
        Some(t) => println!("Last run:          {}", t.format("%Y-%m-%d %H:%M:%S")),
        None => println!("Last run:          never"),
    }
    if let Some(n) = state.last_processed_num {
        println!("Last attempted:    {}", n);
    }
    println!("Completed ids:     {}", state.completed_items.len());
    println!("Resume point:      {}", tracker.resume_point());

    let failures = tracker.failures();
    if failures.is_empty() {
        return Ok(());
    }

    let limit = limit.unwrap_or(failures.len());
    println!("\nFailed items ({}):", failures.len());
    for record in failures.iter().take(limit) {
        println!(
            "  {:<12} {}  {}",
            record.scp_id,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            truncate_chars(first_line(&record.error), 100)
        );
    }
    if failures.len() > limit {
        println!("  ... and {} more", failures.len() - limit);
    }

    Ok(())
}
