//! Integration tests for zimdown
//!
//! These tests drive whole batch runs against an in-memory archive and
//! check the files and tracker state they leave behind.

use std::fs;
use std::path::Path;
use zimdown::{
    archive::MemoryArchive,
    batch::{BatchDriver, BatchDriverBuilder, RunOutcome},
    config::BatchConfig,
    extract::ImagePolicy,
    tracker::{FailureRecord, ProgressTracker, FAILURES_FILE, STATUS_FILE},
    types::ArticleId,
};
use tempfile::TempDir;

const ROOT: &str = "A/";

fn item(n: u64) -> ArticleId {
    ArticleId::new("item", n)
}

fn page(body: &str) -> String {
    format!(
        r#"<html><body><div class="top-bar">nav</div><div id="page-content">{}</div><div class="footer">footer</div></body></html>"#,
        body
    )
}

fn batch_config(max_failures: u32) -> BatchConfig {
    BatchConfig {
        prefix: "item".to_string(),
        max_consecutive_failures: max_failures,
        ..Default::default()
    }
}

fn build_driver(
    dir: &Path,
    archive: MemoryArchive,
    config: BatchConfig,
) -> BatchDriver<MemoryArchive> {
    let tracker = ProgressTracker::open(dir.join("logs")).unwrap();
    BatchDriverBuilder::new(archive, tracker, dir.join("out"))
        .with_config(config)
        .with_quiet(true)
        .build()
        .unwrap()
}

/// Minimal article lands in the first shard with no tag line
#[test]
fn test_single_article_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let archive = MemoryArchive::new(ROOT)
        .with_article(&item(1), r#"<div id="page-content"><p>Hello</p></div>"#);

    let mut driver = build_driver(temp_dir.path(), archive, batch_config(10));
    let report = driver.run(1, 1, true).unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.counts.succeeded, 1);

    let md_path = temp_dir.path().join("out/001-1000/item-001.md");
    let markdown = fs::read_to_string(&md_path).unwrap();
    assert_eq!(markdown.trim(), "Hello");
    assert!(!markdown.contains('#'));

    assert!(driver.tracker().should_skip(&item(1)));
    assert!(temp_dir.path().join("logs").join(STATUS_FILE).exists());
}

/// Three failed fetches in a row stop the run before the fourth id
#[test]
fn test_circuit_breaker_stops_before_next_id() {
    let temp_dir = TempDir::new().unwrap();
    // Only item-004 exists; 1..=3 fail content fetch
    let archive = MemoryArchive::new(ROOT).with_article(&item(4), page("<p>four</p>"));

    let mut driver = build_driver(temp_dir.path(), archive, batch_config(3));
    let report = driver.run(1, 10, false).unwrap();

    assert_eq!(report.outcome, RunOutcome::CircuitBroken);
    assert_eq!(report.counts.attempted, 3);
    assert_eq!(report.counts.failed, 3);

    let state = driver.tracker().state();
    assert_eq!(state.failed_items, vec!["item-001", "item-002", "item-003"]);
    assert!(state.completed_items.is_empty());
    assert_eq!(state.last_processed_num, Some(3));
    assert!(!temp_dir.path().join("out/001-1000/item-004.md").exists());
}

/// Tags, denylisted chrome, and images all flow into the artifact
#[test]
fn test_tags_and_images() {
    let temp_dir = TempDir::new().unwrap();
    let html = r#"<html><body>
        <div id="page-content">
            <p><strong>Item #:</strong> ITEM-002</p>
            <div class="scp-image-block"><img src="../local--files/item-002/photo%201.jpg" alt="photo"></div>
            <p>Second <img src="./images/extra.png"></p>
            <div class="licensebox">license text</div>
        </div>
        <div class="page-tags"><span><a href="/system:page-tags/tag/euclid">euclid</a><a href="/system:page-tags/tag/safe">safe</a></span></div>
    </body></html>"#;

    let archive = MemoryArchive::new(ROOT)
        .with_article(&item(2), html)
        .with_entry("local--files/item-002/photo 1.jpg", vec![0xFF, 0xD8, 0xFF])
        .with_entry("images/extra.png", vec![0x89, 0x50]);

    let mut driver = build_driver(temp_dir.path(), archive, batch_config(10));
    assert!(driver.process_single(&item(2)).unwrap());

    let markdown =
        fs::read_to_string(temp_dir.path().join("out/001-1000/item-002.md")).unwrap();
    assert!(markdown.starts_with("**Item #:**"));
    assert!(markdown.contains("ITEM-002"));
    assert!(!markdown.contains("license text"));
    assert!(markdown.ends_with("\n\n\n#euclid #safe\n"));

    // First image only by default, decoded path variant resolved
    let image = temp_dir.path().join("out/local--files/item-002/photo%201.jpg");
    assert_eq!(fs::read(image).unwrap(), vec![0xFF, 0xD8, 0xFF]);
    assert!(!temp_dir.path().join("out/images/extra.png").exists());
}

#[test]
fn test_all_images_policy() {
    let temp_dir = TempDir::new().unwrap();
    let html = page(r#"<img src="../images/a.png"><img src="../images/b.png">"#);
    let archive = MemoryArchive::new(ROOT)
        .with_article(&item(3), html)
        .with_entry("images/a.png", vec![1u8])
        .with_entry("images/b.png", vec![2u8]);

    let config = BatchConfig {
        image_policy: ImagePolicy::All,
        ..batch_config(10)
    };
    let mut driver = build_driver(temp_dir.path(), archive, config);
    assert!(driver.process_single(&item(3)).unwrap());

    assert_eq!(fs::read(temp_dir.path().join("out/images/a.png")).unwrap(), vec![1]);
    assert_eq!(fs::read(temp_dir.path().join("out/images/b.png")).unwrap(), vec![2]);
}

/// A second run resumes past the highest completed id, even over gaps
#[test]
fn test_resume_across_runs() {
    let temp_dir = TempDir::new().unwrap();
    let archive = || {
        MemoryArchive::new(ROOT)
            .with_article(&item(1), page("<p>one</p>"))
            .with_article(&item(2), page("<p>two</p>"))
            .with_article(&item(4), page("<p>four</p>"))
            .with_article(&item(5), page("<p>five</p>"))
    };

    // First run: 1, 2 succeed, 3 fails, 4 succeeds
    {
        let mut driver = build_driver(temp_dir.path(), archive(), batch_config(10));
        let report = driver.run(1, 4, true).unwrap();
        assert_eq!(report.counts.succeeded, 3);
        assert_eq!(report.counts.failed, 1);
    }

    // Second run starts at 5; the gap at 3 is not revisited
    let mut driver = build_driver(temp_dir.path(), archive(), batch_config(10));
    assert_eq!(driver.tracker().resume_point(), 5);

    let report = driver.run(1, 5, true).unwrap();
    assert_eq!(report.start, 5);
    assert_eq!(report.counts.attempted, 1);
    assert_eq!(report.counts.succeeded, 1);
    assert!(driver.tracker().is_failed(&item(3)));

    let state = driver.tracker().state();
    assert_eq!(state.successful, 4);
    assert_eq!(state.current_session.processed, 1);
}

/// Without resume, completed ids are skipped and only the gap is retried
#[test]
fn test_no_resume_skips_completed() {
    let temp_dir = TempDir::new().unwrap();
    let archive = MemoryArchive::new(ROOT)
        .with_article(&item(1), page("<p>one</p>"))
        .with_article(&item(2), page("<p>two</p>"));

    let mut driver = build_driver(temp_dir.path(), archive.clone(), batch_config(10));
    driver.run(1, 3, false).unwrap();

    // item-003 appears before the next run
    let archive = archive.with_article(&item(3), page("<p>three</p>"));
    let mut driver = build_driver(temp_dir.path(), archive, batch_config(10));
    let report = driver.run(1, 3, false).unwrap();

    assert_eq!(report.counts.skipped, 2);
    assert_eq!(report.counts.attempted, 1);
    assert_eq!(report.counts.succeeded, 1);

    let tracker = driver.into_tracker();
    assert!(!tracker.is_failed(&item(3)));
    assert!(tracker.failures().is_empty());
    assert_eq!(tracker.state().failed, 0);
    assert_eq!(tracker.state().skipped, 2);
}

/// A completed id stays completed when single mode meets it again after
/// its article disappeared
#[test]
fn test_single_mode_on_completed_id_keeps_state_consistent() {
    let temp_dir = TempDir::new().unwrap();
    let archive = MemoryArchive::new(ROOT).with_article(&item(1), page("<p>one</p>"));

    let mut driver = build_driver(temp_dir.path(), archive, batch_config(10));
    assert!(driver.process_single(&item(1)).unwrap());
    drop(driver);

    let mut driver = build_driver(temp_dir.path(), MemoryArchive::new(ROOT), batch_config(10));
    assert!(driver.process_single(&item(1)).unwrap());

    let tracker = driver.into_tracker();
    assert_eq!(tracker.state().completed_items, vec!["item-001"]);
    assert!(tracker.state().failed_items.is_empty());
    assert_eq!(tracker.state().failed, 0);

    let reopened = ProgressTracker::open(temp_dir.path().join("logs")).unwrap();
    assert_eq!(reopened.state(), tracker.state());
}

/// Failure records on disk: one per id, latest cause wins
#[test]
fn test_failure_file_upserts() {
    let temp_dir = TempDir::new().unwrap();
    let archive = MemoryArchive::new(ROOT).with_article(&item(1), "<p>no region</p>");

    let mut driver = build_driver(temp_dir.path(), archive, batch_config(10));
    driver.run(1, 2, false).unwrap();
    driver.run(1, 2, false).unwrap();

    let json = fs::read_to_string(temp_dir.path().join("logs").join(FAILURES_FILE)).unwrap();
    let records: Vec<FailureRecord> = serde_json::from_str(&json).unwrap();

    let ids: Vec<&str> = records.iter().map(|r| r.scp_id.as_str()).collect();
    assert_eq!(ids, vec!["item-001", "item-002"]);
    assert!(records[0].error.contains("content region"));
    assert!(records[1].error.contains("content fetch failed"));

    // Distinct failed ids, every attempt processed
    let state = driver.tracker().state();
    assert_eq!(state.failed, 2);
    assert_eq!(state.total_processed, 4);
}

/// State written by one tracker reloads identically in another
#[test]
fn test_state_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let archive = MemoryArchive::new(ROOT).with_article(&item(1), page("<p>one</p>"));

    let mut driver = build_driver(temp_dir.path(), archive, batch_config(10));
    driver.run(1, 2, false).unwrap();
    let before = driver.into_tracker().state().clone();

    let reopened = ProgressTracker::open(temp_dir.path().join("logs")).unwrap();
    assert_eq!(reopened.state(), &before);
}
