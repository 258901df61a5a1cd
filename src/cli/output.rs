use colored::*;

use crate::cleaner::CleanReport;
use crate::common::format::{self, format_count, format_size, format_timestamp};

/// Print a cleanup report in human-readable format
pub fn print_clean_report(report: &CleanReport, detailed: bool) {
    let title = if report.dry_run {
        "s3bc Dry Run"
    } else {
        "s3bc Cleanup"
    };
    let target = report.target().to_string();

    println!();
    println!("{}  {}", title.bold(), target.cyan());
    println!("{}", "─".repeat(60).dimmed());
    println!(
        "  Listed {}  •  keeping newest {}  •  finished in {}",
        format_count(report.listed),
        report.save_last,
        format::format_duration(report.duration_secs).cyan()
    );
    if report.skipped > 0 {
        println!(
            "  {} {} skipped (listing errors, see logs)",
            "!".yellow(),
            format_count(report.skipped)
        );
    }
    println!("{}", "─".repeat(60).dimmed());
    println!();

    if report.removed.is_empty() {
        println!(
            "  {} Nothing to remove, {} kept.",
            "✓".green(),
            format_count(report.kept)
        );
        return;
    }

    let (verb, count) = if report.dry_run {
        ("Would remove", report.removed.len())
    } else {
        ("Removed", report.deleted().count())
    };
    println!(
        "  {} {} {} ({}), kept {}",
        "●".red(),
        verb.bold(),
        format_count(count),
        format_size(report.bytes_removed),
        format_count(report.kept)
    );

    if detailed || report.dry_run {
        println!();
        for object in &report.removed {
            println!(
                "    {}  {:>10}  {}",
                format_timestamp(&object.last_modified).dimmed(),
                format_size(object.size_bytes),
                format::truncate(&object.key, 80)
            );
        }
    }

    if !report.failed.is_empty() {
        println!();
        println!(
            "  {} {} of {} deletions failed:",
            "✗".red(),
            report.failed.len(),
            report.attempted
        );
        for failure in &report.failed {
            println!(
                "    {}  {}",
                format::truncate(&failure.key, 60),
                failure.cause.dimmed()
            );
        }
    }

    if report.dry_run {
        println!();
        println!("  {} Dry run: nothing was deleted.", "ℹ".cyan());
    }
}

/// Print a cleanup report as JSON
pub fn print_clean_json(report: &CleanReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize report: {}", e),
    }
}

/// Print deleted keys (selected keys on a dry run), one per line
pub fn print_clean_quiet(report: &CleanReport) {
    if report.dry_run {
        for object in &report.removed {
            println!("{}", object.key);
        }
    } else {
        for object in report.deleted() {
            println!("{}", object.key);
        }
    }
}
