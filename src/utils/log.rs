// src/utils/log.rs

//! Console presentation for the sync tool.
//!
//! Diagnostics go through the `log` facade. This module only renders the
//! operator-facing output: headers, steps, progress bars and summaries.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;

/// Suppresses console output when set (`--quiet`).
static QUIET: AtomicBool = AtomicBool::new(false);

/// Width of the progress bar in characters
const BAR_LEN: usize = 20;

/// Enable or disable console output.
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

fn enabled() -> bool {
    !QUIET.load(Ordering::Relaxed)
}

/// Render `label [#####...............] done/total pct%`.
pub fn format_progress(label: &str, done: usize, total: usize) -> String {
    let percent = if total == 0 {
        100
    } else {
        (done.min(total) * 100) / total
    };
    let filled = (percent * BAR_LEN + 50) / 100;
    format!(
        "{} [{}{}] {}/{} {}%",
        label,
        "#".repeat(filled),
        ".".repeat(BAR_LEN - filled),
        done,
        total,
        percent
    )
}

/// Redraw a progress line in place. `finish` ends the line.
pub fn progress(label: &str, done: usize, total: usize, finish: bool) {
    if !enabled() {
        return;
    }
    let line = format_progress(label, done, total);
    let mut out = std::io::stdout();
    if finish {
        let _ = writeln!(out, "\r{line}");
    } else {
        let _ = write!(out, "\r{line}");
    }
    let _ = out.flush();
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    if enabled() {
        println!(
            "[{}] [STEP {}/{}] {}",
            Local::now().format("%H:%M:%S"),
            step_num,
            total,
            message
        );
    }
}

/// Log a header
pub fn header(title: &str) {
    if enabled() {
        println!();
        println!("{}", "═".repeat(60));
        println!("  {}", title);
        println!("{}", "═".repeat(60));
    }
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    if enabled() {
        println!("    {}", message);
    }
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    if enabled() {
        println!();
        println!("[{}] [SUMMARY] {}", Local::now().format("%H:%M:%S"), title);
        for (key, value) in items {
            println!("    {}: {}", key, value);
        }
    }
}
