//! Terminal output for the dartidl CLI.

use console::{style, Color, StyledObject};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const ACCENT: Color = Color::Color256(51);
const ALERT: Color = Color::Color256(201);
const OK: Color = Color::Color256(82);
const WARN: Color = Color::Color256(220);
const MUTED: Color = Color::Color256(240);

const FILLED: &str = "\u{25C6}"; // ◆
const HOLLOW: &str = "\u{25C7}"; // ◇
const TARGET: &str = "\u{25C9}"; // ◉
const POINTER: &str = "\u{25B8}"; // ▸

/// Inner width of a [`Panel`], borders excluded.
const PANEL_WIDTH: usize = 53;

fn mark(symbol: &'static str, color: Color) -> StyledObject<&'static str> {
    style(symbol).fg(color)
}

fn line(symbol: &'static str, color: Color, msg: impl std::fmt::Display) {
    println!("  {} {}", mark(symbol, color), msg);
}

pub fn header(version: &str) {
    line(
        FILLED,
        ACCENT,
        format!("{} {}", style("dartidl").fg(ACCENT).bold(), style(version).dim()),
    );
    println!();
}

pub fn success(msg: &str) {
    line(TARGET, OK, msg);
}

pub fn error(msg: &str) {
    line(FILLED, ALERT, style(msg).fg(ALERT));
}

pub fn info(msg: &str) {
    line(HOLLOW, ACCENT, msg);
}

pub fn dim(msg: &str) {
    println!("  {}", style(msg).fg(MUTED));
}

pub fn timing(label: &str, duration_ms: u128) {
    line(HOLLOW, ACCENT, format!("{} in {}ms", label, duration_ms));
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_chars("\u{25CE}\u{25C9}\u{25CE}\u{25C9}") // ◎◉◎◉
        .template("  {spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(150));
    pb
}

/// A titled box of text rows, printed in one go.
pub struct Panel {
    title: String,
    rows: Vec<String>,
}

impl Panel {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            rows: Vec::new(),
        }
    }

    pub fn row(mut self, text: impl Into<String>) -> Self {
        self.rows.push(text.into());
        self
    }

    /// A `label  value` row with right-aligned counts.
    pub fn stat(self, label: &str, value: usize) -> Self {
        self.row(stat_row(label, value))
    }

    fn top(&self) -> String {
        let title = format!(" {} ", self.title);
        let rule = PANEL_WIDTH.saturating_sub(title.chars().count() + 1);
        format!(
            "{}{}{}{}",
            style("\u{256D}\u{2500}").fg(ACCENT),
            style(title).fg(ACCENT).bold(),
            style("\u{2500}".repeat(rule)).fg(ACCENT),
            style("\u{256E}").fg(ACCENT)
        )
    }

    fn body_row(text: &str) -> String {
        let padding = PANEL_WIDTH.saturating_sub(text.chars().count() + 1);
        let edge = style("\u{2502}").fg(ACCENT);
        format!("{} {}{}{}", edge, text, " ".repeat(padding), edge)
    }

    fn bottom() -> String {
        format!(
            "{}{}{}",
            style("\u{2570}").fg(ACCENT),
            style("\u{2500}".repeat(PANEL_WIDTH)).fg(ACCENT),
            style("\u{256F}").fg(ACCENT)
        )
    }

    pub fn print(&self) {
        println!("  {}", self.top());
        println!("  {}", Self::body_row(""));
        for row in &self.rows {
            println!("  {}", Self::body_row(row));
        }
        println!("  {}", Self::body_row(""));
        println!("  {}", Self::bottom());
        println!();
    }
}

fn stat_row(label: &str, value: usize) -> String {
    format!("{} {:<14} {:>6}", POINTER, label, value)
}

/// Reports generated files whose on-disk copy is stale.
pub fn stale_report<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) {
    println!();
    line(FILLED, ALERT, style("Generated sources are out of date.").fg(ALERT).bold());
    println!();
    for (path, reason) in files {
        println!(
            "  {}  {}   {}",
            mark(POINTER, WARN),
            style(path).fg(ACCENT),
            style(reason).dim()
        );
    }
    println!();
}

pub fn up_to_date() {
    line(TARGET, OK, style("Generated sources are up to date.").bold());
}
