//! Status line formatting.

use std::time::Duration;

use super::ProgressStats;

/// Human-readable size with binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

/// `1h 02m 03s`, `4m 05s` or `7s`.
pub fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// One progress line (without carriage return or padding).
pub fn status_text(stats: &ProgressStats) -> String {
    let eta = stats
        .eta()
        .map(format_eta)
        .unwrap_or_else(|| "?".to_string());
    format!(
        "{:>3}% ({} / {})  {}/s now  {}/s avg  ETA {}",
        stats.percent(),
        format_bytes(stats.transferred + stats.already_done),
        format_bytes(stats.total_bytes),
        format_bytes(stats.speed),
        format_bytes(stats.average_speed()),
        eta
    )
}

/// Redraws one terminal line in place, blanking leftovers of a longer previous line.
#[derive(Debug, Default)]
pub struct StatusLine {
    last_len: usize,
    drawn: bool,
}

impl StatusLine {
    /// Bytes to write to redraw the line with `text`.
    pub fn frame(&mut self, text: &str) -> String {
        let len = text.chars().count();
        let pad = self.last_len.saturating_sub(len);
        self.last_len = len;
        self.drawn = true;
        format!("\r{}{}", text, " ".repeat(pad))
    }

    pub fn is_drawn(&self) -> bool {
        self.drawn
    }
}
