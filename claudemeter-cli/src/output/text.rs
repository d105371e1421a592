//! Text output formatting with progress bars and colors.

use chrono::{DateTime, Utc};
use claudemeter_core::{LimitKind, Severity, UsageLimit, UsageSnapshot};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

// Progress bar characters
const BAR_FULL: char = '█';
const BAR_EMPTY: char = '░';

/// Width of the window label column.
const LABEL_WIDTH: usize = 9;

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
    bar_width: usize,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self {
            use_colors,
            bar_width: 10,
        }
    }

    /// Formats a snapshot, one window per line.
    pub fn format_snapshot(
        &self,
        snapshot: &UsageSnapshot,
        show_sonnet: bool,
        now: DateTime<Utc>,
    ) -> String {
        let mut lines = vec![format!(
            "{} {}",
            self.bold("Claude Usage"),
            self.dim(&format!("(updated {})", snapshot.freshness_description(now)))
        )];

        for (kind, limit) in snapshot.limits() {
            if kind == LimitKind::Sonnet && !show_sonnet {
                continue;
            }
            lines.push(self.format_limit(snapshot, kind, limit, now));
        }

        lines.join("\n")
    }

    /// Formats a usage window with progress bar and reset time.
    fn format_limit(
        &self,
        snapshot: &UsageSnapshot,
        kind: LimitKind,
        limit: &UsageLimit,
        now: DateTime<Utc>,
    ) -> String {
        let severity = limit.severity();
        let bar = self.progress_bar(limit.utilization);
        let pct = self.color_for_severity(severity, &format!("{:.0}%", limit.utilization));
        let label = format!("{}:", kind.display_name());

        let reset = if limit.is_resetting(now) {
            "Resetting...".to_string()
        } else {
            let mut reset = format!("Resets {}", limit.reset_description(now));
            if let Some(local) = snapshot.local_reset_at(kind) {
                reset.push_str(&format!(" ({})", local.format("%a %H:%M %Z")));
            }
            if limit.reset_estimated {
                reset.push_str(" estimated");
            }
            reset
        };

        format!(
            "{label:<LABEL_WIDTH$} {bar} {pct}\n{:LABEL_WIDTH$} {}",
            "",
            self.dim(&reset)
        )
    }

    /// Formats a progress bar filled to `percent_used`.
    pub fn progress_bar(&self, percent_used: f64) -> String {
        let ratio = percent_used.clamp(0.0, 100.0) / 100.0;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let filled = (ratio * self.bar_width as f64).round() as usize;
        let empty = self.bar_width.saturating_sub(filled);

        let bar = format!(
            "{}{}",
            BAR_FULL.to_string().repeat(filled),
            BAR_EMPTY.to_string().repeat(empty)
        );

        self.color_for_severity(Severity::from_utilization(percent_used), &bar)
    }

    /// Notes that the shown snapshot is older than the failed refresh.
    pub fn format_stale_notice(&self, snapshot: &UsageSnapshot, now: DateTime<Utc>) -> String {
        self.yellow(&format!(
            "Refresh failed, showing data from {}",
            snapshot.freshness_description(now)
        ))
    }

    /// Formats an error message.
    pub fn format_error(&self, error: &str) -> String {
        format!("{} - {}", self.red("Error"), error)
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn color_for_severity(&self, severity: Severity, text: &str) -> String {
        match severity {
            Severity::Safe => self.green(text),
            Severity::Warning => self.yellow(text),
            Severity::Critical => self.red(text),
        }
    }

    /// Bold text.
    pub fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }
}
