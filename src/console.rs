//! Colorful console output for benchmark runs.

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::time::{Duration, Instant};

use crate::score::HardSoftScore;

/// ASCII art banner printed once at startup.
pub fn print_banner() {
    let banner = r#"
  ____             _          ____ _           _
 |  _ \ ___  _   _| |_ ___   / ___| |__   __ _(_)_ __
 | |_) / _ \| | | | __/ _ \ | |   | '_ \ / _` | | '_ \
 |  _ < (_) | |_| | ||  __/ | |___| | | | (_| | | | | |
 |_| \_\___/ \__,_|\__\___|  \____|_| |_|\__,_|_|_| |_|
"#;
    println!("{}", banner.cyan().bold());
    println!(
        "  {} {}\n",
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black(),
        "Route Chain Benchmark".bright_cyan()
    );
}

/// Prints problem dimensions.
pub fn print_config(routes: usize, stops: usize, locations: usize) {
    println!(
        "{} {} {} Problem: routes ({}), stops ({}), locations ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Bench]".bright_cyan(),
        routes.to_formatted_string(&Locale::en).bright_yellow(),
        stops.to_formatted_string(&Locale::en).bright_yellow(),
        locations.to_formatted_string(&Locale::en).bright_yellow()
    );
}

/// Prints a labelled score line.
pub fn print_score(label: &str, score: HardSoftScore) {
    println!(
        "{} {} {} {} ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Bench]".bright_cyan(),
        label,
        format_score(score)
    );
}

fn print_phase_start(phase_name: &str) {
    println!(
        "{} {} {} {} started",
        timestamp().bright_black(),
        "INFO".bright_green(),
        format!("[{}]", phase_name).bright_cyan(),
        phase_name.white().bold()
    );
}

fn print_phase_end(phase_name: &str, duration: Duration, ops: u64) {
    println!(
        "{} {} {} {} ended: time spent ({}), operations ({}), speed ({}/sec)",
        timestamp().bright_black(),
        "INFO".bright_green(),
        format!("[{}]", phase_name).bright_cyan(),
        phase_name.white().bold(),
        format_duration(duration).yellow(),
        ops.to_formatted_string(&Locale::en).white(),
        ops_per_sec(ops, duration)
            .to_formatted_string(&Locale::en)
            .bright_magenta()
            .bold()
    );
}

/// Prints the closing summary box.
pub fn print_summary(total_duration: Duration, score: HardSoftScore, consistent: bool) {
    println!();
    println!("{}", "╔══════════════════════════════════════════════════════════╗".bright_cyan());

    let status_text = if consistent {
        "✓ CHAIN CONSISTENT"
    } else {
        "✗ CHAIN INCONSISTENT"
    };
    let status_colored = if consistent {
        status_text.bright_green().bold().to_string()
    } else {
        status_text.bright_red().bold().to_string()
    };
    let status_padding = 56 - status_text.chars().count();
    let left_pad = status_padding / 2;
    let right_pad = status_padding - left_pad;
    println!(
        "{}{}{}{}{}",
        "║".bright_cyan(),
        " ".repeat(left_pad),
        status_colored,
        " ".repeat(right_pad),
        "║".bright_cyan()
    );

    println!("{}", "╠══════════════════════════════════════════════════════════╣".bright_cyan());
    summary_row("Final Score:", &score.to_string());
    summary_row("Total Time:", &format!("{:.2}s", total_duration.as_secs_f64()));
    println!("{}", "╚══════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}

fn summary_row(label: &str, value: &str) {
    println!(
        "{}  {:<18}{:>36}  {}",
        "║".bright_cyan(),
        label,
        value,
        "║".bright_cyan()
    );
}

fn ops_per_sec(ops: u64, duration: Duration) -> u64 {
    if duration.as_secs_f64() > 0.0 {
        (ops as f64 / duration.as_secs_f64()) as u64
    } else {
        0
    }
}

/// Formats a duration nicely.
pub fn format_duration(d: Duration) -> String {
    let total_ms = d.as_millis();
    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        let mins = total_ms / 60_000;
        let secs = (total_ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}

/// Colors each level: red for broken hard constraints, yellow for soft cost.
fn format_score(score: HardSoftScore) -> String {
    let hard = format!("{}hard", score.hard());
    let hard = if score.hard() < 0 {
        hard.bright_red().to_string()
    } else {
        hard.bright_green().to_string()
    };
    let soft = format!("{}soft", score.soft());
    let soft = if score.soft() < 0 {
        soft.yellow().to_string()
    } else {
        soft.white().to_string()
    };
    format!("{}/{}", hard, soft)
}

/// Seconds since the epoch with millisecond precision.
fn timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| format!("{}.{:03}", d.as_secs(), d.subsec_millis()))
        .unwrap_or_else(|_| "0.000".to_string())
}

/// Times one benchmark phase and counts its operations.
pub struct BenchTimer {
    start: Instant,
    phase_name: String,
    ops: u64,
}

impl BenchTimer {
    pub fn start(phase_name: impl Into<String>) -> Self {
        let name = phase_name.into();
        print_phase_start(&name);
        Self {
            start: Instant::now(),
            phase_name: name,
            ops: 0,
        }
    }

    #[inline]
    pub fn record_op(&mut self) {
        self.ops += 1;
    }

    /// Prints the phase result and returns its duration.
    pub fn finish(self) -> Duration {
        let elapsed = self.start.elapsed();
        print_phase_end(&self.phase_name, elapsed, self.ops);
        elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_ops_per_sec() {
        assert_eq!(ops_per_sec(500, Duration::from_millis(250)), 2000);
        assert_eq!(ops_per_sec(500, Duration::ZERO), 0);
    }

    #[test]
    fn test_format_score_keeps_numbers() {
        let text = format_score(HardSoftScore::of(-2, -40));
        assert!(text.contains("-2hard"));
        assert!(text.contains("-40soft"));
    }
}
