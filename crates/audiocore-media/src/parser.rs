//! Parses transcoder stderr lines into progress events.
//!
//! Kept free of any process plumbing so it can be unit-tested against
//! literal stderr fixtures.

use regex::Regex;
use std::sync::OnceLock;

/// Fatal error substrings recognised in the tool's stderr stream.
const ERROR_MARKERS: &[&str] = &["Invalid data found", "No such file", "Unknown encoder", "Conversion failed"];

fn duration_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Duration:\s*(\d{2}):(\d{2}):(\d{2})\.(\d+)").expect("static pattern is valid"))
}

fn time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"time=\s*(\d{2}):(\d{2}):(\d{2})\.(\d+)").expect("static pattern is valid"))
}

fn parse_timestamp(captures: &regex::Captures<'_>) -> f64 {
    let hours: f64 = captures[1].parse().unwrap_or(0.0);
    let minutes: f64 = captures[2].parse().unwrap_or(0.0);
    let seconds: f64 = captures[3].parse().unwrap_or(0.0);
    let fraction: f64 = format!("0.{}", &captures[4]).parse().unwrap_or(0.0);
    hours * 3600.0 + minutes * 60.0 + seconds + fraction
}

fn format_timestamp(total_seconds: f64) -> String {
    let total_seconds = total_seconds.max(0.0);
    let hours = (total_seconds / 3600.0) as u64;
    let minutes = ((total_seconds % 3600.0) / 60.0) as u64;
    let seconds = total_seconds % 60.0;
    format!("{hours:02}:{minutes:02}:{seconds:05.2}")
}

/// An event produced by feeding a single stderr line to [`StderrParser`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParserEvent {
    /// The tool has announced it has begun processing.
    Started,
    /// A progress tick, with a formula-derived percentage in `15..=95`.
    Progress {
        /// Derived percentage.
        percent: i8,
        /// Current position, formatted `HH:MM:SS.ss`.
        current_time: String,
        /// Total duration, formatted `HH:MM:SS.ss`, if known.
        total_duration: Option<String>,
    },
    /// A fatal error keyword was observed.
    Error(String),
}

/// Incremental stderr-line parser for the external transcoder tool.
#[derive(Debug, Default)]
pub struct StderrParser {
    duration_secs: Option<f64>,
    last_emitted_percent: Option<i8>,
    started: bool,
}

impl StderrParser {
    /// Construct a fresh parser with no state latched yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line of stderr, returning an event if this line produced one.
    pub fn feed(&mut self, line: &str) -> Option<ParserEvent> {
        if let Some(marker) = ERROR_MARKERS.iter().find(|marker| line.contains(**marker)) {
            return Some(ParserEvent::Error(format!("{marker}: {line}")));
        }

        if self.duration_secs.is_none() {
            if let Some(captures) = duration_pattern().captures(line) {
                self.duration_secs = Some(parse_timestamp(&captures));
            }
        }

        if !self.started && (line.contains("Stream mapping:") || line.contains("Press [q] to stop")) {
            self.started = true;
            return Some(ParserEvent::Started);
        }

        if let Some(captures) = time_pattern().captures(line) {
            let current_secs = parse_timestamp(&captures);
            let percent = self.compute_percent(current_secs);
            if self.last_emitted_percent == Some(percent) {
                return None;
            }
            self.last_emitted_percent = Some(percent);
            return Some(ParserEvent::Progress {
                percent,
                current_time: format_timestamp(current_secs),
                total_duration: self.duration_secs.map(format_timestamp),
            });
        }

        None
    }

    /// Whether a `Duration:` header has been observed yet.
    #[must_use]
    pub const fn has_duration(&self) -> bool {
        self.duration_secs.is_some()
    }

    fn compute_percent(&self, current_secs: f64) -> i8 {
        let Some(total) = self.duration_secs else {
            return 15;
        };
        if total <= 0.0 {
            return 15;
        }
        let raw = 100.0 * current_secs / total;
        raw.min(95.0).max(15.0).round() as i8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latches_duration_once() {
        let mut parser = StderrParser::new();
        parser.feed("Duration: 00:01:40.00, start: 0.000000, bitrate: 128 kb/s");
        assert!(parser.has_duration());
        parser.feed("Duration: 00:05:00.00, start: 0.000000, bitrate: 128 kb/s");
        // Second Duration: line must not overwrite the first.
        let event = parser.feed("time=00:00:50.00 bitrate=128.0kbits/s speed=1.0x");
        assert_eq!(
            event,
            Some(ParserEvent::Progress {
                percent: 50,
                current_time: "00:00:50.00".to_string(),
                total_duration: Some("00:01:40.00".to_string()),
            })
        );
    }

    #[test]
    fn recognises_start_boundary() {
        let mut parser = StderrParser::new();
        let event = parser.feed("Stream mapping:");
        assert_eq!(event, Some(ParserEvent::Started));
    }

    #[test]
    fn recognises_error_keywords() {
        let mut parser = StderrParser::new();
        let event = parser.feed("a.mp3: Invalid data found when processing input");
        assert!(matches!(event, Some(ParserEvent::Error(_))));
    }

    #[test]
    fn progress_is_clamped_between_15_and_95() {
        let mut parser = StderrParser::new();
        parser.feed("Duration: 00:01:00.00, start: 0.0, bitrate: 1 kb/s");
        let early = parser.feed("time=00:00:00.10 speed=1.0x").unwrap();
        assert_eq!(early, ParserEvent::Progress { percent: 15, current_time: "00:00:00.10".to_string(), total_duration: Some("00:01:00.00".to_string()) });

        let mut near_end = StderrParser::new();
        near_end.feed("Duration: 00:01:00.00, start: 0.0, bitrate: 1 kb/s");
        let late = near_end.feed("time=00:00:59.90 speed=1.0x").unwrap();
        assert_eq!(late, ParserEvent::Progress { percent: 95, current_time: "00:00:59.90".to_string(), total_duration: Some("00:01:00.00".to_string()) });
    }

    #[test]
    fn identical_progress_values_are_debounced() {
        let mut parser = StderrParser::new();
        parser.feed("Duration: 00:01:00.00, start: 0.0, bitrate: 1 kb/s");
        let first = parser.feed("time=00:00:30.00 speed=1.0x");
        assert!(first.is_some());
        let second = parser.feed("time=00:00:30.01 speed=1.0x");
        assert_eq!(second, None, "sub-second jitter mapping to the same integer percent must be debounced");
    }

    #[test]
    fn defaults_to_15_percent_without_a_known_duration() {
        let mut parser = StderrParser::new();
        let event = parser.feed("time=00:00:10.00 speed=1.0x").unwrap();
        assert_eq!(event, ParserEvent::Progress { percent: 15, current_time: "00:00:10.00".to_string(), total_duration: None });
    }
}
