// ============================================================================
// reelq-core/src/progress.rs
// ============================================================================
//
// PROGRESS PARSING: Completion Fraction from ffmpeg Diagnostics
//
// ffmpeg prints the input duration once (`Duration: HH:MM:SS.cc`) and then
// rewrites a status line containing `time=HH:MM:SS.cc` in place using
// carriage returns. This module turns that stream into a monotonic fraction
// in [0, 1].
//
// KEY COMPONENTS:
// - ProgressParser: stateful duration/time tracker for one job
// - DiagnosticLines: line iterator that splits on both `\r` and `\n`

// ---- External crate imports ----
use once_cell::sync::Lazy;
use regex::Regex;

// ---- Standard library imports ----
use std::io::{self, BufRead};

// ---- Internal crate imports ----
use crate::utils::parse_ffmpeg_time;

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Duration:\s*(\d+:\d{2}:\d{2}(?:\.\d+)?)").expect("duration pattern is valid")
});

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"time=\s*(-?)(\d+:\d{2}:\d{2}(?:\.\d+)?)").expect("time pattern is valid")
});

// ============================================================================
// PROGRESS PARSER
// ============================================================================

/// Tracks the completion fraction of one ffmpeg run.
///
/// Only the first `Duration:` line counts; `Duration: N/A` is ignored. A
/// duration supplied up front (the trimmed length, for instance) wins over
/// anything printed by ffmpeg, because the input duration would understate
/// progress for trimmed output.
#[derive(Debug, Clone, Default)]
pub struct ProgressParser {
    total: Option<f64>,
    fixed_total: bool,
    fraction: f64,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parser with a known output duration. Non-positive values are ignored.
    pub fn with_expected_duration(expected: Option<f64>) -> Self {
        match expected.filter(|d| d.is_finite() && *d > 0.0) {
            Some(total) => Self {
                total: Some(total),
                fixed_total: true,
                fraction: 0.0,
            },
            None => Self::new(),
        }
    }

    /// Total duration in seconds, once known.
    #[must_use]
    pub fn total(&self) -> Option<f64> {
        self.total
    }

    /// Current fraction in [0, 1].
    #[must_use]
    pub fn fraction(&self) -> f64 {
        self.fraction
    }

    /// Feeds one diagnostic line. Returns the new fraction when it increased.
    pub fn feed(&mut self, line: &str) -> Option<f64> {
        if !self.fixed_total && self.total.is_none() {
            if let Some(total) = DURATION_RE
                .captures(line)
                .and_then(|caps| parse_ffmpeg_time(&caps[1]))
                .filter(|total| *total > 0.0)
            {
                log::trace!("Detected input duration: {total:.2}s");
                self.total = Some(total);
            }
        }

        let caps = TIME_RE.captures(line)?;
        let total = self.total?;
        let elapsed = if caps[1].is_empty() {
            parse_ffmpeg_time(&caps[2])?
        } else {
            0.0
        };

        let fraction = (elapsed / total).clamp(0.0, 1.0);
        if fraction > self.fraction {
            self.fraction = fraction;
            Some(fraction)
        } else {
            None
        }
    }

    /// Final fraction: exactly 1 on success, otherwise the last observed value.
    pub fn finish(&mut self, success: bool) -> f64 {
        if success {
            self.fraction = 1.0;
        }
        self.fraction
    }
}

/// Runs a whole transcript through a fresh parser and returns the last fraction.
pub fn parse_transcript<I, S>(lines: I) -> f64
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = ProgressParser::new();
    for line in lines {
        parser.feed(line.as_ref());
    }
    parser.fraction()
}

// ============================================================================
// LINE SPLITTING
// ============================================================================

/// Iterator over diagnostic lines, treating `\r` and `\n` as terminators.
///
/// Invalid UTF-8 is replaced rather than rejected. `\r\n` yields an empty
/// line between the two terminators; callers skip blank lines.
pub struct DiagnosticLines<R> {
    reader: R,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> DiagnosticLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for DiagnosticLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        self.buf.clear();
        loop {
            let available = match self.reader.fill_buf() {
                Ok(available) => available,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            if available.is_empty() {
                self.done = true;
                if self.buf.is_empty() {
                    return None;
                }
                return Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()));
            }

            if let Some(pos) = available.iter().position(|&b| b == b'\n' || b == b'\r') {
                self.buf.extend_from_slice(&available[..pos]);
                self.reader.consume(pos + 1);
                return Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()));
            }

            let len = available.len();
            self.buf.extend_from_slice(available);
            self.reader.consume(len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_half_way() {
        let mut parser = ProgressParser::new();
        assert_eq!(
            parser.feed("  Duration: 00:01:40.00, start: 0.000000, bitrate: 1205 kb/s"),
            None
        );
        assert_eq!(parser.total(), Some(100.0));
        let fraction = parser.feed("frame= 1500 fps=250 q=28.0 size=  2048kB time=00:00:50.00 bitrate= 335.5kbits/s speed=8.3x");
        assert_eq!(fraction, Some(0.5));
    }

    #[test]
    fn test_only_first_duration_counts() {
        let mut parser = ProgressParser::new();
        parser.feed("Duration: 00:00:10.00, start: 0.0");
        parser.feed("Duration: 00:01:00.00, start: 0.0");
        assert_eq!(parser.total(), Some(10.0));
    }

    #[test]
    fn test_unavailable_duration_is_ignored() {
        let mut parser = ProgressParser::new();
        parser.feed("  Duration: N/A, start: 0.000000, bitrate: N/A");
        assert_eq!(parser.feed("time=00:00:05.00"), None);
        parser.feed("  Duration: 00:00:20.00, start: 0.0");
        assert_eq!(parser.feed("time=00:00:05.00"), Some(0.25));
    }

    #[test]
    fn test_expected_duration_overrides_input_duration() {
        let mut parser = ProgressParser::with_expected_duration(Some(10.0));
        parser.feed("Duration: 00:01:40.00, start: 0.0");
        assert_eq!(parser.total(), Some(10.0));
        assert_eq!(parser.feed("time=00:00:05.00"), Some(0.5));
    }

    #[test]
    fn test_fraction_never_decreases_and_is_clamped() {
        let mut parser = ProgressParser::with_expected_duration(Some(10.0));
        assert_eq!(parser.feed("time=00:00:06.00"), Some(0.6));
        assert_eq!(parser.feed("time=00:00:03.00"), None);
        assert_eq!(parser.feed("time=-00:00:01.00"), None);
        assert_eq!(parser.feed("time=00:00:30.00"), Some(1.0));
        assert_eq!(parser.fraction(), 1.0);
    }

    #[test]
    fn test_finish() {
        let mut parser = ProgressParser::with_expected_duration(Some(10.0));
        parser.feed("time=00:00:04.00");
        assert_eq!(parser.clone().finish(false), 0.4);
        assert_eq!(parser.finish(true), 1.0);
    }

    #[test]
    fn test_parse_transcript() {
        let lines = [
            "Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'in.mp4':",
            "  Duration: 00:00:08.00, start: 0.000000, bitrate: 900 kb/s",
            "frame=   60 fps=0.0 time=00:00:02.00 bitrate=N/A",
            "frame=  120 fps=119 time=00:00:04.00 bitrate=N/A",
        ];
        assert_eq!(parse_transcript(lines), 0.5);
        assert_eq!(parse_transcript(Vec::<String>::new()), 0.0);
    }

    #[test]
    fn test_diagnostic_lines_split_on_carriage_returns() {
        let data = b"Duration: 00:00:10.00\nframe=1 time=00:00:01.00\rframe=2 time=00:00:02.00\r\nlast";
        let lines: Vec<String> = DiagnosticLines::new(Cursor::new(&data[..]))
            .map(|line| line.unwrap())
            .filter(|line| !line.is_empty())
            .collect();
        assert_eq!(
            lines,
            vec![
                "Duration: 00:00:10.00",
                "frame=1 time=00:00:01.00",
                "frame=2 time=00:00:02.00",
                "last",
            ]
        );
    }

    #[test]
    fn test_diagnostic_lines_lossy_utf8() {
        let data = b"bad \xff byte\n";
        let lines: Vec<String> = DiagnosticLines::new(Cursor::new(&data[..]))
            .map(|line| line.unwrap())
            .collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("bad "));
    }
}
