//! Encoder progress parsing.
//!
//! The encoder writes periodic stat lines to stderr while encoding:
//!
//! ```text
//! frame=  120 fps= 60 q=28.0 size=     512kB time=00:00:04.00 bitrate=1048.6kbits/s speed=2.01x
//! ```

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

fn stat_regex() -> &'static Regex {
    static STAT: OnceLock<Regex> = OnceLock::new();
    STAT.get_or_init(|| {
        Regex::new(r"(frame|fps|time|speed)=\s*([0-9:.]+|N/A)")
            .expect("stat regex is valid")
    })
}

/// Progress information from one encoder stat line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncoderStats {
    /// Frames written so far
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output position in seconds
    pub time_secs: f64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
}

impl EncoderStats {
    /// Parse a stat line. Returns `None` for lines without an output position.
    pub fn parse(line: &str) -> Option<Self> {
        let mut stats = Self::default();
        let mut has_time = false;

        for caps in stat_regex().captures_iter(line) {
            let value = &caps[2];
            match &caps[1] {
                "frame" => stats.frame = value.parse().unwrap_or(0),
                "fps" => stats.fps = value.parse().unwrap_or(0.0),
                "speed" => stats.speed = value.parse().unwrap_or(0.0),
                "time" => {
                    if let Some(secs) = parse_timestamp(value) {
                        stats.time_secs = secs;
                        has_time = true;
                    }
                }
                _ => {}
            }
        }

        has_time.then_some(stats)
    }

    /// Progress percentage given the total duration in seconds.
    pub fn percentage(&self, total_secs: f64) -> f64 {
        if total_secs <= 0.0 {
            return 0.0;
        }
        ((self.time_secs / total_secs) * 100.0).clamp(0.0, 100.0)
    }

    /// Estimate time remaining in seconds.
    pub fn eta_seconds(&self, total_secs: f64) -> Option<f64> {
        if self.speed <= 0.0 || self.time_secs <= 0.0 {
            return None;
        }

        let remaining = total_secs - self.time_secs;
        if remaining <= 0.0 {
            return Some(0.0);
        }

        Some(remaining / self.speed)
    }
}

/// Parse `HH:MM:SS(.frac)` into seconds.
pub fn parse_timestamp(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}
