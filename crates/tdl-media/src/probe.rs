//! Media dimension probing.
//!
//! The encoder is run in metadata-only mode and its diagnostic stream is
//! scanned for the first video stream header, e.g.
//!
//! ```text
//!   Stream #0:0(eng): Video: h264 (High), yuv420p, 1280x720 [SAR 1:1 DAR 16:9], 30 fps
//! ```
//!
//! A missing header is not an error: the 1920x1080 default is kept.

use regex::Regex;
use std::ffi::OsStr;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, info};

use tdl_models::VideoDimension;

use crate::cancel::CancelSignal;
use crate::command::ProcessRunner;
use crate::error::MediaResult;

static STREAM_HEADER: OnceLock<Regex> = OnceLock::new();
static DURATION_HEADER: OnceLock<Regex> = OnceLock::new();

fn stream_header() -> &'static Regex {
    STREAM_HEADER.get_or_init(|| {
        Regex::new(r"^\s*Stream #0:.*Video:.*, ([0-9]+)x([0-9]+)( \[.*\])?, .*$")
            .expect("valid stream header pattern")
    })
}

fn duration_header() -> &'static Regex {
    DURATION_HEADER.get_or_init(|| {
        Regex::new(r"^\s*Duration: ([0-9]+):([0-9]{2}):([0-9]{2}(?:\.[0-9]+)?)")
            .expect("valid duration pattern")
    })
}

/// What the prober learned about a media file.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MediaProbe {
    pub dimension: VideoDimension,
    /// Container duration in seconds, when reported
    pub duration: Option<f64>,
}

#[derive(Debug, Default)]
struct ProbeScan {
    dimension: Option<VideoDimension>,
    duration: Option<f64>,
}

impl ProbeScan {
    fn feed(&mut self, line: &str) {
        if self.dimension.is_none() {
            self.dimension = parse_stream_dimension(line);
        }
        if self.duration.is_none() {
            self.duration = parse_duration(line);
        }
    }

    fn finish(self) -> MediaProbe {
        MediaProbe {
            dimension: self.dimension.unwrap_or_default(),
            duration: self.duration,
        }
    }
}

/// Parse a video stream header line into its pixel size.
pub fn parse_stream_dimension(line: &str) -> Option<VideoDimension> {
    let caps = stream_header().captures(line)?;
    let width = caps.get(1)?.as_str().parse().ok()?;
    let height = caps.get(2)?.as_str().parse().ok()?;
    Some(VideoDimension::new(width, height))
}

/// Parse a `Duration: HH:MM:SS.ss` header line into seconds.
pub fn parse_duration(line: &str) -> Option<f64> {
    let caps = duration_header().captures(line)?;
    let hours: f64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: f64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: f64 = caps.get(3)?.as_str().parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Scan a complete diagnostic text. The first matching line of each kind wins.
pub fn scan_diagnostics(text: &str) -> MediaProbe {
    let mut scan = ProbeScan::default();
    for line in text.lines() {
        scan.feed(line);
    }
    scan.finish()
}

/// Probe a media file with the encoder.
///
/// Only spawn and read errors fail; the encoder's exit status is ignored
/// and an unrecognized diagnostic stream yields the default dimension.
pub async fn probe_media(
    media_path: impl AsRef<Path>,
    encoder_path: impl AsRef<Path>,
    cancel: CancelSignal,
) -> MediaResult<MediaProbe> {
    let media_path = media_path.as_ref();
    let args: [&OsStr; 7] = [
        "-v".as_ref(),
        "info".as_ref(),
        "-i".as_ref(),
        media_path.as_os_str(),
        "-f".as_ref(),
        "ffmetadata".as_ref(),
        "-".as_ref(),
    ];

    let outcome = ProcessRunner::new(encoder_path)
        .with_cancel(cancel)
        .run(args, ProbeScan::default(), |scan, line| scan.feed(line))
        .await?;

    if outcome.state.dimension.is_none() {
        info!(
            media = %media_path.display(),
            "No video stream header found, assuming default dimension"
        );
    }

    let probe = outcome.state.finish();
    debug!(
        media = %media_path.display(),
        dimension = %probe.dimension,
        duration = ?probe.duration,
        "Probed media"
    );

    Ok(probe)
}

/// Probe only the pixel size of a media file.
pub async fn probe_dimension(
    media_path: impl AsRef<Path>,
    encoder_path: impl AsRef<Path>,
) -> MediaResult<VideoDimension> {
    let probe = probe_media(media_path, encoder_path, CancelSignal::never()).await?;
    Ok(probe.dimension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MediaError;

    const FFMPEG_INFO: &str = "\
ffmpeg version 6.0 Copyright (c) 2000-2023 the FFmpeg developers
Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'clip_raw.mp4':
  Metadata:
    major_brand     : isom
  Duration: 00:01:02.50, start: 0.000000, bitrate: 3190 kb/s
  Stream #0:0[0x1](und): Video: h264 (High) (avc1 / 0x31637661), yuv420p(tv, bt709, progressive), 1920x1080 [SAR 1:1 DAR 16:9], 3000 kb/s, 60 fps, 60 tbr, 15360 tbn (default)
  Stream #0:1[0x2](und): Audio: aac (LC) (mp4a / 0x6134706D), 48000 Hz, stereo, fltp, 189 kb/s (default)
Output #0, ffmetadata, to 'pipe:':
";

    #[test]
    fn test_parse_simple_header() {
        let line = "Stream #0:0(eng): Video: h264, yuv420p, 1280x720 [...], 30 fps";
        assert_eq!(
            parse_stream_dimension(line),
            Some(VideoDimension::new(1280, 720))
        );
    }

    #[test]
    fn test_parse_header_without_tags() {
        let line = "    Stream #0:0: Video: vp9, yuv420p, 852x480, 30 fps, 30 tbr";
        assert_eq!(
            parse_stream_dimension(line),
            Some(VideoDimension::new(852, 480))
        );
    }

    #[test]
    fn test_audio_stream_is_not_a_match() {
        let line = "  Stream #0:1(und): Audio: aac (LC), 48000 Hz, stereo, fltp, 128 kb/s";
        assert_eq!(parse_stream_dimension(line), None);
    }

    #[test]
    fn test_scan_real_output() {
        let probe = scan_diagnostics(FFMPEG_INFO);
        assert_eq!(probe.dimension, VideoDimension::new(1920, 1080));
        assert!((probe.duration.unwrap() - 62.5).abs() < 1e-9);
    }

    #[test]
    fn test_scan_first_match_wins() {
        let text = "Stream #0:0: Video: h264, yuv420p, 1280x720, 30 fps\n\
                    Stream #0:1: Video: png, rgba, 64x64, 90k tbr";
        assert_eq!(scan_diagnostics(text).dimension, VideoDimension::new(1280, 720));
    }

    #[test]
    fn test_scan_without_match_keeps_default() {
        let probe = scan_diagnostics("clip_raw.mp4: No such file or directory\n");
        assert_eq!(probe.dimension, VideoDimension::new(1920, 1080));
        assert_eq!(probe.duration, None);
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("  Duration: 01:00:00.00, start: 0"), Some(3600.0));
        assert_eq!(parse_duration("  Duration: N/A, bitrate: N/A"), None);
    }

    #[tokio::test]
    async fn test_probe_missing_encoder_fails() {
        let err = probe_dimension("video.mp4", "/no/such/encoder").await.unwrap_err();
        assert!(matches!(err, MediaError::ExecutableNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_probe_unparseable_output_uses_default() {
        // `sh -v info ...` fails to open a script named "info" and exits
        // non-zero without printing a stream header.
        let dim = probe_dimension("video.mp4", "/bin/sh").await.unwrap();
        assert_eq!(dim, VideoDimension::default());
    }
}
