//! Composer configuration.

use std::path::PathBuf;

use tdl_models::request::DEFAULT_DOWNLOAD_THREADS;

/// Default encoder executable, looked up in `PATH`.
pub const DEFAULT_FFMPEG_PATH: &str = "ffmpeg";
/// Default downloader executable, looked up in `PATH`.
pub const DEFAULT_DOWNLOADER_PATH: &str = "TwitchDownloaderCLI";

/// Composer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposerConfig {
    /// Encoder used for probing and composition
    pub ffmpeg_path: PathBuf,
    /// Downloader CLI used for acquisition and chat rendering
    pub downloader_path: PathBuf,
    /// Cache folder for the chat renderer
    pub temp_dir: Option<PathBuf>,
    /// Parallel segment downloads for VODs
    pub download_threads: usize,
    /// Keep intermediate files after each run
    pub keep_intermediates: bool,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from(DEFAULT_FFMPEG_PATH),
            downloader_path: PathBuf::from(DEFAULT_DOWNLOADER_PATH),
            temp_dir: None,
            download_threads: DEFAULT_DOWNLOAD_THREADS,
            keep_intermediates: false,
        }
    }
}

impl ComposerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            ffmpeg_path: lookup("TDL_FFMPEG_PATH")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_path),
            downloader_path: lookup("TDL_DOWNLOADER_PATH")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.downloader_path),
            temp_dir: lookup("TDL_TEMP_DIR")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            download_threads: lookup("TDL_DOWNLOAD_THREADS")
                .and_then(|s| s.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(defaults.download_threads),
            keep_intermediates: lookup("TDL_KEEP_INTERMEDIATES")
                .map(|s| parse_flag(&s))
                .unwrap_or(defaults.keep_intermediates),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> ComposerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ComposerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        assert_eq!(config_from(&[]), ComposerConfig::default());
    }

    #[test]
    fn test_environment_overrides() {
        let config = config_from(&[
            ("TDL_FFMPEG_PATH", "/opt/ffmpeg/bin/ffmpeg"),
            ("TDL_DOWNLOADER_PATH", "/usr/local/bin/TwitchDownloaderCLI"),
            ("TDL_TEMP_DIR", "/var/cache/tdl"),
            ("TDL_DOWNLOAD_THREADS", "4"),
            ("TDL_KEEP_INTERMEDIATES", "TRUE"),
        ]);

        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
        assert_eq!(
            config.downloader_path,
            PathBuf::from("/usr/local/bin/TwitchDownloaderCLI")
        );
        assert_eq!(config.temp_dir, Some(PathBuf::from("/var/cache/tdl")));
        assert_eq!(config.download_threads, 4);
        assert!(config.keep_intermediates);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("TDL_DOWNLOAD_THREADS", "zero"),
            ("TDL_KEEP_INTERMEDIATES", "nope"),
            ("TDL_FFMPEG_PATH", ""),
        ]);

        assert_eq!(config.download_threads, DEFAULT_DOWNLOAD_THREADS);
        assert!(!config.keep_intermediates);
        assert_eq!(config.ffmpeg_path, PathBuf::from(DEFAULT_FFMPEG_PATH));

        assert_eq!(config_from(&[("TDL_DOWNLOAD_THREADS", "0")]).download_threads, DEFAULT_DOWNLOAD_THREADS);
    }
}
