//! Intermediate artifact naming.
//!
//! Every composition writes four intermediate files next to the requested
//! output. Their names are a pure function of the output path:
//!
//! ```text
//! out/stream.mp4 ──┬── out/stream_raw.mp4        (acquired media)
//!                  ├── out/stream_chat.json      (chat transcript)
//!                  ├── out/stream_chat.mp4       (rendered chat, color)
//!                  └── out/stream_chat_mask.mp4  (rendered chat, alpha)
//! ```

use serde::{Deserialize, Serialize};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

const RAW_SUFFIX: &str = "_raw";
const CHAT_JSON_SUFFIX: &str = "_chat.json";
const CHAT_SUFFIX: &str = "_chat";
const CHAT_MASK_SUFFIX: &str = "_chat_mask";

/// Paths of the intermediate files for one composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntermediateArtifacts {
    /// Downloaded VOD or clip
    pub raw_video: PathBuf,
    /// Chat transcript in JSON interchange format
    pub chat_json: PathBuf,
    /// Rendered chat color stream
    pub chat_video: PathBuf,
    /// Rendered chat alpha-mask stream
    pub chat_mask: PathBuf,
}

impl IntermediateArtifacts {
    /// Derive the artifact paths from the final output path.
    ///
    /// The output extension is preserved verbatim on the three video
    /// artifacts. Returns `None` when the path has no file name.
    pub fn derive(output_path: impl AsRef<Path>) -> Option<Self> {
        let output_path = output_path.as_ref();
        let stem = output_path.file_stem()?;
        let extension = output_path.extension();

        let sibling = |suffix: &str, ext: Option<&OsStr>| -> PathBuf {
            let mut name = OsString::from(stem);
            name.push(suffix);
            if let Some(ext) = ext {
                name.push(".");
                name.push(ext);
            }
            output_path.with_file_name(name)
        };

        Some(Self {
            raw_video: sibling(RAW_SUFFIX, extension),
            chat_json: sibling(CHAT_JSON_SUFFIX, None),
            chat_video: sibling(CHAT_SUFFIX, extension),
            chat_mask: sibling(CHAT_MASK_SUFFIX, extension),
        })
    }

    /// All paths in the order the pipeline creates them.
    pub fn all(&self) -> [&Path; 4] {
        [
            &self.raw_video,
            &self.chat_json,
            &self.chat_video,
            &self.chat_mask,
        ]
    }

    /// False when two artifacts share a path, as the rendered chat and the
    /// transcript do for a `.json` output.
    pub fn is_distinct(&self) -> bool {
        let paths = self.all();
        paths
            .iter()
            .enumerate()
            .all(|(i, path)| !paths[i + 1..].contains(path))
    }
}
