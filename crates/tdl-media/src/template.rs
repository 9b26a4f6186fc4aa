//! Argument templates.
//!
//! Encoder arguments are configured as single strings with `{name}`
//! placeholders. [`CompositionArguments`] carries one named field per
//! placeholder and renders a template in a single left-to-right pass, so
//! substituted values are never re-scanned for placeholders.

use std::path::{Path, PathBuf};

use tdl_models::VideoDimension;

/// Values for every placeholder recognized in a composition template.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionArguments {
    pub video: PathBuf,
    pub chat: PathBuf,
    pub chat_mask: PathBuf,
    pub border: Option<PathBuf>,
    pub background: Option<PathBuf>,
    /// Rendered `-i "path" ` list
    pub input_files: String,
    /// Rendered `[N:v] null [pin]; ` list
    pub input_mappings: String,
    pub filtergraph: String,
    pub save_path: PathBuf,
    pub chat_top: i32,
    pub chat_left: i32,
    pub dimension: VideoDimension,
    pub fps: u32,
}

impl CompositionArguments {
    /// Value for a placeholder name, or `None` if the name is not recognized.
    fn lookup(&self, name: &str) -> Option<String> {
        let value = match name {
            "video" => display(&self.video),
            "chat" => display(&self.chat),
            "chat_mask" => display(&self.chat_mask),
            "border" => optional(self.border.as_deref()),
            "background" => optional(self.background.as_deref()),
            "input_files" => self.input_files.clone(),
            "input_mappings" => self.input_mappings.clone(),
            "filtergraph" => self.filtergraph.clone(),
            "save_path" => display(&self.save_path),
            "chat_top" => self.chat_top.to_string(),
            "chat_left" => self.chat_left.to_string(),
            "video_width" => self.dimension.width.to_string(),
            "video_height" => self.dimension.height.to_string(),
            "fps" => self.fps.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Substitute every recognized placeholder in `template`.
    ///
    /// Unknown `{...}` sequences and unbalanced braces are kept verbatim.
    pub fn apply(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];

            let Some(close) = tail[1..].find(['{', '}']).map(|i| i + 1) else {
                out.push_str(tail);
                return out;
            };

            if tail.as_bytes()[close] == b'{' {
                // Nested opening brace: emit up to it and rescan from there
                out.push_str(&tail[..close]);
                rest = &tail[close..];
                continue;
            }

            match self.lookup(&tail[1..close]) {
                Some(value) => out.push_str(&value),
                None => out.push_str(&tail[..=close]),
            }
            rest = &tail[close + 1..];
        }

        out.push_str(rest);
        out
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

fn optional(path: Option<&Path>) -> String {
    path.map(display).unwrap_or_default()
}

/// Split a command-line string into arguments.
///
/// Whitespace separates arguments, double quotes group text (and are
/// removed) and `\"` yields a literal quote. Any other backslash is kept so
/// Windows paths survive.
pub fn split_arguments(text: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'"') => {
                chars.next();
                current.push('"');
                in_token = true;
            }
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_token {
        args.push(current);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arguments() -> CompositionArguments {
        CompositionArguments {
            video: PathBuf::from("/tmp/out_raw.mp4"),
            chat: PathBuf::from("/tmp/out_chat.mp4"),
            chat_mask: PathBuf::from("/tmp/out_chat_mask.mp4"),
            border: None,
            background: Some(PathBuf::from("/img/bg.png")),
            input_files: "-i \"a.mp4\" ".to_string(),
            input_mappings: "[0:v] null [video_input]; ".to_string(),
            filtergraph: "[video_input] null [output]".to_string(),
            save_path: PathBuf::from("/tmp/out.mp4"),
            chat_top: 20,
            chat_left: 10,
            dimension: VideoDimension::new(1280, 720),
            fps: 30,
        }
    }

    #[test]
    fn test_apply_recognized_placeholders() {
        let args = arguments();
        let text = args.apply("{input_files}-vf \"{input_mappings}{filtergraph}\" \"{save_path}\"");
        assert_eq!(
            text,
            "-i \"a.mp4\" -vf \"[0:v] null [video_input]; [video_input] null [output]\" \"/tmp/out.mp4\""
        );

        assert_eq!(
            args.apply("{video_width}x{video_height}@{fps} at {chat_left},{chat_top}"),
            "1280x720@30 at 10,20"
        );
        assert_eq!(args.apply("{video}|{chat}|{chat_mask}"), "/tmp/out_raw.mp4|/tmp/out_chat.mp4|/tmp/out_chat_mask.mp4");
    }

    #[test]
    fn test_absent_image_substitutes_empty() {
        let args = arguments();
        assert_eq!(args.apply("[{border}][{background}]"), "[][/img/bg.png]");
    }

    #[test]
    fn test_unknown_placeholders_pass_through() {
        let args = arguments();
        assert_eq!(args.apply("{max_int} {fps}"), "{max_int} 30");
        assert_eq!(args.apply("open { brace"), "open { brace");
        assert_eq!(args.apply("{{fps}}"), "{30}");
        assert_eq!(args.apply("close } only"), "close } only");
    }

    #[test]
    fn test_substituted_values_are_not_rescanned() {
        let mut args = arguments();
        args.filtergraph = "{save_path}".to_string();
        assert_eq!(args.apply("{filtergraph}"), "{save_path}");
    }

    #[test]
    fn test_split_arguments() {
        assert_eq!(
            split_arguments("-i \"my video.mp4\"  -map \"[output]\" -y"),
            vec!["-i", "my video.mp4", "-map", "[output]", "-y"]
        );
        assert_eq!(split_arguments("-metadata title=\\\"x\\\""), vec!["-metadata", "title=\"x\""]);
        assert_eq!(split_arguments("a \"\" b"), vec!["a", "", "b"]);
        assert_eq!(split_arguments("C:\\videos\\out.mp4"), vec!["C:\\videos\\out.mp4"]);
        assert!(split_arguments("   ").is_empty());
    }

    #[test]
    fn test_split_default_composer_template() {
        let args = arguments();
        let text = args.apply(tdl_models::request::DEFAULT_COMPOSER_ARGS);
        let split = split_arguments(&text);

        assert_eq!(&split[..2], ["-i", "a.mp4"]);
        assert_eq!(split[2], "-filter_complex");
        assert_eq!(split[3], "[0:v] null [video_input]; [video_input] null [output]");
        assert_eq!(split.last().map(String::as_str), Some("/tmp/out.mp4"));
    }
}
