//! Filtergraph synthesis for chat compositing.
//!
//! The composition graph is built as an ordered list of [`Stage`] records
//! and only serialized at the end. Each stage consumes pins that are either
//! named encoder inputs or outputs of an earlier stage, so the result is
//! always a single linear chain from `video_input` to `output`:
//!
//! ```text
//! [chat_color_input][chat_mask_input] alphamerge, pad ──► [chat]
//! [chat_background] pad ──► [background]                  (optional)
//! [video_input][background] overlay ──► [tmp1]            (or: null)
//! [tmp1][chat] overlay ──► [tmp2]
//! [chat_border] pad ──► [border]                          (optional)
//! [tmp2][border] overlay ──► [output]                     (or: null)
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

/// Pin bound to the source video stream.
pub const PIN_VIDEO: &str = "video_input";
/// Pin bound to the rendered chat color stream.
pub const PIN_CHAT_COLOR: &str = "chat_color_input";
/// Pin bound to the rendered chat alpha-mask stream.
pub const PIN_CHAT_MASK: &str = "chat_mask_input";
/// Pin bound to the optional background image.
pub const PIN_CHAT_BACKGROUND: &str = "chat_background";
/// Pin bound to the optional border image.
pub const PIN_CHAT_BORDER: &str = "chat_border";
/// Final pin of the composition graph.
pub const PIN_OUTPUT: &str = "output";

const PIN_CHAT: &str = "chat";
const PIN_BACKGROUND: &str = "background";
const PIN_BORDER: &str = "border";
const PIN_TMP1: &str = "tmp1";
const PIN_TMP2: &str = "tmp2";

/// Filter that forwards its input unchanged.
pub const FILTER_PASSTHROUGH: &str = "null";
const FILTER_ALPHAMERGE: &str = "alphamerge";
const FILTER_OVERLAY: &str = "overlay";

/// One filter chain: input pins, filter operations, output pins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    inputs: Vec<String>,
    filters: Vec<String>,
    outputs: Vec<String>,
}

impl Stage {
    /// Create a stage reading the given pins.
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
            filters: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Append a filter operation.
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    /// Append an output pin.
    pub fn output(mut self, pin: impl Into<String>) -> Self {
        self.outputs.push(pin.into());
        self
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for input in &self.inputs {
            write!(f, "[{input}]")?;
        }
        write!(f, " {} ", self.filters.join(", "))?;
        for output in &self.outputs {
            write!(f, "[{output}]")?;
        }
        Ok(())
    }
}

/// Ordered list of stages over a set of pre-defined source pins.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Filtergraph {
    sources: Vec<String>,
    stages: Vec<Stage>,
}

impl Filtergraph {
    /// Create an empty graph whose stages may read the given source pins.
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            stages: Vec::new(),
        }
    }

    /// Append a stage.
    pub fn push(&mut self, stage: Stage) {
        debug_assert!(
            stage.inputs.iter().all(|pin| self.is_defined(pin)),
            "stage reads an undefined pin: {stage}"
        );
        self.stages.push(stage);
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Input pins read before anything defined them, in stage order.
    pub fn undefined_inputs(&self) -> Vec<&str> {
        let mut defined: Vec<&str> = self.sources.iter().map(String::as_str).collect();
        let mut undefined = Vec::new();

        for stage in &self.stages {
            for input in &stage.inputs {
                if !is_stream_specifier(input) && !defined.contains(&input.as_str()) {
                    undefined.push(input.as_str());
                }
            }
            defined.extend(stage.outputs.iter().map(String::as_str));
        }

        undefined
    }

    fn is_defined(&self, pin: &str) -> bool {
        is_stream_specifier(pin)
            || self.sources.iter().any(|s| s == pin)
            || self
                .stages
                .iter()
                .any(|stage| stage.outputs.iter().any(|o| o == pin))
    }
}

impl fmt::Display for Filtergraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stage) in self.stages.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{stage}")?;
        }
        Ok(())
    }
}

/// Whether a pin is a raw encoder stream reference such as `0:v`.
fn is_stream_specifier(pin: &str) -> bool {
    match pin.split_once(':') {
        Some((index, _)) => !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Pad filter framing any input onto a transparent `width`x`height` canvas at `(x, y)`.
pub fn pad_filter(width: u32, height: u32, x: i32, y: i32) -> String {
    format!("pad={width}:{height}:{x}:{y}:0x00000000")
}

/// One encoder input bound to a named pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedInput {
    /// Zero-based encoder stream index
    pub index: usize,
    pub path: PathBuf,
    pub pin: &'static str,
}

/// Encoder inputs in fixed order with their pin bindings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedInputs {
    inputs: Vec<MappedInput>,
}

impl MappedInputs {
    /// Enumerate streams as [video, chat color, chat mask, background?, border?].
    ///
    /// Indices are assigned only to present streams, so they are always
    /// contiguous from zero.
    pub fn build(
        video: &Path,
        chat_color: &Path,
        chat_mask: &Path,
        background: Option<&Path>,
        border: Option<&Path>,
    ) -> Self {
        let streams = [
            (Some(video), PIN_VIDEO),
            (Some(chat_color), PIN_CHAT_COLOR),
            (Some(chat_mask), PIN_CHAT_MASK),
            (background, PIN_CHAT_BACKGROUND),
            (border, PIN_CHAT_BORDER),
        ];

        let inputs = streams
            .into_iter()
            .filter_map(|(path, pin)| path.map(|p| (p, pin)))
            .enumerate()
            .map(|(index, (path, pin))| MappedInput {
                index,
                path: path.to_path_buf(),
                pin,
            })
            .collect();

        Self { inputs }
    }

    pub fn inputs(&self) -> &[MappedInput] {
        &self.inputs
    }

    /// Whether a stream is bound to `pin`.
    pub fn has_pin(&self, pin: &str) -> bool {
        self.inputs.iter().any(|input| input.pin == pin)
    }

    /// Encoder input arguments, `-i "path" ` per stream.
    pub fn input_args(&self) -> String {
        self.inputs
            .iter()
            .map(|input| format!("-i \"{}\" ", input.path.display()))
            .collect()
    }

    /// Stages binding each raw stream to its pin.
    pub fn mapping_graph(&self) -> Filtergraph {
        let mut graph = Filtergraph::default();
        for input in &self.inputs {
            graph.push(
                Stage::new([format!("{}:v", input.index)])
                    .filter(FILTER_PASSTHROUGH)
                    .output(input.pin),
            );
        }
        graph
    }

    /// Pin mapping text, one `[N:v] null [pin]; ` per stream.
    ///
    /// The trailing separator lets the text prefix a filtergraph directly.
    pub fn mappings(&self) -> String {
        self.mapping_graph()
            .stages()
            .iter()
            .map(|stage| format!("{stage}; "))
            .collect()
    }
}

/// Build the encoder inputs and pin mappings for a composition.
pub fn build_mapped_inputs(
    video: &Path,
    chat_color: &Path,
    chat_mask: &Path,
    background: Option<&Path>,
    border: Option<&Path>,
) -> (String, String) {
    let mapped = MappedInputs::build(video, chat_color, chat_mask, background, border);
    (mapped.input_args(), mapped.mappings())
}

/// Synthesize the compositing graph.
///
/// `width`/`height` is the canvas every layer is padded onto (the source
/// video size) and `(x, y)` the chat position on it.
pub fn synthesize(
    has_background: bool,
    has_border: bool,
    width: u32,
    height: u32,
    x: i32,
    y: i32,
) -> Filtergraph {
    let pad = pad_filter(width, height, x, y);

    let mut sources = vec![PIN_VIDEO, PIN_CHAT_COLOR, PIN_CHAT_MASK];
    if has_background {
        sources.push(PIN_CHAT_BACKGROUND);
    }
    if has_border {
        sources.push(PIN_CHAT_BORDER);
    }
    let mut graph = Filtergraph::new(sources);

    graph.push(
        Stage::new([PIN_CHAT_COLOR, PIN_CHAT_MASK])
            .filter(FILTER_ALPHAMERGE)
            .filter(pad.as_str())
            .output(PIN_CHAT),
    );

    if has_background {
        graph.push(
            Stage::new([PIN_CHAT_BACKGROUND])
                .filter(pad.as_str())
                .output(PIN_BACKGROUND),
        );
        graph.push(
            Stage::new([PIN_VIDEO, PIN_BACKGROUND])
                .filter(FILTER_OVERLAY)
                .output(PIN_TMP1),
        );
    } else {
        graph.push(
            Stage::new([PIN_VIDEO])
                .filter(FILTER_PASSTHROUGH)
                .output(PIN_TMP1),
        );
    }

    graph.push(
        Stage::new([PIN_TMP1, PIN_CHAT])
            .filter(FILTER_OVERLAY)
            .output(PIN_TMP2),
    );

    if has_border {
        graph.push(
            Stage::new([PIN_CHAT_BORDER])
                .filter(pad.as_str())
                .output(PIN_BORDER),
        );
        graph.push(
            Stage::new([PIN_TMP2, PIN_BORDER])
                .filter(FILTER_OVERLAY)
                .output(PIN_OUTPUT),
        );
    } else {
        graph.push(
            Stage::new([PIN_TMP2])
                .filter(FILTER_PASSTHROUGH)
                .output(PIN_OUTPUT),
        );
    }

    graph
}

/// Synthesize the compositing graph as encoder filtergraph text.
pub fn build_filtergraph(
    has_background: bool,
    has_border: bool,
    width: u32,
    height: u32,
    x: i32,
    y: i32,
) -> String {
    synthesize(has_background, has_border, width, height, x, y).to_string()
}
