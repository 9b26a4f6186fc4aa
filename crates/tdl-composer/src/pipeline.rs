//! Batch composition pipeline.
//!
//! Stages run strictly in order, each a hard precondition of the next:
//!
//! 1. derive intermediate paths from the output path
//! 2. acquire the VOD or clip
//! 3. acquire the chat transcript
//! 4. render chat to color + mask video
//! 5. probe the source dimensions
//! 6. synthesize the filtergraph and run the encoder
//!
//! Intermediate files are removed afterwards on every path, success or
//! failure, unless retention was requested. A stage failure is returned
//! as-is once cleanup has run.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, info, Instrument};

use tdl_media::{
    probe_media, split_arguments, synthesize, CancelSignal, CompositionArguments, EncoderStats,
    MappedInputs, ProcessRunner,
};
use tdl_media::filtergraph::{PIN_CHAT_BACKGROUND, PIN_CHAT_BORDER};
use tdl_models::{
    CompositionId, CompositionRequest, ContentKind, IntermediateArtifacts, VideoDimension,
};

use crate::cleanup::{cleanup, CleanupReport};
use crate::collaborators::{
    ChatAcquisition, ChatRenderJob, ClipAcquisition, Collaborators, VideoAcquisition,
};
use crate::error::{ComposeError, ComposeResult};
use crate::logging::ComposeLogger;
use crate::progress::ProgressSender;

/// Result of a successful composition.
#[derive(Debug, Clone)]
pub struct CompositionOutcome {
    pub composition_id: CompositionId,
    pub output_path: PathBuf,
    /// Probed size of the source video
    pub dimension: VideoDimension,
    /// Wall time of the final encoder run
    pub render_time: Duration,
    pub finished_at: DateTime<Utc>,
    pub cleanup: CleanupReport,
}

/// What the stages produced before cleanup.
struct Composed {
    dimension: VideoDimension,
    render_time: Duration,
}

/// Drives one composition at a time through every stage.
#[derive(Debug, Clone)]
pub struct BatchComposer {
    collaborators: Collaborators,
    cancel: CancelSignal,
}

impl BatchComposer {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            cancel: CancelSignal::never(),
        }
    }

    /// Observe `cancel` between stages and inside every child process.
    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the full pipeline for `request`.
    pub async fn compose(
        &self,
        request: &CompositionRequest,
        progress: &ProgressSender,
    ) -> ComposeResult<CompositionOutcome> {
        let composition_id = CompositionId::new();
        let logger = ComposeLogger::new(&composition_id, &request.id);
        let span = logger.create_span();

        self.compose_in_span(composition_id, request, progress, &logger)
            .instrument(span)
            .await
    }

    async fn compose_in_span(
        &self,
        composition_id: CompositionId,
        request: &CompositionRequest,
        progress: &ProgressSender,
        logger: &ComposeLogger,
    ) -> ComposeResult<CompositionOutcome> {
        let kind = ContentKind::classify(&request.id)
            .map_err(|e| ComposeError::invalid_request(e.to_string()))?;
        let artifacts = IntermediateArtifacts::derive(&request.output_path).ok_or_else(|| {
            ComposeError::invalid_request(format!(
                "output path has no file name: {}",
                request.output_path.display()
            ))
        })?;
        if !artifacts.is_distinct() {
            return Err(ComposeError::invalid_request(format!(
                "output path {} collides with the chat transcript",
                request.output_path.display()
            )));
        }

        logger.log_start(&format!(
            "{} {} -> {}",
            kind,
            request.id,
            request.output_path.display()
        ));

        let result = self
            .run_stages(request, kind, &artifacts, progress, logger)
            .await;

        let report = cleanup(&artifacts, request.retain_intermediates).await;
        if !report.is_clean() {
            logger.log_warning(&format!(
                "{} intermediate file(s) could not be removed",
                report.failures.len()
            ));
        }

        match result {
            Ok(composed) => {
                logger.log_completion(&format!(
                    "{} in {}s",
                    request.output_path.display(),
                    composed.render_time.as_secs()
                ));
                Ok(CompositionOutcome {
                    composition_id,
                    output_path: request.output_path.clone(),
                    dimension: composed.dimension,
                    render_time: composed.render_time,
                    finished_at: Utc::now(),
                    cleanup: report,
                })
            }
            Err(e) => {
                logger.log_error(e.stage(), &e.to_string());
                Err(e)
            }
        }
    }

    fn checkpoint(&self) -> ComposeResult<()> {
        if self.cancel.is_cancelled() {
            Err(ComposeError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn run_stages(
        &self,
        request: &CompositionRequest,
        kind: ContentKind,
        artifacts: &IntermediateArtifacts,
        progress: &ProgressSender,
        logger: &ComposeLogger,
    ) -> ComposeResult<Composed> {
        self.checkpoint()?;
        match kind {
            ContentKind::Vod => {
                logger.log_stage("acquisition", "Downloading VOD");
                progress.message("Downloading VOD");
                let job = VideoAcquisition {
                    id: request.id.clone(),
                    output: artifacts.raw_video.clone(),
                    quality: request.quality.clone(),
                    crop: request.crop,
                    threads: request.download_threads,
                    oauth: request.oauth.clone(),
                    temp_dir: request.temp_dir.clone(),
                };
                self.collaborators
                    .video
                    .acquire_video(&job, progress, self.cancel.clone())
                    .await?;
            }
            ContentKind::Clip => {
                logger.log_stage("acquisition", "Downloading clip");
                progress.message("Downloading clip");
                let job = ClipAcquisition {
                    id: request.id.clone(),
                    output: artifacts.raw_video.clone(),
                    quality: request.quality.clone(),
                };
                self.collaborators
                    .clip
                    .acquire_clip(&job, progress, self.cancel.clone())
                    .await?;
            }
        }

        self.checkpoint()?;
        logger.log_stage("acquisition", "Downloading chat");
        progress.message("Downloading chat");
        let chat_job = ChatAcquisition {
            id: request.id.clone(),
            output: artifacts.chat_json.clone(),
            crop: request.crop,
            timestamp: request.style.timestamp,
        };
        self.collaborators
            .chat
            .acquire_chat(&chat_job, progress, self.cancel.clone())
            .await?;

        self.checkpoint()?;
        logger.log_stage("render", "Rendering chat");
        progress.message("Rendering chat");
        let render_job = ChatRenderJob {
            input: artifacts.chat_json.clone(),
            output: artifacts.chat_video.clone(),
            mask_output: artifacts.chat_mask.clone(),
            style: request.style.clone(),
            encoder_path: request.encoder_path.clone(),
            temp_dir: request.temp_dir.clone(),
            input_args: request.templates.input_args.clone(),
            output_args: request.templates.output_args.clone(),
        };
        self.collaborators
            .renderer
            .render_chat(&render_job, progress, self.cancel.clone())
            .await?;

        self.checkpoint()?;
        logger.log_stage("probe", "Probing video");
        progress.message("Probing video");
        let probe = probe_media(
            &artifacts.raw_video,
            &request.encoder_path,
            self.cancel.clone(),
        )
        .await
        .map_err(ComposeError::from_probe)?;

        self.checkpoint()?;
        logger.log_stage("composition", "Composing video with chat");
        progress.message("Composing video with chat");
        let render_time = self
            .compose_video(request, artifacts, probe.dimension, probe.duration, progress)
            .await?;

        Ok(Composed {
            dimension: probe.dimension,
            render_time,
        })
    }

    async fn compose_video(
        &self,
        request: &CompositionRequest,
        artifacts: &IntermediateArtifacts,
        dimension: VideoDimension,
        duration: Option<f64>,
        progress: &ProgressSender,
    ) -> ComposeResult<Duration> {
        let layout = &request.layout;
        let background = layout.background_image.as_deref();
        let border = layout.border_image.as_deref();

        let mapped = MappedInputs::build(
            &artifacts.raw_video,
            &artifacts.chat_video,
            &artifacts.chat_mask,
            background,
            border,
        );
        let graph = synthesize(
            mapped.has_pin(PIN_CHAT_BACKGROUND),
            mapped.has_pin(PIN_CHAT_BORDER),
            dimension.width,
            dimension.height,
            layout.left,
            layout.top,
        );

        let arguments = CompositionArguments {
            video: artifacts.raw_video.clone(),
            chat: artifacts.chat_video.clone(),
            chat_mask: artifacts.chat_mask.clone(),
            border: layout.border_image.clone(),
            background: layout.background_image.clone(),
            input_files: mapped.input_args(),
            input_mappings: mapped.mappings(),
            filtergraph: graph.to_string(),
            save_path: request.output_path.clone(),
            chat_top: layout.top,
            chat_left: layout.left,
            dimension,
            fps: request.style.framerate,
        };
        let args = split_arguments(&arguments.apply(&request.templates.composer_args));
        debug!(args = ?args, "Encoder arguments");

        let tracker = PercentTracker::new(progress.clone(), duration);
        let started = Instant::now();

        let runner = ProcessRunner::new(&request.encoder_path).with_cancel(self.cancel.clone());
        let outcome = runner
            .run(args, tracker, |tracker, line| {
                debug!(target: "tdl::encoder", "{}", line);
                tracker.observe(line);
            })
            .await
            .map_err(ComposeError::from_composition)?;
        outcome
            .into_result(runner.program())
            .map_err(ComposeError::from_composition)?;

        let render_time = started.elapsed();
        info!(
            render_secs = render_time.as_secs_f64(),
            output = %request.output_path.display(),
            "Encoder finished"
        );
        progress.log(format!("FINISHED. RENDER TIME: {}s", render_time.as_secs()));

        Ok(render_time)
    }
}

/// Turns encoder stat lines into percent reports, one per whole percent.
struct PercentTracker {
    progress: ProgressSender,
    total_secs: Option<f64>,
    last: Option<u8>,
}

impl PercentTracker {
    fn new(progress: ProgressSender, total_secs: Option<f64>) -> Self {
        Self {
            progress,
            total_secs: total_secs.filter(|t| *t > 0.0),
            last: None,
        }
    }

    fn observe(&mut self, line: &str) {
        let Some(total) = self.total_secs else {
            return;
        };
        let Some(stats) = EncoderStats::parse(line) else {
            return;
        };

        let percent = stats.percentage(total) as u8;
        if self.last != Some(percent) {
            self.last = Some(percent);
            debug!(percent, eta_secs = ?stats.eta_seconds(total), "Encoder progress");
            self.progress.percent(percent);
        }
    }
}
