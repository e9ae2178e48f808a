//! Pipeline orchestration
//!
//! validate -> synthesize every span (bounded fan-out) -> assemble ->
//! post-process -> encode. Only structural problems abort a run; a span whose
//! synthesis fails, panics or times out becomes silence plus a warning.

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use crate::audio::{AudioBuffer, AudioEncoder, AudioFormat, ResampleStretch, TimeStretch, WavEncoder};
use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::postprocess::{PostProcessReport, PostProcessor};
use crate::span::{timeline_end, validate_spans, Span};
use crate::synthesis::{
    SegmentOutcome, SegmentSynthesizer, SegmentWarning, SpeechSynthesizer, VoiceParameters,
};
use crate::timeline::{Placement, TimelineAssembler};

/// Post-processed timeline before encoding.
#[derive(Debug, Clone)]
pub struct RenderedTimeline {
    pub buffer: AudioBuffer,
    pub warnings: Vec<SegmentWarning>,
    pub placements: Vec<Placement>,
    pub report: PostProcessReport,
}

/// Encoded result of a full run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub audio: Bytes,
    pub format: AudioFormat,
    pub content_type: &'static str,
    pub sample_rate: u32,
    pub duration_secs: f64,
    pub warnings: Vec<SegmentWarning>,
}

/// Renders span sequences into one synchronized track.
pub struct Pipeline {
    config: PipelineConfig,
    segments: SegmentSynthesizer,
    /// Engine slots; a permit is held until the engine call returns
    permits: Arc<Semaphore>,
    assembler: TimelineAssembler,
    postprocessor: PostProcessor,
    encoder: Arc<dyn AudioEncoder>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, synthesizer: Arc<dyn SpeechSynthesizer>) -> Result<Self> {
        config.validate()?;

        let stretcher: Arc<dyn TimeStretch> = Arc::new(ResampleStretch);
        let segments = SegmentSynthesizer::new(synthesizer, config.sample_rate, config.channels)
            .with_stretcher(stretcher.clone());
        let mut assembler = TimelineAssembler::new(config.sample_rate, config.channels)
            .with_max_duration(config.max_timeline_secs);
        if config.stretch_available {
            assembler = assembler.with_stretcher(stretcher);
        }

        Ok(Self {
            postprocessor: PostProcessor::new(config.postprocess.clone()),
            permits: Arc::new(Semaphore::new(config.max_concurrent_synthesis)),
            config,
            segments,
            assembler,
            encoder: Arc::new(WavEncoder::new()),
        })
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn AudioEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Use `stretcher` for speed scaling and, when enabled, for fitting.
    pub fn with_stretcher(mut self, stretcher: Arc<dyn TimeStretch>) -> Self {
        self.segments = self.segments.with_stretcher(stretcher.clone());
        if self.config.stretch_available {
            self.assembler = self.assembler.with_stretcher(stretcher);
        }
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Render and encode in the configured output format.
    pub async fn run(&self, spans: &[Span], params: &VoiceParameters) -> Result<PipelineOutput> {
        let format = self.config.output_format;
        if !self.encoder.supports(format) {
            return Err(Error::ConfigError(format!(
                "encoder cannot produce {} output",
                format.extension()
            )));
        }

        let rendered = self.render(spans, params).await?;
        let audio = self
            .encoder
            .encode(&rendered.buffer, format, self.config.sample_rate)?;

        info!(
            "Encoded {:.3}s timeline as {} ({} bytes)",
            rendered.buffer.duration_secs(),
            format.extension(),
            audio.len()
        );

        Ok(PipelineOutput {
            audio,
            format,
            content_type: format.content_type(),
            sample_rate: self.config.sample_rate,
            duration_secs: rendered.buffer.duration_secs(),
            warnings: rendered.warnings,
        })
    }

    /// Produce the post-processed timeline without encoding it.
    pub async fn render(&self, spans: &[Span], params: &VoiceParameters) -> Result<RenderedTimeline> {
        params.validate()?;
        validate_spans(spans)?;

        let end = timeline_end(spans);
        if end > self.config.max_timeline_secs {
            return Err(Error::ConfigError(format!(
                "spans end at {:.3}s, past the {:.3}s timeline limit",
                end, self.config.max_timeline_secs
            )));
        }

        let run_id = Uuid::new_v4();
        self.render_validated(spans, params)
            .instrument(info_span!("pipeline_run", %run_id))
            .await
    }

    async fn render_validated(
        &self,
        spans: &[Span],
        params: &VoiceParameters,
    ) -> Result<RenderedTimeline> {
        info!("Rendering {} spans", spans.len());

        let outcomes = self.synthesize_all(spans, params).await;
        let warnings: Vec<SegmentWarning> = spans
            .iter()
            .zip(&outcomes)
            .filter_map(|(span, outcome)| outcome.warning(span.index()))
            .collect();

        let buffers = outcomes.into_iter().map(SegmentOutcome::into_buffer).collect();
        let (mut buffer, placements) = self.assembler.assemble(spans, buffers)?.into_parts();
        let report = self.postprocessor.process(&mut buffer, spans);

        info!(
            "Rendered {:.3}s with {} degraded spans",
            buffer.duration_secs(),
            warnings.len()
        );

        Ok(RenderedTimeline {
            buffer,
            warnings,
            placements,
            report,
        })
    }

    /// Synthesize every span with at most `max_concurrent_synthesis` engine
    /// calls in flight, counting calls that outlived their timeout.
    /// Results come back in span order.
    async fn synthesize_all(&self, spans: &[Span], params: &VoiceParameters) -> Vec<SegmentOutcome> {
        let timeout = self.config.segment_timeout_ms.map(Duration::from_millis);

        stream::iter(spans.iter().cloned())
            .map(|span| {
                let adapter = self.segments.clone();
                let permits = self.permits.clone();
                let params = params.clone();
                async move { synthesize_one(adapter, permits, span, params, timeout).await }
            })
            .buffered(self.config.max_concurrent_synthesis)
            .collect::<Vec<_>>()
            .await
    }
}

async fn synthesize_one(
    adapter: SegmentSynthesizer,
    permits: Arc<Semaphore>,
    span: Span,
    params: VoiceParameters,
    timeout: Option<Duration>,
) -> SegmentOutcome {
    let permit = match permits.acquire_owned().await {
        Ok(permit) => permit,
        Err(e) => return adapter.degraded(&span, format!("synthesis pool closed: {e}")),
    };

    let worker = adapter.clone();
    let task_span = span.clone();
    let handle = tokio::task::spawn_blocking(move || {
        // Released only when the engine returns, even after a timeout
        let _permit = permit;
        worker.synthesize_segment(&task_span, &params)
    });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, handle).await {
            Ok(joined) => joined,
            Err(_) => {
                return adapter.degraded(
                    &span,
                    format!("synthesis timed out after {} ms", limit.as_millis()),
                )
            }
        },
        None => handle.await,
    };

    joined.unwrap_or_else(|e| adapter.degraded(&span, format!("synthesis task failed: {e}")))
}
