//! End-to-end timeline synchronization through the public pipeline API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use subvox_core::audio::decode_wav;
use subvox_core::{
    AudioBuffer, AudioFormat, Error, FitKind, Pipeline, PipelineConfig, PostProcessConfig,
    PostProcessor, Result, Span, SpeechSynthesizer, VoiceParameters,
};

const SR: u32 = 22050;

/// Returns a fixed-length deterministic tone per text, or fails on request.
struct ScriptedSynth {
    sample_rate: u32,
    lengths: HashMap<&'static str, f64>,
}

impl ScriptedSynth {
    fn new(sample_rate: u32, lengths: &[(&'static str, f64)]) -> Self {
        Self {
            sample_rate,
            lengths: lengths.iter().copied().collect(),
        }
    }
}

fn tone(frames: usize) -> Vec<f32> {
    (0..frames)
        .map(|i| 0.2 + 0.3 * (i as f32 * 0.05).sin())
        .collect()
}

impl SpeechSynthesizer for ScriptedSynth {
    fn synthesize(&self, text: &str, _params: &VoiceParameters) -> Result<AudioBuffer> {
        match text {
            "boom" => Err(Error::SynthesisError("model crashed".to_string())),
            "panic" => panic!("engine panicked"),
            "slow" => {
                std::thread::sleep(Duration::from_millis(300));
                AudioBuffer::mono(tone(100), self.sample_rate)
            }
            _ => {
                let secs = self.lengths.get(text).copied().unwrap_or(1.0);
                let frames = (secs * self.sample_rate as f64).round() as usize;
                AudioBuffer::mono(tone(frames), self.sample_rate)
            }
        }
    }
}

fn config() -> PipelineConfig {
    PipelineConfig {
        sample_rate: SR,
        ..Default::default()
    }
}

fn pipeline(config: PipelineConfig, lengths: &[(&'static str, f64)]) -> Pipeline {
    Pipeline::new(config.clone(), Arc::new(ScriptedSynth::new(config.sample_rate, lengths)))
        .unwrap()
}

#[tokio::test]
async fn test_two_spans_with_gap() {
    let spans = vec![
        Span::new(1, 0.0, 3.0, "Hello world").unwrap(),
        Span::new(2, 5.0, 8.0, "Second").unwrap(),
    ];
    let pipeline = pipeline(config(), &[("Hello world", 2.5), ("Second", 3.0)]);
    let rendered = pipeline
        .render(&spans, &VoiceParameters::default())
        .await
        .unwrap();

    let out = &rendered.buffer;
    assert_eq!(out.frames(), 8 * SR as usize);
    assert!((out.duration_secs() - 8.0).abs() < 1e-9);
    assert!(rendered.warnings.is_empty());

    let first = tone(55125);
    assert_eq!(out.frame_slice(0..55125), &first[..]);
    assert!(out.frame_slice(55125..110250).iter().all(|s| *s == 0.0));
    assert_eq!(out.frame_slice(110250..176400), &tone(66150)[..]);

    let fits: Vec<FitKind> = rendered.placements.iter().map(|p| p.fit).collect();
    assert_eq!(fits, vec![FitKind::Padded, FitKind::Exact]);
    assert_eq!(rendered.placements[1].offset_frames, 110250);
}

#[tokio::test]
async fn test_failed_span_becomes_silence_with_warning() {
    let spans = vec![
        Span::new(1, 0.0, 1.0, "fine").unwrap(),
        Span::new(2, 1.0, 2.0, "boom").unwrap(),
        Span::new(3, 2.0, 3.0, "also fine").unwrap(),
    ];
    let rendered = pipeline(config(), &[])
        .render(&spans, &VoiceParameters::default())
        .await
        .unwrap();

    assert_eq!(rendered.buffer.frames(), 3 * SR as usize);
    assert_eq!(rendered.warnings.len(), 1);
    assert_eq!(rendered.warnings[0].span_index, 2);
    assert!(rendered.warnings[0].reason.contains("model crashed"));

    let sr = SR as usize;
    assert!(rendered.buffer.frame_slice(sr..2 * sr).iter().all(|s| *s == 0.0));
    assert_eq!(rendered.buffer.frame_slice(0..sr), &tone(sr)[..]);
    assert_eq!(rendered.buffer.frame_slice(2 * sr..3 * sr), &tone(sr)[..]);
}

#[tokio::test]
async fn test_panicking_synthesizer_is_contained() {
    let spans = vec![
        Span::new(1, 0.0, 1.0, "panic").unwrap(),
        Span::new(2, 1.0, 2.0, "fine").unwrap(),
    ];
    let rendered = pipeline(config(), &[])
        .render(&spans, &VoiceParameters::default())
        .await
        .unwrap();

    assert_eq!(rendered.warnings.len(), 1);
    assert_eq!(rendered.warnings[0].span_index, 1);
    assert!(rendered.buffer.frame_slice(0..SR as usize).iter().all(|s| *s == 0.0));
}

#[tokio::test]
async fn test_slow_segment_times_out() {
    let config = PipelineConfig {
        segment_timeout_ms: Some(50),
        ..config()
    };
    let spans = vec![
        Span::new(1, 0.0, 1.0, "slow").unwrap(),
        Span::new(2, 1.0, 2.0, "fine").unwrap(),
    ];
    let rendered = pipeline(config, &[])
        .render(&spans, &VoiceParameters::default())
        .await
        .unwrap();

    assert_eq!(rendered.warnings.len(), 1);
    assert!(rendered.warnings[0].reason.contains("timed out"));
    assert_eq!(rendered.buffer.frames(), 2 * SR as usize);
}

/// Sleeps through every call while counting how many run at once.
#[derive(Default)]
struct CountingSynth {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl SpeechSynthesizer for CountingSynth {
    fn synthesize(&self, _text: &str, _params: &VoiceParameters) -> Result<AudioBuffer> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(150));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        AudioBuffer::mono(tone(100), SR)
    }
}

#[tokio::test]
async fn test_timed_out_calls_still_count_against_concurrency() {
    let config = PipelineConfig {
        max_concurrent_synthesis: 1,
        segment_timeout_ms: Some(30),
        ..config()
    };
    let synth = Arc::new(CountingSynth::default());
    let pipeline = Pipeline::new(config, synth.clone()).unwrap();
    let spans: Vec<Span> = (0..4)
        .map(|i| Span::new(i + 1, i as f64, i as f64 + 1.0, "words").unwrap())
        .collect();

    let rendered = pipeline
        .render(&spans, &VoiceParameters::default())
        .await
        .unwrap();

    assert_eq!(rendered.warnings.len(), 4);
    assert_eq!(rendered.buffer.frames(), 4 * SR as usize);
    assert_eq!(synth.peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_concurrency_limit_holds_without_timeouts() {
    let config = PipelineConfig {
        max_concurrent_synthesis: 2,
        ..config()
    };
    let synth = Arc::new(CountingSynth::default());
    let pipeline = Pipeline::new(config, synth.clone()).unwrap();
    let spans: Vec<Span> = (0..5)
        .map(|i| Span::new(i + 1, i as f64, i as f64 + 1.0, "words").unwrap())
        .collect();

    let rendered = pipeline
        .render(&spans, &VoiceParameters::default())
        .await
        .unwrap();

    assert!(rendered.warnings.is_empty());
    assert!(synth.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_blank_text_is_silence_without_warning() {
    let spans = vec![
        Span::new(1, 0.0, 1.0, "   ").unwrap(),
        Span::new(2, 1.0, 2.0, "words").unwrap(),
    ];
    let rendered = pipeline(config(), &[])
        .render(&spans, &VoiceParameters::default())
        .await
        .unwrap();

    assert!(rendered.warnings.is_empty());
    assert!(rendered.buffer.frame_slice(0..SR as usize).iter().all(|s| *s == 0.0));
}

#[tokio::test]
async fn test_truncation_keeps_prefix_bit_identical() {
    let config = PipelineConfig {
        stretch_available: false,
        ..config()
    };
    let spans = vec![
        Span::new(1, 0.0, 1.0, "long").unwrap(),
        Span::new(2, 1.0, 2.0, "next").unwrap(),
    ];
    let rendered = pipeline(config, &[("long", 1.6), ("next", 1.0)])
        .render(&spans, &VoiceParameters::default())
        .await
        .unwrap();

    let sr = SR as usize;
    assert_eq!(rendered.placements[0].fit, FitKind::Truncated);
    assert_eq!(rendered.buffer.frame_slice(0..sr), &tone(sr)[..]);
    // Nothing from the long segment spills into the next slot
    assert_eq!(rendered.buffer.frame_slice(sr..2 * sr), &tone(sr)[..]);
}

#[tokio::test]
async fn test_long_segment_stretched_to_slot() {
    let spans = vec![Span::new(1, 0.0, 1.0, "long").unwrap()];
    let rendered = pipeline(config(), &[("long", 1.5)])
        .render(&spans, &VoiceParameters::default())
        .await
        .unwrap();

    assert_eq!(rendered.placements[0].fit, FitKind::Stretched);
    assert_eq!(rendered.placements[0].written_frames, SR as usize);
    assert_eq!(rendered.buffer.frames(), SR as usize);
}

#[tokio::test]
async fn test_post_processing_keeps_length_and_is_idempotent() {
    let config = PipelineConfig {
        postprocess: PostProcessConfig::all(),
        ..config()
    };
    let spans = vec![
        Span::new(1, 0.5, 1.5, "a").unwrap(),
        Span::new(2, 2.0, 3.0, "b").unwrap(),
    ];
    let rendered = pipeline(config.clone(), &[("a", 0.8), ("b", 0.7)])
        .render(&spans, &VoiceParameters::default())
        .await
        .unwrap();

    assert_eq!(rendered.buffer.frames(), 3 * SR as usize);

    let mut again = rendered.buffer.clone();
    let report = PostProcessor::new(config.postprocess).process(&mut again, &spans);
    assert!(report.is_noop());
    assert_eq!(again, rendered.buffer);
}

#[tokio::test]
async fn test_run_encodes_wav_at_configured_rate() {
    let spans: Vec<Span> = serde_json::from_str(
        r#"[
            {"index": 1, "start": 0.0, "end": 0.5, "text": "hi"},
            {"index": 2, "start": 0.75, "end": 1.0}
        ]"#,
    )
    .unwrap();
    let output = pipeline(config(), &[("hi", 0.25)])
        .run(&spans, &VoiceParameters::default())
        .await
        .unwrap();

    assert_eq!(output.format, AudioFormat::Wav);
    assert_eq!(output.sample_rate, SR);
    assert!((output.duration_secs - 1.0).abs() < 1e-9);

    let decoded = decode_wav(&output.audio).unwrap();
    assert_eq!(decoded.sample_rate(), SR);
    assert_eq!(decoded.frames(), SR as usize);
}

#[tokio::test]
async fn test_structural_errors_abort() {
    let p = pipeline(config(), &[]);
    let params = VoiceParameters::default();

    let err = p.render(&[], &params).await.unwrap_err();
    assert!(matches!(err, Error::ConfigError(_)));
    assert!(err.is_fatal());

    let duplicate = vec![
        Span::new(1, 0.0, 1.0, "a").unwrap(),
        Span::new(1, 1.0, 2.0, "b").unwrap(),
    ];
    assert!(matches!(
        p.render(&duplicate, &params).await,
        Err(Error::InvalidSpan { index: 1, .. })
    ));

    let backwards = Span::new(3, 2.0, 1.0, "backwards").unwrap_err();
    assert!(backwards.is_fatal());
    assert!(!Error::SynthesisError("engine busy".to_string()).is_fatal());

    let huge = vec![Span::new(1, 0.0, 1e15, "far away").unwrap()];
    assert!(matches!(
        p.render(&huge, &params).await,
        Err(Error::ConfigError(_))
    ));

    let bad_rate = PipelineConfig {
        sample_rate: 0,
        ..config()
    };
    assert!(Pipeline::new(bad_rate, Arc::new(ScriptedSynth::new(SR, &[]))).is_err());

    let opus = PipelineConfig {
        output_format: AudioFormat::Opus,
        ..config()
    };
    let spans = vec![Span::new(1, 0.0, 1.0, "a").unwrap()];
    assert!(matches!(
        pipeline(opus, &[]).run(&spans, &params).await,
        Err(Error::ConfigError(_))
    ));
}
