//! Timed text spans and their validation

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::audio::secs_to_frames;
use crate::error::{Error, Result};

/// One timed unit of speech.
///
/// Construction validates the timestamps, so every `Span` in circulation has
/// `0 <= start < end`. Empty text is legal and renders as silence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSpan")]
pub struct Span {
    index: u32,
    start: f64,
    end: f64,
    text: String,
}

/// Unvalidated wire form of a span.
#[derive(Debug, Deserialize)]
struct RawSpan {
    index: u32,
    start: f64,
    end: f64,
    #[serde(default)]
    text: String,
}

impl TryFrom<RawSpan> for Span {
    type Error = Error;

    fn try_from(raw: RawSpan) -> Result<Self> {
        Span::new(raw.index, raw.start, raw.end, raw.text)
    }
}

impl Span {
    pub fn new(index: u32, start: f64, end: f64, text: impl Into<String>) -> Result<Self> {
        if !start.is_finite() || !end.is_finite() {
            return Err(Error::invalid_span(index, "timestamps must be finite"));
        }
        if start < 0.0 {
            return Err(Error::invalid_span(
                index,
                format!("start {start:.3}s is negative"),
            ));
        }
        if end <= start {
            return Err(Error::invalid_span(
                index,
                format!("end {end:.3}s is not after start {start:.3}s"),
            ));
        }
        Ok(Self {
            index,
            start,
            end,
            text: text.into(),
        })
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the span has nothing to speak.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Frame range `[start, end)` this span occupies at `sample_rate`.
    ///
    /// Both edges are rounded independently so adjacent spans tile exactly.
    pub fn frame_range(&self, sample_rate: u32) -> std::ops::Range<usize> {
        secs_to_frames(self.start, sample_rate)..secs_to_frames(self.end, sample_rate)
    }
}

/// Latest end time across all spans, regardless of their order.
pub fn timeline_end(spans: &[Span]) -> f64 {
    spans.iter().map(Span::end).fold(0.0, f64::max)
}

/// Check a span sequence before any synthesis work starts.
pub fn validate_spans(spans: &[Span]) -> Result<()> {
    if spans.is_empty() {
        return Err(Error::ConfigError("no spans to render".to_string()));
    }
    let mut seen = HashSet::with_capacity(spans.len());
    for span in spans {
        if span.index == 0 {
            return Err(Error::invalid_span(0, "index must be positive"));
        }
        if !seen.insert(span.index) {
            return Err(Error::invalid_span(span.index, "duplicate index"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_timestamps() {
        assert!(matches!(
            Span::new(1, 2.0, 2.0, "x"),
            Err(Error::InvalidSpan { index: 1, .. })
        ));
        assert!(Span::new(2, 3.0, 1.0, "x").is_err());
        assert!(Span::new(3, -0.5, 1.0, "x").is_err());
        assert!(Span::new(4, 0.0, f64::NAN, "x").is_err());
        assert!(Span::new(5, 0.0, 1.0, "").is_ok());
    }

    #[test]
    fn test_timeline_end_uses_max() {
        let spans = vec![
            Span::new(1, 0.0, 9.0, "long").unwrap(),
            Span::new(2, 2.0, 4.0, "short").unwrap(),
        ];
        assert_eq!(timeline_end(&spans), 9.0);
        assert_eq!(timeline_end(&[]), 0.0);
    }

    #[test]
    fn test_validate_spans() {
        assert!(matches!(validate_spans(&[]), Err(Error::ConfigError(_))));

        let dup = vec![
            Span::new(1, 0.0, 1.0, "a").unwrap(),
            Span::new(1, 1.0, 2.0, "b").unwrap(),
        ];
        assert!(matches!(
            validate_spans(&dup),
            Err(Error::InvalidSpan { index: 1, .. })
        ));

        let zero = vec![Span::new(0, 0.0, 1.0, "a").unwrap()];
        assert!(validate_spans(&zero).is_err());
    }

    #[test]
    fn test_frame_ranges_tile() {
        let a = Span::new(1, 0.0, 1.00002, "a").unwrap();
        let b = Span::new(2, 1.00002, 2.0, "b").unwrap();
        assert_eq!(a.frame_range(22050).end, b.frame_range(22050).start);
    }

    #[test]
    fn test_deserialize_validates() {
        let span: Span =
            serde_json::from_str(r#"{"index": 3, "start": 1.5, "end": 2.0, "text": "hi"}"#)
                .unwrap();
        assert_eq!(span.index(), 3);
        assert_eq!(span.text(), "hi");

        let blank: Span = serde_json::from_str(r#"{"index": 4, "start": 0.0, "end": 1.0}"#).unwrap();
        assert!(blank.is_blank());

        let bad = serde_json::from_str::<Span>(r#"{"index": 1, "start": 2.0, "end": 1.0}"#);
        assert!(bad.is_err());
    }
}
