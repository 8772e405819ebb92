// Rendered timeline as delivered by the host's audio renderer.
//
// Field names accept both snake_case and the renderer's camelCase.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// Beats per minute; the configured default applies when absent.
    #[serde(default)]
    pub tempo: Option<f64>,
    /// Project length in measures; derived from the clips when absent.
    #[serde(default)]
    pub length: Option<usize>,
    #[serde(default)]
    pub tracks: Vec<Track>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub clips: Vec<Clip>,
    #[serde(default)]
    pub effects: Vec<EffectEnvelope>,
}

/// A placed sound. `start`/`end` are 1-based offsets into the sound, in measures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    #[serde(alias = "filekey")]
    pub sound: String,
    #[serde(default)]
    pub track: usize,
    pub measure: f64,
    pub start: f64,
    pub end: f64,
}

impl Clip {
    /// Measures the clip sounds in: `floor(measure + start - 1)` up to but
    /// not including `ceil(measure + end - 1)`.
    pub fn measure_span(&self) -> std::ops::Range<i64> {
        let first = (self.measure + self.start - 1.0).floor() as i64;
        let last = (self.measure + self.end - 1.0).ceil() as i64;
        first..last
    }
}

/// One linear segment of an effect automation envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectEnvelope {
    pub name: String,
    #[serde(alias = "param")]
    pub parameter: String,
    #[serde(alias = "startValue")]
    pub start_value: f64,
    #[serde(alias = "endValue")]
    pub end_value: f64,
    #[serde(alias = "startMeasure")]
    pub start_measure: f64,
    #[serde(alias = "endMeasure")]
    pub end_measure: f64,
}

impl EffectEnvelope {
    /// Value at `measure`, linear between the segment ends.
    pub fn value_at(&self, measure: f64) -> f64 {
        let span = self.end_measure - self.start_measure;
        if self.start_value == self.end_value || span <= 0.0 {
            return self.start_value;
        }
        let t = ((measure - self.start_measure) / span).clamp(0.0, 1.0);
        self.start_value + (self.end_value - self.start_value) * t
    }
}

impl Timeline {
    /// Length in measures, falling back to the end of the last clip.
    pub fn measures(&self) -> usize {
        if let Some(length) = self.length {
            return length;
        }
        self.tracks
            .iter()
            .flat_map(|t| t.clips.iter())
            .map(|c| c.measure_span().end.saturating_sub(1).max(0) as usize)
            .max()
            .unwrap_or(0)
    }

    pub fn tempo_or(&self, default_tempo: f64) -> f64 {
        match self.tempo {
            Some(t) if t > 0.0 => t,
            _ => default_tempo,
        }
    }

    /// Duration of the whole project.
    pub fn length_seconds(&self, default_tempo: f64, beats_per_measure: u32) -> f64 {
        self.measures() as f64 * f64::from(beats_per_measure) * 60.0 / self.tempo_or(default_tempo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_span_and_derived_length() {
        let clip = Clip { sound: "A".into(), track: 1, measure: 5.0, start: 1.0, end: 5.0 };
        assert_eq!(clip.measure_span(), 5..9);
        let timeline = Timeline {
            tempo: None,
            length: None,
            tracks: vec![Track { clips: vec![clip], effects: vec![] }],
        };
        assert_eq!(timeline.measures(), 8);
        assert!((timeline.length_seconds(120.0, 4) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn test_envelope_interpolation() {
        let env = EffectEnvelope {
            name: "VOLUME".into(),
            parameter: "GAIN".into(),
            start_value: -20.0,
            end_value: 0.0,
            start_measure: 1.0,
            end_measure: 5.0,
        };
        assert_eq!(env.value_at(1.0), -20.0);
        assert_eq!(env.value_at(3.0), -10.0);
        assert_eq!(env.value_at(5.0), 0.0);
        let flat = EffectEnvelope { end_measure: 1.0, ..env };
        assert_eq!(flat.value_at(3.0), -20.0);
    }

    #[test]
    fn test_camel_case_fields() {
        let json = r#"{"tempo": 90, "tracks": [{"clips": [{"filekey": "X", "track": 1, "measure": 1, "start": 1, "end": 2}],
            "effects": [{"name": "FILTER", "param": "FILTER_FREQ", "startValue": 20, "endValue": 20, "startMeasure": 1, "endMeasure": 3}]}]}"#;
        let timeline: Timeline = serde_json::from_str(json).unwrap();
        assert_eq!(timeline.tracks[0].clips[0].sound, "X");
        assert_eq!(timeline.tracks[0].effects[0].parameter, "FILTER_FREQ");
        assert_eq!(timeline.tempo_or(120.0), 90.0);
    }
}
