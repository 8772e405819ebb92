//! Timeline-to-Structure Converter
//!
//! Turns a rendered timeline into a per-measure occurrence view, numbered
//! contiguously from 1.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::config::AnalyzerConfig;
use crate::domain::timeline::Timeline;

/// One sound or effect active in a measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MeasureItem {
    Sound {
        name: String,
        track: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        genre: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        instrument: Option<String>,
    },
    Effect {
        name: String,
        track: usize,
        param: String,
        value: f64,
    },
}

impl MeasureItem {
    pub fn name(&self) -> &str {
        match self {
            MeasureItem::Sound { name, .. } | MeasureItem::Effect { name, .. } => name,
        }
    }

    pub fn is_sound(&self) -> bool {
        matches!(self, MeasureItem::Sound { .. })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MeasureView {
    measures: BTreeMap<usize, Vec<MeasureItem>>,
}

impl MeasureView {
    pub fn from_timeline(timeline: &Timeline, config: &AnalyzerConfig) -> Self {
        let length = timeline.measures() as i64;
        let mut raw: BTreeMap<i64, Vec<MeasureItem>> = BTreeMap::new();

        for (track_index, track) in timeline.tracks.iter().enumerate() {
            for clip in &track.clips {
                if clip.sound.contains(&config.placeholder_sound) {
                    continue;
                }
                for k in clip.measure_span() {
                    let items = raw.entry(k).or_default();
                    if items.iter().any(|i| i.is_sound() && i.name() == clip.sound) {
                        continue;
                    }
                    let info = config.sound(&clip.sound);
                    items.push(MeasureItem::Sound {
                        name: clip.sound.clone(),
                        track: clip.track,
                        genre: info.and_then(|s| s.genre.clone()),
                        instrument: info.and_then(|s| s.instrument.clone()),
                    });
                }
            }

            for envelope in &track.effects {
                let first = envelope.start_measure.floor() as i64;
                let end = envelope.end_measure.floor() as i64;
                let last = if length > 0 { end.min(length) } else { end };
                for n in first..=last {
                    raw.entry(n).or_default().push(MeasureItem::Effect {
                        name: envelope.name.clone(),
                        track: track_index,
                        param: envelope.parameter.clone(),
                        value: envelope.value_at(n as f64),
                    });
                }
            }
        }

        let view = Self::reindex(raw);
        debug!(measures = view.len(), "built measure view");
        view
    }

    /// Shift keys so the first is at least 1 and fill skipped measures.
    fn reindex(raw: BTreeMap<i64, Vec<MeasureItem>>) -> Self {
        let (Some(&min), Some(&max)) = (raw.keys().next(), raw.keys().next_back()) else {
            return Self::default();
        };
        let offset = if min < 1 { 1 - min } else { 0 };
        let mut measures: BTreeMap<usize, Vec<MeasureItem>> =
            (1..=(max + offset) as usize).map(|m| (m, Vec::new())).collect();
        for (key, items) in raw {
            measures.insert((key + offset) as usize, items);
        }
        Self { measures }
    }

    pub fn from_measures(measures: BTreeMap<usize, Vec<MeasureItem>>) -> Self {
        let mut raw: BTreeMap<i64, Vec<MeasureItem>> = BTreeMap::new();
        for (k, items) in measures {
            raw.insert(k as i64, items);
        }
        Self::reindex(raw)
    }

    pub fn len(&self) -> usize {
        self.measures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measures.is_empty()
    }

    /// Items in a 1-based measure; empty when out of range.
    pub fn items(&self, measure: usize) -> &[MeasureItem] {
        self.measures.get(&measure).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[MeasureItem])> {
        self.measures.iter().map(|(k, v)| (*k, v.as_slice()))
    }

    /// Distinct sound names in a measure.
    pub fn sound_names(&self, measure: usize) -> BTreeSet<&str> {
        self.items(measure).iter().filter(|i| i.is_sound()).map(MeasureItem::name).collect()
    }

    /// Every sound name in the project.
    pub fn sound_roster(&self) -> BTreeSet<String> {
        self.measures
            .values()
            .flatten()
            .filter(|i| i.is_sound())
            .map(|i| i.name().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SoundInfo;
    use crate::domain::timeline::{Clip, EffectEnvelope, Track};

    fn clip(sound: &str, measure: f64, start: f64, end: f64) -> Clip {
        Clip { sound: sound.into(), track: 1, measure, start, end }
    }

    #[test]
    fn test_clip_measures_and_placeholder() {
        let mut config = AnalyzerConfig::default();
        config.sounds.push(SoundInfo {
            name: "DRUMS".into(),
            genre: Some("HIP HOP".into()),
            instrument: Some("DRUMS".into()),
        });
        let timeline = Timeline {
            tempo: None,
            length: Some(4),
            tracks: vec![Track {
                clips: vec![clip("DRUMS", 1.0, 1.0, 3.0), clip("DRUMS", 2.0, 1.0, 2.0), clip("METRONOME", 1.0, 1.0, 5.0)],
                effects: vec![],
            }],
        };
        let view = MeasureView::from_timeline(&timeline, &config);
        assert_eq!(view.len(), 2);
        assert_eq!(view.items(1).len(), 1);
        // duplicate in measure 2 collapses
        assert_eq!(view.items(2).len(), 1);
        assert!(matches!(&view.items(1)[0], MeasureItem::Sound { genre: Some(g), .. } if g == "HIP HOP"));
    }

    #[test]
    fn test_gaps_are_filled() {
        let timeline = Timeline {
            tempo: None,
            length: None,
            tracks: vec![Track { clips: vec![clip("A", 1.0, 1.0, 2.0), clip("B", 4.0, 1.0, 2.0)], effects: vec![] }],
        };
        let view = MeasureView::from_timeline(&timeline, &AnalyzerConfig::default());
        assert_eq!(view.len(), 4);
        assert!(view.items(2).is_empty());
        assert!(view.items(3).is_empty());
        assert_eq!(view.sound_names(4).into_iter().collect::<Vec<_>>(), vec!["B"]);
    }

    #[test]
    fn test_effect_values_interpolate() {
        let timeline = Timeline {
            tempo: None,
            length: Some(3),
            tracks: vec![Track {
                clips: vec![],
                effects: vec![EffectEnvelope {
                    name: "VOLUME".into(),
                    parameter: "GAIN".into(),
                    start_value: 0.0,
                    end_value: 10.0,
                    start_measure: 1.0,
                    end_measure: 5.0,
                }],
            }],
        };
        let view = MeasureView::from_timeline(&timeline, &AnalyzerConfig::default());
        // clipped at the project length
        assert_eq!(view.len(), 3);
        let MeasureItem::Effect { value, .. } = &view.items(3)[0] else { panic!("expected effect") };
        assert_eq!(*value, 5.0);
    }

    #[test]
    fn test_effects_without_clips_or_length_are_kept() {
        let timeline = Timeline {
            tempo: None,
            length: None,
            tracks: vec![Track {
                clips: vec![],
                effects: vec![EffectEnvelope {
                    name: "FILTER".into(),
                    parameter: "FILTER_FREQ".into(),
                    start_value: 100.0,
                    end_value: 100.0,
                    start_measure: 1.0,
                    end_measure: 3.0,
                }],
            }],
        };
        assert_eq!(timeline.measures(), 0);
        let view = MeasureView::from_timeline(&timeline, &AnalyzerConfig::default());
        assert_eq!(view.len(), 3);
        assert!((1..=3).all(|m| view.items(m).len() == 1));
        assert!(view.sound_names(2).is_empty());
    }
}
