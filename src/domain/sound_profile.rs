// Section tree produced by segmentation. Immutable once built.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::domain::measure_view::{MeasureItem, MeasureView};
use crate::domain::registry::ApiCall;

/// Where a sound or effect occurs inside a section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub measures: Vec<usize>,
    pub lines: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    pub label: String,
    /// Inclusive 1-based measure range.
    pub start: usize,
    pub end: usize,
    pub sounds: BTreeMap<String, Occurrence>,
    pub effects: BTreeMap<String, Occurrence>,
    pub subsections: Vec<Section>,
    pub subsection_count: usize,
}

impl Section {
    pub fn new(label: String, start: usize, end: usize) -> Self {
        Self {
            label,
            start,
            end,
            sounds: BTreeMap::new(),
            effects: BTreeMap::new(),
            subsections: Vec::new(),
            subsection_count: 0,
        }
    }

    pub fn contains_measure(&self, measure: usize) -> bool {
        self.start <= measure && measure <= self.end
    }

    pub fn measures(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }

    /// Record every sound and effect in range, with the source lines of the
    /// API calls that placed them.
    pub fn populate(&mut self, view: &MeasureView, api_calls: &[ApiCall]) {
        self.sounds.clear();
        self.effects.clear();
        for measure in self.start..=self.end {
            for item in view.items(measure) {
                let table = match item {
                    MeasureItem::Sound { .. } => &mut self.sounds,
                    MeasureItem::Effect { .. } => &mut self.effects,
                };
                let occurrence = table.entry(item.name().to_string()).or_default();
                if !occurrence.measures.contains(&measure) {
                    occurrence.measures.push(measure);
                }
                for call in api_calls.iter().filter(|c| c.clips.iter().any(|clip| clip == item.name())) {
                    if !occurrence.lines.contains(&call.line) {
                        occurrence.lines.push(call.line);
                    }
                }
            }
        }
    }

    /// Source lines of everything in this section.
    pub fn lines(&self) -> BTreeSet<usize> {
        self.sounds
            .values()
            .chain(self.effects.values())
            .flat_map(|o| o.lines.iter().copied())
            .collect()
    }

    pub fn subsection(&self, label: &str) -> Option<&Section> {
        self.subsections.iter().find(|s| s.label == label)
    }
}

/// Ordered top-level sections of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SoundProfile {
    sections: Vec<Section>,
}

impl SoundProfile {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn get(&self, label: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.label == label)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Top-level sections plus their subsections.
    pub fn total_entries(&self) -> usize {
        self.sections.iter().map(|s| 1 + s.subsections.len()).sum()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.label.as_str())
    }

    /// A top-level label carries a repetition marker.
    pub fn has_repeated_section(&self) -> bool {
        self.labels().any(|l| l.contains('\''))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::measure_view::MeasureItem;

    #[test]
    fn test_populate_cross_references_lines() {
        let mut measures = BTreeMap::new();
        let sound = |name: &str| MeasureItem::Sound { name: name.into(), track: 1, genre: None, instrument: None };
        measures.insert(1, vec![sound("DRUMS")]);
        measures.insert(2, vec![sound("DRUMS"), sound("BASS")]);
        let view = MeasureView::from_measures(measures);
        let calls = vec![ApiCall {
            function: "fitMedia".into(),
            line: 7,
            col: 0,
            clips: vec!["DRUMS".into()],
            args: vec![],
        }];
        let mut section = Section::new("A".into(), 1, 2);
        section.populate(&view, &calls);
        assert_eq!(section.sounds["DRUMS"].measures, vec![1, 2]);
        assert_eq!(section.sounds["DRUMS"].lines, vec![7]);
        assert!(section.sounds["BASS"].lines.is_empty());
        assert_eq!(section.lines().into_iter().collect::<Vec<_>>(), vec![7]);
    }
}
