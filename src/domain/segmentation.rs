//! Self-Similarity Segmentation
//!
//! Measures are compared pairwise by the Jaccard similarity of their sound
//! sets. The first row of that matrix is split into runs of near-equal
//! values at decreasing thresholds; each accepted pass refines the section
//! tree by one level at most.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::config::AnalyzerConfig;
use crate::domain::measure_view::MeasureView;
use crate::domain::registry::ApiCall;
use crate::domain::sound_profile::{Section, SoundProfile};

const THRESHOLDS: [f64; 9] = [0.9, 0.8, 0.7, 0.6, 0.5, 0.4, 0.3, 0.2, 0.1];
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Intersection over union; 0 when both sets are empty.
pub fn jaccard(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

/// Row `i`, column `j` compares measure `i + 1` with measure `j + 1`.
pub fn similarity_matrix(view: &MeasureView) -> Vec<Vec<f64>> {
    let sets: Vec<BTreeSet<&str>> = (1..=view.len()).map(|m| view.sound_names(m)).collect();
    sets.iter()
        .map(|a| sets.iter().map(|b| jaccard(a, b)).collect())
        .collect()
}

/// A maximal stretch of the reference sequence, 0-based and inclusive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Run {
    pub value: f64,
    pub start: usize,
    pub end: usize,
}

impl Run {
    fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Split `values` into runs whose members stay within `threshold` of the
/// run's first value. Single-element runs are dropped.
pub fn find_runs(values: &[f64], threshold: f64) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut start = 0;
    while start < values.len() {
        let value = values[start];
        let mut end = start;
        while end + 1 < values.len() && (values[end + 1] - value).abs() <= threshold + f64::EPSILON {
            end += 1;
        }
        let run = Run { value, start, end };
        if run.len() > 1 {
            runs.push(run);
        }
        start = end + 1;
    }
    runs
}

fn letter(mut index: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(ALPHABET[index % ALPHABET.len()]);
        if index < ALPHABET.len() {
            break;
        }
        index = index / ALPHABET.len() - 1;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Letters in first-seen order; a repeated value reuses its letter with one
/// `'` per earlier occurrence.
pub fn label_runs(runs: &[Run]) -> Vec<String> {
    let mut seen: Vec<(f64, usize)> = Vec::new();
    let mut labels = Vec::with_capacity(runs.len());
    for run in runs {
        match seen.iter().position(|(v, _)| *v == run.value) {
            Some(i) => {
                let base = letter(i);
                seen[i].1 += 1;
                labels.push(format!("{base}{}", "'".repeat(seen[i].1)));
            }
            None => {
                labels.push(letter(seen.len()));
                seen.push((run.value, 0));
            }
        }
    }
    labels
}

fn base_label(label: &str) -> &str {
    label.trim_end_matches('\'')
}

pub struct Segmenter<'a> {
    config: &'a AnalyzerConfig,
}

impl<'a> Segmenter<'a> {
    pub fn new(config: &'a AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn segment(&self, view: &MeasureView, api_calls: &[ApiCall]) -> SoundProfile {
        let measures = view.len();
        if measures == 0 {
            return SoundProfile::default();
        }
        let matrix = similarity_matrix(view);
        let reference = &matrix[0];

        let mut sections: Vec<Section> = Vec::new();
        let mut accepted = 0usize;
        let mut last_count = 1usize;

        for threshold in THRESHOLDS {
            if accepted >= self.config.max_refinements {
                break;
            }
            let runs = find_runs(reference, threshold);
            let labels = label_runs(&runs);
            let distinct: BTreeSet<&str> = labels.iter().map(|l| base_label(l)).collect();
            if runs.len() <= last_count || distinct.len() <= 1 {
                continue;
            }
            accepted += 1;
            last_count = runs.len();
            debug!(threshold, sections = runs.len(), pass = accepted, "accepted segmentation pass");
            for (run, label) in runs.iter().zip(labels) {
                let label = if accepted > 1 { format!("{label}{}", accepted - 1) } else { label };
                merge(&mut sections, Section::new(label, run.start + 1, run.end + 1));
            }
        }

        if accepted == 0 {
            debug!(measures, "no refinement accepted, using a single section");
            sections.push(Section::new(letter(0), 1, measures));
        }

        sections.sort_by_key(|s| s.start);
        for section in &mut sections {
            section.populate(view, api_calls);
            for sub in &mut section.subsections {
                sub.populate(view, api_calls);
            }
        }
        SoundProfile::new(sections)
    }
}

/// Insert a section from a finer pass. Each top-level section strictly
/// containing it gains it as a subsection, and an equal range absorbs it.
/// A section contained nowhere becomes top-level, overlaps included.
fn merge(sections: &mut Vec<Section>, candidate: Section) {
    let mut filled = false;
    for parent in sections
        .iter_mut()
        .filter(|s| s.start <= candidate.start && candidate.end <= s.end)
    {
        filled = true;
        if parent.start == candidate.start && parent.end == candidate.end {
            continue;
        }
        parent.subsection_count += 1;
        let label = format!("{}{}", parent.label, parent.subsection_count);
        parent.subsections.push(Section::new(label, candidate.start, candidate.end));
    }
    if !filled {
        sections.push(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::domain::measure_view::MeasureItem;

    fn view(sounds: &[&[&str]]) -> MeasureView {
        let measures: BTreeMap<usize, Vec<MeasureItem>> = sounds
            .iter()
            .enumerate()
            .map(|(i, names)| {
                let items = names
                    .iter()
                    .map(|n| MeasureItem::Sound { name: n.to_string(), track: 1, genre: None, instrument: None })
                    .collect();
                (i + 1, items)
            })
            .collect();
        MeasureView::from_measures(measures)
    }

    #[test]
    fn test_jaccard_empty_sets() {
        let empty = BTreeSet::new();
        assert_eq!(jaccard(&empty, &empty), 0.0);
        let a: BTreeSet<&str> = ["X", "Y"].into_iter().collect();
        let b: BTreeSet<&str> = ["Y"].into_iter().collect();
        assert_eq!(jaccard(&a, &b), 0.5);
    }

    #[test]
    fn test_repeated_runs_share_a_letter() {
        let runs = find_runs(&[0.5, 0.5, 0.9, 0.9, 0.5, 0.5], 0.1);
        assert_eq!(runs.len(), 3);
        assert_eq!(label_runs(&runs), vec!["A", "B", "A'"]);
    }

    #[test]
    fn test_single_runs_are_dropped() {
        let runs = find_runs(&[1.0, 0.0, 1.0, 1.0], 0.1);
        assert_eq!(runs, vec![Run { value: 1.0, start: 2, end: 3 }]);
    }

    #[test]
    fn test_letters_extend_past_z() {
        assert_eq!(letter(0), "A");
        assert_eq!(letter(25), "Z");
        assert_eq!(letter(26), "AA");
    }

    #[test]
    fn test_two_halves_make_two_sections() {
        let v = view(&[&["X"], &["X"], &["X"], &["X"], &["Y"], &["Y"], &["Y"], &["Y"]]);
        let profile = Segmenter::new(&AnalyzerConfig::default()).segment(&v, &[]);
        let labels: Vec<_> = profile.labels().collect();
        assert_eq!(labels, vec!["A", "B"]);
        assert_eq!((profile.sections()[0].start, profile.sections()[0].end), (1, 4));
        assert_eq!((profile.sections()[1].start, profile.sections()[1].end), (5, 8));
        assert_eq!(profile.total_entries(), 2);
        assert!(profile.sections()[1].sounds.contains_key("Y"));
    }

    #[test]
    fn test_uniform_piece_is_one_section() {
        let v = view(&[&["X"], &["X"], &["X"]]);
        let profile = Segmenter::new(&AnalyzerConfig::default()).segment(&v, &[]);
        assert_eq!(profile.len(), 1);
        assert_eq!(profile.sections()[0].label, "A");
        assert_eq!(profile.sections()[0].end, 3);
    }

    #[test]
    fn test_finer_pass_nests_one_level() {
        let mut sections = vec![Section::new("A".into(), 1, 8)];
        merge(&mut sections, Section::new("A1".into(), 1, 4));
        merge(&mut sections, Section::new("B1".into(), 3, 4));
        merge(&mut sections, Section::new("C1".into(), 1, 8));
        assert_eq!(sections.len(), 1);
        let subs: Vec<_> = sections[0].subsections.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(subs, vec!["A1", "A2"]);
        assert!(sections[0].subsections.iter().all(|s| s.subsections.is_empty()));
    }

    #[test]
    fn test_partial_overlap_becomes_top_level() {
        let mut sections = vec![Section::new("A".into(), 1, 6), Section::new("B".into(), 7, 8)];
        merge(&mut sections, Section::new("C1".into(), 5, 8));
        let ranges: Vec<_> = sections.iter().map(|s| (s.label.as_str(), s.start, s.end)).collect();
        assert_eq!(ranges, vec![("A", 1, 6), ("B", 7, 8), ("C1", 5, 8)]);
        assert!(sections.iter().all(|s| s.subsections.is_empty()));
    }

    #[test]
    fn test_similarity_matrix_bounds() {
        let silent: &[&str] = &[];
        let v = view(&[&["X", "Y"], silent, &["Y"], &["Z"], &["X", "Y", "Z"]]);
        let matrix = similarity_matrix(&v);
        assert_eq!(matrix.len(), 5);
        for (i, row) in matrix.iter().enumerate() {
            assert_eq!(row.len(), 5);
            assert!(row.iter().all(|c| (0.0..=1.0).contains(c) && !c.is_nan()));
            let expected = if v.sound_names(i + 1).is_empty() { 0.0 } else { 1.0 };
            assert_eq!(row[i], expected);
        }
        assert_eq!(matrix[0][2], 0.5);
        assert_eq!(matrix[2][0], matrix[0][2]);
    }

    /// First row of the similarity matrix: [1, 1, .6, .6, .2, .2, 0, 0].
    fn layered_view() -> MeasureView {
        let full: &[&str] = &["S1", "S2", "S3", "S4", "S5"];
        let three: &[&str] = &["S1", "S2", "S3"];
        let one: &[&str] = &["S1"];
        let other: &[&str] = &["Z"];
        view(&[full, full, three, three, one, one, other, other])
    }

    fn ranges(section: &Section) -> Vec<(String, usize, usize)> {
        section.subsections.iter().map(|s| (s.label.clone(), s.start, s.end)).collect()
    }

    #[test]
    fn test_refinement_passes_build_subsections() {
        let v = layered_view();
        assert_eq!(similarity_matrix(&v)[0], vec![1.0, 1.0, 0.6, 0.6, 0.2, 0.2, 0.0, 0.0]);

        let profile = Segmenter::new(&AnalyzerConfig::default()).segment(&v, &[]);
        let top: Vec<_> = profile.sections().iter().map(|s| (s.label.as_str(), s.start, s.end)).collect();
        // 0.9 gives A and B, 0.3 adds C1 over measures 5-8, 0.1 refines both.
        assert_eq!(top, vec![("A", 1, 6), ("C1", 5, 8), ("B", 7, 8)]);

        let a = profile.get("A").unwrap();
        assert_eq!(
            ranges(a),
            vec![
                ("A1".to_string(), 1, 2),
                ("A2".to_string(), 3, 4),
                ("A3".to_string(), 1, 2),
                ("A4".to_string(), 3, 4),
                ("A5".to_string(), 5, 6),
            ]
        );
        assert_eq!(a.subsection_count, 5);
        let c = profile.get("C1").unwrap();
        assert_eq!(ranges(c), vec![("C11".to_string(), 5, 6), ("C12".to_string(), 7, 8)]);
        assert!(profile.get("B").unwrap().subsections.is_empty());

        assert!(c.sounds.contains_key("Z"));
        assert!(c.subsection("C11").unwrap().sounds.contains_key("S1"));
        assert!(!c.subsection("C11").unwrap().sounds.contains_key("Z"));
        assert_eq!(profile.total_entries(), 10);
    }

    #[test]
    fn test_entries_never_decrease_across_passes() {
        let v = layered_view();
        let totals: Vec<usize> = (1..=3)
            .map(|cap| {
                let config = AnalyzerConfig { max_refinements: cap, ..AnalyzerConfig::default() };
                Segmenter::new(&config).segment(&v, &[]).total_entries()
            })
            .collect();
        assert_eq!(totals, vec![2, 5, 10]);
        assert!(totals.windows(2).all(|w| w[0] <= w[1]));
    }
}
