//! Code deltas between two analyses of the same project.
//!
//! A [`ProjectDelta`] is the raw change; a [`CodeDelta`] is a curated,
//! named before/after pair that marks a specific learning step.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::domain::features::CodeFeatures;

/// One feature moving from `start` to `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureStep {
    pub category: &'static str,
    pub feature: &'static str,
    pub start: i32,
    pub end: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeDelta {
    pub id: u32,
    pub steps: Vec<FeatureStep>,
    pub utterance: &'static str,
}

const fn step(category: &'static str, feature: &'static str, start: i32, end: i32) -> FeatureStep {
    FeatureStep { category, feature, start, end }
}

const DELTAS: &[(u32, FeatureStep, &str)] = &[
    (53, step("functions", "repeatExecution", 0, 1), "try giving your function [LINK|parameters] so each call can do something a bit different"),
    (54, step("functions", "repeatExecution", 0, 2), "[LINK|parameters] would make that function easier to reuse"),
    (33, step("functions", "repeatExecution", 1, 2), "you call that function more than once now, so [LINK|parameters] could vary each call"),
    (45, step("conditionals", "conditionals", 0, 1), "an else branch would give your [LINK|if statement] a second path"),
    (46, step("conditionals", "conditionals", 0, 2), "else-if could add more choices to your [LINK|conditional]"),
    (47, step("conditionals", "conditionals", 1, 2), "else-if could add more choices to your [LINK|conditional]"),
    (48, step("iteration", "forLoopsRange", 0, 1), "give your [LINK|loop] both a start and a stop value"),
    (49, step("iteration", "forLoopsRange", 0, 2), "a step value would change how your [LINK|loop] counts"),
    (50, step("iteration", "forLoopsIterable", 1, 2), "try a step value in this loop"),
    (34, step("makeBeat", "makeBeat", 0, 1), "[LINK|makeBeat] can take a list of sounds for a richer beat"),
];

/// The curated delta library, in matching order.
pub fn library() -> Vec<CodeDelta> {
    DELTAS
        .iter()
        .map(|(id, step, utterance)| CodeDelta { id: *id, steps: vec![*step], utterance: *utterance })
        .collect()
}

/// What changed between the previous and the current analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectDelta {
    /// Signed per-feature change, new minus old.
    pub code: CodeFeatures,
    pub sounds_added: BTreeSet<String>,
    pub sounds_removed: BTreeSet<String>,
    /// Change in top-level section count.
    pub sections: i64,
}

impl ProjectDelta {
    /// `previous_roster` is `None` until a roster has been seen; sound
    /// changes are not reported before that.
    pub fn compute(
        previous: &CodeFeatures,
        current: &CodeFeatures,
        previous_roster: Option<&BTreeSet<String>>,
        roster: &BTreeSet<String>,
        section_change: i64,
    ) -> Self {
        let mut code = CodeFeatures::default();
        for (category, feature, level) in current.iter() {
            code.set(category, feature, level - previous.get(category, feature));
        }
        for (category, feature, level) in previous.iter() {
            if !current.categories().get(category).is_some_and(|c| c.contains_key(feature)) {
                code.set(category, feature, -level);
            }
        }
        let (sounds_added, sounds_removed) = match previous_roster {
            Some(old) => (roster.difference(old).cloned().collect(), old.difference(roster).cloned().collect()),
            None => (BTreeSet::new(), BTreeSet::new()),
        };
        Self { code, sounds_added, sounds_removed, sections: section_change }
    }

    /// Magnitude of the change across code and sounds.
    pub fn sum(&self) -> i64 {
        let code: i64 = self.code.iter().map(|(_, _, d)| i64::from(d.abs())).sum();
        code + self.sounds_added.len() as i64 + self.sounds_removed.len() as i64
    }
}

/// Library entries whose every step ends at the current level and started at
/// the level held just before the latest change.
pub fn matching<'a>(library: &'a [CodeDelta], current: &CodeFeatures, delta: &ProjectDelta) -> Vec<&'a CodeDelta> {
    library
        .iter()
        .filter(|entry| {
            entry.steps.iter().all(|s| {
                let now = current.get(s.category, s.feature);
                now == s.end && now - delta.code.get(s.category, s.feature) == s.start
            })
        })
        .collect()
}
