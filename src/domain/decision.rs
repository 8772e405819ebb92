//! Delta & Decision Engine
//!
//! Keeps a per-project snapshot of the last analysis and the ids already
//! suggested. Each call computes what changed, walks a fixed decision graph
//! from its root to one leaf and turns the leaf into a [`Recommendation`],
//! avoiding ids the project has already been given.

use std::collections::BTreeSet;

use dashmap::DashMap;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::AnalyzerConfig;
use crate::domain::delta::{self, CodeDelta, ProjectDelta};
use crate::domain::extractor::CodeAnalysis;
use crate::domain::features::CodeFeatures;
use crate::domain::measure_view::MeasureView;
use crate::domain::recommendations::{self, Recommendation, GENERIC_POOL};
use crate::domain::sound_profile::SoundProfile;

/// A complexity target: `category.feature` should reach `level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub category: String,
    pub feature: String,
    pub level: i32,
}

impl Goal {
    pub fn is_met(&self, features: &CodeFeatures) -> bool {
        features.get(&self.category, &self.feature) >= self.level
    }
}

/// Everything the engine looks at for one execution of a project.
pub struct Observation<'a> {
    pub analysis: &'a CodeAnalysis,
    pub view: &'a MeasureView,
    pub profile: &'a SoundProfile,
}

#[derive(Debug, Default)]
struct ProjectState {
    features: Option<CodeFeatures>,
    roster: Option<BTreeSet<String>>,
    sections: Option<usize>,
    history: Vec<u32>,
    goals: Vec<Goal>,
}

// ═══════════════════════════════════════════════════════════════════════════
// Decision graph
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Check {
    MusicEmpty,
    DeltaSum,
    /// Yes when no unused library delta matches.
    Deltas,
    DeltaSections,
    Subsections,
    UserFunctions,
    FunctionSections,
    Goal,
    SetEffect,
    SectionSimilarity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Leaf {
    Instrument,
    Nucleus,
    DeltaLookup,
    Parameters,
    Function,
    FunctionCall,
    Modular,
    Goal,
    Effect,
}

impl Leaf {
    pub fn id(self) -> u32 {
        match self {
            Leaf::Instrument => recommendations::INSTRUMENT,
            Leaf::Nucleus => recommendations::NUCLEUS,
            Leaf::DeltaLookup => recommendations::DELTA_LOOKUP,
            Leaf::Parameters => recommendations::PARAMETERS,
            Leaf::Function => recommendations::FUNCTION,
            Leaf::FunctionCall => recommendations::FUNCTION_CALL,
            Leaf::Modular => recommendations::MODULAR,
            Leaf::Goal => recommendations::GOAL,
            Leaf::Effect => recommendations::EFFECT,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Next {
    Check(Check),
    Leaf(Leaf),
}

/// `(yes, no)` successors of each check.
fn edges(check: Check) -> (Next, Next) {
    use Next::{Check as C, Leaf as L};
    match check {
        Check::MusicEmpty => (L(Leaf::Instrument), C(Check::DeltaSum)),
        Check::DeltaSum => (C(Check::Deltas), L(Leaf::Nucleus)),
        Check::Deltas => (C(Check::DeltaSections), L(Leaf::DeltaLookup)),
        Check::DeltaSections => (C(Check::Subsections), C(Check::Goal)),
        Check::Subsections => (L(Leaf::Function), C(Check::UserFunctions)),
        Check::UserFunctions => (C(Check::FunctionSections), L(Leaf::Parameters)),
        Check::FunctionSections => (L(Leaf::FunctionCall), L(Leaf::Modular)),
        Check::Goal => (L(Leaf::Goal), C(Check::SetEffect)),
        Check::SetEffect => (C(Check::SectionSimilarity), L(Leaf::Effect)),
        Check::SectionSimilarity => (L(Leaf::Effect), L(Leaf::Nucleus)),
    }
}

/// Inputs the checks evaluate against.
struct Facts<'a> {
    observation: &'a Observation<'a>,
    delta: &'a ProjectDelta,
    unused_deltas: &'a [&'a CodeDelta],
    goals: &'a [Goal],
}

impl Facts<'_> {
    fn evaluate(&self, check: Check) -> bool {
        let analysis = self.observation.analysis;
        let profile = self.observation.profile;
        match check {
            Check::MusicEmpty => self.observation.view.is_empty(),
            Check::DeltaSum => self.delta.sum() != 0,
            Check::Deltas => self.unused_deltas.is_empty(),
            Check::DeltaSections => self.delta.sections > 0,
            Check::Subsections => profile.has_repeated_section(),
            Check::UserFunctions => !analysis.registries.functions.is_empty(),
            Check::FunctionSections => profile
                .sections()
                .iter()
                .flat_map(|s| s.lines())
                .any(|line| analysis.registries.function_at_line(line).is_some()),
            Check::Goal => self.goals.iter().any(|g| !g.is_met(&analysis.features)),
            Check::SetEffect => analysis.counts.set_effect > 0,
            Check::SectionSimilarity => profile.has_repeated_section(),
        }
    }

    /// Walk from the root to a leaf.
    fn walk(&self) -> Leaf {
        let mut check = Check::MusicEmpty;
        loop {
            let answer = self.evaluate(check);
            debug!(?check, answer, "decision step");
            let (yes, no) = edges(check);
            match if answer { yes } else { no } {
                Next::Check(next) => check = next,
                Next::Leaf(leaf) => return leaf,
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Engine
// ═══════════════════════════════════════════════════════════════════════════

/// Process-wide suggestion state, shared between server connections.
pub struct SuggestionEngine {
    config: AnalyzerConfig,
    library: Vec<CodeDelta>,
    projects: DashMap<String, ProjectState>,
}

impl SuggestionEngine {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config, library: delta::library(), projects: DashMap::new() }
    }

    pub fn add_goal(&self, project: &str, goal: Goal) {
        let mut state = self.projects.entry(project.to_string()).or_default();
        if !state.goals.contains(&goal) {
            state.goals.push(goal);
        }
    }

    /// Ids already issued to a project, oldest first.
    pub fn history(&self, project: &str) -> Vec<u32> {
        self.projects.get(project).map(|s| s.history.clone()).unwrap_or_default()
    }

    pub fn reset(&self, project: &str) {
        self.projects.remove(project);
    }

    /// Record the observation and produce exactly one recommendation.
    pub fn suggest<R: Rng + ?Sized>(&self, project: &str, observation: &Observation<'_>, rng: &mut R) -> Recommendation {
        let mut state = self.projects.entry(project.to_string()).or_default();
        let delta = self.update_snapshot(&mut state, observation);

        let current = &observation.analysis.features;
        let unused: Vec<&CodeDelta> = delta::matching(&self.library, current, &delta)
            .into_iter()
            .filter(|d| !state.history.contains(&d.id))
            .collect();

        let facts = Facts { observation, delta: &delta, unused_deltas: &unused, goals: &state.goals };
        let leaf = facts.walk();

        let recommendation = match leaf {
            Leaf::DeltaLookup => match unused.first() {
                Some(found) => Recommendation {
                    id: found.id,
                    utterance: found.utterance.to_string(),
                    explain: None,
                    example: None,
                },
                None => Recommendation::no_suggestion(),
            },
            Leaf::Nucleus => self.pick_generic(&state.history, rng),
            other if state.history.contains(&other.id()) => self.pick_generic(&state.history, rng),
            other => recommendations::lookup(other.id()).unwrap_or_else(Recommendation::no_suggestion),
        };

        if !recommendation.is_no_suggestion() {
            state.history.push(recommendation.id);
        }
        info!(project, ?leaf, id = recommendation.id, "issued suggestion");
        recommendation
    }

    /// Compare against the stored snapshot and replace it. An all-zero
    /// profile after a non-zero one is a failed analysis and keeps the old
    /// feature snapshot. Sound and section changes need a prior snapshot.
    fn update_snapshot(&self, state: &mut ProjectState, observation: &Observation<'_>) -> ProjectDelta {
        let current = &observation.analysis.features;
        let previous = state.features.clone().unwrap_or_else(|| CodeFeatures::zeroed(&self.config));
        let failed = current.is_zero() && !previous.is_zero();
        let compared = if failed { &previous } else { current };

        let roster = observation.view.sound_roster();
        let sections = observation.profile.len();
        let delta = ProjectDelta::compute(
            &previous,
            compared,
            state.roster.as_ref(),
            &roster,
            state.sections.map_or(0, |old| sections as i64 - old as i64),
        );

        if failed {
            debug!("zeroed feature profile ignored");
        } else {
            state.features = Some(current.clone());
        }
        state.roster = Some(roster);
        state.sections = Some(sections);
        delta
    }

    /// Uniform draw from the generic pool, skipping issued ids.
    fn pick_generic<R: Rng + ?Sized>(&self, history: &[u32], rng: &mut R) -> Recommendation {
        for _ in 0..self.config.nucleus_retries {
            let Some(id) = GENERIC_POOL.choose(&mut *rng) else { break };
            if history.contains(id) {
                continue;
            }
            if let Some(rec) = recommendations::lookup(*id) {
                return rec;
            }
        }
        debug!("generic pool exhausted");
        Recommendation::no_suggestion()
    }
}
