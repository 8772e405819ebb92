// Analysis report handed to presentation and telemetry collaborators.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::AnalyzerConfig;
use crate::domain::extractor::{ApiCounts, CodeAnalysis, DepthSummary, ValueUse};
use crate::domain::features::CodeFeatures;
use crate::domain::measure_view::MeasureView;
use crate::domain::registry::{ApiCall, VariableRecord};
use crate::domain::sound_profile::SoundProfile;
use crate::domain::timeline::Timeline;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub measures: usize,
    pub length_seconds: f64,
    pub tempo: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeSummary {
    pub counts: ApiCounts,
    pub depth: DepthSummary,
    pub values_used: Vec<ValueUse>,
    pub duplicate_calls: Vec<(usize, usize)>,
}

/// Which optional parts of the code analysis go into the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub features: bool,
    pub variables: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { features: true, variables: false }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub overview: Overview,
    pub measure_view: MeasureView,
    pub sound_profile: SoundProfile,
    pub api_calls: Vec<ApiCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<CodeFeatures>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<BTreeMap<String, VariableRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeSummary>,
}

impl Report {
    pub fn build(
        config: &AnalyzerConfig,
        timeline: &Timeline,
        analysis: &CodeAnalysis,
        measure_view: MeasureView,
        sound_profile: SoundProfile,
        options: ReportOptions,
    ) -> Self {
        let overview = Overview {
            measures: measure_view.len(),
            length_seconds: timeline.length_seconds(config.default_tempo, config.beats_per_measure),
            tempo: timeline.tempo_or(config.default_tempo),
        };
        let code = options.features.then(|| CodeSummary {
            counts: analysis.counts.clone(),
            depth: analysis.depth.clone(),
            values_used: analysis.values_used.clone(),
            duplicate_calls: analysis.duplicate_calls.clone(),
        });
        Self {
            overview,
            measure_view,
            sound_profile,
            api_calls: analysis.registries.api_calls.clone(),
            features: options.features.then(|| analysis.features.clone()),
            variables: options.variables.then(|| analysis.registries.variables.clone()),
            code,
        }
    }
}
