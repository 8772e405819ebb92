// Use cases wiring the analysis pipeline together.

use rand::Rng;
use tracing::{info, warn};

use crate::config::AnalyzerConfig;
use crate::domain::ast::Node;
use crate::domain::decision::{Observation, SuggestionEngine};
use crate::domain::extractor::{CodeAnalysis, Extractor};
use crate::domain::language::Language;
use crate::domain::measure_view::MeasureView;
use crate::domain::normalizer;
use crate::domain::recommendations::Recommendation;
use crate::domain::report::{Report, ReportOptions};
use crate::domain::segmentation::Segmenter;
use crate::domain::timeline::Timeline;
use crate::ports::SourceParser;

/// Result of one pass over a script and its rendered timeline.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub code: CodeAnalysis,
    pub report: Report,
}

/// parse → normalize → extract → convert → segment → report.
pub struct AnalyzeUsecase<'a> {
    pub parser: &'a dyn SourceParser,
    pub config: &'a AnalyzerConfig,
    pub options: ReportOptions,
}

impl<'a> AnalyzeUsecase<'a> {
    pub fn new(parser: &'a dyn SourceParser, config: &'a AnalyzerConfig) -> Self {
        Self { parser, config, options: ReportOptions::default() }
    }

    /// Never fails: an unparseable script is analyzed as an empty program.
    pub fn run(&self, language: Language, source: &str, timeline: &Timeline) -> Analysis {
        let module = match self.parser.parse(language, source) {
            Ok(tree) => normalizer::normalize(language, &tree),
            Err(e) => {
                warn!(%language, error = %e, "parse failed, analyzing an empty program");
                Node::empty_module()
            }
        };

        let code = Extractor::new(self.config, language).analyze(&module);
        let view = MeasureView::from_timeline(timeline, self.config);
        let profile = Segmenter::new(self.config).segment(&view, &code.registries.api_calls);
        let report = Report::build(self.config, timeline, &code, view, profile, self.options);
        Analysis { code, report }
    }
}

/// One recommendation per execution of a student's project.
pub struct TutorSession<'a> {
    pub usecase: AnalyzeUsecase<'a>,
    pub engine: &'a SuggestionEngine,
}

impl<'a> TutorSession<'a> {
    pub fn new(usecase: AnalyzeUsecase<'a>, engine: &'a SuggestionEngine) -> Self {
        Self { usecase, engine }
    }

    pub fn on_execution<R: Rng + ?Sized>(
        &self,
        project: &str,
        language: Language,
        source: &str,
        timeline: &Timeline,
        rng: &mut R,
    ) -> (Analysis, Recommendation) {
        let analysis = self.usecase.run(language, source, timeline);
        let observation = Observation {
            analysis: &analysis.code,
            view: &analysis.report.measure_view,
            profile: &analysis.report.sound_profile,
        };
        let recommendation = self.engine.suggest(project, &observation, rng);
        info!(project, id = recommendation.id, "execution analyzed");
        (analysis, recommendation)
    }
}
