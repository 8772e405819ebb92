use beatcoach::application::{AnalyzeUsecase, TutorSession};
use beatcoach::config::AnalyzerConfig;
use beatcoach::domain::ast::{Node, NodeKind};
use beatcoach::domain::decision::SuggestionEngine;
use beatcoach::domain::estimator::{TypeEstimator, TypeLabel};
use beatcoach::domain::language::Language;
use beatcoach::domain::recommendations::{self, GENERIC_POOL};
use beatcoach::domain::timeline::{Clip, Timeline, Track};
use beatcoach::infrastructure::JsonAstParser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

fn clip(sound: &str, measure: f64) -> Clip {
    Clip { sound: sound.into(), track: 1, measure, start: 1.0, end: 5.0 }
}

#[test]
fn test_session_walks_from_instrument_to_parameters() {
    let config = AnalyzerConfig::default();
    let engine = SuggestionEngine::new(config.clone());
    let session = TutorSession::new(AnalyzeUsecase::new(&JsonAstParser, &config), &engine);
    let mut rng = StdRng::seed_from_u64(11);
    let empty = json!({"_type": "Module", "body": []}).to_string();

    let (_, first) = session.on_execution("song", Language::Python, &empty, &Timeline::default(), &mut rng);
    assert_eq!(first.id, recommendations::INSTRUMENT);

    let timeline = Timeline {
        tempo: None,
        length: None,
        tracks: vec![Track { clips: vec![clip("DRUMS_A", 1.0), clip("BASS_B", 5.0)], effects: vec![] }],
    };
    let (analysis, second) = session.on_execution("song", Language::Python, &empty, &timeline, &mut rng);
    assert_eq!(analysis.report.sound_profile.len(), 2);
    assert_eq!(second.id, recommendations::PARAMETERS);

    let (_, third) = session.on_execution("song", Language::Python, &empty, &timeline, &mut rng);
    assert!(GENERIC_POOL.contains(&third.id) || third.is_no_suggestion());
    assert_eq!(&engine.history("song")[..2], &[recommendations::INSTRUMENT, recommendations::PARAMETERS]);
}

#[test]
fn test_projects_do_not_share_history() {
    let config = AnalyzerConfig::default();
    let engine = SuggestionEngine::new(config.clone());
    let session = TutorSession::new(AnalyzeUsecase::new(&JsonAstParser, &config), &engine);
    let mut rng = StdRng::seed_from_u64(2);
    let empty = json!({"_type": "Module", "body": []}).to_string();

    let (_, a) = session.on_execution("a", Language::Python, &empty, &Timeline::default(), &mut rng);
    let (_, b) = session.on_execution("b", Language::Python, &empty, &Timeline::default(), &mut rng);
    assert_eq!(a.id, recommendations::INSTRUMENT);
    assert_eq!(b.id, recommendations::INSTRUMENT);

    engine.reset("a");
    assert!(engine.history("a").is_empty());
    assert_eq!(engine.history("b"), vec![recommendations::INSTRUMENT]);
}

#[test]
fn test_self_assignment_estimates_unknown() {
    // a = a
    let tree = json!({"_type": "Module", "body": [{
        "_type": "Assign", "lineno": 1, "col_offset": 0,
        "targets": [{"_type": "Name", "id": "a", "lineno": 1, "col_offset": 0}],
        "value": {"_type": "Name", "id": "a", "lineno": 1, "col_offset": 4}
    }]});
    let config = AnalyzerConfig::default();
    let analysis =
        AnalyzeUsecase::new(&JsonAstParser, &config).run(Language::Python, &tree.to_string(), &Timeline::default());

    let estimator = TypeEstimator::new(&config, &analysis.code.registries, &analysis.code.structure);
    let use_site = Node::new(NodeKind::Name { id: "a".into() }, 2, 0);
    assert_eq!(estimator.estimate(&use_site), TypeLabel::Unknown);
    assert_eq!(estimator.estimate(&use_site).to_string(), "");
}
