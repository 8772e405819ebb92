use beatcoach::application::AnalyzeUsecase;
use beatcoach::config::AnalyzerConfig;
use beatcoach::domain::language::Language;
use beatcoach::domain::lookup::{lookup, Dimension, Key};
use beatcoach::domain::timeline::{Clip, Timeline, Track};
use beatcoach::infrastructure::JsonAstParser;
use serde_json::{json, Value};

const DRUMS: &str = "HIPHOP_DRUMS_001";
const BASS: &str = "RNB_BASS_002";

fn py_name(id: &str, line: u64, col: u64) -> Value {
    json!({"_type": "Name", "id": id, "ctx": {"_type": "Load"}, "lineno": line, "col_offset": col})
}

fn py_num(value: i64, line: u64, col: u64) -> Value {
    json!({"_type": "Constant", "value": value, "lineno": line, "col_offset": col})
}

/// `fitMedia(<sound>, 1, <start>, <end>)` on its own line.
fn fit_media(sound: &str, line: u64, start: i64, end: i64) -> Value {
    json!({
        "_type": "Expr", "lineno": line, "col_offset": 0,
        "value": {
            "_type": "Call", "lineno": line, "col_offset": 0,
            "func": py_name("fitMedia", line, 0),
            "args": [py_name(sound, line, 9), py_num(1, line, 27), py_num(start, line, 30), py_num(end, line, 33)],
            "keywords": []
        }
    })
}

fn two_part_song() -> (String, Timeline) {
    let tree = json!({"_type": "Module", "body": [fit_media(DRUMS, 1, 1, 5), fit_media(BASS, 2, 5, 9)], "type_ignores": []});
    let timeline = Timeline {
        tempo: Some(120.0),
        length: None,
        tracks: vec![
            Track {
                clips: vec![Clip { sound: DRUMS.into(), track: 1, measure: 1.0, start: 1.0, end: 5.0 }],
                effects: vec![],
            },
            Track {
                clips: vec![Clip { sound: BASS.into(), track: 2, measure: 5.0, start: 1.0, end: 5.0 }],
                effects: vec![],
            },
        ],
    };
    (tree.to_string(), timeline)
}

#[test]
fn test_two_sounds_make_sections_a_and_b() {
    let config = AnalyzerConfig::default();
    let (source, timeline) = two_part_song();
    let analysis = AnalyzeUsecase::new(&JsonAstParser, &config).run(Language::Python, &source, &timeline);

    let profile = &analysis.report.sound_profile;
    let labels: Vec<_> = profile.labels().collect();
    assert_eq!(labels, vec!["A", "B"]);
    assert_eq!(profile.total_entries(), 2);
    assert_eq!((profile.sections()[0].start, profile.sections()[0].end), (1, 4));
    assert_eq!((profile.sections()[1].start, profile.sections()[1].end), (5, 8));
    assert_eq!(profile.sections()[0].sounds[DRUMS].lines, vec![1]);

    assert_eq!(analysis.report.overview.measures, 8);
    assert_eq!(analysis.report.overview.length_seconds, 16.0);
    assert_eq!(analysis.code.counts.fit_media, 2);
}

#[test]
fn test_label_lookup_round_trips_ranges() {
    let config = AnalyzerConfig::default();
    let (source, timeline) = two_part_song();
    let analysis = AnalyzeUsecase::new(&JsonAstParser, &config).run(Language::Python, &source, &timeline);
    let profile = &analysis.report.sound_profile;

    for section in profile.sections() {
        let measures = lookup(profile, &Key::Label(section.label.clone()), Dimension::Measure);
        let expected: Vec<Key> = section.measures().map(Key::Measure).collect();
        assert_eq!(measures, expected);
    }
    assert_eq!(lookup(profile, &Key::Line(2), Dimension::Label), vec![Key::Label("B".into())]);
    assert!(lookup(profile, &Key::Label("Z".into()), Dimension::Measure).is_empty());
}

#[test]
fn test_analysis_is_idempotent() {
    let config = AnalyzerConfig::default();
    let (source, timeline) = two_part_song();
    let usecase = AnalyzeUsecase::new(&JsonAstParser, &config);
    let first = usecase.run(Language::Python, &source, &timeline);
    let second = usecase.run(Language::Python, &source, &timeline);
    assert_eq!(first.code.features, second.code.features);
    assert_eq!(first.code.structure, second.code.structure);
    assert_eq!(first.report, second.report);
}

#[test]
fn test_unparseable_source_yields_zero_profile() {
    let config = AnalyzerConfig::default();
    let analysis = AnalyzeUsecase::new(&JsonAstParser, &config).run(Language::Python, "def (", &Timeline::default());
    assert!(analysis.code.features.is_zero());
    assert!(analysis.report.sound_profile.is_empty());
    assert_eq!(analysis.report.overview.measures, 0);
}

#[test]
fn test_javascript_function_called_twice() {
    fn at(mut node: Value, line: u64, column: u64) -> Value {
        node["loc"] = json!({"start": {"line": line, "column": column}});
        node
    }
    fn ident(name: &str, line: u64, column: u64) -> Value {
        at(json!({"type": "Identifier", "name": name}), line, column)
    }
    fn call_stmt(callee: &str, args: Vec<Value>, line: u64, column: u64) -> Value {
        let call = at(json!({"type": "CallExpression", "callee": ident(callee, line, column), "arguments": args}), line, column);
        at(json!({"type": "ExpressionStatement", "expression": call}), line, column)
    }
    let num = |v: i64, line: u64, column: u64| at(json!({"type": "Literal", "value": v, "raw": v.to_string()}), line, column);

    // function beat() { fitMedia(HIPHOP_DRUMS_001, 1, 1, 5); }
    // beat();
    // beat();
    let body = at(
        json!({"type": "BlockStatement", "body": [
            call_stmt("fitMedia", vec![ident(DRUMS, 2, 13), num(1, 2, 31), num(1, 2, 34), num(5, 2, 37)], 2, 4)
        ]}),
        1,
        16,
    );
    let tree = at(
        json!({"type": "Program", "sourceType": "script", "body": [
            at(json!({"type": "FunctionDeclaration", "id": ident("beat", 1, 9), "params": [], "body": body}), 1, 0),
            call_stmt("beat", vec![], 4, 0),
            call_stmt("beat", vec![], 5, 0)
        ]}),
        1,
        0,
    );

    let config = AnalyzerConfig::default();
    let analysis =
        AnalyzeUsecase::new(&JsonAstParser, &config).run(Language::JavaScript, &tree.to_string(), &Timeline::default());
    assert_eq!(analysis.code.features.get("functions", "repeatExecution"), 2);
    assert_eq!(analysis.code.features.get("functions", "manipulateValue"), 0);
    assert_eq!(analysis.code.registries.api_calls[0].clips, vec![DRUMS.to_string()]);
}

#[test]
fn test_javascript_member_call_and_loop_declarators() {
    fn at(mut node: Value, line: u64, column: u64) -> Value {
        node["loc"] = json!({"start": {"line": line, "column": column}});
        node
    }
    fn ident(name: &str, line: u64, column: u64) -> Value {
        at(json!({"type": "Identifier", "name": name}), line, column)
    }
    let num = |v: i64, line: u64, column: u64| at(json!({"type": "Literal", "value": v, "raw": v.to_string()}), line, column);

    // song.play();
    // for (var i = 0, j = 8; i < j; i++) { }
    let play = at(
        json!({"type": "CallExpression", "arguments": [],
            "callee": at(json!({"type": "MemberExpression", "computed": false,
                "object": ident("song", 1, 0), "property": ident("play", 1, 5)}), 1, 0)}),
        1,
        0,
    );
    let declarator = |name: &str, value: i64, column: u64| {
        at(json!({"type": "VariableDeclarator", "id": ident(name, 2, column), "init": num(value, 2, column + 4)}), 2, column)
    };
    let for_loop = at(
        json!({
            "type": "ForStatement",
            "init": at(json!({"type": "VariableDeclaration", "kind": "var",
                "declarations": [declarator("i", 0, 9), declarator("j", 8, 16)]}), 2, 5),
            "test": at(json!({"type": "BinaryExpression", "operator": "<", "left": ident("i", 2, 23), "right": ident("j", 2, 27)}), 2, 23),
            "update": at(json!({"type": "UpdateExpression", "operator": "++", "prefix": false, "argument": ident("i", 2, 30)}), 2, 30),
            "body": at(json!({"type": "BlockStatement", "body": []}), 2, 35)
        }),
        2,
        0,
    );
    let tree = at(
        json!({"type": "Program", "sourceType": "script", "body": [
            at(json!({"type": "ExpressionStatement", "expression": play}), 1, 0),
            for_loop
        ]}),
        1,
        0,
    );

    let config = AnalyzerConfig::default();
    let analysis =
        AnalyzeUsecase::new(&JsonAstParser, &config).run(Language::JavaScript, &tree.to_string(), &Timeline::default());
    assert_eq!(analysis.code.features.get("features", "indexing"), 1);
    assert_eq!(analysis.code.features.get("iteration", "forLoopsIterable"), 2);
    let j = analysis.code.registries.variable("j").expect("j is assigned");
    assert_eq!(j.assignments.len(), 1);
    assert_eq!(j.assignments[0].line, 2);
    assert!(analysis.code.registries.variable("i").is_some());
}
