/// Benchmarks for the Beatcoach analysis pipeline.
///
/// Run with: `cargo bench`
///
/// - Segmentation of synthetic songs at several lengths
/// - Feature extraction over generated scripts

use std::collections::BTreeMap;

use beatcoach::config::AnalyzerConfig;
use beatcoach::domain::extractor::Extractor;
use beatcoach::domain::language::Language;
use beatcoach::domain::measure_view::{MeasureItem, MeasureView};
use beatcoach::domain::normalizer;
use beatcoach::domain::segmentation::Segmenter;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Value};

// ═══════════════════════════════════════════════════════════════════════════
// Synthetic Data Generators
// ═══════════════════════════════════════════════════════════════════════════

/// A song in verse/chorus blocks of eight measures.
fn synthetic_view(measures: usize) -> MeasureView {
    let sounds = ["DRUMS_A", "BASS_A", "KEYS_B", "VOX_C"];
    let mut view = BTreeMap::new();
    for m in 1..=measures {
        let block = (m - 1) / 8;
        let items = sounds
            .iter()
            .enumerate()
            .filter(|(i, _)| (block + i) % 3 != 0)
            .map(|(i, name)| MeasureItem::Sound { name: name.to_string(), track: i, genre: None, instrument: None })
            .collect();
        view.insert(m, items);
    }
    MeasureView::from_measures(view)
}

/// `for i in range(1, 4): fitMedia(...)` repeated `loops` times.
fn synthetic_python(loops: usize) -> Value {
    let name = |id: &str, line: usize| json!({"_type": "Name", "id": id, "lineno": line, "col_offset": 0});
    let num = |v: usize, line: usize| json!({"_type": "Constant", "value": v, "lineno": line, "col_offset": 0});
    let body: Vec<Value> = (0..loops)
        .map(|k| {
            let line = k * 2 + 1;
            json!({
                "_type": "For", "lineno": line, "col_offset": 0,
                "target": name("i", line),
                "iter": {"_type": "Call", "lineno": line, "col_offset": 9, "func": name("range", line),
                         "args": [num(1, line), num(4, line)], "keywords": []},
                "body": [{"_type": "Expr", "lineno": line + 1, "col_offset": 4, "value": {
                    "_type": "Call", "lineno": line + 1, "col_offset": 4, "func": name("fitMedia", line + 1),
                    "args": [name("DRUMS_A", line + 1), num(1, line + 1), name("i", line + 1), num(5, line + 1)],
                    "keywords": []}}],
                "orelse": []
            })
        })
        .collect();
    json!({"_type": "Module", "body": body, "type_ignores": []})
}

// ═══════════════════════════════════════════════════════════════════════════
// Benchmarks
// ═══════════════════════════════════════════════════════════════════════════

fn bench_segmentation(c: &mut Criterion) {
    let config = AnalyzerConfig::default();
    let mut group = c.benchmark_group("segmentation/measures");

    for measures in [16usize, 64, 256] {
        let view = synthetic_view(measures);
        group.throughput(Throughput::Elements(measures as u64));
        group.bench_with_input(BenchmarkId::from_parameter(measures), &view, |b, view| {
            b.iter(|| Segmenter::new(&config).segment(black_box(view), &[]))
        });
    }
    group.finish();
}

fn bench_extraction(c: &mut Criterion) {
    let config = AnalyzerConfig::default();
    let mut group = c.benchmark_group("extractor/loops");
    group.sample_size(30);

    for loops in [10usize, 100, 500] {
        let module = normalizer::normalize(Language::Python, &synthetic_python(loops));
        group.throughput(Throughput::Elements(loops as u64));
        group.bench_with_input(BenchmarkId::from_parameter(loops), &module, |b, module| {
            b.iter(|| Extractor::new(&config, Language::Python).analyze(black_box(module)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_segmentation, bench_extraction);
criterion_main!(benches);
