use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use estela_core::{Document, Extractor, PipelineConfig, RawPage, normalize, preprocess_html};

const SOURCE_URL: &str = "https://aemetblog.es/2026/02/12/engelamiento/";

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("../../tests/fixtures/{name}")).unwrap()
}

fn bench_parse(c: &mut Criterion) {
    let minimal = fixture("engelamiento_minimal.html");
    let full = fixture("engelamiento_full.html");

    let mut group = c.benchmark_group("parse");

    group.bench_with_input(BenchmarkId::new("minimal", "2KB"), &minimal, |b, html| {
        b.iter(|| Document::parse(black_box(html)))
    });

    group.bench_with_input(BenchmarkId::new("full", "7KB"), &full, |b, html| {
        b.iter(|| Document::parse(black_box(html)))
    });

    group.finish();
}

fn bench_preprocess(c: &mut Criterion) {
    let html = fixture("engelamiento_full.html");
    let config = Default::default();

    c.bench_function("preprocess", |b| b.iter(|| preprocess_html(black_box(&html), &config)));
}

fn bench_extract(c: &mut Criterion) {
    let extractor = Extractor::new(&PipelineConfig::default());
    let page = RawPage::now(SOURCE_URL, fixture("engelamiento_full.html"));

    c.bench_function("extract", |b| b.iter(|| extractor.extract(black_box(&page))));
}

fn bench_capture(c: &mut Criterion) {
    let extractor = Extractor::new(&PipelineConfig::default());
    let page = RawPage::now(SOURCE_URL, fixture("engelamiento_full.html"));

    c.bench_function("extract_and_normalize", |b| {
        b.iter(|| extractor.extract(black_box(&page)).and_then(normalize))
    });
}

criterion_group!(benches, bench_parse, bench_preprocess, bench_extract, bench_capture);
criterion_main!(benches);
