//! Validation performance benchmarks.
//!
//! Measures full validation of wordlists of growing size, and the cell codec
//! on its own.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tempfile::TempDir;

use cldf::rows::CellCodec;
use cldf::{Column, Dataset, Row, ValidationLog};

/// Build a wordlist with `forms` forms over 10 languages and 50 concepts.
fn wordlist(forms: usize) -> (TempDir, Dataset) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let mut ds = Dataset::in_dir(dir.path(), "Wordlist", false).expect("Failed to create dataset");
    ds.add_component("LanguageTable", Vec::<&str>::new()).unwrap();
    ds.add_component("ParameterTable", Vec::<&str>::new()).unwrap();

    let languages: Vec<Row> = (0..10)
        .map(|i| Row::new().with("ID", format!("lang{}", i)).with("Glottocode", format!("abcd{:04}", i)))
        .collect();
    let parameters: Vec<Row> = (0..50)
        .map(|i| Row::new().with("ID", format!("p{}", i)).with("Name", format!("concept {}", i)))
        .collect();
    let rows: Vec<Row> = (0..forms)
        .map(|i| {
            Row::new()
                .with("ID", format!("f{}", i))
                .with("Language_ID", format!("lang{}", i % 10))
                .with("Parameter_ID", format!("p{}", i % 50))
                .with("Form", "tatu")
                .with("Segments", vec!["t", "a", "t", "u"])
        })
        .collect();
    ds.write([
        ("FormTable", rows),
        ("LanguageTable", languages),
        ("ParameterTable", parameters),
    ])
    .unwrap();
    (dir, ds)
}

/// Benchmark full validation.
fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    group.sample_size(20);

    for size in [100, 1_000, 10_000] {
        let (_dir, ds) = wordlist(size);
        group.bench_with_input(BenchmarkId::new("wordlist", size), &ds, |b, ds| {
            b.iter(|| {
                let mut log = ValidationLog::new();
                black_box(ds.validate(Some(&mut log)).unwrap())
            })
        });
    }

    group.finish();
}

/// Benchmark the cell codec.
fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let segments = CellCodec::new(&Column::new("Segments").with_separator(" ")).unwrap();
    let value = segments.read("t a t u").unwrap();

    group.bench_function("read_list", |b| {
        b.iter(|| black_box(segments.read(black_box("t a t u"))))
    });
    group.bench_function("write_list", |b| {
        b.iter(|| black_box(segments.write(value.as_ref())))
    });

    group.finish();
}

criterion_group!(benches, bench_validate, bench_codec);
criterion_main!(benches);
