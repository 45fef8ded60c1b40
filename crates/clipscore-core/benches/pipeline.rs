//! Benchmarks for the model-free parts of a scoring run.
//!
//! Run with: cargo bench -p clipscore-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::DynamicImage;

use clipscore_core::batch::allocate_next_batch;
use clipscore_core::chart::{render_summary, ChartKind, ChartOptions, FigureSize};
use clipscore_core::embedding::preprocess;
use clipscore_core::math::cosine_similarity;
use clipscore_core::types::{scored_file_name, ScoreRecord};

fn benchmark_preprocess(c: &mut Criterion) {
    let img = DynamicImage::new_rgb8(1920, 1080);

    c.bench_function("clip_preprocess_224", |b| {
        b.iter(|| preprocess(black_box(&img), 224))
    });
}

fn benchmark_cosine(c: &mut Criterion) {
    let a: Vec<f32> = (0..768).map(|i| (i as f32).sin()).collect();
    let t: Vec<f32> = (0..768).map(|i| (i as f32).cos()).collect();

    c.bench_function("cosine_similarity_768", |b| {
        b.iter(|| cosine_similarity(black_box(&a), black_box(&t)))
    });
}

fn benchmark_allocate(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    for n in 1..=200 {
        std::fs::create_dir(dir.path().join(format!("Batch_{n}"))).unwrap();
    }

    c.bench_function("allocate_next_batch_200", |b| {
        b.iter(|| allocate_next_batch(black_box(dir.path())).unwrap())
    });
}

fn benchmark_summary_chart(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let records: Vec<ScoreRecord> = (0..50)
        .map(|i| {
            let score = 0.2 + (i as f32 * 0.37).sin() * 0.05;
            ScoreRecord {
                image_index: i + 1,
                image_name: format!("img{i}.jpg"),
                clip_score: score,
                scored_image_path: scored_file_name(score),
            }
        })
        .collect();
    let options = ChartOptions {
        summary_kind: ChartKind::Bar,
        figure: FigureSize::DEFAULT,
        ..ChartOptions::default()
    };

    c.bench_function("render_summary_bar_50", |b| {
        b.iter(|| render_summary(black_box(&records), &options, dir.path()).unwrap())
    });
}

criterion_group!(
    benches,
    benchmark_preprocess,
    benchmark_cosine,
    benchmark_allocate,
    benchmark_summary_chart,
);
criterion_main!(benches);
