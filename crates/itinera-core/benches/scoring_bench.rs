// ─────────────────────────────────────────────────────────────────────
// Itinera — Extraction Kernel Benchmarks
// ─────────────────────────────────────────────────────────────────────
//! Criterion benchmarks for the per-request engines and the full
//! pipeline over the fixture taxonomy.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use itinera_core::fixtures;
use itinera_core::{
    schema, ClassificationEngine, ExperiencePipeline, ExperienceRequest, FidelityEvaluator,
    StaticTaxonomy, TaxonomySelector, TaxonomyStore,
};
use itinera_types::{KernelConfig, SchemaKind};

// ── TaxonomySelector.select() ───────────────────────────────────────

fn bench_select_inferred(c: &mut Criterion) {
    let taxonomy = Arc::new(fixtures::travel_taxonomy().unwrap());
    let selector = TaxonomySelector::new(taxonomy, KernelConfig::default());
    c.bench_function("select_inferred", |b| {
        b.iter(|| selector.select(black_box(fixtures::LISTING_SOURCE), None))
    });
}

fn bench_select_explicit(c: &mut Criterion) {
    let taxonomy = Arc::new(fixtures::travel_taxonomy().unwrap());
    let selector = TaxonomySelector::new(taxonomy, KernelConfig::default());
    c.bench_function("select_explicit", |b| {
        b.iter(|| selector.select(black_box(fixtures::SUNSET_SOURCE), Some("Water Activities")))
    });
}

// ── Schema validation ───────────────────────────────────────────────

fn bench_validate_listing(c: &mut Criterion) {
    c.bench_function("validate_listing", |b| {
        b.iter(|| schema::validate(black_box(fixtures::LISTING_JSON), SchemaKind::Listing))
    });
}

// ── FidelityEvaluator.evaluate() ────────────────────────────────────

fn bench_evaluate_listing(c: &mut Criterion) {
    let evaluator = FidelityEvaluator::default();
    c.bench_function("evaluate_listing", |b| {
        b.iter(|| {
            evaluator.evaluate(
                black_box(fixtures::LISTING_SOURCE),
                black_box(fixtures::LISTING_JSON),
                SchemaKind::Listing,
            )
        })
    });
}

// ── ClassificationEngine.classify() ─────────────────────────────────

fn bench_classify(c: &mut Criterion) {
    let engine = ClassificationEngine::default();
    c.bench_function("classify", |b| {
        b.iter(|| engine.classify(black_box(fixtures::LISTING_SOURCE)))
    });
}

// ── Full pipeline ───────────────────────────────────────────────────

fn bench_full_pipeline(c: &mut Criterion) {
    let store = TaxonomyStore::new();
    store
        .load(&StaticTaxonomy::new(fixtures::travel_tree()))
        .unwrap();
    let pipeline = ExperiencePipeline::new(KernelConfig::default(), Arc::new(store)).unwrap();
    let request = ExperienceRequest {
        source: fixtures::LISTING_SOURCE,
        listing: fixtures::LISTING_JSON,
        itinerary: fixtures::ITINERARY_JSON,
        ..Default::default()
    };

    c.bench_function("full_pipeline", |b| {
        b.iter(|| pipeline.process(black_box(&request)))
    });
}

criterion_group!(
    benches,
    bench_select_inferred,
    bench_select_explicit,
    bench_validate_listing,
    bench_evaluate_listing,
    bench_classify,
    bench_full_pipeline,
);
criterion_main!(benches);
