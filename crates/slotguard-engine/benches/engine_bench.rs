use criterion::{black_box, criterion_group, criterion_main, Criterion};
use slotguard_engine::config::EngineOptions;
use slotguard_engine::domains::{ArithmeticConfig, ArithmeticModel, ThresholdConfig, ThresholdModel};
use slotguard_engine::query::render_smtlib;
use slotguard_engine::PropertyChecker;

fn threshold() -> ThresholdModel {
    ThresholdModel::new(ThresholdConfig::default(), 4).unwrap()
}

// ---------------------------------------------------------------------------
// Query construction (scenario -> encoded steps -> negated property)
// ---------------------------------------------------------------------------

fn bench_build_threshold_depth4(c: &mut Criterion) {
    let model = threshold();
    let property = model.accounting_property();
    c.bench_function("engine_build_threshold_depth4", |b| {
        b.iter(|| model.exploration(black_box(4)).query(&property).unwrap())
    });
}

fn bench_build_threshold_depth8(c: &mut Criterion) {
    let model = threshold();
    let property = model.authorization_property();
    c.bench_function("engine_build_threshold_depth8", |b| {
        b.iter(|| model.exploration(black_box(8)).query(&property).unwrap())
    });
}

fn bench_render_threshold_depth4(c: &mut Criterion) {
    let model = threshold();
    let query = model
        .exploration(4)
        .query(&model.accounting_property())
        .unwrap();
    c.bench_function("engine_render_threshold_depth4", |b| {
        b.iter(|| render_smtlib(black_box(&query)))
    });
}

// ---------------------------------------------------------------------------
// Full check (build -> solve)
// ---------------------------------------------------------------------------

fn bench_check_withdraw(c: &mut Criterion) {
    let model = ArithmeticModel::new(ArithmeticConfig::default()).unwrap();
    let checker = PropertyChecker::new(EngineOptions::default());
    c.bench_function("engine_check_withdraw", |b| {
        b.iter(|| {
            let query = model
                .scenario()
                .query(&model.no_underflow_property())
                .unwrap();
            checker.check(black_box(&query)).unwrap()
        })
    });
}

fn bench_check_threshold_authorization(c: &mut Criterion) {
    let model = threshold();
    let checker = PropertyChecker::new(EngineOptions::default());
    let query = model
        .exploration(3)
        .query(&model.authorization_property())
        .unwrap();
    let mut group = c.benchmark_group("engine_check_threshold");
    group.sample_size(10);
    group.bench_function("authorization_depth3", |b| {
        b.iter(|| checker.check(black_box(&query)).unwrap())
    });
    group.finish();
}

criterion_group!(
    build,
    bench_build_threshold_depth4,
    bench_build_threshold_depth8,
    bench_render_threshold_depth4,
);
criterion_group!(
    check,
    bench_check_withdraw,
    bench_check_threshold_authorization,
);
criterion_main!(build, check);
