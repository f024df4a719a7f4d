use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pprof::criterion::{Output, PProfProfiler};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::Duration;

use psybattery_core::{RecordedResponse, TestKind};
use psybattery_experiment::{TestConfig, TestDesign, design};
use psybattery_scoring::score;

/// Responses for a generated run: every other trial answered correctly, the
/// rest timed out.
fn synthetic_run(config: &TestConfig, seed: u64) -> Vec<RecordedResponse> {
    let mut rng = StdRng::seed_from_u64(seed);
    let trials = design::generate(&config.design, &mut rng).unwrap_or_default();
    trials
        .into_iter()
        .map(|t| match t.expected_response() {
            Some(r) if t.index % 2 == 0 => {
                RecordedResponse::answered(t, r, 350.0 + (t.index % 97) as f64)
            }
            _ => RecordedResponse::timed_out(t, 1700.0),
        })
        .collect()
}

pub fn bench_generate(c: &mut Criterion) {
    let mut group = c.benchmark_group("generate");
    group
        .sample_size(50)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));

    for repetitions in [1usize, 4, 16] {
        let config = TestConfig::new(TestDesign::Attention {
            factors: Default::default(),
            repetitions,
        });
        group.bench_with_input(
            BenchmarkId::new("attention", repetitions),
            &config,
            |b, config| {
                b.iter_batched(
                    || StdRng::seed_from_u64(42),
                    |mut rng| black_box(design::generate(&config.design, &mut rng)),
                    BatchSize::SmallInput,
                );
            },
        );
    }

    for trials in [40usize, 400] {
        let config = TestConfig::new(TestDesign::Updating {
            lag: 2,
            trials,
            target_probability: 0.3,
            grid_cells: 9,
        });
        group.bench_with_input(BenchmarkId::new("updating", trials), &config, |b, config| {
            b.iter_batched(
                || StdRng::seed_from_u64(42),
                |mut rng| black_box(design::generate(&config.design, &mut rng)),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

pub fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");
    group
        .sample_size(50)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));

    let cases = [
        (TestKind::Attention, TestConfig::attention()),
        (TestKind::Updating, TestConfig::updating(2)),
        (TestKind::Interference, TestConfig::interference()),
    ];
    for (kind, config) in cases {
        let responses = synthetic_run(&config, 7);
        group.bench_function(kind.id(), |b| {
            b.iter(|| black_box(score(kind, black_box(&responses))));
        });
    }

    group.finish();
}

criterion_group! {
    name = benches;
    config = Criterion::default()
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
        .confidence_level(0.95)
        .noise_threshold(0.02);
    targets = bench_generate, bench_score
}

criterion_main!(benches);
