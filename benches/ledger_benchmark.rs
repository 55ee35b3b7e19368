use criterion::{Criterion, black_box, criterion_group, criterion_main};
use step_telemetry::report::build_workbook;
use step_telemetry::{ManualClock, StepObservation, TestRun};

fn observations(n: usize) -> Vec<StepObservation> {
    (0..n)
        .map(|i| {
            let scenario = format!("Scenario {}", i / 10);
            match i % 4 {
                0 => StepObservation::new(scenario, "Je suis sur la page d'accueil").url(format!("https://radio/{}", i)).passed(),
                1 => StepObservation::new(scenario, format!("Search 'term {}'", i)).passed(),
                2 => StepObservation::new(scenario, "Je clique sur Play").url(format!("https://radio/{}", i)).failed("timeout waiting for player"),
                _ => StepObservation::new(scenario, format!("Verify results {}", i)).passed(),
            }
        })
        .collect()
}

fn filled_run(n: usize) -> TestRun {
    let mut run = TestRun::with_clock(ManualClock::ticking_seconds());
    for obs in observations(n) {
        run.record(obs);
    }
    run
}

fn benchmark_ingestion(c: &mut Criterion) {
    let input = observations(500);

    c.bench_function("record_500_steps", |b| {
        b.iter(|| {
            let mut run = TestRun::with_clock(ManualClock::ticking_seconds());
            for obs in input.iter().cloned() {
                run.record(black_box(obs));
            }
            run.summary()
        })
    });
}

fn benchmark_workbook(c: &mut Criterion) {
    let run = filled_run(500);
    let records = run.records();
    let snapshot = run.snapshot();

    c.bench_function("build_workbook_500_steps", |b| {
        b.iter(|| build_workbook(black_box(&records), black_box(&snapshot), run.suggestions()))
    });
}

criterion_group!(benches, benchmark_ingestion, benchmark_workbook);
criterion_main!(benches);
