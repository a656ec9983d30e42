//! # Transition Benchmarks
//!
//! Throughput of machine lookups and full controller walks.
//!
//! Run with: `cargo bench -p vault-wizard-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use vault_wizard_core::{
    Event, Feature, FlowParams, MachineRegistry, StateId, TransitionContext, WizardController,
    progress_bar,
};

fn registry() -> Arc<MachineRegistry> {
    Arc::new(MachineRegistry::builtin().expect("builtin machines validate"))
}

fn bench_single_transition(c: &mut Criterion) {
    let registry = registry();
    let secrets = registry.feature(Feature::Secrets);
    let params = FlowParams::mount("kv");
    let history = [StateId::from_static("idle"), StateId::from_static("enable")];
    let ctx = TransitionContext::new(Some(&params), &history);
    let enable = StateId::from_static("enable");

    c.bench_function("secrets_enable_continue", |b| {
        b.iter(|| black_box(secrets.transition(black_box(&enable), &Event::CONTINUE, &ctx)));
    });
}

fn bench_full_plan(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("full_plan");

    for repeats in [1usize, 10, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(repeats), &repeats, |b, &repeats| {
            b.iter(|| {
                let mut wizard = WizardController::new(Arc::clone(&registry));
                for _ in 0..repeats {
                    wizard.restart_guide();
                    wizard.save_features(&Feature::ALL);
                    while wizard.current_machine().is_some() {
                        if !wizard.send_feature(&Event::DONE, None).handled {
                            break;
                        }
                    }
                    black_box(wizard.take_intents());
                }
                black_box(wizard)
            });
        });
    }
    group.finish();
}

fn bench_progress_bar(c: &mut Criterion) {
    let mut wizard = WizardController::new(registry());
    wizard.restart_guide();
    wizard.save_features(&Feature::ALL);

    c.bench_function("progress_bar_all_features", |b| {
        b.iter(|| black_box(progress_bar(black_box(wizard.state()))));
    });
}

criterion_group!(
    benches,
    bench_single_transition,
    bench_full_plan,
    bench_progress_bar
);
criterion_main!(benches);
