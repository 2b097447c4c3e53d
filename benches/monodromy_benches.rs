use RustedMonodromy::numerical::demo_systems::OscillatorExample;
use RustedMonodromy::numerical::sensitivity::SensitivitySolver;
use RustedMonodromy::numerical::simulator::{Simulator, linspace};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn bench_trajectory(c: &mut Criterion) {
    let example = OscillatorExample::DuffingQuintic;
    let system = example.system();
    let ts = linspace(0.0, 10.0, 100);
    c.bench_function("trajectory over 10 time units", |b| {
        b.iter(|| {
            let mut sim = Simulator::new(system.clone(), ts.clone(), 1e-8, 1e-8);
            sim.set_initial_state(example.initial_condition());
            sim.set_parameters(example.default_params());
            sim.evaluate().unwrap();
            black_box(sim.get_result())
        })
    });
}

fn bench_variational(c: &mut Criterion) {
    let example = OscillatorExample::DuffingQuintic;
    let system = example.system();
    c.bench_function("monodromy matrix over 10 time units", |b| {
        b.iter(|| {
            let solver = SensitivitySolver::new(system.clone(), 1e-8, 1e-8);
            let result = solver
                .final_state_jacobian(
                    &example.initial_condition(),
                    &example.default_params(),
                    0.0,
                    10.0,
                )
                .unwrap();
            black_box(result)
        })
    });
}

criterion_group!(benches, bench_trajectory, bench_variational);
criterion_main!(benches);
