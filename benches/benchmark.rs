//! Benchmarks tree construction and force evaluation across particle counts and opening angles.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use galaxen::particle::{ParticleParameters, ParticleState};
use galaxen::tree::Quadtree;
use galaxen::vector::Vector2;
use rand::Rng;
use rand_distr::{Distribution, Uniform};

fn random_bodies(n: usize) -> (Vec<ParticleState>, Vec<ParticleParameters>) {
    let mut rng = rand::thread_rng();
    let position = Uniform::new(-1000.0, 1000.0);
    let mass = Uniform::new(0.1, 10.0);

    let mut states = Vec::with_capacity(n);
    let mut parameters = Vec::with_capacity(n);
    for _ in 0..n {
        states.push(ParticleState::new(
            Vector2::new(position.sample(&mut rng), position.sample(&mut rng)),
            Vector2::ZERO,
        ));
        parameters.push(ParticleParameters::new(mass.sample(&mut rng), 0.0));
    }
    (states, parameters)
}

fn build_and_evaluate(states: &[ParticleState], parameters: &[ParticleParameters], theta: f64) {
    let mut tree = Quadtree::new(
        Vector2::new(-2000.0, -2000.0),
        Vector2::new(2000.0, 2000.0),
        theta,
        0.01,
        1.0,
    );
    for i in 0..states.len() {
        let _ = tree.insert(states, i);
    }
    tree.compute_mass_distribution(states, parameters);

    for i in 0..states.len() {
        let _ = tree.calculate_force(i, states, parameters);
    }
}

fn bench_particle_counts(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_build_and_evaluate");
    for &n in &[100usize, 1_000, 5_000] {
        let (states, parameters) = random_bodies(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| build_and_evaluate(&states, &parameters, 1.0));
        });
    }
    group.finish();
}

fn bench_theta(c: &mut Criterion) {
    let (states, parameters) = random_bodies(2_000);
    let mut group = c.benchmark_group("opening_angle");
    for &theta in &[0.0f64, 0.25, 0.5, 1.0, 2.0] {
        group.bench_with_input(BenchmarkId::from_parameter(theta), &theta, |b, &theta| {
            b.iter(|| build_and_evaluate(&states, &parameters, theta));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_particle_counts, bench_theta);
criterion_main!(benches);
