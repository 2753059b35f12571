use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use mesh_triage::algs::cad_distance::{DistanceOpts, SearchStrategy, compute_node_distances};
use mesh_triage::topology::ids::NodeId;
use mesh_triage::topology::mesh::{Mesh, Node};

/// Noisy height field of `n` points over a 100 x 100 patch.
fn point_cloud(n: usize, seed: u64) -> Mesh {
    let mut rng = SmallRng::seed_from_u64(seed);
    let nodes = (0..n).map(|i| {
        let x = rng.r#gen::<f64>() * 100.0;
        let y = rng.r#gen::<f64>() * 100.0;
        let z = (x * 0.1).sin() + rng.gen_range(-0.05..0.05);
        Node::new(NodeId::new(i as u64 + 1), [x, y, z])
    });
    match Mesh::try_from_parts(nodes, Vec::new()) {
        Ok(mesh) => mesh,
        Err(e) => panic!("bench cloud: {e}"),
    }
}

fn bench_distance(c: &mut Criterion) {
    let mut group = c.benchmark_group("node_distances");
    for &n in &[1_000usize, 10_000] {
        let mesh = point_cloud(n, 1);
        let reference = point_cloud(n, 2);
        let grid = DistanceOpts::default();
        group.bench_with_input(BenchmarkId::new("grid", n), &n, |b, _| {
            b.iter(|| compute_node_distances(&mesh, &reference, &grid, None))
        });
        if n <= 1_000 {
            let brute = DistanceOpts {
                strategy: SearchStrategy::BruteForce,
                ..DistanceOpts::default()
            };
            group.bench_with_input(BenchmarkId::new("brute_force", n), &n, |b, _| {
                b.iter(|| compute_node_distances(&mesh, &reference, &brute, None))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_distance);
criterion_main!(benches);
