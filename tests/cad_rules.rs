mod util;
use std::collections::BTreeMap;

use mesh_triage::algs::cad_distance::{
    CancelToken, DistanceOpts, NodeDistances, SearchStrategy, compute_node_distances,
};
use mesh_triage::rules::cad::{CadThresholds, MissingDistancePolicy, detect_cad_errors};
use mesh_triage::rules::error_tag::ErrorTag;
use mesh_triage::topology::mesh::Mesh;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use util::*;

fn lifted(z: f64) -> Mesh {
    quad_grid_with(2, 2, 1.0, |_, _| [0.0, 0.0, z])
}

#[test]
fn identical_reference_has_zero_deviation() {
    let mesh = quad_grid(2, 2, 1.0);
    let d = compute_node_distances(&mesh, &mesh, &DistanceOpts::default(), None);
    assert!(d.is_complete());
    assert_eq!(d.len(), mesh.node_count());
    assert!(d.iter().all(|(_, v)| v == 0.0));
    let cad = detect_cad_errors(&mesh, &d, &CadThresholds::default());
    assert!(cad.tags.values().all(|t| t.is_empty()));
    assert_eq!(cad.aggregates[&eid(1)].coverage, 1.0);
}

#[test]
fn lifted_reference_flags_deviation_and_coverage() {
    let mesh = quad_grid(2, 2, 1.0);
    let d = compute_node_distances(&mesh, &lifted(3.0), &DistanceOpts::default(), None);
    assert!(d.iter().all(|(_, v)| approx(v, 3.0)));
    let cad = detect_cad_errors(&mesh, &d, &CadThresholds::default());
    for id in 1..=4 {
        assert_eq!(
            cad.tags[&eid(id)],
            tags(&[ErrorTag::CadDeviationHigh, ErrorTag::CadCoverageWeak])
        );
    }

    let d = compute_node_distances(&mesh, &lifted(5.0), &DistanceOpts::default(), None);
    let cad = detect_cad_errors(&mesh, &d, &CadThresholds::default());
    assert!(cad.tags[&eid(1)].contains(&ErrorTag::CadOutlierNode));
}

#[test]
fn missing_distance_is_not_zero_by_default() {
    let mesh = quad_grid(1, 1, 1.0);
    // node 4 unmeasured, the others far away
    let partial: BTreeMap<_, _> = [(nid(1), 3.0), (nid(2), 3.0), (nid(3), 3.0)].into();
    let d = NodeDistances::from_map(partial, false);

    let abstain = detect_cad_errors(&mesh, &d, &CadThresholds::default());
    assert!(abstain.tags[&eid(1)].is_empty());
    assert_eq!(abstain.abstained().collect::<Vec<_>>(), vec![eid(1)]);

    let zero = CadThresholds {
        missing: MissingDistancePolicy::TreatAsZero,
        ..CadThresholds::default()
    };
    let filled = detect_cad_errors(&mesh, &d, &zero);
    let agg = filled.aggregates[&eid(1)];
    assert_eq!(agg.missing, 1);
    assert_eq!(agg.measured, 3);
    assert!(approx(agg.mean, 2.25));
    // one of four nodes within tolerance
    assert!(filled.tags[&eid(1)].contains(&ErrorTag::CadCoverageWeak));
    assert!(!filled.tags[&eid(1)].contains(&ErrorTag::CadDeviationHigh));
}

#[test]
fn empty_reference_yields_no_data() {
    let mesh = quad_grid(1, 1, 1.0);
    let d = compute_node_distances(&mesh, &Mesh::new(), &DistanceOpts::default(), None);
    assert!(d.is_empty());
    assert_eq!(d.get(nid(1)), None);
}

#[test]
fn cancelled_search_returns_partial_results() {
    let mesh = quad_grid(4, 4, 1.0);
    let token = CancelToken::new();
    token.cancel();
    let opts = DistanceOpts {
        batch_size: 4,
        ..DistanceOpts::default()
    };
    let d = compute_node_distances(&mesh, &mesh, &opts, Some(&token));
    assert!(!d.is_complete());
    assert!(d.len() < mesh.node_count());
}

#[test]
fn grid_and_brute_force_agree() {
    let mut rng = SmallRng::seed_from_u64(7);
    let mut cloud = |n: u64| {
        let points: Vec<[f64; 3]> = (0..n)
            .map(|_| [rng.gen_range(-5.0..5.0), rng.gen_range(-5.0..5.0), rng.gen_range(-1.0..1.0)])
            .collect();
        mesh_from(&points, Vec::new())
    };
    let mesh = cloud(300);
    let reference = cloud(500);
    let brute = DistanceOpts {
        strategy: SearchStrategy::BruteForce,
        ..DistanceOpts::default()
    };
    let a = compute_node_distances(&mesh, &reference, &brute, None);
    for cell_size in [None, Some(0.1), Some(3.0)] {
        let grid = DistanceOpts {
            strategy: SearchStrategy::Grid { cell_size },
            ..DistanceOpts::default()
        };
        let b = compute_node_distances(&mesh, &reference, &grid, None);
        assert_eq!(a, b, "cell size {cell_size:?}");
    }
}
