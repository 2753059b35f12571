mod util;
use mesh_triage::remediation::{Recommendation, map_action};
use mesh_triage::risk::scorer::RiskCategory;
use mesh_triage::rules::error_tag::{ErrorTag, TagSet};
use mesh_triage::topology::mesh::Mesh;
use mesh_triage::validation::{
    ElementChange, ValidationOpts, classify_change, element_changed, region_elements,
    validate_remediation,
};
use util::*;

/// 4x4 unit grid with the interior node (2, 2) pushed along x.
fn distorted() -> Mesh {
    quad_grid_with(4, 4, 1.0, |i, j| if (i, j) == (2, 2) { [0.6, 0.0, 0.0] } else { [0.0; 3] })
}

fn plan() -> Vec<Recommendation> {
    vec![
        map_action(eid(6), &tags(&[ErrorTag::BadAspectRatio]), RiskCategory::High, 0.0),
        map_action(eid(1), &TagSet::new(), RiskCategory::Low, 0.0),
    ]
}

#[test]
fn untouched_mesh_is_stable() {
    let mesh = quad_grid(4, 4, 1.0);
    assert!(!element_changed(eid(1), &mesh, &mesh.clone(), 1e-3));

    let report = validate_remediation(&mesh, &mesh, &plan(), &ValidationOpts::default());
    assert_eq!(report.total, 1);
    assert_eq!(report.changed, 0);
    assert_eq!(report.change_hit_rate, 0.0);
    assert_eq!(report.improved, 0);
    assert_eq!(report.stability.checked, 1);
    assert_eq!(report.stability.stable, 1);
    assert_eq!(report.stability.rate, 1.0);
}

#[test]
fn smoothing_is_detected_and_improves_the_region() {
    let before = distorted();
    let after = quad_grid(4, 4, 1.0);
    let report = validate_remediation(&before, &after, &plan(), &ValidationOpts::default());

    assert_eq!(report.changes[&eid(6)], ElementChange::Moved);
    assert_eq!(report.change_hit_rate, 1.0);
    assert_eq!(report.quality_improvement_rate, 1.0);
    assert_eq!(report.regions_compared, 1);
    // one of four corners moved by 0.6
    assert!(approx(report.avg_displacement, 0.15));
    assert_eq!(report.stability.rate, 1.0);
}

#[test]
fn worse_region_is_not_improved() {
    let report = validate_remediation(
        &quad_grid(4, 4, 1.0),
        &distorted(),
        &plan(),
        &ValidationOpts::default(),
    );
    assert_eq!(report.changed, 1);
    assert_eq!(report.improved, 0);
    assert_eq!(report.regions_compared, 1);
}

#[test]
fn remeshed_elements_are_excluded_from_displacement() {
    let before = quad_grid(4, 4, 1.0);
    // drop node 7 at (1, 1) together with the four quads around it
    let mut builder = Mesh::builder();
    for n in before.nodes().filter(|n| n.id() != nid(7)) {
        builder.insert_node(*n);
    }
    for e in before.elements().filter(|e| !e.nodes().contains(&nid(7))) {
        builder.insert_element(e.clone());
    }
    let after = builder.build().unwrap();

    assert_eq!(classify_change(eid(6), &before, &after, 1e-3), ElementChange::Removed);
    let report = validate_remediation(&before, &after, &plan(), &ValidationOpts::default());
    assert_eq!(report.changed, 1);
    assert_eq!(report.displaced, 0);
    assert_eq!(report.avg_displacement, 0.0);
    // quad 1 lost node 7 as well
    assert_eq!(report.stability.stable, 0);
}

#[test]
fn empty_regions_are_not_counted() {
    let before = quad_grid(4, 4, 1.0);
    let far = quad_grid_with(1, 1, 1.0, |_, _| [100.0, 100.0, 0.0]);
    let opts = ValidationOpts {
        region_radius: 1.0,
        ..ValidationOpts::default()
    };
    assert!(region_elements(&far, [1.5, 1.5, 0.0], opts.region_radius).is_empty());
    let report = validate_remediation(&before, &far, &plan(), &opts);
    assert_eq!(report.regions_compared, 0);
    assert_eq!(report.improved, 0);
}
