mod util;
use mesh_triage::remediation::{Action, ActionScope, map_action};
use mesh_triage::risk::scorer::RiskCategory;
use mesh_triage::rules::error_tag::{ErrorTag, TagSet};
use proptest::prelude::*;
use util::*;

fn tag_set() -> impl Strategy<Value = TagSet> {
    prop::collection::btree_set(prop::sample::select(ErrorTag::ALL.to_vec()), 0..5)
}

fn category() -> impl Strategy<Value = RiskCategory> {
    prop::sample::select(RiskCategory::ALL.to_vec())
}

proptest! {
    #[test]
    fn mapping_is_pure(tags in tag_set(), cat in category(), anomaly in 0.0f64..=1.0) {
        let a = map_action(eid(1), &tags, cat, anomaly);
        let b = map_action(eid(1), &tags, cat, anomaly);
        prop_assert_eq!(a.confidence.to_bits(), b.confidence.to_bits());
        prop_assert_eq!(a, b);
    }

    #[test]
    fn cascade_invariants(tags in tag_set(), cat in category(), anomaly in 0.0f64..=1.0) {
        let rec = map_action(eid(1), &tags, cat, anomaly);
        prop_assert!((0.0..=1.0).contains(&rec.confidence));
        let connectivity = tags.contains(&ErrorTag::MissingNeighbor) || tags.contains(&ErrorTag::OrphanNode);
        if connectivity {
            prop_assert_eq!(rec.action, Action::RemeshRegion);
            prop_assert_eq!(rec.scope, ActionScope::Region);
        } else if cat == RiskCategory::Low {
            prop_assert_eq!(rec.action, Action::NoAction);
            prop_assert_eq!(rec.scope, ActionScope::None);
            // two decimals
            prop_assert!(((rec.confidence * 100.0).round() - rec.confidence * 100.0).abs() < 1e-9);
        } else {
            prop_assert!(rec.action.is_actionable());
        }
        prop_assert_eq!(rec.hints().count(), tags.len());
    }
}

#[test]
fn shape_tags_outrank_cad_at_high_risk() {
    let both = tags(&[ErrorTag::CadDeviationHigh, ErrorTag::HighSkewness]);
    let rec = map_action(eid(1), &both, RiskCategory::High, 0.0);
    assert_eq!(rec.action, Action::MoveNodes);
    assert!(approx(rec.confidence, 0.6));
}

#[test]
fn anomaly_alone_moves_nodes_only_above_cutoff() {
    let none = TagSet::new();
    assert_eq!(map_action(eid(1), &none, RiskCategory::High, 0.15).action, Action::LocalRemesh);
    assert_eq!(map_action(eid(1), &none, RiskCategory::High, 0.16).action, Action::MoveNodes);
}

#[test]
fn medium_transition_outranks_cad() {
    let both = tags(&[ErrorTag::CadDeviationHigh, ErrorTag::SmallArea]);
    let rec = map_action(eid(1), &both, RiskCategory::Medium, 0.2);
    assert_eq!((rec.action, rec.scope), (Action::SmoothMesh, ActionScope::Node));
    assert!(approx(rec.confidence, 0.7));
}

#[test]
fn confidences_are_capped() {
    let cad = tags(&[ErrorTag::CadDeviationHigh]);
    let strong = map_action(eid(1), &cad, RiskCategory::High, 0.9);
    assert_eq!((strong.action, strong.confidence), (Action::MoveNodes, 0.95));
    // at the move threshold the CAD branch still applies
    let projected = map_action(eid(1), &cad, RiskCategory::High, 0.15);
    assert_eq!(projected.action, Action::ProjectToCad);
    assert!(approx(projected.confidence, 0.7));
    assert_eq!(map_action(eid(1), &cad, RiskCategory::Medium, 0.9).confidence, 0.8);
    assert_eq!(map_action(eid(1), &TagSet::new(), RiskCategory::Medium, 0.9).confidence, 0.75);
    assert_eq!(map_action(eid(1), &TagSet::new(), RiskCategory::Low, 0.9).confidence, 1.0);
}
