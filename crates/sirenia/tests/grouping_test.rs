use sirenia::{Node, PlaceOptions, group_parts};
use std::collections::BTreeSet;

const AMPLIFIER: &str = include_str!("fixtures/amplifier.json");

fn partition(groups: &[Vec<usize>]) -> BTreeSet<BTreeSet<usize>> {
    groups.iter().map(|g| g.iter().copied().collect()).collect()
}

#[test]
fn grouping_ignores_net_order() {
    let node = Node::from_json_str(AMPLIFIER).unwrap();
    let opts = PlaceOptions::default();
    let base = group_parts(&node.parts, &node.nets, &opts);

    let mut reversed = node.nets.clone();
    reversed.reverse();
    let flipped = group_parts(&node.parts, &reversed, &opts);
    assert_eq!(partition(&base.connected), partition(&flipped.connected));
    assert_eq!(base.floating, flipped.floating);

    let mut rotated = node.nets.clone();
    rotated.rotate_left(1);
    let shifted = group_parts(&node.parts, &rotated, &opts);
    assert_eq!(partition(&base.connected), partition(&shifted.connected));
    assert_eq!(base.floating, shifted.floating);
}

#[test]
fn grouping_is_repeatable() {
    let node = Node::from_json_str(AMPLIFIER).unwrap();
    let opts = PlaceOptions::default();
    assert_eq!(
        group_parts(&node.parts, &node.nets, &opts),
        group_parts(&node.parts, &node.nets, &opts)
    );
}

#[test]
fn power_filter_only_drops_power_nets() {
    let node = Node::from_json_str(AMPLIFIER).unwrap();
    let mut opts = PlaceOptions::default();
    opts.remove_power = true;
    let grouping = group_parts(&node.parts, &node.nets, &opts);
    assert_eq!(grouping.nets, vec![0, 1]);
    assert_eq!(grouping.connected, vec![vec![0, 1, 2]]);
    assert_eq!(grouping.floating, vec![3, 4, 5]);
    // Filtering does not touch the circuit itself.
    assert_eq!(node.nets.len(), 3);
}

#[test]
fn options_load_from_flat_json() {
    let opts = PlaceOptions::from_json_str(
        r#"{"remove_power": true, "allow_jumps": true, "seed": 99, "net_tension": "torque"}"#,
    )
    .unwrap();
    assert!(opts.remove_power);
    assert!(opts.allow_jumps);
    assert_eq!(opts.seed, 99);
    assert_eq!(opts.net_tension, sirenia::TensionKind::Torque);
    assert_eq!(opts.alpha_steps, PlaceOptions::default().alpha_steps);
    assert!(PlaceOptions::from_json_str(r#"{"seed": "many"}"#).is_err());
}
