use criterion::{Criterion, criterion_group, criterion_main};
use sirenia::geom::{BBox, Tx, point};
use sirenia::{Net, Node, Part, PartKind, Pin, PinOrientation, PinRef, PlaceOptions, place};
use std::hint::black_box;

fn resistor(name: String) -> Part {
    let pin = |name: &str, x: f64, orientation| Pin {
        name: name.to_string(),
        pt: point(x, 25.0),
        orientation,
        connected: true,
        stub: false,
    };
    Part {
        name,
        lib_name: "R".to_string(),
        value: "10k".to_string(),
        footprint: String::new(),
        description: String::new(),
        pins: vec![
            pin("1", 0.0, PinOrientation::Right),
            pin("2", 100.0, PinOrientation::Left),
        ],
        bbox: BBox::new(point(0.0, 0.0), point(100.0, 50.0)),
        orientation_locked: false,
        kind: PartKind::Regular,
        tx: Tx::identity(),
    }
}

/// `chains` resistor ladders of `len` parts each, plus a few unconnected parts.
fn ladder(name: &str, chains: usize, len: usize) -> Node {
    let mut node = Node::new(name);
    for c in 0..chains {
        let base = node.parts.len();
        for i in 0..len {
            node.parts.push(resistor(format!("R{c}_{i}")));
        }
        for i in 1..len {
            node.nets.push(Net {
                name: format!("N{c}_{i}"),
                netclass: None,
                pins: vec![
                    PinRef {
                        part: base + i - 1,
                        pin: 1,
                    },
                    PinRef {
                        part: base + i,
                        pin: 0,
                    },
                ],
            });
        }
    }
    for i in 0..4 {
        let mut part = resistor(format!("RF{i}"));
        for pin in &mut part.pins {
            pin.connected = false;
        }
        node.parts.push(part);
    }
    node
}

fn bench_place_stress(c: &mut Criterion) {
    let mut top = ladder("top", 3, 5);
    top.add_child(ladder("left", 2, 4));
    top.add_child(ladder("right", 2, 4));
    let opts = PlaceOptions::default().with_seed(7);

    let mut group = c.benchmark_group("place_stress");
    group.sample_size(10);

    group.bench_function("ladders_with_children", |b| {
        b.iter(|| {
            let mut node = top.clone();
            let report = place(black_box(&mut node), &opts).expect("place");
            black_box(report.parts_placed);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_place_stress);
criterion_main!(benches);
