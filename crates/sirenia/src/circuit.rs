//! Circuit model consumed by the placer.
//!
//! The placer only needs the [`Schematic`] capability: a node's parts, its internal nets, its
//! children and somewhere to write transforms and a bounding box back. [`Node`] is the in-memory
//! implementation, loadable from JSON.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sirenia_geom::{BBox, Point, Tx};

/// Direction a pin points, fixed relative to its part.
///
/// A `U` pin sits on the bottom edge of the symbol and points up into it, so its wire leaves
/// downward; `D`, `L` and `R` follow the same convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PinOrientation {
    Up,
    Down,
    Left,
    Right,
}

impl PinOrientation {
    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "U" => Ok(Self::Up),
            "D" => Ok(Self::Down),
            "L" => Ok(Self::Left),
            "R" => Ok(Self::Right),
            other => Err(Error::InvalidPinOrientation {
                value: other.to_string(),
            }),
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::Up => "U",
            Self::Down => "D",
            Self::Left => "L",
            Self::Right => "R",
        }
    }
}

impl TryFrom<String> for PinOrientation {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PinOrientation> for String {
    fn from(value: PinOrientation) -> Self {
        value.as_code().to_string()
    }
}

impl std::fmt::Display for PinOrientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pin {
    pub name: String,
    /// Attachment point in part-local coordinates.
    pub pt: Point,
    pub orientation: PinOrientation,
    /// Attached to any net, inside or outside the node being placed.
    #[serde(default)]
    pub connected: bool,
    /// Drawn with a net-label stub instead of a routed wire.
    #[serde(default)]
    pub stub: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartKind {
    #[default]
    Regular,
    /// Net-label placeholder: pulled toward the parts on its net, never pulls them.
    NetTerminal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Reference designator.
    pub name: String,
    #[serde(default)]
    pub lib_name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub footprint: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pins: Vec<Pin>,
    /// Symbol outline including any attached net-label graphics, in local coordinates.
    pub bbox: BBox,
    #[serde(default)]
    pub orientation_locked: bool,
    #[serde(default)]
    pub kind: PartKind,
    #[serde(default)]
    pub tx: Tx,
}

impl Part {
    /// Local point that must land on the routing grid: the first pin, or the lower-left corner
    /// of the outline for a part without pins.
    pub fn snap_pt(&self) -> Point {
        match self.pins.first() {
            Some(pin) => pin.pt,
            None if !self.bbox.is_empty() => self.bbox.min,
            None => Point::origin(),
        }
    }

    pub fn is_net_terminal(&self) -> bool {
        self.kind == PartKind::NetTerminal
    }

    /// How alike two parts are, from 0 to 100.
    pub fn similarity(&self, other: &Part) -> f64 {
        fn same(a: &str, b: &str) -> bool {
            !a.is_empty() && a == b
        }

        // Every pair of parts is a little similar so floating parts always cluster.
        let mut score = 10.0;
        if same(&self.lib_name, &other.lib_name) {
            score += 40.0;
        }
        if same(&self.value, &other.value) {
            score += 20.0;
        }
        if same(&self.footprint, &other.footprint) {
            score += 15.0;
        }
        if same(&self.description, &other.description) {
            score += 5.0;
        }
        let (a, b) = (self.pins.len(), other.pins.len());
        let pin_ratio = if a.max(b) == 0 {
            1.0
        } else {
            a.min(b) as f64 / a.max(b) as f64
        };
        score + 10.0 * pin_ratio
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinRef {
    /// Index into the owning node's part list.
    pub part: usize,
    pub pin: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Net {
    pub name: String,
    #[serde(default)]
    pub netclass: Option<String>,
    #[serde(default)]
    pub pins: Vec<PinRef>,
}

impl Net {
    pub fn len(&self) -> usize {
        self.pins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pins.is_empty()
    }

    /// Power/ground heuristics: the `Power` net class or a VCC/GND-like name.
    pub fn is_power(&self) -> bool {
        if self.netclass.as_deref() == Some("Power") {
            return true;
        }
        let name = self.name.to_ascii_lowercase();
        name.contains("vcc") || name.contains("gnd")
    }
}

/// Node-like capability the placer operates on.
pub trait Schematic: Sized {
    fn name(&self) -> &str;
    fn parts(&self) -> &[Part];
    fn parts_mut(&mut self) -> &mut [Part];
    /// Nets whose every pin lies on this node's own parts.
    fn internal_nets(&self) -> &[Net];
    fn children(&self) -> impl Iterator<Item = &Self>;
    fn children_mut(&mut self) -> impl Iterator<Item = &mut Self>;
    /// Flattened nodes show their parts inside the parent's drawing.
    fn is_flattened(&self) -> bool;
    fn tx(&self) -> Tx;
    fn set_tx(&mut self, tx: Tx);
    fn bbox(&self) -> BBox;
    fn set_bbox(&mut self, bbox: BBox);
}

fn default_flattened() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub nets: Vec<Net>,
    #[serde(default)]
    pub children: IndexMap<String, Node>,
    #[serde(default = "default_flattened")]
    pub flattened: bool,
    #[serde(default)]
    pub tx: Tx,
    #[serde(default, skip_serializing_if = "BBox::is_empty")]
    pub bbox: BBox,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parts: Vec::new(),
            nets: Vec::new(),
            children: IndexMap::new(),
            flattened: true,
            tx: Tx::identity(),
            bbox: BBox::empty(),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let node: Node = serde_json::from_str(text)?;
        node.validate()?;
        Ok(node)
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.insert(child.name.clone(), child);
    }

    /// Checks that every net pin refers to an existing part and pin of this node.
    pub fn validate(&self) -> Result<()> {
        for net in &self.nets {
            for r in &net.pins {
                let ok = self
                    .parts
                    .get(r.part)
                    .is_some_and(|part| r.pin < part.pins.len());
                if !ok {
                    return Err(Error::InvalidNetPin {
                        net: net.name.clone(),
                        part: r.part,
                        pin: r.pin,
                    });
                }
            }
        }
        for child in self.children.values() {
            child.validate()?;
        }
        Ok(())
    }
}

impl Schematic for Node {
    fn name(&self) -> &str {
        &self.name
    }

    fn parts(&self) -> &[Part] {
        &self.parts
    }

    fn parts_mut(&mut self) -> &mut [Part] {
        &mut self.parts
    }

    fn internal_nets(&self) -> &[Net] {
        &self.nets
    }

    fn children(&self) -> impl Iterator<Item = &Self> {
        self.children.values()
    }

    fn children_mut(&mut self) -> impl Iterator<Item = &mut Self> {
        self.children.values_mut()
    }

    fn is_flattened(&self) -> bool {
        self.flattened
    }

    fn tx(&self) -> Tx {
        self.tx
    }

    fn set_tx(&mut self, tx: Tx) {
        self.tx = tx;
    }

    fn bbox(&self) -> BBox {
        self.bbox
    }

    fn set_bbox(&mut self, bbox: BBox) {
        self.bbox = bbox;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sirenia_geom::point;

    fn part(name: &str, lib: &str, value: &str, pins: usize) -> Part {
        Part {
            name: name.to_string(),
            lib_name: lib.to_string(),
            value: value.to_string(),
            footprint: String::new(),
            description: String::new(),
            pins: (0..pins)
                .map(|i| Pin {
                    name: i.to_string(),
                    pt: point(0.0, 100.0 * i as f64),
                    orientation: PinOrientation::Left,
                    connected: false,
                    stub: false,
                })
                .collect(),
            bbox: BBox::new(point(-50.0, -50.0), point(50.0, 50.0)),
            orientation_locked: false,
            kind: PartKind::Regular,
            tx: Tx::identity(),
        }
    }

    #[test]
    fn pin_orientation_rejects_unknown_codes() {
        assert_eq!(PinOrientation::parse("U").unwrap(), PinOrientation::Up);
        assert!(matches!(
            PinOrientation::parse("X"),
            Err(Error::InvalidPinOrientation { .. })
        ));
        let err = serde_json::from_str::<Pin>(r#"{"name":"1","pt":[0,0],"orientation":"N"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn identical_parts_are_more_similar_than_unrelated_ones() {
        let c1 = part("C1", "C", "100n", 2);
        let c2 = part("C2", "C", "100n", 2);
        let u1 = part("U1", "LM358", "", 8);
        assert_eq!(c1.similarity(&c2), 80.0);
        assert!(c1.similarity(&u1) < c1.similarity(&c2));
        assert!(c1.similarity(&u1) > 0.0);
    }

    #[test]
    fn power_nets_are_detected_by_class_or_name() {
        let mut net = Net {
            name: "+5V".to_string(),
            netclass: Some("Power".to_string()),
            pins: Vec::new(),
        };
        assert!(net.is_power());
        net.netclass = None;
        assert!(!net.is_power());
        net.name = "AGND".to_string();
        assert!(net.is_power());
    }

    #[test]
    fn node_json_validates_net_pins() {
        let text = r#"{
            "name": "top",
            "parts": [{"name": "R1", "bbox": {"min": [0, 0], "max": [100, 50]},
                       "pins": [{"name": "1", "pt": [0, 25], "orientation": "R"}]}],
            "nets": [{"name": "n1", "pins": [{"part": 0, "pin": 3}]}]
        }"#;
        assert!(matches!(
            Node::from_json_str(text),
            Err(Error::InvalidNetPin { pin: 3, .. })
        ));
    }
}
