#![forbid(unsafe_code)]

//! Automatic placement for hierarchical schematics.
//!
//! Given a tree of nodes holding parts, the nets between them and nested sub-circuits,
//! [`place`] computes a transform (position, quarter-turn rotation and mirror) for every part
//! and child node, plus a bounding box for every node. Connected parts are kept close by a
//! force-directed solver, unconnected parts are clustered by similarity, and the result is
//! overlap-free and aligned to the routing grid.
//!
//! The circuit is reached through the [`Schematic`] trait; [`Node`] is an in-memory
//! implementation that loads from JSON.

mod arrange;
mod block;
mod circuit;
mod error;
mod force;
mod group;
mod options;
mod orient;
mod place;
mod post;
mod rng;
mod solver;

pub use arrange::placement_bbox;
pub use circuit::{Net, Node, Part, PartKind, Pin, PinOrientation, PinRef, Schematic};
pub use error::{Error, Result};
pub use group::{Grouping, filter_nets, group_parts};
pub use options::{AttractiveKind, GridConstants, PlaceOptions, TensionKind};
pub use place::{Degradation, PlacementReport, Stage, place};

pub use sirenia_geom as geom;
