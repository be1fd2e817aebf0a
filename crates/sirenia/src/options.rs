//! Placement configuration.
//!
//! Options arrive as a flat set of named values. [`PlaceOptions`] deserializes from a flat JSON
//! object (missing keys take their defaults) and [`PlaceOptions::set`] accepts the same names
//! with string values.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Backend-tool constants threaded through a placement run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConstants {
    /// Routing grid spacing.
    pub grid: f64,
    /// Padding around every block so blocks do not butt against each other.
    pub blk_ext_pad: f64,
    /// Padding between the parts of a flattened child and its drawn outline.
    pub blk_int_pad: f64,
}

impl Default for GridConstants {
    fn default() -> Self {
        Self::with_grid(50.0)
    }
}

impl GridConstants {
    pub fn with_grid(grid: f64) -> Self {
        Self {
            grid,
            blk_ext_pad: 2.0 * grid,
            blk_int_pad: grid,
        }
    }
}

/// Attractive-force strategy used for connected parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttractiveKind {
    #[default]
    Distance,
    DistanceAvg,
    Bbox,
    Centroid,
}

impl FromStr for AttractiveKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "distance" => Ok(Self::Distance),
            "distance_avg" => Ok(Self::DistanceAvg),
            "bbox" => Ok(Self::Bbox),
            "centroid" => Ok(Self::Centroid),
            _ => Err(()),
        }
    }
}

/// Net-tension cost used by the orientation optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensionKind {
    #[default]
    Distance,
    Torque,
}

impl FromStr for TensionKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "distance" => Ok(Self::Distance),
            "torque" => Ok(Self::Torque),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceOptions {
    pub remove_power: bool,
    pub remove_high_fanout: bool,
    /// `k` in the `mean + k * stdev` high-fanout threshold.
    pub high_fanout_sigma: f64,
    pub compress_before_place: bool,
    pub rotate_parts: bool,
    pub align_parts: bool,
    pub allow_jumps: bool,
    pub slip_and_slide: bool,
    pub normalize: bool,
    pub fanout_attenuation: bool,
    pub use_push_pull: bool,
    pub use_optimizer: bool,
    pub trim_anchor_pull_pins: bool,
    /// Force multiplier for nets with a single pulling point.
    pub pt_to_pt_mult: f64,
    /// Multiplier on the routing-channel padding of placement boxes.
    pub expansion_factor: f64,
    pub seed: u64,
    pub attractive_force: AttractiveKind,
    pub net_tension: TensionKind,

    /// Number of equal steps taking alpha from 0 to 1.
    pub alpha_steps: usize,
    /// Movement per unit of force.
    pub speed: f64,
    pub max_solver_iterations: usize,
    pub max_overlap_iterations: usize,
    pub max_orientation_passes: usize,
    pub slip_and_slide_iterations: usize,
    pub jump_count: usize,

    pub grid: GridConstants,
}

impl Default for PlaceOptions {
    fn default() -> Self {
        Self {
            remove_power: false,
            remove_high_fanout: false,
            high_fanout_sigma: 2.0,
            compress_before_place: false,
            rotate_parts: true,
            align_parts: true,
            allow_jumps: false,
            slip_and_slide: true,
            normalize: false,
            fanout_attenuation: false,
            use_push_pull: true,
            use_optimizer: false,
            trim_anchor_pull_pins: false,
            pt_to_pt_mult: 5.0,
            expansion_factor: 1.0,
            seed: 0,
            attractive_force: AttractiveKind::default(),
            net_tension: TensionKind::default(),
            alpha_steps: 5,
            speed: 0.25,
            max_solver_iterations: 5000,
            max_overlap_iterations: 500,
            max_orientation_passes: 10,
            slip_and_slide_iterations: 20,
            jump_count: 3,
            grid: GridConstants::default(),
        }
    }
}

impl PlaceOptions {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        Ok(Self::deserialize(value)?)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets one named option from its textual value.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let bad = || Error::InvalidOptionValue {
            name: name.to_string(),
            value: value.to_string(),
        };
        fn flag(value: &str) -> Option<bool> {
            match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            }
        }
        let value_t = value.trim();

        match name {
            "remove_power" => self.remove_power = flag(value).ok_or_else(bad)?,
            "remove_high_fanout" => self.remove_high_fanout = flag(value).ok_or_else(bad)?,
            "compress_before_place" => self.compress_before_place = flag(value).ok_or_else(bad)?,
            "rotate_parts" => self.rotate_parts = flag(value).ok_or_else(bad)?,
            "align_parts" => self.align_parts = flag(value).ok_or_else(bad)?,
            "allow_jumps" => self.allow_jumps = flag(value).ok_or_else(bad)?,
            "slip_and_slide" => self.slip_and_slide = flag(value).ok_or_else(bad)?,
            "normalize" => self.normalize = flag(value).ok_or_else(bad)?,
            "fanout_attenuation" => self.fanout_attenuation = flag(value).ok_or_else(bad)?,
            "use_push_pull" => self.use_push_pull = flag(value).ok_or_else(bad)?,
            "use_optimizer" => self.use_optimizer = flag(value).ok_or_else(bad)?,
            "trim_anchor_pull_pins" => self.trim_anchor_pull_pins = flag(value).ok_or_else(bad)?,
            "pt_to_pt_mult" => self.pt_to_pt_mult = parse_finite(value_t).ok_or_else(bad)?,
            "expansion_factor" => self.expansion_factor = parse_finite(value_t).ok_or_else(bad)?,
            "high_fanout_sigma" => self.high_fanout_sigma = parse_finite(value_t).ok_or_else(bad)?,
            "speed" => self.speed = parse_finite(value_t).ok_or_else(bad)?,
            "grid" => {
                let grid = parse_finite(value_t).filter(|g| *g > 0.0).ok_or_else(bad)?;
                self.grid = GridConstants::with_grid(grid);
            }
            "seed" => self.seed = value_t.parse().map_err(|_| bad())?,
            "alpha_steps" => {
                self.alpha_steps = value_t.parse().ok().filter(|n| *n > 0).ok_or_else(bad)?
            }
            "max_solver_iterations" => self.max_solver_iterations = value_t.parse().map_err(|_| bad())?,
            "max_overlap_iterations" => {
                self.max_overlap_iterations = value_t.parse().map_err(|_| bad())?
            }
            "max_orientation_passes" => {
                self.max_orientation_passes = value_t.parse().map_err(|_| bad())?
            }
            "slip_and_slide_iterations" => {
                self.slip_and_slide_iterations = value_t.parse().map_err(|_| bad())?
            }
            "jump_count" => self.jump_count = value_t.parse().map_err(|_| bad())?,
            "attractive_force" => self.attractive_force = value_t.parse().map_err(|_| bad())?,
            "net_tension" => self.net_tension = value_t.parse().map_err(|_| bad())?,
            _ => {
                return Err(Error::UnknownOption {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn parse_finite(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}
