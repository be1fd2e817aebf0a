//! Splits a node's parts into net-connected groups and a floating remainder.

use crate::circuit::{Net, Part};
use crate::options::PlaceOptions;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grouping {
    /// Disjoint sets of part indices joined by the kept nets, ordered by smallest member.
    pub connected: Vec<Vec<usize>>,
    /// Indices of the nets that take part in grouping and force computation.
    pub nets: Vec<usize>,
    /// Parts not touched by any kept net.
    pub floating: Vec<usize>,
}

/// Indices of the nets that survive the power and high-fanout filters. Filtered nets stay in
/// the circuit; they are only ignored by placement.
pub fn filter_nets(nets: &[Net], opts: &PlaceOptions) -> Vec<usize> {
    let mut kept: Vec<usize> = (0..nets.len()).collect();

    if opts.remove_power {
        kept.retain(|&i| !nets[i].is_power());
    }

    if opts.remove_high_fanout && kept.len() >= 2 {
        let fanouts: Vec<f64> = kept.iter().map(|&i| nets[i].len() as f64).collect();
        let n = fanouts.len() as f64;
        let mean = fanouts.iter().sum::<f64>() / n;
        let var = fanouts.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let threshold = mean + opts.high_fanout_sigma * var.sqrt();
        let before = kept.len();
        kept.retain(|&i| (nets[i].len() as f64) < threshold);
        tracing::debug!(
            threshold,
            removed = before - kept.len(),
            "high-fanout nets excluded"
        );
    }

    kept
}

pub fn group_parts(parts: &[Part], nets: &[Net], opts: &PlaceOptions) -> Grouping {
    if parts.is_empty() {
        return Grouping::default();
    }

    let kept = filter_nets(nets, opts);

    let mut groups: Vec<BTreeSet<usize>> = kept
        .iter()
        .map(|&i| {
            nets[i]
                .pins
                .iter()
                .map(|r| r.part)
                .filter(|&p| p < parts.len())
                .collect()
        })
        .collect();

    // Union overlapping sets until nothing changes.
    loop {
        let mut merged = false;
        for i in 0..groups.len() {
            if groups[i].is_empty() {
                continue;
            }
            for j in (i + 1)..groups.len() {
                if groups[j].is_empty() || groups[i].is_disjoint(&groups[j]) {
                    continue;
                }
                let other = std::mem::take(&mut groups[j]);
                groups[i].extend(other);
                merged = true;
            }
        }
        groups.retain(|g| !g.is_empty());
        if !merged {
            break;
        }
    }

    let mut connected: Vec<Vec<usize>> = groups
        .into_iter()
        .map(|g| g.into_iter().collect())
        .collect();
    connected.sort_by_key(|g: &Vec<usize>| g.first().copied().unwrap_or(usize::MAX));

    let in_group: BTreeSet<usize> = connected.iter().flatten().copied().collect();
    let floating = (0..parts.len()).filter(|p| !in_group.contains(p)).collect();

    Grouping {
        connected,
        nets: kept,
        floating,
    }
}
