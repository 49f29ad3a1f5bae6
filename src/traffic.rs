// chainopt: Service-Chain-Aware Traffic-Engineering Optimization
// Copyright (C) 2024-2025 The chainopt developers
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//! Traffic demands and their aggregation into traffic classes.
//!
//! A [`TrafficMatrix`] maps ingress-egress pairs to a raw demand volume. The registry aggregates
//! those raw demands into named [`TrafficClass`]es, one per (pair, class-name) combination, with
//! flow-count and byte volumes derived through caller-supplied weights.

use std::{
    collections::BTreeMap,
    fmt,
    fs::File,
    io::{BufReader, BufWriter},
    path::Path as FsPath,
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{error::Error, topology::NodeId};

/// Raw demand matrix: ingress-egress pairs mapped to a float volume (number of flows).
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TrafficMatrix {
    #[serde(with = "crate::serde_util::pair_map")]
    demands: BTreeMap<(NodeId, NodeId), f64>,
}

impl TrafficMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the demand volume for an ingress-egress pair.
    pub fn set(&mut self, ingress: NodeId, egress: NodeId, volume: f64) {
        self.demands.insert((ingress, egress), volume);
    }

    pub fn get(&self, ingress: NodeId, egress: NodeId) -> Option<f64> {
        self.demands.get(&(ingress, egress)).copied()
    }

    /// All ingress-egress pairs, in ascending order.
    pub fn pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.demands.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((NodeId, NodeId), f64)> + '_ {
        self.demands.iter().map(|(&k, &v)| (k, v))
    }

    /// Total demand volume over all pairs.
    pub fn total(&self) -> f64 {
        self.demands.values().sum()
    }

    pub fn len(&self) -> usize {
        self.demands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.demands.is_empty()
    }

    /// Load a traffic matrix from a JSON file.
    pub fn load(path: impl AsRef<FsPath>) -> Result<Self, Error> {
        let file = File::open(path.as_ref())
            .map_err(|e| Error::Validation(format!("cannot open traffic matrix: {e}")))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Validation(format!("cannot parse traffic matrix: {e}")))
    }

    /// Save the traffic matrix to a JSON file.
    pub fn save(&self, path: impl AsRef<FsPath>) -> Result<(), Error> {
        let file = File::create(path.as_ref())
            .map_err(|e| Error::Validation(format!("cannot create traffic matrix file: {e}")))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| Error::Validation(format!("cannot write traffic matrix: {e}")))
    }
}

/// An aggregated unit of demand between a source and a destination, with volumes in flow-count
/// and byte units and arbitrary caller-attached scalar attributes (e.g., a per-flow CPU cost).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrafficClass {
    pub id: u32,
    pub name: String,
    pub src: NodeId,
    pub dst: NodeId,
    pub vol_flows: f64,
    pub vol_bytes: f64,
    attrs: BTreeMap<String, f64>,
}

impl TrafficClass {
    pub fn new(
        id: u32,
        name: impl Into<String>,
        src: NodeId,
        dst: NodeId,
        vol_flows: f64,
        vol_bytes: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            src,
            dst,
            vol_flows,
            vol_bytes,
            attrs: BTreeMap::new(),
        }
    }

    /// Attach a named scalar attribute, such as a per-flow processing cost.
    pub fn set_attr(&mut self, name: impl Into<String>, value: f64) {
        self.attrs.insert(name.into(), value);
    }

    /// Look up a previously attached attribute.
    pub fn attr(&self, name: &str) -> Option<f64> {
        self.attrs.get(name).copied()
    }
}

impl fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} -> {}, {} flows, {} bytes)",
            self.name, self.src, self.dst, self.vol_flows, self.vol_bytes
        )
    }
}

/// Aggregate raw demands into traffic classes.
///
/// For every ingress-egress pair in `pairs` and every class name in the weight maps, one class is
/// produced with `vol_flows = demand * fraction` and `vol_bytes = vol_flows * bytes_per_flow`.
/// Class names must be identical between `class_fractions` and `class_bytes`. Pairs missing from
/// the matrix, negative demands, and negative weights are rejected with [`Error::Validation`]
/// rather than silently dropped.
pub fn generate_traffic_classes(
    pairs: impl IntoIterator<Item = (NodeId, NodeId)>,
    matrix: &TrafficMatrix,
    class_fractions: &BTreeMap<String, f64>,
    class_bytes: &BTreeMap<String, f64>,
) -> Result<Vec<TrafficClass>, Error> {
    if class_fractions.is_empty() {
        return Err(Error::Validation("no traffic class names given".into()));
    }
    if !class_fractions
        .keys()
        .eq(class_bytes.keys())
    {
        return Err(Error::Validation(
            "class fraction and byte weights must use the same class names".into(),
        ));
    }
    for (name, &w) in class_fractions.iter().chain(class_bytes.iter()) {
        if !(w >= 0.0) || !w.is_finite() {
            return Err(Error::Validation(format!(
                "weight for class {name:?} must be a non-negative finite number, got {w}"
            )));
        }
    }

    let mut classes = Vec::new();
    let mut id = 0;
    for (src, dst) in pairs {
        let demand = matrix.get(src, dst).ok_or_else(|| {
            Error::Validation(format!("pair ({src}, {dst}) is missing from the traffic matrix"))
        })?;
        if !(demand >= 0.0) || !demand.is_finite() {
            return Err(Error::Validation(format!(
                "demand for pair ({src}, {dst}) must be a non-negative finite number, got {demand}"
            )));
        }
        for (class_name, &fraction) in class_fractions {
            let vol_flows = demand * fraction;
            let vol_bytes = vol_flows * class_bytes[class_name];
            classes.push(TrafficClass::new(
                id,
                format!("{class_name}_{src}_{dst}"),
                src,
                dst,
                vol_flows,
                vol_bytes,
            ));
            id += 1;
        }
    }

    debug!(
        "aggregated {} demand pairs into {} traffic classes",
        matrix.len(),
        classes.len()
    );
    Ok(classes)
}

#[cfg(test)]
mod test {
    use super::*;

    fn weights(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn aggregation_preserves_total_volume() {
        let mut tm = TrafficMatrix::new();
        tm.set(NodeId(0), NodeId(1), 100.0);
        tm.set(NodeId(1), NodeId(2), 50.0);
        tm.set(NodeId(2), NodeId(0), 25.0);

        let classes = generate_traffic_classes(
            tm.pairs().collect::<Vec<_>>(),
            &tm,
            &weights(&[("allTraffic", 1.0)]),
            &weights(&[("allTraffic", 2000.0)]),
        )
        .unwrap();

        assert_eq!(classes.len(), 3);
        let total_flows: f64 = classes.iter().map(|tc| tc.vol_flows).sum();
        assert!((total_flows - tm.total()).abs() < 1e-9);
        // byte volumes scale flows by the per-flow byte weight
        for tc in &classes {
            assert!((tc.vol_bytes - tc.vol_flows * 2000.0).abs() < 1e-9);
        }
    }

    #[test]
    fn one_class_per_pair_and_name() {
        let mut tm = TrafficMatrix::new();
        tm.set(NodeId(0), NodeId(1), 10.0);

        let classes = generate_traffic_classes(
            tm.pairs().collect::<Vec<_>>(),
            &tm,
            &weights(&[("voice", 0.25), ("web", 0.75)]),
            &weights(&[("voice", 100.0), ("web", 1500.0)]),
        )
        .unwrap();

        assert_eq!(classes.len(), 2);
        assert!((classes[0].vol_flows + classes[1].vol_flows - 10.0).abs() < 1e-9);
        // ids are unique and dense
        assert_eq!(classes[0].id, 0);
        assert_eq!(classes[1].id, 1);
    }

    #[test]
    fn missing_pair_is_rejected() {
        let tm = TrafficMatrix::new();
        let result = generate_traffic_classes(
            vec![(NodeId(0), NodeId(1))],
            &tm,
            &weights(&[("allTraffic", 1.0)]),
            &weights(&[("allTraffic", 1.0)]),
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn mismatched_weight_names_are_rejected() {
        let mut tm = TrafficMatrix::new();
        tm.set(NodeId(0), NodeId(1), 10.0);
        let result = generate_traffic_classes(
            tm.pairs().collect::<Vec<_>>(),
            &tm,
            &weights(&[("a", 1.0)]),
            &weights(&[("b", 1.0)]),
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn negative_demand_is_rejected() {
        let mut tm = TrafficMatrix::new();
        tm.set(NodeId(0), NodeId(1), -1.0);
        let result = generate_traffic_classes(
            tm.pairs().collect::<Vec<_>>(),
            &tm,
            &weights(&[("allTraffic", 1.0)]),
            &weights(&[("allTraffic", 1.0)]),
        );
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn class_attributes() {
        let mut tc = TrafficClass::new(0, "tc", NodeId(0), NodeId(1), 1.0, 2000.0);
        assert_eq!(tc.attr("cpu_cost"), None);
        tc.set_attr("cpu_cost", 10.0);
        assert_eq!(tc.attr("cpu_cost"), Some(10.0));
    }
}
