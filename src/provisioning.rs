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
//! Capacity provisioning heuristics.
//!
//! Convenience helpers to derive plausible capacity tables from the traffic classes when no real
//! switch/link/middlebox capacities are available. The optimization core accepts arbitrary
//! externally computed capacity tables; nothing here is required for correctness.

use std::collections::{BTreeMap, VecDeque};

use crate::{
    error::Error,
    topology::{Link, NodeId, Topology},
    traffic::TrafficClass,
};

/// The worst-case processing load any single ingress node has to handle: the maximum over all
/// ingress nodes of the summed flow volume entering there, weighted by the per-class cost stored
/// under `cost_attr`. Classes missing the attribute are rejected.
pub fn compute_max_ingress_load(
    classes: &[TrafficClass],
    cost_attr: &str,
) -> Result<f64, Error> {
    let mut per_ingress: BTreeMap<NodeId, f64> = BTreeMap::new();
    for tc in classes {
        let cost = tc.attr(cost_attr).ok_or_else(|| {
            Error::Validation(format!(
                "traffic class {} has no attribute {cost_attr:?}",
                tc.name
            ))
        })?;
        *per_ingress.entry(tc.src).or_default() += tc.vol_flows * cost;
    }
    Ok(per_ingress.values().fold(0.0, |a, &b| a.max(b)))
}

/// Provision uniform link capacities: route every class along one hop-count-shortest path,
/// accumulate its byte volume on the traversed links, and assign every link the maximum
/// accumulated load times `multiplier`. With a multiplier above 1 no single link can be
/// saturated by the background load.
pub fn provision_links(
    topo: &Topology,
    classes: &[TrafficClass],
    multiplier: f64,
) -> Result<BTreeMap<Link, f64>, Error> {
    let mut load: BTreeMap<Link, f64> = topo.links().map(|l| (l, 0.0)).collect();
    for tc in classes {
        let path = bfs_shortest_path(topo, tc.src, tc.dst)?.ok_or_else(|| {
            Error::NoPathFound {
                name: tc.name.clone(),
                src: tc.src,
                dst: tc.dst,
            }
        })?;
        for w in path.windows(2) {
            *load.entry(Link::new(w[0], w[1])).or_default() += tc.vol_bytes;
        }
    }
    let max_load = load.values().fold(0.0_f64, |a, &b| a.max(b));
    Ok(topo.links().map(|l| (l, max_load * multiplier)).collect())
}

/// Assign the same capacity to every node of the topology.
pub fn uniform_node_caps(topo: &Topology, value: f64) -> BTreeMap<NodeId, f64> {
    topo.nodes().map(|n| (n, value)).collect()
}

/// One hop-count-shortest path from `src` to `dst`, or `None` if `dst` is unreachable.
/// Deterministic: BFS visits neighbors in ascending node-id order.
fn bfs_shortest_path(
    topo: &Topology,
    src: NodeId,
    dst: NodeId,
) -> Result<Option<Vec<NodeId>>, Error> {
    if !topo.contains_node(dst) {
        return Err(Error::NotFound(dst));
    }
    let mut predecessor: BTreeMap<NodeId, NodeId> = BTreeMap::new();
    let mut queue = VecDeque::from([src]);
    while let Some(node) = queue.pop_front() {
        if node == dst {
            let mut path = vec![dst];
            let mut current = dst;
            while current != src {
                current = predecessor[&current];
                path.push(current);
            }
            path.reverse();
            return Ok(Some(path));
        }
        for next in topo.neighbors(node)? {
            if next != src && !predecessor.contains_key(&next) {
                predecessor.insert(next, node);
                queue.push_back(next);
            }
        }
    }
    Ok(None)
}
