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
//! Candidate-path generation per traffic class.
//!
//! For each class, the generator enumerates the universe of simple paths between its endpoints
//! (bounded by a hop count), expands every path through the use-set modifier, filters the
//! annotated candidates with the caller predicate, and finally selects up to `k` of the accepted
//! candidates according to the [`SelectStrategy`]. Classes are processed in parallel; the
//! topology is only read. A class without any accepted candidate fails the whole generation with
//! [`Error::NoPathFound`], since silently dropping it would corrupt the allocation constraints
//! downstream.

use log::{debug, info};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    topology::{NodeId, Topology},
    traffic::TrafficClass,
};

use super::{
    predicates::{PathModifier, PathPredicate},
    Path, PathsPerClass,
};

/// Strategy for picking up to `k` candidates from the predicate-accepted set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectStrategy {
    /// The `k` candidates with the lowest hop count; ties broken by lexical node-id order, then
    /// by use-set order. Deterministic across runs.
    ShortestK,
    /// `k` candidates drawn without replacement. Reproducible: the per-class random source is
    /// derived from the explicit seed and the class id, so parallel generation yields the same
    /// result as sequential generation.
    RandomK { seed: u64 },
}

/// Generate the accepted candidate paths for all traffic classes.
///
/// `max_hops` bounds the simple-path enumeration, `k` the number of retained candidates per
/// class. If fewer than `k` candidates are accepted, all of them are retained (no padding, no
/// retry beyond the enumeration bound).
pub fn generate_paths_per_class<P, M>(
    topo: &Topology,
    classes: &[TrafficClass],
    predicate: &P,
    strategy: SelectStrategy,
    k: usize,
    modifier: &M,
    max_hops: usize,
) -> Result<PathsPerClass, Error>
where
    P: PathPredicate,
    M: PathModifier,
{
    let entries = classes
        .par_iter()
        .map(|tc| {
            let paths = generate_for_class(topo, tc, predicate, strategy, k, modifier, max_hops)?;
            Ok((tc.clone(), paths))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let pptc = PathsPerClass::new(entries);
    info!(
        "generated {} candidate paths for {} traffic classes",
        pptc.num_paths(),
        pptc.num_classes()
    );
    Ok(pptc)
}

fn generate_for_class<P, M>(
    topo: &Topology,
    tc: &TrafficClass,
    predicate: &P,
    strategy: SelectStrategy,
    k: usize,
    modifier: &M,
    max_hops: usize,
) -> Result<Vec<Path>, Error>
where
    P: PathPredicate,
    M: PathModifier,
{
    let universe = enumerate_simple_paths(topo, tc.src, tc.dst, max_hops)?;

    let mut accepted = Vec::new();
    for nodes in universe {
        for candidate in modifier.expand(Path::new(nodes), topo) {
            if predicate.accept(&candidate, topo) {
                accepted.push(candidate);
            }
        }
    }

    debug!(
        "traffic class {}: {} accepted candidates before selection",
        tc.name,
        accepted.len()
    );

    if accepted.is_empty() {
        return Err(Error::NoPathFound {
            name: tc.name.clone(),
            src: tc.src,
            dst: tc.dst,
        });
    }

    match strategy {
        SelectStrategy::ShortestK => {
            accepted.sort_by(|a, b| {
                a.hop_count()
                    .cmp(&b.hop_count())
                    .then_with(|| a.nodes().cmp(b.nodes()))
                    .then_with(|| a.use_mboxes().cmp(b.use_mboxes()))
            });
        }
        SelectStrategy::RandomK { seed } => {
            // sort first so the shuffle input does not depend on enumeration internals
            accepted.sort();
            let mut rng = StdRng::seed_from_u64(seed ^ (tc.id as u64).wrapping_mul(0x9e3779b97f4a7c15));
            accepted.shuffle(&mut rng);
        }
    }
    accepted.truncate(k);
    Ok(accepted)
}

/// Enumerate all simple paths from `src` to `dst` with at most `max_hops` hops, via DFS. The
/// neighbor sets are visited in ascending node-id order, so the enumeration order is canonical.
pub fn enumerate_simple_paths(
    topo: &Topology,
    src: NodeId,
    dst: NodeId,
    max_hops: usize,
) -> Result<Vec<Vec<NodeId>>, Error> {
    if !topo.contains_node(src) {
        return Err(Error::NotFound(src));
    }
    if !topo.contains_node(dst) {
        return Err(Error::NotFound(dst));
    }

    let mut out = Vec::new();
    let mut current = vec![src];
    dfs(topo, dst, max_hops, &mut current, &mut out)?;
    Ok(out)
}

fn dfs(
    topo: &Topology,
    dst: NodeId,
    max_hops: usize,
    current: &mut Vec<NodeId>,
    out: &mut Vec<Vec<NodeId>>,
) -> Result<(), Error> {
    let last = current[current.len() - 1];
    if last == dst {
        out.push(current.clone());
        return Ok(());
    }
    if current.len() > max_hops {
        return Ok(());
    }
    for next in topo.neighbors(last)? {
        if current.contains(&next) {
            continue;
        }
        current.push(next);
        dfs(topo, dst, max_hops, current, out)?;
        current.pop();
    }
    Ok(())
}
