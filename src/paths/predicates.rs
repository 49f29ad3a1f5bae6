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
//! Path predicates and use-set modifiers.
//!
//! Both are modeled as plain traits with blanket implementations for closures, so callers can
//! register ad-hoc strategies without any reflection. Predicates and modifiers must be pure
//! functions of the path and the (immutable) topology: path generation evaluates them from
//! multiple worker threads.

use itertools::Itertools;

use crate::topology::Topology;

use super::Path;

/// Decides whether an annotated candidate path is acceptable for routing. Commonly encodes
/// ordered service-chain requirements over the path's use-set.
pub trait PathPredicate: Sync {
    fn accept(&self, path: &Path, topo: &Topology) -> bool;
}

impl<F> PathPredicate for F
where
    F: Fn(&Path, &Topology) -> bool + Sync,
{
    fn accept(&self, path: &Path, topo: &Topology) -> bool {
        self(path, topo)
    }
}

/// Expands a raw path into annotated candidates, each carrying one possible use-set. A modifier
/// is a pure function of (path, topology); the maximum chain length is bound at construction.
pub trait PathModifier: Sync {
    fn expand(&self, path: Path, topo: &Topology) -> Vec<Path>;
}

impl<F> PathModifier for F
where
    F: Fn(Path, &Topology) -> Vec<Path> + Sync,
{
    fn expand(&self, path: Path, topo: &Topology) -> Vec<Path> {
        self(path, topo)
    }
}

/// Modifier emitting one candidate per combination of exactly `chain_length` middlebox-capable
/// nodes along the path, in path order. A path with fewer capable nodes yields no candidates.
pub fn use_mbox_modifier(chain_length: usize) -> impl Fn(Path, &Topology) -> Vec<Path> + Sync {
    move |path: Path, topo: &Topology| {
        let capable: Vec<_> = path
            .nodes()
            .iter()
            .copied()
            .filter(|&n| topo.has_mbox(n).unwrap_or(false))
            .collect();
        capable
            .into_iter()
            .combinations(chain_length)
            .map(|use_set| path.clone().with_use_mboxes(use_set))
            .collect()
    }
}

/// Modifier that passes every path through unchanged, with an empty use-set. Useful when no
/// middlebox processing is required.
pub fn identity_modifier() -> impl Fn(Path, &Topology) -> Vec<Path> + Sync {
    |path: Path, _: &Topology| vec![path]
}

/// Predicate accepting every path.
pub fn accept_all() -> impl Fn(&Path, &Topology) -> bool + Sync {
    |_: &Path, _: &Topology| true
}

/// Predicate encoding an ordered service chain: the use-set must have exactly the chain's length,
/// and the i-th use node must carry the i-th required service-type tag (e.g., traffic must pass a
/// `"fw"`-tagged node before an `"ids"`-tagged node).
pub fn service_chain_predicate(
    chain: impl IntoIterator<Item = impl Into<String>>,
) -> impl Fn(&Path, &Topology) -> bool + Sync {
    let chain: Vec<String> = chain.into_iter().map(Into::into).collect();
    move |path: &Path, topo: &Topology| {
        path.use_mboxes().len() == chain.len()
            && path
                .use_mboxes()
                .iter()
                .zip(&chain)
                .all(|(&node, tag)| {
                    topo.get_service_types(node)
                        .map(|tags| tags.contains(tag))
                        .unwrap_or(false)
                })
    }
}
