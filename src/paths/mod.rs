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
//! Candidate paths and their per-traffic-class collections.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    topology::{Element, Link, NodeId},
    traffic::TrafficClass,
};

pub mod generate;
pub mod predicates;

/// A simple (loop-free) path through the topology, together with its *use-set*: the ordered
/// subsequence of middlebox-capable nodes selected for actual processing. The use-set is produced
/// by a modifier function during path generation, and not every middlebox-capable node on the
/// path needs to be part of it. Paths are immutable once generated.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Path {
    nodes: Vec<NodeId>,
    use_mboxes: Vec<NodeId>,
}

impl Path {
    /// Create a path from an ordered node sequence, with an empty use-set.
    pub fn new(nodes: Vec<NodeId>) -> Self {
        Self {
            nodes,
            use_mboxes: Vec::new(),
        }
    }

    /// Annotate the path with the given use-set.
    pub fn with_use_mboxes(mut self, use_mboxes: Vec<NodeId>) -> Self {
        self.use_mboxes = use_mboxes;
        self
    }

    pub fn src(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn dst(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The nodes at which processing occurs, in path order.
    pub fn use_mboxes(&self) -> &[NodeId] {
        &self.use_mboxes
    }

    pub fn hop_count(&self) -> usize {
        self.nodes.len() - 1
    }

    /// The directed links of the path, in order.
    pub fn links(&self) -> impl Iterator<Item = Link> + '_ {
        self.nodes.windows(2).map(|w| Link::new(w[0], w[1]))
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn contains_link(&self, link: Link) -> bool {
        self.links().any(|l| l == link)
    }

    /// Check whether the path traverses the given element. For nodes this checks the node
    /// sequence, not the use-set.
    pub fn crosses(&self, element: Element) -> bool {
        match element {
            Element::Node(n) => self.contains_node(n),
            Element::Link(l) => self.contains_link(l),
        }
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path(")?;
        for (i, n) in self.nodes.iter().enumerate() {
            if i > 0 {
                write!(f, " -> ")?;
            }
            write!(f, "{n}")?;
        }
        if !self.use_mboxes.is_empty() {
            write!(f, "; use {:?}", self.use_mboxes)?;
        }
        write!(f, ")")
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// The accepted candidate paths for every traffic class, ordered by class id. Produced once by
/// the path generator and treated as immutable input by the model builder.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PathsPerClass {
    entries: Vec<(TrafficClass, Vec<Path>)>,
}

impl PathsPerClass {
    /// Build from per-class entries; entries are sorted by class id.
    pub fn new(mut entries: Vec<(TrafficClass, Vec<Path>)>) -> Self {
        entries.sort_by_key(|(tc, _)| tc.id);
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TrafficClass, &[Path])> {
        self.entries.iter().map(|(tc, paths)| (tc, paths.as_slice()))
    }

    pub fn classes(&self) -> impl Iterator<Item = &TrafficClass> {
        self.entries.iter().map(|(tc, _)| tc)
    }

    /// The candidate paths of the class with the given id.
    pub fn get(&self, class_id: u32) -> Option<&[Path]> {
        self.entries
            .iter()
            .find(|(tc, _)| tc.id == class_id)
            .map(|(_, paths)| paths.as_slice())
    }

    pub fn num_classes(&self) -> usize {
        self.entries.len()
    }

    pub fn num_paths(&self) -> usize {
        self.entries.iter().map(|(_, p)| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
