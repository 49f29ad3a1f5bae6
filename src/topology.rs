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
//! Network topology with per-node service-type annotations.
//!
//! A [`Topology`] owns nodes and directed links. Nodes carry a set of caller-defined service-type
//! tags (e.g., `"fw"`, `"ids"`) and a middlebox flag; a node without tags is a plain switch. Link
//! capacities are not stored here, they live in external capacity tables keyed by [`Element`].
//! Once provisioning for an optimization run is complete the topology is treated as immutable and
//! is only read (concurrently) by the path generator.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Identifier of a node in the topology. Ordering on ids is the deterministic tie-breaker used
/// throughout path generation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// A directed link between two nodes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Link {
    pub src: NodeId,
    pub dst: NodeId,
}

impl Link {
    pub fn new(src: NodeId, dst: NodeId) -> Self {
        Self { src, dst }
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}->{:?}", self.src, self.dst)
    }
}

/// A capacitated network element: either a node or a directed link. This is the uniform key type
/// of all capacity tables.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Element {
    Node(NodeId),
    Link(Link),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
struct NodeData {
    name: String,
    services: BTreeSet<String>,
    mbox: bool,
}

/// The network graph, with per-node service annotations and a precomputed adjacency.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Topology {
    name: String,
    nodes: BTreeMap<NodeId, NodeData>,
    links: BTreeSet<Link>,
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
    next_id: u32,
}

impl Topology {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: BTreeMap::new(),
            links: BTreeSet::new(),
            adjacency: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a node and return its id.
    pub fn add_node(&mut self, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            NodeData {
                name: name.into(),
                ..Default::default()
            },
        );
        self.adjacency.insert(id, BTreeSet::new());
        id
    }

    /// Add a directed link. Both endpoints must exist.
    pub fn add_link(&mut self, src: NodeId, dst: NodeId) -> Result<(), Error> {
        self.check_node(src)?;
        self.check_node(dst)?;
        self.links.insert(Link::new(src, dst));
        self.adjacency.entry(src).or_default().insert(dst);
        Ok(())
    }

    /// Add links in both directions between `a` and `b`.
    pub fn add_bidirectional_link(&mut self, a: NodeId, b: NodeId) -> Result<(), Error> {
        self.add_link(a, b)?;
        self.add_link(b, a)
    }

    /// Replace the service-type tags of a node.
    pub fn set_service_types<T, I>(&mut self, node: NodeId, tags: I) -> Result<(), Error>
    where
        T: Into<String>,
        I: IntoIterator<Item = T>,
    {
        let data = self.nodes.get_mut(&node).ok_or(Error::NotFound(node))?;
        data.services = tags.into_iter().map(Into::into).collect();
        Ok(())
    }

    /// Mark a node as middlebox-capable.
    pub fn set_mbox(&mut self, node: NodeId) -> Result<(), Error> {
        let data = self.nodes.get_mut(&node).ok_or(Error::NotFound(node))?;
        data.mbox = true;
        Ok(())
    }

    /// Get the service-type tags of a node. An empty set means the node is a plain switch.
    pub fn get_service_types(&self, node: NodeId) -> Result<&BTreeSet<String>, Error> {
        self.nodes
            .get(&node)
            .map(|d| &d.services)
            .ok_or(Error::NotFound(node))
    }

    /// Check whether a node is middlebox-capable.
    pub fn has_mbox(&self, node: NodeId) -> Result<bool, Error> {
        self.nodes
            .get(&node)
            .map(|d| d.mbox)
            .ok_or(Error::NotFound(node))
    }

    pub fn node_name(&self, node: NodeId) -> Result<&str, Error> {
        self.nodes
            .get(&node)
            .map(|d| d.name.as_str())
            .ok_or(Error::NotFound(node))
    }

    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// All nodes, in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// All directed links, in ascending `(src, dst)` order.
    pub fn links(&self) -> impl Iterator<Item = Link> + '_ {
        self.links.iter().copied()
    }

    /// Outgoing neighbors of a node, in ascending id order.
    pub fn neighbors(&self, node: NodeId) -> Result<impl Iterator<Item = NodeId> + '_, Error> {
        self.adjacency
            .get(&node)
            .map(|n| n.iter().copied())
            .ok_or(Error::NotFound(node))
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_links(&self) -> usize {
        self.links.len()
    }

    fn check_node(&self, node: NodeId) -> Result<(), Error> {
        if self.contains_node(node) {
            Ok(())
        } else {
            Err(Error::NotFound(node))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn build_and_query() {
        let mut topo = Topology::new("test");
        let a = topo.add_node("a");
        let b = topo.add_node("b");
        let c = topo.add_node("c");
        topo.add_bidirectional_link(a, b).unwrap();
        topo.add_link(b, c).unwrap();

        assert_eq!(topo.nodes().collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(topo.num_links(), 3);
        assert_eq!(topo.neighbors(b).unwrap().collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(topo.node_name(c).unwrap(), "c");

        topo.set_mbox(b).unwrap();
        topo.set_service_types(b, ["fw", "ids"]).unwrap();
        assert!(topo.has_mbox(b).unwrap());
        assert!(!topo.has_mbox(a).unwrap());
        assert!(topo.get_service_types(b).unwrap().contains("fw"));
        // a plain switch has no tags
        assert!(topo.get_service_types(a).unwrap().is_empty());
    }

    #[test]
    fn unknown_node_fails() {
        let mut topo = Topology::new("test");
        let a = topo.add_node("a");
        let ghost = NodeId(99);

        assert!(matches!(
            topo.get_service_types(ghost),
            Err(Error::NotFound(n)) if n == ghost
        ));
        assert!(matches!(topo.set_mbox(ghost), Err(Error::NotFound(_))));
        assert!(matches!(topo.add_link(a, ghost), Err(Error::NotFound(_))));
        assert!(matches!(topo.neighbors(ghost), Err(Error::NotFound(_))));
    }
}
