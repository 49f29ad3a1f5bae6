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
//! Library for path-based traffic-engineering optimization with middlebox service chains.
//!
//! The engine takes a [`topology::Topology`] annotated with per-node service types, a set of
//! [`traffic::TrafficClass`]es aggregated from a demand matrix, and pluggable capacity functions,
//! generates predicate-filtered candidate paths per class, and builds a linear (or mixed-integer)
//! program that splits each class fractionally over its candidate paths subject to per-resource
//! capacity constraints. The canonical objective minimizes the maximum normalized load over all
//! capacitated elements.

pub mod error;
pub mod opt;
pub mod paths;
pub mod provisioning;
pub mod serde_util;
pub mod topology;
pub mod traffic;

#[cfg(test)]
mod test;

pub use error::Error;

pub mod prelude {
    pub use super::{
        error::Error,
        opt::{
            funcs::{default_link_func, CapacityFunction, CapacityTable},
            init_optimization,
            solver::{SolveStatus, SolverBackend, SolverConfig},
            BinGranularity, Optimization, SolvedOptimization,
        },
        paths::{
            generate::{generate_paths_per_class, SelectStrategy},
            predicates::{identity_modifier, service_chain_predicate, use_mbox_modifier},
            Path, PathsPerClass,
        },
        topology::{Element, Link, NodeId, Topology},
        traffic::{generate_traffic_classes, TrafficClass, TrafficMatrix},
    };
}
