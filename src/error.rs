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
//! Error taxonomy of the optimization engine.
//!
//! Every variant is unrecoverable at the point of occurrence and aborts the current optimization
//! run. Callers may retry a whole run with adjusted parameters (different `k`, a different
//! predicate), but the engine never substitutes defaults on its own.

use crate::{opt::solver::SolveStatus, topology::NodeId};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A node (or a link endpoint) that is not part of the topology was referenced.
    #[error("unknown node: {0}")]
    NotFound(NodeId),
    /// Malformed demand input, inconsistent weights or attributes, or misuse of the model builder
    /// (e.g., capping a discrete resource before adding binary variables).
    #[error("invalid input: {0}")]
    Validation(String),
    /// A traffic class has zero predicate-accepted candidate paths. Fatal for the whole setup, as
    /// the allocation constraint of that class could never be satisfied.
    #[error("no valid paths for traffic class {name} ({src} -> {dst})")]
    NoPathFound {
        name: String,
        src: NodeId,
        dst: NodeId,
    },
    /// A capacity function was asked about a resource name it does not implement. This indicates
    /// a mismatch between the caller and the model and must never be swallowed.
    #[error("capacity function does not support resource {0:?}")]
    UnsupportedResource(String),
    /// The solver terminated with a non-optimal status. No variable values are available.
    #[error("solver finished with non-optimal status: {0}")]
    Solver(SolveStatus),
    /// The solved fractions of a traffic class do not sum to 1 within the numerical tolerance,
    /// which points at a solver/model inconsistency.
    #[error("path fractions for traffic class {name} sum to {sum}, expected 1.0")]
    ExtractionInconsistency { name: String, sum: f64 },
}
