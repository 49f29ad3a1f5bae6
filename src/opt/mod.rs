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
//! Construction of the optimization model.
//!
//! An [`Optimization`] is created empty and populated incrementally: continuous flow variables
//! and the allocation constraints first, then (optionally) binary placement variables, capacity
//! constraints per resource, and finally the min-max-load objective. Solving consumes the model
//! and yields a read-only [`SolvedOptimization`], so a model can never be mutated while (or
//! after) a solve is in flight.

use std::collections::{BTreeMap, BTreeSet};

use good_lp::{constraint, variable, Constraint, Expression, ProblemVariables, Variable};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    paths::{
        generate::{generate_paths_per_class, SelectStrategy},
        predicates::{PathModifier, PathPredicate},
        PathsPerClass,
    },
    topology::{Element, Link, NodeId, Topology},
    traffic::TrafficClass,
};

pub mod funcs;
pub mod solution;
pub mod solver;

use funcs::{CapacityFunction, CapacityTable};
pub use solution::SolvedOptimization;
use solver::SolverConfig;

/// Placement granularity of binary variables: at which elements a discrete placement (e.g., a
/// forwarding rule) is charged when a path carries traffic. A closed enumeration keeps the
/// constraint generation exhaustive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BinGranularity {
    /// One binary per (class, path).
    Path,
    /// One binary per (class, path, node on the path).
    PathNode,
    /// One binary per (class, path, link on the path).
    PathLink,
}

/// One load expression recorded by a capacity constraint, reused by the min-max objective.
struct LoadTerm {
    resource: String,
    element: Element,
    expr: Expression,
    cap: f64,
}

/// The optimization model under construction.
pub struct Optimization {
    vars: ProblemVariables,
    /// Continuous path-fraction variable per (class id, path index), domain [0, 1].
    flow: BTreeMap<(u32, usize), Variable>,
    /// Binary placement variable per (class id, path index, element); `None` for path-level.
    binaries: BTreeMap<(u32, usize, Option<Element>), Variable>,
    granularities: BTreeSet<BinGranularity>,
    constraints: Vec<Constraint>,
    loads: Vec<LoadTerm>,
    objective: Option<Expression>,
    routed: bool,
}

impl Optimization {
    pub fn new() -> Self {
        Self {
            vars: ProblemVariables::new(),
            flow: BTreeMap::new(),
            binaries: BTreeMap::new(),
            granularities: BTreeSet::new(),
            constraints: Vec::new(),
            loads: Vec::new(),
            objective: None,
            routed: false,
        }
    }

    /// Add one continuous flow variable in `[0, 1]` per (traffic class, accepted path).
    pub fn allocate_flow(&mut self, pptc: &PathsPerClass) -> Result<(), Error> {
        if !self.flow.is_empty() {
            return Err(Error::Validation("flow variables already allocated".into()));
        }
        for (tc, paths) in pptc.iter() {
            for idx in 0..paths.len() {
                let var = self.vars.add(variable().min(0.0).max(1.0));
                self.flow.insert((tc.id, idx), var);
            }
        }
        debug!("allocated {} flow variables", self.flow.len());
        Ok(())
    }

    /// Require every traffic class to be fully (and exclusively) split across its accepted
    /// paths: the flow variables of each class sum to 1. No slack, no partial drop.
    pub fn route_all(&mut self, pptc: &PathsPerClass) -> Result<(), Error> {
        if self.flow.is_empty() {
            return Err(Error::Validation(
                "allocate_flow must be called before route_all".into(),
            ));
        }
        if self.routed {
            return Err(Error::Validation("allocation constraints already added".into()));
        }
        for (tc, paths) in pptc.iter() {
            let mut sum: Expression = 0.0.into();
            for idx in 0..paths.len() {
                sum += self.flow_var(tc.id, idx)?;
            }
            self.constraints.push(constraint!(sum == 1.0));
        }
        self.routed = true;
        debug!("added {} allocation constraints", pptc.num_classes());
        Ok(())
    }

    /// Add binary placement variables at the given granularity. Every binary is linked to its
    /// flow variable (`flow <= binary`), so a path carrying any traffic forces its placements on.
    pub fn add_binary_vars(
        &mut self,
        pptc: &PathsPerClass,
        granularity: BinGranularity,
    ) -> Result<(), Error> {
        if self.flow.is_empty() {
            return Err(Error::Validation(
                "allocate_flow must be called before add_binary_vars".into(),
            ));
        }
        if !self.granularities.insert(granularity) {
            return Err(Error::Validation(format!(
                "binary variables for {granularity:?} already added"
            )));
        }
        let mut count = 0;
        for (tc, paths) in pptc.iter() {
            for (idx, path) in paths.iter().enumerate() {
                let flow = self.flow_var(tc.id, idx)?;
                let targets: Vec<Option<Element>> = match granularity {
                    BinGranularity::Path => vec![None],
                    BinGranularity::PathNode => path
                        .nodes()
                        .iter()
                        .map(|&n| Some(Element::Node(n)))
                        .collect(),
                    BinGranularity::PathLink => {
                        path.links().map(|l| Some(Element::Link(l))).collect()
                    }
                };
                for target in targets {
                    let bin = self.vars.add(variable().binary());
                    self.binaries.insert((tc.id, idx, target), bin);
                    self.constraints.push(constraint!(flow <= bin));
                    count += 1;
                }
            }
        }
        debug!("added {count} binary variables for {granularity:?}");
        Ok(())
    }

    /// Cap a resource that is consumed proportionally to the routed fraction. For every element
    /// in the capacity table, the summed consumption over all classes and paths charged at that
    /// element must stay within the element's capacity. Node elements charge the paths whose
    /// use-set selects the node (processing happens there); link elements charge the paths
    /// traversing the link. Elements the table does not mention stay uncapacitated, and an
    /// element no path touches yields a vacuous constraint, which is fine.
    pub fn cap_resource(
        &mut self,
        pptc: &PathsPerClass,
        resource: &str,
        table: &CapacityTable,
        func: &impl CapacityFunction,
    ) -> Result<(), Error> {
        self.cap_internal(pptc, resource, table, func, false)
    }

    /// Cap a resource that is charged per discrete placement (e.g., rule-table entries): the
    /// constraint terms use the binary placement variables instead of the fractional flow. Node
    /// elements charge every path traversing the node. Requires matching binary variables from
    /// [`Optimization::add_binary_vars`].
    pub fn cap_resource_discrete(
        &mut self,
        pptc: &PathsPerClass,
        resource: &str,
        table: &CapacityTable,
        func: &impl CapacityFunction,
    ) -> Result<(), Error> {
        self.cap_internal(pptc, resource, table, func, true)
    }

    /// Convenience wrapper capping node elements from a per-node capacity map.
    pub fn cap_nodes(
        &mut self,
        pptc: &PathsPerClass,
        resource: &str,
        node_caps: &BTreeMap<NodeId, f64>,
        func: &impl CapacityFunction,
    ) -> Result<(), Error> {
        let table = funcs::node_capacity_table(node_caps.iter().map(|(&n, &c)| (n, c)));
        self.cap_resource(pptc, resource, &table, func)
    }

    /// Convenience wrapper capping a discrete per-node resource from a per-node capacity map.
    pub fn cap_nodes_discrete(
        &mut self,
        pptc: &PathsPerClass,
        resource: &str,
        node_caps: &BTreeMap<NodeId, f64>,
        func: &impl CapacityFunction,
    ) -> Result<(), Error> {
        let table = funcs::node_capacity_table(node_caps.iter().map(|(&n, &c)| (n, c)));
        self.cap_resource_discrete(pptc, resource, &table, func)
    }

    /// Convenience wrapper capping link elements from a per-link capacity map.
    pub fn cap_links(
        &mut self,
        pptc: &PathsPerClass,
        resource: &str,
        link_caps: &BTreeMap<Link, f64>,
        func: &impl CapacityFunction,
    ) -> Result<(), Error> {
        let table = funcs::link_capacity_table(link_caps.iter().map(|(&l, &c)| (l, c)));
        self.cap_resource(pptc, resource, &table, func)
    }

    fn cap_internal(
        &mut self,
        pptc: &PathsPerClass,
        resource: &str,
        table: &CapacityTable,
        func: &impl CapacityFunction,
        discrete: bool,
    ) -> Result<(), Error> {
        // Assemble all terms before mutating the model, so an unsupported resource or a bad
        // coefficient leaves no partial constraints behind.
        let mut terms: Vec<(Element, f64, Expression)> = Vec::with_capacity(table.len());
        for (&element, &cap) in table {
            let mut expr: Expression = 0.0.into();
            for (tc, paths) in pptc.iter() {
                for (idx, path) in paths.iter().enumerate() {
                    let charged = match element {
                        Element::Node(n) if discrete => path.contains_node(n),
                        Element::Node(n) => path.use_mboxes().contains(&n),
                        Element::Link(l) => path.contains_link(l),
                    };
                    if !charged {
                        continue;
                    }
                    let coeff = func.coefficient(element, tc, path, resource)?;
                    if !coeff.is_finite() || coeff < 0.0 {
                        return Err(Error::Validation(format!(
                            "capacity function returned {coeff} for {resource:?} at \
                             {element:?}, expected a non-negative finite coefficient"
                        )));
                    }
                    let var = if discrete {
                        self.binary_for(tc.id, idx, element).ok_or_else(|| {
                            Error::Validation(format!(
                                "no binary variable for {element:?}, call add_binary_vars first"
                            ))
                        })?
                    } else {
                        self.flow_var(tc.id, idx)?
                    };
                    expr += coeff * var;
                }
            }
            terms.push((element, cap, expr));
        }

        let num = terms.len();
        for (element, cap, expr) in terms {
            self.constraints.push(constraint!(expr.clone() <= cap));
            self.loads.push(LoadTerm {
                resource: resource.to_string(),
                element,
                expr,
                cap,
            });
        }
        debug!("added {num} capacity constraints for resource {resource:?}");
        Ok(())
    }

    /// Set the canonical min-max fairness objective over all elements capacitated for the given
    /// resource: one auxiliary scalar `z`, a constraint `load(element) <= cap(element) * z` per
    /// element, and `minimize z`. The load expressions are the ones recorded by the capacity
    /// constraints, normalized against each element's own capacity; with capacities of 1 the
    /// objective value equals the maximum raw usage.
    pub fn min_max_load(&mut self, resource: &str) -> Result<(), Error> {
        self.min_max_load_filtered(resource, |_| true)
    }

    /// Minimize the maximum load over the *node* elements capacitated for the resource.
    pub fn min_node_load(&mut self, resource: &str) -> Result<(), Error> {
        self.min_max_load_filtered(resource, |e| matches!(e, Element::Node(_)))
    }

    /// Minimize the maximum load over the *link* elements capacitated for the resource.
    pub fn min_link_load(&mut self, resource: &str) -> Result<(), Error> {
        self.min_max_load_filtered(resource, |e| matches!(e, Element::Link(_)))
    }

    fn min_max_load_filtered(
        &mut self,
        resource: &str,
        filter: impl Fn(Element) -> bool,
    ) -> Result<(), Error> {
        if self.objective.is_some() {
            return Err(Error::Validation("objective already set".into()));
        }
        let terms: Vec<(Expression, f64)> = self
            .loads
            .iter()
            .filter(|t| t.resource == resource && filter(t.element))
            .map(|t| (t.expr.clone(), t.cap))
            .collect();
        if terms.is_empty() {
            warn!("no capacitated elements for resource {resource:?}, objective will be trivial");
        }
        let z = self.vars.add(variable().min(0.0));
        for (expr, cap) in terms {
            self.constraints.push(constraint!(expr <= cap * z));
        }
        self.objective = Some(z.into());
        Ok(())
    }

    /// Hand the model to the solver backend. Consumes the model; on a proven optimum the
    /// returned [`SolvedOptimization`] carries the objective value and all path fractions.
    pub fn solve(self, config: &SolverConfig) -> Result<SolvedOptimization, Error> {
        let objective = self.objective.unwrap_or_else(|| Expression::from(0.0));
        let keys: Vec<(u32, usize)> = self.flow.keys().copied().collect();
        let tracked: Vec<Variable> = self.flow.values().copied().collect();
        let (objective_value, values) =
            solver::run_solver(self.vars, objective, self.constraints, &tracked, config)?;
        Ok(SolvedOptimization::new(
            objective_value,
            keys.into_iter().zip(values).collect(),
        ))
    }

    fn flow_var(&self, tc_id: u32, path_idx: usize) -> Result<Variable, Error> {
        self.flow.get(&(tc_id, path_idx)).copied().ok_or_else(|| {
            Error::Validation(format!(
                "no flow variable for class {tc_id}, path {path_idx}"
            ))
        })
    }

    /// The binary variable charged at an element, preferring an element-granular variable over a
    /// path-level one.
    fn binary_for(&self, tc_id: u32, path_idx: usize, element: Element) -> Option<Variable> {
        self.binaries
            .get(&(tc_id, path_idx, Some(element)))
            .or_else(|| self.binaries.get(&(tc_id, path_idx, None)))
            .copied()
    }
}

impl Default for Optimization {
    fn default() -> Self {
        Self::new()
    }
}

/// Generate the candidate paths for all traffic classes and return them together with an empty
/// model ready to be populated. The main entry point of the engine.
pub fn init_optimization<P, M>(
    topo: &Topology,
    classes: &[TrafficClass],
    predicate: &P,
    strategy: SelectStrategy,
    k: usize,
    modifier: &M,
    max_hops: usize,
) -> Result<(Optimization, PathsPerClass), Error>
where
    P: PathPredicate,
    M: PathModifier,
{
    let pptc = generate_paths_per_class(topo, classes, predicate, strategy, k, modifier, max_hops)?;
    Ok((Optimization::new(), pptc))
}
