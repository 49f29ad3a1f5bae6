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
//! End-to-end scenarios exercising the whole pipeline against the CBC backend.

use std::collections::BTreeMap;

use crate::{
    error::Error,
    opt::{
        funcs::default_link_func, init_optimization, solver::SolveStatus, solver::SolverConfig,
        BinGranularity,
    },
    paths::{
        generate::SelectStrategy,
        predicates::{accept_all, identity_modifier, service_chain_predicate, use_mbox_modifier},
        Path,
    },
    topology::{Element, Link, NodeId, Topology},
    traffic::TrafficClass,
};

const EPS: f64 = 1e-6;

/// Two nodes joined by a single directed link.
fn single_link_topo() -> (Topology, NodeId, NodeId) {
    let mut topo = Topology::new("single_link");
    let a = topo.add_node("a");
    let b = topo.add_node("b");
    topo.add_link(a, b).unwrap();
    (topo, a, b)
}

/// Two disjoint two-hop paths between s and t: s -> a -> t and s -> b -> t.
fn parallel_topo() -> (Topology, [NodeId; 4]) {
    let mut topo = Topology::new("parallel");
    let s = topo.add_node("s");
    let a = topo.add_node("a");
    let b = topo.add_node("b");
    let t = topo.add_node("t");
    topo.add_link(s, a).unwrap();
    topo.add_link(a, t).unwrap();
    topo.add_link(s, b).unwrap();
    topo.add_link(b, t).unwrap();
    (topo, [s, a, b, t])
}

/// Normalized capacity table: every link of the topology is capacitated at 1.
fn normalized_link_caps(topo: &Topology) -> BTreeMap<Link, f64> {
    topo.links().map(|l| (l, 1.0)).collect()
}

#[test]
fn single_link_half_loaded() {
    let (topo, a, b) = single_link_topo();
    let classes = vec![TrafficClass::new(0, "tc0", a, b, 50.0, 50.0)];
    let link_caps: BTreeMap<Link, f64> = topo.links().map(|l| (l, 100.0)).collect();

    let pred = accept_all();
    let modifier = identity_modifier();
    let (mut opt, pptc) = init_optimization(
        &topo,
        &classes,
        &pred,
        SelectStrategy::ShortestK,
        5,
        &modifier,
        4,
    )
    .unwrap();

    opt.allocate_flow(&pptc).unwrap();
    opt.route_all(&pptc).unwrap();
    opt.cap_links(
        &pptc,
        "bandwidth",
        &normalized_link_caps(&topo),
        &default_link_func(link_caps),
    )
    .unwrap();
    opt.min_link_load("bandwidth").unwrap();

    let solved = opt.solve(&SolverConfig::default()).unwrap();
    assert!((solved.objective_value() - 0.5).abs() < EPS);

    let fractions = solved.path_fractions(&pptc).unwrap();
    assert_eq!(fractions.len(), 1);
    let (_, paths) = &fractions[0];
    assert_eq!(paths.len(), 1);
    assert!((paths[0].1 - 1.0).abs() < EPS);
}

#[test]
fn equal_capacities_split_evenly() {
    let (topo, [s, _, _, t]) = parallel_topo();
    let classes = vec![TrafficClass::new(0, "tc0", s, t, 1.0, 100.0)];
    let link_caps: BTreeMap<Link, f64> = topo.links().map(|l| (l, 100.0)).collect();

    let pred = accept_all();
    let modifier = identity_modifier();
    let (mut opt, pptc) = init_optimization(
        &topo,
        &classes,
        &pred,
        SelectStrategy::ShortestK,
        5,
        &modifier,
        4,
    )
    .unwrap();
    assert_eq!(pptc.get(0).unwrap().len(), 2);

    opt.allocate_flow(&pptc).unwrap();
    opt.route_all(&pptc).unwrap();
    opt.cap_links(
        &pptc,
        "bandwidth",
        &normalized_link_caps(&topo),
        &default_link_func(link_caps),
    )
    .unwrap();
    opt.min_link_load("bandwidth").unwrap();

    let solved = opt.solve(&SolverConfig::default()).unwrap();
    assert!((solved.objective_value() - 0.5).abs() < EPS);

    let fractions = solved.path_fractions(&pptc).unwrap();
    let (_, paths) = &fractions[0];
    assert_eq!(paths.len(), 2);
    assert!((paths[0].1 - 0.5).abs() < EPS);
    assert!((paths[1].1 - 0.5).abs() < EPS);
}

#[test]
fn skewed_capacities_split_proportionally() {
    let (topo, [s, a, b, t]) = parallel_topo();
    let classes = vec![TrafficClass::new(0, "tc0", s, t, 1.0, 100.0)];
    // the path via a has twice the capacity of the path via b
    let link_caps: BTreeMap<Link, f64> = topo
        .links()
        .map(|l| {
            let cap = if l.src == b || l.dst == b { 50.0 } else { 100.0 };
            (l, cap)
        })
        .collect();

    let pred = accept_all();
    let modifier = identity_modifier();
    let (mut opt, pptc) = init_optimization(
        &topo,
        &classes,
        &pred,
        SelectStrategy::ShortestK,
        5,
        &modifier,
        4,
    )
    .unwrap();

    opt.allocate_flow(&pptc).unwrap();
    opt.route_all(&pptc).unwrap();
    opt.cap_links(
        &pptc,
        "bandwidth",
        &normalized_link_caps(&topo),
        &default_link_func(link_caps),
    )
    .unwrap();
    opt.min_link_load("bandwidth").unwrap();

    let solved = opt.solve(&SolverConfig::default()).unwrap();
    assert!((solved.objective_value() - 2.0 / 3.0).abs() < EPS);

    let fractions = solved.path_fractions(&pptc).unwrap();
    let (_, paths) = &fractions[0];
    assert_eq!(paths.len(), 2);
    // the larger fraction flows over the fat path via a
    assert!((paths[0].1 - 2.0 / 3.0).abs() < EPS);
    assert!(paths[0].0.contains_node(a));
    assert!((paths[1].1 - 1.0 / 3.0).abs() < EPS);
}

#[test]
fn oversubscribed_link_is_infeasible() {
    let (topo, a, b) = single_link_topo();
    let classes = vec![TrafficClass::new(0, "tc0", a, b, 1.0, 200.0)];
    let link_caps: BTreeMap<Link, f64> = topo.links().map(|l| (l, 100.0)).collect();

    let pred = accept_all();
    let modifier = identity_modifier();
    let (mut opt, pptc) = init_optimization(
        &topo,
        &classes,
        &pred,
        SelectStrategy::ShortestK,
        5,
        &modifier,
        4,
    )
    .unwrap();

    opt.allocate_flow(&pptc).unwrap();
    opt.route_all(&pptc).unwrap();
    // normalized load of the only path is 2, which can never fit under a capacity of 1
    opt.cap_links(
        &pptc,
        "bandwidth",
        &normalized_link_caps(&topo),
        &default_link_func(link_caps),
    )
    .unwrap();

    let result = opt.solve(&SolverConfig::default());
    assert!(matches!(
        result,
        Err(Error::Solver(SolveStatus::Infeasible))
    ));
}

#[test]
fn rule_table_limit_forbids_path_splitting() {
    let (topo, [s, _, _, t]) = parallel_topo();
    let classes = vec![TrafficClass::new(0, "tc0", s, t, 1.0, 100.0)];

    let pred = accept_all();
    let modifier = identity_modifier();
    let (mut opt, pptc) = init_optimization(
        &topo,
        &classes,
        &pred,
        SelectStrategy::ShortestK,
        5,
        &modifier,
        4,
    )
    .unwrap();

    opt.allocate_flow(&pptc).unwrap();
    opt.route_all(&pptc).unwrap();
    opt.add_binary_vars(&pptc, BinGranularity::PathNode).unwrap();

    // two rules per path and switch, but s only has space for two rules in total, so only one
    // of the two candidate paths may be installed
    let two_rules = |_: Element, _: &TrafficClass, _: &Path, resource: &str| {
        if resource == "tcam" {
            Ok(2.0)
        } else {
            Err(Error::UnsupportedResource(resource.to_string()))
        }
    };
    let tcam_caps: BTreeMap<NodeId, f64> = topo.nodes().map(|n| (n, 2.0)).collect();
    opt.cap_nodes_discrete(&pptc, "tcam", &tcam_caps, &two_rules)
        .unwrap();

    let solved = opt.solve(&SolverConfig::default()).unwrap();
    let fractions = solved.path_fractions(&pptc).unwrap();
    let (_, paths) = &fractions[0];
    assert_eq!(paths.len(), 1);
    assert!((paths[0].1 - 1.0).abs() < EPS);
}

#[test]
fn service_chaining_end_to_end() {
    // linear topology s -> m1 -> m2 -> t with processing available at m1 and m2
    let mut topo = Topology::new("chain");
    let s = topo.add_node("s");
    let m1 = topo.add_node("m1");
    let m2 = topo.add_node("m2");
    let t = topo.add_node("t");
    topo.add_link(s, m1).unwrap();
    topo.add_link(m1, m2).unwrap();
    topo.add_link(m2, t).unwrap();
    for n in [m1, m2] {
        topo.set_mbox(n).unwrap();
        topo.set_service_types(n, ["fw", "ids"]).unwrap();
    }

    let mut tc = TrafficClass::new(0, "tc0", s, t, 100.0, 200_000.0);
    tc.set_attr("cpu_cost", 10.0);
    let classes = vec![tc];

    let pred = service_chain_predicate(["fw", "ids"]);
    let modifier = use_mbox_modifier(2);
    let (mut opt, pptc) = init_optimization(
        &topo,
        &classes,
        &pred,
        SelectStrategy::RandomK { seed: 42 },
        5,
        &modifier,
        4,
    )
    .unwrap();

    // the only candidate processes at m1 then m2
    let paths = pptc.get(0).unwrap();
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].use_mboxes(), &[m1, m2]);
    assert!(pred(&paths[0], &topo));

    opt.allocate_flow(&pptc).unwrap();
    opt.route_all(&pptc).unwrap();

    // cpu load normalized against a capacity of 2000 cpu units per middlebox
    let cpu_caps: BTreeMap<NodeId, f64> = [(m1, 2000.0), (m2, 2000.0)].into();
    let cpu_func = move |element: Element, tc: &TrafficClass, _: &Path, resource: &str| {
        if resource != "cpu" {
            return Err(Error::UnsupportedResource(resource.to_string()));
        }
        let Element::Node(node) = element else {
            return Err(Error::Validation("cpu is a node resource".into()));
        };
        let cost = tc
            .attr("cpu_cost")
            .ok_or_else(|| Error::Validation("missing cpu_cost".into()))?;
        Ok(tc.vol_flows * cost / cpu_caps[&node])
    };
    let normalized: BTreeMap<NodeId, f64> = [(m1, 1.0), (m2, 1.0)].into();
    opt.cap_nodes(&pptc, "cpu", &normalized, &cpu_func).unwrap();
    opt.min_node_load("cpu").unwrap();

    let solved = opt.solve(&SolverConfig::default()).unwrap();
    // 100 flows * 10 cpu / 2000 cap = 0.5 on both middleboxes
    assert!((solved.objective_value() - 0.5).abs() < EPS);

    let fractions = solved.path_fractions(&pptc).unwrap();
    let (_, paths) = &fractions[0];
    assert_eq!(paths.len(), 1);
    assert!((paths[0].1 - 1.0).abs() < EPS);
}
