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
//! Demo: route all traffic of a ring network through a firewall and an IDS while minimizing the
//! maximum middlebox CPU load, subject to link bandwidth and switch rule-table limits.

use std::{collections::BTreeMap, time::Duration};

use anyhow::Context;
use clap::Parser;
use log::info;

use chainopt::prelude::*;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of nodes in the ring; every other node hosts a middlebox.
    #[arg(short, long, default_value_t = 8)]
    nodes: u32,
    /// Number of candidate paths kept per traffic class.
    #[arg(short, default_value_t = 5)]
    k: usize,
    /// Maximum number of hops on a candidate path.
    #[arg(long, default_value_t = 6)]
    max_hops: usize,
    /// Pick the k shortest candidates instead of a random sample.
    #[arg(long)]
    shortest: bool,
    /// Seed for the random candidate sampling.
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    /// Ordered service chain every flow must traverse.
    #[arg(short, long, value_delimiter = ',', default_value = "fw,ids")]
    chain: Vec<String>,
    /// Solver time limit in seconds.
    #[arg(short, long)]
    timeout: Option<u64>,
    /// Forward the solver's own log output.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();
    let args = Args::parse();

    // Bidirectional ring; every even node is a middlebox offering the full chain.
    let mut topo = Topology::new("ring");
    let nodes: Vec<NodeId> = (0..args.nodes)
        .map(|i| topo.add_node(format!("r{i}")))
        .collect();
    for i in 0..nodes.len() {
        topo.add_bidirectional_link(nodes[i], nodes[(i + 1) % nodes.len()])?;
    }
    let mboxes: Vec<NodeId> = nodes.iter().copied().step_by(2).collect();
    for &m in &mboxes {
        topo.set_mbox(m)?;
        topo.set_service_types(m, args.chain.iter().cloned())?;
    }
    info!(
        "built topology {:?} with {} nodes and {} links, {} middleboxes",
        topo.name(),
        topo.num_nodes(),
        topo.num_links(),
        mboxes.len()
    );

    // 1000 flows between each pair of opposite ring nodes, 2000 bytes per flow, 10 cpu units of
    // middlebox processing per flow.
    let mut matrix = TrafficMatrix::new();
    let half = nodes.len() / 2;
    for i in 0..half {
        matrix.set(nodes[i], nodes[i + half], 1000.0);
    }
    let fractions = BTreeMap::from([("allTraffic".to_string(), 1.0)]);
    let bytes = BTreeMap::from([("allTraffic".to_string(), 2000.0)]);
    let mut classes = generate_traffic_classes(matrix.pairs(), &matrix, &fractions, &bytes)?;
    for tc in &mut classes {
        tc.set_attr("cpu_cost", 10.0);
    }

    // Provision middlebox CPUs for twice the worst-case ingress load, links for three times the
    // single-shortest-path load, and give every switch room for 1000 forwarding rules.
    let max_cpu = 2.0 * chainopt::provisioning::compute_max_ingress_load(&classes, "cpu_cost")?;
    let cpu_caps: BTreeMap<NodeId, f64> = mboxes.iter().map(|&m| (m, max_cpu)).collect();
    let link_caps = chainopt::provisioning::provision_links(&topo, &classes, 3.0)?;
    let tcam_caps = chainopt::provisioning::uniform_node_caps(&topo, 1000.0);

    let strategy = if args.shortest {
        SelectStrategy::ShortestK
    } else {
        SelectStrategy::RandomK { seed: args.seed }
    };
    let predicate = service_chain_predicate(args.chain.clone());
    let modifier = use_mbox_modifier(args.chain.len());
    let (mut opt, pptc) = init_optimization(
        &topo,
        &classes,
        &predicate,
        strategy,
        args.k,
        &modifier,
        args.max_hops,
    )?;
    info!(
        "kept {} candidate paths for {} traffic classes",
        pptc.num_paths(),
        pptc.num_classes()
    );

    opt.allocate_flow(&pptc)?;
    opt.route_all(&pptc)?;
    opt.add_binary_vars(&pptc, BinGranularity::PathNode)?;

    // One forwarding rule per installed path at each switch it crosses.
    let one_rule = |element: Element, _: &TrafficClass, _: &Path, resource: &str| {
        match (element, resource) {
            (Element::Node(_), "tcam") => Ok(1.0),
            _ => Err(Error::UnsupportedResource(resource.to_string())),
        }
    };
    opt.cap_nodes_discrete(&pptc, "tcam", &tcam_caps, &one_rule)?;

    // The bandwidth function normalizes against the provisioned capacities, so the capacity
    // table on the constraint side is all ones.
    let normalized_links: BTreeMap<Link, f64> = link_caps.keys().map(|&l| (l, 1.0)).collect();
    opt.cap_links(&pptc, "bandwidth", &normalized_links, &default_link_func(link_caps))?;

    // CPU loads are normalized against the provisioned capacities, so the objective comes out as
    // the utilization of the busiest middlebox.
    let caps = cpu_caps.clone();
    let cpu_func = move |element: Element, tc: &TrafficClass, _: &Path, resource: &str| {
        if resource != "cpu" {
            return Err(Error::UnsupportedResource(resource.to_string()));
        }
        let Element::Node(node) = element else {
            return Err(Error::Validation("cpu is a node resource".into()));
        };
        let cost = tc
            .attr("cpu_cost")
            .ok_or_else(|| Error::Validation(format!("{} has no cpu_cost", tc.name)))?;
        Ok(tc.vol_flows * cost / caps[&node])
    };
    let normalized: BTreeMap<NodeId, f64> = cpu_caps.keys().map(|&m| (m, 1.0)).collect();
    opt.cap_nodes(&pptc, "cpu", &normalized, &cpu_func)?;
    opt.min_node_load("cpu")?;

    let config = SolverConfig {
        timeout: args.timeout.map(Duration::from_secs),
        verbose: args.verbose,
        ..Default::default()
    };
    let solved = opt.solve(&config).context("optimization failed")?;

    println!("maximum middlebox cpu load: {:.4}", solved.objective_value());
    for (tc, paths) in solved.path_fractions(&pptc)? {
        println!("{tc}");
        for (path, fraction) in paths {
            let hops: Vec<&str> = path
                .nodes()
                .iter()
                .map(|&n| topo.node_name(n))
                .collect::<Result<_, _>>()?;
            let used: Vec<&str> = path
                .use_mboxes()
                .iter()
                .map(|&n| topo.node_name(n))
                .collect::<Result<_, _>>()?;
            println!(
                "  {:>6.2}% via {} (processed at {})",
                fraction * 100.0,
                hops.join(" -> "),
                used.join(", ")
            );
        }
    }
    Ok(())
}
