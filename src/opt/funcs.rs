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
//! The capacity-function protocol.
//!
//! A capacity function maps `(element, traffic class, path, resource name)` to a non-negative
//! consumption coefficient: how much of the named resource is consumed at the element when the
//! class's *entire* volume is routed along the path. The model builder scales the coefficient by
//! the fractional flow variable, so whether a resource consumes flow counts or bytes is entirely
//! the function's business. Any extra context (capacity tables, static cost parameters) must be
//! bound into the function before it is handed to the builder.

use std::collections::BTreeMap;

use crate::{
    error::Error,
    paths::Path,
    topology::{Element, Link, NodeId},
    traffic::TrafficClass,
};

/// Capacity table for one resource: capacities of the elements that are constrained for it.
/// Elements absent from the table are treated as uncapacitated.
pub type CapacityTable = BTreeMap<Element, f64>;

/// Pluggable resource-consumption function.
///
/// Contract: for every resource name the function supports, it returns a finite, non-negative
/// coefficient for every element it is asked about. For a resource name it does not recognize it
/// must fail with [`Error::UnsupportedResource`]; the builder propagates that error and aborts
/// model construction, since it indicates a caller/model mismatch. Implementations must be pure
/// with respect to model state.
pub trait CapacityFunction {
    fn coefficient(
        &self,
        element: Element,
        tc: &TrafficClass,
        path: &Path,
        resource: &str,
    ) -> Result<f64, Error>;
}

impl<F> CapacityFunction for F
where
    F: Fn(Element, &TrafficClass, &Path, &str) -> Result<f64, Error>,
{
    fn coefficient(
        &self,
        element: Element,
        tc: &TrafficClass,
        path: &Path,
        resource: &str,
    ) -> Result<f64, Error> {
        self(element, tc, path, resource)
    }
}

/// Default bandwidth function: a class consumes `vol_bytes / link capacity` on every link of a
/// path, i.e., the link load is normalized to `[0, 1]` against the provisioned capacities (so the
/// matching capacity table should hold 1 for every capacitated link).
pub fn default_link_func(
    link_caps: BTreeMap<Link, f64>,
) -> impl Fn(Element, &TrafficClass, &Path, &str) -> Result<f64, Error> {
    move |element, tc: &TrafficClass, _path: &Path, resource| {
        if resource != "bandwidth" {
            return Err(Error::UnsupportedResource(resource.to_string()));
        }
        let Element::Link(link) = element else {
            return Err(Error::Validation(format!(
                "bandwidth is a link resource, asked about {element:?}"
            )));
        };
        let cap = link_caps.get(&link).copied().ok_or_else(|| {
            Error::Validation(format!("no capacity provisioned for link {link:?}"))
        })?;
        Ok(tc.vol_bytes / cap)
    }
}

/// Build a [`CapacityTable`] from per-node capacities.
pub fn node_capacity_table(caps: impl IntoIterator<Item = (NodeId, f64)>) -> CapacityTable {
    caps.into_iter()
        .map(|(n, c)| (Element::Node(n), c))
        .collect()
}

/// Build a [`CapacityTable`] from per-link capacities.
pub fn link_capacity_table(caps: impl IntoIterator<Item = (Link, f64)>) -> CapacityTable {
    caps.into_iter()
        .map(|(l, c)| (Element::Link(l), c))
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_link_func_normalizes_by_capacity() {
        let a = NodeId(0);
        let b = NodeId(1);
        let link = Link::new(a, b);
        let func = default_link_func(BTreeMap::from([(link, 200.0)]));
        let tc = TrafficClass::new(0, "tc", a, b, 1.0, 50.0);
        let path = Path::new(vec![a, b]);

        let coeff = func
            .coefficient(Element::Link(link), &tc, &path, "bandwidth")
            .unwrap();
        assert!((coeff - 0.25).abs() < 1e-9);
    }

    #[test]
    fn default_link_func_rejects_unknown_resource() {
        let link = Link::new(NodeId(0), NodeId(1));
        let func = default_link_func(BTreeMap::from([(link, 1.0)]));
        let tc = TrafficClass::new(0, "tc", NodeId(0), NodeId(1), 1.0, 1.0);
        let path = Path::new(vec![NodeId(0), NodeId(1)]);

        let result = func.coefficient(Element::Link(link), &tc, &path, "latency");
        assert!(matches!(result, Err(Error::UnsupportedResource(r)) if r == "latency"));
    }
}
