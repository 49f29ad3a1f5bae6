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
//! Extraction of path fractions from a solved model.

use std::{cmp::Reverse, collections::BTreeMap};

use log::debug;
use ordered_float::OrderedFloat;

use crate::{
    error::Error,
    paths::{Path, PathsPerClass},
    traffic::TrafficClass,
};

/// Numerical tolerance for filtering negligible fractions and checking allocation sums.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// A solved, read-only optimization: objective value and raw variable assignments. Produced only
/// for solves that terminated with a proven optimum.
#[derive(Clone, Debug)]
pub struct SolvedOptimization {
    objective: f64,
    fractions: BTreeMap<(u32, usize), f64>,
}

impl SolvedOptimization {
    pub(crate) fn new(objective: f64, fractions: BTreeMap<(u32, usize), f64>) -> Self {
        Self {
            objective,
            fractions,
        }
    }

    /// The solved objective value; for the min-max-load objective this is the load of the
    /// maximally loaded capacitated element, normalized to its capacity.
    pub fn objective_value(&self) -> f64 {
        self.objective
    }

    /// Map every traffic class to its routed paths and fractions, using the default tolerance.
    pub fn path_fractions(
        &self,
        pptc: &PathsPerClass,
    ) -> Result<Vec<(TrafficClass, Vec<(Path, f64)>)>, Error> {
        self.path_fractions_with_tolerance(pptc, DEFAULT_TOLERANCE)
    }

    /// Map every traffic class to an ordered list of `(path, fraction)` pairs, largest fraction
    /// first. Fractions below `tolerance` are dropped; the remaining fractions of each class
    /// must sum to 1 within `tolerance`, anything else signals a solver/model inconsistency and
    /// is reported as [`Error::ExtractionInconsistency`] rather than silently renormalized.
    pub fn path_fractions_with_tolerance(
        &self,
        pptc: &PathsPerClass,
        tolerance: f64,
    ) -> Result<Vec<(TrafficClass, Vec<(Path, f64)>)>, Error> {
        let mut out = Vec::with_capacity(pptc.num_classes());
        for (tc, paths) in pptc.iter() {
            let mut kept: Vec<(Path, f64)> = Vec::new();
            for (idx, path) in paths.iter().enumerate() {
                let value = self.fractions.get(&(tc.id, idx)).copied().unwrap_or(0.0);
                if value >= tolerance {
                    kept.push((path.clone(), value));
                }
            }
            let sum: f64 = kept.iter().map(|(_, f)| f).sum();
            if (sum - 1.0).abs() > tolerance {
                return Err(Error::ExtractionInconsistency {
                    name: tc.name.clone(),
                    sum,
                });
            }
            kept.sort_by_key(|&(_, f)| Reverse(OrderedFloat(f)));
            debug!(
                "traffic class {}: {} of {} candidate paths carry traffic",
                tc.name,
                kept.len(),
                paths.len()
            );
            out.push((tc.clone(), kept));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::topology::NodeId;

    fn fixture() -> PathsPerClass {
        let a = NodeId(0);
        let b = NodeId(1);
        let c = NodeId(2);
        let tc = TrafficClass::new(0, "tc0", a, c, 1.0, 1.0);
        let paths = vec![
            Path::new(vec![a, b, c]),
            Path::new(vec![a, c]),
            Path::new(vec![a, b, c]).with_use_mboxes(vec![b]),
        ];
        PathsPerClass::new(vec![(tc, paths)])
    }

    #[test]
    fn fractions_are_filtered_and_ordered() {
        let pptc = fixture();
        let solved = SolvedOptimization::new(
            0.5,
            BTreeMap::from([((0, 0), 0.25), ((0, 1), 0.75), ((0, 2), 1e-9)]),
        );

        let result = solved.path_fractions(&pptc).unwrap();
        assert_eq!(result.len(), 1);
        let (_, fractions) = &result[0];
        assert_eq!(fractions.len(), 2);
        // largest fraction first
        assert!((fractions[0].1 - 0.75).abs() < 1e-9);
        assert!((fractions[1].1 - 0.25).abs() < 1e-9);
        assert_eq!(fractions[0].0.nodes(), &[NodeId(0), NodeId(2)]);
    }

    #[test]
    fn inconsistent_sum_is_an_error() {
        let pptc = fixture();
        let solved =
            SolvedOptimization::new(0.5, BTreeMap::from([((0, 0), 0.25), ((0, 1), 0.5)]));

        let result = solved.path_fractions(&pptc);
        assert!(matches!(
            result,
            Err(Error::ExtractionInconsistency { sum, .. }) if (sum - 0.75).abs() < 1e-9
        ));
    }

    #[test]
    fn missing_values_count_as_zero() {
        let pptc = fixture();
        let solved = SolvedOptimization::new(0.0, BTreeMap::new());
        assert!(matches!(
            solved.path_fractions(&pptc),
            Err(Error::ExtractionInconsistency { .. })
        ));
    }
}
