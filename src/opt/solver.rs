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
//! The solver adapter.
//!
//! This is the only module that touches a concrete solver backend. It translates the abstract
//! model (variables, constraints, objective) into the backend's native form, runs the blocking
//! solve bounded by the configured timeout, and maps the terminal state to a [`SolveStatus`]. On
//! anything other than [`SolveStatus::Optimal`] no variable values are returned, so callers can
//! never mistake a failed run for a real solution.

use std::{fmt, time::Duration, time::Instant};

use good_lp::{
    solvers::coin_cbc::coin_cbc, Constraint, Expression, ProblemVariables, ResolutionError,
    Solution, SolverModel, Variable,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Terminal status of a solve. Only [`SolveStatus::Optimal`] carries variable values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveStatus {
    Optimal,
    Infeasible,
    Unbounded,
    Timeout,
    Error,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimal => write!(f, "optimal"),
            Self::Infeasible => write!(f, "infeasible"),
            Self::Unbounded => write!(f, "unbounded"),
            Self::Timeout => write!(f, "timeout"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// The available solver backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverBackend {
    #[default]
    CoinCbc,
}

/// Configuration of a solve.
#[derive(Clone, Debug, Default)]
pub struct SolverConfig {
    pub backend: SolverBackend,
    /// Upper bound on the blocking solver call. When the limit is hit before an optimum is
    /// proven, the solve fails with [`SolveStatus::Timeout`].
    pub timeout: Option<Duration>,
    /// Forward the backend's own log output instead of silencing it.
    pub verbose: bool,
}

/// Run the backend on the assembled model. Returns the objective value and the values of the
/// `tracked` variables, in order, iff the solve terminated with a proven optimum.
pub(crate) fn run_solver(
    vars: ProblemVariables,
    objective: Expression,
    constraints: Vec<Constraint>,
    tracked: &[Variable],
    config: &SolverConfig,
) -> Result<(f64, Vec<f64>), Error> {
    match config.backend {
        SolverBackend::CoinCbc => run_cbc(vars, objective, constraints, tracked, config),
    }
}

fn run_cbc(
    vars: ProblemVariables,
    objective: Expression,
    constraints: Vec<Constraint>,
    tracked: &[Variable],
    config: &SolverConfig,
) -> Result<(f64, Vec<f64>), Error> {
    let num_constraints = constraints.len();
    let mut problem = coin_cbc(vars.minimise(objective.clone()));

    if !config.verbose {
        problem.set_parameter("logLevel", "0");
    }
    if let Some(t) = config.timeout {
        problem.set_parameter("seconds", &t.as_secs().max(1).to_string());
    }
    for c in constraints {
        problem.add_constraint(c);
    }

    info!(
        "solving model with {} variables and {num_constraints} constraints",
        tracked.len()
    );
    let start = Instant::now();
    match problem.solve() {
        Ok(solution) => {
            debug!("solver finished after {:?}", start.elapsed());
            let values = tracked.iter().map(|&v| solution.value(v)).collect();
            Ok((objective.eval_with(&solution), values))
        }
        Err(e) => {
            let timed_out = config
                .timeout
                .map(|t| start.elapsed() >= t)
                .unwrap_or(false);
            let status = match e {
                ResolutionError::Infeasible => SolveStatus::Infeasible,
                ResolutionError::Unbounded => SolveStatus::Unbounded,
                _ if timed_out => SolveStatus::Timeout,
                _ => SolveStatus::Error,
            };
            warn!("solver failed with status {status}: {e}");
            Err(Error::Solver(status))
        }
    }
}
