//! The solving engine seam.
//!
//! The pipeline hands a finished [`LinearModel`] to a [`SolvingEngine`] and
//! blocks until it returns a status and, on success, the values of the
//! variables it asked to read back. [`HighsEngine`] solves through `good_lp`
//! with the HiGHS MILP solver.

use crate::config::SolverConfig;
use good_lp::solvers::SolutionStatus;
use good_lp::solvers::highs::highs;
use good_lp::{
    Constraint, Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable,
};
use log::{info, warn};
use serde::Serialize;
use std::fmt;
use std::time::Instant;

/// A minimisation problem: variables, linear constraints, a weighted sum of
/// variables as objective, and the variables whose values the caller wants
/// back (in that order).
pub struct LinearModel {
    variables: ProblemVariables,
    constraints: Vec<Constraint>,
    objective: Vec<(Variable, f64)>,
    readout: Vec<Variable>,
}

impl LinearModel {
    pub fn new(
        variables: ProblemVariables,
        constraints: Vec<Constraint>,
        objective: Vec<(Variable, f64)>,
        readout: Vec<Variable>,
    ) -> Self {
        Self {
            variables,
            constraints,
            objective,
            readout,
        }
    }

    pub fn variable_count(&self) -> usize {
        self.variables.len()
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    pub fn objective_terms(&self) -> &[(Variable, f64)] {
        &self.objective
    }
}

/// Options passed through to the engine untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub time_limit_secs: f64,
    pub workers: u32,
    pub random_seed: i32,
    pub log_search: bool,
}

#[cfg(test)]
impl EngineSettings {
    /// Single worker with a fixed seed, for reproducible runs.
    pub(crate) fn for_tests() -> Self {
        Self {
            time_limit_secs: 30.0,
            workers: 1,
            random_seed: 1234,
            log_search: false,
        }
    }
}

impl From<&SolverConfig> for EngineSettings {
    fn from(config: &SolverConfig) -> Self {
        Self {
            time_limit_secs: config.time_limit_secs,
            workers: config.workers,
            random_seed: config.random_seed,
            log_search: config.log_search,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    /// Proven optimal.
    Optimal,
    /// A solution was found but the search stopped early: on the time limit,
    /// or on HiGHS's relative gap limit, which larger instances often reach
    /// before optimality is proven.
    Feasible,
    /// Proven to have no solution.
    Infeasible,
    /// No usable answer within budget, or the engine failed.
    Unknown,
}

impl EngineStatus {
    pub fn has_solution(self) -> bool {
        matches!(self, EngineStatus::Optimal | EngineStatus::Feasible)
    }
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EngineStatus::Optimal => "optimal",
            EngineStatus::Feasible => "feasible",
            EngineStatus::Infeasible => "infeasible",
            EngineStatus::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

/// Values of the readout variables, in readout order.
#[derive(Debug, Clone, PartialEq)]
pub struct Valuation {
    pub values: Vec<f64>,
    pub objective: f64,
}

/// What came back from one engine call. `valuation` is `Some` only when the
/// status has a solution.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutcome {
    pub status: EngineStatus,
    pub valuation: Option<Valuation>,
}

impl EngineOutcome {
    pub fn without_solution(status: EngineStatus) -> Self {
        Self {
            status,
            valuation: None,
        }
    }
}

pub trait SolvingEngine {
    /// Solves `model`, blocking until done or out of time.
    fn solve(&self, model: LinearModel, settings: &EngineSettings) -> EngineOutcome;
}

/// HiGHS through `good_lp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighsEngine;

impl SolvingEngine for HighsEngine {
    fn solve(&self, model: LinearModel, settings: &EngineSettings) -> EngineOutcome {
        let start_time = Instant::now();
        let LinearModel {
            variables,
            constraints,
            objective,
            readout,
        } = model;

        let objective_expr: Expression = objective.iter().map(|&(var, weight)| weight * var).sum();

        let mut problem = variables
            .minimise(objective_expr)
            .using(highs)
            .set_option("threads", settings.workers as i32)
            .set_option("random_seed", settings.random_seed)
            .set_option("time_limit", settings.time_limit_secs)
            .set_option("log_to_console", settings.log_search);
        for c in constraints {
            problem.add_constraint(c);
        }

        info!(
            "Starting MILP solver ({} workers, {:.1}s budget)...",
            settings.workers, settings.time_limit_secs
        );
        let solution = match problem.solve() {
            Ok(s) => s,
            Err(ResolutionError::Infeasible) => {
                info!("Solver proved the model infeasible in {:.2?}", start_time.elapsed());
                return EngineOutcome::without_solution(EngineStatus::Infeasible);
            }
            Err(e) => {
                warn!("Solver returned no solution: {}", e);
                return EngineOutcome::without_solution(EngineStatus::Unknown);
            }
        };

        // HiGHS stops a MIP once the relative gap drops below `mip_rel_gap`
        // (1e-4 by default); good_lp reports that as `GapLimit`, which lands
        // here as `Feasible` even when the incumbent is in fact optimal.
        let status = match solution.status() {
            SolutionStatus::Optimal => EngineStatus::Optimal,
            _ => EngineStatus::Feasible,
        };
        let values: Vec<f64> = readout.iter().map(|&var| solution.value(var)).collect();
        let objective_value = objective
            .iter()
            .map(|&(var, weight)| weight * solution.value(var))
            .sum();
        info!(
            "Solver finished with status {} (objective {}) in {:.2?}",
            status,
            objective_value,
            start_time.elapsed()
        );

        EngineOutcome {
            status,
            valuation: Some(Valuation {
                values,
                objective: objective_value,
            }),
        }
    }
}
