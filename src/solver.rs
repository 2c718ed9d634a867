//! Solver adapter between the formulated LP and a backend.
//!
//! Backends see the problem by shared reference only. Every non-optimal outcome
//! becomes a [`SolveError`] carrying the backend's diagnostic, so the engine can
//! skip the unit and keep going.

use tracing::{debug, warn};

use crate::config::{IntegerStrategy, SolverSettings};
use crate::error::SolveError;
use crate::formulate::LpProblem;
use crate::optimize::{
    LinProgOptions, LinProgStatus, MilpOptions, MilpResult, MilpStatus, OptimizeError, linprog,
    milp,
};

/// Solution of one unit's LP.
#[derive(Debug, Clone, PartialEq)]
pub struct LpSolution {
    /// Slot counts per entry, in unit order. Continuous unless `integral`.
    pub slots: Vec<f64>,
    /// Minimized objective value.
    pub objective: f64,
    /// Simplex pivots, or branch-and-bound nodes for integer solvers.
    pub iterations: usize,
    /// Whether `slots` are integer by construction.
    pub integral: bool,
    /// Set when an integer search stopped on its node or pivot budget and
    /// `slots` is the best incumbent rather than a proven optimum.
    pub truncated: bool,
}

/// A linear programming backend.
///
/// Implementations must be pure functions of the problem: no shared mutable
/// state, identical input gives identical output.
pub trait LpSolver: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Solve `problem`, minimizing its objective subject to its rows and `x >= 0`.
    ///
    /// # Errors
    ///
    /// [`SolveError`] if the problem is infeasible, unbounded, exceeds a limit,
    /// or is rejected by the backend.
    fn solve(&self, problem: &LpProblem) -> Result<LpSolution, SolveError>;
}

/// Continuous relaxation solved with the in-crate two-phase simplex.
#[derive(Debug, Clone, Default)]
pub struct SimplexSolver {
    options: LinProgOptions,
}

impl SimplexSolver {
    pub fn new(options: LinProgOptions) -> Self {
        Self { options }
    }

    pub fn from_settings(settings: &SolverSettings) -> Self {
        Self::new(lp_options(settings))
    }
}

impl LpSolver for SimplexSolver {
    fn name(&self) -> &'static str {
        "simplex"
    }

    fn solve(&self, problem: &LpProblem) -> Result<LpSolution, SolveError> {
        let result =
            linprog(&problem.objective, &problem.constraints, &self.options).map_err(rejected)?;
        debug!(
            solver = self.name(),
            status = ?result.status,
            pivots = result.nit,
            "simplex finished"
        );

        match result.status {
            LinProgStatus::Optimal => Ok(LpSolution {
                slots: result.x,
                objective: result.fun,
                iterations: result.nit,
                integral: false,
                truncated: false,
            }),
            LinProgStatus::Infeasible => Err(SolveError::Infeasible {
                message: result.message,
            }),
            LinProgStatus::Unbounded => Err(SolveError::Unbounded {
                message: result.message,
            }),
            LinProgStatus::IterationLimit => Err(SolveError::IterationLimit {
                limit: self.options.max_iter,
                message: result.message,
            }),
            LinProgStatus::TimeLimit => Err(timed_out(self.options.time_limit)),
        }
    }
}

/// Integer slot counts via branch-and-bound over the same LP.
#[derive(Debug, Clone, Default)]
pub struct BranchAndBoundSolver {
    options: MilpOptions,
}

impl BranchAndBoundSolver {
    pub fn new(options: MilpOptions) -> Self {
        Self { options }
    }

    pub fn from_settings(settings: &SolverSettings) -> Self {
        Self::new(MilpOptions {
            max_nodes: settings.max_nodes,
            time_limit: settings.time_limit,
            lp_options: lp_options(settings),
            ..Default::default()
        })
    }
}

impl LpSolver for BranchAndBoundSolver {
    fn name(&self) -> &'static str {
        "branch_and_bound"
    }

    fn solve(&self, problem: &LpProblem) -> Result<LpSolution, SolveError> {
        let integrality = vec![true; problem.n_vars()];
        let result = milp(
            &problem.objective,
            &problem.constraints,
            &integrality,
            &self.options,
        )
        .map_err(rejected)?;
        debug!(
            solver = self.name(),
            status = ?result.status,
            nodes = result.nodes,
            gap = result.gap,
            "branch-and-bound finished"
        );
        milp_outcome(result, &self.options)
    }
}

fn milp_outcome(result: MilpResult, options: &MilpOptions) -> Result<LpSolution, SolveError> {
    let solution = |truncated| LpSolution {
        slots: result.x.clone(),
        objective: result.fun,
        iterations: result.nodes,
        integral: true,
        truncated,
    };

    match result.status {
        MilpStatus::Optimal => Ok(solution(false)),
        MilpStatus::Feasible => match result.stopped_by {
            Some(MilpStatus::TimeLimit) => Err(timed_out(options.time_limit)),
            stopped_by => {
                warn!(
                    stopped_by = ?stopped_by,
                    nodes = result.nodes,
                    gap = result.gap,
                    "branch-and-bound stopped early; keeping best incumbent"
                );
                Ok(solution(true))
            }
        },
        MilpStatus::Infeasible => Err(SolveError::Infeasible {
            message: result.message,
        }),
        MilpStatus::Unbounded => Err(SolveError::Unbounded {
            message: result.message,
        }),
        MilpStatus::NodeLimit => Err(SolveError::IterationLimit {
            limit: options.max_nodes,
            message: result.message,
        }),
        MilpStatus::IterationLimit => Err(SolveError::IterationLimit {
            limit: options.lp_options.max_iter,
            message: result.message,
        }),
        MilpStatus::TimeLimit => Err(timed_out(options.time_limit)),
    }
}

/// Backend matching the requested integer strategy.
pub fn solver_for(strategy: IntegerStrategy, settings: &SolverSettings) -> Box<dyn LpSolver> {
    match strategy {
        IntegerStrategy::Round | IntegerStrategy::RoundAndRepair => {
            Box::new(SimplexSolver::from_settings(settings))
        }
        IntegerStrategy::BranchAndBound => Box::new(BranchAndBoundSolver::from_settings(settings)),
    }
}

fn lp_options(settings: &SolverSettings) -> LinProgOptions {
    LinProgOptions {
        max_iter: settings.max_iter,
        tol: settings.tol,
        time_limit: settings.time_limit,
        ..Default::default()
    }
}

fn rejected(err: OptimizeError) -> SolveError {
    SolveError::Numerical {
        message: err.to_string(),
    }
}

fn timed_out(limit: Option<std::time::Duration>) -> SolveError {
    SolveError::TimedOut {
        limit_ms: limit.map_or(0, |d| d.as_millis()),
    }
}
