//! Mixed-integer linear programming via branch-and-bound.

use std::time::{Duration, Instant};

use super::{LinProgOptions, LinProgStatus, LinearConstraints, linprog, validate_constraints};
use crate::optimize::error::{OptimizeError, OptimizeResult};
use crate::optimize::utils::dot;

/// Options for mixed-integer linear programming.
#[derive(Debug, Clone)]
pub struct MilpOptions {
    /// Maximum number of nodes to explore in branch-and-bound.
    pub max_nodes: usize,
    /// Tolerance for integer feasibility.
    pub int_tol: f64,
    /// Tolerance for optimality gap.
    pub gap_tol: f64,
    /// Wall-clock budget for the whole search, shared by every node LP.
    pub time_limit: Option<Duration>,
    /// Base LP solver options. Its `time_limit` is replaced by the remaining search budget.
    pub lp_options: LinProgOptions,
}

impl Default for MilpOptions {
    fn default() -> Self {
        Self {
            max_nodes: 10000,
            int_tol: 1e-6,
            gap_tol: 1e-4,
            time_limit: None,
            lp_options: LinProgOptions::default(),
        }
    }
}

/// Terminal state of a branch-and-bound search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilpStatus {
    /// Search completed; the incumbent is optimal.
    Optimal,
    /// Search was cut short but an integer incumbent exists; see [`MilpResult::stopped_by`].
    Feasible,
    /// The LP relaxation or every integer branch is infeasible.
    Infeasible,
    /// The LP relaxation is unbounded.
    Unbounded,
    /// Node budget exhausted without an incumbent.
    NodeLimit,
    /// A node LP hit its pivot budget before any incumbent was found.
    IterationLimit,
    /// Wall-clock budget exhausted without an incumbent.
    TimeLimit,
}

impl MilpStatus {
    /// Whether `x` holds an integer-feasible point.
    pub fn has_solution(self) -> bool {
        matches!(self, Self::Optimal | Self::Feasible)
    }
}

/// Result of mixed-integer linear programming.
#[derive(Debug, Clone)]
pub struct MilpResult {
    /// Best integer solution found.
    pub x: Vec<f64>,
    /// Objective value at `x`.
    pub fun: f64,
    /// Whether an integer solution was found.
    pub success: bool,
    /// Terminal status.
    pub status: MilpStatus,
    /// Number of nodes explored.
    pub nodes: usize,
    /// Optimality gap (incumbent - best open bound) / |incumbent|.
    ///
    /// Zero when the search completed, infinite when no bound is known.
    pub gap: f64,
    /// Limit that ended the search early, if any. Set together with
    /// [`MilpStatus::Feasible`] when an incumbent exists.
    pub stopped_by: Option<MilpStatus>,
    /// Status message.
    pub message: String,
}

/// Solve a mixed-integer linear programming problem using branch-and-bound.
///
/// # Arguments
///
/// * `c` - Objective function coefficients
/// * `constraints` - Linear constraints
/// * `integrality` - Which variables must be integer (true = integer, false = continuous)
/// * `options` - Solver options
///
/// # Returns
///
/// * `MilpResult` containing the best integer solution found
pub fn milp(
    c: &[f64],
    constraints: &LinearConstraints,
    integrality: &[bool],
    options: &MilpOptions,
) -> OptimizeResult<MilpResult> {
    let n = c.len();
    if n == 0 {
        return Err(OptimizeError::InvalidInput {
            context: "milp: empty objective vector".to_string(),
        });
    }

    if integrality.len() != n {
        return Err(OptimizeError::InvalidInput {
            context: format!(
                "milp: integrality has {} elements, expected {}",
                integrality.len(),
                n
            ),
        });
    }

    validate_constraints(n, constraints)?;
    branch_and_bound(c, constraints, integrality, options)
}

/// Node in the branch-and-bound tree.
#[derive(Clone)]
struct BnBNode {
    bounds: Vec<(f64, f64)>,
    lower_bound: f64,
}

/// Branch-and-bound solver for MILP.
fn branch_and_bound(
    c: &[f64],
    constraints: &LinearConstraints,
    integrality: &[bool],
    options: &MilpOptions,
) -> OptimizeResult<MilpResult> {
    let n = c.len();
    let deadline = options.time_limit.map(|limit| Instant::now() + limit);

    let base_bounds: Vec<(f64, f64)> = constraints
        .bounds
        .clone()
        .unwrap_or_else(|| vec![(0.0, f64::INFINITY); n]);

    let mut stack: Vec<BnBNode> = vec![BnBNode {
        bounds: base_bounds,
        lower_bound: f64::NEG_INFINITY,
    }];

    let mut best_solution: Option<Vec<f64>> = None;
    let mut best_objective = f64::INFINITY;
    let mut nodes_explored = 0;
    let mut root_status: Option<LinProgStatus> = None;
    let mut cut_short: Option<MilpStatus> = None;
    // Lowest relaxation bound among nodes dropped without being solved
    let mut unexplored_bound = f64::INFINITY;

    while let Some(node) = stack.pop() {
        if nodes_explored >= options.max_nodes {
            cut_short = Some(MilpStatus::NodeLimit);
            unexplored_bound = unexplored_bound.min(node.lower_bound);
            break;
        }
        nodes_explored += 1;

        if node.lower_bound >= best_objective - options.gap_tol {
            continue;
        }

        let mut lp_options = options.lp_options.clone();
        if let Some(deadline) = deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                cut_short = Some(MilpStatus::TimeLimit);
                unexplored_bound = unexplored_bound.min(node.lower_bound);
                break;
            }
            lp_options.time_limit = Some(remaining);
        }

        let node_constraints = LinearConstraints {
            bounds: Some(node.bounds.clone()),
            ..constraints.clone()
        };

        let lp_result = linprog(c, &node_constraints, &lp_options)?;
        root_status.get_or_insert(lp_result.status);

        match lp_result.status {
            LinProgStatus::Optimal => {}
            LinProgStatus::TimeLimit => {
                cut_short = Some(MilpStatus::TimeLimit);
                unexplored_bound = unexplored_bound.min(node.lower_bound);
                break;
            }
            LinProgStatus::IterationLimit => {
                cut_short.get_or_insert(MilpStatus::IterationLimit);
                unexplored_bound = unexplored_bound.min(node.lower_bound);
                continue;
            }
            LinProgStatus::Infeasible | LinProgStatus::Unbounded => continue,
        }

        if lp_result.fun >= best_objective - options.gap_tol {
            continue;
        }

        // Check integer feasibility and find branching variable
        let mut branch_var = None;
        let mut max_fractionality = options.int_tol;

        for (i, (&is_int, &xi)) in integrality.iter().zip(lp_result.x.iter()).enumerate() {
            if is_int {
                let frac = xi - xi.floor();
                let fractionality = frac.min(1.0 - frac);
                if fractionality > max_fractionality {
                    max_fractionality = fractionality;
                    branch_var = Some(i);
                }
            }
        }

        let Some(var) = branch_var else {
            if lp_result.fun < best_objective {
                best_objective = lp_result.fun;
                best_solution = Some(lp_result.x);
            }
            continue;
        };

        // Branch on the most fractional variable
        let xi = lp_result.x[var];

        // Left child: x[var] <= floor
        let mut left_bounds = node.bounds.clone();
        left_bounds[var].1 = left_bounds[var].1.min(xi.floor());
        if left_bounds[var].0 <= left_bounds[var].1 {
            stack.push(BnBNode {
                bounds: left_bounds,
                lower_bound: lp_result.fun,
            });
        }

        // Right child: x[var] >= ceil
        let mut right_bounds = node.bounds;
        right_bounds[var].0 = right_bounds[var].0.max(xi.ceil());
        if right_bounds[var].0 <= right_bounds[var].1 {
            stack.push(BnBNode {
                bounds: right_bounds,
                lower_bound: lp_result.fun,
            });
        }
    }

    match best_solution {
        Some(x) => {
            let x_rounded: Vec<f64> = x
                .iter()
                .zip(integrality.iter())
                .map(|(&xi, &is_int)| if is_int { xi.round() } else { xi })
                .collect();

            let fun = dot(&x_rounded, c);

            let status = match cut_short {
                Some(_) => MilpStatus::Feasible,
                None => MilpStatus::Optimal,
            };
            let gap = match cut_short {
                None => 0.0,
                Some(_) => {
                    let open_bound = stack
                        .iter()
                        .map(|node| node.lower_bound)
                        .fold(unexplored_bound, f64::min);
                    if open_bound.is_finite() {
                        ((fun - open_bound) / fun.abs().max(1e-10)).max(0.0)
                    } else {
                        f64::INFINITY
                    }
                }
            };

            Ok(MilpResult {
                x: x_rounded,
                fun,
                success: true,
                status,
                nodes: nodes_explored,
                gap,
                stopped_by: cut_short,
                message: match status {
                    MilpStatus::Optimal => "Optimal solution found".to_string(),
                    _ => "Search stopped early; returning best integer solution".to_string(),
                },
            })
        }
        None => {
            let status = match (cut_short, root_status) {
                (Some(limit), _) => limit,
                (None, Some(LinProgStatus::Unbounded)) => MilpStatus::Unbounded,
                _ => MilpStatus::Infeasible,
            };
            let message = match status {
                MilpStatus::NodeLimit => {
                    "Maximum nodes reached without finding feasible solution"
                }
                MilpStatus::TimeLimit => "Time limit reached without finding feasible solution",
                MilpStatus::IterationLimit => {
                    "LP relaxation hit the iteration limit without finding feasible solution"
                }
                MilpStatus::Unbounded => "LP relaxation is unbounded",
                _ => "No feasible integer solution found",
            };

            Ok(MilpResult {
                x: vec![0.0; n],
                fun: f64::INFINITY,
                success: false,
                status,
                nodes: nodes_explored,
                gap: f64::INFINITY,
                stopped_by: cut_short,
                message: message.to_string(),
            })
        }
    }
}
