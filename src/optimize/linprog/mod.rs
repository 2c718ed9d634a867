//! Linear Programming algorithms.
//!
//! This module provides linear programming solvers including:
//! - `linprog` - Two-phase simplex method for linear programming
//! - `milp` - Mixed-integer linear programming via branch-and-bound
//!
//! # Linear Programming Problem
//!
//! Minimize: c^T * x
//! Subject to:
//!   A_ub * x <= b_ub  (inequality constraints)
//!   A_eq * x == b_eq  (equality constraints)
//!   lb <= x <= ub     (bounds, lb >= 0)
//!
//! # Example
//!
//! ```ignore
//! use channel_split::optimize::linprog::{linprog, LinearConstraints, LinProgOptions};
//!
//! // Minimize -x - 2y subject to:
//! //   x + y <= 4
//! //   x <= 2
//! //   y <= 3
//! //   x, y >= 0
//! let c = vec![-1.0, -2.0];
//! let constraints = LinearConstraints {
//!     a_ub: Some(vec![vec![1.0, 1.0], vec![1.0, 0.0], vec![0.0, 1.0]]),
//!     b_ub: Some(vec![4.0, 2.0, 3.0]),
//!     a_eq: None,
//!     b_eq: None,
//!     bounds: Some(vec![(0.0, f64::INFINITY), (0.0, f64::INFINITY)]),
//! };
//!
//! let result = linprog(&c, &constraints, &LinProgOptions::default())?;
//! // Optimal: x=1, y=3, objective=-7
//! ```

mod milp;
mod simplex;

pub use milp::{MilpOptions, MilpResult, MilpStatus, milp};
pub use simplex::{LinProgOptions, LinProgResult, LinProgStatus, LinearConstraints, linprog};

use super::error::{OptimizeError, OptimizeResult};

/// Validate constraint dimensions.
pub(crate) fn validate_constraints(
    n: usize,
    constraints: &LinearConstraints,
) -> OptimizeResult<()> {
    if let Some(ref a_ub) = constraints.a_ub {
        validate_rows("A_ub", n, a_ub)?;
        match constraints.b_ub {
            Some(ref b_ub) if b_ub.len() != a_ub.len() => {
                return Err(OptimizeError::InvalidInput {
                    context: format!(
                        "linprog: b_ub has {} elements, A_ub has {} rows",
                        b_ub.len(),
                        a_ub.len()
                    ),
                });
            }
            Some(ref b_ub) => validate_finite("b_ub", b_ub)?,
            None => {
                return Err(OptimizeError::InvalidInput {
                    context: "linprog: A_ub provided but b_ub is missing".to_string(),
                });
            }
        }
    }

    if let Some(ref a_eq) = constraints.a_eq {
        validate_rows("A_eq", n, a_eq)?;
        match constraints.b_eq {
            Some(ref b_eq) if b_eq.len() != a_eq.len() => {
                return Err(OptimizeError::InvalidInput {
                    context: format!(
                        "linprog: b_eq has {} elements, A_eq has {} rows",
                        b_eq.len(),
                        a_eq.len()
                    ),
                });
            }
            Some(ref b_eq) => validate_finite("b_eq", b_eq)?,
            None => {
                return Err(OptimizeError::InvalidInput {
                    context: "linprog: A_eq provided but b_eq is missing".to_string(),
                });
            }
        }
    }

    if let Some(ref bounds) = constraints.bounds {
        if bounds.len() != n {
            return Err(OptimizeError::InvalidInput {
                context: format!(
                    "linprog: bounds has {} elements, expected {}",
                    bounds.len(),
                    n
                ),
            });
        }
        for (i, &(lb, ub)) in bounds.iter().enumerate() {
            if lb > ub {
                return Err(OptimizeError::InvalidInterval {
                    a: lb,
                    b: ub,
                    context: format!("linprog: invalid bounds for variable {}", i),
                });
            }
            // Variables live in the non-negative orthant; only lb >= 0 is representable.
            if !lb.is_finite() || lb < 0.0 {
                return Err(OptimizeError::InvalidParameter {
                    parameter: format!("bounds[{}]", i),
                    message: format!("lower bound {} must be finite and non-negative", lb),
                });
            }
        }
    }

    Ok(())
}

fn validate_rows(name: &str, n: usize, rows: &[Vec<f64>]) -> OptimizeResult<()> {
    for (i, row) in rows.iter().enumerate() {
        if row.len() != n {
            return Err(OptimizeError::InvalidInput {
                context: format!(
                    "linprog: {} row {} has {} columns, expected {}",
                    name,
                    i,
                    row.len(),
                    n
                ),
            });
        }
        validate_finite(name, row)?;
    }
    Ok(())
}

fn validate_finite(name: &str, values: &[f64]) -> OptimizeResult<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(OptimizeError::InvalidInput {
            context: format!("linprog: {} has non-finite entry at {}", name, i),
        }),
        None => Ok(()),
    }
}
