//! LP formulation for one optimization unit.
//!
//! Decision variable `slots[i] >= 0` per entry (continuous relaxation).
//!
//! ```text
//! minimize    -sum(metric[i] * slots[i])
//! subject to   sum(price[i] * slots[i])  <=  budget          (1 row)
//!             -price[i] * slots[i]       <= -lower_bound[i]  (n rows)
//!              price[i] * slots[i]       <=  upper_bound[i]  (n rows)
//! ```
//!
//! Rows are always emitted in that order so diagnostics line up across runs.

use serde::Serialize;

use crate::bounds::BoundRecord;
use crate::catalog::ChannelEntry;
use crate::config::Metric;
use crate::optimize::LinearConstraints;

/// A set of entries solved together under one budget.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationUnit {
    /// Sales house id in per-group mode, `"campaign"` in global mode.
    pub name: String,
    pub budget: f64,
    pub metric: Metric,
    pub entries: Vec<ChannelEntry>,
}

/// What a constraint row encodes, by entry index within the unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "entry", rename_all = "snake_case")]
pub enum ConstraintRow {
    Budget,
    Lower(usize),
    Upper(usize),
}

/// Objective and constraint system ready for a solver.
#[derive(Debug, Clone)]
pub struct LpProblem {
    /// Minimization coefficients (negated metric).
    pub objective: Vec<f64>,
    /// Inequality rows; no equalities. Variable bounds are `[0, inf)`.
    pub constraints: LinearConstraints,
    /// One label per inequality row.
    pub rows: Vec<ConstraintRow>,
}

impl LpProblem {
    pub fn n_vars(&self) -> usize {
        self.objective.len()
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }
}

/// Build the LP for `unit` using the per-entry `bounds` (same order as the entries).
pub fn formulate(unit: &OptimizationUnit, bounds: &[BoundRecord]) -> LpProblem {
    debug_assert_eq!(unit.entries.len(), bounds.len());
    let n = unit.entries.len();

    let objective: Vec<f64> = unit.entries.iter().map(|e| -unit.metric.value(e)).collect();
    let prices: Vec<f64> = unit.entries.iter().map(|e| e.price).collect();

    let mut a_ub = Vec::with_capacity(2 * n + 1);
    let mut b_ub = Vec::with_capacity(2 * n + 1);
    let mut rows = Vec::with_capacity(2 * n + 1);

    a_ub.push(prices.clone());
    b_ub.push(unit.budget);
    rows.push(ConstraintRow::Budget);

    for (i, bound) in bounds.iter().enumerate() {
        let mut row = vec![0.0; n];
        row[i] = -prices[i];
        a_ub.push(row);
        b_ub.push(-bound.lower_bound);
        rows.push(ConstraintRow::Lower(i));
    }

    for (i, bound) in bounds.iter().enumerate() {
        let mut row = vec![0.0; n];
        row[i] = prices[i];
        a_ub.push(row);
        b_ub.push(bound.upper_bound);
        rows.push(ConstraintRow::Upper(i));
    }

    LpProblem {
        objective,
        constraints: LinearConstraints {
            a_ub: Some(a_ub),
            b_ub: Some(b_ub),
            a_eq: None,
            b_eq: None,
            bounds: Some(vec![(0.0, f64::INFINITY); n]),
        },
        rows,
    }
}
