//! Two-phase simplex method for linear programming.

#![allow(clippy::needless_range_loop)]

use std::time::{Duration, Instant};

use super::validate_constraints;
use crate::optimize::error::{OptimizeError, OptimizeResult};
use crate::optimize::utils::{ZERO_THRESHOLD, dot, norm_inf};

/// Phase-one residual allowed per unit of rhs scale, as a multiple of `tol`.
const FEASIBILITY_FACTOR: f64 = 1e3;

/// Consecutive degenerate pivots tolerated before pricing switches to Bland's rule.
const DEGENERATE_STREAK_LIMIT: usize = 25;

/// Options for linear programming solvers.
#[derive(Debug, Clone)]
pub struct LinProgOptions {
    /// Maximum number of pivots across both phases.
    pub max_iter: usize,
    /// Tolerance for optimality and pivot selection.
    pub tol: f64,
    /// Whether to equilibrate constraint rows before pivoting.
    pub presolve: bool,
    /// Wall-clock budget for the whole solve. `None` means no limit.
    pub time_limit: Option<Duration>,
}

impl Default for LinProgOptions {
    fn default() -> Self {
        Self {
            max_iter: 5000,
            tol: 1e-9,
            presolve: true,
            time_limit: None,
        }
    }
}

/// Linear constraints for LP problems.
#[derive(Debug, Clone, Default)]
pub struct LinearConstraints {
    /// Inequality constraint matrix (A_ub * x <= b_ub).
    pub a_ub: Option<Vec<Vec<f64>>>,
    /// Inequality constraint bounds.
    pub b_ub: Option<Vec<f64>>,
    /// Equality constraint matrix (A_eq * x == b_eq).
    pub a_eq: Option<Vec<Vec<f64>>>,
    /// Equality constraint bounds.
    pub b_eq: Option<Vec<f64>>,
    /// Variable bounds as (lower, upper) pairs. Lower bounds must be finite and >= 0;
    /// use f64::INFINITY for an unbounded upper side. Defaults to [0, inf).
    pub bounds: Option<Vec<(f64, f64)>>,
}

/// Terminal state of a simplex run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinProgStatus {
    Optimal,
    Infeasible,
    Unbounded,
    IterationLimit,
    TimeLimit,
}

impl LinProgStatus {
    /// Human-readable status message.
    pub fn message(self) -> &'static str {
        match self {
            Self::Optimal => "Optimal solution found",
            Self::Infeasible => "Problem is infeasible",
            Self::Unbounded => "Problem is unbounded",
            Self::IterationLimit => "Maximum iterations reached",
            Self::TimeLimit => "Time limit reached",
        }
    }
}

/// Result of linear programming optimization.
#[derive(Debug, Clone)]
pub struct LinProgResult {
    /// Optimal solution vector.
    pub x: Vec<f64>,
    /// Optimal objective value.
    pub fun: f64,
    /// Whether optimization succeeded.
    pub success: bool,
    /// Terminal status.
    pub status: LinProgStatus,
    /// Number of pivots performed.
    pub nit: usize,
    /// Status message.
    pub message: String,
    /// Slack of each inequality row, including rows generated from variable bounds.
    pub slack: Vec<f64>,
}

impl LinProgResult {
    fn failed(n: usize, status: LinProgStatus, nit: usize) -> Self {
        Self {
            x: vec![0.0; n],
            fun: if status == LinProgStatus::Unbounded {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            },
            success: false,
            status,
            nit,
            message: status.message().to_string(),
            slack: vec![],
        }
    }
}

/// Solve a linear programming problem using the two-phase simplex method.
///
/// Minimize: c^T * x
/// Subject to:
///   A_ub * x <= b_ub
///   A_eq * x == b_eq
///   bounds.0 <= x <= bounds.1
///
/// # Arguments
///
/// * `c` - Objective function coefficients (minimize c^T * x)
/// * `constraints` - Linear constraints (inequalities, equalities, bounds)
/// * `options` - Solver options
///
/// # Returns
///
/// * `LinProgResult` whose `status` tells whether `x` is optimal. Malformed
///   input is an `Err`; infeasible or unbounded problems are not.
pub fn linprog(
    c: &[f64],
    constraints: &LinearConstraints,
    options: &LinProgOptions,
) -> OptimizeResult<LinProgResult> {
    let n = c.len();
    if n == 0 {
        return Err(OptimizeError::InvalidInput {
            context: "linprog: empty objective vector".to_string(),
        });
    }
    if let Some(i) = c.iter().position(|v| !v.is_finite()) {
        return Err(OptimizeError::InvalidInput {
            context: format!("linprog: objective has non-finite entry at {}", i),
        });
    }
    if !(options.tol.is_finite() && options.tol > 0.0) {
        return Err(OptimizeError::InvalidParameter {
            parameter: "tol".to_string(),
            message: format!("must be a positive finite number, got {}", options.tol),
        });
    }

    validate_constraints(n, constraints)?;
    Ok(solve_two_phase(c, constraints, options))
}

/// Dense tableau: `n_rows` constraint rows followed by the objective row.
struct Tableau {
    cells: Vec<Vec<f64>>,
    basis: Vec<usize>,
    n_rows: usize,
    rhs: usize,
}

impl Tableau {
    /// Install `costs` as the objective row and price out the current basis.
    fn load_objective(&mut self, costs: &[f64]) {
        let obj = self.n_rows;
        for v in self.cells[obj].iter_mut() {
            *v = 0.0;
        }
        self.cells[obj][..costs.len()].copy_from_slice(costs);

        for i in 0..self.n_rows {
            let coef = self.cells[obj][self.basis[i]];
            if coef != 0.0 {
                for j in 0..=self.rhs {
                    self.cells[obj][j] -= coef * self.cells[i][j];
                }
            }
        }
    }

    /// Minimum ratio test; ties go to the smallest basic index (Bland).
    fn ratio_test(&self, col: usize, tol: f64) -> Option<usize> {
        let mut pivot_row: Option<usize> = None;
        let mut min_ratio = f64::INFINITY;
        for i in 0..self.n_rows {
            let aij = self.cells[i][col];
            if aij <= tol {
                continue;
            }
            let ratio = self.cells[i][self.rhs].max(0.0) / aij;
            let better = match pivot_row {
                None => true,
                Some(p) => {
                    ratio < min_ratio - tol
                        || (ratio <= min_ratio + tol && self.basis[i] < self.basis[p])
                }
            };
            if better {
                min_ratio = ratio;
                pivot_row = Some(i);
            }
        }
        pivot_row
    }

    fn pivot(&mut self, row: usize, col: usize) {
        let pivot_val = self.cells[row][col];
        for v in self.cells[row].iter_mut() {
            *v /= pivot_val;
        }
        let pivot_row = self.cells[row].clone();

        for (i, r) in self.cells.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = r[col];
            if factor != 0.0 {
                for (v, &p) in r.iter_mut().zip(pivot_row.iter()) {
                    *v -= factor * p;
                }
                r[col] = 0.0;
            }
        }
        self.basis[row] = col;
    }

    /// Pivot zero-level artificials out of the basis where a structural column allows it.
    /// Rows with no such column are redundant and keep their artificial at zero.
    fn evict_artificials(&mut self, first_art: usize, tol: f64) {
        for i in 0..self.n_rows {
            if self.basis[i] < first_art {
                continue;
            }
            if let Some(col) = (0..first_art).find(|&j| self.cells[i][j].abs() > tol) {
                self.pivot(i, col);
            }
        }
    }
}

/// Why a simplex phase stopped before reaching optimality.
enum Halt {
    Unbounded,
    IterationLimit,
    TimeLimit,
}

impl From<Halt> for LinProgStatus {
    fn from(halt: Halt) -> Self {
        match halt {
            Halt::Unbounded => Self::Unbounded,
            Halt::IterationLimit => Self::IterationLimit,
            Halt::TimeLimit => Self::TimeLimit,
        }
    }
}

/// Pivot counter and deadline shared by both phases.
struct SimplexRun<'a> {
    options: &'a LinProgOptions,
    deadline: Option<Instant>,
    nit: usize,
}

impl SimplexRun<'_> {
    /// Pivot until no column below `n_enter` has a negative reduced cost.
    fn iterate(&mut self, tab: &mut Tableau, n_enter: usize) -> Result<(), Halt> {
        let tol = self.options.tol;
        let mut degenerate_streak = 0usize;

        loop {
            let reduced = &tab.cells[tab.n_rows];
            let pivot_col = if degenerate_streak > DEGENERATE_STREAK_LIMIT {
                (0..n_enter).find(|&j| reduced[j] < -tol)
            } else {
                let mut best = None;
                let mut min_cost = -tol;
                for j in 0..n_enter {
                    if reduced[j] < min_cost {
                        min_cost = reduced[j];
                        best = Some(j);
                    }
                }
                best
            };

            let Some(pivot_col) = pivot_col else {
                return Ok(());
            };

            if self.nit >= self.options.max_iter {
                return Err(Halt::IterationLimit);
            }
            if let Some(deadline) = self.deadline {
                if Instant::now() >= deadline {
                    return Err(Halt::TimeLimit);
                }
            }

            let pivot_row = tab.ratio_test(pivot_col, tol).ok_or(Halt::Unbounded)?;
            if tab.cells[pivot_row][tab.rhs] <= tol {
                degenerate_streak += 1;
            } else {
                degenerate_streak = 0;
            }

            tab.pivot(pivot_row, pivot_col);
            self.nit += 1;
        }
    }
}

/// Build the standard form, run phase one (feasibility) and phase two (optimality).
///
/// Columns are laid out as `[x | slack | artificial | rhs]`. Rows with a negative
/// right-hand side are negated, which turns their slack coefficient to -1 and
/// requires an artificial; equality rows always carry one.
fn solve_two_phase(
    c: &[f64],
    constraints: &LinearConstraints,
    options: &LinProgOptions,
) -> LinProgResult {
    let n_orig = c.len();

    let bounds: Vec<(f64, f64)> = constraints
        .bounds
        .clone()
        .unwrap_or_else(|| vec![(0.0, f64::INFINITY); n_orig]);

    // Variable bounds become explicit rows: x_i <= ub_i and -x_i <= -lb_i
    let mut a_ub = constraints.a_ub.clone().unwrap_or_default();
    let mut b_ub = constraints.b_ub.clone().unwrap_or_default();
    for (i, &(lb, ub)) in bounds.iter().enumerate() {
        if ub.is_finite() {
            let mut row = vec![0.0; n_orig];
            row[i] = 1.0;
            a_ub.push(row);
            b_ub.push(ub);
        }
        if lb > 0.0 {
            let mut row = vec![0.0; n_orig];
            row[i] = -1.0;
            a_ub.push(row);
            b_ub.push(-lb);
        }
    }

    let a_eq = constraints.a_eq.as_deref().unwrap_or(&[]);
    let b_eq = constraints.b_eq.as_deref().unwrap_or(&[]);

    let n_ub = a_ub.len();
    let n_rows = n_ub + a_eq.len();
    if n_rows == 0 {
        return solve_unconstrained(c, &bounds);
    }

    let rows: Vec<(&[f64], f64)> = a_ub
        .iter()
        .map(Vec::as_slice)
        .zip(b_ub.iter().copied())
        .chain(a_eq.iter().map(Vec::as_slice).zip(b_eq.iter().copied()))
        .collect();

    let needs_artificial: Vec<bool> = rows
        .iter()
        .enumerate()
        .map(|(i, &(_, rhs))| i >= n_ub || rhs < 0.0)
        .collect();
    let n_art = needs_artificial.iter().filter(|&&a| a).count();
    let first_art = n_orig + n_ub;
    let n_total = first_art + n_art;

    let mut tab = Tableau {
        cells: vec![vec![0.0; n_total + 1]; n_rows + 1],
        basis: vec![0; n_rows],
        n_rows,
        rhs: n_total,
    };

    let mut art_col = first_art;
    for (i, &(row, rhs)) in rows.iter().enumerate() {
        let scale = if options.presolve {
            let m = norm_inf(row);
            if m > ZERO_THRESHOLD { m } else { 1.0 }
        } else {
            1.0
        };
        let mult = if rhs < 0.0 { -1.0 } else { 1.0 };

        for (j, &a) in row.iter().enumerate() {
            tab.cells[i][j] = mult * a / scale;
        }
        tab.cells[i][n_total] = mult * rhs / scale;

        if i < n_ub {
            tab.cells[i][n_orig + i] = mult;
        }
        if needs_artificial[i] {
            tab.cells[i][art_col] = 1.0;
            tab.basis[i] = art_col;
            art_col += 1;
        } else {
            tab.basis[i] = n_orig + i;
        }
    }

    let rhs_scale = 1.0 + (0..n_rows).map(|i| tab.cells[i][n_total]).fold(0.0, f64::max);
    let mut run = SimplexRun {
        options,
        deadline: options.time_limit.map(|limit| Instant::now() + limit),
        nit: 0,
    };

    // Phase one: minimize the sum of artificials
    if n_art > 0 {
        let mut costs = vec![0.0; n_total];
        for v in costs[first_art..].iter_mut() {
            *v = 1.0;
        }
        tab.load_objective(&costs);

        if let Err(halt) = run.iterate(&mut tab, n_total) {
            return LinProgResult::failed(n_orig, halt.into(), run.nit);
        }

        let infeasibility = -tab.cells[n_rows][n_total];
        if infeasibility > options.tol * FEASIBILITY_FACTOR * rhs_scale {
            let mut result = LinProgResult::failed(n_orig, LinProgStatus::Infeasible, run.nit);
            result.message = format!(
                "{} (phase one residual {:.3e})",
                LinProgStatus::Infeasible.message(),
                infeasibility
            );
            return result;
        }

        tab.evict_artificials(first_art, options.tol);
    }

    // Phase two: the real objective, artificials barred from entering
    let mut costs = vec![0.0; n_total];
    costs[..n_orig].copy_from_slice(c);
    tab.load_objective(&costs);

    if let Err(halt) = run.iterate(&mut tab, first_art) {
        return LinProgResult::failed(n_orig, halt.into(), run.nit);
    }

    let mut x = vec![0.0; n_orig];
    for (i, &bv) in tab.basis.iter().enumerate() {
        if bv < n_orig {
            x[bv] = tab.cells[i][n_total];
        }
    }

    // Apply bounds correction
    for i in 0..n_orig {
        x[i] = x[i].max(bounds[i].0);
        if bounds[i].1.is_finite() {
            x[i] = x[i].min(bounds[i].1);
        }
    }

    let slack: Vec<f64> = a_ub
        .iter()
        .zip(b_ub.iter())
        .map(|(row, &b)| (b - dot(row, &x)).max(0.0))
        .collect();

    LinProgResult {
        fun: dot(c, &x),
        x,
        success: true,
        status: LinProgStatus::Optimal,
        nit: run.nit,
        message: LinProgStatus::Optimal.message().to_string(),
        slack,
    }
}

/// Solve an LP with no rows: each variable sits at whichever bound its cost prefers.
fn solve_unconstrained(c: &[f64], bounds: &[(f64, f64)]) -> LinProgResult {
    let n_orig = c.len();
    let mut x = vec![0.0; n_orig];
    for i in 0..n_orig {
        if c[i] < 0.0 {
            if bounds[i].1.is_infinite() {
                return LinProgResult::failed(n_orig, LinProgStatus::Unbounded, 0);
            }
            x[i] = bounds[i].1;
        } else {
            x[i] = bounds[i].0;
        }
    }
    LinProgResult {
        fun: dot(c, &x),
        x,
        success: true,
        status: LinProgStatus::Optimal,
        nit: 0,
        message: LinProgStatus::Optimal.message().to_string(),
        slack: vec![],
    }
}
