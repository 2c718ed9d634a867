//! Pipeline driver: catalog -> bounds -> budgets -> LP -> solver -> plan.
//!
//! Global preconditions (configuration, empty catalog, segment resolution, a
//! zero campaign baseline in per-group mode) abort the run with an error. Once
//! units exist, each one either solves or fails on its own; a failed unit is
//! recorded in the report and the remaining units still run.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{
    CampaignTotals, ChannelAllocation, SplitComparison, UnitAllocation, allocate_unit,
    apply_campaign_shares, campaign_totals, comparison,
};
use crate::bounds::compute_bounds;
use crate::budget::{CAMPAIGN_UNIT, GroupBudget, allocate_group_budgets};
use crate::catalog::{Catalog, ChannelEntry};
use crate::config::{IntegerStrategy, Metric, OptimizationMode, RoundingPolicy, RunParams};
use crate::error::{DataError, SplitError, SplitResult};
use crate::formulate::{OptimizationUnit, formulate};
use crate::solver::{LpSolver, solver_for};

/// A unit that could not be solved, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitFailure {
    pub unit: String,
    /// `"data"` or `"solve"`.
    pub kind: &'static str,
    pub message: String,
    #[serde(skip)]
    pub error: SplitError,
}

impl UnitFailure {
    fn new(unit: &str, error: SplitError) -> Self {
        Self {
            unit: unit.to_string(),
            kind: error.kind(),
            message: error.to_string(),
            error,
        }
    }
}

/// Result of one optimization unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitOutcome {
    Solved(UnitAllocation),
    Failed(UnitFailure),
}

impl UnitOutcome {
    pub fn unit(&self) -> &str {
        match self {
            Self::Solved(a) => &a.unit,
            Self::Failed(f) => &f.unit,
        }
    }

    pub fn allocation(&self) -> Option<&UnitAllocation> {
        match self {
            Self::Solved(a) => Some(a),
            Self::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&UnitFailure> {
        match self {
            Self::Solved(_) => None,
            Self::Failed(f) => Some(f),
        }
    }

    fn allocation_mut(&mut self) -> Option<&mut UnitAllocation> {
        match self {
            Self::Solved(a) => Some(a),
            Self::Failed(_) => None,
        }
    }
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitReport {
    pub mode: OptimizationMode,
    pub metric: Metric,
    pub integer_strategy: IntegerStrategy,
    pub rounding: RoundingPolicy,
    pub solver: String,
    pub total_budget: f64,
    /// Per-sales-house budgets; empty in global mode.
    pub group_budgets: Vec<GroupBudget>,
    /// One outcome per unit, in unit order.
    pub units: Vec<UnitOutcome>,
    /// Totals over solved units only.
    pub totals: CampaignTotals,
    /// Realized spend as a percentage of the total budget.
    pub budget_utilisation_pct: f64,
    pub comparison: Vec<SplitComparison>,
}

impl SplitReport {
    pub fn solved(&self) -> impl Iterator<Item = &UnitAllocation> {
        self.units.iter().filter_map(UnitOutcome::allocation)
    }

    pub fn failures(&self) -> impl Iterator<Item = &UnitFailure> {
        self.units.iter().filter_map(UnitOutcome::failure)
    }

    /// Allocation rows of every solved unit, in unit then entry order.
    pub fn allocations(&self) -> impl Iterator<Item = &ChannelAllocation> {
        self.solved().flat_map(|u| u.rows.iter())
    }

    /// Solved units whose integer search stopped before proving optimality.
    pub fn truncated(&self) -> impl Iterator<Item = &UnitAllocation> {
        self.solved().filter(|u| u.truncated)
    }

    /// Every unit solved, and solved to optimality.
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none() && self.truncated().next().is_none()
    }
}

/// Run the pipeline with the backend chosen by `params.integer_strategy`.
pub fn optimize_split(catalog: &Catalog, params: &RunParams) -> SplitResult<SplitReport> {
    params.validate()?;
    let solver = solver_for(params.integer_strategy, &params.solver);
    optimize_split_with(catalog, params, solver.as_ref())
}

/// Run the pipeline with an explicit backend.
///
/// # Errors
///
/// [`SplitError::Config`] for invalid parameters and [`SplitError::Data`] for
/// catalog-wide problems. Per-unit data and solve errors do not fail the run;
/// they are reported in [`SplitReport::units`].
pub fn optimize_split_with(
    catalog: &Catalog,
    params: &RunParams,
    solver: &dyn LpSolver,
) -> SplitResult<SplitReport> {
    params.validate()?;
    if catalog.is_empty() {
        return Err(DataError::EmptyCatalog.into());
    }

    let entries = catalog.resolve(&params.segments)?;
    let (units, group_budgets) = build_units(entries, params)?;
    info!(
        mode = %params.mode,
        metric = %params.metric,
        units = units.len(),
        solver = solver.name(),
        budget = params.total_budget,
        "optimizing channel split"
    );

    let repair = params.integer_strategy == IntegerStrategy::RoundAndRepair;
    let mut outcomes: Vec<UnitOutcome> = units
        .iter()
        .map(|unit| solve_unit(unit, params, solver, repair))
        .collect();

    let totals = campaign_totals(outcomes.iter().filter_map(UnitOutcome::allocation));
    for unit in outcomes.iter_mut().filter_map(UnitOutcome::allocation_mut) {
        apply_campaign_shares(unit, &totals);
    }
    let split = comparison(outcomes.iter().filter_map(UnitOutcome::allocation));

    let failed = outcomes.iter().filter(|o| o.failure().is_some()).count();
    if failed > 0 {
        warn!(failed, total = outcomes.len(), "some units were not solved");
    }

    Ok(SplitReport {
        mode: params.mode,
        metric: params.metric,
        integer_strategy: params.integer_strategy,
        rounding: params.rounding,
        solver: solver.name().to_string(),
        total_budget: params.total_budget,
        group_budgets,
        units: outcomes,
        budget_utilisation_pct: totals.realized_spend / params.total_budget * 100.0,
        totals,
        comparison: split,
    })
}

fn build_units(
    entries: Vec<ChannelEntry>,
    params: &RunParams,
) -> Result<(Vec<OptimizationUnit>, Vec<GroupBudget>), DataError> {
    match params.mode {
        OptimizationMode::Global => Ok((
            vec![OptimizationUnit {
                name: CAMPAIGN_UNIT.to_string(),
                budget: params.total_budget,
                metric: params.metric,
                entries,
            }],
            Vec::new(),
        )),
        OptimizationMode::PerGroup => {
            let groups = allocate_group_budgets(params.total_budget, &entries)?;
            let units = groups
                .iter()
                .map(|group| OptimizationUnit {
                    name: group.sales_house_id.clone(),
                    budget: group.budget,
                    metric: params.metric,
                    entries: entries
                        .iter()
                        .filter(|e| e.sales_house_id == group.sales_house_id)
                        .cloned()
                        .collect(),
                })
                .collect();
            Ok((units, groups))
        }
    }
}

fn solve_unit(
    unit: &OptimizationUnit,
    params: &RunParams,
    solver: &dyn LpSolver,
    repair: bool,
) -> UnitOutcome {
    match try_solve_unit(unit, params, solver, repair) {
        Ok(allocation) => {
            info!(
                unit = %unit.name,
                budget = unit.budget,
                spend = allocation.realized_spend,
                objective = allocation.objective_value,
                violations = allocation.violations.len(),
                "unit solved"
            );
            if allocation.truncated {
                warn!(unit = %unit.name, "integer search stopped early; plan may be suboptimal");
            }
            UnitOutcome::Solved(allocation)
        }
        Err(error) => {
            warn!(unit = %unit.name, error = %error, "unit skipped");
            UnitOutcome::Failed(UnitFailure::new(&unit.name, error))
        }
    }
}

fn try_solve_unit(
    unit: &OptimizationUnit,
    params: &RunParams,
    solver: &dyn LpSolver,
    repair: bool,
) -> SplitResult<UnitAllocation> {
    let bounds = compute_bounds(&unit.name, &unit.entries)?;
    let problem = formulate(unit, &bounds);
    debug!(
        unit = %unit.name,
        vars = problem.n_vars(),
        rows = problem.n_rows(),
        "formulated LP"
    );
    let solution = solver.solve(&problem)?;
    Ok(allocate_unit(
        unit,
        &bounds,
        &solution,
        solver.name(),
        params.rounding,
        repair,
    ))
}
