//! Turning continuous LP solutions into slot plans and campaign totals.
//!
//! A unit's solution is rounded to whole slots with an explicit
//! [`RoundingPolicy`], optionally repaired, and re-priced. Rounding a relaxed
//! solution can break the budget or a corridor; such breaches are reported as
//! [`Violation`]s rather than hidden.

use serde::Serialize;
use tracing::warn;

use crate::bounds::BoundRecord;
use crate::config::{Metric, RoundingPolicy};
use crate::formulate::OptimizationUnit;
use crate::solver::LpSolution;

/// Relative slack allowed before a post-rounding breach is reported.
pub const VIOLATION_TOLERANCE: f64 = 1e-9;

/// Final plan for one channel entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelAllocation {
    pub unit: String,
    pub channel_id: String,
    pub sales_house_id: String,
    pub segment: String,
    pub price: f64,
    pub rating: f64,
    pub affinity: f64,
    pub baseline_spend: f64,
    /// Baseline share within the unit, as used for the corridor.
    pub unit_baseline_share_pct: f64,
    pub deviation: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Slot count before rounding.
    pub continuous_slots: f64,
    pub slots: u64,
    pub realized_spend: f64,
    pub realized_rating: f64,
    pub realized_affinity: f64,
    /// Share of the unit's realized spend.
    pub unit_spend_share_pct: f64,
    /// Share of the campaign's baseline spend (the standard split).
    pub baseline_share_pct: f64,
    /// Share of the campaign's realized spend (the optimized split).
    pub spend_share_pct: f64,
    /// Share of the campaign's realized rating.
    pub rating_share_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Budget,
    BelowLower,
    AboveUpper,
}

/// A constraint the rounded plan no longer satisfies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    /// `None` for the unit budget.
    pub channel_id: Option<String>,
    /// Size of the breach in currency.
    pub amount: f64,
}

/// Solved and rounded plan for one optimization unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitAllocation {
    pub unit: String,
    pub budget: f64,
    pub solver: String,
    pub iterations: usize,
    pub rows: Vec<ChannelAllocation>,
    pub baseline_spend: f64,
    pub realized_spend: f64,
    /// `sum(slots * metric)` for the unit's objective metric.
    pub objective_value: f64,
    pub total_rating: f64,
    pub total_affinity: f64,
    /// Whether the repair pass changed any slot count.
    pub repaired: bool,
    /// Slots come from an integer search that stopped before proving optimality.
    pub truncated: bool,
    pub violations: Vec<Violation>,
}

/// Totals over every solved unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CampaignTotals {
    pub baseline_spend: f64,
    pub realized_spend: f64,
    pub objective_value: f64,
    pub total_rating: f64,
    pub total_affinity: f64,
    pub slots: u64,
}

impl CampaignTotals {
    /// Fold one unit into the running totals.
    pub fn absorb(self, unit: &UnitAllocation) -> Self {
        Self {
            baseline_spend: self.baseline_spend + unit.baseline_spend,
            realized_spend: self.realized_spend + unit.realized_spend,
            objective_value: self.objective_value + unit.objective_value,
            total_rating: self.total_rating + unit.total_rating,
            total_affinity: self.total_affinity + unit.total_affinity,
            slots: self.slots + unit.rows.iter().map(|r| r.slots).sum::<u64>(),
        }
    }
}

/// Standard vs optimized split of one channel, for comparative charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitComparison {
    pub channel_id: String,
    pub sales_house_id: String,
    pub standard_share_pct: f64,
    pub optimized_share_pct: f64,
    pub slots: u64,
}

/// Round `value` with `policy`, clamping numerical noise below zero to zero.
pub fn round_slots(value: f64, policy: RoundingPolicy) -> u64 {
    let rounded = policy.round(value);
    if rounded.is_finite() && rounded > 0.0 {
        rounded as u64
    } else {
        0
    }
}

/// Build the unit plan from its solution.
///
/// With `repair` set, slot counts are stepped after rounding to bring the plan
/// back inside its corridors and budget where whole slots allow it.
pub fn allocate_unit(
    unit: &OptimizationUnit,
    bounds: &[BoundRecord],
    solution: &LpSolution,
    solver: &str,
    rounding: RoundingPolicy,
    repair: bool,
) -> UnitAllocation {
    let mut slots: Vec<u64> = solution
        .slots
        .iter()
        .map(|&x| round_slots(x, rounding))
        .collect();

    let repaired = repair && repair_slots(unit, bounds, &mut slots);

    let unit_realized: f64 = unit
        .entries
        .iter()
        .zip(&slots)
        .map(|(e, &s)| s as f64 * e.price)
        .sum();

    let rows: Vec<ChannelAllocation> = unit
        .entries
        .iter()
        .zip(bounds)
        .zip(solution.slots.iter().zip(&slots))
        .map(|((entry, bound), (&continuous, &count))| {
            let realized_spend = count as f64 * entry.price;
            ChannelAllocation {
                unit: unit.name.clone(),
                channel_id: entry.channel_id.clone(),
                sales_house_id: entry.sales_house_id.clone(),
                segment: entry.segment.clone(),
                price: entry.price,
                rating: entry.rating,
                affinity: entry.affinity,
                baseline_spend: entry.baseline_spend,
                unit_baseline_share_pct: bound.share_pct,
                deviation: bound.deviation,
                lower_bound: bound.lower_bound,
                upper_bound: bound.upper_bound,
                continuous_slots: continuous,
                slots: count,
                realized_spend,
                realized_rating: count as f64 * entry.rating,
                realized_affinity: count as f64 * entry.affinity,
                unit_spend_share_pct: percent(realized_spend, unit_realized),
                baseline_share_pct: 0.0,
                spend_share_pct: 0.0,
                rating_share_pct: 0.0,
            }
        })
        .collect();

    let violations = find_violations(unit, &rows);
    for v in &violations {
        warn!(
            unit = %unit.name,
            kind = ?v.kind,
            channel = v.channel_id.as_deref().unwrap_or("-"),
            amount = v.amount,
            "rounded plan breaches a constraint"
        );
    }

    let total_rating = rows.iter().map(|r| r.realized_rating).sum();
    let total_affinity = rows.iter().map(|r| r.realized_affinity).sum();

    UnitAllocation {
        unit: unit.name.clone(),
        budget: unit.budget,
        solver: solver.to_string(),
        iterations: solution.iterations,
        baseline_spend: rows.iter().map(|r| r.baseline_spend).sum(),
        realized_spend: unit_realized,
        objective_value: match unit.metric {
            Metric::Affinity => total_affinity,
            Metric::Rating => total_rating,
        },
        total_rating,
        total_affinity,
        repaired,
        truncated: solution.truncated,
        violations,
        rows,
    }
}

/// Totals over `units`, accumulated with [`CampaignTotals::absorb`].
pub fn campaign_totals<'a>(units: impl IntoIterator<Item = &'a UnitAllocation>) -> CampaignTotals {
    units
        .into_iter()
        .fold(CampaignTotals::default(), CampaignTotals::absorb)
}

/// Fill the campaign-wide share columns of `unit` once the totals are known.
pub fn apply_campaign_shares(unit: &mut UnitAllocation, totals: &CampaignTotals) {
    for row in &mut unit.rows {
        row.baseline_share_pct = percent(row.baseline_spend, totals.baseline_spend);
        row.spend_share_pct = percent(row.realized_spend, totals.realized_spend);
        row.rating_share_pct = percent(row.realized_rating, totals.total_rating);
    }
}

/// Standard vs optimized split rows across `units`.
pub fn comparison<'a>(units: impl IntoIterator<Item = &'a UnitAllocation>) -> Vec<SplitComparison> {
    units
        .into_iter()
        .flat_map(|u| u.rows.iter())
        .map(|r| SplitComparison {
            channel_id: r.channel_id.clone(),
            sales_house_id: r.sales_house_id.clone(),
            standard_share_pct: r.baseline_share_pct,
            optimized_share_pct: r.spend_share_pct,
            slots: r.slots,
        })
        .collect()
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

fn breach(value: f64, limit: f64) -> Option<f64> {
    let excess = value - limit;
    (excess > VIOLATION_TOLERANCE * (1.0 + limit.abs())).then_some(excess)
}

fn find_violations(unit: &OptimizationUnit, rows: &[ChannelAllocation]) -> Vec<Violation> {
    let mut violations = Vec::new();
    let spend: f64 = rows.iter().map(|r| r.realized_spend).sum();
    if let Some(amount) = breach(spend, unit.budget) {
        violations.push(Violation {
            kind: ViolationKind::Budget,
            channel_id: None,
            amount,
        });
    }
    for row in rows {
        if let Some(amount) = breach(row.lower_bound, row.realized_spend) {
            violations.push(Violation {
                kind: ViolationKind::BelowLower,
                channel_id: Some(row.channel_id.clone()),
                amount,
            });
        }
        if let Some(amount) = breach(row.realized_spend, row.upper_bound) {
            violations.push(Violation {
                kind: ViolationKind::AboveUpper,
                channel_id: Some(row.channel_id.clone()),
                amount,
            });
        }
    }
    violations
}

/// Step whole slots to restore corridors and budget. Returns whether anything changed.
///
/// 1. Entries above their upper bound drop slots until inside.
/// 2. While over budget, the entry with the lowest metric per currency that can
///    lose a slot without leaving its corridor drops one.
/// 3. Entries below their lower bound gain slots, best metric per currency
///    first, while their upper bound and the budget allow.
fn repair_slots(unit: &OptimizationUnit, bounds: &[BoundRecord], slots: &mut [u64]) -> bool {
    let entries = &unit.entries;
    let spend = |i: usize, s: u64| s as f64 * entries[i].price;
    let fits = |value: f64, limit: f64| breach(value, limit).is_none();
    let before = slots.to_vec();

    for i in 0..slots.len() {
        while slots[i] > 0 && !fits(spend(i, slots[i]), bounds[i].upper_bound) {
            slots[i] -= 1;
        }
    }

    let value_per_currency = |i: usize| unit.metric.value(&entries[i]) / entries[i].price;
    let mut by_value: Vec<usize> = (0..slots.len()).filter(|&i| entries[i].price > 0.0).collect();
    by_value.sort_by(|&a, &b| {
        value_per_currency(a)
            .total_cmp(&value_per_currency(b))
            .then(a.cmp(&b))
    });

    let total = |slots: &[u64]| -> f64 { (0..slots.len()).map(|i| spend(i, slots[i])).sum() };

    while !fits(total(slots), unit.budget) {
        let candidate = by_value
            .iter()
            .copied()
            .find(|&i| slots[i] > 0 && fits(bounds[i].lower_bound, spend(i, slots[i] - 1)));
        match candidate {
            Some(i) => slots[i] -= 1,
            None => break,
        }
    }

    for &i in by_value.iter().rev() {
        while !fits(bounds[i].lower_bound, spend(i, slots[i]))
            && fits(spend(i, slots[i] + 1), bounds[i].upper_bound)
            && fits(total(slots) + entries[i].price, unit.budget)
        {
            slots[i] += 1;
        }
    }

    slots[..] != before[..]
}
