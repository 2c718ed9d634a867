//! Split of the campaign budget across sales houses.
//!
//! Each sales house receives the part of the budget proportional to its share
//! of the campaign's baseline spend. Only used in per-group mode.

use serde::Serialize;

use crate::catalog::ChannelEntry;
use crate::error::DataError;

/// Unit name used in errors raised for the whole campaign.
pub const CAMPAIGN_UNIT: &str = "campaign";

/// Budget assigned to one sales house.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupBudget {
    pub sales_house_id: String,
    /// Sum of baseline spend over the sales house's entries.
    pub baseline_total: f64,
    /// `baseline_total / grand_total` as a percentage.
    pub share_pct: f64,
    pub budget: f64,
}

/// Allocate `total_budget` across the sales houses present in `entries`.
///
/// Groups come back in order of first appearance. The grand total is computed
/// once, before any group budget is derived.
pub fn allocate_group_budgets(
    total_budget: f64,
    entries: &[ChannelEntry],
) -> Result<Vec<GroupBudget>, DataError> {
    if entries.is_empty() {
        return Err(DataError::EmptyCatalog);
    }

    let mut groups: Vec<(String, f64)> = Vec::new();
    for entry in entries {
        match groups.iter_mut().find(|(sh, _)| *sh == entry.sales_house_id) {
            Some((_, total)) => *total += entry.baseline_spend,
            None => groups.push((entry.sales_house_id.clone(), entry.baseline_spend)),
        }
    }

    let grand_total: f64 = groups.iter().map(|(_, t)| t).sum();
    if !(grand_total > 0.0 && grand_total.is_finite()) {
        return Err(DataError::ZeroBaselineTotal {
            unit: CAMPAIGN_UNIT.to_string(),
        });
    }

    Ok(groups
        .into_iter()
        .map(|(sales_house_id, baseline_total)| GroupBudget {
            sales_house_id,
            baseline_total,
            share_pct: baseline_total / grand_total * 100.0,
            budget: baseline_total / grand_total * total_budget,
        })
        .collect())
}
