//! channel-split - TV advertising budget split across channels and sales houses
//!
//! channel-split allocates a campaign budget over TV channels to maximize a
//! chosen metric (affinity or rating) while keeping each channel inside a spend
//! corridor around its standard (baseline) share. Each optimization unit is a
//! small linear program solved by the in-crate simplex backend.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   catalog    │──▶│    bounds    │──▶│    budget    │ (per-group mode)
//! │ join/resolve │   │  corridors   │   │ group shares │
//! └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                              │
//! ┌──────────────┐   ┌──────────────┐   ┌──────▼───────┐
//! │  aggregate   │◀──│    solver    │◀──│  formulate   │
//! │ round/totals │   │  LpSolver    │   │  LP per unit │
//! └──────────────┘   └──────┬───────┘   └──────────────┘
//!                           │ uses
//!                    ┌──────▼───────┐
//!                    │   optimize   │
//!                    │ simplex/milp │
//!                    └──────────────┘
//! ```
//!
//! # Modules
//!
//! - [`catalog`] - Standard and affinity tables, join, segment resolution
//! - [`bounds`] - Per-channel spend corridors
//! - [`budget`] - Campaign budget split across sales houses
//! - [`formulate`] - LP objective and constraint rows for one unit
//! - [`solver`] - `LpSolver` trait and backends
//! - [`aggregate`] - Rounding, repair, shares and campaign totals
//! - [`engine`] - Per-group and global runs with per-unit failure reporting
//! - [`config`] - Run parameters and the TOML campaign file
//! - [`optimize`] - Linear programming (two-phase simplex, branch-and-bound)
//!
//! # Example
//!
//! ```ignore
//! use channel_split::{CampaignFile, optimize_split};
//!
//! let (catalog, params) = CampaignFile::load("campaign.toml")?.into_run()?;
//! let report = optimize_split(&catalog, &params)?;
//! for row in report.allocations() {
//!     println!("{} {} slots", row.channel_id, row.slots);
//! }
//! ```

pub mod aggregate;
pub mod bounds;
pub mod budget;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod formulate;
pub mod optimize;
pub mod solver;

// Re-export main types for convenience
pub use aggregate::{
    CampaignTotals, ChannelAllocation, SplitComparison, UnitAllocation, Violation, ViolationKind,
};
pub use bounds::{BoundRecord, classify_deviation, compute_bounds};
pub use budget::{GroupBudget, allocate_group_budgets};
pub use catalog::{
    AffinityRecord, Catalog, ChannelEntry, SegmentMetrics, SegmentSelection, StandardRecord,
    resolve_segment,
};
pub use config::{
    CampaignFile, IntegerStrategy, Metric, OptimizationMode, RoundingPolicy, RunParams,
    SolverSettings,
};
pub use engine::{SplitReport, UnitFailure, UnitOutcome, optimize_split, optimize_split_with};
pub use error::{ConfigError, DataError, SolveError, SplitError, SplitResult};
pub use formulate::{ConstraintRow, LpProblem, OptimizationUnit, formulate};
pub use solver::{BranchAndBoundSolver, LpSolution, LpSolver, SimplexSolver, solver_for};
