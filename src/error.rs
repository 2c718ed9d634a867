//! Error types for the channel split engine.
//!
//! Three families of failure exist and they are handled differently by the
//! engine:
//!
//! - [`DataError`] - the input tables cannot support the computation. Fatal to
//!   the run when it is a global precondition (empty catalog, unresolved
//!   segment), otherwise fatal to a single optimization unit.
//! - [`SolveError`] - the LP backend could not produce a solution for a unit.
//!   The unit is skipped and reported; the run continues.
//! - [`ConfigError`] - the driver supplied an invalid selector or parameter.
//!   Always fatal and always raised before any solving begins.

use thiserror::Error;

/// Result type for channel split operations.
pub type SplitResult<T> = Result<T, SplitError>;

/// Top-level error returned by the engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SplitError {
    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("solve error: {0}")]
    Solve(#[from] SolveError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl SplitError {
    /// Short machine-friendly label for reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Data(_) => "data",
            Self::Solve(_) => "solve",
            Self::Config(_) => "config",
        }
    }
}

/// Input tables are inconsistent or cannot support the computation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("catalog contains no channel entries")]
    EmptyCatalog,

    #[error("optimization unit '{unit}' has no channel entries")]
    EmptyUnit { unit: String },

    #[error("baseline spend of '{unit}' sums to zero; shares are undefined")]
    ZeroBaselineTotal { unit: String },

    #[error("no audience segment selected for sales house '{sales_house}'")]
    MissingSegmentSelection { sales_house: String },

    #[error("channel '{channel}' of '{sales_house}' has no data for segment '{segment}'")]
    UnknownSegment {
        channel: String,
        sales_house: String,
        segment: String,
    },

    #[error("channel '{channel}' of '{sales_house}' has no affinity row")]
    MissingAffinity { channel: String, sales_house: String },

    #[error("affinity row for channel '{channel}' of '{sales_house}' has no standard row")]
    MissingStandard { channel: String, sales_house: String },

    #[error("duplicate {table} row for channel '{channel}' of '{sales_house}'")]
    DuplicateEntry {
        table: &'static str,
        channel: String,
        sales_house: String,
    },

    #[error("channel '{channel}': {field} = {value} is not a finite non-negative number")]
    InvalidValue {
        channel: String,
        field: String,
        value: f64,
    },
}

/// The LP backend could not solve a unit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("problem is infeasible: {message}")]
    Infeasible { message: String },

    #[error("problem is unbounded: {message}")]
    Unbounded { message: String },

    #[error("iteration limit of {limit} reached: {message}")]
    IterationLimit { limit: usize, message: String },

    #[error("time limit of {limit_ms} ms exceeded")]
    TimedOut { limit_ms: u128 },

    #[error("numerical failure: {message}")]
    Numerical { message: String },
}

/// Invalid parameters supplied by the driver.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("unknown objective metric '{0}' (expected 'affinity' or 'rating')")]
    UnknownMetric(String),

    #[error("unknown optimization mode '{0}' (expected 'per_group' or 'global')")]
    UnknownMode(String),

    #[error("unknown integer strategy '{0}' (expected round, round_and_repair, branch_and_bound)")]
    UnknownIntegerStrategy(String),

    #[error("unknown rounding policy '{0}' (expected 'half_even' or 'half_up')")]
    UnknownRounding(String),

    #[error("total budget must be a positive finite number, got {0}")]
    InvalidBudget(f64),

    #[error("invalid solver setting '{parameter}': {message}")]
    InvalidSolverSetting { parameter: String, message: String },

    #[error("failed to read campaign file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("failed to parse campaign file '{path}': {message}")]
    Parse { path: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions_keep_kind() {
        let err: SplitError = DataError::EmptyCatalog.into();
        assert_eq!(err.kind(), "data");

        let err: SplitError = SolveError::TimedOut { limit_ms: 5 }.into();
        assert_eq!(err.kind(), "solve");

        let err: SplitError = ConfigError::UnknownMode("weekly".to_string()).into();
        assert_eq!(err.kind(), "config");
    }

    #[test]
    fn test_messages_name_the_offender() {
        let err = DataError::ZeroBaselineTotal {
            unit: "Space".to_string(),
        };
        assert!(err.to_string().contains("'Space'"));

        let err = SplitError::from(ConfigError::UnknownMetric("reach".to_string()));
        assert_eq!(
            err.to_string(),
            "config error: unknown objective metric 'reach' (expected 'affinity' or 'rating')"
        );
    }
}
