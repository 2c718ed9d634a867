//! In-crate LP backend.
//!
//! A small dense solver sized for media plans (tens of channels, a handful of
//! sales houses). It is only reached through [`crate::solver`], which maps its
//! statuses into [`crate::error::SolveError`].
//!
//! # Modules
//!
//! - [`linprog`] - Linear programming (two-phase simplex, branch-and-bound MILP)
//!
//! # Example
//!
//! ```ignore
//! use channel_split::optimize::{linprog, LinearConstraints, LinProgOptions};
//!
//! // Minimize -x - 2y subject to: x + y <= 4, x,y >= 0
//! let c = vec![-1.0, -2.0];
//! let constraints = LinearConstraints {
//!     a_ub: Some(vec![vec![1.0, 1.0]]),
//!     b_ub: Some(vec![4.0]),
//!     bounds: Some(vec![(0.0, f64::INFINITY), (0.0, f64::INFINITY)]),
//!     ..Default::default()
//! };
//! let result = linprog(&c, &constraints, &LinProgOptions::default())?;
//! ```

pub mod error;
pub mod linprog;
pub(crate) mod utils;

pub use error::{OptimizeError, OptimizeResult};
pub use linprog::{
    LinProgOptions, LinProgResult, LinProgStatus, LinearConstraints, MilpOptions, MilpResult,
    MilpStatus, linprog, milp,
};
