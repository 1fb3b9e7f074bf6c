//! Axis reductions
//!
//! The reductions a selector token can request on one dimension (mean, std,
//! min, max, ptp, sum, median, var). All of them skip invalid (NaN) entries;
//! a lane without any valid entry reduces to NaN.
//!
//! # Organization
//!
//! - [`operations`]: the [`ReduceOp`] vocabulary and the [`StatisticalReduction`] trait
//! - [`reductions`]: the NaN-skipping lane kernels

pub mod operations;
pub mod reductions;

pub use operations::{ReduceOp, StatisticalReduction};
pub use reductions::{reduce_axis, reduce_lane};
