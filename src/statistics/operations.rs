//! Reduction operations and traits

use crate::errors::{NcSliceError, Result};
use ndarray::ArrayD;
use std::fmt;
use std::str::FromStr;

/// Named reductions along one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    /// Arithmetic mean
    Mean,
    /// Population standard deviation
    Std,
    /// Minimum value
    Min,
    /// Maximum value
    Max,
    /// Peak to peak, `max - min`
    Ptp,
    /// Sum of values
    Sum,
    Median,
    /// Population variance
    Var,
}

impl ReduceOp {
    /// All reductions in the order they are offered to the user
    pub const ALL: [ReduceOp; 8] = [
        Self::Mean,
        Self::Std,
        Self::Min,
        Self::Max,
        Self::Ptp,
        Self::Sum,
        Self::Median,
        Self::Var,
    ];

    /// Get the token of the operation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Std => "std",
            Self::Min => "min",
            Self::Max => "max",
            Self::Ptp => "ptp",
            Self::Sum => "sum",
            Self::Median => "median",
            Self::Var => "var",
        }
    }
}

impl fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ReduceOp {
    type Err = NcSliceError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| NcSliceError::invalid(format!("unknown reduction '{s}'")))
    }
}

/// Trait for arrays that can be reduced along an axis
pub trait StatisticalReduction<T> {
    /// Perform a reduction along the specified axis, removing it
    ///
    /// # Errors
    ///
    /// Returns an error if the axis is out of bounds for the array.
    fn reduce_along_axis(&self, axis: usize, operation: ReduceOp) -> Result<ArrayD<T>>;
}

impl StatisticalReduction<f64> for ArrayD<f64> {
    fn reduce_along_axis(&self, axis: usize, operation: ReduceOp) -> Result<ArrayD<f64>> {
        if axis >= self.ndim() {
            return Err(NcSliceError::invalid(format!(
                "Axis {axis} is out of bounds for array with {} dimensions",
                self.ndim()
            )));
        }
        Ok(super::reductions::reduce_axis(self, axis, operation))
    }
}
