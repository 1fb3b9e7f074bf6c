//! Centralized error handling for ncslice
//!
//! Catalog building never fails on bad metadata; the variants here surface
//! I/O problems and caller-side contract violations such as a selector that
//! was not rebuilt after the addressed variable changed.

use thiserror::Error;

/// Main error type for ncslice operations
#[derive(Debug, Error)]
pub enum NcSliceError {
    /// NetCDF file operation errors
    #[error("NetCDF error: {0}")]
    NetCDFError(#[from] netcdf::Error),

    /// I/O operation errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Variable not found in any active group
    #[error("Variable '{var}' not found")]
    VariableNotFound { var: String },

    /// Group or synthetic file name not part of the group list
    #[error("Group '{group}' not found")]
    GroupNotFound { group: String },

    /// Caller-side contract violation: selector rank, index range or
    /// array shapes that do not fit together
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Time units or calendar that could not be decoded
    #[error("Time decoding error: {0}")]
    TimeDecode(String),

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    ArrayError(#[from] ndarray::ShapeError),

    /// Generic error
    #[error("{0}")]
    Generic(String),
}

impl NcSliceError {
    /// Shorthand for [`NcSliceError::InvalidArgument`]
    pub fn invalid(message: impl Into<String>) -> Self {
        NcSliceError::InvalidArgument {
            message: message.into(),
        }
    }
}

impl From<String> for NcSliceError {
    fn from(error: String) -> Self {
        NcSliceError::Generic(error)
    }
}

impl From<&str> for NcSliceError {
    fn from(error: &str) -> Self {
        NcSliceError::Generic(error.to_string())
    }
}

/// Result type alias for ncslice operations
pub type Result<T> = std::result::Result<T, NcSliceError>;
