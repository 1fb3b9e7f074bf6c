//! Engine configuration
//!
//! Holds the few knobs the engine exposes: the user's extra missing value and
//! the parameters of the cyclic grid stitcher.

/// Options for [`crate::cyclic::add_cyclic`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CyclicOptions {
    /// Axis of the data array that carries the periodic coordinate;
    /// negative values count from the end
    pub axis: isize,
    /// Width of the periodic domain
    pub period: f64,
    /// Maximal difference between first and last coordinate that counts as
    /// an existing cyclic point
    pub tolerance: f64,
}

impl CyclicOptions {
    /// Create options for a given axis with the default period and tolerance
    pub fn along(axis: isize) -> Self {
        Self {
            axis,
            ..Self::default()
        }
    }

    /// Use a different period, e.g. `2π` for radians
    pub fn with_period(mut self, period: f64) -> Self {
        self.period = period;
        self
    }

    /// Use a different detection tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

impl Default for CyclicOptions {
    fn default() -> Self {
        Self {
            axis: -1,
            period: 360.0,
            tolerance: 1e-4,
        }
    }
}

/// Configuration shared by all render requests
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Global missing value added to every variable's candidate list
    /// (NaN means "no extra value")
    pub missing_override: f64,
    pub cyclic: CyclicOptions,
}

impl EngineConfig {
    /// Create a new configuration
    pub fn new(missing_override: f64, cyclic: CyclicOptions) -> Self {
        Self {
            missing_override,
            cyclic,
        }
    }

    /// Create a configuration with a specific missing-value override
    pub fn with_missing(missing_override: f64) -> Self {
        Self {
            missing_override,
            cyclic: CyclicOptions::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::with_missing(f64::NAN)
    }
}
