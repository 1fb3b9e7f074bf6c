//! ncslice: variable addressing and slicing for NetCDF datasets
//!
//! A Rust library that turns one or more NetCDF files (or one file with
//! groups) into a catalog of selectable variables, and turns a catalog entry
//! plus one selector token per dimension into a rank-reduced, missing-value
//! clean array ready for plotting.
//!
//! ## Key Features
//!
//! - **Catalog**: unlimited dimension, time axis and latitude/longitude
//!   detection per group, with `"name (dim=len,...)"` labels
//! - **Time decoding**: CF units in the common calendars, packed `%Y%m%d`
//!   dates, decimal years, with a fallback chain that never fails
//! - **Slicing**: `all`, index or one of eight NaN-skipping reductions per
//!   dimension, reading only the selected hyperslab
//! - **Missing values**: type default, user override, `_FillValue` and
//!   `missing_value` are all honoured
//! - **Cyclic grids**: seamless global maps by appending a cyclic longitude
//!
//! ## Module Organization
//!
//! - [`data_source`]: the [`DatasetHandle`] trait and [`DatasetSource`]
//! - [`netcdf_io`]: NetCDF backend
//! - [`memory`]: in-memory backend
//! - [`catalog`]: catalog building
//! - [`calendar`]: calendar-aware time decoding
//! - [`label`]: catalog labels
//! - [`missing`]: missing value resolution
//! - [`selector`]: selector tokens and slice evaluation
//! - [`statistics`]: NaN-skipping reductions
//! - [`cyclic`]: cyclic grid stitching
//! - [`render`]: per-redraw render requests
//! - [`config`]: engine configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage Example
//! ```rust,no_run
//! use ncslice::prelude::*;
//!
//! let files = ncslice::open_files(&["data.nc"]).unwrap();
//! let entries = files.iter().map(ncslice::file_entry).collect::<Result<Vec<_>>>().unwrap();
//! let source = DatasetSource::from_files(entries).unwrap();
//! let catalog = ncslice::analyse(&source);
//!
//! // mean over time of the first level of temperature
//! let tokens = parse_tokens("mean,0,all,all").unwrap();
//! let slice = ncslice::read_slice(
//!     &source,
//!     &catalog,
//!     "temp (time=12,lev=3,lat=90,lon=180)",
//!     &tokens,
//!     &EngineConfig::default(),
//!     TimeView::DecimalYear,
//! )
//! .unwrap();
//! println!("{} {:?}", slice.label, slice.values.shape());
//! ```

// Core modules
pub mod calendar;
pub mod catalog;
pub mod config;
pub mod cyclic;
pub mod data_source;
pub mod errors;
pub mod label;
pub mod memory;
pub mod missing;
pub mod netcdf_io;
pub mod render;
pub mod selector;
pub mod statistics;

// Direct re-exports for the public API
pub use calendar::*;
pub use catalog::*;
pub use config::*;
pub use cyclic::*;
pub use data_source::*;
pub use errors::*;
pub use label::*;
pub use memory::*;
pub use missing::*;
pub use netcdf_io::*;
pub use render::*;
pub use selector::*;
pub use statistics::*;

// High-level convenience API
pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::catalog::{analyse, Catalog};
    pub use crate::config::{CyclicOptions, EngineConfig};
    pub use crate::data_source::{DatasetHandle, DatasetSource, VariableInfo};
    pub use crate::errors::{NcSliceError, Result};
    pub use crate::label::{decode_label, encode_label, resolve_label, VariableAddress};
    pub use crate::render::{read_slice, TimeView};
    pub use crate::selector::{parse_tokens, AxisSelector, Token};
    pub use crate::statistics::{ReduceOp, StatisticalReduction};
}
