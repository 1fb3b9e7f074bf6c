//! Defines command-line interface options using `clap` for the ncslice inspector.

use clap::{Parser, ValueEnum};
use ncslice::{parse_tokens, EngineConfig, TimeView, Token};
use std::path::PathBuf;

/// Presentation of the synthetic time entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TimeArg {
    /// Decimal years
    Year,
    /// Calendar datetimes
    Date,
}

impl From<TimeArg> for TimeView {
    fn from(arg: TimeArg) -> Self {
        match arg {
            TimeArg::Year => TimeView::DecimalYear,
            TimeArg::Date => TimeView::Calendar,
        }
    }
}

/// Parsed `--select` argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub tokens: Vec<Token>,
}

/// A CLI tool for inspecting the variable catalog of NetCDF files and
/// evaluating slices of their variables
#[derive(Parser, Debug)]
#[command(
    version,
    name = "ncslice",
    about = "Catalog, slice and reduce variables of NetCDF files"
)]
pub struct Args {
    /// Path to a NetCDF file; repeat to open several files as groups
    #[arg(short, long = "file", required = true)]
    pub files: Vec<PathBuf>,

    /// Catalog label or bare name of the variable to slice
    #[arg(long)]
    pub var: Option<String>,

    /// One token per dimension, comma separated: all, an index, or one of
    /// mean, std, min, max, ptp, sum, median, var
    #[arg(long, value_parser = parse_select_arg)]
    pub select: Option<Selection>,

    /// Additional missing value applied to every variable
    #[arg(long, default_value_t = f64::NAN)]
    pub missing: f64,

    /// Add a cyclic point along the longitude of a map slice
    #[arg(long, default_value_t = false)]
    pub cyclic: bool,

    /// Presentation of the time entry
    #[arg(long, value_enum, default_value_t = TimeArg::Year)]
    pub time: TimeArg,

    /// Print the catalog as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::with_missing(self.missing)
    }
}

fn parse_select_arg(s: &str) -> Result<Selection, String> {
    parse_tokens(s)
        .map(|tokens| Selection { tokens })
        .map_err(|e| format!("Invalid format: expected 'token,token,...': {e}"))
}
