//! Render requests
//!
//! [`read_slice`] is the one call a display layer makes per redraw: it turns
//! a catalog label and a selector into a clean array plus an axis label.
//! Nothing is cached between calls.

use crate::calendar::CalendarDateTime;
use crate::catalog::{Catalog, TimeAxis, TimeSeries};
use crate::config::EngineConfig;
use crate::cyclic::{add_cyclic, CyclicOutput};
use crate::data_source::{DatasetSource, ElementType, VariableInfo};
use crate::errors::{NcSliceError, Result};
use crate::label::{resolve_label, VariableAddress};
use crate::missing::{resolve_missing, substitute};
use crate::selector::{evaluate_slice_with, squeeze_for_display, Token};
use ndarray::{ArrayD, Axis, IxDyn, Slice};
use std::collections::BTreeMap;
use tracing::debug;

/// How the synthetic time entry is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeView {
    /// Decimal years, labelled `Year`
    #[default]
    DecimalYear,
    /// Datetimes, labelled `Date`
    Calendar,
}

/// Values of a rendered slice
#[derive(Debug, Clone, PartialEq)]
pub enum SliceValues {
    Numbers(ArrayD<f64>),
    /// `None` marks a missing datetime
    DateTimes(ArrayD<Option<CalendarDateTime>>),
}

impl SliceValues {
    pub fn shape(&self) -> &[usize] {
        match self {
            SliceValues::Numbers(a) => a.shape(),
            SliceValues::DateTimes(a) => a.shape(),
        }
    }

    pub fn as_numbers(&self) -> Option<&ArrayD<f64>> {
        match self {
            SliceValues::Numbers(a) => Some(a),
            SliceValues::DateTimes(_) => None,
        }
    }
}

/// Result of a render request
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSlice {
    pub address: VariableAddress,
    pub values: SliceValues,
    /// Axis label
    pub label: String,
}

/// Narrow an in-memory series with selector tokens; only `all` and indices
/// are defined on time values
fn select_time<T: Clone>(values: Vec<T>, shape: &[usize], tokens: &[Token]) -> Result<ArrayD<T>> {
    if tokens.len() != shape.len() {
        return Err(NcSliceError::invalid(format!(
            "{} selector tokens given for a time variable of rank {}",
            tokens.len(),
            shape.len()
        )));
    }
    let data = ArrayD::from_shape_vec(IxDyn(shape), values)?;
    let mut ranges = Vec::with_capacity(tokens.len());
    for ((axis, &len), token) in shape.iter().enumerate().zip(tokens) {
        let range = match *token {
            Token::All => 0..len,
            Token::Index(i) if i < len => i..i + 1,
            Token::Index(i) => {
                return Err(NcSliceError::invalid(format!(
                    "index {i} out of range for dimension {axis} of length {len}"
                )))
            }
            Token::Reduce(op) => {
                return Err(NcSliceError::invalid(format!(
                    "reduction '{op}' is not defined on datetimes"
                )))
            }
        };
        ranges.push(range);
    }
    let mut out = data
        .slice_each_axis(|ax| Slice::from(ranges[ax.axis.index()].clone()))
        .to_owned();
    for (axis, token) in tokens.iter().enumerate().rev() {
        if let Token::Index(_) = token {
            out = out.index_axis_move(Axis(axis), 0);
        }
    }
    Ok(out)
}

fn read_time(
    time: &TimeAxis,
    shape: &[usize],
    tokens: &[Token],
    override_value: f64,
    view: TimeView,
) -> Result<(SliceValues, String)> {
    let numbers = |values: &[f64], axis_label: &str| -> Result<(SliceValues, String)> {
        let values = select_time(values.to_vec(), shape, tokens)?;
        Ok((SliceValues::Numbers(squeeze_for_display(values, f64::NAN)), axis_label.to_string()))
    };
    match (view, &time.datetimes) {
        (TimeView::DecimalYear, _) => numbers(&time.decimal_years, "Year"),
        (TimeView::Calendar, TimeSeries::Numeric(values)) => numbers(values, "Date"),
        (TimeView::Calendar, series) => {
            let dates = select_time(series.to_calendar().unwrap_or_default(), shape, tokens)?;
            let info = VariableInfo {
                name: time.name.clone(),
                element_type: ElementType::DateTime,
                dimensions: Vec::new(),
                attributes: BTreeMap::new(),
            };
            let dates = substitute(dates, &resolve_missing(&info, override_value));
            Ok((SliceValues::DateTimes(squeeze_for_display(dates, None)), "Date".to_string()))
        }
    }
}

/// Read, clean and reduce the variable behind a catalog label
///
/// Missing values are replaced before any reduction. The synthetic time
/// entry yields the decoded time axis according to `view`.
///
/// # Errors
///
/// Returns an error if the label cannot be resolved, the tokens do not fit
/// the variable, or the read fails.
pub fn read_slice(
    source: &DatasetSource<'_>,
    catalog: &Catalog,
    label: &str,
    tokens: &[Token],
    config: &EngineConfig,
    view: TimeView,
) -> Result<RenderSlice> {
    if let Some((group, time)) = catalog.time_entry(label) {
        let handle = source
            .handle(group)
            .ok_or_else(|| NcSliceError::GroupNotFound {
                group: group.to_string(),
            })?;
        let info = handle
            .variable(&time.variable)
            .ok_or_else(|| NcSliceError::VariableNotFound {
                var: time.variable.clone(),
            })?;
        let (values, axis_label) = read_time(time, &info.shape(), tokens, config.missing_override, view)?;
        debug!(label, shape = ?values.shape(), "time slice read");
        return Ok(RenderSlice {
            address: VariableAddress::new(group, time.variable.clone()),
            values,
            label: axis_label,
        });
    }

    let address = resolve_label(label, source)?;
    let handle = source
        .handle(address.group)
        .ok_or_else(|| NcSliceError::GroupNotFound {
            group: address.group.to_string(),
        })?;
    let info = handle
        .variable(&address.name)
        .ok_or_else(|| NcSliceError::VariableNotFound {
            var: address.name.clone(),
        })?;
    let missing = resolve_missing(&info, config.missing_override);
    let values = evaluate_slice_with(handle, &address.name, tokens, &missing)?;
    debug!(label, shape = ?values.shape(), "slice read");
    Ok(RenderSlice {
        address,
        values: SliceValues::Numbers(values),
        label: info.axis_label(),
    })
}

fn read_coordinate(source: &DatasetSource<'_>, group: usize, name: &str, config: &EngineConfig) -> Result<ArrayD<f64>> {
    let handle = source
        .handle(group)
        .ok_or_else(|| NcSliceError::GroupNotFound {
            group: group.to_string(),
        })?;
    let info = handle
        .variable(name)
        .ok_or_else(|| NcSliceError::VariableNotFound { var: name.to_string() })?;
    let raw = handle.read_all(name)?;
    Ok(substitute(raw, &resolve_missing(&info, config.missing_override)))
}

/// Stitch a rendered map slice with its group's longitude and latitude
///
/// Without a detected longitude the first column is duplicated
/// unconditionally.
///
/// # Errors
///
/// Returns an error if the slice holds datetimes or the coordinates do not
/// fit the data.
pub fn cyclic_map(
    source: &DatasetSource<'_>,
    catalog: &Catalog,
    slice: &RenderSlice,
    config: &EngineConfig,
) -> Result<CyclicOutput> {
    let data = slice
        .values
        .as_numbers()
        .ok_or_else(|| NcSliceError::invalid("cannot add a cyclic point to datetimes"))?;
    let group = slice.address.group;
    let meta = catalog.group(group);
    let lon = meta
        .and_then(|g| g.lon.as_ref())
        .map(|c| read_coordinate(source, group, &c.variable, config))
        .transpose()?;
    let lat = meta
        .and_then(|g| g.lat.as_ref())
        .map(|c| read_coordinate(source, group, &c.variable, config))
        .transpose()?;
    add_cyclic(data, lon.as_ref(), lat.as_ref(), &config.cyclic)
}
