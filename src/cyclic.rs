//! Cyclic grid stitching
//!
//! Global fields on a periodic longitude axis leave a gap between the last
//! and the first column when drawn. Stitching appends a copy of the first
//! column (and a matching coordinate one period further) so rendering wraps
//! around. Grids that already carry the cyclic point are left alone.

use crate::config::CyclicOptions;
use crate::errors::{NcSliceError, Result};
use ndarray::{concatenate, ArrayD, Axis, Zip};

/// Result of [`add_cyclic`]
#[derive(Debug, Clone, PartialEq)]
pub struct CyclicOutput {
    pub data: ArrayD<f64>,
    pub x: Option<ArrayD<f64>>,
    pub y: Option<ArrayD<f64>>,
}

/// Resolve a possibly negative axis against a rank
fn normalize_axis(axis: isize, ndim: usize) -> Result<usize> {
    let resolved = if axis < 0 { axis + ndim as isize } else { axis };
    if resolved < 0 || resolved as usize >= ndim {
        return Err(NcSliceError::invalid(format!(
            "axis {axis} does not exist in an array of rank {ndim}"
        )));
    }
    Ok(resolved as usize)
}

/// Comparison axis of a coordinate array for data stitched along `data_axis`
fn coordinate_axis(coord: &ArrayD<f64>, data: &ArrayD<f64>, data_axis: usize) -> Result<usize> {
    if coord.ndim() == 0 {
        return Err(NcSliceError::invalid("coordinate array has no dimension"));
    }
    let axis = if coord.ndim() < data.ndim() {
        coord.ndim() - 1
    } else {
        data_axis
    };
    let (clen, dlen) = (coord.len_of(Axis(axis)), data.len_of(Axis(data_axis)));
    if clen != dlen {
        return Err(NcSliceError::invalid(format!(
            "coordinate length {clen} along axis {axis} does not match \
             data length {dlen} along axis {data_axis}"
        )));
    }
    Ok(axis)
}

/// Whether the first and last coordinates along `axis` coincide modulo `period`
///
/// Negative coordinates are shifted by one period first, so both `0..360`
/// and `-180..180` grids are recognised.
pub fn has_cyclic(x: &ArrayD<f64>, axis: usize, period: f64, tolerance: f64) -> bool {
    let len = x.len_of(Axis(axis));
    if len == 0 {
        return false;
    }
    let wrap = |v: f64| (if v < 0.0 { v + period } else { v }).rem_euclid(period);
    let first = x.index_axis(Axis(axis), 0);
    let last = x.index_axis(Axis(axis), len - 1);
    Zip::from(&first)
        .and(&last)
        .all(|&a, &b| (wrap(b) - wrap(a)).abs() < tolerance)
}

/// Append the first slice along `axis`
///
/// # Errors
///
/// Returns an error if the axis does not exist.
pub fn add_cyclic_data(data: &ArrayD<f64>, axis: usize) -> Result<ArrayD<f64>> {
    if axis >= data.ndim() || data.len_of(Axis(axis)) == 0 {
        return Err(NcSliceError::invalid(format!(
            "cannot add a cyclic point along axis {axis} of an array with shape {:?}",
            data.shape()
        )));
    }
    append_slice(data, axis, 0)
}

/// Append a copy of slice `index` along `axis`
fn append_slice(data: &ArrayD<f64>, axis: usize, index: usize) -> Result<ArrayD<f64>> {
    let copy = data.slice_axis(Axis(axis), (index..index + 1).into());
    Ok(concatenate(Axis(axis), &[data.view(), copy])?)
}

/// Append `first + period * sign(last - first)` along `axis`
fn add_cyclic_x(x: &ArrayD<f64>, axis: usize, period: f64) -> Result<ArrayD<f64>> {
    let len = x.len_of(Axis(axis));
    let first = x.slice_axis(Axis(axis), (0..1).into());
    let last = x.slice_axis(Axis(axis), (len - 1..len).into());
    let mut next = first.to_owned();
    Zip::from(&mut next).and(&last).for_each(|f, &l| {
        let diff = l - *f;
        // sign(0) is 0: a single-valued axis gets a duplicate
        let sign = if diff > 0.0 {
            1.0
        } else if diff < 0.0 {
            -1.0
        } else {
            0.0
        };
        *f += period * sign;
    });
    Ok(concatenate(Axis(axis), &[x.view(), next.view()])?)
}

/// Add a cyclic point to data and, optionally, its coordinates
///
/// Without `x`, the first data slice along the axis is appended
/// unconditionally. With `x`, nothing changes if `x` already ends one period
/// after it starts; otherwise data and `x` are extended, and an n-D `y` gets
/// its last slice appended as well. A 1-D `y` is returned unchanged.
///
/// Coordinates of lower rank than the data are compared along their last
/// axis, full-rank coordinates along the data axis.
///
/// # Errors
///
/// Returns [`NcSliceError::InvalidArgument`] if the axis does not exist or a
/// coordinate does not match the data along the stitched axis.
pub fn add_cyclic(
    data: &ArrayD<f64>,
    x: Option<&ArrayD<f64>>,
    y: Option<&ArrayD<f64>>,
    options: &CyclicOptions,
) -> Result<CyclicOutput> {
    let axis = normalize_axis(options.axis, data.ndim())?;
    let Some(x) = x else {
        return Ok(CyclicOutput {
            data: add_cyclic_data(data, axis)?,
            x: None,
            y: y.cloned(),
        });
    };

    let xaxis = coordinate_axis(x, data, axis)?;
    if has_cyclic(x, xaxis, options.period, options.tolerance) {
        return Ok(CyclicOutput {
            data: data.clone(),
            x: Some(x.clone()),
            y: y.cloned(),
        });
    }

    let out_data = add_cyclic_data(data, axis)?;
    let out_x = add_cyclic_x(x, xaxis, options.period)?;
    let out_y = match y {
        None => None,
        Some(y) if y.ndim() == 1 => Some(y.clone()),
        Some(y) => {
            let yaxis = coordinate_axis(y, data, axis)?;
            Some(append_slice(y, yaxis, y.len_of(Axis(yaxis)) - 1)?)
        }
    };
    Ok(CyclicOutput {
        data: out_data,
        x: Some(out_x),
        y: out_y,
    })
}
