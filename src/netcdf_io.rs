//! NetCDF backend
//!
//! This module opens NetCDF files and exposes their groups through
//! [`DatasetHandle`], reading hyperslabs straight from the file so that only
//! the selected part of a variable is loaded.

use crate::data_source::{AttrValue, DatasetHandle, DimensionInfo, ElementType, FileEntry, VariableInfo};
use crate::errors::{NcSliceError, Result};
use ndarray::{ArrayD, IxDyn};
use netcdf::{AttributeValue, Extent, Extents, File, Group, Variable};
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, warn};

/// Open every file in `paths` read-only
///
/// # Errors
///
/// Returns an error if any file cannot be opened.
pub fn open_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<File>> {
    paths
        .iter()
        .map(|p| {
            let file = netcdf::open(p.as_ref())?;
            debug!(path = %p.as_ref().display(), "opened NetCDF file");
            Ok(file)
        })
        .collect()
}

/// Borrow an opened file as a root handle plus its first-level groups
///
/// # Errors
///
/// Returns an error if the group structure cannot be read.
pub fn file_entry(file: &File) -> Result<FileEntry<'_>> {
    let root = file
        .root()
        .ok_or_else(|| NcSliceError::Generic("file has no root group".to_string()))?;
    let groups = file
        .groups()?
        .map(|g| {
            let name = g.name();
            (name, Box::new(NcGroupHandle::new(g)) as Box<dyn DatasetHandle + '_>)
        })
        .collect();
    Ok(FileEntry {
        root: Box::new(NcGroupHandle::new(root)),
        groups,
    })
}

/// [`DatasetHandle`] over one NetCDF group (the root group for plain files)
pub struct NcGroupHandle<'f> {
    group: Group<'f>,
}

impl<'f> NcGroupHandle<'f> {
    pub fn new(group: Group<'f>) -> Self {
        Self { group }
    }

    fn nc_variable(&self, name: &str) -> Result<Variable<'_>> {
        self.group
            .variable(name)
            .ok_or_else(|| NcSliceError::VariableNotFound {
                var: name.to_string(),
            })
    }
}

impl DatasetHandle for NcGroupHandle<'_> {
    fn dimensions(&self) -> Vec<DimensionInfo> {
        self.group
            .dimensions()
            .map(|d| DimensionInfo {
                name: d.name(),
                length: d.len(),
                is_unlimited: d.is_unlimited(),
            })
            .collect()
    }

    fn variable_names(&self) -> Vec<String> {
        self.group.variables().map(|v| v.name()).collect()
    }

    fn variable(&self, name: &str) -> Option<VariableInfo> {
        self.group.variable(name).map(|v| variable_info(&v))
    }

    fn read(&self, name: &str, ranges: &[Range<usize>]) -> Result<ArrayD<f64>> {
        let var = self.nc_variable(name)?;
        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        if ranges.len() != shape.len() {
            return Err(NcSliceError::invalid(format!(
                "{} ranges given for variable '{name}' of rank {}",
                ranges.len(),
                shape.len()
            )));
        }
        if shape.is_empty() {
            let values: Vec<f64> = var.get_values::<f64, _>(..)?;
            return Ok(ArrayD::from_shape_vec(IxDyn(&[]), values)?);
        }

        let extents: Vec<Extent> = ranges.iter().map(|r| r.clone().into()).collect();
        let values: Vec<f64> = var.get_values::<f64, _>(Extents::from(extents))?;
        let out_shape: Vec<usize> = ranges.iter().map(|r| r.end - r.start).collect();
        Ok(ArrayD::from_shape_vec(IxDyn(&out_shape), values)?)
    }
}

/// Collect the metadata of a NetCDF variable
///
/// Attributes that cannot be read or converted are left out.
pub fn variable_info(var: &Variable) -> VariableInfo {
    let dimensions = var
        .dimensions()
        .iter()
        .map(|d| DimensionInfo {
            name: d.name(),
            length: d.len(),
            is_unlimited: d.is_unlimited(),
        })
        .collect();

    let mut attributes = BTreeMap::new();
    for attr in var.attributes() {
        match attr.value() {
            Ok(value) => {
                if let Some(v) = convert_attribute(value) {
                    attributes.insert(attr.name().to_string(), v);
                }
            }
            Err(e) => {
                warn!(variable = %var.name(), attribute = %attr.name(), "unreadable attribute: {e}");
            }
        }
    }

    VariableInfo {
        name: var.name(),
        element_type: ElementType::from_type_name(&format!("{:?}", var.vartype())),
        dimensions,
        attributes,
    }
}

fn numbers<T: Copy + Into<f64>>(values: &[T]) -> AttrValue {
    AttrValue::Numbers(values.iter().map(|&v| v.into()).collect())
}

/// Map a NetCDF attribute value onto [`AttrValue`]
#[allow(clippy::cast_precision_loss)]
pub fn convert_attribute(value: AttributeValue) -> Option<AttrValue> {
    let converted = match value {
        AttributeValue::Str(s) => AttrValue::Text(s),
        AttributeValue::Strs(ss) => AttrValue::Text(ss.join(" ")),
        AttributeValue::Uchar(v) => numbers(&[v]),
        AttributeValue::Uchars(v) => numbers(&v),
        AttributeValue::Schar(v) => numbers(&[v]),
        AttributeValue::Schars(v) => numbers(&v),
        AttributeValue::Ushort(v) => numbers(&[v]),
        AttributeValue::Ushorts(v) => numbers(&v),
        AttributeValue::Short(v) => numbers(&[v]),
        AttributeValue::Shorts(v) => numbers(&v),
        AttributeValue::Uint(v) => numbers(&[v]),
        AttributeValue::Uints(v) => numbers(&v),
        AttributeValue::Int(v) => numbers(&[v]),
        AttributeValue::Ints(v) => numbers(&v),
        AttributeValue::Ulonglong(v) => AttrValue::Numbers(vec![v as f64]),
        AttributeValue::Ulonglongs(v) => AttrValue::Numbers(v.iter().map(|&x| x as f64).collect()),
        AttributeValue::Longlong(v) => AttrValue::Numbers(vec![v as f64]),
        AttributeValue::Longlongs(v) => AttrValue::Numbers(v.iter().map(|&x| x as f64).collect()),
        AttributeValue::Float(v) => numbers(&[v]),
        AttributeValue::Floats(v) => numbers(&v),
        AttributeValue::Double(v) => AttrValue::Numbers(vec![v]),
        AttributeValue::Doubles(v) => AttrValue::Numbers(v),
        #[allow(unreachable_patterns)]
        _ => return None,
    };
    Some(converted)
}
