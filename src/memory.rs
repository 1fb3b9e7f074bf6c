//! In-memory datasets
//!
//! [`MemoryDataset`] implements [`DatasetHandle`] over arrays held in memory.
//! It is used for synthetic datasets and to exercise the engine without a
//! NetCDF file on disk.

use crate::data_source::{AttrValue, DatasetHandle, DimensionInfo, ElementType, FileEntry, VariableInfo};
use crate::errors::{NcSliceError, Result};
use ndarray::{ArrayD, IxDyn, Slice};
use std::collections::BTreeMap;
use std::ops::Range;

/// A dataset held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    dimensions: Vec<DimensionInfo>,
    variables: Vec<(VariableInfo, ArrayD<f64>)>,
    groups: Vec<(String, MemoryDataset)>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fixed-size dimension
    pub fn with_dimension(mut self, name: &str, length: usize) -> Self {
        self.dimensions.push(DimensionInfo::new(name, length));
        self
    }

    /// Add an unlimited (appendable) dimension with its current length
    pub fn with_unlimited_dimension(mut self, name: &str, length: usize) -> Self {
        self.dimensions.push(DimensionInfo::unlimited(name, length));
        self
    }

    /// Add a `f64` variable over previously declared dimensions
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is unknown or the value count does not
    /// match the dimension lengths.
    pub fn with_variable(
        self,
        name: &str,
        dims: &[&str],
        values: Vec<f64>,
        attributes: &[(&str, AttrValue)],
    ) -> Result<Self> {
        self.with_typed_variable(name, ElementType::F64, dims, values, attributes)
    }

    /// Add a variable with an explicit element type
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is unknown or the value count does not
    /// match the dimension lengths.
    pub fn with_typed_variable(
        mut self,
        name: &str,
        element_type: ElementType,
        dims: &[&str],
        values: Vec<f64>,
        attributes: &[(&str, AttrValue)],
    ) -> Result<Self> {
        let dimensions = dims
            .iter()
            .map(|d| {
                self.dimensions
                    .iter()
                    .find(|known| known.name == *d)
                    .cloned()
                    .ok_or_else(|| NcSliceError::invalid(format!("unknown dimension '{d}'")))
            })
            .collect::<Result<Vec<_>>>()?;
        let shape: Vec<usize> = dimensions.iter().map(|d| d.length).collect();
        let data = ArrayD::from_shape_vec(IxDyn(&shape), values)?;
        let attributes: BTreeMap<String, AttrValue> = attributes
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect();

        self.variables.push((
            VariableInfo {
                name: name.to_string(),
                element_type,
                dimensions,
                attributes,
            },
            data,
        ));
        Ok(self)
    }

    /// Add a nested group
    pub fn with_group(mut self, name: &str, group: MemoryDataset) -> Self {
        self.groups.push((name.to_string(), group));
        self
    }

    /// Borrow this dataset as a file entry for [`crate::DatasetSource::from_files`]
    pub fn entry(&self) -> FileEntry<'_> {
        FileEntry {
            root: Box::new(self),
            groups: self
                .groups
                .iter()
                .map(|(name, g)| (name.clone(), Box::new(g) as Box<dyn DatasetHandle + '_>))
                .collect(),
        }
    }
}

impl DatasetHandle for &MemoryDataset {
    fn dimensions(&self) -> Vec<DimensionInfo> {
        self.dimensions.clone()
    }

    fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|(v, _)| v.name.clone()).collect()
    }

    fn variable(&self, name: &str) -> Option<VariableInfo> {
        self.variables
            .iter()
            .find(|(v, _)| v.name == name)
            .map(|(v, _)| v.clone())
    }

    fn read(&self, name: &str, ranges: &[Range<usize>]) -> Result<ArrayD<f64>> {
        let (_, data) = self
            .variables
            .iter()
            .find(|(v, _)| v.name == name)
            .ok_or_else(|| NcSliceError::VariableNotFound {
                var: name.to_string(),
            })?;
        if ranges.len() != data.ndim() {
            return Err(NcSliceError::invalid(format!(
                "{} ranges given for variable '{name}' of rank {}",
                ranges.len(),
                data.ndim()
            )));
        }
        for (axis, (range, &len)) in ranges.iter().zip(data.shape()).enumerate() {
            if range.start > range.end || range.end > len {
                return Err(NcSliceError::invalid(format!(
                    "range {}..{} out of bounds for axis {axis} of '{name}' (length {len})",
                    range.start, range.end
                )));
            }
        }
        Ok(data
            .slice_each_axis(|ax| Slice::from(ranges[ax.axis.index()].clone()))
            .to_owned())
    }
}
