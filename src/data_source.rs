//! Dataset handle abstraction
//!
//! This module defines the uniform interface the engine reads datasets
//! through, plus [`DatasetSource`], which folds "one file", "several files"
//! and "one file with groups" into a single group-indexed view.

use crate::errors::{NcSliceError, Result};
use ndarray::ArrayD;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

/// Storage type of a variable's elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Char,
    String,
    /// Decoded calendar datetimes (only produced by the engine itself)
    DateTime,
    Unknown,
}

impl ElementType {
    /// Derive the element type from a type name as printed by the NetCDF
    /// bindings (`"int(i16)"`, `"float(f32)"`, `"short"`, `"double"`, ...).
    pub fn from_type_name(name: &str) -> Self {
        let name = name.to_lowercase();
        let has = |keys: &[&str]| keys.iter().any(|k| name.contains(k));

        if has(&["string"]) {
            ElementType::String
        } else if has(&["char"]) && !has(&["uchar", "schar"]) {
            ElementType::Char
        } else if has(&["f64", "double"]) {
            ElementType::F64
        } else if has(&["f32", "float"]) {
            ElementType::F32
        } else if has(&["u64", "ulonglong", "uint64"]) {
            ElementType::U64
        } else if has(&["i64", "longlong", "int64"]) {
            ElementType::I64
        } else if has(&["u32", "uint"]) {
            ElementType::U32
        } else if has(&["u16", "ushort"]) {
            ElementType::U16
        } else if has(&["i16", "short"]) {
            ElementType::I16
        } else if has(&["u8", "ubyte", "uchar"]) {
            ElementType::U8
        } else if has(&["i8", "byte", "schar"]) {
            ElementType::I8
        } else if has(&["i32", "int"]) {
            ElementType::I32
        } else {
            ElementType::Unknown
        }
    }

    /// Whether values of this type are calendar datetimes
    pub fn is_datetime(self) -> bool {
        self == ElementType::DateTime
    }
}

/// Attribute value, reduced to the two shapes the engine cares about
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Text(String),
    Numbers(Vec<f64>),
}

impl AttrValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s.as_str()),
            AttrValue::Numbers(_) => None,
        }
    }

    pub fn as_numbers(&self) -> Option<&[f64]> {
        match self {
            AttrValue::Numbers(v) => Some(v.as_slice()),
            AttrValue::Text(_) => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Numbers(vec![value])
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(values: Vec<f64>) -> Self {
        AttrValue::Numbers(values)
    }
}

/// Information about a dimension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

impl DimensionInfo {
    pub fn new(name: &str, length: usize) -> Self {
        Self {
            name: name.to_string(),
            length,
            is_unlimited: false,
        }
    }

    pub fn unlimited(name: &str, length: usize) -> Self {
        Self {
            name: name.to_string(),
            length,
            is_unlimited: true,
        }
    }
}

/// Structured metadata for a variable
#[derive(Debug, Clone, PartialEq)]
pub struct VariableInfo {
    pub name: String,
    pub element_type: ElementType,
    pub dimensions: Vec<DimensionInfo>,
    pub attributes: BTreeMap<String, AttrValue>,
}

impl VariableInfo {
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.dimensions.iter().map(|d| d.length).collect()
    }

    pub fn dim_names(&self) -> Vec<&str> {
        self.dimensions.iter().map(|d| d.name.as_str()).collect()
    }

    /// `(name, length)` pairs in storage order
    pub fn dim_pairs(&self) -> Vec<(String, usize)> {
        self.dimensions
            .iter()
            .map(|d| (d.name.clone(), d.length))
            .collect()
    }

    pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
        self.attributes.get(name)
    }

    pub fn text_attribute(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(AttrValue::as_text)
    }

    pub fn number_attribute(&self, name: &str) -> Option<&[f64]> {
        self.attribute(name).and_then(AttrValue::as_numbers)
    }

    /// `units` attribute or an empty string
    pub fn units(&self) -> &str {
        self.text_attribute("units").unwrap_or("")
    }

    /// `calendar` attribute, `"standard"` if absent
    pub fn calendar(&self) -> &str {
        self.text_attribute("calendar").unwrap_or("standard")
    }

    pub fn axis(&self) -> Option<&str> {
        self.text_attribute("axis")
    }

    /// First value of `_FillValue`
    pub fn fill_value(&self) -> Option<f64> {
        self.number_attribute("_FillValue")
            .and_then(|v| v.first().copied())
    }

    /// All values of `missing_value`; empty if absent
    pub fn missing_values(&self) -> &[f64] {
        self.number_attribute("missing_value").unwrap_or(&[])
    }

    /// `standard_name`, else `long_name`, else the variable name
    pub fn standard_name(&self) -> &str {
        self.text_attribute("standard_name")
            .or_else(|| self.text_attribute("long_name"))
            .unwrap_or(&self.name)
    }

    /// `long_name`, else `standard_name`, else the variable name, followed
    /// by the units in parentheses if there are any
    pub fn axis_label(&self) -> String {
        let name = self
            .text_attribute("long_name")
            .or_else(|| self.text_attribute("standard_name"))
            .unwrap_or(&self.name);
        match self.text_attribute("units") {
            Some(units) => format!("{name} ({units})"),
            None => name.to_string(),
        }
    }
}

/// Uniform read interface over an open array container
///
/// A handle is one namespace: a whole ungrouped file, or one group of a file.
/// The engine never closes handles.
pub trait DatasetHandle {
    /// Dimensions defined in this namespace, in storage order
    fn dimensions(&self) -> Vec<DimensionInfo>;

    /// Variable names in storage order
    fn variable_names(&self) -> Vec<String>;

    /// Metadata of one variable
    fn variable(&self, name: &str) -> Option<VariableInfo>;

    /// Read a hyperslab as `f64`, one range per dimension
    ///
    /// # Errors
    ///
    /// Returns an error if the variable does not exist, the ranges do not
    /// match its rank, or the underlying read fails.
    fn read(&self, name: &str, ranges: &[Range<usize>]) -> Result<ArrayD<f64>>;

    /// Metadata of all variables in storage order
    fn variables(&self) -> Vec<VariableInfo> {
        self.variable_names()
            .iter()
            .filter_map(|name| self.variable(name))
            .collect()
    }

    fn contains(&self, name: &str) -> bool {
        self.variable(name).is_some()
    }

    /// Read a complete variable
    fn read_all(&self, name: &str) -> Result<ArrayD<f64>> {
        let info = self
            .variable(name)
            .ok_or_else(|| NcSliceError::VariableNotFound {
                var: name.to_string(),
            })?;
        let ranges: Vec<Range<usize>> = info.dimensions.iter().map(|d| 0..d.length).collect();
        self.read(name, &ranges)
    }
}

/// One opened file: its root namespace and its (first level) groups
pub struct FileEntry<'a> {
    pub root: Box<dyn DatasetHandle + 'a>,
    pub groups: Vec<(String, Box<dyn DatasetHandle + 'a>)>,
}

impl<'a> FileEntry<'a> {
    pub fn new(root: Box<dyn DatasetHandle + 'a>) -> Self {
        Self {
            root,
            groups: Vec::new(),
        }
    }
}

/// All datasets opened together, addressed by group index
pub enum DatasetSource<'a> {
    /// One file without groups; the group list is empty
    SingleFile(Box<dyn DatasetHandle + 'a>),
    /// Several files, each a synthetic group named `file0`, `file1`, ...
    MultiFile(Vec<(String, Box<dyn DatasetHandle + 'a>)>),
    /// One file whose groups make up the group list
    GroupedFile(Vec<(String, Box<dyn DatasetHandle + 'a>)>),
}

impl fmt::Debug for DatasetSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            DatasetSource::SingleFile(_) => "SingleFile",
            DatasetSource::MultiFile(_) => "MultiFile",
            DatasetSource::GroupedFile(_) => "GroupedFile",
        };
        f.debug_struct("DatasetSource")
            .field("kind", &kind)
            .field("groups", &self.groups())
            .finish()
    }
}

/// Synthetic group name of file `index` out of `count`
pub fn synthetic_group_name(index: usize, count: usize) -> String {
    let width = (count as f64).log10().ceil().max(1.0) as usize;
    format!("file{index:0width$}")
}

impl<'a> DatasetSource<'a> {
    /// Combine opened files into one source
    ///
    /// # Errors
    ///
    /// Returns [`NcSliceError::InvalidArgument`] if no file is given, or if
    /// several files are given and one of them has groups.
    pub fn from_files(mut files: Vec<FileEntry<'a>>) -> Result<Self> {
        match files.len() {
            0 => Err(NcSliceError::invalid("no dataset given")),
            1 => {
                let entry = files.remove(0);
                if entry.groups.is_empty() {
                    Ok(DatasetSource::SingleFile(entry.root))
                } else {
                    Ok(DatasetSource::GroupedFile(entry.groups))
                }
            }
            count => {
                if let Some(i) = files.iter().position(|f| !f.groups.is_empty()) {
                    return Err(NcSliceError::invalid(format!(
                        "either multiple files or one file with groups allowed as input; \
                         multiple files given but file {i} has groups"
                    )));
                }
                let handles = files
                    .into_iter()
                    .enumerate()
                    .map(|(i, f)| (synthetic_group_name(i, count), f.root))
                    .collect();
                Ok(DatasetSource::MultiFile(handles))
            }
        }
    }

    /// Group list; empty for a single ungrouped file
    pub fn groups(&self) -> Vec<String> {
        match self {
            DatasetSource::SingleFile(_) => Vec::new(),
            DatasetSource::MultiFile(h) | DatasetSource::GroupedFile(h) => {
                h.iter().map(|(name, _)| name.clone()).collect()
            }
        }
    }

    /// Number of namespaces to scan; at least one
    pub fn len(&self) -> usize {
        match self {
            DatasetSource::SingleFile(_) => 1,
            DatasetSource::MultiFile(h) | DatasetSource::GroupedFile(h) => h.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handle of group `index`
    pub fn handle(&self, index: usize) -> Option<&(dyn DatasetHandle + 'a)> {
        match self {
            DatasetSource::SingleFile(h) if index == 0 => Some(h.as_ref()),
            DatasetSource::SingleFile(_) => None,
            DatasetSource::MultiFile(h) | DatasetSource::GroupedFile(h) => {
                h.get(index).map(|(_, handle)| handle.as_ref())
            }
        }
    }

    /// Label prefix of group `index`: `""` or `"name/"`
    pub fn prefix(&self, index: usize) -> String {
        match self {
            DatasetSource::SingleFile(_) => String::new(),
            DatasetSource::MultiFile(h) | DatasetSource::GroupedFile(h) => h
                .get(index)
                .map(|(name, _)| format!("{name}/"))
                .unwrap_or_default(),
        }
    }
}
