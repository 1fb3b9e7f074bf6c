//! Variable labels
//!
//! Every selectable variable is shown to the user as one string carrying its
//! group, its name and its dimensions, e.g. `"file1/temp (time=12,lat=90)"`.
//! This module builds those labels and maps them back to a variable.

use crate::data_source::DatasetSource;
use crate::errors::{NcSliceError, Result};
use std::fmt;

/// Where a variable lives: the group index in a [`DatasetSource`] and the
/// bare variable name inside that group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableAddress {
    pub group: usize,
    pub name: String,
}

impl VariableAddress {
    pub fn new(group: usize, name: impl Into<String>) -> Self {
        Self {
            group,
            name: name.into(),
        }
    }
}

impl fmt::Display for VariableAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.group)
    }
}

/// `"(d1=l1,d2=l2,...)"`; `"()"` for scalars
pub fn dimension_signature<S: AsRef<str>>(dims: &[(S, usize)]) -> String {
    let parts: Vec<String> = dims
        .iter()
        .map(|(name, len)| format!("{}={len}", name.as_ref()))
        .collect();
    format!("({})", parts.join(","))
}

/// Build the label of a variable
///
/// `prefix` is the group prefix (`""` or `"group/"`) as returned by
/// [`DatasetSource::prefix`].
pub fn encode_label<S: AsRef<str>>(prefix: &str, name: &str, dims: &[(S, usize)]) -> String {
    format!("{prefix}{name} {}", dimension_signature(dims))
}

/// Split a label's name part into `(group, name)` at the last `/`
pub fn split_group_path(path: &str) -> (Option<&str>, &str) {
    match path.rsplit_once('/') {
        Some((group, name)) => (Some(group), name),
        None => (None, path),
    }
}

/// Text of a label before its dimension signature, trimmed
fn name_part(label: &str) -> &str {
    match label.rfind('(') {
        Some(i) => label[..i].trim(),
        None => label.trim(),
    }
}

/// Bare variable name of a label
///
/// The dimension signature and any group path are removed; a label without
/// a signature is taken as a name as a whole.
pub fn decode_label(label: &str) -> &str {
    split_group_path(name_part(label)).1
}

/// Find the variable a label refers to
///
/// A group path in the label selects that group. Without one, the first group
/// holding a variable of that name is used.
///
/// # Errors
///
/// Returns [`NcSliceError::GroupNotFound`] for an unknown group path and
/// [`NcSliceError::VariableNotFound`] if no group has the variable.
pub fn resolve_label(label: &str, source: &DatasetSource<'_>) -> Result<VariableAddress> {
    let (group, name) = split_group_path(name_part(label));
    let not_found = || NcSliceError::VariableNotFound {
        var: label.to_string(),
    };

    if let Some(group) = group {
        let index = source
            .groups()
            .iter()
            .position(|g| g == group)
            .ok_or_else(|| NcSliceError::GroupNotFound {
                group: group.to_string(),
            })?;
        return match source.handle(index) {
            Some(h) if h.contains(name) => Ok(VariableAddress::new(index, name)),
            _ => Err(not_found()),
        };
    }

    (0..source.len())
        .find(|&i| source.handle(i).is_some_and(|h| h.contains(name)))
        .map(|i| VariableAddress::new(i, name))
        .ok_or_else(not_found)
}
