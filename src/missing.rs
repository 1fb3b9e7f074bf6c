//! Missing value resolution
//!
//! A variable's missing values come from several places: the default fill
//! value of its storage type, a global user override, its `_FillValue`
//! attribute and its `missing_value` attribute. Any element equal to any of
//! them is replaced by an invalid value before display or reduction.

use crate::calendar::CalendarDateTime;
use crate::data_source::{ElementType, VariableInfo};
use ndarray::ArrayD;

/// One missing-value candidate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MissingValue {
    Number(f64),
    /// "Not a time", the missing sentinel of datetime arrays
    NotATime,
}

/// Default fill value of the NetCDF library for an element type
///
/// `None` for types without a numeric default.
#[allow(clippy::cast_precision_loss)]
pub fn default_fill(element_type: ElementType) -> Option<MissingValue> {
    let fill = match element_type {
        ElementType::I8 => -127.0,
        ElementType::U8 => 255.0,
        ElementType::I16 => -32767.0,
        ElementType::U16 => 65535.0,
        ElementType::I32 => -2_147_483_647.0,
        ElementType::U32 => 4_294_967_295.0,
        ElementType::I64 => -9_223_372_036_854_775_806_i64 as f64,
        ElementType::U64 => 18_446_744_073_709_551_614_u64 as f64,
        // the f32 fill as stored, widened
        ElementType::F32 => f64::from(9.969_209_968_386_869e36_f32),
        ElementType::F64 => 9.969_209_968_386_869e36,
        ElementType::String => f64::NAN,
        ElementType::DateTime => return Some(MissingValue::NotATime),
        ElementType::Char | ElementType::Unknown => return None,
    };
    Some(MissingValue::Number(fill))
}

/// Ordered missing-value candidates of a variable
///
/// The order is: type default, `override_value` (left out for datetime
/// variables), `_FillValue`, every entry of `missing_value`.
pub fn resolve_missing(var: &VariableInfo, override_value: f64) -> Vec<MissingValue> {
    let mut candidates = Vec::new();
    if let Some(fill) = default_fill(var.element_type) {
        candidates.push(fill);
    }
    if !var.element_type.is_datetime() {
        candidates.push(MissingValue::Number(override_value));
    }
    if let Some(fill) = var.fill_value() {
        candidates.push(MissingValue::Number(fill));
    }
    candidates.extend(var.missing_values().iter().map(|&v| MissingValue::Number(v)));
    candidates
}

/// Element types that have an invalid value to substitute
pub trait Substitute: Clone {
    /// The invalid value of this type
    fn invalid() -> Self;

    /// Exact equality with a candidate
    fn is_candidate(&self, candidate: &MissingValue) -> bool;
}

impl Substitute for f64 {
    fn invalid() -> Self {
        f64::NAN
    }

    #[allow(clippy::float_cmp)]
    fn is_candidate(&self, candidate: &MissingValue) -> bool {
        match candidate {
            MissingValue::Number(v) => self == v,
            MissingValue::NotATime => false,
        }
    }
}

/// Datetime elements; `None` is "not a time"
impl Substitute for Option<CalendarDateTime> {
    fn invalid() -> Self {
        None
    }

    fn is_candidate(&self, candidate: &MissingValue) -> bool {
        matches!(candidate, MissingValue::NotATime) && self.is_none()
    }
}

/// Replace every element equal to any candidate with the invalid value
pub fn substitute<T: Substitute>(mut values: ArrayD<T>, candidates: &[MissingValue]) -> ArrayD<T> {
    if candidates.is_empty() {
        return values;
    }
    values.mapv_inplace(|v| {
        if candidates.iter().any(|c| v.is_candidate(c)) {
            T::invalid()
        } else {
            v
        }
    });
    values
}
