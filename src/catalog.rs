//! Dataset catalog
//!
//! [`analyse`] scans every group of a [`DatasetSource`] once and records
//! what the rest of the engine needs: the unlimited dimension, the time axis
//! with its decoded datetimes, the latitude and longitude variables, and the
//! list of selectable variable labels.
//!
//! Building a catalog never fails. Metadata that is absent or cannot be
//! decoded is defaulted or left out, with a diagnostic where it matters.

use crate::calendar::{decimal_years, decode_packed_series, decode_series, is_packed_date_units, CalendarDateTime};
use crate::data_source::{DatasetHandle, DatasetSource, VariableInfo};
use crate::errors::Result;
use crate::label::encode_label;
use crate::missing::{resolve_missing, substitute};
use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

/// How the datetime series of a time axis was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// Real-world datetimes
    Absolute,
    /// Datetimes in the variable's own calendar
    CalendarNative,
    /// The undecoded numbers
    Raw,
}

/// Datetime series of a time axis
#[derive(Debug, Clone, PartialEq)]
pub enum TimeSeries {
    Absolute(Vec<Option<NaiveDateTime>>),
    Calendar(Vec<Option<CalendarDateTime>>),
    /// Decimal years or raw values
    Numeric(Vec<f64>),
}

impl TimeSeries {
    pub fn len(&self) -> usize {
        match self {
            TimeSeries::Absolute(v) => v.len(),
            TimeSeries::Calendar(v) => v.len(),
            TimeSeries::Numeric(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Calendar datetimes, if the series holds datetimes at all
    pub fn to_calendar(&self) -> Option<Vec<Option<CalendarDateTime>>> {
        match self {
            TimeSeries::Absolute(v) => Some(v.iter().map(|d| d.map(CalendarDateTime::from_naive)).collect()),
            TimeSeries::Calendar(v) => Some(v.clone()),
            TimeSeries::Numeric(_) => None,
        }
    }
}

/// Decoded time axis of one group
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    /// Name of the time variable in its group
    pub variable: String,
    /// Name of the synthetic catalog entry, `datetime` or `date`
    pub name: String,
    /// Catalog label of the synthetic entry
    pub label: String,
    pub units: String,
    pub calendar: String,
    pub strategy: DecodeStrategy,
    pub datetimes: TimeSeries,
    pub decimal_years: Vec<f64>,
}

/// A detected latitude or longitude variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinateVar {
    pub variable: String,
    /// Dimension the coordinate runs along
    pub dimension: String,
    pub label: String,
}

/// Per-group results of the scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupCatalog {
    /// Label prefix, `""` or `"group/"`
    pub prefix: String,
    /// Name of the unlimited dimension, `""` if there is none
    pub unlimited: String,
    pub time: Option<TimeAxis>,
    pub lat: Option<CoordinateVar>,
    pub lon: Option<CoordinateVar>,
}

impl GroupCatalog {
    /// Latitude dimension name, `""` if no latitude was found
    pub fn lat_dim(&self) -> &str {
        self.lat.as_ref().map_or("", |c| c.dimension.as_str())
    }

    /// Longitude dimension name, `""` if no longitude was found
    pub fn lon_dim(&self) -> &str {
        self.lon.as_ref().map_or("", |c| c.dimension.as_str())
    }
}

/// Everything the engine knows about the opened datasets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    /// Group list; empty for a single ungrouped file
    pub groups: Vec<String>,
    pub group_meta: Vec<GroupCatalog>,
    /// Selectable labels: per group the time entry first, then the
    /// variables in lexicographic order
    pub entries: Vec<String>,
    /// Highest variable rank over all groups
    pub maxdim: usize,
}

impl Catalog {
    pub fn group(&self, index: usize) -> Option<&GroupCatalog> {
        self.group_meta.get(index)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.iter().any(|e| e == label)
    }

    /// The time axis a label refers to, if it is a synthetic time entry
    pub fn time_entry(&self, label: &str) -> Option<(usize, &TimeAxis)> {
        let name_part = label.rfind('(').map_or(label, |i| &label[..i]).trim();
        self.group_meta.iter().enumerate().find_map(|(i, g)| {
            g.time
                .as_ref()
                .filter(|t| format!("{}{}", g.prefix, t.name) == name_part)
                .map(|t| (i, t))
        })
    }
}

/// Which of the two horizontal coordinates to look for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordAxis {
    Lat,
    Lon,
}

impl CoordAxis {
    fn keyword(self) -> &'static str {
        match self {
            CoordAxis::Lat => "lat",
            CoordAxis::Lon => "lon",
        }
    }

    fn long_name(self) -> &'static str {
        match self {
            CoordAxis::Lat => "latitude",
            CoordAxis::Lon => "longitude",
        }
    }

    fn cf_unit(self) -> &'static str {
        match self {
            CoordAxis::Lat => "degrees_north",
            CoordAxis::Lon => "degrees_east",
        }
    }

    fn axis_attribute(self) -> &'static str {
        match self {
            CoordAxis::Lat => "y",
            CoordAxis::Lon => "x",
        }
    }
}

/// Unit a sweep accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitRule {
    /// `degrees_north` / `degrees_east`
    Directional,
    /// plain `degrees`
    Degrees,
}

/// One pass over all variables looking for a coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sweep {
    /// Standard name (or long name, or name) is `latitude`/`longitude`
    StandardName(UnitRule),
    /// Name starts with `lat`/`lon`
    NamePrefix(UnitRule),
    /// Name contains `lat`/`lon`
    NameContains(UnitRule),
    /// `axis` attribute is `Y`/`X`
    AxisAttribute,
}

/// Sweeps in order of precedence
pub const SWEEPS: [Sweep; 7] = [
    Sweep::StandardName(UnitRule::Directional),
    Sweep::NamePrefix(UnitRule::Directional),
    Sweep::NameContains(UnitRule::Directional),
    Sweep::AxisAttribute,
    Sweep::StandardName(UnitRule::Degrees),
    Sweep::NamePrefix(UnitRule::Degrees),
    Sweep::NameContains(UnitRule::Degrees),
];

impl Sweep {
    /// Whether `var` qualifies as the coordinate `axis` in this sweep
    pub fn matches(self, var: &VariableInfo, axis: CoordAxis) -> bool {
        let unit_ok = |rule: UnitRule| {
            let units = var.units().to_lowercase();
            match rule {
                UnitRule::Directional => units == axis.cf_unit(),
                UnitRule::Degrees => units == "degrees",
            }
        };
        let name = var.name.to_lowercase();
        match self {
            Sweep::StandardName(rule) => {
                var.standard_name().to_lowercase() == axis.long_name() && unit_ok(rule)
            }
            Sweep::NamePrefix(rule) => name.starts_with(axis.keyword()) && unit_ok(rule),
            Sweep::NameContains(rule) => name.contains(axis.keyword()) && unit_ok(rule),
            Sweep::AxisAttribute => var
                .axis()
                .is_some_and(|a| a.to_lowercase() == axis.axis_attribute()),
        }
    }
}

/// First variable matched by the first successful sweep
pub fn detect_coordinate(variables: &[VariableInfo], axis: CoordAxis) -> Option<(Sweep, &VariableInfo)> {
    SWEEPS.iter().find_map(|sweep| {
        variables
            .iter()
            .find(|v| sweep.matches(v, axis))
            .map(|v| (*sweep, v))
    })
}

/// Whether a variable is the time variable of its group
pub fn is_time_variable(name: &str, unlimited: &str) -> bool {
    let lower = name.to_lowercase();
    (!unlimited.is_empty() && lower == unlimited.to_lowercase())
        || lower.starts_with("time_")
        || matches!(lower.as_str(), "time" | "datetime" | "date")
}

/// Decode a time variable, falling back strategy by strategy
///
/// Never fails; the last strategy hands back the raw values.
pub fn decode_time(values: &[f64], units: &str, calendar: &str) -> (DecodeStrategy, TimeSeries, Vec<f64>) {
    let decoded = if is_packed_date_units(units) {
        decode_packed_series(values, units)
    } else {
        decode_series(values, units, calendar)
    };
    let dates = match decoded {
        Ok(dates) => Some(dates),
        Err(e) => {
            warn!(units, calendar, "time values cannot be decoded: {e}");
            None
        }
    };
    let decimal = dates.as_deref().map(decimal_years);

    let absolute = || {
        let dates = dates.as_ref()?;
        let naive: Option<Vec<Option<NaiveDateTime>>> = dates
            .iter()
            .map(|d| match d {
                Some(d) => d.to_naive().map(Some),
                None => Some(None),
            })
            .collect();
        naive.map(TimeSeries::Absolute)
    };
    let native = || dates.clone().map(TimeSeries::Calendar);
    // Decimal years come from the same dates, so a decimal-year fallback
    // could only apply where `native` already succeeds.
    let strategies: [(DecodeStrategy, &dyn Fn() -> Option<TimeSeries>); 2] = [
        (DecodeStrategy::Absolute, &absolute),
        (DecodeStrategy::CalendarNative, &native),
    ];

    let (strategy, series) = strategies
        .iter()
        .find_map(|(strategy, decode)| decode().map(|s| (*strategy, s)))
        .unwrap_or((DecodeStrategy::Raw, TimeSeries::Numeric(values.to_vec())));
    debug!(?strategy, units, calendar, "time axis decoded");
    (strategy, series, decimal.unwrap_or_else(|| values.to_vec()))
}

fn read_time_axis(handle: &dyn DatasetHandle, var: &VariableInfo, prefix: &str) -> Result<TimeAxis> {
    let raw = handle.read_all(&var.name)?;
    let raw = substitute(raw, &resolve_missing(var, f64::NAN));
    let values: Vec<f64> = raw.iter().copied().collect();
    let units = var.units().to_string();
    let calendar = var.calendar().to_string();
    let (strategy, datetimes, decimal_years) = decode_time(&values, &units, &calendar);

    let name = if var.name.eq_ignore_ascii_case("datetime") {
        "date"
    } else {
        "datetime"
    };
    Ok(TimeAxis {
        variable: var.name.clone(),
        name: name.to_string(),
        label: encode_label(prefix, name, &var.dim_pairs()),
        units,
        calendar,
        strategy,
        datetimes,
        decimal_years,
    })
}

fn coordinate(var: &VariableInfo, prefix: &str) -> Option<CoordinateVar> {
    // sole dimension, or the last one of a curvilinear grid
    let dimension = match var.rank() {
        1 | 2 => var.dimensions.last()?.name.clone(),
        _ => return None,
    };
    Some(CoordinateVar {
        variable: var.name.clone(),
        dimension,
        label: encode_label(prefix, &var.name, &var.dim_pairs()),
    })
}

fn analyse_group(handle: &dyn DatasetHandle, prefix: &str) -> (GroupCatalog, Vec<String>, usize) {
    let unlimited = handle
        .dimensions()
        .into_iter()
        .find(|d| d.is_unlimited)
        .map(|d| d.name)
        .unwrap_or_default();
    let variables = handle.variables();

    let time = variables
        .iter()
        .find(|v| is_time_variable(&v.name, &unlimited))
        .and_then(|v| match read_time_axis(handle, v, prefix) {
            Ok(axis) => Some(axis),
            Err(e) => {
                warn!(variable = %v.name, "time variable cannot be read: {e}");
                None
            }
        });

    let mut lat = detect_coordinate(&variables, CoordAxis::Lat)
        .map(|(sweep, v)| {
            debug!(?sweep, variable = %v.name, "latitude detected");
            v
        })
        .map(|v| (v, coordinate(v, prefix)));
    let mut lon = detect_coordinate(&variables, CoordAxis::Lon)
        .map(|(sweep, v)| {
            debug!(?sweep, variable = %v.name, "longitude detected");
            v
        })
        .map(|v| (v, coordinate(v, prefix)));

    let invalid = [&lat, &lon]
        .into_iter()
        .flatten()
        .find(|(_, coord)| coord.is_none())
        .map(|(v, _)| (v.name.clone(), v.dim_names().join(",")));
    if let Some((name, dims)) = invalid {
        let variable = format!("{prefix}{name}");
        warn!(
            variable = %variable,
            dims = %dims,
            "latitude/longitude variable is not 1D or 2D, ignoring both"
        );
        lat = None;
        lon = None;
    }

    let mut entries = Vec::new();
    if let Some(t) = &time {
        entries.push(t.label.clone());
    }
    let mut labels: Vec<String> = variables
        .iter()
        .map(|v| encode_label(prefix, &v.name, &v.dim_pairs()))
        .collect();
    labels.sort();
    entries.extend(labels);
    let maxdim = variables.iter().map(VariableInfo::rank).max().unwrap_or(0);

    let group = GroupCatalog {
        prefix: prefix.to_string(),
        unlimited,
        time,
        lat: lat.and_then(|(_, c)| c),
        lon: lon.and_then(|(_, c)| c),
    };
    (group, entries, maxdim)
}

/// Build the catalog of a dataset source
pub fn analyse(source: &DatasetSource<'_>) -> Catalog {
    let mut catalog = Catalog {
        groups: source.groups(),
        ..Catalog::default()
    };
    for index in 0..source.len() {
        let prefix = source.prefix(index);
        let Some(handle) = source.handle(index) else {
            continue;
        };
        let (group, entries, maxdim) = analyse_group(handle, &prefix);
        info!(
            group = %prefix,
            variables = entries.len(),
            unlimited = %group.unlimited,
            time = group.time.as_ref().map_or("", |t| t.variable.as_str()),
            lat = group.lat.as_ref().map_or("", |c| c.variable.as_str()),
            lon = group.lon.as_ref().map_or("", |c| c.variable.as_str()),
            "group analysed"
        );
        catalog.group_meta.push(group);
        catalog.entries.extend(entries);
        catalog.maxdim = catalog.maxdim.max(maxdim);
    }
    catalog
}
