//! Unit tests for the ncslice building blocks
//!
//! These tests cover labels, tokens, reductions, missing values, cyclic
//! stitching and time decoding without touching the file system.

use ndarray::{array, ArrayD, IxDyn};
use ncslice::{
    add_cyclic, collapse, decode_label, decode_time, default_fill, encode_label, evaluate_slice,
    parse_tokens, reduce_lane, resolve_missing, select, squeeze_for_display, substitute,
    valid_tokens, AttrValue, Calendar, CalendarDateTime, CyclicOptions, DecodeStrategy,
    DimensionInfo, ElementType, MemoryDataset, MissingValue, NcSliceError, ReduceOp, Result,
    StatisticalReduction, TimeSeries, TimeUnits, Token, VariableInfo,
};
use std::collections::BTreeMap;

fn variable(element_type: ElementType, attributes: &[(&str, AttrValue)]) -> VariableInfo {
    VariableInfo {
        name: "v".to_string(),
        element_type,
        dimensions: vec![DimensionInfo::new("x", 4)],
        attributes: attributes
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect::<BTreeMap<_, _>>(),
    }
}

#[test]
fn test_error_types() {
    let netcdf_err = NcSliceError::NetCDFError(netcdf::Error::NotFound("test".to_string()));
    assert!(format!("{}", netcdf_err).contains("NetCDF error"));

    let generic_err = NcSliceError::Generic("Test error".to_string());
    assert_eq!(format!("{}", generic_err), "Test error");

    let var_err = NcSliceError::VariableNotFound {
        var: "temp".to_string(),
    };
    assert!(format!("{}", var_err).contains("Variable 'temp' not found"));

    let group_err = NcSliceError::GroupNotFound {
        group: "file9".to_string(),
    };
    assert!(format!("{}", group_err).contains("file9"));

    let invalid = NcSliceError::invalid("bad token");
    assert!(matches!(invalid, NcSliceError::InvalidArgument { .. }));
}

#[test]
fn test_label_codec() {
    let label = encode_label("", "temp", &[("time", 10), ("lat", 5)]);
    assert_eq!(label, "temp (time=10,lat=5)");
    assert_eq!(decode_label(&label), "temp");

    let grouped = encode_label("file1/", "temp", &[("x", 3)]);
    assert_eq!(grouped, "file1/temp (x=3)");
    assert_eq!(decode_label(&grouped), "temp");

    let scalar = encode_label::<&str>("", "height", &[]);
    assert_eq!(scalar, "height ()");
    assert_eq!(decode_label(&scalar), "height");
}

#[test]
fn test_valid_tokens() {
    let tokens = valid_tokens(4);
    assert_eq!(tokens.len(), 4 + 1 + ReduceOp::ALL.len());
    assert!(tokens.contains(&Token::All));
    assert!(tokens.contains(&Token::Index(3)));
    assert!(!tokens.contains(&Token::Index(4)));

    // A dimension of length one only offers its single index
    assert_eq!(valid_tokens(1), vec![Token::Index(0)]);
}

#[test]
fn test_parse_tokens() -> Result<()> {
    let tokens = parse_tokens("all, mean ,2")?;
    assert_eq!(
        tokens,
        vec![Token::All, Token::Reduce(ReduceOp::Mean), Token::Index(2)]
    );
    assert!(parse_tokens("all,average").is_err());
    assert!(parse_tokens("-1").is_err());
    Ok(())
}

#[test]
fn test_reduce_ops() -> Result<()> {
    for op in ReduceOp::ALL {
        assert_eq!(op.as_str().parse::<ReduceOp>()?, op);
    }
    assert!("nanmean".parse::<ReduceOp>().is_err());
    Ok(())
}

#[test]
fn test_lane_reductions_skip_nan() {
    let lane = array![1.0, f64::NAN, 3.0, 8.0];
    assert_eq!(reduce_lane(lane.view(), ReduceOp::Mean), 4.0);
    assert_eq!(reduce_lane(lane.view(), ReduceOp::Min), 1.0);
    assert_eq!(reduce_lane(lane.view(), ReduceOp::Max), 8.0);
    assert_eq!(reduce_lane(lane.view(), ReduceOp::Ptp), 7.0);
    assert_eq!(reduce_lane(lane.view(), ReduceOp::Sum), 12.0);
    assert_eq!(reduce_lane(lane.view(), ReduceOp::Median), 3.0);
    assert!((reduce_lane(lane.view(), ReduceOp::Var) - 26.0 / 3.0).abs() < 1e-12);

    let empty = array![f64::NAN, f64::NAN];
    for op in ReduceOp::ALL {
        assert!(reduce_lane(empty.view(), op).is_nan(), "{op} of an all-NaN lane");
    }
}

#[test]
fn test_reduce_along_axis() -> Result<()> {
    let data = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
    let mean = data.reduce_along_axis(0, ReduceOp::Mean)?;
    assert_eq!(mean.shape(), &[3]);
    assert_eq!(mean.as_slice(), Some(&[2.5, 3.5, 4.5][..]));

    let max = data.reduce_along_axis(1, ReduceOp::Max)?;
    assert_eq!(max.as_slice(), Some(&[3.0, 6.0][..]));

    assert!(data.reduce_along_axis(2, ReduceOp::Sum).is_err());
    Ok(())
}

#[test]
fn test_collapse_order() -> Result<()> {
    // Shape (2, 3, 4), read with the last dimension narrowed to index 2
    let full: Vec<f64> = (0..24).map(f64::from).collect();
    let data = ArrayD::from_shape_vec(IxDyn(&[2, 3, 4]), full)?;
    let tokens = parse_tokens("all,mean,2")?;

    let out = select(&data, &tokens)?;
    assert_eq!(out.shape(), &[2]);
    // mean over (2, 6, 10) and (14, 18, 22)
    assert_eq!(out.as_slice(), Some(&[6.0, 18.0][..]));

    // collapse on an already narrowed array gives the same answer
    let narrowed = data.slice_each_axis(|ax| match ax.axis.index() {
        2 => ndarray::Slice::from(2..3),
        _ => ndarray::Slice::from(..),
    });
    assert_eq!(collapse(narrowed.to_owned(), &tokens)?, out);

    assert!(collapse(out.clone(), &tokens).is_err());
    Ok(())
}

#[test]
fn test_squeeze_for_display() -> Result<()> {
    let column = ArrayD::from_shape_vec(IxDyn(&[3, 1]), vec![1.0, 2.0, 3.0])?;
    assert_eq!(squeeze_for_display(column, f64::NAN).shape(), &[3]);

    let single = ArrayD::from_shape_vec(IxDyn(&[1]), vec![4.0])?;
    assert_eq!(squeeze_for_display(single, f64::NAN).shape(), &[1]);

    let scalar = ArrayD::from_elem(IxDyn(&[]), 7.0);
    let shown = squeeze_for_display(scalar, f64::NAN);
    assert_eq!(shown.shape(), &[1]);
    assert!(shown[[0]].is_nan());
    Ok(())
}

#[test]
fn test_evaluate_slice_squeezes_result() -> Result<()> {
    let data = MemoryDataset::new()
        .with_dimension("t", 2)
        .with_dimension("x", 3)
        .with_variable("v", &["t", "x"], (0..6).map(f64::from).collect(), &[])?;
    let handle = &data;

    // Every dimension indexed: a single invalid entry instead of a 0-d array
    let point = evaluate_slice(&handle, "v", &[Token::Index(1), Token::Index(2)])?;
    assert_eq!(point.shape(), &[1]);
    assert!(point[[0]].is_nan());

    let reduced = evaluate_slice(&handle, "v", &[Token::Reduce(ReduceOp::Mean), Token::Reduce(ReduceOp::Max)])?;
    assert_eq!(reduced.shape(), &[1]);
    assert!(reduced[[0]].is_nan());

    let row = evaluate_slice(&handle, "v", &[Token::Index(1), Token::All])?;
    assert_eq!(row, ArrayD::from_shape_vec(IxDyn(&[3]), vec![3.0, 4.0, 5.0])?);
    Ok(())
}

#[test]
fn test_missing_value_union() -> Result<()> {
    let var = variable(
        ElementType::F32,
        &[
            ("_FillValue", AttrValue::from(-9999.0)),
            ("missing_value", AttrValue::from(vec![-999.0, -99.0])),
        ],
    );
    let candidates = resolve_missing(&var, f64::NAN);
    assert_eq!(candidates.len(), 5);
    assert_eq!(candidates[0], default_fill(ElementType::F32).unwrap());
    assert_eq!(candidates[2], MissingValue::Number(-9999.0));

    let data = ArrayD::from_shape_vec(IxDyn(&[4]), vec![1.0, -9999.0, -999.0, 5.0])?;
    let clean = substitute(data, &candidates);
    assert_eq!(clean[[0]], 1.0);
    assert!(clean[[1]].is_nan());
    assert!(clean[[2]].is_nan());
    assert_eq!(clean[[3]], 5.0);
    Ok(())
}

#[test]
fn test_missing_override_and_defaults() -> Result<()> {
    let var = variable(ElementType::I16, &[]);
    let candidates = resolve_missing(&var, 0.0);
    assert_eq!(
        candidates,
        vec![MissingValue::Number(-32767.0), MissingValue::Number(0.0)]
    );

    let data = ArrayD::from_shape_vec(IxDyn(&[3]), vec![-32767.0, 0.0, 12.0])?;
    let clean = substitute(data, &candidates);
    assert!(clean[[0]].is_nan() && clean[[1]].is_nan());
    assert_eq!(clean[[2]], 12.0);

    // Datetimes ignore the numeric override
    let dates = variable(ElementType::DateTime, &[]);
    assert_eq!(resolve_missing(&dates, -1.0), vec![MissingValue::NotATime]);

    assert_eq!(default_fill(ElementType::Char), None);
    Ok(())
}

#[test]
fn test_cyclic_point_added_once() -> Result<()> {
    let lon = ArrayD::from_shape_vec(IxDyn(&[6]), vec![0.0, 60.0, 120.0, 180.0, 240.0, 300.0])?;
    let data = ArrayD::from_shape_vec(IxDyn(&[2, 6]), (0..12).map(f64::from).collect())?;
    let lat = ArrayD::from_shape_vec(IxDyn(&[2]), vec![-45.0, 45.0])?;
    let options = CyclicOptions::default();

    let first = add_cyclic(&data, Some(&lon), Some(&lat), &options)?;
    let x = first.x.clone().unwrap();
    assert_eq!(x.shape(), &[7]);
    assert_eq!(x[[6]], 360.0);
    assert_eq!(first.data.shape(), &[2, 7]);
    assert_eq!(first.data[[1, 6]], first.data[[1, 0]]);
    assert_eq!(first.y.as_ref().map(|y| y.shape().to_vec()), Some(vec![2]));

    // A grid that already carries the cyclic point is left alone
    let second = add_cyclic(&first.data, Some(&x), first.y.as_ref(), &options)?;
    assert_eq!(second, first);
    Ok(())
}

#[test]
fn test_cyclic_curvilinear_coordinates() -> Result<()> {
    // lon2d/lat2d as from a meshgrid of 3 longitudes and 2 latitudes
    let lon2d = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![0.0, 120.0, 240.0, 0.0, 120.0, 240.0])?;
    let lat2d = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![-30.0, -30.0, -31.0, 30.0, 30.0, 31.0])?;
    let data = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;

    let out = add_cyclic(&data, Some(&lon2d), Some(&lat2d), &CyclicOptions::default())?;
    let x = out.x.unwrap();
    let y = out.y.unwrap();
    assert_eq!(x.shape(), &[2, 4]);
    assert_eq!(x[[1, 3]], 360.0);
    // the row coordinate repeats its last column
    assert_eq!(y[[0, 3]], -31.0);
    assert_eq!(y[[1, 3]], 31.0);
    assert_eq!(out.data[[1, 3]], 4.0);
    Ok(())
}

#[test]
fn test_cyclic_without_coordinate_and_errors() -> Result<()> {
    let data = ArrayD::from_shape_vec(IxDyn(&[2, 3]), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
    let out = add_cyclic(&data, None, None, &CyclicOptions::default())?;
    assert_eq!(out.data.shape(), &[2, 4]);
    assert_eq!(out.data[[0, 3]], 1.0);
    assert!(out.x.is_none());

    // -180..180 grids are recognised as well
    let lon = ArrayD::from_shape_vec(IxDyn(&[3]), vec![-180.0, 0.0, 180.0])?;
    let kept = add_cyclic(&data, Some(&lon), None, &CyclicOptions::default())?;
    assert_eq!(kept.data, data);

    // Radians with a coarse tolerance
    let radians = CyclicOptions::default()
        .with_period(2.0 * std::f64::consts::PI)
        .with_tolerance(1e-2);
    let lon = ArrayD::from_shape_vec(IxDyn(&[3]), vec![0.0, 2.094, 4.188])?;
    let out = add_cyclic(&data, Some(&lon), None, &radians)?;
    assert!((out.x.unwrap()[[3]] - 2.0 * std::f64::consts::PI).abs() < 1e-12);
    let lon = ArrayD::from_shape_vec(IxDyn(&[3]), vec![0.0, 3.1416, 6.2832])?;
    assert_eq!(add_cyclic(&data, Some(&lon), None, &radians)?.data, data);

    let short = ArrayD::from_shape_vec(IxDyn(&[2]), vec![0.0, 90.0])?;
    assert!(add_cyclic(&data, Some(&short), None, &CyclicOptions::default()).is_err());
    assert!(add_cyclic(&data, None, None, &CyclicOptions::along(5)).is_err());
    Ok(())
}

#[test]
fn test_decimal_year() -> Result<()> {
    let units = TimeUnits::parse("hours since 2021-01-01", Calendar::Standard)?;
    let dt = units.decode(181.0 * 24.0 + 12.0)?;
    assert_eq!((dt.year, dt.month, dt.day, dt.hour), (2021, 7, 1, 12));
    assert!((dt.decimal_year() - (2021.0 + 181.5 / 365.0)).abs() < 1e-6);

    let noon = CalendarDateTime::from_ymd(Calendar::Standard, 2021, 7, 1)?.and_hms(12, 0, 0);
    assert_eq!(noon, dt);
    assert_eq!(noon.to_string(), "2021-07-01T12:00:00");

    let leap = CalendarDateTime::from_ymd(Calendar::ProlepticGregorian, 2020, 12, 31)?;
    assert!((leap.decimal_year() - (2020.0 + 365.0 / 366.0)).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_decimal_year_fixed_calendars() -> Result<()> {
    let july = CalendarDateTime::from_ymd(Calendar::Day360, 2000, 7, 1)?;
    assert!((july.decimal_year() - 2000.5).abs() < 1e-9);

    // 2000 is a Gregorian leap year, but noleap years are always 365 days
    let last = CalendarDateTime::from_ymd(Calendar::NoLeap, 2000, 12, 31)?;
    assert!((last.decimal_year() - (2000.0 + 364.0 / 365.0)).abs() < 1e-9);

    let last = CalendarDateTime::from_ymd(Calendar::AllLeap, 2001, 12, 31)?;
    assert!((last.decimal_year() - (2001.0 + 365.0 / 366.0)).abs() < 1e-9);

    // Calendar aliases reach the same constants through the decoder
    let (_, _, years) = decode_time(&[180.0], "days since 2000-01-01", "360_day");
    assert!((years[0] - 2000.5).abs() < 1e-9);
    let (_, _, years) = decode_time(&[364.0], "days since 2000-01-01", "365_day");
    assert!((years[0] - (2000.0 + 364.0 / 365.0)).abs() < 1e-9);
    let (_, _, years) = decode_time(&[730.0], "days since 2000-01-01", "366_day");
    assert!((years[0] - (2001.0 + 365.0 / 366.0)).abs() < 1e-9);
    Ok(())
}

#[test]
fn test_time_units_with_zone() -> Result<()> {
    // Local midnight at +01:00 is 23:00 UTC the day before
    let units = TimeUnits::parse("seconds since 1970-01-01 00:00:00 +01:00", Calendar::Standard)?;
    let start = units.decode(0.0)?;
    assert_eq!((start.year, start.month, start.day, start.hour), (1969, 12, 31, 23));
    let hour = units.decode(3600.0)?;
    assert_eq!(hour, CalendarDateTime::from_ymd(Calendar::Standard, 1970, 1, 1)?.and_hms(0, 0, 0));

    let utc = TimeUnits::parse("hours since 1970-01-01 00:00:00 UTC", Calendar::Standard)?;
    assert_eq!(utc.decode(1.0)?, CalendarDateTime::from_ymd(Calendar::Standard, 1970, 1, 1)?.and_hms(1, 0, 0));

    let west = TimeUnits::parse("minutes since 1970-01-01T00:00:00-0230", Calendar::Standard)?;
    assert_eq!(west.decode(0.0)?, CalendarDateTime::from_ymd(Calendar::Standard, 1970, 1, 1)?.and_hms(2, 30, 0));
    Ok(())
}

#[test]
fn test_non_standard_calendars() -> Result<()> {
    let units = TimeUnits::parse("days since 2000-01-01", Calendar::Day360)?;
    let feb30 = units.decode(59.0)?;
    assert_eq!((feb30.month, feb30.day), (2, 30));
    assert!(feb30.to_naive().is_none());

    let noleap = TimeUnits::parse("days since 2000-02-28", Calendar::NoLeap)?;
    let next = noleap.decode(1.0)?;
    assert_eq!((next.month, next.day), (3, 1));

    assert!(CalendarDateTime::from_ymd(Calendar::NoLeap, 2000, 2, 29).is_err());
    assert!("mayan".parse::<Calendar>().is_err());
    Ok(())
}

#[test]
fn test_decode_time_strategies() {
    let (strategy, series, years) = decode_time(&[0.0, 1.0, f64::NAN], "days since 2000-01-01", "standard");
    assert_eq!(strategy, DecodeStrategy::Absolute);
    assert_eq!(series.len(), 3);
    assert!(matches!(&series, TimeSeries::Absolute(v) if v[2].is_none()));
    assert_eq!(years[0], 2000.0);
    assert!(years[2].is_nan());

    let (strategy, series, _) = decode_time(&[0.0, 30.0], "days since 2000-01-01", "360_day");
    assert_eq!(strategy, DecodeStrategy::CalendarNative);
    assert!(matches!(series, TimeSeries::Calendar(_)));

    let (strategy, series, years) = decode_time(&[0.0, 1.0], "months since 2000-01-01", "standard");
    assert_eq!(strategy, DecodeStrategy::Raw);
    assert_eq!(series, TimeSeries::Numeric(vec![0.0, 1.0]));
    assert_eq!(years, vec![0.0, 1.0]);
}

#[test]
fn test_packed_dates() {
    let (strategy, series, years) = decode_time(&[20210701.5, 20210702.0], "day as %Y%m%d.%f", "standard");
    assert_eq!(strategy, DecodeStrategy::Absolute);
    let dates = series.to_calendar().unwrap();
    let first = dates[0].unwrap();
    assert_eq!((first.year, first.month, first.day), (2021, 7, 1));
    assert_eq!(first.microsecond, 500_000);
    assert!((years[1] - (2021.0 + 182.0 / 365.0)).abs() < 1e-9);
}
