use ndarray::{Array1, Array3};
use ncslice::{
    analyse, evaluate_slice, file_entry, open_files, read_slice, DatasetHandle, DatasetSource,
    DecodeStrategy, EngineConfig, ReduceOp, Result, SliceValues, TimeView, Token,
};
use netcdf::create;
use std::path::Path;
use tempfile::tempdir;

/// Write a small (time=4, lat=2, lon=3) climate file
fn write_test_file(path: &Path, offset: f32) -> Result<()> {
    let mut file = create(path)?;
    file.add_dimension("time", 4)?;
    file.add_dimension("lat", 2)?;
    file.add_dimension("lon", 3)?;

    {
        let mut time_var = file.add_variable::<f64>("time", &["time"])?;
        time_var.put_attribute("units", "days since 2000-01-01")?;
        time_var.put_attribute("calendar", "standard")?;
        let time_array = Array1::from(vec![0.0, 366.0, 731.0, 1096.0]);
        time_var.put(time_array.view(), ..)?;
    }

    {
        let mut lat_var = file.add_variable::<f32>("lat", &["lat"])?;
        lat_var.put_attribute("units", "degrees_north")?;
        let lat_array = Array1::from(vec![-45.0f32, 45.0]);
        lat_var.put(lat_array.view(), ..)?;
    }

    {
        let mut lon_var = file.add_variable::<f32>("lon", &["lon"])?;
        lon_var.put_attribute("units", "degrees_east")?;
        let lon_array = Array1::from(vec![0.0f32, 120.0, 240.0]);
        lon_var.put(lon_array.view(), ..)?;
    }

    {
        let mut temp_var = file.add_variable::<f32>("temperature", &["time", "lat", "lon"])?;
        temp_var.put_attribute("_FillValue", -999.0f32)?;
        temp_var.put_attribute("units", "K")?;
        temp_var.put_attribute("long_name", "Air Temperature")?;
        let mut values: Vec<f32> = (0..24).map(|i| offset + i as f32).collect();
        values[7] = -999.0;
        let temp_array = Array3::from_shape_vec((4, 2, 3), values)?;
        temp_var.put(temp_array.view(), ..)?;
    }
    Ok(())
}

#[test]
fn test_catalog_from_netcdf_file() -> Result<()> {
    let temp_dir = tempdir()?;
    let file_path = temp_dir.path().join("climate.nc");
    write_test_file(&file_path, 0.0)?;

    let files = open_files(&[&file_path])?;
    let entries = files.iter().map(file_entry).collect::<Result<Vec<_>>>()?;
    let source = DatasetSource::from_files(entries)?;
    let catalog = analyse(&source);

    assert_eq!(catalog.maxdim, 3);
    assert_eq!(catalog.entries[0], "datetime (time=4)");
    assert!(catalog.contains("temperature (time=4,lat=2,lon=3)"));

    let group = catalog.group(0).unwrap();
    let time = group.time.as_ref().unwrap();
    assert_eq!(time.strategy, DecodeStrategy::Absolute);
    assert_eq!(time.decimal_years, vec![2000.0, 2001.0, 2002.0, 2003.0]);
    assert_eq!(group.lat.as_ref().unwrap().variable, "lat");
    assert_eq!(group.lon.as_ref().unwrap().dimension, "lon");
    Ok(())
}

#[test]
fn test_slices_from_netcdf_file() -> Result<()> {
    let temp_dir = tempdir()?;
    let file_path = temp_dir.path().join("climate.nc");
    write_test_file(&file_path, 0.0)?;

    let files = open_files(&[&file_path])?;
    let entries = files.iter().map(file_entry).collect::<Result<Vec<_>>>()?;
    let source = DatasetSource::from_files(entries)?;
    let catalog = analyse(&source);
    let label = "temperature (time=4,lat=2,lon=3)";

    // Raw hyperslab read without missing-value handling
    let handle = source.handle(0).unwrap();
    let raw = evaluate_slice(handle, "temperature", &[Token::Index(1), Token::Index(0), Token::All])?;
    assert_eq!(raw.shape(), &[3]);
    assert_eq!(raw[[0]], 6.0);
    assert_eq!(raw[[1]], -999.0);

    // The fill value is masked before the time maximum is taken
    let tokens = vec![Token::Reduce(ReduceOp::Max), Token::All, Token::All];
    let slice = read_slice(&source, &catalog, label, &tokens, &EngineConfig::default(), TimeView::DecimalYear)?;
    assert_eq!(slice.label, "Air Temperature (K)");
    let values = slice.values.as_numbers().unwrap();
    assert_eq!(values.shape(), &[2, 3]);
    assert_eq!(values[[0, 0]], 18.0);
    assert_eq!(values[[1, 2]], 23.0);

    let tokens = vec![Token::All, Token::Index(0), Token::Index(1)];
    let series = read_slice(&source, &catalog, label, &tokens, &EngineConfig::default(), TimeView::DecimalYear)?;
    let values = series.values.as_numbers().unwrap();
    assert_eq!(values.shape(), &[4]);
    assert_eq!(values[[0]], 1.0);
    assert!(values[[1]].is_nan());
    assert_eq!(values[[3]], 19.0);

    let info = handle.variable("temperature").unwrap();
    assert_eq!(info.fill_value(), Some(-999.0));
    Ok(())
}

#[test]
fn test_multiple_netcdf_files() -> Result<()> {
    let temp_dir = tempdir()?;
    let first = temp_dir.path().join("run1.nc");
    let second = temp_dir.path().join("run2.nc");
    write_test_file(&first, 0.0)?;
    write_test_file(&second, 100.0)?;

    let files = open_files(&[&first, &second])?;
    let entries = files.iter().map(file_entry).collect::<Result<Vec<_>>>()?;
    let source = DatasetSource::from_files(entries)?;
    let catalog = analyse(&source);

    assert_eq!(catalog.groups, vec!["file0", "file1"]);
    assert_eq!(catalog.entries[0], "file0/datetime (time=4)");

    let tokens = vec![Token::Index(0), Token::Index(0), Token::Index(0)];
    let slice = read_slice(
        &source,
        &catalog,
        "file1/temperature (time=4,lat=2,lon=3)",
        &tokens,
        &EngineConfig::default(),
        TimeView::DecimalYear,
    )?;
    // Every dimension indexed: nothing left to show
    let values = slice.values.as_numbers().unwrap();
    assert_eq!(values.shape(), &[1]);
    assert!(values[[0]].is_nan());

    let dates = read_slice(
        &source,
        &catalog,
        "file1/datetime (time=4)",
        &[Token::Index(2)],
        &EngineConfig::default(),
        TimeView::Calendar,
    )?;
    match dates.values {
        SliceValues::DateTimes(values) => assert_eq!(values.shape(), &[1]),
        SliceValues::Numbers(_) => panic!("expected datetimes"),
    }
    Ok(())
}
