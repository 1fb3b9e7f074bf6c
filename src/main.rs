//! Entry point for the ncslice inspector.
//! Handles CLI parsing, file loading, and prints the catalog or an evaluated slice.

use clap::Parser;
use ncslice::prelude::*;
use ncslice::{
    analyse, cyclic_map, file_entry, open_files, read_slice, reduce_lane, Catalog,
    ReduceOp, RenderSlice, SelectorDefaults, SliceValues,
};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::Args;

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // RUST_LOG takes precedence, fallback to info (debug with --verbose)
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let files = open_files(&args.files)?;
    let entries = files.iter().map(file_entry).collect::<Result<Vec<_>>>()?;
    let source = DatasetSource::from_files(entries)?;
    let catalog = analyse(&source);
    info!(files = args.files.len(), entries = catalog.entries.len(), "catalog built");

    let Some(label) = args.var.as_deref() else {
        print_catalog(&catalog, args.json)?;
        return Ok(());
    };
    let label = find_label(&catalog, label);
    let config = args.engine_config();

    let tokens = match &args.select {
        Some(selection) => selection.tokens.clone(),
        None => default_tokens(&source, &catalog, &label)?,
    };
    let slice = read_slice(&source, &catalog, &label, &tokens, &config, args.time.into())?;
    print_slice(&label, &tokens, &slice);

    if args.cyclic {
        let stitched = cyclic_map(&source, &catalog, &slice, &config)?;
        println!("cyclic shape: {:?}", stitched.data.shape());
        if let Some(x) = &stitched.x {
            println!("cyclic longitudes: {:?}", x.shape());
        }
    }
    Ok(())
}

/// Accept a bare name where a label is expected
fn find_label(catalog: &Catalog, wanted: &str) -> String {
    if catalog.contains(wanted) {
        return wanted.to_string();
    }
    catalog
        .entries
        .iter()
        .find(|e| decode_label(e) == wanted || e.split(" (").next() == Some(wanted))
        .cloned()
        .unwrap_or_else(|| wanted.to_string())
}

/// Selector defaults: maps for variables on the lat/lon grid, lines otherwise
fn default_tokens(source: &DatasetSource<'_>, catalog: &Catalog, label: &str) -> Result<Vec<Token>> {
    let address = match catalog.time_entry(label) {
        Some((group, axis)) => VariableAddress::new(group, axis.variable.clone()),
        None => resolve_label(label, source)?,
    };
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
    let group = catalog.group(address.group).cloned().unwrap_or_default();
    let dims = info.dim_names();
    let on_grid = !group.lat_dim().is_empty()
        && dims.contains(&group.lat_dim())
        && dims.contains(&group.lon_dim());
    let defaults = if on_grid {
        SelectorDefaults::map(group.lat_dim(), group.lon_dim(), &group.unlimited)
    } else {
        SelectorDefaults::line(&group.unlimited)
    };

    let mut selector = AxisSelector::new();
    selector.rebuild(label, &info, &defaults);
    for ((name, _), hint) in selector.dims().iter().zip(selector.hints()) {
        info!(dimension = %name, "{}", hint.replace('\n', " "));
    }
    Ok(selector.tokens().to_vec())
}

fn print_catalog(catalog: &Catalog, as_json: bool) -> std::result::Result<(), Box<dyn std::error::Error>> {
    if as_json {
        let groups: Vec<_> = catalog
            .group_meta
            .iter()
            .map(|g| {
                json!({
                    "prefix": g.prefix,
                    "unlimited": g.unlimited,
                    "time": g.time.as_ref().map(|t| json!({
                        "variable": t.variable,
                        "label": t.label,
                        "units": t.units,
                        "calendar": t.calendar,
                        "strategy": format!("{:?}", t.strategy),
                    })),
                    "lat": g.lat.as_ref().map(|c| json!({"variable": c.variable, "dimension": c.dimension})),
                    "lon": g.lon.as_ref().map(|c| json!({"variable": c.variable, "dimension": c.dimension})),
                })
            })
            .collect();
        let out = json!({
            "groups": catalog.groups,
            "maxdim": catalog.maxdim,
            "entries": catalog.entries,
            "group_meta": groups,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("Variables (max rank {}):", catalog.maxdim);
    for entry in &catalog.entries {
        println!("  {entry}");
    }
    for g in &catalog.group_meta {
        let name = if g.prefix.is_empty() { "/" } else { g.prefix.as_str() };
        println!("Group {name}");
        if !g.unlimited.is_empty() {
            println!("  unlimited dimension: {}", g.unlimited);
        }
        if let Some(t) = &g.time {
            println!("  time: {} ({:?}, calendar {})", t.variable, t.strategy, t.calendar);
        }
        if let Some(c) = &g.lat {
            println!("  latitude: {} along {}", c.variable, c.dimension);
        }
        if let Some(c) = &g.lon {
            println!("  longitude: {} along {}", c.variable, c.dimension);
        }
    }
    Ok(())
}

fn print_slice(label: &str, tokens: &[Token], slice: &RenderSlice) {
    let tokens: Vec<String> = tokens.iter().map(ToString::to_string).collect();
    println!("{label} [{}]", tokens.join(","));
    println!("axis label: {}", slice.label);
    println!("shape: {:?}", slice.values.shape());
    match &slice.values {
        SliceValues::Numbers(values) => {
            let flat = ndarray::Array1::from_iter(values.iter().copied());
            for op in [ReduceOp::Min, ReduceOp::Mean, ReduceOp::Max, ReduceOp::Std] {
                println!("  {op:<6} {:.6}", reduce_lane(flat.view(), op));
            }
            let valid = flat.iter().filter(|v| !v.is_nan()).count();
            println!("  valid  {valid}/{}", flat.len());
        }
        SliceValues::DateTimes(dates) => {
            let present: Vec<_> = dates.iter().flatten().collect();
            if let (Some(first), Some(last)) = (present.first(), present.last()) {
                println!("  from {first} to {last}");
            }
            println!("  valid  {}/{}", present.len(), dates.len());
        }
    }
}
