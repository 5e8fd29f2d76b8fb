//! Command line tool for reducing polarized VSANS experiments

// standard library
use std::error::Error;
use std::fs;

// crate modules
mod cli;
use cli::Cli;

// external crates
use clap::Parser;
use log::{error, info, warn};
use vsans_pipeline::{
    read_config, read_flat_field, read_masks, write_outputs, FlatField, FrameStore, Pipeline,
    ReductionConfig,
};

fn main() {
    let cli = Cli::parse();

    stderrlog::new()
        .module(module_path!())
        .module("vsans_pipeline")
        .module("vsans_decay")
        .module("vsans_efficiency")
        .module("vsans_geometry")
        .module("vsans_mask")
        .module("vsans_binning")
        .verbosity(cli.verbosity())
        .show_module_names(cli.verbose > 1)
        .init()
        .unwrap_or_else(|e| eprintln!("failed to start logging: {e}"));

    if let Err(e) = run(&cli) {
        error!("{e}");
        let mut source = e.source();
        while let Some(cause) = source {
            error!("  caused by: {cause}");
            source = cause.source();
        }
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> vsans_pipeline::Result<()> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None => {
            info!("No configuration file, using defaults");
            ReductionConfig::default()
        }
    };
    config.per_panel_output |= cli.per_panel;

    let store = FrameStore::read_dir(&cli.frames)?;

    let masks = match &cli.masks {
        Some(dir) => read_masks(dir, &store)?,
        None => Default::default(),
    };

    let flat = match &cli.flat_field {
        Some(path) => read_flat_field(path)?,
        None => {
            info!("No flat field, detector sensitivity taken as uniform");
            FlatField::unity()
        }
    };

    let mut output = Pipeline::new(&config, &store)
        .with_masks(masks)
        .with_flat_field(flat)
        .run()?;

    fs::create_dir_all(&cli.output)?;
    write_outputs(&mut output, &cli.output, config.per_panel_output)?;

    for unit in output.failed() {
        warn!("{}: {}", unit.report, unit.report.state());
    }

    Ok(())
}
