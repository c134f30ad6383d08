//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - installs the log subscriber
//! - reads measurements and runs the requested pipeline
//! - prints reports and writes optional exports

use clap::Parser;
use tracing::info;

use crate::cli::{
    Command, InputArgs, InspectArgs, SaltykovArgs, ShapeArgs, StatsArgs, SynthArgs,
};
use crate::domain::{InputConfig, LognormalGuess, SaltykovConfig, ShapeConfig, StatsConfig};
use crate::error::Result;

pub mod pipeline;

/// Entry point for the `gst` binary.
pub fn run() -> Result<()> {
    // A missing .env is fine; explicit env vars and flags still apply.
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Saltykov(args) => handle_saltykov(args),
        Command::Shape(args) => handle_shape(args),
        Command::Stats(args) => handle_stats(args),
        Command::Synth(args) => handle_synth(args),
        Command::Inspect(args) => handle_inspect(args),
    }
}

fn handle_saltykov(args: SaltykovArgs) -> Result<()> {
    let input = input_config_from_args(&args.input);
    let config = saltykov_config_from_args(&args);
    let diameters = pipeline::load_diameters(&input)?;
    let out = pipeline::run_saltykov(&diameters, &config)?;

    println!("{}", crate::report::format_saltykov_summary(&out));

    if let Some(path) = &config.export_table {
        crate::io::write_saltykov_table(path, &out.unfolded.classes, &out.volume)?;
        println!("Saltykov table written to {}", path.display());
    }
    Ok(())
}

fn handle_shape(args: ShapeArgs) -> Result<()> {
    let input = input_config_from_args(&args.input);
    let config = shape_config_from_args(&args);
    let diameters = pipeline::load_diameters(&input)?;
    let estimate = pipeline::run_shape(&diameters, &config)?;

    println!("{}", crate::report::format_shape_summary(&estimate));

    if let Some(path) = &config.export_curve {
        crate::io::write_curve_json(path, &estimate)?;
        println!("Curve written to {}", path.display());
    }
    Ok(())
}

fn handle_stats(args: StatsArgs) -> Result<()> {
    let input = input_config_from_args(&args.input);
    let config = StatsConfig {
        scale: args.scale,
        bandwidth: args.bandwidth,
    };
    let measurements = pipeline::load_measurements(&input)?;
    let stats = pipeline::run_stats(&measurements, &config)?;
    println!("{}", crate::report::format_stats_summary(&stats));
    Ok(())
}

fn handle_synth(args: SynthArgs) -> Result<()> {
    let diameters =
        crate::data::generate_lognormal_sample(args.count, args.shape, args.median, args.seed)?;
    crate::data::write_sample_csv(&args.output, &diameters)?;
    info!(count = args.count, seed = args.seed, "synthetic sample generated");
    println!(
        "Wrote {} diameters (MSD={}, median={}) to {}",
        diameters.len(),
        args.shape,
        args.median,
        args.output.display()
    );
    Ok(())
}

fn handle_inspect(args: InspectArgs) -> Result<()> {
    let curve = crate::io::read_curve_json(&args.curve)?;
    println!("{}", crate::report::format_curve_file(&curve));
    Ok(())
}

pub fn input_config_from_args(args: &InputArgs) -> InputConfig {
    InputConfig {
        path: args.input.clone(),
        column: args.column.clone(),
        areas: args.areas,
        boundary_width: args.boundary_width,
    }
}

pub fn saltykov_config_from_args(args: &SaltykovArgs) -> SaltykovConfig {
    SaltykovConfig {
        num_bins: args.numbins,
        left_edge: args.left_edge,
        calc_vol: args.calc_vol,
        export_table: args.export.clone(),
    }
}

pub fn shape_config_from_args(args: &ShapeArgs) -> ShapeConfig {
    ShapeConfig {
        min_classes: args.min_classes,
        max_classes: args.max_classes,
        initial_guess: LognormalGuess {
            shape: args.shape_guess,
            scale: args.scale_guess,
        },
        export_curve: args.export_curve.clone(),
    }
}
