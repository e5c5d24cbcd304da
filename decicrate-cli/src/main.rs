//! decicrate command-line tool
//!
//! Loads an OBJ mesh, decimates it and writes the result.
//!
//! ```text
//! decicrate input.obj output.obj --reduction 0.75
//! decicrate input.obj output.obj --target-faces 5000 --no-preserve-boundary
//! decicrate input.obj output.obj --config params.toml -v
//! ```

mod config;

use anyhow::{Context, Result};
use clap::{ArgAction, ArgGroup, Parser};
use decicrate::io::{read_mesh, write_mesh};
use decicrate::simplification::{decimate, DecimationParams};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Quadric mesh decimation with texture-seam preservation.
#[derive(Parser, Debug)]
#[command(name = "decicrate", version, about, long_about = None)]
#[command(group(ArgGroup::new("target").args(["target_faces", "reduction"])))]
struct Args {
    /// Input OBJ file
    input: PathBuf,

    /// Output OBJ file
    output: PathBuf,

    /// Keep at most this many faces
    #[arg(short = 'T', long)]
    target_faces: Option<usize>,

    /// Fraction of faces to remove, strictly between 0 and 1
    #[arg(short = 'r', long)]
    reduction: Option<f64>,

    /// TOML parameter file; flags given on the command line override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Radius-ratio quality below which collapses are penalised
    #[arg(long)]
    quality_threshold: Option<f64>,

    /// Weight of the texture-coordinate error term
    #[arg(long)]
    texture_weight: Option<f64>,

    /// Weight of the boundary constraint planes
    #[arg(long)]
    boundary_weight: Option<f64>,

    /// Largest allowed face normal rotation in degrees
    #[arg(long)]
    normal_threshold: Option<f64>,

    /// Vertex merge distance as a fraction of the bounding box diagonal
    #[arg(long)]
    merge_threshold: Option<f64>,

    /// Number of edge flip passes after decimation
    #[arg(long)]
    flip_iterations: Option<usize>,

    /// Largest dihedral angle in degrees of a face pair that may be flipped
    #[arg(long)]
    planar_threshold: Option<f64>,

    /// Let boundary vertices move
    #[arg(long)]
    no_preserve_boundary: bool,

    /// Use edge midpoints instead of solving for the optimal position
    #[arg(long)]
    no_optimal_position: bool,

    /// Allow collapses that rotate face normals arbitrarily
    #[arg(long)]
    no_preserve_normal: bool,

    /// Weight flat regions like curved ones
    #[arg(long)]
    no_planar_simplification: bool,

    /// Skip merging close vertices and removing duplicate faces
    #[arg(long)]
    no_pre_clean: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Parameters from the config file (or defaults) with flag overrides applied.
    fn params(&self) -> Result<DecimationParams> {
        let mut params = match &self.config {
            Some(path) => config::load_params(path)?,
            None => DecimationParams::default(),
        };

        if let Some(n) = self.target_faces {
            params = params.with_target_faces(n);
        }
        if let Some(f) = self.reduction {
            params = params.with_reduction(f);
        }
        if let Some(v) = self.quality_threshold {
            params.quality_threshold = v;
        }
        if let Some(v) = self.texture_weight {
            params.texture_weight = v;
        }
        if let Some(v) = self.boundary_weight {
            params.boundary_weight = v;
        }
        if let Some(v) = self.normal_threshold {
            params.normal_threshold_deg = v;
        }
        if let Some(v) = self.merge_threshold {
            params.merge_threshold_ratio = v;
        }
        if let Some(v) = self.flip_iterations {
            params.flip_iterations = v;
        }
        if let Some(v) = self.planar_threshold {
            params.planar_threshold_deg = v;
        }
        params.preserve_boundary &= !self.no_preserve_boundary;
        params.optimal_position &= !self.no_optimal_position;
        params.preserve_normal &= !self.no_preserve_normal;
        params.planar_simplification &= !self.no_planar_simplification;
        params.pre_clean &= !self.no_pre_clean;

        params.validate()?;
        Ok(params)
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let params = args.params().context("Invalid parameters")?;

    let mesh = read_mesh(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    info!(path = %args.input.display(), "Loaded mesh");

    let outcome = decimate(&mesh, &params).context("Decimation failed")?;

    write_mesh(&outcome.mesh, &args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(path = %args.output.display(), "Saved mesh");

    println!("{}", outcome.report);
    Ok(())
}
