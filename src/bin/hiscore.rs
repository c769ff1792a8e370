#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use hiscore::surface::DEFAULT_RESOLUTION;
use hiscore::synthetic::{self, SyntheticConfig};
use hiscore::{sample_surface, HiScoreEngine, ReferenceSet, ScoreBounds, SurfaceSpec};

#[derive(Parser)]
#[command(name = "hiscore", version, about = "Monotone score functions from reference points")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score query points against a reference set
    Evaluate {
        /// Reference set JSON
        #[arg(long)]
        reference: PathBuf,
        /// JSON array of query coordinates
        #[arg(long)]
        queries: PathBuf,
        /// Output path (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Envelope and dominance bounds for query points
    Bounds {
        #[arg(long)]
        reference: PathBuf,
        #[arg(long)]
        queries: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Sample the score surface over two dimensions as CSV
    Surface {
        #[arg(long)]
        reference: PathBuf,
        #[arg(long)]
        x_axis: usize,
        #[arg(long)]
        y_axis: usize,
        /// Values for every dimension, comma separated; the two axes are ignored
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
        fixed: Vec<f64>,
        #[arg(long, default_value_t = DEFAULT_RESOLUTION)]
        resolution: usize,
        #[arg(long)]
        out: PathBuf,
    },
    /// Generate a synthetic reference set and re-score it
    Demo {
        #[arg(long, default_value_t = 100)]
        points: usize,
        #[arg(long, default_value_t = 0.0)]
        noise: f64,
        #[arg(long, default_value_t = 7)]
        seed: u64,
        #[arg(long, default_value_t = 1000)]
        max_attempts: usize,
        /// Also write the generated reference set here
        #[arg(long)]
        reference_out: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct BoundsRow {
    coords: Vec<f64>,
    envelope: ScoreBounds,
    dominance: (f64, f64),
    reference_value: Option<f64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate {
            reference,
            queries,
            out,
        } => {
            let engine = load_engine(&reference)?;
            let queries: Vec<Vec<f64>> = read_json(&queries)?;
            let scores = engine.evaluate(&queries)?;
            emit_json(out.as_ref(), &scores)?;
        }
        Commands::Bounds {
            reference,
            queries,
            out,
        } => {
            let engine = load_engine(&reference)?;
            let queries: Vec<Vec<f64>> = read_json(&queries)?;
            let mut rows = Vec::with_capacity(queries.len());
            for coords in queries {
                rows.push(BoundsRow {
                    envelope: engine.score_bounds(&coords)?,
                    dominance: engine.dominance_bounds(&coords)?,
                    reference_value: engine.reference_value(&coords)?,
                    coords,
                });
            }
            emit_json(out.as_ref(), &rows)?;
        }
        Commands::Surface {
            reference,
            x_axis,
            y_axis,
            fixed,
            resolution,
            out,
        } => {
            let engine = load_engine(&reference)?;
            let spec = SurfaceSpec::new(x_axis, y_axis, fixed).with_resolution(resolution);
            let samples = sample_surface(&engine, &spec)?;
            let mut csv = BufWriter::new(File::create(out)?);
            writeln!(csv, "x,y,score")?;
            for s in samples {
                writeln!(csv, "{},{},{}", s.x, s.y, s.score)?;
            }
            csv.flush()?;
        }
        Commands::Demo {
            points,
            noise,
            seed,
            max_attempts,
            reference_out,
            out,
        } => {
            let cfg = SyntheticConfig {
                points,
                noise,
                seed,
                max_attempts,
            };
            if let Some(path) = reference_out {
                let set = synthetic::generate_reference_set(&cfg)?;
                write_json(&path, &set)?;
            }
            let report = synthetic::run_demo(&cfg)?;
            emit_json(out.as_ref(), &report)?;
        }
    }

    Ok(())
}

fn load_engine(path: &PathBuf) -> Result<HiScoreEngine, Box<dyn std::error::Error>> {
    let set: ReferenceSet = read_json(path)?;
    Ok(HiScoreEngine::from_reference_set(set)?)
}

fn read_json<T: serde::de::DeserializeOwned>(
    path: &PathBuf,
) -> Result<T, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_json<T: Serialize>(path: &PathBuf, value: &T) -> Result<(), io::Error> {
    let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
    std::fs::write(path, json)
}

fn emit_json<T: Serialize>(path: Option<&PathBuf>, value: &T) -> Result<(), io::Error> {
    match path {
        Some(path) => write_json(path, value),
        None => {
            let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}")
        }
    }
}
