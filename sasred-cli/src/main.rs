//! sasred: reduce 2D SANS/SAXS detector frames to 1D profiles.
//!
//! Frames and plans are read as JSON documents (see `sasred-io`).
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use clap::{Args, Parser, Subcommand, ValueEnum};

use sasred_algorithms::{
    BoxConfig, CircularConfig, Reduction, ReductionOutput, RingConfig, SectorConfig, SlabConfig,
    SweepOptions,
};
use sasred_io::{load_frame, load_plan, ProfileWriter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    SasredIo(#[from] sasred_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] sasred_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Plan error: {0}")]
    Plan(String),
}

/// Output file format.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Whitespace-separated columns with a header line
    Text,
    /// JSON document of the full result, including empty bins
    Json,
}

/// Sector binning mode.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum SectorRun {
    /// Bin by angle over the Q range
    Phi,
    /// Bin by Q over the wedge
    Q,
    /// Bin by Q over the wedge and its mirror
    Q2,
}

/// Slab major axis.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Axis {
    /// I(Qx)
    X,
    /// I(Qy)
    Y,
}

/// Q-space reduction of 2D small-angle scattering data.
#[derive(Parser)]
#[command(name = "sasred")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Sweep pixels on a single thread
    #[arg(long, global = true)]
    serial: bool,

    /// Worker threads for parallel sweeps (default: all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by the single-engine subcommands.
#[derive(Args)]
struct Target {
    /// Input frame document (JSON)
    frame: PathBuf,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every reduction of a plan document on a frame
    Reduce {
        /// Input frame document (JSON)
        #[arg(long)]
        frame: PathBuf,

        /// Reduction plan (JSON object or list)
        #[arg(long)]
        plan: PathBuf,

        /// Output file path; with several reductions the engine name is appended
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Isotropic circular average, I(Q)
    Circular {
        #[command(flatten)]
        target: Target,

        /// Minimum radius [1/A]
        #[arg(long, default_value = "0.0")]
        r_min: f64,

        /// Maximum radius [1/A]
        #[arg(long)]
        r_max: f64,

        /// Bin width [1/A]
        #[arg(long, default_value = "0.0005")]
        bin_width: f64,
    },

    /// Angular distribution in an annulus, I(phi)
    Ring {
        #[command(flatten)]
        target: Target,

        /// Minimum radius [1/A]
        #[arg(long, default_value = "0.0")]
        r_min: f64,

        /// Maximum radius [1/A]
        #[arg(long)]
        r_max: f64,

        /// Number of angular bins
        #[arg(long, default_value = "20")]
        nbins: usize,
    },

    /// Sector average, I(phi) or I(Q) over a wedge
    Sector {
        #[command(flatten)]
        target: Target,

        /// Binning mode
        #[arg(short, long, value_enum, default_value = "q")]
        mode: SectorRun,

        /// Minimum radius [1/A]
        #[arg(long, default_value = "0.0")]
        r_min: f64,

        /// Maximum radius [1/A]
        #[arg(long)]
        r_max: f64,

        /// Wedge start angle [rad]
        #[arg(long, default_value = "0.0", allow_hyphen_values = true)]
        phi_min: f64,

        /// Wedge end angle [rad]
        #[arg(long, default_value_t = std::f64::consts::TAU, allow_hyphen_values = true)]
        phi_max: f64,

        /// Number of bins
        #[arg(long, default_value = "20")]
        nbins: usize,

        /// Logarithm base for Q bins (linear bins when omitted)
        #[arg(long)]
        base: Option<f64>,
    },

    /// Slab average along Qx or Qy
    Slab {
        #[command(flatten)]
        target: Target,

        /// Major axis
        #[arg(short, long, value_enum, default_value = "x")]
        axis: Axis,

        /// Minimum Qx [1/A]
        #[arg(long, allow_hyphen_values = true)]
        x_min: f64,

        /// Maximum Qx [1/A]
        #[arg(long, allow_hyphen_values = true)]
        x_max: f64,

        /// Minimum Qy [1/A]
        #[arg(long, allow_hyphen_values = true)]
        y_min: f64,

        /// Maximum Qy [1/A]
        #[arg(long, allow_hyphen_values = true)]
        y_max: f64,

        /// Bin width [1/A]
        #[arg(long, default_value = "0.001")]
        bin_width: f64,

        /// Fold negative Q onto positive Q
        #[arg(long)]
        fold: bool,
    },

    /// Sum or average of counts in a Q box
    Box {
        #[command(flatten)]
        target: Target,

        /// Minimum Qx [1/A]
        #[arg(long, allow_hyphen_values = true)]
        x_min: f64,

        /// Maximum Qx [1/A]
        #[arg(long, allow_hyphen_values = true)]
        x_max: f64,

        /// Minimum Qy [1/A]
        #[arg(long, allow_hyphen_values = true)]
        y_min: f64,

        /// Maximum Qy [1/A]
        #[arg(long, allow_hyphen_values = true)]
        y_max: f64,

        /// Report the average instead of the sum
        #[arg(long)]
        average: bool,
    },

    /// Show geometry and Q range of a frame document
    Info {
        /// Input frame document (JSON)
        frame: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Opens the output destination, stdout when no path is given.
fn open_output(path: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    })
}

/// `out.txt` -> `out_ring.txt`.
fn suffixed(path: &Path, name: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map_or_else(String::new, |stem| stem.to_string_lossy().into_owned());
    let file_name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, name.to_lowercase(), ext.to_string_lossy()),
        None => format!("{}_{}", stem, name.to_lowercase()),
    };
    path.with_file_name(file_name)
}

fn write_output(
    reduction: &Reduction,
    output: &ReductionOutput,
    path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let mut sink = open_output(path)?;
    match format {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut sink, output)?;
            writeln!(sink)?;
            sink.flush()?;
        }
        OutputFormat::Text => {
            let mut writer = ProfileWriter::new(sink);
            match output {
                ReductionOutput::Profile(profile) if reduction.is_angular() => {
                    writer.write_angular(profile)?;
                }
                ReductionOutput::Profile(profile) => writer.write_profile(profile)?,
                ReductionOutput::Box(result) => writer.write_box(result)?,
            }
        }
    }
    if let Some(path) = path {
        log::info!("{} written to {}", reduction.name(), path.display());
    }
    Ok(())
}

fn run_reductions(
    frame_path: &Path,
    reductions: &[Reduction],
    output: Option<&Path>,
    format: OutputFormat,
    options: SweepOptions,
) -> Result<()> {
    if reductions.is_empty() {
        return Err(CliError::Plan("plan contains no reductions".into()));
    }
    let frame = load_frame(frame_path)?;
    log::info!(
        "Loaded {}x{} frame from {}",
        frame.rows(),
        frame.cols(),
        frame_path.display()
    );

    for reduction in reductions {
        let start = Instant::now();
        let result = reduction.run(&frame, options)?;
        match &result {
            ReductionOutput::Profile(profile) => log::info!(
                "{}: {} of {} bins populated, total weight {:.3} ({:.2} ms)",
                reduction.name(),
                profile.populated_bins(),
                profile.len(),
                profile.total_weight(),
                start.elapsed().as_secs_f64() * 1000.0
            ),
            ReductionOutput::Box(result) => log::info!(
                "{}: {} +/- {} over weight {:.3}",
                reduction.name(),
                result.value,
                result.error,
                result.weight
            ),
        }

        let path = match output {
            Some(path) if reductions.len() > 1 => Some(suffixed(path, reduction.name())),
            Some(path) => Some(path.to_path_buf()),
            None => None,
        };
        write_output(reduction, &result, path.as_deref(), format)?;
    }
    Ok(())
}

fn run_single(target: &Target, reduction: &Reduction, options: SweepOptions) -> Result<()> {
    run_reductions(
        &target.frame,
        std::slice::from_ref(reduction),
        target.output.as_deref(),
        target.format,
        options,
    )
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
        log::debug!("Using {} worker threads", threads);
    }
    let options = SweepOptions::default().with_parallel(!cli.serial);

    match cli.command {
        Commands::Reduce {
            frame,
            plan,
            output,
            format,
        } => {
            let reductions = load_plan(&plan)?;
            log::info!("Plan {} holds {} reduction(s)", plan.display(), reductions.len());
            run_reductions(&frame, &reductions, output.as_deref(), format, options)?;
        }
        Commands::Circular {
            target,
            r_min,
            r_max,
            bin_width,
        } => {
            let config = CircularConfig::new(r_min, r_max).with_bin_width(bin_width);
            run_single(&target, &Reduction::Circular(config), options)?;
        }
        Commands::Ring {
            target,
            r_min,
            r_max,
            nbins,
        } => {
            let config = RingConfig::new(r_min, r_max).with_nbins_phi(nbins);
            run_single(&target, &Reduction::Ring(config), options)?;
        }
        Commands::Sector {
            target,
            mode,
            r_min,
            r_max,
            phi_min,
            phi_max,
            nbins,
            base,
        } => {
            let mut config = SectorConfig::new(r_min, r_max, phi_min, phi_max).with_nbins(nbins);
            config.base = base;
            let reduction = match mode {
                SectorRun::Phi => Reduction::SectorPhi(config),
                SectorRun::Q => Reduction::SectorQ(config),
                SectorRun::Q2 => Reduction::SectorQSymmetric(config),
            };
            run_single(&target, &reduction, options)?;
        }
        Commands::Slab {
            target,
            axis,
            x_min,
            x_max,
            y_min,
            y_max,
            bin_width,
            fold,
        } => {
            let config = SlabConfig::new()
                .with_x_range(x_min, x_max)
                .with_y_range(y_min, y_max)
                .with_bin_width(bin_width)
                .with_fold(fold);
            let reduction = match axis {
                Axis::X => Reduction::SlabX(config),
                Axis::Y => Reduction::SlabY(config),
            };
            run_single(&target, &reduction, options)?;
        }
        Commands::Box {
            target,
            x_min,
            x_max,
            y_min,
            y_max,
            average,
        } => {
            let config = BoxConfig::new(x_min, x_max, y_min, y_max);
            let reduction = if average {
                Reduction::BoxAverage(config)
            } else {
                Reduction::BoxSum(config)
            };
            run_single(&target, &reduction, options)?;
        }
        Commands::Info { frame } => {
            let data = load_frame(&frame)?;
            let detector = data.detector()?;
            let geometry = data.geometry()?;
            println!("File: {}", frame.display());
            println!("Pixels: {} rows x {} cols", data.rows(), data.cols());
            println!(
                "Pixel size: {} x {}",
                detector.pixel_size.x, detector.pixel_size.y
            );
            println!(
                "Beam center: ({}, {})",
                detector.beam_center.x, detector.beam_center.y
            );
            println!("Distance: {}", detector.distance);
            println!("Wavelength: {}", data.source.wavelength);
            println!("Errors: {}", if data.error.is_some() { "given" } else { "from intensity" });
            println!("Q max: {:.6}", geometry.max_q());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffixed_output() {
        assert_eq!(
            suffixed(Path::new("/tmp/out.txt"), "SectorQ2"),
            PathBuf::from("/tmp/out_sectorq2.txt")
        );
        assert_eq!(suffixed(Path::new("out"), "Ring"), PathBuf::from("out_ring"));
    }

    #[test]
    fn test_cli_parses_sector() {
        let cli = Cli::try_parse_from([
            "sasred", "sector", "frame.json", "--mode", "q2", "--r-max", "0.05", "--nbins", "30",
        ])
        .unwrap();
        match cli.command {
            Commands::Sector {
                mode, r_max, nbins, ..
            } => {
                assert!(matches!(mode, SectorRun::Q2));
                assert!((r_max - 0.05).abs() < f64::EPSILON);
                assert_eq!(nbins, 30);
            }
            _ => panic!("expected the sector subcommand"),
        }
    }

    #[test]
    fn test_cli_accepts_negative_ranges() {
        let cli = Cli::try_parse_from([
            "sasred", "--serial", "slab", "frame.json", "--x-min", "-0.1", "--x-max", "0.1",
            "--y-min", "-0.02", "--y-max", "0.02", "--fold",
        ])
        .unwrap();
        assert!(cli.serial);
        assert!(matches!(cli.command, Commands::Slab { fold: true, .. }));
    }

    #[test]
    fn test_cli_accepts_negative_wedge() {
        let cli = Cli::try_parse_from([
            "sasred", "sector", "frame.json", "--r-max", "0.05", "--phi-min", "-0.5",
            "--phi-max", "0.5", "--base", "10",
        ])
        .unwrap();
        match cli.command {
            Commands::Sector {
                phi_min,
                phi_max,
                base,
                ..
            } => {
                assert!((phi_min + 0.5).abs() < f64::EPSILON);
                assert!((phi_max - 0.5).abs() < f64::EPSILON);
                assert_eq!(base, Some(10.0));
            }
            _ => panic!("expected the sector subcommand"),
        }
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
