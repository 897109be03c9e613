//! msts-export - MSTS asset export tool
//!
//! Converts ACE textures and text shapes (.ace, .s) to TSTEXT/TSMODL
//! containers (.ts_tex, .ts_model)

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use msts_export::{ConvertConfig, RunIds, Verbosity, batch, convert, info};

#[derive(Parser)]
#[command(name = "msts-export")]
#[command(about = "MSTS asset export tool")]
#[command(version)]
struct Cli {
    /// Converter settings (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only report warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single ACE texture
    Texture {
        /// Input .ace file
        input: PathBuf,

        /// Output .ts_tex file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert a single text shape
    Shape {
        /// Input .s file
        input: PathBuf,

        /// Output .ts_model file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also convert the textures the shape references
        #[arg(long)]
        with_textures: bool,
    },

    /// Convert the textures a shape references
    ShapeTextures {
        /// Input .s file
        input: PathBuf,

        /// Output directory (default: <stem>_converted_textures)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert every .ace and .s file in a directory
    Batch {
        /// Input directory
        dir: PathBuf,

        /// Output directory (default: <dir>/converted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },

    /// Print a summary of an .ace, .s, .ts_tex or .ts_model file
    Info {
        /// Input file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ConvertConfig::load(path)?,
        None => ConvertConfig::default(),
    };
    if cli.verbose {
        config.verbosity = Verbosity::Verbose;
    } else if cli.quiet {
        config.verbosity = Verbosity::Quiet;
    }

    // Initialize logging
    let directives = std::env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV).unwrap_or_default();
    tracing_subscriber::fmt()
        .with_env_filter(config.verbosity.env_filter(&directives))
        .init();

    let run_ids = RunIds::new(config.run_seed);

    match cli.command {
        Commands::Texture { input, output } => {
            let output = output.unwrap_or_else(|| convert::texture_output_path(&input));
            tracing::info!("Converting {:?} -> {:?}", input, output);
            convert::convert_texture(&input, &output, &config)?;
            tracing::info!("Done!");
        }

        Commands::Shape {
            input,
            output,
            with_textures,
        } => {
            let output = output.unwrap_or_else(|| convert::model_output_path(&input));
            tracing::info!("Converting {:?} -> {:?}", input, output);
            convert::convert_shape(&input, &output, &config, &run_ids)?;

            if with_textures {
                let dir = convert::default_shape_texture_dir(&output);
                convert_textures(&input, &dir, &config)?;
            }
            tracing::info!("Done!");
        }

        Commands::ShapeTextures { input, output } => {
            let dir = output.unwrap_or_else(|| convert::default_shape_texture_dir(&input));
            convert_textures(&input, &dir, &config)?;
            tracing::info!("Done!");
        }

        Commands::Batch {
            dir,
            output,
            recursive,
        } => {
            let output = output.unwrap_or_else(|| dir.join("converted"));
            let jobs = batch::collect_jobs(&dir, recursive)?;
            tracing::info!("Converting {} files from {:?} -> {:?}", jobs.len(), dir, output);

            let report = batch::convert_batch(&jobs, &output, &config, &run_ids)?;
            if !report.is_success() {
                anyhow::bail!("{} of {} files failed to convert", report.failures.len(), jobs.len());
            }
        }

        Commands::Info { input } => {
            print!("{}", info::describe_file(&input)?);
        }
    }

    Ok(())
}

fn convert_textures(input: &Path, dir: &Path, config: &ConvertConfig) -> Result<()> {
    tracing::info!("Converting textures of {:?} -> {:?}", input, dir);
    let result = convert::convert_shape_textures(input, dir, config)?;
    tracing::info!(
        "{} converted, {} missing, {} failed",
        result.converted.len(),
        result.missing.len(),
        result.failed.len()
    );
    if !result.failed.is_empty() {
        anyhow::bail!("{} textures failed to convert", result.failed.len());
    }
    Ok(())
}
