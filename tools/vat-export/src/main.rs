//! vat-export - vertex animation texture export tool
//!
//! Bakes per-frame OBJ sequences into VAT textures plus the metadata and
//! reference mesh a shader needs to play them back.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use vat_export::{describe_layout, run_bake, run_check};

#[derive(Parser)]
#[command(name = "vat-export")]
#[command(about = "Vertex animation texture export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bake the sequence a manifest describes and write all enabled outputs
    Bake {
        /// Path to vat.toml manifest
        #[arg(default_value = "vat.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate manifest and probe the first frame without baking
    Check {
        /// Path to vat.toml manifest
        #[arg(default_value = "vat.toml")]
        manifest: PathBuf,
    },

    /// Print the texture layout planned for a number of elements
    Layout {
        /// Vertices, objects or corners per frame
        count: usize,

        /// Maximum texture width
        #[arg(long, default_value_t = 8192)]
        max_width: u32,

        /// Number of frames
        #[arg(long, default_value_t = 1)]
        frames: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.command {
        Commands::Bake { verbose: true, .. } => tracing::Level::DEBUG,
        _ => tracing::Level::INFO,
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .init();

    match cli.command {
        Commands::Bake {
            manifest,
            output,
            verbose,
        } => {
            if verbose {
                tracing::info!("Baking from {:?}", manifest);
            }
            let report = run_bake(&manifest, output.as_deref())?;
            tracing::info!(
                "Bake complete! {} VAT, {} files in {}",
                report.kind,
                report.written.len(),
                report.output_dir.display()
            );
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let report = run_check(&manifest)?;
            tracing::info!(
                "{} VAT, {} frames, objects: {}",
                report.kind,
                report.frame_count,
                report.objects.join(", ")
            );
            tracing::info!(
                "First frame: {} vertices, {} polygons",
                report.probe_vertices,
                report.probe_polygons
            );
            tracing::info!("Manifest is valid!");
        }

        Commands::Layout {
            count,
            max_width,
            frames,
        } => {
            println!("{}", describe_layout(count, max_width, frames)?);
        }
    }

    Ok(())
}
