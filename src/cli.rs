//! CLI argument parsing with clap.

use clap::{Args, Parser, Subcommand};

use crate::settings::{Style, ViewAngle};

/// Turn engineering blueprints into 3D visualizations.
#[derive(Parser, Debug)]
#[command(name = "blueprint3d", version, about)]
pub struct Cli {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// What to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the same-origin relay in front of the generation backend.
    Serve(ServeArgs),
    /// Upload a blueprint through the relay and show the result.
    Generate(GenerateArgs),
}

/// Options for `serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address (defaults to the config file value).
    #[arg(short, long)]
    pub listen: Option<String>,
}

/// Options for `generate`.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Blueprint image (JPG, PNG, ...) or PDF.
    pub image: String,

    /// Extra description of the blueprint, e.g. materials or colours.
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Camera angle.
    #[arg(short = 'a', long, value_enum, default_value_t = ViewAngle::Perspective)]
    pub view_angle: ViewAngle,

    /// Rendering style.
    #[arg(short, long, value_enum, default_value_t = Style::Realistic)]
    pub style: Style,

    /// Relay base URL override.
    #[arg(long)]
    pub relay_url: Option<String>,

    /// Save the result into this directory.
    #[arg(short, long)]
    pub output_dir: Option<String>,
}
