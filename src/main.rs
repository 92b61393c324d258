//! Blueprint3D command line: `serve` runs the relay, `generate` runs the client flow.

use std::path::Path;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use blueprint3d::adapters::live::relay::RelayDispatcher;
use blueprint3d::cli::{Cli, Command, GenerateArgs, ServeArgs};
use blueprint3d::config::{self, BackendTarget, Config};
use blueprint3d::error::BlueprintError;
use blueprint3d::intake::{IntakePolicy, RawInput};
use blueprint3d::presenter::{Downloader, View};
use blueprint3d::relay;
use blueprint3d::session::Session;
use blueprint3d::settings::SettingsPatch;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), BlueprintError> {
    let config_path = config::discover_config_path(cli.config.as_deref());
    let config = Config::load(&config_path).map_err(BlueprintError::Config)?;
    tracing::debug!(path = %config_path.display(), "config loaded");

    match cli.command {
        Command::Serve(args) => serve(args, &config).await,
        Command::Generate(args) => generate(args, &config).await,
    }
}

async fn serve(args: ServeArgs, config: &Config) -> Result<(), BlueprintError> {
    let target = BackendTarget::from_env(&config.relay)?;
    let listen = args.listen.unwrap_or_else(|| config.relay.listen.clone());
    relay::serve(&listen, target, config.relay.max_body_bytes).await
}

async fn generate(args: GenerateArgs, config: &Config) -> Result<(), BlueprintError> {
    let session =
        Session::new(IntakePolicy { max_bytes: config.client.max_upload_bytes, allow_pdf: true });

    session.select(RawInput::from_path(Path::new(&args.image))?)?;
    session.patch_settings(SettingsPatch {
        view_angle: Some(args.view_angle),
        style: Some(args.style),
        description: Some(args.description),
    });

    let relay_url = args.relay_url.unwrap_or_else(|| config.client.relay_url());
    let dispatcher = RelayDispatcher::new(&relay_url, config.client.asset_origin.as_deref())?;

    let progress = async {
        // Runs after `generate` has been polled once and marked the session busy.
        tokio::task::yield_now().await;
        let state = session.snapshot();
        if state.is_generating {
            eprintln!("{}", View::from(&state));
        }
    };
    let (outcome, ()) = tokio::join!(session.generate(&dispatcher), progress);
    let image = outcome?;
    eprintln!("{}", View::from(&session.snapshot()));

    if let Some(dir) = args.output_dir {
        let downloader = Downloader::new(config.client.download_hosts(&relay_url));
        let path = downloader.download(&image, Path::new(&dir)).await?;
        eprintln!("Saved: {}", path.display());
    } else {
        println!("{}", image.url);
    }

    Ok(())
}
