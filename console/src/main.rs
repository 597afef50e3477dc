use std::{fs::OpenOptions, path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use console::controls::{self, Control};
use route_tracker_lib::device::{DeviceId, Role};
use route_tracker_runtime::{
    location::{LocationSource, ReplaySource, UnavailableSource},
    relay,
    renderer::{JsonRenderer, MapRenderer, TracingRenderer},
    Configuration, Dependencies, NoticeReceiver, TrackerContext, TrackerHandle, TrackingMode,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "route-tracker")]
#[command(about = "Plays a trip along a route and shares it with display devices", long_about = None)]
struct Cli {
    /// File with `key = value` settings. Flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    device_id: Option<String>,
    #[arg(long)]
    role: Option<Role>,
    #[arg(long)]
    mode: Option<TrackingMode>,
    /// Relay endpoint, `local` for the in-process relay
    #[arg(long)]
    relay: Option<String>,
    #[arg(long)]
    route_gpx: Option<PathBuf>,
    /// Recorded track replayed as the live location
    #[arg(long)]
    live_gpx: Option<PathBuf>,
    /// Write map updates to this file as JSON lines
    #[arg(long)]
    map_out: Option<PathBuf>,
}

impl Cli {
    fn configuration(&self) -> anyhow::Result<Configuration> {
        let mut config = match &self.config {
            Some(path) => Configuration::load(path)?,
            None => Configuration::default(),
        };

        if let Some(device_id) = &self.device_id {
            config.device_id = Some(DeviceId::new(device_id.as_str()));
        }
        if let Some(role) = self.role {
            config.role = role;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(endpoint) = &self.relay {
            config.relay_endpoint = endpoint.clone();
        }
        if let Some(path) = &self.route_gpx {
            config.route_gpx = Some(path.clone());
        }
        if let Some(path) = &self.live_gpx {
            config.live_gpx = Some(path.clone());
        }

        config.validate()?;
        Ok(config)
    }

    fn renderer(&self, config: &Configuration) -> anyhow::Result<Box<dyn MapRenderer>> {
        let Some(path) = &self.map_out else {
            return Ok(Box::new(TracingRenderer::new(config)));
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open map output {path:?}"))?;
        Ok(Box::new(JsonRenderer::new(file, config.tile_url())))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    std::fs::create_dir_all("log")?;
    let log_file = "log/console.log";

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("{}=info,route_tracker_runtime=info", env!("CARGO_CRATE_NAME")).into())
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file))
        .init();

    let cli = Cli::parse();
    let config = cli.configuration()?;
    let route = config.route().context("Failed to load the route")?;

    tracing::info!("Route with {} waypoints, {:.1} km", route.waypoints().len(), route.length_km());

    let relay = match relay::connect(&config.relay_endpoint) {
        Ok(relay) => Some(relay),
        Err(err) => {
            println!("error: {err}. Running without a relay");
            None
        }
    };

    let location: Arc<dyn LocationSource> = match &config.live_gpx {
        Some(path) => Arc::new(ReplaySource::from_gpx(path, config.live_interval)?),
        None => Arc::new(UnavailableSource::unsupported()),
    };

    let dependencies = Dependencies {
        route,
        location,
        relay,
        renderer: Some(cli.renderer(&config)?),
    };

    let (handle, notices) = TrackerContext::spawn(&config, dependencies);

    println!("{}", controls::HELP);
    run(&handle, notices).await?;

    handle.shutdown().await?;
    tracing::info!("Stopped");
    Ok(())
}

/// Reads commands from stdin until `quit` or end of input, printing notices as they come.
async fn run(handle: &TrackerHandle, mut notices: NoticeReceiver) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Some(notice) = notices.recv() => println!("{notice}"),
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }

                let control = match line.parse::<Control>() {
                    Ok(control) => control,
                    Err(err) => {
                        println!("{err}");
                        continue;
                    }
                };

                match control {
                    Control::Start => handle.start().await?,
                    Control::Stop => handle.stop().await?,
                    Control::Locate => handle.locate().await?,
                    Control::Role(role) => handle.switch_role(role).await?,
                    Control::Mode(mode) => handle.set_mode(mode).await?,
                    Control::Follow(device) => handle.follow(device).await?,
                    Control::Status => println!("{}", controls::describe(&handle.snapshot().await?)),
                    Control::History => println!("{}", controls::describe_history(&handle.history().await?)),
                    Control::Help => println!("{}", controls::HELP),
                    Control::Quit => break,
                }
            }
        }
    }

    Ok(())
}
