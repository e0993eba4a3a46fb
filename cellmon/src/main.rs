use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr as _, bail};
use serde_json::{json, to_string_pretty};
use tokio::signal::unix::{self, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use orb_cellmon::{
    config::{Args, Command, Config},
    poller::Poller,
    profile::Profiles,
    schema::Schemas,
    session::ModemSession,
    telemetry,
    transport::{SerialTransport, list_ports},
};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let _log = telemetry::init()?;

    let args = Args::parse();
    let result = match args.command.clone().unwrap_or(Command::Run) {
        Command::ListPorts => print_ports(),
        Command::Once => once(&args).await,
        Command::Run => run(&args).await,
    };
    if let Err(e) = &result {
        error!("{e:?}");
    }

    result
}

fn print_ports() -> Result<()> {
    let ports = list_ports().wrap_err("failed to enumerate serial ports")?;
    if ports.is_empty() {
        bail!("no serial ports found");
    }
    for port in ports {
        println!("{port}");
    }
    Ok(())
}

async fn open_session(
    config: &Config,
    cancel: CancellationToken,
) -> Result<ModemSession<SerialTransport>> {
    let settings = config.session_settings()?;
    let schemas = Arc::new(Schemas::new()?);
    info!(name = %config.name, port = %settings.serial.path, "opening modem session");

    let session = tokio::task::spawn_blocking(move || {
        ModemSession::open(&settings, schemas, Profiles::default(), cancel)
    })
    .await?
    .wrap_err("failed to initialize modem session")?;

    Ok(session)
}

async fn once(args: &Args) -> Result<()> {
    let config = Config::load(args).wrap_err("failed to load config")?;
    let session = open_session(&config, CancellationToken::new()).await?;

    let report = json!({
        "identity": session.identity(),
        "rat": session.rat(),
        "cell_info": session.cell_info(),
    });
    println!("{}", to_string_pretty(&report)?);

    Ok(())
}

async fn run(args: &Args) -> Result<()> {
    let config = Config::load(args).wrap_err("failed to load config")?;
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone())?;

    let forwarder = config.forwarder.build(&config.harvest_url)?;
    let session = open_session(&config, cancel.clone()).await?;
    let poller = Poller::new(forwarder, config.poll_interval(), cancel);

    let session = poller.run(session).await?;
    info!(port = %session.port(), "closing modem session");
    drop(session);

    Ok(())
}

fn spawn_signal_handler(cancel: CancellationToken) -> Result<()> {
    let mut sigterm = unix::signal(SignalKind::terminate())?;
    let mut sigint = unix::signal(SignalKind::interrupt())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => warn!("received SIGTERM"),
            _ = sigint.recv()  => warn!("received SIGINT"),
        }
        info!("cancelling in-flight transaction and shutting down");
        cancel.cancel();
    });

    Ok(())
}
