use anyhow::{Context, Result};
use background_services::button_listener::listen_for_buttons;
use background_services::departure_fetcher::WienerLinienClient;
use background_services::departure_poller::poll_departures;
use clap::Parser;
use cli::Args;
use display::console::ConsoleDisplay;
use display::rgb_lcd_plate::{self, RgbLcdPlate};
use display::{CharDisplay, Screen};
use dotenvy::dotenv;
use linux_embedded_hal::{Delay, I2cdev};
use model::stop_cycle::StopCycle;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::select;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

mod background_services;
mod cli;
mod display;
mod model;
mod utils;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    _ = dotenv();
    // Exits with 2 on usage errors and 0 after --help.
    let args = Args::parse();

    let _guard = init_tracing();

    if args.console {
        return run(args, ConsoleDisplay::new(rgb_lcd_plate::COLUMNS)).await;
    }

    let i2c = I2cdev::new(&args.i2c_bus)
        .with_context(|| format!("Couldn't open I2C bus {}", args.i2c_bus))?;
    let lcd = RgbLcdPlate::new(i2c, Delay, args.lcd_address)
        .context("Couldn't initialise the LCD plate")?;

    run(args, lcd).await
}

fn init_tracing() -> WorkerGuard {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let log_dir = dotenvy::var("LOG_DIR").unwrap_or("./logs".to_string());
    let appender = tracing_appender::rolling::daily(log_dir, "wl_monitor.log");
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(appender);

    // A layer that logs events to rolling files.
    let file_log = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_appender)
        .with_ansi(false)
        .pretty();

    let stdout_log = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);

    Registry::default()
        .with(stdout_log)
        .with(file_log)
        .with(env_filter)
        .init();

    guard
}

async fn run<D>(args: Args, display: D) -> Result<()>
where
    D: CharDisplay + Send + 'static,
{
    let screen = Screen::new(display, args.color.into());
    screen.init()?;

    let cycle = Arc::new(Mutex::new(StopCycle::new(args.stop_groups())?));
    let (switching_sender, switching_receiver) = watch::channel(false);
    let source = WienerLinienClient::new(args.api_url.as_str(), args.key.as_str());
    let refresh = args.refresh_interval();

    info!(
        "Monitoring {} stops, refreshing every {:?}",
        args.stops.len(),
        refresh
    );

    let mut tasks = JoinSet::new();

    let poller_screen = screen.clone();
    let poller_cycle = cycle.clone();
    tasks.spawn(async move {
        poll_departures(
            &source,
            &poller_screen,
            &poller_cycle,
            switching_receiver,
            refresh,
        )
        .await
        .context("Departure poller stopped")
    });

    let listener_screen = screen.clone();
    let listener_cycle = cycle.clone();
    let screen_timeout = args.screen_timeout();
    tasks.spawn(async move {
        listen_for_buttons(
            &listener_screen,
            &listener_cycle,
            &switching_sender,
            screen_timeout,
        )
        .await
        .context("Button listener stopped")
    });

    run_until_shutdown(&screen, tasks, shutdown_signal()).await
}

/// Waits for a background task to end or for `shutdown`, then stops the
/// remaining tasks before blanking the display so none of them can write to it
/// afterwards.
async fn run_until_shutdown<D, F>(
    screen: &Screen<D>,
    mut tasks: JoinSet<Result<()>>,
    shutdown: F,
) -> Result<()>
where
    D: CharDisplay,
    F: Future<Output = Result<()>>,
{
    select! {
    res = tasks.join_next() => {
        match res {
            Some(Ok(Err(err))) => error!("{:?}", err),
            Some(Ok(Ok(()))) | None => {}
            Some(Err(err)) => error!("{:?}", err),
        }},
    res = shutdown => {
        if let Err(err) = res {
            error!("Error waiting for a shutdown signal: {:?}", err);
        }
        info!("Shutting down");
    },
    }

    tasks.shutdown().await;
    screen.shutdown()?;

    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    select! {
        res = tokio::signal::ctrl_c() => res?,
        _ = terminate.recv() => {}
    }

    Ok(())
}
