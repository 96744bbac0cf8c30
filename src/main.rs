//! commute-radio: narrated news and music for the commute, with live route progress.

mod backend;
mod config;
mod control;
mod error;
mod loading;
mod models;
mod player;
mod route;
mod session;
mod status;
#[cfg(test)]
mod testing;
mod tracking;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Datelike;
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use backend::{CommuteBackend, HttpBackend};
use player::audio::RodioOutput;
use player::video::MpvHost;
use session::Session;
use status::SessionSnapshot;
use tracking::{FileLocator, TrackingPoller};

#[derive(Parser, Debug)]
#[command(name = "commute-radio", about = "Commute radio: narrated news, music and route progress")]
struct Args {
    /// Path to config.yaml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,

    /// Do not start the local control API
    #[arg(long)]
    no_control: bool,

    /// Skip route lookup and live tracking
    #[arg(long)]
    no_tracking: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Quiet HTTP and audio internals
    let filter = if args.verbose {
        EnvFilter::new("debug,reqwest=info,hyper=info,hyper_util=info,rodio=info")
    } else {
        EnvFilter::new("info,reqwest=warn,hyper=warn,hyper_util=warn,rodio=warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("commute-radio starting");

    let config = config::Config::load(args.config.as_deref());
    let session_config = config.session.clone();
    info!(
        "Session: {} → {} with {}",
        session_config.origin_label(),
        session_config.destination_label(),
        session_config.narrator.display_name()
    );

    let backend = Arc::new(HttpBackend::new(&config.backend)?);

    let pacing = Duration::from_millis(config.loading.step_delay_ms);
    let weekday = chrono::Local::now().weekday();
    let prepared = loading::prepare(backend.as_ref(), &session_config, pacing, weekday).await?;

    let snapshot = Arc::new(watch::channel(SessionSnapshot::default()).0);

    // Route progress never blocks the session
    let poller = Arc::new(TrackingPoller::new(config.tracking.poll_interval()));
    let mut route_task = None;
    if config.tracking.enabled && !args.no_tracking {
        let backend = backend.clone();
        let poller = poller.clone();
        let snapshot = snapshot.clone();
        let locator = Arc::new(FileLocator::new(config.tracking.position_file.clone()));
        let origin = session_config.origin_label().to_string();
        let destination = session_config.destination_label().to_string();
        route_task = Some(tokio::spawn(async move {
            match backend.route(&origin, &destination).await {
                Ok(found) => {
                    let key_route = route::reduce_route(Some(&found), &origin, &destination);
                    info!("Route: {}", key_route.labels.join(" → "));
                    let positions = poller.subscribe();
                    if poller.start(found, backend, locator) {
                        status::relay_progress(positions, route::ProgressTracker::new(key_route), snapshot).await;
                    }
                }
                Err(e) => warn!("Route lookup failed, no progress display: {e}"),
            }
        }));
    }

    let (notices_tx, notices) = mpsc::unbounded_channel();
    tokio::spawn(status::relay_notices(notices, snapshot.clone()));

    let (commands_tx, commands) = mpsc::channel(16);
    if config.control.enabled && !args.no_control {
        let state = control::ControlState {
            commands: commands_tx.clone(),
            snapshot: snapshot.subscribe(),
        };
        control::start_control_api(state, config.control.port).await;
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, ending session");
            let _ = commands_tx.send(session::Command::End).await;
        }
    });

    let audio = RodioOutput::open()?;
    let video = MpvHost::new(config.music.clone());
    let voice = config.speech.voice(session_config.narrator);

    let (session, events) = Session::new(
        backend.clone(),
        session_config,
        voice.clone(),
        prepared.scripts,
        prepared.opening,
        audio,
        video,
        notices_tx,
    );
    let finished = session.run(events, commands).await;
    if let Some(task) = route_task {
        task.abort();
    }
    poller.shutdown();

    let mut scripts = finished.scripts;
    let mut output = finished.output;
    scripts.closing = session::closing::play_closing(backend.as_ref(), &mut output, &finished.transcript, &voice).await;

    info!(
        "Session over: {} news segments narrated{}",
        scripts.news.len(),
        if scripts.closing.is_some() { ", closing spoken" } else { "" }
    );

    Ok(())
}
