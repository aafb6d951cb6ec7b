//! kiosk-daemon: face-triggered listen-and-repeat kiosk controller
//!
//! A camera-paced loop watches for a face, then runs a scripted exchange:
//! speak a phrase, listen for the visitor to repeat it, and switch a relay on
//! when they do. Three strikes end the exchange.
//!
//! Components:
//! - Hierarchical state machine (lifecycle + speech exchange) cranked once
//!   per event, emitting ordered actions
//! - Speech output, speech recognition and serial hardware workers, each on
//!   its own thread, reporting through one shared inbox
//! - Keyboard listener for operator commands
//! - Console status display

mod cli;
mod config;
mod context;
mod control;
mod dispatch;
mod events;
mod keyboard;
mod lifecycle;
mod phrases;
mod state;
mod workers;

use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::Config;
use crate::context::Context;
use crate::control::{ControlLoop, LoopSettings, ManualVision, SyntheticCamera};
use crate::dispatch::{Dispatcher, Workers};
use crate::events::Action;
use crate::keyboard::{console_writer, KeyboardListener};
use crate::lifecycle::ShutdownSignal;
use crate::phrases::PhraseManager;
use crate::state::{RecognitionTimer, StateMachine};
use crate::workers::{CommandRecognizer, CommandSpeaker, SerialLink, WorkerProxy};

/// How long each worker gets to finish its queue at shutdown
const WORKER_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level)),
        )
        .with_writer(console_writer)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        os = std::env::consts::OS,
        "kiosk-daemon starting"
    );

    match &config.source {
        Some(path) => info!(?path, "configuration loaded"),
        None => warn!("no config file found, using defaults"),
    }

    // Scripted phrases
    let mut phrases = PhraseManager::default();
    match phrases.load(&config.phrases.path) {
        Ok(count) => info!(count, "phrase file loaded OK"),
        Err(e) => error!(%e, path = ?config.phrases.path, "failure loading phrases"),
    }

    let camera = SyntheticCamera::open(config.vision.width, config.vision.height)
        .context("failed to open camera")?;

    // Serial relay controller
    let link = if config.hardware.enabled {
        match SerialLink::open(&config.hardware.port) {
            Ok(link) => link,
            Err(e) => {
                error!(%e, "failure opening serial port");
                warn!("continuing without hardware - relay commands will not complete");
                SerialLink::disconnected()
            }
        }
    } else {
        info!("hardware disabled");
        SerialLink::disconnected()
    };

    // Workers -> shared inbox -> control loop
    let (inbox_tx, inbox) = workers::inbox();
    let workers = Workers {
        speech: WorkerProxy::spawn(
            "speech-output",
            CommandSpeaker::new(config.speech.program.clone(), config.speech.args.clone()),
            inbox_tx.clone(),
        )?,
        recognition: WorkerProxy::spawn(
            "speech-recognition",
            CommandRecognizer::new(
                config.recognition.program.clone(),
                config.recognition.args.clone(),
            ),
            inbox_tx.clone(),
        )?,
        hardware: WorkerProxy::spawn("hardware-io", link, inbox_tx)?,
    };

    // Keyboard listener -> control loop
    let (key_tx, key_rx) = mpsc::channel(32);
    let keyboard = KeyboardListener::new(key_tx);
    match keyboard.start() {
        Ok(()) => info!("keyboard listener started - press ? for help"),
        Err(e) => {
            error!(?e, "failed to start keyboard listener");
            warn!("continuing without keyboard control");
        }
    }

    let ctx = Context::new(config.vision.eyes, config.vision.grin);
    let vision = ManualVision::new(ctx.presence.clone());
    let machine = StateMachine::new(RecognitionTimer::new(config.recognition_timeout()));
    let dispatcher = Dispatcher::new(workers, phrases);

    let mut control = ControlLoop::new(
        camera,
        vision,
        machine,
        inbox,
        dispatcher,
        key_rx,
        ctx,
        LoopSettings {
            frame_period: config.frame_period(),
            relay_pulse_ticks: config.exchange.relay_pulse_ticks,
        },
    );

    if !config.exchange.greeting.is_empty() {
        control.announce(Action::Speak {
            text: config.exchange.greeting.clone(),
        });
    }

    let shutdown = ShutdownSignal::new();

    info!("daemon initialized, entering main loop");

    tokio::select! {
        _ = control.run() => {
            info!("control loop exited");
        }

        reason = shutdown.wait() => {
            info!(?reason, "shutdown signal received");
        }
    }

    // Cleanup: relay off, then let the workers drain
    info!("shutting down...");

    let workers = control.finish().into_workers();
    keyboard.stop();
    for proxy in [workers.speech, workers.recognition, workers.hardware] {
        debug!(worker = proxy.name(), "stopping worker");
        proxy.shutdown(WORKER_GRACE).await;
    }

    info!("kiosk-daemon stopped");

    Ok(())
}
