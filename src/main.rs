//! RailDriver bridge.
//!
//! Polls a RailDriver desk controller over USB HID, decodes levers, buttons
//! and switches, and drives a host loco's controls from them. Calibration is
//! captured over a small HTTP control surface and persisted as JSON.

mod calibration;
mod dispatch;
mod input;
mod loco;
mod session;
mod settings;
mod state;
mod usb;
mod web;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use dispatch::ControlSink;
use loco::{LocoKind, LoggingLoco};
use session::DeviceSession;
use settings::Settings;
use web::state::{BridgeState, ControlsSnapshot, StateSnapshot, WebCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HostKind {
    Shunter,
    Steam,
    /// Decode only, no host attached.
    #[value(name = "none")]
    Detached,
}

#[derive(Parser)]
#[command(name = "raildriver-bridge", about = "RailDriver desk -> host loco controls")]
struct Args {
    /// Calibration settings file
    #[arg(long, default_value = "raildriver.json")]
    settings: PathBuf,

    /// Control surface port
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 20)]
    poll_interval_ms: u64,

    /// Host loco to drive
    #[arg(long, value_enum, default_value_t = HostKind::Shunter)]
    loco: HostKind,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    info!("=== RailDriver Bridge ===");
    info!("Settings: {}", args.settings.display());
    info!("Control surface port: {}", args.port);

    let (mut settings, mut save_on_exit) = load_settings(&args.settings);

    // --- Control surface ---
    let bridge = Arc::new(BridgeState::new(&settings));
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<WebCommand>(32);

    let web_bridge = bridge.clone();
    let web_port = args.port;
    tokio::spawn(async move {
        if let Err(e) = web::start_server(web_port, web_bridge, cmd_tx).await {
            error!("[WEB] Server error: {e}");
        }
    });

    let mut host = match args.loco {
        HostKind::Shunter => Some(LoggingLoco::new(LocoKind::Shunter)),
        HostKind::Steam => Some(LoggingLoco::new(LocoKind::Steam)),
        HostKind::Detached => None,
    };

    // A failed open leaves the bridge disabled until an explicit enable.
    let mut session = open_session(&settings);

    let mut tick = tokio::time::interval(Duration::from_millis(args.poll_interval_ms.max(1)));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("[MAIN] Polling every {}ms.", args.poll_interval_ms);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("[MAIN] Shutting down...");
                break;
            }
            _ = tick.tick() => {}
        }

        // --- Drain control surface commands between polls ---
        while let Ok(cmd) = cmd_rx.try_recv() {
            // An explicit save takes ownership of the file
            save_on_exit |= cmd == WebCommand::SaveSettings;
            handle_command(cmd, &mut session, &mut settings, &args.settings);
        }

        // --- Poll ---
        let result = match session.as_mut() {
            Some(s) => s.poll(host.as_mut().map(|h| h as &mut dyn ControlSink)),
            None => Ok(false),
        };
        if let Err(e) = result {
            error!("[HID] {e:#}. Disabled until re-enabled.");
            session = None;
        }

        bridge.update(snapshot(session.as_ref(), &settings, host.as_ref()));
    }

    if let Some(s) = session.take() {
        s.close();
    }
    if save_on_exit {
        if let Err(e) = settings.save(&args.settings) {
            error!("[CAL] Failed to save settings: {e:#}");
        }
    } else {
        warn!(
            "[CAL] Left {} untouched; save explicitly to overwrite it.",
            args.settings.display()
        );
    }

    info!("Done.");
    Ok(())
}

/// Settings to start with, and whether saving over `path` on exit is safe.
/// A file that exists but cannot be read is left alone.
fn load_settings(path: &Path) -> (Settings, bool) {
    match Settings::load(path) {
        Ok(settings) => (settings, true),
        Err(e) => {
            error!("[CAL] {e:#}. Using defaults.");
            (Settings::default(), false)
        }
    }
}

fn open_session(settings: &Settings) -> Option<DeviceSession> {
    match DeviceSession::open(settings) {
        Ok(s) => Some(s),
        Err(e) => {
            error!("[HID] Failed to set up RailDriver: {e:#}");
            None
        }
    }
}

fn handle_command(
    cmd: WebCommand,
    session: &mut Option<DeviceSession>,
    settings: &mut Settings,
    settings_path: &Path,
) {
    match cmd {
        WebCommand::Enable => {
            if session.is_some() {
                info!("[MAIN] Already enabled.");
            } else {
                *session = open_session(settings);
            }
        }
        WebCommand::Disable => {
            if let Some(s) = session.take() {
                s.close();
            }
        }
        WebCommand::Capture(lever, point) => {
            let Some(s) = session.as_mut() else {
                warn!("[CAL] RailDriver must be connected to calibrate.");
                return;
            };
            if lever.point_label(point).is_none() {
                warn!("[CAL] {} has no middle position.", lever.name());
                return;
            }
            s.capture(lever, point, settings);
        }
        WebCommand::Reset(lever) => match session.as_mut() {
            Some(s) => {
                s.reset(lever, settings);
            }
            None => {
                let mut calibration = *settings.calibration(lever);
                calibration.reset();
                settings.set_calibration(lever, calibration);
                info!("[CAL] {} reset", lever.name());
            }
        },
        WebCommand::SaveSettings => {
            if let Err(e) = settings.save(settings_path) {
                error!("[CAL] Failed to save settings: {e:#}");
            }
        }
    }
}

fn snapshot(
    session: Option<&DeviceSession>,
    settings: &Settings,
    host: Option<&LoggingLoco>,
) -> StateSnapshot {
    StateSnapshot {
        enabled: session.is_some(),
        product: session.map(|s| s.product()),
        controls: session.map(|s| ControlsSnapshot::from_state(s.state())),
        calibration: settings.clone(),
        loco: host.map(|h| h.kind()),
        loco_controls: host.map(|h| h.controls().clone()),
    }
}
