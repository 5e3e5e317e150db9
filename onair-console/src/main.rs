//! On-Air Operator Console
//!
//! A headless console for the live-production control plane. Reads key
//! presses and commands from stdin, forwards them to the control actor,
//! and prints the system log as it grows.

mod keymap;
mod settings;

use anyhow::Context;
use onair_core::{
    load_library, run_control_actor, AudioChannel, ControlCommand, ControlEvent, ControlSnapshot,
    LiveTicker, Macro, MacroAction, Overlay, PersistedState, SnapshotStore, Source, SourceKind,
    StateManager, Tally,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keymap::{parse_line, Input};
use settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "onair=info,onair_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting onair control plane");

    let settings = Settings::load();
    let store = settings.data_dir().map(SnapshotStore::new);

    let mut setup = match &store {
        Some(store) => store
            .load()
            .with_context(|| format!("Failed to read snapshot {}", store.path().display()))?
            .unwrap_or_else(default_rig),
        None => {
            warn!("No data directory; state will not be saved");
            default_rig()
        }
    };

    if let Some(path) = &settings.macro_library {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read macro library {}", path.display()))?;
        let library = load_library(&json)
            .with_context(|| format!("Invalid macro library {}", path.display()))?;
        merge_macros(&mut setup.macros, library);
    }

    let manager = StateManager::new(settings.control.clone(), setup);
    let printer = tokio::spawn(print_events(manager.subscribe(), settings.show_progress));

    let mut ticker = LiveTicker::new(manager.clone());
    ticker.start();

    let (cmd_tx, cmd_rx) = mpsc::channel(256);
    let actor = tokio::spawn(run_control_actor(cmd_rx, manager.clone()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match parse_line(&line) {
            Ok(Input::Command(cmd)) => {
                if cmd_tx.send(cmd).await.is_err() {
                    break;
                }
            }
            Ok(Input::Status) => {
                let (resp_tx, resp_rx) = oneshot::channel();
                if cmd_tx
                    .send(ControlCommand::QuerySnapshot { response: resp_tx })
                    .await
                    .is_err()
                {
                    break;
                }
                if let Ok(snapshot) = resp_rx.await {
                    print_status(&snapshot);
                }
            }
            Ok(Input::Quit) => break,
            Err(e) => eprintln!("{}", e),
        }
    }

    info!("Shutting down");
    let _ = cmd_tx.send(ControlCommand::Shutdown).await;
    if let Err(e) = actor.await {
        warn!("Control actor ended abnormally: {}", e);
    }
    ticker.stop().await;
    printer.abort();

    if let Some(store) = &store {
        store
            .save(&manager.persisted_state())
            .with_context(|| format!("Failed to save snapshot {}", store.path().display()))?;
        info!("Saved state to {}", store.path().display());
    }

    Ok(())
}

/// First-run setup: four cameras, a graphics feed, two mics and a scorebug
fn default_rig() -> PersistedState {
    PersistedState {
        sources: vec![
            Source::new("cam1", "Camera 1", SourceKind::Camera),
            Source::new("cam2", "Camera 2", SourceKind::Camera),
            Source::new("cam3", "Camera 3", SourceKind::Camera),
            Source::new("cam4", "Camera 4", SourceKind::Camera),
            Source::new("gfx", "Graphics", SourceKind::Graphics),
        ],
        audio_channels: vec![
            AudioChannel::new("host", Some("cam1".into())),
            AudioChannel::new("guest", Some("cam2".into())),
        ],
        overlays: vec![
            Overlay::new("score", "Scorebug"),
            Overlay::new("lower-third", "Lower third"),
        ],
        macros: vec![Macro::new(
            "open",
            "Show open",
            vec![
                MacroAction::PvwSource {
                    source_id: "cam2".into(),
                },
                MacroAction::CutToSource {
                    source_id: "cam1".into(),
                },
                MacroAction::AudioFade {
                    channel_id: "host".into(),
                    target_level: 0.8,
                    duration_ms: Some(1000),
                },
                MacroAction::Wait { ms: 500 },
                MacroAction::GfxUpdate {
                    overlay_id: "score".into(),
                    active: true,
                },
            ],
        )],
    }
}

/// Add library macros, replacing any with the same id
fn merge_macros(macros: &mut Vec<Macro>, library: Vec<Macro>) {
    for definition in library {
        match macros.iter_mut().find(|m| m.id == definition.id) {
            Some(existing) => *existing = definition,
            None => macros.push(definition),
        }
    }
}

/// Print log entries (and optionally progress) until the stream closes
async fn print_events(mut events: broadcast::Receiver<ControlEvent>, show_progress: bool) {
    loop {
        match events.recv().await {
            Ok(ControlEvent::LogAppended(entry)) => {
                println!("[{:<8}] {:<8} {}", entry.level.name(), entry.module, entry.message);
            }
            Ok(ControlEvent::TransitionProgress { progress }) if show_progress => {
                println!("           transition {:>3.0}%", progress * 100.0);
            }
            Ok(ControlEvent::CountdownChanged {
                remaining_seconds: Some(remaining),
            }) if show_progress => {
                println!("           countdown {}", format_clock(remaining));
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Console fell behind; skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn print_status(snapshot: &ControlSnapshot) {
    let label = |tally: Tally| {
        snapshot
            .sources
            .iter()
            .find(|s| s.tally == tally)
            .map(|s| s.settings.label.as_str())
            .unwrap_or("-")
    };
    println!("PGM  {}", label(Tally::Pgm));
    println!("PVW  {}", label(Tally::Pvw));

    let transition = &snapshot.mix_effect.transition;
    if transition.in_progress {
        println!(
            "AUTO {} {:.0}%",
            transition.kind.name(),
            transition.progress * 100.0
        );
    } else {
        println!("NEXT {} {}ms", transition.kind.name(), transition.duration_ms);
    }

    for (i, source) in snapshot.sources.iter().enumerate() {
        println!("  {}  {:<4} {}", i + 1, tally_mark(source.tally), source.settings.label);
    }
    for channel in &snapshot.audio_channels {
        println!(
            "  {:<12} {:>4.2}{}{}",
            channel.id.as_str(),
            channel.level,
            if channel.is_muted { " MUTE" } else { "" },
            if channel.is_solo { " SOLO" } else { "" },
        );
    }
    for overlay in snapshot.overlays.iter().filter(|o| o.is_active) {
        println!("  GFX  {}", overlay.label);
    }
    if let Some(remaining) = snapshot.countdown.remaining_seconds {
        println!("  CLOCK {}", format_clock(remaining));
    }
    if let Some(id) = &snapshot.macro_executing {
        println!("  MACRO {}", id);
    }
    println!(
        "  REC {}  STREAM {}",
        on_off(snapshot.outputs.recording),
        on_off(snapshot.outputs.streaming)
    );
}

fn tally_mark(tally: Tally) -> &'static str {
    match tally {
        Tally::Pgm => "PGM",
        Tally::Pvw => "PVW",
        Tally::Off => "",
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "OFF"
    }
}

fn format_clock(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
