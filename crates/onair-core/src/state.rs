//! State manager
//!
//! The single arbiter for every read and write of control-plane state.
//! A [`StateManager`] is a cheap, cloneable handle around one lock; each
//! command takes the lock once, applies a whole-record or whole-field
//! change, emits its events, and releases the lock before returning. The
//! lock is never held across an `.await`, so readers only ever see fully
//! applied commands.
//!
//! Commands never fail towards the caller. Unknown ids are ignored, and
//! reentrancy violations and macro failures become system log entries.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::audio::{AudioChannel, AudioChannelStore, ChannelId};
use crate::config::ControlConfig;
use crate::countdown::{CountdownTick, CountdownTimer};
use crate::events::{ControlEvent, MacroOutcome};
use crate::macros::{Macro, MacroId};
use crate::mix_effect::{
    AutoOutcome, CutOutcome, MixEffectEngine, MixEffectState, TransitionKind, TransitionTick,
};
use crate::overlay::{Overlay, OverlayList};
use crate::persistence::PersistedState;
use crate::sequencer::MacroSequencer;
use crate::source::{Source, SourceId, SourceRegistry};
use crate::syslog::{LogLevel, SystemLog, SystemLogEntry};
use crate::telemetry::{HealthMonitor, HealthSample};

/// Capacity of the event broadcast channel
const EVENT_CAPACITY: usize = 256;

/// Log module names
pub(crate) mod module {
    pub const SWITCHER: &str = "SWITCHER";
    pub const MACRO: &str = "MACRO";
    pub const TIMER: &str = "TIMER";
    pub const HEALTH: &str = "HEALTH";
    pub const OUTPUT: &str = "OUTPUT";
}

/// Recording and streaming toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutputState {
    pub recording: bool,
    pub streaming: bool,
}

/// Consistent copy of everything consumers render
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSnapshot {
    pub mix_effect: MixEffectState,
    pub sources: Vec<Source>,
    pub audio_channels: Vec<AudioChannel>,
    pub overlays: Vec<Overlay>,
    /// Newest first
    pub logs: Vec<SystemLogEntry>,
    pub macro_executing: Option<MacroId>,
    pub countdown: CountdownTimer,
    pub outputs: OutputState,
}

/// The macro holding the single-flight slot
struct ActiveMacro {
    id: MacroId,
    cancel: CancellationToken,
}

/// Everything behind the lock
struct ControlState {
    config: ControlConfig,
    sources: SourceRegistry,
    audio: AudioChannelStore,
    overlays: OverlayList,
    macros: Vec<Macro>,
    mix_effect: MixEffectEngine,
    countdown: CountdownTimer,
    outputs: OutputState,
    health: HealthMonitor,
    log: SystemLog,
    active_macro: Option<ActiveMacro>,
    events: broadcast::Sender<ControlEvent>,
}

impl ControlState {
    fn emit(&self, event: ControlEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn log(&mut self, level: LogLevel, module: &str, message: impl Into<String>) {
        let entry = self.log.push(level, module, message);
        self.emit(ControlEvent::LogAppended(entry));
    }

    fn source_label(&self, id: Option<&SourceId>) -> String {
        match id {
            Some(id) => self
                .sources
                .get(id)
                .map(|s| s.settings.label.clone())
                .unwrap_or_else(|| id.to_string()),
            None => "(none)".to_string(),
        }
    }

    fn slots(&self) -> (Option<SourceId>, Option<SourceId>) {
        let state = self.mix_effect.state();
        (state.program_id.clone(), state.preview_id.clone())
    }

    /// Emit slot change events relative to `before`
    fn emit_slot_changes(&self, before: (Option<SourceId>, Option<SourceId>)) {
        let (program, preview) = self.slots();
        if before.0 != program {
            self.emit(ControlEvent::ProgramChanged {
                from: before.0,
                to: program,
            });
        }
        if before.1 != preview {
            self.emit(ControlEvent::PreviewChanged {
                from: before.1,
                to: preview,
            });
        }
    }
}

/// Handle to the control plane
#[derive(Clone)]
pub struct StateManager {
    inner: Arc<Mutex<ControlState>>,
    events: broadcast::Sender<ControlEvent>,
}

impl StateManager {
    /// Create a manager from configuration and a restored setup
    pub fn new(config: ControlConfig, setup: PersistedState) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let state = ControlState {
            mix_effect: MixEffectEngine::new(config.transition),
            health: HealthMonitor::new(config.health),
            log: SystemLog::new(config.log_retention),
            sources: SourceRegistry::new(setup.sources),
            audio: AudioChannelStore::new(setup.audio_channels),
            overlays: OverlayList::new(setup.overlays),
            macros: setup.macros,
            countdown: CountdownTimer::default(),
            outputs: OutputState::default(),
            active_macro: None,
            events: events.clone(),
            config,
        };
        Self {
            inner: Arc::new(Mutex::new(state)),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ControlState> {
        // A panicked writer leaves whole records behind; keep serving
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe to the event stream
    pub fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
        self.events.subscribe()
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Atomic copy of all observable state
    pub fn snapshot(&self) -> ControlSnapshot {
        let state = self.lock();
        ControlSnapshot {
            mix_effect: state.mix_effect.state().clone(),
            sources: state.sources.sources().to_vec(),
            audio_channels: state.audio.channels().to_vec(),
            overlays: state.overlays.overlays().to_vec(),
            logs: state.log.entries().cloned().collect(),
            macro_executing: state.active_macro.as_ref().map(|m| m.id.clone()),
            countdown: state.countdown,
            outputs: state.outputs,
        }
    }

    /// Current program/preview/transition state
    pub fn mix_effect(&self) -> MixEffectState {
        self.lock().mix_effect.state().clone()
    }

    /// All audio channels
    pub fn audio_channels(&self) -> Vec<AudioChannel> {
        self.lock().audio.channels().to_vec()
    }

    /// One audio channel
    pub fn audio_channel(&self, id: &ChannelId) -> Option<AudioChannel> {
        self.lock().audio.get(id).cloned()
    }

    /// Current level of a channel
    pub fn channel_level(&self, id: &ChannelId) -> Option<f64> {
        self.lock().audio.get(id).map(|c| c.level)
    }

    /// System log, newest first
    pub fn logs(&self) -> Vec<SystemLogEntry> {
        self.lock().log.entries().cloned().collect()
    }

    /// Id of the macro holding the single-flight slot
    pub fn macro_executing(&self) -> Option<MacroId> {
        self.lock().active_macro.as_ref().map(|m| m.id.clone())
    }

    /// Remaining countdown seconds
    pub fn countdown_remaining(&self) -> Option<u32> {
        self.lock().countdown.remaining_seconds
    }

    /// Id of the source at a zero-based order index
    pub fn source_at(&self, index: usize) -> Option<SourceId> {
        self.lock().sources.at(index).map(|s| s.id.clone())
    }

    /// Look up a macro in the library
    pub fn macro_by_id(&self, id: &MacroId) -> Option<Macro> {
        self.lock().macros.iter().find(|m| &m.id == id).cloned()
    }

    /// Configuration in effect
    pub fn config(&self) -> ControlConfig {
        self.lock().config.clone()
    }

    /// The persistable subset of state
    ///
    /// Tallies are reset: program/preview are session state.
    pub fn persisted_state(&self) -> PersistedState {
        let state = self.lock();
        PersistedState {
            sources: state
                .sources
                .sources()
                .iter()
                .cloned()
                .map(|mut s| {
                    s.tally = Default::default();
                    s
                })
                .collect(),
            audio_channels: state.audio.channels().to_vec(),
            overlays: state.overlays.overlays().to_vec(),
            macros: state.macros.clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Switcher
    // -------------------------------------------------------------------------

    /// Stage a source on preview (unknown ids are ignored)
    pub fn set_preview(&self, id: &SourceId) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let before = state.slots();
        if state.mix_effect.set_preview(&mut state.sources, id) {
            state.emit_slot_changes(before);
        }
    }

    /// Put a source on program (unknown ids are ignored)
    pub fn set_program(&self, id: &SourceId) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let before = state.slots();
        if state.mix_effect.set_program(&mut state.sources, id) {
            state.emit_slot_changes(before);
            let label = state.source_label(Some(id));
            state.log(LogLevel::Info, module::SWITCHER, format!("{} on program", label));
        }
    }

    /// Swap program and preview instantly
    ///
    /// Cancels a running auto transition.
    pub fn cut(&self) {
        let mut guard = self.lock();
        let state = &mut *guard;
        let before = state.slots();
        match state.mix_effect.cut(&mut state.sources) {
            CutOutcome::Ignored => debug!("Cut ignored: no preview"),
            CutOutcome::Swapped {
                cancelled_transition,
            } => {
                if cancelled_transition {
                    state.emit(ControlEvent::TransitionCancelled);
                    state.log(
                        LogLevel::Info,
                        module::SWITCHER,
                        "Transition cancelled by cut",
                    );
                }
                state.emit_slot_changes(before);
                let label = state.source_label(state.mix_effect.state().program_id.as_ref());
                state.log(LogLevel::Info, module::SWITCHER, format!("CUT: {} on program", label));
            }
        }
    }

    /// Start an auto transition
    pub fn auto(&self) {
        let mut state = self.lock();
        match state.mix_effect.auto() {
            AutoOutcome::Started => {
                let transition = state.mix_effect.state().transition;
                state.emit(ControlEvent::TransitionStarted {
                    kind: transition.kind,
                    duration_ms: transition.duration_ms,
                });
                debug!(
                    "{} transition started ({}ms)",
                    transition.kind.name(),
                    transition.duration_ms
                );
            }
            AutoOutcome::AlreadyRunning => {
                state.log(
                    LogLevel::Warning,
                    module::SWITCHER,
                    "AUTO rejected: transition already in progress",
                );
            }
            AutoOutcome::NoPreview => debug!("Auto ignored: no preview"),
        }
    }

    /// Advance a running transition by one frame of the driving clock
    pub fn tick_transition(&self) -> Option<TransitionTick> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let frame = state.config.frame_interval();
        let before = state.slots();
        let tick = state.mix_effect.tick(&mut state.sources, frame)?;
        state.emit(ControlEvent::TransitionProgress {
            progress: tick.progress,
        });
        if tick.committed {
            state.emit(ControlEvent::TransitionCompleted);
            state.emit_slot_changes(before);
            let kind = state.mix_effect.state().transition.kind;
            let label = state.source_label(state.mix_effect.state().program_id.as_ref());
            state.log(
                LogLevel::Info,
                module::SWITCHER,
                format!("AUTO ({}): {} on program", kind.name(), label),
            );
        }
        Some(tick)
    }

    /// Change the transition used by the next `auto()`
    pub fn set_transition(&self, kind: TransitionKind, duration_ms: u64) {
        let mut state = self.lock();
        if !state.mix_effect.set_transition(kind, duration_ms) {
            state.log(
                LogLevel::Warning,
                module::SWITCHER,
                "Transition settings locked while a transition runs",
            );
        }
    }

    // -------------------------------------------------------------------------
    // Audio and graphics
    // -------------------------------------------------------------------------

    /// Replace a channel record wholesale
    pub fn update_audio_channel(&self, channel: AudioChannel) {
        let mut state = self.lock();
        let id = channel.id.clone();
        if state.audio.update_channel(channel) {
            state.emit(ControlEvent::AudioChannelChanged { id });
        }
    }

    /// Toggle a channel's mute
    pub fn toggle_mute(&self, id: &ChannelId) {
        let mut state = self.lock();
        if let Some(muted) = state.audio.toggle_mute(id) {
            state.emit(ControlEvent::AudioChannelChanged { id: id.clone() });
            debug!("Channel {} muted={}", id, muted);
        }
    }

    /// Toggle a channel's solo flag (monitoring only)
    pub fn toggle_solo(&self, id: &ChannelId) {
        let mut state = self.lock();
        if state.audio.toggle_solo(id).is_some() {
            state.emit(ControlEvent::AudioChannelChanged { id: id.clone() });
        }
    }

    /// Toggle a channel's pre-fade listen
    pub fn toggle_pfl(&self, id: &ChannelId) {
        let mut state = self.lock();
        if state.audio.toggle_pfl(id).is_some() {
            state.emit(ControlEvent::AudioChannelChanged { id: id.clone() });
        }
    }

    /// Set a channel's fader level (clamped)
    pub fn set_level(&self, id: &ChannelId, level: f64) {
        let mut state = self.lock();
        if state.audio.set_level(id, level).is_some() {
            state.emit(ControlEvent::AudioChannelChanged { id: id.clone() });
        }
    }

    /// Show or hide an overlay
    pub fn set_overlay(&self, id: &str, active: bool) {
        let mut state = self.lock();
        if state.overlays.set_active(id, active).is_some() {
            state.emit(ControlEvent::OverlayChanged {
                id: id.to_string(),
                active,
            });
        }
    }

    /// Flip an overlay's visibility
    pub fn toggle_overlay(&self, id: &str) {
        let mut state = self.lock();
        if let Some(active) = state.overlays.toggle(id) {
            state.emit(ControlEvent::OverlayChanged {
                id: id.to_string(),
                active,
            });
        }
    }

    // -------------------------------------------------------------------------
    // Macros
    // -------------------------------------------------------------------------

    /// Claim the single-flight slot, or log and report the holder
    fn begin_macro(&self, definition: &Macro) -> Result<MacroRunGuard, MacroOutcome> {
        let mut state = self.lock();
        if let Some(active) = &state.active_macro {
            let running = active.id.clone();
            state.log(
                LogLevel::Warning,
                module::MACRO,
                format!(
                    "Macro '{}' rejected: '{}' is already running",
                    definition.label, running
                ),
            );
            return Err(MacroOutcome::Rejected { running });
        }

        let cancel = CancellationToken::new();
        state.active_macro = Some(ActiveMacro {
            id: definition.id.clone(),
            cancel: cancel.clone(),
        });
        state.emit(ControlEvent::MacroStarted {
            id: definition.id.clone(),
        });
        state.log(
            LogLevel::Info,
            module::MACRO,
            format!("Macro '{}' started", definition.label),
        );

        Ok(MacroRunGuard {
            manager: self.clone(),
            id: definition.id.clone(),
            label: definition.label.clone(),
            cancel,
            outcome: None,
        })
    }

    /// Release the single-flight slot
    fn finish_macro(&self, id: &MacroId, outcome: MacroOutcome) {
        let mut state = self.lock();
        if state.active_macro.as_ref().is_some_and(|m| &m.id == id) {
            state.active_macro = None;
        }
        state.emit(ControlEvent::MacroFinished {
            id: id.clone(),
            outcome,
        });
    }

    /// Run a claimed macro and record how it ended on the guard
    async fn run_claimed(&self, definition: &Macro, mut guard: MacroRunGuard) -> MacroOutcome {
        let sequencer = MacroSequencer::new(self.clone());
        let outcome = match sequencer.execute(definition, &guard.cancel).await {
            Ok(()) => {
                self.log(
                    LogLevel::Success,
                    module::MACRO,
                    format!("Macro '{}' complete", definition.label),
                );
                MacroOutcome::Completed
            }
            Err((step, e)) => {
                let action = definition
                    .actions
                    .get(step)
                    .map(|a| a.name())
                    .unwrap_or("?");
                self.log(
                    LogLevel::Warning,
                    module::MACRO,
                    format!(
                        "Macro '{}' aborted at step {} ({}): {}",
                        definition.label,
                        step + 1,
                        action,
                        e
                    ),
                );
                MacroOutcome::Aborted {
                    step,
                    reason: e.to_string(),
                }
            }
        };
        guard.outcome = Some(outcome.clone());
        outcome
    }

    /// Run a macro to completion on the current task
    ///
    /// Rejected without side effects (other than a log entry) if another
    /// macro is running.
    pub async fn run_macro(&self, definition: &Macro) -> MacroOutcome {
        match self.begin_macro(definition) {
            Ok(guard) => self.run_claimed(definition, guard).await,
            Err(outcome) => outcome,
        }
    }

    /// Start a macro on a background task
    ///
    /// The single-flight slot is claimed before this returns, so a second
    /// trigger made right after is rejected. Returns None when rejected.
    pub fn trigger_macro(&self, definition: Macro) -> Option<JoinHandle<MacroOutcome>> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.log(
                LogLevel::Critical,
                module::MACRO,
                format!("Macro '{}' not started: no runtime", definition.label),
            );
            return None;
        };

        let guard = self.begin_macro(&definition).ok()?;
        let manager = self.clone();
        Some(runtime.spawn(async move { manager.run_claimed(&definition, guard).await }))
    }

    /// Trigger a macro from the library by id (unknown ids are ignored)
    pub fn trigger_macro_by_id(&self, id: &MacroId) -> Option<JoinHandle<MacroOutcome>> {
        let definition = self.macro_by_id(id)?;
        self.trigger_macro(definition)
    }

    /// Cancel the running macro, if any
    ///
    /// The run stops at its next suspension point and releases the slot.
    pub fn shutdown(&self) {
        let state = self.lock();
        if let Some(active) = &state.active_macro {
            active.cancel.cancel();
        }
    }

    // -------------------------------------------------------------------------
    // Timers, health, outputs
    // -------------------------------------------------------------------------

    /// Start (or restart) the countdown
    pub fn start_countdown(&self, minutes: u32) {
        let mut state = self.lock();
        state.countdown.start(minutes);
        state.emit(ControlEvent::CountdownChanged {
            remaining_seconds: state.countdown.remaining_seconds,
        });
        state.log(
            LogLevel::Info,
            module::TIMER,
            format!("Countdown started: {} min", minutes),
        );
    }

    /// Advance the countdown by one countdown interval
    ///
    /// Driven by the live ticker.
    pub fn tick_countdown(&self) {
        let mut state = self.lock();
        let step = state.config.countdown_step_secs();
        match state.countdown.tick(step) {
            CountdownTick::Idle => {}
            CountdownTick::Running(remaining) => {
                state.emit(ControlEvent::CountdownChanged {
                    remaining_seconds: Some(remaining),
                });
            }
            CountdownTick::Expired => {
                state.emit(ControlEvent::CountdownChanged {
                    remaining_seconds: None,
                });
                state.log(LogLevel::Info, module::TIMER, "Countdown expired");
            }
        }
    }

    /// Feed one health sample through the threshold monitor
    pub fn record_health(&self, sample: HealthSample) {
        let mut state = self.lock();
        for alert in state.health.observe(&sample) {
            state.log(alert.level, module::HEALTH, alert.message);
        }
    }

    /// Toggle recording
    pub fn toggle_record(&self) {
        let mut state = self.lock();
        state.outputs.recording = !state.outputs.recording;
        let outputs = state.outputs;
        state.emit(ControlEvent::OutputChanged {
            recording: outputs.recording,
            streaming: outputs.streaming,
        });
        let message = if outputs.recording { "Recording started" } else { "Recording stopped" };
        state.log(LogLevel::Info, module::OUTPUT, message);
    }

    /// Toggle streaming
    pub fn toggle_stream(&self) {
        let mut state = self.lock();
        state.outputs.streaming = !state.outputs.streaming;
        let outputs = state.outputs;
        state.emit(ControlEvent::OutputChanged {
            recording: outputs.recording,
            streaming: outputs.streaming,
        });
        let message = if outputs.streaming { "Stream started" } else { "Stream stopped" };
        state.log(LogLevel::Info, module::OUTPUT, message);
    }

    /// Append a system log entry
    pub(crate) fn log(&self, level: LogLevel, module: &str, message: impl Into<String>) {
        self.lock().log(level, module, message);
    }
}

/// Holds the single-flight slot for one macro run
///
/// Dropping the guard releases the slot on every exit path, including a
/// cancelled or panicked run.
struct MacroRunGuard {
    manager: StateManager,
    id: MacroId,
    label: String,
    cancel: CancellationToken,
    outcome: Option<MacroOutcome>,
}

impl Drop for MacroRunGuard {
    fn drop(&mut self) {
        let outcome = match self.outcome.take() {
            Some(outcome) => outcome,
            None => {
                self.manager.log(
                    LogLevel::Warning,
                    module::MACRO,
                    format!("Macro '{}' interrupted", self.label),
                );
                MacroOutcome::Interrupted
            }
        };
        self.manager.finish_macro(&self.id, outcome);
    }
}
