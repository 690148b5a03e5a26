use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use log::*;
use tokio::time::sleep;

use crate::abstractions::*;
use crate::encounter_state::EncounterState;
use crate::event_handler::EventHandler;
use crate::flags::Flags;
use crate::interval_timer::IntervalTimer;
use crate::models::CompleteEncounter;
use crate::publisher::SnapshotPublisher;

pub struct StartOptions {
    pub version: String,
    pub event_update_rate: Duration,
    pub inactivity_check_interval: Duration,
    pub flush_timeout: Duration,
}

/// Single-writer engine loop. Commands are applied between events, never during one.
pub async fn start<FL, ES, EH, EE, PE>(
    flags: Arc<FL>,
    mut event_source: ES,
    event_handler: &mut EH,
    state: &mut EncounterState,
    publisher: &mut SnapshotPublisher<EE>,
    event_emitter: Arc<EE>,
    persister: Arc<PE>,
    options: StartOptions,
) -> Result<()>
where
    FL: Flags,
    ES: EventSource,
    EH: EventHandler,
    EE: EventEmitter,
    PE: Persister,
{
    let mut inactivity_timer = IntervalTimer::new(options.inactivity_check_interval);
    let mut publish_timer = IntervalTimer::new(options.event_update_rate);

    info!("engine started, version {}", options.version);

    loop {
        if flags.triggered_stop() {
            info!("stop requested");
            shutdown(state, persister.as_ref(), options.flush_timeout);
            return Ok(());
        }

        apply_commands(flags.as_ref(), state, publisher, event_emitter.as_ref(), persister.as_ref(), &options);

        tokio::select! {
            event = event_source.recv() => {
                match event {
                    Some(event) => {
                        if let Err(err) = event_handler.handle(event, state) {
                            debug!("event not applied: {err}");
                        }
                    }
                    None => {
                        info!("event source closed");
                        shutdown(state, persister.as_ref(), options.flush_timeout);
                        return Ok(());
                    }
                }
            }
            _ = sleep(options.event_update_rate) => {}
        }

        let now = Utc::now();

        if inactivity_timer.has_elapsed(now) {
            if let Some(encounter) = state.check_inactivity(now.timestamp_millis()) {
                save(persister.as_ref(), encounter);
            }
        }

        if publish_timer.has_elapsed(now) {
            if let Err(err) = publisher.publish(state, now.timestamp_millis()) {
                warn!("could not publish snapshot: {err}");
            }
        }
    }
}

fn apply_commands<FL, EE, PE>(
    flags: &FL,
    state: &mut EncounterState,
    publisher: &mut SnapshotPublisher<EE>,
    event_emitter: &EE,
    persister: &PE,
    options: &StartOptions,
) where
    FL: Flags,
    EE: EventEmitter,
    PE: Persister,
{
    let now_ms = Utc::now().timestamp_millis();

    if flags.take_reset() {
        if let Some(encounter) = state.reset() {
            save(persister, encounter);

            if let Err(err) = persister.flush(options.flush_timeout) {
                warn!("{err}");
            }
        }

        emit(event_emitter, AppEvent::ResetEncounter);

        if let Err(err) = publisher.publish(state, now_ms) {
            warn!("could not publish cleared snapshot: {err}");
        }
    }

    if flags.take_pause_toggle() {
        if let Some(is_paused) = state.toggle_pause(now_ms) {
            emit(event_emitter, AppEvent::PauseEncounter(is_paused));
        }
    }

    if flags.take_split() {
        if let Some(index) = state.split_attempt(now_ms) {
            info!("opened attempt {index}");
        }
    }

    if flags.take_start() {
        state.start_encounter(now_ms, now_ms);
    }

    state.set_boss_only_dps(flags.boss_only_dps());
}

fn emit<EE: EventEmitter>(event_emitter: &EE, event: AppEvent) {
    if let Err(err) = event_emitter.emit(event) {
        warn!("{err}");
    }
}

fn save<PE: Persister>(persister: &PE, encounter: CompleteEncounter) {
    if let Err(err) = persister.save(encounter) {
        error!("could not queue encounter: {err}");
    }
}

/// Best-effort flush of the open encounter. On failure the record is dropped, not left partial.
fn shutdown<PE: Persister>(state: &mut EncounterState, persister: &PE, flush_timeout: Duration) {
    if let Some(encounter) = state.close(false) {
        save(persister, encounter);
    }

    if let Err(err) = persister.flush(flush_timeout) {
        error!("discarding unsaved encounters on shutdown: {err}");
    }
}
